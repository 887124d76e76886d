//! Scanpath grammar - recognition, completion and diagnosis of ECG reading
//! sequences.
//!
//! An expert reading of a 12-lead ECG is modelled as a sentence of a
//! context-free grammar: terminals are fixated regions (leads and waveform
//! features), nonterminals are clinical sub-tasks. A deterministic stack
//! automaton decides whether a scanpath is a complete reading, a valid but
//! unfinished one, or off-protocol. Unfinished readings can be completed, and
//! every reading can be checked for mandatory sub-tasks that were skipped.
//!
//! # Architecture
//!
//! - `grammar`: YAML grammar declarations, validation, LL(1) lookahead tables
//! - `automaton`: the stack automaton, its trace and verdicts
//! - `complete`: canonical continuation of an incomplete run
//! - `diagnose`: skipped mandatory steps from a trace
//! - `analyzer`: the run / complete / diagnose pipeline, single and batch
//! - `report`: output formatting (pretty, JSON)
//!
//! # Example
//!
//! ```
//! use scanpath_grammar::{clinical, Analyzer};
//!
//! let grammar = clinical().unwrap();
//! let analysis = Analyzer::new(&grammar)
//!     .analyze_labels(["II", "V1", "QRS", "ST", "T"])
//!     .unwrap();
//!
//! assert!(analysis.verdict().is_incomplete());
//! assert_eq!(analysis.completion, Some(vec![grammar.terminal("QT").unwrap()]));
//! assert_eq!(analysis.missing_steps[0].message(&grammar), "missing closing verification");
//! ```

pub mod analyzer;
pub mod automaton;
pub mod complete;
pub mod diagnose;
pub mod grammar;
pub mod report;

pub use analyzer::{Analysis, Analyzer};
pub use automaton::{
    run, Action, Automaton, Frame, RejectReason, Rejection, Residual, Run, Trace, TraceEntry,
    Verdict,
};
pub use complete::{complete, complete_scanpath};
pub use diagnose::{diagnose, MissingStep};
pub use grammar::{
    clinical, Grammar, GrammarDeclaration, GrammarError, Nonterminal, Symbol, Terminal,
};
