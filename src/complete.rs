//! Completion of incomplete scanpaths.
//!
//! The completion closes every open task, innermost first. Whatever a frame
//! still owes is emitted as terminals; owed nonterminals are expanded with
//! their canonical alternative, which is always the **first-declared**
//! alternative of the production. This is a policy, not a property of the
//! grammar: a grammar author controls completions by ordering alternatives.
//! Construction guarantees the canonical expansion of every nonterminal is
//! finite.

use crate::automaton::{self, Rejection, Residual, Verdict};
use crate::grammar::{Grammar, Terminal};

/// Shortest continuation, under the canonical alternative policy, that
/// drives `residual` to acceptance. Empty for an empty residual.
pub fn complete(grammar: &Grammar, residual: &Residual) -> Vec<Terminal> {
    let mut out = Vec::new();
    for (frame, child_open) in residual.innermost_first() {
        grammar.push_sequence_yield(frame.remaining(grammar, child_open), &mut out);
    }
    out
}

/// Run `input` and return it extended with its completion.
///
/// Accepted input is returned unchanged; rejected input yields the rejection.
pub fn complete_scanpath(grammar: &Grammar, input: &[Terminal]) -> Result<Vec<Terminal>, Rejection> {
    let run = automaton::run(grammar, input);
    let mut full = input.to_vec();
    match run.verdict {
        Verdict::Accepted => {}
        Verdict::AcceptedIncomplete(residual) => full.extend(complete(grammar, &residual)),
        Verdict::Rejected(rejection) => return Err(rejection),
    }
    Ok(full)
}
