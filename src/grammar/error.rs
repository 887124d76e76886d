//! Grammar construction errors.

use thiserror::Error;

/// Errors raised while building a [`Grammar`](super::Grammar) or converting
/// region labels into terminals.
///
/// Every variant except [`GrammarError::UnknownTerminal`] means the grammar
/// declaration is malformed. These are reported once, before any run starts.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GrammarError {
    #[error("grammar declares no terminals")]
    EmptyAlphabet,
    #[error("invalid symbol label {0:?}")]
    InvalidLabel(String),
    #[error("terminal {0:?} is declared more than once")]
    DuplicateTerminal(String),
    #[error("nonterminal {0:?} has more than one production")]
    DuplicateNonterminal(String),
    #[error("{0:?} is declared both as a terminal and as a nonterminal")]
    NameClash(String),
    #[error("start symbol {0:?} has no production")]
    UnknownStart(String),
    #[error("nonterminal {0:?} has no alternatives")]
    NoAlternatives(String),
    #[error("production for {nonterminal:?} references undeclared symbol {symbol:?}")]
    UndeclaredSymbol { nonterminal: String, symbol: String },
    #[error("production for {nonterminal:?} tags terminal {terminal:?} as mandatory")]
    MandatoryTerminal { nonterminal: String, terminal: String },
    #[error(
        "nonterminal {nonterminal:?} is not LL(1): lookahead {lookahead:?} predicts alternatives {first} and {second}"
    )]
    Conflict {
        nonterminal: String,
        lookahead: String,
        first: usize,
        second: usize,
    },
    #[error("nonterminal {nonterminal:?} has two alternatives deriving the empty sequence ({first} and {second})")]
    AmbiguousEmpty {
        nonterminal: String,
        first: usize,
        second: usize,
    },
    #[error("canonical expansion of {0:?} never terminates (its first alternative is recursive)")]
    CyclicCanonicalExpansion(String),
    #[error("region label {0:?} is not in the grammar alphabet")]
    UnknownTerminal(String),
}

impl GrammarError {
    /// Whether this error describes a malformed grammar declaration.
    pub fn is_malformed_grammar(&self) -> bool {
        !matches!(self, GrammarError::UnknownTerminal(_))
    }
}
