//! Run outcomes.

use serde::Serialize;
use thiserror::Error;

use super::{Residual, Trace};
use crate::grammar::{Grammar, Nonterminal, Terminal};

/// Why a run was rejected.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RejectReason {
    /// The symbol cannot continue any alternative of `nonterminal`.
    UnexpectedSymbol {
        nonterminal: Nonterminal,
        /// Terminals that would have been accepted here.
        expected: Vec<Terminal>,
    },
    /// Input continues after the start task already closed.
    TrailingInput,
}

/// A fail-fast rejection at one input position.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize)]
#[error("input rejected at position {position}")]
pub struct Rejection {
    pub position: usize,
    pub symbol: Terminal,
    pub reason: RejectReason,
}

impl Rejection {
    /// Render the rejection with grammar names.
    pub fn describe(&self, grammar: &Grammar) -> String {
        let symbol = grammar.terminal_name(self.symbol);
        match &self.reason {
            RejectReason::UnexpectedSymbol {
                nonterminal,
                expected,
            } => {
                let expected: Vec<&str> = expected.iter().map(|&t| grammar.terminal_name(t)).collect();
                format!(
                    "unexpected {} at position {} in {} (expected one of: {})",
                    symbol,
                    self.position,
                    grammar.nonterminal_name(*nonterminal),
                    expected.join(", ")
                )
            }
            RejectReason::TrailingInput => format!(
                "unexpected {} at position {}: the examination already closed",
                symbol, self.position
            ),
        }
    }

    /// The nonterminal that rejected the symbol, if any.
    pub fn nonterminal(&self) -> Option<Nonterminal> {
        match self.reason {
            RejectReason::UnexpectedSymbol { nonterminal, .. } => Some(nonterminal),
            RejectReason::TrailingInput => None,
        }
    }
}

/// Outcome of one automaton run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "verdict", content = "detail", rename_all = "snake_case")]
pub enum Verdict {
    /// The input is a complete sentence of the grammar.
    Accepted,
    /// The input is a valid prefix; the residual stack holds the open tasks.
    AcceptedIncomplete(Residual),
    Rejected(Rejection),
}

impl Verdict {
    pub fn as_str(&self) -> &'static str {
        match self {
            Verdict::Accepted => "accepted",
            Verdict::AcceptedIncomplete(_) => "incomplete",
            Verdict::Rejected(_) => "rejected",
        }
    }

    pub fn is_accepted(&self) -> bool {
        matches!(self, Verdict::Accepted)
    }

    pub fn is_incomplete(&self) -> bool {
        matches!(self, Verdict::AcceptedIncomplete(_))
    }

    pub fn is_rejected(&self) -> bool {
        matches!(self, Verdict::Rejected(_))
    }

    pub fn residual(&self) -> Option<&Residual> {
        match self {
            Verdict::AcceptedIncomplete(residual) => Some(residual),
            _ => None,
        }
    }

    pub fn rejection(&self) -> Option<&Rejection> {
        match self {
            Verdict::Rejected(rejection) => Some(rejection),
            _ => None,
        }
    }
}

impl std::fmt::Display for Verdict {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Trace and verdict of one run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Run {
    pub trace: Trace,
    pub verdict: Verdict,
}

impl Run {
    /// Convert into a `Result`, treating both accepting verdicts as success.
    pub fn into_result(self) -> Result<(Trace, Option<Residual>), Rejection> {
        match self.verdict {
            Verdict::Accepted => Ok((self.trace, None)),
            Verdict::AcceptedIncomplete(residual) => Ok((self.trace, Some(residual))),
            Verdict::Rejected(rejection) => Err(rejection),
        }
    }
}
