//! Derivation trace recorded during one run.

use serde::{Deserialize, Serialize};

use crate::grammar::{Nonterminal, Terminal};

/// What the automaton did in one step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    /// Entered a sub-task without consuming input.
    Push,
    /// Closed a completed task.
    Pop,
    /// Consumed one input terminal within the current task.
    Shift,
}

impl Action {
    pub fn as_str(&self) -> &'static str {
        match self {
            Action::Push => "push",
            Action::Pop => "pop",
            Action::Shift => "shift",
        }
    }
}

impl std::fmt::Display for Action {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One recorded step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TraceEntry {
    /// Index of the input symbol being processed; the input length for
    /// steps taken at end of input.
    pub position: usize,
    /// The input symbol being processed, `None` at end of input. For a
    /// shift this is the consumed terminal.
    pub lookahead: Option<Terminal>,
    pub action: Action,
    /// The frame pushed, popped, or shifted within.
    pub nonterminal: Nonterminal,
    pub alternative: usize,
    /// Stack depth after the step.
    pub depth: usize,
}

/// Append-only record of every step of a run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Trace {
    entries: Vec<TraceEntry>,
}

impl Trace {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn record(&mut self, entry: TraceEntry) {
        self.entries.push(entry);
    }

    pub fn entries(&self) -> &[TraceEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, TraceEntry> {
        self.entries.iter()
    }

    /// Number of entries with the given action.
    pub fn count(&self, action: Action) -> usize {
        self.entries.iter().filter(|e| e.action == action).count()
    }

    /// Deepest stack reached.
    pub fn max_depth(&self) -> usize {
        self.entries.iter().map(|e| e.depth).max().unwrap_or(0)
    }
}

impl<'a> IntoIterator for &'a Trace {
    type Item = &'a TraceEntry;
    type IntoIter = std::slice::Iter<'a, TraceEntry>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}
