//! Stack frames and the residual stack of an incomplete run.

use serde::Serialize;

use crate::grammar::{Element, Grammar, Nonterminal};

/// One open, not yet completed nonterminal instance.
///
/// Children before `position` are satisfied. While a child frame is open on
/// top of this one, `position` points at that child.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Frame {
    pub nonterminal: Nonterminal,
    /// `None` until the first lookahead selects an alternative.
    pub alternative: Option<usize>,
    pub position: usize,
}

impl Frame {
    /// An unresolved frame, as created for the start symbol.
    pub fn unresolved(nonterminal: Nonterminal) -> Self {
        Self {
            nonterminal,
            alternative: None,
            position: 0,
        }
    }

    /// A frame entered with a known alternative.
    pub fn resolved(nonterminal: Nonterminal, alternative: usize) -> Self {
        Self {
            nonterminal,
            alternative: Some(alternative),
            position: 0,
        }
    }

    /// The element expected next, or `None` when the frame is complete or
    /// unresolved.
    pub fn expected<'g>(&self, grammar: &'g Grammar) -> Option<&'g Element> {
        let alt = self.alternative?;
        grammar
            .get_alternative(self.nonterminal, alt)?
            .get(self.position)
    }

    /// Whether every symbol of the chosen alternative has been consumed.
    pub fn is_complete(&self, grammar: &Grammar) -> bool {
        match self.alternative {
            Some(alt) => grammar
                .get_alternative(self.nonterminal, alt)
                .is_some_and(|a| self.position >= a.len()),
            None => false,
        }
    }

    /// Elements this frame still owes.
    ///
    /// `child_open` skips the element at `position`, which is being produced
    /// by the frame above. Unresolved frames owe their whole canonical
    /// alternative. A frame that does not belong to `grammar` owes nothing.
    pub fn remaining<'g>(&self, grammar: &'g Grammar, child_open: bool) -> &'g [Element] {
        let alt = self.alternative.unwrap_or(Grammar::CANONICAL_ALTERNATIVE);
        let Some(alternative) = grammar.get_alternative(self.nonterminal, alt) else {
            return &[];
        };
        let elements = alternative.elements();
        if self.alternative.is_none() {
            return elements;
        }
        let skip = if child_open {
            self.position + 1
        } else {
            self.position
        };
        elements.get(skip..).unwrap_or(&[])
    }
}

/// The stack left over when input ran out before the start task closed.
///
/// Frames are ordered bottom (start task) to top (innermost task).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Residual {
    frames: Vec<Frame>,
}

impl Residual {
    pub fn new(frames: Vec<Frame>) -> Self {
        Self { frames }
    }

    pub fn frames(&self) -> &[Frame] {
        &self.frames
    }

    pub fn depth(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    /// The innermost open frame.
    pub fn top(&self) -> Option<&Frame> {
        self.frames.last()
    }

    /// Open tasks, innermost first.
    pub fn open_tasks(&self) -> Vec<Nonterminal> {
        self.frames.iter().rev().map(|f| f.nonterminal).collect()
    }

    /// Pairs each frame with whether a child frame is open above it,
    /// innermost first.
    pub(crate) fn innermost_first(&self) -> impl Iterator<Item = (&Frame, bool)> {
        let top = self.frames.len().saturating_sub(1);
        self.frames
            .iter()
            .enumerate()
            .rev()
            .map(move |(i, f)| (f, i != top))
    }
}
