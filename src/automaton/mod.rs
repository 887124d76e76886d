//! Grammar-driven stack automaton.
//!
//! The automaton consumes one terminal at a time against a stack of open
//! task frames. With an LL(1) grammar every configuration has exactly one
//! next action, so a run never backtracks:
//!
//! - **push**: the expected symbol is a nonterminal; enter it with the
//!   alternative the lookahead predicts
//! - **shift**: the expected symbol is the input terminal; consume it
//! - **pop**: the top frame is complete; close it and advance its parent
//! - **reject**: nothing predicts the input symbol; stop immediately
//!
//! When input runs out, an empty stack means the scanpath was accepted. Open
//! frames whose remaining symbols can all derive the empty sequence are
//! drained; anything else is returned as the residual of an incomplete run.

mod frame;
mod trace;
mod verdict;

pub use frame::{Frame, Residual};
pub use trace::{Action, Trace, TraceEntry};
pub use verdict::{RejectReason, Rejection, Run, Verdict};

use crate::grammar::{Grammar, Nonterminal, Symbol, Terminal};

/// Runs input sequences against one grammar.
#[derive(Debug, Clone, Copy)]
pub struct Automaton<'g> {
    grammar: &'g Grammar,
}

impl<'g> Automaton<'g> {
    pub fn new(grammar: &'g Grammar) -> Self {
        Self { grammar }
    }

    pub fn grammar(&self) -> &'g Grammar {
        self.grammar
    }

    /// Run `input` from the start symbol and return the trace and verdict.
    pub fn run(&self, input: &[Terminal]) -> Run {
        let mut config = Configuration::new(self.grammar);

        for (position, &symbol) in input.iter().enumerate() {
            if let Err(rejection) = config.step(position, symbol) {
                tracing::debug!(
                    grammar = %self.grammar.name(),
                    position,
                    symbol = %self.grammar.terminal_name(symbol),
                    "scanpath rejected"
                );
                return Run {
                    trace: config.trace,
                    verdict: Verdict::Rejected(rejection),
                };
            }
        }

        let verdict = config.finish(input.len());
        tracing::debug!(
            grammar = %self.grammar.name(),
            len = input.len(),
            steps = config.trace.len(),
            verdict = %verdict,
            "scanpath run finished"
        );
        Run {
            trace: config.trace,
            verdict,
        }
    }
}

/// Run `input` against `grammar`.
pub fn run(grammar: &Grammar, input: &[Terminal]) -> Run {
    Automaton::new(grammar).run(input)
}

/// The mutable state of one run. Remaining input is owned by the caller's
/// iteration in [`Automaton::run`].
struct Configuration<'g> {
    grammar: &'g Grammar,
    stack: Vec<Frame>,
    trace: Trace,
}

impl<'g> Configuration<'g> {
    fn new(grammar: &'g Grammar) -> Self {
        Self {
            grammar,
            stack: vec![Frame::unresolved(grammar.start())],
            trace: Trace::new(),
        }
    }

    /// Process one input symbol: push and pop as needed until it is shifted.
    fn step(&mut self, position: usize, symbol: Terminal) -> Result<(), Rejection> {
        loop {
            let Some(top) = self.stack.last().copied() else {
                return Err(Rejection {
                    position,
                    symbol,
                    reason: RejectReason::TrailingInput,
                });
            };

            let Some(alternative) = top.alternative else {
                let alt = self
                    .grammar
                    .predict(top.nonterminal, symbol)
                    .ok_or_else(|| self.unexpected(position, symbol, top.nonterminal))?;
                if let Some(frame) = self.stack.last_mut() {
                    frame.alternative = Some(alt);
                }
                self.record(position, Some(symbol), Action::Push, top.nonterminal, alt);
                continue;
            };

            match top.expected(self.grammar).map(|e| e.symbol) {
                None => self.pop(position, Some(symbol)),
                Some(Symbol::Terminal(expected)) if expected == symbol => {
                    if let Some(frame) = self.stack.last_mut() {
                        frame.position += 1;
                    }
                    self.record(position, Some(symbol), Action::Shift, top.nonterminal, alternative);
                    self.close_completed(position, Some(symbol));
                    return Ok(());
                }
                Some(Symbol::Terminal(expected)) => {
                    return Err(Rejection {
                        position,
                        symbol,
                        reason: RejectReason::UnexpectedSymbol {
                            nonterminal: top.nonterminal,
                            expected: vec![expected],
                        },
                    });
                }
                Some(Symbol::Nonterminal(child)) => {
                    let alt = self
                        .grammar
                        .predict(child, symbol)
                        .ok_or_else(|| self.unexpected(position, symbol, child))?;
                    self.stack.push(Frame::resolved(child, alt));
                    self.record(position, Some(symbol), Action::Push, child, alt);
                }
            }
        }
    }

    /// Decide the verdict once input is exhausted.
    fn finish(&mut self, end: usize) -> Verdict {
        if self.stack.is_empty() {
            return Verdict::Accepted;
        }
        if self.residual_is_nullable() {
            self.drain(end);
            if self.stack.is_empty() {
                return Verdict::Accepted;
            }
        }
        Verdict::AcceptedIncomplete(Residual::new(self.stack.clone()))
    }

    fn residual_is_nullable(&self) -> bool {
        let top = self.stack.len() - 1;
        self.stack.iter().enumerate().all(|(i, frame)| {
            if frame.alternative.is_none() {
                return self.grammar.is_nullable(frame.nonterminal);
            }
            self.grammar
                .is_nullable_sequence(frame.remaining(self.grammar, i != top))
        })
    }

    /// Close every open frame through empty derivations.
    fn drain(&mut self, end: usize) {
        while let Some(top) = self.stack.last().copied() {
            if top.alternative.is_none() {
                let Some(alt) = self.grammar.empty_alternative(top.nonterminal) else {
                    return;
                };
                if let Some(frame) = self.stack.last_mut() {
                    frame.alternative = Some(alt);
                }
                self.record(end, None, Action::Push, top.nonterminal, alt);
                continue;
            }
            match top.expected(self.grammar).map(|e| e.symbol) {
                None => self.pop(end, None),
                Some(Symbol::Nonterminal(child)) => {
                    let Some(alt) = self.grammar.empty_alternative(child) else {
                        return;
                    };
                    self.stack.push(Frame::resolved(child, alt));
                    self.record(end, None, Action::Push, child, alt);
                }
                Some(Symbol::Terminal(_)) => return,
            }
        }
    }

    /// Pop every complete frame, innermost first.
    fn close_completed(&mut self, position: usize, lookahead: Option<Terminal>) {
        while self
            .stack
            .last()
            .is_some_and(|frame| frame.is_complete(self.grammar))
        {
            self.pop(position, lookahead);
        }
    }

    fn pop(&mut self, position: usize, lookahead: Option<Terminal>) {
        let Some(frame) = self.stack.pop() else {
            return;
        };
        if let Some(parent) = self.stack.last_mut() {
            parent.position += 1;
        }
        let alternative = frame
            .alternative
            .unwrap_or(Grammar::CANONICAL_ALTERNATIVE);
        self.record(position, lookahead, Action::Pop, frame.nonterminal, alternative);
    }

    fn record(
        &mut self,
        position: usize,
        lookahead: Option<Terminal>,
        action: Action,
        nonterminal: Nonterminal,
        alternative: usize,
    ) {
        let depth = self.stack.len();
        tracing::trace!(
            position,
            action = %action,
            nonterminal = %self.grammar.nonterminal_name(nonterminal),
            alternative,
            depth,
            "automaton step"
        );
        self.trace.record(TraceEntry {
            position,
            lookahead,
            action,
            nonterminal,
            alternative,
            depth,
        });
    }

    fn unexpected(&self, position: usize, symbol: Terminal, nonterminal: Nonterminal) -> Rejection {
        Rejection {
            position,
            symbol,
            reason: RejectReason::UnexpectedSymbol {
                nonterminal,
                expected: self.grammar.expected(nonterminal),
            },
        }
    }
}
