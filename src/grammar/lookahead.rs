//! Nullable, FIRST and FOLLOW sets plus the LL(1) predict table.

use std::collections::{BTreeSet, HashMap};

use super::{GrammarError, Nonterminal, Production, Symbol, Terminal};

#[derive(Debug, Clone)]
pub(super) struct LookaheadTable {
    nullable: Vec<bool>,
    first: Vec<BTreeSet<Terminal>>,
    follow: Vec<BTreeSet<Terminal>>,
    predict: Vec<HashMap<Terminal, usize>>,
    empty_alternative: Vec<Option<usize>>,
}

impl LookaheadTable {
    /// Compute all sets and reject grammars that are not LL(1) or whose
    /// canonical expansion would not terminate.
    pub(super) fn build(
        productions: &[Production],
        terminal_names: &[String],
        start: Nonterminal,
    ) -> Result<Self, GrammarError> {
        let n = productions.len();
        let mut table = Self {
            nullable: vec![false; n],
            first: vec![BTreeSet::new(); n],
            follow: vec![BTreeSet::new(); n],
            predict: vec![HashMap::new(); n],
            empty_alternative: vec![None; n],
        };

        table.compute_nullable(productions);
        table.compute_first(productions);
        table.compute_follow(productions);
        table.compute_predict(productions, terminal_names)?;
        check_canonical_expansion(productions)?;
        warn_unreachable(productions, start);

        Ok(table)
    }

    pub(super) fn predict(&self, n: Nonterminal, lookahead: Terminal) -> Option<usize> {
        self.predict.get(n.0)?.get(&lookahead).copied()
    }

    pub(super) fn empty_alternative(&self, n: Nonterminal) -> Option<usize> {
        self.empty_alternative.get(n.0).copied().flatten()
    }

    pub(super) fn is_nullable(&self, n: Nonterminal) -> bool {
        self.nullable.get(n.0).copied().unwrap_or(false)
    }

    pub(super) fn first(&self, n: Nonterminal) -> &BTreeSet<Terminal> {
        &self.first[n.0]
    }

    pub(super) fn follow(&self, n: Nonterminal) -> &BTreeSet<Terminal> {
        &self.follow[n.0]
    }

    /// All lookaheads with a prediction for `n`, sorted.
    pub(super) fn predicted(&self, n: Nonterminal) -> Vec<Terminal> {
        let mut out: Vec<Terminal> = self
            .predict
            .get(n.0)
            .map(|p| p.keys().copied().collect())
            .unwrap_or_default();
        out.sort();
        out
    }

    fn compute_nullable(&mut self, productions: &[Production]) {
        let mut changed = true;
        while changed {
            changed = false;
            for (i, p) in productions.iter().enumerate() {
                if self.nullable[i] {
                    continue;
                }
                let any_empty = p
                    .alternatives
                    .iter()
                    .any(|alt| self.sequence_nullable(alt.elements().iter().map(|e| e.symbol)));
                if any_empty {
                    self.nullable[i] = true;
                    changed = true;
                }
            }
        }
    }

    fn compute_first(&mut self, productions: &[Production]) {
        let mut changed = true;
        while changed {
            changed = false;
            for (i, p) in productions.iter().enumerate() {
                for alt in &p.alternatives {
                    let (first, _) = self.sequence_first(alt.elements().iter().map(|e| e.symbol));
                    for t in first {
                        changed |= self.first[i].insert(t);
                    }
                }
            }
        }
    }

    fn compute_follow(&mut self, productions: &[Production]) {
        let mut changed = true;
        while changed {
            changed = false;
            for (i, p) in productions.iter().enumerate() {
                for alt in &p.alternatives {
                    let symbols: Vec<Symbol> = alt.elements().iter().map(|e| e.symbol).collect();
                    for (pos, symbol) in symbols.iter().enumerate() {
                        let Symbol::Nonterminal(child) = *symbol else {
                            continue;
                        };
                        let (rest_first, rest_nullable) =
                            self.sequence_first(symbols[pos + 1..].iter().copied());
                        for t in rest_first {
                            changed |= self.follow[child.0].insert(t);
                        }
                        if rest_nullable {
                            let parent_follow: Vec<Terminal> =
                                self.follow[i].iter().copied().collect();
                            for t in parent_follow {
                                changed |= self.follow[child.0].insert(t);
                            }
                        }
                    }
                }
            }
        }
    }

    fn compute_predict(
        &mut self,
        productions: &[Production],
        terminal_names: &[String],
    ) -> Result<(), GrammarError> {
        for (i, p) in productions.iter().enumerate() {
            for (alt_index, alt) in p.alternatives.iter().enumerate() {
                let (mut lookaheads, nullable) =
                    self.sequence_first(alt.elements().iter().map(|e| e.symbol));
                if nullable {
                    if let Some(previous) = self.empty_alternative[i] {
                        return Err(GrammarError::AmbiguousEmpty {
                            nonterminal: p.name.clone(),
                            first: previous,
                            second: alt_index,
                        });
                    }
                    self.empty_alternative[i] = Some(alt_index);
                    lookaheads.extend(self.follow[i].iter().copied());
                }
                for t in lookaheads {
                    if let Some(&previous) = self.predict[i].get(&t) {
                        if previous != alt_index {
                            return Err(GrammarError::Conflict {
                                nonterminal: p.name.clone(),
                                lookahead: terminal_names[t.0].clone(),
                                first: previous,
                                second: alt_index,
                            });
                        }
                    }
                    self.predict[i].insert(t, alt_index);
                }
            }
        }
        Ok(())
    }

    fn sequence_nullable(&self, mut symbols: impl Iterator<Item = Symbol>) -> bool {
        symbols.all(|s| match s {
            Symbol::Terminal(_) => false,
            Symbol::Nonterminal(n) => self.nullable[n.0],
        })
    }

    /// FIRST set of a symbol sequence and whether the whole sequence is nullable.
    fn sequence_first(&self, symbols: impl Iterator<Item = Symbol>) -> (BTreeSet<Terminal>, bool) {
        let mut out = BTreeSet::new();
        for s in symbols {
            match s {
                Symbol::Terminal(t) => {
                    out.insert(t);
                    return (out, false);
                }
                Symbol::Nonterminal(n) => {
                    out.extend(self.first[n.0].iter().copied());
                    if !self.nullable[n.0] {
                        return (out, false);
                    }
                }
            }
        }
        (out, true)
    }
}

/// Completion expands open tasks with their first alternative. Reject any
/// nonterminal whose first alternative reaches itself again.
fn check_canonical_expansion(productions: &[Production]) -> Result<(), GrammarError> {
    #[derive(Clone, Copy, PartialEq)]
    enum Mark {
        Unvisited,
        InProgress,
        Done,
    }

    fn visit(
        i: usize,
        productions: &[Production],
        marks: &mut [Mark],
    ) -> Result<(), GrammarError> {
        match marks[i] {
            Mark::Done => return Ok(()),
            Mark::InProgress => {
                return Err(GrammarError::CyclicCanonicalExpansion(
                    productions[i].name.clone(),
                ))
            }
            Mark::Unvisited => {}
        }
        marks[i] = Mark::InProgress;
        for e in productions[i].alternatives[0].elements() {
            if let Symbol::Nonterminal(child) = e.symbol {
                visit(child.0, productions, marks)?;
            }
        }
        marks[i] = Mark::Done;
        Ok(())
    }

    let mut marks = vec![Mark::Unvisited; productions.len()];
    for i in 0..productions.len() {
        visit(i, productions, &mut marks)?;
    }
    Ok(())
}

fn warn_unreachable(productions: &[Production], start: Nonterminal) {
    let mut reached = vec![false; productions.len()];
    let mut pending = vec![start.0];
    reached[start.0] = true;
    while let Some(i) = pending.pop() {
        for alt in &productions[i].alternatives {
            for e in alt.elements() {
                if let Symbol::Nonterminal(child) = e.symbol {
                    if !reached[child.0] {
                        reached[child.0] = true;
                        pending.push(child.0);
                    }
                }
            }
        }
    }
    for (i, p) in productions.iter().enumerate() {
        if !reached[i] {
            tracing::warn!(nonterminal = %p.name, "nonterminal is unreachable from the start symbol");
        }
    }
}
