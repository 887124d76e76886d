//! Static scanpath grammars.
//!
//! A [`Grammar`] is built once from a [`GrammarDeclaration`] and is read-only
//! afterwards. Construction validates every reference, computes the LL(1)
//! lookahead tables and rejects grammars the automaton could not run
//! deterministically. Runs borrow the grammar, so one grammar can serve any
//! number of concurrent runs.

mod declaration;
mod error;
mod lookahead;

use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};
use std::path::Path;

pub use declaration::{GrammarDeclaration, ProductionDeclaration, SymbolRef, MANDATORY_SUFFIX};
pub use error::GrammarError;

use lookahead::LookaheadTable;

lazy_static! {
    /// Valid terminal and nonterminal labels.
    static ref LABEL_PATTERN: Regex = Regex::new(r"^[A-Za-z0-9_][A-Za-z0-9_.\-]*$").unwrap();
}

/// Built-in 12-lead ECG reading grammar.
const CLINICAL_GRAMMAR: &str = include_str!("clinical.yaml");

/// A region-of-interest label from the grammar alphabet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Terminal(usize);

impl Terminal {
    /// Position of this terminal in the alphabet.
    pub fn index(self) -> usize {
        self.0
    }
}

/// A clinical task category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Nonterminal(usize);

impl Nonterminal {
    /// Position of this nonterminal in the production table.
    pub fn index(self) -> usize {
        self.0
    }
}

/// Either kind of grammar symbol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Symbol {
    Terminal(Terminal),
    Nonterminal(Nonterminal),
}

/// One symbol occurrence inside an alternative.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Element {
    pub symbol: Symbol,
    /// Only ever true for nonterminal occurrences.
    pub mandatory: bool,
}

/// An ordered sequence of symbols.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Alternative {
    elements: Vec<Element>,
}

impl Alternative {
    pub fn elements(&self) -> &[Element] {
        &self.elements
    }

    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    /// The element at `position`, or `None` past the end.
    pub fn get(&self, position: usize) -> Option<&Element> {
        self.elements.get(position)
    }
}

/// All alternatives of one nonterminal.
#[derive(Debug, Clone)]
pub struct Production {
    name: String,
    label: Option<String>,
    alternatives: Vec<Alternative>,
}

impl Production {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Human task name, falling back to the nonterminal name.
    pub fn label(&self) -> &str {
        self.label.as_deref().unwrap_or(&self.name)
    }

    pub fn alternatives(&self) -> &[Alternative] {
        &self.alternatives
    }
}

/// An immutable, validated LL(1) scanpath grammar.
#[derive(Debug, Clone)]
pub struct Grammar {
    name: String,
    description: Option<String>,
    terminals: Vec<String>,
    terminal_ids: HashMap<String, Terminal>,
    productions: Vec<Production>,
    nonterminal_ids: HashMap<String, Nonterminal>,
    start: Nonterminal,
    table: LookaheadTable,
}

/// Build the built-in clinical grammar.
///
/// Alphabet: `II, V1..V6, P, QRS, ST, T, QT`. An examination is a rhythm
/// check on lead II (optionally with the P wave), one or more precordial lead
/// inspections (QRS then ST/T repolarization) and a closing QT verification.
pub fn clinical() -> anyhow::Result<Grammar> {
    Grammar::from_yaml(CLINICAL_GRAMMAR)
}

impl Grammar {
    /// Validate a declaration and build the grammar.
    pub fn new(declaration: &GrammarDeclaration) -> Result<Self, GrammarError> {
        if declaration.terminals.is_empty() {
            return Err(GrammarError::EmptyAlphabet);
        }

        let mut terminal_ids = HashMap::new();
        for (i, name) in declaration.terminals.iter().enumerate() {
            check_label(name)?;
            if terminal_ids.insert(name.clone(), Terminal(i)).is_some() {
                return Err(GrammarError::DuplicateTerminal(name.clone()));
            }
        }

        let mut nonterminal_ids = HashMap::new();
        for (i, p) in declaration.productions.iter().enumerate() {
            check_label(&p.nonterminal)?;
            if terminal_ids.contains_key(&p.nonterminal) {
                return Err(GrammarError::NameClash(p.nonterminal.clone()));
            }
            if nonterminal_ids
                .insert(p.nonterminal.clone(), Nonterminal(i))
                .is_some()
            {
                return Err(GrammarError::DuplicateNonterminal(p.nonterminal.clone()));
            }
        }

        let start = *nonterminal_ids
            .get(&declaration.start)
            .ok_or_else(|| GrammarError::UnknownStart(declaration.start.clone()))?;

        let mut productions = Vec::with_capacity(declaration.productions.len());
        for p in &declaration.productions {
            if p.alternatives.is_empty() {
                return Err(GrammarError::NoAlternatives(p.nonterminal.clone()));
            }
            let mut alternatives = Vec::with_capacity(p.alternatives.len());
            for alt in &p.alternatives {
                let mut elements = Vec::with_capacity(alt.len());
                for symbol_ref in alt {
                    let (name, mandatory) = symbol_ref.resolve();
                    let symbol = if let Some(&t) = terminal_ids.get(name) {
                        if mandatory {
                            return Err(GrammarError::MandatoryTerminal {
                                nonterminal: p.nonterminal.clone(),
                                terminal: name.to_string(),
                            });
                        }
                        Symbol::Terminal(t)
                    } else if let Some(&n) = nonterminal_ids.get(name) {
                        Symbol::Nonterminal(n)
                    } else {
                        return Err(GrammarError::UndeclaredSymbol {
                            nonterminal: p.nonterminal.clone(),
                            symbol: name.to_string(),
                        });
                    };
                    elements.push(Element { symbol, mandatory });
                }
                alternatives.push(Alternative { elements });
            }
            productions.push(Production {
                name: p.nonterminal.clone(),
                label: p.label.clone(),
                alternatives,
            });
        }

        let table = LookaheadTable::build(&productions, &declaration.terminals, start)?;

        tracing::debug!(
            grammar = %declaration.name,
            terminals = declaration.terminals.len(),
            nonterminals = productions.len(),
            "built scanpath grammar"
        );

        Ok(Self {
            name: declaration.name.clone(),
            description: declaration.description.clone(),
            terminals: declaration.terminals.clone(),
            terminal_ids,
            productions,
            nonterminal_ids,
            start,
            table,
        })
    }

    /// Parse and build a grammar from a YAML declaration file.
    pub fn load<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let declaration = GrammarDeclaration::parse_file(path)?;
        Ok(Self::new(&declaration)?)
    }

    /// Parse and build a grammar from YAML text.
    pub fn from_yaml(content: &str) -> anyhow::Result<Self> {
        let declaration = GrammarDeclaration::parse_str(content)?;
        Ok(Self::new(&declaration)?)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn start(&self) -> Nonterminal {
        self.start
    }

    /// All terminals, in declaration order.
    pub fn alphabet(&self) -> impl Iterator<Item = Terminal> + '_ {
        (0..self.terminals.len()).map(Terminal)
    }

    /// All nonterminals, in declaration order.
    pub fn nonterminals(&self) -> impl Iterator<Item = Nonterminal> + '_ {
        (0..self.productions.len()).map(Nonterminal)
    }

    /// Look up a terminal by label.
    pub fn terminal(&self, label: &str) -> Result<Terminal, GrammarError> {
        self.terminal_ids
            .get(label)
            .copied()
            .ok_or_else(|| GrammarError::UnknownTerminal(label.to_string()))
    }

    /// Look up a nonterminal by name.
    pub fn nonterminal(&self, name: &str) -> Option<Nonterminal> {
        self.nonterminal_ids.get(name).copied()
    }

    /// Convert region labels into an input sequence, rejecting any label
    /// outside the alphabet.
    pub fn scanpath<I, S>(&self, labels: I) -> Result<Vec<Terminal>, GrammarError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        labels
            .into_iter()
            .map(|label| self.terminal(label.as_ref()))
            .collect()
    }

    pub fn terminal_name(&self, t: Terminal) -> &str {
        self.terminals.get(t.0).map(String::as_str).unwrap_or("?")
    }

    pub fn nonterminal_name(&self, n: Nonterminal) -> &str {
        self.productions.get(n.0).map(Production::name).unwrap_or("?")
    }

    pub fn symbol_name(&self, symbol: Symbol) -> &str {
        match symbol {
            Symbol::Terminal(t) => self.terminal_name(t),
            Symbol::Nonterminal(n) => self.nonterminal_name(n),
        }
    }

    /// Join terminal labels for display.
    pub fn display_terminals(&self, terminals: &[Terminal]) -> String {
        terminals
            .iter()
            .map(|&t| self.terminal_name(t))
            .collect::<Vec<_>>()
            .join(" → ")
    }

    /// The production of `n`. Panics if `n` comes from another grammar.
    pub fn production(&self, n: Nonterminal) -> &Production {
        &self.productions[n.0]
    }

    /// One alternative of `n`. Panics if either index is out of range.
    pub fn alternative(&self, n: Nonterminal, alternative: usize) -> &Alternative {
        &self.productions[n.0].alternatives[alternative]
    }

    /// One alternative of `n`, or `None` if `n` or `alternative` does not
    /// belong to this grammar.
    pub fn get_alternative(&self, n: Nonterminal, alternative: usize) -> Option<&Alternative> {
        self.productions.get(n.0)?.alternatives.get(alternative)
    }

    /// The alternative predicted for `n` when the next input is `lookahead`.
    pub fn predict(&self, n: Nonterminal, lookahead: Terminal) -> Option<usize> {
        self.table.predict(n, lookahead)
    }

    /// The alternative of `n` deriving the empty sequence, if any.
    pub fn empty_alternative(&self, n: Nonterminal) -> Option<usize> {
        self.table.empty_alternative(n)
    }

    pub fn is_nullable(&self, n: Nonterminal) -> bool {
        self.table.is_nullable(n)
    }

    /// Whether every element of `elements` can derive the empty sequence.
    pub fn is_nullable_sequence(&self, elements: &[Element]) -> bool {
        elements.iter().all(|e| match e.symbol {
            Symbol::Terminal(_) => false,
            Symbol::Nonterminal(n) => self.table.is_nullable(n),
        })
    }

    /// Terminals that can begin a derivation of `n`.
    pub fn first(&self, n: Nonterminal) -> &BTreeSet<Terminal> {
        self.table.first(n)
    }

    /// Terminals that can follow `n`.
    pub fn follow(&self, n: Nonterminal) -> &BTreeSet<Terminal> {
        self.table.follow(n)
    }

    /// Terminals that would let `n` make progress, for rejection messages.
    pub fn expected(&self, n: Nonterminal) -> Vec<Terminal> {
        self.table.predicted(n)
    }

    /// Index of the canonical alternative of every nonterminal.
    ///
    /// Completion always expands open tasks with their first-declared
    /// alternative. Construction guarantees this expansion terminates.
    pub const CANONICAL_ALTERNATIVE: usize = 0;

    /// Terminal yield of `n` under the canonical alternative policy.
    pub fn canonical_yield(&self, n: Nonterminal) -> Vec<Terminal> {
        let mut out = Vec::new();
        self.push_canonical_yield(n, &mut out);
        out
    }

    pub(crate) fn push_canonical_yield(&self, n: Nonterminal, out: &mut Vec<Terminal>) {
        let alt = self.alternative(n, Self::CANONICAL_ALTERNATIVE);
        self.push_sequence_yield(alt.elements(), out);
    }

    /// Append the canonical yield of each element in order.
    pub(crate) fn push_sequence_yield(&self, elements: &[Element], out: &mut Vec<Terminal>) {
        for e in elements {
            match e.symbol {
                Symbol::Terminal(t) => out.push(t),
                Symbol::Nonterminal(child) => self.push_canonical_yield(child, out),
            }
        }
    }
}

fn check_label(label: &str) -> Result<(), GrammarError> {
    if LABEL_PATTERN.is_match(label) {
        Ok(())
    } else {
        Err(GrammarError::InvalidLabel(label.to_string()))
    }
}
