//! YAML authoring surface for scanpath grammars.
//!
//! A declaration names the start task, the terminal alphabet (region labels)
//! and the production table. It is plain data; [`Grammar::new`] validates it
//! and builds the lookahead tables.
//!
//! ```yaml
//! name: "ecg-12-lead"
//! start: Exam
//! terminals: [II, V1, QRS, ST, T, QT]
//! productions:
//!   - nonterminal: Exam
//!     label: ECG examination
//!     alternatives:
//!       - ["RhythmCheck", "Verification!"]
//!   - nonterminal: Verification
//!     alternatives:
//!       - [QT]
//!       - []
//! ```
//!
//! A trailing `!` marks a nonterminal occurrence as mandatory. The long form
//! `{ symbol: Verification, mandatory: true }` is accepted as well.
//!
//! [`Grammar::new`]: super::Grammar::new

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Suffix marking a mandatory child in the short symbol form.
pub const MANDATORY_SUFFIX: char = '!';

/// Top-level grammar declaration.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct GrammarDeclaration {
    #[serde(default)]
    pub version: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    /// Name of the start nonterminal.
    pub start: String,
    /// The terminal alphabet, in declaration order.
    #[serde(default)]
    pub terminals: Vec<String>,
    #[serde(default)]
    pub productions: Vec<ProductionDeclaration>,
}

impl GrammarDeclaration {
    /// Parse a declaration from a YAML file.
    pub fn parse_file<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let content = fs::read_to_string(path.as_ref())?;
        Self::parse_str(&content)
    }

    /// Parse a declaration from YAML text.
    pub fn parse_str(content: &str) -> anyhow::Result<Self> {
        let declaration: GrammarDeclaration = serde_yaml::from_str(content)?;
        Ok(declaration)
    }
}

/// All alternatives of one nonterminal.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ProductionDeclaration {
    pub nonterminal: String,
    /// Human-readable task name used in diagnoses ("repolarization check").
    #[serde(default)]
    pub label: Option<String>,
    /// Ordered alternatives. The first one is the canonical alternative used
    /// for completion. An empty list derives the empty sequence.
    #[serde(default)]
    pub alternatives: Vec<Vec<SymbolRef>>,
}

/// One symbol occurrence inside an alternative.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(untagged)]
pub enum SymbolRef {
    /// `"Name"` or `"Name!"` (mandatory).
    Short(String),
    /// `{ symbol: Name, mandatory: true }`.
    Tagged {
        symbol: String,
        #[serde(default)]
        mandatory: bool,
    },
}

impl SymbolRef {
    /// Returns the referenced name and whether the occurrence is mandatory.
    pub fn resolve(&self) -> (&str, bool) {
        match self {
            SymbolRef::Short(s) => match s.strip_suffix(MANDATORY_SUFFIX) {
                Some(name) => (name, true),
                None => (s.as_str(), false),
            },
            SymbolRef::Tagged { symbol, mandatory } => (symbol.as_str(), *mandatory),
        }
    }
}
