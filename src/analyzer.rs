//! Analysis pipeline that runs the automaton, completion and diagnosis.

use rayon::prelude::*;
use serde::Serialize;

use crate::automaton::{Automaton, Run, Verdict};
use crate::complete::complete;
use crate::diagnose::{diagnose, MissingStep};
use crate::grammar::{Grammar, GrammarError, Terminal};

/// Everything known about one scanpath.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Analysis {
    pub input: Vec<Terminal>,
    pub run: Run,
    /// Suggested continuation; set for incomplete runs when completion is
    /// enabled.
    pub completion: Option<Vec<Terminal>>,
    /// Skipped mandatory steps. Always empty for rejected runs.
    pub missing_steps: Vec<MissingStep>,
    /// Whether `input ++ completion` was accepted when re-run from scratch.
    pub completion_verified: Option<bool>,
}

impl Analysis {
    pub fn verdict(&self) -> &Verdict {
        &self.run.verdict
    }

    /// The input followed by its completion, if one was computed.
    pub fn completed_scanpath(&self) -> Option<Vec<Terminal>> {
        let completion = self.completion.as_ref()?;
        let mut full = self.input.clone();
        full.extend_from_slice(completion);
        Some(full)
    }

    /// Accepted with every mandatory step performed.
    pub fn is_clean(&self) -> bool {
        self.run.verdict.is_accepted() && self.missing_steps.is_empty()
    }
}

/// Analyses scanpaths against one grammar.
pub struct Analyzer<'g> {
    grammar: &'g Grammar,
    completion: bool,
    diagnosis: bool,
    verification: bool,
}

impl<'g> Analyzer<'g> {
    /// Create an analyzer with completion, diagnosis and verification enabled.
    pub fn new(grammar: &'g Grammar) -> Self {
        Self {
            grammar,
            completion: true,
            diagnosis: true,
            verification: true,
        }
    }

    /// Set whether incomplete runs get a completion suggestion.
    pub fn with_completion(mut self, enabled: bool) -> Self {
        self.completion = enabled;
        self
    }

    /// Set whether traces are diagnosed for skipped mandatory steps.
    pub fn with_diagnosis(mut self, enabled: bool) -> Self {
        self.diagnosis = enabled;
        self
    }

    /// Set whether completions are re-run to confirm acceptance.
    pub fn with_verification(mut self, enabled: bool) -> Self {
        self.verification = enabled;
        self
    }

    pub fn grammar(&self) -> &'g Grammar {
        self.grammar
    }

    /// Analyse one scanpath.
    pub fn analyze(&self, input: &[Terminal]) -> Analysis {
        let automaton = Automaton::new(self.grammar);
        let run = automaton.run(input);

        let missing_steps = if self.diagnosis && !run.verdict.is_rejected() {
            diagnose(self.grammar, &run.trace)
        } else {
            Vec::new()
        };

        let completion = match (&run.verdict, self.completion) {
            (Verdict::AcceptedIncomplete(residual), true) => Some(complete(self.grammar, residual)),
            _ => None,
        };

        let completion_verified = match (&completion, self.verification) {
            (Some(suffix), true) => {
                let mut full = input.to_vec();
                full.extend_from_slice(suffix);
                let verified = automaton.run(&full).verdict.is_accepted();
                if !verified {
                    tracing::warn!(
                        grammar = %self.grammar.name(),
                        scanpath = %self.grammar.display_terminals(&full),
                        "completed scanpath was not accepted"
                    );
                }
                Some(verified)
            }
            _ => None,
        };

        Analysis {
            input: input.to_vec(),
            run,
            completion,
            missing_steps,
            completion_verified,
        }
    }

    /// Analyse a scanpath given as region labels.
    pub fn analyze_labels<I, S>(&self, labels: I) -> Result<Analysis, GrammarError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let input = self.grammar.scanpath(labels)?;
        Ok(self.analyze(&input))
    }

    /// Analyse many scanpaths in parallel. Results keep the input order.
    pub fn analyze_batch(&self, scanpaths: &[Vec<Terminal>]) -> Vec<Analysis> {
        let analyses: Vec<Analysis> = scanpaths
            .par_iter()
            .map(|input| self.analyze(input))
            .collect();
        tracing::debug!(
            grammar = %self.grammar.name(),
            scanpaths = analyses.len(),
            accepted = analyses.iter().filter(|a| a.verdict().is_accepted()).count(),
            "batch analysed"
        );
        analyses
    }
}
