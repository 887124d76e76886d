//! Missing-step diagnosis.
//!
//! A mandatory child of a task is *performed* when the child's frame consumed
//! at least one terminal, either directly or through its own children. The
//! diagnoser replays a derivation trace and reports every mandatory child a
//! task closed without performing, plus those still unperformed in tasks left
//! open at the end of the trace. Diagnosis is read-only: it never changes a
//! verdict.

use serde::Serialize;

use crate::automaton::{Action, Trace};
use crate::grammar::{Element, Grammar, Nonterminal, Symbol};

/// A mandatory sub-task that was skipped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MissingStep {
    /// The task that should have performed the step.
    pub parent: Nonterminal,
    /// The skipped step.
    pub child: Nonterminal,
    /// Trace entry at which the omission was detected: the parent's pop, or
    /// the trace length for tasks still open.
    pub trace_index: usize,
    /// Input position at detection.
    pub position: usize,
    /// Stack depth of the parent task, 1 for the start task.
    pub depth: usize,
}

impl MissingStep {
    /// Whether the omission was found in a task that never closed.
    pub fn in_open_task(&self, trace: &Trace) -> bool {
        self.trace_index >= trace.len()
    }

    /// Short message such as `missing repolarization check`.
    pub fn message(&self, grammar: &Grammar) -> String {
        format!("missing {}", grammar.production(self.child).label())
    }

    /// Full message naming the parent task and the detection position.
    pub fn describe(&self, grammar: &Grammar) -> String {
        format!(
            "{} in {} ({} → {}, detected at position {})",
            self.message(grammar),
            grammar.production(self.parent).label(),
            grammar.nonterminal_name(self.parent),
            grammar.nonterminal_name(self.child),
            self.position
        )
    }
}

/// Replay state of one frame.
struct Replayed<'g> {
    nonterminal: Nonterminal,
    elements: &'g [Element],
    cursor: usize,
    performed: Vec<bool>,
}

impl<'g> Replayed<'g> {
    /// `None` when the frame does not belong to `grammar`.
    fn new(grammar: &'g Grammar, nonterminal: Nonterminal, alternative: usize) -> Option<Self> {
        let elements = grammar.get_alternative(nonterminal, alternative)?.elements();
        Some(Self {
            nonterminal,
            elements,
            cursor: 0,
            performed: vec![false; elements.len()],
        })
    }

    fn mark_cursor(&mut self) {
        if let Some(slot) = self.performed.get_mut(self.cursor) {
            *slot = true;
        }
    }

    /// Mandatory nonterminal children not performed, in alternative order.
    fn unperformed(&self) -> impl Iterator<Item = Nonterminal> + '_ {
        self.elements
            .iter()
            .zip(&self.performed)
            .filter_map(|(element, &performed)| match element.symbol {
                Symbol::Nonterminal(child) if element.mandatory && !performed => Some(child),
                _ => None,
            })
    }
}

/// Replay `trace` and list the skipped mandatory steps in detection order.
///
/// Steps are reported when their parent pops; tasks still open when the
/// trace ends are reported last, innermost first. An empty trace is a run
/// whose start task never resolved, so the start symbol's canonical
/// alternative reports every mandatory child.
///
/// Replay stops at the first entry that names a frame outside `grammar`;
/// frames opened before it are still reported.
pub fn diagnose(grammar: &Grammar, trace: &Trace) -> Vec<MissingStep> {
    let mut stack: Vec<Replayed> = Vec::new();
    let mut missing = Vec::new();
    let mut end = 0;

    if trace.is_empty() {
        stack.extend(Replayed::new(
            grammar,
            grammar.start(),
            Grammar::CANONICAL_ALTERNATIVE,
        ));
    }

    for (index, entry) in trace.iter().enumerate() {
        end = end.max(match entry.action {
            Action::Shift => entry.position + 1,
            _ => entry.position,
        });

        match entry.action {
            Action::Push => {
                let Some(frame) = Replayed::new(grammar, entry.nonterminal, entry.alternative)
                else {
                    tracing::warn!(
                        grammar = %grammar.name(),
                        trace_index = index,
                        "trace entry names a frame outside the grammar; replay stopped"
                    );
                    break;
                };
                stack.push(frame);
            }
            Action::Shift => {
                let Some((top, below)) = stack.split_last_mut() else {
                    continue;
                };
                for frame in below {
                    frame.mark_cursor();
                }
                top.cursor += 1;
            }
            Action::Pop => {
                let Some(frame) = stack.pop() else {
                    continue;
                };
                let depth = stack.len() + 1;
                missing.extend(frame.unperformed().map(|child| MissingStep {
                    parent: frame.nonterminal,
                    child,
                    trace_index: index,
                    position: entry.position,
                    depth,
                }));
                if let Some(parent) = stack.last_mut() {
                    parent.cursor += 1;
                }
            }
        }
    }

    for (i, frame) in stack.iter().enumerate().rev() {
        missing.extend(frame.unperformed().map(|child| MissingStep {
            parent: frame.nonterminal,
            child,
            trace_index: trace.len(),
            position: end,
            depth: i + 1,
        }));
    }

    if !missing.is_empty() {
        tracing::debug!(
            grammar = %grammar.name(),
            count = missing.len(),
            "missing mandatory steps"
        );
    }
    missing
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::automaton::run;
    use crate::grammar::clinical;

    fn diagnose_labels(g: &Grammar, labels: &[&str]) -> (Trace, Vec<MissingStep>) {
        let input = g.scanpath(labels).unwrap();
        let trace = run(g, &input).trace;
        let missing = diagnose(g, &trace);
        (trace, missing)
    }

    fn pairs(g: &Grammar, missing: &[MissingStep]) -> Vec<(String, String)> {
        missing
            .iter()
            .map(|m| {
                (
                    g.nonterminal_name(m.parent).to_string(),
                    g.nonterminal_name(m.child).to_string(),
                )
            })
            .collect()
    }

    #[test]
    fn test_complete_examination_has_no_missing_steps() {
        let g = clinical().unwrap();
        let (_, missing) = diagnose_labels(&g, &["II", "P", "V1", "QRS", "ST", "T", "QT"]);
        assert!(missing.is_empty());
    }

    #[test]
    fn test_open_exam_missing_verification() {
        let g = clinical().unwrap();
        let (trace, missing) = diagnose_labels(&g, &["II", "V1", "QRS", "ST", "T"]);
        assert_eq!(
            pairs(&g, &missing),
            vec![("Exam".to_string(), "Verification".to_string())]
        );
        let step = missing[0];
        assert_eq!(step.position, 5);
        assert_eq!(step.depth, 1);
        assert!(step.in_open_task(&trace));
        assert_eq!(step.message(&g), "missing closing verification");
    }

    #[test]
    fn test_skipped_repolarization_in_accepted_run() {
        let g = clinical().unwrap();
        let input = g.scanpath(["II", "V1", "QRS", "QT"]).unwrap();
        let result = run(&g, &input);
        assert!(result.verdict.is_accepted());

        let missing = diagnose(&g, &result.trace);
        assert_eq!(
            pairs(&g, &missing),
            vec![("Morphology".to_string(), "Repolarization".to_string())]
        );
        let step = missing[0];
        assert_eq!(step.position, 3);
        assert_eq!(result.trace.entries()[step.trace_index].action, Action::Pop);
        assert!(!step.in_open_task(&result.trace));
        assert_eq!(step.message(&g), "missing repolarization check");
        assert!(step.describe(&g).contains("Morphology → Repolarization"));
    }

    #[test]
    fn test_each_lead_diagnosed_separately() {
        let g = clinical().unwrap();
        let (_, missing) = diagnose_labels(
            &g,
            &["II", "V1", "QRS", "ST", "T", "V2", "QRS", "V3", "QRS", "QT"],
        );
        assert_eq!(missing.len(), 2);
        assert!(missing
            .iter()
            .all(|m| g.nonterminal_name(m.child) == "Repolarization"));
        assert!(missing[0].trace_index < missing[1].trace_index);
    }

    #[test]
    fn test_open_tasks_reported_innermost_first() {
        let g = clinical().unwrap();
        // The open morphology frame has not reached repolarization yet.
        let (_, missing) = diagnose_labels(&g, &["II", "V1", "QRS"]);
        assert_eq!(
            pairs(&g, &missing),
            vec![
                ("Morphology".to_string(), "Repolarization".to_string()),
                ("Exam".to_string(), "Verification".to_string()),
            ]
        );
        assert_eq!(missing[0].depth, 3);
        assert_eq!(missing[1].depth, 1);
    }

    #[test]
    fn test_optional_children_not_reported() {
        let g = clinical().unwrap();
        // RhythmDetail and MoreLeads are optional.
        let (_, missing) = diagnose_labels(&g, &["II", "V1", "QRS", "ST", "T", "QT"]);
        assert!(missing.is_empty());
    }

    #[test]
    fn test_empty_scanpath_misses_every_top_level_step() {
        let g = clinical().unwrap();
        let (trace, missing) = diagnose_labels(&g, &[]);
        assert!(trace.is_empty());
        assert_eq!(
            pairs(&g, &missing),
            vec![
                ("Exam".to_string(), "RhythmCheck".to_string()),
                ("Exam".to_string(), "LeadInspection".to_string()),
                ("Exam".to_string(), "Verification".to_string()),
            ]
        );
        assert!(missing
            .iter()
            .all(|m| m.position == 0 && m.depth == 1 && m.in_open_task(&trace)));
    }

    #[test]
    fn test_empty_trace_of_optional_start_has_no_diagnoses() {
        let g = Grammar::from_yaml(
            r#"
start: S
terminals: [a]
productions:
  - nonterminal: S
    alternatives: [[], [a, S]]
"#,
        )
        .unwrap();
        assert!(diagnose(&g, &Trace::new()).is_empty());
    }

    #[test]
    fn test_foreign_trace_entries_stop_replay() {
        let g = clinical().unwrap();
        // Exam resolved, then a push naming an alternative Exam does not have.
        let trace: Trace = serde_json::from_str(
            r#"{"entries": [
                {"position": 0, "lookahead": 0, "action": "push", "nonterminal": 0, "alternative": 0, "depth": 1},
                {"position": 0, "lookahead": 0, "action": "push", "nonterminal": 0, "alternative": 7, "depth": 2},
                {"position": 0, "lookahead": 0, "action": "pop", "nonterminal": 99, "alternative": 0, "depth": 1}
            ]}"#,
        )
        .unwrap();
        let missing = diagnose(&g, &trace);
        let children: Vec<&str> = missing.iter().map(|m| g.nonterminal_name(m.child)).collect();
        assert_eq!(children, vec!["RhythmCheck", "LeadInspection", "Verification"]);
    }

    #[test]
    fn test_mandatory_nullable_child_at_top_level() {
        let g = Grammar::from_yaml(
            r#"
start: S
terminals: [a, b]
productions:
  - nonterminal: S
    label: session
    alternatives: [[a, "Check!"]]
  - nonterminal: Check
    label: follow-up check
    alternatives: [[b], []]
"#,
        )
        .unwrap();
        let a = g.terminal("a").unwrap();
        let result = run(&g, &[a]);
        assert!(result.verdict.is_accepted());

        let missing = diagnose(&g, &result.trace);
        assert_eq!(missing.len(), 1);
        assert_eq!(missing[0].position, 1);
        assert_eq!(missing[0].message(&g), "missing follow-up check");
    }
}
