//! Integration tests for the full analysis pipeline.
//!
//! These tests run the analyzer against the built-in clinical grammar and the
//! grammar fixtures under testdata.

use std::path::PathBuf;

use serde::Deserialize;

use scanpath_grammar::report::{format_json, JsonReport};
use scanpath_grammar::{
    clinical, complete, diagnose, run, Action, Analyzer, Grammar, GrammarError, RejectReason,
    Verdict,
};

fn testdata_path() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("testdata")
}

fn clinical_grammar() -> Grammar {
    clinical().expect("built-in grammar should build")
}

fn labels(grammar: &Grammar, terminals: &[scanpath_grammar::Terminal]) -> Vec<String> {
    terminals
        .iter()
        .map(|&t| grammar.terminal_name(t).to_string())
        .collect()
}

#[derive(Deserialize)]
struct RecordedScanpath {
    labels: Vec<String>,
    verdict: String,
}

fn recorded_scanpaths() -> Vec<RecordedScanpath> {
    let content = std::fs::read_to_string(testdata_path().join("recorded-scanpaths.yaml"))
        .expect("should read recorded scanpaths");
    serde_yaml::from_str(&content).expect("should parse recorded scanpaths")
}

#[test]
fn test_truncated_lead_inspection_end_to_end() {
    let grammar = clinical_grammar();
    let analysis = Analyzer::new(&grammar)
        .analyze_labels(["II", "V1", "QRS", "ST", "T"])
        .expect("labels should be in the alphabet");

    let residual = analysis.verdict().residual().expect("should be incomplete");
    let open: Vec<&str> = residual
        .frames()
        .iter()
        .map(|f| grammar.nonterminal_name(f.nonterminal))
        .collect();
    assert_eq!(open, vec!["Exam", "LeadInspection"]);
    assert_eq!(residual.frames()[0].position, 1);
    assert_eq!(residual.frames()[1].position, 2);

    let completion = analysis.completion.as_ref().expect("should be completed");
    assert_eq!(labels(&grammar, completion), vec!["QT"]);
    assert_eq!(analysis.completion_verified, Some(true));

    assert_eq!(analysis.missing_steps.len(), 1);
    let step = analysis.missing_steps[0];
    assert_eq!(grammar.nonterminal_name(step.parent), "Exam");
    assert_eq!(grammar.nonterminal_name(step.child), "Verification");
}

#[test]
fn test_missing_verification_is_named() {
    let grammar = clinical_grammar();
    // Rhythm check and two lead inspections, no QT.
    let analysis = Analyzer::new(&grammar)
        .analyze_labels(["II", "P", "V1", "QRS", "ST", "T", "V6", "QRS", "ST", "T"])
        .unwrap();

    assert!(analysis.verdict().is_incomplete());
    let children: Vec<&str> = analysis
        .missing_steps
        .iter()
        .map(|m| grammar.nonterminal_name(m.child))
        .collect();
    assert_eq!(children, vec!["Verification"]);
}

#[test]
fn test_skipped_repolarization_still_accepted() {
    let grammar = clinical_grammar();
    let analysis = Analyzer::new(&grammar)
        .analyze_labels(["II", "V1", "QRS", "QT"])
        .unwrap();

    assert_eq!(analysis.verdict(), &Verdict::Accepted);
    assert_eq!(analysis.missing_steps.len(), 1);
    assert_eq!(
        analysis.missing_steps[0].message(&grammar),
        "missing repolarization check"
    );
    assert!(!analysis.is_clean());
}

#[test]
fn test_rejection_names_task_and_position() {
    let grammar = clinical_grammar();
    let analysis = Analyzer::new(&grammar).analyze_labels(["QRS"]).unwrap();

    let rejection = analysis.verdict().rejection().expect("should be rejected");
    assert_eq!(rejection.position, 0);
    assert_eq!(grammar.terminal_name(rejection.symbol), "QRS");
    match &rejection.reason {
        RejectReason::UnexpectedSymbol {
            nonterminal,
            expected,
        } => {
            assert_eq!(grammar.nonterminal_name(*nonterminal), "Exam");
            assert_eq!(labels(&grammar, expected), vec!["II"]);
        }
        other => panic!("unexpected reason: {:?}", other),
    }
}

#[test]
fn test_recorded_scanpaths_batch() {
    let grammar = clinical_grammar();
    let recorded = recorded_scanpaths();
    let scanpaths: Vec<_> = recorded
        .iter()
        .map(|r| grammar.scanpath(&r.labels).expect("labels should be valid"))
        .collect();

    let analyses = Analyzer::new(&grammar).analyze_batch(&scanpaths);
    assert_eq!(analyses.len(), recorded.len());
    for (analysis, expected) in analyses.iter().zip(&recorded) {
        assert_eq!(
            analysis.verdict().as_str(),
            expected.verdict,
            "scanpath {:?}",
            expected.labels
        );
        if analysis.verdict().is_incomplete() {
            assert_eq!(analysis.completion_verified, Some(true));
        }
    }
}

#[test]
fn test_trace_depth_is_consistent() {
    let grammar = clinical_grammar();
    let input = grammar
        .scanpath(["II", "P", "V2", "QRS", "ST", "T", "V3", "QRS", "QT"])
        .unwrap();
    let result = run(&grammar, &input);
    assert!(result.verdict.is_accepted());

    let mut depth = 0usize;
    for entry in result.trace.iter() {
        match entry.action {
            // The start task is resolved in place at depth 1.
            Action::Push if depth == 0 => depth = 1,
            Action::Push => depth += 1,
            Action::Pop => depth -= 1,
            Action::Shift => {}
        }
        assert_eq!(entry.depth, depth);
    }
    assert_eq!(depth, 0);
    assert_eq!(result.trace.count(Action::Shift), input.len());
}

#[test]
fn test_screening_grammar_from_file() {
    let grammar =
        Grammar::load(testdata_path().join("ecg-screening.yaml")).expect("should load grammar");
    assert_eq!(grammar.name(), "ecg-screening");
    assert_eq!(grammar.nonterminal_name(grammar.start()), "Screening");

    let accepted = Analyzer::new(&grammar)
        .analyze_labels(["II", "V2", "QRS", "V5", "QRS", "ST", "QT"])
        .unwrap();
    assert!(accepted.is_clean());

    let partial = Analyzer::new(&grammar).analyze_labels(["II", "V5"]).unwrap();
    assert!(partial.verdict().is_incomplete());
    assert_eq!(
        labels(&grammar, partial.completion.as_ref().unwrap()),
        vec!["QRS", "ST", "QT"]
    );
    let messages: Vec<String> = partial
        .missing_steps
        .iter()
        .map(|m| m.message(&grammar))
        .collect();
    assert_eq!(
        messages,
        vec!["missing QRS-ST assessment", "missing QT interval check"]
    );
    assert_eq!(partial.missing_steps[0].depth, 2);
    assert_eq!(partial.missing_steps[1].depth, 1);
}

#[test]
fn test_conflicting_grammar_rejected_at_load() {
    let err = Grammar::load(testdata_path().join("malformed-conflict.yaml"))
        .expect_err("conflicting grammar should not build");
    let grammar_err = err
        .downcast_ref::<GrammarError>()
        .expect("should be a grammar error");
    assert_eq!(
        grammar_err,
        &GrammarError::Conflict {
            nonterminal: "Lead".into(),
            lookahead: "V1".into(),
            first: 0,
            second: 1,
        }
    );
    assert!(grammar_err.is_malformed_grammar());
}

#[test]
fn test_undeclared_symbol_rejected_at_load() {
    let err = Grammar::load(testdata_path().join("malformed-undeclared.yaml")).unwrap_err();
    assert!(matches!(
        err.downcast_ref::<GrammarError>(),
        Some(GrammarError::UndeclaredSymbol { symbol, .. }) if symbol == "Verification"
    ));
}

#[test]
fn test_missing_file_is_error() {
    assert!(Grammar::load(testdata_path().join("does-not-exist.yaml")).is_err());
}

#[test]
fn test_grammar_written_to_temp_file() {
    let temp = tempfile::TempDir::new().unwrap();
    let path = temp.path().join("holter.yaml");
    std::fs::write(
        &path,
        r#"
name: "holter-review"
start: Review
terminals: [strip, event, summary]
productions:
  - nonterminal: Review
    label: holter review
    alternatives:
      - [Events, "Summary!"]
  - nonterminal: Events
    label: event review
    alternatives:
      - []
      - [event, Events]
  - nonterminal: Summary
    label: summary sign-off
    alternatives:
      - [summary]
"#,
    )
    .unwrap();

    let grammar = Grammar::load(&path).expect("should load temp grammar");
    let analyzer = Analyzer::new(&grammar);

    let result = analyzer.analyze_labels(["event", "event"]).unwrap();
    assert_eq!(
        labels(&grammar, result.completion.as_ref().unwrap()),
        vec!["summary"]
    );
    assert_eq!(
        result.missing_steps[0].message(&grammar),
        "missing summary sign-off"
    );

    assert!(analyzer.analyze_labels(["summary"]).unwrap().is_clean());
    assert!(analyzer
        .analyze_labels(["strip"])
        .unwrap()
        .verdict()
        .is_rejected());
}

#[test]
fn test_components_compose_without_analyzer() {
    let grammar = clinical_grammar();
    let input = grammar.scanpath(["II", "V4", "QRS", "ST"]).unwrap();
    let result = run(&grammar, &input);
    let residual = result.verdict.residual().unwrap();

    let suffix = complete(&grammar, residual);
    assert_eq!(labels(&grammar, &suffix), vec!["T", "QT"]);

    let missing = diagnose(&grammar, &result.trace);
    let children: Vec<&str> = missing
        .iter()
        .map(|m| grammar.nonterminal_name(m.child))
        .collect();
    assert_eq!(children, vec!["Verification"]);
}

#[test]
fn test_json_report_round_trips() {
    let grammar = clinical_grammar();
    let analysis = Analyzer::new(&grammar)
        .analyze_labels(["II", "V1", "QRS", "ST", "T"])
        .unwrap();
    let json = format_json(&grammar, &analysis).expect("should serialize");
    let report: JsonReport = serde_json::from_str(&json).expect("should deserialize");

    assert_eq!(report.verdict, "incomplete");
    assert_eq!(report.input, vec!["II", "V1", "QRS", "ST", "T"]);
    assert_eq!(report.completion, Some(vec!["QT".to_string()]));
    assert_eq!(report.completion_verified, Some(true));
    assert_eq!(report.missing_steps.len(), 1);
    assert_eq!(report.trace.len(), analysis.run.trace.len());
}
