//! Output formatting for analysis results.
//!
//! Supports two output formats:
//! - Pretty: colored terminal output for human readability
//! - JSON: structured output with every symbol resolved to its name

use colored::*;
use serde::{Deserialize, Serialize};

use crate::analyzer::Analysis;
use crate::automaton::{Action, RejectReason, Trace, TraceEntry, Verdict};
use crate::diagnose::MissingStep;
use crate::grammar::{Grammar, Terminal};

// =============================================================================
// JSON Format
// =============================================================================

/// JSON report for one analysed scanpath.
#[derive(Debug, Serialize, Deserialize)]
pub struct JsonReport {
    pub version: String,
    pub grammar: String,
    pub input: Vec<String>,
    pub verdict: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rejection: Option<JsonRejection>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub open_tasks: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completion: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completion_verified: Option<bool>,
    pub missing_steps: Vec<JsonMissingStep>,
    pub trace: Vec<JsonTraceEntry>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct JsonRejection {
    pub position: usize,
    pub symbol: String,
    /// `unexpected_symbol` or `trailing_input`.
    pub reason: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nonterminal: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub expected: Vec<String>,
    pub message: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct JsonMissingStep {
    pub parent: String,
    pub child: String,
    pub message: String,
    pub position: usize,
    pub trace_index: usize,
    pub depth: usize,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct JsonTraceEntry {
    pub position: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lookahead: Option<String>,
    pub action: Action,
    pub nonterminal: String,
    pub alternative: usize,
    pub depth: usize,
}

impl JsonReport {
    /// Build a report with grammar names resolved.
    pub fn from_analysis(grammar: &Grammar, analysis: &Analysis) -> Self {
        let verdict = analysis.verdict();

        let rejection = verdict.rejection().map(|r| {
            let (reason, nonterminal, expected) = match &r.reason {
                RejectReason::UnexpectedSymbol {
                    nonterminal,
                    expected,
                } => (
                    "unexpected_symbol",
                    Some(grammar.nonterminal_name(*nonterminal).to_string()),
                    names(grammar, expected),
                ),
                RejectReason::TrailingInput => ("trailing_input", None, Vec::new()),
            };
            JsonRejection {
                position: r.position,
                symbol: grammar.terminal_name(r.symbol).to_string(),
                reason: reason.to_string(),
                nonterminal,
                expected,
                message: r.describe(grammar),
            }
        });

        let open_tasks = verdict
            .residual()
            .map(|residual| {
                residual
                    .open_tasks()
                    .into_iter()
                    .map(|n| grammar.nonterminal_name(n).to_string())
                    .collect()
            })
            .unwrap_or_default();

        Self {
            version: env!("CARGO_PKG_VERSION").to_string(),
            grammar: grammar.name().to_string(),
            input: names(grammar, &analysis.input),
            verdict: verdict.as_str().to_string(),
            rejection,
            open_tasks,
            completion: analysis.completion.as_ref().map(|c| names(grammar, c)),
            completion_verified: analysis.completion_verified,
            missing_steps: analysis
                .missing_steps
                .iter()
                .map(|m| missing_step_to_json(grammar, m))
                .collect(),
            trace: analysis
                .run
                .trace
                .iter()
                .map(|e| trace_entry_to_json(grammar, e))
                .collect(),
        }
    }
}

fn names(grammar: &Grammar, terminals: &[Terminal]) -> Vec<String> {
    terminals
        .iter()
        .map(|&t| grammar.terminal_name(t).to_string())
        .collect()
}

fn missing_step_to_json(grammar: &Grammar, m: &MissingStep) -> JsonMissingStep {
    JsonMissingStep {
        parent: grammar.nonterminal_name(m.parent).to_string(),
        child: grammar.nonterminal_name(m.child).to_string(),
        message: m.message(grammar),
        position: m.position,
        trace_index: m.trace_index,
        depth: m.depth,
    }
}

fn trace_entry_to_json(grammar: &Grammar, e: &TraceEntry) -> JsonTraceEntry {
    JsonTraceEntry {
        position: e.position,
        lookahead: e.lookahead.map(|t| grammar.terminal_name(t).to_string()),
        action: e.action,
        nonterminal: grammar.nonterminal_name(e.nonterminal).to_string(),
        alternative: e.alternative,
        depth: e.depth,
    }
}

/// Render one analysis as pretty-printed JSON.
pub fn format_json(grammar: &Grammar, analysis: &Analysis) -> anyhow::Result<String> {
    let report = JsonReport::from_analysis(grammar, analysis);
    Ok(serde_json::to_string_pretty(&report)?)
}

/// Render a batch of analyses as a pretty-printed JSON array.
pub fn format_json_batch(grammar: &Grammar, analyses: &[Analysis]) -> anyhow::Result<String> {
    let reports: Vec<JsonReport> = analyses
        .iter()
        .map(|a| JsonReport::from_analysis(grammar, a))
        .collect();
    Ok(serde_json::to_string_pretty(&reports)?)
}

/// Write one analysis in JSON format.
pub fn write_json(grammar: &Grammar, analysis: &Analysis) -> anyhow::Result<()> {
    let json = format_json(grammar, analysis)?;
    println!("{}", json);
    Ok(())
}

// =============================================================================
// Pretty Format
// =============================================================================

/// Append one line of pretty output.
fn line(out: &mut String, text: impl std::fmt::Display) {
    out.push_str(&text.to_string());
    out.push('\n');
}

/// Render the derivation trace, one step per line.
pub fn format_trace(grammar: &Grammar, trace: &Trace) -> String {
    let mut out = String::new();
    for (i, e) in trace.iter().enumerate() {
        let lookahead = e
            .lookahead
            .map(|t| grammar.terminal_name(t))
            .unwrap_or("$");
        let action = match e.action {
            Action::Push => format!("{:<5}", e.action.as_str()).cyan(),
            Action::Pop => format!("{:<5}", e.action.as_str()).magenta(),
            Action::Shift => format!("{:<5}", e.action.as_str()).green(),
        };
        line(
            &mut out,
            format_args!(
                "    {:>3}  {}  {:<16} {}  {}",
                i,
                action,
                format!("{}#{}", grammar.nonterminal_name(e.nonterminal), e.alternative),
                format!("@{:<3} {:<4}", e.position, lookahead).dimmed(),
                format!("depth {}", e.depth).dimmed()
            ),
        );
    }
    out
}

/// Render one analysis in pretty (human-readable) format.
pub fn format_pretty(grammar: &Grammar, analysis: &Analysis, show_trace: bool) -> String {
    let mut out = String::new();

    // Header
    line(&mut out, "");
    line(
        &mut out,
        format_args!(
            "  {} v{}",
            "scanpath-grammar".cyan().bold(),
            env!("CARGO_PKG_VERSION")
        ),
    );
    line(&mut out, "");
    line(&mut out, format_args!("  {}{}", "Grammar:  ".dimmed(), grammar.name()));
    let scanpath = if analysis.input.is_empty() {
        "(empty)".to_string()
    } else {
        grammar.display_terminals(&analysis.input)
    };
    line(&mut out, format_args!("  {}{}", "Scanpath: ".dimmed(), scanpath));
    line(&mut out, "");

    match analysis.verdict() {
        Verdict::Accepted => line(&mut out, format_args!("  {}", "✓ ACCEPTED".green())),
        Verdict::AcceptedIncomplete(residual) => {
            line(&mut out, format_args!("  {}", "… INCOMPLETE".yellow()));
            let open: Vec<&str> = residual
                .open_tasks()
                .into_iter()
                .map(|n| grammar.production(n).label())
                .collect();
            line(
                &mut out,
                format_args!("    {}{}", "open tasks: ".dimmed(), open.join(", ")),
            );
        }
        Verdict::Rejected(rejection) => {
            line(&mut out, format_args!("  {}", "✗ REJECTED".red()));
            line(&mut out, format_args!("    {}", rejection.describe(grammar)));
        }
    }

    if let Some(completion) = &analysis.completion {
        let status = match analysis.completion_verified {
            Some(true) => format!("  {}", "(verified)".dimmed()),
            Some(false) => format!("  {}", "(NOT accepted)".red()),
            None => String::new(),
        };
        line(&mut out, "");
        line(
            &mut out,
            format_args!(
                "  {} {}{}",
                "Completion:".bold(),
                grammar.display_terminals(completion).blue(),
                status
            ),
        );
    }

    if !analysis.missing_steps.is_empty() {
        line(&mut out, "");
        line(
            &mut out,
            format_args!(
                "  {} ({}):",
                "Missing steps".bold(),
                analysis.missing_steps.len()
            ),
        );
        line(&mut out, "");
        for m in &analysis.missing_steps {
            line(
                &mut out,
                format_args!("    {} {}", "WARN ".yellow(), m.message(grammar)),
            );
            let detail = format!(
                "{} → {} at position {}",
                grammar.nonterminal_name(m.parent),
                grammar.nonterminal_name(m.child),
                m.position
            );
            line(&mut out, format_args!("            {}", detail.dimmed()));
        }
    }

    if show_trace && !analysis.run.trace.is_empty() {
        line(&mut out, "");
        line(
            &mut out,
            format_args!(
                "  {} ({} steps, max depth {}):",
                "Trace".bold(),
                analysis.run.trace.len(),
                analysis.run.trace.max_depth()
            ),
        );
        out.push_str(&format_trace(grammar, &analysis.run.trace));
    }

    out
}

/// Write one analysis in pretty format.
pub fn write_pretty(grammar: &Grammar, analysis: &Analysis, show_trace: bool) {
    print!("{}", format_pretty(grammar, analysis, show_trace));
    println!();
}
