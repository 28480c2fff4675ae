//! Report rendering: terminal text, JSON and HTML views over the same
//! in-memory result. Output-only; reports are never read back.

use codesweep_core::aggregate::ErrorStatistics;
use codesweep_core::models::{AnalysisError, AnalysisSession};
use codesweep_llm::{BatchFixReport, FixOutcome};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt::Write;

/// Everything one run produced, in renderable form.
#[derive(Debug, Serialize)]
pub struct AnalysisReport {
    pub session: AnalysisSession,
    pub statistics: ErrorStatistics,
    pub quality_score: f64,
    pub category_counts: BTreeMap<String, usize>,
    pub errors: Vec<AnalysisError>,
    pub fixes: Option<FixSummary>,
}

/// Condensed fix-loop results for the report.
#[derive(Debug, Default, Serialize)]
pub struct FixSummary {
    pub attempted: usize,
    pub applied: usize,
    pub rejected: usize,
    pub failed: usize,
}

impl FixSummary {
    pub fn from_batch(report: &BatchFixReport) -> Self {
        let mut summary = Self {
            attempted: report.attempted,
            applied: report.applied,
            ..Self::default()
        };
        for outcome in &report.outcomes {
            summary.record_unfixed(outcome);
        }
        summary
    }

    /// Count a non-applied outcome. `Fixed` outcomes are ignored here;
    /// application is tracked separately.
    pub fn record_unfixed(&mut self, outcome: &FixOutcome) {
        match outcome {
            FixOutcome::Fixed(_) => {}
            FixOutcome::Rejected { .. } => self.rejected += 1,
            FixOutcome::Failed { .. } => self.failed += 1,
        }
    }
}

const MAX_LISTED_ERRORS: usize = 25;

pub fn render_terminal(report: &AnalysisReport) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "codesweep analysis of {}", report.session.target_path);
    let _ = writeln!(out, "session {}", report.session.id);
    let _ = writeln!(out, "tools: {}", report.session.tools_used.join(", "));
    let _ = writeln!(out);
    let _ = writeln!(out, "quality score: {:.1}/100", report.quality_score);
    let _ = writeln!(
        out,
        "total diagnostics: {} ({} critical)",
        report.statistics.total_errors, report.statistics.critical_count
    );

    let _ = writeln!(out, "\nby severity:");
    for (severity, count) in &report.statistics.by_severity {
        let _ = writeln!(out, "  {severity:<10} {count}");
    }

    let _ = writeln!(out, "\nby category:");
    for (category, count) in &report.category_counts {
        if *count > 0 {
            let _ = writeln!(out, "  {category:<22} {count}");
        }
    }

    let _ = writeln!(out, "\nby tool:");
    for (tool, count) in &report.statistics.by_tool {
        let _ = writeln!(out, "  {tool:<10} {count}");
    }

    if !report.errors.is_empty() {
        let _ = writeln!(out, "\nfindings:");
        for error in report.errors.iter().take(MAX_LISTED_ERRORS) {
            if error.file_path.is_empty() {
                let _ = writeln!(out, "  [{}] {}", error.severity, error.message);
            } else {
                let _ = writeln!(
                    out,
                    "  [{}] {}:{}:{} {} - {}",
                    error.severity,
                    error.file_path,
                    error.line,
                    error.column,
                    error.error_type,
                    error.message
                );
            }
        }
        if report.errors.len() > MAX_LISTED_ERRORS {
            let _ = writeln!(
                out,
                "  ... and {} more (use --format json for the full list)",
                report.errors.len() - MAX_LISTED_ERRORS
            );
        }
    }

    if let Some(fixes) = &report.fixes {
        let _ = writeln!(
            out,
            "\nfixes: attempted={} applied={} rejected={} failed={}",
            fixes.attempted, fixes.applied, fixes.rejected, fixes.failed
        );
    }
    out
}

pub fn render_html(report: &AnalysisReport) -> String {
    let mut rows = String::new();
    for error in &report.errors {
        let _ = write!(
            rows,
            "<tr><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td></tr>\n",
            escape(error.severity.as_str()),
            escape(&error.file_path),
            error.line,
            escape(&error.error_type),
            escape(&error.tool_source),
            escape(&error.message),
        );
    }

    let fixes = report.fixes.as_ref().map_or(String::new(), |f| {
        format!(
            "<p class=\"fixes\">fixes: attempted {} / applied {} / rejected {} / failed {}</p>",
            f.attempted, f.applied, f.rejected, f.failed
        )
    });

    format!(
        r#"<!DOCTYPE html>
<html>
<head>
<meta charset="utf-8">
<title>codesweep report</title>
<style>
body {{ font-family: -apple-system, "Segoe UI", sans-serif; margin: 2rem; color: #1c1e21; }}
h1 {{ font-size: 1.4rem; }}
.score {{ font-size: 2rem; font-weight: 600; }}
table {{ border-collapse: collapse; width: 100%; margin-top: 1rem; }}
th, td {{ text-align: left; padding: 0.3rem 0.6rem; border-bottom: 1px solid #ddd; font-size: 0.85rem; }}
th {{ background: #f5f6f7; }}
.fixes {{ margin-top: 1rem; font-weight: 600; }}
</style>
</head>
<body>
<h1>codesweep analysis of {target}</h1>
<p>session {session} &middot; tools: {tools}</p>
<p class="score">{score:.1}/100</p>
<p>{total} diagnostics, {critical} critical</p>
{fixes}
<table>
<tr><th>severity</th><th>file</th><th>line</th><th>code</th><th>tool</th><th>message</th></tr>
{rows}
</table>
</body>
</html>
"#,
        target = escape(&report.session.target_path),
        session = escape(&report.session.id),
        tools = escape(&report.session.tools_used.join(", ")),
        score = report.quality_score,
        total = report.statistics.total_errors,
        critical = report.statistics.critical_count,
        fixes = fixes,
        rows = rows,
    )
}

fn escape(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

#[cfg(test)]
mod tests {
    use super::*;
    use codesweep_core::aggregate::ErrorAggregator;
    use codesweep_core::models::{Category, Severity};
    use std::path::Path;

    fn sample_report() -> AnalysisReport {
        let errors = vec![
            AnalysisError::new(
                "a.py",
                3,
                1,
                "E501",
                Severity::Error,
                "line too long",
                "ruff",
                Category::StyleMajor,
            ),
            AnalysisError::new(
                "b.py",
                7,
                2,
                "B602",
                Severity::Security,
                "shell=True <script>",
                "bandit",
                Category::SecurityCritical,
            ),
        ];
        let aggregator = ErrorAggregator::new();
        let statistics = aggregator.statistics(&errors);
        let category_counts = aggregator
            .categorize(&errors)
            .iter()
            .map(|(c, b)| (c.as_str().to_string(), b.len()))
            .collect();
        let mut session =
            AnalysisSession::begin(Path::new("/p"), vec!["ruff".into(), "bandit".into()], "h".into());
        session.finalize(errors.len());
        AnalysisReport {
            session,
            statistics,
            quality_score: 87.0,
            category_counts,
            errors,
            fixes: Some(FixSummary {
                attempted: 2,
                applied: 1,
                rejected: 1,
                failed: 0,
            }),
        }
    }

    #[test]
    fn test_terminal_report_contains_key_lines() {
        let rendered = render_terminal(&sample_report());
        assert!(rendered.contains("quality score: 87.0/100"));
        assert!(rendered.contains("total diagnostics: 2 (1 critical)"));
        assert!(rendered.contains("a.py:3:1 E501"));
        assert!(rendered.contains("fixes: attempted=2 applied=1"));
    }

    #[test]
    fn test_html_report_escapes_messages() {
        let rendered = render_html(&sample_report());
        assert!(rendered.contains("<html"));
        assert!(rendered.contains("&lt;script&gt;"));
        assert!(!rendered.contains("shell=True <script>"));
    }

    #[test]
    fn test_json_round_trip_of_report() {
        let report = sample_report();
        let json = serde_json::to_string_pretty(&report).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["statistics"]["total_errors"], 2);
        assert_eq!(value["errors"][0]["file_path"], "a.py");
        assert_eq!(value["fixes"]["applied"], 1);
    }
}
