//! Semgrep JSON output parser (`semgrep scan --json`)

use super::OutputParser;
use crate::models::{AnalysisError, Category, Severity};
use crate::tools::ToolOutcome;
use serde::Deserialize;
use tracing::warn;

#[derive(Debug, Deserialize)]
struct SemgrepReport {
    results: Vec<SemgrepFinding>,
}

#[derive(Debug, Deserialize)]
struct SemgrepFinding {
    check_id: String,
    path: String,
    start: SemgrepPosition,
    extra: SemgrepExtra,
}

#[derive(Debug, Deserialize)]
struct SemgrepPosition {
    line: usize,
    col: usize,
}

#[derive(Debug, Deserialize)]
struct SemgrepExtra {
    message: String,
    severity: String,
    #[serde(default)]
    fix: Option<String>,
}

pub struct SemgrepParser;

impl SemgrepParser {
    fn classify(check_id: &str, native_severity: &str) -> (Severity, Category) {
        // Security rulesets get the dedicated severity regardless of the
        // rule's own level
        if check_id.contains("security") {
            return (Severity::Security, Category::SecurityCritical);
        }
        match native_severity {
            "ERROR" => (Severity::Error, Category::LogicCritical),
            "WARNING" => (Severity::Warning, Category::General),
            _ => (Severity::Info, Category::General),
        }
    }
}

impl OutputParser for SemgrepParser {
    fn tool_name(&self) -> &'static str {
        "semgrep"
    }

    fn parse(&self, outcome: &ToolOutcome) -> Vec<AnalysisError> {
        let report: SemgrepReport = match serde_json::from_str(&outcome.stdout) {
            Ok(report) => report,
            Err(e) => {
                warn!("failed to parse semgrep JSON output: {e}");
                return Vec::new();
            }
        };

        report
            .results
            .into_iter()
            .map(|r| {
                let (severity, category) = Self::classify(&r.check_id, &r.extra.severity);
                let mut error = AnalysisError::new(
                    r.path,
                    r.start.line,
                    r.start.col,
                    r.check_id,
                    severity,
                    r.extra.message,
                    "semgrep",
                    category,
                );
                if let Some(fix) = r.extra.fix {
                    error = error.with_suggestion(fix);
                }
                error
            })
            .collect()
    }
}
