//! Bandit JSON output parser (`bandit -r -f json`)

use super::OutputParser;
use crate::models::{AnalysisError, Category, Severity};
use crate::tools::ToolOutcome;
use serde::Deserialize;
use tracing::warn;

#[derive(Debug, Deserialize)]
struct BanditReport {
    results: Vec<BanditFinding>,
}

#[derive(Debug, Deserialize)]
struct BanditFinding {
    filename: String,
    line_number: usize,
    #[serde(default)]
    col_offset: usize,
    test_id: String,
    issue_text: String,
    issue_severity: String,
    issue_confidence: String,
    #[serde(default)]
    more_info: Option<String>,
}

pub struct BanditParser;

impl BanditParser {
    fn severity(native: &str) -> Severity {
        match native.to_lowercase().as_str() {
            "high" => Severity::Security,
            "medium" => Severity::Warning,
            _ => Severity::Info,
        }
    }

    fn confidence(native: &str) -> f64 {
        match native.to_lowercase().as_str() {
            "high" => 0.9,
            "medium" => 0.6,
            _ => 0.3,
        }
    }
}

impl OutputParser for BanditParser {
    fn tool_name(&self) -> &'static str {
        "bandit"
    }

    fn parse(&self, outcome: &ToolOutcome) -> Vec<AnalysisError> {
        let report: BanditReport = match serde_json::from_str(&outcome.stdout) {
            Ok(report) => report,
            Err(e) => {
                warn!("failed to parse bandit JSON output: {e}");
                return Vec::new();
            }
        };

        report
            .results
            .into_iter()
            .map(|r| {
                let mut error = AnalysisError::new(
                    r.filename,
                    r.line_number,
                    r.col_offset,
                    r.test_id,
                    Self::severity(&r.issue_severity),
                    r.issue_text,
                    "bandit",
                    Category::SecurityCritical,
                )
                .with_confidence(Self::confidence(&r.issue_confidence));
                if let Some(info) = r.more_info {
                    error = error.with_suggestion(info);
                }
                error
            })
            .collect()
    }
}
