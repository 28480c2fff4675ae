//! Pyright JSON output parser (`pyright --outputjson`)

use super::OutputParser;
use crate::models::{AnalysisError, Category, Severity};
use crate::tools::ToolOutcome;
use serde::Deserialize;
use tracing::warn;

#[derive(Debug, Deserialize)]
struct PyrightReport {
    #[serde(rename = "generalDiagnostics")]
    general_diagnostics: Vec<PyrightDiagnostic>,
}

#[derive(Debug, Deserialize)]
struct PyrightDiagnostic {
    file: String,
    severity: String,
    message: String,
    #[serde(default)]
    range: Option<PyrightRange>,
    #[serde(default)]
    rule: Option<String>,
}

#[derive(Debug, Deserialize)]
struct PyrightRange {
    start: PyrightPosition,
}

#[derive(Debug, Deserialize)]
struct PyrightPosition {
    line: usize,
    character: usize,
}

pub struct PyrightParser;

impl OutputParser for PyrightParser {
    fn tool_name(&self) -> &'static str {
        "pyright"
    }

    fn parse(&self, outcome: &ToolOutcome) -> Vec<AnalysisError> {
        let report: PyrightReport = match serde_json::from_str(&outcome.stdout) {
            Ok(report) => report,
            Err(e) => {
                warn!("failed to parse pyright JSON output: {e}");
                return Vec::new();
            }
        };

        report
            .general_diagnostics
            .into_iter()
            .map(|d| {
                let (severity, category) = match d.severity.as_str() {
                    "error" => (Severity::Error, Category::TypeCritical),
                    "warning" => (Severity::Warning, Category::TypeCritical),
                    _ => (Severity::Info, Category::General),
                };
                // Pyright ranges are zero-based
                let (line, column) = d
                    .range
                    .map_or((0, 0), |r| (r.start.line + 1, r.start.character + 1));
                AnalysisError::new(
                    d.file,
                    line,
                    column,
                    d.rule.unwrap_or_else(|| "pyright".to_string()),
                    severity,
                    d.message,
                    "pyright",
                    category,
                )
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parsers::outcome_with;

    const SAMPLE: &str = r#"{
        "version": "1.1.350",
        "generalDiagnostics": [
            {"file": "/src/app.py", "severity": "error",
             "message": "Expression of type \"str\" is incompatible with declared type \"int\"",
             "range": {"start": {"line": 9, "character": 4}, "end": {"line": 9, "character": 11}},
             "rule": "reportAssignmentType"},
            {"file": "/src/app.py", "severity": "information",
             "message": "Analysis complete"}
        ],
        "summary": {"errorCount": 1, "warningCount": 0}
    }"#;

    #[test]
    fn test_parse_pyright_diagnostics() {
        let errors = PyrightParser.parse(&outcome_with("pyright", SAMPLE));
        assert_eq!(errors.len(), 2);

        let type_error = &errors[0];
        assert_eq!(type_error.file_path, "/src/app.py");
        // zero-based range converted to one-based
        assert_eq!(type_error.line, 10);
        assert_eq!(type_error.column, 5);
        assert_eq!(type_error.error_type, "reportAssignmentType");
        assert_eq!(type_error.severity, Severity::Error);
        assert_eq!(type_error.category, Category::TypeCritical);

        let info = &errors[1];
        assert_eq!(info.severity, Severity::Info);
        assert_eq!(info.line, 0);
        assert_eq!(info.error_type, "pyright");
    }

    #[test]
    fn test_malformed_json_yields_empty() {
        let errors = PyrightParser.parse(&outcome_with("pyright", "null"));
        assert!(errors.is_empty());
    }
}
