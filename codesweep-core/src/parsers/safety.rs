//! Safety JSON output parser (`safety check --json`)
//!
//! Safety has shipped two JSON shapes: the current object form with a
//! `vulnerabilities` array, and the legacy top-level array of
//! `[package, spec, installed, advisory, id]` rows. Both are accepted.

use super::OutputParser;
use crate::models::{AnalysisError, Category, Severity};
use crate::tools::ToolOutcome;
use serde::Deserialize;
use tracing::warn;

#[derive(Debug, Deserialize)]
struct SafetyReport {
    vulnerabilities: Vec<SafetyVulnerability>,
}

#[derive(Debug, Deserialize)]
struct SafetyVulnerability {
    package_name: String,
    #[serde(default)]
    analyzed_version: Option<String>,
    vulnerability_id: String,
    advisory: String,
}

pub struct SafetyParser;

impl SafetyParser {
    fn record(package: &str, version: Option<&str>, id: &str, advisory: &str) -> AnalysisError {
        let message = match version {
            Some(version) => format!("{package} {version}: {advisory}"),
            None => format!("{package}: {advisory}"),
        };
        AnalysisError::new(
            package,
            0,
            0,
            id,
            Severity::Security,
            message,
            "safety",
            Category::DependencyMajor,
        )
    }

    fn parse_legacy(raw: &str) -> Option<Vec<AnalysisError>> {
        let rows: Vec<Vec<serde_json::Value>> = serde_json::from_str(raw).ok()?;
        Some(
            rows.into_iter()
                .filter_map(|row| {
                    let package = row.first()?.as_str()?.to_string();
                    let advisory = row.get(3)?.as_str()?.to_string();
                    let id = row.get(4)?.as_str()?.to_string();
                    let version = row.get(2).and_then(|v| v.as_str()).map(ToString::to_string);
                    Some(Self::record(&package, version.as_deref(), &id, &advisory))
                })
                .collect(),
        )
    }
}

impl OutputParser for SafetyParser {
    fn tool_name(&self) -> &'static str {
        "safety"
    }

    fn parse(&self, outcome: &ToolOutcome) -> Vec<AnalysisError> {
        if let Ok(report) = serde_json::from_str::<SafetyReport>(&outcome.stdout) {
            return report
                .vulnerabilities
                .into_iter()
                .map(|v| {
                    Self::record(
                        &v.package_name,
                        v.analyzed_version.as_deref(),
                        &v.vulnerability_id,
                        &v.advisory,
                    )
                })
                .collect();
        }
        if let Some(errors) = Self::parse_legacy(&outcome.stdout) {
            return errors;
        }
        warn!("failed to parse safety JSON output");
        Vec::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parsers::outcome_with;

    #[test]
    fn test_parse_modern_report() {
        let raw = r#"{
            "vulnerabilities": [
                {"package_name": "requests", "analyzed_version": "2.19.0",
                 "vulnerability_id": "36546",
                 "advisory": "Information disclosure in the auth header"}
            ],
            "report_meta": {"scanned": 42}
        }"#;
        let errors = SafetyParser.parse(&outcome_with("safety", raw));
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].file_path, "requests");
        assert_eq!(errors[0].error_type, "36546");
        assert_eq!(errors[0].severity, Severity::Security);
        assert_eq!(errors[0].category, Category::DependencyMajor);
        assert!(errors[0].message.contains("2.19.0"));
    }

    #[test]
    fn test_parse_legacy_rows() {
        let raw = r#"[["django", "<2.2.24", "2.2.0", "Potential directory traversal", "40637"]]"#;
        let errors = SafetyParser.parse(&outcome_with("safety", raw));
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].file_path, "django");
        assert_eq!(errors[0].error_type, "40637");
    }

    #[test]
    fn test_malformed_json_yields_empty() {
        let errors = SafetyParser.parse(&outcome_with("safety", "ERROR: no such option"));
        assert!(errors.is_empty());
    }
}
