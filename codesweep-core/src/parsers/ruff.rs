//! Ruff JSON output parser (`ruff check --output-format=json`)

use super::OutputParser;
use crate::models::{AnalysisError, Category, Severity};
use crate::tools::ToolOutcome;
use serde::Deserialize;
use tracing::warn;

/// Fixed prefix table bucketing ruff rule codes into severity/category.
/// Longest prefixes first so `ASYNC1xx` does not land in the `A` bucket.
const PREFIX_TABLE: &[(&str, Severity, Category)] = &[
    ("ASYNC", Severity::Warning, Category::AsyncMajor),
    ("PERF", Severity::Warning, Category::PerformanceMajor),
    ("SIM", Severity::Info, Category::StyleMajor),
    ("UP", Severity::Info, Category::StyleMajor),
    ("C9", Severity::Warning, Category::PerformanceMajor),
    ("E", Severity::Error, Category::StyleMajor),
    ("W", Severity::Warning, Category::StyleMajor),
    ("F", Severity::Error, Category::LogicCritical),
    ("S", Severity::Security, Category::SecurityCritical),
    ("B", Severity::Warning, Category::LogicCritical),
    ("I", Severity::Warning, Category::ImportCritical),
    ("D", Severity::Info, Category::DocumentationMajor),
    ("N", Severity::Info, Category::NamingMajor),
];

#[derive(Debug, Deserialize)]
struct RuffDiagnostic {
    /// `null` for hard syntax errors
    code: Option<String>,
    message: String,
    filename: String,
    location: RuffLocation,
    #[serde(default)]
    fix: Option<RuffFix>,
}

#[derive(Debug, Deserialize)]
struct RuffLocation {
    row: usize,
    column: usize,
}

#[derive(Debug, Deserialize)]
struct RuffFix {
    message: Option<String>,
}

pub struct RuffParser;

impl RuffParser {
    pub fn new() -> Self {
        Self
    }

    fn classify(code: &str) -> (Severity, Category) {
        for (prefix, severity, category) in PREFIX_TABLE {
            if code.starts_with(prefix) {
                return (*severity, *category);
            }
        }
        (Severity::Warning, Category::General)
    }
}

impl Default for RuffParser {
    fn default() -> Self {
        Self::new()
    }
}

impl OutputParser for RuffParser {
    fn tool_name(&self) -> &'static str {
        "ruff"
    }

    fn parse(&self, outcome: &ToolOutcome) -> Vec<AnalysisError> {
        let diagnostics: Vec<RuffDiagnostic> = match serde_json::from_str(&outcome.stdout) {
            Ok(diagnostics) => diagnostics,
            Err(e) => {
                warn!("failed to parse ruff JSON output: {e}");
                return Vec::new();
            }
        };

        diagnostics
            .into_iter()
            .map(|d| {
                let (code, severity, category) = match d.code {
                    Some(code) => {
                        let (severity, category) = Self::classify(&code);
                        (code, severity, category)
                    }
                    // A null code is ruff reporting a parse failure
                    None => (
                        "syntax-error".to_string(),
                        Severity::Error,
                        Category::SyntaxCritical,
                    ),
                };
                let mut error = AnalysisError::new(
                    d.filename,
                    d.location.row,
                    d.location.column,
                    code,
                    severity,
                    d.message,
                    "ruff",
                    category,
                );
                if let Some(fix) = d.fix.and_then(|f| f.message) {
                    error = error.with_suggestion(fix);
                }
                error
            })
            .collect()
    }
}
