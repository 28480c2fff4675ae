//! Pylint JSON output parser (`pylint --output-format=json`)

use super::OutputParser;
use crate::models::{AnalysisError, Category, Severity};
use crate::tools::ToolOutcome;
use serde::Deserialize;
use tracing::warn;

#[derive(Debug, Deserialize)]
struct PylintMessage {
    #[serde(rename = "type")]
    kind: String,
    path: String,
    line: usize,
    #[serde(default)]
    column: usize,
    #[serde(rename = "message-id")]
    message_id: String,
    #[serde(default)]
    symbol: Option<String>,
    message: String,
}

pub struct PylintParser;

impl PylintParser {
    fn classify(kind: &str) -> (Severity, Category) {
        match kind {
            "fatal" => (Severity::Error, Category::SyntaxCritical),
            "error" => (Severity::Error, Category::LogicCritical),
            "warning" => (Severity::Warning, Category::General),
            "convention" => (Severity::Info, Category::StyleMajor),
            "refactor" => (Severity::Info, Category::StyleMajor),
            _ => (Severity::Info, Category::General),
        }
    }
}

impl OutputParser for PylintParser {
    fn tool_name(&self) -> &'static str {
        "pylint"
    }

    fn parse(&self, outcome: &ToolOutcome) -> Vec<AnalysisError> {
        let messages: Vec<PylintMessage> = match serde_json::from_str(&outcome.stdout) {
            Ok(messages) => messages,
            Err(e) => {
                warn!("failed to parse pylint JSON output: {e}");
                return Vec::new();
            }
        };

        messages
            .into_iter()
            .map(|m| {
                let (severity, category) = Self::classify(&m.kind);
                let message = match &m.symbol {
                    Some(symbol) => format!("{} ({symbol})", m.message),
                    None => m.message.clone(),
                };
                AnalysisError::new(
                    m.path,
                    m.line,
                    m.column,
                    m.message_id,
                    severity,
                    message,
                    "pylint",
                    category,
                )
            })
            .collect()
    }
}
