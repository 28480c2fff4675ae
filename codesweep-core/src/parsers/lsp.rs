//! Language-server diagnostic parser
//!
//! The LSP client is an external collaborator; the core only consumes the
//! diagnostics it publishes, serialized as JSON. Input is either an array
//! of `textDocument/publishDiagnostics` params (`{uri, diagnostics}`) or
//! a bare array of `Diagnostic` values for a single unnamed document.

use super::OutputParser;
use crate::models::{AnalysisError, Category, Severity};
use crate::tools::ToolOutcome;
use serde::Deserialize;
use tracing::warn;

#[derive(Debug, Deserialize)]
struct PublishedDiagnostics {
    uri: String,
    diagnostics: Vec<LspDiagnostic>,
}

#[derive(Debug, Deserialize)]
struct LspDiagnostic {
    range: LspRange,
    /// 1=Error 2=Warning 3=Information 4=Hint, optional per the protocol
    #[serde(default)]
    severity: Option<u8>,
    #[serde(default)]
    code: Option<serde_json::Value>,
    #[serde(default)]
    source: Option<String>,
    message: String,
}

#[derive(Debug, Deserialize)]
struct LspRange {
    start: LspPosition,
}

#[derive(Debug, Deserialize)]
struct LspPosition {
    line: usize,
    character: usize,
}

pub struct LspParser;

impl LspParser {
    fn severity(native: Option<u8>) -> Severity {
        match native {
            Some(1) => Severity::Error,
            Some(3) => Severity::Info,
            Some(4) => Severity::Hint,
            // Unspecified severity is treated as a warning per convention
            _ => Severity::Warning,
        }
    }

    fn convert(file: &str, diagnostic: LspDiagnostic) -> AnalysisError {
        let code = match diagnostic.code {
            Some(serde_json::Value::String(code)) => code,
            Some(serde_json::Value::Number(code)) => code.to_string(),
            _ => diagnostic.source.clone().unwrap_or_else(|| "lsp".to_string()),
        };
        let source = diagnostic.source.unwrap_or_else(|| "lsp".to_string());
        AnalysisError::new(
            file.strip_prefix("file://").unwrap_or(file),
            diagnostic.range.start.line + 1,
            diagnostic.range.start.character + 1,
            code,
            Self::severity(diagnostic.severity),
            format!("[{source}] {}", diagnostic.message),
            "lsp",
            Category::General,
        )
    }
}

impl OutputParser for LspParser {
    fn tool_name(&self) -> &'static str {
        "lsp"
    }

    fn parse(&self, outcome: &ToolOutcome) -> Vec<AnalysisError> {
        if let Ok(published) = serde_json::from_str::<Vec<PublishedDiagnostics>>(&outcome.stdout) {
            return published
                .into_iter()
                .flat_map(|p| {
                    let uri = p.uri;
                    p.diagnostics
                        .into_iter()
                        .map(move |d| Self::convert(&uri, d))
                        .collect::<Vec<_>>()
                })
                .collect();
        }
        match serde_json::from_str::<Vec<LspDiagnostic>>(&outcome.stdout) {
            Ok(diagnostics) => diagnostics
                .into_iter()
                .map(|d| Self::convert("", d))
                .collect(),
            Err(e) => {
                warn!("failed to parse LSP diagnostics: {e}");
                Vec::new()
            }
        }
    }
}
