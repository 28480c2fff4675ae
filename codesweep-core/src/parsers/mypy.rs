//! MyPy text output parser
//!
//! MyPy's default output is line-oriented:
//! `filename:line:column: severity: message [error-code]`
//! with the column and the bracketed code both optional.

use super::OutputParser;
use crate::models::{AnalysisError, Category, Severity};
use crate::tools::ToolOutcome;

pub struct MypyParser;

impl MypyParser {
    fn parse_line(line: &str) -> Option<AnalysisError> {
        let line = line.trim();
        if line.is_empty()
            || !line.contains(':')
            || line.starts_with("Found ")
            || line.starts_with("Success:")
        {
            return None;
        }

        let mut parts = line.splitn(4, ':');
        let filename = parts.next()?.trim();
        let line_num: usize = parts.next()?.trim().parse().ok()?;

        // The third field is a column only when it is numeric; otherwise
        // the line has no column and the field is already the severity.
        let third = parts.next()?.trim();
        let (column, remaining) = match third.parse::<usize>() {
            Ok(column) => (column, parts.next()?.trim().to_string()),
            Err(_) => (0, {
                let rest = parts.next().unwrap_or("");
                format!("{third}:{rest}").trim_end_matches(':').to_string()
            }),
        };

        let (kind, message_with_code) = if let Some(rest) = remaining.strip_prefix("error:") {
            ("error", rest.trim())
        } else if let Some(rest) = remaining.strip_prefix("note:") {
            ("note", rest.trim())
        } else if let Some(rest) = remaining.strip_prefix("warning:") {
            ("warning", rest.trim())
        } else {
            ("error", remaining.trim())
        };

        // Extract the trailing [error-code] if present
        let (message, error_code) = match (message_with_code.rfind('['), message_with_code.rfind(']')) {
            (Some(start), Some(end)) if start < end && end == message_with_code.len() - 1 => (
                message_with_code[..start].trim(),
                message_with_code[start + 1..end].to_string(),
            ),
            _ => (message_with_code, "mypy".to_string()),
        };

        let (severity, category) = match kind {
            "note" => (Severity::Hint, Category::General),
            "warning" => (Severity::Warning, Category::General),
            _ => {
                let lower = message.to_lowercase();
                if lower.contains("import") || lower.contains("module") {
                    (Severity::Error, Category::ImportCritical)
                } else {
                    (Severity::Error, Category::TypeCritical)
                }
            }
        };

        Some(AnalysisError::new(
            filename, line_num, column, error_code, severity, message, "mypy", category,
        ))
    }
}

impl OutputParser for MypyParser {
    fn tool_name(&self) -> &'static str {
        "mypy"
    }

    fn parse(&self, outcome: &ToolOutcome) -> Vec<AnalysisError> {
        // MyPy writes diagnostics to stdout and occasionally stderr
        outcome
            .stdout
            .lines()
            .chain(outcome.stderr.lines())
            .filter_map(Self::parse_line)
            .collect()
    }
}
