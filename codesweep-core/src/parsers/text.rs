//! Generic line-oriented fallback parser
//!
//! Handles any tool emitting the common `path:line:col: kind: message`
//! shape (column and kind optional). Used for tools with no dedicated
//! parser.

use super::OutputParser;
use crate::models::{AnalysisError, Category, Severity};
use crate::tools::ToolOutcome;
use regex::Regex;

pub struct TextParser {
    pattern: Regex,
}

impl TextParser {
    pub fn new() -> Self {
        Self {
            // path:line(:col)?: (kind:)? message
            pattern: Regex::new(
                r"^(?P<path>[^:\s][^:]*):(?P<line>\d+)(?::(?P<col>\d+))?:\s*(?:(?P<kind>error|warning|note|info)\s*:\s*)?(?P<msg>.+)$",
            )
            .expect("diagnostic line pattern is valid"),
        }
    }

    fn severity(kind: Option<&str>) -> Severity {
        match kind {
            Some("error") => Severity::Error,
            Some("note") => Severity::Hint,
            Some("info") => Severity::Info,
            _ => Severity::Warning,
        }
    }
}

impl Default for TextParser {
    fn default() -> Self {
        Self::new()
    }
}

impl OutputParser for TextParser {
    fn tool_name(&self) -> &'static str {
        "text"
    }

    fn parse(&self, outcome: &ToolOutcome) -> Vec<AnalysisError> {
        outcome
            .stdout
            .lines()
            .filter_map(|line| {
                let captures = self.pattern.captures(line.trim())?;
                let line_num: usize = captures.name("line")?.as_str().parse().ok()?;
                let column: usize = captures
                    .name("col")
                    .and_then(|c| c.as_str().parse().ok())
                    .unwrap_or(0);
                let kind = captures.name("kind").map(|k| k.as_str());
                Some(AnalysisError::new(
                    captures.name("path")?.as_str(),
                    line_num,
                    column,
                    kind.unwrap_or("diagnostic"),
                    Self::severity(kind),
                    captures.name("msg")?.as_str(),
                    &outcome.tool,
                    Category::General,
                ))
            })
            .collect()
    }
}
