//! Tool Output Parsing
//!
//! One parser per external tool, each turning that tool's raw output
//! (JSON or line-oriented text) into uniform [`AnalysisError`] records.
//! Parsers are resolved through a registry built once at configuration
//! time; unknown tools fall back to a generic text parser.
//!
//! Parser contract: never fail. Malformed input logs a warning and yields
//! an empty list; a tool run that produced no parseable output at all is
//! surfaced as a single synthetic "tool failed" record instead of being
//! silently dropped.

pub mod bandit;
pub mod lsp;
pub mod mypy;
pub mod pylint;
pub mod pyright;
pub mod ruff;
pub mod safety;
pub mod semgrep;
pub mod text;

use crate::models::{AnalysisError, Severity};
use crate::tools::ToolOutcome;
use std::collections::HashMap;
use tracing::debug;

/// Converts one tool's raw output into diagnostics.
pub trait OutputParser: Send + Sync {
    fn tool_name(&self) -> &'static str;

    /// Parse raw output. Must never fail; on unparseable input, log a
    /// warning and return an empty list.
    fn parse(&self, outcome: &ToolOutcome) -> Vec<AnalysisError>;
}

/// Maps tool name to parser implementation, resolved once at construction.
pub struct ParserRegistry {
    parsers: HashMap<&'static str, Box<dyn OutputParser>>,
    fallback: text::TextParser,
}

impl Default for ParserRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}

impl ParserRegistry {
    /// Registry covering every tool in the default table plus the
    /// language-server diagnostic source.
    pub fn with_defaults() -> Self {
        let mut registry = Self {
            parsers: HashMap::new(),
            fallback: text::TextParser::new(),
        };
        registry.register(Box::new(ruff::RuffParser::new()));
        registry.register(Box::new(pylint::PylintParser));
        registry.register(Box::new(mypy::MypyParser));
        registry.register(Box::new(bandit::BanditParser));
        registry.register(Box::new(pyright::PyrightParser));
        registry.register(Box::new(semgrep::SemgrepParser));
        registry.register(Box::new(safety::SafetyParser));
        registry.register(Box::new(lsp::LspParser));
        registry
    }

    pub fn register(&mut self, parser: Box<dyn OutputParser>) {
        self.parsers.insert(parser.tool_name(), parser);
    }

    pub fn parser_for(&self, tool: &str) -> &dyn OutputParser {
        match self.parsers.get(tool) {
            Some(parser) => parser.as_ref(),
            None => &self.fallback,
        }
    }

    /// Turn a tool outcome into diagnostics, including the synthetic
    /// records for skipped, timed-out and failed runs. The tool parser is
    /// only consulted when the tool actually ran.
    pub fn parse_outcome(&self, outcome: &ToolOutcome) -> Vec<AnalysisError> {
        if outcome.skipped {
            return vec![AnalysisError::tool_failure(
                &outcome.tool,
                "tool-skipped",
                Severity::Info,
                format!("{} did not run: {}", outcome.tool, excerpt(&outcome.stderr)),
            )];
        }
        if outcome.timed_out {
            return vec![AnalysisError::tool_failure(
                &outcome.tool,
                "tool-timeout",
                Severity::Warning,
                format!("{} killed: {}", outcome.tool, excerpt(&outcome.stderr)),
            )];
        }
        if !outcome.success() && outcome.stdout.trim().is_empty() {
            return vec![AnalysisError::tool_failure(
                &outcome.tool,
                "tool-failure",
                Severity::Error,
                format!(
                    "{} exited with {:?} and produced no output: {}",
                    outcome.tool,
                    outcome.exit_code,
                    excerpt(&outcome.stderr)
                ),
            )];
        }

        let errors = self.parser_for(&outcome.tool).parse(outcome);
        debug!("{}: {} diagnostic(s)", outcome.tool, errors.len());
        errors
    }
}

/// First line of a tool's stderr, bounded, for synthetic records.
fn excerpt(stderr: &str) -> String {
    let line = stderr.lines().next().unwrap_or("").trim();
    if line.is_empty() {
        "(no stderr)".to_string()
    } else if line.chars().count() > 200 {
        let truncated: String = line.chars().take(200).collect();
        format!("{truncated}...")
    } else {
        line.to_string()
    }
}

#[cfg(test)]
pub(crate) fn outcome_with(tool: &str, stdout: &str) -> ToolOutcome {
    ToolOutcome {
        tool: tool.to_string(),
        exit_code: Some(1),
        stdout: stdout.to_string(),
        stderr: String::new(),
        elapsed: std::time::Duration::from_millis(10),
        timed_out: false,
        skipped: false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Category;
    use std::time::Duration;

    fn outcome(tool: &str) -> ToolOutcome {
        ToolOutcome {
            tool: tool.to_string(),
            exit_code: Some(0),
            stdout: String::new(),
            stderr: String::new(),
            elapsed: Duration::from_millis(5),
            timed_out: false,
            skipped: false,
        }
    }

    #[test]
    fn test_timeout_yields_synthetic_record_without_parsing() {
        let registry = ParserRegistry::with_defaults();
        let mut timed_out = outcome("ruff");
        timed_out.timed_out = true;
        timed_out.exit_code = None;
        timed_out.stdout = "this would not parse as ruff JSON".to_string();

        let errors = registry.parse_outcome(&timed_out);
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].error_type, "tool-timeout");
        assert_eq!(errors[0].category, Category::General);
        assert_eq!(errors[0].tool_source, "ruff");
    }

    #[test]
    fn test_failed_run_with_empty_stdout_yields_synthetic_record() {
        let registry = ParserRegistry::with_defaults();
        let mut failed = outcome("pylint");
        failed.exit_code = Some(32);
        failed.stderr = "usage error".to_string();

        let errors = registry.parse_outcome(&failed);
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].error_type, "tool-failure");
        assert_eq!(errors[0].severity, Severity::Error);
        assert!(errors[0].message.contains("usage error"));
    }

    #[test]
    fn test_skipped_tool_yields_synthetic_record() {
        let registry = ParserRegistry::with_defaults();
        let mut skipped = outcome("semgrep");
        skipped.skipped = true;
        skipped.exit_code = None;
        skipped.stderr = "executable 'semgrep' not found on PATH".to_string();

        let errors = registry.parse_outcome(&skipped);
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].error_type, "tool-skipped");
        assert_eq!(errors[0].severity, Severity::Info);
    }

    #[test]
    fn test_clean_run_yields_nothing() {
        let registry = ParserRegistry::with_defaults();
        let errors = registry.parse_outcome(&outcome("ruff"));
        assert!(errors.is_empty());
    }

    #[test]
    fn test_unknown_tool_falls_back_to_text_parser() {
        let registry = ParserRegistry::with_defaults();
        let mut unknown = outcome("sometool");
        unknown.exit_code = Some(1);
        unknown.stdout = "lib/widget.py:12:3: error: something broke\n".to_string();

        let errors = registry.parse_outcome(&unknown);
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].file_path, "lib/widget.py");
        assert_eq!(errors[0].line, 12);
        assert_eq!(errors[0].tool_source, "sometool");
    }
}
