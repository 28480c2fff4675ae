//! CodeSweep Core - Analysis Engine and Data Structures
//!
//! This crate provides the core of the codesweep orchestrator:
//! - The uniform diagnostic data model (`AnalysisError` and friends)
//! - External tool execution with timeouts and tiered scheduling
//! - Per-tool output parsers behind a registry
//! - Aggregation, categorization and quality scoring

#![warn(clippy::all, clippy::pedantic)]
#![allow(
    clippy::multiple_crate_versions,
    clippy::module_name_repetitions,
    clippy::missing_errors_doc
)]

pub mod aggregate;
pub mod models;
pub mod parsers;
pub mod tools;

// Re-export commonly used types for convenience
pub use aggregate::{CodebaseMetrics, ErrorAggregator, ErrorStatistics, ScoreWeights};
pub use models::{AnalysisError, AnalysisSession, Capabilities, Category, Severity};
pub use parsers::{OutputParser, ParserRegistry};
pub use tools::{ToolConfig, ToolOutcome, ToolRunner};

/// Result type used throughout codesweep core
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for codesweep core operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// I/O operation failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Parsing error
    #[error("Parse error: {0}")]
    Parse(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// External tool error
    #[error("External tool error: {tool}: {message}")]
    ExternalTool { tool: String, message: String },

    /// Timeout error
    #[error("Operation timed out after {seconds} seconds")]
    Timeout { seconds: u64 },

    /// JSON serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
