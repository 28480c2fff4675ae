//! External Tool Execution
//!
//! Manages invocation of external static-analysis tools (ruff, pylint,
//! mypy, bandit, etc.) under hard timeouts, with tiered scheduling and a
//! bounded worker pool. Launch failures never propagate: every invocation
//! produces a structured [`ToolOutcome`].

pub mod config;
pub mod runner;

pub use config::{config_hash, default_tool_table, ToolConfig, ToolOverrides};
pub use runner::{ToolOutcome, ToolRunner};
