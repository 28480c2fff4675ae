//! CodeSweep LLM - Fix Generation and Orchestration
//!
//! This crate drives the AI-assisted fix loop:
//! - An OpenAI-compatible chat client behind the narrow
//!   [`client::LlmFixClient::generate_fix`] contract
//! - Best-effort structural context gathering behind the
//!   [`context::StructureIndex`] trait
//! - Syntax validation of proposed patches
//! - The [`fixer::FixOrchestrator`], whose per-error pipeline never
//!   fails: every internal misstep degrades to a labeled outcome and the
//!   batch keeps going

#![warn(clippy::all, clippy::pedantic)]
#![allow(clippy::missing_errors_doc, clippy::module_name_repetitions)]

pub mod client;
pub mod context;
pub mod fixer;
pub mod validate;

pub use client::{FixRequest, FixResponse, LlmFixClient};
pub use context::{NullIndex, SourceScanIndex, StructuralContext, StructureIndex};
pub use fixer::{
    BatchFixReport, ConfidenceModel, FixOrchestrator, FixOutcome, FixResult, FixStage,
};
pub use validate::SyntaxCheck;

/// Result type for LLM operations
pub type LlmResult<T> = std::result::Result<T, LlmError>;

/// Error types for LLM operations
#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    /// HTTP request error
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON parsing error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Model inference error
    #[error("Model inference error: {0}")]
    Inference(String),

    /// Fix generation exceeded its time budget
    #[error("Fix generation timed out after {seconds}s")]
    Timeout { seconds: u64 },
}

/// Configuration for the fix-generation backend.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct LlmConfig {
    /// Base URL of an OpenAI-compatible API
    pub base_url: String,
    /// API key; falls back to `CODESWEEP_API_KEY` / `OPENAI_API_KEY`
    pub api_key: Option<String>,
    /// Model identifier
    pub model: String,
    /// Sampling temperature
    pub temperature: f32,
    /// Maximum tokens to generate
    pub max_tokens: u32,
    /// Per-request timeout in seconds
    pub request_timeout_secs: u64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.openai.com/v1".to_string(),
            api_key: None,
            model: "gpt-4o-mini".to_string(),
            temperature: 0.1,
            max_tokens: 4096,
            request_timeout_secs: 60,
        }
    }
}

impl LlmConfig {
    /// Resolve the effective API key from config or environment.
    pub fn resolved_api_key(&self) -> Option<String> {
        self.api_key
            .clone()
            .or_else(|| std::env::var("CODESWEEP_API_KEY").ok())
            .or_else(|| std::env::var("OPENAI_API_KEY").ok())
    }
}
