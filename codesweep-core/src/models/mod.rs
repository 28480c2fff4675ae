//! Data models shared across the analysis pipeline

pub mod diagnostic;
pub mod session;

pub use diagnostic::{AnalysisError, Category, Severity};
pub use session::AnalysisSession;

use serde::{Deserialize, Serialize};

/// Describes which optional backends are active for a run.
///
/// Passed into constructors instead of consulting module-level globals, so
/// degraded-mode behavior stays unit-testable.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct Capabilities {
    /// An LLM fix-generation backend is configured
    pub llm: bool,
    /// A structural code index is available for context enrichment
    pub structural_index: bool,
    /// Language-server diagnostics are being collected
    pub lsp: bool,
}

impl Capabilities {
    /// Everything off; analysis still works, fixes degrade to "no fix".
    pub fn none() -> Self {
        Self::default()
    }
}
