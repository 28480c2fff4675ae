//! Per-run analysis session bookkeeping

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// One row per analysis invocation. Created when a run starts and
/// finalized exactly once with the total error count when it completes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisSession {
    pub id: String,
    pub target_path: String,
    pub timestamp: DateTime<Utc>,
    pub tools_used: Vec<String>,
    pub total_errors: usize,
    pub config_hash: String,
    pub completed: bool,
}

impl AnalysisSession {
    pub fn begin(target: &Path, tools_used: Vec<String>, config_hash: String) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            target_path: target.display().to_string(),
            timestamp: Utc::now(),
            tools_used,
            total_errors: 0,
            config_hash,
            completed: false,
        }
    }

    pub fn finalize(&mut self, total_errors: usize) {
        self.total_errors = total_errors;
        self.completed = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_lifecycle() {
        let mut session = AnalysisSession::begin(
            Path::new("/tmp/project"),
            vec!["ruff".to_string(), "mypy".to_string()],
            "deadbeef".to_string(),
        );
        assert!(!session.completed);
        assert_eq!(session.total_errors, 0);

        session.finalize(17);
        assert!(session.completed);
        assert_eq!(session.total_errors, 17);
    }
}
