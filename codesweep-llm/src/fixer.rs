//! Fix Orchestration
//!
//! Drives the per-error pipeline: read file, gather best-effort context,
//! call the fix service under a deadline, validate the patch, score it.
//! The pipeline's "never fail" guarantee is expressed in the signature:
//! [`FixOrchestrator::generate_fix_for_error`] returns a tagged
//! [`FixOutcome`], so callers can tell "no fix possible" from "fix
//! attempted and rejected" without reading logs.

use crate::client::{FixRequest, FixResponse, LlmFixClient};
use crate::context::{NullIndex, StructureIndex};
use crate::validate;
use codesweep_core::models::{AnalysisError, Capabilities};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::path::Path;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Stages of one fix attempt. Terminal: `Applied`, `Rejected`, `Failed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FixStage {
    Pending,
    ContextGathered,
    FixGenerated,
    Validated,
    Applied,
    Rejected,
    Failed,
}

impl fmt::Display for FixStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FixStage::Pending => "pending",
            FixStage::ContextGathered => "context_gathered",
            FixStage::FixGenerated => "fix_generated",
            FixStage::Validated => "validated",
            FixStage::Applied => "applied",
            FixStage::Rejected => "rejected",
            FixStage::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// One proposed fix. Ephemeral: lives in the in-memory results list only.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FixResult {
    pub error: AnalysisError,
    pub fixed_code: String,
    pub syntax_valid: bool,
    pub confidence: f64,
    pub explanation: Option<String>,
}

/// Tagged outcome of one fix attempt.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum FixOutcome {
    /// Fix generated and syntactically valid
    Fixed(FixResult),
    /// A fix was attempted but is not usable (invalid syntax, or the
    /// model produced no replacement code)
    Rejected {
        reason: String,
        result: Option<FixResult>,
    },
    /// Some pipeline stage failed; the error is skipped
    Failed { stage: FixStage, reason: String },
}

impl FixOutcome {
    pub fn is_fixed(&self) -> bool {
        matches!(self, FixOutcome::Fixed(_))
    }

    pub fn result(&self) -> Option<&FixResult> {
        match self {
            FixOutcome::Fixed(result) => Some(result),
            FixOutcome::Rejected { result, .. } => result.as_ref(),
            FixOutcome::Failed { .. } => None,
        }
    }
}

/// Pluggable confidence heuristic. The default increments are
/// illustrative, not calibrated; swap the whole model if you have a
/// better one.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ConfidenceModel {
    pub base: f64,
    pub syntax_valid_bonus: f64,
    pub context_bonus: f64,
    pub explanation_bonus: f64,
    pub low_similarity_penalty: f64,
    /// Jaccard line-set similarity below this is suspicious
    pub similarity_floor: f64,
}

impl Default for ConfidenceModel {
    fn default() -> Self {
        Self {
            base: 0.5,
            syntax_valid_bonus: 0.2,
            context_bonus: 0.1,
            explanation_bonus: 0.1,
            low_similarity_penalty: 0.1,
            similarity_floor: 0.3,
        }
    }
}

impl ConfidenceModel {
    pub fn score(
        &self,
        syntax_valid: bool,
        context_gathered: bool,
        has_explanation: bool,
        similarity: f64,
    ) -> f64 {
        let mut score = self.base;
        if syntax_valid {
            score += self.syntax_valid_bonus;
        }
        if context_gathered {
            score += self.context_bonus;
        }
        if has_explanation {
            score += self.explanation_bonus;
        }
        if similarity < self.similarity_floor {
            score -= self.low_similarity_penalty;
        }
        score.clamp(0.0, 1.0)
    }
}

/// Jaccard similarity over the sets of trimmed non-empty lines.
pub fn line_similarity(original: &str, fixed: &str) -> f64 {
    let lines = |s: &str| -> HashSet<String> {
        s.lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .map(ToString::to_string)
            .collect()
    };
    let original = lines(original);
    let fixed = lines(fixed);
    if original.is_empty() && fixed.is_empty() {
        return 1.0;
    }
    let intersection = original.intersection(&fixed).count();
    let union = original.union(&fixed).count();
    intersection as f64 / union as f64
}

/// Report over one batch of fix attempts.
#[derive(Debug, Serialize)]
pub struct BatchFixReport {
    pub attempted: usize,
    pub applied: usize,
    pub outcomes: Vec<FixOutcome>,
}

/// Produces and optionally applies AI-generated patches for a bounded
/// subset of errors. Processing is sequential; concurrent application to
/// the same file is the caller's problem to avoid, and this type never
/// creates it.
pub struct FixOrchestrator {
    client: LlmFixClient,
    index: Box<dyn StructureIndex>,
    capabilities: Capabilities,
    confidence: ConfidenceModel,
    fix_timeout: Duration,
    validation_timeout: Duration,
}

impl FixOrchestrator {
    pub fn new(client: LlmFixClient, capabilities: Capabilities) -> Self {
        Self {
            client,
            index: Box::new(NullIndex),
            capabilities,
            confidence: ConfidenceModel::default(),
            fix_timeout: Duration::from_secs(90),
            validation_timeout: Duration::from_secs(15),
        }
    }

    pub fn with_index(mut self, index: Box<dyn StructureIndex>) -> Self {
        self.index = index;
        self
    }

    pub fn with_confidence_model(mut self, model: ConfidenceModel) -> Self {
        self.confidence = model;
        self
    }

    pub fn with_fix_timeout(mut self, timeout: Duration) -> Self {
        self.fix_timeout = timeout;
        self
    }

    /// Attempt one fix. Infallible by construction: every stage error is
    /// caught and labeled, and the method always returns an outcome.
    pub async fn generate_fix_for_error(&self, error: &AnalysisError) -> FixOutcome {
        let path = Path::new(&error.file_path);
        let original = match tokio::fs::read_to_string(path).await {
            Ok(content) => content,
            Err(e) => {
                warn!("cannot read {} for fixing: {e}", error.file_path);
                return FixOutcome::Failed {
                    stage: FixStage::Pending,
                    reason: format!("cannot read {}: {e}", error.file_path),
                };
            }
        };

        // Context gathering is best-effort: a missing or failing index
        // must never abort the attempt.
        let context = if self.capabilities.structural_index {
            self.index.context_for(path, error.line)
        } else {
            None
        };
        let context_gathered = context.as_ref().is_some_and(|c| !c.is_empty());

        let request = FixRequest {
            module_name: path
                .file_stem()
                .map_or_else(|| "module".to_string(), |s| s.to_string_lossy().into_owned()),
            current_code: original.clone(),
            error_type: error.error_type.clone(),
            error_message: error.message.clone(),
            traceback: synthetic_traceback(error),
            source_file: error.file_path.clone(),
            structural_context: context.map(|c| c.render()),
        };

        if !self.capabilities.llm {
            return FixOutcome::Failed {
                stage: FixStage::ContextGathered,
                reason: "no fix backend configured".to_string(),
            };
        }

        let response: FixResponse =
            match tokio::time::timeout(self.fix_timeout, self.client.generate_fix(&request)).await
            {
                // Dropping the request future on expiry also cancels the
                // underlying HTTP call.
                Err(_) => {
                    warn!(
                        "fix generation for {}:{} exceeded {}s",
                        error.file_path,
                        error.line,
                        self.fix_timeout.as_secs()
                    );
                    return FixOutcome::Failed {
                        stage: FixStage::ContextGathered,
                        reason: format!("timed out after {}s", self.fix_timeout.as_secs()),
                    };
                }
                Ok(Err(e)) => {
                    warn!("fix generation failed for {}:{}: {e}", error.file_path, error.line);
                    return FixOutcome::Failed {
                        stage: FixStage::ContextGathered,
                        reason: e.to_string(),
                    };
                }
                Ok(Ok(response)) => response,
            };

        if response.fixed_code.trim().is_empty() {
            return FixOutcome::Rejected {
                reason: "model produced no replacement code".to_string(),
                result: None,
            };
        }

        let check = validate::validate_python(&response.fixed_code, self.validation_timeout).await;
        let similarity = line_similarity(&original, &response.fixed_code);
        let confidence = self.confidence.score(
            check.valid,
            context_gathered,
            response.explanation.is_some(),
            similarity,
        );
        debug!(
            "fix for {}:{}: valid={} similarity={similarity:.2} confidence={confidence:.2}",
            error.file_path, error.line, check.valid
        );

        let result = FixResult {
            error: error.clone(),
            fixed_code: response.fixed_code,
            syntax_valid: check.valid,
            confidence,
            explanation: response.explanation,
        };

        if check.valid {
            FixOutcome::Fixed(result)
        } else {
            FixOutcome::Rejected {
                reason: format!("proposed code does not parse: {}", check.detail),
                result: Some(result),
            }
        }
    }

    /// Overwrite `path` with `new_content`, backing the original up first.
    /// Returns `false` (never an error) when anything goes wrong; on a
    /// failed write the backup is restored.
    pub async fn apply_fix_to_file(&self, path: &Path, new_content: &str) -> bool {
        if !path.is_file() {
            warn!("refusing to apply fix: {} does not exist", path.display());
            return false;
        }

        let backup = backup_path(path);
        if let Err(e) = tokio::fs::copy(path, &backup).await {
            warn!("backup of {} failed, not writing: {e}", path.display());
            return false;
        }

        match tokio::fs::write(path, new_content).await {
            Ok(()) => {
                info!("applied fix to {} (backup at {})", path.display(), backup.display());
                true
            }
            Err(e) => {
                warn!("write to {} failed: {e}, restoring backup", path.display());
                if let Err(restore) = tokio::fs::copy(&backup, path).await {
                    warn!("restore of {} also failed: {restore}", path.display());
                }
                false
            }
        }
    }

    /// Fix up to `max_fixes` errors sequentially. One error's failure
    /// never stops the batch.
    pub async fn batch_fix_errors(
        &self,
        errors: &[AnalysisError],
        max_fixes: usize,
        apply: bool,
    ) -> BatchFixReport {
        let mut outcomes = Vec::new();
        let mut applied = 0;

        for error in errors.iter().take(max_fixes) {
            let mut outcome = self.generate_fix_for_error(error).await;
            if apply {
                let mut failed_write = None;
                if let FixOutcome::Fixed(result) = &outcome {
                    if self
                        .apply_fix_to_file(Path::new(&result.error.file_path), &result.fixed_code)
                        .await
                    {
                        applied += 1;
                    } else {
                        failed_write = Some(result.error.file_path.clone());
                    }
                }
                if let Some(file) = failed_write {
                    outcome = FixOutcome::Failed {
                        stage: FixStage::Applied,
                        reason: format!("could not write {file}"),
                    };
                }
            }
            outcomes.push(outcome);
        }

        let report = BatchFixReport {
            attempted: errors.len().min(max_fixes),
            applied,
            outcomes,
        };
        info!(
            "batch fix: attempted={} applied={}",
            report.attempted, report.applied
        );
        report
    }
}

/// Synthetic traceback embedding the diagnostic's coordinates, in the
/// shape the fix service expects.
fn synthetic_traceback(error: &AnalysisError) -> String {
    format!(
        "Traceback (most recent call last):\n  File \"{}\", line {}, in <module>\n{}: {}",
        error.file_path, error.line, error.error_type, error.message
    )
}

fn backup_path(path: &Path) -> std::path::PathBuf {
    let stamp = chrono::Utc::now().format("%Y%m%d%H%M%S%3f");
    let name = path
        .file_name()
        .map_or_else(|| "file".to_string(), |n| n.to_string_lossy().into_owned());
    path.with_file_name(format!("{name}.{stamp}.bak"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use codesweep_core::models::{Category, Severity};
    use proptest::prelude::*;

    fn orchestrator(capabilities: Capabilities) -> FixOrchestrator {
        let config = crate::LlmConfig {
            base_url: "http://127.0.0.1:1".to_string(),
            api_key: Some("unused".to_string()),
            ..crate::LlmConfig::default()
        };
        FixOrchestrator::new(LlmFixClient::new(config).unwrap(), capabilities)
    }

    fn error_for(path: &str) -> AnalysisError {
        AnalysisError::new(
            path,
            1,
            1,
            "F821",
            Severity::Error,
            "undefined name",
            "ruff",
            Category::LogicCritical,
        )
    }

    #[tokio::test]
    async fn test_generate_fix_never_fails_on_malformed_error() {
        let orchestrator = orchestrator(Capabilities::none());
        // Missing file and empty message: must degrade, not panic
        let malformed = AnalysisError::new(
            "/no/such/file.py",
            0,
            0,
            "",
            Severity::Error,
            "",
            "ruff",
            Category::General,
        );
        let outcome = orchestrator.generate_fix_for_error(&malformed).await;
        assert!(matches!(
            outcome,
            FixOutcome::Failed {
                stage: FixStage::Pending,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn test_no_backend_fails_at_context_stage() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("a.py");
        std::fs::write(&file, "x = 1\n").unwrap();

        let orchestrator = orchestrator(Capabilities::none());
        let outcome = orchestrator
            .generate_fix_for_error(&error_for(file.to_str().unwrap()))
            .await;
        match outcome {
            FixOutcome::Failed { stage, reason } => {
                assert_eq!(stage, FixStage::ContextGathered);
                assert!(reason.contains("no fix backend"));
            }
            other => panic!("expected Failed, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_apply_fix_nonexistent_path_returns_false() {
        let orchestrator = orchestrator(Capabilities::none());
        let applied = orchestrator
            .apply_fix_to_file(Path::new("/no/such/file.py"), "x = 1\n")
            .await;
        assert!(!applied);
        assert!(!Path::new("/no/such/file.py").exists());
    }

    #[tokio::test]
    async fn test_apply_fix_creates_backup() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("a.py");
        std::fs::write(&file, "old = True\n").unwrap();

        let orchestrator = orchestrator(Capabilities::none());
        assert!(orchestrator.apply_fix_to_file(&file, "new = True\n").await);

        assert_eq!(std::fs::read_to_string(&file).unwrap(), "new = True\n");
        let backups: Vec<_> = std::fs::read_dir(dir.path())
            .unwrap()
            .filter_map(std::result::Result::ok)
            .filter(|e| e.file_name().to_string_lossy().ends_with(".bak"))
            .collect();
        assert_eq!(backups.len(), 1);
        assert_eq!(
            std::fs::read_to_string(backups[0].path()).unwrap(),
            "old = True\n"
        );
    }

    #[test]
    fn test_line_similarity() {
        assert!((line_similarity("a\nb\nc\n", "a\nb\nc\n") - 1.0).abs() < f64::EPSILON);
        assert!((line_similarity("a\nb\n", "c\nd\n")).abs() < f64::EPSILON);
        let partial = line_similarity("a\nb\nc\n", "a\nb\nd\n");
        assert!(partial > 0.4 && partial < 0.6);
        assert!((line_similarity("", "") - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_confidence_model_default_values() {
        let model = ConfidenceModel::default();
        // base + valid + context + explanation, high similarity
        assert!((model.score(true, true, true, 0.9) - 0.9).abs() < 1e-9);
        // base only, low similarity
        assert!((model.score(false, false, false, 0.1) - 0.4).abs() < 1e-9);
    }

    proptest! {
        #[test]
        fn prop_confidence_always_clamped(
            valid in any::<bool>(),
            context in any::<bool>(),
            explanation in any::<bool>(),
            similarity in 0.0f64..1.0,
            base in -2.0f64..2.0,
        ) {
            let model = ConfidenceModel {
                base,
                ..ConfidenceModel::default()
            };
            let score = model.score(valid, context, explanation, similarity);
            prop_assert!((0.0..=1.0).contains(&score));
        }
    }
}
