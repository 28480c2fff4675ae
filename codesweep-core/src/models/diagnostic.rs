//! The uniform diagnostic record produced by every output parser

use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::str::FromStr;

/// Normalized severity for a diagnostic, independent of tool vocabulary.
///
/// Every parser maps its tool's native severities into this enum; raw
/// tool strings never cross a parser boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Severity {
    Error,
    Warning,
    Security,
    Info,
    Hint,
}

impl Severity {
    pub fn as_str(self) -> &'static str {
        match self {
            Severity::Error => "ERROR",
            Severity::Warning => "WARNING",
            Severity::Security => "SECURITY",
            Severity::Info => "INFO",
            Severity::Hint => "HINT",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Severity {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "ERROR" => Ok(Severity::Error),
            "WARNING" => Ok(Severity::Warning),
            "SECURITY" => Ok(Severity::Security),
            "INFO" => Ok(Severity::Info),
            "HINT" => Ok(Severity::Hint),
            other => Err(format!("unknown severity: '{other}'")),
        }
    }
}

/// Coarse bucket a diagnostic belongs to, used for reporting and fix
/// prioritization. Distinct from the tool-native error code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    SyntaxCritical,
    TypeCritical,
    SecurityCritical,
    LogicCritical,
    ImportCritical,
    PerformanceMajor,
    StyleMajor,
    DocumentationMajor,
    NamingMajor,
    DependencyMajor,
    AsyncMajor,
    General,
}

impl Category {
    /// The fixed taxonomy, in fix-priority order (critical buckets first).
    pub const ALL: [Category; 12] = [
        Category::SyntaxCritical,
        Category::TypeCritical,
        Category::SecurityCritical,
        Category::LogicCritical,
        Category::ImportCritical,
        Category::PerformanceMajor,
        Category::StyleMajor,
        Category::DocumentationMajor,
        Category::NamingMajor,
        Category::DependencyMajor,
        Category::AsyncMajor,
        Category::General,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Category::SyntaxCritical => "syntax_critical",
            Category::TypeCritical => "type_critical",
            Category::SecurityCritical => "security_critical",
            Category::LogicCritical => "logic_critical",
            Category::ImportCritical => "import_critical",
            Category::PerformanceMajor => "performance_major",
            Category::StyleMajor => "style_major",
            Category::DocumentationMajor => "documentation_major",
            Category::NamingMajor => "naming_major",
            Category::DependencyMajor => "dependency_major",
            Category::AsyncMajor => "async_major",
            Category::General => "general",
        }
    }

    /// Critical buckets drive fix prioritization and the critical count.
    pub fn is_critical(self) -> bool {
        matches!(
            self,
            Category::SyntaxCritical
                | Category::TypeCritical
                | Category::SecurityCritical
                | Category::LogicCritical
                | Category::ImportCritical
        )
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Category::ALL
            .iter()
            .copied()
            .find(|c| c.as_str() == s)
            .ok_or_else(|| format!("unknown category: '{s}'"))
    }
}

/// One diagnostic from any tool, normalized into a common shape.
///
/// Immutable once constructed: parsers create it, the aggregator and fix
/// orchestrator only read it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisError {
    pub file_path: String,
    pub line: usize,
    pub column: usize,
    /// Tool-specific code, e.g. `E501` or `B602`
    pub error_type: String,
    pub severity: Severity,
    pub message: String,
    /// Which tool produced this diagnostic
    pub tool_source: String,
    pub category: Category,
    pub fix_suggestion: Option<String>,
    /// How much the producing tool trusts this finding, in [0, 1]
    #[serde(deserialize_with = "clamp_unit_interval")]
    confidence: f64,
}

fn clamp_unit_interval<'de, D>(deserializer: D) -> std::result::Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    let value = f64::deserialize(deserializer)?;
    Ok(value.clamp(0.0, 1.0))
}

impl AnalysisError {
    /// Create a diagnostic. `confidence` is clamped into [0, 1].
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        file_path: impl Into<String>,
        line: usize,
        column: usize,
        error_type: impl Into<String>,
        severity: Severity,
        message: impl Into<String>,
        tool_source: impl Into<String>,
        category: Category,
    ) -> Self {
        Self {
            file_path: file_path.into(),
            line,
            column,
            error_type: error_type.into(),
            severity,
            message: message.into(),
            tool_source: tool_source.into(),
            category,
            fix_suggestion: None,
            confidence: 1.0,
        }
    }

    pub fn with_confidence(mut self, confidence: f64) -> Self {
        self.confidence = confidence.clamp(0.0, 1.0);
        self
    }

    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.fix_suggestion = Some(suggestion.into());
        self
    }

    pub fn confidence(&self) -> f64 {
        self.confidence
    }

    /// Synthetic record for a tool that could not produce diagnostics
    /// (missing executable, timeout, failed run). Never fatal to the run.
    pub fn tool_failure(
        tool: impl Into<String>,
        error_type: &str,
        severity: Severity,
        message: impl Into<String>,
    ) -> Self {
        let tool = tool.into();
        Self {
            file_path: String::new(),
            line: 0,
            column: 0,
            error_type: error_type.to_string(),
            severity,
            message: message.into(),
            tool_source: tool,
            category: Category::General,
            fix_suggestion: None,
            confidence: 1.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_confidence_clamped_on_construction() {
        let err = AnalysisError::new(
            "a.py",
            1,
            1,
            "E501",
            Severity::Error,
            "line too long",
            "ruff",
            Category::StyleMajor,
        )
        .with_confidence(3.5);
        assert_eq!(err.confidence(), 1.0);

        let err = err.with_confidence(-0.2);
        assert_eq!(err.confidence(), 0.0);
    }

    #[test]
    fn test_confidence_clamped_on_deserialization() {
        let json = r#"{
            "file_path": "a.py", "line": 3, "column": 1,
            "error_type": "E501", "severity": "ERROR",
            "message": "line too long", "tool_source": "ruff",
            "category": "style_major", "fix_suggestion": null,
            "confidence": 7.0
        }"#;
        let err: AnalysisError = serde_json::from_str(json).unwrap();
        assert_eq!(err.confidence(), 1.0);
    }

    #[test]
    fn test_serde_round_trip_preserves_fields() {
        let original = AnalysisError::new(
            "src/main.py",
            42,
            7,
            "F821",
            Severity::Error,
            "undefined name 'foo'",
            "ruff",
            Category::LogicCritical,
        );
        let json = serde_json::to_string(&original).unwrap();
        let restored: AnalysisError = serde_json::from_str(&json).unwrap();
        assert_eq!(restored.file_path, original.file_path);
        assert_eq!(restored.line, original.line);
        assert_eq!(restored.message, original.message);
        assert_eq!(restored.severity, original.severity);
        assert_eq!(restored.category, original.category);
    }

    #[test]
    fn test_severity_round_trip() {
        for severity in [
            Severity::Error,
            Severity::Warning,
            Severity::Security,
            Severity::Info,
            Severity::Hint,
        ] {
            assert_eq!(severity.as_str().parse::<Severity>().unwrap(), severity);
        }
    }

    #[test]
    fn test_category_round_trip() {
        for category in Category::ALL {
            assert_eq!(category.as_str().parse::<Category>().unwrap(), category);
        }
    }
}
