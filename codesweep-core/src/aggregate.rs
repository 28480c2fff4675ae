//! Error Aggregation and Scoring
//!
//! Turns the flat diagnostic list collected from every tool into a
//! categorized, queryable report: fixed-taxonomy buckets, summary
//! statistics, and a 0-100 quality score. Pure data transformation,
//! no I/O, single pass plus grouping.

use crate::models::{AnalysisError, Category, Severity};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Keywords that promote a severity-ERROR diagnostic into a critical
/// sub-bucket ahead of the category its parser assigned.
const SYNTAX_KEYWORDS: &[&str] = &[
    "syntax",
    "unexpected indent",
    "unterminated",
    "parse error",
    "invalid token",
];
const IMPORT_KEYWORDS: &[&str] = &[
    "import",
    "no module named",
    "module not found",
    "unresolved reference",
];
const TYPE_KEYWORDS: &[&str] = &["type", "incompatible", "annotation", "attribute"];

/// Summary statistics over one analysis run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorStatistics {
    pub total_errors: usize,
    pub by_severity: BTreeMap<String, usize>,
    pub by_tool: BTreeMap<String, usize>,
    pub by_category: BTreeMap<String, usize>,
    /// Union of the syntax/type/security critical buckets
    pub critical_count: usize,
}

/// Codebase-level inputs to the quality score that do not come from the
/// diagnostic list itself.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct CodebaseMetrics {
    pub high_complexity_functions: usize,
    pub vulnerable_dependencies: usize,
}

/// Penalty weights for the quality score. The defaults are illustrative
/// heuristics, not a calibrated contract, so they are data rather than
/// constants baked into the scoring code.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ScoreWeights {
    pub error: f64,
    pub security: f64,
    pub warning: f64,
    pub info: f64,
    pub high_complexity_function: f64,
    pub vulnerable_dependency: f64,
}

impl Default for ScoreWeights {
    fn default() -> Self {
        Self {
            error: 5.0,
            security: 8.0,
            warning: 2.0,
            info: 0.5,
            high_complexity_function: 3.0,
            vulnerable_dependency: 10.0,
        }
    }
}

/// Categorizes, counts and scores diagnostics.
#[derive(Debug, Clone, Default)]
pub struct ErrorAggregator {
    weights: ScoreWeights,
}

impl ErrorAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_weights(weights: ScoreWeights) -> Self {
        Self { weights }
    }

    /// Bucket diagnostics by the fixed taxonomy. Every category key is
    /// present in the result, mapped to an empty list when unused.
    ///
    /// Priority rule: a severity-ERROR diagnostic whose message matches
    /// syntax/import/type keywords lands in that critical sub-bucket
    /// before the parser-assigned category is consulted.
    pub fn categorize(&self, errors: &[AnalysisError]) -> BTreeMap<Category, Vec<AnalysisError>> {
        let mut buckets: BTreeMap<Category, Vec<AnalysisError>> = Category::ALL
            .iter()
            .map(|&category| (category, Vec::new()))
            .collect();

        for error in errors {
            let category = Self::effective_category(error);
            buckets
                .entry(category)
                .or_default()
                .push(error.clone());
        }
        buckets
    }

    fn effective_category(error: &AnalysisError) -> Category {
        if error.severity == Severity::Error {
            let message = error.message.to_lowercase();
            if SYNTAX_KEYWORDS.iter().any(|k| message.contains(k)) {
                return Category::SyntaxCritical;
            }
            if IMPORT_KEYWORDS.iter().any(|k| message.contains(k)) {
                return Category::ImportCritical;
            }
            if TYPE_KEYWORDS.iter().any(|k| message.contains(k)) {
                return Category::TypeCritical;
            }
        }
        error.category
    }

    /// Count diagnostics by severity, tool and category.
    pub fn statistics(&self, errors: &[AnalysisError]) -> ErrorStatistics {
        let mut by_severity: BTreeMap<String, usize> = BTreeMap::new();
        let mut by_tool: BTreeMap<String, usize> = BTreeMap::new();
        let mut by_category: BTreeMap<String, usize> = BTreeMap::new();
        let mut critical_count = 0;

        for error in errors {
            *by_severity
                .entry(error.severity.as_str().to_string())
                .or_insert(0) += 1;
            *by_tool.entry(error.tool_source.clone()).or_insert(0) += 1;

            let category = Self::effective_category(error);
            *by_category.entry(category.as_str().to_string()).or_insert(0) += 1;
            if matches!(
                category,
                Category::SyntaxCritical | Category::TypeCritical | Category::SecurityCritical
            ) {
                critical_count += 1;
            }
        }

        ErrorStatistics {
            total_errors: errors.len(),
            by_severity,
            by_tool,
            by_category,
            critical_count,
        }
    }

    /// Quality score in [0, 100]: starts at 100 and subtracts weighted
    /// penalties per diagnostic plus codebase-level penalties. Clamped,
    /// never negative, never above 100.
    pub fn quality_score(&self, errors: &[AnalysisError], metrics: &CodebaseMetrics) -> f64 {
        let mut score = 100.0;

        for error in errors {
            score -= match error.severity {
                Severity::Error => self.weights.error,
                Severity::Security => self.weights.security,
                Severity::Warning => self.weights.warning,
                Severity::Info => self.weights.info,
                Severity::Hint => 0.0,
            };
        }

        score -= metrics.high_complexity_functions as f64 * self.weights.high_complexity_function;
        score -= metrics.vulnerable_dependencies as f64 * self.weights.vulnerable_dependency;

        score.clamp(0.0, 100.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn error(severity: Severity, category: Category, message: &str) -> AnalysisError {
        AnalysisError::new("f.py", 1, 1, "X1", severity, message, "tool", category)
    }

    #[test]
    fn test_categorize_empty_has_all_keys() {
        let aggregator = ErrorAggregator::new();
        let buckets = aggregator.categorize(&[]);
        assert_eq!(buckets.len(), Category::ALL.len());
        assert!(buckets.values().all(Vec::is_empty));
        assert_eq!(aggregator.statistics(&[]).total_errors, 0);
    }

    #[test]
    fn test_keyword_promotion_over_parser_category() {
        let aggregator = ErrorAggregator::new();
        let errors = vec![
            error(Severity::Error, Category::General, "invalid syntax near 'def'"),
            error(Severity::Error, Category::General, "No module named 'requests'"),
            error(Severity::Error, Category::General, "incompatible type in call"),
            // Warnings never get promoted
            error(Severity::Warning, Category::General, "syntax looks odd"),
        ];
        let buckets = aggregator.categorize(&errors);
        assert_eq!(buckets[&Category::SyntaxCritical].len(), 1);
        assert_eq!(buckets[&Category::ImportCritical].len(), 1);
        assert_eq!(buckets[&Category::TypeCritical].len(), 1);
        assert_eq!(buckets[&Category::General].len(), 1);
    }

    #[test]
    fn test_statistics_counts() {
        let aggregator = ErrorAggregator::new();
        let errors = vec![
            error(Severity::Error, Category::LogicCritical, "broke"),
            error(Severity::Security, Category::SecurityCritical, "exploitable"),
            error(Severity::Warning, Category::StyleMajor, "untidy"),
        ];
        let stats = aggregator.statistics(&errors);
        assert_eq!(stats.total_errors, 3);
        assert_eq!(stats.by_severity["ERROR"], 1);
        assert_eq!(stats.by_severity["SECURITY"], 1);
        assert_eq!(stats.by_tool["tool"], 3);
        // security_critical counts toward critical, logic/style do not
        assert_eq!(stats.critical_count, 1);
    }

    #[test]
    fn test_quality_score_weights() {
        let aggregator = ErrorAggregator::new();
        let errors = vec![
            error(Severity::Error, Category::LogicCritical, "a"),
            error(Severity::Security, Category::SecurityCritical, "b"),
            error(Severity::Warning, Category::StyleMajor, "c"),
            error(Severity::Info, Category::StyleMajor, "d"),
        ];
        let metrics = CodebaseMetrics {
            high_complexity_functions: 1,
            vulnerable_dependencies: 1,
        };
        // 100 - 5 - 8 - 2 - 0.5 - 3 - 10 = 71.5
        let score = aggregator.quality_score(&errors, &metrics);
        assert!((score - 71.5).abs() < 1e-9);
    }

    #[test]
    fn test_quality_score_perfect_when_clean() {
        let aggregator = ErrorAggregator::new();
        assert!(
            (aggregator.quality_score(&[], &CodebaseMetrics::default()) - 100.0).abs()
                < f64::EPSILON
        );
    }

    fn severity_strategy() -> impl Strategy<Value = Severity> {
        prop_oneof![
            Just(Severity::Error),
            Just(Severity::Warning),
            Just(Severity::Security),
            Just(Severity::Info),
            Just(Severity::Hint),
        ]
    }

    proptest! {
        #[test]
        fn prop_quality_score_clamped(
            severities in prop::collection::vec(severity_strategy(), 0..300),
            complexity in 0usize..50,
            vulnerable in 0usize..50,
        ) {
            let aggregator = ErrorAggregator::new();
            let errors: Vec<AnalysisError> = severities
                .into_iter()
                .map(|s| error(s, Category::General, "m"))
                .collect();
            let metrics = CodebaseMetrics {
                high_complexity_functions: complexity,
                vulnerable_dependencies: vulnerable,
            };
            let score = aggregator.quality_score(&errors, &metrics);
            prop_assert!((0.0..=100.0).contains(&score));
        }

        #[test]
        fn prop_quality_score_non_increasing(
            severities in prop::collection::vec(severity_strategy(), 0..100),
        ) {
            let aggregator = ErrorAggregator::new();
            let mut errors: Vec<AnalysisError> = severities
                .into_iter()
                .map(|s| error(s, Category::General, "m"))
                .collect();
            let metrics = CodebaseMetrics::default();
            let before = aggregator.quality_score(&errors, &metrics);
            errors.push(error(Severity::Error, Category::General, "extra"));
            errors.push(error(Severity::Security, Category::General, "extra"));
            let after = aggregator.quality_score(&errors, &metrics);
            prop_assert!(after <= before);
        }
    }
}
