//! Analysis driver: wires the runner, parsers, aggregator, store and fix
//! orchestrator together for one CLI invocation.

use crate::report::{self, AnalysisReport, FixSummary};
use crate::{Cli, ReportFormat};
use anyhow::{bail, Context};
use codesweep_core::aggregate::{CodebaseMetrics, ErrorAggregator};
use codesweep_core::models::{AnalysisError, AnalysisSession, Capabilities, Category};
use codesweep_core::parsers::ParserRegistry;
use codesweep_core::tools::{config_hash, default_tool_table, ToolConfig, ToolOverrides, ToolRunner};
use codesweep_llm::{FixOrchestrator, FixOutcome, LlmConfig, LlmFixClient, SourceScanIndex};
use codesweep_store::ErrorDatabase;
use indicatif::{ProgressBar, ProgressStyle};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{info, warn};

/// How many fixes one category may consume before the next category gets
/// a turn.
const MAX_FIXES_PER_CATEGORY: usize = 5;

pub async fn run(cli: Cli) -> anyhow::Result<()> {
    let target = cli
        .target
        .clone()
        .context("--target is required for analysis")?;
    if !target.exists() {
        bail!("target {} does not exist", target.display());
    }

    let table = build_tool_table(&cli)?;
    let capabilities = detect_capabilities();

    // Database open failure is fatal; nothing else in the run is.
    let db_path = cli
        .db
        .clone()
        .unwrap_or_else(|| default_db_path(&target));
    let db = ErrorDatabase::open(&db_path)
        .with_context(|| format!("cannot open database at {}", db_path.display()))?;

    let enabled: Vec<String> = table
        .iter()
        .filter(|t| t.enabled)
        .map(|t| t.name.clone())
        .collect();
    let mut session = AnalysisSession::begin(&target, enabled, config_hash(&table));
    db.create_session(&session)
        .context("cannot record analysis session")?;

    let errors = collect_errors(&table, &target).await;

    let aggregator = ErrorAggregator::new();
    let statistics = aggregator.statistics(&errors);
    let buckets = aggregator.categorize(&errors);
    let metrics = derive_metrics(&errors);
    let quality_score = aggregator.quality_score(&errors, &metrics);

    if let Err(e) = db.insert_errors(&session.id, &errors) {
        warn!("could not persist diagnostics: {e}");
    }
    session.finalize(errors.len());
    if let Err(e) = db.finalize_session(&session.id, session.total_errors) {
        warn!("could not finalize session: {e}");
    }

    let fixes = if cli.fix_errors {
        Some(run_fixes(&cli, &target, &buckets, capabilities).await)
    } else {
        None
    };

    let analysis = AnalysisReport {
        session,
        statistics,
        quality_score,
        category_counts: buckets
            .iter()
            .map(|(category, bucket)| (category.as_str().to_string(), bucket.len()))
            .collect(),
        errors,
        fixes,
    };

    emit_report(&cli, &analysis)?;
    Ok(())
}

fn build_tool_table(cli: &Cli) -> anyhow::Result<Vec<ToolConfig>> {
    let mut table = default_tool_table();
    if let Some(path) = &cli.config {
        let overrides = ToolOverrides::load(path)
            .with_context(|| format!("cannot load config {}", path.display()))?;
        overrides.apply(&mut table);
    }
    if !cli.comprehensive {
        // Optional tier (and anything needing the network) only runs on
        // explicit request
        for tool in &mut table {
            if tool.tier == 3 || tool.requires_network {
                tool.enabled = false;
            }
        }
    }
    Ok(table)
}

fn detect_capabilities() -> Capabilities {
    let llm = LlmConfig::default().resolved_api_key().is_some()
        || std::env::var("CODESWEEP_LLM_URL").is_ok();
    Capabilities {
        llm,
        structural_index: true,
        lsp: false,
    }
}

fn default_db_path(target: &Path) -> PathBuf {
    let base = if target.is_dir() {
        target.to_path_buf()
    } else {
        target.parent().map_or_else(|| PathBuf::from("."), Path::to_path_buf)
    };
    base.join(".codesweep").join("history.db")
}

async fn collect_errors(table: &[ToolConfig], target: &Path) -> Vec<AnalysisError> {
    let active = table.iter().filter(|t| t.enabled).count();
    let spinner = ProgressBar::new_spinner().with_style(
        ProgressStyle::with_template("{spinner} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    spinner.enable_steady_tick(Duration::from_millis(120));
    spinner.set_message(format!("running {active} analysis tool(s)..."));

    let runner = ToolRunner::new();
    let outcomes = runner.run_all(table, target).await;
    spinner.finish_and_clear();

    let registry = ParserRegistry::with_defaults();
    let mut errors = Vec::new();
    for outcome in &outcomes {
        info!(
            "{}: exit={:?} elapsed={:.1}s timed_out={} skipped={}",
            outcome.tool,
            outcome.exit_code,
            outcome.elapsed.as_secs_f64(),
            outcome.timed_out,
            outcome.skipped
        );
        errors.extend(registry.parse_outcome(outcome));
    }
    errors
}

/// Metrics the quality score needs that come from the diagnostics
/// themselves: complexity findings and vulnerable dependencies.
fn derive_metrics(errors: &[AnalysisError]) -> CodebaseMetrics {
    CodebaseMetrics {
        high_complexity_functions: errors
            .iter()
            .filter(|e| e.error_type.starts_with("C9"))
            .count(),
        vulnerable_dependencies: errors
            .iter()
            .filter(|e| e.category == Category::DependencyMajor)
            .count(),
    }
}

/// Critical categories first, bounded per category and in total. Synthetic
/// tool records carry no file and are never fix candidates.
fn select_fix_candidates(
    buckets: &std::collections::BTreeMap<Category, Vec<AnalysisError>>,
    max_fixes: usize,
) -> Vec<AnalysisError> {
    let mut candidates = Vec::new();
    for category in Category::ALL {
        let Some(bucket) = buckets.get(&category) else {
            continue;
        };
        candidates.extend(
            bucket
                .iter()
                .filter(|e| !e.file_path.is_empty())
                .take(MAX_FIXES_PER_CATEGORY)
                .cloned(),
        );
        if candidates.len() >= max_fixes {
            candidates.truncate(max_fixes);
            break;
        }
    }
    candidates
}

async fn run_fixes(
    cli: &Cli,
    target: &Path,
    buckets: &std::collections::BTreeMap<Category, Vec<AnalysisError>>,
    capabilities: Capabilities,
) -> FixSummary {
    let candidates = select_fix_candidates(buckets, cli.max_fixes);
    if candidates.is_empty() {
        info!("no fixable errors selected");
        return FixSummary::default();
    }
    if !capabilities.llm {
        warn!("--fix-errors requested but no LLM backend is configured (set CODESWEEP_API_KEY or OPENAI_API_KEY)");
        return FixSummary::default();
    }

    let mut config = LlmConfig::default();
    if let Ok(url) = std::env::var("CODESWEEP_LLM_URL") {
        config.base_url = url;
    }
    let client = match LlmFixClient::new(config) {
        Ok(client) => client,
        Err(e) => {
            warn!("cannot construct fix client: {e}");
            return FixSummary::default();
        }
    };

    let orchestrator = FixOrchestrator::new(client, capabilities)
        .with_index(Box::new(SourceScanIndex::new(target)));

    if cli.interactive {
        interactive_fixes(&orchestrator, &candidates).await
    } else {
        let report = orchestrator
            .batch_fix_errors(&candidates, cli.max_fixes, true)
            .await;
        FixSummary::from_batch(&report)
    }
}

/// One confirmation prompt per generated fix; declined fixes are counted
/// as rejected.
async fn interactive_fixes(
    orchestrator: &FixOrchestrator,
    candidates: &[AnalysisError],
) -> FixSummary {
    let mut summary = FixSummary::default();
    for error in candidates {
        summary.attempted += 1;
        let outcome = orchestrator.generate_fix_for_error(error).await;
        let FixOutcome::Fixed(result) = outcome else {
            summary.record_unfixed(&outcome);
            continue;
        };

        println!(
            "\nproposed fix for {}:{} [{}] (confidence {:.2})",
            error.file_path,
            error.line,
            error.error_type,
            result.confidence
        );
        if let Some(explanation) = &result.explanation {
            println!("  {explanation}");
        }
        print!("apply? [y/N] ");
        let _ = std::io::stdout().flush();

        let mut answer = String::new();
        if std::io::stdin().read_line(&mut answer).is_err() {
            warn!("could not read confirmation, skipping");
            summary.rejected += 1;
            continue;
        }
        if answer.trim().eq_ignore_ascii_case("y") {
            if orchestrator
                .apply_fix_to_file(Path::new(&result.error.file_path), &result.fixed_code)
                .await
            {
                summary.applied += 1;
            } else {
                summary.failed += 1;
            }
        } else {
            summary.rejected += 1;
        }
    }
    summary
}

fn emit_report(cli: &Cli, analysis: &AnalysisReport) -> anyhow::Result<()> {
    let rendered = match cli.format {
        ReportFormat::Terminal => report::render_terminal(analysis),
        ReportFormat::Html => report::render_html(analysis),
        ReportFormat::Json => {
            serde_json::to_string_pretty(analysis).context("cannot serialize report")?
        }
    };

    match &cli.output {
        Some(path) => {
            std::fs::write(path, rendered)
                .with_context(|| format!("cannot write report to {}", path.display()))?;
            info!("report written to {}", path.display());
        }
        None => println!("{rendered}"),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use codesweep_core::models::Severity;

    fn error(category: Category, file: &str) -> AnalysisError {
        AnalysisError::new(file, 1, 1, "X", Severity::Error, "m", "tool", category)
    }

    #[test]
    fn test_select_candidates_critical_first() {
        let aggregator = ErrorAggregator::new();
        let errors = vec![
            error(Category::StyleMajor, "style.py"),
            error(Category::SecurityCritical, "sec.py"),
            error(Category::General, ""),
        ];
        // keyword promotion does not apply: messages carry no keywords
        let buckets = aggregator.categorize(&errors);
        let candidates = select_fix_candidates(&buckets, 10);

        assert_eq!(candidates.len(), 2);
        assert_eq!(candidates[0].file_path, "sec.py");
        assert_eq!(candidates[1].file_path, "style.py");
    }

    #[test]
    fn test_select_candidates_respects_cap() {
        let aggregator = ErrorAggregator::new();
        let errors: Vec<AnalysisError> = (0..20)
            .map(|i| error(Category::LogicCritical, &format!("f{i}.py")))
            .collect();
        let buckets = aggregator.categorize(&errors);
        // Per-category bound applies before the overall cap
        let candidates = select_fix_candidates(&buckets, 3);
        assert_eq!(candidates.len(), 3);
        let candidates = select_fix_candidates(&buckets, 10);
        assert_eq!(candidates.len(), MAX_FIXES_PER_CATEGORY);
    }

    #[test]
    fn test_derive_metrics() {
        let errors = vec![
            AnalysisError::new(
                "a.py", 1, 1, "C901", Severity::Warning,
                "too complex", "ruff", Category::PerformanceMajor,
            ),
            AnalysisError::new(
                "requests", 0, 0, "36546", Severity::Security,
                "vulnerable", "safety", Category::DependencyMajor,
            ),
        ];
        let metrics = derive_metrics(&errors);
        assert_eq!(metrics.high_complexity_functions, 1);
        assert_eq!(metrics.vulnerable_dependencies, 1);
    }

    #[test]
    fn test_default_db_path_for_file_target() {
        let path = default_db_path(Path::new("/work/project/app.py"));
        assert_eq!(path, PathBuf::from("/work/project/.codesweep/history.db"));
    }
}
