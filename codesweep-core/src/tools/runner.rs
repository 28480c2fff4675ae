//! Tool process execution with timeouts and tiered fan-out

use super::config::ToolConfig;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::process::Command;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, warn};

/// Structured result of one tool invocation.
///
/// The runner never returns an error for launch failures, timeouts or
/// nonzero exits; callers inspect the flags instead.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolOutcome {
    pub tool: String,
    pub exit_code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
    pub elapsed: Duration,
    /// The tool exceeded its configured timeout and was killed
    pub timed_out: bool,
    /// The executable was not found; the tool did not run
    pub skipped: bool,
}

impl ToolOutcome {
    pub fn success(&self) -> bool {
        !self.timed_out && !self.skipped && self.exit_code == Some(0)
    }

    /// Whether the tool ran and produced anything parseable.
    pub fn produced_output(&self) -> bool {
        !self.timed_out && !self.skipped && !self.stdout.trim().is_empty()
    }

    fn skipped(tool: &str, reason: String) -> Self {
        Self {
            tool: tool.to_string(),
            exit_code: None,
            stdout: String::new(),
            stderr: reason,
            elapsed: Duration::ZERO,
            timed_out: false,
            skipped: true,
        }
    }
}

/// Executes external analysis tools against a target path.
///
/// Tools within the same priority tier fan out onto a bounded worker pool;
/// all tools of a tier complete before the next tier starts. There is no
/// ordering guarantee within a tier.
pub struct ToolRunner {
    max_parallel: usize,
}

impl Default for ToolRunner {
    fn default() -> Self {
        Self { max_parallel: 4 }
    }
}

impl ToolRunner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_parallelism(max_parallel: usize) -> Self {
        Self {
            max_parallel: max_parallel.max(1),
        }
    }

    /// Check whether a tool's executable can be found on PATH.
    pub fn is_available(config: &ToolConfig) -> bool {
        which::which(&config.command).is_ok()
    }

    /// Run a single tool against the target under its configured timeout.
    pub async fn run_tool(&self, config: &ToolConfig, target: &Path) -> ToolOutcome {
        execute_tool(config.clone(), target.to_path_buf()).await
    }

    /// Run every enabled tool, tier by tier (1 first). Within a tier,
    /// invocations run concurrently on the bounded pool.
    pub async fn run_all(&self, configs: &[ToolConfig], target: &Path) -> Vec<ToolOutcome> {
        let mut tiers: Vec<u8> = configs.iter().map(|c| c.tier).collect();
        tiers.sort_unstable();
        tiers.dedup();

        let mut outcomes = Vec::new();
        for tier in tiers {
            let members: Vec<ToolConfig> = configs
                .iter()
                .filter(|c| c.tier == tier && c.enabled)
                .cloned()
                .collect();
            if members.is_empty() {
                continue;
            }
            debug!("running tier {tier}: {} tool(s)", members.len());
            outcomes.extend(self.run_tier(&members, target).await);
        }
        outcomes
    }

    /// Fan one tier out onto the worker pool and gather every result.
    pub async fn run_tier(&self, configs: &[ToolConfig], target: &Path) -> Vec<ToolOutcome> {
        let semaphore = Arc::new(Semaphore::new(self.max_parallel));
        let mut set = JoinSet::new();

        for config in configs.iter().filter(|c| c.enabled).cloned() {
            let semaphore = semaphore.clone();
            let target = target.to_path_buf();
            set.spawn(async move {
                // The semaphore is never closed, so acquisition only fails
                // if the runtime is shutting down; run unbounded then.
                let _permit = semaphore.acquire_owned().await.ok();
                execute_tool(config, target).await
            });
        }

        let mut outcomes = Vec::new();
        while let Some(joined) = set.join_next().await {
            match joined {
                Ok(outcome) => outcomes.push(outcome),
                Err(e) => warn!("tool task failed to join: {e}"),
            }
        }
        outcomes
    }
}

async fn execute_tool(config: ToolConfig, target: PathBuf) -> ToolOutcome {
    if which::which(&config.command).is_err() {
        warn!("{} is not available, skipping", config.name);
        return ToolOutcome::skipped(
            &config.name,
            format!("executable '{}' not found on PATH", config.command),
        );
    }

    debug!(
        "running {} on {} (timeout {}s)",
        config.name,
        target.display(),
        config.timeout_secs
    );

    let started = Instant::now();
    let mut command = Command::new(&config.command);
    command
        .args(&config.args)
        .arg(&target)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    let child = match command.spawn() {
        Ok(child) => child,
        Err(e) => {
            warn!("failed to spawn {}: {e}", config.name);
            return ToolOutcome::skipped(&config.name, format!("spawn failed: {e}"));
        }
    };

    let timeout = Duration::from_secs(config.timeout_secs);
    match tokio::time::timeout(timeout, child.wait_with_output()).await {
        Ok(Ok(output)) => ToolOutcome {
            tool: config.name.clone(),
            exit_code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            elapsed: started.elapsed(),
            timed_out: false,
            skipped: false,
        },
        Ok(Err(e)) => {
            warn!("{} I/O failure: {e}", config.name);
            ToolOutcome {
                tool: config.name.clone(),
                exit_code: None,
                stdout: String::new(),
                stderr: e.to_string(),
                elapsed: started.elapsed(),
                timed_out: false,
                skipped: false,
            }
        }
        // Dropping the future kills the child (kill_on_drop).
        Err(_) => {
            warn!("{} timed out after {}s", config.name, config.timeout_secs);
            ToolOutcome {
                tool: config.name.clone(),
                exit_code: None,
                stdout: String::new(),
                stderr: format!("timed out after {}s", config.timeout_secs),
                elapsed: started.elapsed(),
                timed_out: true,
                skipped: false,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tool(name: &str, command: &str, args: &[&str], timeout_secs: u64) -> ToolConfig {
        ToolConfig {
            name: name.to_string(),
            command: command.to_string(),
            args: args.iter().map(ToString::to_string).collect(),
            enabled: true,
            timeout_secs,
            tier: 1,
            requires_network: false,
        }
    }

    #[tokio::test]
    async fn test_missing_executable_is_skipped_not_error() {
        let runner = ToolRunner::new();
        let config = tool("ghost", "definitely-not-a-real-binary-zzz", &[], 5);
        let outcome = runner.run_tool(&config, Path::new("/tmp")).await;
        assert!(outcome.skipped);
        assert!(!outcome.timed_out);
        assert!(!outcome.success());
    }

    #[tokio::test]
    async fn test_successful_run_captures_stdout() {
        let runner = ToolRunner::new();
        let config = tool("echo", "echo", &["hello"], 5);
        let outcome = runner.run_tool(&config, Path::new("world")).await;
        assert!(outcome.success());
        assert!(outcome.stdout.contains("hello"));
        assert!(outcome.stdout.contains("world"));
    }

    #[tokio::test]
    async fn test_timeout_flagged_not_raised() {
        let runner = ToolRunner::new();
        let config = tool("sleeper", "sleep", &["30"], 1);
        let outcome = runner.run_tool(&config, Path::new("/tmp")).await;
        assert!(outcome.timed_out);
        assert!(!outcome.skipped);
        assert_eq!(outcome.exit_code, None);
        assert!(outcome.elapsed >= Duration::from_secs(1));
    }

    #[tokio::test]
    async fn test_tier_ordering() {
        let runner = ToolRunner::new();
        let mut first = tool("first", "echo", &["tier-one"], 5);
        first.tier = 1;
        let mut second = tool("second", "echo", &["tier-two"], 5);
        second.tier = 2;
        let mut disabled = tool("disabled", "echo", &["never"], 5);
        disabled.enabled = false;

        let outcomes = runner
            .run_all(&[second.clone(), first.clone(), disabled], Path::new("x"))
            .await;
        assert_eq!(outcomes.len(), 2);
        // Tier 1 completes before tier 2 starts
        assert_eq!(outcomes[0].tool, "first");
        assert_eq!(outcomes[1].tool, "second");
    }

    #[tokio::test]
    async fn test_tier_fanout_gathers_all() {
        let runner = ToolRunner::with_parallelism(2);
        let configs: Vec<ToolConfig> = (0..6)
            .map(|i| tool(&format!("echo-{i}"), "echo", &["x"], 5))
            .collect();
        let outcomes = runner.run_tier(&configs, Path::new("y")).await;
        assert_eq!(outcomes.len(), 6);
        assert!(outcomes.iter().all(ToolOutcome::success));
    }
}
