//! Static per-tool configuration and the optional override file

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::hash_map::DefaultHasher;
use std::collections::HashMap;
use std::hash::{Hash, Hasher};
use std::path::Path;

/// Static configuration for one external analysis tool.
///
/// Built once from the default table below; a config file may override
/// `enabled`, `args` and `timeout_secs`, nothing else.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolConfig {
    pub name: String,
    pub command: String,
    pub args: Vec<String>,
    pub enabled: bool,
    pub timeout_secs: u64,
    /// 1 = critical, 2 = important, 3 = optional. Controls scheduling
    /// order only, not correctness.
    pub tier: u8,
    pub requires_network: bool,
}

impl ToolConfig {
    fn new(name: &str, command: &str, args: &[&str], timeout_secs: u64, tier: u8) -> Self {
        Self {
            name: name.to_string(),
            command: command.to_string(),
            args: args.iter().map(ToString::to_string).collect(),
            enabled: true,
            timeout_secs,
            tier,
            requires_network: false,
        }
    }

    fn with_network(mut self) -> Self {
        self.requires_network = true;
        self
    }
}

/// The hard-coded default tool table.
pub fn default_tool_table() -> Vec<ToolConfig> {
    vec![
        ToolConfig::new(
            "ruff",
            "ruff",
            &["check", "--output-format=json", "--no-fix"],
            60,
            1,
        ),
        ToolConfig::new(
            "mypy",
            "mypy",
            &[
                "--show-error-codes",
                "--show-column-numbers",
                "--no-color-output",
                "--no-error-summary",
                "--follow-imports=silent",
            ],
            120,
            1,
        ),
        ToolConfig::new("bandit", "bandit", &["-r", "-f", "json", "-q"], 90, 1),
        ToolConfig::new(
            "pylint",
            "pylint",
            &["--output-format=json", "--score=n"],
            180,
            2,
        ),
        ToolConfig::new("pyright", "pyright", &["--outputjson"], 180, 2),
        ToolConfig::new(
            "semgrep",
            "semgrep",
            &["scan", "--json", "--quiet", "--config", "auto"],
            300,
            3,
        )
        .with_network(),
        ToolConfig::new("safety", "safety", &["check", "--json"], 120, 3).with_network(),
    ]
}

/// Per-tool overrides loaded from a TOML config file.
///
/// ```toml
/// [tools.pylint]
/// enabled = false
///
/// [tools.mypy]
/// timeout_secs = 300
/// ```
#[derive(Debug, Default, Deserialize)]
pub struct ToolOverrides {
    #[serde(default)]
    pub tools: HashMap<String, ToolOverride>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ToolOverride {
    pub enabled: Option<bool>,
    pub args: Option<Vec<String>>,
    pub timeout_secs: Option<u64>,
}

impl ToolOverrides {
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        toml::from_str(&raw).map_err(|e| Error::Config(format!("{}: {e}", path.display())))
    }

    /// Merge overrides into the tool table. Unknown tool names are ignored
    /// with a warning.
    pub fn apply(&self, table: &mut [ToolConfig]) {
        for (name, over) in &self.tools {
            match table.iter_mut().find(|t| &t.name == name) {
                Some(config) => {
                    if let Some(enabled) = over.enabled {
                        config.enabled = enabled;
                    }
                    if let Some(args) = &over.args {
                        config.args.clone_from(args);
                    }
                    if let Some(timeout) = over.timeout_secs {
                        config.timeout_secs = timeout;
                    }
                }
                None => tracing::warn!("config overrides unknown tool '{name}', ignoring"),
            }
        }
    }
}

/// Stable hash of the effective tool table, recorded per session so runs
/// with different configurations are distinguishable in the store.
pub fn config_hash(table: &[ToolConfig]) -> String {
    let mut hasher = DefaultHasher::new();
    for tool in table {
        tool.name.hash(&mut hasher);
        tool.command.hash(&mut hasher);
        tool.args.hash(&mut hasher);
        tool.enabled.hash(&mut hasher);
        tool.timeout_secs.hash(&mut hasher);
        tool.tier.hash(&mut hasher);
    }
    format!("{:016x}", hasher.finish())
}
