//! Structural context for fix prompts
//!
//! The structural-analysis backend is an external collaborator consumed
//! through the narrow [`StructureIndex`] seam: given a file and line,
//! return symbol/usage/dependency context or nothing. Gathering is
//! best-effort everywhere; an index that fails simply yields `None` and
//! the fix attempt proceeds without enrichment.

use regex::Regex;
use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use tracing::debug;
use walkdir::WalkDir;

/// Read-only context around one diagnostic site.
#[derive(Debug, Clone, Default)]
pub struct StructuralContext {
    /// The enclosing function/class, when determinable
    pub symbols: Vec<String>,
    /// Call/reference sites of the enclosing symbol elsewhere in the tree
    pub usages: Vec<String>,
    /// Modules the affected file imports
    pub dependencies: Vec<String>,
}

impl StructuralContext {
    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty() && self.usages.is_empty() && self.dependencies.is_empty()
    }

    /// Render for inclusion in a fix prompt.
    pub fn render(&self) -> String {
        let mut out = String::new();
        if !self.symbols.is_empty() {
            let _ = writeln!(out, "enclosing symbols: {}", self.symbols.join(", "));
        }
        if !self.dependencies.is_empty() {
            let _ = writeln!(out, "imports: {}", self.dependencies.join(", "));
        }
        for usage in &self.usages {
            let _ = writeln!(out, "usage: {usage}");
        }
        out
    }
}

/// Opaque read-only index over a codebase.
pub trait StructureIndex: Send + Sync {
    fn context_for(&self, file: &Path, line: usize) -> Option<StructuralContext>;
}

/// Degraded mode: no structural backend available.
pub struct NullIndex;

impl StructureIndex for NullIndex {
    fn context_for(&self, _file: &Path, _line: usize) -> Option<StructuralContext> {
        None
    }
}

/// Lightweight built-in index that scans the target tree with regexes:
/// enclosing `def`/`class` above the diagnostic line, the file's imports,
/// and textual usage sites of the enclosing symbol in sibling sources.
pub struct SourceScanIndex {
    root: PathBuf,
    definition: Regex,
    import: Regex,
    max_usages: usize,
}

impl SourceScanIndex {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            definition: Regex::new(r"^\s*(?:def|class)\s+([A-Za-z_][A-Za-z0-9_]*)")
                .expect("definition pattern is valid"),
            import: Regex::new(r"^\s*(?:import\s+([A-Za-z_][A-Za-z0-9_.]*)|from\s+([A-Za-z_][A-Za-z0-9_.]*)\s+import)")
                .expect("import pattern is valid"),
            max_usages: 10,
        }
    }

    fn enclosing_symbol(&self, source: &str, line: usize) -> Option<String> {
        source
            .lines()
            .take(line.max(1))
            .filter_map(|l| self.definition.captures(l))
            .last()
            .and_then(|c| c.get(1))
            .map(|m| m.as_str().to_string())
    }

    fn imports(&self, source: &str) -> Vec<String> {
        source
            .lines()
            .filter_map(|l| {
                let captures = self.import.captures(l)?;
                captures
                    .get(1)
                    .or_else(|| captures.get(2))
                    .map(|m| m.as_str().to_string())
            })
            .collect()
    }

    fn usages(&self, symbol: &str, skip: &Path) -> Vec<String> {
        let mut usages = Vec::new();
        for entry in WalkDir::new(&self.root)
            .into_iter()
            .filter_map(std::result::Result::ok)
            .filter(|e| e.file_type().is_file())
            .filter(|e| e.path() != skip)
            .filter(|e| e.path().extension().is_some_and(|x| x == "py"))
        {
            let Ok(source) = std::fs::read_to_string(entry.path()) else {
                continue;
            };
            for (idx, line) in source.lines().enumerate() {
                if line.contains(symbol) {
                    usages.push(format!(
                        "{}:{}: {}",
                        entry.path().display(),
                        idx + 1,
                        line.trim()
                    ));
                    if usages.len() >= self.max_usages {
                        return usages;
                    }
                }
            }
        }
        usages
    }
}

impl StructureIndex for SourceScanIndex {
    fn context_for(&self, file: &Path, line: usize) -> Option<StructuralContext> {
        let source = std::fs::read_to_string(file)
            .map_err(|e| debug!("context scan skipped for {}: {e}", file.display()))
            .ok()?;

        let symbol = self.enclosing_symbol(&source, line);
        let context = StructuralContext {
            usages: symbol
                .as_deref()
                .map(|s| self.usages(s, file))
                .unwrap_or_default(),
            symbols: symbol.into_iter().collect(),
            dependencies: self.imports(&source),
        };
        if context.is_empty() {
            None
        } else {
            Some(context)
        }
    }
}
