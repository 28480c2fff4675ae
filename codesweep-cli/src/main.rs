//! codesweep CLI entry point
//!
//! Exit codes: 0 on success, 1 on fatal error (bad arguments, unreadable
//! target, database open failure), 130 on user interrupt.

mod app;
mod report;

use clap::{CommandFactory, Parser, ValueEnum};
use clap_complete::Shell;
use std::path::PathBuf;
use tracing::error;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "codesweep")]
#[command(about = "Multi-tool static analysis with AI-assisted fixes")]
#[command(version)]
pub struct Cli {
    /// Path to the file or directory to analyze
    #[arg(short = 't', long, required_unless_present = "completions")]
    pub target: Option<PathBuf>,

    /// Run every tool tier, including optional network-dependent tools
    #[arg(long)]
    pub comprehensive: bool,

    /// Generate and apply AI fixes for critical errors
    #[arg(long)]
    pub fix_errors: bool,

    /// Confirm each fix on stdin before applying it
    #[arg(long)]
    pub interactive: bool,

    /// Report format
    #[arg(short = 'f', long, value_enum, default_value = "terminal")]
    pub format: ReportFormat,

    /// Write the report here instead of stdout
    #[arg(short = 'o', long)]
    pub output: Option<PathBuf>,

    /// Maximum number of fixes to attempt
    #[arg(long, default_value_t = 10)]
    pub max_fixes: usize,

    /// TOML file with per-tool overrides
    #[arg(short = 'c', long)]
    pub config: Option<PathBuf>,

    /// SQLite database path (defaults to .codesweep/history.db under the
    /// target)
    #[arg(long)]
    pub db: Option<PathBuf>,

    /// Verbose logging
    #[arg(short = 'v', long)]
    pub verbose: bool,

    /// Emit shell completions and exit
    #[arg(long, value_enum, hide = true)]
    pub completions: Option<Shell>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ReportFormat {
    Terminal,
    Json,
    Html,
}

fn init_tracing(verbose: bool) {
    let default_filter = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_filter));
    // Reports go to stdout; logs stay on stderr
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    if let Some(shell) = cli.completions {
        let mut command = Cli::command();
        clap_complete::generate(shell, &mut command, "codesweep", &mut std::io::stdout());
        return;
    }

    init_tracing(cli.verbose);

    let code = tokio::select! {
        result = app::run(cli) => match result {
            Ok(()) => 0,
            Err(e) => {
                error!("fatal: {e:#}");
                1
            }
        },
        _ = tokio::signal::ctrl_c() => {
            eprintln!("interrupted");
            130
        }
    };
    std::process::exit(code);
}
