//! Command-line surface of `trib`

use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use trib_core::TaskKind;

/// Tributary - run data pipelines with column-level lineage
#[derive(Parser, Debug)]
#[command(name = "trib")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Global options
    #[command(flatten)]
    pub global: GlobalArgs,

    /// What to do
    #[command(subcommand)]
    pub command: Commands,
}

/// Flags shared by every subcommand
#[derive(Args, Debug, Clone)]
pub struct GlobalArgs {
    /// Print progress detail and lower the default log level to debug
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

/// Subcommands of `trib`
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the assets of a pipeline
    Run(RunArgs),

    /// Resolve and print column-level lineage
    Lineage(LineageArgs),
}

/// Options of `trib run`
#[derive(Args, Debug)]
pub struct RunArgs {
    /// Pipeline directory
    #[arg(default_value = ".")]
    pub path: PathBuf,

    /// Assets to run (repeatable, default: all)
    #[arg(short, long = "asset")]
    pub assets: Vec<String>,

    /// Also run every asset downstream of the selected ones
    #[arg(long)]
    pub downstream: bool,

    /// Number of parallel workers
    #[arg(short, long, env = "TRIB_WORKERS")]
    pub workers: Option<usize>,

    /// Continue the latest run, skipping assets that already succeeded
    #[arg(long = "continue")]
    pub continue_run: bool,

    /// Run even if the pipeline has validation warnings
    #[arg(long)]
    pub force: bool,

    /// Drop and recreate materialized assets
    #[arg(long)]
    pub full_refresh: bool,

    /// Push column descriptions to the destination
    #[arg(long)]
    pub push_metadata: bool,

    /// Only run assets with this tag
    #[arg(long)]
    pub tag: Option<String>,

    /// Skip assets with this tag
    #[arg(long)]
    pub exclude_tag: Option<String>,

    /// Only run these task kinds (repeatable)
    #[arg(long, value_enum)]
    pub only: Vec<OnlyArg>,

    /// Start of the data window (YYYY-MM-DD or full timestamp)
    #[arg(long)]
    pub start_date: Option<String>,

    /// End of the data window (YYYY-MM-DD or full timestamp)
    #[arg(long)]
    pub end_date: Option<String>,

    /// Environment name passed to assets
    #[arg(short, long, env = "TRIB_ENVIRONMENT")]
    pub environment: Option<String>,

    /// Run python assets with uv (default)
    #[arg(long, conflicts_with = "use_pip")]
    pub use_uv: bool,

    /// Run python assets with the system python
    #[arg(long)]
    pub use_pip: bool,

    /// Do not write the run log under logs/
    #[arg(long)]
    pub no_log_file: bool,
}

/// Task kinds selectable with `--only`
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum OnlyArg {
    /// The asset itself
    Main,
    /// Column and custom checks
    Checks,
    /// Column description push
    PushMetadata,
}

impl From<OnlyArg> for TaskKind {
    fn from(value: OnlyArg) -> Self {
        match value {
            OnlyArg::Main => TaskKind::Main,
            OnlyArg::Checks => TaskKind::Checks,
            OnlyArg::PushMetadata => TaskKind::PushMetadata,
        }
    }
}

/// Arguments for the lineage command
#[derive(Args, Debug)]
pub struct LineageArgs {
    /// Pipeline directory
    #[arg(default_value = ".")]
    pub path: PathBuf,

    /// Only print these assets (repeatable, default: all)
    #[arg(short, long = "asset")]
    pub assets: Vec<String>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "table")]
    pub output: LineageOutput,
}

/// Lineage output formats
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineageOutput {
    /// Human-readable table
    Table,
    /// JSON output
    Json,
}

#[cfg(test)]
#[path = "cli_test.rs"]
mod tests;
