//! CLI argument definitions for pricelog.
//!
//! # Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `run` | Fetch every supplier feed and append one batch to the history log |
//! | `diff` | Compare two dates of the history log |
//! | `schema` | Show the log layout in effect and the header on disk |
//! | `sources` | List configured suppliers |
//!
//! # Global Options
//!
//! | Option | Default | Description |
//! |--------|---------|-------------|
//! | `--format` | `json` | Output format (json, table) |
//! | `--pretty` | `false` | Pretty-print JSON output |
//! | `--strict` | `false` | Exit non-zero on warnings or errors |
//!
//! # Examples
//!
//! ```bash
//! pricelog run --config suppliers.yaml
//! pricelog run --dry-run --pretty
//! pricelog diff --from 2026-03-01 --to 2026-03-08 --format table
//! pricelog diff --config suppliers.yaml --with-archives
//! ```

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

/// Supplier price and stock history tracker.
#[derive(Debug, Parser)]
#[command(
    name = "pricelog",
    version,
    about = "Collect supplier price/stock feeds into an append-only history log"
)]
pub struct Cli {
    #[arg(long, global = true, value_enum, default_value_t = OutputFormat::Json)]
    pub format: OutputFormat,

    #[arg(long, global = true, default_value_t = false)]
    pub pretty: bool,

    /// Exit with status 5 when the response carries warnings or errors.
    #[arg(long, global = true, default_value_t = false)]
    pub strict: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Collect all supplier feeds and append them to the history log.
    Run(RunArgs),
    /// Compare the snapshots of two dates.
    Diff(DiffArgs),
    /// Show the log layout in effect and the header currently on disk.
    Schema(SchemaArgs),
    /// List configured suppliers with tokens redacted.
    Sources(SourcesArgs),
}

#[derive(Debug, Args)]
pub struct RunArgs {
    /// YAML pipeline config; the built-in single-supplier setup when omitted.
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// History log path; overrides config and PRICELOG_HOME.
    #[arg(long)]
    pub log: Option<PathBuf>,

    /// Fetch and adapt without writing the log.
    #[arg(long, default_value_t = false)]
    pub dry_run: bool,
}

#[derive(Debug, Args)]
pub struct DiffArgs {
    /// Start date, YYYY-MM-DD; the earliest date in the log when omitted.
    #[arg(long)]
    pub from: Option<String>,

    /// End date, YYYY-MM-DD; the latest date in the log when omitted.
    #[arg(long)]
    pub to: Option<String>,

    /// YAML pipeline config; only its log path is used.
    #[arg(long)]
    pub config: Option<PathBuf>,

    #[arg(long)]
    pub log: Option<PathBuf>,

    /// Include archived log segments.
    #[arg(long, default_value_t = false)]
    pub with_archives: bool,
}

#[derive(Debug, Args)]
pub struct SchemaArgs {
    /// YAML pipeline config; only its log path is used.
    #[arg(long)]
    pub config: Option<PathBuf>,

    #[arg(long)]
    pub log: Option<PathBuf>,
}

#[derive(Debug, Args)]
pub struct SourcesArgs {
    #[arg(long)]
    pub config: Option<PathBuf>,
}
