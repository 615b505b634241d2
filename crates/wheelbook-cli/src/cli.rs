//! CLI argument definitions for Wheelbook.
//!
//! # Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `import` | Import a brokerage CSV into a portfolio |
//! | `preview` | Dry-run the first rows of a CSV, no writes |
//! | `check` | Report structural problems in a CSV |
//! | `brokers` | List supported broker formats |
//!
//! # Global Options
//!
//! | Option | Default | Description |
//! |--------|---------|-------------|
//! | `--db` | `wheelbook.duckdb` | Path to the DuckDB warehouse file |
//! | `--format` | `human` | Output format (human, json) |
//! | `--pretty` | `false` | Pretty-print JSON output |
//!
//! # Examples
//!
//! ```bash
//! # Import a Robinhood export
//! wheelbook import activity.csv --portfolio 6f1c...\
//!
//! # Force the broker and fail on any warning
//! wheelbook import trades.csv --portfolio 6f1c... --broker schwab --strict
//!
//! # See what would be imported
//! wheelbook preview trades.csv --pretty --format json
//! ```

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};
use uuid::Uuid;

/// Wheelbook - brokerage CSV import for option wheel journals
///
/// Parses activity exports from the major brokerages, normalizes option
/// trades into a single schema, and persists them to a local DuckDB
/// warehouse.
#[derive(Debug, Parser)]
#[command(
    name = "wheelbook",
    author,
    version,
    about = "Brokerage CSV import for option trade journals"
)]
pub struct Cli {
    /// Path to the DuckDB warehouse file.
    #[arg(long, global = true, default_value = "wheelbook.duckdb")]
    pub db: PathBuf,

    /// Output format for results.
    #[arg(long, global = true, value_enum, default_value_t = OutputFormat::Human)]
    pub format: OutputFormat,

    /// Pretty-print JSON output with indentation.
    #[arg(long, global = true, default_value_t = false)]
    pub pretty: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Human,
    Json,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Import a brokerage CSV into a portfolio.
    Import(ImportArgs),
    /// Parse and adapt the first rows without writing anything.
    Preview(PreviewArgs),
    /// Report structural problems (delimiter, headers, ragged rows).
    Check(CheckArgs),
    /// List supported broker formats.
    Brokers,
}

#[derive(Debug, Args)]
pub struct ImportArgs {
    /// CSV file to import.
    pub file: PathBuf,

    /// Target portfolio id.
    #[arg(long)]
    pub portfolio: Uuid,

    /// Create the portfolio row if it does not exist yet.
    #[arg(long, default_value_t = false)]
    pub create_portfolio: bool,

    /// Skip detection and force a broker format
    /// (robinhood, schwab, fidelity, etrade, ibkr, generic).
    #[arg(long)]
    pub broker: Option<String>,

    /// Override delimiter sniffing with a single character.
    #[arg(long)]
    pub delimiter: Option<char>,

    /// Decode the file as Latin-1 instead of UTF-8.
    #[arg(long, default_value_t = false)]
    pub latin1: bool,

    /// Treat validation warnings as blocking errors.
    #[arg(long, default_value_t = false)]
    pub strict: bool,

    /// Fail the whole import if any record is invalid.
    #[arg(long, default_value_t = false)]
    pub no_skip_invalid: bool,

    /// Abort on the first persistence failure.
    #[arg(long, default_value_t = false)]
    pub stop_on_first_error: bool,

    /// Abort once this many persistence failures accumulate.
    #[arg(long)]
    pub max_errors: Option<usize>,

    /// Records persisted per concurrent sub-batch.
    #[arg(long, default_value_t = wheelbook_import::config::DEFAULT_BATCH_SIZE)]
    pub batch_size: usize,

    /// Do not create symbol records for unknown tickers.
    #[arg(long, default_value_t = false)]
    pub no_auto_create: bool,
}

#[derive(Debug, Args)]
pub struct PreviewArgs {
    /// CSV file to preview.
    pub file: PathBuf,

    /// Skip detection and force a broker format.
    #[arg(long)]
    pub broker: Option<String>,

    /// Override delimiter sniffing with a single character.
    #[arg(long)]
    pub delimiter: Option<char>,

    /// Decode the file as Latin-1 instead of UTF-8.
    #[arg(long, default_value_t = false)]
    pub latin1: bool,
}

#[derive(Debug, Args)]
pub struct CheckArgs {
    /// CSV file to check.
    pub file: PathBuf,

    /// Override delimiter sniffing with a single character.
    #[arg(long)]
    pub delimiter: Option<char>,

    /// Decode the file as Latin-1 instead of UTF-8.
    #[arg(long, default_value_t = false)]
    pub latin1: bool,
}
