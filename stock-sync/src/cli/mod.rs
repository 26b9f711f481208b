//! Command-line interface

pub mod commands;

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "stock-sync", version, about = "Reconcile a stock export with the shared product sheet")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Configuration file (default: $STOCK_SYNC_CONFIG, ./config.toml, then the user config dir)
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// OAuth token file (default: $STOCK_SYNC_TOKEN, then ./token.json)
    #[arg(long, global = true, value_name = "PATH")]
    pub token: Option<PathBuf>,

    /// Logging level (RUST_LOG still applies on top)
    #[arg(long, global = true, value_enum, ignore_case = true, default_value_t = LogLevel::Info)]
    pub log: LogLevel,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Update stock, prices and tax labels from an export
    Sync(SyncArgs),
    /// Compare identifiers of products sharing a name
    CheckNames {
        /// Export workbook (.xls, .xlsx or .ods)
        export: PathBuf,
    },
    /// List sheet identifiers missing from an export
    Extras {
        /// Export workbook (.xls, .xlsx or .ods)
        export: PathBuf,

        /// Save the list as an Excel workbook
        #[arg(long, value_name = "REPORT.xlsx")]
        output: Option<PathBuf>,
    },
    /// Write product image URLs from a `name|url` list
    Images {
        /// Text file with one `name|url` entry per line
        urls: PathBuf,

        /// Plan the updates without submitting them
        #[arg(long)]
        dry_run: bool,
    },
}

#[derive(clap::Args)]
pub struct SyncArgs {
    /// Export workbook (.xls, .xlsx or .ods)
    pub export: PathBuf,

    /// Plan the updates without submitting them
    #[arg(long)]
    pub dry_run: bool,

    /// Leave the tax column untouched
    #[arg(long)]
    pub no_tax: bool,

    /// Save the run report as an Excel workbook
    #[arg(long, value_name = "REPORT.xlsx")]
    pub output: Option<PathBuf>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
#[value(rename_all = "UPPER")]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    pub fn filter(self) -> log::LevelFilter {
        match self {
            LogLevel::Error => log::LevelFilter::Error,
            LogLevel::Warn => log::LevelFilter::Warn,
            LogLevel::Info => log::LevelFilter::Info,
            LogLevel::Debug => log::LevelFilter::Debug,
            LogLevel::Trace => log::LevelFilter::Trace,
        }
    }
}
