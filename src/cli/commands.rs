//! CLI commands and argument parsing

use crate::render::Dialect;
use crate::types::LogLevel;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Solidafy Tables CLI
#[derive(Parser, Debug)]
#[command(name = "solidafy-tables")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Catalog definition file (YAML)
    #[arg(short, long, global = true)]
    pub catalog: Option<PathBuf>,

    /// Output format
    #[arg(short, long, global = true, default_value = "json")]
    pub format: OutputFormat,

    /// Verbose output (same as --log-level debug)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Log level
    #[arg(long, global = true)]
    pub log_level: Option<LogLevel>,

    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    /// Effective log level
    pub fn effective_log_level(&self) -> LogLevel {
        match (self.log_level, self.verbose) {
            (Some(level), _) => level,
            (None, true) => LogLevel::Debug,
            (None, false) => LogLevel::Info,
        }
    }
}

/// CLI subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// List the tables the catalog produces
    Tables,

    /// Render destination statements for every table
    Render {
        /// Destination dialect
        #[arg(short, long, default_value = "clickhouse")]
        dialect: Dialect,

        /// Template name
        #[arg(short, long, default_value = "create_table")]
        template: String,

        /// Only this table
        #[arg(long)]
        table: Option<String>,

        /// Compare against reference files in this directory instead of printing
        #[arg(long)]
        golden: Option<PathBuf>,
    },

    /// Fetch resources and print materialized rows
    Sync {
        /// Resources to sync (comma-separated, empty = all)
        #[arg(long)]
        resources: Option<String>,

        /// Maximum records per resource
        #[arg(long)]
        max_records: Option<usize>,

        /// Page cap for resources that set none
        #[arg(long)]
        max_pages: Option<usize>,

        /// Resources fetched at once
        #[arg(long, default_value = "4")]
        concurrency: usize,
    },

    /// Validate the catalog definition
    Validate,

    /// Infer field definitions from sample JSON
    Infer {
        /// Sample file (JSON)
        sample: PathBuf,

        /// Dotted path to the record array
        #[arg(long, default_value = "")]
        records_path: String,
    },
}

/// Output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    /// JSON output (one message per line)
    Json,
    /// Human-readable output
    Pretty,
}
