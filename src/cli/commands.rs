//! CLI commands and argument parsing

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Klaviyo extractor CLI
#[derive(Parser, Debug)]
#[command(name = "klaviyo-extractor")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Configuration file (JSON or YAML)
    #[arg(short = 'C', long, global = true)]
    pub config: Option<PathBuf>,

    /// State file (JSON), read before and written after `run`
    #[arg(short, long, global = true)]
    pub state: Option<PathBuf>,

    /// Output format of command results
    #[arg(short, long, global = true, default_value = "json")]
    pub format: OutputFormat,

    /// Verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// CLI subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Check the API key and report missing scopes
    Check,

    /// Extract the configured objects
    Run {
        /// Output directory for the `<table>.jsonl` files
        #[arg(short, long, default_value = "out")]
        output: PathBuf,
    },

    /// List selectable ids
    Options {
        /// What to list
        #[arg(value_enum)]
        kind: OptionsKind,
    },
}

/// Selectable resource kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum OptionsKind {
    /// Lists
    Lists,
    /// Segments
    Segments,
    /// Metrics
    Metrics,
}

/// Output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    /// JSON output (one message per line)
    Json,
    /// Human-readable output
    Pretty,
}
