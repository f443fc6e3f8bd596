//! CLI module
//!
//! Command-line interface for the extractor.
//!
//! # Commands
//!
//! - `check` - Probe the API key and its scopes
//! - `run` - Extract the configured objects into JSON Lines tables
//! - `options` - List lists, segments or metrics as `{value, label}` pairs

mod commands;
mod runner;

pub use commands::{Cli, Commands, OptionsKind, OutputFormat};
pub use runner::Runner;
