//! Engine types
//!
//! Run statistics and the per-run state file.

use crate::error::{Error, Result, ResultExt};
use crate::output::Columns;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Statistics from an extraction run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtractStats {
    /// Rows written across all tables
    pub records_written: usize,
    /// Pages fetched across all resources
    pub pages_fetched: usize,
    /// Objects extracted
    pub objects_extracted: usize,
    /// Duration in milliseconds
    pub duration_ms: u64,
}

impl ExtractStats {
    /// Create new stats
    pub fn new() -> Self {
        Self::default()
    }

    /// Add written rows
    pub fn add_records(&mut self, count: usize) {
        self.records_written += count;
    }

    /// Add a page
    pub fn add_page(&mut self) {
        self.pages_fetched += 1;
    }

    /// Add an object
    pub fn add_object(&mut self) {
        self.objects_extracted += 1;
    }

    /// Set duration
    pub fn set_duration(&mut self, ms: u64) {
        self.duration_ms = ms;
    }
}

/// State carried between runs
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RunState {
    /// Start of the previous successful run, unix seconds
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_run: Option<i64>,

    /// Columns of every table written so far
    #[serde(default, skip_serializing_if = "Columns::is_empty")]
    pub columns: Columns,
}

impl RunState {
    /// Load the state file; a missing file is an empty state
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path)?;
        if content.trim().is_empty() {
            return Ok(Self::default());
        }

        serde_json::from_str(&content).map_err(|e| {
            Error::config(format!(
                "Failed to parse state file '{}': {}",
                path.display(),
                e
            ))
        })
    }

    /// Write the state file
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let content = serde_json::to_string_pretty(self)?;
        fs::write(path, content)
            .with_context(|| format!("Failed to write state file '{}'", path.display()))
    }
}
