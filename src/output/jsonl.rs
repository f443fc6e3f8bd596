//! JSON Lines table writer
//!
//! Every table is a `<table>.jsonl` file in the output directory, one JSON
//! object per line.

use super::sink::{Columns, RecordSink, TableColumns};
use crate::error::{Error, Result};
use crate::types::{JsonObject, JsonValue};
use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

struct Table {
    writer: BufWriter<File>,
    columns: TableColumns,
    rows: u64,
}

/// Writes each table to `<dir>/<table>.jsonl`
pub struct JsonlSink {
    dir: PathBuf,
    tables: BTreeMap<String, Table>,
    known_columns: Columns,
}

impl JsonlSink {
    /// Create the output directory if needed
    pub fn new(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir).map_err(|e| {
            Error::output(format!(
                "Failed to create output directory '{}': {}",
                dir.display(),
                e
            ))
        })?;

        Ok(Self {
            dir,
            tables: BTreeMap::new(),
            known_columns: Columns::new(),
        })
    }

    /// Seed tables with columns known from a previous run
    #[must_use]
    pub fn with_known_columns(mut self, columns: Columns) -> Self {
        self.known_columns = columns;
        self
    }

    /// Output directory
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of a table file
    pub fn table_path(&self, table: &str) -> PathBuf {
        self.dir.join(format!("{table}.jsonl"))
    }

    fn table(&mut self, name: &str) -> Result<&mut Table> {
        if !self.tables.contains_key(name) {
            let path = self.table_path(name);
            let file = File::create(&path).map_err(|e| {
                Error::output(format!("Failed to create '{}': {}", path.display(), e))
            })?;
            debug!("Opened table {} at {}", name, path.display());

            let columns = self
                .known_columns
                .get(name)
                .cloned()
                .map(TableColumns::from_names)
                .unwrap_or_default();

            self.tables.insert(
                name.to_string(),
                Table {
                    writer: BufWriter::new(file),
                    columns,
                    rows: 0,
                },
            );
        }

        self.tables
            .get_mut(name)
            .ok_or_else(|| Error::output(format!("Table '{name}' is not open")))
    }
}

impl RecordSink for JsonlSink {
    fn open(&mut self, table: &str) -> Result<()> {
        self.table(table).map(|_| ())
    }

    fn write(&mut self, table: &str, row: JsonObject) -> Result<()> {
        let entry = self.table(table)?;
        entry.columns.add_row(&row);

        serde_json::to_writer(&mut entry.writer, &JsonValue::Object(row))?;
        entry.writer.write_all(b"\n")?;
        entry.rows += 1;
        Ok(())
    }

    /// Columns of every written table, plus the known columns of tables
    /// this run never opened
    fn finish(&mut self) -> Result<Columns> {
        let mut columns = self.known_columns.clone();

        for (name, table) in &mut self.tables {
            table.writer.flush()?;
            info!("Table {}: {} rows", name, table.rows);
            columns.insert(name.clone(), table.columns.names().to_vec());
        }

        Ok(columns)
    }
}

impl std::fmt::Debug for JsonlSink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JsonlSink")
            .field("dir", &self.dir)
            .field("tables", &self.tables.keys().collect::<Vec<_>>())
            .finish()
    }
}
