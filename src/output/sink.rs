//! Record sink trait and column tracking

use crate::error::Result;
use crate::types::JsonObject;
use std::collections::{BTreeMap, HashSet};

/// Column names per table
pub type Columns = BTreeMap<String, Vec<String>>;

/// Destination of extracted rows
pub trait RecordSink: Send {
    /// Make sure a table exists even if no row is written to it
    fn open(&mut self, table: &str) -> Result<()>;

    /// Append one row to a table
    fn write(&mut self, table: &str, row: JsonObject) -> Result<()>;

    /// Flush everything and return the columns of every table
    fn finish(&mut self) -> Result<Columns>;
}

/// Ordered, de-duplicated column names of one table
#[derive(Debug, Clone, Default)]
pub struct TableColumns {
    names: Vec<String>,
    seen: HashSet<String>,
}

impl TableColumns {
    /// Start from previously known columns
    pub fn from_names(names: impl IntoIterator<Item = String>) -> Self {
        let mut columns = Self::default();
        for name in names {
            columns.add(&name);
        }
        columns
    }

    /// Record a column name
    pub fn add(&mut self, name: &str) {
        if self.seen.insert(name.to_string()) {
            self.names.push(name.to_string());
        }
    }

    /// Record every key of a row
    pub fn add_row(&mut self, row: &JsonObject) {
        for key in row.keys() {
            self.add(key);
        }
    }

    /// Column names in first-seen order
    pub fn names(&self) -> &[String] {
        &self.names
    }
}

/// Sink that keeps every row in memory
#[derive(Debug, Default)]
pub struct MemorySink {
    tables: BTreeMap<String, Vec<JsonObject>>,
    columns: BTreeMap<String, TableColumns>,
}

impl MemorySink {
    /// Create an empty sink
    pub fn new() -> Self {
        Self::default()
    }

    /// Rows written to a table
    pub fn rows(&self, table: &str) -> &[JsonObject] {
        self.tables.get(table).map_or(&[], Vec::as_slice)
    }

    /// Names of the tables opened so far
    pub fn tables(&self) -> Vec<&str> {
        self.tables.keys().map(String::as_str).collect()
    }
}

impl RecordSink for MemorySink {
    fn open(&mut self, table: &str) -> Result<()> {
        self.tables.entry(table.to_string()).or_default();
        self.columns.entry(table.to_string()).or_default();
        Ok(())
    }

    fn write(&mut self, table: &str, row: JsonObject) -> Result<()> {
        self.open(table)?;
        if let Some(columns) = self.columns.get_mut(table) {
            columns.add_row(&row);
        }
        if let Some(rows) = self.tables.get_mut(table) {
            rows.push(row);
        }
        Ok(())
    }

    fn finish(&mut self) -> Result<Columns> {
        Ok(self
            .columns
            .iter()
            .map(|(table, columns)| (table.clone(), columns.names().to_vec()))
            .collect())
    }
}
