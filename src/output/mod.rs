//! Output module
//!
//! Extracted rows go to a [`RecordSink`], one named table per object.
//!
//! # Overview
//!
//! - [`JsonlSink`] writes one `<table>.jsonl` file per table
//! - [`MemorySink`] keeps rows in memory
//!
//! Both track the union of column names seen per table, in first-seen order.

mod jsonl;
mod sink;

pub use jsonl::JsonlSink;
pub use sink::{Columns, MemorySink, RecordSink, TableColumns};

#[cfg(test)]
mod tests;
