//! Tests for the output module

use super::*;
use crate::types::JsonObject;
use pretty_assertions::assert_eq;
use serde_json::{json, Value};
use std::fs;
use tempfile::TempDir;

fn row(value: Value) -> JsonObject {
    value.as_object().cloned().unwrap()
}

#[test]
fn test_table_columns_keep_first_seen_order() {
    let mut columns = TableColumns::from_names(vec!["id".to_string()]);
    columns.add_row(&row(json!({"id": 1, "name": "a"})));
    columns.add("extra");
    columns.add("name");

    // serde_json maps iterate keys in sorted order
    assert_eq!(columns.names(), &["id", "name", "extra"]);
}

#[test]
fn test_jsonl_sink_writes_lines() {
    let dir = TempDir::new().unwrap();
    let mut sink = JsonlSink::new(dir.path().join("out")).unwrap();

    sink.write("list", row(json!({"id": "L1", "name": "Newsletter"})))
        .unwrap();
    sink.write("list", row(json!({"id": "L2", "created": "2024-01-01"})))
        .unwrap();
    let columns = sink.finish().unwrap();

    let content = fs::read_to_string(dir.path().join("out/list.jsonl")).unwrap();
    let lines: Vec<Value> = content
        .lines()
        .map(|line| serde_json::from_str(line).unwrap())
        .collect();

    assert_eq!(
        lines,
        vec![
            json!({"id": "L1", "name": "Newsletter"}),
            json!({"id": "L2", "created": "2024-01-01"}),
        ]
    );
    assert_eq!(columns["list"], vec!["id", "name", "created"]);
}

#[test]
fn test_jsonl_sink_open_creates_empty_table() {
    let dir = TempDir::new().unwrap();
    let mut sink = JsonlSink::new(dir.path()).unwrap();

    sink.open("campaign_audience").unwrap();
    let columns = sink.finish().unwrap();

    let path = sink.table_path("campaign_audience");
    assert!(path.exists());
    assert_eq!(fs::read_to_string(path).unwrap(), "");
    assert!(columns["campaign_audience"].is_empty());
}

#[test]
fn test_jsonl_sink_known_columns() {
    let dir = TempDir::new().unwrap();
    let mut known = Columns::new();
    known.insert("event".to_string(), vec!["id".to_string(), "old".to_string()]);

    let mut sink = JsonlSink::new(dir.path()).unwrap().with_known_columns(known);
    sink.write("event", row(json!({"id": "E1", "new": true}))).unwrap();

    let columns = sink.finish().unwrap();
    assert_eq!(columns["event"], vec!["id", "old", "new"]);
}

#[test]
fn test_jsonl_sink_keeps_columns_of_unopened_tables() {
    let dir = TempDir::new().unwrap();
    let mut known = Columns::new();
    known.insert("event".to_string(), vec!["id".to_string(), "a".to_string()]);
    known.insert("list".to_string(), vec!["id".to_string()]);

    let mut sink = JsonlSink::new(dir.path()).unwrap().with_known_columns(known);
    sink.open("list").unwrap();
    let columns = sink.finish().unwrap();

    assert_eq!(columns["event"], vec!["id", "a"]);
    assert_eq!(columns["list"], vec!["id"]);
    assert!(!sink.table_path("event").exists());
}

#[test]
fn test_memory_sink() {
    let mut sink = MemorySink::new();
    sink.open("metric").unwrap();
    sink.write("profile", row(json!({"id": "P1"}))).unwrap();

    assert_eq!(sink.tables(), vec!["metric", "profile"]);
    assert!(sink.rows("metric").is_empty());
    assert_eq!(sink.rows("profile").len(), 1);
    assert!(sink.rows("missing").is_empty());

    let columns = sink.finish().unwrap();
    assert_eq!(columns["profile"], vec!["id"]);
}
