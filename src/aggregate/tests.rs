//! Tests for the aggregate module

use super::*;
use crate::error::Error;
use crate::types::Record;
use pretty_assertions::assert_eq;
use serde_json::json;
use test_case::test_case;

fn single_partition() -> serde_json::Value {
    json!({
        "dates": ["2024-01-01", "2024-01-02"],
        "data": [{
            "dimensions": [],
            "measurements": {
                "count": [5, 7],
                "unique": [3, 4],
                "sum_value": [10.0, 12.5]
            }
        }]
    })
}

#[test]
fn test_normalize_without_dimensions() {
    let records = normalize(single_partition(), "M1").unwrap();

    assert_eq!(
        records,
        vec![
            AggregateRecord {
                id: "2024-01-01_M1".to_string(),
                metric_id: "M1".to_string(),
                date: "2024-01-01".to_string(),
                count: json!(5),
                unique: json!(3),
                sum_value: json!(10.0),
                dimensions: vec![NO_DIMENSIONS_SELECTED.to_string()],
            },
            AggregateRecord {
                id: "2024-01-02_M1".to_string(),
                metric_id: "M1".to_string(),
                date: "2024-01-02".to_string(),
                count: json!(7),
                unique: json!(4),
                sum_value: json!(12.5),
                dimensions: vec![NO_DIMENSIONS_SELECTED.to_string()],
            },
        ]
    );
}

#[test]
fn test_normalize_with_dimensions() {
    let response = json!({
        "dates": ["2024-01-01"],
        "data": [
            {"dimensions": ["Email", ""], "measurements": {"count": [1], "unique": [1], "sum_value": [2.0]}},
            {"dimensions": ["SMS", "Prague"], "measurements": {"count": [3], "unique": [2], "sum_value": [0.0]}}
        ]
    });

    let records = normalize(response, "M2").unwrap();
    assert_eq!(records.len(), 2);

    assert_eq!(records[0].id, "2024-01-01_M2_Email");
    assert_eq!(
        records[0].dimensions,
        vec!["Email".to_string(), DIMENSION_NOT_AVAILABLE.to_string()]
    );
    assert_eq!(records[1].id, "2024-01-01_M2_SMS_Prague");
    assert_eq!(records[1].count, json!(3));
}

#[test]
fn test_repair_replaces_scalar_zero() {
    let mut response = json!({
        "dates": ["2024-01-01", "2024-01-02", "2024-01-03"],
        "data": [{
            "dimensions": ["x"],
            "measurements": {"count": 0, "unique": [1, 2, 3], "sum_value": [1.0]}
        }]
    });

    repair(&mut response, "M1").unwrap();

    let measurements = &response["data"][0]["measurements"];
    assert_eq!(measurements["count"], json!([null, null, null]));
    assert_eq!(measurements["unique"], json!([1, 2, 3]));
    assert_eq!(measurements["sum_value"], json!([null, null, null]));
}

#[test]
fn test_repair_fills_missing_measurement() {
    let mut response = json!({
        "dates": ["2024-01-01"],
        "data": [{"dimensions": [], "measurements": {"count": [4]}}]
    });

    repair(&mut response, "M1").unwrap();
    let records = normalize(response, "M1").unwrap();

    assert_eq!(records[0].count, json!(4));
    assert_eq!(records[0].unique, json!(null));
    assert_eq!(records[0].sum_value, json!(null));
}

#[test]
fn test_repair_is_idempotent() {
    let mut once = json!({
        "dates": ["2024-01-01", "2024-01-02"],
        "data": [{"dimensions": [], "measurements": {"count": 0, "unique": [1, 2], "sum_value": []}}]
    });
    repair(&mut once, "M1").unwrap();

    let mut twice = once.clone();
    repair(&mut twice, "M1").unwrap();

    assert_eq!(once, twice);
}

#[test]
fn test_empty_dates_yield_no_records() {
    let response = json!({"dates": [], "data": [{"dimensions": [], "measurements": {}}]});
    assert!(normalize(response, "M1").unwrap().is_empty());
}

#[test_case(json!({"data": []}) ; "missing dates")]
#[test_case(json!({"dates": "2024-01-01", "data": []}) ; "dates not an array")]
#[test_case(json!({"dates": ["2024-01-01"]}) ; "missing data")]
#[test_case(json!({"dates": ["2024-01-01"], "data": [1]}) ; "partition not an object")]
#[test_case(json!({"dates": ["2024-01-01"], "data": [{"measurements": 5}]}) ; "measurements not an object")]
#[test_case(json!({"dates": [1], "data": []}) ; "date not a string")]
#[test_case(json!({"dates": ["2024-01-01"], "data": [{"dimensions": "x", "measurements": {}}]}) ; "dimensions not an array")]
#[test_case(json!({"dates": ["2024-01-01"], "data": [{"dimensions": [7], "measurements": {}}]}) ; "dimension not a string")]
fn test_malformed_response(response: serde_json::Value) {
    let err = normalize(response, "M9").unwrap_err();

    assert!(matches!(err, Error::MalformedAggregate { ref metric_id, .. } if metric_id == "M9"));
    assert!(!err.is_retryable());
}

#[test]
fn test_aggregate_record_into_record() {
    let agg = normalize(single_partition(), "M1").unwrap().remove(0);
    let record = Record::from(agg);

    assert_eq!(record.id, "2024-01-01_M1");
    assert_eq!(record.attributes["metric_id"], json!("M1"));
    assert_eq!(record.attributes["dimensions"], json!(["NO DIMENSIONS SELECTED"]));
}

#[test]
fn test_query_body() {
    let query = AggregateQuery::new("M1", 1_704_067_200, 1_704_153_600, Interval::Day)
        .with_by(vec!["$message".to_string()]);

    let body = query.to_body().unwrap();
    assert_eq!(
        body,
        json!({
            "data": {
                "type": "metric-aggregate",
                "attributes": {
                    "metric_id": "M1",
                    "measurements": ["count", "unique", "sum_value"],
                    "interval": "day",
                    "filter": [
                        "greater-or-equal(datetime,2024-01-01T00:00:00)",
                        "less-than(datetime,2024-01-02T00:00:00)"
                    ],
                    "timezone": "UTC",
                    "by": ["$message"]
                }
            }
        })
    );
}

#[test]
fn test_query_body_without_by() {
    let body = AggregateQuery::new("M1", 0, 60, Interval::Hour).to_body().unwrap();
    assert!(body["data"]["attributes"].get("by").is_none());
    assert_eq!(body["data"]["attributes"]["interval"], "hour");
}

#[test_case("hour", Interval::Hour)]
#[test_case("Day", Interval::Day)]
#[test_case("WEEK", Interval::Week)]
#[test_case("month", Interval::Month)]
fn test_interval_from_str(input: &str, expected: Interval) {
    assert_eq!(input.parse::<Interval>().unwrap(), expected);
}

#[test]
fn test_interval_unknown() {
    assert!(matches!("year".parse::<Interval>(), Err(Error::Config { .. })));
}
