//! Aggregate response normalizer
//!
//! A metric aggregate response is a matrix: one `dates` array and a list of
//! partitions (one per combination of `by` dimension values), each holding
//! measurement arrays aligned to `dates`. This module repairs and expands it
//! into one flat record per date and partition.

use super::query::MEASUREMENTS;
use crate::error::{Error, Result};
use crate::types::{JsonObject, JsonValue, Record};
use serde::{Deserialize, Serialize};

/// Value used for a dimension the API returned as empty
pub const DIMENSION_NOT_AVAILABLE: &str = "DIMENSION NOT AVAILABLE";

/// Dimension list used when the query had no `by`
pub const NO_DIMENSIONS_SELECTED: &str = "NO DIMENSIONS SELECTED";

/// One (date, partition) cell of an aggregate response
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregateRecord {
    /// `{date}_{metric_id}` plus `_{value}` per non-empty dimension
    pub id: String,
    /// Aggregated metric
    pub metric_id: String,
    /// Bucket start as returned by the API
    pub date: String,
    /// Event count
    pub count: JsonValue,
    /// Unique profile count
    pub unique: JsonValue,
    /// Sum of event values
    pub sum_value: JsonValue,
    /// Dimension values of the partition
    pub dimensions: Vec<String>,
}

impl From<AggregateRecord> for Record {
    fn from(agg: AggregateRecord) -> Self {
        let mut attributes = JsonObject::new();
        attributes.insert("metric_id".to_string(), JsonValue::String(agg.metric_id));
        attributes.insert("date".to_string(), JsonValue::String(agg.date));
        attributes.insert("count".to_string(), agg.count);
        attributes.insert("unique".to_string(), agg.unique);
        attributes.insert("sum_value".to_string(), agg.sum_value);
        attributes.insert(
            "dimensions".to_string(),
            JsonValue::Array(agg.dimensions.into_iter().map(JsonValue::String).collect()),
        );
        Record {
            id: agg.id,
            record_type: Some("metric-aggregate".to_string()),
            attributes,
        }
    }
}

/// Replace every measurement array that does not line up with `dates`.
///
/// The API sometimes returns a bare `0` instead of an array, or omits a
/// measurement, when a grouping has no data. Such values become `dates.len()`
/// nulls. Running this twice changes nothing.
pub fn repair(response: &mut JsonValue, metric_id: &str) -> Result<()> {
    let date_count = dates(response, metric_id)?.len();

    let partitions = response
        .get_mut("data")
        .and_then(JsonValue::as_array_mut)
        .ok_or_else(|| Error::malformed_aggregate(metric_id, "'data' is not an array"))?;

    for (index, partition) in partitions.iter_mut().enumerate() {
        let partition = partition.as_object_mut().ok_or_else(|| {
            Error::malformed_aggregate(metric_id, format!("partition {index} is not an object"))
        })?;

        let measurements = partition
            .entry("measurements")
            .or_insert_with(|| JsonValue::Object(JsonObject::new()))
            .as_object_mut()
            .ok_or_else(|| {
                Error::malformed_aggregate(
                    metric_id,
                    format!("'measurements' of partition {index} is not an object"),
                )
            })?;

        for key in MEASUREMENTS {
            let aligned = measurements
                .get(key)
                .and_then(JsonValue::as_array)
                .is_some_and(|values| values.len() == date_count);
            if !aligned {
                measurements.insert(
                    key.to_string(),
                    JsonValue::Array(vec![JsonValue::Null; date_count]),
                );
            }
        }
    }

    Ok(())
}

/// Repair the response and expand it into one record per date and partition
pub fn normalize(mut response: JsonValue, metric_id: &str) -> Result<Vec<AggregateRecord>> {
    repair(&mut response, metric_id)?;

    let dates = dates(&response, metric_id)?
        .iter()
        .enumerate()
        .map(|(i, date)| {
            date.as_str().map(str::to_string).ok_or_else(|| {
                Error::malformed_aggregate(metric_id, format!("date {i} is not a string"))
            })
        })
        .collect::<Result<Vec<_>>>()?;

    let partitions = response
        .get("data")
        .and_then(JsonValue::as_array)
        .ok_or_else(|| Error::malformed_aggregate(metric_id, "'data' is not an array"))?;

    let mut records = Vec::with_capacity(dates.len() * partitions.len());

    for (index, partition) in partitions.iter().enumerate() {
        let raw_dimensions = dimension_values(partition, index, metric_id)?;
        let suffix: String = raw_dimensions
            .iter()
            .filter(|v| !v.is_empty())
            .map(|v| format!("_{v}"))
            .collect();
        let dimensions = if raw_dimensions.is_empty() {
            vec![NO_DIMENSIONS_SELECTED.to_string()]
        } else {
            raw_dimensions
                .into_iter()
                .map(|v| {
                    if v.is_empty() {
                        DIMENSION_NOT_AVAILABLE.to_string()
                    } else {
                        v
                    }
                })
                .collect()
        };

        let measurements = &partition["measurements"];
        for (i, date) in dates.iter().enumerate() {
            records.push(AggregateRecord {
                id: format!("{date}_{metric_id}{suffix}"),
                metric_id: metric_id.to_string(),
                date: date.clone(),
                count: measurements["count"][i].clone(),
                unique: measurements["unique"][i].clone(),
                sum_value: measurements["sum_value"][i].clone(),
                dimensions: dimensions.clone(),
            });
        }
    }

    Ok(records)
}

fn dates<'a>(response: &'a JsonValue, metric_id: &str) -> Result<&'a Vec<JsonValue>> {
    response
        .get("dates")
        .and_then(JsonValue::as_array)
        .ok_or_else(|| Error::malformed_aggregate(metric_id, "'dates' is missing or not an array"))
}

/// Dimension values of a partition; null counts as empty
fn dimension_values(partition: &JsonValue, index: usize, metric_id: &str) -> Result<Vec<String>> {
    match partition.get("dimensions") {
        None | Some(JsonValue::Null) => Ok(Vec::new()),
        Some(JsonValue::Array(values)) => values
            .iter()
            .map(|value| match value {
                JsonValue::String(s) => Ok(s.clone()),
                JsonValue::Null => Ok(String::new()),
                other => Err(Error::malformed_aggregate(
                    metric_id,
                    format!("dimension value {other} of partition {index} is not a string"),
                )),
            })
            .collect(),
        Some(_) => Err(Error::malformed_aggregate(
            metric_id,
            format!("'dimensions' of partition {index} is not an array"),
        )),
    }
}
