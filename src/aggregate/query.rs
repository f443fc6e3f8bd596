//! Metric aggregate query

use crate::error::{Error, Result};
use crate::types::JsonValue;
use chrono::DateTime;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::fmt;
use std::str::FromStr;

/// Measurements requested for every aggregate query
pub const MEASUREMENTS: [&str; 3] = ["count", "unique", "sum_value"];

/// Time bucket of an aggregate query
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Interval {
    /// Hourly buckets
    Hour,
    /// Daily buckets
    #[default]
    Day,
    /// Weekly buckets
    Week,
    /// Monthly buckets
    Month,
}

impl Interval {
    /// Wire name of the interval
    pub fn as_str(self) -> &'static str {
        match self {
            Interval::Hour => "hour",
            Interval::Day => "day",
            Interval::Week => "week",
            Interval::Month => "month",
        }
    }
}

impl fmt::Display for Interval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Interval {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "hour" => Ok(Interval::Hour),
            "day" => Ok(Interval::Day),
            "week" => Ok(Interval::Week),
            "month" => Ok(Interval::Month),
            other => Err(Error::config(format!(
                "Unknown aggregate interval '{other}', expected hour, day, week or month"
            ))),
        }
    }
}

/// Aggregation of one metric over `[from, to)`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AggregateQuery {
    /// Metric to aggregate
    pub metric_id: String,
    /// Range start, unix seconds (inclusive)
    pub from: i64,
    /// Range end, unix seconds (exclusive)
    pub to: i64,
    /// Grouping dimensions
    pub by: Vec<String>,
    /// Bucket size
    pub interval: Interval,
}

impl AggregateQuery {
    /// Create a query without grouping dimensions
    pub fn new(metric_id: impl Into<String>, from: i64, to: i64, interval: Interval) -> Self {
        Self {
            metric_id: metric_id.into(),
            from,
            to,
            by: Vec::new(),
            interval,
        }
    }

    /// Group by the given dimensions
    #[must_use]
    pub fn with_by(mut self, by: Vec<String>) -> Self {
        self.by = by;
        self
    }

    /// JSON:API body for `POST /api/metric-aggregates/`
    pub fn to_body(&self) -> Result<JsonValue> {
        let from = format_timestamp(self.from)?;
        let to = format_timestamp(self.to)?;

        let mut attributes = json!({
            "metric_id": self.metric_id,
            "measurements": MEASUREMENTS,
            "interval": self.interval.as_str(),
            "filter": [
                format!("greater-or-equal(datetime,{from})"),
                format!("less-than(datetime,{to})"),
            ],
            "timezone": "UTC",
        });

        if !self.by.is_empty() {
            attributes["by"] = json!(self.by);
        }

        Ok(json!({
            "data": {
                "type": "metric-aggregate",
                "attributes": attributes,
            }
        }))
    }
}

fn format_timestamp(ts: i64) -> Result<String> {
    DateTime::from_timestamp(ts, 0)
        .map(|dt| dt.format("%Y-%m-%dT%H:%M:%S").to_string())
        .ok_or_else(|| Error::config(format!("Timestamp {ts} is out of range")))
}
