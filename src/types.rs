//! Common types used throughout the extractor
//!
//! This module contains shared type definitions, type aliases,
//! and utility types used across multiple modules.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

// ============================================================================
// Type Aliases
// ============================================================================

/// JSON value type (re-exported from serde_json)
pub type JsonValue = serde_json::Value;

/// JSON object type
pub type JsonObject = serde_json::Map<String, JsonValue>;

/// Named parameters passed to an endpoint operation
pub type Params = BTreeMap<String, String>;

// ============================================================================
// Record
// ============================================================================

/// A single resource item from a page `data` list
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    /// Resource id
    pub id: String,
    /// JSON:API resource type, when the API sends one
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub record_type: Option<String>,
    /// Resource attributes (arbitrarily nested)
    #[serde(default)]
    pub attributes: JsonObject,
}

impl Record {
    /// Create a record from parts
    pub fn new(id: impl Into<String>, attributes: JsonObject) -> Self {
        Self {
            id: id.into(),
            record_type: None,
            attributes,
        }
    }

    /// Build a record from one item of a page `data` list.
    ///
    /// Current API items are JSON:API resources (`id`, `type`, `attributes`).
    /// Legacy API items are flat objects; everything except the id and the
    /// `object` marker becomes the attributes.
    pub fn from_value(value: JsonValue) -> Result<Self> {
        let mut map = match value {
            JsonValue::Object(map) => map,
            other => {
                return Err(Error::decode(format!(
                    "expected a resource object in page data, got {other}"
                )))
            }
        };

        let id = match map.remove("id").or_else(|| map.remove("customer_id")) {
            Some(JsonValue::String(s)) => s,
            Some(JsonValue::Number(n)) => n.to_string(),
            Some(other) => {
                return Err(Error::decode(format!("resource id is not a string: {other}")))
            }
            None => return Err(Error::decode("resource object has no id")),
        };

        let record_type = match map.remove("type") {
            Some(JsonValue::String(s)) => Some(s),
            _ => None,
        };

        let attributes = match map.remove("attributes") {
            Some(JsonValue::Object(attributes)) => attributes,
            Some(JsonValue::Null) | None => {
                map.remove("object");
                map.remove("relationships");
                map.remove("links");
                map
            }
            Some(other) => {
                return Err(Error::decode(format!(
                    "attributes of resource '{id}' is not an object: {other}"
                )))
            }
        };

        Ok(Self {
            id,
            record_type,
            attributes,
        })
    }
}

// ============================================================================
// HTTP Types
// ============================================================================

/// HTTP method of an endpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Method {
    #[default]
    GET,
    POST,
}

impl From<Method> for reqwest::Method {
    fn from(method: Method) -> Self {
        match method {
            Method::GET => reqwest::Method::GET,
            Method::POST => reqwest::Method::POST,
        }
    }
}

// ============================================================================
// API Generation
// ============================================================================

/// Which Klaviyo API generation an endpoint belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApiGeneration {
    /// JSON:API endpoints under `/api/`, header authenticated
    #[default]
    Current,
    /// v1/v2 endpoints, authenticated with an `api_key` query parameter
    Legacy,
}

// ============================================================================
// Backoff Type
// ============================================================================

/// Type of backoff for retries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackoffType {
    /// Constant delay between retries
    Constant,
    /// Linear increase in delay
    Linear,
    /// Exponential increase in delay
    #[default]
    Exponential,
}

// ============================================================================
// Utilities
// ============================================================================

/// Extension trait for Option<String> to handle empty strings
pub trait OptionStringExt {
    /// Returns None if the string is empty
    fn none_if_empty(self) -> Option<String>;
}

impl OptionStringExt for Option<String> {
    fn none_if_empty(self) -> Option<String> {
        self.filter(|s| !s.is_empty())
    }
}
