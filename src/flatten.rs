//! Attribute flattening
//!
//! Nested attribute objects become `parent_child` columns. Arrays and
//! scalars are leaves and are kept as they are.

use crate::types::{JsonObject, JsonValue};

/// Default separator between parent and child keys
pub const CHILD_SEPARATOR: &str = "_";

/// Flattens nested JSON objects into single-level rows
#[derive(Debug, Clone)]
pub struct Flattener {
    separator: String,
}

impl Default for Flattener {
    fn default() -> Self {
        Self::new(CHILD_SEPARATOR)
    }
}

impl Flattener {
    /// Create a flattener with a custom separator
    pub fn new(separator: impl Into<String>) -> Self {
        Self {
            separator: separator.into(),
        }
    }

    /// Flatten one attribute object
    pub fn flatten(&self, attributes: &JsonObject) -> JsonObject {
        let mut out = JsonObject::new();
        for (key, value) in attributes {
            self.flatten_into(key.clone(), value, &mut out);
        }
        out
    }

    fn flatten_into(&self, name: String, value: &JsonValue, out: &mut JsonObject) {
        match value {
            JsonValue::Object(children) => {
                for (key, child) in children {
                    let child_name = format!("{name}{}{key}", self.separator);
                    self.flatten_into(child_name, child, out);
                }
            }
            leaf => {
                out.insert(name, leaf.clone());
            }
        }
    }
}
