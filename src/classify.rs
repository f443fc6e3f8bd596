//! Error classifier
//!
//! Turns a failed transport call (HTTP status plus JSON body) into a single
//! human-readable [`Error::Api`]. Two response conventions are in use:
//!
//! - JSON:API: `{"errors": [{"title": .., "detail": .., "code": ..}]}`
//! - legacy v1/v2: `{"status": 403, "message": ".."}`

use crate::error::Error;
use crate::types::JsonValue;
use serde::Deserialize;

/// One entry of a JSON:API `errors` list
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ErrorObject {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub detail: Option<String>,
    #[serde(default)]
    pub code: Option<String>,
}

#[derive(Deserialize)]
struct JsonApiBody {
    errors: Vec<ErrorObject>,
}

#[derive(Deserialize)]
struct LegacyBody {
    message: String,
}

/// The shapes an error body can take
#[derive(Debug, Clone, PartialEq)]
pub enum ErrorResponse {
    /// First entry of a non-empty JSON:API `errors` list
    JsonApi(ErrorObject),
    /// Top-level `message` of a legacy response
    Legacy { message: String },
    /// Valid JSON in neither shape
    Unrecognized(JsonValue),
}

impl ErrorResponse {
    /// Match a decoded body against the known shapes
    pub fn from_value(value: JsonValue) -> Self {
        if let Ok(body) = JsonApiBody::deserialize(&value) {
            if let Some(first) = body.errors.into_iter().next() {
                return Self::JsonApi(first);
            }
        }

        if value.get("status").is_some() {
            if let Ok(body) = LegacyBody::deserialize(&value) {
                return Self::Legacy {
                    message: body.message,
                };
            }
        }

        Self::Unrecognized(value)
    }

    /// Render the message for a response received with `status`
    pub fn message(&self, status: u16) -> String {
        match self {
            Self::JsonApi(error) => {
                let label = match (status_label(status), &error.code) {
                    (Some(label), _) => label.to_string(),
                    (None, Some(code)) => format!("API Error {code}"),
                    (None, None) => "API Error".to_string(),
                };
                let text = [error.title.as_deref(), error.detail.as_deref()]
                    .into_iter()
                    .flatten()
                    .map(str::trim)
                    .filter(|part| !part.is_empty())
                    .collect::<Vec<_>>()
                    .join(" ");
                format!("{label} ({status}) : {text}").trim_end().to_string()
            }
            Self::Legacy { message } => {
                let label = status_label(status).unwrap_or("API Error");
                format!("{label} ({status}) : {message}")
            }
            Self::Unrecognized(value) => value.to_string(),
        }
    }
}

fn status_label(status: u16) -> Option<&'static str> {
    match status {
        401 => Some("Not Authorized Error"),
        403 => Some("Forbidden Error"),
        404 => Some("Not Found Error"),
        _ => None,
    }
}

/// Classify a failed response.
///
/// Returns [`Error::BodyDecode`] when the body is not JSON, otherwise
/// [`Error::Api`] carrying the formatted message.
pub fn classify(status: u16, body: &str) -> Error {
    match serde_json::from_str::<JsonValue>(body) {
        Ok(value) => Error::api(status, ErrorResponse::from_value(value).message(status)),
        Err(_) => Error::BodyDecode {
            status,
            body: body.to_string(),
        },
    }
}

/// Classify raw transport failures, pass every other error through
pub fn classify_error(err: Error) -> Error {
    match err {
        Error::Transport { status, body, .. } => classify(status, &body),
        other => other,
    }
}
