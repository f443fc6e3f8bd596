//! Endpoint operations
//!
//! An endpoint operation performs one network page fetch for a given set of
//! named parameters. The pagination engine only orchestrates calls to it;
//! the HTTP adapter in [`crate::http`] is the production implementation.

use crate::error::Result;
use crate::types::{JsonValue, Params};
use async_trait::async_trait;

/// One callable API operation returning a structured page
#[async_trait]
pub trait EndpointOperation: Send + Sync {
    /// Perform the call.
    ///
    /// Failures of the transport come back as [`crate::Error::Transport`]
    /// (status, reason, body) or [`crate::Error::Http`] (no response).
    async fn call(&self, params: &Params) -> Result<JsonValue>;

    /// Short name used in log lines
    fn name(&self) -> &str {
        "endpoint"
    }
}
