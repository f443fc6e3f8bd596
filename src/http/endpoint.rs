//! HTTP-backed endpoint operation

use super::client::HttpClient;
use crate::endpoint::EndpointOperation;
use crate::error::Result;
use crate::resources::EndpointSpec;
use crate::types::{ApiGeneration, JsonValue, Params};
use async_trait::async_trait;
use std::sync::Arc;
use url::Url;

/// An [`EndpointSpec`] bound to an [`HttpClient`]
#[derive(Debug, Clone)]
pub struct HttpEndpoint {
    client: Arc<HttpClient>,
    spec: EndpointSpec,
}

impl HttpEndpoint {
    /// Bind a spec to a client
    pub fn new(client: Arc<HttpClient>, spec: EndpointSpec) -> Self {
        Self { client, spec }
    }

    /// The bound spec
    pub fn spec(&self) -> &EndpointSpec {
        &self.spec
    }

    /// Resolve the URL and query string for one call.
    ///
    /// A `page_cursor` holding an absolute URL (the JSON:API `links.next`)
    /// already carries every query parameter, so it is requested as-is.
    pub fn prepare(&self, params: &Params) -> (String, Vec<(String, String)>) {
        let mut merged = self.spec.params.clone();
        merged.extend(params.iter().map(|(k, v)| (k.clone(), v.clone())));

        if self.spec.generation == ApiGeneration::Legacy {
            return (self.spec.path.clone(), merged.into_iter().collect());
        }

        if let Some(cursor) = merged.get("page_cursor") {
            if is_absolute_url(cursor) {
                return (cursor.clone(), Vec::new());
            }
        }

        let query = merged
            .into_iter()
            .map(|(key, value)| (current_query_key(&key), value))
            .collect();
        (self.spec.path.clone(), query)
    }
}

#[async_trait]
impl EndpointOperation for HttpEndpoint {
    async fn call(&self, params: &Params) -> Result<JsonValue> {
        let (url, query) = self.prepare(params);
        self.client
            .request(
                self.spec.method,
                self.spec.generation,
                &url,
                &query,
                self.spec.body.as_ref(),
            )
            .await
    }

    fn name(&self) -> &str {
        &self.spec.name
    }
}

/// Query key of a named parameter on the current API
fn current_query_key(name: &str) -> String {
    if name == "page_cursor" {
        return "page[cursor]".to_string();
    }
    if let Some(resource) = name.strip_prefix("fields_") {
        return format!("fields[{resource}]");
    }
    name.to_string()
}

fn is_absolute_url(value: &str) -> bool {
    Url::parse(value).is_ok_and(|url| matches!(url.scheme(), "http" | "https"))
}
