//! Klaviyo client
//!
//! Ties the HTTP adapter, the page fetcher and the pagination strategies
//! together behind one facade.

use crate::aggregate::{normalize, AggregateQuery, AggregateRecord};
use crate::endpoint::EndpointOperation;
use crate::error::{Error, Result};
use crate::fetch::{PageFetcher, RetryPolicy};
use crate::http::{HttpClient, HttpClientConfig, HttpEndpoint};
use crate::pagination::{paginate, PageStream};
use crate::resources::{EndpointSpec, Resource};
use crate::scopes::{probe_scopes, Scope, ScopeProbeResult};
use crate::types::{JsonValue, Params, Record};
use futures::TryStreamExt;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info};

/// Path of the metric aggregates query endpoint
const METRIC_AGGREGATES_PATH: &str = "/api/metric-aggregates/";

/// A selectable `{value, label}` pair
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectOption {
    /// Resource id
    pub value: String,
    /// Resource name
    pub label: String,
}

/// High level access to the Klaviyo API
#[derive(Debug, Clone)]
pub struct KlaviyoClient {
    http: Arc<HttpClient>,
    fetcher: PageFetcher,
}

impl KlaviyoClient {
    /// Create a client from HTTP settings and a retry policy
    pub fn new(config: HttpClientConfig, retry: RetryPolicy) -> Result<Self> {
        let http = HttpClient::with_config(config)?;
        Ok(Self::from_parts(Arc::new(http), PageFetcher::new(retry)))
    }

    /// Create a client from existing parts
    pub fn from_parts(http: Arc<HttpClient>, fetcher: PageFetcher) -> Self {
        Self { http, fetcher }
    }

    /// The page fetcher in use
    pub fn fetcher(&self) -> &PageFetcher {
        &self.fetcher
    }

    fn endpoint(&self, spec: EndpointSpec) -> Arc<dyn EndpointOperation> {
        Arc::new(HttpEndpoint::new(Arc::clone(&self.http), spec))
    }

    /// Lazy page stream of a resource
    pub fn stream(&self, resource: &Resource) -> PageStream {
        debug!(
            "Streaming {} with {:?} pagination",
            resource.table(),
            resource.pagination()
        );
        paginate(
            self.fetcher,
            self.endpoint(resource.endpoint()),
            resource.pagination().paginator(),
            Params::new(),
        )
    }

    /// Fetch a single list by id
    pub async fn get_list(&self, list_id: &str) -> Result<Record> {
        self.get_one(EndpointSpec::list(list_id)).await
    }

    /// Fetch a single segment by id
    pub async fn get_segment(&self, segment_id: &str) -> Result<Record> {
        self.get_one(EndpointSpec::segment(segment_id)).await
    }

    /// Fetch a single metric by id
    pub async fn get_metric(&self, metric_id: &str) -> Result<Record> {
        self.get_one(EndpointSpec::metric(metric_id)).await
    }

    async fn get_one(&self, spec: EndpointSpec) -> Result<Record> {
        let endpoint = self.endpoint(spec);
        let body = self.fetcher.fetch(endpoint.as_ref(), &Params::new()).await?;

        match body.get("data") {
            Some(data @ JsonValue::Object(_)) => Record::from_value(data.clone()),
            _ => Err(Error::decode(format!(
                "{} returned no resource object",
                endpoint.name()
            ))),
        }
    }

    /// Run an aggregate query and flatten the result
    pub async fn query_metric_aggregates(
        &self,
        query: &AggregateQuery,
    ) -> Result<Vec<AggregateRecord>> {
        let endpoint = self.endpoint(EndpointSpec::post(
            "query_metric_aggregates",
            METRIC_AGGREGATES_PATH,
            query.to_body()?,
        ));
        let mut body = self.fetcher.fetch(endpoint.as_ref(), &Params::new()).await?;

        // JSON:API envelope; a bare `{dates, data}` object is taken as-is
        let attributes = body
            .pointer_mut("/data/attributes")
            .filter(|v| v.is_object())
            .map(JsonValue::take);
        let response = attributes.unwrap_or(body);

        let records = normalize(response, &query.metric_id)?;
        info!(
            "Metric {} aggregated into {} records",
            query.metric_id,
            records.len()
        );
        Ok(records)
    }

    /// Probe every scope of the API key
    pub async fn probe_scopes(&self) -> ScopeProbeResult {
        let probes: Vec<(Scope, Arc<dyn EndpointOperation>)> = Scope::ALL
            .iter()
            .map(|scope| (*scope, self.endpoint(scope.probe_endpoint())))
            .collect();
        probe_scopes(&self.fetcher, &probes).await
    }

    /// All lists as select options
    pub async fn list_options(&self) -> Result<Vec<SelectOption>> {
        self.options(&Resource::Lists).await
    }

    /// All segments as select options
    pub async fn segment_options(&self) -> Result<Vec<SelectOption>> {
        self.options(&Resource::Segments).await
    }

    /// All metrics as select options
    pub async fn metric_options(&self) -> Result<Vec<SelectOption>> {
        self.options(&Resource::Metrics).await
    }

    async fn options(&self, resource: &Resource) -> Result<Vec<SelectOption>> {
        let pages: Vec<Vec<Record>> = self.stream(resource).try_collect().await?;

        Ok(pages
            .into_iter()
            .flatten()
            .map(|record| {
                let label = record
                    .attributes
                    .get("name")
                    .and_then(JsonValue::as_str)
                    .map_or_else(|| record.id.clone(), str::to_string);
                SelectOption {
                    value: record.id,
                    label,
                }
            })
            .collect())
    }
}
