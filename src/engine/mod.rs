//! Extraction engine module
//!
//! Runs the configured objects against the API and writes their rows to a
//! [`RecordSink`].
//!
//! # Overview
//!
//! The engine module provides:
//! - `Extractor` - Walks the enabled objects in a fixed order
//! - `ExtractStats` - Counters for one run
//! - `RunState` - The state file carried between runs

mod types;

pub use types::{ExtractStats, RunState};

use crate::aggregate::AggregateQuery;
use crate::client::KlaviyoClient;
use crate::config::{ExtractorConfig, ObjectKind, ProfilesMode};
use crate::dates::parse_date;
use crate::error::{Error, Result};
use crate::flatten::Flattener;
use crate::output::{Columns, RecordSink};
use crate::resources::Resource;
use crate::types::{JsonObject, JsonValue, Record};
use futures::TryStreamExt;
use std::time::Instant;
use tracing::{debug, info};

/// Pages between two progress log lines
const PROGRESS_EVERY: usize = 100;

/// Table of metric aggregate rows
pub const METRIC_AGGREGATES_TABLE: &str = "metric_aggregates";

/// Table of campaign to included list links
pub const CAMPAIGN_AUDIENCE_TABLE: &str = "campaign_audience";

/// Table of campaign to excluded list links
pub const CAMPAIGN_EXCLUDED_AUDIENCE_TABLE: &str = "campaign_excluded_audience";

/// Extracts the configured objects into a sink
pub struct Extractor<S: RecordSink> {
    client: KlaviyoClient,
    config: ExtractorConfig,
    sink: S,
    last_run: Option<i64>,
    flattener: Flattener,
    stats: ExtractStats,
}

impl<S: RecordSink> Extractor<S> {
    /// Create an extractor
    pub fn new(client: KlaviyoClient, config: ExtractorConfig, sink: S) -> Self {
        Self {
            client,
            config,
            sink,
            last_run: None,
            flattener: Flattener::default(),
            stats: ExtractStats::default(),
        }
    }

    /// Timestamp of the previous run, used by `last run` date expressions
    #[must_use]
    pub fn with_last_run(mut self, last_run: Option<i64>) -> Self {
        self.last_run = last_run;
        self
    }

    /// Run statistics
    pub fn stats(&self) -> &ExtractStats {
        &self.stats
    }

    /// The sink rows were written to
    pub fn sink(&self) -> &S {
        &self.sink
    }

    /// Consume the extractor and return the sink
    pub fn into_sink(self) -> S {
        self.sink
    }

    /// Validate parameters, extract every enabled object and finish the sink
    pub async fn run(&mut self) -> Result<Columns> {
        let start = Instant::now();
        self.validate_parameters().await?;

        for kind in self.config.objects.enabled() {
            info!("Fetching data of {}", kind.as_str());
            self.extract_object(kind).await?;
            self.stats.add_object();
        }

        let columns = self.sink.finish()?;
        self.stats.set_duration(start.elapsed().as_millis() as u64);
        info!(
            "Extraction finished: {} objects, {} pages, {} rows in {}ms",
            self.stats.objects_extracted,
            self.stats.pages_fetched,
            self.stats.records_written,
            self.stats.duration_ms
        );
        Ok(columns)
    }

    /// Check date expressions and that every configured id exists
    pub async fn validate_parameters(&self) -> Result<()> {
        let objects = &self.config.objects;

        if objects.events {
            if let Some(range) = &self.config.events_settings {
                info!("Validating Event parameters...");
                self.date_range(range.date_from.as_str(), range.date_to.as_str())?;
            }
        }

        if objects.events || objects.metric_aggregates {
            if let Some(range) = &self.config.time_range_settings {
                info!("Validating Date range parameters...");
                self.date_range(range.date_from.as_str(), range.date_to.as_str())?;
            }
        }

        if objects.profiles {
            let settings = &self.config.profiles_settings;
            match settings.fetch_profiles_mode {
                ProfilesMode::FetchBySegment => {
                    info!("Validating Profile fetching parameters...");
                    for segment_id in &settings.fetch_profiles_by_segment {
                        self.client.get_segment(segment_id).await.map_err(|e| {
                            debug!("Segment lookup failed: {}", e);
                            Error::config(format!("Segment with ID {segment_id} not found."))
                        })?;
                    }
                }
                ProfilesMode::FetchByList => {
                    info!("Validating Profile fetching parameters...");
                    for list_id in &settings.fetch_profiles_by_list {
                        self.client.get_list(list_id).await.map_err(|e| {
                            debug!("List lookup failed: {}", e);
                            Error::config(format!("List with ID {list_id} not found."))
                        })?;
                    }
                }
                ProfilesMode::FetchAll => {}
            }
        }

        if objects.metric_aggregates {
            if let Some(settings) = &self.config.metric_aggregates_settings {
                info!("Validating metric aggregates parameters...");
                for metric_id in &settings.metric_aggregates_ids {
                    self.client.get_metric(metric_id).await.map_err(|e| {
                        debug!("Metric lookup failed: {}", e);
                        Error::config(format!("Metric with ID {metric_id} not found."))
                    })?;
                }
            }
        }

        Ok(())
    }

    async fn extract_object(&mut self, kind: ObjectKind) -> Result<()> {
        match kind {
            ObjectKind::Campaigns => self.extract_campaigns().await,
            ObjectKind::Templates => self.write_resource(&Resource::Templates).await,
            ObjectKind::Catalogs => {
                self.write_resource(&Resource::CatalogItems).await?;
                if self.config.catalogs_settings.fetch_catalog_categories {
                    self.write_resource(&Resource::CatalogCategories).await?;
                }
                Ok(())
            }
            ObjectKind::Events => {
                let range = self
                    .config
                    .events_range()
                    .ok_or_else(|| Error::missing_field("time_range_settings"))?;
                let (from, to) = self.date_range(&range.date_from, &range.date_to)?;
                self.write_resource(&Resource::Events { from, to }).await
            }
            ObjectKind::Metrics => self.write_resource(&Resource::Metrics).await,
            ObjectKind::Lists => self.write_resource(&Resource::Lists).await,
            ObjectKind::Segments => self.extract_segments().await,
            ObjectKind::Profiles => self.extract_profiles().await,
            ObjectKind::MetricAggregates => self.extract_metric_aggregates().await,
        }
    }

    /// Stream a resource into its table
    async fn write_resource(&mut self, resource: &Resource) -> Result<()> {
        let table = resource.table();
        let parent = resource.parent();
        self.sink.open(table)?;

        let mut pages = self.client.stream(resource);
        let mut page_index = 0;

        while let Some(page) = pages.try_next().await? {
            if page_index > 0 && page_index % PROGRESS_EVERY == 0 {
                info!(
                    "Already fetched {} pages of data of object {}",
                    page_index, table
                );
            }
            page_index += 1;
            self.stats.add_page();

            for record in page {
                let row = self.build_row(record, parent);
                self.sink.write(table, row)?;
                self.stats.add_records(1);
            }
        }

        debug!("{}: {} pages", table, page_index);
        Ok(())
    }

    /// Campaigns plus their audience links and messages
    async fn extract_campaigns(&mut self) -> Result<()> {
        let table = Resource::Campaigns.table();
        self.sink.open(table)?;
        self.sink.open(CAMPAIGN_AUDIENCE_TABLE)?;
        self.sink.open(CAMPAIGN_EXCLUDED_AUDIENCE_TABLE)?;

        let mut pages = self.client.stream(&Resource::Campaigns);

        while let Some(page) = pages.try_next().await? {
            self.stats.add_page();

            for mut record in page {
                let (included, excluded) = take_audiences(&mut record.attributes);
                let campaign_id = record.id.clone();

                self.write_resource(&Resource::CampaignMessages {
                    campaign_id: campaign_id.clone(),
                })
                .await?;

                for list_id in included {
                    self.write_link(CAMPAIGN_AUDIENCE_TABLE, &campaign_id, list_id)?;
                }
                for list_id in excluded {
                    self.write_link(CAMPAIGN_EXCLUDED_AUDIENCE_TABLE, &campaign_id, list_id)?;
                }

                let row = self.build_row(record, None);
                self.sink.write(table, row)?;
                self.stats.add_records(1);
            }
        }

        Ok(())
    }

    fn write_link(&mut self, table: &str, campaign_id: &str, list_id: String) -> Result<()> {
        let mut row = JsonObject::new();
        row.insert(
            "campaign_id".to_string(),
            JsonValue::String(campaign_id.to_string()),
        );
        row.insert("list_id".to_string(), JsonValue::String(list_id));
        self.sink.write(table, row)?;
        self.stats.add_records(1);
        Ok(())
    }

    /// Segments keep only their name and raw definition
    async fn extract_segments(&mut self) -> Result<()> {
        let table = Resource::Segments.table();
        self.sink.open(table)?;

        let mut pages = self.client.stream(&Resource::Segments);
        while let Some(page) = pages.try_next().await? {
            self.stats.add_page();

            for record in page {
                let mut row = JsonObject::new();
                row.insert("id".to_string(), JsonValue::String(record.id));
                for key in ["name", "definition"] {
                    let value = record.attributes.get(key).cloned().unwrap_or_default();
                    row.insert(key.to_string(), value);
                }
                self.sink.write(table, row)?;
                self.stats.add_records(1);
            }
        }

        Ok(())
    }

    async fn extract_profiles(&mut self) -> Result<()> {
        let settings = self.config.profiles_settings.clone();

        match settings.fetch_profiles_mode {
            ProfilesMode::FetchAll => self.write_resource(&Resource::Profiles).await,
            ProfilesMode::FetchBySegment => {
                for segment_id in settings.fetch_profiles_by_segment {
                    self.write_resource(&Resource::SegmentProfiles { segment_id })
                        .await?;
                }
                Ok(())
            }
            ProfilesMode::FetchByList => {
                for list_id in settings.fetch_profiles_by_list {
                    self.write_resource(&Resource::ListProfiles { list_id })
                        .await?;
                }
                Ok(())
            }
        }
    }

    async fn extract_metric_aggregates(&mut self) -> Result<()> {
        let settings = self
            .config
            .metric_aggregates_settings
            .clone()
            .ok_or_else(|| Error::missing_field("metric_aggregates_settings"))?;
        let range = self
            .config
            .time_range_settings
            .clone()
            .ok_or_else(|| Error::missing_field("time_range_settings"))?;
        let (from, to) = self.date_range(&range.date_from, &range.date_to)?;

        self.sink.open(METRIC_AGGREGATES_TABLE)?;

        for metric_id in settings.metric_aggregates_ids {
            let interval = settings.metric_aggregates_interval;
            let query = AggregateQuery::new(metric_id, from, to, interval)
                .with_by(settings.metric_aggregates_partitioning_by.clone());

            let records = self.client.query_metric_aggregates(&query).await?;
            self.stats.add_page();

            for aggregate in records {
                let row = self.build_row(Record::from(aggregate), None);
                self.sink.write(METRIC_AGGREGATES_TABLE, row)?;
                self.stats.add_records(1);
            }
        }

        Ok(())
    }

    /// `{id, ...attributes, <parent>_id}`
    fn build_row(&self, record: Record, parent: Option<(&str, &str)>) -> JsonObject {
        let mut row = JsonObject::new();
        row.insert("id".to_string(), JsonValue::String(record.id));

        if self.config.store_nested_attributes {
            row.extend(record.attributes);
        } else {
            row.extend(self.flattener.flatten(&record.attributes));
        }

        if let Some((column, value)) = parent {
            row.insert(column.to_string(), JsonValue::String(value.to_string()));
        }
        row
    }

    fn date_range(&self, from: &str, to: &str) -> Result<(i64, i64)> {
        Ok((
            parse_date(from, self.last_run)?,
            parse_date(to, self.last_run)?,
        ))
    }
}

/// Remove the audience attributes of a campaign and return the list ids
/// `(included, excluded)`.
///
/// Current campaigns carry `audiences: {included, excluded}`; legacy ones
/// carry `lists` and `excluded_lists` of list objects.
fn take_audiences(attributes: &mut JsonObject) -> (Vec<String>, Vec<String>) {
    if let Some(audiences) = attributes.remove("audiences") {
        return (
            list_ids(audiences.get("included")),
            list_ids(audiences.get("excluded")),
        );
    }

    let included = attributes.remove("lists");
    let excluded = attributes.remove("excluded_lists");
    (list_ids(included.as_ref()), list_ids(excluded.as_ref()))
}

fn list_ids(value: Option<&JsonValue>) -> Vec<String> {
    value
        .and_then(JsonValue::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(|item| match item {
                    JsonValue::String(id) => Some(id.clone()),
                    JsonValue::Object(obj) => obj
                        .get("id")
                        .and_then(JsonValue::as_str)
                        .map(str::to_string),
                    _ => None,
                })
                .collect()
        })
        .unwrap_or_default()
}

#[cfg(test)]
mod tests;
