//! Extraction configuration
//!
//! The extractor is configured from one JSON or YAML document: the API
//! token, which objects to extract, and per-object settings.

use crate::aggregate::Interval;
use crate::error::{Error, Result};
use crate::fetch::RetryPolicy;
use crate::http::{HttpClientConfig, RateLimiterConfig, DEFAULT_BASE_URL, DEFAULT_REVISION};
use crate::types::BackoffType;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;

// ============================================================================
// Top-Level Config
// ============================================================================

/// Complete extractor configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractorConfig {
    /// Private API key
    #[serde(alias = "#api_token")]
    pub api_token: String,

    /// Objects to extract
    #[serde(default)]
    pub objects: ObjectsConfig,

    /// Time range for events and metric aggregates
    #[serde(default)]
    pub time_range_settings: Option<TimeRangeSettings>,

    /// Older spelling of the event time range, used when
    /// `time_range_settings` is absent
    #[serde(default)]
    pub events_settings: Option<TimeRangeSettings>,

    /// Catalog options
    #[serde(default)]
    pub catalogs_settings: CatalogsSettings,

    /// Profile options
    #[serde(default)]
    pub profiles_settings: ProfilesSettings,

    /// Metric aggregate options
    #[serde(default)]
    pub metric_aggregates_settings: Option<MetricAggregatesSettings>,

    /// Write attributes unflattened
    #[serde(default)]
    pub store_nested_attributes: bool,

    /// HTTP client settings
    #[serde(default)]
    pub http: HttpSettings,
}

impl ExtractorConfig {
    /// Load a config file; `.json` files are read as JSON, anything else as YAML
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| {
            Error::config(format!(
                "Failed to read config file '{}': {}",
                path.display(),
                e
            ))
        })?;

        let is_json = path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
        if is_json {
            Self::from_json_str(&content)
        } else {
            Self::from_yaml_str(&content)
        }
    }

    /// Parse and validate a YAML document
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        let config: Self = serde_yaml::from_str(yaml)
            .map_err(|e| Error::config(format!("Failed to parse config YAML: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Parse and validate a JSON document
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)
            .map_err(|e| Error::config(format!("Failed to parse config JSON: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Check settings that do not need the API
    pub fn validate(&self) -> Result<()> {
        if self.api_token.trim().is_empty() {
            return Err(Error::missing_field("api_token"));
        }

        if self.objects.events && self.events_range().is_none() {
            return Err(Error::missing_field("time_range_settings"));
        }

        if self.objects.metric_aggregates {
            if self.time_range_settings.is_none() {
                return Err(Error::missing_field("time_range_settings"));
            }
            match &self.metric_aggregates_settings {
                None => return Err(Error::missing_field("metric_aggregates_settings")),
                Some(settings) if settings.metric_aggregates_ids.is_empty() => {
                    return Err(Error::config(
                        "metric_aggregates_settings.metric_aggregates_ids cannot be empty",
                    ));
                }
                Some(_) => {}
            }
        }

        if self.http.max_attempts == 0 {
            return Err(Error::config("http.max_attempts must be at least 1"));
        }

        Ok(())
    }

    /// Time range applied to events
    pub fn events_range(&self) -> Option<&TimeRangeSettings> {
        self.time_range_settings
            .as_ref()
            .or(self.events_settings.as_ref())
    }

    /// HTTP client settings with the token applied
    pub fn client_config(&self) -> HttpClientConfig {
        self.http.client_config(&self.api_token)
    }

    /// Page fetch retry policy
    pub fn retry_policy(&self) -> RetryPolicy {
        self.http.retry_policy()
    }
}

// ============================================================================
// Objects
// ============================================================================

/// Extractable objects, in extraction order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ObjectKind {
    Campaigns,
    Templates,
    Catalogs,
    Events,
    Metrics,
    Lists,
    Segments,
    Profiles,
    MetricAggregates,
}

impl ObjectKind {
    /// All objects in extraction order
    pub const ALL: [ObjectKind; 9] = [
        ObjectKind::Campaigns,
        ObjectKind::Templates,
        ObjectKind::Catalogs,
        ObjectKind::Events,
        ObjectKind::Metrics,
        ObjectKind::Lists,
        ObjectKind::Segments,
        ObjectKind::Profiles,
        ObjectKind::MetricAggregates,
    ];

    /// Config key of the object
    pub fn as_str(self) -> &'static str {
        match self {
            ObjectKind::Campaigns => "campaigns",
            ObjectKind::Templates => "templates",
            ObjectKind::Catalogs => "catalogs",
            ObjectKind::Events => "events",
            ObjectKind::Metrics => "metrics",
            ObjectKind::Lists => "lists",
            ObjectKind::Segments => "segments",
            ObjectKind::Profiles => "profiles",
            ObjectKind::MetricAggregates => "metric_aggregates",
        }
    }
}

/// Object switches
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ObjectsConfig {
    pub campaigns: bool,
    pub templates: bool,
    pub catalogs: bool,
    pub events: bool,
    pub metrics: bool,
    pub lists: bool,
    pub segments: bool,
    pub profiles: bool,
    pub metric_aggregates: bool,
}

impl ObjectsConfig {
    /// Whether an object is switched on
    pub fn is_enabled(&self, kind: ObjectKind) -> bool {
        match kind {
            ObjectKind::Campaigns => self.campaigns,
            ObjectKind::Templates => self.templates,
            ObjectKind::Catalogs => self.catalogs,
            ObjectKind::Events => self.events,
            ObjectKind::Metrics => self.metrics,
            ObjectKind::Lists => self.lists,
            ObjectKind::Segments => self.segments,
            ObjectKind::Profiles => self.profiles,
            ObjectKind::MetricAggregates => self.metric_aggregates,
        }
    }

    /// Switched-on objects in extraction order
    pub fn enabled(&self) -> Vec<ObjectKind> {
        ObjectKind::ALL
            .into_iter()
            .filter(|kind| self.is_enabled(*kind))
            .collect()
    }
}

// ============================================================================
// Object Settings
// ============================================================================

/// Date range as two date expressions (see [`crate::dates`])
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeRangeSettings {
    /// Range start
    pub date_from: String,
    /// Range end
    #[serde(default = "default_date_to")]
    pub date_to: String,
}

fn default_date_to() -> String {
    "now".to_string()
}

/// Catalog options
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CatalogsSettings {
    /// Also extract catalog categories
    #[serde(default)]
    pub fetch_catalog_categories: bool,
}

/// Which profiles to extract
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProfilesMode {
    /// Every profile of the account
    #[default]
    FetchAll,
    /// Members of the configured segments
    FetchBySegment,
    /// Members of the configured lists
    FetchByList,
}

/// Profile options
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProfilesSettings {
    #[serde(default)]
    pub fetch_profiles_mode: ProfilesMode,
    #[serde(default)]
    pub fetch_profiles_by_segment: Vec<String>,
    #[serde(default)]
    pub fetch_profiles_by_list: Vec<String>,
}

/// Metric aggregate options
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricAggregatesSettings {
    /// Metrics to aggregate
    #[serde(default)]
    pub metric_aggregates_ids: Vec<String>,
    /// Bucket size
    #[serde(default)]
    pub metric_aggregates_interval: Interval,
    /// Grouping dimensions
    #[serde(default)]
    pub metric_aggregates_partitioning_by: Vec<String>,
}

// ============================================================================
// HTTP Settings
// ============================================================================

/// HTTP and retry settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpSettings {
    /// API host
    pub base_url: String,
    /// `revision` header of the current API
    pub revision: String,
    /// Request timeout in seconds
    pub timeout_secs: u64,
    /// Attempts per page, first one included
    pub max_attempts: u32,
    /// First retry delay in milliseconds
    pub initial_backoff_ms: u64,
    /// Backoff multiplier
    pub backoff_factor: u32,
    /// Longest single retry delay in seconds
    pub max_backoff_secs: u64,
    /// Rate limit, requests per second (0 disables)
    pub requests_per_second: u32,
    /// Rate limit burst
    pub burst_size: u32,
}

impl Default for HttpSettings {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            revision: DEFAULT_REVISION.to_string(),
            timeout_secs: 30,
            max_attempts: 5,
            initial_backoff_ms: 1000,
            backoff_factor: 5,
            max_backoff_secs: 60,
            requests_per_second: 10,
            burst_size: 10,
        }
    }
}

impl HttpSettings {
    /// Build the HTTP client config
    pub fn client_config(&self, api_token: &str) -> HttpClientConfig {
        let builder = HttpClientConfig::builder()
            .base_url(&self.base_url)
            .api_key(api_token)
            .revision(&self.revision)
            .timeout(Duration::from_secs(self.timeout_secs));

        if self.requests_per_second == 0 {
            builder.no_rate_limit().build()
        } else {
            builder
                .rate_limit(RateLimiterConfig::new(
                    self.requests_per_second,
                    self.burst_size,
                ))
                .build()
        }
    }

    /// Build the retry policy
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.max_attempts.max(1),
            initial_backoff: Duration::from_millis(self.initial_backoff_ms),
            factor: self.backoff_factor,
            max_backoff: Duration::from_secs(self.max_backoff_secs),
            backoff_type: BackoffType::Exponential,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const FULL_YAML: &str = r##"
"#api_token": pk_abc
objects:
  campaigns: true
  events: true
  profiles: true
  metric_aggregates: true
time_range_settings:
  date_from: 2024-01-01
  date_to: now
profiles_settings:
  fetch_profiles_mode: fetch_by_segment
  fetch_profiles_by_segment: [S1, S2]
metric_aggregates_settings:
  metric_aggregates_ids: [M1]
  metric_aggregates_interval: week
  metric_aggregates_partitioning_by: [$message]
store_nested_attributes: true
http:
  max_attempts: 3
  requests_per_second: 0
"##;

    #[test]
    fn test_parse_full_yaml() {
        let config = ExtractorConfig::from_yaml_str(FULL_YAML).unwrap();

        assert_eq!(config.api_token, "pk_abc");
        assert_eq!(
            config.objects.enabled(),
            vec![
                ObjectKind::Campaigns,
                ObjectKind::Events,
                ObjectKind::Profiles,
                ObjectKind::MetricAggregates
            ]
        );
        assert_eq!(
            config.profiles_settings.fetch_profiles_mode,
            ProfilesMode::FetchBySegment
        );
        assert_eq!(config.profiles_settings.fetch_profiles_by_segment, vec!["S1", "S2"]);

        let aggregates = config.metric_aggregates_settings.as_ref().unwrap();
        assert_eq!(aggregates.metric_aggregates_interval, Interval::Week);
        assert_eq!(aggregates.metric_aggregates_partitioning_by, vec!["$message"]);
        assert!(config.store_nested_attributes);

        assert_eq!(config.retry_policy().max_attempts, 3);
        assert!(config.client_config().rate_limit.is_none());
        assert_eq!(config.client_config().api_key, "pk_abc");
    }

    #[test]
    fn test_defaults() {
        let config = ExtractorConfig::from_json_str(r#"{"api_token": "pk"}"#).unwrap();

        assert!(config.objects.enabled().is_empty());
        assert_eq!(config.profiles_settings.fetch_profiles_mode, ProfilesMode::FetchAll);
        assert!(!config.catalogs_settings.fetch_catalog_categories);

        let policy = config.retry_policy();
        assert_eq!(policy, RetryPolicy::default());
        assert_eq!(config.client_config().base_url, DEFAULT_BASE_URL);
    }

    #[test]
    fn test_events_fall_back_to_events_settings() {
        let json = r#"{
            "api_token": "pk",
            "objects": {"events": true},
            "events_settings": {"date_from": "5 days ago"}
        }"#;
        let config = ExtractorConfig::from_json_str(json).unwrap();

        let range = config.events_range().unwrap();
        assert_eq!(range.date_from, "5 days ago");
        assert_eq!(range.date_to, "now");
    }

    #[test]
    fn test_missing_token() {
        let err = ExtractorConfig::from_json_str(r#"{"api_token": " "}"#).unwrap_err();
        assert!(matches!(err, Error::MissingConfigField { ref field } if field == "api_token"));
    }

    #[test]
    fn test_events_without_range() {
        let json = r#"{"api_token": "pk", "objects": {"events": true}}"#;
        let err = ExtractorConfig::from_json_str(json).unwrap_err();
        assert!(matches!(err, Error::MissingConfigField { .. }));
    }

    #[test]
    fn test_aggregates_need_ids() {
        let json = r#"{
            "api_token": "pk",
            "objects": {"metric_aggregates": true},
            "time_range_settings": {"date_from": "2024-01-01"},
            "metric_aggregates_settings": {"metric_aggregates_ids": []}
        }"#;
        let err = ExtractorConfig::from_json_str(json).unwrap_err();
        assert!(err.to_string().contains("metric_aggregates_ids"));
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::Builder::new().suffix(".json").tempfile().unwrap();
        write!(file, r#"{{"api_token": "pk_file", "objects": {{"lists": true}}}}"#).unwrap();

        let config = ExtractorConfig::load(file.path()).unwrap();
        assert_eq!(config.api_token, "pk_file");
        assert!(config.objects.lists);
    }

    #[test]
    fn test_load_missing_file() {
        let err = ExtractorConfig::load("/nonexistent/config.yaml").unwrap_err();
        assert!(err.to_string().contains("Failed to read config file"));
    }
}
