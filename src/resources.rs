//! Resource registry
//!
//! Maps every extractable resource to its pagination convention and the
//! endpoint that serves it. Resolution happens once per stream, never by
//! looking methods up at runtime.

use crate::pagination::PaginationKind;
use crate::types::{ApiGeneration, JsonValue, Method, Params};

/// Everything needed to call one Klaviyo endpoint
#[derive(Debug, Clone, PartialEq)]
pub struct EndpointSpec {
    /// Name used in logs
    pub name: String,
    /// API generation (decides authentication and parameter naming)
    pub generation: ApiGeneration,
    /// HTTP method
    pub method: Method,
    /// Path relative to the API base URL
    pub path: String,
    /// Parameters sent with every call
    pub params: Params,
    /// JSON body for POST endpoints
    pub body: Option<JsonValue>,
}

impl EndpointSpec {
    /// GET endpoint of the current API
    pub fn current(name: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            generation: ApiGeneration::Current,
            method: Method::GET,
            path: path.into(),
            params: Params::new(),
            body: None,
        }
    }

    /// GET endpoint of the legacy API
    pub fn legacy(name: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            generation: ApiGeneration::Legacy,
            ..Self::current(name, path)
        }
    }

    /// POST endpoint of the current API
    pub fn post(name: impl Into<String>, path: impl Into<String>, body: JsonValue) -> Self {
        Self {
            method: Method::POST,
            body: Some(body),
            ..Self::current(name, path)
        }
    }

    /// Add a fixed parameter
    #[must_use]
    pub fn param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.insert(key.into(), value.into());
        self
    }

    /// Single list lookup
    pub fn list(list_id: &str) -> Self {
        Self::current("get_list", format!("/api/lists/{list_id}/"))
    }

    /// Single segment lookup
    pub fn segment(segment_id: &str) -> Self {
        Self::current("get_segment", format!("/api/segments/{segment_id}/"))
    }

    /// Single metric lookup
    pub fn metric(metric_id: &str) -> Self {
        Self::current("get_metric", format!("/api/metrics/{metric_id}/"))
    }
}

/// A paginated resource
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resource {
    Campaigns,
    CampaignRecipients { campaign_id: String },
    CampaignMessages { campaign_id: String },
    Templates,
    Metrics,
    CatalogItems,
    CatalogCategories,
    /// Events with `from <= timestamp <= to` (unix seconds)
    Events { from: i64, to: i64 },
    Lists,
    ListProfiles { list_id: String },
    Profiles,
    Segments,
    SegmentProfiles { segment_id: String },
}

impl Resource {
    /// Output table the resource's records go to
    pub fn table(&self) -> &'static str {
        match self {
            Self::Campaigns => "campaign",
            Self::CampaignRecipients { .. } => "campaign_recipient",
            Self::CampaignMessages { .. } => "campaign_message",
            Self::Templates => "template",
            Self::Metrics => "metric",
            Self::CatalogItems => "catalog_item",
            Self::CatalogCategories => "catalog_categories",
            Self::Events { .. } => "event",
            Self::Lists => "list",
            Self::ListProfiles { .. } => "list_profile",
            Self::Profiles => "profile",
            Self::Segments => "segment",
            Self::SegmentProfiles { .. } => "segment_profile",
        }
    }

    /// Parent id carried into every row, as `(column, value)`
    pub fn parent(&self) -> Option<(&'static str, &str)> {
        match self {
            Self::CampaignRecipients { campaign_id } | Self::CampaignMessages { campaign_id } => {
                Some(("campaign_id", campaign_id.as_str()))
            }
            Self::ListProfiles { list_id } => Some(("list_id", list_id.as_str())),
            Self::SegmentProfiles { segment_id } => Some(("segment_id", segment_id.as_str())),
            _ => None,
        }
    }

    /// Pagination convention of the serving endpoint
    pub fn pagination(&self) -> PaginationKind {
        match self {
            Self::Campaigns | Self::Templates => PaginationKind::PageCount,
            Self::CampaignRecipients { .. } => PaginationKind::Offset,
            _ => PaginationKind::Cursor,
        }
    }

    /// Endpoint serving the resource
    pub fn endpoint(&self) -> EndpointSpec {
        let name = format!("get_{}", self.table());
        match self {
            Self::Campaigns => EndpointSpec::legacy(name, "/api/v1/campaigns"),
            Self::Templates => EndpointSpec::legacy(name, "/api/v1/email-templates"),
            Self::CampaignRecipients { campaign_id } => {
                EndpointSpec::legacy(name, format!("/api/v1/campaign/{campaign_id}/recipients"))
            }
            Self::CampaignMessages { campaign_id } => EndpointSpec::current(
                name,
                format!("/api/campaigns/{campaign_id}/campaign-messages/"),
            ),
            Self::Metrics => EndpointSpec::current(name, "/api/metrics/"),
            Self::CatalogItems => EndpointSpec::current(name, "/api/catalog-items/"),
            Self::CatalogCategories => EndpointSpec::current(name, "/api/catalog-categories/"),
            Self::Events { from, to } => EndpointSpec::current(name, "/api/events/").param(
                "filter",
                format!("greater-or-equal(timestamp,{from}),less-or-equal(timestamp,{to})"),
            ),
            Self::Lists => EndpointSpec::current(name, "/api/lists/"),
            Self::ListProfiles { list_id } => {
                EndpointSpec::current(name, format!("/api/lists/{list_id}/profiles/"))
            }
            Self::Profiles => EndpointSpec::current(name, "/api/profiles/"),
            Self::Segments => EndpointSpec::current(name, "/api/segments/")
                .param("fields_segment", "name,definition"),
            Self::SegmentProfiles { segment_id } => {
                EndpointSpec::current(name, format!("/api/segments/{segment_id}/profiles/"))
            }
        }
    }
}
