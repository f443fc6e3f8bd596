//! Credential and scope probing
//!
//! Klaviyo private keys carry per-resource read scopes. A key missing a
//! scope still authenticates; the API answers 403 for that resource only.
//! Probing calls each scoped endpoint once and sorts the outcomes.

use crate::endpoint::EndpointOperation;
use crate::error::Error;
use crate::fetch::PageFetcher;
use crate::resources::{EndpointSpec, Resource};
use crate::types::Params;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info};

/// A read scope of a Klaviyo private API key
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Scope {
    Campaigns,
    Catalogs,
    Events,
    Lists,
    Metrics,
    Profiles,
    Segments,
}

impl Scope {
    /// Every probed scope, in probe order
    pub const ALL: [Scope; 7] = [
        Scope::Campaigns,
        Scope::Catalogs,
        Scope::Events,
        Scope::Lists,
        Scope::Metrics,
        Scope::Profiles,
        Scope::Segments,
    ];

    /// Scope name as shown to users
    pub fn as_str(self) -> &'static str {
        match self {
            Scope::Campaigns => "campaigns",
            Scope::Catalogs => "catalogs",
            Scope::Events => "events",
            Scope::Lists => "lists",
            Scope::Metrics => "metrics",
            Scope::Profiles => "profiles",
            Scope::Segments => "segments",
        }
    }

    /// Cheapest read operation guarded by this scope
    pub fn probe_endpoint(self) -> EndpointSpec {
        match self {
            Scope::Campaigns => EndpointSpec::current("campaigns", "/api/campaigns/")
                .param("filter", "equals(messages.channel,'email')"),
            Scope::Catalogs => Resource::CatalogItems.endpoint(),
            Scope::Events => EndpointSpec::current("events", "/api/events/"),
            Scope::Lists => Resource::Lists.endpoint(),
            Scope::Metrics => Resource::Metrics.endpoint(),
            Scope::Profiles => Resource::Profiles.endpoint(),
            Scope::Segments => Resource::Segments.endpoint(),
        }
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of probing every scope
#[derive(Debug, Default)]
pub struct ScopeProbeResult {
    /// The key authenticated at least once
    pub token_valid: bool,
    /// Scopes that failed, with the reason
    pub missing_scopes: BTreeMap<Scope, String>,
    /// Last non-403 failure, kept only when the token is invalid
    pub last_error: Option<Error>,
}

impl ScopeProbeResult {
    /// Valid key with every scope granted
    pub fn all_granted(&self) -> bool {
        self.token_valid && self.missing_scopes.is_empty()
    }

    /// Markdown table of the missing scopes
    pub fn missing_table(&self) -> String {
        let mut table = String::from("| Scope | Error |\n|-------|-------|");
        for (scope, reason) in &self.missing_scopes {
            table.push_str(&format!("\n| {scope} | {reason} |"));
        }
        table
    }
}

/// Call each scope's operation once (first page only) and sort the results.
///
/// Success or a 403 proves the key authenticates. Any other failure is
/// recorded and kept as `last_error`, which survives only if nothing proved
/// the key valid.
pub async fn probe_scopes(
    fetcher: &PageFetcher,
    probes: &[(Scope, Arc<dyn EndpointOperation>)],
) -> ScopeProbeResult {
    let mut result = ScopeProbeResult::default();
    let params = Params::new();

    for (scope, endpoint) in probes {
        match fetcher.fetch(endpoint.as_ref(), &params).await {
            Ok(_) => {
                debug!("Scope {} is authorized", scope);
                result.token_valid = true;
            }
            Err(e) if e.status() == Some(403) => {
                debug!("Scope {} is missing: {}", scope, e);
                result.token_valid = true;
                result.missing_scopes.insert(*scope, e.to_string());
            }
            Err(e) => {
                debug!("Scope {} probe failed: {}", scope, e);
                result.missing_scopes.insert(*scope, e.to_string());
                result.last_error = Some(e);
            }
        }
    }

    if result.token_valid {
        result.last_error = None;
    }

    info!(
        "Scope probe finished: token valid = {}, {} scope(s) missing",
        result.token_valid,
        result.missing_scopes.len()
    );

    result
}
