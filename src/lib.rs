// Allow common clippy pedantic lints that aren't critical for this codebase
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_sign_loss)]
#![allow(clippy::too_many_lines)]
#![allow(clippy::struct_excessive_bools)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::needless_pass_by_value)]

//! # Klaviyo extractor
//!
//! Pulls resources from the Klaviyo REST API and emits them as flat rows.
//!
//! ## Features
//!
//! - **Three pagination conventions**: cursor links, offset tokens, page/count totals
//! - **Retry**: exponential backoff for transient failures, nothing else
//! - **Readable errors**: both API error-body shapes classified into one message
//! - **Metric aggregates**: matrix-shaped responses flattened into per-date rows
//! - **Scope probing**: which read scopes a private key is missing
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use futures::TryStreamExt;
//! use klaviyo_extractor::{KlaviyoClient, Resource, RetryPolicy, HttpClientConfig};
//!
//! #[tokio::main]
//! async fn main() -> klaviyo_extractor::Result<()> {
//!     let config = HttpClientConfig::builder().api_key("pk_...").build();
//!     let client = KlaviyoClient::new(config, RetryPolicy::default())?;
//!
//!     let mut pages = client.stream(&Resource::Profiles);
//!     while let Some(page) = pages.try_next().await? {
//!         for record in page {
//!             println!("{}", record.id);
//!         }
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │            Extractor (objects → tables) / KlaviyoClient         │
//! └─────────────────────────────────────────────────────────────────┘
//!                                │
//! ┌───────────┬──────────────────┴──┬──────────────┬───────────────┐
//! │ Resources │     Pagination      │  Aggregates  │    Scopes     │
//! ├───────────┼─────────────────────┼──────────────┼───────────────┤
//! │ enum →    │ Cursor              │ Query body   │ Probe each    │
//! │ strategy  │ Offset              │ Repair       │ scope once    │
//! │ +endpoint │ PageCount           │ Expand       │               │
//! └───────────┴──────────┬──────────┴──────────────┴───────────────┘
//!                        │
//! ┌──────────────────────┴──────────────────────────────────────────┐
//! │  PageFetcher (retry) → EndpointOperation (HTTP) → Classifier    │
//! └─────────────────────────────────────────────────────────────────┘
//! ```

#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::doc_markdown)]
#![allow(missing_docs)]

// ============================================================================
// Module declarations
// ============================================================================

/// Error types for the extractor
pub mod error;

/// Common types and type aliases
pub mod types;

/// Endpoint operation abstraction
pub mod endpoint;

/// Page fetcher with retry
pub mod fetch;

/// Error body classification
pub mod classify;

/// Pagination strategies
pub mod pagination;

/// Metric aggregate query and normalization
pub mod aggregate;

/// API key scope probing
pub mod scopes;

/// HTTP transport with rate limiting
pub mod http;

/// Resource registry
pub mod resources;

/// Klaviyo client facade
pub mod client;

/// Attribute flattening
pub mod flatten;

/// Date expressions
pub mod dates;

/// Extraction configuration
pub mod config;

/// Record sinks
pub mod output;

/// Extraction engine
pub mod engine;

/// Command-line interface
pub mod cli;

// ============================================================================
// Re-exports
// ============================================================================

pub use error::{Error, Result};
pub use types::*;

// Re-export commonly used types
pub use aggregate::{AggregateQuery, AggregateRecord, Interval};
pub use client::{KlaviyoClient, SelectOption};
pub use config::ExtractorConfig;
pub use endpoint::EndpointOperation;
pub use fetch::{PageFetcher, RetryPolicy};
pub use http::HttpClientConfig;
pub use pagination::{paginate, PageStream, PaginationKind};
pub use resources::{EndpointSpec, Resource};
pub use scopes::{probe_scopes, Scope, ScopeProbeResult};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Crate name
pub const NAME: &str = env!("CARGO_PKG_NAME");
