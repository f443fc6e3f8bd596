//! HTTP transport module
//!
//! Adapts the Klaviyo REST API to [`crate::endpoint::EndpointOperation`].
//!
//! # Features
//!
//! - **Authentication**: `Klaviyo-API-Key` header or legacy `api_key` parameter
//! - **Rate Limiting**: Token bucket rate limiter using governor
//! - **Raw Failures**: non-2xx responses surface status, reason and body

mod client;
mod endpoint;
mod rate_limit;

pub use client::{
    HttpClient, HttpClientConfig, HttpClientConfigBuilder, DEFAULT_BASE_URL, DEFAULT_REVISION,
};
pub use endpoint::HttpEndpoint;
pub use rate_limit::{RateLimiter, RateLimiterConfig};
