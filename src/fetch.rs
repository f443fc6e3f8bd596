//! Page fetcher with retry and exponential backoff
//!
//! Every page request made by the pagination strategies goes through
//! [`PageFetcher::fetch`]. Transient transport failures are retried; the
//! final failure is passed through the error classifier before it reaches
//! the caller.

use crate::classify::classify_error;
use crate::endpoint::EndpointOperation;
use crate::error::Result;
use crate::types::{BackoffType, JsonValue, Params};
use std::time::Duration;
use tracing::{debug, warn};

/// Maximum number of attempts for one page
pub const MAX_ATTEMPTS: u32 = 5;

/// Upper bound for a single backoff delay
pub const MAX_DELAY: Duration = Duration::from_secs(60);

/// Retry schedule for page fetches
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts including the first one
    pub max_attempts: u32,
    /// Delay before the first retry
    pub initial_backoff: Duration,
    /// Multiplier applied per attempt (exponential backoff)
    pub factor: u32,
    /// Cap for any single delay
    pub max_backoff: Duration,
    /// Shape of the schedule
    pub backoff_type: BackoffType,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: MAX_ATTEMPTS,
            initial_backoff: Duration::from_secs(1),
            factor: 5,
            max_backoff: MAX_DELAY,
            backoff_type: BackoffType::Exponential,
        }
    }
}

impl RetryPolicy {
    /// Policy that never retries
    pub fn no_retry() -> Self {
        Self {
            max_attempts: 1,
            ..Self::default()
        }
    }

    /// Set the initial backoff
    #[must_use]
    pub fn with_initial_backoff(mut self, initial: Duration) -> Self {
        self.initial_backoff = initial;
        self
    }

    /// Set the attempt ceiling
    #[must_use]
    pub fn with_max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = attempts.max(1);
        self
    }

    /// Delay to wait after the given (0-based) failed attempt
    pub fn backoff(&self, attempt: u32) -> Duration {
        let delay = match self.backoff_type {
            BackoffType::Constant => self.initial_backoff,
            BackoffType::Linear => self.initial_backoff.saturating_mul(attempt + 1),
            BackoffType::Exponential => self
                .initial_backoff
                .saturating_mul(self.factor.saturating_pow(attempt)),
        };

        std::cmp::min(delay, self.max_backoff)
    }
}

/// Invokes endpoint operations, retrying transient failures
#[derive(Debug, Clone, Copy, Default)]
pub struct PageFetcher {
    policy: RetryPolicy,
}

impl PageFetcher {
    /// Create a fetcher with the given retry policy
    pub fn new(policy: RetryPolicy) -> Self {
        Self { policy }
    }

    /// The retry policy in use
    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Call the endpoint, retrying transient failures.
    ///
    /// Non-transient failures are classified and returned immediately.
    pub async fn fetch(
        &self,
        endpoint: &dyn EndpointOperation,
        params: &Params,
    ) -> Result<JsonValue> {
        let mut attempt = 0;

        loop {
            match endpoint.call(params).await {
                Ok(page) => {
                    debug!("{} succeeded on attempt {}", endpoint.name(), attempt + 1);
                    return Ok(page);
                }
                Err(e) if e.is_retryable() && attempt + 1 < self.policy.max_attempts => {
                    let delay = self.policy.backoff(attempt);
                    warn!(
                        "{} failed ({}), attempt {}/{}, retrying in {:?}",
                        endpoint.name(),
                        e,
                        attempt + 1,
                        self.policy.max_attempts,
                        delay
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => return Err(classify_error(e)),
            }
        }
    }
}
