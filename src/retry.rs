//! Retry policy and backoff computation.

use http::StatusCode;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::time::Duration;

/// Default number of retries after the initial attempt, 3.
pub const DEFAULT_MAX_RETRIES: u64 = 3;
/// Default delay before the first retry, 1 second.
pub const DEFAULT_INITIAL_DELAY: Duration = Duration::from_secs(1);
/// Default upper bound on the delay between retries, 60 seconds.
pub const DEFAULT_MAX_DELAY: Duration = Duration::from_secs(60);
/// Default base for exponential backoff growth, 2.
pub const DEFAULT_EXPONENTIAL_BASE: f64 = 2.0;
/// Status codes that are retried by default: rate limiting and the transient
/// server errors.
pub const DEFAULT_RETRYABLE_STATUS_CODES: [u16; 5] = [429, 500, 502, 503, 504];

/// Controls how a request is retried on transient failure.
///
/// Delays between attempts grow exponentially from
/// [`initial_delay`](Self::initial_delay) by a factor of
/// [`exponential_base`](Self::exponential_base), capped at
/// [`max_delay`](Self::max_delay). A numeric `Retry-After` header on a 429
/// response overrides the next delay only; growth resumes from the
/// overridden value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RetryPolicy {
    /// Number of retries after the initial attempt
    #[serde(default = "default_max_retries")]
    pub max_retries: u64,

    /// Delay before the first retry
    #[serde(default = "default_initial_delay", with = "humantime_serde")]
    pub initial_delay: Duration,

    /// Upper bound on the delay between retries
    #[serde(default = "default_max_delay", with = "humantime_serde")]
    pub max_delay: Duration,

    /// Multiplier applied to the delay after each retry
    #[serde(default = "default_exponential_base")]
    pub exponential_base: f64,

    /// Status codes considered transient. Codes below 500 in this set are
    /// ignored except for 429, which is always retried.
    #[serde(default = "default_retryable_status_codes")]
    pub retryable_status_codes: HashSet<u16>,

    /// Whether to consult the per-host rate limiter before every attempt,
    /// including retries
    #[serde(default = "default_rate_limited")]
    pub rate_limited: bool,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: default_max_retries(),
            initial_delay: default_initial_delay(),
            max_delay: default_max_delay(),
            exponential_base: default_exponential_base(),
            retryable_status_codes: default_retryable_status_codes(),
            rate_limited: default_rate_limited(),
        }
    }
}

const fn default_max_retries() -> u64 {
    DEFAULT_MAX_RETRIES
}

const fn default_initial_delay() -> Duration {
    DEFAULT_INITIAL_DELAY
}

const fn default_max_delay() -> Duration {
    DEFAULT_MAX_DELAY
}

const fn default_exponential_base() -> f64 {
    DEFAULT_EXPONENTIAL_BASE
}

fn default_retryable_status_codes() -> HashSet<u16> {
    DEFAULT_RETRYABLE_STATUS_CODES.into_iter().collect()
}

const fn default_rate_limited() -> bool {
    true
}

impl RetryPolicy {
    /// The delay for the retry after the one that used `current`, capped at
    /// [`max_delay`](Self::max_delay)
    #[must_use]
    pub fn next_delay(&self, current: Duration) -> Duration {
        current.mul_f64(self.exponential_base).min(self.max_delay)
    }

    /// Whether a status code is a retryable server error. 429 is handled
    /// separately because of its `Retry-After` semantics.
    #[must_use]
    pub(crate) fn is_retryable_server_error(&self, status: StatusCode) -> bool {
        status.as_u16() >= 500 && self.retryable_status_codes.contains(&status.as_u16())
    }
}
