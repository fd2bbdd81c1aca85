use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use super::limiter::DEFAULT_RATE;

/// Rate limiting configuration, loadable from TOML alongside the rest of a
/// fetcher's configuration.
///
/// ```toml
/// default_rate = 10.0
///
/// [rates]
/// "api.ncbi.nlm.nih.gov" = 3.0
/// "rest.kegg.jp" = 3.0
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RateLimitConfig {
    /// Fallback rate (requests per second) for hosts without an entry in
    /// [`rates`](Self::rates)
    #[serde(default = "default_rate")]
    pub default_rate: f64,

    /// Per-host rates in requests per second
    #[serde(default)]
    pub rates: HashMap<String, f64>,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            default_rate: default_rate(),
            rates: HashMap::new(),
        }
    }
}

/// Default fallback rate
const fn default_rate() -> f64 {
    DEFAULT_RATE
}
