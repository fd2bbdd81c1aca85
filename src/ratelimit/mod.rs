//! Per-host rate limiting.
//!
//! Every vendor API enforces its own request budget, so the limiter tracks a
//! rate per host and blocks callers until the minimum interval between
//! requests to that host has elapsed.
//!
//! # Architecture
//!
//! - [`HostKey`]: a normalized hostname used as the rate-limit key
//! - [`RateLimiterService`]: the process-wide registry of rates and per-host
//!   throttle state, shared by all fetchers via `Arc`
//! - [`RateLimitConfig`]: serde-friendly configuration for default and
//!   per-host rates

mod config;
mod key;
mod limiter;

pub use config::RateLimitConfig;
pub use key::HostKey;
pub use limiter::{DEFAULT_RATE, RateLimiterService};
