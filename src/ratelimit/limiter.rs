use dashmap::DashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tokio::time::sleep;

use super::config::RateLimitConfig;
use super::key::HostKey;

/// Default fallback rate (requests per second) for hosts without a
/// registered rate
pub const DEFAULT_RATE: f64 = 10.0;

/// Per-host throttle state: the timestamp of the last permitted request
/// start, guarded by its own lock so that hosts never wait on each other.
type ThrottleState = Arc<Mutex<Option<Instant>>>;

/// Shared, per-host rate limiter enforcing a minimum interval between
/// requests to the same host.
///
/// One instance is constructed at process start and shared (via [`Arc`])
/// across all fetchers and all concurrent batch calls. Each fetcher registers
/// the rate for its vendor's host at construction time via
/// [`set_rate`](Self::set_rate); the limiter itself has no knowledge of
/// specific APIs.
///
/// This is a fixed-interval throttle: it guarantees a floor on the spacing
/// between consecutive requests to one host. It deliberately does not allow
/// bursts above the steady-state rate the way a token bucket would.
///
/// # Examples
///
/// ```
/// use biodbs_fetch::ratelimit::RateLimiterService;
///
/// # #[tokio::main]
/// # async fn main() {
/// let limiter = RateLimiterService::new();
/// limiter.set_rate("rest.kegg.jp", 3.0);
///
/// // Before each request:
/// limiter.acquire(&"rest.kegg.jp".into()).await;
/// # }
/// ```
#[derive(Debug)]
pub struct RateLimiterService {
    /// Fallback rate for hosts without a registered rate
    default_rate: f64,

    /// Registered rates per host (requests per second)
    rates: DashMap<HostKey, f64>,

    /// Last permitted request start per host
    last_request: DashMap<HostKey, ThrottleState>,
}

impl RateLimiterService {
    /// Create a limiter with the standard default rate of 10 requests per
    /// second for unregistered hosts
    #[must_use]
    pub fn new() -> Self {
        Self::with_default_rate(DEFAULT_RATE)
    }

    /// Create a limiter with a custom fallback rate for unregistered hosts.
    ///
    /// A non-positive or non-finite fallback rate is ignored with a warning
    /// and [`DEFAULT_RATE`] is used instead, matching
    /// [`set_rate`](Self::set_rate).
    #[must_use]
    pub fn with_default_rate(default_rate: f64) -> Self {
        let default_rate = if default_rate.is_finite() && default_rate > 0.0 {
            default_rate
        } else {
            log::warn!("Ignoring invalid default rate {default_rate}, using {DEFAULT_RATE}");
            DEFAULT_RATE
        };
        Self {
            default_rate,
            rates: DashMap::new(),
            last_request: DashMap::new(),
        }
    }

    /// Create a limiter from a [`RateLimitConfig`]
    #[must_use]
    pub fn from_config(config: &RateLimitConfig) -> Self {
        let limiter = Self::with_default_rate(config.default_rate);
        for (host, rate) in &config.rates {
            limiter.set_rate(host.as_str(), *rate);
        }
        limiter
    }

    /// Register or overwrite the allowed rate for a host, in requests per
    /// second. The last write wins.
    ///
    /// Non-positive or non-finite rates are a caller error; they are ignored
    /// with a warning and the previously registered (or default) rate stays
    /// in effect.
    pub fn set_rate(&self, host: impl Into<HostKey>, requests_per_second: f64) {
        let host = host.into();
        if !requests_per_second.is_finite() || requests_per_second <= 0.0 {
            log::warn!("Ignoring invalid rate {requests_per_second} for host {host}");
            return;
        }
        self.rates.insert(host, requests_per_second);
    }

    /// The effective rate for a host, in requests per second.
    ///
    /// Falls back to a substring match in either direction against the
    /// registered hosts, which tolerates aliases, subdomains, and
    /// port-qualified keys (a rate registered for `ncbi.nlm.nih.gov` also
    /// covers `eutils.ncbi.nlm.nih.gov`; one registered for `localhost`
    /// covers `localhost:8080`). When several registered hosts match, the
    /// first match wins. Unmatched hosts get the default rate.
    #[must_use]
    pub fn rate(&self, host: &HostKey) -> f64 {
        if let Some(rate) = self.rates.get(host) {
            return *rate;
        }
        for entry in &self.rates {
            let registered = entry.key().as_str();
            if host.as_str().contains(registered) || registered.contains(host.as_str()) {
                return *entry.value();
            }
        }
        self.default_rate
    }

    /// Block until it is safe to issue a request to `host` without exceeding
    /// its rate, then record the new last-request timestamp.
    ///
    /// Safe to call concurrently from many tasks for the same or different
    /// hosts. Waiting holds only this host's lock, so throttling two
    /// different hosts never serializes on each other. Within one host,
    /// grants go to whichever task takes the lock next once the interval has
    /// elapsed; there is no fairness guarantee beyond mutual exclusion.
    pub async fn acquire(&self, host: &HostKey) {
        let rate = self.rate(host);
        let min_interval = Duration::from_secs_f64(1.0 / rate);

        // Insert-if-absent on the shared map, then release the map shard
        // before waiting on this host's own lock
        let state = Arc::clone(&self.last_request.entry(host.clone()).or_default());

        let mut last = state.lock().await;
        if let Some(previous) = *last {
            let elapsed = previous.elapsed();
            if elapsed < min_interval {
                let wait = min_interval - elapsed;
                log::debug!("Rate limiting {host}: sleeping {}ms", wait.as_millis());
                sleep(wait).await;
            }
        }
        *last = Some(Instant::now());
    }

    /// Clear the last-request timestamp for one host, or for all hosts.
    ///
    /// Registered rates are kept. This is a test and operational utility; it
    /// is never needed in the normal request flow.
    pub fn reset(&self, host: Option<&HostKey>) {
        match host {
            Some(host) => {
                self.last_request.remove(host);
            }
            None => self.last_request.clear(),
        }
    }

    /// Number of hosts with a registered rate
    #[must_use]
    pub fn registered_host_count(&self) -> usize {
        self.rates.len()
    }
}

impl Default for RateLimiterService {
    fn default() -> Self {
        Self::new()
    }
}
