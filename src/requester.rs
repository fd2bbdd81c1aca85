//! Rate-limited, retrying HTTP execution.
//!
//! This module defines two structs, [`Requester`] and [`RequesterBuilder`].
//! `Requester` executes [`RequestSpec`]s with per-host rate limiting and
//! exponential-backoff retries; `RequesterBuilder` exposes a finer level of
//! granularity for building one.
//!
//! Every vendor fetcher funnels its HTTP calls through a `Requester` so that
//! retries and throttling behave identically across databases. Batches of
//! specs go through [`Requester::execute_batch`], which fans them out under
//! a concurrency cap while keeping the per-attempt rate limiting intact.

use http::{HeaderMap, HeaderValue, StatusCode, header};
use reqwest::Method;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::sleep;
use typed_builder::TypedBuilder;
use url::Url;

use crate::batch::{self, BatchOutcome};
use crate::cache::TtlCache;
use crate::ratelimit::RateLimiterService;
use crate::retry::RetryPolicy;
use crate::types::{ErrorKind, RequestSpec, Response, Result};

/// Default timeout per HTTP attempt in seconds, 30.
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;
/// Default user agent, `biodbs-fetch-<PKG_VERSION>`.
pub const DEFAULT_USER_AGENT: &str = concat!("biodbs-fetch/", env!("CARGO_PKG_VERSION"));

/// Builder for [`Requester`].
///
/// See crate-level documentation for usage example.
#[derive(TypedBuilder, Debug, Clone)]
#[builder(field_defaults(default, setter(into)))]
pub struct RequesterBuilder {
    /// The rate limiter shared with other fetchers in this process.
    ///
    /// When not set, the requester creates a private limiter; injecting a
    /// shared one keeps the per-host budgets honest when several fetchers
    /// target the same host.
    limiter: Option<Arc<RateLimiterService>>,

    /// User agent sent with every request
    #[builder(default_code = "String::from(DEFAULT_USER_AGENT)")]
    user_agent: String,

    /// Timeout per HTTP attempt (not per logical request; retries each get
    /// the full timeout)
    timeout: Option<Duration>,

    /// Retry policy applied by [`Requester::execute`]
    policy: RetryPolicy,

    /// When set, successful GET responses are cached for this long, keyed by
    /// the full request URL. Intended for small discovery endpoints that are
    /// hit repeatedly.
    cache_max_age: Option<Duration>,
}

impl Default for RequesterBuilder {
    #[must_use]
    #[inline]
    fn default() -> Self {
        Self::builder().build()
    }
}

impl RequesterBuilder {
    /// Instantiates a [`Requester`].
    ///
    /// # Errors
    ///
    /// Returns an `Err` if:
    /// - The user-agent is invalid.
    /// - The request client cannot be created.
    ///   See [here](https://docs.rs/reqwest/latest/reqwest/struct.ClientBuilder.html#errors).
    pub fn requester(self) -> Result<Requester> {
        let mut headers = HeaderMap::new();
        headers.insert(header::USER_AGENT, HeaderValue::from_str(&self.user_agent)?);

        let client = reqwest::ClientBuilder::new()
            .gzip(true)
            .default_headers(headers)
            .timeout(
                self.timeout
                    .unwrap_or(Duration::from_secs(DEFAULT_TIMEOUT_SECS)),
            )
            .build()
            .map_err(ErrorKind::NetworkRequest)?;

        Ok(Requester {
            client,
            limiter: self.limiter.unwrap_or_default(),
            policy: self.policy,
            cache: self.cache_max_age.map(|age| TtlCache::new(Some(age))),
        })
    }
}

/// Issues one logical HTTP request at a time, consulting the per-host rate
/// limiter before every attempt (including retries) and backing off
/// exponentially on transient failure.
#[derive(Debug)]
pub struct Requester {
    client: reqwest::Client,
    limiter: Arc<RateLimiterService>,
    policy: RetryPolicy,
    cache: Option<TtlCache<Url, Response>>,
}

impl Requester {
    /// The rate limiter consulted before every attempt.
    ///
    /// Fetchers register their vendor's rate here at construction time.
    #[must_use]
    pub fn limiter(&self) -> &Arc<RateLimiterService> {
        &self.limiter
    }

    /// The default retry policy
    #[must_use]
    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Execute a plain GET request against `url`
    ///
    /// # Errors
    ///
    /// See [`execute`](Self::execute).
    pub async fn get(&self, url: Url) -> Result<Response> {
        self.execute(&RequestSpec::get(url)).await
    }

    /// Execute `spec` with the requester's default retry policy
    ///
    /// # Errors
    ///
    /// See [`execute_with`](Self::execute_with).
    pub async fn execute(&self, spec: &RequestSpec) -> Result<Response> {
        self.execute_with(spec, &self.policy).await
    }

    /// Execute `spec`, retrying transient failures according to `policy`.
    ///
    /// Each attempt first acquires the rate limiter for the spec's host
    /// (unless the policy disables that). Transient outcomes — timeouts,
    /// connection failures, HTTP 429, and retryable server errors — are
    /// retried up to `policy.max_retries` times with exponentially growing
    /// delays; a numeric `Retry-After` header on a 429 overrides the next
    /// delay only. Any other non-2xx status fails immediately.
    ///
    /// # Errors
    ///
    /// - [`ErrorKind::RejectedStatusCode`] for non-retryable statuses
    /// - [`ErrorKind::RateLimitExhausted`], [`ErrorKind::ServerErrorExhausted`],
    ///   [`ErrorKind::TimeoutExhausted`], or [`ErrorKind::NetworkExhausted`]
    ///   once the retry budget is spent
    /// - [`ErrorKind::InvalidUrlHost`] if the URL has no host to rate-limit
    pub async fn execute_with(&self, spec: &RequestSpec, policy: &RetryPolicy) -> Result<Response> {
        let url = spec.full_url();
        let cacheable = spec.method == Method::GET && spec.body.is_none();

        if cacheable
            && let Some(cache) = &self.cache
            && let Some(response) = cache.get(&url)
        {
            log::debug!("Response cache hit for {url}");
            return Ok(response);
        }

        let host = spec.host_key()?;
        let total_attempts = policy.max_retries + 1;
        let mut delay = policy.initial_delay;
        let mut attempt: u64 = 0;

        loop {
            let attempts = attempt + 1;

            if policy.rate_limited {
                self.limiter.acquire(&host).await;
            }

            match self.send(spec).await {
                Err(source) => {
                    if attempt == policy.max_retries {
                        return Err(if source.is_timeout() {
                            ErrorKind::TimeoutExhausted {
                                url,
                                attempts,
                                source,
                            }
                        } else {
                            ErrorKind::NetworkExhausted {
                                url,
                                attempts,
                                source,
                            }
                        });
                    }
                    log::warn!(
                        "Request to {host} failed ({source}), retrying in {delay:?} (attempt {attempts}/{total_attempts})"
                    );
                    sleep(delay).await;
                    delay = policy.next_delay(delay);
                }
                Ok(raw) => {
                    let response = Response::from_reqwest(raw).await?;
                    if response.is_success() {
                        if cacheable && let Some(cache) = &self.cache {
                            cache.insert(url, response.clone());
                        }
                        return Ok(response);
                    }

                    let status = response.status;
                    if status == StatusCode::TOO_MANY_REQUESTS {
                        if attempt == policy.max_retries {
                            return Err(ErrorKind::RateLimitExhausted {
                                url,
                                attempts,
                                body: response.body_snippet(),
                            });
                        }
                        // A numeric Retry-After overrides the next sleep
                        // only; growth resumes from the overridden value
                        if let Some(retry_after) = response.retry_after() {
                            delay = retry_after;
                        }
                        log::warn!(
                            "Rate limited (429) by {host}, retrying in {delay:?} (attempt {attempts}/{total_attempts})"
                        );
                        sleep(delay).await;
                        delay = policy.next_delay(delay);
                    } else if policy.is_retryable_server_error(status) {
                        if attempt == policy.max_retries {
                            return Err(ErrorKind::ServerErrorExhausted {
                                url,
                                status,
                                attempts,
                                body: response.body_snippet(),
                            });
                        }
                        log::warn!(
                            "Server error ({status}) from {host}, retrying in {delay:?} (attempt {attempts}/{total_attempts})"
                        );
                        sleep(delay).await;
                        delay = policy.next_delay(delay);
                    } else {
                        // Client error, not transient
                        return Err(ErrorKind::RejectedStatusCode {
                            url,
                            status,
                            body: response.body_snippet(),
                        });
                    }
                }
            }

            attempt += 1;
        }
    }

    /// Execute many specs concurrently under a worker cap.
    ///
    /// Each spec goes through [`execute`](Self::execute), so rate limiting
    /// and retries apply per chunk. With `return_partial_failures`, failing
    /// specs are captured in their result slot and the outcome always
    /// matches the input in length and order; without it, the first failure
    /// is returned and the remaining specs are cancelled best-effort.
    ///
    /// # Errors
    ///
    /// Only with `return_partial_failures = false`: the first spec's error.
    pub async fn execute_batch(
        &self,
        specs: Vec<RequestSpec>,
        max_concurrency: usize,
        return_partial_failures: bool,
    ) -> Result<BatchOutcome<Response>> {
        let tasks: Vec<_> = specs
            .into_iter()
            .map(|spec| async move { self.execute(&spec).await })
            .collect();
        batch::run(tasks, max_concurrency, return_partial_failures).await
    }

    async fn send(
        &self,
        spec: &RequestSpec,
    ) -> std::result::Result<reqwest::Response, reqwest::Error> {
        let mut request = self
            .client
            .request(spec.method.clone(), spec.url.clone())
            .headers(spec.headers.clone());
        if !spec.params.is_empty() {
            request = request.query(&spec.params);
        }
        if let Some(body) = &spec.body {
            request = request.body(body.clone());
        }
        request.send().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock_server;
    use crate::test_utils::fast_requester;
    use pretty_assertions::assert_eq;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn test_success_returns_body() {
        let mock_server = mock_server!(StatusCode::OK, set_body_string("gene\tname\n"));
        let requester = fast_requester();

        let response = requester
            .get(Url::parse(&mock_server.uri()).unwrap())
            .await
            .unwrap();

        assert!(response.is_success());
        assert_eq!(response.body, "gene\tname\n");
    }

    #[tokio::test]
    async fn test_retry_budget_is_exact() {
        // maxRetries = 3 means exactly 4 attempts
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(500).set_body_string("upstream down"))
            .expect(4)
            .mount(&mock_server)
            .await;

        let requester = fast_requester();
        let result = requester.get(Url::parse(&mock_server.uri()).unwrap()).await;

        match result {
            Err(ErrorKind::ServerErrorExhausted {
                status,
                attempts,
                body,
                ..
            }) => {
                assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
                assert_eq!(attempts, 4);
                assert_eq!(body, "upstream down");
            }
            other => panic!("expected ServerErrorExhausted, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_client_error_is_not_retried() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404).set_body_string("no such record"))
            .expect(1)
            .mount(&mock_server)
            .await;

        let requester = fast_requester();
        let result = requester.get(Url::parse(&mock_server.uri()).unwrap()).await;

        assert!(matches!(
            result,
            Err(ErrorKind::RejectedStatusCode {
                status: StatusCode::NOT_FOUND,
                ..
            })
        ));
    }

    #[tokio::test]
    async fn test_rate_limit_exhaustion() {
        let mock_server = mock_server!(StatusCode::TOO_MANY_REQUESTS, set_body_string("slow down"));

        let requester = fast_requester();
        let result = requester.get(Url::parse(&mock_server.uri()).unwrap()).await;

        match result {
            Err(ErrorKind::RateLimitExhausted { attempts, body, .. }) => {
                assert_eq!(attempts, 4);
                assert_eq!(body, "slow down");
            }
            other => panic!("expected RateLimitExhausted, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_unlisted_server_error_is_not_retried() {
        // 501 is a server error but not in the default retryable set
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(501))
            .expect(1)
            .mount(&mock_server)
            .await;

        let requester = fast_requester();
        let result = requester.get(Url::parse(&mock_server.uri()).unwrap()).await;

        assert!(matches!(
            result,
            Err(ErrorKind::RejectedStatusCode {
                status: StatusCode::NOT_IMPLEMENTED,
                ..
            })
        ));
    }

    #[tokio::test]
    async fn test_error_body_is_truncated() {
        let mock_server = mock_server!(StatusCode::FORBIDDEN, set_body_string("x".repeat(5000)));

        let requester = fast_requester();
        let result = requester.get(Url::parse(&mock_server.uri()).unwrap()).await;

        match result {
            Err(ErrorKind::RejectedStatusCode { body, .. }) => assert_eq!(body.len(), 500),
            other => panic!("expected RejectedStatusCode, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_response_cache_serves_repeat_gets() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("datasets"))
            .expect(1)
            .mount(&mock_server)
            .await;

        let requester = RequesterBuilder::builder()
            .policy(crate::test_utils::fast_policy())
            .cache_max_age(Duration::from_secs(60))
            .build()
            .requester()
            .unwrap();
        requester.limiter().set_rate("127.0.0.1", 1000.0);

        let url = Url::parse(&mock_server.uri()).unwrap();
        let first = requester.get(url.clone()).await.unwrap();
        let second = requester.get(url).await.unwrap();

        assert_eq!(first.body, second.body);
    }

    #[tokio::test]
    async fn test_execute_batch_partial_failures() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/ok"))
            .respond_with(ResponseTemplate::new(200).set_body_string("fine"))
            .mount(&mock_server)
            .await;
        Mock::given(method("GET"))
            .and(path("/bad"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&mock_server)
            .await;

        let requester = fast_requester();
        let base = Url::parse(&mock_server.uri()).unwrap();
        let specs = vec![
            RequestSpec::get(base.join("/ok").unwrap()),
            RequestSpec::get(base.join("/bad").unwrap()),
            RequestSpec::get(base.join("/ok").unwrap()),
        ];

        let outcome = requester.execute_batch(specs, 2, true).await.unwrap();

        assert_eq!(outcome.len(), 3);
        assert_eq!(outcome.failed_indices(), vec![1]);
    }
}
