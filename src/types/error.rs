use http::StatusCode;
use thiserror::Error;
use url::Url;

/// Maximum number of characters of a response body that is embedded into an
/// error message. Vendor APIs occasionally return multi-megabyte error pages.
pub(crate) const MAX_BODY_SNIPPET: usize = 500;

/// Truncate a response body for use in error messages
pub(crate) fn body_snippet(body: &str) -> String {
    body.chars().take(MAX_BODY_SNIPPET).collect()
}

/// Possible errors when interacting with `biodbs_fetch`
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum ErrorKind {
    /// Network error which was not subject to retries,
    /// e.g. while constructing the HTTP client
    #[error("Network error: {0}")]
    NetworkRequest(#[source] reqwest::Error),

    /// Request kept timing out until the retry budget was exhausted
    #[error("Request to {url} timed out after {attempts} attempts: {source}")]
    TimeoutExhausted {
        /// The URL that timed out
        url: Url,
        /// Total number of attempts made (initial request plus retries)
        attempts: u64,
        /// The final timeout error
        #[source]
        source: reqwest::Error,
    },

    /// Connection kept failing until the retry budget was exhausted
    #[error("Request to {url} failed after {attempts} attempts: {source}")]
    NetworkExhausted {
        /// The URL that could not be reached
        url: Url,
        /// Total number of attempts made
        attempts: u64,
        /// The final network error
        #[source]
        source: reqwest::Error,
    },

    /// The server kept responding with HTTP 429 until the retry budget was
    /// exhausted
    #[error("Rate limited by {url} after {attempts} attempts: {body}")]
    RateLimitExhausted {
        /// The URL that rate-limited us
        url: Url,
        /// Total number of attempts made
        attempts: u64,
        /// Truncated body of the final 429 response
        body: String,
    },

    /// The server kept responding with a retryable server error until the
    /// retry budget was exhausted
    #[error("Server error {status} from {url} after {attempts} attempts: {body}")]
    ServerErrorExhausted {
        /// The URL that kept failing
        url: Url,
        /// Status code of the final response
        status: StatusCode,
        /// Total number of attempts made
        attempts: u64,
        /// Truncated body of the final response
        body: String,
    },

    /// The server responded with a non-retryable status code
    /// (a client error such as 400, 403, or 404)
    #[error("Unexpected status {status} from {url}: {body}")]
    RejectedStatusCode {
        /// The URL that was rejected
        url: Url,
        /// The rejecting status code
        status: StatusCode,
        /// Truncated response body
        body: String,
    },

    /// A URL without a host was passed to a component that needs one
    /// for rate limiting
    #[error("URL is missing a host")]
    InvalidUrlHost,

    /// The response body could not be read
    #[error("Failed to read response body: {0}")]
    ReadResponseBody(#[source] reqwest::Error),

    /// The given header value could not be parsed
    #[error("Header could not be parsed")]
    InvalidHeader(#[from] http::header::InvalidHeaderValue),

    /// A storage sink failed while streaming batch results
    #[error("Failed to write to storage sink: {0}")]
    Storage(#[from] std::io::Error),
}
