use std::time::Duration;

use http::{HeaderMap, StatusCode, header};
use url::Url;

use crate::types::Result;
use crate::types::error::{ErrorKind, body_snippet};

/// The result of an HTTP request.
///
/// This is a plain descriptor rather than [`reqwest::Response`], which cannot
/// be cloned or stored in a result slot. The body is read eagerly so that it
/// is available for decoding and for error snippets alike.
#[derive(Debug, Clone)]
pub struct Response {
    /// HTTP status code
    pub status: StatusCode,
    /// Response headers
    pub headers: HeaderMap,
    /// Response body as text
    pub body: String,
    /// Final URL of the response (after redirects)
    pub url: Url,
}

impl Response {
    /// Read a [`reqwest::Response`] into a descriptor
    ///
    /// # Errors
    ///
    /// Returns [`ErrorKind::ReadResponseBody`] if the body cannot be read.
    pub(crate) async fn from_reqwest(response: reqwest::Response) -> Result<Self> {
        let status = response.status();
        let headers = response.headers().clone();
        let url = response.url().clone();
        let body = response.text().await.map_err(ErrorKind::ReadResponseBody)?;

        Ok(Self {
            status,
            headers,
            body,
            url,
        })
    }

    /// Whether the status code is in the 2xx range
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }

    /// The numeric `Retry-After` header value, if present.
    ///
    /// HTTP-date values are not supported; none of the covered vendor APIs
    /// send them.
    #[must_use]
    pub fn retry_after(&self) -> Option<Duration> {
        let value = self.headers.get(header::RETRY_AFTER)?.to_str().ok()?;
        let seconds: f64 = value.trim().parse().ok()?;
        if seconds.is_finite() && seconds >= 0.0 {
            Some(Duration::from_secs_f64(seconds))
        } else {
            None
        }
    }

    /// The response body truncated for use in error messages
    #[must_use]
    pub fn body_snippet(&self) -> String {
        body_snippet(&self.body)
    }
}
