use http::HeaderMap;
use reqwest::Method;
use url::Url;

use crate::ratelimit::HostKey;
use crate::types::Result;

/// An immutable description of one HTTP call.
///
/// Specs are produced by the vendor layer (URL and query construction is out
/// of scope here) and handed to the [`Requester`](crate::Requester), which
/// applies rate limiting and retries around the actual transport call.
///
/// # Examples
///
/// ```
/// use biodbs_fetch::RequestSpec;
/// use url::Url;
///
/// let url = Url::parse("https://rest.kegg.jp/get/hsa00010").unwrap();
/// let spec = RequestSpec::get(url).with_param("format", "json");
/// assert_eq!(spec.full_url().as_str(), "https://rest.kegg.jp/get/hsa00010?format=json");
/// ```
#[derive(Debug, Clone)]
pub struct RequestSpec {
    /// HTTP method
    pub method: Method,
    /// Target URL, without the query parameters from [`params`](Self::params)
    pub url: Url,
    /// Query parameters appended to the URL on execution
    pub params: Vec<(String, String)>,
    /// Additional request headers
    pub headers: HeaderMap,
    /// Optional request body
    pub body: Option<String>,
}

impl RequestSpec {
    /// Create a GET spec for the given URL
    #[must_use]
    pub fn get(url: Url) -> Self {
        Self {
            method: Method::GET,
            url,
            params: Vec::new(),
            headers: HeaderMap::new(),
            body: None,
        }
    }

    /// Create a POST spec for the given URL with a body
    #[must_use]
    pub fn post(url: Url, body: impl Into<String>) -> Self {
        Self {
            method: Method::POST,
            url,
            params: Vec::new(),
            headers: HeaderMap::new(),
            body: Some(body.into()),
        }
    }

    /// Append a single query parameter
    #[must_use]
    pub fn with_param(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.push((name.into(), value.into()));
        self
    }

    /// Append multiple query parameters
    #[must_use]
    pub fn with_params<I, K, V>(mut self, params: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.params
            .extend(params.into_iter().map(|(k, v)| (k.into(), v.into())));
        self
    }

    /// Replace the request headers
    #[must_use]
    pub fn with_headers(mut self, headers: HeaderMap) -> Self {
        self.headers = headers;
        self
    }

    /// The host this request counts against for rate limiting
    ///
    /// # Errors
    ///
    /// Returns [`ErrorKind::InvalidUrlHost`](crate::ErrorKind::InvalidUrlHost)
    /// if the URL has no host component.
    pub fn host_key(&self) -> Result<HostKey> {
        HostKey::try_from(&self.url)
    }

    /// The full URL including the encoded query parameters.
    ///
    /// Also serves as the cache key for response caching.
    #[must_use]
    pub fn full_url(&self) -> Url {
        if self.params.is_empty() {
            return self.url.clone();
        }
        let mut url = self.url.clone();
        url.query_pairs_mut().extend_pairs(self.params.iter());
        url
    }
}
