use serde::Deserialize;
use std::fmt;
use url::Url;

use crate::types::{ErrorKind, Result};

/// The key a request is rate-limited under: the URL's network authority.
///
/// The authority is the lowercased host plus the port when the URL names one
/// explicitly, so `localhost:8080` and `localhost:9090` are throttled
/// independently while `https://rest.kegg.jp/` and `HTTPS://REST.KEGG.JP/`
/// collapse to the same key. Ports that the URL parser already normalized
/// away (the scheme default, e.g. 443 for `https`) do not appear in the key.
///
/// # Examples
///
/// ```
/// use biodbs_fetch::ratelimit::HostKey;
/// use url::Url;
///
/// let url = Url::parse("http://localhost:3000/api/search").unwrap();
/// assert_eq!(HostKey::try_from(&url).unwrap().as_str(), "localhost:3000");
///
/// let url = Url::parse("https://rest.kegg.jp/list/pathway").unwrap();
/// assert_eq!(HostKey::try_from(&url).unwrap().as_str(), "rest.kegg.jp");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Deserialize)]
#[serde(transparent)]
pub struct HostKey(String);

impl HostKey {
    /// The authority as a string slice
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consume the key, yielding the authority
    #[must_use]
    pub fn into_string(self) -> String {
        self.0
    }
}

impl TryFrom<&Url> for HostKey {
    type Error = ErrorKind;

    /// Fails with [`ErrorKind::InvalidUrlHost`] for URLs without a host
    /// (e.g. `file:` or `mailto:` URLs), which cannot be rate-limited.
    fn try_from(url: &Url) -> Result<Self> {
        let host = url.host_str().ok_or(ErrorKind::InvalidUrlHost)?;
        let mut authority = host.to_lowercase();
        if let Some(port) = url.port() {
            authority.push(':');
            authority.push_str(&port.to_string());
        }
        Ok(HostKey(authority))
    }
}

impl TryFrom<Url> for HostKey {
    type Error = ErrorKind;

    fn try_from(url: Url) -> Result<Self> {
        HostKey::try_from(&url)
    }
}

impl From<String> for HostKey {
    fn from(authority: String) -> Self {
        HostKey(authority.to_lowercase())
    }
}

impl From<&str> for HostKey {
    fn from(authority: &str) -> Self {
        HostKey(authority.to_lowercase())
    }
}

impl fmt::Display for HostKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
