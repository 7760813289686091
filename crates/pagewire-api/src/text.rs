// Plain-text HTTP client
//
// Fetches a remote resource as a UTF-8 string. Remote data sources split
// the body themselves; this module only deals with transport mechanics.

use secrecy::{ExposeSecret, SecretString};
use tracing::debug;
use url::Url;

use crate::error::Error;
use crate::transport::TransportConfig;

/// HTTP client returning response bodies as text.
///
/// Cheap to clone: the inner `reqwest::Client` is reference counted, so
/// every source built from one context shares a connection pool.
#[derive(Debug, Clone)]
pub struct TextClient {
    http: reqwest::Client,
    timeout_secs: u64,
}

impl TextClient {
    /// Create a client from a `TransportConfig`.
    pub fn new(transport: &TransportConfig) -> Result<Self, Error> {
        Ok(Self {
            http: transport.build_client()?,
            timeout_secs: transport.timeout_secs(),
        })
    }

    /// Wrap an already-built `reqwest::Client` (tests, custom middleware).
    pub fn with_client(http: reqwest::Client) -> Self {
        Self {
            http,
            timeout_secs: 0,
        }
    }

    /// GET `url` and return the body as a string.
    ///
    /// Non-success statuses become [`Error::Status`]; timeouts become
    /// [`Error::Timeout`] carrying the configured limit.
    pub async fn fetch(&self, url: &Url, token: Option<&SecretString>) -> Result<String, Error> {
        debug!("GET {}", url);

        let mut request = self.http.get(url.clone());
        if let Some(token) = token {
            request = request.bearer_auth(token.expose_secret());
        }

        let resp = request.send().await.map_err(|e| self.classify(e))?;

        let status = resp.status();
        if !status.is_success() {
            return Err(Error::Status {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }

        let bytes = resp.bytes().await.map_err(|e| self.classify(e))?;
        String::from_utf8(bytes.to_vec()).map_err(|e| Error::Body {
            url: url.to_string(),
            message: e.to_string(),
        })
    }

    fn classify(&self, err: reqwest::Error) -> Error {
        if err.is_timeout() {
            Error::Timeout {
                timeout_secs: self.timeout_secs,
            }
        } else {
            Error::Transport(err)
        }
    }
}
