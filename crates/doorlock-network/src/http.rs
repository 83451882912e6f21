//! HTTP client for the remote authority.
//!
//! # Endpoints
//!
//! | Operation | Request | Auth |
//! |-----------|---------|------|
//! | change marker | `GET {base}/stats/` | none |
//! | directory | `GET {base}/door/` | `Authorization: Bearer <key>` |
//! | seen | `POST {base}/door/{card}/seen/` | none |
//!
//! The status response is a JSON object; only its `last_card_change` field is
//! read. The directory response is a JSON object mapping card number to
//! holder name.
//!
//! # Timeout Handling
//!
//! The marker and directory requests use the configured request timeout
//! (default: 5000ms). The seen notification uses its own, shorter timeout
//! (default: 2000ms). Nothing is retried here; the caller's schedule is the
//! retry policy.

use std::fmt;
use std::time::Duration;

use doorlock_core::constants::{
    CHANGE_MARKER_FIELD, DEFAULT_AUTHORITY_URL, DEFAULT_REQUEST_TIMEOUT_MS,
    DEFAULT_SEEN_TIMEOUT_MS,
};
use doorlock_core::{CardDirectory, CardId, ChangeMarker};
use reqwest::{Client, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, trace};

use crate::authority::Authority;
use crate::error::{AuthorityError, AuthorityResult, Endpoint};

/// Configuration for the HTTP authority client
///
/// # Example
///
/// ```
/// use doorlock_network::AuthorityConfig;
/// use std::time::Duration;
///
/// let config = AuthorityConfig {
///     base_url: "https://api.example.org".to_string(),
///     api_key: "secret".to_string(),
///     ..AuthorityConfig::default()
/// };
/// assert_eq!(config.request_timeout, Duration::from_millis(5000));
/// ```
#[derive(Clone)]
pub struct AuthorityConfig {
    /// Base URL, without the endpoint paths
    pub base_url: String,

    /// Bearer key for the directory endpoint
    pub api_key: String,

    /// Timeout for the marker and directory requests
    pub request_timeout: Duration,

    /// Timeout for the seen notification
    pub seen_timeout: Duration,
}

impl Default for AuthorityConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_AUTHORITY_URL.to_string(),
            api_key: String::new(),
            request_timeout: Duration::from_millis(DEFAULT_REQUEST_TIMEOUT_MS),
            seen_timeout: Duration::from_millis(DEFAULT_SEEN_TIMEOUT_MS),
        }
    }
}

impl fmt::Debug for AuthorityConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthorityConfig")
            .field("base_url", &self.base_url)
            .field("api_key", &"<redacted>")
            .field("request_timeout", &self.request_timeout)
            .field("seen_timeout", &self.seen_timeout)
            .finish()
    }
}

/// Remote authority reached over HTTPS.
///
/// Cloning is cheap; clones share the underlying connection pool.
#[derive(Clone)]
pub struct HttpAuthority {
    client: Client,
    base_url: String,
    api_key: String,
    request_timeout: Duration,
    seen_timeout: Duration,
}

impl HttpAuthority {
    /// Build a client from `config`.
    ///
    /// # Errors
    ///
    /// Returns [`AuthorityError::Client`] if the TLS backend cannot be
    /// initialized.
    pub fn new(config: AuthorityConfig) -> AuthorityResult<Self> {
        let client = Client::builder()
            .timeout(config.request_timeout)
            .user_agent(concat!("doorlock/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(AuthorityError::Client)?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key,
            request_timeout: config.request_timeout,
            seen_timeout: config.seen_timeout,
        })
    }

    /// Base URL requests are sent to.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{path}", self.base_url)
    }

    async fn send(
        &self,
        endpoint: Endpoint,
        request: RequestBuilder,
        timeout: Duration,
    ) -> AuthorityResult<Response> {
        let response = request
            .send()
            .await
            .map_err(|source| transport_error(endpoint, timeout, source))?;

        let status = response.status();
        if !status.is_success() {
            return Err(AuthorityError::Status {
                endpoint,
                status: status.as_u16(),
            });
        }

        trace!(%endpoint, status = status.as_u16(), "Authority responded");
        Ok(response)
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        endpoint: Endpoint,
        request: RequestBuilder,
    ) -> AuthorityResult<T> {
        let timeout = self.request_timeout;
        let response = self.send(endpoint, request, timeout).await?;
        let body = response
            .bytes()
            .await
            .map_err(|source| transport_error(endpoint, timeout, source))?;

        serde_json::from_slice(&body).map_err(|source| AuthorityError::Decode { endpoint, source })
    }
}

impl fmt::Debug for HttpAuthority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpAuthority")
            .field("base_url", &self.base_url)
            .field("request_timeout", &self.request_timeout)
            .field("seen_timeout", &self.seen_timeout)
            .finish_non_exhaustive()
    }
}

impl Authority for HttpAuthority {
    async fn fetch_change_marker(&self) -> AuthorityResult<ChangeMarker> {
        let endpoint = Endpoint::Stats;
        let request = self.client.get(self.url("stats/"));
        let stats: Value = self.get_json(endpoint, request).await?;

        let marker = marker_from_stats(&stats).ok_or(AuthorityError::MissingField {
            endpoint,
            field: CHANGE_MARKER_FIELD,
        })?;

        debug!(marker = %marker, "Fetched change marker");
        Ok(marker)
    }

    async fn fetch_directory(&self) -> AuthorityResult<CardDirectory> {
        let request = self
            .client
            .get(self.url("door/"))
            .bearer_auth(&self.api_key);
        let directory: CardDirectory = self.get_json(Endpoint::Door, request).await?;

        debug!(
            cards = directory.len(),
            skipped = directory.skipped(),
            "Fetched card directory"
        );
        Ok(directory)
    }

    async fn mark_seen(&self, card: &CardId) -> AuthorityResult<()> {
        let request = self
            .client
            .post(self.url(&format!("door/{card}/seen/")))
            .timeout(self.seen_timeout);
        self.send(Endpoint::Seen, request, self.seen_timeout)
            .await?;

        trace!(card = %card, "Reported card as seen");
        Ok(())
    }
}

fn transport_error(endpoint: Endpoint, timeout: Duration, source: reqwest::Error) -> AuthorityError {
    if source.is_timeout() {
        AuthorityError::Timeout {
            endpoint,
            after: timeout,
        }
    } else {
        AuthorityError::Request { endpoint, source }
    }
}

/// Extract the change marker from a status response.
///
/// String markers are kept verbatim; any other JSON value is compared by
/// its JSON text, so `null` is a real marker distinct from "unknown".
fn marker_from_stats(stats: &Value) -> Option<ChangeMarker> {
    let value = stats.as_object()?.get(CHANGE_MARKER_FIELD)?;
    Some(match value {
        Value::String(marker) => ChangeMarker::new(marker.as_str()),
        other => ChangeMarker::new(other.to_string()),
    })
}
