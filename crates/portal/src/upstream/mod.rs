//! Client for the backend identity service.
//!
//! Every call relays one credential exchange to a fixed backend endpoint and
//! hands back the status code and JSON body untouched, so the caller can
//! mirror them to the browser.
//!
//! # Endpoints
//!
//! ```text
//! POST {api}/auth/login      form-encoded username/password
//! GET  {api}/auth/me         bearer token, never cached
//! POST {api}/auth/refresh    raw JSON string body ("<token>")
//! POST {api}/auth/register   JSON profile payload
//! GET  {api}/health          readiness probe
//! ```
//!
//! # Example
//!
//! ```rust,ignore
//! use warizmy_portal::upstream::IdentityClient;
//!
//! let client = IdentityClient::new(&config.upstream)?;
//! let response = client.me(&access_token, None).await?;
//! println!("{} {}", response.status, response.body);
//! ```

mod body;

pub use body::{RawTextError, parse_upstream_body};

use std::sync::Arc;

use axum::http::{
    StatusCode,
    header::{CACHE_CONTROL, PRAGMA},
};
use secrecy::{ExposeSecret, SecretString};
use serde_json::Value;
use thiserror::Error;
use warizmy_core::ApiBaseUrl;

use crate::config::UpstreamConfig;
use crate::middleware::{REQUEST_ID_HEADER, RequestId};

/// Errors that can occur when talking to the backend.
#[derive(Debug, Error)]
pub enum UpstreamError {
    /// The call did not complete within the configured timeout.
    #[error("upstream request timed out")]
    Timeout,

    /// Connection, protocol, or body read failure.
    #[error("HTTP error: {0}")]
    Http(#[source] reqwest::Error),
}

impl From<reqwest::Error> for UpstreamError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout
        } else {
            Self::Http(err)
        }
    }
}

/// A backend response, ready to be relayed.
#[derive(Debug, Clone, PartialEq)]
pub struct UpstreamResponse {
    /// Status code exactly as returned by the backend.
    pub status: StatusCode,
    /// Parsed JSON body, or `{"detail": <raw text>}` if it was not JSON.
    pub body: Value,
}

impl UpstreamResponse {
    /// Returns true for 2xx responses.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }
}

/// Client for the backend identity service.
///
/// Cheap to clone; all clones share one connection pool.
#[derive(Clone)]
pub struct IdentityClient {
    inner: Arc<IdentityClientInner>,
}

struct IdentityClientInner {
    client: reqwest::Client,
    base_url: ApiBaseUrl,
}

impl IdentityClient {
    /// Create a new identity client.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built (e.g. TLS backend
    /// initialization fails).
    pub fn new(config: &UpstreamConfig) -> Result<Self, UpstreamError> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()?;

        Ok(Self {
            inner: Arc::new(IdentityClientInner {
                client,
                base_url: config.base_url.clone(),
            }),
        })
    }

    /// Get the normalized backend base URL.
    #[must_use]
    pub fn base_url(&self) -> &ApiBaseUrl {
        &self.inner.base_url
    }

    /// Exchange a username and password for a token pair.
    ///
    /// The backend implements the OAuth2 password grant, so the credentials
    /// are sent form-encoded as `username` and `password`.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend cannot be reached or times out.
    pub async fn login(
        &self,
        username: &str,
        password: &SecretString,
        request_id: Option<&RequestId>,
    ) -> Result<UpstreamResponse, UpstreamError> {
        let request = self
            .inner
            .client
            .post(self.inner.base_url.endpoint("auth/login"))
            .form(&[("username", username), ("password", password.expose_secret())]);

        self.send(request, request_id).await
    }

    /// Look up the identity behind an access token.
    ///
    /// Always hits the backend; caching is disabled on the request.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend cannot be reached or times out.
    pub async fn me(
        &self,
        access_token: &SecretString,
        request_id: Option<&RequestId>,
    ) -> Result<UpstreamResponse, UpstreamError> {
        let request = self
            .inner
            .client
            .get(self.inner.base_url.endpoint("auth/me"))
            .bearer_auth(access_token.expose_secret())
            .header(CACHE_CONTROL, "no-cache, no-store")
            .header(PRAGMA, "no-cache");

        self.send(request, request_id).await
    }

    /// Exchange a refresh token for a new token pair.
    ///
    /// The backend takes the token as a single unwrapped body parameter, so
    /// the body is the token serialized as a bare JSON string (`"abc"`), not
    /// an object.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend cannot be reached or times out.
    pub async fn refresh(
        &self,
        refresh_token: &SecretString,
        request_id: Option<&RequestId>,
    ) -> Result<UpstreamResponse, UpstreamError> {
        let request = self
            .inner
            .client
            .post(self.inner.base_url.endpoint("auth/refresh"))
            .json(refresh_token.expose_secret());

        self.send(request, request_id).await
    }

    /// Create a new account.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend cannot be reached or times out.
    pub async fn register(
        &self,
        payload: &Value,
        request_id: Option<&RequestId>,
    ) -> Result<UpstreamResponse, UpstreamError> {
        let request = self
            .inner
            .client
            .post(self.inner.base_url.endpoint("auth/register"))
            .json(payload);

        self.send(request, request_id).await
    }

    /// Probe the backend health endpoint.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend cannot be reached or times out.
    pub async fn health(&self) -> Result<StatusCode, UpstreamError> {
        let response = self
            .inner
            .client
            .get(self.inner.base_url.endpoint("health"))
            .send()
            .await?;
        Ok(response.status())
    }

    async fn send(
        &self,
        request: reqwest::RequestBuilder,
        request_id: Option<&RequestId>,
    ) -> Result<UpstreamResponse, UpstreamError> {
        let request = match request_id {
            Some(id) => request.header(REQUEST_ID_HEADER, id.as_str()),
            None => request,
        };

        let response = request.send().await?;
        let status = response.status();
        let url = response.url().path().to_string();
        let text = response.text().await?;

        let body = match parse_upstream_body(&text) {
            Ok(body) => body,
            Err(raw) => {
                tracing::warn!(%status, path = %url, bytes = raw.text.len(), "Upstream returned non-JSON body");
                raw.into_detail()
            }
        };

        tracing::debug!(%status, path = %url, "Upstream responded");
        Ok(UpstreamResponse { status, body })
    }
}

impl std::fmt::Debug for IdentityClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IdentityClient")
            .field("base_url", &self.inner.base_url)
            .finish_non_exhaustive()
    }
}
