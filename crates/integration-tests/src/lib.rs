//! Integration test harness for the Warizmy portal.
//!
//! Runs the real portal router against an in-process stub of the backend
//! identity service. The stub binds `127.0.0.1:0`, records every request it
//! receives, and answers with scripted responses, so tests can assert both
//! what the browser sees and what reached the backend.
//!
//! # Example
//!
//! ```rust,ignore
//! let portal = TestPortal::start().await;
//! portal.upstream.respond_json("/api/auth/me", StatusCode::OK, &json!({ "id": "1" }));
//!
//! let response = portal.send(get("/api/auth/me").cookie("warizmy_access_token=abc")).await;
//! assert_eq!(response.status, StatusCode::OK);
//! assert_eq!(portal.upstream.requests_to("/api/auth/me").len(), 1);
//! ```

#![cfg_attr(not(test), forbid(unsafe_code))]
#![allow(clippy::missing_panics_doc)]

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use axum::{
    Router,
    body::{Body, Bytes, to_bytes},
    extract::State,
    http::{
        HeaderMap, Method, Request, StatusCode, Uri,
        header::{CONTENT_TYPE, COOKIE, SET_COOKIE},
    },
    response::{IntoResponse, Response},
};
use serde_json::Value;
use tower::ServiceExt;
use warizmy_core::ApiBaseUrl;
use warizmy_portal::{
    config::{PortalConfig, UpstreamConfig},
    routes,
    state::AppState,
};

// =============================================================================
// Stub Upstream
// =============================================================================

/// A request as received by the stub backend.
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub method: Method,
    pub path: String,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl RecordedRequest {
    /// Header value as a string, if present and valid UTF-8.
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// Body decoded as UTF-8 (lossy).
    #[must_use]
    pub fn body_text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

#[derive(Debug, Clone)]
struct ScriptedResponse {
    status: StatusCode,
    content_type: &'static str,
    body: String,
    delay: Duration,
}

#[derive(Debug, Default)]
struct StubState {
    responses: HashMap<String, ScriptedResponse>,
    requests: Vec<RecordedRequest>,
}

/// In-process stand-in for the backend identity service.
///
/// Unscripted paths answer `404 {"detail":"Not Found"}`.
#[derive(Debug, Clone)]
pub struct StubUpstream {
    addr: SocketAddr,
    state: Arc<Mutex<StubState>>,
}

impl StubUpstream {
    /// Bind to an ephemeral port and start serving.
    pub async fn start() -> Self {
        let state = Arc::new(Mutex::new(StubState::default()));
        let app = Router::new()
            .fallback(record_and_respond)
            .with_state(Arc::clone(&state));

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind stub upstream");
        let addr = listener
            .local_addr()
            .expect("Stub upstream has no local address");

        tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });

        Self { addr, state }
    }

    /// Root URL of the stub (without the `/api` suffix).
    #[must_use]
    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// Script a JSON response for a path.
    pub fn respond_json(&self, path: &str, status: StatusCode, body: &Value) {
        self.script(path, status, "application/json", body.to_string(), Duration::ZERO);
    }

    /// Script a plain-text (non-JSON) response for a path.
    pub fn respond_text(&self, path: &str, status: StatusCode, body: &str) {
        self.script(path, status, "text/plain", body.to_string(), Duration::ZERO);
    }

    /// Script a JSON response that is only sent after `delay`.
    pub fn respond_json_after(
        &self,
        path: &str,
        delay: Duration,
        status: StatusCode,
        body: &Value,
    ) {
        self.script(path, status, "application/json", body.to_string(), delay);
    }

    /// All requests received so far, in arrival order.
    #[must_use]
    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.lock().requests.clone()
    }

    /// Requests received for one path.
    #[must_use]
    pub fn requests_to(&self, path: &str) -> Vec<RecordedRequest> {
        self.requests()
            .into_iter()
            .filter(|r| r.path == path)
            .collect()
    }

    fn script(
        &self,
        path: &str,
        status: StatusCode,
        content_type: &'static str,
        body: String,
        delay: Duration,
    ) {
        self.lock().responses.insert(
            path.to_string(),
            ScriptedResponse {
                status,
                content_type,
                body,
                delay,
            },
        );
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, StubState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

async fn record_and_respond(
    State(state): State<Arc<Mutex<StubState>>>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let scripted = {
        let mut stub = state.lock().unwrap_or_else(PoisonError::into_inner);
        stub.requests.push(RecordedRequest {
            method,
            path: uri.path().to_string(),
            headers,
            body,
        });
        stub.responses.get(uri.path()).cloned()
    };

    match scripted {
        Some(scripted) => {
            if !scripted.delay.is_zero() {
                tokio::time::sleep(scripted.delay).await;
            }
            (
                scripted.status,
                [(CONTENT_TYPE, scripted.content_type)],
                scripted.body,
            )
                .into_response()
        }
        None => (
            StatusCode::NOT_FOUND,
            [(CONTENT_TYPE, "application/json")],
            r#"{"detail":"Not Found"}"#,
        )
            .into_response(),
    }
}

// =============================================================================
// Portal Under Test
// =============================================================================

/// The portal router wired to a fresh [`StubUpstream`].
pub struct TestPortal {
    pub upstream: StubUpstream,
    router: Router,
}

impl TestPortal {
    /// Start a stub backend and build the portal against it.
    pub async fn start() -> Self {
        let upstream = StubUpstream::start().await;
        let router = portal_router(&upstream.url(), "http://localhost:3000");
        Self { upstream, router }
    }

    /// Same as [`TestPortal::start`] with a custom backend timeout.
    pub async fn start_with_timeout(timeout: Duration) -> Self {
        let upstream = StubUpstream::start().await;
        let router = build_router(&upstream.url(), "http://localhost:3000", timeout);
        Self { upstream, router }
    }

    /// Same as [`TestPortal::start`] with the portal served over https, so
    /// session cookies carry `Secure`.
    pub async fn start_https() -> Self {
        let upstream = StubUpstream::start().await;
        let router = portal_router(&upstream.url(), "https://portal.warizmyacademy.de");
        Self { upstream, router }
    }

    /// Send one request through the full middleware stack.
    pub async fn send(&self, request: Request<Body>) -> TestResponse {
        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("Router is infallible");
        TestResponse::read(response).await
    }
}

/// Build a portal router for an arbitrary backend URL.
#[must_use]
pub fn portal_router(upstream_url: &str, portal_url: &str) -> Router {
    build_router(upstream_url, portal_url, DEFAULT_TIMEOUT)
}

/// Backend timeout used unless a test asks for another.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(2);

fn build_router(upstream_url: &str, portal_url: &str, timeout: Duration) -> Router {
    let config = PortalConfig {
        base_url: portal_url.to_string(),
        upstream: UpstreamConfig {
            base_url: ApiBaseUrl::parse(upstream_url).expect("Invalid upstream URL"),
            timeout,
        },
        ..PortalConfig::default()
    };
    routes::app(AppState::new(config).expect("Failed to build application state"))
}

/// A fully buffered portal response.
#[derive(Debug)]
pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl TestResponse {
    async fn read(response: Response) -> Self {
        let (parts, body) = response.into_parts();
        let body = to_bytes(body, usize::MAX)
            .await
            .expect("Failed to read response body");
        Self {
            status: parts.status,
            headers: parts.headers,
            body,
        }
    }

    /// Body parsed as JSON.
    #[must_use]
    pub fn json(&self) -> Value {
        serde_json::from_slice(&self.body).expect("Response body is not JSON")
    }

    /// Header value as a string.
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// All `Set-Cookie` header values.
    #[must_use]
    pub fn set_cookies(&self) -> Vec<String> {
        self.headers
            .get_all(SET_COOKIE)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .map(str::to_string)
            .collect()
    }

    /// The `Set-Cookie` header for one cookie name.
    #[must_use]
    pub fn set_cookie(&self, name: &str) -> Option<String> {
        let prefix = format!("{name}=");
        self.set_cookies()
            .into_iter()
            .find(|c| c.starts_with(&prefix))
    }
}

// =============================================================================
// Request Builders
// =============================================================================

/// `GET` request, optionally carrying a `Cookie` header.
#[must_use]
pub fn get(uri: &str, cookie: Option<&str>) -> Request<Body> {
    build(Method::GET, uri, cookie, None, Body::empty())
}

/// `POST` request with a raw body sent as `application/json`.
#[must_use]
pub fn post_json(uri: &str, cookie: Option<&str>, body: &str) -> Request<Body> {
    build(
        Method::POST,
        uri,
        cookie,
        Some("application/json"),
        Body::from(body.to_string()),
    )
}

fn build(
    method: Method,
    uri: &str,
    cookie: Option<&str>,
    content_type: Option<&str>,
    body: Body,
) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(cookie) = cookie {
        builder = builder.header(COOKIE, cookie);
    }
    if let Some(content_type) = content_type {
        builder = builder.header(CONTENT_TYPE, content_type);
    }
    builder.body(body).expect("Invalid test request")
}
