//! Credential exchange handlers.
//!
//! Each handler relays one exchange to the backend identity service and
//! mirrors the backend's status code and JSON body to the browser. Token
//! cookies are written in the same response as a successful login or
//! refresh, and only ever through [`apply_session_result`].

use axum::{
    Json,
    body::Bytes,
    extract::State,
    http::header::CACHE_CONTROL,
    response::{IntoResponse, Response},
};
use axum_extra::extract::CookieJar;
use secrecy::SecretString;
use serde::Deserialize;
use serde_json::{Value, json};
use warizmy_core::IdentityRecord;

use crate::error::{
    AppError, NO_REFRESH_TOKEN, NOT_AUTHENTICATED, Result, add_breadcrumb, clear_sentry_user,
    set_sentry_user,
};
use crate::middleware::RequestId;
use crate::session::{
    ACCESS_TOKEN_COOKIE, REFRESH_TOKEN_COOKIE, apply_session_result, clear_session, read_token,
};
use crate::state::AppState;
use crate::upstream::UpstreamResponse;

const LOGIN_FAILED: &str = "Login failed";
const FETCH_USER_FAILED: &str = "Failed to fetch user";
const REFRESH_FAILED: &str = "Refresh failed";
const REGISTER_FAILED: &str = "Register failed";

// =============================================================================
// Request Types
// =============================================================================

/// Login request body.
///
/// Missing fields default to empty strings; the backend decides whether the
/// credentials are acceptable.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

impl LoginRequest {
    /// Parse a login body. Anything that is not a JSON object with string
    /// fields is treated as empty credentials.
    #[must_use]
    pub fn from_body(body: &[u8]) -> Self {
        let mut request: Self = serde_json::from_slice(body).unwrap_or_default();
        request.email = request.email.trim().to_string();
        request
    }
}

// =============================================================================
// Handlers
// =============================================================================

/// Exchange email and password for a token pair.
///
/// `POST /api/auth/login`
pub async fn login(
    State(state): State<AppState>,
    jar: CookieJar,
    request_id: RequestId,
    body: Bytes,
) -> Result<Response> {
    let LoginRequest { email, password } = LoginRequest::from_body(&body);
    let password = SecretString::from(password);

    let upstream = state
        .identity()
        .login(&email, &password, Some(&request_id))
        .await
        .map_err(|e| AppError::upstream(LOGIN_FAILED, e))?;

    if upstream.is_success() {
        tracing::info!(status = %upstream.status, "Login succeeded");
    } else {
        add_breadcrumb("auth", "Login rejected", Some(&[("status", upstream.status.as_str())]));
        tracing::info!(status = %upstream.status, "Login rejected by backend");
    }

    let jar = apply_session_result(jar, upstream.status, &upstream.body, state.cookie_settings());
    Ok((jar, relay(upstream)).into_response())
}

/// Return the identity behind the current access token.
///
/// `GET /api/auth/me`
///
/// Always asks the backend; nothing is cached on either side.
pub async fn me(
    State(state): State<AppState>,
    jar: CookieJar,
    request_id: RequestId,
) -> Result<Response> {
    let Some(access_token) = read_token(&jar, ACCESS_TOKEN_COOKIE) else {
        return Err(AppError::Unauthorized(NOT_AUTHENTICATED));
    };

    let upstream = state
        .identity()
        .me(&access_token, Some(&request_id))
        .await
        .map_err(|e| AppError::upstream(FETCH_USER_FAILED, e))?;

    if upstream.is_success() {
        if let Some(user) = identity_from(&upstream.body) {
            set_sentry_user(&user);
        }
    } else {
        tracing::debug!(status = %upstream.status, "Backend rejected access token");
    }

    Ok(([(CACHE_CONTROL, "no-store")], relay(upstream)).into_response())
}

/// Exchange the refresh token cookie for a new token pair.
///
/// `POST /api/auth/refresh`
pub async fn refresh(
    State(state): State<AppState>,
    jar: CookieJar,
    request_id: RequestId,
) -> Result<Response> {
    let Some(refresh_token) = read_token(&jar, REFRESH_TOKEN_COOKIE) else {
        return Err(AppError::Unauthorized(NO_REFRESH_TOKEN));
    };

    let upstream = state
        .identity()
        .refresh(&refresh_token, Some(&request_id))
        .await
        .map_err(|e| AppError::upstream(REFRESH_FAILED, e))?;

    if !upstream.is_success() {
        add_breadcrumb("auth", "Refresh rejected", Some(&[("status", upstream.status.as_str())]));
        tracing::info!(status = %upstream.status, "Refresh rejected by backend");
    }

    let jar = apply_session_result(jar, upstream.status, &upstream.body, state.cookie_settings());
    Ok((jar, relay(upstream)).into_response())
}

/// Create a new account.
///
/// `POST /api/auth/register`
///
/// The payload is forwarded as-is; field validation is the backend's job.
/// A body that is not JSON fails like a backend error, with a generic 500.
pub async fn register(
    State(state): State<AppState>,
    request_id: RequestId,
    body: Bytes,
) -> Result<Response> {
    let payload: Value = serde_json::from_slice(&body)
        .map_err(|e| AppError::internal(REGISTER_FAILED, e))?;

    let upstream = state
        .identity()
        .register(&payload, Some(&request_id))
        .await
        .map_err(|e| AppError::upstream(REGISTER_FAILED, e))?;

    tracing::info!(status = %upstream.status, "Registration relayed");
    Ok(relay(upstream))
}

/// Drop both session cookies.
///
/// `POST /api/auth/logout`
pub async fn logout(State(state): State<AppState>, jar: CookieJar) -> Response {
    clear_sentry_user();
    add_breadcrumb("auth", "Logged out", None);

    let jar = clear_session(jar, state.cookie_settings());
    (jar, Json(json!({ "detail": "Logged out" }))).into_response()
}

// =============================================================================
// Helpers
// =============================================================================

/// Mirror a backend response to the browser.
fn relay(upstream: UpstreamResponse) -> Response {
    (upstream.status, Json(upstream.body)).into_response()
}

fn identity_from(body: &Value) -> Option<IdentityRecord> {
    IdentityRecord::deserialize(body).ok()
}
