//! Session token store.
//!
//! The session lives entirely in two HTTP-only cookies: a short-lived access
//! token and a longer-lived refresh token, both scoped to `/`. The portal
//! keeps no server-side session record.
//!
//! Cookies are only ever written through [`apply_session_result`] and
//! [`clear_session`], so a successful exchange and the cookie update always
//! leave the handler in the same response.

use axum::http::StatusCode;
use axum_extra::extract::CookieJar;
use axum_extra::extract::cookie::{Cookie, SameSite};
use secrecy::{ExposeSecret, SecretString};
use serde_json::Value;
use time::Duration;

/// Cookie holding the access token.
pub const ACCESS_TOKEN_COOKIE: &str = "warizmy_access_token";

/// Cookie holding the refresh token.
pub const REFRESH_TOKEN_COOKIE: &str = "warizmy_refresh_token";

/// Access token cookie lifetime (30 minutes, matches the backend's token expiry).
const ACCESS_TOKEN_MAX_AGE_MINUTES: i64 = 30;

/// Refresh token cookie lifetime (7 days).
const REFRESH_TOKEN_MAX_AGE_DAYS: i64 = 7;

/// Cookie attributes that depend on deployment.
#[derive(Debug, Clone, Copy, Default)]
pub struct CookieSettings {
    /// Set the `Secure` attribute (portal served over https).
    pub secure: bool,
}

/// Read a single token cookie. Empty values count as absent.
#[must_use]
pub fn read_token(jar: &CookieJar, name: &str) -> Option<SecretString> {
    jar.get(name)
        .map(Cookie::value)
        .filter(|value| !value.is_empty())
        .map(|value| SecretString::from(value.to_owned()))
}

/// Returns true if a non-empty access token cookie is present.
#[must_use]
pub fn has_access_token(jar: &CookieJar) -> bool {
    read_token(jar, ACCESS_TOKEN_COOKIE).is_some()
}

/// Tokens issued by a successful login or refresh.
#[derive(Debug)]
pub struct IssuedTokens {
    pub access: SecretString,
    /// The backend may keep the old refresh token valid and omit a new one.
    pub refresh: Option<SecretString>,
}

impl IssuedTokens {
    /// Extract tokens from a backend response body.
    ///
    /// Returns `None` unless the body carries a non-empty `access_token`.
    #[must_use]
    pub fn from_body(body: &Value) -> Option<Self> {
        let token = |key: &str| {
            body.get(key)
                .and_then(Value::as_str)
                .filter(|value| !value.is_empty())
                .map(|value| SecretString::from(value.to_owned()))
        };

        Some(Self {
            access: token("access_token")?,
            refresh: token("refresh_token"),
        })
    }
}

/// Write the outcome of a credential exchange into the cookie jar.
///
/// Only successful responses that carry an access token change the jar.
/// The refresh cookie is replaced only when the backend issued a new one.
#[must_use]
pub fn apply_session_result(
    jar: CookieJar,
    status: StatusCode,
    body: &Value,
    settings: CookieSettings,
) -> CookieJar {
    if !status.is_success() {
        return jar;
    }

    let Some(tokens) = IssuedTokens::from_body(body) else {
        tracing::warn!(%status, "Successful exchange returned no access token");
        return jar;
    };

    let mut jar = jar.add(token_cookie(
        ACCESS_TOKEN_COOKIE,
        &tokens.access,
        Duration::minutes(ACCESS_TOKEN_MAX_AGE_MINUTES),
        settings,
    ));

    if let Some(refresh) = &tokens.refresh {
        jar = jar.add(token_cookie(
            REFRESH_TOKEN_COOKIE,
            refresh,
            Duration::days(REFRESH_TOKEN_MAX_AGE_DAYS),
            settings,
        ));
    }

    jar
}

/// Expire both session cookies (logout).
#[must_use]
pub fn clear_session(jar: CookieJar, settings: CookieSettings) -> CookieJar {
    jar.add(removal_cookie(ACCESS_TOKEN_COOKIE, settings))
        .add(removal_cookie(REFRESH_TOKEN_COOKIE, settings))
}

fn token_cookie(
    name: &'static str,
    token: &SecretString,
    max_age: Duration,
    settings: CookieSettings,
) -> Cookie<'static> {
    Cookie::build((name, token.expose_secret().to_owned()))
        .http_only(true)
        .secure(settings.secure)
        .same_site(SameSite::Lax)
        .path("/")
        .max_age(max_age)
        .build()
}

fn removal_cookie(name: &'static str, settings: CookieSettings) -> Cookie<'static> {
    Cookie::build((name, ""))
        .http_only(true)
        .secure(settings.secure)
        .same_site(SameSite::Lax)
        .path("/")
        .max_age(Duration::ZERO)
        .build()
}
