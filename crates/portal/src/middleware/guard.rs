//! Route guard evaluated before every page and API handler.
//!
//! The guard only checks whether an access token cookie is *present*. It does
//! not verify the token; an expired token passes here and is rejected by the
//! backend on first use. Protected classes:
//!
//! ```text
//! /dashboard, /lehrer/dashboard, /onboarding   protected page -> redirect to /login?next=...
//! /admin                                       protected page -> redirect to /login?next=...
//! /api/admin                                   protected API  -> 401 {"detail": "Not authenticated"}
//! everything else                              public
//! ```

use axum::{
    extract::{Request, State},
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};
use axum_extra::extract::CookieJar;

use crate::error::{NOT_AUTHENTICATED, detail_response};
use crate::session::has_access_token;
use crate::state::AppState;

/// Protection level of a request path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteClass {
    /// No token required.
    Public,
    /// Browser navigation; missing token redirects to the login page.
    ProtectedPage,
    /// Programmatic access; missing token is a JSON 401.
    ProtectedApi,
}

/// What the guard decided for a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GuardOutcome {
    /// Hand the request to the router unchanged.
    Pass,
    /// Send the browser to the login page.
    RedirectToLogin { location: String },
    /// Reject with `401 {"detail": "Not authenticated"}`.
    Unauthorized,
}

impl IntoResponse for GuardOutcome {
    fn into_response(self) -> Response {
        match self {
            Self::RedirectToLogin { location } => Redirect::temporary(&location).into_response(),
            Self::Unauthorized => detail_response(StatusCode::UNAUTHORIZED, NOT_AUTHENTICATED),
            // Never rendered; the middleware forwards instead.
            Self::Pass => StatusCode::NO_CONTENT.into_response(),
        }
    }
}

/// Static path-prefix rules for the guard.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GuardRules {
    /// Roots of protected page areas.
    pub page_roots: Vec<String>,
    /// Roots of protected API areas.
    pub api_roots: Vec<String>,
    /// Path of the login page.
    pub login_path: String,
}

impl Default for GuardRules {
    fn default() -> Self {
        Self {
            page_roots: vec![
                "/dashboard".to_string(),
                "/lehrer/dashboard".to_string(),
                "/onboarding".to_string(),
                "/admin".to_string(),
            ],
            api_roots: vec!["/api/admin".to_string()],
            login_path: "/login".to_string(),
        }
    }
}

impl GuardRules {
    /// Classify a request path.
    ///
    /// Each root is an independent prefix test; an API match wins over a
    /// page match.
    #[must_use]
    pub fn classify(&self, path: &str) -> RouteClass {
        if self.api_roots.iter().any(|root| is_under(path, root)) {
            RouteClass::ProtectedApi
        } else if self.page_roots.iter().any(|root| is_under(path, root)) {
            RouteClass::ProtectedPage
        } else {
            RouteClass::Public
        }
    }

    /// Decide what happens to a request.
    #[must_use]
    pub fn evaluate(&self, path: &str, query: Option<&str>, has_access_token: bool) -> GuardOutcome {
        if has_access_token {
            return GuardOutcome::Pass;
        }

        match self.classify(path) {
            RouteClass::Public => GuardOutcome::Pass,
            RouteClass::ProtectedApi => GuardOutcome::Unauthorized,
            RouteClass::ProtectedPage => GuardOutcome::RedirectToLogin {
                location: self.login_redirect(path, query),
            },
        }
    }

    /// Login URL carrying the original path and query as `next`.
    #[must_use]
    pub fn login_redirect(&self, path: &str, query: Option<&str>) -> String {
        let next = match query {
            Some(q) if !q.is_empty() => format!("{path}?{q}"),
            _ => path.to_string(),
        };
        format!("{}?next={}", self.login_path, urlencoding::encode(&next))
    }
}

/// `path` equals `root` or lies below it (`/admin` matches `/admin/kurse`
/// but not `/administration`).
fn is_under(path: &str, root: &str) -> bool {
    path.strip_prefix(root)
        .is_some_and(|rest| rest.is_empty() || rest.starts_with('/'))
}

/// Middleware applying the guard to every request.
pub async fn route_guard_middleware(
    State(state): State<AppState>,
    jar: CookieJar,
    request: Request,
    next: Next,
) -> Response {
    let uri = request.uri();
    let outcome = state
        .guard()
        .evaluate(uri.path(), uri.query(), has_access_token(&jar));

    match outcome {
        GuardOutcome::Pass => next.run(request).await,
        rejected => {
            tracing::info!(path = %request.uri().path(), outcome = ?rejected, "Route guard rejected request");
            rejected.into_response()
        }
    }
}
