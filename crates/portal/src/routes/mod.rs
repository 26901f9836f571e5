//! HTTP route handlers for the portal.
//!
//! # Route Structure
//!
//! ```text
//! GET  /health                 - Liveness check
//! GET  /health/ready           - Readiness check (backend reachable)
//!
//! # Session
//! POST /api/auth/login         - Exchange credentials, set token cookies
//! GET  /api/auth/me            - Current identity (never cached)
//! POST /api/auth/refresh       - Exchange refresh cookie, replace token cookies
//! POST /api/auth/register      - Create account
//! POST /api/auth/logout        - Clear token cookies
//! ```
//!
//! Every route, including the fallback, runs behind the route guard.

pub mod auth;
pub mod health;

use axum::{
    Router,
    http::{Request, StatusCode},
    middleware,
    response::Response,
    routing::{get, post},
};
use tower_http::trace::TraceLayer;

use crate::error::detail_response;
use crate::middleware::{request_id_middleware, route_guard_middleware};
use crate::state::AppState;

/// Create the session routes router.
pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/login", post(auth::login))
        .route("/me", get(auth::me))
        .route("/refresh", post(auth::refresh))
        .route("/register", post(auth::register))
        .route("/logout", post(auth::logout))
}

/// Create all routes for the portal.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(health::health))
        .route("/health/ready", get(health::readiness))
        .nest("/api/auth", auth_routes())
        .fallback(not_found)
}

/// Build the portal application with its middleware stack.
///
/// Sentry layers are added by the binary so tests can run without a
/// Sentry hub.
pub fn app(state: AppState) -> Router {
    routes()
        .layer(middleware::from_fn_with_state(
            state.clone(),
            route_guard_middleware,
        ))
        .layer(middleware::from_fn(request_id_middleware))
        .layer(
            TraceLayer::new_for_http().make_span_with(|request: &Request<_>| {
                tracing::info_span!(
                    "http_request",
                    method = %request.method(),
                    path = %request.uri().path(),
                    request_id = tracing::field::Empty,
                )
            }),
        )
        .with_state(state)
}

async fn not_found() -> Response {
    detail_response(StatusCode::NOT_FOUND, "Not Found")
}
