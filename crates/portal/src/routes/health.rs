//! Health check endpoints.

use axum::{extract::State, http::StatusCode};

use crate::state::AppState;

/// Liveness health check endpoint.
///
/// Returns "ok" if the server is running. Does not check dependencies.
pub async fn health() -> &'static str {
    "ok"
}

/// Readiness health check endpoint.
///
/// Verifies the backend identity service answers its health probe.
/// Returns 503 Service Unavailable if it is unreachable or unhealthy.
pub async fn readiness(State(state): State<AppState>) -> StatusCode {
    match state.identity().health().await {
        Ok(status) if status.is_success() => StatusCode::OK,
        Ok(status) => {
            tracing::warn!(%status, "Backend health probe failed");
            StatusCode::SERVICE_UNAVAILABLE
        }
        Err(e) => {
            tracing::warn!(error = %e, "Backend unreachable");
            StatusCode::SERVICE_UNAVAILABLE
        }
    }
}
