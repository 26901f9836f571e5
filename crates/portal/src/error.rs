//! Unified error handling with Sentry integration.
//!
//! Every error leaves the portal as a JSON body of the form
//! `{"detail": "..."}`, which is the shape the browser client branches on.
//! Server-side faults are captured to Sentry before responding.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;
use warizmy_core::IdentityRecord;

use crate::upstream::UpstreamError;

/// Detail message for requests without an access token.
pub const NOT_AUTHENTICATED: &str = "Not authenticated";

/// Detail message for refresh requests without a refresh token.
pub const NO_REFRESH_TOKEN: &str = "No refresh token";

/// Application-level error type for the portal.
#[derive(Debug, Error)]
pub enum AppError {
    /// The backend could not be reached or its response could not be read.
    ///
    /// `context` is the generic message shown to the client.
    #[error("{context}: {source}")]
    Upstream {
        context: &'static str,
        #[source]
        source: UpstreamError,
    },

    /// A required session cookie is missing.
    #[error("Unauthorized: {0}")]
    Unauthorized(&'static str),

    /// The request could not be processed locally.
    ///
    /// `context` is the generic message shown to the client; `reason` is
    /// only logged.
    #[error("{context}: {reason}")]
    Internal {
        context: &'static str,
        reason: String,
    },
}

impl AppError {
    /// Wrap an upstream failure with the message the client should see.
    #[must_use]
    pub const fn upstream(context: &'static str, source: UpstreamError) -> Self {
        Self::Upstream { context, source }
    }

    /// A local processing failure reported to the client as `context`.
    pub fn internal(context: &'static str, reason: impl ToString) -> Self {
        Self::Internal {
            context,
            reason: reason.to_string(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        // Capture server errors to Sentry
        if matches!(self, Self::Upstream { .. } | Self::Internal { .. }) {
            let event_id = sentry::capture_error(&self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Request error"
            );
        }

        let status = match &self {
            Self::Upstream { .. } | Self::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
        };

        // Don't expose internal error details to clients
        let message = match self {
            Self::Upstream { context, .. } | Self::Internal { context, .. } => context,
            Self::Unauthorized(detail) => detail,
        };

        detail_response(status, message)
    }
}

/// Result type alias for `AppError`.
pub type Result<T> = std::result::Result<T, AppError>;

/// Build a `{"detail": message}` JSON response.
pub fn detail_response(status: StatusCode, message: impl Into<String>) -> Response {
    (status, Json(json!({ "detail": message.into() }))).into_response()
}

/// Set the Sentry user context from the backend's identity record.
///
/// Call this after a successful identity lookup to associate errors with users.
pub fn set_sentry_user(user: &IdentityRecord) {
    sentry::configure_scope(|scope| {
        scope.set_user(Some(sentry::User {
            id: Some(user.id.to_string()),
            email: Some(user.email.clone()),
            username: Some(user.full_name()),
            ..Default::default()
        }));
        scope.set_tag("user.role", user.role.as_str());
    });
}

/// Clear the Sentry user context.
///
/// Call this on logout to stop associating errors with the user.
pub fn clear_sentry_user() {
    sentry::configure_scope(|scope| {
        scope.set_user(None);
    });
}

/// Add a breadcrumb for session events.
///
/// # Example
///
/// ```rust,ignore
/// add_breadcrumb("auth", "Login rejected", Some(&[("status", "401")]));
/// ```
pub fn add_breadcrumb(category: &str, message: &str, data: Option<&[(&str, &str)]>) {
    let mut breadcrumb = sentry::Breadcrumb {
        category: Some(category.to_string()),
        message: Some(message.to_string()),
        level: sentry::Level::Info,
        ..Default::default()
    };

    if let Some(pairs) = data {
        for (key, value) in pairs {
            breadcrumb.data.insert(
                (*key).to_string(),
                serde_json::Value::String((*value).to_string()),
            );
        }
    }

    sentry::add_breadcrumb(breadcrumb);
}
