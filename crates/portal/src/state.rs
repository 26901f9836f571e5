//! Application state shared across handlers.

use std::sync::Arc;

use crate::config::PortalConfig;
use crate::middleware::GuardRules;
use crate::session::CookieSettings;
use crate::upstream::{IdentityClient, UpstreamError};

/// Application state shared across all handlers.
///
/// Cheaply cloneable via `Arc`. The portal holds no per-user state; the
/// session lives in the browser's cookies.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: PortalConfig,
    identity: IdentityClient,
    guard: GuardRules,
}

impl AppState {
    /// Create a new application state with the default guard rules.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend HTTP client cannot be built.
    pub fn new(config: PortalConfig) -> Result<Self, UpstreamError> {
        Self::with_guard(config, GuardRules::default())
    }

    /// Create a new application state with custom guard rules.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend HTTP client cannot be built.
    pub fn with_guard(config: PortalConfig, guard: GuardRules) -> Result<Self, UpstreamError> {
        let identity = IdentityClient::new(&config.upstream)?;

        Ok(Self {
            inner: Arc::new(AppStateInner {
                config,
                identity,
                guard,
            }),
        })
    }

    /// Get a reference to the portal configuration.
    #[must_use]
    pub fn config(&self) -> &PortalConfig {
        &self.inner.config
    }

    /// Get a reference to the backend identity client.
    #[must_use]
    pub fn identity(&self) -> &IdentityClient {
        &self.inner.identity
    }

    /// Get the route guard rules.
    #[must_use]
    pub fn guard(&self) -> &GuardRules {
        &self.inner.guard
    }

    /// Cookie attributes for session cookies.
    #[must_use]
    pub fn cookie_settings(&self) -> CookieSettings {
        CookieSettings {
            secure: self.config().secure_cookies(),
        }
    }
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("config", &self.inner.config)
            .field("identity", &self.inner.identity)
            .finish_non_exhaustive()
    }
}
