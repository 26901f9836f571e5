//! Core types for Warizmy.
//!
//! This module provides type-safe wrappers for the concepts the session
//! gateway relays between the browser and the backend API.

pub mod api_url;
pub mod identity;

pub use api_url::{ApiBaseUrl, ApiBaseUrlError};
pub use identity::{IdentityRecord, Role, UserId};
