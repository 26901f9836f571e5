//! Warizmy portal session gateway library.
//!
//! Relays credential exchanges between the browser and the backend identity
//! service, keeps the resulting tokens in HTTP-only cookies, and guards the
//! protected areas of the portal. Exposed as a library so the router can be
//! driven from integration tests.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod config;
pub mod error;
pub mod middleware;
pub mod routes;
pub mod session;
pub mod state;
pub mod upstream;
