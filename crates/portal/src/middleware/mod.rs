//! HTTP middleware stack for the portal.
//!
//! # Middleware Order (bottom to top in Router)
//!
//! 1. Sentry layer (capture errors)
//! 2. `TraceLayer` (request tracing)
//! 3. Request ID (add unique ID to each request)
//! 4. Route guard (token presence check for protected areas)

pub mod guard;
pub mod request_id;

pub use guard::{GuardOutcome, GuardRules, RouteClass, route_guard_middleware};
pub use request_id::{REQUEST_ID_HEADER, RequestId, request_id_middleware};
