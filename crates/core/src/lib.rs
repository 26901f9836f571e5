//! Warizmy Core - Shared types library.
//!
//! This crate provides the types shared by the Warizmy portal components:
//! - `portal` - Session gateway in front of the backend API
//! - `integration-tests` - End-to-end tests for the gateway
//!
//! # Architecture
//!
//! The core crate contains only types - no I/O, no HTTP clients, no cookies.
//! This keeps it lightweight and lets the normalization and parsing rules be
//! tested in isolation.
//!
//! # Modules
//!
//! - [`types`] - Backend API base URL, identity records, and user roles

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
