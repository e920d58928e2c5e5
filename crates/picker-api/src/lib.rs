//! # picker-api
//!
//! HTTP composition layer for the commander picker backend.
//!
//! This crate is a **thin composition layer** with no domain policy
//! beyond the caller-side reservation pre-checks; the listing rules, the
//! reservation protocol, and all store access live in `picker-core`.
//!
//! ## Endpoints
//!
//! ```text
//! GET  /health                  - Health check
//! GET  /ready                   - Readiness check (sheet reachable)
//! GET  /openapi.json            - OpenAPI specification
//! GET  /api/v1/cards/{color}    - List cards to offer for a color
//! POST /api/v1/select-card      - Reserve a card
//! POST /api/v1/admin/reset      - Clear all reservations (shared secret)
//! GET  /images/*                - Cached card images
//! ```
//!
//! ## Example
//!
//! ```rust,ignore
//! use picker_api::server::Server;
//! use picker_core::config::Config;
//!
//! let server = Server::new(Config::from_env()?);
//! server.serve().await?;
//! ```

#![forbid(unsafe_code)]
#![deny(missing_docs)]
#![deny(rust_2018_idioms)]
#![warn(clippy::pedantic)]

pub mod error;
pub mod openapi;
pub mod routes;
pub mod server;

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::error::{ApiError, ApiResult};
    pub use crate::server::Server;
}
