//! # picker-core
//!
//! Domain logic for the commander picker backend.
//!
//! This crate owns everything below the HTTP surface:
//!
//! - **Sheet store**: the [`sheet::SheetStore`] contract over the external
//!   spreadsheet (row-addressable table with named columns), with a Google
//!   Sheets REST backend and an in-memory backend for tests/dev.
//! - **Cache**: a TTL-bounded, replace-wholesale snapshot of the sheet.
//! - **Query**: the card-listing decision tree (holdings, limits, sampling).
//! - **Reservation**: the read-latest/validate/write/invalidate protocol
//!   that records a reservation against the live sheet.
//! - **Images**: Scryfall lookups with a local file cache.
//!
//! ## Design Principles
//!
//! The coordinator always decides against a fresh read of the store, never
//! the cache; the cache exists to keep the read path cheap. There is no
//! cross-request serialization, so two racing reservations for the same
//! card can both pass validation and the store's last write wins. That
//! window is narrowed by the fresh read but is an accepted limitation, not
//! a guarantee.

#![forbid(unsafe_code)]
#![deny(missing_docs)]
#![deny(rust_2018_idioms)]
#![warn(clippy::pedantic)]

pub mod cache;
pub mod card;
pub mod config;
pub mod error;
pub mod google;
pub mod observability;
pub mod query;
pub mod reservation;
pub mod scryfall;
pub mod sheet;

pub use error::{Error, Result};

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::cache::{SheetCache, Snapshot};
    pub use crate::card::{CardRecord, Color, ColumnMap};
    pub use crate::config::Config;
    pub use crate::error::{Error, Result};
    pub use crate::reservation::ReservationCoordinator;
    pub use crate::scryfall::ImageResolver;
    pub use crate::sheet::{MemorySheet, SheetStore};
}
