//! `geoscan-core` is the scan library of the `GeoScan` project: resource-safe cursor
//! scans over feature collections and the workflows built on them.
//!
//! This crate includes:
//! - **Scoped cursors**: cursors that return their provider handle exactly once on
//!   every exit path ([`cursor`]).
//! - **Geometry operations**: planar distance, containment, flattening and envelope
//!   helpers ([`geometry`]).
//! - **Scan utilities**: nearest-feature search, extent aggregation, buffered feature
//!   copy and identifier queries.
//! - **Provider registry**: a static list of workspace providers and their
//!   capabilities ([`providers`]).
//!
//! Providers plug in through the traits of `geoscan-core-common`.

pub mod catalog;
pub mod copier;
pub mod cursor;
pub mod error;
pub mod extent;
pub mod filter;
pub mod geometry;
pub mod nearest;
pub mod operations;
pub mod providers;
pub mod query;
pub mod types;
pub mod utils;

#[cfg(test)]
mod testing;

pub use error::{GeoScanError, Result};
