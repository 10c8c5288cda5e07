//! Common types and traits shared across `GeoScan` crates.
//!
//! This crate provides the data model (geometries, records, schemas, filters) and the
//! provider traits that are shared between `geoscan-core` and provider implementation
//! crates, preventing circular dependencies.

pub mod error;
pub mod filter;
pub mod geometry;
pub mod io;
pub mod record;

// Re-export commonly used types
pub use error::{ProviderError, ProviderResult};
pub use filter::{QueryFilter, SpatialPredicate, SpatialRelation};
pub use geometry::{Envelope, Geometry, Path, Shape, ShapeType, SpatialReference, Surface, Vertex};
pub use io::{FeatureCollection, InsertSink, RecordCursor, Workspace};
pub use record::{CollectionKind, FeatureBuffer, Field, FieldType, FieldValue, Record, Schema};
