//! Provider traits for scanning and inserting records.
//!
//! This module defines the narrow contract a geodata provider must fulfil for the
//! scan utilities in `geoscan-core`: record iteration, buffered insertion, collection
//! metadata and workspace enumeration.

use crate::error::ProviderResult;
use crate::filter::QueryFilter;
use crate::geometry::{Envelope, SpatialReference};
use crate::record::{CollectionKind, FeatureBuffer, Record, Schema};

/// A forward-only, single-pass stream of records backed by a provider handle.
///
/// Implementations are not expected to release their handle on drop; callers wrap
/// them in a scoped cursor that calls [`RecordCursor::release`] exactly once.
pub trait RecordCursor {
    /// Returns the next record, or `None` once the stream is exhausted.
    ///
    /// # Errors
    ///
    /// Returns a provider error if the record cannot be produced, for example when a
    /// where clause is rejected at execution time.
    fn next_record(&mut self) -> ProviderResult<Option<Record>>;

    /// Returns the underlying handle to the provider.
    fn release(&mut self);
}

/// A batched insert handle.
///
/// Rows accumulate until [`InsertSink::flush`]; a sink dropped without flushing
/// commits nothing.
pub trait InsertSink {
    /// Buffers one row.
    ///
    /// # Errors
    ///
    /// Returns a provider error if the row is rejected.
    fn insert(&mut self, row: FeatureBuffer) -> ProviderResult<()>;

    /// Commits every buffered row and returns how many were written.
    ///
    /// # Errors
    ///
    /// Returns a provider error if the batch cannot be committed; nothing is written
    /// in that case.
    fn flush(&mut self) -> ProviderResult<usize>;
}

/// A named collection of records owned by the provider.
pub trait FeatureCollection {
    /// Collection name.
    fn name(&self) -> &str;

    /// Feature class or table.
    fn kind(&self) -> CollectionKind;

    /// Field layout of the collection.
    fn schema(&self) -> &Schema;

    /// Stored bounding extent of the collection's shapes, if any.
    fn extent(&self) -> Option<Envelope>;

    /// Spatial reference of the shape field.
    fn spatial_reference(&self) -> Option<SpatialReference>;

    /// Opens a cursor over the records matching `filter` (all records for `None`).
    ///
    /// # Errors
    ///
    /// Returns [`crate::ProviderError::ResourceExhausted`] when no handle is available
    /// and [`crate::ProviderError::QuerySyntax`] when the where clause is rejected.
    fn open_cursor(&self, filter: Option<&QueryFilter>) -> ProviderResult<Box<dyn RecordCursor + '_>>;

    /// Counts the records matching an optional where clause.
    ///
    /// # Errors
    ///
    /// Returns [`crate::ProviderError::QuerySyntax`] when the where clause is rejected.
    fn feature_count(&self, where_clause: Option<&str>) -> ProviderResult<usize>;

    /// Opens a buffered insert handle.
    ///
    /// # Errors
    ///
    /// Returns a provider error if the collection cannot be written.
    fn open_insert(&self) -> ProviderResult<Box<dyn InsertSink + '_>>;
}

/// A container of collections, optionally grouped into named feature datasets.
pub trait Workspace {
    /// Location of the workspace, for display.
    fn path_name(&self) -> &str;

    /// Names of the feature datasets in the workspace.
    fn dataset_names(&self) -> Vec<String>;

    /// Collections at the workspace root (`None`) or inside the named dataset.
    ///
    /// # Errors
    ///
    /// Returns [`crate::ProviderError::NotFound`] for an unknown dataset.
    fn collections(&self, dataset: Option<&str>) -> ProviderResult<Vec<&dyn FeatureCollection>>;

    /// Opens a collection by name, searching the root first and then each dataset.
    ///
    /// # Errors
    ///
    /// Returns [`crate::ProviderError::NotFound`] if no collection has that name.
    fn open_collection(&self, name: &str) -> ProviderResult<&dyn FeatureCollection>;
}
