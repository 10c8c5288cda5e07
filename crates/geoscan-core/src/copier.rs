//! Copying records between collections through a buffered insert.
//!
//! Rows are built one per source record and handed to an [`InsertSink`]. The sink is
//! flushed once, after the scan; when anything fails before that point the copy
//! returns early and the caller drops the sink, discarding the batch.

use geoscan_core_common::{FeatureBuffer, FeatureCollection, InsertSink, QueryFilter, Schema};
use log::{debug, info};

use crate::cursor::ScopedCursor;
use crate::error::Result;
use crate::geometry::flatten;
use crate::nearest::ensure_feature_class;

/// Correspondence between target and source field indices.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldMapping {
    pairs: Vec<(usize, usize)>,
}

impl FieldMapping {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a `target <- source` pair.
    #[must_use]
    pub fn with_pair(mut self, target: usize, source: usize) -> Self {
        self.pairs.push((target, source));
        self
    }

    /// Pairs every editable, non-system target field with the source field of the
    /// same name (ignoring ASCII case). Target fields absent from the source are left
    /// out and stay `Null` in copied rows.
    #[must_use]
    pub fn by_name(source: &Schema, target: &Schema) -> Self {
        let pairs = target
            .fields()
            .iter()
            .enumerate()
            .filter(|(_, field)| field.editable && !field.is_system())
            .filter_map(|(target_idx, field)| {
                source
                    .find_field(&field.name)
                    .map(|source_idx| (target_idx, source_idx))
            })
            .collect();
        Self { pairs }
    }

    /// `(target, source)` index pairs.
    #[must_use]
    pub fn pairs(&self) -> &[(usize, usize)] {
        &self.pairs
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }
}

/// Copies every record from `source` into `sink` and returns the number of rows
/// committed.
///
/// Records without a shape, with an empty shape or without an identifier are skipped.
/// Shapes are flattened when `target_schema` stores neither z nor m. Pairs whose target
/// field is missing or not editable, or whose source index is out of range, are
/// ignored.
///
/// # Errors
///
/// Returns the first error raised while reading `source` or inserting a row, before
/// anything is flushed, or the error from the final flush.
pub fn copy(
    source: ScopedCursor<'_>,
    sink: &mut dyn InsertSink,
    mapping: &FieldMapping,
    source_schema: &Schema,
    target_schema: &Schema,
) -> Result<usize> {
    let planar = target_schema.is_planar();
    let columns: Vec<(usize, &str)> = mapping
        .pairs()
        .iter()
        .filter(|(target, _)| {
            target_schema
                .field(*target)
                .is_some_and(|field| field.editable && !field.is_system())
        })
        .filter_map(|&(target, source_idx)| {
            source_schema
                .field(source_idx)
                .map(|field| (target, field.name.as_str()))
        })
        .collect();

    let mut skipped = 0usize;
    for record in source {
        let record = record?;
        if record.oid.is_none() {
            skipped += 1;
            continue;
        }
        let Some(shape) = record.geometry() else {
            skipped += 1;
            continue;
        };

        let mut row = FeatureBuffer::for_schema(target_schema);
        row.shape = Some(if planar { flatten(shape) } else { shape.clone() });
        for &(target, name) in &columns {
            if let Some(value) = record.value(name) {
                row.set_value(target, value.clone());
            }
        }
        sink.insert(row)?;
    }

    if skipped > 0 {
        debug!("Skipped {skipped} record(s) without identifier or shape");
    }
    Ok(sink.flush()?)
}

/// Copies the records of `source` matching `where_clause` into `target`, mapping
/// fields by name.
///
/// Returns without opening an insert when nothing matches.
///
/// # Errors
///
/// Returns [`crate::error::GeometryError::NotSpatial`] if either collection is a table, and the
/// errors of [`copy`].
pub fn copy_features(
    source: &dyn FeatureCollection,
    target: &dyn FeatureCollection,
    where_clause: Option<&str>,
) -> Result<usize> {
    ensure_feature_class(source)?;
    ensure_feature_class(target)?;

    let matching = source.feature_count(where_clause)?;
    if matching == 0 {
        info!("No records in '{}' match, nothing to copy", source.name());
        return Ok(0);
    }

    let mapping = FieldMapping::by_name(source.schema(), target.schema());
    debug!(
        "Copying {matching} record(s) from '{}' to '{}' with {} mapped field(s)",
        source.name(),
        target.name(),
        mapping.len()
    );

    let mut sink = target.open_insert()?;
    let filter = QueryFilter::with_where(where_clause);
    let cursor = ScopedCursor::open(source, Some(&filter))?;
    let written = copy(cursor, sink.as_mut(), &mapping, source.schema(), target.schema())?;

    info!("Copied {written} record(s) from '{}' to '{}'", source.name(), target.name());
    Ok(written)
}
