//! Nearest-neighbour search over a single cursor scan.
//!
//! The search is a linear scan: every record with a non-empty shape is measured
//! against the reference and the running best is kept. Comparison is strictly
//! less-than, so when several records share the minimum distance the first one in
//! scan order wins.

use geoscan_core_common::{FeatureCollection, Record, Shape, SpatialRelation};
use log::debug;

use crate::cursor::ScopedCursor;
use crate::error::{GeometryError, Result};
use crate::filter::SpatialFilterBuilder;
use crate::geometry::distance_between;

/// Outcome of a nearest-neighbour search.
///
/// When nothing was found `oid` is `None` and `distance` is `0.0`; that distance is a
/// sentinel, so check [`NearestResult::is_found`] before using it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NearestResult {
    pub oid: Option<i64>,
    pub distance: f64,
}

impl NearestResult {
    /// The empty-result sentinel.
    pub const NONE: NearestResult = NearestResult {
        oid: None,
        distance: 0.0,
    };

    #[must_use]
    pub fn is_found(&self) -> bool {
        self.oid.is_some()
    }
}

/// Scans `source` once and keeps the closest record.
///
/// Records without a shape, with an empty shape, or without an identifier are
/// skipped.
fn scan_nearest(reference: &Shape, source: ScopedCursor<'_>) -> Result<Option<(Record, f64)>> {
    let mut best: Option<(Record, f64)> = None;
    let mut scanned = 0usize;

    for record in source {
        let record = record?;
        scanned += 1;
        if record.oid.is_none() {
            continue;
        }
        let Some(shape) = record.geometry() else {
            continue;
        };

        let distance = distance_between(reference, shape)?;
        if best.as_ref().is_none_or(|(_, closest)| distance < *closest) {
            best = Some((record, distance));
        }
    }

    debug!("Nearest search scanned {scanned} record(s)");
    Ok(best)
}

/// Finds the record in `source` closest to `reference`.
///
/// The cursor is consumed; its handle is released when the scan ends, whether it
/// completes or fails.
///
/// # Errors
///
/// Returns a geometry error if `reference` is empty or a record's spatial reference
/// differs from it, and any error raised while reading the cursor.
pub fn find_nearest(reference: &Shape, source: ScopedCursor<'_>) -> Result<NearestResult> {
    Ok(scan_nearest(reference, source)?.map_or(NearestResult::NONE, |(record, distance)| {
        NearestResult {
            oid: record.oid,
            distance,
        }
    }))
}

pub(crate) fn ensure_feature_class(collection: &dyn FeatureCollection) -> Result<()> {
    if collection.kind().is_feature_class() {
        Ok(())
    } else {
        Err(GeometryError::NotSpatial {
            collection: collection.name().to_string(),
        }
        .into())
    }
}

/// Finds the closest record among those intersecting `reference` buffered by
/// `radius`, optionally restricted by a where clause.
///
/// A `radius` of zero or less disables buffering, so only records intersecting
/// `reference` itself are considered.
///
/// # Errors
///
/// Returns [`GeometryError::NotSpatial`] for tables, a cursor error when no handle is
/// available, a query error when the where clause is rejected, and the errors of
/// [`find_nearest`].
pub fn find_nearest_with_radius(
    reference: &Shape,
    source: &dyn FeatureCollection,
    radius: f64,
    where_clause: Option<&str>,
) -> Result<NearestResult> {
    ensure_feature_class(source)?;

    let filter = SpatialFilterBuilder::new(source.schema()).build(
        reference,
        SpatialRelation::Intersects,
        radius,
        where_clause,
    )?;
    let cursor = ScopedCursor::open(source, Some(&filter))?;
    find_nearest(reference, cursor)
}

/// Returns the full record of the feature in `source` closest to `reference`, or
/// `None` when `source` has no feature with a shape.
///
/// # Errors
///
/// Returns [`GeometryError::NotSpatial`] for tables and the errors of
/// [`find_nearest`].
pub fn nearest_feature(reference: &Shape, source: &dyn FeatureCollection) -> Result<Option<Record>> {
    ensure_feature_class(source)?;

    let cursor = ScopedCursor::open(source, None)?;
    Ok(scan_nearest(reference, cursor)?.map(|(record, _)| record))
}
