//! Combined extent of feature collections.

use geoscan_core_common::{Envelope, FeatureCollection, QueryFilter, Workspace};
use log::{debug, info};

use crate::cursor::ScopedCursor;
use crate::error::Result;

/// Factor applied to both axes of an aggregated extent so that features on the
/// boundary stay visible with a margin.
pub const EXTENT_EXPANSION_FACTOR: f64 = 1.25;

/// Returns `true` when `collection` holds at least one record with a non-empty shape.
///
/// Tables always return `false` without opening a cursor. The scan projects only the
/// identifier and shape fields and stops at the first hit.
///
/// # Errors
///
/// Returns the errors raised while opening or reading the cursor.
pub fn has_geometry(collection: &dyn FeatureCollection) -> Result<bool> {
    if !collection.kind().is_feature_class() {
        return Ok(false);
    }

    let schema = collection.schema();
    let filter = QueryFilter::default().with_sub_fields(
        std::iter::once(schema.oid_field()).chain(schema.shape_field()),
    );

    let mut cursor = ScopedCursor::open(collection, Some(&filter))?;
    while let Some(record) = cursor.next_record()? {
        if record.geometry().is_some() {
            return Ok(true);
        }
    }
    Ok(false)
}

/// Unions the stored extents of every feature class holding at least one shape and
/// scales the result by [`EXTENT_EXPANSION_FACTOR`] about its centre.
///
/// Returns `None` when no collection contributes.
///
/// # Errors
///
/// Returns the errors raised while probing a collection for geometry.
pub fn aggregate_extent(collections: &[&dyn FeatureCollection]) -> Result<Option<Envelope>> {
    let mut combined: Option<Envelope> = None;

    for collection in collections {
        if !has_geometry(*collection)? {
            debug!("Skipping '{}': no geometry", collection.name());
            continue;
        }
        let Some(extent) = collection.extent().filter(|e| !e.is_empty()) else {
            debug!("Skipping '{}': no stored extent", collection.name());
            continue;
        };

        combined = Some(match combined {
            Some(current) => current.union(&extent),
            None => extent,
        });
    }

    Ok(combined.map(|e| e.expand_by_factor(EXTENT_EXPANSION_FACTOR, EXTENT_EXPANSION_FACTOR)))
}

/// Aggregated extent of the collections at the workspace root or in one feature
/// dataset.
///
/// # Errors
///
/// Returns a provider error for an unknown dataset and the errors of
/// [`aggregate_extent`].
pub fn find_extent(workspace: &dyn Workspace, dataset: Option<&str>) -> Result<Option<Envelope>> {
    let collections = workspace.collections(dataset)?;
    info!(
        "Computing extent of {} collection(s) in {}{}",
        collections.len(),
        workspace.path_name(),
        dataset.map(|d| format!("/{d}")).unwrap_or_default()
    );
    aggregate_extent(&collections)
}
