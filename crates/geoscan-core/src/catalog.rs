//! Workspace enumeration helpers.

use geoscan_core_common::{FeatureCollection, ShapeType, Workspace};

use crate::error::Result;

/// Feature classes at the workspace root or in `dataset` whose shape type is one of
/// `shape_types`. An empty `shape_types` selects every feature class.
///
/// # Errors
///
/// Returns a provider error for an unknown dataset.
pub fn open_feature_classes<'w>(
    workspace: &'w dyn Workspace,
    dataset: Option<&str>,
    shape_types: &[ShapeType],
) -> Result<Vec<&'w dyn FeatureCollection>> {
    Ok(workspace
        .collections(dataset)?
        .into_iter()
        .filter(|collection| {
            collection
                .kind()
                .shape_type()
                .is_some_and(|t| shape_types.is_empty() || shape_types.contains(&t))
        })
        .collect())
}

/// Names of every feature class at the workspace root or in `dataset`, sorted.
///
/// # Errors
///
/// Returns a provider error for an unknown dataset.
pub fn feature_class_names(workspace: &dyn Workspace, dataset: Option<&str>) -> Result<Vec<String>> {
    let mut names: Vec<String> = open_feature_classes(workspace, dataset, &[])?
        .into_iter()
        .map(|collection| collection.name().to_string())
        .collect();
    names.sort();
    Ok(names)
}
