//! Workspace-level workflows.
//!
//! Each function validates the provider's capabilities and the caller's options, then
//! runs one scan utility against a collection of the workspace. These are the entry
//! points used by the command-line interface.

use geoscan_core_common::{Envelope, FeatureCollection, QueryFilter, Shape, Workspace};
use log::info;

use crate::copier::copy_features;
use crate::cursor::ScopedCursor;
use crate::error::{ConfigError, Result};
use crate::extent::find_extent;
use crate::nearest::{NearestResult, ensure_feature_class, find_nearest, find_nearest_with_radius};
use crate::providers::{Provider, SupportStatus};
use crate::query::get_ids;
use crate::types::{CollectionInfo, FieldInfo};
use crate::utils::FieldTypeExt;

/// Options for a nearest-feature search.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SearchOptions {
    /// Restrict candidates to those within this distance of the reference.
    pub radius: Option<f64>,
    /// Attribute predicate applied to candidates.
    pub where_clause: Option<String>,
}

impl SearchOptions {
    /// Checks that the radius, when given, is a finite number. A radius of zero or
    /// less is valid and disables buffering.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidOption`] for a NaN or infinite radius.
    pub fn validate(&self) -> Result<()> {
        if let Some(radius) = self.radius
            && !radius.is_finite()
        {
            return Err(ConfigError::InvalidOption {
                option: "radius".to_string(),
                message: format!("expected a finite distance, got {radius}"),
            }
            .into());
        }
        Ok(())
    }
}

fn require(provider: &Provider, status: SupportStatus, operation: &str) -> Result<()> {
    if status.is_supported() {
        Ok(())
    } else {
        Err(ConfigError::InvalidOption {
            option: "provider".to_string(),
            message: format!(
                "'{}' does not support {operation} ({})",
                provider.short_name,
                status.as_str()
            ),
        }
        .into())
    }
}

/// Finds the feature of `layer` nearest to `reference`.
///
/// Without a radius every record matching the where clause is a candidate; with one,
/// only those intersecting the reference buffered by it.
///
/// # Errors
///
/// Returns a configuration error for an unsupported provider or invalid options, and
/// the errors of the underlying search.
pub fn nearest(
    workspace: &dyn Workspace,
    provider: &Provider,
    layer: &str,
    reference: &Shape,
    options: &SearchOptions,
) -> Result<NearestResult> {
    require(provider, provider.capabilities.search, "search")?;
    options.validate()?;

    let collection = workspace.open_collection(layer)?;
    info!("Searching '{}' in {}", collection.name(), workspace.path_name());

    let where_clause = options.where_clause.as_deref();
    let result = match options.radius {
        Some(radius) => find_nearest_with_radius(reference, collection, radius, where_clause)?,
        None => {
            ensure_feature_class(collection)?;
            let filter = QueryFilter::with_where(where_clause);
            find_nearest(reference, ScopedCursor::open(collection, Some(&filter))?)?
        },
    };

    match result.oid {
        Some(oid) => info!("Nearest feature: {oid} at distance {}", result.distance),
        None => info!("No feature found"),
    }
    Ok(result)
}

/// Computes the aggregated, expanded extent of the workspace root or a dataset.
///
/// # Errors
///
/// Returns a configuration error for an unsupported provider and the errors of
/// [`find_extent`].
pub fn extent(workspace: &dyn Workspace, provider: &Provider, dataset: Option<&str>) -> Result<Option<Envelope>> {
    require(provider, provider.capabilities.extent, "extent")?;
    find_extent(workspace, dataset)
}

/// Copies the records of `source` matching `where_clause` into `target`.
///
/// # Errors
///
/// Returns a configuration error for an unsupported provider and the errors of
/// [`copy_features`].
pub fn copy(
    workspace: &dyn Workspace,
    provider: &Provider,
    source: &str,
    target: &str,
    where_clause: Option<&str>,
) -> Result<usize> {
    require(provider, provider.capabilities.search, "search")?;
    require(provider, provider.capabilities.insert, "insert")?;

    let source = workspace.open_collection(source)?;
    let target = workspace.open_collection(target)?;
    info!("Copying '{}' into '{}'", source.name(), target.name());
    copy_features(source, target, where_clause)
}

/// Lists the identifiers of the records of `layer` matching `where_clause`.
///
/// # Errors
///
/// Returns a configuration error for an unsupported provider or an unknown
/// `id_field`, and the errors raised while scanning.
pub fn list_ids(
    workspace: &dyn Workspace,
    provider: &Provider,
    layer: &str,
    where_clause: Option<&str>,
    id_field: Option<&str>,
) -> Result<Vec<i64>> {
    require(provider, provider.capabilities.search, "search")?;
    let collection = workspace.open_collection(layer)?;
    get_ids(collection, where_clause, id_field)
}

fn describe_collection(collection: &dyn FeatureCollection, dataset: Option<&str>) -> Result<CollectionInfo> {
    let schema = collection.schema();
    Ok(CollectionInfo {
        name: collection.name().to_string(),
        dataset: dataset.map(str::to_string),
        shape_type: collection.kind().shape_type().map(|t| t.as_str().to_string()),
        feature_count: collection.feature_count(None)?,
        extent: collection.extent(),
        wkid: collection.spatial_reference().map(|sr| sr.wkid()),
        fields: schema
            .fields()
            .iter()
            .map(|field| FieldInfo {
                name: field.name.clone(),
                data_type: field.field_type.format(),
                editable: field.editable,
                nullable: field.nullable,
            })
            .collect(),
    })
}

/// Describes the collections at the workspace root, or in `dataset` when given.
/// Without a dataset every feature dataset is described as well.
///
/// # Errors
///
/// Returns a provider error for an unknown dataset.
pub fn describe(workspace: &dyn Workspace, dataset: Option<&str>) -> Result<Vec<CollectionInfo>> {
    let datasets: Vec<Option<String>> = match dataset {
        Some(name) => vec![Some(name.to_string())],
        None => std::iter::once(None)
            .chain(workspace.dataset_names().into_iter().map(Some))
            .collect(),
    };

    let mut infos = Vec::new();
    for dataset in &datasets {
        for collection in workspace.collections(dataset.as_deref())? {
            infos.push(describe_collection(collection, dataset.as_deref())?);
        }
    }
    Ok(infos)
}
