//! Display utilities for formatting CLI output.
//!
//! This module provides table row structures and formatting functions
//! for presenting workspace contents and the provider registry.

use tabled::{Table, Tabled};

use geoscan_core::providers::Provider;
use geoscan_core::types::CollectionInfo;
use geoscan_core::utils::format_envelope;

/// Decimals used when printing coordinates.
pub const COORDINATE_PRECISION: usize = 3;

/// Table row representation for displaying one collection.
#[derive(Tabled)]
pub struct CollectionRow {
    /// Collection name.
    #[tabled(rename = "Name")]
    pub name: String,
    /// Feature dataset, or `-` at the workspace root.
    #[tabled(rename = "Dataset")]
    pub dataset: String,
    /// Shape type, or `Table`.
    #[tabled(rename = "Shape Type")]
    pub shape_type: String,
    #[tabled(rename = "Features")]
    pub feature_count: usize,
    #[tabled(rename = "WKID")]
    pub wkid: String,
    #[tabled(rename = "Extent")]
    pub extent: String,
}

impl From<&CollectionInfo> for CollectionRow {
    fn from(info: &CollectionInfo) -> Self {
        Self {
            name: info.name.clone(),
            dataset: info.dataset.clone().unwrap_or_else(|| "-".to_string()),
            shape_type: info.shape_type.clone().unwrap_or_else(|| "Table".to_string()),
            feature_count: info.feature_count,
            wkid: info.wkid.map_or_else(|| "N/A".to_string(), |wkid| wkid.to_string()),
            extent: info
                .extent
                .as_ref()
                .map_or_else(|| "N/A".to_string(), |e| format_envelope(e, COORDINATE_PRECISION)),
        }
    }
}

/// Table row representation for displaying field information.
#[derive(Tabled)]
pub struct FieldRow {
    /// Name of the field.
    #[tabled(rename = "Field")]
    pub name: String,
    /// Data type of the field.
    #[tabled(rename = "Type")]
    pub data_type: String,
    /// Whether the field accepts values on insert.
    #[tabled(rename = "Editable")]
    pub editable: String,
    /// Whether the field can contain null values.
    #[tabled(rename = "Nullable")]
    pub nullable: String,
}

/// Table row representation for displaying provider information.
#[derive(Tabled)]
pub struct ProviderRow {
    /// Short identifier for the provider (e.g., `GeoJSON`).
    #[tabled(rename = "Short Name")]
    pub short_name: String,
    /// Full descriptive name of the provider.
    #[tabled(rename = "Long Name")]
    pub long_name: String,
    /// Support status for filtered cursor scans.
    #[tabled(rename = "Search")]
    pub search: String,
    /// Support status for buffered inserts.
    #[tabled(rename = "Insert")]
    pub insert: String,
    /// Support status for stored extents.
    #[tabled(rename = "Extent")]
    pub extent: String,
}

impl From<&Provider> for ProviderRow {
    fn from(provider: &Provider) -> Self {
        Self {
            short_name: provider.short_name.to_string(),
            long_name: provider.long_name.to_string(),
            search: provider.capabilities.search.as_str().to_string(),
            insert: provider.capabilities.insert.as_str().to_string(),
            extent: provider.capabilities.extent.as_str().to_string(),
        }
    }
}

fn yes_no(value: bool) -> String {
    if value { "Yes" } else { "No" }.to_string()
}

/// Display workspace contents: a summary table followed by the fields of each collection.
pub fn display_collections(workspace: &str, infos: &[CollectionInfo]) {
    println!("\nWorkspace: {workspace}");

    if infos.is_empty() {
        println!("No collections found.");
        return;
    }

    let rows: Vec<CollectionRow> = infos.iter().map(CollectionRow::from).collect();
    println!("{}", Table::new(rows));

    for info in infos {
        if info.fields.is_empty() {
            continue;
        }
        println!("\n=== {} ===", info.name);

        let field_rows: Vec<FieldRow> = info
            .fields
            .iter()
            .map(|f| FieldRow {
                name: f.name.clone(),
                data_type: f.data_type.clone(),
                editable: yes_no(f.editable),
                nullable: yes_no(f.nullable),
            })
            .collect();
        println!("{}", Table::new(field_rows));
    }
}

/// Display the provider registry.
pub fn display_providers(providers: &[Provider]) {
    println!("\nProviders ({} total):\n", providers.len());

    let rows: Vec<ProviderRow> = providers.iter().map(ProviderRow::from).collect();
    println!("{}", Table::new(rows));
}

#[cfg(test)]
mod tests {
    use super::*;
    use geoscan_core::providers::find_provider;
    use geoscan_core::types::FieldInfo;
    use geoscan_core_common::Envelope;

    fn hydrants() -> CollectionInfo {
        CollectionInfo {
            name: "hydrants".to_string(),
            dataset: None,
            shape_type: Some("Point".to_string()),
            feature_count: 3,
            extent: Some(Envelope::new(0.0, 0.0, 10.0, 5.0)),
            wkid: Some(2056),
            fields: vec![FieldInfo {
                name: "OBJECTID".to_string(),
                data_type: "ObjectID".to_string(),
                editable: false,
                nullable: true,
            }],
        }
    }

    #[test]
    fn test_collection_row() {
        let row = CollectionRow::from(&hydrants());
        assert_eq!(row.dataset, "-");
        assert_eq!(row.wkid, "2056");
        assert_eq!(row.extent, "0.000, 0.000 : 10.000, 5.000");
    }

    #[test]
    fn test_table_row_defaults() {
        let info = CollectionInfo {
            dataset: Some("cadastre".to_string()),
            shape_type: None,
            extent: None,
            wkid: None,
            ..hydrants()
        };
        let row = CollectionRow::from(&info);
        assert_eq!(row.dataset, "cadastre");
        assert_eq!(row.shape_type, "Table");
        assert_eq!(row.wkid, "N/A");
        assert_eq!(row.extent, "N/A");
    }

    #[test]
    fn test_provider_row() {
        let row = ProviderRow::from(&find_provider("FileGDB").unwrap());
        assert_eq!(row.short_name, "FileGDB");
        assert_eq!(row.search, "Not Supported");
    }

    #[test]
    fn test_display_collections() {
        // This test just ensures the function runs without panicking
        display_collections("memory", &[hydrants()]);
        display_collections("memory", &[]);
    }
}
