//! Descriptive types for workspace contents.
//!
//! These structures carry what the `info` command reports about each collection.

use geoscan_core_common::Envelope;

/// Summary of one collection.
#[derive(Debug, Clone)]
pub struct CollectionInfo {
    /// Collection name
    pub name: String,
    /// Feature dataset holding the collection, if any
    pub dataset: Option<String>,
    /// Shape type for feature classes, `None` for tables
    pub shape_type: Option<String>,
    /// Number of records
    pub feature_count: usize,
    /// Stored extent of the shapes
    pub extent: Option<Envelope>,
    /// Spatial reference WKID
    pub wkid: Option<u32>,
    /// Schema fields
    pub fields: Vec<FieldInfo>,
}

/// Information about a field.
#[derive(Debug, Clone)]
pub struct FieldInfo {
    /// Field name
    pub name: String,
    /// Data type
    pub data_type: String,
    /// Whether the field accepts values on insert
    pub editable: bool,
    /// Whether the field is nullable
    pub nullable: bool,
}
