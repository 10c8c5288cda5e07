//! `GeoJSON` writer for feature classes and tables

use std::io::Write as IoWrite;

use geojson::{Feature, FeatureCollection, JsonObject, JsonValue, Value, feature::Id};
use geoscan_core_common::{
    CollectionKind, Envelope, FieldType, FieldValue, Geometry, Path, ProviderError, ProviderResult,
    Record, Surface, Vertex,
};
use serde_json::json;

use crate::parser::LayerData;

/// Options for `GeoJSON` writing
#[derive(Debug, Clone)]
pub struct GeoJsonWriterOptions {
    /// Indent the output (default: false)
    pub pretty: bool,
    /// Write the layer metadata members (`shapeType`, `fields`, `crs`, ...) so the
    /// file reads back with the same schema (default: true)
    pub write_metadata: bool,
}

impl Default for GeoJsonWriterOptions {
    fn default() -> Self {
        Self {
            pretty: false,
            write_metadata: true,
        }
    }
}

impl GeoJsonWriterOptions {
    /// Create new writer options with defaults
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set whether to indent the output
    #[must_use]
    pub fn with_pretty(mut self, pretty: bool) -> Self {
        self.pretty = pretty;
        self
    }

    /// Set whether to write layer metadata members
    #[must_use]
    pub fn with_metadata(mut self, write_metadata: bool) -> Self {
        self.write_metadata = write_metadata;
        self
    }
}

fn position(vertex: &Vertex) -> Vec<f64> {
    let mut position = vec![vertex.x, vertex.y];
    match (vertex.z, vertex.m) {
        (Some(z), Some(m)) => position.extend([z, m]),
        (Some(z), None) => position.push(z),
        // Positions have no slot for a measure without an elevation.
        (None, Some(m)) => position.extend([0.0, m]),
        (None, None) => {},
    }
    position
}

fn positions(path: &Path) -> Vec<Vec<f64>> {
    path.vertices().iter().map(position).collect()
}

fn rings(surface: &Surface) -> Vec<Vec<Vec<f64>>> {
    std::iter::once(&surface.exterior)
        .chain(&surface.interiors)
        .map(positions)
        .collect()
}

fn envelope_ring(envelope: &Envelope) -> Vec<Vec<f64>> {
    vec![
        vec![envelope.xmin, envelope.ymin],
        vec![envelope.xmax, envelope.ymin],
        vec![envelope.xmax, envelope.ymax],
        vec![envelope.xmin, envelope.ymax],
        vec![envelope.xmin, envelope.ymin],
    ]
}

/// Converts a geometry to a `GeoJSON` value, or `None` for an empty geometry.
#[must_use]
pub fn geometry_to_value(geometry: &Geometry) -> Option<Value> {
    if geometry.is_empty() {
        return None;
    }
    Some(match geometry {
        Geometry::Point(vertex) => Value::Point(position(vertex)),
        Geometry::Polyline(paths) => match paths.as_slice() {
            [single] => Value::LineString(positions(single)),
            _ => Value::MultiLineString(paths.iter().map(positions).collect()),
        },
        Geometry::Polygon(surfaces) => match surfaces.as_slice() {
            [single] => Value::Polygon(rings(single)),
            _ => Value::MultiPolygon(surfaces.iter().map(rings).collect()),
        },
        Geometry::Envelope(envelope) => Value::Polygon(vec![envelope_ring(envelope)]),
        Geometry::Other(other) => Value::from(other),
    })
}

fn value_to_json(value: &FieldValue) -> JsonValue {
    match value {
        FieldValue::Null => JsonValue::Null,
        FieldValue::Integer(v) => json!(v),
        FieldValue::Double(v) => serde_json::Number::from_f64(*v).map_or(JsonValue::Null, JsonValue::Number),
        FieldValue::Text(v) => JsonValue::String(v.clone()),
        FieldValue::Boolean(v) => JsonValue::Bool(*v),
    }
}

fn field_type_name(field_type: FieldType) -> &'static str {
    match field_type {
        FieldType::Integer | FieldType::ObjectId => "Integer",
        FieldType::Double => "Double",
        FieldType::Text | FieldType::Geometry => "String",
        FieldType::Boolean => "Boolean",
    }
}

fn record_to_feature(record: &Record) -> Feature {
    let properties: JsonObject = record
        .attributes
        .iter()
        .map(|(name, value)| (name.clone(), value_to_json(value)))
        .collect();

    Feature {
        bbox: None,
        geometry: record
            .shape
            .as_ref()
            .and_then(|shape| geometry_to_value(&shape.geometry))
            .map(geojson::Geometry::new),
        id: record.oid.map(|oid| Id::Number(oid.into())),
        properties: Some(properties),
        foreign_members: None,
    }
}

fn layer_metadata(layer: &LayerData) -> JsonObject {
    let schema = &layer.schema;
    let mut metadata = JsonObject::new();

    let shape_type = match layer.kind {
        CollectionKind::FeatureClass { shape_type } => shape_type.as_str(),
        CollectionKind::Table => "None",
    };
    metadata.insert("shapeType".to_string(), json!(shape_type));
    metadata.insert("oidField".to_string(), json!(schema.oid_field()));
    if layer.kind.is_feature_class() {
        metadata.insert("hasZ".to_string(), json!(schema.has_z()));
        metadata.insert("hasM".to_string(), json!(schema.has_m()));
    }

    let fields: Vec<JsonValue> = schema
        .fields()
        .iter()
        .filter(|field| !field.is_system())
        .map(|field| {
            json!({
                "name": field.name,
                "type": field_type_name(field.field_type),
                "editable": field.editable,
            })
        })
        .collect();
    metadata.insert("fields".to_string(), JsonValue::Array(fields));

    if let Some(sr) = layer.spatial_reference {
        metadata.insert(
            "crs".to_string(),
            json!({ "type": "name", "properties": { "name": format!("EPSG:{}", sr.wkid()) } }),
        );
    }
    metadata
}

/// Write a layer as a `GeoJSON` feature collection
///
/// Object identifiers are written as feature ids; attributes become properties.
///
/// # Errors
///
/// Returns [`ProviderError::Format`] if serialization or the underlying write fails.
pub fn write_geojson<W: IoWrite>(
    writer: &mut W,
    layer: &LayerData,
    options: &GeoJsonWriterOptions,
) -> ProviderResult<()> {
    let collection = FeatureCollection {
        bbox: None,
        features: layer.records.iter().map(record_to_feature).collect(),
        foreign_members: options.write_metadata.then(|| layer_metadata(layer)),
    };

    let result = if options.pretty {
        serde_json::to_writer_pretty(&mut *writer, &collection)
    } else {
        serde_json::to_writer(&mut *writer, &collection)
    };
    result.map_err(|err| ProviderError::Format {
        format: "GeoJSON".to_string(),
        message: format!("failed to write feature collection: {err}"),
    })?;

    writer.flush().map_err(|err| ProviderError::Format {
        format: "GeoJSON".to_string(),
        message: format!("failed to flush output: {err}"),
    })
}
