//! `GeoJSON` parsing into records, schema and layer metadata.
//!
//! Coordinates keep their third (z) and fourth (m) ordinates. Multipoints and geometry
//! collections have no tagged counterpart and are carried as planar `Other` shapes.
//!
//! A feature collection may carry these foreign members, all optional:
//!
//! | member | meaning |
//! |---|---|
//! | `crs` | named CRS (`EPSG:2056`, `urn:ogc:def:crs:EPSG::2056`), gives the WKID |
//! | `shapeType` | `Point`, `Polyline`, `Polygon`, `Envelope`, `Other`, or `None` for a table |
//! | `hasZ`, `hasM` | whether the shape field stores elevations / measures |
//! | `oidField` | name of the identifier field (default `OBJECTID`) |
//! | `fields` | declared attribute fields: `[{"name", "type", "editable"}]` |
//!
//! Whatever is not declared is inferred from the features.

use std::collections::BTreeMap;

use geo_types::Geometry as GeoGeometry;
use geojson::{Feature, GeoJson, JsonObject, JsonValue, Value, feature::Id};
use geoscan_core_common::{
    CollectionKind, Field, FieldType, FieldValue, Geometry, Path, ProviderError, ProviderResult,
    Record, Schema, Shape, ShapeType, SpatialReference, Surface, Vertex,
};

/// Identifier field name used when a file does not declare one.
pub const DEFAULT_OID_FIELD: &str = "OBJECTID";
/// Shape field name of every `GeoJSON` feature class.
pub const SHAPE_FIELD: &str = "Shape";

/// Contents of one `GeoJSON` document.
#[derive(Debug, Clone)]
pub struct LayerData {
    pub kind: CollectionKind,
    pub schema: Schema,
    pub spatial_reference: Option<SpatialReference>,
    pub records: Vec<Record>,
}

fn format_error(context: &str, message: impl std::fmt::Display) -> ProviderError {
    ProviderError::Format {
        format: "GeoJSON".to_string(),
        message: format!("{context}: {message}"),
    }
}

/// Parses a `GeoJSON` document: a feature collection, a single feature, a bare
/// geometry, or a newline-delimited sequence of features.
///
/// # Errors
///
/// Returns [`ProviderError::Format`] if the bytes are neither valid `GeoJSON` nor a
/// valid feature sequence, or if a geometry has malformed positions.
pub fn parse_geojson_bytes(bytes: &[u8], context: &str) -> ProviderResult<LayerData> {
    let reader = std::io::Cursor::new(bytes);
    let (features, metadata) = match GeoJson::from_reader(reader) {
        Ok(GeoJson::FeatureCollection(collection)) => {
            (collection.features, collection.foreign_members.unwrap_or_default())
        },
        Ok(GeoJson::Feature(feature)) => (vec![feature], JsonObject::new()),
        Ok(GeoJson::Geometry(geometry)) => (vec![Feature::from(geometry)], JsonObject::new()),
        Err(primary_err) => match parse_sequence(bytes, context) {
            Ok(features) => (features, JsonObject::new()),
            Err(sequence_err) => {
                return Err(format_error(
                    context,
                    format!(
                        "not a GeoJSON document ({primary_err}); also not a GeoJSON sequence: {sequence_err}"
                    ),
                ));
            },
        },
    };

    build_layer(features, &metadata, context)
}

fn parse_sequence(bytes: &[u8], context: &str) -> ProviderResult<Vec<Feature>> {
    let mut features = Vec::new();
    for (line_idx, raw_line) in bytes.split(|b| *b == b'\n').enumerate() {
        let line_number = line_idx + 1;
        let line = std::str::from_utf8(raw_line)
            .map_err(|err| format_error(context, format!("line {line_number} is not valid UTF-8: {err}")))?
            .trim();
        if line.is_empty() {
            continue;
        }

        match line
            .parse::<GeoJson>()
            .map_err(|err| format_error(context, format!("line {line_number}: {err}")))?
        {
            GeoJson::Feature(feature) => features.push(feature),
            GeoJson::Geometry(geometry) => features.push(Feature::from(geometry)),
            GeoJson::FeatureCollection(collection) => features.extend(collection.features),
        }
    }

    if features.is_empty() {
        Err(format_error(context, "no GeoJSON features found"))
    } else {
        Ok(features)
    }
}

fn build_layer(features: Vec<Feature>, metadata: &JsonObject, context: &str) -> ProviderResult<LayerData> {
    let oid_field = metadata
        .get("oidField")
        .and_then(JsonValue::as_str)
        .unwrap_or(DEFAULT_OID_FIELD)
        .to_string();
    let spatial_reference = metadata.get("crs").and_then(parse_crs);

    let mut records = Vec::with_capacity(features.len());
    for feature in features {
        records.push(feature_to_record(feature, &oid_field, spatial_reference, context)?);
    }
    assign_missing_oids(&mut records);

    let shape_type = match metadata.get("shapeType").and_then(JsonValue::as_str) {
        Some(declared) => parse_shape_type(declared)
            .ok_or_else(|| format_error(context, format!("unknown shapeType '{declared}'")))?,
        None => infer_shape_type(&records),
    };
    let kind = match shape_type {
        Some(shape_type) => CollectionKind::FeatureClass { shape_type },
        None => CollectionKind::Table,
    };

    let has_z = metadata
        .get("hasZ")
        .and_then(JsonValue::as_bool)
        .unwrap_or_else(|| any_vertex(&records, |v| v.z.is_some()));
    let has_m = metadata
        .get("hasM")
        .and_then(JsonValue::as_bool)
        .unwrap_or_else(|| any_vertex(&records, |v| v.m.is_some()));

    let fields = match metadata.get("fields") {
        Some(declared) => parse_declared_fields(declared, context)?,
        None => infer_fields(&records),
    };

    let mut schema = if kind.is_feature_class() {
        Schema::feature_class(oid_field, SHAPE_FIELD).with_zm(has_z, has_m)
    } else {
        Schema::table(oid_field)
    };
    for field in fields {
        if schema.find_field(&field.name).is_none() {
            schema = schema.with_field(field);
        }
    }

    if !kind.is_feature_class() {
        for record in &mut records {
            record.shape = None;
        }
    }

    Ok(LayerData {
        kind,
        schema,
        spatial_reference,
        records,
    })
}

fn feature_to_record(
    feature: Feature,
    oid_field: &str,
    spatial_reference: Option<SpatialReference>,
    context: &str,
) -> ProviderResult<Record> {
    let mut properties = feature.properties.unwrap_or_default();

    let oid_property = properties
        .keys()
        .find(|key| key.eq_ignore_ascii_case(oid_field))
        .cloned()
        .and_then(|key| properties.remove(&key));
    let oid = match feature.id {
        Some(Id::Number(number)) => number.as_i64(),
        Some(Id::String(text)) => text.trim().parse().ok(),
        None => None,
    }
    .or_else(|| oid_property.as_ref().and_then(JsonValue::as_i64));

    let shape = match feature.geometry {
        Some(geometry) => Some(Shape {
            geometry: convert_value(geometry.value, context)?,
            spatial_reference,
        }),
        None => None,
    };

    let attributes: BTreeMap<String, FieldValue> = properties
        .into_iter()
        .filter(|(key, _)| !key.eq_ignore_ascii_case(SHAPE_FIELD))
        .map(|(key, value)| (key, json_to_value(value)))
        .collect();

    Ok(Record {
        oid,
        shape,
        attributes,
    })
}

/// Features without a usable identifier get the next free one, in file order.
fn assign_missing_oids(records: &mut [Record]) {
    let mut next = records.iter().filter_map(|r| r.oid).max().unwrap_or(0) + 1;
    for record in records.iter_mut().filter(|r| r.oid.is_none()) {
        record.oid = Some(next);
        next += 1;
    }
}

fn vertex(position: &[f64], context: &str) -> ProviderResult<Vertex> {
    match position {
        [x, y] => Ok(Vertex::new(*x, *y)),
        [x, y, z] => Ok(Vertex::with_z(*x, *y, *z)),
        [x, y, z, m, ..] => Ok(Vertex::with_z(*x, *y, *z).with_m(*m)),
        _ => Err(format_error(
            context,
            format!("position needs at least two ordinates, got {}", position.len()),
        )),
    }
}

fn path(positions: &[Vec<f64>], context: &str) -> ProviderResult<Path> {
    positions
        .iter()
        .map(|p| vertex(p, context))
        .collect::<ProviderResult<Vec<_>>>()
        .map(Path)
}

fn surface(rings: &[Vec<Vec<f64>>], context: &str) -> ProviderResult<Surface> {
    let mut rings = rings.iter().map(|ring| path(ring, context));
    let exterior = rings.next().transpose()?.unwrap_or_default();
    Ok(Surface {
        exterior,
        interiors: rings.collect::<ProviderResult<_>>()?,
    })
}

fn convert_value(value: Value, context: &str) -> ProviderResult<Geometry> {
    Ok(match value {
        Value::Point(position) => Geometry::Point(vertex(&position, context)?),
        Value::LineString(line) => Geometry::Polyline(vec![path(&line, context)?]),
        Value::MultiLineString(lines) => Geometry::Polyline(
            lines
                .iter()
                .map(|line| path(line, context))
                .collect::<ProviderResult<_>>()?,
        ),
        Value::Polygon(rings) => Geometry::Polygon(vec![surface(&rings, context)?]),
        Value::MultiPolygon(polygons) => Geometry::Polygon(
            polygons
                .iter()
                .map(|rings| surface(rings, context))
                .collect::<ProviderResult<_>>()?,
        ),
        other @ (Value::MultiPoint(_) | Value::GeometryCollection(_)) => {
            let geometry: GeoGeometry<f64> = other
                .try_into()
                .map_err(|err| format_error(context, format!("failed to convert geometry: {err}")))?;
            Geometry::Other(geometry)
        },
    })
}

fn json_to_value(value: JsonValue) -> FieldValue {
    match value {
        JsonValue::Null => FieldValue::Null,
        JsonValue::Bool(b) => FieldValue::Boolean(b),
        JsonValue::Number(n) => match n.as_i64() {
            Some(i) => FieldValue::Integer(i),
            None => n.as_f64().map_or(FieldValue::Null, FieldValue::Double),
        },
        JsonValue::String(s) => FieldValue::Text(s),
        other @ (JsonValue::Array(_) | JsonValue::Object(_)) => FieldValue::Text(other.to_string()),
    }
}

fn parse_crs(crs: &JsonValue) -> Option<SpatialReference> {
    let name = crs.get("properties")?.get("name")?.as_str()?;
    name.rsplit(':')
        .find(|part| !part.is_empty())?
        .parse()
        .ok()
        .map(SpatialReference)
}

fn parse_shape_type(name: &str) -> Option<Option<ShapeType>> {
    let shape_type = match name.to_ascii_lowercase().as_str() {
        "point" => ShapeType::Point,
        "polyline" | "linestring" => ShapeType::Polyline,
        "polygon" => ShapeType::Polygon,
        "envelope" => ShapeType::Envelope,
        "other" => ShapeType::Other,
        "none" => return Some(None),
        _ => return None,
    };
    Some(Some(shape_type))
}

fn infer_shape_type(records: &[Record]) -> Option<ShapeType> {
    if let Some(shape) = records.iter().find_map(Record::geometry) {
        return Some(shape.shape_type());
    }
    if records.iter().any(|r| r.shape.is_some()) || records.is_empty() {
        // Only empty shapes, or nothing to infer from.
        return Some(ShapeType::Other);
    }
    None
}

fn any_vertex(records: &[Record], test: impl Fn(&Vertex) -> bool) -> bool {
    records
        .iter()
        .filter_map(|r| r.shape.as_ref())
        .any(|shape| match &shape.geometry {
            Geometry::Point(v) => test(v),
            Geometry::Polyline(paths) => paths.iter().flat_map(|p| p.vertices()).any(&test),
            Geometry::Polygon(surfaces) => surfaces
                .iter()
                .flat_map(|s| std::iter::once(&s.exterior).chain(&s.interiors))
                .flat_map(|p| p.vertices())
                .any(&test),
            Geometry::Envelope(_) | Geometry::Other(_) => false,
        })
}

fn parse_field_type(name: &str) -> Option<FieldType> {
    match name.to_ascii_lowercase().as_str() {
        "integer" => Some(FieldType::Integer),
        "double" => Some(FieldType::Double),
        "string" | "text" => Some(FieldType::Text),
        "boolean" => Some(FieldType::Boolean),
        _ => None,
    }
}

fn parse_declared_fields(declared: &JsonValue, context: &str) -> ProviderResult<Vec<Field>> {
    let entries = declared
        .as_array()
        .ok_or_else(|| format_error(context, "'fields' must be an array"))?;

    entries
        .iter()
        .map(|entry| {
            let name = entry
                .get("name")
                .and_then(JsonValue::as_str)
                .ok_or_else(|| format_error(context, "field entry without a name"))?;
            let type_name = entry.get("type").and_then(JsonValue::as_str).unwrap_or("String");
            let field_type = parse_field_type(type_name)
                .ok_or_else(|| format_error(context, format!("field '{name}' has unknown type '{type_name}'")))?;
            let editable = entry.get("editable").and_then(JsonValue::as_bool).unwrap_or(true);
            Ok(Field::new(name, field_type).with_editable(editable))
        })
        .collect()
}

fn merge_types(current: Option<FieldType>, value: &FieldValue) -> Option<FieldType> {
    let observed = match value {
        FieldValue::Null => return current,
        FieldValue::Integer(_) => FieldType::Integer,
        FieldValue::Double(_) => FieldType::Double,
        FieldValue::Text(_) => FieldType::Text,
        FieldValue::Boolean(_) => FieldType::Boolean,
    };
    Some(match (current, observed) {
        (None, observed) => observed,
        (Some(a), b) if a == b => a,
        (Some(FieldType::Integer), FieldType::Double) | (Some(FieldType::Double), FieldType::Integer) => {
            FieldType::Double
        },
        _ => FieldType::Text,
    })
}

fn infer_fields(records: &[Record]) -> Vec<Field> {
    let mut types: BTreeMap<&str, Option<FieldType>> = BTreeMap::new();
    for record in records {
        for (name, value) in &record.attributes {
            let entry = types.entry(name.as_str()).or_insert(None);
            *entry = merge_types(*entry, value);
        }
    }

    types
        .into_iter()
        .map(|(name, field_type)| Field::new(name, field_type.unwrap_or(FieldType::Text)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const WELLS: &str = r#"{
      "type": "FeatureCollection",
      "crs": { "type": "name", "properties": { "name": "urn:ogc:def:crs:EPSG::2056" } },
      "features": [
        { "type": "Feature", "id": 10,
          "geometry": { "type": "Point", "coordinates": [2600000.0, 1200000.0, 450.5] },
          "properties": { "name": "north", "depth": 12 } },
        { "type": "Feature",
          "geometry": { "type": "Point", "coordinates": [2600100.0, 1200100.0, 440.0] },
          "properties": { "name": "south", "depth": 7.5, "active": true } }
      ]
    }"#;

    #[test]
    fn test_parse_feature_collection() {
        let layer = parse_geojson_bytes(WELLS.as_bytes(), "wells").unwrap();

        assert_eq!(
            layer.kind,
            CollectionKind::FeatureClass {
                shape_type: ShapeType::Point
            }
        );
        assert_eq!(layer.spatial_reference, Some(SpatialReference(2056)));
        assert_eq!(layer.records.len(), 2);
        assert_eq!(layer.records[0].oid, Some(10));
        assert_eq!(layer.records[1].oid, Some(11));
        assert!(layer.schema.has_z());
        assert!(!layer.schema.is_planar());

        let shape = layer.records[0].shape.as_ref().unwrap();
        assert_eq!(shape.geometry, Geometry::Point(Vertex::with_z(2600000.0, 1200000.0, 450.5)));
        assert_eq!(shape.spatial_reference, Some(SpatialReference(2056)));
    }

    #[test]
    fn test_schema_inference() {
        let layer = parse_geojson_bytes(WELLS.as_bytes(), "wells").unwrap();
        let schema = &layer.schema;

        let names: Vec<_> = schema.fields().iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["OBJECTID", "Shape", "active", "depth", "name"]);
        let depth = schema.field(schema.find_field("depth").unwrap()).unwrap();
        assert_eq!(depth.field_type, FieldType::Double);
        let active = schema.field(schema.find_field("active").unwrap()).unwrap();
        assert_eq!(active.field_type, FieldType::Boolean);
    }

    #[test]
    fn test_declared_metadata_wins() {
        let doc = r#"{
          "type": "FeatureCollection",
          "shapeType": "Polyline",
          "hasZ": false,
          "oidField": "FID",
          "fields": [
            { "name": "name", "type": "String" },
            { "name": "length", "type": "Double", "editable": false }
          ],
          "features": []
        }"#;
        let layer = parse_geojson_bytes(doc.as_bytes(), "empty").unwrap();

        assert_eq!(layer.kind.shape_type(), Some(ShapeType::Polyline));
        assert_eq!(layer.schema.oid_field(), "FID");
        assert_eq!(layer.schema.fields().len(), 4);
        assert!(!layer.schema.field(3).unwrap().editable);
    }

    #[test]
    fn test_features_without_geometry_form_a_table() {
        let doc = r#"{ "type": "FeatureCollection", "features": [
          { "type": "Feature", "geometry": null, "properties": { "OBJECTID": 4, "owner": "x" } }
        ] }"#;
        let layer = parse_geojson_bytes(doc.as_bytes(), "owners").unwrap();

        assert_eq!(layer.kind, CollectionKind::Table);
        assert_eq!(layer.records[0].oid, Some(4));
        assert!(layer.records[0].value("OBJECTID").is_none());
        assert_eq!(layer.schema.shape_field(), None);
    }

    #[test]
    fn test_polygon_with_hole() {
        let doc = r#"{ "type": "Feature", "properties": {}, "geometry": { "type": "Polygon",
          "coordinates": [
            [[0,0],[10,0],[10,10],[0,10],[0,0]],
            [[2,2],[3,2],[3,3],[2,2]]
          ] } }"#;
        let layer = parse_geojson_bytes(doc.as_bytes(), "parcel").unwrap();

        let Geometry::Polygon(surfaces) = &layer.records[0].shape.as_ref().unwrap().geometry else {
            panic!("expected a polygon");
        };
        assert_eq!(surfaces.len(), 1);
        assert_eq!(surfaces[0].exterior.vertices().len(), 5);
        assert_eq!(surfaces[0].interiors.len(), 1);
        assert_eq!(layer.records[0].oid, Some(1));
    }

    #[test]
    fn test_multipoint_is_other() {
        let doc = r#"{ "type": "MultiPoint", "coordinates": [[0,0],[1,1]] }"#;
        let layer = parse_geojson_bytes(doc.as_bytes(), "mp").unwrap();
        assert_eq!(layer.kind.shape_type(), Some(ShapeType::Other));
    }

    #[test]
    fn test_feature_sequence() {
        let doc = concat!(
            r#"{"type":"Feature","geometry":{"type":"Point","coordinates":[1,2]},"properties":{"a":1}}"#,
            "\n\n",
            r#"{"type":"Feature","geometry":{"type":"Point","coordinates":[3,4]},"properties":{"a":2}}"#,
            "\n"
        );
        let layer = parse_geojson_bytes(doc.as_bytes(), "seq").unwrap();
        assert_eq!(layer.records.len(), 2);
    }

    #[test]
    fn test_invalid_input() {
        let err = parse_geojson_bytes(b"not json", "broken").unwrap_err();
        assert!(matches!(err, ProviderError::Format { .. }));

        let short = r#"{ "type": "Point", "coordinates": [1] }"#;
        assert!(parse_geojson_bytes(short.as_bytes(), "short").is_err());
    }
}
