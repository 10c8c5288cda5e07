//! Scan utilities running against the `GeoJSON` provider.

use std::fs;

use geoscan_core::GeoScanError;
use geoscan_core::copier::copy_features;
use geoscan_core::error::{CursorError, QueryError};
use geoscan_core::extent::find_extent;
use geoscan_core::nearest::{NearestResult, find_nearest_with_radius, nearest_feature};
use geoscan_core::operations::{SearchOptions, copy, describe, list_ids, nearest};
use geoscan_core::providers::find_provider;
use geoscan_core_common::{FeatureCollection, FieldValue, Geometry, Shape, Vertex, Workspace};
use geoscan_geojson::DirectoryWorkspace;
use tempfile::TempDir;

const HYDRANTS: &str = r#"{
  "type": "FeatureCollection",
  "crs": { "type": "name", "properties": { "name": "EPSG:2056" } },
  "features": [
    { "type": "Feature", "id": 1, "geometry": { "type": "Point", "coordinates": [2600000.0, 1200000.0, 410.0] }, "properties": { "status": "active", "pressure": 6.5 } },
    { "type": "Feature", "id": 2, "geometry": { "type": "Point", "coordinates": [2600050.0, 1200020.0, 412.0] }, "properties": { "status": "retired", "pressure": null } },
    { "type": "Feature", "id": 3, "geometry": { "type": "Point", "coordinates": [2600200.0, 1200150.0, 420.5] }, "properties": { "status": "active", "pressure": 5 } },
    { "type": "Feature", "id": 4, "geometry": null, "properties": { "status": "planned", "pressure": null } }
  ]
}"#;

const ARCHIVE: &str = r#"{
  "type": "FeatureCollection",
  "crs": { "type": "name", "properties": { "name": "EPSG:2056" } },
  "shapeType": "Point",
  "hasZ": false,
  "fields": [
    { "name": "STATUS", "type": "String" },
    { "name": "note", "type": "String" }
  ],
  "features": []
}"#;

const OWNERS: &str = r#"{ "type": "FeatureCollection", "features": [
  { "type": "Feature", "geometry": null, "properties": { "OBJECTID": 7, "parcel_no": 4711 } }
] }"#;

fn fixture() -> TempDir {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("hydrants.geojson"), HYDRANTS).unwrap();
    fs::write(dir.path().join("archive.geojson"), ARCHIVE).unwrap();
    fs::write(dir.path().join("owners.geojson"), OWNERS).unwrap();
    dir
}

fn reference() -> Shape {
    Shape::point(2600040.0, 1200020.0)
}

#[test]
fn test_nearest_over_files() {
    let dir = fixture();
    let workspace = DirectoryWorkspace::open(dir.path()).unwrap();
    let provider = find_provider("GeoJSON").unwrap();

    let result = nearest(&workspace, &provider, "hydrants", &reference(), &SearchOptions::default()).unwrap();
    assert_eq!(result.oid, Some(2));
    assert!((result.distance - 10.0).abs() < 1e-9);

    let active = SearchOptions {
        radius: None,
        where_clause: Some("status = 'active'".to_string()),
    };
    let result = nearest(&workspace, &provider, "hydrants", &reference(), &active).unwrap();
    assert_eq!(result.oid, Some(1));
}

#[test]
fn test_nearest_with_radius() {
    let dir = fixture();
    let workspace = DirectoryWorkspace::open(dir.path()).unwrap();
    let hydrants = workspace.collection("hydrants").unwrap();

    let outside = find_nearest_with_radius(&reference(), hydrants, 5.0, None).unwrap();
    assert_eq!(outside, NearestResult::NONE);

    let inside = find_nearest_with_radius(&reference(), hydrants, 15.0, None).unwrap();
    assert_eq!(inside.oid, Some(2));

    // A non-positive radius disables the buffer: only features touching the reference qualify.
    let unbuffered = find_nearest_with_radius(&reference(), hydrants, 0.0, None).unwrap();
    assert!(!unbuffered.is_found());

    assert_eq!(hydrants.open_handles(), 0);
}

#[test]
fn test_nearest_feature_keeps_z() {
    let dir = fixture();
    let workspace = DirectoryWorkspace::open(dir.path()).unwrap();
    let hydrants = workspace.open_collection("hydrants").unwrap();

    let record = nearest_feature(&reference(), hydrants).unwrap().unwrap();
    assert_eq!(record.oid, Some(2));
    assert_eq!(
        record.shape.unwrap().geometry,
        Geometry::Point(Vertex::with_z(2600050.0, 1200020.0, 412.0))
    );
}

#[test]
fn test_errors_are_classified() {
    let dir = fixture();
    let workspace = DirectoryWorkspace::open(dir.path()).unwrap().with_handle_limit(0);
    let provider = find_provider("GeoJSON").unwrap();

    let err = nearest(&workspace, &provider, "hydrants", &reference(), &SearchOptions::default()).unwrap_err();
    assert!(matches!(
        err,
        GeoScanError::Cursor(CursorError::ResourceExhaustion { limit: 0, .. })
    ));

    let workspace = DirectoryWorkspace::open(dir.path()).unwrap();
    let bad_where = SearchOptions {
        radius: Some(10.0),
        where_clause: Some("status ==".to_string()),
    };
    let err = nearest(&workspace, &provider, "hydrants", &reference(), &bad_where).unwrap_err();
    assert!(matches!(err, GeoScanError::Query(QueryError::Syntax { .. })));

    let err = nearest(&workspace, &provider, "missing", &reference(), &SearchOptions::default()).unwrap_err();
    assert!(matches!(err, GeoScanError::Provider(_)));
}

#[test]
fn test_extent_skips_tables() {
    let dir = fixture();
    let workspace = DirectoryWorkspace::open(dir.path()).unwrap();

    let extent = find_extent(&workspace, None).unwrap().unwrap();
    assert_eq!(extent.center(), (2600100.0, 1200075.0));
    assert!((extent.width() - 250.0).abs() < 1e-6);
    assert!((extent.height() - 187.5).abs() < 1e-6);
}

#[test]
fn test_copy_flattens_into_planar_target() {
    let dir = fixture();
    let workspace = DirectoryWorkspace::open(dir.path()).unwrap();
    let provider = find_provider("GeoJSON").unwrap();

    let written = copy(&workspace, &provider, "hydrants", "archive", Some("status = 'active'")).unwrap();
    assert_eq!(written, 2);
    assert_eq!(workspace.save().unwrap(), 1);

    let reopened = DirectoryWorkspace::open(dir.path()).unwrap();
    let archive = reopened.collection("archive").unwrap();
    let layer = archive.to_layer();
    assert_eq!(layer.records.len(), 2);
    assert_eq!(
        layer.records[0].shape.as_ref().unwrap().geometry,
        Geometry::Point(Vertex::new(2600000.0, 1200000.0))
    );
    assert_eq!(
        layer.records[0].value("STATUS"),
        Some(&FieldValue::Text("active".to_string()))
    );
    assert_eq!(layer.records[0].value("note"), Some(&FieldValue::Null));
}

#[test]
fn test_copy_without_matches_leaves_target_untouched() {
    let dir = fixture();
    let workspace = DirectoryWorkspace::open(dir.path()).unwrap();
    let source = workspace.open_collection("hydrants").unwrap();
    let target = workspace.open_collection("archive").unwrap();

    assert_eq!(copy_features(source, target, Some("status = 'demolished'")).unwrap(), 0);
    assert_eq!(workspace.save().unwrap(), 0);
}

#[test]
fn test_copy_into_table_is_rejected() {
    let dir = fixture();
    let workspace = DirectoryWorkspace::open(dir.path()).unwrap();
    let source = workspace.open_collection("hydrants").unwrap();
    let target = workspace.open_collection("owners").unwrap();

    let err = copy_features(source, target, None).unwrap_err();
    assert!(matches!(err, GeoScanError::Geometry(_)));
    assert_eq!(target.feature_count(None).unwrap(), 1);
}

#[test]
fn test_ids_and_describe() {
    let dir = fixture();
    let workspace = DirectoryWorkspace::open(dir.path()).unwrap();
    let provider = find_provider("GeoJSON").unwrap();

    assert_eq!(
        list_ids(&workspace, &provider, "hydrants", Some("pressure IS NOT NULL"), None).unwrap(),
        vec![1, 3]
    );
    assert_eq!(
        list_ids(&workspace, &provider, "owners", None, Some("parcel_no")).unwrap(),
        vec![4711]
    );

    let infos = describe(&workspace, None).unwrap();
    let names: Vec<_> = infos.iter().map(|info| info.name.as_str()).collect();
    assert_eq!(names, vec!["archive", "hydrants", "owners"]);
    assert_eq!(infos[1].wkid, Some(2056));
    assert_eq!(infos[2].shape_type, None);
}
