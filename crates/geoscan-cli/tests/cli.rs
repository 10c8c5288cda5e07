use std::fs;
use std::path::Path;

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

const HYDRANTS: &str = r#"{
  "type": "FeatureCollection",
  "crs": { "type": "name", "properties": { "name": "EPSG:2056" } },
  "features": [
    { "type": "Feature", "id": 1, "geometry": { "type": "Point", "coordinates": [0.0, 0.0, 410.0] }, "properties": { "status": "active" } },
    { "type": "Feature", "id": 2, "geometry": { "type": "Point", "coordinates": [10.0, 0.0, 412.0] }, "properties": { "status": "retired" } },
    { "type": "Feature", "id": 3, "geometry": { "type": "Point", "coordinates": [20.0, 10.0, 415.0] }, "properties": { "status": "active" } }
  ]
}"#;

const ARCHIVE: &str = r#"{
  "type": "FeatureCollection",
  "crs": { "type": "name", "properties": { "name": "EPSG:2056" } },
  "shapeType": "Point",
  "fields": [ { "name": "status", "type": "String" } ],
  "features": []
}"#;

const PIPES: &str = r#"{
  "type": "FeatureCollection",
  "features": [
    { "type": "Feature", "id": 1, "geometry": { "type": "LineString", "coordinates": [[100.0, 100.0], [140.0, 100.0]] }, "properties": {} }
  ]
}"#;

fn workspace() -> TempDir {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("hydrants.geojson"), HYDRANTS).unwrap();
    fs::write(dir.path().join("archive.geojson"), ARCHIVE).unwrap();
    fs::create_dir(dir.path().join("utilities")).unwrap();
    fs::write(dir.path().join("utilities").join("pipes.geojson"), PIPES).unwrap();
    dir
}

fn geoscan() -> Command {
    Command::cargo_bin("geoscan").unwrap()
}

fn path(dir: &Path) -> &str {
    dir.to_str().unwrap()
}

#[test]
fn test_providers_table() {
    geoscan()
        .arg("providers")
        .assert()
        .success()
        .stdout(predicate::str::contains("GeoJSON"))
        .stdout(predicate::str::contains("Not Supported"));
}

#[test]
fn test_nearest() {
    let dir = workspace();
    geoscan()
        .args(["nearest", "--workspace", path(dir.path()), "--layer", "hydrants"])
        .args(["--reference", "POINT (8 1)"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Nearest feature: OID 2 at distance 2.236"));
}

#[test]
fn test_nearest_with_where_and_radius() {
    let dir = workspace();
    geoscan()
        .args(["nearest", "--workspace", path(dir.path()), "--layer", "hydrants"])
        .args(["--reference", "POINT (8 1)", "--where", "status = 'active'", "--radius", "5"])
        .assert()
        .success()
        .stdout(predicate::str::contains("No feature found."));

    geoscan()
        .args(["nearest", "--workspace", path(dir.path()), "--layer", "hydrants"])
        .args(["--reference", "POINT (8 1)", "--where", "status = 'active'", "--radius", "-1"])
        .assert()
        .success()
        .stdout(predicate::str::contains("No feature found."));
}

#[test]
fn test_nearest_rejects_bad_where() {
    let dir = workspace();
    geoscan()
        .args(["nearest", "--workspace", path(dir.path()), "--layer", "hydrants"])
        .args(["--reference", "POINT (8 1)", "--where", "status = "])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Invalid where clause"));
}

#[test]
fn test_nearest_layer_outside_dataset() {
    let dir = workspace();
    geoscan()
        .args(["nearest", "--workspace", path(dir.path()), "--layer", "hydrants"])
        .args(["--reference", "POINT (0 0)", "--dataset", "utilities"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("is not a feature class of dataset"));
}

#[test]
fn test_extent() {
    let dir = workspace();
    geoscan()
        .args(["extent", "--workspace", path(dir.path())])
        .assert()
        .success()
        .stdout(predicate::str::contains("Extent: -2.500, -1.250 : 22.500, 11.250"));

    geoscan()
        .args(["extent", "--workspace", path(dir.path()), "--dataset", "utilities"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Extent: 95.000, 100.000 : 145.000, 100.000"));
}

#[test]
fn test_copy_saves_target() {
    let dir = workspace();
    geoscan()
        .args(["copy", "--workspace", path(dir.path())])
        .args(["--source", "hydrants", "--target", "archive", "--where", "status = 'active'"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Copied 2 feature(s)"));

    let saved: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(dir.path().join("archive.geojson")).unwrap()).unwrap();
    let features = saved["features"].as_array().unwrap();
    assert_eq!(features.len(), 2);
    assert_eq!(features[1]["properties"]["status"], "active");
    assert_eq!(features[1]["geometry"]["coordinates"][0], 20.0);
}

#[test]
fn test_copy_to_output_file() {
    let dir = workspace();
    let output = dir.path().join("out.geojson");
    geoscan()
        .args(["copy", "--workspace", path(dir.path())])
        .args(["--source", "hydrants", "--target", "archive", "--output", path(&output)])
        .assert()
        .success();

    let saved: serde_json::Value = serde_json::from_str(&fs::read_to_string(&output).unwrap()).unwrap();
    assert_eq!(saved["features"].as_array().unwrap().len(), 3);

    let untouched = fs::read_to_string(dir.path().join("archive.geojson")).unwrap();
    assert_eq!(untouched, ARCHIVE);
}

#[test]
fn test_ids() {
    let dir = workspace();
    geoscan()
        .args(["ids", "--workspace", path(dir.path()), "--layer", "hydrants"])
        .args(["--where", "status <> 'retired'"])
        .assert()
        .success()
        .stdout("1\n3\n");
}

#[test]
fn test_info() {
    let dir = workspace();
    geoscan()
        .args(["info", "--workspace", path(dir.path())])
        .assert()
        .success()
        .stdout(predicate::str::contains("hydrants"))
        .stdout(predicate::str::contains("utilities"))
        .stdout(predicate::str::contains("ObjectID"));
}

#[test]
fn test_unknown_provider() {
    let dir = workspace();
    geoscan()
        .args(["--provider", "Excel", "extent", "--workspace", path(dir.path())])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Provider 'Excel' not found."));
}

#[test]
fn test_missing_workspace() {
    geoscan()
        .args(["extent", "--workspace", "/definitely/not/here"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to open workspace"));
}
