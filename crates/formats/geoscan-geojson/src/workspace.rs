//! Directory-backed workspaces.
//!
//! Layout:
//!
//! ```text
//! city/                  workspace
//!   hydrants.geojson     top-level feature class "hydrants"
//!   owners.json          top-level table (no geometries) "owners"
//!   utilities/           feature dataset "utilities"
//!     pipes.geojson      feature class "pipes" inside the dataset
//! ```
//!
//! Files are loaded eagerly when the workspace is opened. Inserts stay in memory until
//! [`DirectoryWorkspace::save`] writes the modified collections back.

use std::fs;
use std::io::BufWriter;
use std::path::{Path, PathBuf};

use geoscan_core_common::{FeatureCollection, ProviderError, ProviderResult, Workspace};
use log::{debug, info};

use crate::collection::MemoryFeatureClass;
use crate::parser::parse_geojson_bytes;
use crate::writer::{GeoJsonWriterOptions, write_geojson};

const EXTENSIONS: [&str; 2] = ["geojson", "json"];

fn io_error(path: &Path, source: std::io::Error) -> ProviderError {
    ProviderError::Io {
        path: path.to_path_buf(),
        source,
    }
}

fn is_geojson_file(path: &Path) -> bool {
    path.is_file()
        && path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| EXTENSIONS.iter().any(|e| e.eq_ignore_ascii_case(ext)))
}

/// Loads one `GeoJSON` file as a collection named after the file stem.
///
/// # Errors
///
/// Returns [`ProviderError::Io`] if the file cannot be read and
/// [`ProviderError::Format`] if it is not valid `GeoJSON`.
pub fn load_collection(path: &Path) -> ProviderResult<MemoryFeatureClass> {
    let bytes = fs::read(path).map_err(|err| io_error(path, err))?;
    let name = path
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_default();
    let layer = parse_geojson_bytes(&bytes, &path.display().to_string())?;
    debug!("Loaded {} records from {}", layer.records.len(), path.display());
    Ok(MemoryFeatureClass::new(name, layer).with_source(path))
}

/// Writes a collection to `path` as a `GeoJSON` feature collection.
///
/// # Errors
///
/// Returns [`ProviderError::Io`] if the file cannot be created and
/// [`ProviderError::Format`] if writing fails.
pub fn save_collection(collection: &MemoryFeatureClass, path: &Path) -> ProviderResult<()> {
    let file = fs::File::create(path).map_err(|err| io_error(path, err))?;
    let mut writer = BufWriter::new(file);
    write_geojson(&mut writer, &collection.to_layer(), &GeoJsonWriterOptions::new().with_pretty(true))?;
    info!("Wrote '{}' to {}", collection.name(), path.display());
    Ok(())
}

fn sorted_entries(dir: &Path) -> ProviderResult<Vec<PathBuf>> {
    let mut entries = fs::read_dir(dir)
        .map_err(|err| io_error(dir, err))?
        .map(|entry| entry.map(|e| e.path()))
        .collect::<std::io::Result<Vec<_>>>()
        .map_err(|err| io_error(dir, err))?;
    entries.sort();
    Ok(entries)
}

fn load_dir(dir: &Path) -> ProviderResult<Vec<MemoryFeatureClass>> {
    sorted_entries(dir)?
        .into_iter()
        .filter(|path| is_geojson_file(path))
        .map(|path| load_collection(&path))
        .collect()
}

/// A directory of `GeoJSON` files, with subdirectories as feature datasets.
#[derive(Debug)]
pub struct DirectoryWorkspace {
    path: PathBuf,
    path_name: String,
    root: Vec<MemoryFeatureClass>,
    datasets: Vec<(String, Vec<MemoryFeatureClass>)>,
}

impl DirectoryWorkspace {
    /// Opens the workspace rooted at `path`, loading every collection.
    ///
    /// # Errors
    ///
    /// Returns [`ProviderError::NotFound`] if `path` is not a directory, and the
    /// errors of [`load_collection`] for any file that cannot be loaded.
    pub fn open(path: impl AsRef<Path>) -> ProviderResult<Self> {
        let path = path.as_ref();
        if !path.is_dir() {
            return Err(ProviderError::NotFound {
                name: path.display().to_string(),
            });
        }

        let root = load_dir(path)?;
        let mut datasets = Vec::new();
        for entry in sorted_entries(path)? {
            if entry.is_dir()
                && let Some(name) = entry.file_name().and_then(|n| n.to_str())
            {
                datasets.push((name.to_string(), load_dir(&entry)?));
            }
        }

        info!(
            "Opened workspace {} ({} collections, {} datasets)",
            path.display(),
            root.len(),
            datasets.len()
        );
        Ok(Self {
            path: path.to_path_buf(),
            path_name: path.display().to_string(),
            root,
            datasets,
        })
    }

    /// Returns the workspace with every collection's cursor pool resized.
    #[must_use]
    pub fn with_handle_limit(self, limit: usize) -> Self {
        let resize = |classes: Vec<MemoryFeatureClass>| -> Vec<MemoryFeatureClass> {
            classes.into_iter().map(|c| c.with_handle_limit(limit)).collect()
        };
        Self {
            root: resize(self.root),
            datasets: self
                .datasets
                .into_iter()
                .map(|(name, classes)| (name, resize(classes)))
                .collect(),
            ..self
        }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn all(&self) -> impl Iterator<Item = &MemoryFeatureClass> {
        self.root
            .iter()
            .chain(self.datasets.iter().flat_map(|(_, classes)| classes.iter()))
    }

    /// Looks up a loaded collection by name, root first.
    #[must_use]
    pub fn collection(&self, name: &str) -> Option<&MemoryFeatureClass> {
        self.all().find(|c| c.name() == name)
    }

    /// Writes every collection modified since loading back to its file.
    /// Returns the number of files written.
    ///
    /// # Errors
    ///
    /// Returns the errors of [`save_collection`].
    pub fn save(&self) -> ProviderResult<usize> {
        let mut written = 0;
        for collection in self.all().filter(|c| c.is_dirty()) {
            if let Some(path) = collection.source() {
                save_collection(collection, path)?;
                collection.mark_saved();
                written += 1;
            }
        }
        Ok(written)
    }

    /// Writes the named collection to an arbitrary file.
    ///
    /// # Errors
    ///
    /// Returns [`ProviderError::NotFound`] for an unknown collection and the errors
    /// of [`save_collection`].
    pub fn save_collection_to(&self, name: &str, path: &Path) -> ProviderResult<()> {
        let collection = self.collection(name).ok_or_else(|| ProviderError::NotFound {
            name: name.to_string(),
        })?;
        save_collection(collection, path)
    }
}

impl Workspace for DirectoryWorkspace {
    fn path_name(&self) -> &str {
        &self.path_name
    }

    fn dataset_names(&self) -> Vec<String> {
        self.datasets.iter().map(|(name, _)| name.clone()).collect()
    }

    fn collections(&self, dataset: Option<&str>) -> ProviderResult<Vec<&dyn FeatureCollection>> {
        let classes = match dataset {
            None => &self.root,
            Some(name) => self
                .datasets
                .iter()
                .find(|(dataset, _)| dataset == name)
                .map(|(_, classes)| classes)
                .ok_or_else(|| ProviderError::NotFound {
                    name: name.to_string(),
                })?,
        };
        Ok(classes.iter().map(|c| c as &dyn FeatureCollection).collect())
    }

    fn open_collection(&self, name: &str) -> ProviderResult<&dyn FeatureCollection> {
        self.collection(name)
            .map(|c| c as &dyn FeatureCollection)
            .ok_or_else(|| ProviderError::NotFound {
                name: name.to_string(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const POINTS: &str = r#"{"type":"FeatureCollection","features":[
      {"type":"Feature","id":1,"geometry":{"type":"Point","coordinates":[1,1]},"properties":{}}
    ]}"#;

    fn fixture() -> TempDir {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("b_points.geojson"), POINTS).unwrap();
        fs::write(dir.path().join("a_points.json"), POINTS).unwrap();
        fs::write(dir.path().join("notes.txt"), "ignored").unwrap();
        fs::create_dir(dir.path().join("utilities")).unwrap();
        fs::write(dir.path().join("utilities").join("pipes.geojson"), POINTS).unwrap();
        dir
    }

    #[test]
    fn test_layout() {
        let dir = fixture();
        let workspace = DirectoryWorkspace::open(dir.path()).unwrap();

        let root: Vec<_> = workspace.collections(None).unwrap().iter().map(|c| c.name().to_string()).collect();
        assert_eq!(root, vec!["a_points", "b_points"]);
        assert_eq!(workspace.dataset_names(), vec!["utilities"]);
        assert_eq!(workspace.collections(Some("utilities")).unwrap().len(), 1);
        assert!(workspace.open_collection("pipes").is_ok());
        assert!(matches!(
            workspace.collections(Some("missing")),
            Err(ProviderError::NotFound { .. })
        ));
    }

    #[test]
    fn test_open_missing_directory() {
        let dir = TempDir::new().unwrap();
        let err = DirectoryWorkspace::open(dir.path().join("nope")).unwrap_err();
        assert!(matches!(err, ProviderError::NotFound { .. }));
    }

    #[test]
    fn test_invalid_file_fails_open() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("broken.geojson"), "{").unwrap();
        assert!(matches!(
            DirectoryWorkspace::open(dir.path()),
            Err(ProviderError::Format { .. })
        ));
    }

    #[test]
    fn test_save_writes_only_modified_collections() {
        let dir = fixture();
        let workspace = DirectoryWorkspace::open(dir.path()).unwrap();
        assert_eq!(workspace.save().unwrap(), 0);

        let target = workspace.open_collection("b_points").unwrap();
        let mut sink = target.open_insert().unwrap();
        let mut row = geoscan_core_common::FeatureBuffer::for_schema(target.schema());
        row.shape = Some(geoscan_core_common::Shape::point(2.0, 2.0));
        sink.insert(row).unwrap();
        sink.flush().unwrap();
        drop(sink);

        assert_eq!(workspace.save().unwrap(), 1);
        let reopened = DirectoryWorkspace::open(dir.path()).unwrap();
        assert_eq!(reopened.open_collection("b_points").unwrap().feature_count(None).unwrap(), 2);
        assert_eq!(reopened.open_collection("a_points").unwrap().feature_count(None).unwrap(), 1);
    }

    #[test]
    fn test_handle_limit_applies_everywhere() {
        let dir = fixture();
        let workspace = DirectoryWorkspace::open(dir.path()).unwrap().with_handle_limit(0);
        let pipes = workspace.open_collection("pipes").unwrap();
        assert!(matches!(
            pipes.open_cursor(None).err(),
            Some(ProviderError::ResourceExhausted { limit: 0, .. })
        ));
    }
}
