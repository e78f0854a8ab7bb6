//! Manifest file reading.

use std::fs;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use crate::error::{ManifestError, ManifestResult};
use crate::models::{ManifestRailway, ManifestStation};

/// Manifest directory relative to the project root.
pub const MANIFEST_DIR: &str = ".techtrain/manifests";

/// Railway manifest file name.
pub const RAILWAY_FILE: &str = "railway.json";

/// Read-only access to a manifest directory.
///
/// Files are read on every call, so edits to the manifests are picked up
/// by the next reload without rebuilding the store.
#[derive(Debug, Clone)]
pub struct ManifestStore {
    root: PathBuf,
}

impl ManifestStore {
    /// Open a manifest directory.
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    /// Open the manifest directory of a project.
    pub fn for_project(project_root: impl AsRef<Path>) -> Self {
        Self::new(project_root.as_ref().join(MANIFEST_DIR))
    }

    /// Get the manifest directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path of the railway manifest.
    pub fn railway_path(&self) -> PathBuf {
        self.root.join(RAILWAY_FILE)
    }

    /// Read the railway manifest.
    pub fn get_railway(&self) -> ManifestResult<ManifestRailway> {
        self.read_json(&self.railway_path())
    }

    /// Read the manifest of the station at `order`.
    ///
    /// Fails when the order has no entry in the railway manifest or the
    /// station file cannot be read.
    pub fn load_station(&self, order: u32) -> ManifestResult<ManifestStation> {
        let railway = self.get_railway()?;
        self.load_mapped_station(&railway, order)
    }

    /// Read the manifest of the station at `order` through an already loaded
    /// railway manifest.
    pub fn load_mapped_station(
        &self,
        railway: &ManifestRailway,
        order: u32,
    ) -> ManifestResult<ManifestStation> {
        let file_name = railway
            .station_file(order)
            .ok_or(ManifestError::StationNotMapped(order))?;
        self.read_json(&self.root.join(file_name))
    }

    /// Read the manifest of the station at `order`, or `None` if it is
    /// missing or unreadable.
    pub fn get_station(&self, order: u32) -> Option<ManifestStation> {
        match self.load_station(order) {
            Ok(station) => Some(station),
            Err(e) => {
                warn!("Station manifest for order {} unavailable: {}", order, e);
                None
            }
        }
    }

    fn read_json<T: DeserializeOwned>(&self, path: &Path) -> ManifestResult<T> {
        debug!("Reading manifest from {:?}", path);

        if !path.exists() {
            return Err(ManifestError::NotFound(path.to_path_buf()));
        }

        let content = fs::read_to_string(path)?;
        serde_json::from_str(&content).map_err(|e| ManifestError::InvalidFormat {
            path: path.to_path_buf(),
            message: e.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write(dir: &Path, name: &str, content: &str) {
        fs::write(dir.join(name), content).unwrap();
    }

    #[test]
    fn test_missing_railway_manifest() {
        let temp = TempDir::new().unwrap();
        let store = ManifestStore::new(temp.path());

        let err = store.get_railway().unwrap_err();
        assert!(matches!(err, ManifestError::NotFound(_)));
    }

    #[test]
    fn test_invalid_railway_manifest() {
        let temp = TempDir::new().unwrap();
        write(temp.path(), RAILWAY_FILE, "{ not json");

        let store = ManifestStore::new(temp.path());
        let err = store.get_railway().unwrap_err();
        assert!(matches!(err, ManifestError::InvalidFormat { .. }));
    }

    #[test]
    fn test_station_lookup_goes_through_mapping() {
        let temp = TempDir::new().unwrap();
        write(
            temp.path(),
            RAILWAY_FILE,
            r#"{"railwayId": 3, "stations": {"2": "second.json"}}"#,
        );
        write(
            temp.path(),
            "second.json",
            r#"{"name": "Second", "id": 20, "tests": []}"#,
        );

        let store = ManifestStore::new(temp.path());
        assert_eq!(store.get_station(2).unwrap().name, "Second");
        assert!(store.get_station(1).is_none());
        assert!(matches!(
            store.load_station(1),
            Err(ManifestError::StationNotMapped(1))
        ));
    }

    #[test]
    fn test_unparseable_station_is_soft_failure() {
        let temp = TempDir::new().unwrap();
        write(
            temp.path(),
            RAILWAY_FILE,
            r#"{"railwayId": 3, "stations": {"1": "broken.json"}}"#,
        );
        write(temp.path(), "broken.json", "[1, 2");

        let store = ManifestStore::new(temp.path());
        assert!(store.get_station(1).is_none());
    }

    #[test]
    fn test_for_project_uses_manifest_dir() {
        let store = ManifestStore::for_project("/work/project");
        assert!(store.root().ends_with(".techtrain/manifests"));
        assert!(store.railway_path().ends_with("railway.json"));
    }
}
