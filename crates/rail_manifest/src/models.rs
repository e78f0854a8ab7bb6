//! Manifest data models.
//!
//! These mirror the JSON files shipped with a railway project. Field names
//! follow the on-disk camelCase keys.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// The railway manifest (`railway.json`).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ManifestRailway {
    /// Id of the remote railway this project belongs to.
    pub railway_id: u64,
    /// Station order (as a string key) to manifest file name.
    #[serde(default)]
    pub stations: Option<HashMap<String, String>>,
}

impl ManifestRailway {
    pub fn new(railway_id: u64) -> Self {
        Self {
            railway_id,
            stations: None,
        }
    }

    /// Map a station order to a manifest file.
    pub fn with_station(mut self, order: u32, file_name: impl Into<String>) -> Self {
        self.stations
            .get_or_insert_with(HashMap::new)
            .insert(order.to_string(), file_name.into());
        self
    }

    /// Resolve a remote station order to the manifest file describing it.
    pub fn station_file(&self, order: u32) -> Option<&str> {
        self.stations
            .as_ref()?
            .get(&order.to_string())
            .map(|s| s.as_str())
    }

    /// Number of stations with a local manifest.
    pub fn station_count(&self) -> usize {
        self.stations.as_ref().map_or(0, |s| s.len())
    }
}

/// A station manifest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManifestStation {
    pub name: String,
    pub id: u64,
    /// Setup commands, run in order before the tests.
    #[serde(default)]
    pub prepare: Option<Vec<StationPrepare>>,
    #[serde(default)]
    pub tests: Vec<StationTest>,
}

impl ManifestStation {
    pub fn new(id: u64, name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            id,
            prepare: None,
            tests: Vec::new(),
        }
    }

    pub fn with_test(mut self, test: StationTest) -> Self {
        self.tests.push(test);
        self
    }

    pub fn with_prepare(mut self, prepare: StationPrepare) -> Self {
        self.prepare.get_or_insert_with(Vec::new).push(prepare);
        self
    }

    /// The single test of the station, if it has exactly one.
    pub fn single_test(&self) -> Option<&StationTest> {
        match self.tests.as_slice() {
            [test] => Some(test),
            _ => None,
        }
    }
}

/// A setup command.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StationPrepare {
    pub command: String,
    #[serde(default)]
    pub background: bool,
}

/// A test definition inside a station manifest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StationTest {
    /// Executor type, e.g. `unity`.
    #[serde(rename = "type")]
    pub test_type: String,
    #[serde(default)]
    pub title: Option<String>,
    /// Bare test name or a `category:`, `group:` or `test:` selector.
    pub command: String,
    #[serde(default)]
    pub args: Vec<String>,
    #[serde(default)]
    pub shell: bool,
}

impl StationTest {
    pub fn new(test_type: impl Into<String>, command: impl Into<String>) -> Self {
        Self {
            test_type: test_type.into(),
            title: None,
            command: command.into(),
            args: Vec::new(),
            shell: false,
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    /// Title for display, falling back to the command.
    pub fn display_name(&self) -> &str {
        self.title.as_deref().unwrap_or(&self.command)
    }
}
