//! Durable key-value string stores.
//!
//! The run record lives in a small string store that survives restarts.
//! Integers and booleans are stored as their string forms.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use parking_lot::Mutex;
use tracing::{debug, warn};

use crate::error::{RunnerError, RunnerResult};

/// A durable string key-value store.
pub trait KvStore: Send + Sync {
    fn get_string(&self, key: &str) -> Option<String>;

    fn set_string(&self, key: &str, value: &str) -> RunnerResult<()>;

    fn delete_key(&self, key: &str) -> RunnerResult<()>;

    /// Write several entries at once. Stores that can do this atomically
    /// should override it.
    fn set_many(&self, entries: &[(&str, String)]) -> RunnerResult<()> {
        for (key, value) in entries {
            self.set_string(key, value)?;
        }
        Ok(())
    }

    /// Delete several keys at once.
    fn delete_many(&self, keys: &[&str]) -> RunnerResult<()> {
        for key in keys {
            self.delete_key(key)?;
        }
        Ok(())
    }

    fn has_key(&self, key: &str) -> bool {
        self.get_string(key).is_some()
    }

    fn get_int(&self, key: &str) -> Option<i64> {
        self.get_string(key)?.trim().parse().ok()
    }

    fn set_int(&self, key: &str, value: i64) -> RunnerResult<()> {
        self.set_string(key, &value.to_string())
    }

    fn get_bool(&self, key: &str) -> Option<bool> {
        self.get_string(key)?.trim().parse().ok()
    }

    fn set_bool(&self, key: &str, value: bool) -> RunnerResult<()> {
        self.set_string(key, if value { "true" } else { "false" })
    }
}

/// In-memory store, for tests and throwaway sessions.
#[derive(Debug, Default)]
pub struct MemoryKvStore {
    entries: Mutex<BTreeMap<String, String>>,
}

impl MemoryKvStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of all entries.
    pub fn entries(&self) -> BTreeMap<String, String> {
        self.entries.lock().clone()
    }
}

impl KvStore for MemoryKvStore {
    fn get_string(&self, key: &str) -> Option<String> {
        self.entries.lock().get(key).cloned()
    }

    fn set_string(&self, key: &str, value: &str) -> RunnerResult<()> {
        self.entries.lock().insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn delete_key(&self, key: &str) -> RunnerResult<()> {
        self.entries.lock().remove(key);
        Ok(())
    }
}

/// Store backed by a single JSON object file.
///
/// Every mutation rewrites the file through a temporary file and a rename,
/// so a crash never leaves a half-written file behind.
#[derive(Debug)]
pub struct FileKvStore {
    path: PathBuf,
    entries: Mutex<BTreeMap<String, String>>,
}

impl FileKvStore {
    /// Open the store at `path`.
    ///
    /// A missing file is an empty store. So is an unreadable one: the next
    /// write replaces it.
    pub fn open(path: impl AsRef<Path>) -> RunnerResult<Self> {
        let path = path.as_ref().to_path_buf();
        let entries = match fs::read(&path) {
            Ok(bytes) => match serde_json::from_slice::<BTreeMap<String, String>>(&bytes) {
                Ok(entries) => entries,
                Err(e) => {
                    warn!("State file {:?} is corrupt, starting empty: {}", path, e);
                    BTreeMap::new()
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => BTreeMap::new(),
            Err(e) => {
                warn!("State file {:?} is unreadable, starting empty: {}", path, e);
                BTreeMap::new()
            }
        };

        debug!("Opened state store {:?} ({} keys)", path, entries.len());
        Ok(Self {
            path,
            entries: Mutex::new(entries),
        })
    }

    /// Get the backing file path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn persist(&self, entries: &BTreeMap<String, String>) -> RunnerResult<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }

        let tmp = self.path.with_extension("json.tmp");
        let json = serde_json::to_string_pretty(entries)?;
        fs::write(&tmp, json)?;
        fs::rename(&tmp, &self.path).map_err(|e| RunnerError::Store {
            path: self.path.clone(),
            message: e.to_string(),
        })
    }

    fn mutate(&self, apply: impl FnOnce(&mut BTreeMap<String, String>)) -> RunnerResult<()> {
        let mut entries = self.entries.lock();
        let mut next = entries.clone();
        apply(&mut next);
        self.persist(&next)?;
        *entries = next;
        Ok(())
    }
}

impl KvStore for FileKvStore {
    fn get_string(&self, key: &str) -> Option<String> {
        self.entries.lock().get(key).cloned()
    }

    fn set_string(&self, key: &str, value: &str) -> RunnerResult<()> {
        self.mutate(|entries| {
            entries.insert(key.to_string(), value.to_string());
        })
    }

    fn delete_key(&self, key: &str) -> RunnerResult<()> {
        self.mutate(|entries| {
            entries.remove(key);
        })
    }

    fn set_many(&self, items: &[(&str, String)]) -> RunnerResult<()> {
        self.mutate(|entries| {
            for (key, value) in items {
                entries.insert(key.to_string(), value.clone());
            }
        })
    }

    fn delete_many(&self, keys: &[&str]) -> RunnerResult<()> {
        self.mutate(|entries| {
            for key in keys {
                entries.remove(*key);
            }
        })
    }
}
