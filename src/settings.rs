//! Settings Store
//!
//! The flat string-keyed persistence substrate everything else sits on.
//! The store itself is opaque to the chain logic: `get`/`set`/`remove`
//! plus an explicit `save` flush that is assumed durable once it
//! returns. [`FileStore`] keeps the map in a pretty-printed JSON file;
//! [`MemoryStore`] backs the test suite.

use crate::plugin_host::{HostError, HostResult};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// String-keyed settings store with an explicit durability point
pub trait SettingsStore: Send {
    /// Read a value; absent keys yield `None`
    fn get(&self, key: &str) -> Option<String>;

    /// Write a value
    fn set(&mut self, key: &str, value: &str) -> HostResult<()>;

    /// Remove a key; removing an absent key is a no-op
    fn remove(&mut self, key: &str) -> HostResult<()>;

    /// Flush to durable storage
    fn save(&mut self) -> HostResult<()>;
}

/// In-memory store for tests and ephemeral sessions
#[derive(Default)]
pub struct MemoryStore {
    values: BTreeMap<String, String>,
    /// Number of completed flushes (lets tests assert flush-on-write)
    save_count: usize,
}

impl MemoryStore {
    /// Create an empty in-memory store
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of `save` calls so far
    pub fn save_count(&self) -> usize {
        self.save_count
    }
}

impl SettingsStore for MemoryStore {
    fn get(&self, key: &str) -> Option<String> {
        self.values.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: &str) -> HostResult<()> {
        self.values.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&mut self, key: &str) -> HostResult<()> {
        self.values.remove(key);
        Ok(())
    }

    fn save(&mut self) -> HostResult<()> {
        self.save_count += 1;
        Ok(())
    }
}

/// JSON-file-backed store
///
/// The whole map is rewritten on every `save`. Keys sort in the file
/// (BTreeMap), so the file diffs cleanly under version control.
pub struct FileStore {
    path: PathBuf,
    values: BTreeMap<String, String>,
}

impl FileStore {
    /// Open a store at `path`, loading any existing contents.
    /// A missing file yields an empty store; it is created on first save.
    pub fn open(path: &Path) -> HostResult<Self> {
        let values = if path.exists() {
            let data = std::fs::read_to_string(path)?;
            serde_json::from_str(&data).map_err(|e| HostError::Serde(e.to_string()))?
        } else {
            BTreeMap::new()
        };
        Ok(Self {
            path: path.to_path_buf(),
            values,
        })
    }

    /// The file this store persists to
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl SettingsStore for FileStore {
    fn get(&self, key: &str) -> Option<String> {
        self.values.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: &str) -> HostResult<()> {
        self.values.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&mut self, key: &str) -> HostResult<()> {
        self.values.remove(key);
        Ok(())
    }

    fn save(&mut self) -> HostResult<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let data = serde_json::to_string_pretty(&self.values)
            .map_err(|e| HostError::Serde(e.to_string()))?;
        std::fs::write(&self.path, data)?;
        Ok(())
    }
}
