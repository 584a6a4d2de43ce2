//! Plugin Registry
//!
//! The known-plugin catalog. Filled in by the embedding application's
//! scanner; persists to a JSON file so the catalog (and with it the
//! active chain) survives restarts.
//!
//! Iteration order is insertion order. The chain model depends on this:
//! plugins whose persisted order values tie are ranked by catalog
//! position, so the catalog must iterate deterministically.

use super::types::*;
use std::collections::HashMap;
use std::path::Path;
use tracing::warn;

/// Plugin catalog with deterministic iteration order
#[derive(Default)]
pub struct PluginRegistry {
    /// Plugins in insertion order
    plugins: Vec<PluginInfo>,
    /// Identity -> position in `plugins`
    index: HashMap<PluginId, usize>,
}

impl PluginRegistry {
    /// Create a new empty registry
    pub fn new() -> Self {
        Self {
            plugins: Vec::new(),
            index: HashMap::new(),
        }
    }

    /// Add a plugin, replacing any previous entry with the same identity
    /// (the replacement keeps the original catalog position)
    pub fn add_plugin(&mut self, info: PluginInfo) {
        match self.index.get(&info.id) {
            Some(&pos) => self.plugins[pos] = info,
            None => {
                self.index.insert(info.id.clone(), self.plugins.len());
                self.plugins.push(info);
            }
        }
    }

    /// Remove a plugin from the catalog
    pub fn remove_plugin(&mut self, id: &PluginId) -> bool {
        match self.index.remove(id) {
            Some(pos) => {
                self.plugins.remove(pos);
                self.reindex();
                true
            }
            None => false,
        }
    }

    /// Look up a plugin by identity
    pub fn get(&self, id: &PluginId) -> Option<&PluginInfo> {
        self.index.get(id).map(|&pos| &self.plugins[pos])
    }

    /// Look up a plugin by name (case-insensitive)
    pub fn find(&self, name: &str) -> Option<&PluginInfo> {
        let name_lower = name.to_lowercase();
        self.plugins
            .iter()
            .find(|p| p.id.name.to_lowercase() == name_lower)
    }

    /// All catalog entries in insertion order
    pub fn list(&self) -> &[PluginInfo] {
        &self.plugins
    }

    /// Number of catalog entries
    pub fn len(&self) -> usize {
        self.plugins.len()
    }

    /// Whether the catalog is empty
    pub fn is_empty(&self) -> bool {
        self.plugins.is_empty()
    }

    /// Drop entries that cannot do stereo in/out
    pub fn retain_stereo_capable(&mut self) {
        let before = self.plugins.len();
        self.plugins.retain(|p| p.is_stereo_capable());
        if self.plugins.len() != before {
            warn!(
                "Dropped {} catalog entries lacking stereo I/O",
                before - self.plugins.len()
            );
            self.reindex();
        }
    }

    /// Load a catalog from a JSON file; a missing file yields an empty catalog
    pub fn load(path: &Path) -> HostResult<Self> {
        if !path.exists() {
            return Ok(Self::new());
        }
        let data = std::fs::read_to_string(path)?;
        let plugins: Vec<PluginInfo> =
            serde_json::from_str(&data).map_err(|e| HostError::Serde(e.to_string()))?;
        let mut registry = Self::new();
        for info in plugins {
            registry.add_plugin(info);
        }
        Ok(registry)
    }

    /// Save the catalog to a JSON file
    pub fn save(&self, path: &Path) -> HostResult<()> {
        let data = serde_json::to_string_pretty(&self.plugins)
            .map_err(|e| HostError::Serde(e.to_string()))?;
        std::fs::write(path, data)?;
        Ok(())
    }

    fn reindex(&mut self) {
        self.index = self
            .plugins
            .iter()
            .enumerate()
            .map(|(pos, p)| (p.id.clone(), pos))
            .collect();
    }
}
