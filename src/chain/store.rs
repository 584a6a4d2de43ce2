//! Order Store Adapter
//!
//! Maps a plugin identity plus attribute name onto the flat settings
//! store: integer order values, bypass booleans, and base64 state
//! blobs. No caching: every call is a store round-trip, and every
//! mutation flushes the store (the substrate is assumed lossy on crash
//! otherwise). Failed reads degrade to "absent"; failed writes are
//! retried once and then surfaced.

use crate::plugin_host::{Attribute, HostError, HostResult, PluginId};
use crate::settings::SettingsStore;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use tracing::warn;

/// Per-plugin attribute access over a [`SettingsStore`]
pub struct AttributeStore {
    store: Box<dyn SettingsStore>,
}

impl AttributeStore {
    /// Wrap a settings store
    pub fn new(store: Box<dyn SettingsStore>) -> Self {
        Self { store }
    }

    /// Raw read of one attribute
    pub fn get(&self, attribute: Attribute, id: &PluginId) -> Option<String> {
        self.store.get(&id.settings_key(attribute))
    }

    /// Integer order value, if present and parseable
    pub fn get_order(&self, id: &PluginId) -> Option<i64> {
        let raw = self.get(Attribute::Order, id)?;
        match raw.parse() {
            Ok(value) => Some(value),
            Err(_) => {
                warn!("Unparseable order value {:?} for {}", raw, id);
                None
            }
        }
    }

    /// Write the order value
    pub fn set_order(&mut self, id: &PluginId, value: i64) -> HostResult<()> {
        self.set(Attribute::Order, id, &value.to_string())
    }

    /// Bypass flag; absent means not bypassed
    pub fn get_bypass(&self, id: &PluginId) -> bool {
        match self.get(Attribute::Bypass, id).as_deref() {
            Some("true") => true,
            Some("false") | None => false,
            Some(other) => {
                warn!("Unparseable bypass value {:?} for {}", other, id);
                false
            }
        }
    }

    /// Write the bypass flag
    pub fn set_bypass(&mut self, id: &PluginId, bypassed: bool) -> HostResult<()> {
        self.set(Attribute::Bypass, id, if bypassed { "true" } else { "false" })
    }

    /// Decoded state blob, if present and decodable
    pub fn get_state_blob(&self, id: &PluginId) -> Option<Vec<u8>> {
        let encoded = self.get(Attribute::State, id)?;
        match BASE64.decode(&encoded) {
            Ok(blob) => Some(blob),
            Err(e) => {
                warn!("Undecodable state blob for {}: {}", id, e);
                None
            }
        }
    }

    /// Encode and write the state blob
    pub fn set_state_blob(&mut self, id: &PluginId, blob: &[u8]) -> HostResult<()> {
        self.set(Attribute::State, id, &BASE64.encode(blob))
    }

    /// Remove one attribute and flush
    pub fn remove(&mut self, attribute: Attribute, id: &PluginId) -> HostResult<()> {
        let key = id.settings_key(attribute);
        self.store.remove(&key)?;
        self.store.save()
    }

    /// Write one attribute and flush, retrying the write once
    fn set(&mut self, attribute: Attribute, id: &PluginId, value: &str) -> HostResult<()> {
        let key = id.settings_key(attribute);
        if let Err(first) = self.store.set(&key, value) {
            warn!("Retrying failed settings write for {}: {}", key, first);
            self.store
                .set(&key, value)
                .map_err(|e| HostError::StoreIo(format!("write failed for {}: {}", key, e)))?;
        }
        self.store.save()
    }

    /// Direct access to the underlying store (host-level keys live there too)
    pub fn store(&self) -> &dyn SettingsStore {
        &*self.store
    }

    /// Mutable access to the underlying store
    pub fn store_mut(&mut self) -> &mut dyn SettingsStore {
        &mut *self.store
    }
}
