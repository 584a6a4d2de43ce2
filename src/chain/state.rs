//! State Persistence
//!
//! Saves and restores each plugin's opaque internal state through the
//! attribute store. Rebuilding the routing graph destroys every live
//! instance, so every mutation path snapshots all live state first;
//! a crash mid-rebuild then loses nothing.

use super::store::AttributeStore;
use crate::plugin_host::{Attribute, HostResult, PluginId, PluginInstance, SharedPluginInstance};
use tracing::{debug, warn};

/// Persist one live instance's state under its identity
pub fn snapshot(
    attrs: &mut AttributeStore,
    id: &PluginId,
    instance: &SharedPluginInstance,
) -> HostResult<()> {
    let blob = instance.lock().unwrap().state()?;
    attrs.set_state_blob(id, &blob)?;
    debug!("Snapshotted {} bytes of state for {}", blob.len(), id);
    Ok(())
}

/// Persist the state of every given live instance
///
/// One failing instance does not stop the rest: its state is simply
/// not refreshed (the previously persisted blob, if any, survives).
pub fn snapshot_all(attrs: &mut AttributeStore, instances: &[(PluginId, SharedPluginInstance)]) {
    for (id, instance) in instances {
        if let Err(e) = snapshot(attrs, id, instance) {
            warn!("Failed to snapshot state for {}: {}", id, e);
        }
    }
}

/// Read back a persisted state blob; `None` means default state
pub fn restore(attrs: &AttributeStore, id: &PluginId) -> Option<Vec<u8>> {
    attrs.get_state_blob(id)
}

/// Drop the persisted state for one identity
pub fn purge(attrs: &mut AttributeStore, id: &PluginId) -> HostResult<()> {
    attrs.remove(Attribute::State, id)
}

/// Drop the persisted state for every given identity
pub fn purge_all(attrs: &mut AttributeStore, ids: &[PluginId]) -> HostResult<()> {
    for id in ids {
        purge(attrs, id)?;
    }
    Ok(())
}
