//! Chain Engine
//!
//! The owned session context tying everything together: settings store,
//! plugin catalog, instantiation service, chain model, and the
//! published routing graph. All control-plane operations go through
//! here and run strictly sequentially; the audio side only ever
//! observes the graph through an [`ArcSwap`] load, so a rebuild is
//! invisible until the fully built replacement is published in one
//! atomic store.
//!
//! Every mutation follows the same contract: mutate the chain, snapshot
//! the state of every still-active live instance, then rebuild and
//! publish. Snapshot-before-rebuild matters: the rebuild destroys and
//! recreates every instance, and a crash between the two steps must not
//! lose the pre-mutation state.

use crate::chain::{state, AttributeStore, ChainModel};
use crate::graph::RoutingGraph;
use crate::plugin_host::{
    HostError, HostResult, Instantiator, PluginId, PluginRegistry,
};
use crate::settings::SettingsStore;
use arc_swap::ArcSwap;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;

/// Settings key holding the persisted audio-device context
const DEVICE_SETTINGS_KEY: &str = "device-settings";

/// Audio-device context used when instantiating plugins
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct DeviceSettings {
    /// Sample rate in Hz
    pub sample_rate: f32,
    /// Maximum processing block size in samples
    pub block_size: usize,
}

impl Default for DeviceSettings {
    fn default() -> Self {
        Self {
            sample_rate: 44100.0,
            block_size: 512,
        }
    }
}

/// The plugin chain host session
pub struct ChainEngine {
    registry: PluginRegistry,
    instantiator: Box<dyn Instantiator>,
    attrs: AttributeStore,
    model: ChainModel,
    graph: Arc<ArcSwap<RoutingGraph>>,
    device: DeviceSettings,
}

impl ChainEngine {
    /// Create an engine over the given store, catalog, and
    /// instantiation service. Recovers the persisted chain and
    /// publishes its routing graph before returning.
    pub fn new(
        store: Box<dyn SettingsStore>,
        registry: PluginRegistry,
        instantiator: Box<dyn Instantiator>,
    ) -> HostResult<Self> {
        let mut attrs = AttributeStore::new(store);
        let device = match attrs.store().get(DEVICE_SETTINGS_KEY) {
            Some(raw) => serde_json::from_str(&raw)
                .map_err(|e| HostError::Serde(format!("device settings: {}", e)))?,
            None => DeviceSettings::default(),
        };

        let mut model = ChainModel::new();
        model.reload(&mut attrs, &registry)?;

        let mut engine = Self {
            registry,
            instantiator,
            attrs,
            model,
            graph: Arc::new(ArcSwap::from_pointee(RoutingGraph::empty())),
            device,
        };
        engine.publish_rebuilt();
        Ok(engine)
    }

    /// Activate a catalog plugin at the end of the chain
    pub fn add_plugin(&mut self, id: &PluginId) -> HostResult<()> {
        if self.registry.get(id).is_none() {
            return Err(HostError::IdentityNotFound(format!("{} (not in catalog)", id)));
        }
        self.model.add(&mut self.attrs, id)?;
        self.rebuild();
        Ok(())
    }

    /// Deactivate a plugin and delete its persisted attributes
    pub fn remove_plugin(&mut self, id: &PluginId) -> HostResult<()> {
        self.model.remove(&mut self.attrs, id)?;
        self.rebuild();
        Ok(())
    }

    /// Move a plugin one position towards the input.
    /// `Ok(false)` means it was already first.
    pub fn move_up(&mut self, id: &PluginId) -> HostResult<bool> {
        let moved = self.model.move_up(&mut self.attrs, id)?;
        if moved {
            self.rebuild();
        }
        Ok(moved)
    }

    /// Move a plugin one position towards the output.
    /// `Ok(false)` means it was already last.
    pub fn move_down(&mut self, id: &PluginId) -> HostResult<bool> {
        let moved = self.model.move_down(&mut self.attrs, id)?;
        if moved {
            self.rebuild();
        }
        Ok(moved)
    }

    /// Flip a plugin's bypass flag; returns the new flag
    pub fn toggle_bypass(&mut self, id: &PluginId) -> HostResult<bool> {
        let bypassed = self.model.toggle_bypass(&mut self.attrs, id)?;
        self.rebuild();
        Ok(bypassed)
    }

    /// The ordered `(identity, bypassed)` chain
    pub fn current_chain(&self) -> Vec<(PluginId, bool)> {
        self.model.current()
    }

    /// Snapshot all live state, then rebuild and publish the graph
    pub fn rebuild(&mut self) {
        self.snapshot_live();
        self.publish_rebuilt();
    }

    /// Delete every active plugin's persisted state and rebuild with
    /// defaults (no snapshot here; that would immediately re-save the
    /// states being purged)
    pub fn purge_states(&mut self) -> HostResult<()> {
        let ids = self.model.active_ids();
        state::purge_all(&mut self.attrs, &ids)?;
        self.publish_rebuilt();
        Ok(())
    }

    /// Handle for the audio side; load() always yields a complete graph
    pub fn graph_handle(&self) -> Arc<ArcSwap<RoutingGraph>> {
        self.graph.clone()
    }

    /// The currently published graph
    pub fn current_graph(&self) -> Arc<RoutingGraph> {
        self.graph.load_full()
    }

    /// The known-plugin catalog
    pub fn registry(&self) -> &PluginRegistry {
        &self.registry
    }

    /// Mutable catalog access (for the embedding application's scanner)
    pub fn registry_mut(&mut self) -> &mut PluginRegistry {
        &mut self.registry
    }

    /// The audio-device context plugins are instantiated with
    pub fn device_settings(&self) -> DeviceSettings {
        self.device
    }

    /// Persist a new audio-device context and rebuild so every
    /// instance is recreated at the new rate
    pub fn set_device_settings(&mut self, device: DeviceSettings) -> HostResult<()> {
        let raw =
            serde_json::to_string(&device).map_err(|e| HostError::Serde(e.to_string()))?;
        self.attrs.store_mut().set(DEVICE_SETTINGS_KEY, &raw)?;
        self.attrs.store_mut().save()?;
        self.device = device;
        self.rebuild();
        Ok(())
    }

    // Persist the state of every live instance whose identity is still
    // active. Instances belonging to just-removed plugins are excluded
    // so a removal does not resurrect the keys it deleted.
    fn snapshot_live(&mut self) {
        let graph = self.graph.load();
        let live: Vec<_> = graph
            .live_instances()
            .into_iter()
            .filter(|(id, _)| self.model.is_active(id))
            .collect();
        state::snapshot_all(&mut self.attrs, &live);
    }

    // Build the replacement graph fully off to the side, then swap it
    // in with a single atomic store.
    fn publish_rebuilt(&mut self) {
        let entries = self.model.current();
        let graph = RoutingGraph::build(
            &entries,
            &self.registry,
            &*self.instantiator,
            self.device.sample_rate,
            self.device.block_size,
            |id| state::restore(&self.attrs, id),
        );
        self.graph.store(Arc::new(graph));
        info!("Published routing graph for {} active plugins", entries.len());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plugin_host::{MockInstantiator, MockPluginInstance, PluginFormat, PluginInstance};
    use crate::settings::MemoryStore;

    fn id(name: &str) -> PluginId {
        PluginId::new(name, "1.0.0", PluginFormat::Vst3)
    }

    fn make_test_engine(names: &[&str]) -> ChainEngine {
        let mut registry = PluginRegistry::new();
        for name in names {
            registry.add_plugin(MockPluginInstance::mock_plugin_info(name));
        }
        ChainEngine::new(
            Box::new(MemoryStore::new()),
            registry,
            Box::new(MockInstantiator::new()),
        )
        .unwrap()
    }

    #[test]
    fn test_add_publishes_graph() {
        let mut engine = make_test_engine(&["A"]);
        assert!(engine.current_chain().is_empty());

        engine.add_plugin(&id("A")).unwrap();
        assert_eq!(engine.current_chain(), vec![(id("A"), false)]);

        let graph = engine.current_graph();
        assert!(graph.node_for_identity(&id("A")).is_some());
    }

    #[test]
    fn test_add_unknown_plugin_fails() {
        let mut engine = make_test_engine(&["A"]);
        let err = engine.add_plugin(&id("Ghost")).unwrap_err();
        assert!(matches!(err, HostError::IdentityNotFound(_)));
        // Nothing was published for it
        assert!(engine.current_chain().is_empty());
    }

    #[test]
    fn test_live_state_survives_rebuild() {
        let mut engine = make_test_engine(&["A", "B"]);
        engine.add_plugin(&id("A")).unwrap();
        engine.add_plugin(&id("B")).unwrap();

        // Tweak A's live state on the published graph
        {
            let graph = engine.current_graph();
            let node = graph.node_for_identity(&id("A")).unwrap();
            let instance = node.instance.as_ref().unwrap();
            instance.lock().unwrap().set_state(&[7, 7, 7]).unwrap();
        }

        // Any mutation snapshots live state before tearing instances down
        engine.toggle_bypass(&id("B")).unwrap();

        let graph = engine.current_graph();
        let node = graph.node_for_identity(&id("A")).unwrap();
        let instance = node.instance.as_ref().unwrap();
        assert_eq!(instance.lock().unwrap().state().unwrap(), vec![7, 7, 7]);
    }

    #[test]
    fn test_remove_does_not_resurrect_state() {
        let mut engine = make_test_engine(&["A", "B"]);
        engine.add_plugin(&id("A")).unwrap();
        engine.add_plugin(&id("B")).unwrap();
        {
            let graph = engine.current_graph();
            let node = graph.node_for_identity(&id("A")).unwrap();
            let instance = node.instance.as_ref().unwrap();
            instance.lock().unwrap().set_state(&[1, 2, 3]).unwrap();
        }

        engine.remove_plugin(&id("A")).unwrap();

        // A is gone from the chain and its state key stayed deleted
        // even though its live instance existed during the snapshot
        assert_eq!(engine.current_chain(), vec![(id("B"), false)]);
        let graph = engine.current_graph();
        assert!(graph.node_for_identity(&id("A")).is_none());

        // Re-adding starts from default state
        engine.add_plugin(&id("A")).unwrap();
        let graph = engine.current_graph();
        let node = graph.node_for_identity(&id("A")).unwrap();
        let instance = node.instance.as_ref().unwrap();
        assert!(instance.lock().unwrap().state().unwrap().is_empty());
    }

    #[test]
    fn test_purge_states_resets_instances() {
        let mut engine = make_test_engine(&["A"]);
        engine.add_plugin(&id("A")).unwrap();
        {
            let graph = engine.current_graph();
            let node = graph.node_for_identity(&id("A")).unwrap();
            let instance = node.instance.as_ref().unwrap();
            instance.lock().unwrap().set_state(&[5; 8]).unwrap();
        }
        // Persist the tweak, then purge it
        engine.rebuild();
        engine.purge_states().unwrap();

        let graph = engine.current_graph();
        let node = graph.node_for_identity(&id("A")).unwrap();
        let instance = node.instance.as_ref().unwrap();
        assert!(instance.lock().unwrap().state().unwrap().is_empty());
    }

    #[test]
    fn test_device_settings_persist_and_apply() {
        let mut engine = make_test_engine(&["A"]);
        assert_eq!(engine.device_settings(), DeviceSettings::default());

        engine
            .set_device_settings(DeviceSettings {
                sample_rate: 48000.0,
                block_size: 256,
            })
            .unwrap();
        assert_eq!(engine.device_settings().sample_rate, 48000.0);
        assert_eq!(engine.device_settings().block_size, 256);
    }

    #[test]
    fn test_rebuild_is_atomic_from_consumer_side() {
        let mut engine = make_test_engine(&["A"]);
        let handle = engine.graph_handle();

        // Consumer holds the old graph across a mutation
        let before = handle.load_full();
        engine.add_plugin(&id("A")).unwrap();
        let after = handle.load_full();

        // The old graph object is untouched; the new one is complete
        assert!(before.node_for_identity(&id("A")).is_none());
        assert!(after.node_for_identity(&id("A")).is_some());
    }
}
