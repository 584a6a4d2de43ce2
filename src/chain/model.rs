//! Chain Model
//!
//! The in-memory ordered chain of active plugins, reconciled with the
//! persisted order values. Membership is defined by the store: every
//! catalog identity holding an order value is active. The in-memory
//! list is kept consistent with the store on every mutation, so chain
//! position lookups never re-derive order by scanning.
//!
//! Order values originate from insertion timestamps and are not
//! contiguous. New entries always receive a value strictly greater than
//! every existing one, so they sort last even if the wall clock stepped
//! backwards. Equal values can only enter via an externally written
//! store; `reload` detects them and renumbers once, keeping the
//! catalog-order ranking they resolved to.

use super::store::AttributeStore;
use crate::plugin_host::{Attribute, HostError, HostResult, PluginId, PluginRegistry};
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::{debug, info};

/// One active chain position
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ChainEntry {
    /// Plugin identity
    pub id: PluginId,
    /// Persisted order value
    pub order: i64,
    /// Whether the plugin is excluded from routing
    pub bypassed: bool,
}

/// Ordered collection of active plugins
#[derive(Default)]
pub struct ChainModel {
    entries: Vec<ChainEntry>,
}

impl ChainModel {
    /// Create an empty chain
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Rebuild the chain from the store: every catalog identity with an
    /// order value, ascending. The sort is stable over catalog order,
    /// so tied values rank deterministically; ties are then renumbered
    /// in place so later adjacent swaps stay well-defined.
    pub fn reload(
        &mut self,
        attrs: &mut AttributeStore,
        registry: &PluginRegistry,
    ) -> HostResult<()> {
        let mut entries: Vec<ChainEntry> = registry
            .list()
            .iter()
            .filter_map(|info| {
                attrs.get_order(&info.id).map(|order| ChainEntry {
                    id: info.id.clone(),
                    order,
                    bypassed: attrs.get_bypass(&info.id),
                })
            })
            .collect();
        entries.sort_by_key(|e| e.order);

        let has_ties = entries.windows(2).any(|w| w[0].order == w[1].order);
        if has_ties {
            info!("Duplicate order values in store; renumbering chain");
            for (rank, entry) in entries.iter_mut().enumerate() {
                let order = rank as i64 + 1;
                if entry.order != order {
                    attrs.set_order(&entry.id, order)?;
                    entry.order = order;
                }
            }
        }

        self.entries = entries;
        Ok(())
    }

    /// Activate a plugin at the end of the chain. Re-adding an already
    /// active identity moves it to the end (same slot, fresh position).
    pub fn add(&mut self, attrs: &mut AttributeStore, id: &PluginId) -> HostResult<()> {
        let order = self.next_order();
        attrs.set_order(id, order)?;

        let bypassed = attrs.get_bypass(id);
        if let Some(pos) = self.position(id) {
            self.entries.remove(pos);
        }
        self.entries.push(ChainEntry {
            id: id.clone(),
            order,
            bypassed,
        });
        debug!("Added {} with order {}", id, order);
        Ok(())
    }

    /// Deactivate a plugin: delete its order, bypass, and state keys
    pub fn remove(&mut self, attrs: &mut AttributeStore, id: &PluginId) -> HostResult<()> {
        let pos = self
            .position(id)
            .ok_or_else(|| HostError::IdentityNotFound(id.to_string()))?;

        attrs.remove(Attribute::Order, id)?;
        attrs.remove(Attribute::Bypass, id)?;
        attrs.remove(Attribute::State, id)?;
        self.entries.remove(pos);
        debug!("Removed {}", id);
        Ok(())
    }

    /// Swap the plugin with its predecessor. Returns `Ok(false)` when
    /// already first (a silent no-op, not an error).
    pub fn move_up(&mut self, attrs: &mut AttributeStore, id: &PluginId) -> HostResult<bool> {
        let pos = self
            .position(id)
            .ok_or_else(|| HostError::IdentityNotFound(id.to_string()))?;
        if pos == 0 {
            return Ok(false);
        }
        self.swap_adjacent(attrs, pos - 1, pos)?;
        Ok(true)
    }

    /// Swap the plugin with its successor. Returns `Ok(false)` when
    /// already last.
    pub fn move_down(&mut self, attrs: &mut AttributeStore, id: &PluginId) -> HostResult<bool> {
        let pos = self
            .position(id)
            .ok_or_else(|| HostError::IdentityNotFound(id.to_string()))?;
        if pos + 1 == self.entries.len() {
            return Ok(false);
        }
        self.swap_adjacent(attrs, pos, pos + 1)?;
        Ok(true)
    }

    /// Flip the bypass flag; position and order are untouched.
    /// Returns the new flag.
    pub fn toggle_bypass(&mut self, attrs: &mut AttributeStore, id: &PluginId) -> HostResult<bool> {
        let pos = self
            .position(id)
            .ok_or_else(|| HostError::IdentityNotFound(id.to_string()))?;

        let bypassed = !self.entries[pos].bypassed;
        attrs.set_bypass(id, bypassed)?;
        self.entries[pos].bypassed = bypassed;
        Ok(bypassed)
    }

    /// Position of an identity in the chain
    pub fn position(&self, id: &PluginId) -> Option<usize> {
        self.entries.iter().position(|e| &e.id == id)
    }

    /// Whether an identity is active
    pub fn is_active(&self, id: &PluginId) -> bool {
        self.position(id).is_some()
    }

    /// The ordered entries
    pub fn entries(&self) -> &[ChainEntry] {
        &self.entries
    }

    /// The ordered `(identity, bypassed)` view
    pub fn current(&self) -> Vec<(PluginId, bool)> {
        self.entries
            .iter()
            .map(|e| (e.id.clone(), e.bypassed))
            .collect()
    }

    /// Identities of all active plugins, in chain order
    pub fn active_ids(&self) -> Vec<PluginId> {
        self.entries.iter().map(|e| e.id.clone()).collect()
    }

    /// Number of active plugins
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the chain is empty
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    // Exchange the order values of two adjacent positions; all other
    // entries keep theirs.
    fn swap_adjacent(
        &mut self,
        attrs: &mut AttributeStore,
        upper: usize,
        lower: usize,
    ) -> HostResult<()> {
        let upper_order = self.entries[upper].order;
        let lower_order = self.entries[lower].order;

        attrs.set_order(&self.entries[lower].id, upper_order)?;
        attrs.set_order(&self.entries[upper].id, lower_order)?;

        self.entries[lower].order = upper_order;
        self.entries[upper].order = lower_order;
        self.entries.swap(upper, lower);
        Ok(())
    }

    // Strictly greater than every existing order value, and derived
    // from the wall clock when that already satisfies it (the stored
    // values stay meaningful as insertion times).
    fn next_order(&self) -> i64 {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs() as i64)
            .unwrap_or(0);
        let max_existing = self.entries.iter().map(|e| e.order).max();
        match max_existing {
            Some(max) => now.max(max + 1),
            None => now,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plugin_host::{MockPluginInstance, PluginFormat};
    use crate::settings::MemoryStore;

    fn make_test_attrs() -> AttributeStore {
        AttributeStore::new(Box::new(MemoryStore::new()))
    }

    fn make_test_registry(names: &[&str]) -> PluginRegistry {
        let mut registry = PluginRegistry::new();
        for name in names {
            registry.add_plugin(MockPluginInstance::mock_plugin_info(name));
        }
        registry
    }

    fn id(name: &str) -> PluginId {
        PluginId::new(name, "1.0.0", PluginFormat::Vst3)
    }

    fn chain_names(model: &ChainModel) -> Vec<String> {
        model.entries().iter().map(|e| e.id.name.clone()).collect()
    }

    #[test]
    fn test_add_appends_with_increasing_order() {
        let mut attrs = make_test_attrs();
        let mut model = ChainModel::new();

        model.add(&mut attrs, &id("A")).unwrap();
        model.add(&mut attrs, &id("B")).unwrap();
        model.add(&mut attrs, &id("C")).unwrap();

        assert_eq!(chain_names(&model), vec!["A", "B", "C"]);
        // Orders strictly increase even when all adds land in the same
        // wall-clock second
        let orders: Vec<i64> = model.entries().iter().map(|e| e.order).collect();
        assert!(orders.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn test_reload_sorts_by_stored_order() {
        let mut attrs = make_test_attrs();
        let registry = make_test_registry(&["A", "B", "C", "D"]);

        attrs.set_order(&id("A"), 30).unwrap();
        attrs.set_order(&id("B"), 10).unwrap();
        attrs.set_order(&id("C"), 20).unwrap();
        // D has no order value: not active

        let mut model = ChainModel::new();
        model.reload(&mut attrs, &registry).unwrap();
        assert_eq!(chain_names(&model), vec!["B", "C", "A"]);

        // Repeated reloads with no mutation return the same sequence
        model.reload(&mut attrs, &registry).unwrap();
        assert_eq!(chain_names(&model), vec!["B", "C", "A"]);
    }

    #[test]
    fn test_reload_breaks_ties_by_catalog_order() {
        let mut attrs = make_test_attrs();
        // Catalog order: Z first, then A
        let registry = make_test_registry(&["Z", "A"]);

        attrs.set_order(&id("Z"), 7).unwrap();
        attrs.set_order(&id("A"), 7).unwrap();

        let mut model = ChainModel::new();
        model.reload(&mut attrs, &registry).unwrap();
        assert_eq!(chain_names(&model), vec!["Z", "A"]);

        // The tie is renumbered away and the resolution sticks
        let orders: Vec<i64> = model.entries().iter().map(|e| e.order).collect();
        assert!(orders[0] < orders[1]);
        model.reload(&mut attrs, &registry).unwrap();
        assert_eq!(chain_names(&model), vec!["Z", "A"]);
    }

    #[test]
    fn test_move_up_swaps_only_the_pair() {
        let mut attrs = make_test_attrs();
        let mut model = ChainModel::new();
        for name in ["A", "B", "C"] {
            model.add(&mut attrs, &id(name)).unwrap();
        }
        let order_a = model.entries()[0].order;
        let order_b = model.entries()[1].order;
        let order_c = model.entries()[2].order;

        let moved = model.move_up(&mut attrs, &id("C")).unwrap();
        assert!(moved);
        assert_eq!(chain_names(&model), vec!["A", "C", "B"]);

        // Two-element swap: C took B's value, B took C's, A untouched
        assert_eq!(attrs.get_order(&id("C")), Some(order_b));
        assert_eq!(attrs.get_order(&id("B")), Some(order_c));
        assert_eq!(attrs.get_order(&id("A")), Some(order_a));
    }

    #[test]
    fn test_move_up_then_down_restores_order() {
        let mut attrs = make_test_attrs();
        let mut model = ChainModel::new();
        for name in ["A", "B", "C"] {
            model.add(&mut attrs, &id(name)).unwrap();
        }
        let before: Vec<ChainEntry> = model.entries().to_vec();

        model.move_up(&mut attrs, &id("B")).unwrap();
        model.move_down(&mut attrs, &id("B")).unwrap();

        assert_eq!(model.entries(), &before[..]);
    }

    #[test]
    fn test_edge_moves_are_noops() {
        let mut attrs = make_test_attrs();
        let mut model = ChainModel::new();
        for name in ["A", "B"] {
            model.add(&mut attrs, &id(name)).unwrap();
        }
        let before: Vec<ChainEntry> = model.entries().to_vec();

        assert!(!model.move_up(&mut attrs, &id("A")).unwrap());
        assert!(!model.move_down(&mut attrs, &id("B")).unwrap());
        assert_eq!(model.entries(), &before[..]);
    }

    #[test]
    fn test_move_missing_identity_errors() {
        let mut attrs = make_test_attrs();
        let mut model = ChainModel::new();
        model.add(&mut attrs, &id("A")).unwrap();

        let err = model.move_up(&mut attrs, &id("Ghost")).unwrap_err();
        assert!(matches!(err, HostError::IdentityNotFound(_)));
        let err = model.move_down(&mut attrs, &id("Ghost")).unwrap_err();
        assert!(matches!(err, HostError::IdentityNotFound(_)));
    }

    #[test]
    fn test_remove_deletes_all_three_keys() {
        let mut attrs = make_test_attrs();
        let mut model = ChainModel::new();
        model.add(&mut attrs, &id("A")).unwrap();
        model.toggle_bypass(&mut attrs, &id("A")).unwrap();
        attrs.set_state_blob(&id("A"), &[1, 2, 3]).unwrap();

        model.remove(&mut attrs, &id("A")).unwrap();

        assert_eq!(attrs.get_order(&id("A")), None);
        assert!(!attrs.get_bypass(&id("A")));
        assert_eq!(attrs.get_state_blob(&id("A")), None);
        assert!(model.is_empty());
    }

    #[test]
    fn test_remove_missing_identity_errors() {
        let mut attrs = make_test_attrs();
        let mut model = ChainModel::new();
        let err = model.remove(&mut attrs, &id("Ghost")).unwrap_err();
        assert!(matches!(err, HostError::IdentityNotFound(_)));
    }

    #[test]
    fn test_toggle_bypass_keeps_position() {
        let mut attrs = make_test_attrs();
        let mut model = ChainModel::new();
        for name in ["A", "B", "C"] {
            model.add(&mut attrs, &id(name)).unwrap();
        }
        let order_before = model.entries()[1].order;

        assert!(model.toggle_bypass(&mut attrs, &id("B")).unwrap());
        assert_eq!(chain_names(&model), vec!["A", "B", "C"]);
        assert_eq!(model.entries()[1].order, order_before);
        assert!(attrs.get_bypass(&id("B")));

        assert!(!model.toggle_bypass(&mut attrs, &id("B")).unwrap());
        assert!(!attrs.get_bypass(&id("B")));
    }

    #[test]
    fn test_re_add_moves_to_end() {
        let mut attrs = make_test_attrs();
        let mut model = ChainModel::new();
        for name in ["A", "B", "C"] {
            model.add(&mut attrs, &id(name)).unwrap();
        }

        model.add(&mut attrs, &id("A")).unwrap();
        assert_eq!(chain_names(&model), vec!["B", "C", "A"]);
        assert_eq!(model.len(), 3);
    }

    #[test]
    fn test_reload_matches_incremental_state() {
        let mut attrs = make_test_attrs();
        let registry = make_test_registry(&["A", "B", "C"]);
        let mut model = ChainModel::new();
        for name in ["A", "B", "C"] {
            model.add(&mut attrs, &id(name)).unwrap();
        }
        model.move_up(&mut attrs, &id("C")).unwrap();
        model.toggle_bypass(&mut attrs, &id("A")).unwrap();
        let incremental = model.current();

        // A fresh model built purely from the store agrees
        let mut fresh = ChainModel::new();
        fresh.reload(&mut attrs, &registry).unwrap();
        assert_eq!(fresh.current(), incremental);
    }
}
