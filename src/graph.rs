//! Routing Graph
//!
//! Translates the time-sorted, bypass-aware chain into the directed
//! stereo graph the audio side pulls buffers through. The graph is a
//! derived, disposable artifact: every chain mutation throws the old
//! one away and builds a replacement from scratch, which keeps the
//! wiring logic trivial to reason about at the chain sizes this host
//! sees (tens of plugins, not thousands).
//!
//! Bypassed plugins still get a node (un-bypassing them later is a
//! plain rebuild away) but no connections, and the walk routes around
//! them. A plugin whose instantiation fails is skipped the same way so
//! one broken binary cannot silence the whole chain.

use crate::plugin_host::{
    Instantiator, PluginId, PluginInstance, PluginRegistry, SharedPluginInstance,
};
use tracing::{debug, warn};

/// Stereo channel count; the chain is a single stereo path
pub const CHANNELS: u16 = 2;

/// Graph node identifier, positional per rebuild
///
/// Chain positions use 1-based ids; the I/O sentinels live far above
/// any realistic chain length. Node ids do not start at 0.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct NodeId(pub u32);

impl NodeId {
    /// Input sentinel node
    pub const INPUT: NodeId = NodeId(1_000_000);
    /// Output sentinel node
    pub const OUTPUT: NodeId = NodeId(1_000_001);
}

/// One directed mono connection; a stereo hop is two of these
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Connection {
    /// Source node
    pub source: NodeId,
    /// Destination node
    pub dest: NodeId,
    /// Channel index (0 = left, 1 = right)
    pub channel: u16,
}

/// A node in the routing graph
pub struct GraphNode {
    /// Node identifier
    pub id: NodeId,
    /// Chain identity; `None` for the I/O sentinels
    pub identity: Option<PluginId>,
    /// Whether this node is excluded from routing
    pub bypassed: bool,
    /// Live runtime instance; `None` for the I/O sentinels
    pub instance: Option<SharedPluginInstance>,
}

/// The routing graph: nodes, connections, and the resolved signal path
pub struct RoutingGraph {
    nodes: Vec<GraphNode>,
    connections: Vec<Connection>,
    /// Node ids from input to output, in processing order
    path: Vec<NodeId>,
}

impl RoutingGraph {
    /// An empty graph: input bridged straight to output
    pub fn empty() -> Self {
        Self::build(&[], &PluginRegistry::new(), &NullInstantiator, 44100.0, 512, |_| None)
    }

    /// Build a graph from the time-sorted chain
    ///
    /// Walks the chain once: each entry is instantiated (seeded with
    /// its persisted state via `restore_state`), added as a node, and,
    /// unless bypassed, wired after the previously connected stage.
    /// The first connected stage hangs off the input sentinel; the last
    /// feeds the output sentinel. A chain with no connectable stage
    /// degenerates to the direct input→output bridge.
    pub fn build<F>(
        entries: &[(PluginId, bool)],
        registry: &PluginRegistry,
        instantiator: &dyn Instantiator,
        sample_rate: f32,
        block_size: usize,
        restore_state: F,
    ) -> Self
    where
        F: Fn(&PluginId) -> Option<Vec<u8>>,
    {
        let mut graph = Self {
            nodes: vec![
                GraphNode {
                    id: NodeId::INPUT,
                    identity: None,
                    bypassed: false,
                    instance: None,
                },
                GraphNode {
                    id: NodeId::OUTPUT,
                    identity: None,
                    bypassed: false,
                    instance: None,
                },
            ],
            connections: Vec::new(),
            path: Vec::new(),
        };

        let mut last_connected: Option<NodeId> = None;
        for (pos, (id, bypassed)) in entries.iter().enumerate() {
            // Positional id, stable for this rebuild even across skips
            let node_id = NodeId(pos as u32 + 1);

            let Some(info) = registry.get(id) else {
                warn!("Skipping {}: not in catalog", id);
                continue;
            };
            let instance = match instantiator.instantiate(info, sample_rate, block_size) {
                Ok(instance) => instance,
                Err(e) => {
                    warn!("Skipping {}: {}", id, e);
                    continue;
                }
            };
            if let Some(blob) = restore_state(id) {
                if let Err(e) = instance.lock().unwrap().set_state(&blob) {
                    warn!("Could not restore state for {}: {}", id, e);
                }
            }

            graph.nodes.push(GraphNode {
                id: node_id,
                identity: Some(id.clone()),
                bypassed: *bypassed,
                instance: Some(instance),
            });

            if !bypassed {
                let source = last_connected.unwrap_or(NodeId::INPUT);
                graph.connect_stereo(source, node_id);
                last_connected = Some(node_id);
            }
        }

        // Close the path: last connected stage to output, or the direct
        // bridge when nothing was connectable (empty or all bypassed).
        match last_connected {
            Some(last) => graph.connect_stereo(last, NodeId::OUTPUT),
            None => graph.connect_stereo(NodeId::INPUT, NodeId::OUTPUT),
        }

        graph.path = graph.resolve_path();
        debug!(
            "Built graph: {} plugin nodes, {} connections",
            graph.nodes.len() - 2,
            graph.connections.len()
        );
        graph
    }

    /// Node ids from the input sentinel to the output sentinel
    pub fn signal_path(&self) -> &[NodeId] {
        &self.path
    }

    /// All connections
    pub fn connections(&self) -> &[Connection] {
        &self.connections
    }

    /// All nodes, sentinels included
    pub fn nodes(&self) -> &[GraphNode] {
        &self.nodes
    }

    /// Look up a node by id
    pub fn node(&self, id: NodeId) -> Option<&GraphNode> {
        self.nodes.iter().find(|n| n.id == id)
    }

    /// Look up a node by chain identity
    pub fn node_for_identity(&self, identity: &PluginId) -> Option<&GraphNode> {
        self.nodes
            .iter()
            .find(|n| n.identity.as_ref() == Some(identity))
    }

    /// Connections leaving a node
    pub fn connections_from(&self, id: NodeId) -> Vec<Connection> {
        self.connections
            .iter()
            .filter(|c| c.source == id)
            .copied()
            .collect()
    }

    /// Connections touching a node, either direction
    pub fn connections_of(&self, id: NodeId) -> Vec<Connection> {
        self.connections
            .iter()
            .filter(|c| c.source == id || c.dest == id)
            .copied()
            .collect()
    }

    /// Live instances of every plugin node, bypassed ones included
    pub fn live_instances(&self) -> Vec<(PluginId, SharedPluginInstance)> {
        self.nodes
            .iter()
            .filter_map(|n| match (&n.identity, &n.instance) {
                (Some(id), Some(instance)) => Some((id.clone(), instance.clone())),
                _ => None,
            })
            .collect()
    }

    /// Process one stereo block through the signal path in place
    pub fn process_block(&self, left: &mut [f32], right: &mut [f32]) {
        for node_id in &self.path {
            if let Some(node) = self.node(*node_id) {
                if let Some(instance) = &node.instance {
                    instance.lock().unwrap().process(left, right);
                }
            }
        }
    }

    fn connect_stereo(&mut self, source: NodeId, dest: NodeId) {
        for channel in 0..CHANNELS {
            self.connections.push(Connection {
                source,
                dest,
                channel,
            });
        }
    }

    // Follow left-channel connections from input to output. The walk
    // is bounded so a malformed connection set cannot loop forever.
    fn resolve_path(&self) -> Vec<NodeId> {
        let mut path = vec![NodeId::INPUT];
        let mut current = NodeId::INPUT;
        for _ in 0..=self.connections.len() {
            let next = self
                .connections
                .iter()
                .find(|c| c.source == current && c.channel == 0)
                .map(|c| c.dest);
            match next {
                Some(dest) => {
                    path.push(dest);
                    if dest == NodeId::OUTPUT {
                        return path;
                    }
                    current = dest;
                }
                None => break,
            }
        }
        warn!("Signal path does not reach the output sentinel");
        path
    }
}

/// Instantiator for graphs with no plugin entries
struct NullInstantiator;

impl Instantiator for NullInstantiator {
    fn instantiate(
        &self,
        info: &crate::plugin_host::PluginInfo,
        _sample_rate: f32,
        _max_block_size: usize,
    ) -> crate::plugin_host::HostResult<SharedPluginInstance> {
        Err(crate::plugin_host::HostError::Instantiation(format!(
            "no instantiator for {}",
            info.id
        )))
    }
}
