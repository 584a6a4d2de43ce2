//! # Chainhost - Audio Plugin Chain Host
//!
//! Chainhost keeps an ordered chain of audio plugins, routes a live
//! stereo signal through the non-bypassed members, and persists the
//! chain (membership, order, bypass flags, and each plugin's internal
//! state) in a flat string-keyed settings store, so the whole setup
//! survives restarts.
//!
//! ## How it fits together
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │  ChainEngine: add / remove / move / bypass / rebuild         │
//! └──────────────────────────────────────────────────────────────┘
//!            │ mutate                │ snapshot state   │ publish
//!            ▼                       ▼                  ▼
//! ┌──────────────────┐   ┌──────────────────┐   ┌──────────────────┐
//! │  ChainModel      │   │  SettingsStore   │   │  RoutingGraph    │
//! │  ordered entries │   │  flat key-value  │   │  input→…→output  │
//! └──────────────────┘   └──────────────────┘   └──────────────────┘
//! ```
//!
//! The chain's order lives in the store as one integer per plugin;
//! the in-memory model keeps the sorted view and writes through on
//! every mutation. The routing graph is derived and disposable: each
//! mutation rebuilds it from scratch off to the side and publishes it
//! atomically, so the audio callback never sees a half-wired graph.
//!
//! ## Quick start
//!
//! ```rust
//! use chainhost::engine::ChainEngine;
//! use chainhost::plugin_host::{MockInstantiator, MockPluginInstance, PluginRegistry};
//! use chainhost::settings::MemoryStore;
//!
//! let mut registry = PluginRegistry::new();
//! registry.add_plugin(MockPluginInstance::mock_plugin_info("Comp"));
//! registry.add_plugin(MockPluginInstance::mock_plugin_info("Verb"));
//!
//! let mut engine = ChainEngine::new(
//!     Box::new(MemoryStore::new()),
//!     registry,
//!     Box::new(MockInstantiator::new()),
//! )
//! .unwrap();
//!
//! let comp = engine.registry().find("Comp").unwrap().id.clone();
//! let verb = engine.registry().find("Verb").unwrap().id.clone();
//! engine.add_plugin(&comp).unwrap();
//! engine.add_plugin(&verb).unwrap();
//! engine.toggle_bypass(&verb).unwrap();
//!
//! // Verb stays in the chain but out of the audio path
//! assert_eq!(engine.current_chain(), vec![(comp, false), (verb, true)]);
//! ```

pub mod audio;
pub mod chain;
pub mod engine;
pub mod graph;
pub mod plugin_host;
pub mod settings;

pub use engine::{ChainEngine, DeviceSettings};
pub use graph::{Connection, NodeId, RoutingGraph};
pub use plugin_host::{
    HostError, HostResult, PluginFormat, PluginId, PluginInfo, PluginRegistry,
};
pub use settings::{FileStore, MemoryStore, SettingsStore};
