//! Plugin Host Module
//!
//! Identity, catalog, and instantiation for the plugins on the chain.
//! The host addresses every plugin by its [`PluginId`] (name + version +
//! format), looks metadata up in the [`PluginRegistry`], and obtains
//! runnable instances through the [`Instantiator`] seam.

pub mod instance;
pub mod mock_plugin;
pub mod registry;
pub mod types;

// Re-exports for convenience
pub use instance::{
    FormatInstantiator, Instantiator, PluginInstance, PluginInstanceHandle, SharedPluginInstance,
};
pub use mock_plugin::{MockInstantiator, MockPluginInstance};
pub use registry::PluginRegistry;
pub use types::*;
