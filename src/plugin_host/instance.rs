//! Plugin Instance
//!
//! Runtime plugin instances and the instantiation seam. The host never
//! loads plugin binaries itself; it asks an [`Instantiator`] for a
//! runnable instance and talks to it through the [`PluginInstance`]
//! trait: stereo block processing plus opaque state save/restore.

use super::types::*;
use std::sync::{Arc, Mutex};

/// A runnable plugin instance on the stereo chain
pub trait PluginInstance: Send {
    /// Catalog metadata this instance was created from
    fn info(&self) -> &PluginInfo;

    /// Prepare for processing at the given sample rate and block size
    fn initialize(&mut self, sample_rate: f32, max_block_size: usize) -> HostResult<()>;

    /// Process one stereo block in place
    fn process(&mut self, left: &mut [f32], right: &mut [f32]);

    /// Current internal state as an opaque blob
    fn state(&self) -> HostResult<Vec<u8>>;

    /// Restore internal state from an opaque blob
    fn set_state(&mut self, state: &[u8]) -> HostResult<()>;
}

/// Thread-safe shared handle to a plugin instance
pub type SharedPluginInstance = Arc<Mutex<dyn PluginInstance>>;

/// Produces runtime instances for chain entries
///
/// This is the seam to the real plugin format loaders (VST3/CLAP/...).
/// The default [`FormatInstantiator`] produces passthrough handles;
/// tests use the mock in [`super::mock_plugin`].
pub trait Instantiator: Send {
    /// Create and initialize an instance for the given catalog entry
    fn instantiate(
        &self,
        info: &PluginInfo,
        sample_rate: f32,
        max_block_size: usize,
    ) -> HostResult<SharedPluginInstance>;
}

/// Handle to a loaded plugin instance
///
/// Holds the audio-settings context and the opaque state blob. Until a
/// real format loader is wired in, processing is a passthrough: audio
/// flows through the chain position unchanged.
#[derive(Clone, Debug)]
pub struct PluginInstanceHandle {
    /// Plugin info
    info: PluginInfo,
    /// Sample rate
    sample_rate: f32,
    /// Maximum block size
    max_block_size: usize,
    /// Opaque internal state
    state: Vec<u8>,
    /// Whether the plugin is initialized
    initialized: bool,
}

impl PluginInstanceHandle {
    /// Create a new plugin instance (not yet initialized)
    pub fn new(info: PluginInfo) -> Self {
        Self {
            info,
            sample_rate: 44100.0,
            max_block_size: 512,
            state: Vec::new(),
            initialized: false,
        }
    }

    /// Check if plugin is initialized
    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    /// Sample rate the instance was initialized with
    pub fn sample_rate(&self) -> f32 {
        self.sample_rate
    }
}

impl PluginInstance for PluginInstanceHandle {
    fn info(&self) -> &PluginInfo {
        &self.info
    }

    fn initialize(&mut self, sample_rate: f32, max_block_size: usize) -> HostResult<()> {
        self.sample_rate = sample_rate;
        self.max_block_size = max_block_size;
        self.initialized = true;
        Ok(())
    }

    fn process(&mut self, _left: &mut [f32], _right: &mut [f32]) {
        // Passthrough: buffers flow on unchanged
    }

    fn state(&self) -> HostResult<Vec<u8>> {
        Ok(self.state.clone())
    }

    fn set_state(&mut self, state: &[u8]) -> HostResult<()> {
        self.state = state.to_vec();
        Ok(())
    }
}

/// Default instantiation service
///
/// Creates a [`PluginInstanceHandle`] per chain entry. A real format
/// loader replaces this by implementing [`Instantiator`] against the
/// actual plugin binary.
#[derive(Default)]
pub struct FormatInstantiator;

impl FormatInstantiator {
    /// Create the default instantiator
    pub fn new() -> Self {
        Self
    }
}

impl Instantiator for FormatInstantiator {
    fn instantiate(
        &self,
        info: &PluginInfo,
        sample_rate: f32,
        max_block_size: usize,
    ) -> HostResult<SharedPluginInstance> {
        let mut handle = PluginInstanceHandle::new(info.clone());
        handle.initialize(sample_rate, max_block_size)?;
        Ok(Arc::new(Mutex::new(handle)))
    }
}
