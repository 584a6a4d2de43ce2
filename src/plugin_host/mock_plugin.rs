//! Mock Plugin Instance for Testing
//!
//! Deterministic plugin implementation used by the test suite. Each mock
//! applies a fixed gain so a test can tell which stages actually touched
//! a buffer, and the instantiator can be told to fail for specific
//! plugin names to exercise the skip-on-instantiation-failure path.

use super::instance::{Instantiator, PluginInstance, SharedPluginInstance};
use super::types::*;
use std::collections::HashSet;
use std::sync::{Arc, Mutex};

/// Mock plugin that scales the input by a fixed gain
#[derive(Clone, Debug)]
pub struct MockPluginInstance {
    /// Plugin info
    info: PluginInfo,
    /// Gain applied to both channels
    gain: f32,
    /// Opaque state blob
    state: Vec<u8>,
    /// Whether initialized
    initialized: bool,
    /// Total blocks processed (for assertions)
    blocks_processed: u64,
}

impl MockPluginInstance {
    /// Create a mock with the given gain
    pub fn new(info: PluginInfo, gain: f32) -> Self {
        Self {
            info,
            gain,
            state: Vec::new(),
            initialized: false,
            blocks_processed: 0,
        }
    }

    /// Catalog entry for a mock effect
    pub fn mock_plugin_info(name: &str) -> PluginInfo {
        PluginInfo {
            id: PluginId::new(name, "1.0.0", PluginFormat::Vst3),
            vendor: "Chainhost Test".to_string(),
            category: PluginCategory::Effect,
            num_inputs: 2,
            num_outputs: 2,
            path: format!("mock://{}", name),
        }
    }

    /// Number of blocks processed so far
    pub fn blocks_processed(&self) -> u64 {
        self.blocks_processed
    }
}

impl PluginInstance for MockPluginInstance {
    fn info(&self) -> &PluginInfo {
        &self.info
    }

    fn initialize(&mut self, _sample_rate: f32, _max_block_size: usize) -> HostResult<()> {
        self.initialized = true;
        Ok(())
    }

    fn process(&mut self, left: &mut [f32], right: &mut [f32]) {
        for sample in left.iter_mut() {
            *sample *= self.gain;
        }
        for sample in right.iter_mut() {
            *sample *= self.gain;
        }
        self.blocks_processed += 1;
    }

    fn state(&self) -> HostResult<Vec<u8>> {
        Ok(self.state.clone())
    }

    fn set_state(&mut self, state: &[u8]) -> HostResult<()> {
        self.state = state.to_vec();
        Ok(())
    }
}

/// Instantiator producing [`MockPluginInstance`]s
///
/// Gain per instance is `0.5` unless overridden; names registered via
/// [`fail_for`](MockInstantiator::fail_for) error instead.
pub struct MockInstantiator {
    /// Gain for created mocks
    gain: f32,
    /// Plugin names whose instantiation fails
    failing: HashSet<String>,
}

impl Default for MockInstantiator {
    fn default() -> Self {
        Self::new()
    }
}

impl MockInstantiator {
    /// Create a mock instantiator with the default gain
    pub fn new() -> Self {
        Self {
            gain: 0.5,
            failing: HashSet::new(),
        }
    }

    /// Set the gain applied by created mocks
    pub fn with_gain(mut self, gain: f32) -> Self {
        self.gain = gain;
        self
    }

    /// Make instantiation fail for the named plugin
    pub fn fail_for(mut self, name: &str) -> Self {
        self.failing.insert(name.to_string());
        self
    }
}

impl Instantiator for MockInstantiator {
    fn instantiate(
        &self,
        info: &PluginInfo,
        sample_rate: f32,
        max_block_size: usize,
    ) -> HostResult<SharedPluginInstance> {
        if self.failing.contains(&info.id.name) {
            return Err(HostError::Instantiation(format!(
                "mock refuses to load {}",
                info.id.name
            )));
        }
        let mut mock = MockPluginInstance::new(info.clone(), self.gain);
        mock.initialize(sample_rate, max_block_size)?;
        Ok(Arc::new(Mutex::new(mock)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mock_applies_gain() {
        let info = MockPluginInstance::mock_plugin_info("HalfGain");
        let mut mock = MockPluginInstance::new(info, 0.5);
        mock.initialize(44100.0, 512).unwrap();

        let mut left = vec![1.0f32; 8];
        let mut right = vec![0.5f32; 8];
        mock.process(&mut left, &mut right);

        assert!(left.iter().all(|&s| s == 0.5));
        assert!(right.iter().all(|&s| s == 0.25));
        assert_eq!(mock.blocks_processed(), 1);
    }

    #[test]
    fn test_mock_instantiator_failure_injection() {
        let instantiator = MockInstantiator::new().fail_for("Broken");

        let good = MockPluginInstance::mock_plugin_info("Fine");
        assert!(instantiator.instantiate(&good, 44100.0, 512).is_ok());

        let bad = MockPluginInstance::mock_plugin_info("Broken");
        // `unwrap_err()` would require the Ok type (SharedPluginInstance, a
        // `dyn` trait object) to implement Debug, which it cannot. Extract the
        // error by hand without changing what the test checks.
        let err = match instantiator.instantiate(&bad, 44100.0, 512) {
            Ok(_) => panic!("expected instantiation to fail for \"Broken\""),
            Err(e) => e,
        };
        assert!(matches!(err, HostError::Instantiation(_)));
    }

    #[test]
    fn test_mock_state_round_trip() {
        let info = MockPluginInstance::mock_plugin_info("Stateful");
        let mut mock = MockPluginInstance::new(info, 1.0);

        let blob: Vec<u8> = (0u8..=255).collect();
        mock.set_state(&blob).unwrap();
        assert_eq!(mock.state().unwrap(), blob);
    }
}
