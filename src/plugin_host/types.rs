//! Core types for plugin hosting
//!
//! Defines the fundamental types used throughout the host:
//! - Plugin identity and formats
//! - Plugin metadata from the catalog
//! - Error types

use serde::{Deserialize, Serialize};
use std::fmt;

/// Supported plugin formats
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PluginFormat {
    /// Legacy Steinberg VST2 format (deprecated but widely used)
    Vst2,
    /// Steinberg VST3 format
    Vst3,
    /// Apple Audio Unit (macOS/iOS)
    AudioUnit,
    /// CLAP (CLever Audio Plugin)
    Clap,
    /// Linux Audio Plugins (LV2)
    Lv2,
}

impl fmt::Display for PluginFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PluginFormat::Vst2 => write!(f, "VST2"),
            PluginFormat::Vst3 => write!(f, "VST3"),
            PluginFormat::AudioUnit => write!(f, "AU"),
            PluginFormat::Clap => write!(f, "CLAP"),
            PluginFormat::Lv2 => write!(f, "LV2"),
        }
    }
}

/// Persisted per-plugin attributes, each living under its own settings key
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Attribute {
    /// Integer rank defining the plugin's position in the chain
    Order,
    /// Whether the plugin is excluded from audio routing
    Bypass,
    /// Opaque plugin state, base64-encoded
    State,
}

impl Attribute {
    /// Attribute name as it appears in settings keys
    pub fn as_str(self) -> &'static str {
        match self {
            Attribute::Order => "order",
            Attribute::Bypass => "bypass",
            Attribute::State => "state",
        }
    }
}

/// Unique plugin identifier: one logical chain slot
///
/// Two instances with identical name, version, and format share all
/// persisted attributes and are treated as the same slot.
#[derive(Clone, Debug, Hash, PartialEq, Eq, Serialize, Deserialize)]
pub struct PluginId {
    /// Human-readable plugin name
    pub name: String,
    /// Plugin version string
    pub version: String,
    /// Plugin format (VST3, AU, etc.)
    pub format: PluginFormat,
}

impl PluginId {
    /// Create an identity from its parts
    pub fn new(name: &str, version: &str, format: PluginFormat) -> Self {
        Self {
            name: name.to_string(),
            version: version.to_string(),
            format,
        }
    }

    /// Settings key addressing one attribute of this plugin,
    /// e.g. `plugin-order-Compressor1.2VST3`
    pub fn settings_key(&self, attribute: Attribute) -> String {
        format!(
            "plugin-{}-{}{}{}",
            attribute.as_str(),
            self.name,
            self.version,
            self.format
        )
    }
}

impl fmt::Display for PluginId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} ({})", self.name, self.version, self.format)
    }
}

/// Plugin category
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum PluginCategory {
    /// Synthesizer (generates audio from MIDI)
    Instrument,
    /// Audio effect (processes audio)
    Effect,
    /// Unknown/uncategorized
    Unknown,
}

/// Plugin metadata from the catalog
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PluginInfo {
    /// Unique plugin identifier
    pub id: PluginId,
    /// Plugin vendor/manufacturer
    pub vendor: String,
    /// Plugin category
    pub category: PluginCategory,
    /// Number of audio inputs
    pub num_inputs: usize,
    /// Number of audio outputs
    pub num_outputs: usize,
    /// File path or bundle path
    pub path: String,
}

impl PluginInfo {
    /// Check if this is an effect
    pub fn is_effect(&self) -> bool {
        matches!(self.category, PluginCategory::Effect)
    }

    /// Whether the plugin can sit on a stereo chain (2 in, 2 out)
    pub fn is_stereo_capable(&self) -> bool {
        self.num_inputs >= 2 && self.num_outputs >= 2
    }
}

/// Host error types
#[derive(Debug)]
pub enum HostError {
    /// Operation targeted an identity the host does not know
    IdentityNotFound(String),
    /// Instantiation service could not produce a runtime instance
    Instantiation(String),
    /// Settings store read/write failed
    StoreIo(String),
    /// Serialization error
    Serde(String),
    /// Audio device error
    Audio(String),
    /// IO error
    Io(std::io::Error),
}

impl fmt::Display for HostError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HostError::IdentityNotFound(id) => write!(f, "Plugin not found: {}", id),
            HostError::Instantiation(msg) => write!(f, "Failed to instantiate plugin: {}", msg),
            HostError::StoreIo(msg) => write!(f, "Settings store failure: {}", msg),
            HostError::Serde(msg) => write!(f, "Serialization error: {}", msg),
            HostError::Audio(msg) => write!(f, "Audio error: {}", msg),
            HostError::Io(e) => write!(f, "IO error: {}", e),
        }
    }
}

impl std::error::Error for HostError {}

impl From<std::io::Error> for HostError {
    fn from(e: std::io::Error) -> Self {
        HostError::Io(e)
    }
}

/// Result type for host operations
pub type HostResult<T> = Result<T, HostError>;
