//! MonitorBlueprint - Config Loader output
//!
//! Describes the whole monitor: scan sources, ingestion backpressure and
//! report routing.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use validator::Validate;

/// Configuration version
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ConfigVersion {
    #[default]
    V1,
}

/// Complete monitor configuration
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct MonitorBlueprint {
    /// Configuration version
    #[serde(default)]
    pub version: ConfigVersion,

    /// Scan sources
    #[validate(nested)]
    pub sources: Vec<SourceConfig>,

    /// Ingestion channel settings
    #[serde(default)]
    #[validate(nested)]
    pub ingestion: IngestionConfig,

    /// Report routing
    #[serde(default)]
    #[validate(nested)]
    pub sinks: Vec<SinkConfig>,
}

/// Scan source configuration
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct SourceConfig {
    /// Unique identifier
    #[validate(length(min = 1, message = "source id cannot be empty"))]
    pub id: String,

    /// Where scans come from
    pub source_type: SourceType,

    /// Scan rate (Hz), must be > 0
    #[serde(default = "default_frequency_hz")]
    #[validate(range(exclusive_min = 0.0, message = "frequency_hz must be > 0"))]
    pub frequency_hz: f64,

    /// Type-specific parameters
    #[serde(default)]
    pub params: HashMap<String, String>,
}

fn default_frequency_hz() -> f64 {
    10.0
}

/// Scan source kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceType {
    /// Synthetic sweeping-obstacle generator
    Mock,
    /// JSON-lines recording
    Replay,
}

/// Ingestion channel configuration
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct IngestionConfig {
    /// Capacity of the shared scan channel
    #[serde(default = "default_channel_capacity")]
    #[validate(range(min = 1, message = "channel_capacity must be >= 1"))]
    pub channel_capacity: usize,

    /// What to drop when the channel is full
    #[serde(default)]
    pub drop_policy: DropPolicy,
}

impl Default for IngestionConfig {
    fn default() -> Self {
        Self {
            channel_capacity: default_channel_capacity(),
            drop_policy: DropPolicy::default(),
        }
    }
}

fn default_channel_capacity() -> usize {
    100
}

/// Drop policy (when backpressure is full)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DropPolicy {
    /// Evict the oldest queued scan; the consumer always sees the latest sweep
    #[default]
    DropOldest,
    /// Discard the incoming scan
    DropNewest,
}

/// Sink output configuration
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct SinkConfig {
    /// Sink name
    #[validate(length(min = 1, message = "sink name cannot be empty"))]
    pub name: String,

    /// Sink type
    pub sink_type: SinkType,

    /// Queue capacity
    #[serde(default = "default_queue_capacity")]
    #[validate(range(min = 1, message = "queue_capacity must be >= 1"))]
    pub queue_capacity: usize,

    /// Type-specific parameters
    #[serde(default)]
    pub params: HashMap<String, String>,
}

fn default_queue_capacity() -> usize {
    100
}

/// Sink type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SinkType {
    /// tracing output
    Log,
    /// Plain lines on stdout
    Console,
    /// File output
    File,
    /// Network output (UDP)
    Network,
}

impl MonitorBlueprint {
    /// Find a source configuration by ID
    pub fn source(&self, id: &str) -> Option<&SourceConfig> {
        self.sources.iter().find(|s| s.id == id)
    }

    /// Sources of the given kind
    pub fn sources_of_type(&self, source_type: SourceType) -> impl Iterator<Item = &SourceConfig> {
        self.sources
            .iter()
            .filter(move |s| s.source_type == source_type)
    }
}
