//! Ingestion Pipeline main entry

use std::collections::HashMap;
use std::sync::Arc;

use async_channel::{bounded, Receiver, Sender};
use contracts::{ScanPacket, ScanSource, SourceConfig};
use tracing::{debug, info, instrument};

use crate::config::{BackpressureConfig, IngestionMetrics};
use crate::error::{IngestionError, Result};
use crate::factory::source_from_config;
use crate::generic_adapter::GenericScanAdapter;

/// Ingestion Pipeline
///
/// Owns the registered sources and merges their scans into one bounded
/// channel.
pub struct IngestionPipeline {
    /// Registered adapters
    adapters: HashMap<String, GenericScanAdapter>,

    /// Shared metrics
    metrics: Arc<IngestionMetrics>,

    /// Data sender, dropped by [`seal`](Self::seal)
    tx: Option<Sender<ScanPacket>>,

    /// Kept for `DropOldest` eviction
    evict_rx: Receiver<ScanPacket>,

    /// Data receiver
    rx: Option<Receiver<ScanPacket>>,

    /// Default backpressure configuration
    default_config: BackpressureConfig,
}

impl IngestionPipeline {
    /// Create with the given channel capacity and the default drop policy
    pub fn new(channel_capacity: usize) -> Self {
        Self::with_config(BackpressureConfig {
            channel_capacity,
            ..Default::default()
        })
    }

    /// Create with custom backpressure configuration
    pub fn with_config(config: BackpressureConfig) -> Self {
        let (tx, rx) = bounded(config.channel_capacity.max(1));

        Self {
            adapters: HashMap::new(),
            metrics: Arc::new(IngestionMetrics::new()),
            tx: Some(tx),
            evict_rx: rx.clone(),
            rx: Some(rx),
            default_config: config,
        }
    }

    /// Register a scan source under `source_id`.
    #[instrument(
        name = "ingestion_register_source",
        skip(self, source, config),
        fields(source_id = %source_id)
    )]
    pub fn register_source(
        &mut self,
        source_id: String,
        source: Box<dyn ScanSource>,
        config: Option<BackpressureConfig>,
    ) -> Result<()> {
        if self.adapters.contains_key(&source_id) {
            return Err(IngestionError::DuplicateSource { source_id });
        }

        let adapter = GenericScanAdapter::new(
            source_id.clone(),
            source,
            config.unwrap_or_else(|| self.default_config.clone()),
        );
        debug!(source_id = %source_id, "registered scan source");
        self.adapters.insert(source_id, adapter);
        Ok(())
    }

    /// Build and register a source from its configuration entry
    pub fn register_from_config(&mut self, config: &SourceConfig) -> Result<()> {
        let source = source_from_config(config, &self.metrics)?;
        self.register_source(config.id.clone(), source, None)
    }

    /// Start all registered sources
    #[instrument(name = "ingestion_start_all", skip(self))]
    pub fn start_all(&self) {
        let Some(tx) = &self.tx else {
            debug!("pipeline sealed, not starting sources");
            return;
        };

        info!(count = self.adapters.len(), "starting all scan adapters");
        for (source_id, adapter) in &self.adapters {
            if !adapter.is_listening() {
                debug!(source_id = %source_id, "starting adapter");
                adapter.start(tx.clone(), self.evict_rx.clone(), self.metrics.clone());
            }
        }
    }

    /// Stop all sources
    #[instrument(name = "ingestion_stop_all", skip(self))]
    pub fn stop_all(&self) {
        info!(count = self.adapters.len(), "stopping all scan adapters");
        for (source_id, adapter) in &self.adapters {
            if adapter.is_listening() {
                debug!(source_id = %source_id, "stopping adapter");
                adapter.stop();
            }
        }
    }

    /// Drop the pipeline's own sender.
    ///
    /// Once every started source has finished and released its sender,
    /// the receiver observes the channel as closed. Call after `start_all`.
    pub fn seal(&mut self) {
        if self.tx.take().is_some() {
            debug!("ingestion pipeline sealed");
        }
    }

    /// Get data stream receiver
    ///
    /// Can only be called once, subsequent calls return None
    pub fn take_receiver(&mut self) -> Option<Receiver<ScanPacket>> {
        self.rx.take()
    }

    /// Get metrics reference
    pub fn metrics(&self) -> Arc<IngestionMetrics> {
        self.metrics.clone()
    }

    /// Get registered source count
    pub fn source_count(&self) -> usize {
        self.adapters.len()
    }

    /// Check if the specified source is listening
    pub fn is_source_listening(&self, source_id: &str) -> bool {
        self.adapters
            .get(source_id)
            .is_some_and(|a| a.is_listening())
    }

    /// Whether any source is still producing scans
    pub fn any_source_active(&self) -> bool {
        self.adapters.values().any(|a| a.is_source_active())
    }
}

impl Drop for IngestionPipeline {
    fn drop(&mut self) {
        self.stop_all();
    }
}
