//! Scan adapter
//!
//! Bridges a [`ScanSource`] callback into the shared ingestion channel.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_channel::{Receiver, Sender};
use contracts::{ScanCallback, ScanPacket, ScanSource};
use tracing::{debug, trace};

use crate::backpressure::send_packet;
use crate::config::{BackpressureConfig, IngestionMetrics};

/// Wraps one registered source and applies its backpressure policy.
pub struct GenericScanAdapter {
    source_id: String,
    source: Box<dyn ScanSource>,
    config: BackpressureConfig,
    listening: Arc<AtomicBool>,
}

impl GenericScanAdapter {
    pub fn new(source_id: String, source: Box<dyn ScanSource>, config: BackpressureConfig) -> Self {
        Self {
            source_id,
            source,
            config,
            listening: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn source_id(&self) -> &str {
        &self.source_id
    }

    /// Start the source; its packets go to `tx`.
    ///
    /// `rx` is only used to evict queued scans under `DropOldest`.
    pub fn start(
        &self,
        tx: Sender<ScanPacket>,
        rx: Receiver<ScanPacket>,
        metrics: Arc<IngestionMetrics>,
    ) {
        if self.listening.swap(true, Ordering::SeqCst) {
            return;
        }

        let source_id = self.source_id.clone();
        let drop_policy = self.config.drop_policy;
        let listening = self.listening.clone();

        debug!(source_id = %source_id, ?drop_policy, "starting scan adapter");

        let callback: ScanCallback = Arc::new(move |packet| {
            if !listening.load(Ordering::Relaxed) {
                return;
            }

            metrics.record_received();
            trace!(source_id = %source_id, seq = packet.seq, "adapter received scan");
            send_packet(&tx, &rx, packet, &metrics, &source_id, drop_policy);
        });

        self.source.listen(callback);
    }

    pub fn stop(&self) {
        if self.listening.swap(false, Ordering::SeqCst) {
            debug!(source_id = %self.source_id, "stopping scan adapter");
            self.source.stop();
        }
    }

    /// Adapter has been started and not stopped
    pub fn is_listening(&self) -> bool {
        self.listening.load(Ordering::Relaxed)
    }

    /// The underlying source is still producing
    pub fn is_source_active(&self) -> bool {
        self.source.is_listening()
    }
}
