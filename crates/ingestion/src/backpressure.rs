//! Channel hand-off with drop policy

use async_channel::{Receiver, Sender, TrySendError};
use contracts::{DropPolicy, ScanPacket};
use metrics::counter;
use tracing::{trace, warn};

use crate::config::IngestionMetrics;

/// Enqueue a packet without blocking the source thread.
///
/// Returns `true` if `packet` made it into the channel. With
/// [`DropPolicy::DropOldest`] the oldest queued scan is evicted to make
/// room; `rx` must be a clone of the channel's receiver for that.
pub fn send_packet(
    tx: &Sender<ScanPacket>,
    rx: &Receiver<ScanPacket>,
    packet: ScanPacket,
    metrics: &IngestionMetrics,
    source_id: &str,
    drop_policy: DropPolicy,
) -> bool {
    let packet = match tx.try_send(packet) {
        Ok(()) => {
            metrics.update_queue_len(tx.len());
            trace!(source_id = %source_id, "scan enqueued");
            return true;
        }
        Err(TrySendError::Full(packet)) => packet,
        Err(TrySendError::Closed(_)) => {
            warn!(source_id = %source_id, "channel closed");
            return false;
        }
    };

    match drop_policy {
        DropPolicy::DropNewest => {
            record_drop(metrics, source_id);
            trace!(source_id = %source_id, "scan dropped (newest)");
            false
        }
        DropPolicy::DropOldest => {
            if rx.try_recv().is_ok() {
                record_drop(metrics, source_id);
                trace!(source_id = %source_id, "scan dropped (oldest)");
            }
            // another producer may have taken the freed slot
            match tx.try_send(packet) {
                Ok(()) => {
                    metrics.update_queue_len(tx.len());
                    true
                }
                Err(_) => {
                    record_drop(metrics, source_id);
                    false
                }
            }
        }
    }
}

fn record_drop(metrics: &IngestionMetrics, source_id: &str) {
    metrics.record_dropped();
    counter!("obstacle_monitor_scans_dropped_total", "source_id" => source_id.to_string())
        .increment(1);
}
