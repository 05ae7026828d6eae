//! Backpressure configuration and metrics

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

pub use contracts::DropPolicy;
use contracts::IngestionConfig;

/// Backpressure configuration
#[derive(Debug, Clone)]
pub struct BackpressureConfig {
    /// Channel capacity
    pub channel_capacity: usize,

    /// Drop policy when full
    pub drop_policy: DropPolicy,
}

impl Default for BackpressureConfig {
    fn default() -> Self {
        Self {
            channel_capacity: 100,
            drop_policy: DropPolicy::DropOldest,
        }
    }
}

impl BackpressureConfig {
    /// Create new backpressure configuration
    pub fn new(channel_capacity: usize, drop_policy: DropPolicy) -> Self {
        Self {
            channel_capacity,
            drop_policy,
        }
    }
}

impl From<&IngestionConfig> for BackpressureConfig {
    fn from(config: &IngestionConfig) -> Self {
        Self::new(config.channel_capacity, config.drop_policy)
    }
}

/// Ingestion metrics
#[derive(Debug, Default)]
pub struct IngestionMetrics {
    /// Total scans received from sources
    pub scans_received: AtomicU64,

    /// Total scans dropped (either policy)
    pub scans_dropped: AtomicU64,

    /// Queue length observed at the last enqueue
    pub queue_len: AtomicUsize,

    /// Recorded lines that failed to decode
    pub parse_errors: AtomicU64,
}

impl IngestionMetrics {
    /// Create new metrics instance
    pub fn new() -> Self {
        Self::default()
    }

    /// Record scan received
    pub fn record_received(&self) {
        self.scans_received.fetch_add(1, Ordering::Relaxed);
    }

    /// Record scan dropped
    pub fn record_dropped(&self) {
        self.scans_dropped.fetch_add(1, Ordering::Relaxed);
    }

    /// Record parse error
    pub fn record_parse_error(&self) {
        self.parse_errors.fetch_add(1, Ordering::Relaxed);
    }

    /// Update queue length
    pub fn update_queue_len(&self, len: usize) {
        self.queue_len.store(len, Ordering::Relaxed);
    }

    /// Get snapshot
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            scans_received: self.scans_received.load(Ordering::Relaxed),
            scans_dropped: self.scans_dropped.load(Ordering::Relaxed),
            queue_len: self.queue_len.load(Ordering::Relaxed),
            parse_errors: self.parse_errors.load(Ordering::Relaxed),
        }
    }
}

/// Metrics snapshot
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub scans_received: u64,
    pub scans_dropped: u64,
    pub queue_len: usize,
    pub parse_errors: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_ingestion_config() {
        let config = IngestionConfig {
            channel_capacity: 8,
            drop_policy: DropPolicy::DropNewest,
        };
        let bp = BackpressureConfig::from(&config);
        assert_eq!(bp.channel_capacity, 8);
        assert_eq!(bp.drop_policy, DropPolicy::DropNewest);
    }

    #[test]
    fn snapshot_reflects_counters() {
        let metrics = IngestionMetrics::new();
        metrics.record_received();
        metrics.record_received();
        metrics.record_dropped();
        metrics.update_queue_len(3);

        let snap = metrics.snapshot();
        assert_eq!(snap.scans_received, 2);
        assert_eq!(snap.scans_dropped, 1);
        assert_eq!(snap.queue_len, 3);
        assert_eq!(snap.parse_errors, 0);
    }
}
