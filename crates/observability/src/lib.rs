//! # Observability
//!
//! Prometheus metrics and the in-memory run summary.
//!
//! ## Features
//!
//! - Prometheus exporter
//! - `metrics` facade helpers for the reduce loop
//! - Obstacle statistics for the run summary
//!
//! Tracing is initialised by the binary.
//!
//! ## Example
//!
//! ```ignore
//! observability::init_metrics_only(9000)?;
//!
//! let report = obstacle_reducer::reduce_packet(&packet);
//! observability::metrics::record_scan_reduced(&report);
//! ```

pub mod metrics;

use anyhow::{Context, Result};
use metrics_exporter_prometheus::PrometheusBuilder;

// Re-exports
pub use crate::metrics::{
    record_ingestion, record_reduce_latency_us, record_scan_reduced, record_scan_size,
    record_sink_totals, ObstacleStatsAggregator, ObstacleSummary, RunningStats, SinkTotals,
    SourceCounts, StatsSummary,
};

/// Install the Prometheus exporter on `0.0.0.0:port`.
///
/// Fails if a global recorder is already installed or the port is taken.
pub fn init_metrics_only(port: u16) -> Result<()> {
    PrometheusBuilder::new()
        .with_http_listener(([0, 0, 0, 0], port))
        .install()
        .context("Failed to install Prometheus recorder")?;

    tracing::info!(port = port, "Prometheus metrics endpoint initialized");
    Ok(())
}
