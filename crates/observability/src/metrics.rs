//! Obstacle monitor metrics
//!
//! Exported through the `metrics` facade and aggregated in memory for the
//! end-of-run summary.

use std::collections::BTreeMap;

use contracts::{ObstacleReport, ObstacleResult};
use metrics::{counter, gauge, histogram};

/// Record one reduced scan.
///
/// # Example
///
/// ```ignore
/// let report = obstacle_reducer::reduce_packet(&packet);
/// observability::metrics::record_scan_reduced(&report);
/// ```
pub fn record_scan_reduced(report: &ObstacleReport) {
    let source_id = report.source_id.to_string();

    match report.result {
        ObstacleResult::Found {
            distance,
            angle_degrees,
            ..
        } => {
            counter!(
                "obstacle_monitor_scans_total",
                "source_id" => source_id.clone(),
                "status" => "found"
            )
            .increment(1);
            gauge!("obstacle_monitor_nearest_distance_m", "source_id" => source_id.clone())
                .set(distance);
            gauge!("obstacle_monitor_nearest_bearing_deg", "source_id" => source_id.clone())
                .set(angle_degrees);
            histogram!("obstacle_monitor_nearest_distance_m_hist", "source_id" => source_id)
                .record(distance);
        }
        ObstacleResult::NotFound => {
            counter!(
                "obstacle_monitor_scans_total",
                "source_id" => source_id,
                "status" => "not_found"
            )
            .increment(1);
        }
    }
}

/// Record time spent reducing one scan
pub fn record_reduce_latency_us(latency_us: f64) {
    histogram!("obstacle_monitor_reduce_latency_us").record(latency_us);
}

/// Record the scan sample count, to spot truncated sweeps
pub fn record_scan_size(source_id: &str, samples: usize) {
    gauge!("obstacle_monitor_scan_samples", "source_id" => source_id.to_string())
        .set(samples as f64);
}

/// Publish ingestion counters (absolute values)
pub fn record_ingestion(received: u64, dropped: u64, parse_errors: u64, queue_len: usize) {
    counter!("obstacle_monitor_ingestion_received_total").absolute(received);
    counter!("obstacle_monitor_ingestion_dropped_total").absolute(dropped);
    counter!("obstacle_monitor_ingestion_parse_errors_total").absolute(parse_errors);
    gauge!("obstacle_monitor_ingestion_queue_len").set(queue_len as f64);
}

/// Final delivery counters of one sink
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SinkTotals {
    pub written: u64,
    pub failed: u64,
    /// Dropped at the sink's own queue
    pub dropped: u64,
    /// Sequence numbers the sink never saw
    pub skipped: u64,
}

/// Publish per-sink delivery totals (absolute values)
pub fn record_sink_totals(sink_name: &str, totals: SinkTotals) {
    let sink = sink_name.to_string();
    counter!("obstacle_monitor_reports_written_total", "sink" => sink.clone())
        .absolute(totals.written);
    counter!("obstacle_monitor_reports_failed_total", "sink" => sink.clone())
        .absolute(totals.failed);
    counter!("obstacle_monitor_reports_dropped_total", "sink" => sink.clone())
        .absolute(totals.dropped);
    counter!("obstacle_monitor_reports_skipped_total", "sink" => sink).absolute(totals.skipped);
}

/// Obstacle statistics aggregator
///
/// Aggregates reduced scans in memory for the run summary.
#[derive(Debug, Clone, Default)]
pub struct ObstacleStatsAggregator {
    /// Scans reduced
    pub total_scans: u64,

    /// Scans with a valid obstacle
    pub found: u64,

    /// Scans without any valid sample
    pub not_found: u64,

    /// Nearest distance statistics (metres)
    pub distance_stats: RunningStats,

    /// Per-source scan counts
    pub per_source: BTreeMap<String, SourceCounts>,
}

/// Found / not-found counts of one source
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SourceCounts {
    pub found: u64,
    pub not_found: u64,
}

impl ObstacleStatsAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn update(&mut self, report: &ObstacleReport) {
        self.total_scans += 1;
        let counts = self
            .per_source
            .entry(report.source_id.to_string())
            .or_default();

        match report.result {
            ObstacleResult::Found { distance, .. } => {
                self.found += 1;
                counts.found += 1;
                self.distance_stats.push(distance);
            }
            ObstacleResult::NotFound => {
                self.not_found += 1;
                counts.not_found += 1;
            }
        }
    }

    /// Generate summary report
    pub fn summary(&self) -> ObstacleSummary {
        ObstacleSummary {
            total_scans: self.total_scans,
            found: self.found,
            not_found: self.not_found,
            found_rate: if self.total_scans > 0 {
                self.found as f64 / self.total_scans as f64 * 100.0
            } else {
                0.0
            },
            distance_m: StatsSummary::from(&self.distance_stats),
            per_source: self.per_source.clone(),
        }
    }
}

/// Run summary
#[derive(Debug, Clone, Default)]
pub struct ObstacleSummary {
    pub total_scans: u64,
    pub found: u64,
    pub not_found: u64,
    pub found_rate: f64,
    pub distance_m: StatsSummary,
    pub per_source: BTreeMap<String, SourceCounts>,
}

impl std::fmt::Display for ObstacleSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "=== Obstacle Summary ===")?;
        writeln!(f, "Scans reduced: {}", self.total_scans)?;
        writeln!(f, "Obstacle found: {} ({:.2}%)", self.found, self.found_rate)?;
        writeln!(f, "No valid obstacle: {}", self.not_found)?;
        writeln!(f, "Nearest distance (m): {}", self.distance_m)?;

        if !self.per_source.is_empty() {
            writeln!(f, "Per source:")?;
            for (source, counts) in &self.per_source {
                writeln!(
                    f,
                    "  {}: found={}, not_found={}",
                    source, counts.found, counts.not_found
                )?;
            }
        }

        Ok(())
    }
}

/// Summary of a [`RunningStats`]
#[derive(Debug, Clone, Default)]
pub struct StatsSummary {
    pub count: u64,
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    pub std_dev: f64,
}

impl From<&RunningStats> for StatsSummary {
    fn from(stats: &RunningStats) -> Self {
        Self {
            count: stats.count,
            min: stats.min,
            max: stats.max,
            mean: stats.mean(),
            std_dev: stats.std_dev(),
        }
    }
}

impl std::fmt::Display for StatsSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.count == 0 {
            write!(f, "N/A")
        } else {
            write!(
                f,
                "min={:.3}, max={:.3}, mean={:.3}, std={:.3} (n={})",
                self.min, self.max, self.mean, self.std_dev, self.count
            )
        }
    }
}

/// Online statistics (Welford's algorithm)
#[derive(Debug, Clone, Default)]
pub struct RunningStats {
    count: u64,
    mean: f64,
    m2: f64,
    min: f64,
    max: f64,
}

impl RunningStats {
    pub fn push(&mut self, value: f64) {
        self.count += 1;

        if self.count == 1 {
            self.min = value;
            self.max = value;
            self.mean = value;
            self.m2 = 0.0;
        } else {
            self.min = self.min.min(value);
            self.max = self.max.max(value);

            let delta = value - self.mean;
            self.mean += delta / self.count as f64;
            let delta2 = value - self.mean;
            self.m2 += delta * delta2;
        }
    }

    pub fn count(&self) -> u64 {
        self.count
    }

    pub fn mean(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.mean
        }
    }

    /// Sample variance
    pub fn variance(&self) -> f64 {
        if self.count < 2 {
            0.0
        } else {
            self.m2 / (self.count - 1) as f64
        }
    }

    pub fn std_dev(&self) -> f64 {
        self.variance().sqrt()
    }

    pub fn min(&self) -> f64 {
        self.min
    }

    pub fn max(&self) -> f64 {
        self.max
    }
}
