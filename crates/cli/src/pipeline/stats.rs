//! Pipeline statistics and metrics.

use std::fmt;
use std::time::Duration;

use dispatcher::SinkReport;
use ingestion::MetricsSnapshot;
use observability::ObstacleStatsAggregator;

/// Why the orchestrator loop ended
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum StopReason {
    /// Every source finished and the channel drained
    #[default]
    SourcesExhausted,
    /// `--max-scans` reached
    MaxScans,
    /// `--timeout` elapsed
    Timeout,
    /// Ctrl+C or SIGTERM
    Signal,
    /// The dispatcher stopped accepting reports
    DispatcherClosed,
}

impl fmt::Display for StopReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Self::SourcesExhausted => "sources exhausted",
            Self::MaxScans => "max scans reached",
            Self::Timeout => "timeout",
            Self::Signal => "shutdown signal",
            Self::DispatcherClosed => "dispatcher closed",
        };
        f.write_str(text)
    }
}

/// Statistics from a pipeline run
#[derive(Debug, Clone, Default)]
pub struct PipelineStats {
    /// Scans reduced to a report
    pub scans_reduced: u64,

    /// Total duration of the pipeline run
    pub duration: Duration,

    /// Number of sources that were registered
    pub active_sources: usize,

    /// Number of sinks that received reports
    pub active_sinks: usize,

    /// Why the run ended
    pub stop_reason: StopReason,

    /// Nearest-obstacle aggregation
    pub obstacles: ObstacleStatsAggregator,

    /// Final ingestion counters
    pub ingestion: MetricsSnapshot,

    /// Final per-sink counters
    pub sinks: SinkReport,
}

impl PipelineStats {
    /// Reduced scans per second
    pub fn scans_per_sec(&self) -> f64 {
        if self.duration.as_secs_f64() > 0.0 {
            self.scans_reduced as f64 / self.duration.as_secs_f64()
        } else {
            0.0
        }
    }

    /// Share of received scans lost to backpressure, in percent
    pub fn drop_rate(&self) -> f64 {
        if self.ingestion.scans_received > 0 {
            self.ingestion.scans_dropped as f64 / self.ingestion.scans_received as f64 * 100.0
        } else {
            0.0
        }
    }

    /// Print detailed summary
    pub fn print_summary(&self) {
        println!("\n╔══════════════════════════════════════════════════════════════╗");
        println!("║                    Pipeline Statistics                       ║");
        println!("╚══════════════════════════════════════════════════════════════╝\n");

        println!("Overview");
        println!("   ├─ Duration: {:.2}s", self.duration.as_secs_f64());
        println!("   ├─ Stopped by: {}", self.stop_reason);
        println!("   ├─ Scans reduced: {}", self.scans_reduced);
        println!("   ├─ Scans/s: {:.2}", self.scans_per_sec());
        println!("   ├─ Active sources: {}", self.active_sources);
        println!("   └─ Active sinks: {}", self.active_sinks);

        println!("\nIngestion");
        println!("   ├─ Received: {}", self.ingestion.scans_received);
        println!(
            "   ├─ Dropped: {} ({:.2}%)",
            self.ingestion.scans_dropped,
            self.drop_rate()
        );
        println!("   └─ Parse errors: {}", self.ingestion.parse_errors);

        let summary = self.obstacles.summary();

        println!("\nObstacles");
        println!(
            "   ├─ Found: {} ({:.2}%)",
            summary.found, summary.found_rate
        );
        println!("   ├─ Not found: {}", summary.not_found);
        println!("   └─ Nearest distance (m): {}", summary.distance_m);

        if !summary.per_source.is_empty() {
            println!("\nPer Source");
            for (i, (source, counts)) in summary.per_source.iter().enumerate() {
                let prefix = if i + 1 == summary.per_source.len() {
                    "└─"
                } else {
                    "├─"
                };
                println!(
                    "   {} {}: found={}, not_found={}",
                    prefix, source, counts.found, counts.not_found
                );
            }
        }

        if !self.sinks.is_empty() {
            println!("\nSinks");
            for (i, (name, snapshot)) in self.sinks.iter().enumerate() {
                let prefix = if i + 1 == self.sinks.len() {
                    "└─"
                } else {
                    "├─"
                };
                println!(
                    "   {} {}: written={}, failed={}, dropped={}, skipped={}",
                    prefix,
                    name,
                    snapshot.write_count,
                    snapshot.failure_count,
                    snapshot.dropped_count,
                    snapshot.skipped_count
                );
            }
        }

        println!();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rates() {
        let stats = PipelineStats {
            scans_reduced: 50,
            duration: Duration::from_secs(5),
            ingestion: MetricsSnapshot {
                scans_received: 60,
                scans_dropped: 15,
                queue_len: 0,
                parse_errors: 0,
            },
            ..Default::default()
        };
        assert_eq!(stats.scans_per_sec(), 10.0);
        assert_eq!(stats.drop_rate(), 25.0);
    }

    #[test]
    fn test_rates_are_zero_when_empty() {
        let stats = PipelineStats::default();
        assert_eq!(stats.scans_per_sec(), 0.0);
        assert_eq!(stats.drop_rate(), 0.0);
        assert_eq!(stats.stop_reason.to_string(), "sources exhausted");
    }
}
