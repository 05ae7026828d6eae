//! Pipeline orchestrator - coordinates all components.
//!
//! Scans flow from the ingestion channel through the reducer, one packet at
//! a time, and every resulting report is handed to the dispatcher.

use std::collections::HashMap;
use std::future::Future;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use contracts::{MonitorBlueprint, ObstacleReport, ScanPacket, SinkConfig, SinkType};
use ingestion::{BackpressureConfig, IngestionPipeline, MetricsSnapshot};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use super::{PipelineStats, StopReason};
use crate::error::CliError;

/// How long sinks get to flush after the input closes
const DISPATCHER_DRAIN_TIMEOUT: Duration = Duration::from_secs(5);

/// Publish ingestion counters every N reduced scans
const INGESTION_PUBLISH_INTERVAL: u64 = 100;

/// Pipeline configuration
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// The monitor configuration
    pub blueprint: MonitorBlueprint,

    /// Maximum number of scans to reduce (None = unlimited)
    pub max_scans: Option<u64>,

    /// Pipeline timeout (None = no timeout)
    pub timeout: Option<Duration>,

    /// Capacity of the reducer to dispatcher channel
    pub buffer_size: usize,

    /// Metrics server port (None = disabled)
    pub metrics_port: Option<u16>,
}

/// Main pipeline orchestrator
pub struct Pipeline {
    config: PipelineConfig,
}

impl Pipeline {
    /// Create a new pipeline with the given configuration
    pub fn new(config: PipelineConfig) -> Self {
        Self { config }
    }

    /// Run the pipeline until the sources finish, a limit is hit, or
    /// `shutdown` resolves. Sinks are flushed in every case.
    pub async fn run<F>(self, shutdown: F) -> Result<PipelineStats>
    where
        F: Future<Output = ()>,
    {
        let start_time = Instant::now();
        let blueprint = &self.config.blueprint;

        if let Some(port) = self.config.metrics_port {
            observability::init_metrics_only(port)?;
            info!(port, "Metrics endpoint available");
        }

        // Setup Ingestion Pipeline
        info!("Setting up ingestion pipeline...");
        let mut ingestion =
            IngestionPipeline::with_config(BackpressureConfig::from(&blueprint.ingestion));
        for source in &blueprint.sources {
            ingestion
                .register_from_config(source)
                .with_context(|| format!("Failed to create source '{}'", source.id))?;
        }
        let active_sources = ingestion.source_count();

        info!(
            active_sources,
            channel_capacity = blueprint.ingestion.channel_capacity,
            drop_policy = ?blueprint.ingestion.drop_policy,
            "Ingestion pipeline configured"
        );

        // Setup Dispatcher
        info!("Setting up dispatcher...");
        let (report_tx, report_rx) = mpsc::channel::<ObstacleReport>(self.config.buffer_size.max(1));

        let sinks = if blueprint.sinks.is_empty() {
            warn!("No sinks configured - printing results to stdout");
            vec![default_console_sink(self.config.buffer_size)]
        } else {
            blueprint.sinks.clone()
        };

        let dispatcher = dispatcher::create_dispatcher(sinks, report_rx)
            .await
            .context("Failed to create dispatcher")?;

        let active_sinks = dispatcher.sink_count();
        let dispatcher_handle = dispatcher.spawn();

        info!(active_sinks, "Dispatcher started");

        // Start Pipeline
        let scan_rx = ingestion
            .take_receiver()
            .ok_or_else(|| CliError::pipeline_execution("ingestion receiver already taken"))?;

        info!("Starting scan ingestion...");
        ingestion.start_all();
        ingestion.seal();

        let ingestion_metrics = ingestion.metrics();
        let max_scans = self.config.max_scans;
        let timeout = self.config.timeout;

        info!(
            max_scans = ?max_scans,
            timeout_secs = ?timeout.map(|t| t.as_secs()),
            "Pipeline running"
        );

        let mut stats = PipelineStats {
            active_sources,
            active_sinks,
            ..Default::default()
        };

        let deadline = async {
            match timeout {
                Some(limit) => tokio::time::sleep(limit).await,
                None => std::future::pending().await,
            }
        };
        tokio::pin!(deadline);
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                biased;

                _ = &mut shutdown => {
                    warn!("Received shutdown signal, stopping pipeline...");
                    stats.stop_reason = StopReason::Signal;
                    break;
                }
                _ = &mut deadline => {
                    warn!(timeout_secs = ?timeout.map(|t| t.as_secs()), "Pipeline timed out");
                    stats.stop_reason = StopReason::Timeout;
                    break;
                }
                next = scan_rx.recv() => {
                    let Ok(packet) = next else {
                        info!("All sources finished");
                        stats.stop_reason = StopReason::SourcesExhausted;
                        break;
                    };

                    let report = reduce_scan(&packet);
                    stats.scans_reduced += 1;
                    stats.obstacles.update(&report);

                    if stats.scans_reduced.is_multiple_of(INGESTION_PUBLISH_INTERVAL) {
                        publish_ingestion(&ingestion_metrics.snapshot());
                    }

                    if report_tx.send(report).await.is_err() {
                        warn!("Dispatcher channel closed");
                        stats.stop_reason = StopReason::DispatcherClosed;
                        break;
                    }

                    if max_scans.is_some_and(|max| stats.scans_reduced >= max) {
                        info!(scans = stats.scans_reduced, "Reached max scans limit");
                        stats.stop_reason = StopReason::MaxScans;
                        break;
                    }
                }
            }
        }

        // Shutdown
        info!("Shutting down pipeline...");
        ingestion.stop_all();
        drop(report_tx);

        match tokio::time::timeout(DISPATCHER_DRAIN_TIMEOUT, dispatcher_handle).await {
            Ok(Ok(sink_report)) => stats.sinks = sink_report,
            Ok(Err(e)) => warn!(error = %e, "Dispatcher task failed"),
            Err(_) => warn!(
                timeout_secs = DISPATCHER_DRAIN_TIMEOUT.as_secs(),
                "Timed out waiting for sinks to flush"
            ),
        }

        for (name, snapshot) in &stats.sinks {
            observability::record_sink_totals(
                name,
                observability::SinkTotals {
                    written: snapshot.write_count,
                    failed: snapshot.failure_count,
                    dropped: snapshot.dropped_count,
                    skipped: snapshot.skipped_count,
                },
            );
        }

        stats.ingestion = ingestion_metrics.snapshot();
        publish_ingestion(&stats.ingestion);
        stats.duration = start_time.elapsed();

        info!(
            duration_secs = stats.duration.as_secs_f64(),
            scans_per_sec = format!("{:.2}", stats.scans_per_sec()),
            stop_reason = %stats.stop_reason,
            "Pipeline shutdown complete"
        );

        Ok(stats)
    }
}

/// Reduce one scan and record its metrics
fn reduce_scan(packet: &ScanPacket) -> ObstacleReport {
    let started = Instant::now();
    let report = obstacle_reducer::reduce_packet(packet);
    observability::record_reduce_latency_us(started.elapsed().as_secs_f64() * 1e6);
    observability::record_scan_size(&packet.source_id, packet.scan.len());
    observability::record_scan_reduced(&report);

    debug!(
        source_id = %report.source_id,
        seq = report.seq,
        samples = packet.scan.len(),
        result = %report.result,
        "Scan reduced"
    );

    report
}

fn publish_ingestion(snapshot: &MetricsSnapshot) {
    observability::record_ingestion(
        snapshot.scans_received,
        snapshot.scans_dropped,
        snapshot.parse_errors,
        snapshot.queue_len,
    );
}

/// Sink used when the configuration names none
fn default_console_sink(queue_capacity: usize) -> SinkConfig {
    SinkConfig {
        name: "stdout".to_string(),
        sink_type: SinkType::Console,
        queue_capacity: queue_capacity.max(1),
        params: HashMap::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::{ConfigVersion, IngestionConfig, SourceConfig, SourceType, NO_OBSTACLE_LINE};
    use std::io::Write;

    fn mock_source(id: &str, max_scans: u64) -> SourceConfig {
        SourceConfig {
            id: id.to_string(),
            source_type: SourceType::Mock,
            frequency_hz: 200.0,
            params: HashMap::from([
                ("num_samples".to_string(), "90".to_string()),
                ("max_scans".to_string(), max_scans.to_string()),
            ]),
        }
    }

    fn file_sink(path: &std::path::Path) -> SinkConfig {
        SinkConfig {
            name: "file".to_string(),
            sink_type: SinkType::File,
            queue_capacity: 1000,
            params: HashMap::from([("path".to_string(), path.display().to_string())]),
        }
    }

    fn config(sources: Vec<SourceConfig>, sinks: Vec<SinkConfig>) -> PipelineConfig {
        PipelineConfig {
            blueprint: MonitorBlueprint {
                version: ConfigVersion::V1,
                sources,
                ingestion: IngestionConfig {
                    channel_capacity: 1000,
                    ..Default::default()
                },
                sinks,
            },
            max_scans: None,
            timeout: None,
            buffer_size: 100,
            metrics_port: None,
        }
    }

    #[tokio::test]
    async fn test_runs_until_sources_exhausted() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("out.log");
        let pipeline = Pipeline::new(config(vec![mock_source("front", 20)], vec![file_sink(&out)]));

        let stats = pipeline.run(std::future::pending()).await.unwrap();

        assert_eq!(stats.stop_reason, StopReason::SourcesExhausted);
        assert_eq!(stats.scans_reduced, 20);
        assert_eq!(stats.obstacles.found, 20);
        assert_eq!(stats.ingestion.scans_received, 20);
        assert_eq!(stats.sinks.len(), 1);
        assert_eq!(stats.sinks[0].1.write_count, 20);

        let contents = std::fs::read_to_string(&out).unwrap();
        assert_eq!(contents.lines().count(), 20);
        assert!(contents
            .lines()
            .all(|line| line.contains("] Closest obstacle: 1.50 [m] at index ")));
    }

    #[tokio::test]
    async fn test_stops_at_max_scans() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("out.log");
        let mut cfg = config(vec![mock_source("front", 0)], vec![file_sink(&out)]);
        cfg.max_scans = Some(5);

        let stats = Pipeline::new(cfg).run(std::future::pending()).await.unwrap();

        assert_eq!(stats.stop_reason, StopReason::MaxScans);
        assert_eq!(stats.scans_reduced, 5);
        let contents = std::fs::read_to_string(&out).unwrap();
        assert_eq!(contents.lines().count(), 5);
    }

    #[tokio::test]
    async fn test_stops_on_timeout() {
        let dir = tempfile::tempdir().unwrap();
        let mut cfg = config(
            vec![mock_source("front", 0)],
            vec![file_sink(&dir.path().join("out.log"))],
        );
        cfg.timeout = Some(Duration::from_millis(100));

        let stats = Pipeline::new(cfg).run(std::future::pending()).await.unwrap();

        assert_eq!(stats.stop_reason, StopReason::Timeout);
    }

    #[tokio::test]
    async fn test_stops_on_shutdown_signal() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = config(
            vec![mock_source("front", 0)],
            vec![file_sink(&dir.path().join("out.log"))],
        );

        let stats = Pipeline::new(cfg)
            .run(tokio::time::sleep(Duration::from_millis(50)))
            .await
            .unwrap();

        assert_eq!(stats.stop_reason, StopReason::Signal);
        assert_eq!(stats.sinks[0].1.write_count, stats.scans_reduced);
    }

    #[tokio::test]
    async fn test_replay_source_reports_each_line() {
        let dir = tempfile::tempdir().unwrap();
        let recording = dir.path().join("scans.jsonl");
        let mut file = std::fs::File::create(&recording).unwrap();
        writeln!(
            file,
            r#"{{"timestamp":0.0,"ranges":[5.0,3.0,3.0,4.0],"angle_min":0.0,"angle_increment":0.5,"range_min":0.1,"range_max":10.0}}"#
        )
        .unwrap();
        writeln!(
            file,
            r#"{{"timestamp":0.01,"ranges":[],"angle_min":0.0,"angle_increment":0.5,"range_min":0.1,"range_max":10.0}}"#
        )
        .unwrap();
        drop(file);

        let out = dir.path().join("out.log");
        let source = SourceConfig {
            id: "front".to_string(),
            source_type: SourceType::Replay,
            frequency_hz: 10.0,
            params: HashMap::from([("path".to_string(), recording.display().to_string())]),
        };

        let stats = Pipeline::new(config(vec![source], vec![file_sink(&out)]))
            .run(std::future::pending())
            .await
            .unwrap();

        assert_eq!(stats.scans_reduced, 2);
        let contents = std::fs::read_to_string(&out).unwrap();
        let lines: Vec<_> = contents.lines().collect();
        assert_eq!(
            lines[0],
            "[front #0] Closest obstacle: 3.00 [m] at index 1 (28.65 [deg])"
        );
        assert_eq!(lines[1], format!("[front #1] {NO_OBSTACLE_LINE}"));
    }

    #[test]
    fn test_default_console_sink() {
        let sink = default_console_sink(0);
        assert_eq!(sink.sink_type, SinkType::Console);
        assert_eq!(sink.queue_capacity, 1);
    }
}
