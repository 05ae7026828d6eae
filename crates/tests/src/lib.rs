//! # Integration Tests
//!
//! Cross-crate and end-to-end tests.
//!
//! Covers:
//! - report wire shape
//! - mock and replay pipelines (sources -> reducer -> dispatcher -> sinks)
//! - backpressure under a stalled consumer

#[cfg(test)]
mod contract_tests {
    use contracts::{ObstacleReport, ObstacleResult, SourceId, NO_OBSTACLE_LINE};

    #[test]
    fn test_report_json_shape() {
        let report = ObstacleReport {
            source_id: SourceId::new("front"),
            timestamp: 0.5,
            seq: 7,
            result: ObstacleResult::Found {
                distance: 0.5,
                index: 2,
                angle_degrees: 114.59,
            },
        };

        let value = serde_json::to_value(&report).unwrap();
        assert_eq!(value["source_id"], "front");
        assert_eq!(value["seq"], 7);
        assert_eq!(value["result"]["status"], "found");
        assert_eq!(value["result"]["index"], 2);

        let not_found = ObstacleReport {
            result: ObstacleResult::NotFound,
            ..report
        };
        let value = serde_json::to_value(&not_found).unwrap();
        assert_eq!(value["result"]["status"], "not_found");
        assert_eq!(not_found.result.to_string(), NO_OBSTACLE_LINE);
    }
}

#[cfg(test)]
mod e2e_tests {
    use std::collections::HashMap;
    use std::io::Write;
    use std::path::Path;
    use std::time::Duration;

    use config_loader::{ConfigFormat, ConfigLoader};
    use contracts::{
        DropPolicy, ObstacleReport, ObstacleResult, SinkConfig, SinkType, NO_OBSTACLE_LINE,
    };
    use dispatcher::{create_dispatcher, SinkReport};
    use ingestion::{BackpressureConfig, IngestionPipeline};
    use observability::ObstacleStatsAggregator;
    use tokio::sync::mpsc;

    fn file_sink(name: &str, path: &Path, format: &str) -> SinkConfig {
        SinkConfig {
            name: name.to_string(),
            sink_type: SinkType::File,
            queue_capacity: 1000,
            params: HashMap::from([
                ("path".to_string(), path.display().to_string()),
                ("format".to_string(), format.to_string()),
            ]),
        }
    }

    /// Drain the ingestion channel through the reducer into the sinks.
    async fn run_pipeline(
        mut ingestion: IngestionPipeline,
        sinks: Vec<SinkConfig>,
    ) -> (ObstacleStatsAggregator, SinkReport) {
        let (report_tx, report_rx) = mpsc::channel::<ObstacleReport>(100);
        let dispatcher = create_dispatcher(sinks, report_rx).await.unwrap();
        let dispatcher_handle = dispatcher.spawn();

        let scan_rx = ingestion.take_receiver().unwrap();
        ingestion.start_all();
        ingestion.seal();

        let mut aggregator = ObstacleStatsAggregator::new();
        let consume = async {
            while let Ok(packet) = scan_rx.recv().await {
                let report = obstacle_reducer::reduce_packet(&packet);
                aggregator.update(&report);
                report_tx.send(report).await.unwrap();
            }
        };
        tokio::time::timeout(Duration::from_secs(5), consume)
            .await
            .expect("sources did not finish in time");

        ingestion.stop_all();
        drop(report_tx);

        let sink_report = tokio::time::timeout(Duration::from_secs(5), dispatcher_handle)
            .await
            .expect("dispatcher did not shut down")
            .unwrap();

        (aggregator, sink_report)
    }

    /// End-to-end test: MockScanSource -> reducer -> Dispatcher -> FileSink
    ///
    /// The mock obstacle sweeps `sweep_step` beams per scan, so the reported
    /// index follows the sequence number.
    #[tokio::test]
    async fn test_e2e_mock_pipeline() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("reports.jsonl");

        let blueprint = ConfigLoader::load_from_str(
            r#"
[[sources]]
id = "front"
source_type = "mock"
frequency_hz = 500.0
params = { num_samples = "120", sweep_step = "7", max_scans = "12" }

[ingestion]
channel_capacity = 64
"#,
            ConfigFormat::Toml,
        )
        .unwrap();

        let mut ingestion =
            IngestionPipeline::with_config(BackpressureConfig::from(&blueprint.ingestion));
        for source in &blueprint.sources {
            ingestion.register_from_config(source).unwrap();
        }

        let (aggregator, sink_report) =
            run_pipeline(ingestion, vec![file_sink("jsonl", &out, "jsonl")]).await;

        assert_eq!(aggregator.total_scans, 12);
        assert_eq!(aggregator.found, 12);
        assert_eq!(sink_report[0].1.write_count, 12);

        let contents = std::fs::read_to_string(&out).unwrap();
        let reports: Vec<ObstacleReport> = contents
            .lines()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect();
        assert_eq!(reports.len(), 12);

        for report in &reports {
            match report.result {
                ObstacleResult::Found {
                    distance, index, ..
                } => {
                    assert_eq!(distance, 1.5);
                    assert_eq!(index as u64, report.seq * 7 % 120);
                }
                ObstacleResult::NotFound => panic!("mock scan without obstacle"),
            }
        }
    }

    /// Replay a recording holding the reference cases and check the exact
    /// rendered lines.
    #[tokio::test]
    async fn test_e2e_replay_pipeline() {
        let dir = tempfile::tempdir().unwrap();
        let recording = dir.path().join("scans.jsonl");
        let mut file = std::fs::File::create(&recording).unwrap();
        let lines = [
            // tie-break keeps the first minimum
            r#"{"timestamp":0.00,"ranges":[5.0,3.0,3.0,4.0],"angle_min":0.0,"angle_increment":0.0,"range_min":0.1,"range_max":10.0}"#,
            // single sample, zero geometry
            r#"{"timestamp":0.01,"ranges":[1.0],"angle_min":0.0,"angle_increment":0.0,"range_min":0.0,"range_max":2.0}"#,
            // non-finite samples skipped
            r#"{"timestamp":0.02,"ranges":["inf",null,0.5],"angle_min":0.0,"angle_increment":1.0,"range_min":0.0,"range_max":1.0}"#,
            // all invalid
            r#"{"timestamp":0.03,"ranges":[0.0,1.0],"angle_min":0.0,"angle_increment":0.1,"range_min":0.0,"range_max":1.0}"#,
            // another source in the same file
            r#"{"timestamp":0.04,"source_id":"rear","ranges":[0.2],"angle_min":0.0,"angle_increment":0.0,"range_min":0.1,"range_max":1.0}"#,
        ];
        for line in lines {
            writeln!(file, "{line}").unwrap();
        }
        drop(file);

        let out = dir.path().join("reports.log");
        let config = format!(
            r#"{{
  "sources": [
    {{ "id": "front", "source_type": "replay", "params": {{ "path": "{}", "speed": "4.0" }} }}
  ],
  "sinks": [
    {{ "name": "log", "sink_type": "log" }}
  ]
}}"#,
            recording.display()
        );
        let blueprint = ConfigLoader::load_from_str(&config, ConfigFormat::Json).unwrap();

        let mut ingestion = IngestionPipeline::new(16);
        ingestion.register_from_config(&blueprint.sources[0]).unwrap();

        let mut sinks = blueprint.sinks.clone();
        sinks.push(file_sink("text", &out, "text"));
        let (aggregator, sink_report) = run_pipeline(ingestion, sinks).await;

        assert_eq!(aggregator.total_scans, 4);
        assert_eq!(aggregator.not_found, 1);
        assert_eq!(sink_report.len(), 2);
        assert!(sink_report.iter().all(|(_, s)| s.write_count == 4));

        let contents = std::fs::read_to_string(&out).unwrap();
        let rendered: Vec<_> = contents.lines().collect();
        assert_eq!(
            rendered,
            vec![
                "[front #0] Closest obstacle: 3.00 [m] at index 1 (0.00 [deg])".to_string(),
                "[front #1] Closest obstacle: 1.00 [m] at index 0 (0.00 [deg])".to_string(),
                "[front #2] Closest obstacle: 0.50 [m] at index 2 (114.59 [deg])".to_string(),
                format!("[front #3] {NO_OBSTACLE_LINE}"),
            ]
        );
    }

    /// A stalled consumer with `drop_oldest` ends up holding the newest scans.
    #[tokio::test]
    async fn test_drop_oldest_keeps_latest_scans() {
        let blueprint = ConfigLoader::load_from_str(
            r#"
[[sources]]
id = "front"
source_type = "mock"
frequency_hz = 1000.0
params = { num_samples = "36", max_scans = "20" }

[ingestion]
channel_capacity = 2
drop_policy = "drop_oldest"
"#,
            ConfigFormat::Toml,
        )
        .unwrap();
        assert_eq!(blueprint.ingestion.drop_policy, DropPolicy::DropOldest);

        let mut ingestion =
            IngestionPipeline::with_config(BackpressureConfig::from(&blueprint.ingestion));
        ingestion.register_from_config(&blueprint.sources[0]).unwrap();
        let scan_rx = ingestion.take_receiver().unwrap();
        ingestion.start_all();
        ingestion.seal();

        // Let the source run to its limit before consuming anything
        while ingestion.any_source_active() {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }

        let mut seqs = Vec::new();
        let drain = async {
            while let Ok(packet) = scan_rx.recv().await {
                seqs.push(packet.seq);
            }
        };
        tokio::time::timeout(Duration::from_secs(2), drain)
            .await
            .expect("channel did not close");

        assert_eq!(seqs, vec![18, 19]);
        let snapshot = ingestion.metrics().snapshot();
        assert_eq!(snapshot.scans_received, 20);
        assert_eq!(snapshot.scans_dropped, 18);
    }
}
