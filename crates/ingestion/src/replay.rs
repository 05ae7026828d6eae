//! Replay scan source
//!
//! Plays back a JSON-lines recording at its original pacing. Each line is
//! one scan:
//!
//! ```text
//! {"timestamp": 0.1, "seq": 3, "ranges": [1.2, null, "inf"], "angle_min": -1.57,
//!  "angle_increment": 0.01, "range_min": 0.1, "range_max": 10.0}
//! ```
//!
//! `seq` and `source_id` are optional. Lines carrying a `source_id` that
//! differs from the replayed source are skipped.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use contracts::{ContractError, ScanCallback, ScanPacket, ScanRecord, ScanSource, SourceId};
use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::error::Result;

/// Replay configuration
#[derive(Debug, Clone)]
pub struct ReplayConfig {
    /// Playback speed (1.0 = recorded pace)
    pub speed: f64,

    /// Restart from the first scan when the recording ends
    pub loop_playback: bool,

    /// Skip undecodable lines instead of failing the load
    pub skip_invalid: bool,
}

impl Default for ReplayConfig {
    fn default() -> Self {
        Self {
            speed: 1.0,
            loop_playback: false,
            skip_invalid: false,
        }
    }
}

/// One line of a recording
#[derive(Debug, Clone, Deserialize)]
struct RecordedScan {
    timestamp: f64,
    #[serde(default)]
    seq: Option<u64>,
    #[serde(default)]
    source_id: Option<String>,
    #[serde(flatten)]
    scan: ScanRecord,
}

/// Replay scan source
pub struct ReplayScanSource {
    source_id: String,
    records: Arc<Vec<RecordedScan>>,
    skipped_lines: usize,
    config: ReplayConfig,
    listening: Arc<AtomicBool>,
    thread_handle: Mutex<Option<JoinHandle<()>>>,
}

impl ReplayScanSource {
    /// Load the recording at `path` for `source_id`.
    pub fn load(path: &Path, source_id: impl Into<String>, config: ReplayConfig) -> Result<Self> {
        let source_id = source_id.into();
        let reader = BufReader::new(File::open(path)?);

        let mut records = Vec::new();
        let mut skipped_lines = 0;

        for (line_no, line) in reader.lines().enumerate() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }

            let record: RecordedScan = match serde_json::from_str(&line) {
                Ok(record) => record,
                Err(e) if config.skip_invalid => {
                    warn!(
                        source_id = %source_id,
                        line = line_no + 1,
                        error = %e,
                        "skipping undecodable scan"
                    );
                    skipped_lines += 1;
                    continue;
                }
                Err(e) => {
                    return Err(ContractError::scan_decode(
                        source_id,
                        format!("{}:{}: {e}", path.display(), line_no + 1),
                    )
                    .into());
                }
            };

            if record
                .source_id
                .as_deref()
                .is_none_or(|id| id == source_id)
            {
                records.push(record);
            }
        }

        records.sort_by(|a, b| a.timestamp.total_cmp(&b.timestamp));

        info!(
            source_id = %source_id,
            path = %path.display(),
            records = records.len(),
            skipped_lines,
            "loaded scan recording"
        );

        Ok(Self {
            source_id,
            records: Arc::new(records),
            skipped_lines,
            config,
            listening: Arc::new(AtomicBool::new(false)),
            thread_handle: Mutex::new(None),
        })
    }

    /// Number of scans available for playback
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Lines dropped by `skip_invalid`
    pub fn skipped_lines(&self) -> usize {
        self.skipped_lines
    }
}

/// Longest uninterrupted sleep, so `stop` never waits on a long recording gap
const MAX_PAUSE: Duration = Duration::from_millis(50);

/// Sleep until `deadline`. Returns false if playback was stopped meanwhile.
fn pause_until(deadline: Instant, listening: &AtomicBool) -> bool {
    loop {
        if !listening.load(Ordering::Relaxed) {
            return false;
        }
        let now = Instant::now();
        if now >= deadline {
            return true;
        }
        thread::sleep((deadline - now).min(MAX_PAUSE));
    }
}

impl ScanSource for ReplayScanSource {
    fn source_id(&self) -> &str {
        &self.source_id
    }

    fn listen(&self, callback: ScanCallback) {
        if self.listening.swap(true, Ordering::SeqCst) {
            return;
        }

        let listening = self.listening.clone();
        let source_id = self.source_id.clone();
        let records = self.records.clone();
        let speed = self.config.speed.max(0.1);
        let loop_playback = self.config.loop_playback;

        let handle = thread::spawn(move || {
            debug!(source_id = %source_id, speed, "replay thread started");
            let shared_id: SourceId = source_id.as_str().into();
            let mut next_seq: u64 = 0;

            'playback: loop {
                let Some(first) = records.first() else {
                    warn!(source_id = %source_id, "no scans to replay");
                    break;
                };

                let start_time = Instant::now();
                let first_timestamp = first.timestamp;

                for record in records.iter() {
                    if !listening.load(Ordering::Relaxed) {
                        debug!(source_id = %source_id, "replay stopped");
                        break 'playback;
                    }

                    let offset = (record.timestamp - first_timestamp) / speed;
                    let target_elapsed = Duration::try_from_secs_f64(offset).unwrap_or_default();
                    if !pause_until(start_time + target_elapsed, &listening) {
                        debug!(source_id = %source_id, "replay stopped");
                        break 'playback;
                    }

                    let seq = record.seq.unwrap_or(next_seq);
                    next_seq = seq.wrapping_add(1);

                    callback(ScanPacket {
                        source_id: shared_id.clone(),
                        timestamp: record.timestamp,
                        seq,
                        scan: record.scan.clone(),
                    });
                }

                if !loop_playback {
                    info!(source_id = %source_id, "replay completed");
                    break;
                }

                debug!(source_id = %source_id, "looping replay");
            }

            listening.store(false, Ordering::SeqCst);
        });

        if let Ok(mut slot) = self.thread_handle.lock() {
            *slot = Some(handle);
        }
    }

    fn stop(&self) {
        self.listening.store(false, Ordering::SeqCst);

        let handle = self.thread_handle.lock().ok().and_then(|mut slot| slot.take());
        if let Some(handle) = handle {
            let _ = handle.join();
        }
    }

    fn is_listening(&self) -> bool {
        self.listening.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn recording(lines: &[&str]) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        for line in lines {
            writeln!(file, "{line}").unwrap();
        }
        file
    }

    const GEOMETRY: &str =
        r#""angle_min": 0.0, "angle_increment": 0.5, "range_min": 0.1, "range_max": 10.0"#;

    #[test]
    fn load_sorts_and_filters() {
        let file = recording(&[
            &format!(r#"{{"timestamp": 0.2, "ranges": [2.0], {GEOMETRY}}}"#),
            &format!(r#"{{"timestamp": 0.1, "ranges": [1.0, null, "inf"], {GEOMETRY}}}"#),
            "",
            &format!(r#"{{"timestamp": 0.15, "source_id": "rear", "ranges": [], {GEOMETRY}}}"#),
        ]);

        let source = ReplayScanSource::load(file.path(), "front", ReplayConfig::default()).unwrap();

        assert_eq!(source.len(), 2);
        assert_eq!(source.records[0].timestamp, 0.1);
        assert!(source.records[0].scan.ranges[1].is_nan());
        assert!(source.records[0].scan.ranges[2].is_infinite());
    }

    #[test]
    fn bad_line_reports_position() {
        let file = recording(&[
            &format!(r#"{{"timestamp": 0.0, "ranges": [1.0], {GEOMETRY}}}"#),
            r#"{"timestamp": "soon"}"#,
        ]);

        let err = match ReplayScanSource::load(file.path(), "front", ReplayConfig::default()) {
            Ok(_) => panic!("expected decode error"),
            Err(e) => e.to_string(),
        };
        assert!(err.contains(":2:"), "{err}");
    }

    #[test]
    fn skip_invalid_counts_lines() {
        let file = recording(&[
            "not json",
            &format!(r#"{{"timestamp": 0.0, "ranges": [1.0], {GEOMETRY}}}"#),
        ]);
        let config = ReplayConfig {
            skip_invalid: true,
            ..Default::default()
        };

        let source = ReplayScanSource::load(file.path(), "front", config).unwrap();

        assert_eq!(source.len(), 1);
        assert_eq!(source.skipped_lines(), 1);
    }

    #[test]
    fn replays_in_order_and_finishes() {
        let file = recording(&[
            &format!(r#"{{"timestamp": 1.00, "seq": 7, "ranges": [3.0], {GEOMETRY}}}"#),
            &format!(r#"{{"timestamp": 1.01, "ranges": [4.0], {GEOMETRY}}}"#),
            &format!(r#"{{"timestamp": 1.02, "ranges": [5.0], {GEOMETRY}}}"#),
        ]);
        let config = ReplayConfig {
            speed: 10.0,
            ..Default::default()
        };
        let source = ReplayScanSource::load(file.path(), "front", config).unwrap();

        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        source.listen(Arc::new(move |packet: ScanPacket| {
            sink.lock().unwrap().push((packet.seq, packet.scan.ranges[0]));
        }));

        thread::sleep(Duration::from_millis(200));
        assert!(!source.is_listening());
        source.stop();

        assert_eq!(*seen.lock().unwrap(), vec![(7, 3.0), (8, 4.0), (9, 5.0)]);
    }

    #[test]
    fn max_seq_wraps_for_following_scans() {
        let file = recording(&[
            &format!(
                r#"{{"timestamp": 0.00, "seq": {}, "ranges": [3.0], {GEOMETRY}}}"#,
                u64::MAX
            ),
            &format!(r#"{{"timestamp": 0.01, "ranges": [4.0], {GEOMETRY}}}"#),
        ]);
        let config = ReplayConfig {
            speed: 10.0,
            ..Default::default()
        };
        let source = ReplayScanSource::load(file.path(), "front", config).unwrap();

        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        source.listen(Arc::new(move |packet: ScanPacket| {
            sink.lock().unwrap().push(packet.seq);
        }));

        thread::sleep(Duration::from_millis(200));
        assert!(!source.is_listening());
        source.stop();

        assert_eq!(*seen.lock().unwrap(), vec![u64::MAX, 0]);
    }

    #[test]
    fn missing_file_is_io_error() {
        let result = ReplayScanSource::load(
            Path::new("/nonexistent/scans.jsonl"),
            "front",
            ReplayConfig::default(),
        );
        assert!(matches!(result, Err(crate::IngestionError::Io(_))));
    }
}
