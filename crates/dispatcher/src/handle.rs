//! SinkHandle - runs one sink behind its own queue and worker task
//!
//! The worker watches per-source sequence numbers so a sink can tell how many
//! reports never reached it (dropped upstream or at its own queue), and
//! flushes buffered output on a fixed cadence while reports keep flowing.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{Instant, Interval, MissedTickBehavior};
use tracing::{debug, error, instrument, trace, warn};

use contracts::{ObstacleReport, ReportSink, SinkConfig, SourceId};

use crate::metrics::SinkMetrics;

/// Flush cadence used when a sink does not set `flush_interval_ms`
pub const DEFAULT_FLUSH_INTERVAL: Duration = Duration::from_secs(1);

/// How a sink worker is driven
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WorkerOptions {
    /// Reports buffered between the dispatcher and the sink
    pub queue_capacity: usize,
    /// `None` flushes only on shutdown
    pub flush_interval: Option<Duration>,
}

impl WorkerOptions {
    pub fn new(queue_capacity: usize) -> Self {
        Self {
            queue_capacity,
            flush_interval: Some(DEFAULT_FLUSH_INTERVAL),
        }
    }

    pub fn with_flush_interval(mut self, flush_interval: Option<Duration>) -> Self {
        self.flush_interval = flush_interval;
        self
    }

    /// Read `queue_capacity` and the `flush_interval_ms` param (`0` disables
    /// periodic flushing)
    pub fn from_config(config: &SinkConfig) -> Result<Self, String> {
        let flush_interval = match config.params.get("flush_interval_ms") {
            None => Some(DEFAULT_FLUSH_INTERVAL),
            Some(raw) => match raw.parse::<u64>() {
                Ok(0) => None,
                Ok(ms) => Some(Duration::from_millis(ms)),
                Err(e) => return Err(format!("invalid flush_interval_ms '{}': {}", raw, e)),
            },
        };
        Ok(Self::new(config.queue_capacity).with_flush_interval(flush_interval))
    }
}

/// Where a report's sequence number sits relative to the previous report
/// from the same source
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeqCheck {
    /// First report seen from this source
    First,
    /// Directly follows the previous report (including the wrap at `u64::MAX`)
    Next,
    /// This many sequence numbers were skipped
    Gap(u64),
    /// Not ahead of the previous report; the source restarted its numbering
    Rewind,
}

/// Last sequence number seen per source
#[derive(Debug, Default)]
pub struct SequenceTracker {
    last: HashMap<SourceId, u64>,
}

impl SequenceTracker {
    pub fn observe(&mut self, report: &ObstacleReport) -> SeqCheck {
        match self.last.insert(report.source_id.clone(), report.seq) {
            None => SeqCheck::First,
            Some(last) if last.wrapping_add(1) == report.seq => SeqCheck::Next,
            Some(last) if report.seq > last => SeqCheck::Gap(report.seq - last - 1),
            Some(_) => SeqCheck::Rewind,
        }
    }
}

/// Handle to a running sink worker
pub struct SinkHandle {
    name: String,
    tx: mpsc::Sender<ObstacleReport>,
    metrics: Arc<SinkMetrics>,
    worker_handle: JoinHandle<()>,
}

impl SinkHandle {
    /// Spawn the worker task for `sink`
    pub fn spawn<S: ReportSink + Send + 'static>(sink: S, options: WorkerOptions) -> Self {
        let name = sink.name().to_string();
        let (tx, rx) = mpsc::channel(options.queue_capacity.max(1));
        let metrics = Arc::new(SinkMetrics::new());

        let worker = SinkWorker {
            sink,
            metrics: Arc::clone(&metrics),
            sequences: SequenceTracker::default(),
            unflushed: false,
            name: name.clone(),
        };
        let worker_handle = tokio::spawn(worker.run(rx, options.flush_interval));

        Self {
            name,
            tx,
            metrics,
            worker_handle,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn metrics(&self) -> &Arc<SinkMetrics> {
        &self.metrics
    }

    /// Queue a report for the sink without waiting.
    ///
    /// Returns false if the queue is full (report dropped) or the worker
    /// has gone away.
    pub fn try_send(&self, report: ObstacleReport) -> bool {
        match self.tx.try_send(report) {
            Ok(()) => {
                self.metrics
                    .set_queue_len(self.tx.max_capacity() - self.tx.capacity());
                true
            }
            Err(mpsc::error::TrySendError::Full(r)) => {
                self.metrics.inc_dropped_count();
                warn!(
                    sink = %self.name,
                    source_id = %r.source_id,
                    seq = r.seq,
                    "Queue full, report dropped"
                );
                false
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                error!(sink = %self.name, "Sink worker closed unexpectedly");
                false
            }
        }
    }

    /// Drain the queue, flush and close the sink
    #[instrument(name = "sink_handle_shutdown", skip(self), fields(sink = %self.name))]
    pub async fn shutdown(self) {
        drop(self.tx);
        if let Err(e) = self.worker_handle.await {
            error!(sink = %self.name, error = ?e, "Worker task panicked");
        }
        debug!(sink = %self.name, "SinkHandle shutdown complete");
    }
}

struct SinkWorker<S> {
    sink: S,
    metrics: Arc<SinkMetrics>,
    sequences: SequenceTracker,
    /// Reports written since the last flush
    unflushed: bool,
    name: String,
}

impl<S: ReportSink> SinkWorker<S> {
    #[instrument(
        name = "sink_worker_loop",
        skip(self, rx, flush_interval),
        fields(sink = %self.name)
    )]
    async fn run(
        mut self,
        mut rx: mpsc::Receiver<ObstacleReport>,
        flush_interval: Option<Duration>,
    ) {
        debug!(sink = %self.name, ?flush_interval, "Sink worker started");

        let mut flush_tick = flush_interval.map(|period| {
            let mut tick = tokio::time::interval_at(Instant::now() + period, period);
            tick.set_missed_tick_behavior(MissedTickBehavior::Delay);
            tick
        });

        loop {
            tokio::select! {
                received = rx.recv() => match received {
                    Some(report) => {
                        self.metrics.set_queue_len(rx.len());
                        self.deliver(&report).await;
                    }
                    None => break,
                },
                _ = next_tick(&mut flush_tick), if self.unflushed => {
                    self.flush("Periodic flush failed").await;
                }
            }
        }

        self.flush("Flush failed on shutdown").await;
        if let Err(e) = self.sink.close().await {
            error!(sink = %self.name, error = %e, "Close failed on shutdown");
        }

        debug!(
            sink = %self.name,
            written = self.metrics.write_count(),
            skipped = self.metrics.skipped_count(),
            "Sink worker stopped"
        );
    }

    async fn deliver(&mut self, report: &ObstacleReport) {
        match self.sequences.observe(report) {
            SeqCheck::First | SeqCheck::Next => {}
            SeqCheck::Gap(missing) => {
                self.metrics.add_skipped_count(missing);
                warn!(
                    sink = %self.name,
                    source_id = %report.source_id,
                    seq = report.seq,
                    missing,
                    "Sequence gap, reports never reached this sink"
                );
            }
            SeqCheck::Rewind => {
                debug!(
                    sink = %self.name,
                    source_id = %report.source_id,
                    seq = report.seq,
                    "Source restarted its sequence"
                );
            }
        }

        match self.sink.write(report).await {
            Ok(()) => {
                self.metrics.inc_write_count();
                self.unflushed = true;
            }
            Err(e) => {
                self.metrics.inc_failure_count();
                error!(
                    sink = %self.name,
                    source_id = %report.source_id,
                    seq = report.seq,
                    error = %e,
                    "Write failed"
                );
            }
        }
    }

    async fn flush(&mut self, failure: &str) {
        self.unflushed = false;
        match self.sink.flush().await {
            Ok(()) => trace!(sink = %self.name, "Flushed"),
            Err(e) => error!(sink = %self.name, error = %e, "{}", failure),
        }
    }
}

async fn next_tick(tick: &mut Option<Interval>) {
    match tick {
        Some(tick) => {
            tick.tick().await;
        }
        None => std::future::pending().await,
    }
}
