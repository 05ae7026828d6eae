//! # Dispatcher
//!
//! Report fan-out.
//!
//! Responsibilities:
//! - Consume `ObstacleReport`s
//! - Fan-out to multiple sinks
//! - Isolate slow sinks so they never block the pipeline

pub mod dispatcher;
pub mod error;
pub mod handle;
pub mod metrics;
pub mod sinks;

pub use contracts::{ObstacleReport, ReportSink};
pub use dispatcher::{
    create_dispatcher, Dispatcher, DispatcherBuilder, DispatcherConfig, SinkReport,
};
pub use error::DispatcherError;
pub use handle::{SeqCheck, SequenceTracker, SinkHandle, WorkerOptions};
pub use metrics::{SinkMetrics, SinkSnapshot};
pub use sinks::{ConsoleSink, FileSink, LogSink, NetworkSink};
