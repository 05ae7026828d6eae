//! # Ingestion Pipeline
//!
//! Scan ingress.
//!
//! Responsibilities:
//! - Build scan sources from configuration (mock generator, JSONL replay)
//! - Forward each `ScanPacket` into one bounded async-channel
//! - Apply the drop policy when the consumer falls behind
//!
//! ## Usage Example
//!
//! ```ignore
//! use ingestion::{BackpressureConfig, IngestionPipeline};
//!
//! let mut pipeline = IngestionPipeline::with_config(BackpressureConfig::from(&blueprint.ingestion));
//! for source in &blueprint.sources {
//!     pipeline.register_from_config(source)?;
//! }
//!
//! let rx = pipeline.take_receiver().unwrap();
//! pipeline.start_all();
//! pipeline.seal();
//!
//! while let Ok(packet) = rx.recv().await {
//!     // reduce the scan
//! }
//! ```

mod backpressure;
mod config;
mod error;
mod factory;
mod generic_adapter;
mod mock;
mod pipeline;
mod replay;

// Re-exports
pub use backpressure::send_packet;
pub use config::{BackpressureConfig, DropPolicy, IngestionMetrics, MetricsSnapshot};
pub use contracts::ScanPacket;
pub use error::{IngestionError, Result};
pub use factory::source_from_config;
pub use generic_adapter::GenericScanAdapter;
pub use mock::{synthesize, MockScanConfig, MockScanSource};
pub use pipeline::IngestionPipeline;
pub use replay::{ReplayConfig, ReplayScanSource};
