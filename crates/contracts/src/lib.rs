//! # Contracts
//!
//! Frozen interface contracts (ICD), defining inter-module data structures and traits.
//! All business crates can only depend on this crate, reverse dependencies are prohibited.
//!
//! ## Data flow
//! - `ScanSource` produces `ScanPacket`s (ingestion input)
//! - the reducer turns each `ScanRecord` into an `ObstacleResult`
//! - `ReportSink`s consume `ObstacleReport`s (dispatcher output)
//!
//! ## Time Model
//! - `timestamp` is the source clock in seconds (f64)
//! - `seq` is a per-source counter, used for ordering/diagnostics

mod blueprint;
mod error;
mod obstacle;
mod scan;
mod scan_source;
mod sink;
mod source_id;

pub use blueprint::*;
pub use error::*;
pub use obstacle::*;
pub use scan::*;
pub use scan_source::{ScanCallback, ScanSource};
pub use sink::*;
pub use source_id::SourceId;
