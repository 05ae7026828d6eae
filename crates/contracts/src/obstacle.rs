//! ObstacleResult - Reducer output
//!
//! Nearest-obstacle summary of a single scan and its report envelope.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::SourceId;

/// Sentinel line rendered when a scan holds no valid sample
pub const NO_OBSTACLE_LINE: &str = "No valid obstacles detected within range.";

/// Closest valid obstacle of one scan.
///
/// `NotFound` is an ordinary outcome (empty scan, every sample filtered,
/// degenerate range bounds), not an error.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ObstacleResult {
    Found {
        /// Distance to the obstacle (metres)
        distance: f64,
        /// Index of the sample in `ScanRecord::ranges`
        index: usize,
        /// Bearing of the sample (degrees)
        angle_degrees: f64,
    },
    NotFound,
}

impl ObstacleResult {
    pub fn is_found(&self) -> bool {
        matches!(self, Self::Found { .. })
    }

    /// Distance of the obstacle, if any
    pub fn distance(&self) -> Option<f64> {
        match self {
            Self::Found { distance, .. } => Some(*distance),
            Self::NotFound => None,
        }
    }
}

impl fmt::Display for ObstacleResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Found {
                distance,
                index,
                angle_degrees,
            } => write!(
                f,
                "Closest obstacle: {distance:.2} [m] at index {index} ({angle_degrees:.2} [deg])"
            ),
            Self::NotFound => f.write_str(NO_OBSTACLE_LINE),
        }
    }
}

/// Result of reducing one `ScanPacket`, as handed to the sinks
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObstacleReport {
    /// Source of the reduced scan
    pub source_id: SourceId,

    /// Acquisition time of the reduced scan (seconds)
    pub timestamp: f64,

    /// Sequence number of the reduced scan
    pub seq: u64,

    /// Reduction outcome
    pub result: ObstacleResult,
}

impl fmt::Display for ObstacleReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{} #{}] {}", self.source_id, self.seq, self.result)
    }
}
