//! ScanPacket - Ingestion output
//!
//! A single range-finder sweep plus the envelope that identifies it.

use serde::{Deserialize, Serialize};

use crate::SourceId;

/// One sweep of range samples, laid out like `sensor_msgs/LaserScan`.
///
/// `ranges[i]` was measured at `angle_min + i * angle_increment`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScanRecord {
    /// Measured distances (metres). May contain `inf` and `NaN`.
    #[serde(with = "range_samples")]
    pub ranges: Vec<f64>,

    /// Angle of `ranges[0]` (radians)
    pub angle_min: f64,

    /// Angular step between consecutive samples (radians)
    pub angle_increment: f64,

    /// Exclusive lower bound of a valid distance
    pub range_min: f64,

    /// Exclusive upper bound of a valid distance
    pub range_max: f64,
}

impl ScanRecord {
    /// Number of samples in the sweep
    pub fn len(&self) -> usize {
        self.ranges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ranges.is_empty()
    }
}

/// Scan packet as delivered by a source
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanPacket {
    /// Source that produced the scan
    pub source_id: SourceId,

    /// Acquisition time (seconds, source clock)
    pub timestamp: f64,

    /// Per-source sequence number
    pub seq: u64,

    /// The sweep itself
    pub scan: ScanRecord,
}

/// JSON has no literal for `inf` or `NaN`.
///
/// Non-finite samples are written as `null` (NaN) and `"inf"` / `"-inf"`,
/// and the same spellings (plus `"nan"`) are accepted when reading.
mod range_samples {
    use serde::de::Error as _;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    struct Sample(f64);

    impl Serialize for Sample {
        fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
            let d = self.0;
            if d.is_nan() {
                serializer.serialize_none()
            } else if d.is_infinite() {
                serializer.serialize_str(if d > 0.0 { "inf" } else { "-inf" })
            } else {
                serializer.serialize_f64(d)
            }
        }
    }

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawSample {
        Number(Option<f64>),
        Text(String),
    }

    impl RawSample {
        fn into_f64(self) -> Result<f64, String> {
            match self {
                RawSample::Number(Some(d)) => Ok(d),
                RawSample::Number(None) => Ok(f64::NAN),
                RawSample::Text(text) => match text.to_ascii_lowercase().as_str() {
                    "inf" | "+inf" | "infinity" => Ok(f64::INFINITY),
                    "-inf" | "-infinity" => Ok(f64::NEG_INFINITY),
                    "nan" => Ok(f64::NAN),
                    other => Err(format!("invalid range sample '{other}'")),
                },
            }
        }
    }

    pub fn serialize<S: Serializer>(ranges: &[f64], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(ranges.iter().map(|&d| Sample(d)))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<f64>, D::Error> {
        Vec::<RawSample>::deserialize(deserializer)?
            .into_iter()
            .map(RawSample::into_f64)
            .collect::<Result<_, _>>()
            .map_err(D::Error::custom)
    }
}
