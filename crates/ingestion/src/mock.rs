//! Mock scan source
//!
//! Synthetic range-finder for running without a live sensor. A single
//! obstacle sweeps across the field of view over a flat background.

use std::collections::HashMap;
use std::f64::consts::PI;
use std::str::FromStr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use contracts::{ScanCallback, ScanPacket, ScanRecord, ScanSource, SourceId};
use tracing::{debug, trace, warn};

use crate::error::{IngestionError, Result};

/// Mock scan source configuration
#[derive(Debug, Clone, PartialEq)]
pub struct MockScanConfig {
    /// Emit frequency (Hz)
    pub frequency_hz: f64,
    /// Samples per scan
    pub num_samples: usize,
    pub angle_min: f64,
    pub angle_increment: f64,
    pub range_min: f64,
    pub range_max: f64,
    /// Range reported where nothing is hit
    pub background_range: f64,
    /// Range at the obstacle centre
    pub obstacle_range: f64,
    /// Obstacle half-width in samples
    pub obstacle_width: usize,
    /// Samples the obstacle advances per scan
    pub sweep_step: usize,
    /// Every n-th sample becomes inf/NaN (0 = never)
    pub invalid_every: usize,
    /// Every n-th scan sees nothing at all (0 = never)
    pub dropout_every: u64,
    /// Stop after this many scans (0 = unlimited)
    pub max_scans: u64,
}

impl Default for MockScanConfig {
    fn default() -> Self {
        Self::with_samples(360)
    }
}

impl MockScanConfig {
    /// Full circle starting at -π, split into `num_samples` beams
    pub fn with_samples(num_samples: usize) -> Self {
        let angle_increment = if num_samples == 0 {
            0.0
        } else {
            2.0 * PI / num_samples as f64
        };

        Self {
            frequency_hz: 10.0,
            num_samples,
            angle_min: -PI,
            angle_increment,
            range_min: 0.12,
            range_max: 12.0,
            background_range: 8.0,
            obstacle_range: 1.5,
            obstacle_width: 5,
            sweep_step: 3,
            invalid_every: 0,
            dropout_every: 0,
            max_scans: 0,
        }
    }

    /// Build from the string `params` map of a source entry.
    ///
    /// Unknown keys are ignored; missing keys keep their defaults.
    pub fn from_params(
        source_id: &str,
        frequency_hz: f64,
        params: &HashMap<String, String>,
    ) -> Result<Self> {
        let num_samples = param(source_id, params, "num_samples", 360usize)?;
        let defaults = Self::with_samples(num_samples);

        let config = Self {
            frequency_hz,
            num_samples,
            angle_min: param(source_id, params, "angle_min", defaults.angle_min)?,
            angle_increment: param(
                source_id,
                params,
                "angle_increment",
                defaults.angle_increment,
            )?,
            range_min: param(source_id, params, "range_min", defaults.range_min)?,
            range_max: param(source_id, params, "range_max", defaults.range_max)?,
            background_range: param(
                source_id,
                params,
                "background_range",
                defaults.background_range,
            )?,
            obstacle_range: param(source_id, params, "obstacle_range", defaults.obstacle_range)?,
            obstacle_width: param(source_id, params, "obstacle_width", defaults.obstacle_width)?,
            sweep_step: param(source_id, params, "sweep_step", defaults.sweep_step)?,
            invalid_every: param(source_id, params, "invalid_every", defaults.invalid_every)?,
            dropout_every: param(source_id, params, "dropout_every", defaults.dropout_every)?,
            max_scans: param(source_id, params, "max_scans", defaults.max_scans)?,
        };

        if config.scan_interval().is_none() {
            return Err(IngestionError::invalid_config(
                source_id,
                format!(
                    "frequency_hz must be a positive number with a representable period, got {}",
                    config.frequency_hz
                ),
            ));
        }

        Ok(config)
    }

    /// Time between scans, `None` when `frequency_hz` has no usable period
    pub fn scan_interval(&self) -> Option<Duration> {
        if !(self.frequency_hz > 0.0 && self.frequency_hz.is_finite()) {
            return None;
        }
        Duration::try_from_secs_f64(1.0 / self.frequency_hz).ok()
    }
}

fn param<T: FromStr>(
    source_id: &str,
    params: &HashMap<String, String>,
    key: &str,
    default: T,
) -> Result<T> {
    match params.get(key) {
        None => Ok(default),
        Some(raw) => raw.trim().parse().map_err(|_| {
            IngestionError::invalid_config(source_id, format!("cannot parse {key} = '{raw}'"))
        }),
    }
}

/// Build the scan emitted at position `seq` of the sweep.
///
/// The obstacle is a shallow V centred on one beam, so its centre is the
/// unique nearest sample. Obstacle beams are never invalidated.
pub fn synthesize(config: &MockScanConfig, seq: u64) -> ScanRecord {
    let n = config.num_samples;
    let mut ranges = vec![config.background_range; n];

    let dropout = config.dropout_every > 0 && (seq + 1) % config.dropout_every == 0;

    if dropout {
        ranges.fill(f64::INFINITY);
    } else if n > 0 {
        let centre = (seq as usize).wrapping_mul(config.sweep_step) % n;
        let width = config.obstacle_width.min(n / 2);

        if config.invalid_every > 0 {
            for (i, sample) in ranges.iter_mut().enumerate() {
                if (i + 1) % config.invalid_every == 0 {
                    *sample = if (i / config.invalid_every) % 2 == 0 {
                        f64::INFINITY
                    } else {
                        f64::NAN
                    };
                }
            }
        }

        for offset in 0..=width {
            let depth = config.obstacle_range + 0.05 * offset as f64;
            ranges[(centre + offset) % n] = depth;
            ranges[(centre + n - offset) % n] = depth;
        }
    }

    ScanRecord {
        ranges,
        angle_min: config.angle_min,
        angle_increment: config.angle_increment,
        range_min: config.range_min,
        range_max: config.range_max,
    }
}

/// Mock scan source
///
/// Emits [`synthesize`]d scans from a background thread at
/// `frequency_hz`.
pub struct MockScanSource {
    source_id: String,
    config: MockScanConfig,
    listening: Arc<AtomicBool>,
}

impl MockScanSource {
    pub fn new(source_id: impl Into<String>, config: MockScanConfig) -> Self {
        Self {
            source_id: source_id.into(),
            config,
            listening: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn config(&self) -> &MockScanConfig {
        &self.config
    }
}

impl ScanSource for MockScanSource {
    fn source_id(&self) -> &str {
        &self.source_id
    }

    fn listen(&self, callback: ScanCallback) {
        if self.listening.swap(true, Ordering::SeqCst) {
            return;
        }

        let Some(interval) = self.config.scan_interval() else {
            warn!(
                source_id = %self.source_id,
                frequency_hz = self.config.frequency_hz,
                "mock scan source not started: unusable frequency"
            );
            self.listening.store(false, Ordering::SeqCst);
            return;
        };

        let source_id = self.source_id.clone();
        let config = self.config.clone();
        let listening = self.listening.clone();

        thread::spawn(move || {
            let start_time = Instant::now();
            let shared_id: SourceId = source_id.as_str().into();
            let mut seq: u64 = 0;

            debug!(
                source_id = %source_id,
                frequency_hz = config.frequency_hz,
                num_samples = config.num_samples,
                "mock scan source started"
            );

            while listening.load(Ordering::Relaxed) {
                if config.max_scans > 0 && seq >= config.max_scans {
                    debug!(source_id = %source_id, scans = seq, "mock scan limit reached");
                    break;
                }

                let packet = ScanPacket {
                    source_id: shared_id.clone(),
                    timestamp: start_time.elapsed().as_secs_f64(),
                    seq,
                    scan: synthesize(&config, seq),
                };

                callback(packet);
                trace!(source_id = %source_id, seq, "mock scan emitted");

                seq += 1;
                thread::sleep(interval);
            }

            listening.store(false, Ordering::SeqCst);
            debug!(source_id = %source_id, "mock scan source stopped");
        });
    }

    fn stop(&self) {
        self.listening.store(false, Ordering::SeqCst);
    }

    fn is_listening(&self) -> bool {
        self.listening.load(Ordering::Relaxed)
    }
}
