//! Source construction from configuration

use std::path::Path;

use contracts::{ScanSource, SourceConfig, SourceType};
use tracing::debug;

use crate::config::IngestionMetrics;
use crate::error::{IngestionError, Result};
use crate::mock::{MockScanConfig, MockScanSource};
use crate::replay::{ReplayConfig, ReplayScanSource};

/// Build the scan source described by `config`.
///
/// Replay sources read `path` (required), `speed`, `loop` and
/// `skip_invalid` from `params`. Lines skipped during loading are counted
/// as parse errors on `metrics`.
pub fn source_from_config(
    config: &SourceConfig,
    metrics: &IngestionMetrics,
) -> Result<Box<dyn ScanSource>> {
    debug!(source_id = %config.id, source_type = ?config.source_type, "creating scan source");

    match config.source_type {
        SourceType::Mock => {
            let mock = MockScanConfig::from_params(&config.id, config.frequency_hz, &config.params)?;
            Ok(Box::new(MockScanSource::new(config.id.clone(), mock)))
        }
        SourceType::Replay => {
            let path = config.params.get("path").ok_or_else(|| {
                IngestionError::invalid_config(&config.id, "replay source requires 'path'")
            })?;

            let replay = ReplayConfig {
                speed: flag(config, "speed", 1.0)?,
                loop_playback: flag(config, "loop", false)?,
                skip_invalid: flag(config, "skip_invalid", false)?,
            };

            let source = ReplayScanSource::load(Path::new(path), config.id.clone(), replay)?;
            for _ in 0..source.skipped_lines() {
                metrics.record_parse_error();
            }
            Ok(Box::new(source))
        }
    }
}

fn flag<T: std::str::FromStr>(config: &SourceConfig, key: &str, default: T) -> Result<T> {
    match config.params.get(key) {
        None => Ok(default),
        Some(raw) => raw.trim().parse().map_err(|_| {
            IngestionError::invalid_config(&config.id, format!("cannot parse {key} = '{raw}'"))
        }),
    }
}
