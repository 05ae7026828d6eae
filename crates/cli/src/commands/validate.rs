//! `validate` command implementation.

use anyhow::{Context, Result};
use contracts::{MonitorBlueprint, SinkType, SourceType};
use serde::Serialize;
use tracing::info;

use crate::cli::ValidateArgs;

/// Validation result for JSON output
#[derive(Serialize)]
struct ValidationResult {
    valid: bool,
    config_path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    warnings: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    summary: Option<ConfigSummary>,
}

#[derive(Serialize)]
struct ConfigSummary {
    version: String,
    source_count: usize,
    mock_sources: usize,
    replay_sources: usize,
    channel_capacity: usize,
    sink_count: usize,
}

/// Execute the `validate` command
pub fn run_validate(args: &ValidateArgs) -> Result<()> {
    info!(config = %args.config.display(), "Validating configuration");

    let result = validate_config(args);

    if args.json {
        let json = serde_json::to_string_pretty(&result)
            .context("Failed to serialize validation result")?;
        println!("{}", json);
    } else {
        print_validation_result(&result);
    }

    if result.valid {
        Ok(())
    } else {
        anyhow::bail!("Configuration validation failed")
    }
}

fn validate_config(args: &ValidateArgs) -> ValidationResult {
    let config_path = args.config.display().to_string();

    if !args.config.exists() {
        return ValidationResult {
            valid: false,
            config_path,
            error: Some(format!("File not found: {}", args.config.display())),
            warnings: None,
            summary: None,
        };
    }

    match config_loader::ConfigLoader::load_from_path(&args.config) {
        Ok(blueprint) => {
            let warnings = collect_warnings(&blueprint);

            ValidationResult {
                valid: true,
                config_path,
                error: None,
                warnings: (!warnings.is_empty()).then_some(warnings),
                summary: Some(ConfigSummary {
                    version: format!("{:?}", blueprint.version),
                    source_count: blueprint.sources.len(),
                    mock_sources: blueprint.sources_of_type(SourceType::Mock).count(),
                    replay_sources: blueprint.sources_of_type(SourceType::Replay).count(),
                    channel_capacity: blueprint.ingestion.channel_capacity,
                    sink_count: blueprint.sinks.len(),
                }),
            }
        }
        Err(e) => ValidationResult {
            valid: false,
            config_path,
            error: Some(e.to_string()),
            warnings: None,
            summary: None,
        },
    }
}

/// Collect configuration warnings (non-fatal issues)
fn collect_warnings(blueprint: &MonitorBlueprint) -> Vec<String> {
    let mut warnings = Vec::new();

    if blueprint.sinks.is_empty() {
        warnings.push("No sinks configured - results will be printed to stdout".to_string());
    }

    let consoles = blueprint
        .sinks
        .iter()
        .filter(|s| s.sink_type == SinkType::Console)
        .count();
    if consoles > 1 {
        warnings.push(format!(
            "{consoles} console sinks configured - stdout lines will be duplicated"
        ));
    }

    for sink in &blueprint.sinks {
        if sink.queue_capacity < blueprint.ingestion.channel_capacity {
            warnings.push(format!(
                "Sink '{}' queue ({}) is smaller than the ingestion channel ({}) - reports may be dropped",
                sink.name, sink.queue_capacity, blueprint.ingestion.channel_capacity
            ));
        }
    }

    warnings
}

fn print_validation_result(result: &ValidationResult) {
    if result.valid {
        println!("✓ Configuration is valid: {}", result.config_path);

        if let Some(ref summary) = result.summary {
            println!("\n  Version: {}", summary.version);
            println!(
                "  Sources: {} ({} mock, {} replay)",
                summary.source_count, summary.mock_sources, summary.replay_sources
            );
            println!("  Channel capacity: {}", summary.channel_capacity);
            println!("  Sinks: {}", summary.sink_count);
        }

        if let Some(ref warnings) = result.warnings {
            println!("\n⚠ Warnings:");
            for warning in warnings {
                println!("  - {}", warning);
            }
        }
    } else {
        println!("✗ Configuration is invalid: {}", result.config_path);
        if let Some(ref error) = result.error {
            println!("\n  Error: {}", error);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::path::PathBuf;

    fn write_config(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    fn args(config: PathBuf) -> ValidateArgs {
        ValidateArgs {
            config,
            json: true,
        }
    }

    #[test]
    fn test_valid_config_without_sinks_warns() {
        let file = write_config(
            r#"
[[sources]]
id = "front"
source_type = "mock"
"#,
        );

        let result = validate_config(&args(file.path().to_path_buf()));
        assert!(result.valid);
        let summary = result.summary.unwrap();
        assert_eq!(summary.source_count, 1);
        assert_eq!(summary.mock_sources, 1);
        assert_eq!(summary.sink_count, 0);
        let warnings = result.warnings.unwrap();
        assert!(warnings[0].contains("No sinks configured"));
    }

    #[test]
    fn test_small_sink_queue_warns() {
        let file = write_config(
            r#"
[[sources]]
id = "front"
source_type = "mock"

[[sinks]]
name = "out"
sink_type = "console"
queue_capacity = 10
"#,
        );

        let result = validate_config(&args(file.path().to_path_buf()));
        assert!(result.valid);
        let warnings = result.warnings.unwrap();
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].contains("'out'"));
    }

    #[test]
    fn test_invalid_config_reports_error() {
        let file = write_config(
            r#"
[[sources]]
id = "front"
source_type = "mock"
frequency_hz = 0.0
"#,
        );

        let result = validate_config(&args(file.path().to_path_buf()));
        assert!(!result.valid);
        assert!(result.error.unwrap().contains("frequency_hz"));
    }

    #[test]
    fn test_missing_file() {
        let result = validate_config(&args(PathBuf::from("/nonexistent/monitor.toml")));
        assert!(!result.valid);
        assert!(result.error.unwrap().contains("File not found"));
    }
}
