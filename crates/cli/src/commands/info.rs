//! `info` command implementation.

use anyhow::{Context, Result};
use contracts::MonitorBlueprint;
use serde::Serialize;
use std::collections::HashMap;
use tracing::info;

use crate::cli::InfoArgs;
use crate::error::CliError;

/// Configuration info for JSON output
#[derive(Serialize)]
struct ConfigInfo {
    version: String,
    source_count: usize,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    sources: Vec<SourceInfo>,
    ingestion: IngestionInfo,
    sink_count: usize,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    sinks: Vec<SinkInfo>,
}

#[derive(Serialize)]
struct SourceInfo {
    id: String,
    source_type: String,
    frequency_hz: f64,
    #[serde(skip_serializing_if = "HashMap::is_empty")]
    params: HashMap<String, String>,
}

#[derive(Serialize)]
struct IngestionInfo {
    channel_capacity: usize,
    drop_policy: String,
}

#[derive(Serialize)]
struct SinkInfo {
    name: String,
    sink_type: String,
    queue_capacity: usize,
    #[serde(skip_serializing_if = "HashMap::is_empty")]
    params: HashMap<String, String>,
}

/// Execute the `info` command
pub fn run_info(args: &InfoArgs) -> Result<()> {
    info!(config = %args.config.display(), "Loading configuration info");

    if !args.config.exists() {
        return Err(CliError::config_not_found(args.config.display().to_string()).into());
    }

    let blueprint = config_loader::ConfigLoader::load_from_path(&args.config)
        .with_context(|| format!("Failed to load config from {}", args.config.display()))?;

    if args.json {
        let info = build_config_info(&blueprint, args);
        let json =
            serde_json::to_string_pretty(&info).context("Failed to serialize config info")?;
        println!("{}", json);
    } else {
        print_config_info(&blueprint, args);
    }

    Ok(())
}

fn build_config_info(blueprint: &MonitorBlueprint, args: &InfoArgs) -> ConfigInfo {
    let sources = if args.sources {
        blueprint
            .sources
            .iter()
            .map(|s| SourceInfo {
                id: s.id.clone(),
                source_type: format!("{:?}", s.source_type),
                frequency_hz: s.frequency_hz,
                params: s.params.clone(),
            })
            .collect()
    } else {
        Vec::new()
    };

    let sinks = if args.sinks {
        blueprint
            .sinks
            .iter()
            .map(|s| SinkInfo {
                name: s.name.clone(),
                sink_type: format!("{:?}", s.sink_type),
                queue_capacity: s.queue_capacity,
                params: s.params.clone(),
            })
            .collect()
    } else {
        Vec::new()
    };

    ConfigInfo {
        version: format!("{:?}", blueprint.version),
        source_count: blueprint.sources.len(),
        sources,
        ingestion: IngestionInfo {
            channel_capacity: blueprint.ingestion.channel_capacity,
            drop_policy: format!("{:?}", blueprint.ingestion.drop_policy),
        },
        sink_count: blueprint.sinks.len(),
        sinks,
    }
}

fn tree_prefix(index: usize, len: usize) -> &'static str {
    if index + 1 == len {
        "└─"
    } else {
        "├─"
    }
}

fn print_config_info(blueprint: &MonitorBlueprint, args: &InfoArgs) {
    println!("╔══════════════════════════════════════════════════════════════╗");
    println!("║              Obstacle Monitor Configuration                  ║");
    println!("╚══════════════════════════════════════════════════════════════╝\n");

    println!("Version: {:?}", blueprint.version);

    println!("\nSources ({})", blueprint.sources.len());
    for (i, source) in blueprint.sources.iter().enumerate() {
        let prefix = tree_prefix(i, blueprint.sources.len());
        println!(
            "   {} {} ({:?}, {} Hz)",
            prefix, source.id, source.source_type, source.frequency_hz
        );

        if args.sources && !source.params.is_empty() {
            let child_prefix = if i + 1 == blueprint.sources.len() {
                "   "
            } else {
                "│  "
            };
            let mut params: Vec<_> = source.params.iter().collect();
            params.sort();
            for (j, (key, value)) in params.iter().enumerate() {
                println!(
                    "   {}  {} {} = {}",
                    child_prefix,
                    tree_prefix(j, params.len()),
                    key,
                    value
                );
            }
        }
    }

    println!("\nIngestion");
    println!(
        "   ├─ Channel capacity: {}",
        blueprint.ingestion.channel_capacity
    );
    println!("   └─ Drop policy: {:?}", blueprint.ingestion.drop_policy);

    if blueprint.sinks.is_empty() {
        println!("\nSinks: none (results go to stdout)");
    } else {
        println!("\nSinks ({})", blueprint.sinks.len());
        for (i, sink) in blueprint.sinks.iter().enumerate() {
            let prefix = tree_prefix(i, blueprint.sinks.len());
            if args.sinks {
                println!(
                    "   {} {} ({:?}, queue {}) {:?}",
                    prefix, sink.name, sink.sink_type, sink.queue_capacity, sink.params
                );
            } else {
                println!("   {} {} ({:?})", prefix, sink.name, sink.sink_type);
            }
        }
    }

    println!();
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn blueprint() -> MonitorBlueprint {
        config_loader::ConfigLoader::load_from_str(
            r#"
[[sources]]
id = "front"
source_type = "mock"
params = { num_samples = "180" }

[[sinks]]
name = "stdout"
sink_type = "console"
"#,
            config_loader::ConfigFormat::Toml,
        )
        .unwrap()
    }

    fn args(sources: bool, sinks: bool) -> InfoArgs {
        InfoArgs {
            config: PathBuf::from("monitor.toml"),
            json: true,
            sources,
            sinks,
        }
    }

    #[test]
    fn test_info_hides_details_by_default() {
        let info = build_config_info(&blueprint(), &args(false, false));
        assert_eq!(info.source_count, 1);
        assert_eq!(info.sink_count, 1);
        assert!(info.sources.is_empty());
        assert!(info.sinks.is_empty());
        assert_eq!(info.ingestion.drop_policy, "DropOldest");
    }

    #[test]
    fn test_info_lists_sources_and_sinks() {
        let info = build_config_info(&blueprint(), &args(true, true));
        assert_eq!(info.sources[0].id, "front");
        assert_eq!(info.sources[0].source_type, "Mock");
        assert_eq!(info.sources[0].params["num_samples"], "180");
        assert_eq!(info.sinks[0].sink_type, "Console");
        assert_eq!(info.sinks[0].queue_capacity, 100);
    }

    #[test]
    fn test_tree_prefix() {
        assert_eq!(tree_prefix(0, 2), "├─");
        assert_eq!(tree_prefix(1, 2), "└─");
    }
}
