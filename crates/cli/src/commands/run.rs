//! `run` command implementation.

use anyhow::{Context, Result};
use contracts::{MonitorBlueprint, SourceType};
use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;
use tracing::{info, warn};

use crate::cli::RunArgs;
use crate::error::CliError;
use crate::pipeline::{Pipeline, PipelineConfig};

/// Execute the `run` command
pub async fn run_pipeline(args: &RunArgs) -> Result<()> {
    info!(config = %args.config.display(), "Loading configuration");

    if !args.config.exists() {
        return Err(CliError::config_not_found(args.config.display().to_string()).into());
    }

    let mut blueprint = config_loader::ConfigLoader::load_from_path(&args.config)
        .with_context(|| format!("Failed to load config from {}", args.config.display()))?;

    // Apply CLI overrides
    if let Some(ref replay) = args.replay {
        info!(
            path = %replay.display(),
            speed = args.replay_speed,
            looping = args.replay_loop,
            "Overriding sources with replay file from CLI"
        );
        apply_replay_override(&mut blueprint, replay, args.replay_speed, args.replay_loop)?;
        config_loader::ConfigLoader::validate(&blueprint)
            .context("Configuration invalid after applying --replay")?;
    }

    if args.buffer_size == 0 {
        return Err(CliError::invalid_override("--buffer-size", "must be at least 1").into());
    }

    info!(
        sources = blueprint.sources.len(),
        sinks = blueprint.sinks.len(),
        channel_capacity = blueprint.ingestion.channel_capacity,
        drop_policy = ?blueprint.ingestion.drop_policy,
        "Configuration loaded"
    );

    if args.dry_run {
        info!("Dry run mode - configuration is valid, exiting");
        print_config_summary(&blueprint);
        return Ok(());
    }

    let pipeline_config = PipelineConfig {
        blueprint,
        max_scans: (args.max_scans != 0).then_some(args.max_scans),
        timeout: (args.timeout != 0).then(|| Duration::from_secs(args.timeout)),
        buffer_size: args.buffer_size,
        metrics_port: (args.metrics_port != 0).then_some(args.metrics_port),
    };

    let pipeline = Pipeline::new(pipeline_config);

    info!("Starting pipeline...");

    // The pipeline watches the signal itself so sinks are still flushed on Ctrl+C
    let stats = pipeline
        .run(shutdown_signal())
        .await
        .context("Pipeline execution failed")?;

    info!(
        scans_reduced = stats.scans_reduced,
        obstacles_found = stats.obstacles.found,
        scans_dropped = stats.ingestion.scans_dropped,
        duration_secs = stats.duration.as_secs_f64(),
        scans_per_sec = format!("{:.2}", stats.scans_per_sec()),
        stop_reason = %stats.stop_reason,
        "Pipeline completed"
    );

    stats.print_summary();

    info!("Obstacle monitor finished");
    Ok(())
}

/// Turn every configured source into a replay of `path`.
///
/// Each source keeps its id, so a multi-source recording is split by the
/// `source_id` stored on each line.
fn apply_replay_override(
    blueprint: &mut MonitorBlueprint,
    path: &Path,
    speed: f64,
    looping: bool,
) -> Result<(), CliError> {
    if !speed.is_finite() || speed <= 0.0 {
        return Err(CliError::invalid_override(
            "--replay-speed",
            format!("must be a positive number, got {speed}"),
        ));
    }
    if !path.exists() {
        return Err(CliError::invalid_override(
            "--replay",
            format!("file not found: {}", path.display()),
        ));
    }

    let params = HashMap::from([
        ("path".to_string(), path.display().to_string()),
        ("speed".to_string(), speed.to_string()),
        ("loop".to_string(), looping.to_string()),
    ]);

    for source in &mut blueprint.sources {
        if source.source_type != SourceType::Replay {
            warn!(source_id = %source.id, "Replacing {:?} source with replay", source.source_type);
        }
        source.source_type = SourceType::Replay;
        source.params = params.clone();
    }

    Ok(())
}

/// Resolves on Ctrl+C or SIGTERM
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}

/// Print configuration summary for dry-run mode
fn print_config_summary(blueprint: &MonitorBlueprint) {
    println!("\n=== Configuration Summary ===\n");
    println!("Sources ({}):", blueprint.sources.len());
    for source in &blueprint.sources {
        println!(
            "  - {} ({:?}, {} Hz)",
            source.id, source.source_type, source.frequency_hz
        );
    }

    println!("\nIngestion:");
    println!("  Channel capacity: {}", blueprint.ingestion.channel_capacity);
    println!("  Drop policy: {:?}", blueprint.ingestion.drop_policy);

    if blueprint.sinks.is_empty() {
        println!("\nSinks: none configured, results go to stdout");
    } else {
        println!("\nSinks ({}):", blueprint.sinks.len());
        for sink in &blueprint.sinks {
            println!(
                "  - {} ({:?}, queue {})",
                sink.name, sink.sink_type, sink.queue_capacity
            );
        }
    }

    println!();
}
