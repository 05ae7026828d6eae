//! CLI argument definitions using clap.

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Obstacle Monitor - nearest-obstacle reduction for planar range scans
#[derive(Parser, Debug)]
#[command(
    name = "obstacle-monitor",
    author,
    version,
    about = "Nearest-obstacle monitor for planar range scans",
    long_about = "Reduces each incoming planar range scan to its closest valid obstacle.\n\n\
                  Reads scans from mock or replay sources, reports the nearest \n\
                  obstacle distance, index and bearing, and dispatches the result \n\
                  to the configured sinks."
)]
pub struct Cli {
    /// Increase logging verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true, env = "OBSTACLE_MONITOR_VERBOSE")]
    pub verbose: u8,

    /// Suppress all output except warnings and errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Log output format
    #[arg(
        long,
        value_enum,
        default_value = "pretty",
        global = true,
        env = "OBSTACLE_MONITOR_LOG_FORMAT"
    )]
    pub log_format: LogFormat,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the monitor pipeline
    Run(RunArgs),

    /// Validate configuration file without running
    Validate(ValidateArgs),

    /// Display configuration information
    Info(InfoArgs),
}

/// Arguments for the `run` command
#[derive(Parser, Debug, Clone)]
pub struct RunArgs {
    /// Path to configuration file (TOML or JSON)
    #[arg(
        short,
        long,
        default_value = "monitor.toml",
        env = "OBSTACLE_MONITOR_CONFIG"
    )]
    pub config: PathBuf,

    /// Maximum number of scans to reduce (0 = unlimited)
    #[arg(long, default_value = "0", env = "OBSTACLE_MONITOR_MAX_SCANS")]
    pub max_scans: u64,

    /// Pipeline timeout in seconds (0 = no timeout)
    #[arg(long, default_value = "0", env = "OBSTACLE_MONITOR_TIMEOUT")]
    pub timeout: u64,

    /// Validate configuration and exit without running pipeline
    #[arg(long)]
    pub dry_run: bool,

    /// Capacity of the queue between the reducer and the sinks
    #[arg(long, default_value = "100", env = "OBSTACLE_MONITOR_BUFFER_SIZE")]
    pub buffer_size: usize,

    /// Metrics server port (0 = disabled)
    #[arg(long, default_value = "0", env = "OBSTACLE_MONITOR_METRICS_PORT")]
    pub metrics_port: u16,

    /// Replace the configured sources with a recorded JSONL scan file
    #[arg(long, env = "OBSTACLE_MONITOR_REPLAY")]
    pub replay: Option<PathBuf>,

    /// Replay speed multiplier (1.0 = recorded pace)
    #[arg(long, default_value = "1.0", requires = "replay")]
    pub replay_speed: f64,

    /// Restart the replay from the beginning when it ends
    #[arg(long, requires = "replay")]
    pub replay_loop: bool,
}

/// Arguments for the `validate` command
#[derive(Parser, Debug)]
pub struct ValidateArgs {
    /// Path to configuration file to validate
    #[arg(short, long, default_value = "monitor.toml")]
    pub config: PathBuf,

    /// Output validation result as JSON
    #[arg(long)]
    pub json: bool,
}

/// Arguments for the `info` command
#[derive(Parser, Debug)]
pub struct InfoArgs {
    /// Path to configuration file
    #[arg(short, long, default_value = "monitor.toml")]
    pub config: PathBuf,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,

    /// Show detailed source information
    #[arg(long)]
    pub sources: bool,

    /// Show sink configuration
    #[arg(long)]
    pub sinks: bool,
}

/// Log output format
#[derive(ValueEnum, Clone, Debug, Default)]
pub enum LogFormat {
    /// JSON structured logging
    Json,
    /// Human-readable pretty format
    #[default]
    Pretty,
    /// Compact single-line format
    Compact,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_run_defaults() {
        let cli = Cli::try_parse_from(["obstacle-monitor", "run"]).unwrap();
        let Commands::Run(args) = cli.command else {
            panic!("expected run command");
        };
        assert_eq!(args.config, PathBuf::from("monitor.toml"));
        assert_eq!(args.max_scans, 0);
        assert_eq!(args.buffer_size, 100);
        assert_eq!(args.metrics_port, 0);
        assert!(args.replay.is_none());
        assert!(!args.replay_loop);
    }

    #[test]
    fn test_run_replay_flags() {
        let cli = Cli::try_parse_from([
            "obstacle-monitor",
            "run",
            "--replay",
            "scans.jsonl",
            "--replay-speed",
            "2.5",
            "--replay-loop",
            "--max-scans",
            "10",
        ])
        .unwrap();
        let Commands::Run(args) = cli.command else {
            panic!("expected run command");
        };
        assert_eq!(args.replay, Some(PathBuf::from("scans.jsonl")));
        assert_eq!(args.replay_speed, 2.5);
        assert!(args.replay_loop);
        assert_eq!(args.max_scans, 10);
    }

    #[test]
    fn test_replay_loop_requires_replay() {
        let result = Cli::try_parse_from(["obstacle-monitor", "run", "--replay-loop"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_quiet_conflicts_with_verbose() {
        let result = Cli::try_parse_from(["obstacle-monitor", "-q", "-v", "validate"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_info_flags() {
        let cli =
            Cli::try_parse_from(["obstacle-monitor", "info", "-c", "m.json", "--sources"]).unwrap();
        let Commands::Info(args) = cli.command else {
            panic!("expected info command");
        };
        assert_eq!(args.config, PathBuf::from("m.json"));
        assert!(args.sources);
        assert!(!args.sinks);
        assert!(!args.json);
    }
}
