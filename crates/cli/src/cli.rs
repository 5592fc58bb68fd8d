//! CLI argument definitions using clap.

use clap::{Parser, Subcommand, ValueEnum};
use contracts::Role;
use std::path::PathBuf;

/// Trajectory Pipeline - multi-rate distribution of a synthetic position
#[derive(Parser, Debug)]
#[command(
    name = "trajectory-pipeline",
    author,
    version,
    about = "Multi-rate trajectory distribution pipeline",
    long_about = "Generates a figure-eight GPS trajectory and distributes the latest \n\
                  sample to a message bus and WebSocket clients, each at its own rate.\n\n\
                  In subscriber mode the trajectory is received from the bus instead \n\
                  and re-broadcast to WebSocket clients."
)]
pub struct Cli {
    /// Increase logging verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true, env = "TRAJECTORY_PIPELINE_VERBOSE")]
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
        env = "TRAJECTORY_PIPELINE_LOG_FORMAT"
    )]
    pub log_format: LogFormat,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the pipeline until interrupted
    Run(RunArgs),

    /// Validate configuration file without running
    Validate(ValidateArgs),

    /// Display the effective configuration
    Info(InfoArgs),
}

/// Arguments for the `run` command
#[derive(Parser, Debug, Clone)]
pub struct RunArgs {
    /// Path to configuration file (TOML or JSON); built-in defaults when omitted
    #[arg(short, long, env = "TRAJECTORY_PIPELINE_CONFIG")]
    pub config: Option<PathBuf>,

    /// Override the role from configuration
    #[arg(long, value_enum, env = "TRAJECTORY_PIPELINE_ROLE")]
    pub role: Option<RoleArg>,

    /// Override the producer rate (Hz)
    #[arg(long, env = "TRAJECTORY_PIPELINE_PRODUCER_RATE")]
    pub producer_rate: Option<f64>,

    /// Stop after this many seconds (0 = run until a signal)
    #[arg(long, default_value = "0", env = "TRAJECTORY_PIPELINE_DURATION")]
    pub duration: u64,

    /// Metrics server port (0 = disabled)
    #[arg(long, default_value = "0", env = "TRAJECTORY_PIPELINE_METRICS_PORT")]
    pub metrics_port: u16,

    /// Validate configuration and exit without running pipeline
    #[arg(long)]
    pub dry_run: bool,
}

/// Arguments for the `validate` command
#[derive(Parser, Debug)]
pub struct ValidateArgs {
    /// Path to configuration file to validate
    #[arg(short, long, default_value = "config.toml")]
    pub config: PathBuf,

    /// Output validation result as JSON
    #[arg(long)]
    pub json: bool,
}

/// Arguments for the `info` command
#[derive(Parser, Debug)]
pub struct InfoArgs {
    /// Path to configuration file; built-in defaults when omitted
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Show the layout for this role instead of the configured one
    #[arg(long, value_enum)]
    pub role: Option<RoleArg>,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

/// Process role
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum RoleArg {
    /// Generate the trajectory and publish it
    Publisher,
    /// Receive the trajectory from the bus and re-broadcast it
    Subscriber,
}

impl From<RoleArg> for Role {
    fn from(role: RoleArg) -> Self {
        match role {
            RoleArg::Publisher => Role::Publisher,
            RoleArg::Subscriber => Role::Subscriber,
        }
    }
}

/// Log output format
#[derive(ValueEnum, Clone, Copy, Debug, Default)]
pub enum LogFormat {
    /// JSON structured logging
    Json,
    /// Human-readable pretty format
    #[default]
    Pretty,
    /// Compact single-line format
    Compact,
}

impl From<LogFormat> for observability::LogFormat {
    fn from(format: LogFormat) -> Self {
        match format {
            LogFormat::Json => Self::Json,
            LogFormat::Pretty => Self::Pretty,
            LogFormat::Compact => Self::Compact,
        }
    }
}
