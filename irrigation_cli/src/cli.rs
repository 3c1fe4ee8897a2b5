//! CLI argument definitions and shared statics.

use clap::{ArgAction, Args, Parser, Subcommand};
use std::path::PathBuf;
use std::sync::OnceLock;

pub static FILE_GUARD: OnceLock<tracing_appender::non_blocking::WorkerGuard> = OnceLock::new();
/// Whether the user asked for JSON output (controls structured error output).
pub static JSON_MODE: OnceLock<bool> = OnceLock::new();

#[derive(Parser, Debug)]
#[command(name = "irrigation", version, about = "Soil-moisture irrigation controller")]
pub struct Cli {
    /// Path to config TOML (typed)
    #[arg(long, value_name = "FILE", default_value = "etc/irrigation.toml")]
    pub config: PathBuf,

    /// Log as JSON lines and print the run summary as JSON
    #[arg(long, action = ArgAction::SetTrue)]
    pub json: bool,

    /// Console log level (error|warn|info|debug|trace)
    #[arg(long = "log-level", value_name = "LEVEL", default_value = "info")]
    pub log_level: String,

    /// Command to execute
    #[command(subcommand)]
    pub cmd: Commands,
}

/// Where telemetry comes from and commands go.
#[derive(Args, Debug, Clone)]
pub struct LinkArgs {
    /// Drive a simulated field instead of a serial port
    #[arg(long, action = ArgAction::SetTrue, conflicts_with = "replay")]
    pub sim: bool,

    /// Replay a captured telemetry file; commands are echoed to stdout
    #[arg(long, value_name = "FILE")]
    pub replay: Option<PathBuf>,

    /// Bytes handed to the framer per replay read
    #[arg(long, value_name = "BYTES", default_value_t = 64, value_parser = clap::value_parser!(u64).range(1..=65536))]
    pub replay_chunk: u64,

    /// Milliseconds between simulated samples
    #[arg(long, value_name = "MS", default_value_t = 0)]
    pub sim_interval_ms: u64,

    /// Serial device (overrides serial.port)
    #[arg(long, value_name = "DEV", env = "IRRIGATION_PORT")]
    pub port: Option<String>,

    /// Baud rate (overrides serial.baud)
    #[arg(long, value_name = "BAUD")]
    pub baud: Option<u32>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the control loop until Ctrl-C, end of replay, or --max-records
    Run {
        #[command(flatten)]
        link: LinkArgs,
        /// Stop after this many accepted records
        #[arg(long, value_name = "N", value_parser = clap::value_parser!(u64).range(1..))]
        max_records: Option<u64>,
    },
    /// Validate config and contract, build the controller, and open the link once
    SelfCheck {
        #[command(flatten)]
        link: LinkArgs,
    },
}
