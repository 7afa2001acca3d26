//! CLI argument definitions and shared statics.

use clap::{ArgAction, Parser, Subcommand};
use std::path::PathBuf;
use std::sync::OnceLock;

pub static FILE_GUARD: OnceLock<tracing_appender::non_blocking::WorkerGuard> = OnceLock::new();
/// Whether the user asked for JSON output (controls structured error output).
pub static JSON_MODE: OnceLock<bool> = OnceLock::new();

#[derive(Parser, Debug)]
#[command(name = "drier", version, about = "Clove dryer controller")]
pub struct Cli {
    /// Path to config TOML (a missing file means defaults)
    #[arg(long, value_name = "FILE", default_value = "etc/drier.toml")]
    pub config: PathBuf,

    /// Log as JSON lines instead of pretty
    #[arg(long, action = ArgAction::SetTrue)]
    pub json: bool,

    /// Console log level (error|warn|info|debug|trace); overrides logging.level
    #[arg(long = "log-level", value_name = "LEVEL")]
    pub log_level: Option<String>,

    /// Command to execute
    #[command(subcommand)]
    pub cmd: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Serve the HTTP API until Ctrl-C
    Serve {
        /// Override server.bind (host:port)
        #[arg(long, value_name = "ADDR")]
        bind: Option<String>,
    },
    /// Train both models from the training CSV and save them
    Train {
        /// Override paths.training_csv
        #[arg(long, value_name = "FILE")]
        csv: Option<PathBuf>,
    },
    /// Process one reading, exactly like POST /predict
    Predict {
        #[arg(long, allow_negative_numbers = true)]
        temperature: f64,
        #[arg(long, allow_negative_numbers = true)]
        humidity: f64,
        /// Remaining drying time; negative once overdue
        #[arg(long = "time-remaining", allow_negative_numbers = true)]
        time_remaining: f64,
        #[arg(long)]
        rtc: Option<String>,
        #[arg(long = "elapsed-time")]
        elapsed_time: Option<String>,
    },
    /// Print the current process state
    Status,
    /// Change the operator targets
    SetTarget {
        #[arg(long, allow_negative_numbers = true)]
        moisture: Option<i64>,
        #[arg(long, allow_negative_numbers = true)]
        time: Option<i64>,
    },
    /// Check the config and that models can be loaded or trained
    SelfCheck,
}
