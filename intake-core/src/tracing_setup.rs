//! Tracing setup for intake binaries
//!
//! Console output follows the level the user asked for, while a per-run log
//! file under `logs/` captures every engine decision at trace level.

use std::fs::{File, create_dir_all};
use std::path::{Path, PathBuf};

use tracing::Level;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer, fmt};

use crate::IntakeError;

/// File name of the trace log written on every run.
pub const RUN_LOG_FILE: &str = "intake-last-run.log";

/// Initialize tracing with a console layer and a trace-level file layer.
///
/// `RUST_LOG` takes precedence over `console_level` for the console layer.
/// The file at `logs_dir/intake-last-run.log` (default `./logs`) is
/// truncated on every call. Returns the path of the log file.
///
/// # Errors
///
/// - `IntakeError::Io` - Logs directory or log file could not be created
/// - `IntakeError::TracingInit` - A global subscriber is already installed
pub fn init_tracing(console_level: Level, logs_dir: Option<&Path>) -> Result<PathBuf, IntakeError> {
    let logs_path = logs_dir.unwrap_or_else(|| Path::new("logs"));
    create_dir_all(logs_path)?;

    let log_file_path = logs_path.join(RUN_LOG_FILE);
    let log_file = File::create(&log_file_path)?;

    let console_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(console_level.to_string()));

    let console_layer = fmt::layer()
        .with_target(false)
        .without_time()
        .with_filter(console_filter);

    // Engine decisions are logged at trace level; keep all of them on disk.
    let file_layer = fmt::layer()
        .with_target(true)
        .with_file(true)
        .with_line_number(true)
        .with_ansi(false)
        .with_writer(log_file)
        .with_filter(EnvFilter::new("trace"));

    tracing_subscriber::registry()
        .with(console_layer)
        .with(file_layer)
        .try_init()
        .map_err(|e| IntakeError::TracingInit {
            reason: e.to_string(),
        })?;

    tracing::debug!(
        console = %console_level,
        file = %log_file_path.display(),
        "Tracing initialized"
    );

    Ok(log_file_path)
}

/// Log levels selectable from the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum CliLogLevel {
    /// Only error messages
    Error,
    /// Warnings and errors
    #[default]
    Warn,
    /// Run progress and summaries
    Info,
    /// Admission decisions
    Debug,
    /// Every calendar operation
    Trace,
}

impl From<CliLogLevel> for Level {
    fn from(level: CliLogLevel) -> Self {
        match level {
            CliLogLevel::Error => Level::ERROR,
            CliLogLevel::Warn => Level::WARN,
            CliLogLevel::Info => Level::INFO,
            CliLogLevel::Debug => Level::DEBUG,
            CliLogLevel::Trace => Level::TRACE,
        }
    }
}
