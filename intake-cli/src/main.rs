//! Intake CLI - Command-line interface
//!
//! Runs the intake hub simulation in bulk or event-by-event mode.

mod commands;

use std::path::PathBuf;

use clap::Parser;
use intake_core::IntakeError;
use intake_core::tracing_setup::{CliLogLevel, init_tracing};

#[derive(Parser)]
#[command(name = "intake")]
#[command(about = "Warehouse intake hub simulator")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: commands::Commands,

    /// Console log level, overridden by RUST_LOG
    #[arg(long, value_enum, default_value_t = CliLogLevel::Warn, global = true)]
    log_level: CliLogLevel,

    /// Directory for the per-run trace log
    #[arg(long, global = true)]
    logs_dir: Option<PathBuf>,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.log_level.into(), cli.logs_dir.as_deref())?;

    if let Err(error) = commands::handle_command(cli.command) {
        match error.downcast_ref::<IntakeError>() {
            Some(intake_error) if intake_error.is_user_error() => {
                eprintln!("{}", intake_error.user_message());
                std::process::exit(2);
            }
            _ => return Err(error),
        }
    }

    Ok(())
}
