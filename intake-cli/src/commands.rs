//! CLI command implementations

use anyhow::Context;
use clap::{Args, Subcommand};
use intake_core::IntakeConfig;
use intake_sim::Simulation;
use tracing::info;

/// Overrides applied on top of the environment configuration.
#[derive(Args, Debug, Clone, Default)]
pub struct RunOptions {
    /// Seed for the deterministic random stream
    #[arg(long)]
    pub seed: Option<u64>,

    /// Simulated time bound in minutes
    #[arg(long)]
    pub horizon: Option<f64>,
}

/// Available CLI commands
#[derive(Subcommand)]
pub enum Commands {
    /// Run to the horizon and print the report
    Run {
        #[command(flatten)]
        options: RunOptions,
        /// Print the full report as JSON
        #[arg(long)]
        json: bool,
    },
    /// Print every processed event, one per line
    Trace {
        #[command(flatten)]
        options: RunOptions,
        /// Print events as JSON lines
        #[arg(long)]
        json: bool,
        /// Stop after this many events
        #[arg(long)]
        limit: Option<u64>,
    },
    /// Print the effective configuration as JSON
    Config {
        #[command(flatten)]
        options: RunOptions,
    },
}

/// Handle the CLI command
///
/// # Errors
/// Returns the configuration, simulation or serialization error of the
/// command that fails.
pub fn handle_command(command: Commands) -> anyhow::Result<()> {
    match command {
        Commands::Run { options, json } => run(&options, json),
        Commands::Trace {
            options,
            json,
            limit,
        } => trace(&options, json, limit),
        Commands::Config { options } => show_config(&options),
    }
}

/// Builds the configuration from the environment plus command-line overrides.
///
/// # Errors
/// - `IntakeError::Configuration` - The resulting configuration is invalid
pub fn build_config(options: &RunOptions) -> intake_core::Result<IntakeConfig> {
    let mut config = IntakeConfig::from_env();
    if let Some(seed) = options.seed {
        config.simulation.deterministic_seed = Some(seed);
    }
    if let Some(horizon) = options.horizon {
        config.simulation.horizon_minutes = horizon;
    }
    config.validate()?;
    Ok(config)
}

/// Runs the simulation in bulk mode.
///
/// # Errors
/// - `IntakeError::Configuration` - Invalid configuration
/// - `SimulationError` - The run was aborted
pub fn run(options: &RunOptions, json: bool) -> anyhow::Result<()> {
    let config = build_config(options)?;
    let mut simulation = Simulation::new(config).context("Failed to set up simulation")?;
    let report = simulation.run().context("Simulation run aborted")?;

    if json {
        println!("{}", report.to_json()?);
    } else {
        print!("{}", report.summary());
    }
    Ok(())
}

/// Steps through the simulation, printing each processed event.
///
/// # Errors
/// - `IntakeError::Configuration` - Invalid configuration
/// - `SimulationError` - The run was aborted
pub fn trace(options: &RunOptions, json: bool, limit: Option<u64>) -> anyhow::Result<()> {
    let config = build_config(options)?;
    let mut simulation = Simulation::new(config).context("Failed to set up simulation")?;

    let mut printed = 0;
    while limit.is_none_or(|limit| simulation.calendar().step_count() < limit) {
        let Some(event) = simulation.step()? else {
            break;
        };

        // Print the extracted event followed by the notifications it caused.
        let occurred = simulation.calendar().occurred();
        for event in &occurred[printed..] {
            if json {
                println!("{}", serde_json::to_string(event)?);
            } else {
                println!("{event}");
            }
        }
        printed = occurred.len();
        info!(time = %event.time, kind = event.kind.as_str(), "Processed event");
    }

    if !json {
        let pending = simulation.calendar().pending_events();
        println!("\nPending events: {}", pending.len());
        for event in pending {
            println!("  {event}");
        }
        println!();
        print!("{}", simulation.report().summary());
    }
    Ok(())
}

/// Prints the effective configuration.
///
/// # Errors
/// - `IntakeError::Configuration` - Invalid configuration
pub fn show_config(options: &RunOptions) -> anyhow::Result<()> {
    let config = build_config(options)?;
    println!("{}", serde_json::to_string_pretty(&config)?);
    Ok(())
}
