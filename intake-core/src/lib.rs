//! Intake Core - Shared building blocks for the warehouse intake hub simulator
//!
//! This crate holds the pieces every other crate in the workspace leans on:
//! the cargo class taxonomy, the simulation configuration, and tracing
//! setup for binaries.

pub mod cargo_class;
pub mod config;
pub mod tracing_setup;

// Re-export main types for convenient access
pub use cargo_class::CargoClass;
pub use config::{ClassConfig, ConfigError, IntakeConfig, SimulationConfig, SourceConfig};

/// Errors that can bubble up from the shared infrastructure.
#[derive(Debug, thiserror::Error)]
pub enum IntakeError {
    #[error("Configuration error: {0}")]
    Configuration(#[from] ConfigError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Tracing initialization failed: {reason}")]
    TracingInit { reason: String },
}

impl IntakeError {
    /// Returns a user-friendly error message suitable for display.
    pub fn user_message(&self) -> String {
        match self {
            IntakeError::Configuration(e) => format!("Invalid configuration: {e}"),
            IntakeError::Io(_) => "File system error occurred".to_string(),
            IntakeError::TracingInit { .. } => "Could not set up logging".to_string(),
        }
    }

    /// Checks if this error is due to user input validation.
    pub fn is_user_error(&self) -> bool {
        matches!(self, IntakeError::Configuration(_))
    }
}

pub type Result<T> = std::result::Result<T, IntakeError>;
