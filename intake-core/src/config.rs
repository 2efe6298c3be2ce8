//! Centralized configuration for the intake hub simulator.
//!
//! Every tunable of the simulated hub lives here: the horizon, the arrival
//! sources, and the per-class buffer, device and deadline settings. Defaults
//! describe the reference hub (three sources, two devices per class).

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::CargoClass;

/// Errors raised when a configuration cannot drive a simulation.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("Simulation horizon must be positive, got {horizon}")]
    InvalidHorizon { horizon: f64 },

    #[error("Perishable share must lie in [0, 1], got {share}")]
    InvalidPerishableShare { share: f64 },

    #[error("Configuration needs at least one source")]
    NoSources,

    #[error("Source {index} has non-positive arrival rate {rate}")]
    InvalidArrivalRate { index: usize, rate: f64 },

    #[error("{class} service range [{min}, {max}] is invalid")]
    InvalidServiceRange { class: CargoClass, min: f64, max: f64 },

    #[error("{class} deadline offset must be non-negative, got {deadline}")]
    NegativeDeadline { class: CargoClass, deadline: f64 },

    #[error("{class} pool needs at least one device")]
    NoDevices { class: CargoClass },

    #[error("{class} devices need a concurrent capacity of at least one")]
    ZeroDeviceCapacity { class: CargoClass },
}

/// Complete configuration of one simulated hub.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IntakeConfig {
    pub simulation: SimulationConfig,
    pub sources: Vec<SourceConfig>,
    pub perishable: ClassConfig,
    pub regular: ClassConfig,
}

impl Default for IntakeConfig {
    fn default() -> Self {
        Self {
            simulation: SimulationConfig::default(),
            sources: vec![
                SourceConfig::new(0.5),
                SourceConfig::new(0.4),
                SourceConfig::new(0.5),
            ],
            perishable: ClassConfig::perishable(),
            regular: ClassConfig::regular(),
        }
    }
}

/// Run-wide settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationConfig {
    /// Simulated time bound in minutes
    pub horizon_minutes: f64,
    /// Seed for the deterministic random stream
    pub deterministic_seed: Option<u64>,
    /// Probability that a generated request carries perishable cargo
    pub perishable_share: f64,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            horizon_minutes: 24.0 * 60.0,
            deterministic_seed: Some(42),
            perishable_share: 0.1,
        }
    }
}

impl SimulationConfig {
    /// Short horizon with a fixed seed for fast deterministic tests.
    pub fn deterministic_testing() -> Self {
        Self {
            horizon_minutes: 240.0,
            deterministic_seed: Some(42),
            perishable_share: 0.1,
        }
    }
}

/// A single arrival stream.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SourceConfig {
    /// Mean arrivals per minute (lambda of the exponential inter-arrival time)
    pub arrival_rate: f64,
}

impl SourceConfig {
    pub fn new(arrival_rate: f64) -> Self {
        Self { arrival_rate }
    }
}

/// Buffer, device pool and deadline settings for one cargo class.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ClassConfig {
    /// Number of buffer slots (zero disables buffering)
    pub buffer_capacity: usize,
    /// Minutes after arrival at which a queued request becomes evictable
    pub deadline_minutes: f64,
    /// Lower bound of the uniform service time in minutes
    pub min_service_minutes: f64,
    /// Upper bound of the uniform service time in minutes
    pub max_service_minutes: f64,
    /// Devices in this class's pool
    pub device_count: usize,
    /// Requests a single device may serve at once
    pub device_capacity: usize,
}

impl ClassConfig {
    /// Reference settings for the perishable pool.
    pub fn perishable() -> Self {
        Self {
            buffer_capacity: 8,
            deadline_minutes: 15.0,
            min_service_minutes: 5.0,
            max_service_minutes: 10.0,
            device_count: 2,
            device_capacity: 1,
        }
    }

    /// Reference settings for the regular pool.
    pub fn regular() -> Self {
        Self {
            buffer_capacity: 10,
            deadline_minutes: 20.0,
            min_service_minutes: 8.0,
            max_service_minutes: 15.0,
            device_count: 2,
            device_capacity: 1,
        }
    }

    fn validate(&self, class: CargoClass) -> Result<(), ConfigError> {
        let (min, max) = (self.min_service_minutes, self.max_service_minutes);
        if !(min.is_finite() && max.is_finite()) || min < 0.0 || min > max {
            return Err(ConfigError::InvalidServiceRange { class, min, max });
        }
        if !(self.deadline_minutes >= 0.0) {
            return Err(ConfigError::NegativeDeadline {
                class,
                deadline: self.deadline_minutes,
            });
        }
        if self.device_count == 0 {
            return Err(ConfigError::NoDevices { class });
        }
        if self.device_capacity == 0 {
            return Err(ConfigError::ZeroDeviceCapacity { class });
        }
        Ok(())
    }
}

impl IntakeConfig {
    /// Returns the settings for the given cargo class.
    pub fn class(&self, class: CargoClass) -> &ClassConfig {
        match class {
            CargoClass::Perishable => &self.perishable,
            CargoClass::Regular => &self.regular,
        }
    }

    /// Returns mutable settings for the given cargo class.
    pub fn class_mut(&mut self, class: CargoClass) -> &mut ClassConfig {
        match class {
            CargoClass::Perishable => &mut self.perishable,
            CargoClass::Regular => &mut self.regular,
        }
    }

    /// Checks that the configuration can drive a simulation.
    ///
    /// # Errors
    /// - `ConfigError` - First offending value found, sources before classes
    pub fn validate(&self) -> Result<(), ConfigError> {
        let horizon = self.simulation.horizon_minutes;
        if !(horizon > 0.0) {
            return Err(ConfigError::InvalidHorizon { horizon });
        }

        let share = self.simulation.perishable_share;
        if !(0.0..=1.0).contains(&share) {
            return Err(ConfigError::InvalidPerishableShare { share });
        }

        if self.sources.is_empty() {
            return Err(ConfigError::NoSources);
        }
        for (index, source) in self.sources.iter().enumerate() {
            if !(source.arrival_rate > 0.0 && source.arrival_rate.is_finite()) {
                return Err(ConfigError::InvalidArrivalRate {
                    index,
                    rate: source.arrival_rate,
                });
            }
        }

        for class in CargoClass::ALL {
            self.class(class).validate(class)?;
        }

        Ok(())
    }

    /// Creates configuration with environment variable overrides.
    ///
    /// Unparseable values are ignored and the default is kept.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Some(horizon) = env_value::<f64>("INTAKE_HORIZON_MINUTES") {
            config.simulation.horizon_minutes = horizon;
        }

        if let Some(seed) = env_value::<u64>("INTAKE_SIMULATION_SEED") {
            config.simulation.deterministic_seed = Some(seed);
        }

        if let Some(share) = env_value::<f64>("INTAKE_PERISHABLE_SHARE") {
            config.simulation.perishable_share = share;
        }

        config
    }

    /// Creates a configuration optimized for testing.
    pub fn for_testing() -> Self {
        Self {
            simulation: SimulationConfig::deterministic_testing(),
            ..Default::default()
        }
    }

    /// Minimal hub: one source, one single-slot device per class, no buffers.
    ///
    /// Tests widen the pieces they care about from here.
    pub fn single_lane(arrival_rate: f64) -> Self {
        let lane = |class: ClassConfig| ClassConfig {
            buffer_capacity: 0,
            device_count: 1,
            device_capacity: 1,
            ..class
        };
        Self {
            simulation: SimulationConfig::deterministic_testing(),
            sources: vec![SourceConfig::new(arrival_rate)],
            perishable: lane(ClassConfig::perishable()),
            regular: lane(ClassConfig::regular()),
        }
    }
}

fn env_value<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|value| value.parse().ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_values() {
        let config = IntakeConfig::default();

        assert_eq!(config.simulation.horizon_minutes, 1440.0);
        assert_eq!(config.simulation.perishable_share, 0.1);
        assert_eq!(config.sources.len(), 3);
        assert_eq!(config.perishable.buffer_capacity, 8);
        assert_eq!(config.regular.buffer_capacity, 10);
        assert_eq!(config.perishable.deadline_minutes, 15.0);
        assert_eq!(config.regular.deadline_minutes, 20.0);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_class_lookup() {
        let mut config = IntakeConfig::default();
        assert_eq!(config.class(CargoClass::Regular).max_service_minutes, 15.0);

        config.class_mut(CargoClass::Perishable).device_count = 5;
        assert_eq!(config.perishable.device_count, 5);
    }

    #[test]
    fn test_validation_rejects_bad_values() {
        let mut config = IntakeConfig::default();
        config.sources[1].arrival_rate = 0.0;
        assert_eq!(
            config.validate(),
            Err(ConfigError::InvalidArrivalRate {
                index: 1,
                rate: 0.0
            })
        );

        let mut config = IntakeConfig::default();
        config.regular.min_service_minutes = 20.0;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidServiceRange {
                class: CargoClass::Regular,
                ..
            })
        ));

        let mut config = IntakeConfig::default();
        config.perishable.device_capacity = 0;
        assert_eq!(
            config.validate(),
            Err(ConfigError::ZeroDeviceCapacity {
                class: CargoClass::Perishable
            })
        );

        let mut config = IntakeConfig::default();
        config.sources.clear();
        assert_eq!(config.validate(), Err(ConfigError::NoSources));

        let mut config = IntakeConfig::default();
        config.simulation.perishable_share = 1.5;
        assert!(config.validate().is_err());

        let mut config = IntakeConfig::default();
        config.simulation.horizon_minutes = f64::NAN;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_zero_capacity_buffer_is_valid() {
        let config = IntakeConfig::single_lane(0.5);
        assert_eq!(config.perishable.buffer_capacity, 0);
        assert_eq!(config.sources.len(), 1);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_env_override() {
        unsafe {
            std::env::set_var("INTAKE_HORIZON_MINUTES", "90");
            std::env::set_var("INTAKE_SIMULATION_SEED", "12345");
            std::env::set_var("INTAKE_PERISHABLE_SHARE", "not-a-number");
        }

        let config = IntakeConfig::from_env();

        assert_eq!(config.simulation.horizon_minutes, 90.0);
        assert_eq!(config.simulation.deterministic_seed, Some(12345));
        assert_eq!(config.simulation.perishable_share, 0.1);

        unsafe {
            std::env::remove_var("INTAKE_HORIZON_MINUTES");
            std::env::remove_var("INTAKE_SIMULATION_SEED");
            std::env::remove_var("INTAKE_PERISHABLE_SHARE");
        }
    }

    #[test]
    fn test_config_serializes_to_json() {
        let config = IntakeConfig::default();
        let json = serde_json::to_string(&config).unwrap();
        let parsed: IntakeConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, config);
    }
}
