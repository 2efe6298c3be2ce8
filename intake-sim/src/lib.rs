//! Intake Simulation Engine - Deterministic discrete-event model of a warehouse intake hub.

#![warn(missing_docs)]
#![warn(clippy::missing_errors_doc)]
#![deny(clippy::missing_panics_doc)]
#![warn(clippy::too_many_lines)]
//!
//! Sources deliver perishable and regular cargo requests at random
//! intervals. Each class has its own pool of service devices and a bounded
//! overflow buffer in which queued requests expire after a deadline.
//!
//! # Features
//!
//! - **Deterministic Execution**: Same seed always produces identical results
//! - **Event Calendar**: Simultaneous events resolve by a fixed kind rank
//! - **Admission Policy**: Device, then buffer, then eviction, then rejection
//! - **Invariant Checking**: Capacity, slots, ownership and conservation after every step
//! - **Statistics**: Per-class outcomes and waiting, service and system times
//!
//! # Example
//!
//! ```rust,no_run
//! use intake_core::IntakeConfig;
//! use intake_sim::Simulation;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let mut config = IntakeConfig::default();
//! config.simulation.deterministic_seed = Some(12345);
//!
//! let mut sim = Simulation::new(config)?;
//! while let Some(event) = sim.step()? {
//!     println!("{event}");
//! }
//!
//! let report = sim.report();
//! println!("{}", report.summary());
//! # Ok(())
//! # }
//! ```

/// Discrete-event engine with explicit state snapshots.
pub mod deterministic;

pub use deterministic::{
    Admission, DeterministicRng, Event, EventCalendar, EventKind, EventSubject, Invariant,
    InvariantViolation, Request, RequestStatus, SimTime, Simulation, SimulationError,
    SimulationMetrics, SimulationReport, SimulationSnapshot,
};
