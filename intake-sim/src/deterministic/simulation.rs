//! Simulation driver: pulls events off the calendar and routes them.

use std::sync::Arc;

use intake_core::{ConfigError, IntakeConfig};
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info, warn};

use super::calendar::EventCalendar;
use super::clock::{DeterministicRng, SimTime, SimulationClock};
use super::dispatcher::{Admission, DispatchContext, Dispatcher};
use super::events::{Event, EventKind, EventSubject};
use super::ids::{DeviceId, RequestIdAllocator, SourceId};
use super::invariants::{Invariant, default_invariants};
use super::snapshot::{BufferSnapshot, DeviceSnapshot, SimulationSnapshot, SourceSnapshot, Totals};
use super::source::Source;
use super::statistics::SimulationMetrics;

/// Maximum number of invariant violations before stopping simulation.
const MAX_INVARIANT_VIOLATIONS: usize = 10;

/// Errors that can occur during simulation.
#[derive(Debug, Error)]
pub enum SimulationError {
    /// Configuration rejected at construction
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(#[from] ConfigError),

    /// Deterministic seed required but not provided
    #[error("No deterministic seed provided")]
    NoDeterministicSeed,

    /// An event was scheduled before the current simulated time
    #[error("Cannot move clock back from {now} to {target}")]
    TimeTravel {
        /// Time when the jump was attempted
        now: SimTime,
        /// Requested earlier time
        target: SimTime,
    },

    /// Too many invariant violations occurred
    #[error("Too many invariant violations: {count}")]
    TooManyInvariantViolations {
        /// Number of violations that occurred
        count: usize,
    },
}

/// Result of a simulation run.
#[derive(Debug, Clone, Serialize)]
pub struct SimulationReport {
    /// Seed used for reproduction
    pub seed: u64,
    /// Simulated time of the last processed event
    pub end_time: SimTime,
    /// Total events extracted from the calendar
    pub event_count: u64,
    /// Collected metrics
    pub statistics: SimulationMetrics,
    /// Engine state when the run stopped
    pub final_snapshot: SimulationSnapshot,
    /// Whether no invariant was violated
    pub success: bool,
}

impl SimulationReport {
    /// Generates human-readable summary.
    pub fn summary(&self) -> String {
        let mut summary = String::new();
        summary.push_str(&format!("Simulation Report (seed: {})\n", self.seed));
        summary.push_str(&format!("End time: {} min\n", self.end_time));
        summary.push_str(&format!("Events processed: {}\n", self.event_count));
        summary.push_str(&format!("Success: {}\n\n", self.success));
        summary.push_str(&self.statistics.summary());

        summary.push_str("\nEvent breakdown:\n");
        for (kind, count) in &self.statistics.events_by_kind {
            summary.push_str(&format!("  {kind}: {count}\n"));
        }

        summary.push_str("\nSources:\n");
        for source in &self.final_snapshot.sources {
            summary.push_str(&format!(
                "  {}: generated {}, rejected {}\n",
                source.id, source.generated, source.rejected
            ));
        }

        summary.push_str("\nDevices:\n");
        for device in &self.final_snapshot.devices {
            summary.push_str(&format!(
                "  {} ({}): processed {}\n",
                device.id, device.class, device.processed
            ));
        }

        if !self.statistics.invariant_violations.is_empty() {
            summary.push_str("\nInvariant violations:\n");
            for violation in &self.statistics.invariant_violations {
                summary.push_str(&format!("  - {violation}\n"));
            }
        }

        summary
    }

    /// Serializes the full report.
    ///
    /// # Errors
    /// - `serde_json::Error` - Serialization failed
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

/// Discrete-event simulation of the intake hub.
///
/// Single-threaded: each step extracts one event and applies all of its
/// consequences before returning.
pub struct Simulation {
    config: IntakeConfig,
    clock: SimulationClock,
    rng: DeterministicRng,
    calendar: EventCalendar,
    sources: Vec<Source>,
    dispatcher: Dispatcher,
    request_ids: RequestIdAllocator,
    metrics: SimulationMetrics,
    invariants: Vec<Arc<dyn Invariant>>,
}

impl Simulation {
    /// Creates a simulation and schedules every source's first arrival.
    ///
    /// # Errors
    /// - `SimulationError::InvalidConfiguration` - Config fails validation
    /// - `SimulationError::NoDeterministicSeed` - No seed provided in config
    pub fn new(config: IntakeConfig) -> Result<Self, SimulationError> {
        config.validate()?;
        let seed = config
            .simulation
            .deterministic_seed
            .ok_or(SimulationError::NoDeterministicSeed)?;

        let sources = config
            .sources
            .iter()
            .enumerate()
            .map(|(index, source)| {
                Source::new(
                    SourceId(index as u32 + 1),
                    source.arrival_rate,
                    config.simulation.perishable_share,
                )
            })
            .collect::<Result<Vec<_>, _>>()?;

        let mut simulation = Self {
            dispatcher: Dispatcher::new(&config),
            config,
            clock: SimulationClock::new(),
            rng: DeterministicRng::from_seed(seed),
            calendar: EventCalendar::new(),
            sources,
            request_ids: RequestIdAllocator::new(),
            metrics: SimulationMetrics::new(),
            invariants: default_invariants(),
        };

        for index in 0..simulation.sources.len() {
            simulation.schedule_next_arrival(index);
        }
        Ok(simulation)
    }

    /// Returns the seed used for this simulation.
    pub fn seed(&self) -> u64 {
        self.rng.seed()
    }

    /// Returns current simulation time.
    pub fn now(&self) -> SimTime {
        self.clock.now()
    }

    /// Last instant at which events are processed.
    pub fn horizon(&self) -> SimTime {
        SimTime::from_minutes(self.config.simulation.horizon_minutes)
    }

    /// Configuration the run was built from.
    pub fn config(&self) -> &IntakeConfig {
        &self.config
    }

    /// Pending events and the occurred log.
    pub fn calendar(&self) -> &EventCalendar {
        &self.calendar
    }

    /// Counters and timing samples collected so far.
    pub fn metrics(&self) -> &SimulationMetrics {
        &self.metrics
    }

    /// Admission state of both lanes.
    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    /// Sources in configuration order.
    pub fn sources(&self) -> &[Source] {
        &self.sources
    }

    /// Adds an invariant to check after every step.
    pub fn add_invariant(&mut self, invariant: Arc<dyn Invariant>) {
        self.invariants.push(invariant);
    }

    /// Drops every invariant, including the defaults.
    pub fn clear_invariants(&mut self) {
        self.invariants.clear();
    }

    /// Processes the next event within the horizon.
    ///
    /// Returns the processed event, or `None` when nothing is left to do
    /// before the horizon.
    ///
    /// # Errors
    /// - `SimulationError::TimeTravel` - An event was scheduled in the past
    /// - `SimulationError::TooManyInvariantViolations` - Too many invariant violations
    pub fn step(&mut self) -> Result<Option<Event>, SimulationError> {
        self.step_until(self.horizon())
    }

    /// Runs silently until `target` or the horizon, whichever is earlier.
    ///
    /// Events after the bound stay pending.
    ///
    /// # Errors
    /// - `SimulationError::TimeTravel` - An event was scheduled in the past
    /// - `SimulationError::TooManyInvariantViolations` - Too many invariant violations
    pub fn run_until(&mut self, target: SimTime) -> Result<SimulationReport, SimulationError> {
        let bound = target.min(self.horizon());
        info!(seed = self.seed(), bound = %bound, "Simulation run started");

        while self.step_until(bound)?.is_some() {}

        info!(
            end_time = %self.now(),
            events = self.calendar.step_count(),
            arrivals = self.metrics.arrivals,
            completions = self.metrics.completions,
            "Simulation run finished"
        );
        Ok(self.report())
    }

    /// Runs to the configured horizon.
    ///
    /// # Errors
    /// - `SimulationError::TimeTravel` - An event was scheduled in the past
    /// - `SimulationError::TooManyInvariantViolations` - Too many invariant violations
    pub fn run(&mut self) -> Result<SimulationReport, SimulationError> {
        self.run_until(self.horizon())
    }

    /// Read-only view of the current state.
    pub fn snapshot(&self) -> SimulationSnapshot {
        SimulationSnapshot {
            now: self.now(),
            sources: self.sources.iter().map(SourceSnapshot::from).collect(),
            buffers: self.dispatcher.buffers().map(BufferSnapshot::from).collect(),
            devices: self.dispatcher.devices().map(DeviceSnapshot::from).collect(),
            totals: Totals::from(&self.metrics),
            pending_events: self.calendar.len(),
        }
    }

    /// Generates simulation report.
    pub fn report(&self) -> SimulationReport {
        SimulationReport {
            seed: self.seed(),
            end_time: self.now(),
            event_count: self.calendar.step_count(),
            statistics: self.metrics.clone(),
            final_snapshot: self.snapshot(),
            success: self.metrics.invariant_violations.is_empty(),
        }
    }

    fn step_until(&mut self, bound: SimTime) -> Result<Option<Event>, SimulationError> {
        if !self.calendar.peek_time().is_some_and(|time| time <= bound) {
            return Ok(None);
        }
        let Some(event) = self.calendar.next() else {
            return Ok(None);
        };

        self.clock.advance_to(event.time)?;
        self.metrics.record_event(event.kind);

        match (event.kind, event.subject) {
            (EventKind::Arrival, EventSubject::Source(source_id)) => self.handle_arrival(source_id),
            (EventKind::ServiceComplete, EventSubject::Device(device_id)) => {
                self.handle_completion(device_id)
            }
            _ => debug_assert!(false, "{event} cannot be pending"),
        }

        self.check_invariants()?;
        Ok(Some(event))
    }

    fn handle_arrival(&mut self, source_id: SourceId) {
        let index = source_id.0 as usize - 1;
        let now = self.clock.now();
        let Some(source) = self.sources.get_mut(index) else {
            debug_assert!(false, "arrival from unknown {source_id}");
            return;
        };

        let request = source.generate(now, &mut self.request_ids, &mut self.rng);
        self.metrics.record_arrival(&request);
        debug!(request_id = %request.id(), source_id = %source_id, class = %request.cargo_class(), time = %now, "Request arrived");
        self.schedule_next_arrival(index);

        let mut ctx = DispatchContext {
            now,
            calendar: &mut self.calendar,
            metrics: &mut self.metrics,
            rng: &mut self.rng,
        };
        if self.dispatcher.admit(request, &mut ctx) == Admission::Rejected {
            if let Some(source) = self.sources.get_mut(index) {
                source.record_rejection();
            }
        }
    }

    fn handle_completion(&mut self, device_id: DeviceId) {
        let mut ctx = DispatchContext {
            now: self.clock.now(),
            calendar: &mut self.calendar,
            metrics: &mut self.metrics,
            rng: &mut self.rng,
        };
        let done = self.dispatcher.complete_service(device_id, &mut ctx);
        debug_assert!(done.is_some(), "{device_id} had nothing to complete");
    }

    fn schedule_next_arrival(&mut self, index: usize) {
        let Some(source) = self.sources.get_mut(index) else {
            return;
        };
        let time = self.clock.now() + source.next_inter_arrival(&mut self.rng);
        source.set_next_generation_time(time);
        self.calendar.schedule(
            time,
            EventKind::Arrival,
            EventSubject::Source(source.id()),
            format!("next arrival from {}", source.id()),
        );
    }

    fn check_invariants(&mut self) -> Result<(), SimulationError> {
        if self.invariants.is_empty() {
            return Ok(());
        }

        let snapshot = self.snapshot();
        for invariant in &self.invariants {
            if let Err(violation) = invariant.check(&snapshot) {
                warn!(%violation, "Invariant violated");
                self.metrics.record_invariant_violation(violation);

                if self.metrics.invariant_violations.len() >= MAX_INVARIANT_VIOLATIONS {
                    return Err(SimulationError::TooManyInvariantViolations {
                        count: self.metrics.invariant_violations.len(),
                    });
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_simulation_initialization() {
        let sim = Simulation::new(IntakeConfig::for_testing()).unwrap();
        assert_eq!(sim.seed(), 42);
        assert_eq!(sim.now(), SimTime::ZERO);
        // One pending arrival per source.
        assert_eq!(sim.calendar().len(), sim.sources().len());
        assert!(sim.sources().iter().all(|source| source.next_generation_time().is_some()));
    }

    #[test]
    fn test_simulation_without_seed_fails() {
        let mut config = IntakeConfig::for_testing();
        config.simulation.deterministic_seed = None;

        let result = Simulation::new(config);
        assert!(matches!(result, Err(SimulationError::NoDeterministicSeed)));
    }

    #[test]
    fn test_invalid_config_is_rejected() {
        let mut config = IntakeConfig::for_testing();
        config.sources.clear();

        let result = Simulation::new(config);
        assert!(matches!(
            result,
            Err(SimulationError::InvalidConfiguration(ConfigError::NoSources))
        ));
    }

    #[test]
    fn test_first_step_is_an_arrival() {
        let mut sim = Simulation::new(IntakeConfig::for_testing()).unwrap();
        let event = sim.step().unwrap().unwrap();

        assert_eq!(event.kind, EventKind::Arrival);
        assert_eq!(sim.now(), event.time);
        assert_eq!(sim.metrics().arrivals, 1);
        assert_eq!(sim.calendar().step_count(), 1);
    }

    #[test]
    fn test_report_summary_mentions_seed() {
        let mut config = IntakeConfig::for_testing();
        config.simulation.horizon_minutes = 60.0;
        let mut sim = Simulation::new(config).unwrap();

        let report = sim.run().unwrap();
        assert!(report.success);
        assert!(report.summary().contains("seed: 42"));
        assert!(report.end_time <= SimTime::from_minutes(60.0));

        let json: serde_json::Value = serde_json::from_str(&report.to_json().unwrap()).unwrap();
        assert_eq!(json["seed"], 42);
    }
}
