//! Run statistics fed by the dispatcher and the driver.

use std::collections::BTreeMap;

use intake_core::CargoClass;
use serde::Serialize;

use super::events::EventKind;
use super::invariants::InvariantViolation;
use super::request::Request;

/// Outcome counters for one cargo class.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ClassStatistics {
    /// Requests of this class generated
    pub arrivals: u64,
    /// Requests served to the end
    pub completions: u64,
    /// Requests refused at admission
    pub rejections: u64,
    /// Queued requests dropped after expiring
    pub evictions: u64,
}

impl ClassStatistics {
    /// Requests of this class still queued or in service.
    pub fn in_system(&self) -> u64 {
        self.arrivals
            .saturating_sub(self.completions + self.rejections + self.evictions)
    }
}

/// Mean and maximum of a list of durations in minutes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct TimeSummary {
    /// Samples recorded
    pub count: usize,
    /// Mean in minutes, zero when empty
    pub mean: f64,
    /// Largest sample in minutes
    pub max: f64,
}

impl TimeSummary {
    fn of(samples: &[f64]) -> Self {
        if samples.is_empty() {
            return Self::default();
        }
        let total: f64 = samples.iter().sum();
        Self {
            count: samples.len(),
            mean: total / samples.len() as f64,
            max: samples.iter().copied().fold(f64::MIN, f64::max),
        }
    }
}

/// Metrics collected during simulation.
#[derive(Debug, Clone, Default, Serialize)]
pub struct SimulationMetrics {
    /// Occurred events by kind, notifications included
    pub events_by_kind: BTreeMap<String, u64>,
    /// Requests generated
    pub arrivals: u64,
    /// Requests served to the end
    pub completions: u64,
    /// Requests refused at admission
    pub rejections: u64,
    /// Queued requests dropped after expiring
    pub evictions: u64,
    /// Counters split by cargo class
    pub by_class: BTreeMap<CargoClass, ClassStatistics>,
    /// Minutes between arrival and service start, per completed request
    pub waiting_times: Vec<f64>,
    /// Minutes between service start and completion
    pub service_times: Vec<f64>,
    /// Minutes between arrival and completion
    pub system_times: Vec<f64>,
    /// Invariant violations detected
    pub invariant_violations: Vec<InvariantViolation>,
}

impl SimulationMetrics {
    /// Creates new metrics collector.
    pub fn new() -> Self {
        Self::default()
    }

    /// Counts one occurred event of `kind`.
    pub fn record_event(&mut self, kind: EventKind) {
        *self
            .events_by_kind
            .entry(kind.as_str().to_string())
            .or_insert(0) += 1;
    }

    /// Counts a generated request.
    pub fn record_arrival(&mut self, request: &Request) {
        self.arrivals += 1;
        self.class_entry(request.cargo_class()).arrivals += 1;
    }

    /// Records a completed request and its timing samples.
    pub fn record_completion(&mut self, request: &Request) {
        self.completions += 1;
        self.class_entry(request.cargo_class()).completions += 1;

        let arrival = request.arrival_time();
        if let (Some(start), Some(end)) = (request.service_start_time(), request.service_end_time()) {
            self.waiting_times.push(start - arrival);
            self.service_times.push(end - start);
            self.system_times.push(end - arrival);
        }
    }

    /// Counts an arrival that found no room.
    pub fn record_rejection(&mut self, request: &Request) {
        self.rejections += 1;
        self.class_entry(request.cargo_class()).rejections += 1;
    }

    /// Counts a resident dropped for a newer arrival.
    pub fn record_eviction(&mut self, request: &Request) {
        self.evictions += 1;
        self.class_entry(request.cargo_class()).evictions += 1;
    }

    /// Records an invariant violation.
    pub fn record_invariant_violation(&mut self, violation: InvariantViolation) {
        self.invariant_violations.push(violation);
    }

    /// Counters for one class, zeroed when it never saw an arrival.
    pub fn class(&self, class: CargoClass) -> ClassStatistics {
        self.by_class.get(&class).copied().unwrap_or_default()
    }

    /// Requests that arrived but have not reached a terminal status.
    pub fn in_system(&self) -> u64 {
        self.arrivals
            .saturating_sub(self.completions + self.rejections + self.evictions)
    }

    /// Share of arrivals that completed service.
    pub fn completion_rate(&self) -> f64 {
        ratio(self.completions, self.arrivals)
    }

    /// Share of arrivals that were rejected.
    pub fn rejection_rate(&self) -> f64 {
        ratio(self.rejections, self.arrivals)
    }

    /// Time from arrival to service start.
    pub fn waiting_summary(&self) -> TimeSummary {
        TimeSummary::of(&self.waiting_times)
    }

    /// Time from service start to completion.
    pub fn service_summary(&self) -> TimeSummary {
        TimeSummary::of(&self.service_times)
    }

    /// Time from arrival to completion.
    pub fn system_summary(&self) -> TimeSummary {
        TimeSummary::of(&self.system_times)
    }

    /// Generates summary statistics.
    pub fn summary(&self) -> String {
        let mut summary = String::new();

        summary.push_str(&format!("Arrivals: {}\n", self.arrivals));
        summary.push_str(&format!(
            "Completions: {} ({:.1}%)\n",
            self.completions,
            self.completion_rate() * 100.0
        ));
        summary.push_str(&format!(
            "Rejections: {} ({:.1}%)\n",
            self.rejections,
            self.rejection_rate() * 100.0
        ));
        summary.push_str(&format!("Evictions: {}\n", self.evictions));
        summary.push_str(&format!("Still in system: {}\n", self.in_system()));

        for class in CargoClass::ALL {
            let stats = self.class(class);
            summary.push_str(&format!(
                "  {class}: arrivals {}, completed {}, rejected {}, evicted {}\n",
                stats.arrivals, stats.completions, stats.rejections, stats.evictions
            ));
        }

        for (label, times) in [
            ("Waiting", self.waiting_summary()),
            ("Service", self.service_summary()),
            ("System", self.system_summary()),
        ] {
            summary.push_str(&format!(
                "{label} time: mean {:.2} min, max {:.2} min\n",
                times.mean, times.max
            ));
        }

        summary
    }

    fn class_entry(&mut self, class: CargoClass) -> &mut ClassStatistics {
        self.by_class.entry(class).or_default()
    }
}

fn ratio(part: u64, whole: u64) -> f64 {
    if whole == 0 {
        return 0.0;
    }
    part as f64 / whole as f64
}
