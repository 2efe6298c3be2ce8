//! Virtual time and random number generation for deterministic simulations.

use std::cmp::Ordering;
use std::fmt;
use std::ops::{Add, Sub};

use rand::{RngCore, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

use super::simulation::SimulationError;

/// Instant on the simulated timeline, in minutes since the run started.
///
/// Totally ordered through `f64::total_cmp` so it can key the event heap.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SimTime(f64);

impl SimTime {
    /// Start of every run.
    pub const ZERO: SimTime = SimTime(0.0);

    /// Creates an instant from minutes since start.
    pub fn from_minutes(minutes: f64) -> Self {
        Self(minutes)
    }

    /// Returns minutes since start.
    pub fn minutes(self) -> f64 {
        self.0
    }
}

impl PartialEq for SimTime {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for SimTime {}

impl Ord for SimTime {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.total_cmp(&other.0)
    }
}

impl PartialOrd for SimTime {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Add<f64> for SimTime {
    type Output = SimTime;

    fn add(self, minutes: f64) -> SimTime {
        SimTime(self.0 + minutes)
    }
}

impl Sub for SimTime {
    type Output = f64;

    fn sub(self, earlier: SimTime) -> f64 {
        self.0 - earlier.0
    }
}

impl fmt::Display for SimTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.2}", self.0)
    }
}

/// Clock owned by the driver loop.
///
/// Time only moves forward, and only by jumping to the next event.
#[derive(Debug, Clone, Default)]
pub struct SimulationClock {
    now: SimTime,
}

impl SimulationClock {
    /// Creates a clock at simulation time zero.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns current simulation time.
    pub fn now(&self) -> SimTime {
        self.now
    }

    /// Jumps to the given instant.
    ///
    /// # Errors
    ///
    /// - `SimulationError::TimeTravel` - If target lies before the current time
    pub fn advance_to(&mut self, target: SimTime) -> Result<(), SimulationError> {
        if target < self.now {
            return Err(SimulationError::TimeTravel {
                now: self.now,
                target,
            });
        }
        self.now = target;
        Ok(())
    }
}

/// Seedable random stream shared by sources and devices.
///
/// Uses ChaCha8 so that a seed reproduces a whole run. Implements
/// `RngCore`, so any `rand_distr` distribution can sample from it.
#[derive(Debug, Clone)]
pub struct DeterministicRng {
    rng: ChaCha8Rng,
    seed: u64,
}

impl DeterministicRng {
    /// Creates deterministic RNG from seed value.
    pub fn from_seed(seed: u64) -> Self {
        Self {
            rng: ChaCha8Rng::seed_from_u64(seed),
            seed,
        }
    }

    /// Returns the seed used for this RNG.
    pub fn seed(&self) -> u64 {
        self.seed
    }
}

impl RngCore for DeterministicRng {
    fn next_u32(&mut self) -> u32 {
        self.rng.next_u32()
    }

    fn next_u64(&mut self) -> u64 {
        self.rng.next_u64()
    }

    fn fill_bytes(&mut self, dest: &mut [u8]) {
        self.rng.fill_bytes(dest);
    }
}
