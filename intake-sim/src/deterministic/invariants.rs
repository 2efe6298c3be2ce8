//! Invariant checking framework for simulation validation.

use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

use serde::Serialize;

use super::clock::SimTime;
use super::request::RequestStatus;
use super::snapshot::SimulationSnapshot;

/// Violation of a simulation invariant.
#[derive(Debug, Clone, Serialize)]
pub struct InvariantViolation {
    /// Name of the violated invariant
    pub invariant: String,
    /// Detailed description of the violation
    pub description: String,
    /// Simulated instant of the check that failed
    pub time: SimTime,
}

impl InvariantViolation {
    fn new(invariant: &dyn Invariant, snapshot: &SimulationSnapshot, description: String) -> Self {
        Self {
            invariant: invariant.name().to_string(),
            description,
            time: snapshot.now,
        }
    }
}

impl fmt::Display for InvariantViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Invariant '{}' violated at t={}: {}",
            self.invariant, self.time, self.description
        )
    }
}

/// Trait for checking simulation invariants.
pub trait Invariant: Send + Sync {
    /// Checks if invariant holds for the snapshot.
    ///
    /// # Errors
    /// Returns `InvariantViolation` if the invariant condition is not met.
    fn check(&self, snapshot: &SimulationSnapshot) -> Result<(), InvariantViolation>;

    /// Returns name of this invariant.
    fn name(&self) -> &str;
}

/// Buffers and devices never hold more than their capacity.
pub struct CapacityInvariant;

impl Invariant for CapacityInvariant {
    fn check(&self, snapshot: &SimulationSnapshot) -> Result<(), InvariantViolation> {
        for buffer in &snapshot.buffers {
            if buffer.residents.len() > buffer.capacity {
                return Err(InvariantViolation::new(
                    self,
                    snapshot,
                    format!(
                        "{} buffer holds {} requests, capacity {}",
                        buffer.class,
                        buffer.residents.len(),
                        buffer.capacity
                    ),
                ));
            }
        }
        for device in &snapshot.devices {
            if device.in_progress.len() > device.capacity {
                return Err(InvariantViolation::new(
                    self,
                    snapshot,
                    format!(
                        "{} serves {} requests, capacity {}",
                        device.id,
                        device.in_progress.len(),
                        device.capacity
                    ),
                ));
            }
        }
        Ok(())
    }

    fn name(&self) -> &str {
        "Capacity"
    }
}

/// A request sits in at most one buffer or device at a time.
pub struct ExclusiveOwnershipInvariant;

impl Invariant for ExclusiveOwnershipInvariant {
    fn check(&self, snapshot: &SimulationSnapshot) -> Result<(), InvariantViolation> {
        let mut seen = HashSet::new();
        for id in snapshot.held_request_ids() {
            if !seen.insert(id) {
                return Err(InvariantViolation::new(
                    self,
                    snapshot,
                    format!("{id} is held by more than one container"),
                ));
            }
        }
        Ok(())
    }

    fn name(&self) -> &str {
        "ExclusiveOwnership"
    }
}

/// Residents are queued with a deadline; requests in service carry none.
pub struct QueuedDeadlineInvariant;

impl Invariant for QueuedDeadlineInvariant {
    fn check(&self, snapshot: &SimulationSnapshot) -> Result<(), InvariantViolation> {
        let residents = snapshot.buffers.iter().flat_map(|buffer| &buffer.residents);
        for request in residents {
            if request.status() != RequestStatus::Queued || request.deadline().is_none() {
                return Err(InvariantViolation::new(
                    self,
                    snapshot,
                    format!(
                        "buffered {} is {:?} with deadline {:?}",
                        request.id(),
                        request.status(),
                        request.deadline()
                    ),
                ));
            }
        }

        let serving = snapshot.devices.iter().flat_map(|device| &device.in_progress);
        for request in serving {
            if request.status() != RequestStatus::InService || request.deadline().is_some() {
                return Err(InvariantViolation::new(
                    self,
                    snapshot,
                    format!(
                        "{} on a device is {:?} with deadline {:?}",
                        request.id(),
                        request.status(),
                        request.deadline()
                    ),
                ));
            }
        }
        Ok(())
    }

    fn name(&self) -> &str {
        "QueuedDeadline"
    }
}

/// Buffer residents occupy distinct slots numbered `1..=capacity`.
pub struct BufferSlotInvariant;

impl Invariant for BufferSlotInvariant {
    fn check(&self, snapshot: &SimulationSnapshot) -> Result<(), InvariantViolation> {
        for buffer in &snapshot.buffers {
            let mut taken = HashSet::new();
            for request in &buffer.residents {
                let slot = request.buffer_slot();
                let in_range =
                    slot.is_some_and(|slot| (1..=buffer.capacity).contains(&(slot as usize)));
                if !in_range {
                    return Err(InvariantViolation::new(
                        self,
                        snapshot,
                        format!(
                            "{} in {} buffer has slot {:?}, capacity {}",
                            request.id(),
                            buffer.class,
                            slot,
                            buffer.capacity
                        ),
                    ));
                }
                if !taken.insert(slot) {
                    return Err(InvariantViolation::new(
                        self,
                        snapshot,
                        format!("{} buffer slot {slot:?} is shared", buffer.class),
                    ));
                }
            }
        }
        Ok(())
    }

    fn name(&self) -> &str {
        "BufferSlot"
    }
}

/// Every arrival is completed, rejected, evicted or still held.
pub struct ConservationInvariant;

impl Invariant for ConservationInvariant {
    fn check(&self, snapshot: &SimulationSnapshot) -> Result<(), InvariantViolation> {
        let totals = snapshot.totals;
        let held = snapshot.in_system() as u64;
        let accounted = totals.completions + totals.rejections + totals.evictions + held;
        if totals.arrivals != accounted {
            return Err(InvariantViolation::new(
                self,
                snapshot,
                format!(
                    "{} arrivals but {} completed + {} rejected + {} evicted + {} held",
                    totals.arrivals, totals.completions, totals.rejections, totals.evictions, held
                ),
            ));
        }
        Ok(())
    }

    fn name(&self) -> &str {
        "Conservation"
    }
}

/// Invariants every run checks after each step.
pub fn default_invariants() -> Vec<Arc<dyn Invariant>> {
    vec![
        Arc::new(CapacityInvariant),
        Arc::new(ExclusiveOwnershipInvariant),
        Arc::new(QueuedDeadlineInvariant),
        Arc::new(BufferSlotInvariant),
        Arc::new(ConservationInvariant),
    ]
}
