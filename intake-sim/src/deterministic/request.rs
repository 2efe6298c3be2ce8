//! Request entity and its lifecycle state machine.

use intake_core::CargoClass;
use serde::Serialize;

use super::clock::SimTime;
use super::ids::{RequestId, SourceId};

/// Lifecycle status of a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum RequestStatus {
    /// Generated, not yet admitted
    Arrived,
    /// Waiting in a buffer slot
    Queued,
    /// Held by a device
    InService,
    /// Served to the end
    Completed,
    /// Refused at admission
    Rejected,
    /// Dropped from the buffer after expiring
    Evicted,
}

impl RequestStatus {
    /// Checks whether the lifecycle allows moving to `next`.
    ///
    /// Arrived -> InService | Queued | Rejected, Queued -> InService | Evicted,
    /// InService -> Completed. Nothing leaves a terminal status.
    pub fn can_transition_to(self, next: RequestStatus) -> bool {
        use RequestStatus::*;
        matches!(
            (self, next),
            (Arrived, InService | Queued | Rejected)
                | (Queued, InService | Evicted)
                | (InService, Completed)
        )
    }

    /// Returns true for statuses no request ever leaves.
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            RequestStatus::Completed | RequestStatus::Rejected | RequestStatus::Evicted
        )
    }
}

/// A unit of cargo moving through the hub.
///
/// Identity, origin and arrival are fixed at generation. The deadline and
/// buffer slot exist only while the request sits in a buffer.
#[derive(Debug, Clone, Serialize)]
pub struct Request {
    id: RequestId,
    source_id: SourceId,
    arrival_time: SimTime,
    cargo_class: CargoClass,
    status: RequestStatus,
    buffer_slot: Option<u32>,
    deadline: Option<SimTime>,
    service_start_time: Option<SimTime>,
    service_end_time: Option<SimTime>,
}

impl Request {
    /// Creates a freshly arrived request.
    pub fn new(
        id: RequestId,
        source_id: SourceId,
        arrival_time: SimTime,
        cargo_class: CargoClass,
    ) -> Self {
        Self {
            id,
            source_id,
            arrival_time,
            cargo_class,
            status: RequestStatus::Arrived,
            buffer_slot: None,
            deadline: None,
            service_start_time: None,
            service_end_time: None,
        }
    }

    /// Unique identifier assigned on arrival.
    pub fn id(&self) -> RequestId {
        self.id
    }

    /// Source that generated the request.
    pub fn source_id(&self) -> SourceId {
        self.source_id
    }

    /// Instant the request reached the hub.
    pub fn arrival_time(&self) -> SimTime {
        self.arrival_time
    }

    /// Cargo class decided at generation.
    pub fn cargo_class(&self) -> CargoClass {
        self.cargo_class
    }

    /// Current lifecycle stage.
    pub fn status(&self) -> RequestStatus {
        self.status
    }

    /// Slot held while buffered.
    pub fn buffer_slot(&self) -> Option<u32> {
        self.buffer_slot
    }

    /// Expiry instant while buffered, `None` otherwise.
    pub fn deadline(&self) -> Option<SimTime> {
        self.deadline
    }

    /// Instant service began, if it has.
    pub fn service_start_time(&self) -> Option<SimTime> {
        self.service_start_time
    }

    /// Instant service finished, if it has.
    pub fn service_end_time(&self) -> Option<SimTime> {
        self.service_end_time
    }

    /// Checks if the request is queued and `now` lies strictly past its deadline.
    pub fn is_deadline_exceeded(&self, now: SimTime) -> bool {
        self.deadline.is_some_and(|deadline| now > deadline)
    }

    /// Minutes spent in the hub so far.
    pub fn waiting_time(&self, now: SimTime) -> f64 {
        now - self.arrival_time
    }

    /// Minutes left before the deadline, zero when past it or not queued.
    pub fn remaining_time(&self, now: SimTime) -> f64 {
        self.deadline
            .map_or(0.0, |deadline| (deadline - now).max(0.0))
    }

    pub(crate) fn enter_buffer(&mut self, slot: u32, deadline: SimTime) {
        self.transition(RequestStatus::Queued);
        self.buffer_slot = Some(slot);
        self.deadline = Some(deadline);
    }

    /// Clears the buffer slot and deadline, returning the freed slot.
    pub(crate) fn leave_buffer(&mut self) -> Option<u32> {
        self.deadline = None;
        self.buffer_slot.take()
    }

    pub(crate) fn start_service(&mut self, now: SimTime) {
        self.transition(RequestStatus::InService);
        self.service_start_time = Some(now);
    }

    pub(crate) fn complete(&mut self, now: SimTime) {
        self.transition(RequestStatus::Completed);
        self.service_end_time = Some(now);
    }

    pub(crate) fn reject(&mut self) {
        self.transition(RequestStatus::Rejected);
    }

    pub(crate) fn evict(&mut self) {
        self.transition(RequestStatus::Evicted);
    }

    fn transition(&mut self, next: RequestStatus) {
        debug_assert!(
            self.status.can_transition_to(next),
            "{} cannot move from {:?} to {:?}",
            self.id,
            self.status,
            next
        );
        self.status = next;
    }
}
