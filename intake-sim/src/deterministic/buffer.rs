//! Bounded per-class holding area with deadline tracking.

use std::collections::BTreeSet;

use intake_core::CargoClass;
use tracing::trace;

use super::clock::SimTime;
use super::ids::RequestId;
use super::request::Request;

/// Overflow buffer for one cargo class.
///
/// Residents keep their insertion order. Slots are numbered `1..=capacity`
/// and the lowest free slot is handed out first.
#[derive(Debug, Clone)]
pub struct Buffer {
    class: CargoClass,
    capacity: usize,
    deadline_minutes: f64,
    residents: Vec<Request>,
    free_slots: BTreeSet<u32>,
}

impl Buffer {
    /// Creates an empty buffer. A capacity of zero disables buffering.
    pub fn new(class: CargoClass, capacity: usize, deadline_minutes: f64) -> Self {
        Self {
            class,
            capacity,
            deadline_minutes,
            residents: Vec::with_capacity(capacity),
            free_slots: (1..=capacity as u32).collect(),
        }
    }

    /// Cargo class this buffer queues.
    pub fn cargo_class(&self) -> CargoClass {
        self.class
    }

    /// Number of slots.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Minutes after arrival at which residents of this buffer expire.
    pub fn deadline_minutes(&self) -> f64 {
        self.deadline_minutes
    }

    /// Queues the request in the lowest free slot.
    ///
    /// The deadline counts from the request's arrival, not from insertion.
    /// A full buffer hands the request back untouched.
    pub fn try_add(&mut self, mut request: Request) -> Result<u32, Request> {
        if !self.has_space() {
            return Err(request);
        }
        let Some(slot) = self.free_slots.pop_first() else {
            return Err(request);
        };

        let deadline = request.arrival_time() + self.deadline_minutes;
        request.enter_buffer(slot, deadline);
        trace!(request = %request.id(), slot, %deadline, class = %self.class, "Buffered request");
        self.residents.push(request);
        Ok(slot)
    }

    /// Resident a freed device should take next: the most recently inserted.
    ///
    /// The request stays buffered until `remove` is called.
    pub fn select_for_device(&self) -> Option<RequestId> {
        self.residents.last().map(Request::id)
    }

    /// First resident, in insertion order, whose deadline `now` has passed.
    pub fn find_expired(&self, now: SimTime) -> Option<RequestId> {
        self.residents
            .iter()
            .find(|request| request.is_deadline_exceeded(now))
            .map(Request::id)
    }

    /// Detaches a resident, clearing its deadline and freeing its slot.
    ///
    /// Returns `None` when the request is not buffered here.
    pub fn remove(&mut self, id: RequestId) -> Option<Request> {
        let position = self.residents.iter().position(|request| request.id() == id)?;
        let mut request = self.residents.remove(position);
        if let Some(slot) = request.leave_buffer() {
            self.free_slots.insert(slot);
        }
        Some(request)
    }

    /// Returns true while a free slot remains.
    pub fn has_space(&self) -> bool {
        self.residents.len() < self.capacity
    }

    /// Returns true when no request is queued.
    pub fn is_empty(&self) -> bool {
        self.residents.is_empty()
    }

    /// Number of residents.
    pub fn len(&self) -> usize {
        self.residents.len()
    }

    /// Share of occupied slots. A zero-capacity buffer counts as full.
    pub fn load_factor(&self) -> f64 {
        if self.capacity == 0 {
            return 1.0;
        }
        self.residents.len() as f64 / self.capacity as f64
    }

    /// Residents in insertion order.
    pub fn residents(&self) -> &[Request] {
        &self.residents
    }
}
