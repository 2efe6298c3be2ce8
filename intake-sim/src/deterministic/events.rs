//! Event model and ordering for the intake calendar.

use std::cmp::Ordering;
use std::fmt;

use serde::Serialize;

use super::clock::SimTime;
use super::ids::{DeviceId, RequestId, SourceId};

/// Kinds of events the engine schedules or records.
///
/// Only `Arrival` and `ServiceComplete` are ever pending in the calendar;
/// the rest are instantaneous notifications appended to the occurred log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum EventKind {
    /// A source delivers its next request
    Arrival,
    /// A request starts service on a device
    ServiceStart,
    /// A device finishes its earliest job
    ServiceComplete,
    /// A request is placed in a buffer slot
    BufferAdd,
    /// An expired resident is chosen for eviction
    BufferEvict,
    /// The evicted resident's slot is released
    BufferRemove,
    /// An arrival is refused
    Rejection,
}

impl EventKind {
    /// Tie-break rank for events at the same instant, lower first.
    ///
    /// The table is fixed and independent of declaration order.
    pub fn rank(self) -> u8 {
        match self {
            EventKind::Arrival => 0,
            EventKind::BufferEvict => 1,
            EventKind::ServiceComplete => 2,
            EventKind::BufferRemove => 3,
            EventKind::Rejection => 4,
            EventKind::ServiceStart => 5,
            EventKind::BufferAdd => 6,
        }
    }

    /// Returns string representation of event kind for metrics.
    pub fn as_str(self) -> &'static str {
        match self {
            EventKind::Arrival => "Arrival",
            EventKind::ServiceStart => "ServiceStart",
            EventKind::ServiceComplete => "ServiceComplete",
            EventKind::BufferAdd => "BufferAdd",
            EventKind::BufferEvict => "BufferEvict",
            EventKind::BufferRemove => "BufferRemove",
            EventKind::Rejection => "Rejection",
        }
    }
}

/// Entity an event concerns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum EventSubject {
    /// Arrival from a source
    Source(SourceId),
    /// Completion on a device
    Device(DeviceId),
    /// Notification about one request
    Request(RequestId),
}

impl fmt::Display for EventSubject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EventSubject::Source(id) => write!(f, "{id}"),
            EventSubject::Device(id) => write!(f, "{id}"),
            EventSubject::Request(id) => write!(f, "{id}"),
        }
    }
}

/// Calendar entry with time, kind rank, and sequence ordering.
#[derive(Debug, Clone, Serialize)]
pub struct Event {
    /// Sequence number assigned by the calendar
    pub seq: u64,
    /// Simulated instant of the event
    pub time: SimTime,
    /// What happened
    pub kind: EventKind,
    /// Entity it happened to
    pub subject: EventSubject,
    /// Free-text annotation for reports
    pub note: String,
}

impl Event {
    /// Creates new event.
    pub fn new(
        seq: u64,
        time: SimTime,
        kind: EventKind,
        subject: EventSubject,
        note: impl Into<String>,
    ) -> Self {
        Self {
            seq,
            time,
            kind,
            subject,
            note: note.into(),
        }
    }

    /// Extraction order: time, then kind rank, then sequence number.
    pub fn order_key(&self) -> (SimTime, u8, u64) {
        (self.time, self.kind.rank(), self.seq)
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "t={} {} [{}] {}",
            self.time,
            self.kind.as_str(),
            self.subject,
            self.note
        )
    }
}

impl Eq for Event {}

impl PartialEq for Event {
    fn eq(&self, other: &Self) -> bool {
        self.seq == other.seq
    }
}

impl Ord for Event {
    fn cmp(&self, other: &Self) -> Ordering {
        // Reversed for min-heap behavior
        other.order_key().cmp(&self.order_key())
    }
}

impl PartialOrd for Event {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event(seq: u64, time: f64, kind: EventKind) -> Event {
        Event::new(
            seq,
            SimTime::from_minutes(time),
            kind,
            EventSubject::Source(SourceId(1)),
            "",
        )
    }

    #[test]
    fn test_event_timestamp_ordering() {
        let early = event(2, 1.0, EventKind::ServiceComplete);
        let late = event(1, 2.0, EventKind::Arrival);

        // Ord is reversed for min-heap behavior, so early > late
        assert!(early > late);
    }

    #[test]
    fn test_event_rank_breaks_ties() {
        let arrival = event(9, 5.0, EventKind::Arrival);
        let completion = event(1, 5.0, EventKind::ServiceComplete);

        assert!(arrival > completion);
    }

    #[test]
    fn test_ranks_are_distinct() {
        let kinds = [
            EventKind::Arrival,
            EventKind::ServiceStart,
            EventKind::ServiceComplete,
            EventKind::BufferAdd,
            EventKind::BufferEvict,
            EventKind::BufferRemove,
            EventKind::Rejection,
        ];
        let mut ranks: Vec<u8> = kinds.iter().map(|kind| kind.rank()).collect();
        ranks.sort_unstable();
        ranks.dedup();
        assert_eq!(ranks.len(), kinds.len());
    }

    #[test]
    fn test_event_display() {
        let event = Event::new(
            0,
            SimTime::from_minutes(12.0),
            EventKind::Rejection,
            EventSubject::Request(RequestId(7)),
            "buffer full",
        );
        assert_eq!(event.to_string(), "t=12.00 Rejection [R7] buffer full");
    }
}
