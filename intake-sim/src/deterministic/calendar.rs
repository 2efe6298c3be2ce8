//! Event calendar: pending schedule plus the log of what already happened.

use std::collections::BinaryHeap;

use tracing::trace;

use super::clock::SimTime;
use super::events::{Event, EventKind, EventSubject};

/// Time-ordered schedule of future events.
///
/// Pending events are extracted by `(time, kind rank, sequence)`. Every
/// extracted event, and every notification recorded while processing it,
/// is appended to the occurred log.
#[derive(Debug, Default)]
pub struct EventCalendar {
    pending: BinaryHeap<Event>,
    occurred: Vec<Event>,
    next_seq: u64,
    steps: u64,
}

impl EventCalendar {
    /// Creates an empty calendar.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an event to the pending set. Events sharing a time are kept.
    pub fn schedule(
        &mut self,
        time: SimTime,
        kind: EventKind,
        subject: EventSubject,
        note: impl Into<String>,
    ) {
        let event = Event::new(self.allocate_seq(), time, kind, subject, note);
        trace!(time = %event.time, kind = kind.as_str(), subject = %subject, "Scheduled event");
        self.pending.push(event);
    }

    /// Removes and returns the earliest pending event.
    ///
    /// The event is also appended to the occurred log.
    pub fn next(&mut self) -> Option<Event> {
        let event = self.pending.pop()?;
        self.steps += 1;
        self.occurred.push(event.clone());
        Some(event)
    }

    /// Time of the earliest pending event.
    pub fn peek_time(&self) -> Option<SimTime> {
        self.pending.peek().map(|event| event.time)
    }

    /// Appends an instantaneous notification to the occurred log.
    pub fn record(
        &mut self,
        time: SimTime,
        kind: EventKind,
        subject: EventSubject,
        note: impl Into<String>,
    ) {
        let event = Event::new(self.allocate_seq(), time, kind, subject, note);
        self.occurred.push(event);
    }

    /// Returns true when nothing is pending.
    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Number of pending events.
    pub fn len(&self) -> usize {
        self.pending.len()
    }

    /// Number of events extracted so far.
    pub fn step_count(&self) -> u64 {
        self.steps
    }

    /// Pending events in extraction order.
    pub fn pending_events(&self) -> Vec<Event> {
        let mut events: Vec<Event> = self.pending.iter().cloned().collect();
        events.sort_by_key(Event::order_key);
        events
    }

    /// Everything extracted or recorded so far, oldest first.
    pub fn occurred(&self) -> &[Event] {
        &self.occurred
    }

    fn allocate_seq(&mut self) -> u64 {
        let seq = self.next_seq;
        self.next_seq += 1;
        seq
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::deterministic::ids::{DeviceId, RequestId, SourceId};

    fn at(minutes: f64) -> SimTime {
        SimTime::from_minutes(minutes)
    }

    #[test]
    fn test_extracts_in_time_order() {
        let mut calendar = EventCalendar::new();
        calendar.schedule(at(5.0), EventKind::Arrival, EventSubject::Source(SourceId(1)), "");
        calendar.schedule(at(1.0), EventKind::Arrival, EventSubject::Source(SourceId(2)), "");
        calendar.schedule(at(3.0), EventKind::ServiceComplete, EventSubject::Device(DeviceId(1)), "");

        let times: Vec<f64> = std::iter::from_fn(|| calendar.next())
            .map(|event| event.time.minutes())
            .collect();
        assert_eq!(times, vec![1.0, 3.0, 5.0]);
        assert!(calendar.is_empty());
        assert_eq!(calendar.step_count(), 3);
    }

    #[test]
    fn test_simultaneous_events_follow_rank_not_insertion() {
        let mut calendar = EventCalendar::new();
        calendar.schedule(at(2.0), EventKind::ServiceComplete, EventSubject::Device(DeviceId(1)), "");
        calendar.schedule(at(2.0), EventKind::Arrival, EventSubject::Source(SourceId(1)), "");

        assert_eq!(calendar.next().unwrap().kind, EventKind::Arrival);
        assert_eq!(calendar.next().unwrap().kind, EventKind::ServiceComplete);
    }

    #[test]
    fn test_equal_rank_uses_sequence() {
        let mut calendar = EventCalendar::new();
        calendar.schedule(at(2.0), EventKind::Arrival, EventSubject::Source(SourceId(3)), "");
        calendar.schedule(at(2.0), EventKind::Arrival, EventSubject::Source(SourceId(1)), "");

        assert_eq!(calendar.next().unwrap().subject, EventSubject::Source(SourceId(3)));
        assert_eq!(calendar.next().unwrap().subject, EventSubject::Source(SourceId(1)));
    }

    #[test]
    fn test_empty_calendar_returns_none() {
        let mut calendar = EventCalendar::new();
        assert!(calendar.next().is_none());
        assert_eq!(calendar.step_count(), 0);
        assert!(calendar.peek_time().is_none());
    }

    #[test]
    fn test_occurred_log_keeps_extractions_and_notifications() {
        let mut calendar = EventCalendar::new();
        calendar.schedule(at(1.0), EventKind::Arrival, EventSubject::Source(SourceId(1)), "first");
        let arrival = calendar.next().unwrap();
        calendar.record(
            arrival.time,
            EventKind::BufferAdd,
            EventSubject::Request(RequestId(1)),
            "queued",
        );

        let kinds: Vec<EventKind> = calendar.occurred().iter().map(|event| event.kind).collect();
        assert_eq!(kinds, vec![EventKind::Arrival, EventKind::BufferAdd]);
        assert!(calendar.is_empty());
    }

    #[test]
    fn test_pending_events_listing_matches_extraction() {
        let mut calendar = EventCalendar::new();
        calendar.schedule(at(4.0), EventKind::Arrival, EventSubject::Source(SourceId(1)), "");
        calendar.schedule(at(4.0), EventKind::ServiceComplete, EventSubject::Device(DeviceId(2)), "");
        calendar.schedule(at(0.5), EventKind::Arrival, EventSubject::Source(SourceId(2)), "");

        let listed: Vec<u64> = calendar.pending_events().iter().map(|e| e.seq).collect();
        let extracted: Vec<u64> = std::iter::from_fn(|| calendar.next()).map(|e| e.seq).collect();
        assert_eq!(listed, extracted);
        assert_eq!(calendar.len(), 0);
    }
}
