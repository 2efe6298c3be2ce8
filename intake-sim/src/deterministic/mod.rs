//! Deterministic discrete-event engine for the intake hub.
//!
//! A single seeded random stream and a fixed tie-break for simultaneous
//! events make every run reproducible from its seed.

mod buffer;
mod calendar;
mod clock;
mod device;
mod dispatcher;
mod events;
mod ids;
mod invariants;
mod request;
mod simulation;
mod snapshot;
mod source;
mod statistics;

// Re-export core types for public API
pub use buffer::Buffer;
pub use calendar::EventCalendar;
pub use clock::{DeterministicRng, SimTime, SimulationClock};
pub use device::{Device, DeviceGroup};
pub use dispatcher::{Admission, DispatchContext, Dispatcher, Lane};
pub use events::{Event, EventKind, EventSubject};
pub use ids::{DeviceId, RequestId, RequestIdAllocator, SourceId};
pub use invariants::{
    BufferSlotInvariant, CapacityInvariant, ConservationInvariant, ExclusiveOwnershipInvariant,
    Invariant, InvariantViolation, QueuedDeadlineInvariant, default_invariants,
};
pub use request::{Request, RequestStatus};
pub use simulation::{Simulation, SimulationError, SimulationReport};
pub use snapshot::{BufferSnapshot, DeviceSnapshot, SimulationSnapshot, SourceSnapshot, Totals};
pub use source::Source;
pub use statistics::{ClassStatistics, SimulationMetrics, TimeSummary};
