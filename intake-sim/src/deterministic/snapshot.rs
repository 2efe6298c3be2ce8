//! Read-only view of engine state for reports and invariant checks.

use intake_core::CargoClass;
use serde::Serialize;

use super::buffer::Buffer;
use super::clock::SimTime;
use super::device::Device;
use super::ids::{DeviceId, RequestId, SourceId};
use super::request::Request;
use super::source::Source;
use super::statistics::SimulationMetrics;

/// State of one source.
#[derive(Debug, Clone, Serialize)]
pub struct SourceSnapshot {
    /// Source identifier
    pub id: SourceId,
    /// Mean arrivals per minute
    pub arrival_rate: f64,
    /// Instant of the next scheduled arrival
    pub next_generation_time: Option<SimTime>,
    /// Requests generated so far
    pub generated: u64,
    /// Requests refused at admission
    pub rejected: u64,
}

impl From<&Source> for SourceSnapshot {
    fn from(source: &Source) -> Self {
        Self {
            id: source.id(),
            arrival_rate: source.arrival_rate(),
            next_generation_time: source.next_generation_time(),
            generated: source.generated_count(),
            rejected: source.rejected_count(),
        }
    }
}

/// Buffer occupancy with a copy of every resident.
#[derive(Debug, Clone, Serialize)]
pub struct BufferSnapshot {
    /// Cargo class queued
    pub class: CargoClass,
    /// Number of slots
    pub capacity: usize,
    /// Share of occupied slots
    pub load_factor: f64,
    /// Residents in insertion order
    pub residents: Vec<Request>,
}

impl From<&Buffer> for BufferSnapshot {
    fn from(buffer: &Buffer) -> Self {
        Self {
            class: buffer.cargo_class(),
            capacity: buffer.capacity(),
            load_factor: buffer.load_factor(),
            residents: buffer.residents().to_vec(),
        }
    }
}

/// State of one device.
#[derive(Debug, Clone, Serialize)]
pub struct DeviceSnapshot {
    /// Device identifier
    pub id: DeviceId,
    /// Cargo class served
    pub class: CargoClass,
    /// Jobs served at once
    pub capacity: usize,
    /// Whether another job fits
    pub is_free: bool,
    /// Next completion instant, `None` when idle
    pub job_end_time: Option<SimTime>,
    /// Earliest-started request in progress
    pub current_request: Option<RequestId>,
    /// Jobs completed so far
    pub processed: u64,
    /// Requests in progress, earliest started first
    pub in_progress: Vec<Request>,
}

impl From<&Device> for DeviceSnapshot {
    fn from(device: &Device) -> Self {
        Self {
            id: device.id(),
            class: device.cargo_class(),
            capacity: device.capacity(),
            is_free: device.is_free(),
            job_end_time: device.job_end_time(),
            current_request: device.current_request_id(),
            processed: device.processed_count(),
            in_progress: device.in_progress().cloned().collect(),
        }
    }
}

/// Aggregate outcome counters at the snapshot instant.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Totals {
    /// Requests generated
    pub arrivals: u64,
    /// Requests served to the end
    pub completions: u64,
    /// Requests refused at admission
    pub rejections: u64,
    /// Queued requests dropped after expiring
    pub evictions: u64,
}

impl From<&SimulationMetrics> for Totals {
    fn from(metrics: &SimulationMetrics) -> Self {
        Self {
            arrivals: metrics.arrivals,
            completions: metrics.completions,
            rejections: metrics.rejections,
            evictions: metrics.evictions,
        }
    }
}

/// Engine state between two steps.
#[derive(Debug, Clone, Serialize)]
pub struct SimulationSnapshot {
    /// Instant the snapshot was taken
    pub now: SimTime,
    /// Source states in configuration order
    pub sources: Vec<SourceSnapshot>,
    /// Buffer states, perishable first
    pub buffers: Vec<BufferSnapshot>,
    /// Device states in id order
    pub devices: Vec<DeviceSnapshot>,
    /// Outcome counters
    pub totals: Totals,
    /// Events still waiting in the calendar
    pub pending_events: usize,
}

impl SimulationSnapshot {
    /// Requests currently queued or in service.
    pub fn in_system(&self) -> usize {
        let queued: usize = self.buffers.iter().map(|buffer| buffer.residents.len()).sum();
        let serving: usize = self.devices.iter().map(|device| device.in_progress.len()).sum();
        queued + serving
    }

    /// Ids of every request held by a buffer or device, duplicates included.
    pub fn held_request_ids(&self) -> Vec<RequestId> {
        let queued = self
            .buffers
            .iter()
            .flat_map(|buffer| buffer.residents.iter().map(Request::id));
        let serving = self
            .devices
            .iter()
            .flat_map(|device| device.in_progress.iter().map(Request::id));
        queued.chain(serving).collect()
    }

    /// Buffer of one cargo class.
    pub fn buffer(&self, class: CargoClass) -> Option<&BufferSnapshot> {
        self.buffers.iter().find(|buffer| buffer.class == class)
    }

    /// Device with the given id.
    pub fn device(&self, id: DeviceId) -> Option<&DeviceSnapshot> {
        self.devices.iter().find(|device| device.id == id)
    }
}
