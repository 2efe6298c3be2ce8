//! Admission and eviction policy.
//!
//! The dispatcher owns every buffer and device. Arrivals go to a free device
//! of their class, else to the class buffer, else replace an expired
//! resident, else are rejected. A device that completes a job drains its own
//! class buffer newest first.

use intake_core::{CargoClass, IntakeConfig};
use rand::Rng;
use tracing::debug;

use super::buffer::Buffer;
use super::calendar::EventCalendar;
use super::clock::SimTime;
use super::device::{Device, DeviceGroup};
use super::events::{EventKind, EventSubject};
use super::ids::{DeviceId, RequestId};
use super::request::Request;
use super::statistics::SimulationMetrics;

/// Everything a dispatch decision may touch besides the dispatcher itself.
pub struct DispatchContext<'a, R: ?Sized> {
    /// Instant of the triggering event
    pub now: SimTime,
    /// Calendar receiving completions and notifications
    pub calendar: &'a mut EventCalendar,
    /// Counters updated by every outcome
    pub metrics: &'a mut SimulationMetrics,
    /// Source of service durations
    pub rng: &'a mut R,
}

impl<R: Rng + ?Sized> DispatchContext<'_, R> {
    /// Logs an instantaneous notification at the current time.
    fn notify(&mut self, kind: EventKind, subject: EventSubject, note: String) {
        self.calendar.record(self.now, kind, subject, note);
        self.metrics.record_event(kind);
    }
}

/// Outcome of admitting one arrival.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    /// Service started immediately
    Started {
        /// Device now serving the request
        device: DeviceId,
    },
    /// Queued in a free buffer slot
    Buffered {
        /// Slot taken, counted from 1
        slot: u32,
    },
    /// Queued in the slot of an evicted resident
    Replaced {
        /// Expired resident that made room
        evicted: RequestId,
        /// Slot taken over
        slot: u32,
    },
    /// No device, slot or expired resident was available
    Rejected,
}

/// Buffer and device pool serving one cargo class.
#[derive(Debug, Clone)]
pub struct Lane {
    buffer: Buffer,
    devices: DeviceGroup,
}

impl Lane {
    /// Overflow buffer of this lane.
    pub fn buffer(&self) -> &Buffer {
        &self.buffer
    }

    /// Device pool of this lane.
    pub fn devices(&self) -> &DeviceGroup {
        &self.devices
    }
}

/// Routes arrivals and completions for both cargo classes.
#[derive(Debug, Clone)]
pub struct Dispatcher {
    perishable: Lane,
    regular: Lane,
}

impl Dispatcher {
    /// Builds both lanes. Device ids run across pools, perishable first.
    pub fn new(config: &IntakeConfig) -> Self {
        let lane = |class: CargoClass, first_id: u32| {
            let class_config = config.class(class);
            Lane {
                buffer: Buffer::new(
                    class,
                    class_config.buffer_capacity,
                    class_config.deadline_minutes,
                ),
                devices: DeviceGroup::new(class, first_id, class_config),
            }
        };
        let regular_first_id = 1 + config.perishable.device_count as u32;

        Self {
            perishable: lane(CargoClass::Perishable, 1),
            regular: lane(CargoClass::Regular, regular_first_id),
        }
    }

    /// Lane serving `class`.
    pub fn lane(&self, class: CargoClass) -> &Lane {
        match class {
            CargoClass::Perishable => &self.perishable,
            CargoClass::Regular => &self.regular,
        }
    }

    fn lane_mut(&mut self, class: CargoClass) -> &mut Lane {
        match class {
            CargoClass::Perishable => &mut self.perishable,
            CargoClass::Regular => &mut self.regular,
        }
    }

    /// Buffers in class priority order.
    pub fn buffers(&self) -> impl Iterator<Item = &Buffer> {
        CargoClass::ALL.into_iter().map(|class| &self.lane(class).buffer)
    }

    /// Devices of both pools in id order.
    pub fn devices(&self) -> impl Iterator<Item = &Device> {
        CargoClass::ALL
            .into_iter()
            .flat_map(|class| self.lane(class).devices.devices())
    }

    /// Device with the given id in any lane.
    pub fn device(&self, id: DeviceId) -> Option<&Device> {
        self.devices().find(|device| device.id() == id)
    }

    /// Requests currently queued or in service.
    pub fn in_system(&self) -> usize {
        let queued: usize = self.buffers().map(Buffer::len).sum();
        let serving: usize = self.devices().map(Device::load).sum();
        queued + serving
    }

    /// Places a fresh arrival.
    ///
    /// At most one expired resident is evicted per arrival.
    pub fn admit<R: Rng + ?Sized>(
        &mut self,
        request: Request,
        ctx: &mut DispatchContext<'_, R>,
    ) -> Admission {
        let id = request.id();
        let class = request.cargo_class();
        let lane = self.lane_mut(class);

        let request = match lane.devices.assign(request, ctx.now, &mut *ctx.rng, &mut *ctx.calendar) {
            Ok(device) => {
                debug!(request_id = %id, device_id = %device, time = %ctx.now, "Started service on arrival");
                ctx.notify(
                    EventKind::ServiceStart,
                    EventSubject::Request(id),
                    format!("{id} starts on {device}"),
                );
                return Admission::Started { device };
            }
            Err(request) => request,
        };

        let request = match lane.buffer.try_add(request) {
            Ok(slot) => {
                debug!(request_id = %id, slot, time = %ctx.now, "Buffered arrival");
                ctx.notify(
                    EventKind::BufferAdd,
                    EventSubject::Request(id),
                    format!("{id} queued in {class} slot {slot}"),
                );
                return Admission::Buffered { slot };
            }
            Err(request) => request,
        };

        let Some(expired) = lane.buffer.find_expired(ctx.now) else {
            return reject(request, ctx);
        };

        ctx.notify(
            EventKind::BufferEvict,
            EventSubject::Request(expired),
            format!("{expired} expired, making room for {id}"),
        );
        let evicted = lane.buffer.remove(expired);
        debug_assert!(evicted.is_some(), "{expired} was found expired but is not buffered");
        if let Some(mut evicted) = evicted {
            evicted.evict();
            ctx.metrics.record_eviction(&evicted);
            debug!(request_id = %expired, replaced_by = %id, time = %ctx.now, "Evicted expired request");
        }
        ctx.notify(
            EventKind::BufferRemove,
            EventSubject::Request(expired),
            format!("{expired} removed from {class} buffer"),
        );

        match lane.buffer.try_add(request) {
            Ok(slot) => {
                ctx.notify(
                    EventKind::BufferAdd,
                    EventSubject::Request(id),
                    format!("{id} replaces {expired} in {class} slot {slot}"),
                );
                Admission::Replaced {
                    evicted: expired,
                    slot,
                }
            }
            Err(request) => {
                debug_assert!(false, "{class} buffer still full after evicting {expired}");
                reject(request, ctx)
            }
        }
    }

    /// Finishes the earliest job on `device_id` and refills the device from
    /// its class buffer, newest resident first.
    ///
    /// Returns the completed request, or `None` when the device is unknown
    /// or idle.
    pub fn complete_service<R: Rng + ?Sized>(
        &mut self,
        device_id: DeviceId,
        ctx: &mut DispatchContext<'_, R>,
    ) -> Option<Request> {
        let class = self.device(device_id)?.cargo_class();
        let lane = self.lane_mut(class);

        let done = lane.devices.device_mut(device_id)?.finish_service(ctx.now)?;
        ctx.metrics.record_completion(&done);
        debug!(request_id = %done.id(), device_id = %device_id, time = %ctx.now, "Completed service");

        while lane.devices.device(device_id).is_some_and(Device::is_free) {
            let Some(next) = lane.buffer.select_for_device() else {
                break;
            };
            let Some(request) = lane.buffer.remove(next) else {
                debug_assert!(false, "{next} was selected but is not buffered");
                break;
            };
            let device = lane.devices.device_mut(device_id)?;
            match device.start_service(request, ctx.now, &mut *ctx.rng, &mut *ctx.calendar) {
                Ok(_) => {
                    debug!(request_id = %next, device_id = %device_id, time = %ctx.now, "Started service from buffer");
                    ctx.notify(
                        EventKind::ServiceStart,
                        EventSubject::Request(next),
                        format!("{next} leaves {class} buffer for {device_id}"),
                    );
                }
                Err(request) => {
                    debug_assert!(false, "{device_id} refused {} while free", request.id());
                    break;
                }
            }
        }

        Some(done)
    }
}

fn reject<R: Rng + ?Sized>(mut request: Request, ctx: &mut DispatchContext<'_, R>) -> Admission {
    let id = request.id();
    request.reject();
    ctx.metrics.record_rejection(&request);
    debug!(request_id = %id, source_id = %request.source_id(), time = %ctx.now, "Rejected arrival");
    ctx.notify(
        EventKind::Rejection,
        EventSubject::Request(id),
        format!("{id} rejected, {} buffer full", request.cargo_class()),
    );
    Admission::Rejected
}
