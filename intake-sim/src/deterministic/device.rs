//! Service devices and the same-priority pools they form.

use std::cmp::Reverse;
use std::collections::{BinaryHeap, VecDeque};

use intake_core::{CargoClass, ClassConfig};
use rand::Rng;
use tracing::trace;

use super::calendar::EventCalendar;
use super::clock::SimTime;
use super::events::{EventKind, EventSubject};
use super::ids::{DeviceId, RequestId};
use super::request::Request;

/// Device serving up to `capacity` requests of one cargo class at once.
#[derive(Debug, Clone)]
pub struct Device {
    id: DeviceId,
    class: CargoClass,
    capacity: usize,
    min_service: f64,
    max_service: f64,
    in_progress: VecDeque<Request>,
    /// Scheduled completion instants, earliest on top
    completions: BinaryHeap<Reverse<SimTime>>,
    processed: u64,
}

impl Device {
    /// Creates an idle device with a uniform service time in `[min_service, max_service]`.
    pub fn new(
        id: DeviceId,
        class: CargoClass,
        capacity: usize,
        min_service: f64,
        max_service: f64,
    ) -> Self {
        Self {
            id,
            class,
            capacity,
            min_service,
            max_service,
            in_progress: VecDeque::with_capacity(capacity),
            completions: BinaryHeap::with_capacity(capacity),
            processed: 0,
        }
    }

    /// Device identifier.
    pub fn id(&self) -> DeviceId {
        self.id
    }

    /// Cargo class this device serves.
    pub fn cargo_class(&self) -> CargoClass {
        self.class
    }

    /// Priority of the pool this device belongs to (1 is highest).
    pub fn priority(&self) -> u8 {
        self.class.priority()
    }

    /// Jobs served at once.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Returns true while another request fits.
    pub fn is_free(&self) -> bool {
        self.in_progress.len() < self.capacity
    }

    /// Jobs currently in progress.
    pub fn load(&self) -> usize {
        self.in_progress.len()
    }

    /// Starts serving `request` at `now` and schedules its completion.
    ///
    /// A fresh service time is drawn on every call. A full device hands the
    /// request back untouched. Returns the completion instant.
    pub fn start_service<R: Rng + ?Sized>(
        &mut self,
        mut request: Request,
        now: SimTime,
        rng: &mut R,
        calendar: &mut EventCalendar,
    ) -> Result<SimTime, Request> {
        if !self.is_free() {
            return Err(request);
        }

        let duration = rng.random_range(self.min_service..=self.max_service);
        let ends_at = now + duration;

        request.start_service(now);
        calendar.schedule(
            ends_at,
            EventKind::ServiceComplete,
            EventSubject::Device(self.id),
            format!("{} finishes on {}", request.id(), self.id),
        );
        trace!(device = %self.id, request = %request.id(), duration, %ends_at, "Service started");

        self.in_progress.push_back(request);
        self.completions.push(Reverse(ends_at));
        Ok(ends_at)
    }

    /// Completes the earliest-started job and retires the earliest
    /// scheduled completion instant.
    ///
    /// Jobs leave in start order while completion events fire in time order,
    /// so the two are tracked apart. Returns `None` when the device is idle.
    pub fn finish_service(&mut self, now: SimTime) -> Option<Request> {
        let mut request = self.in_progress.pop_front()?;
        self.completions.pop();
        request.complete(now);
        self.processed += 1;
        Some(request)
    }

    /// Next scheduled completion instant, `None` when idle.
    pub fn job_end_time(&self) -> Option<SimTime> {
        self.completions.peek().map(|Reverse(time)| *time)
    }

    /// Request started first among those in progress.
    pub fn current_request_id(&self) -> Option<RequestId> {
        self.in_progress.front().map(Request::id)
    }

    /// Requests in progress, earliest started first.
    pub fn in_progress(&self) -> impl Iterator<Item = &Request> {
        self.in_progress.iter()
    }

    /// Jobs completed so far.
    pub fn processed_count(&self) -> u64 {
        self.processed
    }
}

/// Fixed pool of devices serving one cargo class.
#[derive(Debug, Clone)]
pub struct DeviceGroup {
    class: CargoClass,
    devices: Vec<Device>,
}

impl DeviceGroup {
    /// Creates `config.device_count` devices numbered from `first_id`.
    pub fn new(class: CargoClass, first_id: u32, config: &ClassConfig) -> Self {
        let devices = (0..config.device_count as u32)
            .map(|offset| {
                Device::new(
                    DeviceId(first_id + offset),
                    class,
                    config.device_capacity,
                    config.min_service_minutes,
                    config.max_service_minutes,
                )
            })
            .collect();
        Self { class, devices }
    }

    /// Cargo class of every device in the pool.
    pub fn cargo_class(&self) -> CargoClass {
        self.class
    }

    /// Devices in id order.
    pub fn devices(&self) -> &[Device] {
        &self.devices
    }

    /// Looks up a device in this pool.
    pub fn device(&self, id: DeviceId) -> Option<&Device> {
        self.devices.iter().find(|device| device.id() == id)
    }

    /// Mutable lookup by id.
    pub fn device_mut(&mut self, id: DeviceId) -> Option<&mut Device> {
        self.devices.iter_mut().find(|device| device.id() == id)
    }

    /// Free device with the fewest jobs in progress, earliest in the pool on ties.
    pub fn least_loaded_free(&self) -> Option<DeviceId> {
        self.devices
            .iter()
            .filter(|device| device.is_free())
            .min_by_key(|device| device.load())
            .map(Device::id)
    }

    /// Starts `request` on the least-loaded free device.
    ///
    /// Hands the request back when every device is full.
    pub fn assign<R: Rng + ?Sized>(
        &mut self,
        request: Request,
        now: SimTime,
        rng: &mut R,
        calendar: &mut EventCalendar,
    ) -> Result<DeviceId, Request> {
        let Some(device) = self
            .least_loaded_free()
            .and_then(|id| self.devices.iter_mut().find(|device| device.id() == id))
        else {
            return Err(request);
        };
        let id = device.id();
        device.start_service(request, now, rng, calendar)?;
        Ok(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::deterministic::clock::DeterministicRng;
    use crate::deterministic::ids::SourceId;
    use crate::deterministic::request::RequestStatus;

    fn request(id: u64) -> Request {
        Request::new(RequestId(id), SourceId(1), SimTime::ZERO, CargoClass::Perishable)
    }

    fn class_config(device_count: usize, device_capacity: usize) -> ClassConfig {
        ClassConfig {
            device_count,
            device_capacity,
            ..ClassConfig::perishable()
        }
    }

    #[test]
    fn test_start_service_schedules_completion_in_range() {
        let mut device = Device::new(DeviceId(1), CargoClass::Perishable, 1, 5.0, 10.0);
        let mut rng = DeterministicRng::from_seed(1);
        let mut calendar = EventCalendar::new();
        let now = SimTime::from_minutes(2.0);

        let ends_at = device.start_service(request(1), now, &mut rng, &mut calendar).unwrap();
        assert!(ends_at >= now + 5.0 && ends_at <= now + 10.0);
        assert_eq!(device.job_end_time(), Some(ends_at));
        assert_eq!(device.current_request_id(), Some(RequestId(1)));
        assert!(!device.is_free());

        let scheduled = calendar.next().unwrap();
        assert_eq!(scheduled.kind, EventKind::ServiceComplete);
        assert_eq!(scheduled.subject, EventSubject::Device(DeviceId(1)));
        assert_eq!(scheduled.time, ends_at);

        let running = device.in_progress().next().unwrap();
        assert_eq!(running.status(), RequestStatus::InService);
        assert_eq!(running.service_start_time(), Some(now));
    }

    #[test]
    fn test_busy_device_hands_request_back() {
        let mut device = Device::new(DeviceId(1), CargoClass::Perishable, 1, 5.0, 5.0);
        let mut rng = DeterministicRng::from_seed(1);
        let mut calendar = EventCalendar::new();

        device.start_service(request(1), SimTime::ZERO, &mut rng, &mut calendar).unwrap();
        let refused = device
            .start_service(request(2), SimTime::ZERO, &mut rng, &mut calendar)
            .unwrap_err();

        assert_eq!(refused.status(), RequestStatus::Arrived);
        assert_eq!(calendar.len(), 1);
    }

    #[test]
    fn test_finish_service_completes_earliest_job() {
        let mut device = Device::new(DeviceId(1), CargoClass::Perishable, 2, 5.0, 5.0);
        let mut rng = DeterministicRng::from_seed(1);
        let mut calendar = EventCalendar::new();

        device.start_service(request(1), SimTime::ZERO, &mut rng, &mut calendar).unwrap();
        device
            .start_service(request(2), SimTime::from_minutes(1.0), &mut rng, &mut calendar)
            .unwrap();

        let done = device.finish_service(SimTime::from_minutes(5.0)).unwrap();
        assert_eq!(done.id(), RequestId(1));
        assert_eq!(done.status(), RequestStatus::Completed);
        assert_eq!(done.service_end_time(), Some(SimTime::from_minutes(5.0)));
        assert_eq!(device.processed_count(), 1);
        assert_eq!(device.job_end_time(), Some(SimTime::from_minutes(6.0)));

        device.finish_service(SimTime::from_minutes(6.0)).unwrap();
        assert!(device.job_end_time().is_none());
        assert!(device.finish_service(SimTime::from_minutes(7.0)).is_none());
        assert_eq!(device.processed_count(), 2);
    }

    #[test]
    fn test_job_end_time_follows_shorter_later_job() {
        // Find a seed where the second job draws a shorter service than the first.
        let (mut device, mut calendar, first_end, second_end) = (0..64)
            .find_map(|seed| {
                let mut device = Device::new(DeviceId(1), CargoClass::Perishable, 2, 1.0, 10.0);
                let mut rng = DeterministicRng::from_seed(seed);
                let mut calendar = EventCalendar::new();
                let first = device
                    .start_service(request(1), SimTime::ZERO, &mut rng, &mut calendar)
                    .ok()?;
                let second = device
                    .start_service(request(2), SimTime::ZERO, &mut rng, &mut calendar)
                    .ok()?;
                (second < first).then_some((device, calendar, first, second))
            })
            .unwrap();

        assert_eq!(device.job_end_time(), Some(second_end));

        let fired = calendar.next().unwrap();
        assert_eq!(fired.time, second_end);
        device.finish_service(fired.time).unwrap();
        assert_eq!(device.job_end_time(), Some(first_end));
        assert!(device.job_end_time().unwrap() > fired.time);

        let fired = calendar.next().unwrap();
        assert_eq!(fired.time, first_end);
        device.finish_service(fired.time).unwrap();
        assert!(device.job_end_time().is_none());
    }

    #[test]
    fn test_group_numbers_devices_from_first_id() {
        let group = DeviceGroup::new(CargoClass::Regular, 3, &class_config(2, 1));
        let ids: Vec<DeviceId> = group.devices().iter().map(Device::id).collect();
        assert_eq!(ids, vec![DeviceId(3), DeviceId(4)]);
        assert!(group.device(DeviceId(1)).is_none());
    }

    #[test]
    fn test_group_assigns_least_loaded() {
        let mut group = DeviceGroup::new(CargoClass::Perishable, 1, &class_config(2, 2));
        let mut rng = DeterministicRng::from_seed(9);
        let mut calendar = EventCalendar::new();

        let first = group.assign(request(1), SimTime::ZERO, &mut rng, &mut calendar).unwrap();
        let second = group.assign(request(2), SimTime::ZERO, &mut rng, &mut calendar).unwrap();
        let third = group.assign(request(3), SimTime::ZERO, &mut rng, &mut calendar).unwrap();
        let fourth = group.assign(request(4), SimTime::ZERO, &mut rng, &mut calendar).unwrap();

        // First-free would stack both early requests on D1.
        assert_eq!([first, second, third, fourth], [DeviceId(1), DeviceId(2), DeviceId(1), DeviceId(2)]);

        let refused = group.assign(request(5), SimTime::ZERO, &mut rng, &mut calendar);
        assert!(refused.is_err());
        assert!(group.least_loaded_free().is_none());
    }
}
