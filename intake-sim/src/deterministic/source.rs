//! Poisson arrival sources.

use intake_core::{CargoClass, ConfigError};
use rand::Rng;
use rand_distr::{Distribution, Exp};
use tracing::trace;

use super::clock::SimTime;
use super::ids::{RequestIdAllocator, SourceId};
use super::request::Request;

/// A logical arrival stream with exponential inter-arrival times.
///
/// Sources own only their counters. Randomness and the request id
/// sequence are lent in by the caller.
#[derive(Debug, Clone)]
pub struct Source {
    id: SourceId,
    arrival_rate: f64,
    inter_arrival: Exp<f64>,
    perishable_share: f64,
    generated: u64,
    rejected: u64,
    next_generation_time: Option<SimTime>,
}

impl Source {
    /// Creates a source producing `arrival_rate` requests per minute on average.
    ///
    /// # Errors
    /// - `ConfigError::InvalidArrivalRate` - Rate is not a positive finite number
    /// - `ConfigError::InvalidPerishableShare` - Share lies outside [0, 1]
    pub fn new(id: SourceId, arrival_rate: f64, perishable_share: f64) -> Result<Self, ConfigError> {
        let invalid_rate = || ConfigError::InvalidArrivalRate {
            index: id.0.saturating_sub(1) as usize,
            rate: arrival_rate,
        };
        if !(arrival_rate > 0.0 && arrival_rate.is_finite()) {
            return Err(invalid_rate());
        }
        if !(0.0..=1.0).contains(&perishable_share) {
            return Err(ConfigError::InvalidPerishableShare {
                share: perishable_share,
            });
        }
        let inter_arrival = Exp::new(arrival_rate).map_err(|_| invalid_rate())?;

        Ok(Self {
            id,
            arrival_rate,
            inter_arrival,
            perishable_share,
            generated: 0,
            rejected: 0,
            next_generation_time: None,
        })
    }

    /// Source identifier.
    pub fn id(&self) -> SourceId {
        self.id
    }

    /// Mean arrivals per minute.
    pub fn arrival_rate(&self) -> f64 {
        self.arrival_rate
    }

    /// Draws the delay in minutes until this source's next arrival.
    pub fn next_inter_arrival<R: Rng + ?Sized>(&self, rng: &mut R) -> f64 {
        self.inter_arrival.sample(rng)
    }

    /// Produces the request arriving at `now`.
    pub fn generate<R: Rng + ?Sized>(
        &mut self,
        now: SimTime,
        ids: &mut RequestIdAllocator,
        rng: &mut R,
    ) -> Request {
        let cargo_class = if rng.random_bool(self.perishable_share) {
            CargoClass::Perishable
        } else {
            CargoClass::Regular
        };
        self.generated += 1;

        let request = Request::new(ids.allocate(), self.id, now, cargo_class);
        trace!(source = %self.id, request = %request.id(), class = %cargo_class, "Generated request");
        request
    }

    /// Counts a rejection of one of this source's requests.
    pub fn record_rejection(&mut self) {
        self.rejected += 1;
    }

    /// Remembers when the next arrival from this source is scheduled.
    pub fn set_next_generation_time(&mut self, time: SimTime) {
        self.next_generation_time = Some(time);
    }

    /// Requests generated so far.
    pub fn generated_count(&self) -> u64 {
        self.generated
    }

    /// Requests refused at admission.
    pub fn rejected_count(&self) -> u64 {
        self.rejected
    }

    /// Instant of the next scheduled arrival.
    pub fn next_generation_time(&self) -> Option<SimTime> {
        self.next_generation_time
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::deterministic::clock::DeterministicRng;
    use crate::deterministic::ids::RequestId;
    use crate::deterministic::request::RequestStatus;

    #[test]
    fn test_rejects_non_positive_rate() {
        assert!(matches!(
            Source::new(SourceId(2), 0.0, 0.1),
            Err(ConfigError::InvalidArrivalRate { index: 1, .. })
        ));
        assert!(Source::new(SourceId(1), f64::INFINITY, 0.1).is_err());
        assert!(Source::new(SourceId(1), 0.5, -0.1).is_err());
    }

    #[test]
    fn test_inter_arrivals_are_positive_with_expected_mean() {
        let source = Source::new(SourceId(1), 0.5, 0.1).unwrap();
        let mut rng = DeterministicRng::from_seed(7);

        let samples: Vec<f64> = (0..20_000).map(|_| source.next_inter_arrival(&mut rng)).collect();
        assert!(samples.iter().all(|&delay| delay >= 0.0));

        let mean = samples.iter().sum::<f64>() / samples.len() as f64;
        assert!((mean - 2.0).abs() < 0.1, "mean inter-arrival {mean}");
    }

    #[test]
    fn test_generate_uses_shared_id_sequence() {
        let mut first = Source::new(SourceId(1), 0.5, 0.1).unwrap();
        let mut second = Source::new(SourceId(2), 0.4, 0.1).unwrap();
        let mut ids = RequestIdAllocator::new();
        let mut rng = DeterministicRng::from_seed(3);
        let now = SimTime::from_minutes(4.0);

        let a = first.generate(now, &mut ids, &mut rng);
        let b = second.generate(now, &mut ids, &mut rng);
        let c = first.generate(now, &mut ids, &mut rng);

        assert_eq!([a.id(), b.id(), c.id()], [RequestId(1), RequestId(2), RequestId(3)]);
        assert_eq!(a.status(), RequestStatus::Arrived);
        assert_eq!(a.arrival_time(), now);
        assert_eq!(b.source_id(), SourceId(2));
        assert_eq!(first.generated_count(), 2);
        assert_eq!(second.generated_count(), 1);
    }

    #[test]
    fn test_class_split_follows_share() {
        let mut source = Source::new(SourceId(1), 1.0, 0.1).unwrap();
        let mut ids = RequestIdAllocator::new();
        let mut rng = DeterministicRng::from_seed(11);

        let perishable = (0..10_000)
            .map(|_| source.generate(SimTime::ZERO, &mut ids, &mut rng))
            .filter(|request| request.cargo_class() == CargoClass::Perishable)
            .count();
        assert!((800..1200).contains(&perishable), "perishable count {perishable}");
    }

    #[test]
    fn test_extreme_shares() {
        let mut ids = RequestIdAllocator::new();
        let mut rng = DeterministicRng::from_seed(5);

        let mut all_regular = Source::new(SourceId(1), 1.0, 0.0).unwrap();
        let mut all_perishable = Source::new(SourceId(2), 1.0, 1.0).unwrap();
        for _ in 0..50 {
            let regular = all_regular.generate(SimTime::ZERO, &mut ids, &mut rng);
            let perishable = all_perishable.generate(SimTime::ZERO, &mut ids, &mut rng);
            assert_eq!(regular.cargo_class(), CargoClass::Regular);
            assert_eq!(perishable.cargo_class(), CargoClass::Perishable);
        }
    }

    #[test]
    fn test_counters() {
        let mut source = Source::new(SourceId(1), 1.0, 0.1).unwrap();
        assert!(source.next_generation_time().is_none());

        source.set_next_generation_time(SimTime::from_minutes(3.0));
        source.record_rejection();

        assert_eq!(source.next_generation_time(), Some(SimTime::from_minutes(3.0)));
        assert_eq!(source.rejected_count(), 1);
    }
}
