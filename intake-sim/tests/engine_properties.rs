//! Property tests over random seeds and hub layouts.

use intake_core::IntakeConfig;
use intake_sim::deterministic::{EventCalendar, EventKind, EventSubject, SourceId};
use intake_sim::{SimTime, Simulation};
use proptest::prelude::*;

const KINDS: [EventKind; 7] = [
    EventKind::Arrival,
    EventKind::ServiceStart,
    EventKind::ServiceComplete,
    EventKind::BufferAdd,
    EventKind::BufferEvict,
    EventKind::BufferRemove,
    EventKind::Rejection,
];

fn layout() -> impl Strategy<Value = IntakeConfig> {
    (
        any::<u64>(),
        0usize..4,
        0usize..4,
        1usize..3,
        1usize..3,
        0.2f64..2.0,
    )
        .prop_map(|(seed, perishable_slots, regular_slots, devices, device_capacity, rate)| {
            let mut config = IntakeConfig::single_lane(rate);
            config.simulation.deterministic_seed = Some(seed);
            config.simulation.horizon_minutes = 120.0;
            config.simulation.perishable_share = 0.3;
            config.perishable.buffer_capacity = perishable_slots;
            config.regular.buffer_capacity = regular_slots;
            for class in [&mut config.perishable, &mut config.regular] {
                class.device_count = devices;
                class.device_capacity = device_capacity;
            }
            config
        })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn calendar_extracts_by_time_then_rank(
        entries in prop::collection::vec((0u32..20, 0usize..KINDS.len()), 1..60)
    ) {
        let mut calendar = EventCalendar::new();
        for &(tick, kind) in &entries {
            calendar.schedule(
                SimTime::from_minutes(f64::from(tick) * 0.5),
                KINDS[kind],
                EventSubject::Source(SourceId(1)),
                "",
            );
        }

        let extracted: Vec<_> = std::iter::from_fn(|| calendar.next()).collect();
        prop_assert_eq!(extracted.len(), entries.len());
        for pair in extracted.windows(2) {
            let (first, second) = (&pair[0], &pair[1]);
            prop_assert!(first.time <= second.time);
            if first.time == second.time {
                prop_assert!(first.kind.rank() <= second.kind.rank());
                if first.kind == second.kind {
                    prop_assert!(first.seq < second.seq);
                }
            }
        }
    }

    #[test]
    fn capacity_and_conservation_hold_every_step(config in layout()) {
        let mut sim = Simulation::new(config).unwrap();
        sim.clear_invariants();

        while sim.step().unwrap().is_some() {
            let snapshot = sim.snapshot();
            for buffer in &snapshot.buffers {
                prop_assert!(buffer.residents.len() <= buffer.capacity);
                prop_assert!(buffer.residents.iter().all(|r| r.deadline().is_some()));
            }
            for device in &snapshot.devices {
                prop_assert!(device.in_progress.len() <= device.capacity);
            }

            let mut held = snapshot.held_request_ids();
            let count = held.len();
            held.sort();
            held.dedup();
            prop_assert_eq!(held.len(), count);

            let totals = snapshot.totals;
            prop_assert_eq!(
                totals.arrivals,
                totals.completions + totals.rejections + totals.evictions + count as u64
            );
        }
    }

    #[test]
    fn same_seed_same_report(config in layout()) {
        let first = Simulation::new(config.clone()).unwrap().run().unwrap();
        let second = Simulation::new(config).unwrap().run().unwrap();

        prop_assert_eq!(first.event_count, second.event_count);
        prop_assert_eq!(first.final_snapshot.totals, second.final_snapshot.totals);
        prop_assert_eq!(first.end_time, second.end_time);
        prop_assert!(first.success);
    }
}
