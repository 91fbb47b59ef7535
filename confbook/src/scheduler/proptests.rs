//! Property-based tests for savepoints and license counting.

use std::collections::BTreeSet;

use super::{license_count_peak, SchedulerContextState};
use crate::reservation::{Reservation, ReservationId, ReservationKind};
use crate::{Interval, ResourceId};
use chrono::{Duration, TimeZone, Utc};
use proptest::prelude::*;

fn hour_slot(from: u32, hours: i64) -> Interval {
    let start = Utc.with_ymd_and_hms(2013, 1, 1, 0, 0, 0).unwrap() + Duration::hours(i64::from(from));
    Interval::from_duration(start, Duration::hours(hours)).unwrap()
}

fn resource(id: u64) -> Reservation {
    Reservation::new(
        ReservationId::from(id),
        hour_slot(10, 1),
        ReservationKind::Resource {
            resource: ResourceId::from(id),
        },
    )
}

#[derive(Debug, Clone)]
enum Operation {
    Reference(u64),
    Unreference(u64),
    Allocate(u64),
    Deallocate(u64),
}

fn operation() -> impl Strategy<Value = Operation> {
    prop_oneof![
        (1u64..8).prop_map(Operation::Reference),
        (1u64..8).prop_map(Operation::Unreference),
        (1u64..8).prop_map(Operation::Allocate),
        (1u64..8).prop_map(Operation::Deallocate),
    ]
}

fn apply(state: &mut SchedulerContextState, operation: &Operation) {
    match operation {
        Operation::Reference(id) => {
            state.add_referenced_resource(ResourceId::from(*id));
        }
        Operation::Unreference(id) => {
            state.remove_referenced_resource(ResourceId::from(*id));
        }
        Operation::Allocate(id) => {
            state.add_allocated_reservation(resource(*id));
        }
        Operation::Deallocate(id) => {
            state.remove_allocated_reservation(ReservationId::from(*id));
        }
    }
}

fn snapshot(state: &SchedulerContextState) -> (BTreeSet<ResourceId>, BTreeSet<ReservationId>) {
    (
        state.referenced_resources().clone(),
        state.allocated_reservation_ids(),
    )
}

proptest! {
    #![proptest_config(ProptestConfig {
        cases: 256,
        .. ProptestConfig::default()
    })]

    // Reverting a savepoint restores exactly the state it was created in
    #[test]
    fn revert_restores_snapshot(
        before in prop::collection::vec(operation(), 0..20),
        after in prop::collection::vec(operation(), 0..20),
        nested in prop::collection::vec(operation(), 0..20),
    ) {
        let mut state = SchedulerContextState::new();
        for operation in &before {
            apply(&mut state, operation);
        }
        let expected = snapshot(&state);

        let savepoint = state.create_savepoint();
        for operation in &after {
            apply(&mut state, operation);
        }
        state.create_savepoint();
        for operation in &nested {
            apply(&mut state, operation);
        }
        state.revert(savepoint).unwrap();

        prop_assert_eq!(snapshot(&state), expected);
        prop_assert_eq!(state.current_savepoint(), None);
    }

    // Releasing an inner savepoint keeps its changes revertable by the outer one
    #[test]
    fn release_then_revert_outer(
        outer in prop::collection::vec(operation(), 0..20),
        inner in prop::collection::vec(operation(), 0..20),
    ) {
        let mut state = SchedulerContextState::new();
        let expected = snapshot(&state);

        let outer_savepoint = state.create_savepoint();
        for operation in &outer {
            apply(&mut state, operation);
        }
        let inner_savepoint = state.create_savepoint();
        for operation in &inner {
            apply(&mut state, operation);
        }
        let released = snapshot(&state);
        state.release(inner_savepoint).unwrap();
        prop_assert_eq!(snapshot(&state), released);

        state.revert(outer_savepoint).unwrap();
        prop_assert_eq!(snapshot(&state), expected);
    }

    // The peak never exceeds the sum of all license counts
    #[test]
    fn license_peak_bounded_by_sum(rooms in prop::collection::vec((0u32..20, 1i64..6, 1u32..10), 0..12)) {
        let reservations: Vec<Reservation> = rooms
            .iter()
            .enumerate()
            .map(|(index, (from, hours, count))| {
                Reservation::new(
                    ReservationId::from(index as u64 + 1),
                    hour_slot(*from, *hours),
                    ReservationKind::Room {
                        resource: ResourceId::from(1),
                        license_count: *count,
                        executable: None,
                    },
                )
            })
            .collect();
        let slot = hour_slot(0, 30);
        let total: u32 = rooms.iter().map(|(_, _, count)| count).sum();
        let largest = rooms.iter().map(|(_, _, count)| *count).max().unwrap_or(0);

        let peak = license_count_peak(&slot, &reservations);
        prop_assert!(peak <= total);
        prop_assert!(peak >= largest);
    }
}
