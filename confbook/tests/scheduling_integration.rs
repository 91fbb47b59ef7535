//! End-to-end allocation of booking requests against persisted state.
//!
//! Each test allocates a request, persists the result the way a caller
//! would and checks how later requests see it.

mod common;

use common::{mcu, now, number_provider, slot, terminal, StoreFixture};
use confbook::config::SchedulerSettings;
use confbook::reservation::{IdSequence, ReservationKind, ReservationTarget};
use confbook::resource::{AliasType, Technology};
use confbook::scheduler::{
    allocate_request, AliasSpecification, EndpointSpecification, ReservationRequest,
    RoomSpecification, SchedulerContext, Specification, UserError,
};
use confbook::store::{ReservationRepository, ResourceStore};
use confbook::{Error, Interval, RequestId, ResourceId};

fn room(participant_count: u32) -> Specification {
    Specification::Room(RoomSpecification {
        participant_count,
        technology_variants: vec![[Technology::H323].into_iter().collect()],
        resource: None,
        aliases: vec![],
    })
}

fn request(id: u64, slot: Interval, specification: Specification) -> ReservationRequest {
    ReservationRequest {
        id: RequestId::from(id),
        slot,
        specification,
        reused_reservation: None,
    }
}

fn value_of(reservation: &confbook::reservation::Reservation) -> Option<String> {
    reservation
        .iter_tree()
        .into_iter()
        .find_map(|node| match node.kind() {
            ReservationKind::Value { value, .. } => Some(value.clone()),
            _ => None,
        })
}

#[test]
fn test_room_capacity_is_shared_across_requests() {
    let mut db = StoreFixture::new().with(mcu(1, 10)).build_database();

    let first = {
        let mut context = SchedulerContext::new(&db, now(), SchedulerSettings::default());
        allocate_request(&mut context, &request(1, slot(12, 2), room(6))).unwrap()
    };
    db.save_reservation(&first.reservation).unwrap();

    let overlapping = {
        let mut context = SchedulerContext::new(&db, now(), SchedulerSettings::default())
            .with_id_sequence(IdSequence::starting_at(100));
        allocate_request(&mut context, &request(2, slot(13, 2), room(6)))
    };
    match overlapping {
        Err(Error::Scheduler(error)) => assert_eq!(
            error.user_error(),
            UserError::RoomCapacityExceeded {
                available: 4,
                maximum: 10
            }
        ),
        other => panic!("expected capacity failure, got {other:?}"),
    }

    let later = {
        let mut context = SchedulerContext::new(&db, now(), SchedulerSettings::default())
            .with_id_sequence(IdSequence::starting_at(100));
        allocate_request(&mut context, &request(2, slot(14, 2), room(6))).unwrap()
    };
    assert_eq!(
        later.reservation.target(),
        Some(ReservationTarget::Room(ResourceId::from(1)))
    );
    assert_eq!(later.reservation.request(), Some(RequestId::from(2)));
}

#[test]
fn test_persisted_values_are_not_handed_out_twice() {
    let mut store = StoreFixture::new()
        .with(number_provider(1, "950{digit:3}"))
        .build();
    let alias = Specification::Alias(AliasSpecification::of_type(AliasType::H323E164));

    let first = {
        let mut context = SchedulerContext::new(&store, now(), SchedulerSettings::default());
        allocate_request(&mut context, &request(1, slot(12, 2), alias.clone())).unwrap()
    };
    store.save_reservation(&first.reservation).unwrap();

    let second = {
        let mut context = SchedulerContext::new(&store, now(), SchedulerSettings::default())
            .with_id_sequence(IdSequence::starting_at(100));
        allocate_request(&mut context, &request(2, slot(13, 2), alias)).unwrap()
    };

    assert_eq!(value_of(&first.reservation).as_deref(), Some("950001"));
    assert_eq!(value_of(&second.reservation).as_deref(), Some("950002"));
}

#[test]
fn test_reallocation_keeps_existing_value() {
    let mut store = StoreFixture::new()
        .with(number_provider(1, "950{digit:3}"))
        .build();
    let value = Specification::Value {
        provider: ResourceId::from(1),
        value: None,
    };

    let first = {
        let mut context = SchedulerContext::new(&store, now(), SchedulerSettings::default());
        allocate_request(&mut context, &request(1, slot(12, 4), value.clone())).unwrap()
    };
    store.save_reservation(&first.reservation).unwrap();

    let again = {
        let mut context = SchedulerContext::new(&store, now(), SchedulerSettings::default())
            .with_id_sequence(IdSequence::starting_at(100));
        allocate_request(&mut context, &request(1, slot(13, 2), value)).unwrap()
    };

    assert_eq!(again.reservation.id(), first.reservation.id());
    assert_eq!(value_of(&again.reservation), value_of(&first.reservation));
}

#[test]
fn test_reused_reservation_must_cover_slot() {
    let mut store = StoreFixture::new().with(mcu(1, 10)).build();
    let first = {
        let mut context = SchedulerContext::new(&store, now(), SchedulerSettings::default());
        allocate_request(&mut context, &request(1, slot(12, 2), room(4))).unwrap()
    };
    store.save_reservation(&first.reservation).unwrap();

    let mut outside = request(2, slot(13, 2), room(4));
    outside.reused_reservation = Some(first.reservation.id());
    let mut context = SchedulerContext::new(&store, now(), SchedulerSettings::default())
        .with_id_sequence(IdSequence::starting_at(100));
    let err = allocate_request(&mut context, &outside).unwrap_err();
    assert!(err.is_scheduling_failure());
}

#[test]
fn test_unknown_reused_reservation() {
    let store = StoreFixture::new().with(mcu(1, 10)).build();
    let mut unknown = request(1, slot(12, 2), room(4));
    unknown.reused_reservation = Some(confbook::ReservationId::from(42));

    let mut context = SchedulerContext::new(&store, now(), SchedulerSettings::default());
    assert!(allocate_request(&mut context, &unknown)
        .unwrap_err()
        .is_not_found());
}

#[test]
fn test_compartment_persisted_in_database() {
    let mut db = StoreFixture::new()
        .with(terminal(1, Technology::H323))
        .with(terminal(2, Technology::H323))
        .build_database();
    let compartment = Specification::Compartment {
        endpoints: vec![
            EndpointSpecification::Resource {
                resource: ResourceId::from(1),
            },
            EndpointSpecification::Resource {
                resource: ResourceId::from(2),
            },
        ],
    };

    let allocation = {
        let mut context = SchedulerContext::new(&db, now(), SchedulerSettings::default());
        allocate_request(&mut context, &request(5, slot(12, 1), compartment)).unwrap()
    };
    db.save_reservation(&allocation.reservation).unwrap();

    let stored = db
        .reservation(allocation.reservation.id())
        .unwrap()
        .unwrap();
    assert_eq!(stored, allocation.reservation);
    assert_eq!(db.reservations_of_request(RequestId::from(5)).unwrap().len(), 1);
    assert!(stored
        .iter_tree()
        .into_iter()
        .all(|node| !matches!(node.kind(), ReservationKind::Room { .. })));
}
