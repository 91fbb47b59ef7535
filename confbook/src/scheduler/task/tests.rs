use super::*;
use crate::config::SchedulerSettings;
use crate::reservation::{ReservationId, ReservationTarget};
use crate::resource::{
    AliasProviderCapability, AliasType, Capability, Resource, ResourceId, Technology,
};
use crate::scheduler::report::UserError;
use crate::scheduler::specification::{
    AliasSpecification, EndpointSpecification, RoomSpecification,
};
use crate::store::{InMemoryStore, ReservationRepository};
use chrono::{DateTime, Duration, TimeZone, Utc};
use std::collections::BTreeSet;

fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2013, 1, 1, 0, 0, 0).unwrap()
}

fn slot(start_hour: u32, hours: i64) -> Interval {
    let start = Utc.with_ymd_and_hms(2013, 1, 1, start_hour, 0, 0).unwrap();
    Interval::from_duration(start, Duration::hours(hours)).unwrap()
}

fn mcu(id: u64, license_count: u32) -> Resource {
    Resource::new(ResourceId::from(id), format!("mcu-{id}"))
        .with_technology(Technology::H323)
        .with_technology(Technology::Sip)
        .with_capability(Capability::RoomProvider {
            license_count,
            required_alias_types: vec![],
        })
}

fn terminal(id: u64, technology: Technology) -> Resource {
    Resource::new(ResourceId::from(id), format!("terminal-{id}"))
        .with_technology(technology)
        .with_capability(Capability::Terminal)
}

fn number_provider(id: u64, pattern: &str) -> Resource {
    Resource::new(ResourceId::from(id), format!("numbers-{id}")).with_capability(
        Capability::AliasProvider(AliasProviderCapability {
            patterns: vec![pattern.to_string()],
            alias_types: vec![AliasType::H323E164],
            allow_any_requested_value: false,
            maximum_future_days: None,
            restricted_to_resource: false,
        }),
    )
}

fn room(participant_count: u32) -> Specification {
    Specification::Room(RoomSpecification {
        participant_count,
        technology_variants: vec![[Technology::H323].into_iter().collect()],
        resource: None,
        aliases: vec![],
    })
}

fn persisted_room(id: u64, resource: u64, license_count: u32, slot: Interval) -> Reservation {
    Reservation::new(
        ReservationId::from(id),
        slot,
        ReservationKind::Room {
            resource: ResourceId::from(resource),
            license_count,
            executable: None,
        },
    )
}

fn perform(store: &InMemoryStore, specification: Specification, slot: Interval) -> Result<Reservation> {
    let mut context = SchedulerContext::new(store, now(), SchedulerSettings::default());
    ReservationTask::new(specification, slot).perform(&mut context)
}

fn failure(result: Result<Reservation>) -> SchedulerError {
    match result {
        Err(Error::Scheduler(error)) => error,
        other => panic!("expected scheduling failure, got {other:?}"),
    }
}

#[test]
fn test_resource_allocates_parent() {
    let store = InMemoryStore::new()
        .with_resource(Resource::new(ResourceId::from(1), "building"))
        .with_resource(Resource::new(ResourceId::from(2), "projector").with_parent(ResourceId::from(1)));
    let mut context = SchedulerContext::new(&store, now(), SchedulerSettings::default());

    let mut task = ReservationTask::new(
        Specification::Resource {
            resource: ResourceId::from(2),
        },
        slot(12, 2),
    );
    let reservation = task.perform(&mut context).unwrap();

    assert_eq!(
        reservation.kind(),
        &ReservationKind::Resource {
            resource: ResourceId::from(2)
        }
    );
    assert_eq!(
        reservation.children()[0].kind(),
        &ReservationKind::Resource {
            resource: ResourceId::from(1)
        }
    );
    let referenced: Vec<u64> = context
        .state()
        .referenced_resources()
        .iter()
        .map(|id| id.value())
        .collect();
    assert_eq!(referenced, vec![1, 2]);
    assert!(context
        .state()
        .allocated_reservation(reservation.id())
        .is_some());
}

#[test]
fn test_resource_requested_twice() {
    let store = InMemoryStore::new().with_resource(Resource::new(ResourceId::from(1), "projector"));
    let resource = Specification::Resource {
        resource: ResourceId::from(1),
    };
    let result = perform(
        &store,
        Specification::Composite {
            children: vec![resource.clone(), resource],
        },
        slot(12, 2),
    );

    let error = failure(result);
    assert!(matches!(
        error.report().root_cause().kind(),
        ReportKind::ResourceMultipleRequested { .. }
    ));
}

#[test]
fn test_resource_collision_lists_colliding_reservations() {
    let mut store = InMemoryStore::new().with_resource(mcu(1, 10));
    store
        .save_reservation(&persisted_room(100, 1, 2, slot(11, 2)))
        .unwrap();

    let result = perform(
        &store,
        Specification::Resource {
            resource: ResourceId::from(1),
        },
        slot(12, 2),
    );

    let error = failure(result);
    assert!(error
        .report()
        .find(|kind| matches!(kind, ReportKind::ResourceAlreadyAllocated { .. }))
        .is_some());
    let colliding = error
        .report()
        .find(|kind| matches!(kind, ReportKind::CollidingReservations { .. }))
        .unwrap();
    assert_eq!(
        colliding.kind(),
        &ReportKind::CollidingReservations {
            reservations: vec![ReservationId::from(100)]
        }
    );
}

#[test]
fn test_resource_not_allocatable() {
    let store =
        InMemoryStore::new().with_resource(Resource::new(ResourceId::from(1), "broken").not_allocatable());
    let error = failure(perform(
        &store,
        Specification::Resource {
            resource: ResourceId::from(1),
        },
        slot(12, 1),
    ));
    assert_eq!(error.report().root_cause().kind().id(), "resource-not-allocatable");
}

#[test]
fn test_resource_maximum_future() {
    let store = InMemoryStore::new()
        .with_resource(Resource::new(ResourceId::from(1), "projector").with_maximum_future_days(10));
    let far = Interval::from_duration(now() + Duration::days(20), Duration::hours(1)).unwrap();

    let error = failure(perform(
        &store,
        Specification::Resource {
            resource: ResourceId::from(1),
        },
        far,
    ));
    assert_eq!(
        error.user_error(),
        UserError::MaximumFutureExceeded {
            maximum: now() + Duration::days(10)
        }
    );

    let mut context =
        SchedulerContext::new(&store, now(), SchedulerSettings::default()).with_restrictions(false);
    let mut task = ReservationTask::new(
        Specification::Resource {
            resource: ResourceId::from(1),
        },
        far,
    );
    assert!(task.perform(&mut context).is_ok());
}

#[test]
fn test_reusable_reservation_becomes_existing() {
    let mut store = InMemoryStore::new().with_resource(Resource::new(ResourceId::from(1), "projector"));
    let persisted = Reservation::new(
        ReservationId::from(100),
        slot(10, 6),
        ReservationKind::Resource {
            resource: ResourceId::from(1),
        },
    );
    store.save_reservation(&persisted).unwrap();

    let mut context = SchedulerContext::new(&store, now(), SchedulerSettings::default());
    context
        .state_mut()
        .add_available_reservation(&persisted, AvailabilityKind::Reusable)
        .unwrap();
    let mut task = ReservationTask::new(
        Specification::Resource {
            resource: ResourceId::from(1),
        },
        slot(12, 2),
    );
    let reservation = task.perform(&mut context).unwrap();

    assert_eq!(
        reservation.kind(),
        &ReservationKind::Existing {
            reused: ReservationId::from(100)
        }
    );
    assert!(context.state().available_reservation_ids().is_empty());
    assert!(task.reports()[0]
        .find(|kind| matches!(kind, ReportKind::ReservationReusing { .. }))
        .is_some());
}

#[test]
fn test_room_capacity_exceeded() {
    let mut store = InMemoryStore::new().with_resource(mcu(1, 10));
    store
        .save_reservation(&persisted_room(100, 1, 8, slot(12, 2)))
        .unwrap();

    let error = failure(perform(&store, room(5), slot(12, 2)));
    assert_eq!(
        error.user_error(),
        UserError::RoomCapacityExceeded {
            available: 2,
            maximum: 10
        }
    );
}

#[test]
fn test_room_fits_next_to_touching_reservation() {
    let mut store = InMemoryStore::new().with_resource(mcu(1, 10));
    store
        .save_reservation(&persisted_room(100, 1, 8, slot(10, 2)))
        .unwrap();

    let reservation = perform(&store, room(10), slot(12, 2)).unwrap();
    assert!(matches!(
        reservation.kind(),
        ReservationKind::Room {
            license_count: 10,
            executable: Some(_),
            ..
        }
    ));
}

#[test]
fn test_room_prefers_fuller_device() {
    let mut store = InMemoryStore::new()
        .with_resource(mcu(1, 10))
        .with_resource(mcu(2, 10));
    store
        .save_reservation(&persisted_room(100, 2, 5, slot(12, 2)))
        .unwrap();

    let reservation = perform(&store, room(3), slot(12, 2)).unwrap();
    assert_eq!(reservation.target(), Some(ReservationTarget::Room(ResourceId::from(2))));
}

#[test]
fn test_room_prefers_larger_device_when_equally_full() {
    let store = InMemoryStore::new()
        .with_resource(mcu(1, 10))
        .with_resource(mcu(2, 20));

    let reservation = perform(&store, room(3), slot(12, 2)).unwrap();
    assert_eq!(reservation.target(), Some(ReservationTarget::Room(ResourceId::from(2))));
}

#[test]
fn test_room_rejections_of_every_device_are_reported() {
    let mut store = InMemoryStore::new()
        .with_resource(mcu(1, 10))
        .with_resource(mcu(2, 10));
    store
        .save_reservation(&persisted_room(100, 1, 8, slot(12, 2)))
        .unwrap();
    store
        .save_reservation(&persisted_room(101, 2, 9, slot(12, 2)))
        .unwrap();

    let error = failure(perform(&store, room(5), slot(12, 2)));

    let rejected: BTreeSet<_> = error
        .report()
        .children()
        .iter()
        .filter_map(|child| match child.kind() {
            ReportKind::ResourceRoomCapacityExceeded { resource, .. } => Some(*resource),
            _ => None,
        })
        .collect();
    assert_eq!(rejected, [ResourceId::from(1), ResourceId::from(2)].into_iter().collect());
    assert!(matches!(
        error.user_error(),
        UserError::RoomCapacityExceeded { maximum: 10, .. }
    ));
}

#[test]
fn test_room_keeps_report_of_each_rejected_candidate() {
    let device = |id: u64| {
        Resource::new(ResourceId::from(id), format!("mcu-{id}"))
            .with_technology(Technology::H323)
            .with_capability(Capability::RoomProvider {
                license_count: 10,
                required_alias_types: vec![AliasType::H323E164],
            })
    };
    let store = InMemoryStore::new()
        .with_resource(device(1))
        .with_resource(device(2));

    let error = failure(perform(&store, room(4), slot(12, 2)));

    let failed = error
        .report()
        .children()
        .iter()
        .filter(|child| child.is_failure())
        .count();
    assert_eq!(failed, 2);
    assert_eq!(error.report().root_cause().kind(), &ReportKind::ResourceNotFound);
}

#[test]
fn test_room_success_drops_earlier_rejections() {
    let device = Resource::new(ResourceId::from(1), "mcu-1")
        .with_technology(Technology::H323)
        .with_capability(Capability::RoomProvider {
            license_count: 20,
            required_alias_types: vec![AliasType::H323E164],
        });
    let store = InMemoryStore::new()
        .with_resource(device)
        .with_resource(mcu(2, 10));
    let mut context = SchedulerContext::new(&store, now(), SchedulerSettings::default());
    let mut task = ReservationTask::new(room(4), slot(12, 2));

    let reservation = task.perform(&mut context).unwrap();

    assert_eq!(reservation.target(), Some(ReservationTarget::Room(ResourceId::from(2))));
    assert!(!task.reports()[0].is_failure());
}

#[test]
fn test_room_maximum_duration() {
    let store = InMemoryStore::new().with_resource(mcu(1, 10));
    let long = Interval::from_duration(now() + Duration::days(1), Duration::days(2)).unwrap();

    let error = failure(perform(&store, room(2), long));
    assert!(matches!(
        error.user_error(),
        UserError::MaximumDurationExceeded { .. }
    ));
}

#[test]
fn test_room_receives_required_alias() {
    let device = Resource::new(ResourceId::from(1), "mcu")
        .with_technology(Technology::H323)
        .with_capability(Capability::RoomProvider {
            license_count: 10,
            required_alias_types: vec![AliasType::H323E164],
        });
    let store = InMemoryStore::new()
        .with_resource(device)
        .with_resource(number_provider(2, "950{digit:3}"));

    let reservation = perform(&store, room(4), slot(12, 2)).unwrap();

    let alias = &reservation.children()[0];
    match alias.kind() {
        ReservationKind::Alias { provider, aliases } => {
            assert_eq!(*provider, ResourceId::from(2));
            assert_eq!(aliases.len(), 1);
            assert_eq!(aliases[0].alias_type, AliasType::H323E164);
            assert_eq!(aliases[0].value, "950001");
        }
        other => panic!("expected alias reservation, got {other:?}"),
    }
    assert!(matches!(
        alias.children()[0].kind(),
        ReservationKind::Value { value, .. } if value == "950001"
    ));
}

#[test]
fn test_alias_values_are_unique_within_run() {
    let store = InMemoryStore::new().with_resource(number_provider(1, "950{digit:3}"));
    let alias = Specification::Alias(AliasSpecification::of_type(AliasType::H323E164));

    let reservation = perform(
        &store,
        Specification::Composite {
            children: vec![alias.clone(), alias],
        },
        slot(12, 2),
    )
    .unwrap();

    let values: BTreeSet<String> = reservation
        .iter_tree()
        .into_iter()
        .filter_map(|node| match node.kind() {
            ReservationKind::Value { value, .. } => Some(value.clone()),
            _ => None,
        })
        .collect();
    assert_eq!(
        values,
        ["950001", "950002"].into_iter().map(String::from).collect()
    );
}

#[test]
fn test_alias_requested_value_already_allocated() {
    let store = InMemoryStore::new().with_resource(number_provider(1, "950{digit:3}"));
    let alias = Specification::Alias(
        AliasSpecification::of_type(AliasType::H323E164).with_value("950001"),
    );

    let error = failure(perform(
        &store,
        Specification::Composite {
            children: vec![alias.clone(), alias],
        },
        slot(12, 2),
    ));
    assert_eq!(
        error.user_error(),
        UserError::AliasAlreadyAllocated {
            value: "950001".into()
        }
    );
}

#[test]
fn test_alias_requested_value_outside_patterns() {
    let store = InMemoryStore::new().with_resource(number_provider(1, "950{digit:3}"));
    let error = failure(perform(
        &store,
        Specification::Alias(AliasSpecification::of_type(AliasType::H323E164).with_value("abc")),
        slot(12, 2),
    ));
    assert_eq!(error.report().root_cause().kind().id(), "value-invalid");
}

#[test]
fn test_value_provider_exhausted() {
    let store = InMemoryStore::new().with_resource(number_provider(1, "95000{digit:1}"));
    let value = Specification::Value {
        provider: ResourceId::from(1),
        value: None,
    };

    let nine = perform(
        &store,
        Specification::Composite {
            children: vec![value.clone(); 9],
        },
        slot(12, 2),
    );
    assert!(nine.is_ok());

    let error = failure(perform(
        &store,
        Specification::Composite {
            children: vec![value; 10],
        },
        slot(12, 2),
    ));
    assert_eq!(error.user_error(), UserError::AliasNotAvailable);
}

#[test]
fn test_alias_without_provider() {
    let store = InMemoryStore::new().with_resource(mcu(1, 10));
    let error = failure(perform(
        &store,
        Specification::Alias(AliasSpecification::of_type(AliasType::SipUri)),
        slot(12, 2),
    ));
    assert_eq!(error.report().root_cause().kind(), &ReportKind::ResourceNotFound);
}

#[test]
fn test_compartment_of_two_compatible_terminals_has_no_room() {
    let store = InMemoryStore::new()
        .with_resource(terminal(1, Technology::H323))
        .with_resource(terminal(2, Technology::H323))
        .with_resource(mcu(3, 10));
    let endpoints = vec![
        EndpointSpecification::Resource {
            resource: ResourceId::from(1),
        },
        EndpointSpecification::Resource {
            resource: ResourceId::from(2),
        },
    ];

    let reservation = perform(&store, Specification::Compartment { endpoints }, slot(12, 2)).unwrap();

    assert!(matches!(
        reservation.kind(),
        ReservationKind::Compartment {
            executable: Some(_)
        }
    ));
    assert_eq!(reservation.children().len(), 2);
    assert!(reservation
        .children()
        .iter()
        .all(|child| matches!(child.kind(), ReservationKind::Resource { .. })));
}

#[test]
fn test_compartment_of_incompatible_terminals_needs_room() {
    let store = InMemoryStore::new()
        .with_resource(terminal(1, Technology::H323))
        .with_resource(terminal(2, Technology::Sip))
        .with_resource(mcu(3, 10));
    let endpoints = vec![
        EndpointSpecification::Resource {
            resource: ResourceId::from(1),
        },
        EndpointSpecification::Resource {
            resource: ResourceId::from(2),
        },
    ];

    let reservation = perform(&store, Specification::Compartment { endpoints }, slot(12, 2)).unwrap();

    let room = reservation.children().last().unwrap();
    assert_eq!(room.target(), Some(ReservationTarget::Room(ResourceId::from(3))));
    assert!(matches!(
        room.kind(),
        ReservationKind::Room {
            license_count: 2,
            ..
        }
    ));
}

#[test]
fn test_compartment_of_three_participants_needs_room() {
    let store = InMemoryStore::new()
        .with_resource(terminal(1, Technology::H323))
        .with_resource(mcu(3, 10));
    let endpoints = vec![
        EndpointSpecification::Resource {
            resource: ResourceId::from(1),
        },
        EndpointSpecification::External {
            technologies: [Technology::H323].into_iter().collect(),
            count: 2,
        },
    ];

    let reservation = perform(&store, Specification::Compartment { endpoints }, slot(12, 2)).unwrap();

    assert!(reservation.children().iter().any(|child| matches!(
        child.kind(),
        ReservationKind::Room {
            license_count: 3,
            ..
        }
    )));
}

#[test]
fn test_compartment_needs_two_endpoints() {
    let store = InMemoryStore::new().with_resource(terminal(1, Technology::H323));
    let endpoints = vec![EndpointSpecification::Resource {
        resource: ResourceId::from(1),
    }];

    let error = failure(perform(&store, Specification::Compartment { endpoints }, slot(12, 2)));
    assert_eq!(
        error.report().root_cause().kind(),
        &ReportKind::CompartmentNotEnoughEndpoint
    );
}

#[test]
fn test_failed_composite_reverted_by_attempt() {
    let store = InMemoryStore::new().with_resource(Resource::new(ResourceId::from(1), "projector"));
    let mut context = SchedulerContext::new(&store, now(), SchedulerSettings::default());
    let mut task = ReservationTask::new(
        Specification::Composite {
            children: vec![
                Specification::Resource {
                    resource: ResourceId::from(1),
                },
                Specification::Resource {
                    resource: ResourceId::from(99),
                },
            ],
        },
        slot(12, 2),
    );

    let result = context.attempt(|context| task.perform(context));

    assert!(result.is_err());
    assert!(context.state().referenced_resources().is_empty());
    assert!(context.state().allocated_reservation_ids().is_empty());
    assert!(task.reports()[0].is_failure());
}

#[test]
fn test_failed_task_leaves_state_untouched() {
    let store = InMemoryStore::new().with_resource(Resource::new(ResourceId::from(1), "projector"));
    let mut context = SchedulerContext::new(&store, now(), SchedulerSettings::default());
    let mut task = ReservationTask::new(
        Specification::Composite {
            children: vec![
                Specification::Resource {
                    resource: ResourceId::from(1),
                },
                Specification::Resource {
                    resource: ResourceId::from(99),
                },
            ],
        },
        slot(12, 2),
    );

    assert!(task.perform(&mut context).is_err());
    assert!(context.state().referenced_resources().is_empty());
    assert!(context.state().allocated_reservation_ids().is_empty());

    let reservation = ReservationTask::new(
        Specification::Resource {
            resource: ResourceId::from(1),
        },
        slot(12, 2),
    )
    .perform(&mut context)
    .unwrap();
    assert_eq!(reservation.target(), Some(ReservationTarget::Resource(ResourceId::from(1))));
}
