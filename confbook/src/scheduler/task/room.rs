//! Allocation of a virtual room on a room provider.

use std::cmp::Ordering;

use crate::error::Result;
use crate::reservation::{
    AvailabilityKind, AvailableReservation, Reservation, ReservationKind, ReservationTarget,
};
use crate::resource::{AliasType, Capability, Resource};
use crate::scheduler::context::license_count_peak;
use crate::scheduler::report::{ReportKind, SchedulerReport};
use crate::scheduler::specification::{AliasSpecification, RoomSpecification, Specification};

use super::{rejection, TaskScope};

struct RoomCandidate {
    resource: Resource,
    capacity: u32,
    used: u32,
    available: Option<AvailableReservation>,
}

impl RoomCandidate {
    /// Compares occupancy ratios `used / capacity` without division.
    fn fullness_cmp(&self, other: &Self) -> Ordering {
        let this = u64::from(self.used) * u64::from(other.capacity);
        let that = u64::from(other.used) * u64::from(self.capacity);
        this.cmp(&that)
    }
}

fn required_alias_types(resource: &Resource) -> Vec<AliasType> {
    resource
        .capabilities
        .iter()
        .find_map(|capability| match capability {
            Capability::RoomProvider {
                required_alias_types,
                ..
            } => Some(required_alias_types.clone()),
            _ => None,
        })
        .unwrap_or_default()
}

pub(super) fn allocate(scope: &mut TaskScope<'_, '_>, specification: &RoomSpecification) -> Result<Reservation> {
    let slot = scope.slot;
    let maximum_duration = scope.context.settings().room_maximum_duration;
    scope.context.check_maximum_duration(&slot, maximum_duration)?;

    let store = scope.context.store();
    let devices = match specification.resource {
        Some(pinned) => {
            let device = store
                .resource(pinned)?
                .ok_or_else(|| rejection(ReportKind::ResourceNotFound))?;
            let supported = specification.technology_variants.is_empty()
                || specification
                    .technology_variants
                    .iter()
                    .any(|variant| device.supports(variant));
            if device.room_license_count().is_none() || !supported {
                return Err(rejection(ReportKind::SpecificationNotAllocatable {
                    specification: format!("room on {pinned}"),
                }));
            }
            vec![device]
        }
        None => store.find_available_rooms(&specification.technology_variants)?,
    };

    let mut candidates = Vec::new();
    let mut rejections = Vec::new();
    for device in devices {
        let capacity = device.room_license_count().unwrap_or(0);
        let whole = scope
            .context
            .reservations(ReservationTarget::Resource(device.id), &slot)?;
        if !whole.is_empty() {
            rejections.push(SchedulerReport::new(ReportKind::ResourceAlreadyAllocated {
                resource: device.id,
            }));
            continue;
        }
        let rooms = scope
            .context
            .reservations(ReservationTarget::Room(device.id), &slot)?;
        let used = license_count_peak(&slot, &rooms);
        let available = scope
            .context
            .state()
            .available_reservations_for(ReservationTarget::Room(device.id), &slot)
            .into_iter()
            .find(|available| {
                available.reservation().slot().contains(&slot)
                    && matches!(available.reservation().kind(),
                        ReservationKind::Room { license_count, .. }
                            if *license_count >= specification.participant_count)
            });

        let free = capacity.saturating_sub(used);
        if available.is_none() && free < specification.participant_count {
            rejections.push(SchedulerReport::new(ReportKind::ResourceRoomCapacityExceeded {
                resource: device.id,
                available: free,
                maximum: capacity,
            }));
            continue;
        }
        candidates.push(RoomCandidate {
            resource: device,
            capacity,
            used,
            available,
        });
    }
    if candidates.is_empty() {
        return Err(scope.reject_all(rejections));
    }

    scope.report(ReportKind::SortingResources);
    candidates.sort_by(|a, b| {
        a.available
            .is_none()
            .cmp(&b.available.is_none())
            .then_with(|| b.fullness_cmp(a))
            .then_with(|| b.capacity.cmp(&a.capacity))
            .then_with(|| a.resource.id.cmp(&b.resource.id))
    });

    scope.try_candidates(candidates, |scope, candidate| {
        allocate_on(scope, specification, candidate)
    })
}

fn allocate_on(
    scope: &mut TaskScope<'_, '_>,
    specification: &RoomSpecification,
    candidate: RoomCandidate,
) -> Result<Reservation> {
    let slot = scope.slot;
    let device = candidate.resource;
    scope.context.check_available_resource(&device, &slot)?;

    if let Some(available) = candidate.available {
        let executable = available.reservation().executable();
        let reusable = available.kind() == AvailabilityKind::Reusable;
        let reservation = scope.reuse(available);
        if let (true, Some(executable)) = (reusable, executable) {
            scope.report(ReportKind::ExecutableReusing { executable });
        }
        return Ok(reservation);
    }

    let executable = scope.context.next_executable_id();
    let mut reservation = scope.new_reservation(ReservationKind::Room {
        resource: device.id,
        license_count: specification.participant_count,
        executable: Some(executable),
    });
    log::debug!(
        "Room {} on {} for {} participants ({} of {} licenses used)",
        reservation.id(),
        device.id,
        specification.participant_count,
        candidate.used,
        candidate.capacity
    );

    let mut covered: Vec<AliasType> = Vec::new();
    for alias in &specification.aliases {
        let mut alias = alias.clone();
        alias.target_resource = Some(device.id);
        let child = scope.perform_child(Specification::Alias(alias))?;
        covered.extend(produced_alias_types(&child));
        reservation.add_child(child)?;
    }
    for alias_type in required_alias_types(&device) {
        let compatible = alias_type
            .technology()
            .map_or(true, |technology| device.technologies.contains(&technology));
        if covered.contains(&alias_type) || !compatible {
            continue;
        }
        let alias = AliasSpecification {
            target_resource: Some(device.id),
            ..AliasSpecification::of_type(alias_type)
        };
        let child = scope.perform_child(Specification::Alias(alias))?;
        covered.extend(produced_alias_types(&child));
        reservation.add_child(child)?;
    }
    Ok(reservation)
}

fn produced_alias_types(reservation: &Reservation) -> Vec<AliasType> {
    match reservation.kind() {
        ReservationKind::Alias { aliases, .. } => aliases.iter().map(|alias| alias.alias_type).collect(),
        _ => Vec::new(),
    }
}

