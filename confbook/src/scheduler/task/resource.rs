//! Exclusive allocation of a whole resource.

use crate::error::Result;
use crate::reservation::{Reservation, ReservationKind, ReservationTarget};
use crate::resource::ResourceId;
use crate::scheduler::report::{ReportKind, SchedulerReport};
use crate::scheduler::specification::Specification;

use super::{rejection, rejection_with, TaskScope};

pub(super) fn allocate(scope: &mut TaskScope<'_, '_>, resource_id: ResourceId) -> Result<Reservation> {
    let slot = scope.slot;
    let resource = scope
        .context
        .store()
        .resource(resource_id)?
        .ok_or_else(|| rejection(ReportKind::ResourceNotFound))?;

    if scope.context.state().contains_referenced_resource(resource_id) {
        return Err(rejection(ReportKind::ResourceMultipleRequested {
            resource: resource_id,
        }));
    }
    scope.context.check_available_resource(&resource, &slot)?;

    let target = ReservationTarget::Resource(resource_id);
    let reusable = scope
        .context
        .state()
        .available_reservations_for(target, &slot)
        .into_iter()
        .find(|available| available.reservation().slot().contains(&slot));
    if let Some(available) = reusable {
        scope.context.state_mut().add_referenced_resource(resource_id);
        return Ok(scope.reuse(available));
    }

    let mut colliding = scope.context.reservations(target, &slot)?;
    colliding.extend(
        scope
            .context
            .reservations(ReservationTarget::Room(resource_id), &slot)?,
    );
    if !colliding.is_empty() {
        let mut reservations: Vec<_> = colliding.iter().map(Reservation::id).collect();
        reservations.sort();
        return Err(rejection_with(
            ReportKind::ResourceAlreadyAllocated {
                resource: resource_id,
            },
            vec![SchedulerReport::new(ReportKind::CollidingReservations {
                reservations,
            })],
        ));
    }

    scope.context.state_mut().add_referenced_resource(resource_id);
    let mut reservation = scope.new_reservation(ReservationKind::Resource {
        resource: resource_id,
    });

    if let Some(parent) = resource.parent {
        if !scope.context.state().contains_referenced_resource(parent) {
            let parent_reservation = scope.perform_child(Specification::Resource { resource: parent })?;
            reservation.add_child(parent_reservation)?;
        }
    }
    Ok(reservation)
}
