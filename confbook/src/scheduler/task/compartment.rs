//! Allocation of endpoints connected together.

use crate::error::Result;
use crate::reservation::{Reservation, ReservationKind};
use crate::resource::{intersect_technologies, TechnologySet};
use crate::scheduler::report::ReportKind;
use crate::scheduler::specification::{EndpointSpecification, RoomSpecification, Specification};

use super::{rejection, TaskScope};

/// Reserves every managed endpoint and, unless exactly two endpoints share
/// a technology, a room joining them all.
///
/// The room must support the common technologies of all endpoints or, when
/// they share none, every technology used by any endpoint.
pub(super) fn allocate(
    scope: &mut TaskScope<'_, '_>,
    endpoints: &[EndpointSpecification],
) -> Result<Reservation> {
    let participants: u32 = endpoints
        .iter()
        .map(EndpointSpecification::participant_count)
        .sum();
    if participants < 2 {
        return Err(rejection(ReportKind::CompartmentNotEnoughEndpoint));
    }

    let id = scope.context.next_reservation_id();
    let mut children = Vec::new();
    let mut variants: Vec<TechnologySet> = Vec::new();
    for endpoint in endpoints {
        match endpoint {
            EndpointSpecification::Resource { resource } => {
                let terminal = scope
                    .context
                    .store()
                    .resource(*resource)?
                    .filter(crate::resource::Resource::is_terminal)
                    .ok_or_else(|| {
                        rejection(ReportKind::SpecificationNotAllocatable {
                            specification: format!("endpoint {resource}"),
                        })
                    })?;
                children.push(scope.perform_child(Specification::Resource {
                    resource: *resource,
                })?);
                variants.push(terminal.technologies);
            }
            EndpointSpecification::External { technologies, .. } => {
                variants.push(technologies.clone());
            }
        }
    }

    let common = intersect_technologies(&variants);
    if participants > 2 || common.is_empty() {
        let technology_variants = if common.is_empty() {
            vec![variants.iter().flatten().copied().collect()]
        } else {
            vec![common]
        };
        log::debug!("Compartment {id} needs a room for {participants} participants");
        children.push(scope.perform_child(Specification::Room(RoomSpecification {
            participant_count: participants,
            technology_variants,
            resource: None,
            aliases: Vec::new(),
        }))?);
    }

    let executable = scope.context.next_executable_id();
    let mut reservation = Reservation::new(
        id,
        scope.slot,
        ReservationKind::Compartment {
            executable: Some(executable),
        },
    );
    for child in children {
        reservation.add_child(child)?;
    }
    Ok(reservation)
}
