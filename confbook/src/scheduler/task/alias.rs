//! Allocation of aliases backed by a value reservation.

use std::collections::BTreeMap;

use crate::error::{Error, Result};
use crate::reservation::{AvailableReservation, Reservation, ReservationKind, ReservationTarget};
use crate::resource::{Alias, Resource, ResourceId};
use crate::scheduler::report::ReportKind;
use crate::scheduler::specification::{AliasSpecification, Specification};

use super::{rejection, TaskScope};

fn is_restricted(provider: &Resource) -> bool {
    provider
        .alias_provider()
        .is_some_and(|capability| capability.restricted_to_resource)
}

fn has_value(reservation: &Reservation, value: &str) -> bool {
    matches!(reservation.kind(), ReservationKind::Alias { aliases, .. }
        if aliases.iter().any(|alias| alias.value == value))
}

pub(super) fn allocate(
    scope: &mut TaskScope<'_, '_>,
    specification: &AliasSpecification,
) -> Result<Reservation> {
    let slot = scope.slot;
    let mut providers = scope
        .context
        .store()
        .find_alias_providers(&specification.technologies, &specification.alias_types)?;
    providers.retain(|provider| {
        specification.provider.map_or(true, |id| id == provider.id)
            && !(is_restricted(provider)
                && specification
                    .target_resource
                    .is_some_and(|target| target != provider.id))
    });
    if providers.is_empty() {
        return Err(rejection(ReportKind::ResourceNotFound));
    }

    let mut provided: BTreeMap<ResourceId, AvailableReservation> = BTreeMap::new();
    for provider in &providers {
        let candidate = scope
            .context
            .state()
            .available_reservations_for(ReservationTarget::Alias(provider.id), &slot)
            .into_iter()
            .filter(|available| available.reservation().slot().contains(&slot))
            .find(|available| {
                specification
                    .value
                    .as_deref()
                    .map_or(true, |value| has_value(available.reservation(), value))
            });
        if let Some(candidate) = candidate {
            provided.insert(provider.id, candidate);
        }
    }

    scope.report(ReportKind::SortingResources);
    let untargeted = specification.target_resource.is_none();
    providers.sort_by_key(|provider| {
        (
            !provided.contains_key(&provider.id),
            untargeted && is_restricted(provider),
            provider.id,
        )
    });

    scope.try_candidates(providers, |scope, provider| {
        if let Some(available) = provided.remove(&provider.id) {
            return Ok(scope.reuse(available));
        }
        let Some(capability) = provider.alias_provider() else {
            return Err(rejection(ReportKind::ResourceNotFound));
        };

        let value_reservation = scope.perform_child(Specification::Value {
            provider: provider.id,
            value: specification.value.clone(),
        })?;
        let value = reserved_value(scope, &value_reservation)?;
        let aliases = capability
            .alias_types
            .iter()
            .map(|alias_type| Alias {
                alias_type: *alias_type,
                value: value.clone(),
            })
            .collect();

        let mut reservation = scope.new_reservation(ReservationKind::Alias {
            provider: provider.id,
            aliases,
        });
        reservation.add_child(value_reservation)?;
        Ok(reservation)
    })
}

/// Returns the value held by a value reservation or by the reservation it
/// reuses.
fn reserved_value(scope: &TaskScope<'_, '_>, reservation: &Reservation) -> Result<String> {
    match reservation.kind() {
        ReservationKind::Value { value, .. } => Ok(value.clone()),
        ReservationKind::Existing { reused } => {
            let reused_reservation = scope.context.store().reservation(*reused)?.ok_or_else(|| {
                Error::NotFound {
                    resource: format!("reservation {reused}"),
                }
            })?;
            reserved_value(scope, &reused_reservation)
        }
        other => Err(Error::Validation {
            field: "reservation".into(),
            message: format!("{} reservation holds no value", other.name()),
        }),
    }
}
