//! Allocation of a unique value from an alias provider.

use std::collections::BTreeSet;

use chrono::Duration;

use crate::error::{Error, Result};
use crate::reservation::{AvailabilityKind, Reservation, ReservationKind, ReservationTarget};
use crate::resource::ResourceId;
use crate::scheduler::report::ReportKind;
use crate::value::{PatternValueProvider, ValueProvider};
use crate::Interval;

use super::{rejection, TaskScope};

pub(super) fn allocate(
    scope: &mut TaskScope<'_, '_>,
    provider_id: ResourceId,
    requested: Option<&str>,
) -> Result<Reservation> {
    let slot = scope.slot;
    let resource = scope
        .context
        .store()
        .resource(provider_id)?
        .ok_or_else(|| rejection(ReportKind::ResourceNotFound))?;
    let Some(capability) = resource.alias_provider() else {
        return Err(rejection(ReportKind::SpecificationNotAllocatable {
            specification: format!("value in {provider_id}"),
        }));
    };

    scope.context.check_available_resource(&resource, &slot)?;
    if let Some(days) = capability.maximum_future_days {
        let maximum = scope.context.minimum_date_time() + Duration::days(i64::from(days));
        if scope.context.is_maximum_future_and_duration_restricted() && slot.end() > maximum {
            return Err(rejection(ReportKind::ResourceNotAvailable {
                resource: provider_id,
                maximum,
            }));
        }
    }
    let maximum_duration = scope.context.settings().value_maximum_duration;
    scope.context.check_maximum_duration(&slot, maximum_duration)?;

    let target = ReservationTarget::Value(provider_id);
    let used = used_values(scope, target, &slot)?;

    let mut available = scope.context.state().available_reservations_for(target, &slot);
    available.sort_by_key(|candidate| {
        (
            !candidate.reservation().slot().contains(&slot),
            candidate.kind() != AvailabilityKind::Existing,
            candidate.id(),
        )
    });
    for candidate in available {
        let ReservationKind::Value { value, .. } = candidate.reservation().kind() else {
            continue;
        };
        if requested.is_some_and(|requested| requested != value) {
            continue;
        }
        if candidate.reservation().slot().contains(&slot) {
            return Ok(scope.reuse(candidate));
        }
        if candidate.kind() == AvailabilityKind::Existing && !used.contains(value) {
            log::debug!("Extending value reservation {} to {slot}", candidate.id());
            scope
                .context
                .state_mut()
                .remove_available_reservation(candidate.id());
            let mut extended = candidate.into_reservation();
            extended.set_slot(slot)?;
            return Ok(extended);
        }
    }

    let provider = PatternValueProvider::from_capability(
        capability,
        scope.context.settings().hash_retry_budget,
    )
    .map_err(|err| {
        log::warn!("Alias provider {provider_id} is misconfigured: {err}");
        rejection(ReportKind::SpecificationNotAllocatable {
            specification: format!("value in {provider_id}"),
        })
    })?;
    let generated = match requested {
        Some(requested) => provider.generate_value(&used, requested),
        None => provider.generate_added_value(&used),
    };
    let value = generated.map_err(|err| match err {
        Error::InvalidValue { value, .. } => rejection(ReportKind::ValueInvalid { value }),
        Error::ValueAlreadyAllocated { value } => {
            rejection(ReportKind::ValueAlreadyAllocated { value })
        }
        Error::NoAvailableValue { .. } => rejection(ReportKind::ValueNotAvailable {
            provider: provider_id,
        }),
        other => other,
    })?;

    Ok(scope.new_reservation(ReservationKind::Value {
        provider: provider_id,
        value,
    }))
}

fn used_values(
    scope: &TaskScope<'_, '_>,
    target: ReservationTarget,
    slot: &Interval,
) -> Result<BTreeSet<String>> {
    Ok(scope
        .context
        .reservations(target, slot)?
        .into_iter()
        .filter_map(|reservation| match reservation.kind() {
            ReservationKind::Value { value, .. } => Some(value.clone()),
            _ => None,
        })
        .collect())
}
