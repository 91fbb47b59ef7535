//! Allocation of a whole booking request.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::reservation::{AvailabilityKind, RequestId, Reservation, ReservationId, ReservationTarget};
use crate::Interval;

use super::context::SchedulerContext;
use super::report::{ReportKind, SchedulerError, SchedulerReport};
use super::specification::Specification;
use super::task::ReservationTask;

/// A booking request as seen by the scheduler.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReservationRequest {
    /// Request identifier.
    pub id: RequestId,
    /// Requested slot.
    pub slot: Interval,
    /// What to allocate.
    pub specification: Specification,
    /// Reservation of another request whose allocation may be reused.
    #[serde(default)]
    pub reused_reservation: Option<ReservationId>,
}

/// Result of a successful [`allocate_request`].
#[derive(Debug, Clone)]
pub struct Allocation {
    /// The allocated reservation tree.
    pub reservation: Reservation,
    /// Reports of the allocation.
    pub reports: Vec<SchedulerReport>,
}

/// Allocates `request` in `context`.
///
/// Reservations previously allocated for the same request are offered for
/// reallocation, and the reused reservation, if any, is offered for reuse.
/// The returned tree carries the request identifier on every node.
///
/// # Errors
///
/// Returns [`Error::Scheduler`] when the request cannot be allocated,
/// [`Error::NotFound`] when the reused reservation does not exist, or any
/// store error.
pub fn allocate_request(context: &mut SchedulerContext<'_>, request: &ReservationRequest) -> Result<Allocation> {
    log::info!("Allocating request {} in {}", request.id, request.slot);

    if let Some(reused_id) = request.reused_reservation {
        let reused = context
            .store()
            .reservation(reused_id)?
            .ok_or_else(|| Error::NotFound {
                resource: format!("reservation {reused_id}"),
            })?;
        if !reused.slot().contains(&request.slot) {
            return Err(SchedulerError::from(ReportKind::ReservationRequestInvalidSlot {
                reservation: reused_id,
                slot: request.slot,
                reused_slot: *reused.slot(),
            })
            .into());
        }
        let users: Vec<Reservation> = context
            .reservations(ReservationTarget::Reused(reused_id), &request.slot)?
            .into_iter()
            .filter(|user| user.request() != Some(request.id))
            .collect();
        if !users.is_empty() {
            return Err(SchedulerError::from(ReportKind::ReservationAlreadyUsed {
                reservation: reused_id,
            })
            .into());
        }
        context
            .state_mut()
            .add_available_reservation(&reused, AvailabilityKind::Reusable)?;
    }

    for existing in context.store().reservations_of_request(request.id)? {
        context
            .state_mut()
            .add_available_reservation(&existing, AvailabilityKind::Existing)?;
    }

    let mut task = ReservationTask::new(request.specification.clone(), request.slot);
    let result = task.perform(context);
    let mut reservation = match result {
        Ok(reservation) => reservation,
        Err(err) => {
            if let Some(failure) = err.as_scheduler_error() {
                log::warn!("Request {} failed: {}", request.id, failure.user_error());
            }
            return Err(err);
        }
    };
    reservation.set_request(request.id);
    log::info!("Request {} allocated as {}", request.id, reservation.id());
    Ok(Allocation {
        reservation,
        reports: task.reports().to_vec(),
    })
}
