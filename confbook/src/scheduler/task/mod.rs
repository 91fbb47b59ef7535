//! Allocation tasks.
//!
//! A [`ReservationTask`] turns one [`Specification`] into a [`Reservation`]
//! tree. Tasks for composed specifications run child tasks against the same
//! [`SchedulerContext`], so every decision made by a child is visible to its
//! later siblings and is undone together with the savepoint that covers it.
//!
//! Failures are reported as [`Error::Scheduler`] carrying a
//! [`SchedulerReport`] tree; any other error aborts the whole run.

mod alias;
mod alias_set;
mod compartment;
mod composite;
mod resource;
mod room;
mod value;

use crate::error::{Error, Result};
use crate::reservation::{AvailabilityKind, AvailableReservation, Reservation, ReservationKind};
use crate::Interval;

use super::context::SchedulerContext;
use super::report::{ReportKind, SchedulerError, SchedulerReport};
use super::specification::Specification;

/// Allocation of one specification in one slot.
///
/// # Examples
///
/// ```
/// use chrono::{Duration, TimeZone, Utc};
/// use confbook::config::SchedulerSettings;
/// use confbook::resource::Resource;
/// use confbook::scheduler::{ReservationTask, SchedulerContext, Specification};
/// use confbook::store::InMemoryStore;
/// use confbook::{Interval, ResourceId};
///
/// let now = Utc.with_ymd_and_hms(2013, 1, 1, 0, 0, 0).unwrap();
/// let store = InMemoryStore::new().with_resource(Resource::new(ResourceId::from(1), "projector"));
/// let mut context = SchedulerContext::new(&store, now, SchedulerSettings::default());
///
/// let slot = Interval::from_duration(now, Duration::hours(2)).unwrap();
/// let mut task = ReservationTask::new(Specification::Resource { resource: ResourceId::from(1) }, slot);
/// let reservation = task.perform(&mut context).unwrap();
///
/// assert_eq!(reservation.slot(), &slot);
/// assert_eq!(task.reports()[0].kind().id(), "allocating-resource");
/// ```
#[derive(Debug, Clone)]
pub struct ReservationTask {
    specification: Specification,
    slot: Interval,
    reports: Vec<SchedulerReport>,
}

impl ReservationTask {
    /// Creates a task allocating `specification` in `slot`.
    #[must_use]
    pub const fn new(specification: Specification, slot: Interval) -> Self {
        Self {
            specification,
            slot,
            reports: Vec::new(),
        }
    }

    /// Returns the allocated specification.
    #[must_use]
    pub const fn specification(&self) -> &Specification {
        &self.specification
    }

    /// Returns the requested slot.
    #[must_use]
    pub const fn slot(&self) -> &Interval {
        &self.slot
    }

    /// Returns the reports of every [`ReservationTask::perform`] call.
    #[must_use]
    pub fn reports(&self) -> &[SchedulerReport] {
        &self.reports
    }

    /// Allocates the specification.
    ///
    /// On success the reservation is registered as allocated in the
    /// context's state. A failed task leaves the state as it found it.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Scheduler`] when the specification cannot be
    /// allocated, and any store error unchanged.
    pub fn perform(&mut self, context: &mut SchedulerContext<'_>) -> Result<Reservation> {
        log::debug!("Allocating {} in {}", self.specification, self.slot);
        let savepoint = context.create_savepoint();
        let mut scope = TaskScope {
            context,
            slot: self.slot,
            reports: Vec::new(),
        };
        let result = match &self.specification {
            Specification::Resource { resource } => resource::allocate(&mut scope, *resource),
            Specification::Value { provider, value } => {
                value::allocate(&mut scope, *provider, value.as_deref())
            }
            Specification::Alias(alias) => alias::allocate(&mut scope, alias),
            Specification::AliasSet { aliases } => alias_set::allocate(&mut scope, aliases),
            Specification::Room(room) => room::allocate(&mut scope, room),
            Specification::Compartment { endpoints } => compartment::allocate(&mut scope, endpoints),
            Specification::Composite { children } => composite::allocate(&mut scope, children),
        };

        let TaskScope {
            context, reports, ..
        } = scope;
        let main = main_report_kind(&self.specification);
        match result {
            Ok(reservation) => {
                context.release(savepoint)?;
                self.reports.push(SchedulerReport::with_children(main, reports));
                context
                    .state_mut()
                    .add_allocated_reservation(reservation.clone());
                Ok(reservation)
            }
            Err(Error::Scheduler(error)) => {
                context.revert(savepoint)?;
                let mut children = reports;
                children.push(error.into_report());
                let report = SchedulerReport::with_children(main, children);
                log::debug!(
                    "Allocation of {} failed: {}",
                    self.specification,
                    report.root_cause()
                );
                self.reports.push(report.clone());
                Err(SchedulerError::new(report).into())
            }
            Err(err) => {
                context.revert(savepoint)?;
                Err(err)
            }
        }
    }
}

fn main_report_kind(specification: &Specification) -> ReportKind {
    match specification {
        Specification::Resource { resource } => ReportKind::AllocatingResource {
            resource: *resource,
        },
        Specification::Value { provider, .. } => ReportKind::AllocatingValue {
            provider: *provider,
        },
        Specification::Alias(alias) => ReportKind::AllocatingAlias {
            alias_types: alias.alias_types.clone(),
            value: alias.value.clone(),
        },
        Specification::AliasSet { .. } => ReportKind::AllocatingAliasSet,
        Specification::Room(room) => ReportKind::AllocatingRoom {
            participants: room.participant_count,
        },
        Specification::Compartment { endpoints } => ReportKind::AllocatingCompartment {
            endpoints: endpoints.len(),
        },
        Specification::Composite { .. } => ReportKind::AllocatingComposite,
    }
}

/// Failure of the current step with a single report.
pub(crate) fn rejection(kind: ReportKind) -> Error {
    Error::Scheduler(SchedulerError::from(kind))
}

/// Failure of the current step with a report explaining details.
pub(crate) fn rejection_with(kind: ReportKind, children: Vec<SchedulerReport>) -> Error {
    Error::Scheduler(SchedulerError::new(SchedulerReport::with_children(kind, children)))
}

/// Working area of one task: the context, the slot and the reports of the
/// steps performed so far.
pub(crate) struct TaskScope<'t, 'a> {
    context: &'t mut SchedulerContext<'a>,
    slot: Interval,
    reports: Vec<SchedulerReport>,
}

impl TaskScope<'_, '_> {
    fn report(&mut self, kind: ReportKind) {
        self.reports.push(SchedulerReport::new(kind));
    }

    fn new_reservation(&mut self, kind: ReservationKind) -> Reservation {
        let id = self.context.next_reservation_id();
        Reservation::new(id, self.slot, kind)
    }

    /// Runs a child task in the same slot, keeping its report on success.
    fn perform_child(&mut self, specification: Specification) -> Result<Reservation> {
        let mut task = ReservationTask::new(specification, self.slot);
        let reservation = task.perform(self.context)?;
        self.reports.extend(task.reports);
        Ok(reservation)
    }

    /// Turns an available reservation into the result of the task.
    ///
    /// A reusable reservation is referenced by a new existing reservation;
    /// an existing reservation of the same request is returned as it is.
    fn reuse(&mut self, available: AvailableReservation) -> Reservation {
        log::debug!("Reusing {} reservation {}", available.kind(), available.id());
        self.context
            .state_mut()
            .remove_available_reservation(available.id());
        self.report(ReportKind::ReservationReusing {
            reservation: available.id(),
        });
        match available.kind() {
            AvailabilityKind::Reusable => self.new_reservation(ReservationKind::Existing {
                reused: available.id(),
            }),
            AvailabilityKind::Existing => available.into_reservation(),
        }
    }

    /// Tries `candidates` in order, each inside its own savepoint, until one
    /// succeeds.
    ///
    /// Reports of rejected candidates are dropped on success. On failure
    /// they are all kept, the last rejection being the error; with no
    /// candidate at all the task fails with [`ReportKind::ResourceNotFound`].
    fn try_candidates<C, T, F>(&mut self, candidates: Vec<C>, mut attempt: F) -> Result<T>
    where
        F: FnMut(&mut Self, C) -> Result<T>,
    {
        let mut rejections = Vec::new();
        for candidate in candidates {
            let steps = self.reports.len();
            let savepoint = self.context.create_savepoint();
            match attempt(self, candidate) {
                Ok(value) => {
                    self.context.release(savepoint)?;
                    return Ok(value);
                }
                Err(Error::Scheduler(rejected)) => {
                    self.context.revert(savepoint)?;
                    log::debug!("Candidate rejected: {}", rejected.top_report());
                    rejections.extend(self.reports.drain(steps..));
                    rejections.push(rejected.into_report());
                }
                Err(err) => {
                    self.context.revert(savepoint)?;
                    return Err(err);
                }
            }
        }
        Err(self.reject_all(rejections))
    }

    /// Fails with the last of `rejections`, keeping the earlier ones as
    /// reports of the task.
    fn reject_all(&mut self, mut rejections: Vec<SchedulerReport>) -> Error {
        match rejections.pop() {
            Some(last) => {
                self.reports.extend(rejections);
                Error::Scheduler(SchedulerError::new(last))
            }
            None => rejection(ReportKind::ResourceNotFound),
        }
    }
}

#[cfg(test)]
mod tests;
