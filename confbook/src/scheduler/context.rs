//! Context of one scheduling run.

use chrono::{DateTime, Duration, Utc};

use crate::config::SchedulerSettings;
use crate::error::{Error, Result};
use crate::executor::ExecutableId;
use crate::reservation::{IdSequence, RequestId, Reservation, ReservationId, ReservationKind, ReservationTarget};
use crate::resource::Resource;
use crate::store::ResourceStore;
use crate::Interval;

use super::report::{ReportKind, SchedulerError};
use super::state::{Savepoint, SchedulerContextState};

/// Everything a [`ReservationTask`](super::ReservationTask) needs besides
/// its specification: the store, the reference time, the limits and the
/// mutable [`SchedulerContextState`].
///
/// A context is used by one scheduling run only. Dropping it discards every
/// uncommitted decision.
pub struct SchedulerContext<'a> {
    store: &'a dyn ResourceStore,
    minimum_date_time: DateTime<Utc>,
    settings: SchedulerSettings,
    restricted: bool,
    request: Option<RequestId>,
    user_id: Option<String>,
    ids: IdSequence,
    state: SchedulerContextState,
}

impl<'a> SchedulerContext<'a> {
    /// Creates a context for allocations starting at `minimum_date_time`.
    ///
    /// Maximum future and maximum duration limits are enforced until
    /// [`SchedulerContext::with_restrictions`] disables them.
    #[must_use]
    pub fn new(
        store: &'a dyn ResourceStore,
        minimum_date_time: DateTime<Utc>,
        settings: SchedulerSettings,
    ) -> Self {
        Self {
            store,
            minimum_date_time,
            settings,
            restricted: true,
            request: None,
            user_id: None,
            ids: IdSequence::default(),
            state: SchedulerContextState::new(),
        }
    }

    /// Sets the request the allocated reservations belong to.
    #[must_use]
    pub fn with_request(mut self, request: RequestId) -> Self {
        self.request = Some(request);
        self
    }

    /// Sets the user on whose behalf the run allocates.
    #[must_use]
    pub fn with_user(mut self, user_id: impl Into<String>) -> Self {
        self.user_id = Some(user_id.into());
        self
    }

    /// Replaces the identifier sequence.
    #[must_use]
    pub fn with_id_sequence(mut self, ids: IdSequence) -> Self {
        self.ids = ids;
        self
    }

    /// Enables or disables maximum future and maximum duration limits.
    #[must_use]
    pub fn with_restrictions(mut self, restricted: bool) -> Self {
        self.restricted = restricted;
        self
    }

    /// Returns the resource store.
    #[must_use]
    pub fn store(&self) -> &'a dyn ResourceStore {
        self.store
    }

    /// Returns the reference date/time of the run.
    #[must_use]
    pub const fn minimum_date_time(&self) -> DateTime<Utc> {
        self.minimum_date_time
    }

    /// Returns the limits.
    #[must_use]
    pub const fn settings(&self) -> &SchedulerSettings {
        &self.settings
    }

    /// Checks whether maximum future and duration limits apply.
    #[must_use]
    pub const fn is_maximum_future_and_duration_restricted(&self) -> bool {
        self.restricted
    }

    /// Returns the owning request, if any.
    #[must_use]
    pub const fn request(&self) -> Option<RequestId> {
        self.request
    }

    /// Returns the user the run allocates for.
    #[must_use]
    pub fn user_id(&self) -> Option<&str> {
        self.user_id.as_deref()
    }

    /// Returns the mutable allocation state.
    #[must_use]
    pub const fn state(&self) -> &SchedulerContextState {
        &self.state
    }

    /// Returns the mutable allocation state.
    pub fn state_mut(&mut self) -> &mut SchedulerContextState {
        &mut self.state
    }

    /// Consumes the context, returning its state.
    #[must_use]
    pub fn into_state(self) -> SchedulerContextState {
        self.state
    }

    /// Returns a fresh reservation identifier.
    pub fn next_reservation_id(&mut self) -> ReservationId {
        self.ids.reservation_id()
    }

    /// Returns a fresh executable identifier.
    pub fn next_executable_id(&mut self) -> ExecutableId {
        self.ids.executable_id()
    }

    /// See [`SchedulerContextState::create_savepoint`].
    pub fn create_savepoint(&mut self) -> Savepoint {
        self.state.create_savepoint()
    }

    /// See [`SchedulerContextState::revert`].
    ///
    /// # Errors
    ///
    /// Returns [`Error::SavepointMisuse`] when `savepoint` is not open.
    pub fn revert(&mut self, savepoint: Savepoint) -> Result<()> {
        self.state.revert(savepoint)
    }

    /// See [`SchedulerContextState::release`].
    ///
    /// # Errors
    ///
    /// Returns [`Error::SavepointMisuse`] when `savepoint` is not open.
    pub fn release(&mut self, savepoint: Savepoint) -> Result<()> {
        self.state.release(savepoint)
    }

    /// Runs `attempt` inside a savepoint, keeping its changes on success and
    /// reverting them on failure.
    ///
    /// # Errors
    ///
    /// Returns the error of `attempt`, or [`Error::SavepointMisuse`] when
    /// `attempt` closed the savepoint itself.
    pub fn attempt<T, F>(&mut self, attempt: F) -> Result<T>
    where
        F: FnOnce(&mut Self) -> Result<T>,
    {
        let savepoint = self.create_savepoint();
        match attempt(self) {
            Ok(value) => {
                self.release(savepoint)?;
                Ok(value)
            }
            Err(err) => {
                self.revert(savepoint)?;
                Err(err)
            }
        }
    }

    /// Returns persisted reservations of `target` overlapping `slot`, merged
    /// with this run's decisions.
    ///
    /// # Errors
    ///
    /// Returns an error when the store fails.
    pub fn reservations(&self, target: ReservationTarget, slot: &Interval) -> Result<Vec<Reservation>> {
        let mut reservations = self.store.list_reservations(target, slot)?;
        self.state.apply_reservations(target, slot, &mut reservations);
        Ok(reservations)
    }

    /// Checks that `resource` and its parents may be reserved in `slot`.
    ///
    /// # Errors
    ///
    /// Fails with a scheduler report when a resource is not allocatable or
    /// `slot` ends after its maximum future.
    pub fn check_available_resource(&self, resource: &Resource, slot: &Interval) -> Result<()> {
        if !resource.allocatable {
            return Err(SchedulerError::from(ReportKind::ResourceNotAllocatable {
                resource: resource.id,
            })
            .into());
        }
        if self.restricted {
            let maximum = resource
                .maximum_future_date_time(self.minimum_date_time)
                .unwrap_or_else(|| self.settings.maximum_future_date_time(self.minimum_date_time));
            if slot.end() > maximum {
                return Err(SchedulerError::from(ReportKind::ResourceNotAvailable {
                    resource: resource.id,
                    maximum,
                })
                .into());
            }
        }
        if let Some(parent_id) = resource.parent {
            let parent = self.store.resource(parent_id)?.ok_or_else(|| Error::NotFound {
                resource: format!("resource {parent_id}"),
            })?;
            self.check_available_resource(&parent, slot)?;
        }
        Ok(())
    }

    /// Checks that `slot` is not longer than `maximum`.
    ///
    /// # Errors
    ///
    /// Fails with a scheduler report when the run is restricted and the slot
    /// is too long.
    pub fn check_maximum_duration(&self, slot: &Interval, maximum: Duration) -> Result<()> {
        let duration = slot.duration();
        if self.restricted && duration > maximum {
            return Err(SchedulerError::from(ReportKind::MaximumDurationExceeded {
                duration,
                maximum,
            })
            .into());
        }
        Ok(())
    }
}

/// Returns the highest number of licenses used at any instant of `slot` by
/// room reservations of `reservations`.
///
/// A reservation ending at the instant another one starts does not overlap
/// it.
///
/// # Examples
///
/// ```
/// use chrono::{Duration, TimeZone, Utc};
/// use confbook::reservation::{Reservation, ReservationKind};
/// use confbook::scheduler::license_count_peak;
/// use confbook::{Interval, ReservationId, ResourceId};
///
/// let at = |h| Utc.with_ymd_and_hms(2013, 1, 1, h, 0, 0).unwrap();
/// let room = |id, from, to, count| Reservation::new(
///     ReservationId::from(id),
///     Interval::new(at(from), at(to)).unwrap(),
///     ReservationKind::Room { resource: ResourceId::from(1), license_count: count, executable: None },
/// );
///
/// let reservations = vec![room(1, 10, 12, 5), room(2, 11, 13, 3), room(3, 12, 14, 4)];
/// let slot = Interval::new(at(9), at(15)).unwrap();
/// assert_eq!(license_count_peak(&slot, &reservations), 8);
/// ```
#[must_use]
pub fn license_count_peak(slot: &Interval, reservations: &[Reservation]) -> u32 {
    let mut events: Vec<(DateTime<Utc>, bool, u32)> = Vec::new();
    for reservation in reservations {
        let ReservationKind::Room { license_count, .. } = reservation.kind() else {
            continue;
        };
        if let Some(overlap) = reservation.slot().intersection(slot) {
            events.push((overlap.start(), true, *license_count));
            events.push((overlap.end(), false, *license_count));
        }
    }
    // ends sort before starts at the same instant
    events.sort_by_key(|(instant, is_start, _)| (*instant, *is_start));

    let mut current: u32 = 0;
    let mut peak: u32 = 0;
    for (_, is_start, count) in events {
        if is_start {
            current += count;
            peak = peak.max(current);
        } else {
            current = current.saturating_sub(count);
        }
    }
    peak
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resource::ResourceId;
    use crate::store::InMemoryStore;
    use chrono::TimeZone;

    fn at(day: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2013, 1, day, 0, 0, 0).unwrap()
    }

    fn days(from: u32, to: u32) -> Interval {
        Interval::new(at(from), at(to)).unwrap()
    }

    #[test]
    fn test_not_allocatable_resource() {
        let store = InMemoryStore::new();
        let context = SchedulerContext::new(&store, at(1), SchedulerSettings::default());
        let resource = Resource::new(ResourceId::from(1), "disabled").not_allocatable();

        let err = context.check_available_resource(&resource, &days(1, 2)).unwrap_err();
        let report = err.as_scheduler_error().unwrap().top_report();
        assert_eq!(report.kind().id(), "resource-not-allocatable");
    }

    #[test]
    fn test_maximum_future_of_parent() {
        let store = InMemoryStore::new().with_resource(
            Resource::new(ResourceId::from(1), "parent").with_maximum_future_days(5),
        );
        let context = SchedulerContext::new(&store, at(1), SchedulerSettings::default());
        let child = Resource::new(ResourceId::from(2), "child").with_parent(ResourceId::from(1));

        assert!(context.check_available_resource(&child, &days(2, 6)).is_ok());
        let err = context.check_available_resource(&child, &days(2, 8)).unwrap_err();
        assert!(matches!(
            err.as_scheduler_error().unwrap().top_report().kind(),
            ReportKind::ResourceNotAvailable { resource, .. } if *resource == ResourceId::from(1)
        ));

        let unrestricted = SchedulerContext::new(&store, at(1), SchedulerSettings::default())
            .with_restrictions(false);
        assert!(unrestricted.check_available_resource(&child, &days(2, 8)).is_ok());
    }

    #[test]
    fn test_global_maximum_future() {
        let store = InMemoryStore::new();
        let settings = SchedulerSettings {
            maximum_future: Duration::days(3),
            ..SchedulerSettings::default()
        };
        let context = SchedulerContext::new(&store, at(1), settings);
        let resource = Resource::new(ResourceId::from(1), "room");
        assert!(context.check_available_resource(&resource, &days(2, 4)).is_ok());
        assert!(context.check_available_resource(&resource, &days(2, 5)).is_err());
    }

    #[test]
    fn test_maximum_duration() {
        let store = InMemoryStore::new();
        let context = SchedulerContext::new(&store, at(1), SchedulerSettings::default());
        assert!(context.check_maximum_duration(&days(1, 2), Duration::days(1)).is_ok());
        let err = context
            .check_maximum_duration(&days(1, 3), Duration::days(1))
            .unwrap_err();
        assert!(err.is_scheduling_failure());
    }

    #[test]
    fn test_attempt_reverts_on_failure() {
        let store = InMemoryStore::new();
        let mut context = SchedulerContext::new(&store, at(1), SchedulerSettings::default());

        let result: Result<()> = context.attempt(|ctx| {
            ctx.state_mut().add_referenced_resource(ResourceId::from(1));
            Err(Error::Validation {
                field: "test".into(),
                message: "fails".into(),
            })
        });
        assert!(result.is_err());
        assert!(context.state().referenced_resources().is_empty());

        context
            .attempt(|ctx| {
                ctx.state_mut().add_referenced_resource(ResourceId::from(2));
                Ok(())
            })
            .unwrap();
        assert!(context.state().contains_referenced_resource(ResourceId::from(2)));
        assert_eq!(context.state().current_savepoint(), None);
    }

    #[test]
    fn test_license_count_peak_touching_slots() {
        let room = |id, from, to, count| {
            Reservation::new(
                ReservationId::from(id),
                days(from, to),
                ReservationKind::Room {
                    resource: ResourceId::from(1),
                    license_count: count,
                    executable: None,
                },
            )
        };
        let reservations = vec![room(1, 1, 3, 4), room(2, 3, 5, 6)];
        assert_eq!(license_count_peak(&days(1, 5), &reservations), 6);
        assert_eq!(license_count_peak(&days(1, 3), &reservations), 4);
        assert_eq!(license_count_peak(&days(6, 7), &reservations), 0);
    }
}
