//! Mutable allocation state of one scheduling run, with savepoints.
//!
//! Every mutation that actually changes one of the sets is recorded in the
//! undo log of the innermost open savepoint. Reverting a savepoint replays
//! its log backwards, so exploring and discarding an alternative costs
//! only as much as the alternative changed.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use crate::error::{Error, Result};
use crate::reservation::{
    AvailabilityKind, AvailableReservation, Reservation, ReservationId, ReservationTarget,
};
use crate::{Interval, ResourceId};

use super::transaction::ReservationTransaction;

/// Handle of an undo checkpoint created by
/// [`SchedulerContextState::create_savepoint`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Savepoint(u64);

impl fmt::Display for Savepoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "savepoint {}", self.0)
    }
}

#[derive(Debug, Clone)]
enum Change {
    ReferencedResourceAdded(ResourceId),
    ReferencedResourceRemoved(ResourceId),
    AllocatedReservationAdded(ReservationId),
    AllocatedReservationRemoved(Reservation),
    AvailableReservationAdded(ReservationId),
    AvailableReservationRemoved(AvailableReservation),
}

#[derive(Debug)]
struct Frame {
    savepoint: Savepoint,
    changes: Vec<Change>,
}

/// Referenced resources, allocated reservations and reservations available
/// for reuse, plus the stack of open savepoints.
///
/// # Examples
///
/// ```
/// use confbook::scheduler::SchedulerContextState;
/// use confbook::ResourceId;
///
/// let mut state = SchedulerContextState::new();
/// state.add_referenced_resource(ResourceId::from(1));
///
/// let savepoint = state.create_savepoint();
/// state.add_referenced_resource(ResourceId::from(2));
/// state.revert(savepoint).unwrap();
///
/// assert_eq!(state.referenced_resources().len(), 1);
/// ```
#[derive(Debug, Default)]
pub struct SchedulerContextState {
    referenced_resources: BTreeSet<ResourceId>,
    allocated_reservations: BTreeMap<ReservationId, Reservation>,
    available_reservations: BTreeMap<ReservationId, AvailableReservation>,
    transaction: ReservationTransaction,
    frames: Vec<Frame>,
    next_savepoint: u64,
}

impl SchedulerContextState {
    /// Creates an empty state without open savepoints.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the resources referenced so far.
    #[must_use]
    pub const fn referenced_resources(&self) -> &BTreeSet<ResourceId> {
        &self.referenced_resources
    }

    /// Checks whether `resource` is referenced.
    #[must_use]
    pub fn contains_referenced_resource(&self, resource: ResourceId) -> bool {
        self.referenced_resources.contains(&resource)
    }

    /// Adds a referenced resource, returning whether it was newly added.
    pub fn add_referenced_resource(&mut self, resource: ResourceId) -> bool {
        let added = self.referenced_resources.insert(resource);
        if added {
            self.record(Change::ReferencedResourceAdded(resource));
        }
        added
    }

    /// Removes a referenced resource, returning whether it was present.
    pub fn remove_referenced_resource(&mut self, resource: ResourceId) -> bool {
        let removed = self.referenced_resources.remove(&resource);
        if removed {
            self.record(Change::ReferencedResourceRemoved(resource));
        }
        removed
    }

    /// Returns the reservations allocated so far, ordered by identifier.
    pub fn allocated_reservations(&self) -> impl Iterator<Item = &Reservation> {
        self.allocated_reservations.values()
    }

    /// Returns the identifiers of the allocated reservations.
    #[must_use]
    pub fn allocated_reservation_ids(&self) -> BTreeSet<ReservationId> {
        self.allocated_reservations.keys().copied().collect()
    }

    /// Returns an allocated reservation.
    #[must_use]
    pub fn allocated_reservation(&self, id: ReservationId) -> Option<&Reservation> {
        self.allocated_reservations.get(&id)
    }

    /// Adds an allocated reservation, returning whether it was newly added.
    ///
    /// Only the reservation itself becomes a member; its children are
    /// members only when added on their own.
    pub fn add_allocated_reservation(&mut self, reservation: Reservation) -> bool {
        if self.allocated_reservations.contains_key(&reservation.id()) {
            return false;
        }
        let id = reservation.id();
        self.insert_allocated(reservation);
        self.record(Change::AllocatedReservationAdded(id));
        true
    }

    /// Removes an allocated reservation.
    pub fn remove_allocated_reservation(&mut self, id: ReservationId) -> Option<Reservation> {
        let reservation = self.take_allocated(id)?;
        self.record(Change::AllocatedReservationRemoved(reservation.clone()));
        Some(reservation)
    }

    /// Returns the reservations available for reuse, ordered by identifier.
    pub fn available_reservations(&self) -> impl Iterator<Item = &AvailableReservation> {
        self.available_reservations.values()
    }

    /// Returns the identifiers of the reservations available for reuse.
    #[must_use]
    pub fn available_reservation_ids(&self) -> BTreeSet<ReservationId> {
        self.available_reservations.keys().copied().collect()
    }

    /// Returns a reservation available for reuse.
    #[must_use]
    pub fn available_reservation(&self, id: ReservationId) -> Option<&AvailableReservation> {
        self.available_reservations.get(&id)
    }

    /// Offers an existing reservation and, recursively, its children for
    /// reuse.
    ///
    /// Adding a reservation which is already available with the same kind
    /// does nothing.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Validation`] when the reservation is already
    /// available with a different kind.
    pub fn add_available_reservation(
        &mut self,
        reservation: &Reservation,
        kind: AvailabilityKind,
    ) -> Result<()> {
        if let Some(existing) = self.available_reservations.get(&reservation.id()) {
            if existing.kind() != kind {
                return Err(Error::Validation {
                    field: "available_reservation".into(),
                    message: format!(
                        "{} is already available as {}",
                        reservation.id(),
                        existing.kind()
                    ),
                });
            }
            return Ok(());
        }

        self.insert_available(AvailableReservation::new(reservation.clone(), kind));
        self.record(Change::AvailableReservationAdded(reservation.id()));

        for child in reservation.children() {
            self.add_available_reservation(child, kind)?;
        }
        Ok(())
    }

    /// Withdraws a reservation from reuse together with its parent chain
    /// and all its children.
    pub fn remove_available_reservation(&mut self, id: ReservationId) {
        self.remove_available_cascading(id, true, true);
    }

    fn remove_available_cascading(&mut self, id: ReservationId, parent: bool, children: bool) {
        let Some(available) = self.take_available(id) else {
            return;
        };
        let reservation = available.reservation().clone();
        self.record(Change::AvailableReservationRemoved(available));

        if parent {
            if let Some(parent_id) = reservation.parent() {
                self.remove_available_cascading(parent_id, true, false);
            }
        }
        if children {
            for child in reservation.children() {
                self.remove_available_cascading(child.id(), false, true);
            }
        }
    }

    /// Returns reservations available for reuse for `target` overlapping
    /// `slot`.
    #[must_use]
    pub fn available_reservations_for(
        &self,
        target: ReservationTarget,
        slot: &Interval,
    ) -> Vec<AvailableReservation> {
        self.transaction
            .available_reservations(target, slot)
            .into_iter()
            .cloned()
            .collect()
    }

    /// Merges this run's reservations for `target` into a persisted list.
    ///
    /// See [`ReservationTransaction::apply_reservations`].
    pub fn apply_reservations(
        &self,
        target: ReservationTarget,
        slot: &Interval,
        reservations: &mut Vec<Reservation>,
    ) {
        self.transaction.apply_reservations(target, slot, reservations);
    }

    /// Opens a new savepoint nested in the current one.
    pub fn create_savepoint(&mut self) -> Savepoint {
        let savepoint = Savepoint(self.next_savepoint);
        self.next_savepoint += 1;
        self.frames.push(Frame {
            savepoint,
            changes: Vec::new(),
        });
        log::trace!("Created {savepoint} at depth {}", self.frames.len());
        savepoint
    }

    /// Returns the innermost open savepoint.
    #[must_use]
    pub fn current_savepoint(&self) -> Option<Savepoint> {
        self.frames.last().map(|frame| frame.savepoint)
    }

    /// Undoes every change made since `savepoint` was created, including
    /// the changes of savepoints nested in it, and closes them all.
    ///
    /// # Errors
    ///
    /// Returns [`Error::SavepointMisuse`] when `savepoint` is not open.
    pub fn revert(&mut self, savepoint: Savepoint) -> Result<()> {
        let index = self.frame_index(savepoint)?;
        while self.frames.len() > index {
            let Some(frame) = self.frames.pop() else {
                break;
            };
            log::trace!("Reverting {} ({} changes)", frame.savepoint, frame.changes.len());
            for change in frame.changes.into_iter().rev() {
                self.undo(change);
            }
        }
        Ok(())
    }

    /// Closes `savepoint` and the savepoints nested in it, keeping their
    /// changes.
    ///
    /// The changes move to the enclosing savepoint, so reverting that one
    /// still undoes them.
    ///
    /// # Errors
    ///
    /// Returns [`Error::SavepointMisuse`] when `savepoint` is not open.
    pub fn release(&mut self, savepoint: Savepoint) -> Result<()> {
        let index = self.frame_index(savepoint)?;
        let released: Vec<Change> = self
            .frames
            .drain(index..)
            .flat_map(|frame| frame.changes)
            .collect();
        if let Some(parent) = self.frames.last_mut() {
            parent.changes.extend(released);
        }
        Ok(())
    }

    fn frame_index(&self, savepoint: Savepoint) -> Result<usize> {
        self.frames
            .iter()
            .position(|frame| frame.savepoint == savepoint)
            .ok_or_else(|| Error::SavepointMisuse {
                details: format!("{savepoint} is not open"),
            })
    }

    fn record(&mut self, change: Change) {
        if let Some(frame) = self.frames.last_mut() {
            frame.changes.push(change);
        }
    }

    fn undo(&mut self, change: Change) {
        match change {
            Change::ReferencedResourceAdded(resource) => {
                self.referenced_resources.remove(&resource);
            }
            Change::ReferencedResourceRemoved(resource) => {
                self.referenced_resources.insert(resource);
            }
            Change::AllocatedReservationAdded(id) => {
                self.take_allocated(id);
            }
            Change::AllocatedReservationRemoved(reservation) => {
                self.insert_allocated(reservation);
            }
            Change::AvailableReservationAdded(id) => {
                self.take_available(id);
            }
            Change::AvailableReservationRemoved(available) => {
                self.insert_available(available);
            }
        }
    }

    fn insert_allocated(&mut self, reservation: Reservation) {
        if let Some(target) = reservation.target() {
            self.transaction
                .add_allocated_reservation(target, reservation.clone());
        }
        self.allocated_reservations.insert(reservation.id(), reservation);
    }

    fn take_allocated(&mut self, id: ReservationId) -> Option<Reservation> {
        let reservation = self.allocated_reservations.remove(&id)?;
        if let Some(target) = reservation.target() {
            self.transaction.remove_allocated_reservation(target, id);
        }
        Some(reservation)
    }

    fn insert_available(&mut self, available: AvailableReservation) {
        if let Some(target) = available.reservation().target() {
            self.transaction
                .add_available_reservation(target, available.clone());
        }
        self.available_reservations.insert(available.id(), available);
    }

    fn take_available(&mut self, id: ReservationId) -> Option<AvailableReservation> {
        let available = self.available_reservations.remove(&id)?;
        if let Some(target) = available.reservation().target() {
            self.transaction.remove_available_reservation(target, id);
        }
        Some(available)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reservation::ReservationKind;
    use chrono::{TimeZone, Utc};

    fn slot() -> Interval {
        Interval::new(
            Utc.with_ymd_and_hms(2012, 1, 1, 0, 0, 0).unwrap(),
            Utc.with_ymd_and_hms(2013, 1, 1, 0, 0, 0).unwrap(),
        )
        .unwrap()
    }

    fn reservation(id: u64) -> Reservation {
        Reservation::new(ReservationId::from(id), slot(), ReservationKind::Set)
    }

    fn ids(values: &[u64]) -> BTreeSet<ReservationId> {
        values.iter().copied().map(ReservationId::from).collect()
    }

    fn resources(values: &[u64]) -> BTreeSet<ResourceId> {
        values.iter().copied().map(ResourceId::from).collect()
    }

    #[test]
    fn test_revert_nested_additions() {
        let mut state = SchedulerContextState::new();
        state.add_referenced_resource(ResourceId::from(1));
        state.add_allocated_reservation(reservation(1));
        state
            .add_available_reservation(&reservation(11), AvailabilityKind::Reusable)
            .unwrap();

        let savepoint1 = state.create_savepoint();
        state.add_referenced_resource(ResourceId::from(2));
        state.add_allocated_reservation(reservation(2));
        state
            .add_available_reservation(&reservation(12), AvailabilityKind::Reusable)
            .unwrap();
        assert_eq!(state.current_savepoint(), Some(savepoint1));

        let savepoint2 = state.create_savepoint();
        state.add_referenced_resource(ResourceId::from(3));
        state.add_allocated_reservation(reservation(3));
        state
            .add_available_reservation(&reservation(13), AvailabilityKind::Reusable)
            .unwrap();
        assert_eq!(state.current_savepoint(), Some(savepoint2));
        assert_eq!(state.referenced_resources(), &resources(&[1, 2, 3]));

        state.revert(savepoint2).unwrap();
        assert_eq!(state.current_savepoint(), Some(savepoint1));
        assert_eq!(state.referenced_resources(), &resources(&[1, 2]));
        assert_eq!(state.allocated_reservation_ids(), ids(&[1, 2]));
        assert_eq!(state.available_reservation_ids(), ids(&[11, 12]));

        state.revert(savepoint1).unwrap();
        assert_eq!(state.current_savepoint(), None);
        assert_eq!(state.referenced_resources(), &resources(&[1]));
        assert_eq!(state.allocated_reservation_ids(), ids(&[1]));
        assert_eq!(state.available_reservation_ids(), ids(&[11]));
    }

    #[test]
    fn test_revert_restores_removed() {
        let mut state = SchedulerContextState::new();
        state.add_referenced_resource(ResourceId::from(1));
        state.add_allocated_reservation(reservation(1));

        let savepoint1 = state.create_savepoint();
        state.add_referenced_resource(ResourceId::from(2));
        state.add_allocated_reservation(reservation(2));
        state
            .add_available_reservation(&reservation(12), AvailabilityKind::Reusable)
            .unwrap();

        let savepoint2 = state.create_savepoint();
        state.remove_referenced_resource(ResourceId::from(2));
        state.remove_allocated_reservation(ReservationId::from(2));
        state.remove_available_reservation(ReservationId::from(12));
        assert_eq!(state.referenced_resources(), &resources(&[1]));

        state.revert(savepoint2).unwrap();
        assert_eq!(state.referenced_resources(), &resources(&[1, 2]));
        assert_eq!(state.allocated_reservation_ids(), ids(&[1, 2]));
        assert_eq!(state.available_reservation_ids(), ids(&[12]));

        state.revert(savepoint1).unwrap();
        assert_eq!(state.referenced_resources(), &resources(&[1]));
        assert_eq!(state.allocated_reservation_ids(), ids(&[1]));
        assert!(state.available_reservation_ids().is_empty());
    }

    #[test]
    fn test_revert_outer_reverts_inner() {
        let mut state = SchedulerContextState::new();
        let outer = state.create_savepoint();
        state.add_referenced_resource(ResourceId::from(1));
        let inner = state.create_savepoint();
        state.add_referenced_resource(ResourceId::from(2));

        state.revert(outer).unwrap();
        assert!(state.referenced_resources().is_empty());
        assert_eq!(state.current_savepoint(), None);

        let err = state.revert(inner).unwrap_err();
        assert!(matches!(err, Error::SavepointMisuse { .. }));
    }

    #[test]
    fn test_re_adding_present_element_is_not_recorded() {
        let mut state = SchedulerContextState::new();
        state.add_referenced_resource(ResourceId::from(1));
        let savepoint = state.create_savepoint();
        assert!(!state.add_referenced_resource(ResourceId::from(1)));
        state.revert(savepoint).unwrap();
        assert!(state.contains_referenced_resource(ResourceId::from(1)));
    }

    #[test]
    fn test_release_keeps_changes_in_parent() {
        let mut state = SchedulerContextState::new();
        let outer = state.create_savepoint();
        let inner = state.create_savepoint();
        state.add_referenced_resource(ResourceId::from(5));
        state.release(inner).unwrap();
        assert_eq!(state.current_savepoint(), Some(outer));
        assert!(state.contains_referenced_resource(ResourceId::from(5)));

        state.revert(outer).unwrap();
        assert!(!state.contains_referenced_resource(ResourceId::from(5)));
    }

    #[test]
    fn test_parent_does_not_duplicate_children() {
        let mut state = SchedulerContextState::new();
        state.add_allocated_reservation(reservation(1));
        state
            .add_available_reservation(&reservation(11), AvailabilityKind::Reusable)
            .unwrap();

        let savepoint = state.create_savepoint();
        let parent = Reservation::builder(ReservationId::from(100), slot(), ReservationKind::Set)
            .child(reservation(1))
            .build()
            .unwrap();
        state.add_allocated_reservation(parent);
        let available_parent =
            Reservation::builder(ReservationId::from(110), slot(), ReservationKind::Set)
                .child(reservation(11))
                .build()
                .unwrap();
        state
            .add_available_reservation(&available_parent, AvailabilityKind::Reusable)
            .unwrap();
        assert_eq!(state.allocated_reservation_ids(), ids(&[1, 100]));
        assert_eq!(state.available_reservation_ids(), ids(&[11, 110]));

        state.revert(savepoint).unwrap();
        assert_eq!(state.allocated_reservation_ids(), ids(&[1]));
        assert_eq!(state.available_reservation_ids(), ids(&[11]));
    }

    #[test]
    fn test_available_kind_conflict() {
        let mut state = SchedulerContextState::new();
        state
            .add_available_reservation(&reservation(1), AvailabilityKind::Reusable)
            .unwrap();
        assert!(state
            .add_available_reservation(&reservation(1), AvailabilityKind::Reusable)
            .is_ok());
        assert!(state
            .add_available_reservation(&reservation(1), AvailabilityKind::Existing)
            .is_err());
    }

    #[test]
    fn test_remove_available_cascades() {
        let mut state = SchedulerContextState::new();
        let tree = Reservation::builder(ReservationId::from(1), slot(), ReservationKind::Set)
            .child(
                Reservation::builder(ReservationId::from(2), slot(), ReservationKind::Set)
                    .child(reservation(3))
                    .build()
                    .unwrap(),
            )
            .child(reservation(4))
            .build()
            .unwrap();
        state
            .add_available_reservation(&tree, AvailabilityKind::Existing)
            .unwrap();
        assert_eq!(state.available_reservation_ids(), ids(&[1, 2, 3, 4]));

        state.remove_available_reservation(ReservationId::from(2));
        assert_eq!(state.available_reservation_ids(), ids(&[4]));
    }
}
