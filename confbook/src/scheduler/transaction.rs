//! Per-target index of the reservations touched by a scheduling run.

use std::collections::BTreeMap;

use crate::reservation::{AvailableReservation, Reservation, ReservationId, ReservationTarget};
use crate::Interval;

/// Reservations allocated or offered for reuse during one scheduling run,
/// grouped by the object they occupy.
///
/// Persisted reservations loaded from the store do not know about the
/// scheduling run; [`ReservationTransaction::apply_reservations`] merges the
/// run's view into such a list.
#[derive(Debug, Clone, Default)]
pub struct ReservationTransaction {
    allocated: BTreeMap<ReservationTarget, BTreeMap<ReservationId, Reservation>>,
    available: BTreeMap<ReservationTarget, BTreeMap<ReservationId, AvailableReservation>>,
}

impl ReservationTransaction {
    /// Creates an empty transaction.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a reservation allocated for `target`.
    pub fn add_allocated_reservation(&mut self, target: ReservationTarget, reservation: Reservation) {
        self.allocated
            .entry(target)
            .or_default()
            .insert(reservation.id(), reservation);
    }

    /// Forgets an allocated reservation.
    pub fn remove_allocated_reservation(&mut self, target: ReservationTarget, id: ReservationId) {
        if let Some(reservations) = self.allocated.get_mut(&target) {
            reservations.remove(&id);
        }
    }

    /// Records a reservation offered for reuse for `target`.
    pub fn add_available_reservation(
        &mut self,
        target: ReservationTarget,
        available: AvailableReservation,
    ) {
        self.available
            .entry(target)
            .or_default()
            .insert(available.id(), available);
    }

    /// Forgets a reservation offered for reuse.
    pub fn remove_available_reservation(&mut self, target: ReservationTarget, id: ReservationId) {
        if let Some(reservations) = self.available.get_mut(&target) {
            reservations.remove(&id);
        }
    }

    /// Returns reservations offered for reuse for `target` whose slot
    /// overlaps `slot`, ordered by identifier.
    #[must_use]
    pub fn available_reservations(
        &self,
        target: ReservationTarget,
        slot: &Interval,
    ) -> Vec<&AvailableReservation> {
        self.available
            .get(&target)
            .into_iter()
            .flat_map(BTreeMap::values)
            .filter(|available| available.reservation().slot().overlaps(slot))
            .collect()
    }

    /// Returns reservations allocated for `target` whose slot overlaps
    /// `slot`, ordered by identifier.
    #[must_use]
    pub fn allocated_reservations(&self, target: ReservationTarget, slot: &Interval) -> Vec<&Reservation> {
        self.allocated
            .get(&target)
            .into_iter()
            .flat_map(BTreeMap::values)
            .filter(|reservation| reservation.slot().overlaps(slot))
            .collect()
    }

    /// Merges this run's view of `target` into persisted `reservations`.
    ///
    /// Reservations offered for reuse are being reallocated, so they are
    /// removed from the list; reservations allocated by this run overlapping
    /// `slot` are added.
    pub fn apply_reservations(
        &self,
        target: ReservationTarget,
        slot: &Interval,
        reservations: &mut Vec<Reservation>,
    ) {
        let reallocated: Vec<ReservationId> = self
            .available_reservations(target, slot)
            .into_iter()
            .map(AvailableReservation::id)
            .collect();
        reservations.retain(|reservation| !reallocated.contains(&reservation.id()));

        for reservation in self.allocated_reservations(target, slot) {
            if !reservations.iter().any(|r| r.id() == reservation.id()) {
                reservations.push(reservation.clone());
            }
        }
    }

    /// Removes everything.
    pub fn clear(&mut self) {
        self.allocated.clear();
        self.available.clear();
    }
}
