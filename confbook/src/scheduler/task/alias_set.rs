//! Allocation of several aliases at once.

use crate::error::Result;
use crate::reservation::{Reservation, ReservationKind};
use crate::scheduler::specification::{AliasSpecification, Specification};

use super::TaskScope;

pub(super) fn allocate(
    scope: &mut TaskScope<'_, '_>,
    aliases: &[AliasSpecification],
) -> Result<Reservation> {
    let mut reservation = scope.new_reservation(ReservationKind::Set);
    for alias in aliases {
        let child = scope.perform_child(Specification::Alias(alias.clone()))?;
        reservation.add_child(child)?;
    }
    Ok(reservation)
}
