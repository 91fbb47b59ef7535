//! Allocation of independent child specifications.

use crate::error::Result;
use crate::reservation::{Reservation, ReservationKind};
use crate::scheduler::specification::Specification;

use super::TaskScope;

/// Allocates every child inside its own savepoint.
///
/// A failing child reverts only its own savepoint before the failure is
/// reported; the savepoints of the children allocated before it are
/// released into the caller's savepoint.
pub(super) fn allocate(scope: &mut TaskScope<'_, '_>, children: &[Specification]) -> Result<Reservation> {
    let mut reservation = scope.new_reservation(ReservationKind::Set);
    for child in children {
        let savepoint = scope.context.create_savepoint();
        match scope.perform_child(child.clone()) {
            Ok(allocated) => {
                scope.context.release(savepoint)?;
                reservation.add_child(allocated)?;
            }
            Err(err) => {
                scope.context.revert(savepoint)?;
                return Err(err);
            }
        }
    }
    Ok(reservation)
}
