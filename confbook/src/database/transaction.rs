//! Writes that must be atomic.
//!
//! A reservation tree is stored as one row per node plus the serialized
//! tree on the root row; all of it is replaced in a single IMMEDIATE
//! transaction.

use rusqlite::params;

use crate::error::{Error, Result};
use crate::reservation::{RequestId, Reservation, ReservationId};
use crate::resource::Resource;
use crate::store::ReservationRepository;

use super::connection::Database;
use super::operations::slot_bounds;
use super::schema::{DELETE_RESERVATION_TREE, INSERT_RESERVATION, INSERT_RESOURCE};

const SELECT_IS_ROOT: &str = "SELECT COUNT(*) FROM reservations WHERE id = ? AND parent_id IS NULL";

const DELETE_NODES: &str = "DELETE FROM reservations WHERE id = ?";

impl Database {
    /// Inserts or replaces multiple resources in a single transaction.
    ///
    /// # Errors
    ///
    /// Returns an error if the transaction cannot be started, a resource
    /// cannot be serialized or stored, or the commit fails.
    pub fn save_resources(&mut self, resources: &[Resource]) -> Result<()> {
        let tx = self.begin_immediate()?;

        {
            let mut stmt = tx.prepare(INSERT_RESOURCE)?;
            for resource in resources {
                let payload = serde_json::to_string(resource)?;
                stmt.execute(params![
                    resource.id.value(),
                    resource.name,
                    resource.allocatable,
                    payload
                ])?;
            }
        }

        tx.commit()?;
        Ok(())
    }
}

impl ReservationRepository for Database {
    fn save_reservation(&mut self, reservation: &Reservation) -> Result<()> {
        let root = reservation.id();
        let tree = serde_json::to_string(reservation)?;

        let tx = self.begin_immediate()?;

        {
            tx.execute(DELETE_RESERVATION_TREE, params![root.value()])?;
            let mut delete = tx.prepare(DELETE_NODES)?;
            let mut insert = tx.prepare(INSERT_RESERVATION)?;
            for node in reservation.iter_tree() {
                // a node may previously have been stored under another root
                delete.execute(params![node.id().value()])?;

                let (target_type, target_id) = node.target().map(|t| t.as_parts()).unzip();
                let (slot_start, slot_end) = slot_bounds(node.slot());
                let payload = (node.id() == root).then(|| tree.as_str());
                insert.execute(params![
                    node.id().value(),
                    root.value(),
                    node.parent().map(ReservationId::value),
                    node.request().map(RequestId::value),
                    node.kind().name(),
                    target_type,
                    target_id,
                    slot_start,
                    slot_end,
                    payload,
                ])?;
            }
        }

        tx.commit()?;
        log::debug!("Saved reservation tree {root}");
        Ok(())
    }

    fn delete_reservation(&mut self, id: ReservationId) -> Result<()> {
        let tx = self.begin_immediate()?;

        let is_root: i64 = tx.query_row(SELECT_IS_ROOT, params![id.value()], |row| row.get(0))?;
        if is_root == 0 {
            return Err(Error::NotFound {
                resource: format!("reservation {id}"),
            });
        }
        tx.execute(DELETE_RESERVATION_TREE, params![id.value()])?;

        tx.commit()?;
        log::debug!("Deleted reservation tree {id}");
        Ok(())
    }
}
