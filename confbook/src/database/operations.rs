//! Resource and reservation queries.
//!
//! The [`ResourceStore`] implementation of [`Database`] lives here; writes
//! that must be atomic are in the transaction module.

use std::collections::BTreeMap;

use rusqlite::{params, OptionalExtension};

use crate::error::Result;
use crate::reservation::{RequestId, Reservation, ReservationId, ReservationTarget};
use crate::resource::{Resource, ResourceId};
use crate::store::ResourceStore;
use crate::Interval;

use super::connection::Database;
use super::schema::INSERT_RESOURCE;

const SELECT_RESOURCE: &str = "SELECT payload FROM resources WHERE id = ?";

const SELECT_ALL_RESOURCES: &str = "SELECT payload FROM resources ORDER BY id";

const DELETE_RESOURCE: &str = "DELETE FROM resources WHERE id = ?";

const SELECT_TREE: &str = "SELECT payload FROM reservations WHERE id = ? AND parent_id IS NULL";

const SELECT_ROOT_OF: &str = "SELECT root_id FROM reservations WHERE id = ?";

const SELECT_ROOTS: &str = "SELECT payload FROM reservations WHERE parent_id IS NULL ORDER BY id";

const SELECT_ROOTS_OF_REQUEST: &str = r"
    SELECT payload FROM reservations
    WHERE request_id = ? AND parent_id IS NULL
    ORDER BY id
";

const SELECT_OVERLAPPING: &str = r"
    SELECT id, root_id FROM reservations
    WHERE target_type = ? AND target_id = ? AND slot_start < ? AND slot_end > ?
    ORDER BY id
";

/// Converts an interval to millisecond bounds for storage.
pub(super) fn slot_bounds(slot: &Interval) -> (i64, i64) {
    (slot.start().timestamp_millis(), slot.end().timestamp_millis())
}

impl Database {
    /// Inserts or replaces a resource.
    ///
    /// # Errors
    ///
    /// Returns an error if the resource cannot be serialized or stored.
    ///
    /// # Examples
    ///
    /// ```
    /// use confbook::database::{Database, DatabaseConfig};
    /// use confbook::resource::Resource;
    /// use confbook::store::ResourceStore;
    /// use confbook::ResourceId;
    ///
    /// let dir = tempfile::tempdir().unwrap();
    /// let mut db = Database::open(DatabaseConfig::new(dir.path().join("confbook.db"))).unwrap();
    /// db.save_resource(&Resource::new(ResourceId::from(1), "mcu")).unwrap();
    /// assert_eq!(db.resources().unwrap().len(), 1);
    /// ```
    pub fn save_resource(&mut self, resource: &Resource) -> Result<()> {
        let payload = serde_json::to_string(resource)?;
        self.conn.execute(
            INSERT_RESOURCE,
            params![resource.id.value(), resource.name, resource.allocatable, payload],
        )?;
        log::debug!("Saved resource {}", resource.id);
        Ok(())
    }

    /// Deletes a resource; returns whether it existed.
    ///
    /// # Errors
    ///
    /// Returns an error if the delete fails.
    pub fn delete_resource(&mut self, id: ResourceId) -> Result<bool> {
        let changed = self.conn.execute(DELETE_RESOURCE, params![id.value()])?;
        Ok(changed > 0)
    }

    /// Returns every persisted root reservation ordered by identifier.
    ///
    /// # Errors
    ///
    /// Returns an error if a query or deserialization fails.
    pub fn list_root_reservations(&self) -> Result<Vec<Reservation>> {
        self.query_trees(SELECT_ROOTS, params![])
    }

    fn query_trees(&self, sql: &str, params: &[&dyn rusqlite::ToSql]) -> Result<Vec<Reservation>> {
        let mut stmt = self.conn.prepare(sql)?;
        let payloads = stmt
            .query_map(params, |row| row.get::<_, String>(0))?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        let mut trees = Vec::with_capacity(payloads.len());
        for payload in &payloads {
            trees.push(serde_json::from_str(payload)?);
        }
        Ok(trees)
    }

    fn load_tree(&self, root: ReservationId) -> Result<Option<Reservation>> {
        let payload: Option<String> = self
            .conn
            .query_row(SELECT_TREE, params![root.value()], |row| row.get(0))
            .optional()?;
        payload
            .map(|payload| serde_json::from_str(&payload))
            .transpose()
            .map_err(Into::into)
    }

    fn root_of(&self, id: ReservationId) -> Result<Option<ReservationId>> {
        let root: Option<u64> = self
            .conn
            .query_row(SELECT_ROOT_OF, params![id.value()], |row| row.get(0))
            .optional()?;
        Ok(root.map(ReservationId::from))
    }
}

impl ResourceStore for Database {
    fn resource(&self, id: ResourceId) -> Result<Option<Resource>> {
        let payload: Option<String> = self
            .conn
            .query_row(SELECT_RESOURCE, params![id.value()], |row| row.get(0))
            .optional()?;
        payload
            .map(|payload| serde_json::from_str(&payload))
            .transpose()
            .map_err(Into::into)
    }

    fn resources(&self) -> Result<Vec<Resource>> {
        let mut stmt = self.conn.prepare(SELECT_ALL_RESOURCES)?;
        let payloads = stmt
            .query_map([], |row| row.get::<_, String>(0))?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        let mut resources = Vec::with_capacity(payloads.len());
        for payload in &payloads {
            resources.push(serde_json::from_str(payload)?);
        }
        Ok(resources)
    }

    fn list_reservations(&self, target: ReservationTarget, slot: &Interval) -> Result<Vec<Reservation>> {
        let (category, target_id) = target.as_parts();
        let (start, end) = slot_bounds(slot);
        let mut stmt = self.conn.prepare(SELECT_OVERLAPPING)?;
        let rows = stmt
            .query_map(params![category, target_id, end, start], |row| {
                Ok((row.get::<_, u64>(0)?, row.get::<_, u64>(1)?))
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        let mut trees: BTreeMap<ReservationId, Reservation> = BTreeMap::new();
        let mut found = Vec::with_capacity(rows.len());
        for (id, root) in rows {
            let root = ReservationId::from(root);
            if !trees.contains_key(&root) {
                if let Some(tree) = self.load_tree(root)? {
                    trees.insert(root, tree);
                }
            }
            if let Some(node) = trees.get(&root).and_then(|tree| tree.find(ReservationId::from(id))) {
                found.push(node.clone());
            }
        }
        Ok(found)
    }

    fn reservation(&self, id: ReservationId) -> Result<Option<Reservation>> {
        let Some(root) = self.root_of(id)? else {
            return Ok(None);
        };
        Ok(self.load_tree(root)?.and_then(|tree| tree.find(id).cloned()))
    }

    fn reservations_of_request(&self, request: RequestId) -> Result<Vec<Reservation>> {
        self.query_trees(SELECT_ROOTS_OF_REQUEST, params![request.value()])
    }
}
