//! ACL persistence.

use rusqlite::{params, OptionalExtension, Row};

use crate::authorization::{
    AclEntry, AclEntryDependency, AclEntryFilter, AclEntryId, AclIdentity, AclObjectIdentity,
    AclStore, ObjectRole,
};
use crate::error::{Error, Result};

use super::connection::Database;

const ENTRY_COLUMNS: &str = "id, identity_type, principal_id, class_name, object_id, role";

const INSERT_ENTRY: &str = r"
    INSERT INTO acl_entries (identity_type, principal_id, class_name, object_id, role)
    VALUES (?, ?, ?, ?, ?)
";

const DELETE_ENTRY: &str = "DELETE FROM acl_entries WHERE id = ?";

const INSERT_DEPENDENCY: &str = r"
    INSERT OR IGNORE INTO acl_entry_dependencies (parent_id, child_id, type)
    VALUES (?, ?, ?)
";

const DELETE_DEPENDENCY: &str =
    "DELETE FROM acl_entry_dependencies WHERE parent_id = ? AND child_id = ?";

const SELECT_DEPENDENCIES_OF_CHILD: &str =
    "SELECT parent_id, child_id, type FROM acl_entry_dependencies WHERE child_id = ? ORDER BY parent_id";

const SELECT_DEPENDENCIES_OF_PARENT: &str =
    "SELECT parent_id, child_id, type FROM acl_entry_dependencies WHERE parent_id = ? ORDER BY child_id";

fn conversion_error(err: Error) -> rusqlite::Error {
    rusqlite::Error::ToSqlConversionFailure(Box::new(err))
}

fn row_to_entry(row: &Row<'_>) -> rusqlite::Result<AclEntry> {
    let id: u64 = row.get(0)?;
    let identity_type: String = row.get(1)?;
    let principal_id: String = row.get(2)?;
    let class_name: String = row.get(3)?;
    let object_id: u64 = row.get(4)?;
    let role: String = row.get(5)?;

    Ok(AclEntry {
        id: AclEntryId::from(id),
        identity: AclIdentity {
            kind: identity_type.parse().map_err(conversion_error)?,
            principal_id,
        },
        object: AclObjectIdentity::new(class_name.parse().map_err(conversion_error)?, object_id),
        role: role.parse().map_err(conversion_error)?,
    })
}

fn row_to_dependency(row: &Row<'_>) -> rusqlite::Result<AclEntryDependency> {
    let parent: u64 = row.get(0)?;
    let child: u64 = row.get(1)?;
    let kind: String = row.get(2)?;
    Ok(AclEntryDependency {
        parent: AclEntryId::from(parent),
        child: AclEntryId::from(child),
        kind: kind.parse().map_err(conversion_error)?,
    })
}

fn find_entry(
    conn: &rusqlite::Connection,
    identity: &AclIdentity,
    object: &AclObjectIdentity,
    role: ObjectRole,
) -> Result<Option<AclEntry>> {
    let sql = format!(
        "SELECT {ENTRY_COLUMNS} FROM acl_entries \
         WHERE identity_type = ? AND principal_id = ? AND class_name = ? AND object_id = ? AND role = ?"
    );
    Ok(conn
        .query_row(
            &sql,
            params![
                identity.kind.as_str(),
                identity.principal_id,
                object.class.as_str(),
                object.object_id,
                role.as_str()
            ],
            row_to_entry,
        )
        .optional()?)
}

impl Database {
    fn query_dependencies(&self, sql: &str, id: AclEntryId) -> Result<Vec<AclEntryDependency>> {
        let mut stmt = self.conn.prepare(sql)?;
        let dependencies = stmt
            .query_map(params![id.value()], row_to_dependency)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(dependencies)
    }
}

impl AclStore for Database {
    fn acl_entry(&self, id: AclEntryId) -> Result<Option<AclEntry>> {
        let sql = format!("SELECT {ENTRY_COLUMNS} FROM acl_entries WHERE id = ?");
        Ok(self
            .conn
            .query_row(&sql, params![id.value()], row_to_entry)
            .optional()?)
    }

    fn find_acl_entry(
        &self,
        identity: &AclIdentity,
        object: &AclObjectIdentity,
        role: ObjectRole,
    ) -> Result<Option<AclEntry>> {
        find_entry(&self.conn, identity, object, role)
    }

    fn create_acl_entry(
        &mut self,
        identity: &AclIdentity,
        object: &AclObjectIdentity,
        role: ObjectRole,
    ) -> Result<(AclEntry, bool)> {
        let tx = self.begin_immediate()?;

        if let Some(existing) = find_entry(&tx, identity, object, role)? {
            return Ok((existing, false));
        }
        tx.execute(
            INSERT_ENTRY,
            params![
                identity.kind.as_str(),
                identity.principal_id,
                object.class.as_str(),
                object.object_id,
                role.as_str()
            ],
        )?;
        let id = u64::try_from(tx.last_insert_rowid()).map_err(|e| Error::Validation {
            field: "acl_entries.id".into(),
            message: e.to_string(),
        })?;

        tx.commit()?;
        Ok((
            AclEntry {
                id: AclEntryId::from(id),
                identity: identity.clone(),
                object: *object,
                role,
            },
            true,
        ))
    }

    fn delete_acl_entry(&mut self, id: AclEntryId) -> Result<()> {
        let changed = self.conn.execute(DELETE_ENTRY, params![id.value()])?;
        if changed == 0 {
            return Err(Error::NotFound {
                resource: format!("ACL entry {id}"),
            });
        }
        Ok(())
    }

    fn list_acl_entries(&self, filter: &AclEntryFilter) -> Result<Vec<AclEntry>> {
        let sql = format!("SELECT {ENTRY_COLUMNS} FROM acl_entries ORDER BY id");
        let mut stmt = self.conn.prepare(&sql)?;
        let entries = stmt
            .query_map([], row_to_entry)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(entries.into_iter().filter(|e| filter.matches(e)).collect())
    }

    fn create_acl_dependency(&mut self, dependency: &AclEntryDependency) -> Result<bool> {
        let changed = self.conn.execute(
            INSERT_DEPENDENCY,
            params![
                dependency.parent.value(),
                dependency.child.value(),
                dependency.kind.as_str()
            ],
        )?;
        Ok(changed > 0)
    }

    fn delete_acl_dependency(&mut self, parent: AclEntryId, child: AclEntryId) -> Result<()> {
        self.conn
            .execute(DELETE_DEPENDENCY, params![parent.value(), child.value()])?;
        Ok(())
    }

    fn acl_dependencies_of_child(&self, child: AclEntryId) -> Result<Vec<AclEntryDependency>> {
        self.query_dependencies(SELECT_DEPENDENCIES_OF_CHILD, child)
    }

    fn acl_dependencies_of_parent(&self, parent: AclEntryId) -> Result<Vec<AclEntryDependency>> {
        self.query_dependencies(SELECT_DEPENDENCIES_OF_PARENT, parent)
    }
}
