//! Persistence of ACL entries and their dependencies.

use std::collections::BTreeMap;

use crate::error::{Error, Result};

use super::entry::{
    AclEntry, AclEntryDependency, AclEntryFilter, AclEntryId, AclIdentity, AclObjectIdentity,
    ObjectRole,
};

/// Storage of ACL entries.
///
/// Implementations keep at most one entry per (identity, object, role)
/// triple; [`AclStore::create_acl_entry`] returns the existing entry instead
/// of inserting a duplicate.
pub trait AclStore {
    /// Returns an entry by identifier.
    ///
    /// # Errors
    ///
    /// Returns an error when the backing store fails.
    fn acl_entry(&self, id: AclEntryId) -> Result<Option<AclEntry>>;

    /// Returns the entry for a triple, if any.
    ///
    /// # Errors
    ///
    /// Returns an error when the backing store fails.
    fn find_acl_entry(
        &self,
        identity: &AclIdentity,
        object: &AclObjectIdentity,
        role: ObjectRole,
    ) -> Result<Option<AclEntry>>;

    /// Creates the entry for a triple unless it exists.
    ///
    /// Returns the entry and whether it was created by this call.
    ///
    /// # Errors
    ///
    /// Returns an error when the backing store fails.
    fn create_acl_entry(
        &mut self,
        identity: &AclIdentity,
        object: &AclObjectIdentity,
        role: ObjectRole,
    ) -> Result<(AclEntry, bool)>;

    /// Deletes an entry.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] when no such entry exists.
    fn delete_acl_entry(&mut self, id: AclEntryId) -> Result<()>;

    /// Returns entries matching `filter` ordered by identifier.
    ///
    /// # Errors
    ///
    /// Returns an error when the backing store fails.
    fn list_acl_entries(&self, filter: &AclEntryFilter) -> Result<Vec<AclEntry>>;

    /// Records a dependency unless the same (parent, child) pair exists.
    ///
    /// Returns whether it was created by this call.
    ///
    /// # Errors
    ///
    /// Returns an error when the backing store fails.
    fn create_acl_dependency(&mut self, dependency: &AclEntryDependency) -> Result<bool>;

    /// Removes the dependency between `parent` and `child`.
    ///
    /// # Errors
    ///
    /// Returns an error when the backing store fails.
    fn delete_acl_dependency(&mut self, parent: AclEntryId, child: AclEntryId) -> Result<()>;

    /// Returns the dependencies in which `child` is the derived entry.
    ///
    /// # Errors
    ///
    /// Returns an error when the backing store fails.
    fn acl_dependencies_of_child(&self, child: AclEntryId) -> Result<Vec<AclEntryDependency>>;

    /// Returns the dependencies in which `parent` is the source entry.
    ///
    /// # Errors
    ///
    /// Returns an error when the backing store fails.
    fn acl_dependencies_of_parent(&self, parent: AclEntryId) -> Result<Vec<AclEntryDependency>>;
}

/// In-memory ACL tables.
#[derive(Debug, Clone, Default)]
pub struct AclTables {
    entries: BTreeMap<AclEntryId, AclEntry>,
    dependencies: Vec<AclEntryDependency>,
    last_id: u64,
}

impl AclTables {
    /// Creates empty tables.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl AclStore for AclTables {
    fn acl_entry(&self, id: AclEntryId) -> Result<Option<AclEntry>> {
        Ok(self.entries.get(&id).cloned())
    }

    fn find_acl_entry(
        &self,
        identity: &AclIdentity,
        object: &AclObjectIdentity,
        role: ObjectRole,
    ) -> Result<Option<AclEntry>> {
        Ok(self
            .entries
            .values()
            .find(|e| e.identity == *identity && e.object == *object && e.role == role)
            .cloned())
    }

    fn create_acl_entry(
        &mut self,
        identity: &AclIdentity,
        object: &AclObjectIdentity,
        role: ObjectRole,
    ) -> Result<(AclEntry, bool)> {
        if let Some(existing) = self.find_acl_entry(identity, object, role)? {
            return Ok((existing, false));
        }
        self.last_id += 1;
        let entry = AclEntry {
            id: AclEntryId::from(self.last_id),
            identity: identity.clone(),
            object: *object,
            role,
        };
        self.entries.insert(entry.id, entry.clone());
        Ok((entry, true))
    }

    fn delete_acl_entry(&mut self, id: AclEntryId) -> Result<()> {
        self.entries
            .remove(&id)
            .map(|_| ())
            .ok_or_else(|| Error::NotFound {
                resource: format!("ACL entry {id}"),
            })
    }

    fn list_acl_entries(&self, filter: &AclEntryFilter) -> Result<Vec<AclEntry>> {
        Ok(self
            .entries
            .values()
            .filter(|e| filter.matches(e))
            .cloned()
            .collect())
    }

    fn create_acl_dependency(&mut self, dependency: &AclEntryDependency) -> Result<bool> {
        let exists = self
            .dependencies
            .iter()
            .any(|d| d.parent == dependency.parent && d.child == dependency.child);
        if !exists {
            self.dependencies.push(*dependency);
        }
        Ok(!exists)
    }

    fn delete_acl_dependency(&mut self, parent: AclEntryId, child: AclEntryId) -> Result<()> {
        self.dependencies
            .retain(|d| !(d.parent == parent && d.child == child));
        Ok(())
    }

    fn acl_dependencies_of_child(&self, child: AclEntryId) -> Result<Vec<AclEntryDependency>> {
        Ok(self
            .dependencies
            .iter()
            .filter(|d| d.child == child)
            .copied()
            .collect())
    }

    fn acl_dependencies_of_parent(&self, parent: AclEntryId) -> Result<Vec<AclEntryDependency>> {
        Ok(self
            .dependencies
            .iter()
            .filter(|d| d.parent == parent)
            .copied()
            .collect())
    }
}
