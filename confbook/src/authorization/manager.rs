//! Granting and revoking roles with propagation to dependent objects.

use std::collections::BTreeSet;

use crate::error::{Error, Result};
use crate::reservation::{RequestId, ReservationId, ReservationKind};
use crate::store::ResourceStore;

use super::entry::{
    AclEntry, AclEntryDependency, AclEntryDependencyType, AclEntryFilter, AclEntryId, AclIdentity,
    AclIdentityType, AclObjectClass, AclObjectIdentity, ObjectRole,
};
use super::store::AclStore;

/// Creates and deletes ACL entries on a store that also knows the
/// reservation graph.
///
/// Granting a role on a request propagates it to the request's
/// reservations; a role on a reservation propagates to its children and
/// its executable; a reservation reusing another one grants `READER` on the
/// reused reservation. Derived entries are linked to the entry they came
/// from by an [`AclEntryDependency`], and a derived entry is deleted only
/// when its last parent goes away.
///
/// # Examples
///
/// ```
/// use confbook::authorization::{AclIdentity, AclObjectIdentity, AuthorizationManager, ObjectRole};
/// use confbook::store::InMemoryStore;
/// use confbook::RequestId;
///
/// let mut store = InMemoryStore::new();
/// let mut manager = AuthorizationManager::new(&mut store);
/// let alice = AclIdentity::user("alice");
/// let request = AclObjectIdentity::from(RequestId::from(1));
///
/// let first = manager.create_acl_entry(&alice, request, ObjectRole::Owner).unwrap().unwrap();
/// let again = manager.create_acl_entry(&alice, request, ObjectRole::Owner).unwrap().unwrap();
/// assert_eq!(first.id, again.id);
/// ```
pub struct AuthorizationManager<'a, S: AclStore + ResourceStore> {
    store: &'a mut S,
    administrators: BTreeSet<String>,
}

impl<'a, S: AclStore + ResourceStore> AuthorizationManager<'a, S> {
    /// Creates a manager over `store`.
    #[must_use]
    pub fn new(store: &'a mut S) -> Self {
        Self {
            store,
            administrators: BTreeSet::new(),
        }
    }

    /// Sets the user ids treated as administrators; they are never granted
    /// entries.
    #[must_use]
    pub fn with_administrators<I, T>(mut self, administrators: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        self.administrators = administrators.into_iter().map(Into::into).collect();
        self
    }

    fn is_administrator(&self, identity: &AclIdentity) -> bool {
        identity.kind == AclIdentityType::User && self.administrators.contains(&identity.principal_id)
    }

    /// Grants `role` on `object` to `identity`.
    ///
    /// Returns the existing entry when the same grant already exists and
    /// `None` for administrators.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Validation`] when the object class does not allow the
    /// role, or an error from the store.
    pub fn create_acl_entry(
        &mut self,
        identity: &AclIdentity,
        object: AclObjectIdentity,
        role: ObjectRole,
    ) -> Result<Option<AclEntry>> {
        if self.is_administrator(identity) {
            log::debug!("Not granting {role} on {object} to administrator {identity}");
            return Ok(None);
        }
        if !object.class.allows_role(role) {
            return Err(Error::Validation {
                field: "role".into(),
                message: format!("role {role} is not allowed on {object}"),
            });
        }

        let (entry, created) = self.store.create_acl_entry(identity, &object, role)?;
        if created {
            log::info!(
                "ACL entry created (id: {}, identity: {}, object: {}, role: {})",
                entry.id,
                entry.identity,
                entry.object,
                entry.role
            );
            self.propagate(&entry)?;
        }
        Ok(Some(entry))
    }

    /// Grants `role` on `object` as derived from `parent`.
    ///
    /// # Errors
    ///
    /// Same as [`AuthorizationManager::create_acl_entry`].
    pub fn create_child_acl_entry(
        &mut self,
        parent: &AclEntry,
        identity: &AclIdentity,
        object: AclObjectIdentity,
        role: ObjectRole,
        kind: AclEntryDependencyType,
    ) -> Result<Option<AclEntry>> {
        let Some(child) = self.create_acl_entry(identity, object, role)? else {
            return Ok(None);
        };
        let dependency = AclEntryDependency {
            parent: parent.id,
            child: child.id,
            kind,
        };
        if self.store.create_acl_dependency(&dependency)? {
            log::info!(
                "ACL dependency created (parent: {}, child: {}, type: {})",
                parent.id,
                child.id,
                kind
            );
        }
        Ok(Some(child))
    }

    /// Copies every grant on `parent` onto `child`, mapped the same way as
    /// when the grant propagates at creation time.
    ///
    /// Used when an object is attached to an already shared one, e.g. a
    /// reservation newly allocated for a request.
    ///
    /// # Errors
    ///
    /// Returns an error from the store.
    pub fn create_acl_entries_for_child_object(
        &mut self,
        parent: AclObjectIdentity,
        child: AclObjectIdentity,
    ) -> Result<()> {
        let entries = self.store.list_acl_entries(&AclEntryFilter {
            object: Some(parent),
            ..AclEntryFilter::default()
        })?;
        for entry in entries {
            if let Some(role) = derived_role(parent.class, entry.role, child.class) {
                self.create_child_acl_entry(
                    &entry,
                    &entry.identity,
                    child,
                    role,
                    AclEntryDependencyType::DeleteDetach,
                )?;
            }
        }
        Ok(())
    }

    /// Deletes an entry together with the entries derived from it that no
    /// other entry still derives.
    ///
    /// # Errors
    ///
    /// Returns [`Error::AclEntryReferenced`] when the entry is itself derived
    /// from other entries, [`Error::NotFound`] when it does not exist, or an
    /// error from the store.
    pub fn delete_entry(&mut self, id: AclEntryId) -> Result<()> {
        self.delete(id, false)
    }

    /// Deletes every entry on `object`, e.g. because the object is deleted.
    ///
    /// Entries derived with [`AclEntryDependencyType::DeleteDetach`] survive.
    ///
    /// # Errors
    ///
    /// Returns an error from the store.
    pub fn delete_acl_entries_for_object(&mut self, object: AclObjectIdentity) -> Result<()> {
        let entries = self.store.list_acl_entries(&AclEntryFilter {
            object: Some(object),
            ..AclEntryFilter::default()
        })?;
        for entry in entries {
            // may already be gone as a cascade of an earlier one
            if self.store.acl_entry(entry.id)?.is_some() {
                self.delete(entry.id, true)?;
            }
        }
        Ok(())
    }

    /// Lists entries matching the given criteria.
    ///
    /// # Errors
    ///
    /// Returns an error from the store.
    pub fn list_acl_entries(
        &self,
        identity: Option<&AclIdentity>,
        object: Option<AclObjectIdentity>,
        role: Option<ObjectRole>,
    ) -> Result<Vec<AclEntry>> {
        self.store.list_acl_entries(&AclEntryFilter {
            identity: identity.cloned(),
            object,
            role,
        })
    }

    fn delete(&mut self, id: AclEntryId, detach_children: bool) -> Result<()> {
        let entry = self.store.acl_entry(id)?.ok_or_else(|| Error::NotFound {
            resource: format!("ACL entry {id}"),
        })?;

        let parents = self.store.acl_dependencies_of_child(id)?;
        if !parents.is_empty() {
            if !detach_children {
                return Err(Error::AclEntryReferenced {
                    id: id.value(),
                    parents: parents.len(),
                });
            }
            for dependency in &parents {
                self.store.delete_acl_dependency(dependency.parent, id)?;
            }
        }

        for dependency in self.store.acl_dependencies_of_parent(id)? {
            self.store.delete_acl_dependency(id, dependency.child)?;
            if detach_children && dependency.kind == AclEntryDependencyType::DeleteDetach {
                continue;
            }
            match self.delete(dependency.child, false) {
                Ok(()) => {}
                Err(Error::AclEntryReferenced { id, .. }) => {
                    log::info!("ACL entry (id: {id}) cannot be deleted, because it is referenced");
                }
                Err(err) => return Err(err),
            }
        }

        self.store.delete_acl_entry(id)?;
        log::info!(
            "ACL entry deleted (id: {}, identity: {}, object: {}, role: {})",
            entry.id,
            entry.identity,
            entry.object,
            entry.role
        );
        Ok(())
    }

    fn propagate(&mut self, entry: &AclEntry) -> Result<()> {
        match entry.object.class {
            AclObjectClass::ReservationRequest => {
                let request = RequestId::from(entry.object.object_id);
                let Some(role) = derived_role(
                    AclObjectClass::ReservationRequest,
                    entry.role,
                    AclObjectClass::Reservation,
                ) else {
                    return Ok(());
                };
                for reservation in self.store.reservations_of_request(request)? {
                    self.create_child_acl_entry(
                        entry,
                        &entry.identity,
                        reservation.id().into(),
                        role,
                        AclEntryDependencyType::DeleteDetach,
                    )?;
                }
            }
            AclObjectClass::Reservation => {
                let id = ReservationId::from(entry.object.object_id);
                let Some(reservation) = self.store.reservation(id)? else {
                    return Ok(());
                };
                let class = AclObjectClass::Reservation;
                if let Some(role) = derived_role(class, entry.role, AclObjectClass::Reservation) {
                    for child in reservation.children() {
                        self.create_child_acl_entry(
                            entry,
                            &entry.identity,
                            child.id().into(),
                            role,
                            AclEntryDependencyType::DeleteDetach,
                        )?;
                    }
                }
                if let Some(executable) = reservation.executable() {
                    if let Some(role) = derived_role(class, entry.role, AclObjectClass::Executable) {
                        self.create_child_acl_entry(
                            entry,
                            &entry.identity,
                            executable.into(),
                            role,
                            AclEntryDependencyType::DeleteDetach,
                        )?;
                    }
                }
                if let ReservationKind::Existing { reused } = reservation.kind() {
                    self.create_child_acl_entry(
                        entry,
                        &entry.identity,
                        (*reused).into(),
                        ObjectRole::Reader,
                        AclEntryDependencyType::DeleteCascade,
                    )?;
                }
            }
            AclObjectClass::Executable | AclObjectClass::Resource => {}
        }
        Ok(())
    }
}

/// Role granted on a `child` object derived from a `role` on its parent.
///
/// Request users read the reservations of their request.
const fn derived_role(
    parent: AclObjectClass,
    role: ObjectRole,
    child: AclObjectClass,
) -> Option<ObjectRole> {
    if child.allows_role(role) {
        Some(role)
    } else if matches!(parent, AclObjectClass::ReservationRequest)
        && matches!(role, ObjectRole::ReservationRequestUser)
    {
        Some(ObjectRole::Reader)
    } else {
        None
    }
}
