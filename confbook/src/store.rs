//! Query and command interfaces of the resource store.
//!
//! The scheduler only reads through [`ResourceStore`]; decided reservations
//! are written back through [`ReservationRepository`]. [`InMemoryStore`]
//! implements both (and [`AclStore`]) for tests and embedding; the SQLite
//! adapter in [`crate::database`] is the persistent implementation.

use std::collections::BTreeMap;

use crate::authorization::{
    AclEntry, AclEntryDependency, AclEntryFilter, AclEntryId, AclIdentity, AclObjectIdentity,
    AclStore, AclTables, ObjectRole,
};
use crate::error::{Error, Result};
use crate::reservation::{RequestId, Reservation, ReservationId, ReservationTarget};
use crate::resource::{AliasType, Resource, ResourceId, TechnologySet};
use crate::Interval;

/// Read access to resources and persisted reservations.
pub trait ResourceStore {
    /// Returns a resource by identifier.
    ///
    /// # Errors
    ///
    /// Returns an error when the backing store fails.
    fn resource(&self, id: ResourceId) -> Result<Option<Resource>>;

    /// Returns every resource ordered by identifier.
    ///
    /// # Errors
    ///
    /// Returns an error when the backing store fails.
    fn resources(&self) -> Result<Vec<Resource>>;

    /// Returns allocatable room providers supporting at least one of
    /// `technology_variants` (any room provider when the slice is empty).
    ///
    /// # Errors
    ///
    /// Returns an error when the backing store fails.
    fn find_available_rooms(&self, technology_variants: &[TechnologySet]) -> Result<Vec<Resource>> {
        Ok(self
            .resources()?
            .into_iter()
            .filter(|resource| resource.allocatable && resource.room_license_count().is_some())
            .filter(|resource| {
                technology_variants.is_empty()
                    || technology_variants.iter().any(|set| resource.supports(set))
            })
            .collect())
    }

    /// Returns allocatable alias providers able to produce every alias type
    /// of `alias_types` and, when `technologies` is not empty, at least one
    /// alias of those technologies.
    ///
    /// # Errors
    ///
    /// Returns an error when the backing store fails.
    fn find_alias_providers(
        &self,
        technologies: &TechnologySet,
        alias_types: &[AliasType],
    ) -> Result<Vec<Resource>> {
        Ok(self
            .resources()?
            .into_iter()
            .filter(|resource| resource.allocatable)
            .filter(|resource| {
                resource.alias_provider().is_some_and(|provider| {
                    alias_types.iter().all(|t| provider.alias_types.contains(t))
                        && (technologies.is_empty()
                            || !provider.technologies().is_disjoint(technologies))
                })
            })
            .collect())
    }

    /// Returns persisted reservations occupying `target` and overlapping
    /// `slot`, ordered by identifier.
    ///
    /// # Errors
    ///
    /// Returns an error when the backing store fails.
    fn list_reservations(&self, target: ReservationTarget, slot: &Interval) -> Result<Vec<Reservation>>;

    /// Returns a persisted reservation (at any depth of its tree).
    ///
    /// # Errors
    ///
    /// Returns an error when the backing store fails.
    fn reservation(&self, id: ReservationId) -> Result<Option<Reservation>>;

    /// Returns the root reservations allocated for a request.
    ///
    /// # Errors
    ///
    /// Returns an error when the backing store fails.
    fn reservations_of_request(&self, request: RequestId) -> Result<Vec<Reservation>>;
}

/// Write access to persisted reservations.
pub trait ReservationRepository {
    /// Persists a whole reservation tree, replacing a previous version.
    ///
    /// # Errors
    ///
    /// Returns an error when the reservation cannot be stored.
    fn save_reservation(&mut self, reservation: &Reservation) -> Result<()>;

    /// Deletes a root reservation together with its descendants.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] when no such root reservation exists.
    fn delete_reservation(&mut self, id: ReservationId) -> Result<()>;
}

/// Resources and reservation trees kept in memory.
///
/// # Examples
///
/// ```
/// use confbook::store::{InMemoryStore, ResourceStore};
/// use confbook::resource::Resource;
/// use confbook::ResourceId;
///
/// let store = InMemoryStore::new().with_resource(Resource::new(ResourceId::from(1), "room"));
/// assert!(store.resource(ResourceId::from(1)).unwrap().is_some());
/// ```
#[derive(Debug, Clone, Default)]
pub struct InMemoryStore {
    resources: BTreeMap<ResourceId, Resource>,
    reservations: BTreeMap<ReservationId, Reservation>,
    acl: AclTables,
}

impl InMemoryStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a resource, replacing one with the same identifier.
    #[must_use]
    pub fn with_resource(mut self, resource: Resource) -> Self {
        self.add_resource(resource);
        self
    }

    /// Adds a resource, replacing one with the same identifier.
    pub fn add_resource(&mut self, resource: Resource) {
        self.resources.insert(resource.id, resource);
    }

    /// Returns the persisted root reservations.
    pub fn root_reservations(&self) -> impl Iterator<Item = &Reservation> {
        self.reservations.values()
    }
}

impl ResourceStore for InMemoryStore {
    fn resource(&self, id: ResourceId) -> Result<Option<Resource>> {
        Ok(self.resources.get(&id).cloned())
    }

    fn resources(&self) -> Result<Vec<Resource>> {
        Ok(self.resources.values().cloned().collect())
    }

    fn list_reservations(&self, target: ReservationTarget, slot: &Interval) -> Result<Vec<Reservation>> {
        let mut found: Vec<Reservation> = self
            .reservations
            .values()
            .flat_map(Reservation::iter_tree)
            .filter(|r| r.target() == Some(target) && r.slot().overlaps(slot))
            .cloned()
            .collect();
        found.sort_by_key(Reservation::id);
        Ok(found)
    }

    fn reservation(&self, id: ReservationId) -> Result<Option<Reservation>> {
        Ok(self
            .reservations
            .values()
            .find_map(|root| root.find(id))
            .cloned())
    }

    fn reservations_of_request(&self, request: RequestId) -> Result<Vec<Reservation>> {
        Ok(self
            .reservations
            .values()
            .filter(|r| r.request() == Some(request))
            .cloned()
            .collect())
    }
}

impl ReservationRepository for InMemoryStore {
    fn save_reservation(&mut self, reservation: &Reservation) -> Result<()> {
        log::debug!("Saving reservation tree {}", reservation.id());
        self.reservations.insert(reservation.id(), reservation.clone());
        Ok(())
    }

    fn delete_reservation(&mut self, id: ReservationId) -> Result<()> {
        self.reservations
            .remove(&id)
            .map(|_| ())
            .ok_or_else(|| Error::NotFound {
                resource: format!("reservation {id}"),
            })
    }
}

impl AclStore for InMemoryStore {
    fn acl_entry(&self, id: AclEntryId) -> Result<Option<AclEntry>> {
        self.acl.acl_entry(id)
    }

    fn find_acl_entry(
        &self,
        identity: &AclIdentity,
        object: &AclObjectIdentity,
        role: ObjectRole,
    ) -> Result<Option<AclEntry>> {
        self.acl.find_acl_entry(identity, object, role)
    }

    fn create_acl_entry(
        &mut self,
        identity: &AclIdentity,
        object: &AclObjectIdentity,
        role: ObjectRole,
    ) -> Result<(AclEntry, bool)> {
        self.acl.create_acl_entry(identity, object, role)
    }

    fn delete_acl_entry(&mut self, id: AclEntryId) -> Result<()> {
        self.acl.delete_acl_entry(id)
    }

    fn list_acl_entries(&self, filter: &AclEntryFilter) -> Result<Vec<AclEntry>> {
        self.acl.list_acl_entries(filter)
    }

    fn create_acl_dependency(&mut self, dependency: &AclEntryDependency) -> Result<bool> {
        self.acl.create_acl_dependency(dependency)
    }

    fn delete_acl_dependency(&mut self, parent: AclEntryId, child: AclEntryId) -> Result<()> {
        self.acl.delete_acl_dependency(parent, child)
    }

    fn acl_dependencies_of_child(&self, child: AclEntryId) -> Result<Vec<AclEntryDependency>> {
        self.acl.acl_dependencies_of_child(child)
    }

    fn acl_dependencies_of_parent(&self, parent: AclEntryId) -> Result<Vec<AclEntryDependency>> {
        self.acl.acl_dependencies_of_parent(parent)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reservation::ReservationKind;
    use crate::resource::{AliasProviderCapability, Capability, Technology};
    use chrono::{Duration, TimeZone, Utc};

    fn slot(hour: u32) -> Interval {
        let start = Utc.with_ymd_and_hms(2013, 1, 1, hour, 0, 0).unwrap();
        Interval::from_duration(start, Duration::hours(1)).unwrap()
    }

    fn room_tree() -> Reservation {
        Reservation::builder(
            ReservationId::from(1),
            slot(10),
            ReservationKind::Room {
                resource: ResourceId::from(1),
                license_count: 5,
                executable: None,
            },
        )
        .request(RequestId::from(9))
        .child(Reservation::new(
            ReservationId::from(2),
            slot(10),
            ReservationKind::Value {
                provider: ResourceId::from(2),
                value: "950001".into(),
            },
        ))
        .build()
        .unwrap()
    }

    #[test]
    fn test_list_reservations_finds_nested() {
        let mut store = InMemoryStore::new();
        store.save_reservation(&room_tree()).unwrap();

        let values = store
            .list_reservations(ReservationTarget::Value(ResourceId::from(2)), &slot(10))
            .unwrap();
        assert_eq!(values.len(), 1);
        assert_eq!(values[0].request(), Some(RequestId::from(9)));

        assert!(store
            .list_reservations(ReservationTarget::Value(ResourceId::from(2)), &slot(12))
            .unwrap()
            .is_empty());
        assert!(store.reservation(ReservationId::from(2)).unwrap().is_some());
        assert_eq!(store.reservations_of_request(RequestId::from(9)).unwrap().len(), 1);
    }

    #[test]
    fn test_delete_reservation() {
        let mut store = InMemoryStore::new();
        store.save_reservation(&room_tree()).unwrap();
        store.delete_reservation(ReservationId::from(1)).unwrap();
        assert!(store.reservation(ReservationId::from(2)).unwrap().is_none());
        assert!(store.delete_reservation(ReservationId::from(1)).unwrap_err().is_not_found());
    }

    #[test]
    fn test_find_candidates() {
        let store = InMemoryStore::new()
            .with_resource(
                Resource::new(ResourceId::from(1), "mcu")
                    .with_technology(Technology::H323)
                    .with_capability(Capability::RoomProvider {
                        license_count: 10,
                        required_alias_types: vec![],
                    }),
            )
            .with_resource(
                Resource::new(ResourceId::from(2), "disabled mcu")
                    .with_technology(Technology::H323)
                    .with_capability(Capability::RoomProvider {
                        license_count: 10,
                        required_alias_types: vec![],
                    })
                    .not_allocatable(),
            )
            .with_resource(Resource::new(ResourceId::from(3), "numbers").with_capability(
                Capability::AliasProvider(AliasProviderCapability {
                    patterns: vec!["950{digit:3}".into()],
                    alias_types: vec![AliasType::H323E164],
                    allow_any_requested_value: false,
                    maximum_future_days: None,
                    restricted_to_resource: false,
                }),
            ));

        let h323: TechnologySet = [Technology::H323].into_iter().collect();
        let sip: TechnologySet = [Technology::Sip].into_iter().collect();
        let rooms = store.find_available_rooms(&[sip.clone(), h323.clone()]).unwrap();
        assert_eq!(rooms.len(), 1);
        assert!(store.find_available_rooms(&[sip.clone()]).unwrap().is_empty());

        assert_eq!(store.find_alias_providers(&h323, &[]).unwrap().len(), 1);
        assert!(store.find_alias_providers(&sip, &[]).unwrap().is_empty());
        assert!(store
            .find_alias_providers(&TechnologySet::new(), &[AliasType::RoomName])
            .unwrap()
            .is_empty());
    }
}
