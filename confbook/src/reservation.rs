//! Reservation types produced by the scheduler.
//!
//! A [`Reservation`] is a node of a reservation tree: a room reservation
//! owns the value reservations of its aliases, a compartment owns the
//! reservations of its endpoints, and so on. Parent links are kept as plain
//! identifiers; children are owned by their parent.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::executor::ExecutableId;
use crate::resource::{Alias, ResourceId};
use crate::Interval;

/// Identifier of a reservation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ReservationId(u64);

impl ReservationId {
    /// Returns the raw identifier.
    #[must_use]
    pub const fn value(self) -> u64 {
        self.0
    }
}

impl From<u64> for ReservationId {
    fn from(value: u64) -> Self {
        Self(value)
    }
}

impl fmt::Display for ReservationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "rsv:{}", self.0)
    }
}

/// Identifier of the reservation request a reservation was allocated for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RequestId(u64);

impl RequestId {
    /// Returns the raw identifier.
    #[must_use]
    pub const fn value(self) -> u64 {
        self.0
    }
}

impl From<u64> for RequestId {
    fn from(value: u64) -> Self {
        Self(value)
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "req:{}", self.0)
    }
}

/// Sequence handing out identifiers for newly allocated objects.
///
/// The sequence is passed explicitly to whoever creates reservations or
/// executables, so tests can start from a known value.
///
/// # Examples
///
/// ```
/// use confbook::reservation::IdSequence;
///
/// let mut ids = IdSequence::starting_at(100);
/// assert_eq!(ids.reservation_id().value(), 100);
/// assert_eq!(ids.executable_id().value(), 101);
/// ```
#[derive(Debug, Clone)]
pub struct IdSequence {
    next: u64,
}

impl IdSequence {
    /// Creates a sequence whose first identifier is `first`.
    #[must_use]
    pub const fn starting_at(first: u64) -> Self {
        Self { next: first }
    }

    /// Returns the next raw identifier.
    pub fn next_id(&mut self) -> u64 {
        let id = self.next;
        self.next += 1;
        id
    }

    /// Returns the next reservation identifier.
    pub fn reservation_id(&mut self) -> ReservationId {
        ReservationId(self.next_id())
    }

    /// Returns the next executable identifier.
    pub fn executable_id(&mut self) -> ExecutableId {
        ExecutableId::from(self.next_id())
    }
}

impl Default for IdSequence {
    fn default() -> Self {
        Self::starting_at(1)
    }
}

/// Type specific payload of a reservation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ReservationKind {
    /// Exclusive use of a whole resource.
    Resource {
        /// The reserved resource.
        resource: ResourceId,
    },
    /// A unique value taken from an alias provider.
    Value {
        /// Resource owning the alias provider capability.
        provider: ResourceId,
        /// The allocated value.
        value: String,
    },
    /// Aliases derived from a child value reservation.
    Alias {
        /// Resource owning the alias provider capability.
        provider: ResourceId,
        /// The produced aliases.
        aliases: Vec<Alias>,
    },
    /// Participant licenses of a room provider.
    Room {
        /// The device hosting the room.
        resource: ResourceId,
        /// Number of reserved licenses.
        license_count: u32,
        /// The virtual room realizing the reservation.
        executable: Option<ExecutableId>,
    },
    /// Reuse of another, already persisted reservation.
    Existing {
        /// The reused reservation.
        reused: ReservationId,
    },
    /// Endpoints connected together, possibly through a room.
    Compartment {
        /// The connection executable realizing the compartment.
        executable: Option<ExecutableId>,
    },
    /// A plain group of child reservations.
    Set,
}

impl ReservationKind {
    /// Short name of the kind, used in logs and persistence.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Resource { .. } => "resource",
            Self::Value { .. } => "value",
            Self::Alias { .. } => "alias",
            Self::Room { .. } => "room",
            Self::Existing { .. } => "existing",
            Self::Compartment { .. } => "compartment",
            Self::Set => "set",
        }
    }
}

/// The object a reservation occupies, used to find colliding reservations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ReservationTarget {
    /// A whole resource.
    Resource(ResourceId),
    /// Licenses of a room provider.
    Room(ResourceId),
    /// The value pool of an alias provider.
    Value(ResourceId),
    /// The alias namespace of an alias provider.
    Alias(ResourceId),
    /// Another reservation being reused.
    Reused(ReservationId),
}

impl ReservationTarget {
    /// Splits the target into a category name and a raw identifier.
    #[must_use]
    pub const fn as_parts(self) -> (&'static str, u64) {
        match self {
            Self::Resource(id) => ("resource", id.value()),
            Self::Room(id) => ("room", id.value()),
            Self::Value(id) => ("value", id.value()),
            Self::Alias(id) => ("alias", id.value()),
            Self::Reused(id) => ("reused", id.value()),
        }
    }

    /// Rebuilds a target from [`ReservationTarget::as_parts`] output.
    #[must_use]
    pub fn from_parts(category: &str, id: u64) -> Option<Self> {
        match category {
            "resource" => Some(Self::Resource(ResourceId::from(id))),
            "room" => Some(Self::Room(ResourceId::from(id))),
            "value" => Some(Self::Value(ResourceId::from(id))),
            "alias" => Some(Self::Alias(ResourceId::from(id))),
            "reused" => Some(Self::Reused(ReservationId::from(id))),
            _ => None,
        }
    }
}

/// A node of a reservation tree.
///
/// # Examples
///
/// ```
/// use chrono::{Duration, TimeZone, Utc};
/// use confbook::reservation::{Reservation, ReservationKind};
/// use confbook::{Interval, ReservationId, ResourceId};
///
/// let start = Utc.with_ymd_and_hms(2013, 1, 1, 12, 0, 0).unwrap();
/// let slot = Interval::from_duration(start, Duration::hours(2)).unwrap();
///
/// let child = Reservation::new(
///     ReservationId::from(2),
///     slot,
///     ReservationKind::Resource { resource: ResourceId::from(1) },
/// );
/// let parent = Reservation::builder(ReservationId::from(1), slot, ReservationKind::Set)
///     .child(child)
///     .build()
///     .unwrap();
///
/// assert_eq!(parent.children()[0].parent(), Some(ReservationId::from(1)));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reservation {
    id: ReservationId,
    slot: Interval,
    #[serde(default)]
    request: Option<RequestId>,
    #[serde(default)]
    parent: Option<ReservationId>,
    #[serde(default)]
    children: Vec<Reservation>,
    kind: ReservationKind,
}

impl Reservation {
    /// Creates a reservation without children.
    #[must_use]
    pub const fn new(id: ReservationId, slot: Interval, kind: ReservationKind) -> Self {
        Self {
            id,
            slot,
            request: None,
            parent: None,
            children: Vec::new(),
            kind,
        }
    }

    /// Creates a builder for a reservation with children.
    #[must_use]
    pub fn builder(id: ReservationId, slot: Interval, kind: ReservationKind) -> ReservationBuilder {
        ReservationBuilder {
            reservation: Self::new(id, slot, kind),
            children: Vec::new(),
        }
    }

    /// Returns the reservation identifier.
    #[must_use]
    pub const fn id(&self) -> ReservationId {
        self.id
    }

    /// Returns the reserved time slot.
    #[must_use]
    pub const fn slot(&self) -> &Interval {
        &self.slot
    }

    /// Returns the request the reservation was allocated for.
    #[must_use]
    pub const fn request(&self) -> Option<RequestId> {
        self.request
    }

    /// Returns the parent reservation identifier.
    #[must_use]
    pub const fn parent(&self) -> Option<ReservationId> {
        self.parent
    }

    /// Returns the child reservations in allocation order.
    #[must_use]
    pub fn children(&self) -> &[Reservation] {
        &self.children
    }

    /// Returns the type specific payload.
    #[must_use]
    pub const fn kind(&self) -> &ReservationKind {
        &self.kind
    }

    /// Returns the executable realizing this reservation, if any.
    #[must_use]
    pub const fn executable(&self) -> Option<ExecutableId> {
        match self.kind {
            ReservationKind::Room { executable, .. }
            | ReservationKind::Compartment { executable } => executable,
            _ => None,
        }
    }

    /// Returns the object this reservation occupies, if it occupies any.
    #[must_use]
    pub const fn target(&self) -> Option<ReservationTarget> {
        match &self.kind {
            ReservationKind::Resource { resource } => Some(ReservationTarget::Resource(*resource)),
            ReservationKind::Room { resource, .. } => Some(ReservationTarget::Room(*resource)),
            ReservationKind::Value { provider, .. } => Some(ReservationTarget::Value(*provider)),
            ReservationKind::Alias { provider, .. } => Some(ReservationTarget::Alias(*provider)),
            ReservationKind::Existing { reused } => Some(ReservationTarget::Reused(*reused)),
            ReservationKind::Compartment { .. } | ReservationKind::Set => None,
        }
    }

    /// Assigns the request the reservation tree was allocated for.
    pub fn set_request(&mut self, request: RequestId) {
        self.request = Some(request);
        for child in &mut self.children {
            child.set_request(request);
        }
    }

    /// Changes the reserved slot.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Validation`] when a child would no longer fit.
    pub fn set_slot(&mut self, slot: Interval) -> Result<()> {
        if let Some(child) = self.children.iter().find(|c| !slot.contains(c.slot())) {
            return Err(Error::Validation {
                field: "slot".into(),
                message: format!("child {} slot {} is outside {slot}", child.id, child.slot),
            });
        }
        self.slot = slot;
        Ok(())
    }

    /// Attaches a child reservation.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Validation`] when the child slot is not contained in
    /// this reservation's slot.
    pub fn add_child(&mut self, mut child: Reservation) -> Result<()> {
        if !self.slot.contains(child.slot()) {
            return Err(Error::Validation {
                field: "slot".into(),
                message: format!(
                    "child {} slot {} is outside parent {} slot {}",
                    child.id, child.slot, self.id, self.slot
                ),
            });
        }
        child.parent = Some(self.id);
        if let Some(request) = self.request {
            child.set_request(request);
        }
        self.children.push(child);
        Ok(())
    }

    /// Detaches and returns the child with the given identifier.
    ///
    /// The detached child keeps its own children; whether it is deleted is
    /// up to the caller.
    pub fn detach_child(&mut self, id: ReservationId) -> Option<Reservation> {
        let index = self.children.iter().position(|c| c.id == id)?;
        let mut child = self.children.remove(index);
        child.parent = None;
        Some(child)
    }

    /// Returns this reservation and all its descendants in pre-order.
    #[must_use]
    pub fn iter_tree(&self) -> Vec<&Reservation> {
        let mut nodes = vec![self];
        let mut index = 0;
        while index < nodes.len() {
            let node = nodes[index];
            // keep children right after their parent
            for (offset, child) in node.children.iter().enumerate() {
                nodes.insert(index + 1 + offset, child);
            }
            index += 1;
        }
        nodes
    }

    /// Finds a reservation within this tree.
    #[must_use]
    pub fn find(&self, id: ReservationId) -> Option<&Reservation> {
        if self.id == id {
            return Some(self);
        }
        self.children.iter().find_map(|child| child.find(id))
    }
}

/// Builder for [`Reservation`] trees.
#[derive(Debug)]
pub struct ReservationBuilder {
    reservation: Reservation,
    children: Vec<Reservation>,
}

impl ReservationBuilder {
    /// Sets the owning request.
    #[must_use]
    pub fn request(mut self, request: RequestId) -> Self {
        self.reservation.request = Some(request);
        self
    }

    /// Appends a child reservation.
    #[must_use]
    pub fn child(mut self, child: Reservation) -> Self {
        self.children.push(child);
        self
    }

    /// Builds the reservation, validating child slots.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Validation`] when a child slot is not contained in
    /// the parent slot.
    pub fn build(self) -> Result<Reservation> {
        let mut reservation = self.reservation;
        for child in self.children {
            reservation.add_child(child)?;
        }
        Ok(reservation)
    }
}

/// How an existing reservation may be used instead of a new allocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AvailabilityKind {
    /// The reservation belongs to someone else and may be reused through an
    /// [`ReservationKind::Existing`] reservation.
    Reusable,
    /// The reservation is being reallocated for the same request and may be
    /// returned as-is.
    Existing,
}

impl fmt::Display for AvailabilityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Reusable => write!(f, "reusable"),
            Self::Existing => write!(f, "existing"),
        }
    }
}

/// An existing reservation offered as an alternative to a fresh allocation.
///
/// Equality is by the wrapped reservation identifier.
#[derive(Debug, Clone)]
pub struct AvailableReservation {
    reservation: Reservation,
    kind: AvailabilityKind,
}

impl AvailableReservation {
    /// Wraps an existing reservation.
    #[must_use]
    pub const fn new(reservation: Reservation, kind: AvailabilityKind) -> Self {
        Self { reservation, kind }
    }

    /// Returns the wrapped reservation.
    #[must_use]
    pub const fn reservation(&self) -> &Reservation {
        &self.reservation
    }

    /// Returns how the reservation may be used.
    #[must_use]
    pub const fn kind(&self) -> AvailabilityKind {
        self.kind
    }

    /// Returns the wrapped reservation identifier.
    #[must_use]
    pub const fn id(&self) -> ReservationId {
        self.reservation.id
    }

    /// Replaces the wrapped reservation's slot (used when extending an
    /// [`AvailabilityKind::Existing`] reservation).
    ///
    /// # Errors
    ///
    /// Returns [`Error::Validation`] when a child would no longer fit.
    pub fn extend_slot(&mut self, slot: Interval) -> Result<()> {
        self.reservation.set_slot(slot)
    }

    /// Unwraps the reservation.
    #[must_use]
    pub fn into_reservation(self) -> Reservation {
        self.reservation
    }
}

impl PartialEq for AvailableReservation {
    fn eq(&self, other: &Self) -> bool {
        self.reservation.id == other.reservation.id
    }
}

impl Eq for AvailableReservation {}
