//! ACL records: identities, securable objects, roles and entries.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::Error;
use crate::executor::ExecutableId;
use crate::reservation::{RequestId, ReservationId};
use crate::resource::ResourceId;

/// Kind of principal an identity stands for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AclIdentityType {
    /// A single user.
    User,
    /// A group of users.
    Group,
}

impl AclIdentityType {
    /// Stable name used in persistence.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Group => "group",
        }
    }
}

impl FromStr for AclIdentityType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "user" => Ok(Self::User),
            "group" => Ok(Self::Group),
            _ => Err(Error::Validation {
                field: "identity_type".into(),
                message: format!("unknown identity type '{s}'"),
            }),
        }
    }
}

/// Principal receiving roles.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AclIdentity {
    /// Kind of principal.
    pub kind: AclIdentityType,
    /// Principal identifier (user id or group id).
    pub principal_id: String,
}

impl AclIdentity {
    /// A user identity.
    #[must_use]
    pub fn user(principal_id: impl Into<String>) -> Self {
        Self {
            kind: AclIdentityType::User,
            principal_id: principal_id.into(),
        }
    }

    /// A group identity.
    #[must_use]
    pub fn group(principal_id: impl Into<String>) -> Self {
        Self {
            kind: AclIdentityType::Group,
            principal_id: principal_id.into(),
        }
    }
}

impl fmt::Display for AclIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.kind.as_str(), self.principal_id)
    }
}

/// Class of securable objects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AclObjectClass {
    /// A reservation request.
    ReservationRequest,
    /// An allocated reservation.
    Reservation,
    /// An executable.
    Executable,
    /// A resource.
    Resource,
}

impl AclObjectClass {
    /// Stable name used in persistence.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::ReservationRequest => "reservation_request",
            Self::Reservation => "reservation",
            Self::Executable => "executable",
            Self::Resource => "resource",
        }
    }

    /// Checks whether `role` may be granted on objects of this class.
    #[must_use]
    pub const fn allows_role(self, role: ObjectRole) -> bool {
        match self {
            Self::ReservationRequest => true,
            Self::Reservation | Self::Executable | Self::Resource => {
                matches!(role, ObjectRole::Owner | ObjectRole::Reader)
            }
        }
    }
}

impl FromStr for AclObjectClass {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "reservation_request" => Ok(Self::ReservationRequest),
            "reservation" => Ok(Self::Reservation),
            "executable" => Ok(Self::Executable),
            "resource" => Ok(Self::Resource),
            _ => Err(Error::Validation {
                field: "class_name".into(),
                message: format!("unknown object class '{s}'"),
            }),
        }
    }
}

/// A securable object.
///
/// # Examples
///
/// ```
/// use confbook::authorization::{AclObjectClass, AclObjectIdentity};
/// use confbook::ReservationId;
///
/// let object = AclObjectIdentity::from(ReservationId::from(5));
/// assert_eq!(object.class, AclObjectClass::Reservation);
/// assert_eq!(object.to_string(), "reservation:5");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AclObjectIdentity {
    /// Class of the object.
    pub class: AclObjectClass,
    /// Identifier within the class.
    pub object_id: u64,
}

impl AclObjectIdentity {
    /// Creates an object identity.
    #[must_use]
    pub const fn new(class: AclObjectClass, object_id: u64) -> Self {
        Self { class, object_id }
    }
}

impl From<RequestId> for AclObjectIdentity {
    fn from(id: RequestId) -> Self {
        Self::new(AclObjectClass::ReservationRequest, id.value())
    }
}

impl From<ReservationId> for AclObjectIdentity {
    fn from(id: ReservationId) -> Self {
        Self::new(AclObjectClass::Reservation, id.value())
    }
}

impl From<ExecutableId> for AclObjectIdentity {
    fn from(id: ExecutableId) -> Self {
        Self::new(AclObjectClass::Executable, id.value())
    }
}

impl From<ResourceId> for AclObjectIdentity {
    fn from(id: ResourceId) -> Self {
        Self::new(AclObjectClass::Resource, id.value())
    }
}

impl fmt::Display for AclObjectIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.class.as_str(), self.object_id)
    }
}

/// Role granted on an object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ObjectRole {
    /// Full control.
    Owner,
    /// Read-only access.
    Reader,
    /// May reuse the reservations of a request.
    ReservationRequestUser,
}

impl ObjectRole {
    /// Stable name used in persistence.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Owner => "OWNER",
            Self::Reader => "READER",
            Self::ReservationRequestUser => "RESERVATION_REQUEST_USER",
        }
    }
}

impl fmt::Display for ObjectRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ObjectRole {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "OWNER" => Ok(Self::Owner),
            "READER" => Ok(Self::Reader),
            "RESERVATION_REQUEST_USER" => Ok(Self::ReservationRequestUser),
            _ => Err(Error::Validation {
                field: "role".into(),
                message: format!("unknown role '{s}'"),
            }),
        }
    }
}

/// Identifier of an ACL entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AclEntryId(u64);

impl AclEntryId {
    /// Returns the raw identifier.
    #[must_use]
    pub const fn value(self) -> u64 {
        self.0
    }
}

impl From<u64> for AclEntryId {
    fn from(value: u64) -> Self {
        Self(value)
    }
}

impl fmt::Display for AclEntryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One role granted to one identity on one object.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AclEntry {
    /// Identifier.
    pub id: AclEntryId,
    /// Who is granted the role.
    pub identity: AclIdentity,
    /// On what.
    pub object: AclObjectIdentity,
    /// The role.
    pub role: ObjectRole,
}

/// What happens to a derived entry when the entry it was derived from is
/// deleted together with its object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AclEntryDependencyType {
    /// The derived entry is deleted as well.
    DeleteCascade,
    /// The derived entry survives, only the dependency is dropped.
    DeleteDetach,
}

impl AclEntryDependencyType {
    /// Stable name used in persistence.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::DeleteCascade => "delete_cascade",
            Self::DeleteDetach => "delete_detach",
        }
    }
}

impl fmt::Display for AclEntryDependencyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AclEntryDependencyType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "delete_cascade" => Ok(Self::DeleteCascade),
            "delete_detach" => Ok(Self::DeleteDetach),
            _ => Err(Error::Validation {
                field: "dependency_type".into(),
                message: format!("unknown dependency type '{s}'"),
            }),
        }
    }
}

/// Records that `child` was derived from `parent`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AclEntryDependency {
    /// The entry the child was derived from.
    pub parent: AclEntryId,
    /// The derived entry.
    pub child: AclEntryId,
    /// Deletion behavior.
    pub kind: AclEntryDependencyType,
}

/// Optional criteria for listing entries; `None` matches anything.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AclEntryFilter {
    /// Only entries of this identity.
    pub identity: Option<AclIdentity>,
    /// Only entries on this object.
    pub object: Option<AclObjectIdentity>,
    /// Only entries with this role.
    pub role: Option<ObjectRole>,
}

impl AclEntryFilter {
    /// Checks whether `entry` satisfies every given criterion.
    #[must_use]
    pub fn matches(&self, entry: &AclEntry) -> bool {
        self.identity.as_ref().map_or(true, |i| *i == entry.identity)
            && self.object.map_or(true, |o| o == entry.object)
            && self.role.map_or(true, |r| r == entry.role)
    }
}
