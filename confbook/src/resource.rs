//! Bookable resources and their capabilities.
//!
//! A [`Resource`] is a physical or logical device (an MCU, a gateway, a
//! terminal, an alias namespace) that the scheduler can reserve. What a
//! resource can be used for is described by its [`Capability`] list.

use std::collections::BTreeSet;
use std::fmt;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Identifier of a bookable resource.
///
/// # Examples
///
/// ```
/// use confbook::ResourceId;
///
/// let id = ResourceId::from(7);
/// assert_eq!(id.value(), 7);
/// assert_eq!(id.to_string(), "res:7");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ResourceId(u64);

impl ResourceId {
    /// Returns the raw identifier.
    #[must_use]
    pub const fn value(self) -> u64 {
        self.0
    }
}

impl From<u64> for ResourceId {
    fn from(value: u64) -> Self {
        Self(value)
    }
}

impl fmt::Display for ResourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "res:{}", self.0)
    }
}

/// Communication technology supported by a device or required by a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Technology {
    /// ITU-T H.323.
    H323,
    /// Session Initiation Protocol.
    Sip,
    /// Adobe Connect web conferencing.
    AdobeConnect,
    /// Browser based WebRTC.
    WebRtc,
}

impl fmt::Display for Technology {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::H323 => write!(f, "H.323"),
            Self::Sip => write!(f, "SIP"),
            Self::AdobeConnect => write!(f, "Adobe Connect"),
            Self::WebRtc => write!(f, "WebRTC"),
        }
    }
}

/// A set of technologies which must all be supported together.
pub type TechnologySet = BTreeSet<Technology>;

/// Intersects every technology set of `variants`.
///
/// Returns an empty set for an empty slice.
///
/// # Examples
///
/// ```
/// use confbook::resource::{intersect_technologies, Technology, TechnologySet};
///
/// let a: TechnologySet = [Technology::H323, Technology::Sip].into_iter().collect();
/// let b: TechnologySet = [Technology::Sip].into_iter().collect();
/// let common = intersect_technologies(&[a, b]);
/// assert_eq!(common.into_iter().collect::<Vec<_>>(), vec![Technology::Sip]);
/// ```
#[must_use]
pub fn intersect_technologies(variants: &[TechnologySet]) -> TechnologySet {
    let mut iter = variants.iter();
    let Some(first) = iter.next() else {
        return TechnologySet::new();
    };
    iter.fold(first.clone(), |acc, set| {
        acc.intersection(set).copied().collect()
    })
}

/// Kind of alias a provider can hand out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AliasType {
    /// Technology independent room name.
    RoomName,
    /// H.323 E.164 number.
    H323E164,
    /// H.323 URI.
    H323Uri,
    /// SIP URI.
    SipUri,
    /// Adobe Connect meeting URI.
    AdobeConnectUri,
}

impl AliasType {
    /// Returns the technology the alias belongs to, if it is technology specific.
    #[must_use]
    pub const fn technology(self) -> Option<Technology> {
        match self {
            Self::RoomName => None,
            Self::H323E164 | Self::H323Uri => Some(Technology::H323),
            Self::SipUri => Some(Technology::Sip),
            Self::AdobeConnectUri => Some(Technology::AdobeConnect),
        }
    }
}

/// A concrete alias handed out by an alias provider.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Alias {
    /// Kind of the alias.
    pub alias_type: AliasType,
    /// The alias value.
    pub value: String,
}

/// Capability of an alias provider to allocate unique values.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AliasProviderCapability {
    /// Value patterns, tried in declaration order.
    pub patterns: Vec<String>,
    /// Alias types produced from one allocated value.
    pub alias_types: Vec<AliasType>,
    /// Whether a requested value may bypass the pattern check.
    #[serde(default)]
    pub allow_any_requested_value: bool,
    /// Maximum future horizon of this capability in days, if restricted.
    #[serde(default)]
    pub maximum_future_days: Option<u32>,
    /// Whether aliases may only be used by the owning resource itself.
    #[serde(default)]
    pub restricted_to_resource: bool,
}

impl AliasProviderCapability {
    /// Returns the technologies of the produced alias types.
    #[must_use]
    pub fn technologies(&self) -> TechnologySet {
        self.alias_types
            .iter()
            .filter_map(|alias_type| alias_type.technology())
            .collect()
    }
}

/// What a resource can be used for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Capability {
    /// The device hosts virtual rooms up to a licensed participant count.
    RoomProvider {
        /// Number of concurrently usable participant licenses.
        license_count: u32,
        /// Alias types a room on this device must receive.
        #[serde(default)]
        required_alias_types: Vec<AliasType>,
    },
    /// The resource hands out unique values (room names, numbers, URIs).
    AliasProvider(AliasProviderCapability),
    /// The device is an endpoint that can join a compartment.
    Terminal,
}

/// A bookable resource.
///
/// # Examples
///
/// ```
/// use confbook::resource::{Capability, Resource, Technology};
/// use confbook::ResourceId;
///
/// let mcu = Resource::new(ResourceId::from(1), "mcu")
///     .with_technology(Technology::H323)
///     .with_capability(Capability::RoomProvider {
///         license_count: 10,
///         required_alias_types: vec![],
///     });
/// assert_eq!(mcu.room_license_count(), Some(10));
/// assert!(mcu.allocatable);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resource {
    /// Resource identifier.
    pub id: ResourceId,
    /// Human readable name.
    pub name: String,
    /// Whether the scheduler may reserve the resource at all.
    pub allocatable: bool,
    /// Technologies the device supports.
    #[serde(default)]
    pub technologies: TechnologySet,
    /// Parent resource which must be reserved together with this one.
    #[serde(default)]
    pub parent: Option<ResourceId>,
    /// How many days ahead the resource may be reserved, if restricted.
    #[serde(default)]
    pub maximum_future_days: Option<u32>,
    /// What the resource can be used for.
    #[serde(default)]
    pub capabilities: Vec<Capability>,
}

impl Resource {
    /// Creates an allocatable resource without capabilities.
    #[must_use]
    pub fn new(id: ResourceId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            allocatable: true,
            technologies: TechnologySet::new(),
            parent: None,
            maximum_future_days: None,
            capabilities: Vec::new(),
        }
    }

    /// Adds a supported technology.
    #[must_use]
    pub fn with_technology(mut self, technology: Technology) -> Self {
        self.technologies.insert(technology);
        self
    }

    /// Adds a capability.
    #[must_use]
    pub fn with_capability(mut self, capability: Capability) -> Self {
        self.capabilities.push(capability);
        self
    }

    /// Sets the parent resource.
    #[must_use]
    pub fn with_parent(mut self, parent: ResourceId) -> Self {
        self.parent = Some(parent);
        self
    }

    /// Restricts how far ahead the resource may be reserved.
    #[must_use]
    pub fn with_maximum_future_days(mut self, days: u32) -> Self {
        self.maximum_future_days = Some(days);
        self
    }

    /// Marks the resource as not allocatable.
    #[must_use]
    pub fn not_allocatable(mut self) -> Self {
        self.allocatable = false;
        self
    }

    /// Returns the licensed participant count when the resource hosts rooms.
    #[must_use]
    pub fn room_license_count(&self) -> Option<u32> {
        self.capabilities.iter().find_map(|capability| match capability {
            Capability::RoomProvider { license_count, .. } => Some(*license_count),
            _ => None,
        })
    }

    /// Returns the alias provider capability, if any.
    #[must_use]
    pub fn alias_provider(&self) -> Option<&AliasProviderCapability> {
        self.capabilities.iter().find_map(|capability| match capability {
            Capability::AliasProvider(provider) => Some(provider),
            _ => None,
        })
    }

    /// Checks whether the resource is a terminal.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        self.capabilities
            .iter()
            .any(|capability| matches!(capability, Capability::Terminal))
    }

    /// Checks whether the resource supports every technology of `set`.
    #[must_use]
    pub fn supports(&self, set: &TechnologySet) -> bool {
        set.is_subset(&self.technologies)
    }

    /// Returns the latest date/time the resource may be reserved until.
    #[must_use]
    pub fn maximum_future_date_time(&self, reference: DateTime<Utc>) -> Option<DateTime<Utc>> {
        self.maximum_future_days
            .map(|days| reference + Duration::days(i64::from(days)))
    }

    /// Validates internal consistency of the resource definition.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Validation`] when the resource has an empty name,
    /// more than one alias provider or more than one room provider, or is
    /// its own parent.
    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(Error::Validation {
                field: "resource.name".into(),
                message: "Cannot be empty or only whitespace".into(),
            });
        }
        if self.parent == Some(self.id) {
            return Err(Error::Validation {
                field: "resource.parent".into(),
                message: format!("{} cannot be its own parent", self.id),
            });
        }
        let alias_providers = self
            .capabilities
            .iter()
            .filter(|c| matches!(c, Capability::AliasProvider(_)))
            .count();
        let room_providers = self
            .capabilities
            .iter()
            .filter(|c| matches!(c, Capability::RoomProvider { .. }))
            .count();
        if alias_providers > 1 || room_providers > 1 {
            return Err(Error::Validation {
                field: "resource.capabilities".into(),
                message: format!("{} declares a provider capability more than once", self.id),
            });
        }
        Ok(())
    }
}
