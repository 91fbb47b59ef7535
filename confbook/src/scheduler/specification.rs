//! What a booking request asks for.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::resource::{AliasType, ResourceId, TechnologySet};

/// Aliases requested either on their own or for a room.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AliasSpecification {
    /// Technologies at least one produced alias must belong to.
    #[serde(default)]
    pub technologies: TechnologySet,
    /// Alias types the provider must produce.
    #[serde(default)]
    pub alias_types: Vec<AliasType>,
    /// Explicitly requested value.
    #[serde(default)]
    pub value: Option<String>,
    /// Explicitly requested alias provider.
    #[serde(default)]
    pub provider: Option<ResourceId>,
    /// Resource the aliases are allocated for, if any.
    #[serde(default)]
    pub target_resource: Option<ResourceId>,
}

impl AliasSpecification {
    /// Requests one alias of the given type.
    #[must_use]
    pub fn of_type(alias_type: AliasType) -> Self {
        Self {
            alias_types: vec![alias_type],
            ..Self::default()
        }
    }

    /// Requests a specific value.
    #[must_use]
    pub fn with_value(mut self, value: impl Into<String>) -> Self {
        self.value = Some(value.into());
        self
    }

    /// Requests a specific provider.
    #[must_use]
    pub fn with_provider(mut self, provider: ResourceId) -> Self {
        self.provider = Some(provider);
        self
    }
}

/// A virtual room with a participant count.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoomSpecification {
    /// Licenses to reserve.
    pub participant_count: u32,
    /// Acceptable technology combinations; the device must support all
    /// technologies of one variant.
    pub technology_variants: Vec<TechnologySet>,
    /// Pinned device, if any.
    #[serde(default)]
    pub resource: Option<ResourceId>,
    /// Aliases the room must receive.
    #[serde(default)]
    pub aliases: Vec<AliasSpecification>,
}

/// One participant side of a compartment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EndpointSpecification {
    /// A terminal managed by the system.
    Resource {
        /// The terminal.
        resource: ResourceId,
    },
    /// Endpoints outside the system dialing in.
    External {
        /// Technologies the endpoints use.
        technologies: TechnologySet,
        /// Number of such endpoints.
        count: u32,
    },
}

impl EndpointSpecification {
    /// Number of participants the endpoint stands for.
    #[must_use]
    pub const fn participant_count(&self) -> u32 {
        match self {
            Self::Resource { .. } => 1,
            Self::External { count, .. } => *count,
        }
    }
}

/// A specification of what to allocate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Specification {
    /// A whole resource.
    Resource {
        /// The requested resource.
        resource: ResourceId,
    },
    /// A value of an alias provider.
    Value {
        /// The alias provider.
        provider: ResourceId,
        /// Explicitly requested value.
        #[serde(default)]
        value: Option<String>,
    },
    /// Aliases.
    Alias(AliasSpecification),
    /// Several aliases sharing one request.
    AliasSet {
        /// The requested aliases.
        aliases: Vec<AliasSpecification>,
    },
    /// A virtual room.
    Room(RoomSpecification),
    /// Endpoints connected together.
    Compartment {
        /// The endpoints.
        endpoints: Vec<EndpointSpecification>,
    },
    /// Independent child specifications.
    Composite {
        /// The children.
        children: Vec<Specification>,
    },
}

impl Specification {
    /// Short name of the variant.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Resource { .. } => "resource",
            Self::Value { .. } => "value",
            Self::Alias(_) => "alias",
            Self::AliasSet { .. } => "alias set",
            Self::Room(_) => "room",
            Self::Compartment { .. } => "compartment",
            Self::Composite { .. } => "composite",
        }
    }

    /// Returns every technology the specification mentions.
    #[must_use]
    pub fn technologies(&self) -> TechnologySet {
        match self {
            Self::Resource { .. } | Self::Value { .. } => TechnologySet::new(),
            Self::Alias(alias) => alias.technologies.clone(),
            Self::AliasSet { aliases } => aliases
                .iter()
                .flat_map(|a| a.technologies.iter().copied())
                .collect(),
            Self::Room(room) => room
                .technology_variants
                .iter()
                .flat_map(|set| set.iter().copied())
                .collect(),
            Self::Compartment { endpoints } => endpoints
                .iter()
                .filter_map(|endpoint| match endpoint {
                    EndpointSpecification::External { technologies, .. } => Some(technologies),
                    EndpointSpecification::Resource { .. } => None,
                })
                .flat_map(|set| set.iter().copied())
                .collect(),
            Self::Composite { children } => children
                .iter()
                .flat_map(|child| child.technologies())
                .collect(),
        }
    }
}

impl fmt::Display for Specification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Resource { resource } => write!(f, "resource {resource}"),
            Self::Value { provider, .. } => write!(f, "value in {provider}"),
            Self::Room(room) => write!(f, "room for {} participants", room.participant_count),
            other => f.write_str(other.name()),
        }
    }
}
