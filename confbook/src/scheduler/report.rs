//! Diagnostic reports explaining allocation decisions.
//!
//! Every [`ReservationTask`](super::ReservationTask) produces one report
//! whose children describe what its sub-steps did. Reports are built bottom
//! up and never mutated once attached to a parent.

use std::fmt;

use chrono::{DateTime, Duration, Utc};
use thiserror::Error;

use crate::executor::ExecutableId;
use crate::reservation::ReservationId;
use crate::resource::{AliasType, ResourceId};
use crate::Interval;

/// How serious a report is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// Progress information.
    Information,
    /// The step failed.
    Error,
}

/// Who is allowed to see a report.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Visibility {
    /// The user who asked for the allocation.
    User,
    /// An administrator diagnosing the allocation.
    Administrator,
}

/// What a report is about.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReportKind {
    /// Allocation of a whole resource.
    AllocatingResource {
        /// The requested resource.
        resource: ResourceId,
    },
    /// Allocation of a value from an alias provider.
    AllocatingValue {
        /// The alias provider.
        provider: ResourceId,
    },
    /// Allocation of aliases.
    AllocatingAlias {
        /// The requested alias types.
        alias_types: Vec<AliasType>,
        /// The requested value, if any.
        value: Option<String>,
    },
    /// Allocation of a set of aliases.
    AllocatingAliasSet,
    /// Allocation of a virtual room.
    AllocatingRoom {
        /// Requested participant count.
        participants: u32,
    },
    /// Allocation of a compartment.
    AllocatingCompartment {
        /// Number of endpoints to connect.
        endpoints: usize,
    },
    /// Allocation of a composite specification.
    AllocatingComposite,
    /// Candidate resources are being ordered.
    SortingResources,
    /// No resource matched the specification.
    ResourceNotFound,
    /// The resource is disabled for scheduling.
    ResourceNotAllocatable {
        /// The rejected resource.
        resource: ResourceId,
    },
    /// The resource is already reserved in the slot.
    ResourceAlreadyAllocated {
        /// The rejected resource.
        resource: ResourceId,
    },
    /// The slot ends after the resource's maximum future.
    ResourceNotAvailable {
        /// The rejected resource.
        resource: ResourceId,
        /// Latest allowed end of a slot.
        maximum: DateTime<Utc>,
    },
    /// Not enough free licenses on a room provider.
    ResourceRoomCapacityExceeded {
        /// The rejected room provider.
        resource: ResourceId,
        /// Licenses still free in the slot.
        available: u32,
        /// Licensed capacity.
        maximum: u32,
    },
    /// The resource was requested more than once in one run.
    ResourceMultipleRequested {
        /// The repeated resource.
        resource: ResourceId,
    },
    /// The reused reservation is already used by someone else.
    ReservationAlreadyUsed {
        /// The reused reservation.
        reservation: ReservationId,
    },
    /// An existing reservation is reused.
    ReservationReusing {
        /// The reused reservation.
        reservation: ReservationId,
    },
    /// The requested slot is outside the reused reservation's slot.
    ReservationRequestInvalidSlot {
        /// The reused reservation.
        reservation: ReservationId,
        /// The requested slot.
        slot: Interval,
        /// The reused reservation's slot.
        reused_slot: Interval,
    },
    /// The requested value is taken.
    ValueAlreadyAllocated {
        /// The requested value.
        value: String,
    },
    /// The requested value matches no pattern.
    ValueInvalid {
        /// The requested value.
        value: String,
    },
    /// Every value of a provider is taken.
    ValueNotAvailable {
        /// The exhausted alias provider.
        provider: ResourceId,
    },
    /// The slot is longer than allowed.
    MaximumDurationExceeded {
        /// Requested duration.
        duration: Duration,
        /// Allowed duration.
        maximum: Duration,
    },
    /// Reservations the allocation collides with.
    CollidingReservations {
        /// The colliding reservations.
        reservations: Vec<ReservationId>,
    },
    /// A compartment needs at least two endpoints.
    CompartmentNotEnoughEndpoint,
    /// The specification cannot be allocated at all.
    SpecificationNotAllocatable {
        /// Description of the specification.
        specification: String,
    },
    /// The executable of a reused reservation is reused as well.
    ExecutableReusing {
        /// The reused executable.
        executable: ExecutableId,
    },
}

impl ReportKind {
    /// Stable identifier of the report kind.
    #[must_use]
    pub const fn id(&self) -> &'static str {
        match self {
            Self::AllocatingResource { .. } => "allocating-resource",
            Self::AllocatingValue { .. } => "allocating-value",
            Self::AllocatingAlias { .. } => "allocating-alias",
            Self::AllocatingAliasSet => "allocating-alias-set",
            Self::AllocatingRoom { .. } => "allocating-room",
            Self::AllocatingCompartment { .. } => "allocating-compartment",
            Self::AllocatingComposite => "allocating-composite",
            Self::SortingResources => "sorting-resources",
            Self::ResourceNotFound => "resource-not-found",
            Self::ResourceNotAllocatable { .. } => "resource-not-allocatable",
            Self::ResourceAlreadyAllocated { .. } => "resource-already-allocated",
            Self::ResourceNotAvailable { .. } => "resource-not-available",
            Self::ResourceRoomCapacityExceeded { .. } => "resource-room-capacity-exceeded",
            Self::ResourceMultipleRequested { .. } => "resource-multiple-requested",
            Self::ReservationAlreadyUsed { .. } => "reservation-already-used",
            Self::ReservationReusing { .. } => "reservation-reusing",
            Self::ReservationRequestInvalidSlot { .. } => "reservation-request-invalid-slot",
            Self::ValueAlreadyAllocated { .. } => "value-already-allocated",
            Self::ValueInvalid { .. } => "value-invalid",
            Self::ValueNotAvailable { .. } => "value-not-available",
            Self::MaximumDurationExceeded { .. } => "maximum-duration-exceeded",
            Self::CollidingReservations { .. } => "colliding-reservations",
            Self::CompartmentNotEnoughEndpoint => "compartment-not-enough-endpoint",
            Self::SpecificationNotAllocatable { .. } => "specification-not-allocatable",
            Self::ExecutableReusing { .. } => "executable-reusing",
        }
    }

    /// Severity of the report kind.
    #[must_use]
    pub const fn severity(&self) -> Severity {
        match self {
            Self::AllocatingResource { .. }
            | Self::AllocatingValue { .. }
            | Self::AllocatingAlias { .. }
            | Self::AllocatingAliasSet
            | Self::AllocatingRoom { .. }
            | Self::AllocatingCompartment { .. }
            | Self::AllocatingComposite
            | Self::SortingResources
            | Self::ReservationReusing { .. }
            | Self::CollidingReservations { .. }
            | Self::ExecutableReusing { .. } => Severity::Information,
            _ => Severity::Error,
        }
    }

    /// Checks whether users may see reports of this kind.
    ///
    /// Administrators see everything.
    #[must_use]
    pub const fn is_visible_to(&self, visibility: Visibility) -> bool {
        match visibility {
            Visibility::Administrator => true,
            Visibility::User => !matches!(
                self,
                Self::SortingResources
                    | Self::CollidingReservations { .. }
                    | Self::AllocatingValue { .. }
                    | Self::ResourceMultipleRequested { .. }
            ),
        }
    }
}

impl fmt::Display for ReportKind {
    #[allow(clippy::too_many_lines)]
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AllocatingResource { resource } => write!(f, "Allocating resource {resource}."),
            Self::AllocatingValue { provider } => write!(f, "Allocating value in {provider}."),
            Self::AllocatingAlias { alias_types, value } => {
                let types: Vec<String> = alias_types.iter().map(|t| format!("{t:?}")).collect();
                write!(f, "Allocating alias for types [{}]", types.join(", "))?;
                match value {
                    Some(value) => write!(f, " with value {value}."),
                    None => write!(f, "."),
                }
            }
            Self::AllocatingAliasSet => write!(f, "Allocating alias set."),
            Self::AllocatingRoom { participants } => {
                write!(f, "Allocating room for {participants} participants.")
            }
            Self::AllocatingCompartment { endpoints } => {
                write!(f, "Allocating compartment with {endpoints} endpoints.")
            }
            Self::AllocatingComposite => write!(f, "Allocating composite specification."),
            Self::SortingResources => write!(f, "Sorting resources."),
            Self::ResourceNotFound => write!(f, "No available resource was found."),
            Self::ResourceNotAllocatable { resource } => {
                write!(f, "Resource {resource} is not allocatable.")
            }
            Self::ResourceAlreadyAllocated { resource } => {
                write!(f, "Resource {resource} is already allocated.")
            }
            Self::ResourceNotAvailable { resource, maximum } => write!(
                f,
                "Resource {resource} is not available for the requested time slot. \
                 The maximum date/time for allocation is {maximum}."
            ),
            Self::ResourceRoomCapacityExceeded {
                resource,
                available,
                maximum,
            } => write!(
                f,
                "Resource {resource} has only {available} of {maximum} licenses available."
            ),
            Self::ResourceMultipleRequested { resource } => {
                write!(f, "Resource {resource} is requested multiple times.")
            }
            Self::ReservationAlreadyUsed { reservation } => {
                write!(f, "Reused reservation {reservation} is already used.")
            }
            Self::ReservationReusing { reservation } => {
                write!(f, "Reusing existing reservation {reservation}.")
            }
            Self::ReservationRequestInvalidSlot {
                reservation,
                slot,
                reused_slot,
            } => write!(
                f,
                "Requested time slot {slot} is not available in reused reservation \
                 {reservation} ({reused_slot})."
            ),
            Self::ValueAlreadyAllocated { value } => write!(f, "Value {value} is already allocated."),
            Self::ValueInvalid { value } => write!(f, "Value {value} is invalid."),
            Self::ValueNotAvailable { provider } => {
                write!(f, "No value is available in {provider}.")
            }
            Self::MaximumDurationExceeded { duration, maximum } => write!(
                f,
                "Duration {} min is longer than maximum {} min.",
                duration.num_minutes(),
                maximum.num_minutes()
            ),
            Self::CollidingReservations { reservations } => {
                let ids: Vec<String> = reservations.iter().map(ToString::to_string).collect();
                write!(f, "Colliding reservations: {}.", ids.join(", "))
            }
            Self::CompartmentNotEnoughEndpoint => {
                write!(f, "Compartment must contain at least two endpoints.")
            }
            Self::SpecificationNotAllocatable { specification } => {
                write!(f, "Specification {specification} cannot be allocated.")
            }
            Self::ExecutableReusing { executable } => {
                write!(f, "Reusing executable {executable}.")
            }
        }
    }
}

/// A node of the report tree.
///
/// # Examples
///
/// ```
/// use confbook::scheduler::{ReportKind, SchedulerReport};
/// use confbook::ResourceId;
///
/// let failure = SchedulerReport::new(ReportKind::ResourceAlreadyAllocated {
///     resource: ResourceId::from(1),
/// });
/// let report = SchedulerReport::with_children(
///     ReportKind::AllocatingResource { resource: ResourceId::from(1) },
///     vec![failure.clone()],
/// );
///
/// assert!(report.is_failure());
/// assert_eq!(report.root_cause(), &failure);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchedulerReport {
    kind: ReportKind,
    children: Vec<SchedulerReport>,
}

impl SchedulerReport {
    /// Creates a leaf report.
    #[must_use]
    pub const fn new(kind: ReportKind) -> Self {
        Self {
            kind,
            children: Vec::new(),
        }
    }

    /// Creates a report owning already built children.
    #[must_use]
    pub const fn with_children(kind: ReportKind, children: Vec<Self>) -> Self {
        Self { kind, children }
    }

    /// Returns the report kind.
    #[must_use]
    pub const fn kind(&self) -> &ReportKind {
        &self.kind
    }

    /// Returns the child reports.
    #[must_use]
    pub fn children(&self) -> &[Self] {
        &self.children
    }

    /// Returns the severity of this node alone.
    #[must_use]
    pub const fn severity(&self) -> Severity {
        self.kind.severity()
    }

    /// Checks whether this report or any descendant is an error.
    #[must_use]
    pub fn is_failure(&self) -> bool {
        self.severity() == Severity::Error || self.children.iter().any(Self::is_failure)
    }

    /// Returns the report explaining why allocation failed.
    ///
    /// Descends into the last failing child until a report without failing
    /// children is reached.
    #[must_use]
    pub fn root_cause(&self) -> &Self {
        match self.children.iter().rev().find(|child| child.is_failure()) {
            Some(child) => child.root_cause(),
            None => self,
        }
    }

    /// Finds the first report of the tree (pre-order) matching `predicate`.
    pub fn find<P>(&self, predicate: P) -> Option<&Self>
    where
        P: Fn(&ReportKind) -> bool + Copy,
    {
        if predicate(&self.kind) {
            return Some(self);
        }
        self.children.iter().find_map(|child| child.find(predicate))
    }

    /// Renders the tree with two spaces of indentation per level.
    ///
    /// Reports hidden for `visibility` are skipped; their visible
    /// descendants move up to the hidden report's level.
    #[must_use]
    pub fn render(&self, visibility: Visibility) -> String {
        let mut output = String::new();
        self.render_into(&mut output, visibility, 0);
        output
    }

    fn render_into(&self, output: &mut String, visibility: Visibility, depth: usize) {
        let child_depth = if self.kind.is_visible_to(visibility) {
            output.push_str(&"  ".repeat(depth));
            output.push('-');
            if self.severity() == Severity::Error {
                output.push_str(" [error]");
            }
            output.push(' ');
            output.push_str(&self.kind.to_string());
            output.push('\n');
            depth + 1
        } else {
            depth
        };
        for child in &self.children {
            child.render_into(output, visibility, child_depth);
        }
    }
}

impl fmt::Display for SchedulerReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.kind.fmt(f)
    }
}

/// Allocation failure carrying the full report tree.
#[derive(Debug, Clone, Error)]
#[error("allocation failed: {}", .report.root_cause())]
pub struct SchedulerError {
    report: SchedulerReport,
}

impl SchedulerError {
    /// Wraps a failure report.
    #[must_use]
    pub const fn new(report: SchedulerReport) -> Self {
        Self { report }
    }

    /// Returns the full report tree.
    #[must_use]
    pub const fn report(&self) -> &SchedulerReport {
        &self.report
    }

    /// Returns the report explaining the failure.
    #[must_use]
    pub fn top_report(&self) -> &SchedulerReport {
        self.report.root_cause()
    }

    /// Unwraps the report tree.
    #[must_use]
    pub fn into_report(self) -> SchedulerReport {
        self.report
    }

    /// Maps the failure to the error shown to users.
    #[must_use]
    pub fn user_error(&self) -> UserError {
        UserError::from_report(&self.report)
    }
}

impl From<ReportKind> for SchedulerError {
    fn from(kind: ReportKind) -> Self {
        Self::new(SchedulerReport::new(kind))
    }
}

/// Allocation failure as presented to users.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UserError {
    /// The requested slot is outside the reused reservation's slot.
    #[error("requested time slot {slot} is outside reused reservation slot {reused_slot}")]
    ReusementInvalidSlot {
        /// The reused reservation.
        reservation: ReservationId,
        /// The requested slot.
        slot: Interval,
        /// The reused reservation's slot.
        reused_slot: Interval,
    },
    /// The reused reservation is already used in the slot.
    #[error("reused reservation {reservation} is already used")]
    ReusementAlreadyUsed {
        /// The reused reservation.
        reservation: ReservationId,
    },
    /// The slot ends too far in the future.
    #[error("the slot ends after the maximum date/time {maximum}")]
    MaximumFutureExceeded {
        /// Latest allowed end of a slot.
        maximum: DateTime<Utc>,
    },
    /// The slot is too long.
    #[error("the duration {} min exceeds the maximum {} min", duration.num_minutes(), maximum.num_minutes())]
    MaximumDurationExceeded {
        /// Requested duration.
        duration: Duration,
        /// Allowed duration.
        maximum: Duration,
    },
    /// Not enough participant licenses.
    #[error("only {available} of {maximum} licenses are available")]
    RoomCapacityExceeded {
        /// Licenses still free.
        available: u32,
        /// Licensed capacity.
        maximum: u32,
    },
    /// The requested alias is taken.
    #[error("alias {value} is already allocated")]
    AliasAlreadyAllocated {
        /// The requested value.
        value: String,
    },
    /// No alias can be allocated.
    #[error("no alias is available")]
    AliasNotAvailable,
    /// Any other failure.
    #[error("{message}")]
    Unknown {
        /// Description of the root cause.
        message: String,
    },
}

impl UserError {
    /// Maps a report tree to the error shown to users.
    ///
    /// The mapping looks at the root cause only and never fails; reports
    /// without a dedicated user error become [`UserError::Unknown`].
    #[must_use]
    pub fn from_report(report: &SchedulerReport) -> Self {
        let cause = report.root_cause();
        match cause.kind() {
            ReportKind::ReservationRequestInvalidSlot {
                reservation,
                slot,
                reused_slot,
            } => Self::ReusementInvalidSlot {
                reservation: *reservation,
                slot: *slot,
                reused_slot: *reused_slot,
            },
            ReportKind::ReservationAlreadyUsed { reservation } => Self::ReusementAlreadyUsed {
                reservation: *reservation,
            },
            ReportKind::ResourceNotAvailable { maximum, .. } => Self::MaximumFutureExceeded {
                maximum: *maximum,
            },
            ReportKind::MaximumDurationExceeded { duration, maximum } => {
                Self::MaximumDurationExceeded {
                    duration: *duration,
                    maximum: *maximum,
                }
            }
            ReportKind::ResourceRoomCapacityExceeded {
                available, maximum, ..
            } => Self::RoomCapacityExceeded {
                available: *available,
                maximum: *maximum,
            },
            ReportKind::ValueAlreadyAllocated { value } => Self::AliasAlreadyAllocated {
                value: value.clone(),
            },
            ReportKind::ValueNotAvailable { .. } => Self::AliasNotAvailable,
            other => Self::Unknown {
                message: other.to_string(),
            },
        }
    }
}
