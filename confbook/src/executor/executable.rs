//! Executables and their lifecycle.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::Interval;

/// Identifier of an executable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ExecutableId(u64);

impl ExecutableId {
    /// Returns the raw identifier.
    #[must_use]
    pub const fn value(self) -> u64 {
        self.0
    }
}

impl From<u64> for ExecutableId {
    fn from(value: u64) -> Self {
        Self(value)
    }
}

impl fmt::Display for ExecutableId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "exe:{}", self.0)
    }
}

/// Lifecycle state of an executable.
///
/// The main line is `NotStarted -> Starting -> Started -> Stopping ->
/// Stopped`. `StartingFailed` and `StoppingFailed` are entered only from
/// the matching in-progress state and are never left.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutableState {
    /// Not allocated yet.
    NotAllocated,
    /// Allocated and waiting to be started.
    NotStarted,
    /// Starting was skipped (e.g. it is handled by a migration).
    Skipped,
    /// The device is being asked to start it.
    Starting,
    /// Running.
    Started,
    /// Running with some parts missing.
    PartiallyStarted,
    /// Starting failed.
    StartingFailed,
    /// The device is being asked to stop it.
    Stopping,
    /// Stopped.
    Stopped,
    /// Stopping failed.
    StoppingFailed,
    /// Resources released for good.
    Finalized,
    /// Finalization failed.
    FinalizationFailed,
    /// Marked for deletion.
    ToDelete,
}

impl ExecutableState {
    /// Checks whether the executable is running in this state.
    #[must_use]
    pub const fn is_started(self) -> bool {
        matches!(self, Self::Started | Self::PartiallyStarted | Self::Stopping)
    }

    /// Checks whether no event can leave this state.
    #[must_use]
    pub const fn is_absorbing(self) -> bool {
        matches!(self, Self::StartingFailed | Self::StoppingFailed | Self::ToDelete)
    }

    /// Checks whether the executable may still be changed.
    #[must_use]
    pub const fn is_modifiable(self) -> bool {
        !self.is_absorbing() && !matches!(self, Self::Finalized | Self::FinalizationFailed)
    }

    /// Returns the state reached after `event`, or `None` when the event is
    /// not allowed in this state.
    #[must_use]
    pub const fn next(self, event: ExecutableEvent) -> Option<Self> {
        use ExecutableEvent as E;
        let idle = matches!(self, Self::NotStarted | Self::Skipped | Self::Stopped);
        match (self, event) {
            (Self::NotAllocated, E::Allocate) => Some(Self::NotStarted),
            (Self::NotStarted, E::Skip) => Some(Self::Skipped),
            (Self::NotStarted | Self::Skipped, E::BeginStart) => Some(Self::Starting),
            (Self::Starting, E::Start) => Some(Self::Started),
            (Self::Starting, E::StartPartially) => Some(Self::PartiallyStarted),
            (Self::Starting, E::StartFailed) => Some(Self::StartingFailed),
            (Self::Started | Self::PartiallyStarted, E::BeginStop) => Some(Self::Stopping),
            (Self::Stopping, E::Stop) => Some(Self::Stopped),
            (Self::Stopping, E::StopFailed) => Some(Self::StoppingFailed),
            (Self::FinalizationFailed, E::Finalize) => Some(Self::Finalized),
            (_, E::Finalize) if idle => Some(Self::Finalized),
            (_, E::FinalizeFailed) if idle => Some(Self::FinalizationFailed),
            (Self::NotAllocated | Self::Finalized | Self::FinalizationFailed, E::Delete) => {
                Some(Self::ToDelete)
            }
            (_, E::Delete) if idle => Some(Self::ToDelete),
            _ => None,
        }
    }
}

impl fmt::Display for ExecutableState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::NotAllocated => "not-allocated",
            Self::NotStarted => "not-started",
            Self::Skipped => "skipped",
            Self::Starting => "starting",
            Self::Started => "started",
            Self::PartiallyStarted => "partially-started",
            Self::StartingFailed => "starting-failed",
            Self::Stopping => "stopping",
            Self::Stopped => "stopped",
            Self::StoppingFailed => "stopping-failed",
            Self::Finalized => "finalized",
            Self::FinalizationFailed => "finalization-failed",
            Self::ToDelete => "to-delete",
        };
        write!(f, "{name}")
    }
}

/// Something that happened to an executable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExecutableEvent {
    /// Its reservation was allocated.
    Allocate,
    /// The start was handed to the device.
    BeginStart,
    /// Starting succeeded.
    Start,
    /// Starting succeeded only partially.
    StartPartially,
    /// Starting failed.
    StartFailed,
    /// Starting is not needed.
    Skip,
    /// The stop was handed to the device.
    BeginStop,
    /// Stopping succeeded.
    Stop,
    /// Stopping failed.
    StopFailed,
    /// Finalization succeeded.
    Finalize,
    /// Finalization failed.
    FinalizeFailed,
    /// Its reservation was deleted.
    Delete,
}

impl fmt::Display for ExecutableEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Allocate => "allocate",
            Self::BeginStart => "begin starting",
            Self::Start => "start",
            Self::StartPartially => "start partially",
            Self::StartFailed => "fail starting",
            Self::Skip => "skip",
            Self::BeginStop => "begin stopping",
            Self::Stop => "stop",
            Self::StopFailed => "fail stopping",
            Self::Finalize => "finalize",
            Self::FinalizeFailed => "fail finalization",
            Self::Delete => "delete",
        };
        write!(f, "{name}")
    }
}

/// Runtime realization of a reservation, such as a virtual room.
///
/// Children are executables that must be running before this one starts
/// (for example the rooms a connection joins).
///
/// # Examples
///
/// ```
/// use chrono::{Duration, TimeZone, Utc};
/// use confbook::executor::{Executable, ExecutableEvent, ExecutableId, ExecutableState};
/// use confbook::Interval;
///
/// let start = Utc.with_ymd_and_hms(2013, 1, 1, 12, 0, 0).unwrap();
/// let slot = Interval::from_duration(start, Duration::hours(2)).unwrap();
/// let mut room = Executable::new(ExecutableId::from(1), slot);
///
/// assert_eq!(room.state(), ExecutableState::NotStarted);
/// room.apply(ExecutableEvent::BeginStart).unwrap();
/// room.apply(ExecutableEvent::Start).unwrap();
/// assert!(room.state().is_started());
/// assert!(room.apply(ExecutableEvent::Skip).is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Executable {
    id: ExecutableId,
    slot: Interval,
    state: ExecutableState,
    #[serde(default)]
    children: Vec<ExecutableId>,
}

impl Executable {
    /// Creates a not yet started executable.
    #[must_use]
    pub const fn new(id: ExecutableId, slot: Interval) -> Self {
        Self {
            id,
            slot,
            state: ExecutableState::NotStarted,
            children: Vec::new(),
        }
    }

    /// Sets the initial state.
    #[must_use]
    pub const fn with_state(mut self, state: ExecutableState) -> Self {
        self.state = state;
        self
    }

    /// Adds a child executable.
    #[must_use]
    pub fn with_child(mut self, child: ExecutableId) -> Self {
        self.add_child(child);
        self
    }

    /// Returns the identifier.
    #[must_use]
    pub const fn id(&self) -> ExecutableId {
        self.id
    }

    /// Returns the slot in which the executable runs.
    #[must_use]
    pub const fn slot(&self) -> &Interval {
        &self.slot
    }

    /// Returns the current state.
    #[must_use]
    pub const fn state(&self) -> ExecutableState {
        self.state
    }

    /// Returns the child executables.
    #[must_use]
    pub fn children(&self) -> &[ExecutableId] {
        &self.children
    }

    /// Adds a child executable unless it is already present.
    pub fn add_child(&mut self, child: ExecutableId) {
        if !self.children.contains(&child) {
            self.children.push(child);
        }
    }

    /// Applies a lifecycle event.
    ///
    /// # Errors
    ///
    /// Returns [`Error::IllegalTransition`] when the event is not allowed in
    /// the current state; the state is left unchanged.
    pub fn apply(&mut self, event: ExecutableEvent) -> Result<ExecutableState> {
        let next = self.state.next(event).ok_or_else(|| Error::IllegalTransition {
            executable: self.id.value(),
            state: self.state.to_string(),
            event: event.to_string(),
        })?;
        log::debug!("Executable {} {} -> {}", self.id, self.state, next);
        self.state = next;
        Ok(next)
    }
}
