//! Actions an executor performs on executables.

use std::fmt;

use super::executable::{Executable, ExecutableId};

/// Category of an [`ExecutionAction`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ActionKind {
    /// Stop a running executable.
    Stop,
    /// Hand a running executable's role over to its successor.
    Migrate,
    /// Start an executable.
    Start,
    /// Push changes to a running executable.
    Update,
}

impl ActionKind {
    /// Returns the priority of the category; higher runs first.
    ///
    /// Stopping comes first so that devices are freed as early as possible.
    #[must_use]
    pub const fn priority(self) -> u8 {
        match self {
            Self::Stop => 5,
            Self::Migrate => 4,
            Self::Start => 3,
            Self::Update => 2,
        }
    }
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Stop => write!(f, "stop"),
            Self::Migrate => write!(f, "migrate"),
            Self::Start => write!(f, "start"),
            Self::Update => write!(f, "update"),
        }
    }
}

/// Handover from a running executable to the one that replaces it in the
/// following slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Migration {
    /// The executable being stopped.
    pub source: ExecutableId,
    /// The executable being started.
    pub target: ExecutableId,
    /// Whether the target simply takes over the source's device state, in
    /// which case neither needs to be started nor stopped.
    pub replacement: bool,
}

/// One pending lifecycle operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExecutionAction {
    /// Start an executable.
    Start {
        /// The executable.
        executable: ExecutableId,
        /// Its child executables.
        children: Vec<ExecutableId>,
    },
    /// Stop an executable.
    Stop {
        /// The executable.
        executable: ExecutableId,
        /// Its child executables.
        children: Vec<ExecutableId>,
    },
    /// Update an executable.
    Update {
        /// The executable.
        executable: ExecutableId,
        /// Its child executables.
        children: Vec<ExecutableId>,
    },
    /// Migrate between two executables.
    Migrate(Migration),
}

impl ExecutionAction {
    /// Starting `executable`.
    #[must_use]
    pub fn start(executable: &Executable) -> Self {
        Self::Start {
            executable: executable.id(),
            children: executable.children().to_vec(),
        }
    }

    /// Stopping `executable`.
    #[must_use]
    pub fn stop(executable: &Executable) -> Self {
        Self::Stop {
            executable: executable.id(),
            children: executable.children().to_vec(),
        }
    }

    /// Updating `executable`.
    #[must_use]
    pub fn update(executable: &Executable) -> Self {
        Self::Update {
            executable: executable.id(),
            children: executable.children().to_vec(),
        }
    }

    /// Migrating from `source` to `target`.
    #[must_use]
    pub const fn migrate(source: ExecutableId, target: ExecutableId, replacement: bool) -> Self {
        Self::Migrate(Migration {
            source,
            target,
            replacement,
        })
    }

    /// Returns the category.
    #[must_use]
    pub const fn kind(&self) -> ActionKind {
        match self {
            Self::Start { .. } => ActionKind::Start,
            Self::Stop { .. } => ActionKind::Stop,
            Self::Update { .. } => ActionKind::Update,
            Self::Migrate(_) => ActionKind::Migrate,
        }
    }

    /// Returns the priority of the action's category.
    #[must_use]
    pub const fn priority(&self) -> u8 {
        self.kind().priority()
    }

    /// Returns the executable the action operates on; migrations have none.
    #[must_use]
    pub const fn executable(&self) -> Option<ExecutableId> {
        match self {
            Self::Start { executable, .. }
            | Self::Stop { executable, .. }
            | Self::Update { executable, .. } => Some(*executable),
            Self::Migrate(_) => None,
        }
    }

    /// Returns the child executables the action's target depends on.
    #[must_use]
    pub fn children(&self) -> &[ExecutableId] {
        match self {
            Self::Start { children, .. }
            | Self::Stop { children, .. }
            | Self::Update { children, .. } => children,
            Self::Migrate(_) => &[],
        }
    }

    /// Returns a human-readable description of the action.
    #[must_use]
    pub fn description(&self) -> String {
        match self {
            Self::Start { executable, .. } => format!("Start [{executable}]"),
            Self::Stop { executable, .. } => format!("Stop [{executable}]"),
            Self::Update { executable, .. } => format!("Update [{executable}]"),
            Self::Migrate(migration) => format!(
                "Migration [from {} to {}]",
                migration.source, migration.target
            ),
        }
    }
}

impl fmt::Display for ExecutionAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.description())
    }
}
