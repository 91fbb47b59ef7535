//! Starting, stopping and migrating executables.
//!
//! An [`Executable`] is the runtime realization of a reservation (a virtual
//! room, a connection). Lifecycle operations are collected as
//! [`ExecutionAction`]s into an [`ExecutionPlan`], which orders them by
//! dependencies and priority; a [`PlanExecutor`] then performs them through an
//! [`ExecutableConnector`].

mod action;
mod executable;
mod plan;
mod runner;

pub use action::{ActionKind, ExecutionAction, Migration};
pub use executable::{Executable, ExecutableEvent, ExecutableId, ExecutableState};
pub use plan::{ActionId, ExecutionPlan};
pub use runner::{ExecutableConnector, ExecutionResult, PlanExecutor};
