//! Driving an execution plan against device connectors.

use std::collections::BTreeMap;

use crate::error::{Error, Result};

use super::action::{ExecutionAction, Migration};
use super::executable::{Executable, ExecutableEvent, ExecutableId};
use super::plan::ExecutionPlan;

/// Device-control collaborator performing the actions.
///
/// Each method reports whether the device accepted the operation.
/// Transport failures are the connector's business; the executor only
/// records the outcome.
pub trait ExecutableConnector {
    /// Starts `executable`.
    fn start(&mut self, executable: &Executable) -> bool;

    /// Stops `executable`.
    fn stop(&mut self, executable: &Executable) -> bool;

    /// Pushes changes of `executable` to its device.
    fn update(&mut self, executable: &Executable) -> bool;

    /// Hands the role of `source` over to `target`.
    fn migrate(&mut self, source: &Executable, target: &Executable) -> bool;
}

/// Result of running a plan.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExecutionResult {
    /// Whether this was a dry run (nothing performed).
    pub dry_run: bool,

    /// Descriptions of the performed (or, in a dry run, planned) actions in
    /// execution order.
    pub actions_taken: Vec<String>,

    /// Executables started.
    pub started: Vec<ExecutableId>,

    /// Executables stopped.
    pub stopped: Vec<ExecutableId>,

    /// Executables updated.
    pub updated: Vec<ExecutableId>,

    /// Migrations performed.
    pub migrated: Vec<Migration>,

    /// Executables whose action was rejected by the device.
    pub failed: Vec<ExecutableId>,
}

/// Runs [`ExecutionPlan`]s batch by batch.
///
/// # Examples
///
/// ```
/// use std::collections::BTreeMap;
/// use chrono::{Duration, TimeZone, Utc};
/// use confbook::executor::{
///     Executable, ExecutableConnector, ExecutableId, ExecutionAction, ExecutionPlan, PlanExecutor,
/// };
/// use confbook::Interval;
///
/// struct Accepting;
/// impl ExecutableConnector for Accepting {
///     fn start(&mut self, _: &Executable) -> bool { true }
///     fn stop(&mut self, _: &Executable) -> bool { true }
///     fn update(&mut self, _: &Executable) -> bool { true }
///     fn migrate(&mut self, _: &Executable, _: &Executable) -> bool { true }
/// }
///
/// let start = Utc.with_ymd_and_hms(2013, 1, 1, 12, 0, 0).unwrap();
/// let room = Executable::new(ExecutableId::from(1), Interval::from_duration(start, Duration::hours(1)).unwrap());
/// let mut plan = ExecutionPlan::new();
/// plan.add(ExecutionAction::start(&room)).unwrap();
///
/// let mut executables = BTreeMap::from([(room.id(), room)]);
/// let mut connector = Accepting;
/// let result = PlanExecutor::new(&mut executables, &mut connector).execute(&mut plan).unwrap();
///
/// assert_eq!(result.started, vec![ExecutableId::from(1)]);
/// assert!(executables[&ExecutableId::from(1)].state().is_started());
/// ```
pub struct PlanExecutor<'a, C: ExecutableConnector> {
    executables: &'a mut BTreeMap<ExecutableId, Executable>,
    connector: &'a mut C,
    dry_run: bool,
}

impl<'a, C: ExecutableConnector> PlanExecutor<'a, C> {
    /// Creates an executor over `executables`.
    #[must_use]
    pub fn new(executables: &'a mut BTreeMap<ExecutableId, Executable>, connector: &'a mut C) -> Self {
        Self {
            executables,
            connector,
            dry_run: false,
        }
    }

    /// Walks the plan without calling the connector or changing states.
    #[must_use]
    pub fn dry_run(mut self) -> Self {
        self.dry_run = true;
        self
    }

    /// Runs `plan` until it is empty, building it first when needed.
    ///
    /// Batches run sequentially; every action of a batch is removed from
    /// the plan once performed, whatever its outcome.
    ///
    /// # Errors
    ///
    /// Returns an error when the plan cannot be built, when an action refers
    /// to an unknown executable, when a state transition is illegal, or when
    /// the plan stalls with actions left.
    pub fn execute(&mut self, plan: &mut ExecutionPlan) -> Result<ExecutionResult> {
        if !plan.is_built() {
            plan.build()?;
        }
        let mut result = ExecutionResult {
            dry_run: self.dry_run,
            ..ExecutionResult::default()
        };

        while !plan.is_empty() {
            let batch = plan.pop_execution_actions()?;
            if batch.is_empty() {
                if plan.is_empty() {
                    break;
                }
                return Err(Error::ExecutionPlan {
                    details: "no action can be performed but the plan is not empty".into(),
                });
            }
            log::info!("Executing batch of {} action(s)", batch.len());
            for id in batch {
                let action = plan
                    .action(id)
                    .cloned()
                    .ok_or_else(|| Error::ExecutionPlan {
                        details: format!("{id} is not in the plan"),
                    })?;
                result.actions_taken.push(action.description());
                if !self.dry_run {
                    self.perform(&action, &mut result)?;
                }
                plan.remove_execution_action(id)?;
            }
        }
        Ok(result)
    }

    fn perform(&mut self, action: &ExecutionAction, result: &mut ExecutionResult) -> Result<()> {
        match action {
            ExecutionAction::Start { executable, .. } => {
                self.apply(*executable, ExecutableEvent::BeginStart)?;
                let accepted = self.connector.start(lookup(self.executables, *executable)?);
                let event = if accepted { ExecutableEvent::Start } else { ExecutableEvent::StartFailed };
                self.apply(*executable, event)?;
                if accepted {
                    result.started.push(*executable);
                } else {
                    log::warn!("Starting {executable} failed");
                    result.failed.push(*executable);
                }
            }
            ExecutionAction::Stop { executable, .. } => {
                self.apply(*executable, ExecutableEvent::BeginStop)?;
                let accepted = self.connector.stop(lookup(self.executables, *executable)?);
                let event = if accepted { ExecutableEvent::Stop } else { ExecutableEvent::StopFailed };
                self.apply(*executable, event)?;
                if accepted {
                    result.stopped.push(*executable);
                } else {
                    log::warn!("Stopping {executable} failed");
                    result.failed.push(*executable);
                }
            }
            ExecutionAction::Update { executable, .. } => {
                if self.connector.update(lookup(self.executables, *executable)?) {
                    result.updated.push(*executable);
                } else {
                    log::warn!("Updating {executable} failed");
                    result.failed.push(*executable);
                }
            }
            ExecutionAction::Migrate(migration) => {
                let source = lookup(self.executables, migration.source)?;
                let target = lookup(self.executables, migration.target)?;
                if self.connector.migrate(source, target) {
                    if migration.replacement {
                        self.apply(migration.source, ExecutableEvent::BeginStop)?;
                        self.apply(migration.source, ExecutableEvent::Stop)?;
                        self.apply(migration.target, ExecutableEvent::BeginStart)?;
                        self.apply(migration.target, ExecutableEvent::Start)?;
                    }
                    result.migrated.push(*migration);
                } else {
                    log::warn!("Migration from {} to {} failed", migration.source, migration.target);
                    result.failed.push(migration.target);
                }
            }
        }
        Ok(())
    }

    fn apply(&mut self, id: ExecutableId, event: ExecutableEvent) -> Result<()> {
        let executable = self.executables.get_mut(&id).ok_or_else(|| not_found(id))?;
        executable.apply(event).map(|_| ())
    }
}

fn lookup(executables: &BTreeMap<ExecutableId, Executable>, id: ExecutableId) -> Result<&Executable> {
    executables.get(&id).ok_or_else(|| not_found(id))
}

fn not_found(id: ExecutableId) -> Error {
    Error::NotFound {
        resource: format!("executable {id}"),
    }
}
