//! Dependency ordered batches of execution actions.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use crate::error::{Error, Result};

use super::action::{ActionKind, ExecutionAction};
use super::executable::ExecutableId;

/// Handle of an action added to an [`ExecutionPlan`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ActionId(usize);

impl ActionId {
    /// Returns the position of the action in the plan.
    #[must_use]
    pub const fn value(self) -> usize {
        self.0
    }
}

impl fmt::Display for ActionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "action {}", self.0)
    }
}

#[derive(Debug)]
struct Node {
    action: ExecutionAction,
    /// Actions that must be removed before this one may be popped.
    dependencies: BTreeSet<ActionId>,
    /// Actions waiting for this one.
    parents: BTreeSet<ActionId>,
    skip_perform: bool,
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Color {
    White,
    Gray,
    Black,
}

/// Pull-based source of execution actions.
///
/// Actions are added, then [`ExecutionPlan::build`] derives their
/// dependencies from the executable tree:
///
/// - starting or updating an executable waits for the actions of its
///   children (children start first);
/// - stopping a child waits for stopping its parent (parents stop first);
/// - a migration waits for its target to start, and stopping its source
///   waits for the migration.
///
/// The caller then repeatedly pops a batch, performs the actions of the
/// batch (possibly concurrently) and removes each of them, until the plan
/// is empty.
///
/// # Examples
///
/// ```
/// use chrono::{Duration, TimeZone, Utc};
/// use confbook::executor::{Executable, ExecutableId, ExecutionAction, ExecutionPlan};
/// use confbook::Interval;
///
/// let start = Utc.with_ymd_and_hms(2013, 1, 1, 12, 0, 0).unwrap();
/// let slot = Interval::from_duration(start, Duration::hours(1)).unwrap();
/// let room = Executable::new(ExecutableId::from(2), slot);
/// let connection = Executable::new(ExecutableId::from(1), slot).with_child(room.id());
///
/// let mut plan = ExecutionPlan::new();
/// plan.add(ExecutionAction::start(&connection)).unwrap();
/// plan.add(ExecutionAction::start(&room)).unwrap();
/// plan.build().unwrap();
///
/// let batch = plan.pop_execution_actions().unwrap();
/// assert_eq!(plan.action(batch[0]).unwrap().executable(), Some(room.id()));
/// plan.remove_execution_action(batch[0]).unwrap();
///
/// let batch = plan.pop_execution_actions().unwrap();
/// assert_eq!(plan.action(batch[0]).unwrap().executable(), Some(connection.id()));
/// plan.remove_execution_action(batch[0]).unwrap();
/// assert!(plan.is_empty());
/// ```
#[derive(Debug, Default)]
pub struct ExecutionPlan {
    nodes: Vec<Node>,
    by_executable: BTreeMap<ExecutableId, ActionId>,
    remaining: BTreeSet<ActionId>,
    satisfied: BTreeSet<ActionId>,
    popped: BTreeSet<ActionId>,
    completed: Vec<ActionId>,
    built: bool,
}

impl ExecutionPlan {
    /// Creates an empty plan.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an action.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ExecutionPlan`] when the plan is already built or
    /// the executable already has an action in the plan.
    pub fn add(&mut self, action: ExecutionAction) -> Result<ActionId> {
        if self.built {
            return Err(plan_error(format!("cannot add {action} to a built plan")));
        }
        let id = ActionId(self.nodes.len());
        if let Some(executable) = action.executable() {
            if self.by_executable.contains_key(&executable) {
                return Err(plan_error(format!("{executable} already has an action in the plan")));
            }
            self.by_executable.insert(executable, id);
        }
        self.nodes.push(Node {
            action,
            dependencies: BTreeSet::new(),
            parents: BTreeSet::new(),
            skip_perform: false,
        });
        self.remaining.insert(id);
        Ok(id)
    }

    /// Returns an action by its handle.
    #[must_use]
    pub fn action(&self, id: ActionId) -> Option<&ExecutionAction> {
        self.nodes.get(id.0).map(|node| &node.action)
    }

    /// Returns the action planned for `executable`.
    #[must_use]
    pub fn action_of(&self, executable: ExecutableId) -> Option<ActionId> {
        self.by_executable.get(&executable).copied()
    }

    /// Checks whether the action completes without being performed.
    #[must_use]
    pub fn is_skip_perform(&self, id: ActionId) -> bool {
        self.nodes.get(id.0).is_some_and(|node| node.skip_perform)
    }

    /// Checks whether [`ExecutionPlan::build`] succeeded.
    #[must_use]
    pub const fn is_built(&self) -> bool {
        self.built
    }

    /// Derives dependencies between the added actions.
    ///
    /// Children that have no action in the plan impose no dependency.
    ///
    /// # Errors
    ///
    /// Returns [`Error::CycleDetected`] when the dependencies form a cycle,
    /// and [`Error::ExecutionPlan`] when the plan is already built or a
    /// migration's source is not being stopped or its target not being
    /// started.
    pub fn build(&mut self) -> Result<()> {
        if self.built {
            return Err(plan_error("plan is already built".into()));
        }
        let ids: Vec<ActionId> = self.remaining.iter().copied().collect();
        for id in ids {
            let action = self.nodes[id.0].action.clone();
            if let ExecutionAction::Migrate(migration) = &action {
                let source = self.planned(migration.source, ActionKind::Stop).ok_or_else(|| {
                    plan_error(format!("{} is not planned for stopping", migration.source))
                })?;
                let target = self.planned(migration.target, ActionKind::Start).ok_or_else(|| {
                    plan_error(format!("{} is not planned for starting", migration.target))
                })?;
                if migration.replacement {
                    self.nodes[source.0].skip_perform = true;
                    self.nodes[target.0].skip_perform = true;
                } else {
                    self.depend(source, id);
                    self.depend(id, target);
                }
                continue;
            }
            for child in action.children() {
                let Some(child_action) = self.action_of(*child) else {
                    continue;
                };
                let both_stop = action.kind() == ActionKind::Stop
                    && self.nodes[child_action.0].action.kind() == ActionKind::Stop;
                if both_stop {
                    self.depend(child_action, id);
                } else {
                    self.depend(id, child_action);
                }
            }
        }

        if let Some(cycle) = self.find_cycle() {
            let cycle: Vec<String> = cycle
                .into_iter()
                .map(|id| self.nodes[id.0].action.description())
                .collect();
            log::error!("Execution plan contains a cycle: {}", cycle.join(" -> "));
            return Err(Error::CycleDetected { cycle });
        }

        self.satisfied = self
            .remaining
            .iter()
            .copied()
            .filter(|id| self.nodes[id.0].dependencies.is_empty())
            .collect();
        for id in &self.satisfied {
            self.remaining.remove(id);
        }
        self.built = true;
        log::debug!(
            "Execution plan built ({} ready, {} waiting)",
            self.satisfied.len(),
            self.remaining.len()
        );
        Ok(())
    }

    /// Pops every ready action of the highest priority.
    ///
    /// Nothing is returned while popped actions of a higher priority are
    /// still in flight. Ready actions marked as skipped complete
    /// immediately.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ExecutionPlan`] when the plan is not built.
    pub fn pop_execution_actions(&mut self) -> Result<Vec<ActionId>> {
        self.pop(None)
    }

    /// Like [`ExecutionPlan::pop_execution_actions`], but only considers
    /// actions of `kind`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ExecutionPlan`] when the plan is not built.
    pub fn pop_execution_actions_of(&mut self, kind: ActionKind) -> Result<Vec<ActionId>> {
        self.pop(Some(kind))
    }

    /// Marks a popped action as finished, making its dependents ready once
    /// nothing else holds them back.
    ///
    /// Before the plan is built the action is dropped from the plan instead.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ExecutionPlan`] when the action was not popped or
    /// was already removed.
    pub fn remove_execution_action(&mut self, id: ActionId) -> Result<()> {
        if !self.built {
            if !self.remaining.remove(&id) {
                return Err(plan_error(format!("{id} is not in the plan")));
            }
            if let Some(executable) = self.nodes[id.0].action.executable() {
                self.by_executable.remove(&executable);
            }
            return Ok(());
        }
        if !self.popped.remove(&id) {
            return Err(plan_error(format!(
                "{id} has not been popped or has already been removed"
            )));
        }
        log::debug!("{} ended", self.nodes[id.0].action);
        self.complete(id)
    }

    /// Checks whether every action has been removed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.remaining.is_empty() && self.satisfied.is_empty() && self.popped.is_empty()
    }

    /// Returns popped actions not yet removed.
    pub fn popped_actions(&self) -> impl Iterator<Item = ActionId> + '_ {
        self.popped.iter().copied()
    }

    /// Returns completed actions in completion order, including skipped
    /// ones.
    #[must_use]
    pub fn completed_actions(&self) -> &[ActionId] {
        &self.completed
    }

    fn planned(&self, executable: ExecutableId, kind: ActionKind) -> Option<ActionId> {
        self.action_of(executable)
            .filter(|id| self.nodes[id.0].action.kind() == kind)
    }

    fn depend(&mut self, from: ActionId, to: ActionId) {
        self.nodes[from.0].dependencies.insert(to);
        self.nodes[to.0].parents.insert(from);
    }

    fn find_cycle(&self) -> Option<Vec<ActionId>> {
        let mut colors = vec![Color::White; self.nodes.len()];
        let mut path = Vec::new();
        for &id in &self.remaining {
            if colors[id.0] == Color::White {
                if let Some(cycle) = self.visit(id, &mut colors, &mut path) {
                    return Some(cycle);
                }
            }
        }
        None
    }

    fn visit(&self, id: ActionId, colors: &mut [Color], path: &mut Vec<ActionId>) -> Option<Vec<ActionId>> {
        colors[id.0] = Color::Gray;
        path.push(id);
        for &dependency in &self.nodes[id.0].dependencies {
            match colors[dependency.0] {
                Color::Gray => {
                    let start = path.iter().position(|&on_path| on_path == dependency)?;
                    let mut cycle = path[start..].to_vec();
                    cycle.push(dependency);
                    return Some(cycle);
                }
                Color::White => {
                    if let Some(cycle) = self.visit(dependency, colors, path) {
                        return Some(cycle);
                    }
                }
                Color::Black => {}
            }
        }
        path.pop();
        colors[id.0] = Color::Black;
        None
    }

    fn pop(&mut self, kind: Option<ActionKind>) -> Result<Vec<ActionId>> {
        if !self.built {
            return Err(plan_error("plan must be built before popping actions".into()));
        }
        loop {
            let skipped = self
                .satisfied
                .iter()
                .copied()
                .find(|id| self.nodes[id.0].skip_perform);
            let Some(skipped) = skipped else {
                break;
            };
            self.satisfied.remove(&skipped);
            log::debug!("{} skipped", self.nodes[skipped.0].action);
            self.complete(skipped)?;
        }

        let in_flight = self
            .popped
            .iter()
            .map(|id| self.nodes[id.0].action.priority())
            .max()
            .unwrap_or(0);
        let candidates: Vec<ActionId> = self
            .satisfied
            .iter()
            .copied()
            .filter(|id| kind.map_or(true, |kind| self.nodes[id.0].action.kind() == kind))
            .collect();
        let Some(best) = candidates
            .iter()
            .map(|id| self.nodes[id.0].action.priority())
            .max()
        else {
            return Ok(Vec::new());
        };
        if best < in_flight {
            return Ok(Vec::new());
        }

        let batch: Vec<ActionId> = candidates
            .into_iter()
            .filter(|id| self.nodes[id.0].action.priority() == best)
            .collect();
        for id in &batch {
            self.satisfied.remove(id);
            self.popped.insert(*id);
            log::debug!("{} prepared", self.nodes[id.0].action);
        }
        Ok(batch)
    }

    fn complete(&mut self, id: ActionId) -> Result<()> {
        self.completed.push(id);
        let parents: Vec<ActionId> = self.nodes[id.0].parents.iter().copied().collect();
        for parent in parents {
            let node = &mut self.nodes[parent.0];
            node.dependencies.remove(&id);
            if node.dependencies.is_empty() {
                if !self.remaining.remove(&parent) {
                    return Err(plan_error(format!("{parent} is no longer in the plan")));
                }
                self.satisfied.insert(parent);
            }
        }
        Ok(())
    }
}

fn plan_error(details: String) -> Error {
    Error::ExecutionPlan { details }
}
