//! Per-plan working set: the plan, its tasks, and the resolved dependency
//! map, loaded from the engine and queried/mutated by the presentation
//! layer.
//!
//! A session is logically single-threaded per plan. Commands take
//! `&mut self`, which serializes all access and gives at-most-one
//! outstanding transition per task by construction; the session holds no
//! locks of its own. Callers doing optimistic UI updates keep their own
//! prior copy and roll back on error -- the session only ever holds
//! engine-confirmed state.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use thiserror::Error;
use uuid::Uuid;

use fahrplan_engine::models::{Plan, Task, TaskStatus};
use fahrplan_engine::EngineError;

use crate::decision::{self, DecisionError};
use crate::deps::{self, DependencyMap, SnapshotError};
use crate::engine::PlanEngine;
use crate::schedule;
use crate::transition::{TaskStateMachine, TransitionError};

/// Errors surfaced by session commands.
///
/// Each variant stays a distinct kind so callers can route recovery:
/// `Transition(Blocked)` retries with force after confirmation,
/// `Decision(RecomputeFailed)` retries the recompute only, `Engine`
/// propagates transport failures unchanged.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("task {0:?} not found in plan")]
    UnknownTask(String),

    #[error(transparent)]
    Snapshot(#[from] SnapshotError),

    #[error(transparent)]
    Transition(#[from] TransitionError),

    #[error(transparent)]
    Decision(#[from] DecisionError),

    #[error("plan engine request failed")]
    Engine(#[from] EngineError),
}

/// The working set for one plan.
pub struct PlanSession {
    engine: Arc<dyn PlanEngine>,
    plan: Plan,
    tasks: Vec<Task>,
    dependencies: DependencyMap,
}

impl std::fmt::Debug for PlanSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PlanSession")
            .field("plan", &self.plan)
            .field("tasks", &self.tasks)
            .field("dependencies", &self.dependencies)
            .finish_non_exhaustive()
    }
}

impl PlanSession {
    /// Load a plan (with its dependency snapshot) and its tasks, validate
    /// the generated structure, and resolve dependencies once.
    pub async fn load(
        engine: Arc<dyn PlanEngine>,
        plan_id: Uuid,
    ) -> Result<Self, SessionError> {
        let plan = engine.fetch_plan(plan_id, true).await?;
        let tasks = engine.fetch_tasks(plan_id).await?;

        let mut session = Self {
            engine,
            plan,
            tasks: Vec::new(),
            dependencies: DependencyMap::new(),
        };
        session.adopt(tasks)?;
        Ok(session)
    }

    /// Discard the working set and reload everything from the engine.
    pub async fn reload(&mut self) -> Result<(), SessionError> {
        let plan = self.engine.fetch_plan(self.plan.id, true).await?;
        let tasks = self.engine.fetch_tasks(self.plan.id).await?;
        self.plan = plan;
        self.adopt(tasks)
    }

    /// Adopt a task set wholesale: validate keys, resolve dependencies
    /// from the current plan snapshot, verify acyclicity.
    ///
    /// A cycle or duplicate key is a fatal generation error from the
    /// engine; the session refuses the whole set rather than guessing.
    fn adopt(&mut self, tasks: Vec<Task>) -> Result<(), SessionError> {
        deps::verify_task_keys(&tasks)?;
        let dependencies = deps::resolve_dependencies(self.plan.snapshot(), &tasks);
        deps::verify_acyclic(&dependencies)?;

        tracing::debug!(
            plan_id = %self.plan.id,
            task_count = tasks.len(),
            "adopted task set"
        );

        self.tasks = tasks;
        self.dependencies = dependencies;
        Ok(())
    }

    // -----------------------------------------------------------------
    // Queries
    // -----------------------------------------------------------------

    pub fn plan(&self) -> &Plan {
        &self.plan
    }

    pub fn plan_id(&self) -> Uuid {
        self.plan.id
    }

    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    pub fn dependencies(&self) -> &DependencyMap {
        &self.dependencies
    }

    pub fn task(&self, task_key: &str) -> Option<&Task> {
        self.tasks.iter().find(|t| t.task_key == task_key)
    }

    /// Tasks in display order.
    pub fn sorted_tasks(&self) -> Vec<Task> {
        schedule::sorted_by_deadline(&self.tasks)
    }

    /// Plan progress in percent.
    pub fn progress(&self) -> u8 {
        schedule::progress(&self.tasks)
    }

    /// The first `n` open tasks in display order.
    pub fn next_deadlines(&self, n: usize) -> Vec<Task> {
        schedule::next_deadlines(&self.tasks, n)
    }

    /// All critical tasks in display order.
    pub fn critical_tasks(&self, today: NaiveDate) -> Vec<Task> {
        schedule::critical_tasks(&self.tasks, today)
    }

    /// The unresolved prerequisites of a task.
    pub fn unresolved_for(&self, task_key: &str) -> Result<Vec<String>, SessionError> {
        let task = self
            .task(task_key)
            .ok_or_else(|| SessionError::UnknownTask(task_key.to_owned()))?;
        let statuses = deps::status_index(&self.tasks);
        Ok(deps::unresolved_dependencies(task, &self.dependencies, &statuses))
    }

    /// Whether a task is currently blocked.
    pub fn is_blocked(&self, task_key: &str) -> Result<bool, SessionError> {
        let task = self
            .task(task_key)
            .ok_or_else(|| SessionError::UnknownTask(task_key.to_owned()))?;
        let statuses = deps::status_index(&self.tasks);
        Ok(deps::is_blocked(task, &self.dependencies, &statuses))
    }

    // -----------------------------------------------------------------
    // Commands
    // -----------------------------------------------------------------

    /// Transition a task's status.
    ///
    /// Validates through the state machine first (so a blocked or invalid
    /// transition never reaches the wire), then issues the write and
    /// adopts the engine's returned task in place of the local copy.
    pub async fn set_status(
        &mut self,
        task_key: &str,
        target: TaskStatus,
        force: bool,
    ) -> Result<&Task, SessionError> {
        let unresolved = self.unresolved_for(task_key)?;
        let idx = self
            .tasks
            .iter()
            .position(|t| t.task_key == task_key)
            .ok_or_else(|| SessionError::UnknownTask(task_key.to_owned()))?;
        let task = &self.tasks[idx];

        TaskStateMachine::plan(task, target, force, &unresolved, Utc::now())?;

        let updated = self
            .engine
            .update_task_status(self.plan.id, task.id, target, force)
            .await?;

        tracing::info!(
            plan_id = %self.plan.id,
            task_key = %task_key,
            status = %target,
            force = force,
            "task transitioned"
        );

        self.tasks[idx] = updated;
        Ok(&self.tasks[idx])
    }

    /// Toggle a task between `todo` and `done` (the checkbox path). A
    /// dismissed task is reinstated to `todo` first rather than jumping
    /// straight to `done`.
    pub async fn toggle(&mut self, task_key: &str) -> Result<&Task, SessionError> {
        let task = self
            .task(task_key)
            .ok_or_else(|| SessionError::UnknownTask(task_key.to_owned()))?;
        let target = match task.status {
            TaskStatus::Todo => TaskStatus::Done,
            TaskStatus::Done | TaskStatus::Dismissed => TaskStatus::Todo,
        };
        self.set_status(task_key, target, false).await
    }

    /// Resolve a decision task, then discard and reload the working set
    /// from the recomputed plan.
    ///
    /// On [`DecisionError::RecomputeFailed`] the fact is already
    /// persisted and the local set is stale; recover with
    /// [`Self::retry_recompute`], never by choosing again.
    pub async fn resolve_decision(
        &mut self,
        task_key: &str,
        option_key: &str,
    ) -> Result<(), SessionError> {
        let task = self
            .task(task_key)
            .ok_or_else(|| SessionError::UnknownTask(task_key.to_owned()))?
            .clone();

        decision::resolve_decision(self.engine.as_ref(), self.plan.id, &task, option_key)
            .await?;
        self.reload().await
    }

    /// Re-issue the recompute after a failed decision resolution, then
    /// reload.
    pub async fn retry_recompute(&mut self) -> Result<(), SessionError> {
        decision::retry_recompute(self.engine.as_ref(), self.plan.id).await?;
        self.reload().await
    }
}
