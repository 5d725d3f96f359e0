//! The `PlanEngine` trait -- the adapter interface for the external plan
//! engine.
//!
//! The engine owns plan generation, recomputation, and persistence; the
//! core only ever reads plans/tasks and writes status transitions and
//! fact patches. The trait is intentionally object-safe so it can be
//! stored as `Arc<dyn PlanEngine>` in a [`crate::session::PlanSession`],
//! which also lets tests substitute an in-process fake.

use async_trait::async_trait;
use uuid::Uuid;

use fahrplan_engine::models::{Plan, Task, TaskStatus};
use fahrplan_engine::EngineError;

/// Adapter interface for the external plan engine.
///
/// Implementations must not retry: every failure propagates unchanged so
/// callers can distinguish retryable states (see the decision resolution
/// protocol in [`crate::decision`]).
#[async_trait]
pub trait PlanEngine: Send + Sync {
    /// Fetch a plan, optionally including its dependency snapshot.
    async fn fetch_plan(
        &self,
        plan_id: Uuid,
        include_snapshot: bool,
    ) -> Result<Plan, EngineError>;

    /// Fetch all tasks of a plan, metadata included.
    async fn fetch_tasks(&self, plan_id: Uuid) -> Result<Vec<Task>, EngineError>;

    /// Request a task status transition. Returns the updated task.
    async fn update_task_status(
        &self,
        plan_id: Uuid,
        task_id: Uuid,
        status: TaskStatus,
        force: bool,
    ) -> Result<Task, EngineError>;

    /// Write plan facts. With `recompute` set the engine regenerates the
    /// plan in the same call; decision resolution deliberately does not
    /// use that (see [`crate::decision`]).
    async fn patch_facts(
        &self,
        plan_id: Uuid,
        facts: serde_json::Map<String, serde_json::Value>,
        recompute: bool,
    ) -> Result<Plan, EngineError>;

    /// Regenerate the plan's task set and dependency snapshot from its
    /// current facts.
    async fn recompute(&self, plan_id: Uuid) -> Result<Plan, EngineError>;
}

// Compile-time assertion: PlanEngine must be object-safe.
// If this line compiles, the trait can be used as `dyn PlanEngine`.
const _: () = {
    fn _assert_object_safe(_: &dyn PlanEngine) {}
};
