//! [`PlanEngine`] implementation backed by the HTTP client from
//! `fahrplan-engine`.

use async_trait::async_trait;
use uuid::Uuid;

use fahrplan_engine::models::{Plan, Task, TaskStatus};
use fahrplan_engine::{EngineClient, EngineError};

use super::trait_def::PlanEngine;

#[async_trait]
impl PlanEngine for EngineClient {
    async fn fetch_plan(
        &self,
        plan_id: Uuid,
        include_snapshot: bool,
    ) -> Result<Plan, EngineError> {
        self.get_plan(plan_id, include_snapshot).await
    }

    async fn fetch_tasks(&self, plan_id: Uuid) -> Result<Vec<Task>, EngineError> {
        self.list_tasks(plan_id).await
    }

    async fn update_task_status(
        &self,
        plan_id: Uuid,
        task_id: Uuid,
        status: TaskStatus,
        force: bool,
    ) -> Result<Task, EngineError> {
        EngineClient::update_task_status(self, plan_id, task_id, status, force).await
    }

    async fn patch_facts(
        &self,
        plan_id: Uuid,
        facts: serde_json::Map<String, serde_json::Value>,
        recompute: bool,
    ) -> Result<Plan, EngineError> {
        EngineClient::patch_facts(self, plan_id, facts, recompute).await
    }

    async fn recompute(&self, plan_id: Uuid) -> Result<Plan, EngineError> {
        EngineClient::recompute(self, plan_id).await
    }
}
