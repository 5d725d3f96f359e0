//! Thin HTTP client for the plan engine API.
//!
//! One method per endpoint, no retries, no local state. Timeouts come from
//! [`EngineConfig`]; everything else (retry policy, optimistic updates,
//! rollback) is owned by the caller.

use reqwest::{Response, StatusCode};
use serde::de::DeserializeOwned;
use uuid::Uuid;

use crate::config::EngineConfig;
use crate::error::{EngineError, ErrorEnvelope};
use crate::models::{
    FactPatchRequest, Plan, PlanCreateRequest, Task, TaskStatus, TransitionRequest,
};

/// HTTP client for the plan engine.
#[derive(Debug, Clone)]
pub struct EngineClient {
    http: reqwest::Client,
    base_url: String,
}

impl EngineClient {
    /// Build a client from the given config.
    pub fn new(config: &EngineConfig) -> Result<Self, EngineError> {
        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()?;
        Ok(Self {
            http,
            base_url: config.base_url.clone(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Fetch a plan, optionally including its dependency snapshot.
    pub async fn get_plan(
        &self,
        plan_id: Uuid,
        include_snapshot: bool,
    ) -> Result<Plan, EngineError> {
        tracing::debug!(plan_id = %plan_id, include_snapshot, "fetching plan");
        let resp = self
            .http
            .get(self.url(&format!("/plans/{plan_id}")))
            .query(&[("include_snapshot", include_snapshot)])
            .send()
            .await?;
        decode(resp).await
    }

    /// Fetch all tasks of a plan, metadata included.
    pub async fn list_tasks(&self, plan_id: Uuid) -> Result<Vec<Task>, EngineError> {
        tracing::debug!(plan_id = %plan_id, "fetching tasks");
        let resp = self
            .http
            .get(self.url(&format!("/plans/{plan_id}/tasks")))
            .query(&[("include_metadata", true)])
            .send()
            .await?;
        decode(resp).await
    }

    /// Request a task status transition. Returns the updated task.
    pub async fn update_task_status(
        &self,
        plan_id: Uuid,
        task_id: Uuid,
        status: TaskStatus,
        force: bool,
    ) -> Result<Task, EngineError> {
        tracing::debug!(
            plan_id = %plan_id,
            task_id = %task_id,
            status = %status,
            force,
            "requesting task transition"
        );
        let body = TransitionRequest { status, force };
        let resp = self
            .http
            .patch(self.url(&format!("/plans/{plan_id}/tasks/{task_id}")))
            .json(&body)
            .send()
            .await?;
        decode(resp).await
    }

    /// Patch plan facts, optionally requesting recomputation in the same
    /// call. Returns the updated plan.
    pub async fn patch_facts(
        &self,
        plan_id: Uuid,
        facts: serde_json::Map<String, serde_json::Value>,
        recompute: bool,
    ) -> Result<Plan, EngineError> {
        tracing::debug!(
            plan_id = %plan_id,
            fact_count = facts.len(),
            recompute,
            "patching plan facts"
        );
        let body = FactPatchRequest { facts, recompute };
        let resp = self
            .http
            .patch(self.url(&format!("/plans/{plan_id}/facts")))
            .json(&body)
            .send()
            .await?;
        decode(resp).await
    }

    /// Request full recomputation of a plan from its current facts.
    /// Returns the regenerated plan.
    pub async fn recompute(&self, plan_id: Uuid) -> Result<Plan, EngineError> {
        tracing::debug!(plan_id = %plan_id, "requesting plan recompute");
        let resp = self
            .http
            .post(self.url(&format!("/plans/{plan_id}/recompute")))
            .send()
            .await?;
        decode(resp).await
    }

    /// Create a new plan from a template and initial facts.
    pub async fn create_plan(
        &self,
        template_key: &str,
        facts: serde_json::Map<String, serde_json::Value>,
    ) -> Result<Plan, EngineError> {
        tracing::debug!(template_key, "creating plan");
        let body = PlanCreateRequest {
            template_key: template_key.to_owned(),
            facts,
        };
        let resp = self.http.post(self.url("/plans")).json(&body).send().await?;
        decode(resp).await
    }
}

/// Decode a successful response body, or translate a non-success status
/// into [`EngineError::Api`] / [`EngineError::UnexpectedStatus`].
async fn decode<T: DeserializeOwned>(resp: Response) -> Result<T, EngineError> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp.json::<T>().await?);
    }
    Err(error_from_response(status, resp.text().await.ok()))
}

fn error_from_response(status: StatusCode, body: Option<String>) -> EngineError {
    if let Some(body) = body {
        if let Ok(envelope) = serde_json::from_str::<ErrorEnvelope>(&body) {
            let code = envelope
                .error
                .code
                .unwrap_or_else(|| format!("HTTP_{}", status.as_u16()));
            let message = envelope.error.message.unwrap_or_default();
            tracing::warn!(
                status = status.as_u16(),
                code = %code,
                "plan engine rejected request"
            );
            return EngineError::Api {
                status: status.as_u16(),
                code,
                message,
            };
        }
    }
    tracing::warn!(
        status = status.as_u16(),
        "plan engine returned non-success status without an error envelope"
    );
    EngineError::UnexpectedStatus {
        status: status.as_u16(),
    }
}
