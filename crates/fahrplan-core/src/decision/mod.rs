//! Decision resolution and the recompute trigger.
//!
//! Resolving a decision is a two-step protocol with no atomicity across
//! the steps:
//!
//! 1. Persist the chosen option as a plan fact (`recompute = false`).
//! 2. Request full recomputation of the plan.
//!
//! If step 1 succeeds but step 2 fails, the fact change persists and the
//! visible plan is stale. That state is reported as
//! [`DecisionError::RecomputeFailed`] and recovered by re-issuing only
//! the recompute ([`retry_recompute`]); the fact write is idempotent but
//! must not be repeated, so retries never go through step 1 again.
//!
//! The core never reconciles old and new task lists: after a successful
//! recompute the caller discards its working set and reloads wholesale.

use thiserror::Error;
use uuid::Uuid;

use fahrplan_engine::models::{Plan, Task, TaskKind};
use fahrplan_engine::EngineError;

use crate::engine::PlanEngine;

/// Errors from resolving a decision task.
#[derive(Debug, Error)]
pub enum DecisionError {
    /// The task is not decision-kind.
    #[error("task {task_key:?} is not a decision task")]
    NotADecision { task_key: String },

    /// A decision-kind task without a decision definition is a generation
    /// defect; there is nothing to resolve against.
    #[error("decision task {task_key:?} carries no decision definition")]
    MissingDefinition { task_key: String },

    /// The chosen option is not one of the decision's options.
    #[error("unknown option {option:?} for decision {task_key:?} (expected one of: {})", expected.join(", "))]
    UnknownOption {
        task_key: String,
        option: String,
        expected: Vec<String>,
    },

    /// Step 1 failed: nothing was written, the whole operation may be
    /// retried from the start.
    #[error("failed to record decision {task_key:?} as a plan fact")]
    FactPatch {
        task_key: String,
        #[source]
        source: EngineError,
    },

    /// Step 2 failed: the fact is persisted but the plan is stale. Retry
    /// with [`retry_recompute`] only; do not re-issue the fact write.
    #[error("decision recorded but recomputation of plan {plan_id} failed")]
    RecomputeFailed {
        plan_id: Uuid,
        #[source]
        source: EngineError,
    },
}

/// Validate the chosen option and return the fact patch it implies.
///
/// Pure half of the protocol, split out for testability.
pub fn plan_fact_patch(
    task: &Task,
    option_key: &str,
) -> Result<serde_json::Map<String, serde_json::Value>, DecisionError> {
    if task.task_kind != TaskKind::Decision {
        return Err(DecisionError::NotADecision {
            task_key: task.task_key.clone(),
        });
    }
    let spec = task
        .decision()
        .ok_or_else(|| DecisionError::MissingDefinition {
            task_key: task.task_key.clone(),
        })?;
    if !spec.options.iter().any(|o| o.key == option_key) {
        return Err(DecisionError::UnknownOption {
            task_key: task.task_key.clone(),
            option: option_key.to_owned(),
            expected: spec.options.iter().map(|o| o.key.clone()).collect(),
        });
    }

    let mut facts = serde_json::Map::new();
    facts.insert(
        spec.fact.clone(),
        serde_json::Value::String(option_key.to_owned()),
    );
    Ok(facts)
}

/// Resolve a decision: record the chosen option as a plan fact, then
/// request full recomputation. Returns the regenerated plan.
pub async fn resolve_decision(
    engine: &dyn PlanEngine,
    plan_id: Uuid,
    task: &Task,
    option_key: &str,
) -> Result<Plan, DecisionError> {
    let facts = plan_fact_patch(task, option_key)?;

    tracing::info!(
        plan_id = %plan_id,
        task_key = %task.task_key,
        option = %option_key,
        "resolving decision"
    );

    // Step 1: persist the fact, without recomputing yet.
    engine
        .patch_facts(plan_id, facts, false)
        .await
        .map_err(|source| DecisionError::FactPatch {
            task_key: task.task_key.clone(),
            source,
        })?;

    // Step 2: regenerate the plan from the updated facts.
    match engine.recompute(plan_id).await {
        Ok(plan) => {
            tracing::info!(plan_id = %plan_id, "plan recomputed after decision");
            Ok(plan)
        }
        Err(source) => {
            tracing::warn!(
                plan_id = %plan_id,
                error = %source,
                "fact recorded but recomputation failed; plan is stale"
            );
            Err(DecisionError::RecomputeFailed { plan_id, source })
        }
    }
}

/// Re-issue only the recompute half of a failed decision resolution.
pub async fn retry_recompute(
    engine: &dyn PlanEngine,
    plan_id: Uuid,
) -> Result<Plan, DecisionError> {
    engine
        .recompute(plan_id)
        .await
        .map_err(|source| DecisionError::RecomputeFailed { plan_id, source })
}
