//! Shared test utilities: an in-process mock plan engine.
//!
//! Serves the plan engine's HTTP API from in-memory state on an
//! ephemeral port, so integration tests exercise the real client and
//! core against real wire traffic. The state handle exposes call
//! counters and a recompute failure switch for testing the two-step
//! decision protocol.

use std::sync::{Arc, Mutex};

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, patch, post};
use axum::{Json, Router};
use chrono::Utc;
use serde::Deserialize;
use uuid::Uuid;

use fahrplan_engine::models::{
    FactPatchRequest, Plan, PlanStatus, SnapshotTask, Task, TaskKind, TaskMetadata, TaskStatus,
    TransitionRequest,
};

// ---------------------------------------------------------------------------
// State
// ---------------------------------------------------------------------------

/// Mutable state behind the mock engine.
pub struct EngineState {
    pub plan: Plan,
    pub tasks: Vec<Task>,
    /// Plan/tasks swapped in by the next successful recompute. `None`
    /// leaves the current set in place.
    pub next_generation: Option<(Plan, Vec<Task>)>,
    /// When set, recompute requests fail with a 500 error envelope.
    pub fail_recompute: bool,
    pub fact_patch_calls: usize,
    pub recompute_calls: usize,
}

type SharedState = Arc<Mutex<EngineState>>;

/// Handle to a running mock engine.
pub struct MockEngine {
    pub base_url: String,
    pub state: SharedState,
}

impl MockEngine {
    /// Start the mock engine on an ephemeral port.
    pub async fn start(plan: Plan, tasks: Vec<Task>) -> Self {
        let state: SharedState = Arc::new(Mutex::new(EngineState {
            plan,
            tasks,
            next_generation: None,
            fail_recompute: false,
            fact_patch_calls: 0,
            recompute_calls: 0,
        }));

        let router = build_router(state.clone());
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("failed to bind mock engine listener");
        let addr = listener.local_addr().expect("failed to read local addr");
        tokio::spawn(async move {
            axum::serve(listener, router)
                .await
                .expect("mock engine server failed");
        });

        Self {
            base_url: format!("http://{addr}"),
            state,
        }
    }

    /// Queue the plan/tasks the next successful recompute swaps in.
    pub fn set_next_generation(&self, plan: Plan, tasks: Vec<Task>) {
        self.state.lock().unwrap().next_generation = Some((plan, tasks));
    }

    pub fn set_fail_recompute(&self, fail: bool) {
        self.state.lock().unwrap().fail_recompute = fail;
    }

    pub fn fact_patch_calls(&self) -> usize {
        self.state.lock().unwrap().fact_patch_calls
    }

    pub fn recompute_calls(&self) -> usize {
        self.state.lock().unwrap().recompute_calls
    }
}

// ---------------------------------------------------------------------------
// Router
// ---------------------------------------------------------------------------

fn build_router(state: SharedState) -> Router {
    Router::new()
        .route("/plans/{id}", get(get_plan))
        .route("/plans/{id}/tasks", get(list_tasks))
        .route("/plans/{id}/tasks/{task_id}", patch(update_task_status))
        .route("/plans/{id}/facts", patch(patch_facts))
        .route("/plans/{id}/recompute", post(recompute))
        .with_state(state)
}

fn error_envelope(status: StatusCode, code: &str, message: &str) -> axum::response::Response {
    let body = serde_json::json!({ "error": { "code": code, "message": message } });
    (status, Json(body)).into_response()
}

#[derive(Debug, Deserialize)]
struct PlanQuery {
    #[serde(default)]
    include_snapshot: bool,
}

async fn get_plan(
    State(state): State<SharedState>,
    Path(plan_id): Path<Uuid>,
    Query(query): Query<PlanQuery>,
) -> axum::response::Response {
    let state = state.lock().unwrap();
    if state.plan.id != plan_id {
        return error_envelope(StatusCode::NOT_FOUND, "PLAN_NOT_FOUND", "no such plan");
    }
    let mut plan = state.plan.clone();
    if !query.include_snapshot {
        plan.dependency_snapshot = None;
    }
    Json(plan).into_response()
}

async fn list_tasks(
    State(state): State<SharedState>,
    Path(plan_id): Path<Uuid>,
) -> axum::response::Response {
    let state = state.lock().unwrap();
    if state.plan.id != plan_id {
        return error_envelope(StatusCode::NOT_FOUND, "PLAN_NOT_FOUND", "no such plan");
    }
    Json(state.tasks.clone()).into_response()
}

/// Mirrors the real engine's transition semantics: the server applies
/// whatever status it is told (dependency gating is the client's job),
/// manages `completed_at` idempotently, and records the force marker.
async fn update_task_status(
    State(state): State<SharedState>,
    Path((plan_id, task_id)): Path<(Uuid, Uuid)>,
    Json(req): Json<TransitionRequest>,
) -> axum::response::Response {
    let mut state = state.lock().unwrap();
    if state.plan.id != plan_id {
        return error_envelope(StatusCode::NOT_FOUND, "PLAN_NOT_FOUND", "no such plan");
    }
    let Some(task) = state.tasks.iter_mut().find(|t| t.id == task_id) else {
        return error_envelope(StatusCode::NOT_FOUND, "TASK_NOT_FOUND", "no such task");
    };

    let now = Utc::now();
    let was_done = task.status == TaskStatus::Done;
    task.status = req.status;
    task.updated_at = now;
    if req.status == TaskStatus::Done {
        if !was_done {
            task.completed_at = Some(now);
            task.force_completed = req.force;
        }
    } else {
        task.completed_at = None;
        task.force_completed = false;
    }
    Json(task.clone()).into_response()
}

async fn patch_facts(
    State(state): State<SharedState>,
    Path(plan_id): Path<Uuid>,
    Json(req): Json<FactPatchRequest>,
) -> axum::response::Response {
    let mut state = state.lock().unwrap();
    if state.plan.id != plan_id {
        return error_envelope(StatusCode::NOT_FOUND, "PLAN_NOT_FOUND", "no such plan");
    }
    state.fact_patch_calls += 1;
    for (k, v) in req.facts {
        state.plan.facts.insert(k, v);
    }
    state.plan.updated_at = Utc::now();
    if req.recompute {
        apply_recompute(&mut state);
    }
    Json(state.plan.clone()).into_response()
}

async fn recompute(
    State(state): State<SharedState>,
    Path(plan_id): Path<Uuid>,
) -> axum::response::Response {
    let mut state = state.lock().unwrap();
    if state.plan.id != plan_id {
        return error_envelope(StatusCode::NOT_FOUND, "PLAN_NOT_FOUND", "no such plan");
    }
    state.recompute_calls += 1;
    if state.fail_recompute {
        return error_envelope(
            StatusCode::INTERNAL_SERVER_ERROR,
            "RECOMPUTE_FAILED",
            "plan engine could not regenerate the plan",
        );
    }
    apply_recompute(&mut state);
    Json(state.plan.clone()).into_response()
}

/// Regeneration derives tasks and snapshot from the facts; the facts
/// themselves persist across it.
fn apply_recompute(state: &mut EngineState) {
    if let Some((mut plan, tasks)) = state.next_generation.take() {
        plan.facts = std::mem::take(&mut state.plan.facts);
        state.plan = plan;
        state.tasks = tasks;
    }
    state.plan.updated_at = Utc::now();
}

// ---------------------------------------------------------------------------
// Builders
// ---------------------------------------------------------------------------

/// Build an active plan with the given dependency snapshot.
pub fn make_plan(snapshot: Vec<SnapshotTask>) -> Plan {
    let now = Utc::now();
    Plan {
        id: Uuid::new_v4(),
        template_key: "geburt".to_owned(),
        facts: serde_json::Map::new(),
        status: PlanStatus::Active,
        dependency_snapshot: Some(snapshot),
        created_at: now,
        updated_at: now,
    }
}

/// Build a todo task with defaulted metadata.
pub fn make_task(plan_id: Uuid, key: &str, sort_key: i64) -> Task {
    let now = Utc::now();
    Task {
        id: Uuid::new_v4(),
        plan_id,
        task_key: key.to_owned(),
        title: key.to_owned(),
        description: None,
        task_kind: TaskKind::Normal,
        status: TaskStatus::Todo,
        due_date: None,
        metadata: Some(TaskMetadata::default()),
        sort_key,
        completed_at: None,
        force_completed: false,
        created_at: now,
        updated_at: now,
    }
}

/// Build a snapshot entry keyed by the task key itself.
pub fn make_snapshot_task(key: &str, depends_on: &[&str]) -> SnapshotTask {
    SnapshotTask {
        id: key.to_owned(),
        task_key: Some(key.to_owned()),
        depends_on: depends_on.iter().map(|s| (*s).to_owned()).collect(),
    }
}
