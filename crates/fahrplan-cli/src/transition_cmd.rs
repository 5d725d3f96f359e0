//! `fahrplan done` / `undo` / `dismiss` commands: task status
//! transitions through the session's state machine.

use anyhow::Result;

use fahrplan_core::session::{PlanSession, SessionError};
use fahrplan_core::transition::TransitionError;
use fahrplan_engine::models::TaskStatus;

/// Mark a task done. Without `force`, a blocked task is refused and its
/// unresolved prerequisites are listed.
pub async fn run_done(session: &mut PlanSession, task_key: &str, force: bool) -> Result<()> {
    match session.set_status(task_key, TaskStatus::Done, force).await {
        Ok(task) => {
            if task.force_completed {
                println!("Task {task_key} done (forced past unresolved prerequisites).");
            } else {
                println!("Task {task_key} done.");
            }
            Ok(())
        }
        Err(SessionError::Transition(TransitionError::Blocked { unresolved, .. })) => {
            println!("Task {task_key} is blocked by:");
            for key in &unresolved {
                println!("  {key}");
            }
            anyhow::bail!("task {task_key} not completed; re-run with --force to override")
        }
        Err(e) => Err(e.into()),
    }
}

/// Revert a done task to todo.
pub async fn run_undo(session: &mut PlanSession, task_key: &str) -> Result<()> {
    session.set_status(task_key, TaskStatus::Todo, false).await?;
    println!("Task {task_key} reopened.");
    Ok(())
}

/// Dismiss an open task.
///
/// Dismissal does not satisfy dependents; tasks waiting on a dismissed
/// prerequisite stay blocked until forced.
pub async fn run_dismiss(session: &mut PlanSession, task_key: &str) -> Result<()> {
    session
        .set_status(task_key, TaskStatus::Dismissed, false)
        .await?;
    println!("Task {task_key} dismissed.");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use fahrplan_engine::{EngineClient, EngineConfig};
    use fahrplan_test_utils::{make_plan, make_snapshot_task, make_task, MockEngine};

    async fn blocked_session() -> (MockEngine, PlanSession) {
        let plan = make_plan(vec![
            make_snapshot_task("standesamt", &[]),
            make_snapshot_task("kindergeld", &["standesamt"]),
        ]);
        let plan_id = plan.id;
        let tasks = vec![
            make_task(plan_id, "standesamt", 0),
            make_task(plan_id, "kindergeld", 1),
        ];
        let mock = MockEngine::start(plan, tasks).await;
        let client = EngineClient::new(&EngineConfig::new(&mock.base_url)).unwrap();
        let session = PlanSession::load(Arc::new(client), plan_id).await.unwrap();
        (mock, session)
    }

    #[tokio::test]
    async fn done_on_blocked_task_returns_error() {
        let (_mock, mut session) = blocked_session().await;

        let err = run_done(&mut session, "kindergeld", false)
            .await
            .unwrap_err();
        assert!(
            err.to_string().contains("not completed"),
            "unexpected error: {err}"
        );
        // The refusal left the task untouched.
        assert_eq!(
            session.task("kindergeld").unwrap().status,
            TaskStatus::Todo
        );
    }

    #[tokio::test]
    async fn done_with_force_succeeds_on_blocked_task() {
        let (_mock, mut session) = blocked_session().await;

        run_done(&mut session, "kindergeld", true)
            .await
            .expect("force should override the gate");
        assert_eq!(
            session.task("kindergeld").unwrap().status,
            TaskStatus::Done
        );
    }
}
