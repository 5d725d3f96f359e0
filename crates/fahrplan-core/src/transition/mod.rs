//! Task status state machine.
//!
//! Validates and plans status transitions for tasks, enforcing the
//! allowed transition graph, the dependency gate on completion, and
//! timestamp/marker management. Planning is pure: a validated
//! [`Transition`] carries the full resulting field set so status and its
//! derived fields change together or not at all. The wire write and the
//! adoption of the engine's response happen in
//! [`crate::session::PlanSession`].

use chrono::{DateTime, Utc};
use thiserror::Error;

use fahrplan_engine::models::{Task, TaskKind, TaskStatus};

/// Errors from planning a status transition.
#[derive(Debug, Error)]
pub enum TransitionError {
    /// Completion attempted without force while prerequisites are unmet.
    /// Recoverable: the caller may retry with force after explicit user
    /// confirmation.
    #[error("task {task_key:?} is blocked by unresolved dependencies: {}", unresolved.join(", "))]
    Blocked {
        task_key: String,
        unresolved: Vec<String>,
    },

    /// The requested edge is not in the transition graph.
    #[error("invalid status transition: {from} -> {to}")]
    InvalidTransition { from: TaskStatus, to: TaskStatus },

    /// Decision tasks resolve by choosing an option, never through the
    /// checkbox path.
    #[error("decision task {task_key:?} cannot transition via the status path")]
    DecisionTask { task_key: String },
}

/// A validated transition: the target status plus every derived field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transition {
    pub status: TaskStatus,
    pub completed_at: Option<DateTime<Utc>>,
    /// Whether the resulting completion is marked as force-overridden.
    pub force_completed: bool,
}

/// The task status state machine.
///
/// Enforces the valid transition graph:
///
/// ```text
/// todo      -> done       (gated on unresolved dependencies; force bypasses)
/// done      -> todo       (un-complete; clears timestamp and force marker)
/// todo      -> dismissed
/// dismissed -> todo
/// ```
///
/// Same-status transitions are idempotent no-ops: re-completing a done
/// task keeps its original `completed_at` and force marker.
pub struct TaskStateMachine;

impl TaskStateMachine {
    /// Check whether a transition from `from` to `to` is a valid edge
    /// in the state graph.
    pub fn is_valid_transition(from: TaskStatus, to: TaskStatus) -> bool {
        from == to
            || matches!(
                (from, to),
                (TaskStatus::Todo, TaskStatus::Done)
                    | (TaskStatus::Done, TaskStatus::Todo)
                    | (TaskStatus::Todo, TaskStatus::Dismissed)
                    | (TaskStatus::Dismissed, TaskStatus::Todo)
            )
    }

    /// Validate a transition and compute the resulting field set.
    ///
    /// - Decision-kind tasks are rejected outright.
    /// - Completion requires an empty `unresolved` set unless `force` is
    ///   set; a forced completion over unmet prerequisites is recorded in
    ///   the result's `force_completed` marker.
    /// - `completed_at` is set exactly while the resulting status is
    ///   `done`; re-completion keeps the original timestamp.
    pub fn plan(
        task: &Task,
        to: TaskStatus,
        force: bool,
        unresolved: &[String],
        now: DateTime<Utc>,
    ) -> Result<Transition, TransitionError> {
        if task.task_kind == TaskKind::Decision {
            return Err(TransitionError::DecisionTask {
                task_key: task.task_key.clone(),
            });
        }

        let from = task.status;
        if !Self::is_valid_transition(from, to) {
            return Err(TransitionError::InvalidTransition { from, to });
        }

        if from == to {
            // Idempotent no-op: the current fields already hold.
            return Ok(Transition {
                status: to,
                completed_at: task.completed_at,
                force_completed: task.force_completed,
            });
        }

        if to == TaskStatus::Done {
            if !unresolved.is_empty() && !force {
                return Err(TransitionError::Blocked {
                    task_key: task.task_key.clone(),
                    unresolved: unresolved.to_vec(),
                });
            }
            return Ok(Transition {
                status: to,
                completed_at: Some(now),
                // Only an actual gate bypass is recorded; force on an
                // unblocked task completes naturally.
                force_completed: force && !unresolved.is_empty(),
            });
        }

        // Leaving done (or moving between todo and dismissed) clears the
        // completion timestamp and the force marker.
        Ok(Transition {
            status: to,
            completed_at: None,
            force_completed: false,
        })
    }

    /// Apply a planned transition to a local task copy.
    ///
    /// Used for optimistic updates; the engine's returned task replaces
    /// the copy once the wire write succeeds.
    pub fn apply(task: &mut Task, transition: &Transition) {
        task.status = transition.status;
        task.completed_at = transition.completed_at;
        task.force_completed = transition.force_completed;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fahrplan_engine::models::TaskMetadata;
    use uuid::Uuid;

    fn task(status: TaskStatus, kind: TaskKind) -> Task {
        let now = Utc::now();
        Task {
            id: Uuid::new_v4(),
            plan_id: Uuid::nil(),
            task_key: "kita_anmelden".to_owned(),
            title: "Kita anmelden".to_owned(),
            description: None,
            task_kind: kind,
            status,
            due_date: None,
            metadata: Some(TaskMetadata::default()),
            sort_key: 0,
            completed_at: match status {
                TaskStatus::Done => Some(now),
                _ => None,
            },
            force_completed: false,
            created_at: now,
            updated_at: now,
        }
    }

    fn no_deps() -> Vec<String> {
        Vec::new()
    }

    fn blocked_by(keys: &[&str]) -> Vec<String> {
        keys.iter().map(|s| (*s).to_owned()).collect()
    }

    #[test]
    fn transition_graph_edges() {
        use TaskStatus::*;
        assert!(TaskStateMachine::is_valid_transition(Todo, Done));
        assert!(TaskStateMachine::is_valid_transition(Done, Todo));
        assert!(TaskStateMachine::is_valid_transition(Todo, Dismissed));
        assert!(TaskStateMachine::is_valid_transition(Dismissed, Todo));
        assert!(TaskStateMachine::is_valid_transition(Todo, Todo));
        assert!(!TaskStateMachine::is_valid_transition(Done, Dismissed));
        assert!(!TaskStateMachine::is_valid_transition(Dismissed, Done));
    }

    #[test]
    fn unblocked_completion_succeeds_and_sets_timestamp() {
        let t = task(TaskStatus::Todo, TaskKind::Normal);
        let now = Utc::now();
        let plan = TaskStateMachine::plan(&t, TaskStatus::Done, false, &no_deps(), now)
            .expect("should complete");
        assert_eq!(plan.status, TaskStatus::Done);
        assert_eq!(plan.completed_at, Some(now));
        assert!(!plan.force_completed);
    }

    #[test]
    fn blocked_completion_without_force_fails() {
        let t = task(TaskStatus::Todo, TaskKind::Normal);
        let unresolved = blocked_by(&["hebamme_suchen"]);
        let err = TaskStateMachine::plan(&t, TaskStatus::Done, false, &unresolved, Utc::now())
            .unwrap_err();
        match err {
            TransitionError::Blocked { unresolved, .. } => {
                assert_eq!(unresolved, vec!["hebamme_suchen".to_owned()]);
            }
            other => panic!("expected Blocked, got: {other}"),
        }
    }

    #[test]
    fn forced_completion_bypasses_gate_and_is_marked() {
        let t = task(TaskStatus::Todo, TaskKind::Normal);
        let unresolved = blocked_by(&["hebamme_suchen"]);
        let now = Utc::now();
        let plan = TaskStateMachine::plan(&t, TaskStatus::Done, true, &unresolved, now)
            .expect("force should bypass the gate");
        assert_eq!(plan.completed_at, Some(now));
        assert!(plan.force_completed);
    }

    #[test]
    fn force_on_unblocked_task_is_not_marked() {
        let t = task(TaskStatus::Todo, TaskKind::Normal);
        let plan = TaskStateMachine::plan(&t, TaskStatus::Done, true, &no_deps(), Utc::now())
            .expect("should complete");
        assert!(!plan.force_completed);
    }

    #[test]
    fn uncompleting_clears_timestamp_and_marker() {
        let mut t = task(TaskStatus::Done, TaskKind::Normal);
        t.force_completed = true;
        let plan = TaskStateMachine::plan(&t, TaskStatus::Todo, false, &no_deps(), Utc::now())
            .expect("done -> todo is always allowed");
        assert_eq!(plan.status, TaskStatus::Todo);
        assert!(plan.completed_at.is_none());
        assert!(!plan.force_completed);
    }

    #[test]
    fn uncompleting_allowed_even_when_dependencies_unmet() {
        let t = task(TaskStatus::Done, TaskKind::Normal);
        let unresolved = blocked_by(&["hebamme_suchen"]);
        TaskStateMachine::plan(&t, TaskStatus::Todo, false, &unresolved, Utc::now())
            .expect("done -> todo ignores the gate");
    }

    #[test]
    fn recompleting_done_task_keeps_original_fields() {
        let mut t = task(TaskStatus::Done, TaskKind::Normal);
        t.force_completed = true;
        let original = t.completed_at;
        let plan = TaskStateMachine::plan(&t, TaskStatus::Done, false, &no_deps(), Utc::now())
            .expect("idempotent re-completion");
        assert_eq!(plan.completed_at, original);
        assert!(plan.force_completed);
    }

    #[test]
    fn dismiss_and_reinstate() {
        let t = task(TaskStatus::Todo, TaskKind::Normal);
        let plan = TaskStateMachine::plan(&t, TaskStatus::Dismissed, false, &no_deps(), Utc::now())
            .expect("todo -> dismissed");
        assert!(plan.completed_at.is_none());

        let d = task(TaskStatus::Dismissed, TaskKind::Normal);
        TaskStateMachine::plan(&d, TaskStatus::Todo, false, &no_deps(), Utc::now())
            .expect("dismissed -> todo");
    }

    #[test]
    fn done_to_dismissed_is_invalid() {
        let t = task(TaskStatus::Done, TaskKind::Normal);
        let err = TaskStateMachine::plan(&t, TaskStatus::Dismissed, false, &no_deps(), Utc::now())
            .unwrap_err();
        assert!(
            matches!(
                err,
                TransitionError::InvalidTransition {
                    from: TaskStatus::Done,
                    to: TaskStatus::Dismissed,
                }
            ),
            "expected InvalidTransition, got: {err}"
        );
    }

    #[test]
    fn decision_task_rejected_even_with_force() {
        let t = task(TaskStatus::Todo, TaskKind::Decision);
        let err = TaskStateMachine::plan(&t, TaskStatus::Done, true, &no_deps(), Utc::now())
            .unwrap_err();
        assert!(
            matches!(err, TransitionError::DecisionTask { .. }),
            "expected DecisionTask, got: {err}"
        );
    }

    #[test]
    fn apply_updates_all_derived_fields_together() {
        let mut t = task(TaskStatus::Todo, TaskKind::Normal);
        let now = Utc::now();
        let plan = TaskStateMachine::plan(&t, TaskStatus::Done, true, &blocked_by(&["x"]), now)
            .unwrap();
        TaskStateMachine::apply(&mut t, &plan);
        assert_eq!(t.status, TaskStatus::Done);
        assert_eq!(t.completed_at, Some(now));
        assert!(t.force_completed);
    }
}
