//! `fahrplan decide` / `recompute` commands: decision resolution and
//! recovery after a failed recompute.

use anyhow::Result;

use fahrplan_core::decision::DecisionError;
use fahrplan_core::session::{PlanSession, SessionError};

/// Resolve a decision task with the chosen option.
///
/// On success the plan has been regenerated and reloaded; the task list
/// printed afterwards may differ entirely from before. If the fact write
/// lands but the recompute fails, say so explicitly: choosing again
/// would be wrong, only `fahrplan recompute` is.
pub async fn run_decide(
    session: &mut PlanSession,
    task_key: &str,
    option_key: &str,
) -> Result<()> {
    match session.resolve_decision(task_key, option_key).await {
        Ok(()) => {
            println!("Decision {task_key} = {option_key} recorded, plan regenerated.");
            println!(
                "Plan now has {} tasks ({}% done).",
                session.tasks().len(),
                session.progress()
            );
            Ok(())
        }
        Err(e @ SessionError::Decision(DecisionError::RecomputeFailed { .. })) => {
            println!("Decision {task_key} = {option_key} was recorded, but the plan");
            println!("could not be regenerated. The task list shown is stale.");
            println!("Run `fahrplan recompute` to retry; do NOT decide again.");
            Err(e.into())
        }
        Err(SessionError::Decision(DecisionError::UnknownOption {
            option, expected, ..
        })) => {
            anyhow::bail!(
                "unknown option {option:?}; expected one of: {}",
                expected.join(", ")
            );
        }
        Err(e) => Err(e.into()),
    }
}

/// Re-issue only the recompute after a failed decision resolution.
pub async fn run_recompute(session: &mut PlanSession) -> Result<()> {
    session.retry_recompute().await?;
    println!(
        "Plan regenerated: {} tasks ({}% done).",
        session.tasks().len(),
        session.progress()
    );
    Ok(())
}
