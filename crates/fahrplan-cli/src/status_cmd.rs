//! `fahrplan status` command: show plan progress, upcoming deadlines,
//! and critical tasks.

use anyhow::Result;
use chrono::Utc;

use fahrplan_core::schedule;
use fahrplan_core::session::PlanSession;

/// Run the status command against a loaded session.
pub fn run_status(session: &PlanSession) -> Result<()> {
    let plan = session.plan();

    println!("Plan: {} ({})", plan.template_key, plan.id);
    println!("Status: {}", plan.status);
    println!("Updated: {}", plan.updated_at.format("%Y-%m-%d %H:%M:%S UTC"));
    println!();

    let done = session
        .tasks()
        .iter()
        .filter(|t| t.status == fahrplan_engine::models::TaskStatus::Done)
        .count();
    println!(
        "Progress: {}% ({}/{} done)",
        session.progress(),
        done,
        session.tasks().len()
    );
    println!();

    let next = session.next_deadlines(schedule::NEXT_DEADLINE_COUNT);
    if next.is_empty() {
        println!("No open tasks.");
    } else {
        println!("Next deadlines:");
        for task in &next {
            let due = match task.due_date {
                Some(d) => d.format("%Y-%m-%d").to_string(),
                None => "no due date".to_string(),
            };
            println!("  {} ({due})", task.title);
        }
    }

    let today = Utc::now().date_naive();
    let critical = session.critical_tasks(today);
    if !critical.is_empty() {
        println!();
        println!("Critical:");
        for task in &critical {
            let reason = if schedule::is_overdue(task, today) {
                "overdue"
            } else {
                "critical"
            };
            println!("  [{reason}] {}", task.title);
        }
    }

    Ok(())
}
