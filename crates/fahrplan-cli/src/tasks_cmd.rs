//! `fahrplan tasks` command: list all tasks in display order with
//! status, blocking, and deadline markers.

use anyhow::Result;
use chrono::Utc;

use fahrplan_core::schedule;
use fahrplan_core::session::PlanSession;
use fahrplan_engine::models::{TaskKind, TaskStatus};

/// Run the tasks command against a loaded session.
pub fn run_tasks(session: &PlanSession) -> Result<()> {
    let tasks = session.sorted_tasks();
    if tasks.is_empty() {
        println!("No tasks in plan.");
        return Ok(());
    }

    let today = Utc::now().date_naive();

    println!(
        "{:<3} {:<28} {:<10} {:<12} NOTES",
        "", "TASK", "STATUS", "DUE"
    );
    println!("{}", "-".repeat(72));

    for task in &tasks {
        let status_icon = match task.status {
            TaskStatus::Todo => ".",
            TaskStatus::Done => "+",
            TaskStatus::Dismissed => "-",
        };
        let due = match task.due_date {
            Some(d) => d.format("%Y-%m-%d").to_string(),
            None => String::new(),
        };

        let mut notes = Vec::new();
        if task.task_kind == TaskKind::Decision {
            notes.push("decision".to_string());
        }
        if schedule::is_overdue(task, today) {
            notes.push("overdue".to_string());
        }
        if task.force_completed {
            notes.push("force-completed".to_string());
        }
        let unresolved = session.unresolved_for(&task.task_key)?;
        if !unresolved.is_empty() && task.status != TaskStatus::Done {
            notes.push(format!("blocked by {}", unresolved.join(", ")));
        }

        println!(
            "[{}] {:<28} {:<10} {:<12} {}",
            status_icon,
            task.task_key,
            task.status,
            due,
            notes.join("; ")
        );
    }

    Ok(())
}
