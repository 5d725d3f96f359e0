//! Deterministic task ordering, overdue/critical classification, and
//! progress aggregation.
//!
//! The sort order is a strict total order: ascending due date (no due
//! date sorts last), then descending priority, then ascending `sort_key`.
//! `sort_key` is unique per generation run, so no two distinct tasks
//! compare equal and the displayed sequence is reproducible across
//! reloads; equal sort keys (never produced by the engine) would keep
//! insertion order because the sort is stable.

use std::cmp::Ordering;

use chrono::NaiveDate;

use fahrplan_engine::models::{Task, TaskStatus};

/// How many upcoming deadlines the dashboard shows.
pub const NEXT_DEADLINE_COUNT: usize = 3;

/// Compare two tasks for display order.
///
/// Due dates are calendar dates, so no midnight normalization is needed
/// here; time-of-day skew is impossible by construction.
pub fn deadline_order(a: &Task, b: &Task) -> Ordering {
    let by_due = match (a.due_date, b.due_date) {
        (Some(da), Some(db)) => da.cmp(&db),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    };
    by_due
        .then_with(|| b.priority().cmp(&a.priority()))
        .then_with(|| a.sort_key.cmp(&b.sort_key))
}

/// Return a copy of the tasks in display order.
pub fn sorted_by_deadline(tasks: &[Task]) -> Vec<Task> {
    let mut sorted = tasks.to_vec();
    sorted.sort_by(deadline_order);
    sorted
}

/// Whether a task is overdue as of `today`.
///
/// Due date present, status not `done`, and due date strictly before
/// `today`. A task due today is not overdue. Callers comparing against
/// wall-clock time must pass the local calendar date.
pub fn is_overdue(task: &Task, today: NaiveDate) -> bool {
    match task.due_date {
        Some(due) => task.status != TaskStatus::Done && due < today,
        None => false,
    }
}

/// Whether a task is critical: overdue, or tagged `critical`.
pub fn is_critical(task: &Task, today: NaiveDate) -> bool {
    is_overdue(task, today) || task.has_critical_tag()
}

/// Plan progress in percent: `round(100 * done / total)`, 0 for an empty
/// plan.
pub fn progress(tasks: &[Task]) -> u8 {
    if tasks.is_empty() {
        return 0;
    }
    let done = tasks
        .iter()
        .filter(|t| t.status == TaskStatus::Done)
        .count();
    ((done as f64 / tasks.len() as f64) * 100.0).round() as u8
}

/// The first `n` non-done tasks in display order.
pub fn next_deadlines(tasks: &[Task], n: usize) -> Vec<Task> {
    sorted_by_deadline(tasks)
        .into_iter()
        .filter(|t| t.status != TaskStatus::Done)
        .take(n)
        .collect()
}

/// All critical tasks in display order.
///
/// The full list; any display cap (e.g. top 5) is the caller's concern.
pub fn critical_tasks(tasks: &[Task], today: NaiveDate) -> Vec<Task> {
    sorted_by_deadline(tasks)
        .into_iter()
        .filter(|t| is_critical(t, today))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use fahrplan_engine::models::{TaskKind, TaskMetadata};
    use uuid::Uuid;

    fn task(key: &str, due: Option<&str>, priority: i32, sort_key: i64) -> Task {
        let now = Utc::now();
        Task {
            id: Uuid::new_v4(),
            plan_id: Uuid::nil(),
            task_key: key.to_owned(),
            title: key.to_owned(),
            description: None,
            task_kind: TaskKind::Normal,
            status: TaskStatus::Todo,
            due_date: due.map(|d| d.parse().expect("valid date")),
            metadata: Some(TaskMetadata {
                priority,
                ..Default::default()
            }),
            sort_key,
            completed_at: None,
            force_completed: false,
            created_at: now,
            updated_at: now,
        }
    }

    fn with_status(mut t: Task, status: TaskStatus) -> Task {
        t.status = status;
        t
    }

    fn with_tags(mut t: Task, tags: &[&str]) -> Task {
        if let Some(meta) = t.metadata.as_mut() {
            meta.tags = tags.iter().map(|s| (*s).to_owned()).collect();
        }
        t
    }

    fn keys(tasks: &[Task]) -> Vec<&str> {
        tasks.iter().map(|t| t.task_key.as_str()).collect()
    }

    #[test]
    fn sorts_by_due_then_priority_then_sort_key() {
        let tasks = vec![
            task("K1", Some("2024-01-10"), 1, 1),
            task("K2", Some("2024-01-10"), 5, 2),
            task("K3", None, 9, 0),
        ];
        let sorted = sorted_by_deadline(&tasks);
        assert_eq!(keys(&sorted), vec!["K2", "K1", "K3"]);
    }

    #[test]
    fn missing_due_date_sorts_last() {
        let tasks = vec![task("open", None, 99, 0), task("dated", Some("2030-12-31"), 0, 1)];
        let sorted = sorted_by_deadline(&tasks);
        assert_eq!(keys(&sorted), vec!["dated", "open"]);
    }

    #[test]
    fn sort_key_breaks_due_and_priority_ties() {
        let tasks = vec![
            task("b", Some("2024-03-01"), 2, 7),
            task("a", Some("2024-03-01"), 2, 3),
        ];
        let sorted = sorted_by_deadline(&tasks);
        assert_eq!(keys(&sorted), vec!["a", "b"]);
    }

    #[test]
    fn sorting_is_idempotent() {
        let tasks = vec![
            task("K1", Some("2024-01-10"), 1, 1),
            task("K3", None, 9, 0),
            task("K2", Some("2024-01-10"), 5, 2),
        ];
        let once = sorted_by_deadline(&tasks);
        let twice = sorted_by_deadline(&once);
        assert_eq!(keys(&once), keys(&twice));
    }

    #[test]
    fn overdue_requires_strictly_past_due_date() {
        let today: NaiveDate = "2024-06-15".parse().unwrap();
        assert!(is_overdue(&task("t", Some("2024-06-14"), 0, 0), today));
        assert!(!is_overdue(&task("t", Some("2024-06-15"), 0, 0), today));
        assert!(!is_overdue(&task("t", Some("2024-06-16"), 0, 0), today));
        assert!(!is_overdue(&task("t", None, 0, 0), today));
    }

    #[test]
    fn done_task_is_not_overdue() {
        let today: NaiveDate = "2024-06-15".parse().unwrap();
        let done = with_status(task("t", Some("2020-01-01"), 0, 0), TaskStatus::Done);
        assert!(!is_overdue(&done, today));
    }

    #[test]
    fn dismissed_task_with_past_due_is_overdue() {
        let today: NaiveDate = "2024-06-15".parse().unwrap();
        let dismissed = with_status(task("t", Some("2020-01-01"), 0, 0), TaskStatus::Dismissed);
        assert!(is_overdue(&dismissed, today));
    }

    #[test]
    fn critical_tag_marks_critical_regardless_of_deadline() {
        let today: NaiveDate = "2024-06-15".parse().unwrap();
        let tagged = with_tags(task("t", Some("2099-01-01"), 0, 0), &["critical"]);
        assert!(is_critical(&tagged, today));
        let plain = task("t", Some("2099-01-01"), 0, 0);
        assert!(!is_critical(&plain, today));
    }

    #[test]
    fn progress_of_empty_plan_is_zero() {
        assert_eq!(progress(&[]), 0);
    }

    #[test]
    fn progress_rounds_to_nearest_percent() {
        let done = |k| with_status(task(k, None, 0, 0), TaskStatus::Done);
        let tasks = vec![done("a"), done("b"), task("c", None, 0, 1), task("d", None, 0, 2)];
        assert_eq!(progress(&tasks), 50);

        let third = vec![done("a"), task("b", None, 0, 1), task("c", None, 0, 2)];
        assert_eq!(progress(&third), 33);

        let two_thirds = vec![done("a"), done("b"), task("c", None, 0, 2)];
        assert_eq!(progress(&two_thirds), 67);
    }

    #[test]
    fn next_deadlines_skips_done_tasks() {
        let tasks = vec![
            with_status(task("done", Some("2024-01-01"), 0, 0), TaskStatus::Done),
            task("first", Some("2024-01-02"), 0, 1),
            task("second", Some("2024-01-03"), 0, 2),
            task("third", Some("2024-01-04"), 0, 3),
            task("fourth", Some("2024-01-05"), 0, 4),
        ];
        let next = next_deadlines(&tasks, NEXT_DEADLINE_COUNT);
        assert_eq!(keys(&next), vec!["first", "second", "third"]);
    }

    #[test]
    fn critical_tasks_are_sorted_and_unbounded() {
        let today: NaiveDate = "2024-06-15".parse().unwrap();
        let tasks = vec![
            with_tags(task("tagged", None, 0, 5), &["critical"]),
            task("late_b", Some("2024-02-01"), 0, 2),
            task("late_a", Some("2024-01-01"), 0, 1),
            task("future", Some("2099-01-01"), 0, 0),
        ];
        let critical = critical_tasks(&tasks, today);
        assert_eq!(keys(&critical), vec!["late_a", "late_b", "tagged"]);
    }
}
