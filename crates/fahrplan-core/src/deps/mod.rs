//! Dependency resolver: normalizes the plan engine's dependency snapshot
//! into a task-key-indexed adjacency map and answers blocked-set queries.
//!
//! Two sources can describe dependencies: the plan's dependency snapshot
//! (authoritative when present) and the per-task inline `blocked_by`
//! metadata (fallback when the snapshot is absent or empty). The two are
//! never merged; resolution happens exactly once, at load time, and every
//! later query works on the canonical key-indexed map.

use std::collections::{BTreeMap, HashMap, HashSet, VecDeque};

use thiserror::Error;

use fahrplan_engine::models::{SnapshotTask, Task, TaskStatus};

/// Task key -> prerequisite task keys, the canonical dependency
/// representation used by all queries.
pub type DependencyMap = BTreeMap<String, Vec<String>>;

/// Fatal inconsistencies in a generated plan.
///
/// These indicate a broken generation run on the engine side, not a
/// recoverable client condition. A snapshot entry referencing a task that
/// no longer exists is NOT one of these: the resolver passes the stale id
/// through verbatim so the caller can render "unknown dependency".
#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error("duplicate task key: {0:?}")]
    DuplicateTaskKey(String),

    #[error("dependency cycle detected involving tasks: {0}")]
    CycleDetected(String),
}

/// Resolve a plan's dependencies to a task-key-indexed adjacency map.
///
/// Snapshot entries may carry internal record ids rather than task keys;
/// an id -> key lookup is built from the entries themselves (an entry
/// without an explicit key is keyed by its id, the two share a single
/// namespace). Prerequisite ids that resolve to no entry are left
/// verbatim.
///
/// When the snapshot is empty, falls back to the inline `blocked_by`
/// metadata of each task. The snapshot, when present, wins outright.
pub fn resolve_dependencies(snapshot: &[SnapshotTask], tasks: &[Task]) -> DependencyMap {
    if snapshot.is_empty() {
        return tasks
            .iter()
            .map(|t| (t.task_key.clone(), t.blocked_by().to_vec()))
            .collect();
    }

    let key_by_id: HashMap<&str, &str> = snapshot
        .iter()
        .map(|entry| (entry.id.as_str(), entry.key()))
        .collect();

    snapshot
        .iter()
        .map(|entry| {
            let prerequisites = entry
                .depends_on
                .iter()
                .map(|dep| {
                    key_by_id
                        .get(dep.as_str())
                        .map(|key| (*key).to_owned())
                        .unwrap_or_else(|| dep.clone())
                })
                .collect();
            (entry.key().to_owned(), prerequisites)
        })
        .collect()
}

/// Index current task statuses by task key.
pub fn status_index(tasks: &[Task]) -> BTreeMap<String, TaskStatus> {
    tasks
        .iter()
        .map(|t| (t.task_key.clone(), t.status))
        .collect()
}

/// The subset of a task's prerequisites whose current status is not
/// `done`. A prerequisite key with no known status (stale snapshot)
/// counts as unresolved and is surfaced verbatim.
pub fn unresolved_dependencies(
    task: &Task,
    deps: &DependencyMap,
    statuses: &BTreeMap<String, TaskStatus>,
) -> Vec<String> {
    let Some(prerequisites) = deps.get(&task.task_key) else {
        return Vec::new();
    };
    prerequisites
        .iter()
        .filter(|key| statuses.get(key.as_str()) != Some(&TaskStatus::Done))
        .cloned()
        .collect()
}

/// Whether a task is currently blocked.
///
/// A task in state `done` is never blocked, regardless of dependency
/// state: the transition that got it there already validated the gate or
/// was explicitly force-overridden.
pub fn is_blocked(
    task: &Task,
    deps: &DependencyMap,
    statuses: &BTreeMap<String, TaskStatus>,
) -> bool {
    task.status != TaskStatus::Done && !unresolved_dependencies(task, deps, statuses).is_empty()
}

/// Verify that task keys are unique within the plan.
pub fn verify_task_keys(tasks: &[Task]) -> Result<(), SnapshotError> {
    let mut seen = HashSet::new();
    for task in tasks {
        if !seen.insert(task.task_key.as_str()) {
            return Err(SnapshotError::DuplicateTaskKey(task.task_key.clone()));
        }
    }
    Ok(())
}

/// Detect dependency cycles using Kahn's algorithm for topological sort.
///
/// Keys referenced as prerequisites but absent from the map (stale ids)
/// participate as nodes without outgoing edges; they can never form a
/// cycle.
pub fn verify_acyclic(deps: &DependencyMap) -> Result<(), SnapshotError> {
    // Collect every key appearing as a task or a prerequisite.
    let mut keys: Vec<&str> = deps.keys().map(String::as_str).collect();
    for prerequisites in deps.values() {
        for dep in prerequisites {
            if !deps.contains_key(dep) {
                keys.push(dep.as_str());
            }
        }
    }
    keys.sort_unstable();
    keys.dedup();

    let key_to_idx: HashMap<&str, usize> = keys
        .iter()
        .enumerate()
        .map(|(i, key)| (*key, i))
        .collect();

    let n = keys.len();
    let mut in_degree = vec![0usize; n];
    let mut adj: Vec<Vec<usize>> = vec![vec![]; n];

    for (task_key, prerequisites) in deps {
        let task_idx = key_to_idx[task_key.as_str()];
        for dep_key in prerequisites {
            let dep_idx = key_to_idx[dep_key.as_str()];
            // Edge: dep -> task (dep must be done before task).
            adj[dep_idx].push(task_idx);
            in_degree[task_idx] += 1;
        }
    }

    let mut queue: VecDeque<usize> = VecDeque::new();
    for (i, deg) in in_degree.iter().enumerate() {
        if *deg == 0 {
            queue.push_back(i);
        }
    }

    let mut sorted_count = 0usize;
    while let Some(node) = queue.pop_front() {
        sorted_count += 1;
        for &neighbor in &adj[node] {
            in_degree[neighbor] -= 1;
            if in_degree[neighbor] == 0 {
                queue.push_back(neighbor);
            }
        }
    }

    if sorted_count != n {
        let cycle_keys: Vec<&str> = in_degree
            .iter()
            .enumerate()
            .filter(|(_, deg)| **deg > 0)
            .map(|(i, _)| keys[i])
            .collect();
        return Err(SnapshotError::CycleDetected(cycle_keys.join(", ")));
    }

    Ok(())
}
