use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Tag that marks a task as critical regardless of its deadline.
pub const CRITICAL_TAG: &str = "critical";

// ---------------------------------------------------------------------------
// Enums
// ---------------------------------------------------------------------------

/// Status of a plan.
///
/// Only `active` matters to the scheduling core; the remaining lifecycle
/// states are owned by the plan engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlanStatus {
    Draft,
    Active,
    Archived,
}

impl fmt::Display for PlanStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Draft => "draft",
            Self::Active => "active",
            Self::Archived => "archived",
        };
        f.write_str(s)
    }
}

impl FromStr for PlanStatus {
    type Err = PlanStatusParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "draft" => Ok(Self::Draft),
            "active" => Ok(Self::Active),
            "archived" => Ok(Self::Archived),
            other => Err(PlanStatusParseError(other.to_owned())),
        }
    }
}

/// Error returned when parsing an invalid [`PlanStatus`] string.
#[derive(Debug, Clone)]
pub struct PlanStatusParseError(pub String);

impl fmt::Display for PlanStatusParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid plan status: {:?}", self.0)
    }
}

impl std::error::Error for PlanStatusParseError {}

// ---------------------------------------------------------------------------

/// Status of a task. Exactly one holds at any time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Todo,
    Done,
    Dismissed,
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Todo => "todo",
            Self::Done => "done",
            Self::Dismissed => "dismissed",
        };
        f.write_str(s)
    }
}

impl FromStr for TaskStatus {
    type Err = TaskStatusParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "todo" => Ok(Self::Todo),
            "done" => Ok(Self::Done),
            "dismissed" => Ok(Self::Dismissed),
            other => Err(TaskStatusParseError(other.to_owned())),
        }
    }
}

/// Error returned when parsing an invalid [`TaskStatus`] string.
#[derive(Debug, Clone)]
pub struct TaskStatusParseError(pub String);

impl fmt::Display for TaskStatusParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid task status: {:?}", self.0)
    }
}

impl std::error::Error for TaskStatusParseError {}

// ---------------------------------------------------------------------------

/// Kind of a task.
///
/// `normal` tasks complete through the checkbox transition path.
/// `decision` tasks resolve by choosing one of a finite set of options,
/// which rewrites a plan fact and triggers full recomputation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum TaskKind {
    #[default]
    Normal,
    Decision,
}

impl fmt::Display for TaskKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Normal => "normal",
            Self::Decision => "decision",
        };
        f.write_str(s)
    }
}

impl FromStr for TaskKind {
    type Err = TaskKindParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "normal" => Ok(Self::Normal),
            "decision" => Ok(Self::Decision),
            other => Err(TaskKindParseError(other.to_owned())),
        }
    }
}

/// Error returned when parsing an invalid [`TaskKind`] string.
#[derive(Debug, Clone)]
pub struct TaskKindParseError(pub String);

impl fmt::Display for TaskKindParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid task kind: {:?}", self.0)
    }
}

impl std::error::Error for TaskKindParseError {}

// ---------------------------------------------------------------------------
// Metadata
// ---------------------------------------------------------------------------

/// One selectable option of a decision task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecisionOption {
    /// Stable option key, recorded as the fact value when chosen.
    pub key: String,
    /// Human-readable label.
    pub label: String,
}

/// Definition of a decision carried by a decision-kind task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecisionSpec {
    /// Name of the plan fact the chosen option is written to.
    pub fact: String,
    /// The finite set of choices.
    pub options: Vec<DecisionOption>,
}

/// Structured task metadata.
///
/// Every field is defaulted so a missing or partial `metadata` object on
/// the wire deserializes cleanly. Consumers go through the accessors on
/// [`Task`], which also tolerate the object being absent entirely.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct TaskMetadata {
    /// Higher = more urgent. 0 when absent.
    pub priority: i32,
    pub category: Option<String>,
    /// Prerequisite task keys embedded inline on the task. Used only when
    /// the plan carries no dependency snapshot.
    pub blocked_by: Vec<String>,
    pub tags: Vec<String>,
    /// Present on decision-kind tasks.
    pub decision: Option<DecisionSpec>,
}

// ---------------------------------------------------------------------------
// Wire structs
// ---------------------------------------------------------------------------

/// A task within a plan.
///
/// Structure (key, kind, dependencies) is immutable once generated; only
/// `status`, `completed_at`, and the force marker change between
/// recomputations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub id: Uuid,
    pub plan_id: Uuid,
    /// Human-readable key, unique within the plan. Dependency edges refer
    /// to tasks by this key.
    pub task_key: String,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub task_kind: TaskKind,
    pub status: TaskStatus,
    /// Calendar date, no time component.
    #[serde(default)]
    pub due_date: Option<NaiveDate>,
    #[serde(default)]
    pub metadata: Option<TaskMetadata>,
    /// Ordering tiebreaker assigned at generation time.
    pub sort_key: i64,
    /// Set only while status is `done`.
    #[serde(default)]
    pub completed_at: Option<DateTime<Utc>>,
    /// True when completion bypassed the dependency gate via the explicit
    /// force override.
    #[serde(default)]
    pub force_completed: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Task {
    /// Priority from metadata, defaulting to 0.
    pub fn priority(&self) -> i32 {
        self.metadata.as_ref().map(|m| m.priority).unwrap_or(0)
    }

    pub fn category(&self) -> Option<&str> {
        self.metadata.as_ref()?.category.as_deref()
    }

    /// Inline prerequisite task keys. Empty when metadata is absent.
    pub fn blocked_by(&self) -> &[String] {
        self.metadata
            .as_ref()
            .map(|m| m.blocked_by.as_slice())
            .unwrap_or(&[])
    }

    pub fn tags(&self) -> &[String] {
        self.metadata
            .as_ref()
            .map(|m| m.tags.as_slice())
            .unwrap_or(&[])
    }

    /// Whether the task carries the `critical` tag.
    pub fn has_critical_tag(&self) -> bool {
        self.tags().iter().any(|t| t == CRITICAL_TAG)
    }

    /// The decision definition, for decision-kind tasks that carry one.
    pub fn decision(&self) -> Option<&DecisionSpec> {
        self.metadata.as_ref()?.decision.as_ref()
    }
}

/// One entry of the dependency snapshot generated by the plan engine.
///
/// `id` may be an internal record id rather than a task key; the resolver
/// in `fahrplan-core` normalizes everything to task keys before use.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotTask {
    pub id: String,
    #[serde(default)]
    pub task_key: Option<String>,
    #[serde(default)]
    pub depends_on: Vec<String>,
}

impl SnapshotTask {
    /// The task key this entry describes. Ids and keys share a namespace,
    /// so an entry without an explicit key is keyed by its id.
    pub fn key(&self) -> &str {
        self.task_key.as_deref().unwrap_or(&self.id)
    }
}

/// A plan: facts plus the dependency snapshot over its tasks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Plan {
    pub id: Uuid,
    pub template_key: String,
    /// Fact name -> value. Mutable only through decision resolution.
    #[serde(default)]
    pub facts: serde_json::Map<String, serde_json::Value>,
    pub status: PlanStatus,
    /// Absent unless the plan was fetched with the snapshot included.
    #[serde(default)]
    pub dependency_snapshot: Option<Vec<SnapshotTask>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Plan {
    /// The dependency snapshot, empty when not included or not generated.
    pub fn snapshot(&self) -> &[SnapshotTask] {
        self.dependency_snapshot.as_deref().unwrap_or(&[])
    }
}

// ---------------------------------------------------------------------------
// Request bodies
// ---------------------------------------------------------------------------

/// Body of a task status transition request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransitionRequest {
    pub status: TaskStatus,
    #[serde(default)]
    pub force: bool,
}

/// Body of a plan fact patch request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FactPatchRequest {
    pub facts: serde_json::Map<String, serde_json::Value>,
    #[serde(default)]
    pub recompute: bool,
}

/// Body of a plan creation request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlanCreateRequest {
    pub template_key: String,
    pub facts: serde_json::Map<String, serde_json::Value>,
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
