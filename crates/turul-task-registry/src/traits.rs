//! Core task registry trait and data models.
//!
//! Defines the `TaskRegistry` trait and the records it tracks for
//! asynchronously dispatched work.

use crate::error::RegistryError;
use crate::state_machine::TaskState;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Description of a failure raised by a unit of work.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailureDescriptor {
    /// The failure's native kind, e.g. the error type name
    pub kind: String,
    /// Human-readable message (the error's `Display` output)
    pub message: String,
    /// Optional numeric code carried by the failure
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<i64>,
}

impl FailureDescriptor {
    pub fn new(kind: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            message: message.into(),
            code: None,
        }
    }

    pub fn with_code(mut self, code: i64) -> Self {
        self.code = Some(code);
        self
    }
}

/// The outcome of a task's work, present only once the task is terminal.
///
/// A task holds a success payload or a failure descriptor, never both.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum TaskOutcome {
    /// The work succeeded. Value is the projected response body.
    Success(Value),
    /// The work failed.
    Failure(FailureDescriptor),
}

impl TaskOutcome {
    /// The terminal state this outcome moves a task into.
    pub fn terminal_state(&self) -> TaskState {
        match self {
            TaskOutcome::Success(_) => TaskState::Completed,
            TaskOutcome::Failure(_) => TaskState::Failed,
        }
    }
}

/// Registration request for a new task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewTask {
    pub task_id: String,
    pub action: Option<String>,
    pub target: Option<String>,
}

impl NewTask {
    pub fn new(task_id: impl Into<String>) -> Self {
        Self {
            task_id: task_id.into(),
            action: None,
            target: None,
        }
    }

    pub fn with_action(mut self, action: impl Into<String>) -> Self {
        self.action = Some(action.into());
        self
    }

    pub fn with_target(mut self, target: impl Into<String>) -> Self {
        self.target = Some(target.into());
        self
    }
}

/// A tracked task.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskRecord {
    /// Caller-supplied identifier, unique across all live tasks
    pub task_id: String,
    /// Current lifecycle state
    pub state: TaskState,
    /// Name of the action the work performs
    pub action: Option<String>,
    /// Name of the target (core) the work runs against
    pub target: Option<String>,
    /// ISO 8601 datetime when the task was registered
    pub created_at: String,
    /// ISO 8601 datetime of the last transition
    pub last_updated_at: String,
    /// Outcome, set exactly once on the terminal transition
    pub outcome: Option<TaskOutcome>,
}

impl TaskRecord {
    /// Success payload, if the task completed.
    pub fn success_payload(&self) -> Option<&Value> {
        match &self.outcome {
            Some(TaskOutcome::Success(v)) => Some(v),
            _ => None,
        }
    }

    /// Failure descriptor, if the task failed.
    pub fn failure(&self) -> Option<&FailureDescriptor> {
        match &self.outcome {
            Some(TaskOutcome::Failure(f)) => Some(f),
            _ => None,
        }
    }
}

/// Read side of a task registry: state probes plus the eviction hook.
///
/// This is the surface handed to status pollers. Nothing here can move a
/// task between states.
#[async_trait]
pub trait TaskQuery: Send + Sync {
    /// Human-readable name of the registry backend (e.g., "in-memory")
    fn backend_name(&self) -> &'static str;

    /// Probe one state bucket. Returns `None` if the id is not in that state.
    async fn lookup(
        &self,
        task_id: &str,
        state: TaskState,
    ) -> Result<Option<TaskRecord>, RegistryError>;

    /// Probe every state bucket at once.
    async fn get_task(&self, task_id: &str) -> Result<Option<TaskRecord>, RegistryError>;

    /// Snapshot of every task in `state`, ordered by `(created_at, task_id)`.
    async fn list_tasks(&self, state: TaskState) -> Result<Vec<TaskRecord>, RegistryError>;

    /// Total number of tracked tasks across all states.
    async fn task_count(&self) -> Result<usize, RegistryError>;

    /// Remove a terminal task. Returns `false` if the id is not tracked.
    ///
    /// Returns `RegistryError::TaskRunning` for a `Running` task: an in-flight
    /// id must never become absent from every state.
    async fn purge(&self, task_id: &str) -> Result<bool, RegistryError>;
}

/// Core trait for task registry backends.
///
/// All synchronization is internal: callers never hold a lock, and every
/// mutation is linearizable with respect to the dedup check. Only the
/// execution that owns a task should call `complete` or `fail` for it.
#[async_trait]
pub trait TaskRegistry: TaskQuery {
    /// Atomically check every state for `task_id` and, if absent, insert it as
    /// `Running`.
    ///
    /// Concurrent calls with the same id yield exactly one success; the rest
    /// get `RegistryError::DuplicateTask` and leave the registry unchanged.
    async fn register_if_absent(&self, task: NewTask) -> Result<TaskRecord, RegistryError>;

    /// Move `task_id` from `Running` to `Completed`, storing `payload`.
    async fn complete(&self, task_id: &str, payload: Value) -> Result<TaskRecord, RegistryError>;

    /// Move `task_id` from `Running` to `Failed`, storing `failure`.
    async fn fail(
        &self,
        task_id: &str,
        failure: FailureDescriptor,
    ) -> Result<TaskRecord, RegistryError>;
}
