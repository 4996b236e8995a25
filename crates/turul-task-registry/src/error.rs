//! Unified error types for task registry operations.

use crate::state_machine::TaskState;

/// Unified error type for task registry operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RegistryError {
    /// The id is already tracked in some state. The registry is unchanged.
    #[error("Duplicate request with the same task id found: {0}")]
    DuplicateTask(String),

    #[error("Task not found: {0}")]
    TaskNotFound(String),

    #[error("Invalid state transition: {current:?} -> {requested:?}")]
    InvalidTransition {
        current: TaskState,
        requested: TaskState,
    },

    #[error("Task is in terminal state: {0:?}")]
    TerminalState(TaskState),

    /// Raised by `purge` for an entry whose work is still in flight.
    #[error("Task is still running: {0}")]
    TaskRunning(String),

    #[error("Maximum tasks limit reached: {0}")]
    CapacityReached(usize),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<serde_json::Error> for RegistryError {
    fn from(err: serde_json::Error) -> Self {
        RegistryError::Serialization(err.to_string())
    }
}
