//! Task state machine enforcement.
//!
//! ```text
//! (absent) -> Running            registration
//! Running  -> Completed | Failed  exactly once
//! Completed/Failed -> ERROR       terminal, outcome is write-once
//! ```

use serde::{Deserialize, Serialize};

use crate::error::RegistryError;

/// Lifecycle state of a tracked task.
///
/// There is no "unregistered" variant: an id that is not in the registry was
/// either never registered or has been purged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskState {
    Running,
    Completed,
    Failed,
}

impl TaskState {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskState::Running => "running",
            TaskState::Completed => "completed",
            TaskState::Failed => "failed",
        }
    }
}

impl std::fmt::Display for TaskState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Validate a task state transition.
///
/// Returns `Ok(())` if the transition is valid, or `Err(RegistryError)` if not.
pub fn validate_transition(from: TaskState, to: TaskState) -> Result<(), RegistryError> {
    match from {
        TaskState::Running => match to {
            TaskState::Completed | TaskState::Failed => Ok(()),
            TaskState::Running => Err(RegistryError::InvalidTransition {
                current: from,
                requested: to,
            }),
        },
        TaskState::Completed | TaskState::Failed => Err(RegistryError::TerminalState(from)),
    }
}

/// Returns `true` if the state is terminal (no further transitions allowed).
pub fn is_terminal(state: TaskState) -> bool {
    matches!(state, TaskState::Completed | TaskState::Failed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_running_transitions() {
        assert!(validate_transition(TaskState::Running, TaskState::Completed).is_ok());
        assert!(validate_transition(TaskState::Running, TaskState::Failed).is_ok());
    }

    #[test]
    fn test_invalid_running_to_running() {
        match validate_transition(TaskState::Running, TaskState::Running).unwrap_err() {
            RegistryError::InvalidTransition { current, requested } => {
                assert_eq!(current, TaskState::Running);
                assert_eq!(requested, TaskState::Running);
            }
            other => panic!("Expected InvalidTransition, got: {:?}", other),
        }
    }

    #[test]
    fn test_terminal_states_reject_all_transitions() {
        for terminal in [TaskState::Completed, TaskState::Failed] {
            for target in [TaskState::Running, TaskState::Completed, TaskState::Failed] {
                let result = validate_transition(terminal, target);
                match result {
                    Err(RegistryError::TerminalState(s)) => assert_eq!(s, terminal),
                    other => panic!(
                        "Expected TerminalState for {:?} -> {:?}, got: {:?}",
                        terminal, target, other
                    ),
                }
            }
        }
    }

    #[test]
    fn test_is_terminal() {
        assert!(!is_terminal(TaskState::Running));
        assert!(is_terminal(TaskState::Completed));
        assert!(is_terminal(TaskState::Failed));
    }

    #[test]
    fn test_state_wire_names() {
        assert_eq!(
            serde_json::to_string(&TaskState::Completed).unwrap(),
            "\"completed\""
        );
        let parsed: TaskState = serde_json::from_str("\"failed\"").unwrap();
        assert_eq!(parsed, TaskState::Failed);
        assert_eq!(TaskState::Running.to_string(), "running");
    }
}
