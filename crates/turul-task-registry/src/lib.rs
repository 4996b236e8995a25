//! # Task Registry
//!
//! **Tracks asynchronously dispatched work by caller-supplied id.**
//!
//! Every task is registered as `Running` and moves exactly once to
//! `Completed` (with a success payload) or `Failed` (with a failure
//! descriptor). Registration is an atomic insert-if-absent: the id is checked
//! against every state in the same step that inserts it.
//!
//! ## Quick Start
//!
//! ```rust
//! use turul_task_registry::prelude::*;
//!
//! # async fn example() -> Result<(), RegistryError> {
//! let registry = InMemoryTaskRegistry::new();
//!
//! registry
//!     .register_if_absent(NewTask::new("t1").with_action("reload").with_target("core1"))
//!     .await?;
//!
//! // A second registration with the same id is rejected
//! assert!(registry.register_if_absent(NewTask::new("t1")).await.is_err());
//!
//! registry.complete("t1", serde_json::json!({"value": "ok"})).await?;
//! let done = registry.lookup("t1", TaskState::Completed).await?;
//! assert!(done.is_some());
//! # Ok(())
//! # }
//! ```
//!
//! ## Architecture
//!
//! - **`TaskQuery` trait**: read-only probes and the purge hook
//! - **`TaskRegistry` trait**: register and finish, on top of `TaskQuery`
//! - **`TaskRecord`**: a tracked task with its state and write-once outcome
//! - **`TaskOutcome`**: success payload or `FailureDescriptor`
//! - **State machine**: `Running -> Completed | Failed`, nothing else
//!
//! Eviction of terminal tasks is left to the caller; `TaskQuery::purge`
//! is the hook an external sweeper uses.

// Core modules
pub mod error;
#[cfg(feature = "in-memory")]
pub mod in_memory;
pub mod prelude;
pub mod state_machine;
pub mod traits;

// Re-exports for convenience
pub use error::RegistryError;
#[cfg(feature = "in-memory")]
pub use in_memory::{InMemoryRegistryConfig, InMemoryTaskRegistry};
pub use state_machine::{TaskState, is_terminal, validate_transition};
pub use traits::{
    FailureDescriptor, NewTask, TaskOutcome, TaskQuery, TaskRecord, TaskRegistry,
};

/// Create a default in-memory task registry.
#[cfg(feature = "in-memory")]
pub fn create_default_registry() -> InMemoryTaskRegistry {
    InMemoryTaskRegistry::new()
}
