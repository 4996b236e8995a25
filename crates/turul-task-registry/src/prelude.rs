//! Prelude module for convenient imports.
//!
//! ```rust,no_run
//! use turul_task_registry::prelude::*;
//! ```

pub use crate::error::RegistryError;
#[cfg(feature = "in-memory")]
pub use crate::in_memory::{InMemoryRegistryConfig, InMemoryTaskRegistry};
pub use crate::state_machine::{TaskState, is_terminal, validate_transition};
pub use crate::traits::{
    FailureDescriptor, NewTask, TaskOutcome, TaskQuery, TaskRecord, TaskRegistry,
};
