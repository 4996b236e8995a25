//! # Task Dispatch
//!
//! **Run a unit of work inline, or in the background under a caller-supplied
//! task id.**
//!
//! A request handler hands the [`Dispatcher`] its work together with an
//! optional task id:
//!
//! - **No task id**: the work runs inline and its own result (or its own
//!   error, untouched) goes back to the caller.
//! - **Task id**: the id is registered as `Running` in the
//!   [`TaskRegistry`](turul_task_registry::TaskRegistry) in one atomic
//!   dedup-and-insert step, the work is submitted to an
//!   [`ExecutionResource`], and the caller gets its placeholder back at once.
//!   When the work finishes the task moves to `Completed` or `Failed`, and
//!   the outcome can be polled by id.
//!
//! ## Quick Start
//!
//! ```rust
//! use std::time::Duration;
//! use turul_task_dispatch::prelude::*;
//!
//! #[derive(Debug, thiserror::Error)]
//! #[error("reload failed: {0}")]
//! struct ReloadError(String);
//!
//! impl TaskFailure for ReloadError {}
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let dispatcher = Dispatcher::in_memory();
//! let mut response = ResponseCarrier::new();
//!
//! let placeholder = serde_json::json!({"status": "submitted"});
//! dispatcher
//!     .dispatch(
//!         DispatchRequest::new("reload", "core1").with_task_id("t1"),
//!         &mut response,
//!         placeholder,
//!         || async { Ok::<_, ReloadError>(serde_json::json!({"value": "ok"})) },
//!     )
//!     .await?;
//!
//! let task = dispatcher
//!     .wait_for_terminal("t1", Duration::from_millis(10), Duration::from_secs(5))
//!     .await?
//!     .expect("task is tracked");
//! assert_eq!(task.state, TaskState::Completed);
//! # Ok(())
//! # }
//! ```
//!
//! ## Architecture
//!
//! - [`dispatcher`]: `Dispatcher`, `DispatchRequest`, builder and config
//! - [`executor`]: `ExecutionResource` trait and `BoxedWork`
//! - [`tokio_executor`]: default `TokioExecutionResource`
//! - [`context`]: `DiagnosticContext`, `ContextPropagator`, `ContextScope`
//! - [`response`]: `ResponseCarrier` and payload merging
//! - [`status`]: `TaskStatusView`, the read-only registry handle
//! - [`error`]: `DispatchError` and the `TaskFailure` contract

pub mod context;
pub mod dispatcher;
pub mod error;
pub mod executor;
pub mod prelude;
pub mod response;
pub mod status;
pub mod tokio_executor;

pub use context::{
    ContextEvent, ContextPropagator, ContextScope, DiagnosticContext, NoopContextPropagator,
    RecordingContextPropagator,
};
pub use dispatcher::{DispatchRequest, Dispatcher, DispatcherBuilder, DispatcherConfig};
pub use error::{DispatchError, TaskFailure};
pub use executor::{BoxedWork, ExecutionResource};
pub use response::ResponseCarrier;
pub use status::TaskStatusView;
pub use tokio_executor::{ExecutorConfig, TokioExecutionResource};

// Registry types surface through dispatch results, so re-export the crate
pub use turul_task_registry;
