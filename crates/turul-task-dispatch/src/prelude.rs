//! Prelude module for convenient imports.
//!
//! ```rust,no_run
//! use turul_task_dispatch::prelude::*;
//! ```

pub use crate::context::{
    ContextPropagator, DiagnosticContext, NoopContextPropagator, RecordingContextPropagator,
};
pub use crate::dispatcher::{DispatchRequest, Dispatcher, DispatcherBuilder, DispatcherConfig};
pub use crate::error::{DispatchError, TaskFailure};
pub use crate::executor::{BoxedWork, ExecutionResource};
pub use crate::response::ResponseCarrier;
pub use crate::status::TaskStatusView;
pub use crate::tokio_executor::{ExecutorConfig, TokioExecutionResource};
pub use turul_task_registry::{
    FailureDescriptor, InMemoryTaskRegistry, RegistryError, TaskOutcome, TaskQuery,
    TaskRecord, TaskRegistry, TaskState,
};
