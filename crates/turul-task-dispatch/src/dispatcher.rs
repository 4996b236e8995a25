//! Dispatcher: runs a unit of work inline, or registers it under a task id
//! and hands it to the execution resource.
//!
//! ```text
//! dispatch(no task id) ── context ── work().await ── Ok(T) | Err(Work(E))
//! dispatch(task id) ── register_if_absent ── context ── submit ── Ok(placeholder)
//!                                                          │
//!                        background: context ── work().await ── complete | fail
//! ```

use std::any::Any;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use futures::FutureExt;
use serde::{Deserialize, Serialize};
use tracing::{Instrument, debug, error, info, warn};

use turul_task_registry::{
    FailureDescriptor, InMemoryRegistryConfig, InMemoryTaskRegistry, NewTask, RegistryError,
    TaskQuery, TaskRecord, TaskRegistry, is_terminal,
};

use crate::context::{ContextPropagator, ContextScope, DiagnosticContext, NoopContextPropagator};
use crate::error::{DispatchError, TaskFailure};
use crate::executor::ExecutionResource;
use crate::response::ResponseCarrier;
use crate::status::TaskStatusView;
use crate::tokio_executor::{ExecutorConfig, TokioExecutionResource};

/// What to run and how to track it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatchRequest {
    /// `None` runs the work inline; `Some` runs it in the background under this id
    pub task_id: Option<String>,
    /// Name of the action the work performs
    pub action: String,
    /// Name of the target (core) the work runs against
    pub target: String,
}

impl DispatchRequest {
    pub fn new(action: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            task_id: None,
            action: action.into(),
            target: target.into(),
        }
    }

    pub fn with_task_id(mut self, task_id: impl Into<String>) -> Self {
        self.task_id = Some(task_id.into());
        self
    }

    pub fn is_async(&self) -> bool {
        self.task_id.is_some()
    }
}

/// Configuration for the default in-memory / Tokio wiring.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DispatcherConfig {
    pub registry: InMemoryRegistryConfig,
    pub executor: ExecutorConfig,
}

/// Sync-or-async dispatcher over a shared task registry.
///
/// Cheap to clone; clones share the registry, execution resource and
/// propagator.
#[derive(Clone)]
pub struct Dispatcher {
    registry: Arc<dyn TaskRegistry>,
    execution: Option<Arc<dyn ExecutionResource>>,
    propagator: Arc<dyn ContextPropagator>,
}

impl Dispatcher {
    pub fn builder() -> DispatcherBuilder {
        DispatcherBuilder::new()
    }

    /// In-memory registry, Tokio execution, no-op propagator.
    pub fn in_memory() -> Self {
        Self::from_config(&DispatcherConfig::default())
    }

    pub fn from_config(config: &DispatcherConfig) -> Self {
        Self::builder().with_config(config).build()
    }

    /// Read-only handle for the status-polling surface.
    pub fn registry(&self) -> TaskStatusView {
        TaskStatusView::new(Arc::clone(&self.registry))
    }

    /// Whether a dispatch would get past the execution environment check.
    pub fn has_execution_resource(&self) -> bool {
        self.execution
            .as_ref()
            .is_some_and(|execution| execution.is_available())
    }

    /// Run `work` for `request`.
    ///
    /// Without a task id the work runs inline and its own result comes back:
    /// `Ok(T)` or `Err(DispatchError::Work(e))` with the original `e`. The
    /// registry is not touched.
    ///
    /// With a task id the id is registered as `Running` (or the call fails
    /// with `DispatchError::DuplicateTask`), the work is submitted to the
    /// execution resource and `placeholder` is returned straight away. The
    /// real outcome is only visible through the registry.
    ///
    /// HTTP caching is disabled on `response` on every path.
    pub async fn dispatch<T, E, F, Fut>(
        &self,
        request: DispatchRequest,
        response: &mut ResponseCarrier,
        placeholder: T,
        work: F,
    ) -> Result<T, DispatchError<E>>
    where
        T: Serialize + Send + 'static,
        E: TaskFailure,
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = Result<T, E>> + Send + 'static,
    {
        response.set_http_caching(false);

        let Some(execution) = self.execution.as_ref() else {
            return Err(DispatchError::Configuration(
                "Execution environment missing".to_string(),
            ));
        };
        if !execution.is_available() {
            return Err(DispatchError::Configuration(format!(
                "Execution environment '{}' cannot accept work",
                execution.backend_name()
            )));
        }

        let DispatchRequest {
            task_id,
            action,
            target,
        } = request;
        let context = DiagnosticContext::new(action, target);

        let Some(task_id) = task_id else {
            let _scope = ContextScope::enter(Arc::clone(&self.propagator), &context);
            return async move { work().await }
                .instrument(context.dispatch_span())
                .await
                .map_err(DispatchError::Work);
        };

        self.registry
            .register_if_absent(
                NewTask::new(task_id.clone())
                    .with_action(&context.action)
                    .with_target(&context.target),
            )
            .await
            .map_err(|e| {
                if let RegistryError::DuplicateTask(_) = &e {
                    warn!(task_id = %task_id, "Rejected duplicate task registration");
                }
                DispatchError::from(e)
            })?;

        let context = context.with_task_id(task_id.clone());
        {
            let _scope = ContextScope::enter(Arc::clone(&self.propagator), &context);
            let _entered = context.dispatch_span().entered();

            let job = TaskJob {
                registry: Arc::clone(&self.registry),
                propagator: Arc::clone(&self.propagator),
                context: context.clone(),
                carrier: response.clone(),
            };
            execution.submit(&task_id, Box::new(move || job.run(work).boxed()));

            debug!(
                backend = execution.backend_name(),
                "Submitted task for asynchronous execution"
            );
        }

        Ok(placeholder)
    }

    /// Poll the registry until `task_id` is terminal or `timeout` elapses.
    ///
    /// Returns `None` if the id is not tracked at all. Once the deadline
    /// passes the latest record is returned as is, so callers must check
    /// `state` before reading the outcome.
    pub async fn wait_for_terminal(
        &self,
        task_id: &str,
        poll_interval: Duration,
        timeout: Duration,
    ) -> Result<Option<TaskRecord>, RegistryError> {
        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            match self.registry.get_task(task_id).await? {
                None => return Ok(None),
                Some(task) if is_terminal(task.state) => return Ok(Some(task)),
                Some(task) if tokio::time::Instant::now() >= deadline => {
                    debug!(task_id = %task_id, "Gave up waiting for a running task");
                    return Ok(Some(task));
                }
                Some(_) => tokio::time::sleep(poll_interval).await,
            }
        }
    }
}

/// Everything the background closure owns.
struct TaskJob {
    registry: Arc<dyn TaskRegistry>,
    propagator: Arc<dyn ContextPropagator>,
    context: DiagnosticContext,
    carrier: ResponseCarrier,
}

impl TaskJob {
    async fn run<T, E, F, Fut>(self, work: F)
    where
        T: Serialize + Send + 'static,
        E: TaskFailure,
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = Result<T, E>> + Send + 'static,
    {
        let TaskJob {
            registry,
            propagator,
            context,
            mut carrier,
        } = self;
        let task_id = context.task_id.clone().unwrap_or_default();
        let span = context.task_span();

        async move {
            let _scope = ContextScope::enter(propagator, &context);

            let outcome = AssertUnwindSafe(async move { work().await })
                .catch_unwind()
                .await;

            let finished = match outcome {
                Ok(Ok(value)) => match carrier.merge(&value) {
                    Ok(()) => registry.complete(&task_id, carrier.into_body()).await,
                    Err(e) => {
                        let failure = FailureDescriptor::new("SerializationError", e.to_string());
                        registry.fail(&task_id, failure).await
                    }
                },
                Ok(Err(err)) => registry.fail(&task_id, err.describe()).await,
                Err(panic) => {
                    let failure = FailureDescriptor::new("panic", panic_message(panic.as_ref()));
                    registry.fail(&task_id, failure).await
                }
            };

            match finished {
                Ok(record) => info!(state = %record.state, "Task finished"),
                Err(e) => error!(
                    error = %e,
                    "Task registry rejected the terminal transition of a running task"
                ),
            }
        }
        .instrument(span)
        .await
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(msg) = payload.downcast_ref::<&str>() {
        msg.to_string()
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.clone()
    } else {
        "task panicked".to_string()
    }
}

/// Builder for [`Dispatcher`].
///
/// A dispatcher built without an execution resource rejects every dispatch
/// with `DispatchError::Configuration`.
#[derive(Default)]
pub struct DispatcherBuilder {
    registry: Option<Arc<dyn TaskRegistry>>,
    execution: Option<Arc<dyn ExecutionResource>>,
    propagator: Option<Arc<dyn ContextPropagator>>,
}

impl DispatcherBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Use an in-memory registry and a Tokio execution resource built from `config`.
    pub fn with_config(self, config: &DispatcherConfig) -> Self {
        self.registry(Arc::new(InMemoryTaskRegistry::with_config(
            config.registry.clone(),
        )))
        .execution_resource(Arc::new(TokioExecutionResource::with_config(
            config.executor.clone(),
        )))
    }

    pub fn registry(mut self, registry: Arc<dyn TaskRegistry>) -> Self {
        self.registry = Some(registry);
        self
    }

    pub fn execution_resource(mut self, execution: Arc<dyn ExecutionResource>) -> Self {
        self.execution = Some(execution);
        self
    }

    pub fn propagator(mut self, propagator: Arc<dyn ContextPropagator>) -> Self {
        self.propagator = Some(propagator);
        self
    }

    pub fn build(self) -> Dispatcher {
        Dispatcher {
            registry: self
                .registry
                .unwrap_or_else(|| Arc::new(InMemoryTaskRegistry::new())),
            execution: self.execution,
            propagator: self
                .propagator
                .unwrap_or_else(|| Arc::new(NoopContextPropagator)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use turul_task_registry::TaskState;

    #[derive(Debug, thiserror::Error)]
    #[error("boom: {0}")]
    struct Boom(&'static str);

    impl TaskFailure for Boom {}

    const POLL: Duration = Duration::from_millis(5);
    const WAIT: Duration = Duration::from_secs(5);

    fn explode() -> Result<serde_json::Value, Boom> {
        panic!("index corrupted")
    }

    #[tokio::test]
    async fn test_inline_dispatch_returns_work_result() {
        let dispatcher = Dispatcher::in_memory();
        let mut response = ResponseCarrier::new();

        let value = dispatcher
            .dispatch(
                DispatchRequest::new("status", "core1"),
                &mut response,
                json!({"placeholder": true}),
                || async { Ok::<_, Boom>(json!({"value": "ok"})) },
            )
            .await
            .unwrap();

        assert_eq!(value, json!({"value": "ok"}));
        assert!(!response.http_caching());
        assert_eq!(dispatcher.registry().task_count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_async_dispatch_returns_placeholder() {
        let dispatcher = Dispatcher::in_memory();
        let mut response = ResponseCarrier::new();

        let value = dispatcher
            .dispatch(
                DispatchRequest::new("reload", "core1").with_task_id("t-ph"),
                &mut response,
                json!({"placeholder": true}),
                || async { Ok::<_, Boom>(json!({"value": "real"})) },
            )
            .await
            .unwrap();
        assert_eq!(value, json!({"placeholder": true}));

        let task = dispatcher
            .wait_for_terminal("t-ph", POLL, WAIT)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(task.state, TaskState::Completed);
        assert_eq!(task.action.as_deref(), Some("reload"));
        assert_eq!(task.target.as_deref(), Some("core1"));
        assert_eq!(task.success_payload(), Some(&json!({"value": "real"})));
    }

    #[tokio::test]
    async fn test_async_panic_is_recorded_as_failure() {
        let dispatcher = Dispatcher::in_memory();
        let mut response = ResponseCarrier::new();

        dispatcher
            .dispatch(
                DispatchRequest::new("split", "core1").with_task_id("t-panic"),
                &mut response,
                json!({}),
                || async { explode() },
            )
            .await
            .unwrap();

        let task = dispatcher
            .wait_for_terminal("t-panic", POLL, WAIT)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(task.state, TaskState::Failed);
        let failure = task.failure().unwrap();
        assert_eq!(failure.kind, "panic");
        assert_eq!(failure.message, "index corrupted");
    }

    #[tokio::test]
    async fn test_missing_execution_resource_is_configuration_error() {
        let dispatcher = Dispatcher::builder().build();
        assert!(!dispatcher.has_execution_resource());
        let mut response = ResponseCarrier::new();

        let err = dispatcher
            .dispatch(
                DispatchRequest::new("reload", "core1"),
                &mut response,
                json!({}),
                || async { Ok::<_, Boom>(json!({})) },
            )
            .await
            .unwrap_err();
        assert!(err.is_configuration());
        assert!(!response.http_caching());
    }

    #[test]
    fn test_dispatch_outside_runtime_leaves_registry_untouched() {
        let dispatcher = Dispatcher::in_memory();
        assert!(!dispatcher.has_execution_resource());
        let mut response = ResponseCarrier::new();

        let err = futures::executor::block_on(dispatcher.dispatch(
            DispatchRequest::new("reload", "core1").with_task_id("orphan"),
            &mut response,
            json!({}),
            || async { Ok::<_, Boom>(json!({"value": "ok"})) },
        ))
        .unwrap_err();
        assert!(err.is_configuration());
        assert!(!response.http_caching());

        let registry = dispatcher.registry();
        futures::executor::block_on(async {
            for state in [TaskState::Running, TaskState::Completed, TaskState::Failed] {
                assert!(registry.lookup("orphan", state).await.unwrap().is_none());
            }
            assert_eq!(registry.task_count().await.unwrap(), 0);
        });
    }

    #[tokio::test]
    async fn test_wait_for_unknown_task() {
        let dispatcher = Dispatcher::in_memory();
        let result = dispatcher
            .wait_for_terminal("never-registered", POLL, WAIT)
            .await
            .unwrap();
        assert!(result.is_none());
    }

    #[test]
    fn test_panic_message_extraction() {
        let static_str: Box<dyn Any + Send> = Box::new("static");
        assert_eq!(panic_message(static_str.as_ref()), "static");
        let owned: Box<dyn Any + Send> = Box::new(String::from("owned"));
        assert_eq!(panic_message(owned.as_ref()), "owned");
        let other: Box<dyn Any + Send> = Box::new(7_u8);
        assert_eq!(panic_message(other.as_ref()), "task panicked");
    }

    #[test]
    fn test_config_deserializes_with_defaults() {
        let config: DispatcherConfig =
            serde_json::from_value(json!({"executor": {"max_concurrency": 4}})).unwrap();
        assert_eq!(config.executor.max_concurrency, std::num::NonZeroUsize::new(4));
        assert_eq!(config.registry.max_tasks, 0);
    }
}
