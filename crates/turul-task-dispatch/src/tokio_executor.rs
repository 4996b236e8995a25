//! Tokio-based execution resource: default in-process execution using tokio::spawn.

use std::num::NonZeroUsize;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::runtime::Handle;
use tokio::sync::Semaphore;
use tracing::{debug, trace};

use crate::executor::{BoxedWork, ExecutionResource};

/// Configuration for [`TokioExecutionResource`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ExecutorConfig {
    /// Upper bound on concurrently running units (`None` = unbounded).
    ///
    /// Units over the bound wait for a permit inside their own spawned task;
    /// `submit` itself never blocks. A bound of zero is rejected when the
    /// config is deserialized.
    pub max_concurrency: Option<NonZeroUsize>,
}

/// In-process execution resource using the Tokio runtime.
///
/// Only available from within a Tokio runtime; elsewhere `is_available`
/// reports `false` and the dispatcher refuses the work.
#[derive(Clone)]
pub struct TokioExecutionResource {
    permits: Option<Arc<Semaphore>>,
}

impl TokioExecutionResource {
    pub fn new() -> Self {
        Self::with_config(ExecutorConfig::default())
    }

    pub fn with_config(config: ExecutorConfig) -> Self {
        Self {
            permits: config
                .max_concurrency
                .map(|n| Arc::new(Semaphore::new(n.get()))),
        }
    }

    /// Number of free slots, or `None` when unbounded.
    pub fn available_permits(&self) -> Option<usize> {
        self.permits.as_ref().map(|p| p.available_permits())
    }
}

impl Default for TokioExecutionResource {
    fn default() -> Self {
        Self::new()
    }
}

impl ExecutionResource for TokioExecutionResource {
    fn backend_name(&self) -> &'static str {
        "tokio"
    }

    fn is_available(&self) -> bool {
        Handle::try_current().is_ok()
    }

    fn submit(&self, task_id: &str, work: BoxedWork) {
        let permits = self.permits.clone();
        let task_id_owned = task_id.to_string();

        tokio::spawn(async move {
            // Held for the duration of the work; the semaphore is never closed
            let _permit = match permits {
                Some(permits) => permits.acquire_owned().await.ok(),
                None => None,
            };
            trace!(task_id = %task_id_owned, "Running submitted work");
            (work)().await;
            debug!(task_id = %task_id_owned, "Submitted work finished");
        });
    }
}
