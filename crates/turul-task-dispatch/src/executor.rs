//! Execution Resource: abstraction for where submitted task work runs.
//!
//! Separates *how work runs* from *how tasks are tracked*.
//! Default: `TokioExecutionResource` (in-process, `tokio::spawn`).

use futures::future::BoxFuture;

/// Boxed unit of background work. It owns everything it needs, including the
/// registry handle it reports its outcome to.
pub type BoxedWork = Box<dyn FnOnce() -> BoxFuture<'static, ()> + Send>;

/// A background execution facility.
///
/// Submission is fire-and-forget: an implementation must eventually run the
/// work, and gives the submitter no saturation or rejection signal.
pub trait ExecutionResource: Send + Sync {
    /// Human-readable name of the execution backend (e.g., "tokio")
    fn backend_name(&self) -> &'static str;

    /// Whether `submit` can hand work off from the calling context right now.
    ///
    /// The dispatcher checks this before registering a task, so a resource
    /// that reports `false` never leaves an orphaned `Running` entry behind.
    fn is_available(&self) -> bool {
        true
    }

    /// Hand `work` off for execution independent of the caller's lifetime.
    fn submit(&self, task_id: &str, work: BoxedWork);
}
