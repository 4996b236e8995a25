//! Read-only task status handle for callers outside the dispatcher.

use std::sync::Arc;

use async_trait::async_trait;
use turul_task_registry::{RegistryError, TaskQuery, TaskRecord, TaskRegistry, TaskState};

/// Status-polling view over the dispatcher's registry.
///
/// Only the [`TaskQuery`] surface is reachable through it; `complete` and
/// `fail` stay with the background job that owns the task.
#[derive(Clone)]
pub struct TaskStatusView {
    registry: Arc<dyn TaskRegistry>,
}

impl TaskStatusView {
    pub(crate) fn new(registry: Arc<dyn TaskRegistry>) -> Self {
        Self { registry }
    }
}

#[async_trait]
impl TaskQuery for TaskStatusView {
    fn backend_name(&self) -> &'static str {
        self.registry.backend_name()
    }

    async fn lookup(
        &self,
        task_id: &str,
        state: TaskState,
    ) -> Result<Option<TaskRecord>, RegistryError> {
        self.registry.lookup(task_id, state).await
    }

    async fn get_task(&self, task_id: &str) -> Result<Option<TaskRecord>, RegistryError> {
        self.registry.get_task(task_id).await
    }

    async fn list_tasks(&self, state: TaskState) -> Result<Vec<TaskRecord>, RegistryError> {
        self.registry.list_tasks(state).await
    }

    async fn task_count(&self) -> Result<usize, RegistryError> {
        self.registry.task_count().await
    }

    async fn purge(&self, task_id: &str) -> Result<bool, RegistryError> {
        self.registry.purge(task_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use turul_task_registry::{InMemoryTaskRegistry, NewTask};

    #[tokio::test]
    async fn test_view_reads_through_to_registry() {
        let registry = Arc::new(InMemoryTaskRegistry::new());
        registry.register_if_absent(NewTask::new("t1")).await.unwrap();
        let view = TaskStatusView::new(registry.clone());

        assert_eq!(view.backend_name(), "in-memory");
        assert_eq!(view.task_count().await.unwrap(), 1);
        assert!(view.lookup("t1", TaskState::Running).await.unwrap().is_some());
        assert_eq!(
            view.purge("t1").await,
            Err(RegistryError::TaskRunning("t1".to_string()))
        );

        registry.complete("t1", json!({"value": "ok"})).await.unwrap();
        let listed = view.list_tasks(TaskState::Completed).await.unwrap();
        assert_eq!(listed.len(), 1);
        assert!(view.purge("t1").await.unwrap());
        assert!(view.get_task("t1").await.unwrap().is_none());
    }
}
