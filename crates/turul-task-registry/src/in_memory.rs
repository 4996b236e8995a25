//! In-memory task registry backend.
//!
//! Tasks live in a single `HashMap` behind an `RwLock`, keyed by id. The
//! map stores the state alongside the outcome, so there is exactly one place
//! an id can be and no window between the dedup check and the insert.

use crate::error::RegistryError;
use crate::state_machine::{self, TaskState};
use crate::traits::{
    FailureDescriptor, NewTask, TaskOutcome, TaskQuery, TaskRecord, TaskRegistry,
};
use async_trait::async_trait;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, warn};
use uuid::Uuid;

/// Configuration for the in-memory task registry backend.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct InMemoryRegistryConfig {
    /// Maximum number of tracked tasks across all states (0 = unlimited)
    pub max_tasks: usize,
}

/// In-memory task registry backend.
///
/// Cheap to clone; clones share the same underlying map.
#[derive(Clone)]
pub struct InMemoryTaskRegistry {
    tasks: Arc<RwLock<HashMap<String, TaskRecord>>>,
    config: InMemoryRegistryConfig,
}

impl InMemoryTaskRegistry {
    /// Create a new in-memory registry with default configuration.
    pub fn new() -> Self {
        Self::with_config(InMemoryRegistryConfig::default())
    }

    /// Create a new in-memory registry with custom configuration.
    pub fn with_config(config: InMemoryRegistryConfig) -> Self {
        Self {
            tasks: Arc::new(RwLock::new(HashMap::new())),
            config,
        }
    }

    /// Generate a fresh task id using UUID v7 (temporal ordering).
    ///
    /// Callers are free to supply their own ids; this is a convenience.
    pub fn generate_task_id() -> String {
        Uuid::now_v7().to_string()
    }

    fn now_iso8601() -> String {
        Utc::now().to_rfc3339()
    }

    /// Apply the single `Running -> terminal` transition under the write lock.
    async fn finish(
        &self,
        task_id: &str,
        outcome: TaskOutcome,
    ) -> Result<TaskRecord, RegistryError> {
        let mut tasks = self.tasks.write().await;

        let task = tasks
            .get_mut(task_id)
            .ok_or_else(|| RegistryError::TaskNotFound(task_id.to_string()))?;

        // Only a running task can be finished; anything else reads as "not running"
        let target = outcome.terminal_state();
        if let Err(e) = state_machine::validate_transition(task.state, target) {
            warn!(task_id = %task_id, error = %e, "Rejected transition of a task that is not running");
            return Err(RegistryError::TaskNotFound(task_id.to_string()));
        }

        task.state = target;
        task.outcome = Some(outcome);
        task.last_updated_at = Self::now_iso8601();

        Ok(task.clone())
    }
}

impl Default for InMemoryTaskRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TaskRegistry for InMemoryTaskRegistry {
    async fn register_if_absent(&self, task: NewTask) -> Result<TaskRecord, RegistryError> {
        let mut tasks = self.tasks.write().await;

        if self.config.max_tasks > 0
            && tasks.len() >= self.config.max_tasks
            && !tasks.contains_key(&task.task_id)
        {
            return Err(RegistryError::CapacityReached(self.config.max_tasks));
        }

        match tasks.entry(task.task_id) {
            Entry::Occupied(existing) => {
                Err(RegistryError::DuplicateTask(existing.key().clone()))
            }
            Entry::Vacant(slot) => {
                let now = Self::now_iso8601();
                let record = TaskRecord {
                    task_id: slot.key().clone(),
                    state: TaskState::Running,
                    action: task.action,
                    target: task.target,
                    created_at: now.clone(),
                    last_updated_at: now,
                    outcome: None,
                };
                debug!(task_id = %record.task_id, "Registered running task");
                Ok(slot.insert(record).clone())
            }
        }
    }

    async fn complete(&self, task_id: &str, payload: Value) -> Result<TaskRecord, RegistryError> {
        self.finish(task_id, TaskOutcome::Success(payload)).await
    }

    async fn fail(
        &self,
        task_id: &str,
        failure: FailureDescriptor,
    ) -> Result<TaskRecord, RegistryError> {
        self.finish(task_id, TaskOutcome::Failure(failure)).await
    }
}

#[async_trait]
impl TaskQuery for InMemoryTaskRegistry {
    fn backend_name(&self) -> &'static str {
        "in-memory"
    }

    async fn lookup(
        &self,
        task_id: &str,
        state: TaskState,
    ) -> Result<Option<TaskRecord>, RegistryError> {
        let tasks = self.tasks.read().await;
        Ok(tasks.get(task_id).filter(|t| t.state == state).cloned())
    }

    async fn get_task(&self, task_id: &str) -> Result<Option<TaskRecord>, RegistryError> {
        let tasks = self.tasks.read().await;
        Ok(tasks.get(task_id).cloned())
    }

    async fn list_tasks(&self, state: TaskState) -> Result<Vec<TaskRecord>, RegistryError> {
        let tasks = self.tasks.read().await;

        let mut listed: Vec<TaskRecord> = tasks
            .values()
            .filter(|t| t.state == state)
            .cloned()
            .collect();
        listed.sort_by(|a, b| {
            a.created_at
                .cmp(&b.created_at)
                .then_with(|| a.task_id.cmp(&b.task_id))
        });

        Ok(listed)
    }

    async fn task_count(&self) -> Result<usize, RegistryError> {
        let tasks = self.tasks.read().await;
        Ok(tasks.len())
    }

    async fn purge(&self, task_id: &str) -> Result<bool, RegistryError> {
        let mut tasks = self.tasks.write().await;

        let state = match tasks.get(task_id) {
            Some(task) => task.state,
            None => return Ok(false),
        };
        if !state_machine::is_terminal(state) {
            return Err(RegistryError::TaskRunning(task_id.to_string()));
        }

        tasks.remove(task_id);
        debug!(task_id = %task_id, "Purged terminal task");
        Ok(true)
    }
}
