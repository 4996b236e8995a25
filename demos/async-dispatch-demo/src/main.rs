//! # Async Dispatch Demo
//!
//! Runs a few core-admin style actions through a `Dispatcher`:
//! - `status` inline (no task id), result returned directly
//! - `reload` in the background under a task id, then polled to completion
//! - `reload` again with the same id, rejected as a duplicate
//! - `split` in the background that fails, polled to `failed`
//!
//! ## Usage
//! ```bash
//! RUST_LOG=debug cargo run -p async-dispatch-demo -- --delay-ms 300 --max-concurrency 2
//! ```

use std::num::NonZeroUsize;
use std::time::Duration;

use clap::Parser;
use serde::Serialize;
use serde_json::json;
use tracing::info;
use turul_task_dispatch::prelude::*;
use turul_task_registry::InMemoryRegistryConfig;

#[derive(Parser)]
#[command(name = "async-dispatch-demo")]
#[command(about = "Sync and async dispatch with task status polling")]
struct Args {
    /// Simulated work duration in milliseconds
    #[arg(long, default_value = "250")]
    delay_ms: u64,

    /// Bound on concurrently running background work (unbounded if omitted)
    #[arg(long)]
    max_concurrency: Option<NonZeroUsize>,

    /// Registry capacity (0 = unlimited)
    #[arg(long, default_value = "0")]
    max_tasks: usize,

    /// Status polling interval in milliseconds
    #[arg(long, default_value = "50")]
    poll_ms: u64,

    /// How long to wait for each background task before giving up
    #[arg(long, default_value = "10000")]
    timeout_ms: u64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct CoreAdminResponse {
    core: String,
    status: &'static str,
}

#[derive(Debug, thiserror::Error)]
enum CoreAdminError {
    #[error("core {0} has no index to split")]
    EmptyIndex(String),
}

impl TaskFailure for CoreAdminError {
    fn kind(&self) -> String {
        match self {
            CoreAdminError::EmptyIndex(_) => "EmptyIndex".to_string(),
        }
    }

    fn code(&self) -> Option<i64> {
        Some(400)
    }
}

async fn reload_core(core: String, delay: Duration) -> Result<CoreAdminResponse, CoreAdminError> {
    tokio::time::sleep(delay).await;
    Ok(CoreAdminResponse {
        core,
        status: "reloaded",
    })
}

async fn split_core(core: String, delay: Duration) -> Result<CoreAdminResponse, CoreAdminError> {
    tokio::time::sleep(delay).await;
    Err(CoreAdminError::EmptyIndex(core))
}

fn submitted(core: &str) -> CoreAdminResponse {
    CoreAdminResponse {
        core: core.to_string(),
        status: "submitted",
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();
    let delay = Duration::from_millis(args.delay_ms);
    let poll = Duration::from_millis(args.poll_ms);

    let dispatcher = Dispatcher::from_config(&DispatcherConfig {
        registry: InMemoryRegistryConfig {
            max_tasks: args.max_tasks,
        },
        executor: ExecutorConfig {
            max_concurrency: args.max_concurrency,
        },
    });

    // Inline
    let mut response = ResponseCarrier::new();
    let status = dispatcher
        .dispatch(
            DispatchRequest::new("status", "core1"),
            &mut response,
            submitted("core1"),
            || async {
                Ok::<_, CoreAdminError>(CoreAdminResponse {
                    core: "core1".to_string(),
                    status: "active",
                })
            },
        )
        .await?;
    info!(?status, "Inline dispatch returned");

    // Background success
    let reload_id = InMemoryTaskRegistry::generate_task_id();
    let mut response = ResponseCarrier::new();
    let placeholder = dispatcher
        .dispatch(
            DispatchRequest::new("reload", "core1").with_task_id(&reload_id),
            &mut response,
            submitted("core1"),
            move || reload_core("core1".to_string(), delay),
        )
        .await?;
    info!(task_id = %reload_id, ?placeholder, "Reload submitted");

    // Same id again while it is still running
    let mut response = ResponseCarrier::new();
    match dispatcher
        .dispatch(
            DispatchRequest::new("reload", "core1").with_task_id(&reload_id),
            &mut response,
            submitted("core1"),
            move || reload_core("core1".to_string(), delay),
        )
        .await
    {
        Err(e) if e.is_duplicate() => info!(task_id = %reload_id, error = %e, "Duplicate rejected"),
        other => anyhow::bail!("expected a duplicate rejection, got {:?}", other.map(|_| ())),
    }

    // Background failure
    let split_id = InMemoryTaskRegistry::generate_task_id();
    let mut response = ResponseCarrier::new();
    dispatcher
        .dispatch(
            DispatchRequest::new("split", "core2").with_task_id(&split_id),
            &mut response,
            submitted("core2"),
            move || split_core("core2".to_string(), delay),
        )
        .await?;

    for task_id in [&reload_id, &split_id] {
        let Some(task) = dispatcher
            .wait_for_terminal(task_id, poll, Duration::from_millis(args.timeout_ms))
            .await? else {
            anyhow::bail!("task {} vanished from the registry", task_id);
        };
        let outcome = match (task.success_payload(), task.failure()) {
            (Some(payload), _) => payload.clone(),
            (_, Some(failure)) => serde_json::to_value(failure)?,
            _ => json!(null),
        };
        println!(
            "{} {} on {}: {} {}",
            task.task_id,
            task.action.as_deref().unwrap_or("-"),
            task.target.as_deref().unwrap_or("-"),
            task.state,
            outcome
        );
    }

    for state in [TaskState::Running, TaskState::Completed, TaskState::Failed] {
        let tasks = dispatcher.registry().list_tasks(state).await?;
        println!("{}: {}", state, tasks.len());
    }

    Ok(())
}
