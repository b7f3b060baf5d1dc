//! Per-task processing -- existence filter, retry-wrapped fetch, outcome
//!
//! Everything here is infallible by construction: whatever happens to a task
//! ends up inside its [`TaskOutcome`], never as an error crossing the worker
//! boundary.

use crate::config::Config;
use crate::fetcher::ArtifactFetcher;
use crate::retry::fetch_with_retry;
use crate::types::{DownloadTask, Event, TaskOutcome};
use crate::utils::already_present;
use std::sync::Arc;
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;

/// Shared state a worker needs to process tasks
#[derive(Clone)]
pub(super) struct TaskContext {
    pub(super) config: Arc<Config>,
    pub(super) fetcher: Arc<dyn ArtifactFetcher>,
    pub(super) event_tx: broadcast::Sender<Event>,
    pub(super) cancel: CancellationToken,
}

impl TaskContext {
    fn emit(&self, event: Event) {
        self.event_tx.send(event).ok();
    }
}

/// Process one task start-to-finish and return its outcome
///
/// Existence filter first: a non-empty file at the destination short-circuits
/// to `Skipped` without any network call. Otherwise the fetch runs under the
/// retry wrapper, and the attempt count lands in the outcome either way.
pub(super) async fn process_task(ctx: TaskContext, task: DownloadTask) -> TaskOutcome {
    if already_present(&task.destination).await {
        tracing::info!(
            task_id = %task.id,
            name = %task.name,
            destination = %task.destination.display(),
            "destination already present, skipping"
        );
        ctx.emit(Event::Skipped {
            id: task.id,
            name: task.name.clone(),
        });
        return TaskOutcome::skipped(task);
    }

    ctx.emit(Event::Started {
        id: task.id,
        name: task.name.clone(),
    });

    let mut attempts: u32 = 0;
    let result = fetch_with_retry(&ctx.config.retry, &ctx.cancel, || {
        attempts += 1;
        ctx.fetcher.fetch(&task, &ctx.event_tx)
    })
    .await;

    match result {
        Ok(bytes) => {
            tracing::info!(
                task_id = %task.id,
                name = %task.name,
                bytes = bytes,
                attempts = attempts,
                "download succeeded"
            );
            ctx.emit(Event::Succeeded {
                id: task.id,
                name: task.name.clone(),
                bytes,
            });
            TaskOutcome::succeeded(task, attempts, bytes)
        }
        Err(e) => {
            tracing::error!(
                task_id = %task.id,
                name = %task.name,
                attempts = attempts,
                error = %e,
                "download failed"
            );
            ctx.emit(Event::Failed {
                id: task.id,
                name: task.name.clone(),
                attempts,
                error: e.to_string(),
            });
            TaskOutcome::failed(task, attempts, e.to_string())
        }
    }
}
