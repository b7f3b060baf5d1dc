//! Worker pool -- bounded concurrency over a shared task queue
//!
//! Workers pull from one mutex-guarded queue (no task is ever dequeued
//! twice) and push outcomes into one mpsc collector (no outcome is ever
//! lost). The pool guarantees exactly one outcome per input task: per-task
//! panics are caught at the worker boundary and converted into failed
//! outcomes, and a reconciliation pass backfills anything a dying worker
//! might still have dropped.

use std::collections::VecDeque;
use std::sync::Arc;

use chrono::Utc;
use tokio::sync::{Mutex, mpsc};

use super::BatchDownloader;
use super::task::{TaskContext, process_task};
use crate::error::{Error, Result};
use crate::types::{DownloadTask, Event, RunSummary, TaskOutcome};

impl BatchDownloader {
    /// Run a batch of classified tasks to completion
    ///
    /// Spawns at most `max_concurrent_downloads` workers, blocks until every
    /// task has an outcome, and returns the summary. Outcome order is not
    /// meaningful.
    ///
    /// # Errors
    ///
    /// Batch-fatal conditions only: an empty task list, or category
    /// directories that cannot be created. Per-task failures are contained
    /// in the summary.
    pub async fn run_tasks(&self, tasks: Vec<DownloadTask>) -> Result<RunSummary> {
        if tasks.is_empty() {
            return Err(Error::EmptyBatch);
        }

        let started_at = Utc::now();
        self.create_category_dirs(&tasks).await?;

        for task in &tasks {
            self.emit_event(Event::Queued {
                id: task.id,
                name: task.name.clone(),
            });
        }

        // Kept for reconciliation: every input task must end up in the summary
        let expected: Vec<DownloadTask> = tasks.clone();
        let total = tasks.len();

        let queue = Arc::new(Mutex::new(VecDeque::from(tasks)));
        let (outcome_tx, mut outcome_rx) = mpsc::unbounded_channel::<TaskOutcome>();

        let ctx = TaskContext {
            config: Arc::clone(&self.config),
            fetcher: Arc::clone(&self.fetcher),
            event_tx: self.event_tx.clone(),
            cancel: self.cancel.clone(),
        };

        let worker_count = self.config.download.max_concurrent_downloads.min(total);
        tracing::info!(tasks = total, workers = worker_count, "starting batch");

        let mut workers = Vec::with_capacity(worker_count);
        for worker_id in 0..worker_count {
            workers.push(tokio::spawn(worker_loop(
                worker_id,
                ctx.clone(),
                Arc::clone(&queue),
                outcome_tx.clone(),
            )));
        }
        // Workers hold the only remaining senders; the receiver closes once
        // they all finish
        drop(outcome_tx);

        let mut outcomes: Vec<TaskOutcome> = Vec::with_capacity(total);
        while let Some(outcome) = outcome_rx.recv().await {
            outcomes.push(outcome);
        }

        for worker in workers {
            if let Err(e) = worker.await {
                tracing::error!(error = %e, "worker terminated abnormally");
            }
        }

        reconcile_missing(&expected, &mut outcomes);

        let summary = RunSummary {
            outcomes,
            malformed: Vec::new(),
            started_at,
            finished_at: Utc::now(),
        };
        tracing::info!(
            succeeded = summary.succeeded(),
            skipped = summary.skipped(),
            failed = summary.failed(),
            "batch finished"
        );
        Ok(summary)
    }

    /// Pre-create every directory the batch will write into
    ///
    /// Failing here is batch-fatal: better to refuse the run than to have
    /// every task fail individually against the same broken directory.
    async fn create_category_dirs(&self, tasks: &[DownloadTask]) -> Result<()> {
        let mut dirs: Vec<&std::path::Path> =
            tasks.iter().filter_map(|t| t.destination.parent()).collect();
        dirs.sort_unstable();
        dirs.dedup();

        for dir in dirs {
            tokio::fs::create_dir_all(dir).await.map_err(|e| {
                Error::Io(std::io::Error::new(
                    e.kind(),
                    format!("failed to create directory '{}': {}", dir.display(), e),
                ))
            })?;
        }
        Ok(())
    }
}

/// One worker: pull, process, report -- until the queue drains
///
/// Each task's processing runs in its own spawned task so that a panic is
/// caught here as a `JoinError` and converted into a failed outcome instead
/// of taking the worker (and the whole pool) down with it.
async fn worker_loop(
    worker_id: usize,
    ctx: TaskContext,
    queue: Arc<Mutex<VecDeque<DownloadTask>>>,
    outcome_tx: mpsc::UnboundedSender<TaskOutcome>,
) {
    loop {
        let task = { queue.lock().await.pop_front() };
        let Some(task) = task else {
            break;
        };

        if ctx.cancel.is_cancelled() {
            ctx.event_tx
                .send(Event::Failed {
                    id: task.id,
                    name: task.name.clone(),
                    attempts: 0,
                    error: "cancelled before start".to_string(),
                })
                .ok();
            outcome_tx
                .send(TaskOutcome::failed(task, 0, "cancelled before start"))
                .ok();
            continue;
        }

        let fallback = task.clone();
        let outcome = match tokio::spawn(process_task(ctx.clone(), task)).await {
            Ok(outcome) => outcome,
            Err(join_err) => {
                tracing::error!(
                    worker_id = worker_id,
                    task_id = %fallback.id,
                    error = %join_err,
                    "task processing panicked"
                );
                ctx.event_tx
                    .send(Event::Failed {
                        id: fallback.id,
                        name: fallback.name.clone(),
                        attempts: 0,
                        error: format!("internal error: {join_err}"),
                    })
                    .ok();
                TaskOutcome::failed(fallback, 0, format!("internal error: {join_err}"))
            }
        };

        outcome_tx.send(outcome).ok();
    }

    tracing::debug!(worker_id = worker_id, "worker drained queue");
}

/// Backfill failed outcomes for any task that never got one
///
/// This should be unreachable -- workers convert panics into outcomes -- but
/// the summary invariant (exactly one outcome per task) is cheap to enforce
/// and expensive to debug when silently broken.
fn reconcile_missing(expected: &[DownloadTask], outcomes: &mut Vec<TaskOutcome>) {
    if outcomes.len() == expected.len() {
        return;
    }

    let seen: std::collections::HashSet<_> = outcomes.iter().map(|o| o.task.id).collect();
    for task in expected {
        if !seen.contains(&task.id) {
            tracing::error!(task_id = %task.id, "task lost by its worker, recording failure");
            outcomes.push(TaskOutcome::failed(
                task.clone(),
                0,
                "internal error: no outcome recorded",
            ));
        }
    }
}
