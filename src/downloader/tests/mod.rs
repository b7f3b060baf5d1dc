//! Unit tests for the worker pool and per-task processing
//!
//! These use scripted [`ArtifactFetcher`] implementations so retry and
//! outcome behavior can be exercised without a network.

mod pool;

use crate::config::{Config, DownloadConfig, RetryConfig};
use crate::error::{FetchError, FetchResult};
use crate::fetcher::ArtifactFetcher;
use crate::types::{Category, DownloadTask, Event, TaskId};
use async_trait::async_trait;
use std::path::Path;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;
use tokio::sync::broadcast;

/// What a [`ScriptedFetcher`] does on each call
pub(super) enum FetchScript {
    /// Write a small file to the destination and succeed
    Succeed,
    /// Always fail with a retryable server error
    TransientFailure,
    /// Always fail with a non-retryable auth error
    AuthFailure,
    /// Fail retryably this many times, then succeed
    FailThenSucceed(u32),
    /// Panic when fetching the named task; succeed otherwise
    PanicOn(&'static str),
}

/// Deterministic fetcher standing in for HTTP in pool/task tests
pub(super) struct ScriptedFetcher {
    script: FetchScript,
    calls: AtomicU32,
}

impl ScriptedFetcher {
    pub(super) fn new(script: FetchScript) -> Self {
        Self {
            script,
            calls: AtomicU32::new(0),
        }
    }

    /// Total fetch invocations across all tasks
    pub(super) fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }

    fn write_destination(task: &DownloadTask) -> FetchResult<u64> {
        let body = b"scripted artifact bytes";
        std::fs::write(&task.destination, body)
            .map_err(|e| FetchError::disk(&task.destination, &e))?;
        Ok(body.len() as u64)
    }
}

#[async_trait]
impl ArtifactFetcher for ScriptedFetcher {
    async fn fetch(
        &self,
        task: &DownloadTask,
        _events: &broadcast::Sender<Event>,
    ) -> FetchResult<u64> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        match &self.script {
            FetchScript::Succeed => Self::write_destination(task),
            FetchScript::TransientFailure => Err(FetchError::Server { status: 500 }),
            FetchScript::AuthFailure => Err(FetchError::Auth { status: 401 }),
            FetchScript::FailThenSucceed(failures) => {
                if call <= *failures {
                    Err(FetchError::Server { status: 503 })
                } else {
                    Self::write_destination(task)
                }
            }
            FetchScript::PanicOn(name) => {
                if task.name == *name {
                    panic!("scripted panic for {name}");
                }
                Self::write_destination(task)
            }
        }
    }
}

/// A task rooted in the given directory
pub(super) fn make_task(id: u64, name: &str, base: &Path) -> DownloadTask {
    DownloadTask {
        id: TaskId::new(id),
        name: name.to_string(),
        url: format!("https://host.example/api/download/{id}"),
        category: Category::Lora,
        destination: base.join("loras").join(name),
        category_inferred: false,
    }
}

/// Config tuned for fast tests: millisecond backoff, no jitter
pub(super) fn test_config(max_concurrent: usize, max_attempts: u32) -> Config {
    Config {
        download: DownloadConfig {
            max_concurrent_downloads: max_concurrent,
            ..DownloadConfig::default()
        },
        retry: RetryConfig {
            max_attempts,
            initial_delay: Duration::from_millis(1),
            max_delay: Duration::from_millis(10),
            backoff_multiplier: 2.0,
            jitter: false,
        },
        ..Config::default()
    }
}
