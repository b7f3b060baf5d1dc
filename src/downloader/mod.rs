//! Core download engine split into focused submodules
//!
//! The `BatchDownloader` struct and its methods are organized by concern:
//! - [`pool`] - Worker pool: shared queue, outcome collection, completeness
//! - [`task`] - Per-task processing: existence filter, retry-wrapped fetch
//!
//! The engine is handed a list of immutable tasks and a token at
//! construction; it owns nothing global and can be run repeatedly.

mod pool;
mod task;

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests;

use crate::auth::AuthToken;
use crate::classify::TaskClassifier;
use crate::config::Config;
use crate::error::{Error, Result};
use crate::fetcher::{ArtifactFetcher, HttpFetcher};
use crate::manifest::Manifest;
use crate::types::{Event, RunSummary};
use std::path::Path;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Capacity of the event broadcast channel
///
/// Slow subscribers that fall further behind than this receive
/// `RecvError::Lagged` rather than stalling the workers.
const EVENT_CHANNEL_CAPACITY: usize = 1024;

/// Concurrent batch download engine
///
/// Cloneable-by-parts: all shared state is `Arc`-wrapped internally. One
/// instance can run several batches sequentially; each run gets its own
/// queue and outcome collector.
pub struct BatchDownloader {
    /// Configuration (wrapped in Arc for sharing across workers)
    config: Arc<Config>,
    /// Transfer implementation (trait object so tests can substitute one)
    fetcher: Arc<dyn ArtifactFetcher>,
    /// Event broadcast channel sender (multiple subscribers supported)
    event_tx: tokio::sync::broadcast::Sender<Event>,
    /// Cancellation flag checked between queue pops and retry attempts
    cancel: CancellationToken,
}

impl BatchDownloader {
    /// Create an engine that downloads over HTTP with the given token
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] for invalid configuration or an
    /// unconstructible HTTP client.
    pub fn new(config: Config, token: AuthToken) -> Result<Self> {
        config.validate()?;
        let fetcher = Arc::new(HttpFetcher::new(&config.http, token)?);
        Ok(Self::assemble(config, fetcher))
    }

    /// Create an engine with a custom transfer implementation
    ///
    /// Intended for tests and embedders that fetch artifacts through
    /// something other than plain HTTP.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] for invalid configuration.
    pub fn with_fetcher(config: Config, fetcher: Arc<dyn ArtifactFetcher>) -> Result<Self> {
        config.validate()?;
        Ok(Self::assemble(config, fetcher))
    }

    fn assemble(config: Config, fetcher: Arc<dyn ArtifactFetcher>) -> Self {
        let (event_tx, _rx) = tokio::sync::broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            config: Arc::new(config),
            fetcher,
            event_tx,
            cancel: CancellationToken::new(),
        }
    }

    /// Subscribe to run events
    ///
    /// Multiple subscribers are supported; each receives all events
    /// independently. Subscribe before calling a `run_*` method or early
    /// events are missed.
    pub fn subscribe(&self) -> tokio::sync::broadcast::Receiver<Event> {
        self.event_tx.subscribe()
    }

    /// Request cancellation of the current run
    ///
    /// Workers stop pulling new tasks and suppress further retries. Tasks
    /// already mid-transfer finish their current attempt; tasks still queued
    /// are recorded as failed ("cancelled before start") so the summary stays
    /// complete.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Get the current configuration
    pub fn config(&self) -> Arc<Config> {
        Arc::clone(&self.config)
    }

    /// Parse a manifest file, classify its entries, and run the batch
    ///
    /// Convenience wrapper over [`Manifest::from_file`],
    /// [`TaskClassifier::classify`], and [`run_tasks`](Self::run_tasks).
    /// Malformed manifest/classifier entries are carried into the returned
    /// summary.
    ///
    /// # Errors
    ///
    /// Batch-fatal conditions only: unreadable manifest, no classifiable
    /// tasks, un-creatable directories.
    pub async fn run_manifest(&self, path: &Path) -> Result<RunSummary> {
        let manifest = Manifest::from_file(path).await?;
        let classifier = TaskClassifier::new(&self.config.download.base_dir)?;

        let classified = classifier.classify(manifest.entries);
        let mut malformed = manifest.malformed;
        malformed.extend(classified.malformed);

        if classified.tasks.is_empty() {
            return Err(Error::EmptyBatch);
        }

        let mut summary = self.run_tasks(classified.tasks).await?;
        summary.malformed = malformed;
        Ok(summary)
    }

    /// Emit an event to all subscribers
    ///
    /// If nobody is listening the event is silently dropped -- the run never
    /// depends on subscribers being present.
    pub(crate) fn emit_event(&self, event: Event) {
        self.event_tx.send(event).ok();
    }
}
