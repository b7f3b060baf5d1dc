//! # artifact-dl
//!
//! Concurrent download manager for token-authenticated model artifact hosts.
//!
//! ## Design Philosophy
//!
//! artifact-dl is designed to be:
//! - **Library-first** - The CLI binary is thin glue over the public API
//! - **Batch-safe** - One failing download never stalls or crashes the batch
//! - **Idempotent** - Finished artifacts are skipped, so re-running the same
//!   manifest resumes where the last run left off
//! - **Event-driven** - Consumers subscribe to events; the library never prints
//!
//! ## Quick Start
//!
//! ```no_run
//! use artifact_dl::{AuthToken, BatchDownloader, Config};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let token = AuthToken::new("api-token")?;
//!     let downloader = BatchDownloader::new(Config::default(), token)?;
//!
//!     // Subscribe to events
//!     let mut events = downloader.subscribe();
//!     tokio::spawn(async move {
//!         while let Ok(event) = events.recv().await {
//!             println!("Event: {:?}", event);
//!         }
//!     });
//!
//!     let summary = downloader
//!         .run_manifest(std::path::Path::new("urls.txt"))
//!         .await?;
//!     println!("{}", summary.render());
//!
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]

/// Authentication token handling
pub mod auth;
/// Task classification and destination resolution
pub mod classify;
/// Configuration types
pub mod config;
/// Core download engine (worker pool and per-task processing)
pub mod downloader;
/// Error types
pub mod error;
/// Artifact transfer (HTTP fetcher and the fetcher trait)
pub mod fetcher;
/// Manifest parsing
pub mod manifest;
/// Retry logic with exponential backoff
pub mod retry;
/// Core types and events
pub mod types;
/// Utility functions
pub mod utils;

// Re-export commonly used types
pub use auth::{AuthToken, TOKEN_ENV_VAR};
pub use classify::{Classified, TaskClassifier};
pub use config::{Config, DownloadConfig, HttpConfig, RetryConfig};
pub use downloader::BatchDownloader;
pub use error::{Error, FetchError, FetchResult, Result};
pub use fetcher::{ArtifactFetcher, HttpFetcher};
pub use manifest::{Manifest, RawEntry};
pub use retry::IsRetryable;
pub use types::{
    Category, DownloadTask, Event, MalformedEntry, OutcomeStatus, RunSummary, TaskId, TaskOutcome,
};
