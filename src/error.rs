//! Error types for artifact-dl
//!
//! Errors come in two layers:
//! - [`Error`] is the batch-level type returned by library entry points.
//!   Anything that surfaces here aborts the run before the worker pool starts.
//! - [`FetchError`] classifies single-transfer failures so the retry layer can
//!   tell transient conditions from permanent ones. Fetch errors never escape
//!   a task: they are recorded in that task's outcome.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for artifact-dl operations
pub type Result<T> = std::result::Result<T, Error>;

/// Result type alias for single-transfer operations
pub type FetchResult<T> = std::result::Result<T, FetchError>;

/// Main error type for artifact-dl
///
/// These are the batch-fatal conditions: configuration problems, unreadable
/// input, or a missing token -- all discovered before any download begins.
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error with context about which setting is invalid
    #[error("configuration error: {message}")]
    Config {
        /// Human-readable error message describing the configuration issue
        message: String,
        /// The configuration key that caused the error (e.g., "max_concurrent_downloads")
        key: Option<String>,
    },

    /// Manifest file could not be read from disk
    #[error("failed to read manifest '{path}': {source}")]
    ManifestUnreadable {
        /// Path to the manifest file
        path: PathBuf,
        /// The underlying I/O error
        source: std::io::Error,
    },

    /// Manifest contained no usable download entries
    #[error("manifest '{path}' contains no download entries")]
    EmptyManifest {
        /// Path to the manifest file
        path: PathBuf,
    },

    /// The engine was invoked with an empty task list
    #[error("no download tasks to run")]
    EmptyBatch,

    /// Authentication token is missing or unusable
    #[error("invalid auth token: {0}")]
    InvalidToken(String),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Single-transfer failure classification
///
/// The variants split along the retry boundary: credential and not-found
/// failures cannot be fixed by trying again, while server-side, transport,
/// and transient disk failures can. The split is consumed by the
/// [`IsRetryable`](crate::retry::IsRetryable) impl in the retry module.
#[derive(Debug, Error)]
pub enum FetchError {
    /// Credentials rejected by the host (HTTP 401/403)
    ///
    /// Retrying with the same token cannot succeed.
    #[error("authentication rejected (HTTP {status})")]
    Auth {
        /// The rejecting status code (401 or 403)
        status: u16,
    },

    /// Artifact does not exist on the host (HTTP 404)
    #[error("artifact not found (HTTP 404)")]
    NotFound,

    /// Server-side failure or throttling (HTTP 408/429/5xx)
    #[error("server error (HTTP {status})")]
    Server {
        /// The failing status code
        status: u16,
    },

    /// Any other non-success status (unexpected 3xx/4xx)
    #[error("unexpected HTTP status {status}")]
    Status {
        /// The unexpected status code
        status: u16,
    },

    /// Request timed out before or during the transfer
    #[error("request timed out: {0}")]
    Timeout(String),

    /// TCP/TLS connection could not be established
    #[error("connection failed: {0}")]
    Connect(String),

    /// Transfer aborted mid-stream (connection reset, truncated body)
    #[error("transfer interrupted: {0}")]
    Stream(String),

    /// Writing the artifact to disk failed
    #[error("disk error while writing '{path}': {message}")]
    Disk {
        /// The path being written when the error occurred
        path: PathBuf,
        /// The I/O error kind, used for retryability classification
        kind: std::io::ErrorKind,
        /// Human-readable description of the failure
        message: String,
    },
}

impl FetchError {
    /// Classify a transport-level reqwest error into the matching variant
    pub(crate) fn from_transport(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            FetchError::Timeout(err.to_string())
        } else if err.is_connect() {
            FetchError::Connect(err.to_string())
        } else {
            FetchError::Stream(err.to_string())
        }
    }

    /// Wrap an I/O error raised while writing to `path`
    pub(crate) fn disk(path: &std::path::Path, err: &std::io::Error) -> Self {
        FetchError::Disk {
            path: path.to_path_buf(),
            kind: err.kind(),
            message: err.to_string(),
        }
    }
}
