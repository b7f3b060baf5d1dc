//! Core types for artifact-dl

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::Write as _;
use std::path::PathBuf;

use crate::utils::format_bytes;

/// Unique identifier for a download task within one batch
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct TaskId(pub u64);

impl TaskId {
    /// Create a new TaskId
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    /// Get the inner u64 value
    pub fn get(&self) -> u64 {
        self.0
    }
}

impl From<u64> for TaskId {
    fn from(id: u64) -> Self {
        Self(id)
    }
}

impl From<TaskId> for u64 {
    fn from(id: TaskId) -> Self {
        id.0
    }
}

impl std::fmt::Display for TaskId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for TaskId {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(s.parse()?))
    }
}

/// Artifact category, determining the destination subfolder
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    /// Textual-inversion embedding (`.pt`)
    Embedding,
    /// LoRA adapter weights
    Lora,
    /// Full model checkpoint
    Model,
}

impl Category {
    /// Canonical subfolder name for this category
    pub fn folder(&self) -> &'static str {
        match self {
            Category::Embedding => "embeddings",
            Category::Lora => "loras",
            Category::Model => "models",
        }
    }

    /// Parse a manifest section header (case-insensitive, trailing ':' allowed)
    ///
    /// Accepts the spellings that show up in shared download lists, including
    /// the widespread "embedings" typo.
    pub fn from_section(line: &str) -> Option<Self> {
        let header = line.trim().trim_end_matches(':');
        match header.to_ascii_lowercase().as_str() {
            "embedding" | "embeddings" | "embedings" => Some(Category::Embedding),
            "lora" | "loras" => Some(Category::Lora),
            "model" | "models" => Some(Category::Model),
            _ => None,
        }
    }

    /// Best-effort inference from a filename extension
    ///
    /// `.pt` files are embeddings. `.safetensors` carries no reliable signal
    /// on its own (checkpoints and LoRAs share it), so it maps to [`Lora`]
    /// and callers flag the task as inferred. Returns `None` for anything
    /// that is not a supported artifact extension.
    ///
    /// [`Lora`]: Category::Lora
    pub fn from_extension(name: &str) -> Option<Self> {
        let ext = std::path::Path::new(name)
            .extension()
            .and_then(|e| e.to_str())?
            .to_ascii_lowercase();
        match ext.as_str() {
            "pt" => Some(Category::Embedding),
            "safetensors" => Some(Category::Lora),
            _ => None,
        }
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.folder())
    }
}

/// One unit of download work, immutable once created by the classifier
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DownloadTask {
    /// Batch-unique identifier
    pub id: TaskId,
    /// Sanitized display/file name
    pub name: String,
    /// Fully-qualified download URL (the auth token is never part of it)
    pub url: String,
    /// Resolved artifact category
    pub category: Category,
    /// Final on-disk location, unique within the batch
    pub destination: PathBuf,
    /// True when the category came from extension fallback rather than an
    /// explicit section header
    pub category_inferred: bool,
}

/// Terminal status recorded for a task
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutcomeStatus {
    /// Destination already held a non-empty file; no network call was made
    Skipped,
    /// Artifact transferred and renamed into place
    Succeeded,
    /// All attempts exhausted or a non-retryable failure occurred
    Failed,
}

/// The terminal record for one task, produced exactly once by a worker
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TaskOutcome {
    /// The task this outcome belongs to
    pub task: DownloadTask,
    /// Terminal status
    pub status: OutcomeStatus,
    /// Number of fetch attempts made (0 for skipped tasks)
    pub attempts: u32,
    /// Bytes written to the destination (0 unless succeeded)
    pub bytes: u64,
    /// Description of the most recent failure, when failed
    pub error: Option<String>,
}

impl TaskOutcome {
    /// Outcome for a task short-circuited by the existence filter
    pub fn skipped(task: DownloadTask) -> Self {
        Self {
            task,
            status: OutcomeStatus::Skipped,
            attempts: 0,
            bytes: 0,
            error: None,
        }
    }

    /// Outcome for a completed transfer
    pub fn succeeded(task: DownloadTask, attempts: u32, bytes: u64) -> Self {
        Self {
            task,
            status: OutcomeStatus::Succeeded,
            attempts,
            bytes,
            error: None,
        }
    }

    /// Outcome for a task that exhausted its attempts or hit a permanent error
    pub fn failed(task: DownloadTask, attempts: u32, error: impl Into<String>) -> Self {
        Self {
            task,
            status: OutcomeStatus::Failed,
            attempts,
            bytes: 0,
            error: Some(error.into()),
        }
    }
}

/// An input line that could not be turned into a task
///
/// Malformed entries are reported in the summary but never abort the batch.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MalformedEntry {
    /// 1-based line number in the manifest
    pub line_number: usize,
    /// The offending line, verbatim
    pub line: String,
    /// Why the line was rejected
    pub reason: String,
}

/// Event emitted during a batch run
///
/// Events are broadcast to all subscribers of
/// [`BatchDownloader::subscribe`](crate::BatchDownloader::subscribe);
/// the library itself never prints.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    /// Task accepted into the run queue
    Queued {
        /// Task ID
        id: TaskId,
        /// Task name
        name: String,
    },

    /// Task short-circuited by the existence filter
    Skipped {
        /// Task ID
        id: TaskId,
        /// Task name
        name: String,
    },

    /// First fetch attempt for a task is starting
    Started {
        /// Task ID
        id: TaskId,
        /// Task name
        name: String,
    },

    /// Bytes are flowing for a task
    Progress {
        /// Task ID
        id: TaskId,
        /// Bytes received so far
        downloaded: u64,
        /// Total expected bytes, when the server sent a Content-Length
        total: Option<u64>,
    },

    /// Task finished successfully
    Succeeded {
        /// Task ID
        id: TaskId,
        /// Task name
        name: String,
        /// Bytes written to the destination
        bytes: u64,
    },

    /// Task failed permanently
    Failed {
        /// Task ID
        id: TaskId,
        /// Task name
        name: String,
        /// Fetch attempts made
        attempts: u32,
        /// The final error
        error: String,
    },
}

/// Aggregated result of one batch run
///
/// Invariant: exactly one outcome per input task -- no duplicates, no
/// omissions, regardless of worker count or per-task failures.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RunSummary {
    /// One outcome per input task (order not meaningful)
    pub outcomes: Vec<TaskOutcome>,
    /// Input entries rejected during parsing or classification
    pub malformed: Vec<MalformedEntry>,
    /// When the run started
    pub started_at: DateTime<Utc>,
    /// When the last outcome was recorded
    pub finished_at: DateTime<Utc>,
}

impl RunSummary {
    /// Number of tasks skipped by the existence filter
    pub fn skipped(&self) -> usize {
        self.count(OutcomeStatus::Skipped)
    }

    /// Number of tasks that transferred successfully
    pub fn succeeded(&self) -> usize {
        self.count(OutcomeStatus::Succeeded)
    }

    /// Number of tasks that failed permanently
    pub fn failed(&self) -> usize {
        self.count(OutcomeStatus::Failed)
    }

    /// Total bytes written across all successful tasks
    pub fn total_bytes(&self) -> u64 {
        self.outcomes.iter().map(|o| o.bytes).sum()
    }

    /// True when every task succeeded or was skipped and no input was rejected
    pub fn is_success(&self) -> bool {
        self.failed() == 0 && self.malformed.is_empty()
    }

    fn count(&self, status: OutcomeStatus) -> usize {
        self.outcomes.iter().filter(|o| o.status == status).count()
    }

    /// Render a human-readable report: counts, then every failure with its
    /// last error, then every rejected input line.
    pub fn render(&self) -> String {
        let mut out = String::new();
        let elapsed = (self.finished_at - self.started_at)
            .to_std()
            .unwrap_or_default();
        let _ = writeln!(
            out,
            "{} succeeded, {} skipped, {} failed ({} in {:.1?})",
            self.succeeded(),
            self.skipped(),
            self.failed(),
            format_bytes(self.total_bytes()),
            elapsed,
        );

        let mut failures: Vec<&TaskOutcome> = self
            .outcomes
            .iter()
            .filter(|o| o.status == OutcomeStatus::Failed)
            .collect();
        failures.sort_by_key(|o| o.task.id);
        if !failures.is_empty() {
            let _ = writeln!(out, "\nfailed downloads:");
            for outcome in failures {
                let _ = writeln!(
                    out,
                    "  {} ({} attempts): {}",
                    outcome.task.name,
                    outcome.attempts,
                    outcome.error.as_deref().unwrap_or("unknown error"),
                );
            }
        }

        if !self.malformed.is_empty() {
            let _ = writeln!(out, "\nrejected input lines:");
            for entry in &self.malformed {
                let _ = writeln!(out, "  line {}: {}", entry.line_number, entry.reason);
            }
        }

        out
    }
}
