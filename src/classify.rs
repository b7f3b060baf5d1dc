//! Task classification -- turning raw manifest entries into download tasks
//!
//! The classifier owns the rules that keep the worker pool simple: names are
//! sanitized, URLs validated, categories resolved, and destinations made
//! unique before any task reaches a worker. A rejected entry becomes a
//! [`MalformedEntry`]; classification never aborts the batch.

use crate::error::{Error, Result};
use crate::manifest::RawEntry;
use crate::types::{Category, DownloadTask, MalformedEntry, TaskId};
use regex::Regex;
use std::collections::HashSet;
use std::path::PathBuf;
use url::Url;

/// Characters stripped from display names: control characters plus everything
/// that is reserved on at least one supported filesystem
const ILLEGAL_NAME_CHARS: &str = r#"[<>:"/\\|?*\x00-\x1f\x7f]"#;

/// Resolves raw manifest entries into immutable [`DownloadTask`]s
pub struct TaskClassifier {
    base_dir: PathBuf,
    illegal: Regex,
}

/// Classification result: accepted tasks plus rejected entries
#[derive(Debug)]
pub struct Classified {
    /// Tasks ready for the worker pool, destinations unique within the batch
    pub tasks: Vec<DownloadTask>,
    /// Entries rejected with a reason
    pub malformed: Vec<MalformedEntry>,
}

impl TaskClassifier {
    /// Create a classifier rooted at `base_dir`
    ///
    /// The sanitizer pattern is compiled once here and reused for every entry.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if the sanitizer pattern fails to compile.
    pub fn new(base_dir: impl Into<PathBuf>) -> Result<Self> {
        let illegal = Regex::new(ILLEGAL_NAME_CHARS).map_err(|e| Error::Config {
            message: format!("failed to compile filename sanitizer: {e}"),
            key: None,
        })?;
        Ok(Self {
            base_dir: base_dir.into(),
            illegal,
        })
    }

    /// Classify a batch of raw entries
    ///
    /// Section headers are authoritative for the category; the filename
    /// extension is a best-effort fallback, and tasks resolved that way carry
    /// `category_inferred = true`. Task IDs are assigned sequentially in
    /// manifest order.
    pub fn classify(&self, entries: Vec<RawEntry>) -> Classified {
        let mut tasks: Vec<DownloadTask> = Vec::with_capacity(entries.len());
        let mut malformed = Vec::new();
        let mut seen_destinations: HashSet<PathBuf> = HashSet::new();

        for entry in entries {
            match self.classify_entry(&entry, TaskId::new(tasks.len() as u64 + 1)) {
                Ok(task) => {
                    if !seen_destinations.insert(task.destination.clone()) {
                        malformed.push(reject(
                            &entry,
                            format!("duplicate destination '{}'", task.destination.display()),
                        ));
                        continue;
                    }
                    tasks.push(task);
                }
                Err(reason) => malformed.push(reject(&entry, reason)),
            }
        }

        Classified { tasks, malformed }
    }

    fn classify_entry(
        &self,
        entry: &RawEntry,
        id: TaskId,
    ) -> std::result::Result<DownloadTask, String> {
        let name = self.sanitize(&entry.name)?;

        let from_extension = Category::from_extension(&name)
            .ok_or_else(|| format!("unsupported extension in '{name}'"))?;

        let url = Url::parse(&entry.url).map_err(|e| format!("invalid url: {e}"))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(format!("unsupported url scheme '{}'", url.scheme()));
        }

        let (category, category_inferred) = match entry.section {
            Some(section) => (section, false),
            None => {
                if from_extension == Category::Lora {
                    // .safetensors alone cannot distinguish a LoRA from a
                    // checkpoint; flag it rather than guess silently
                    tracing::warn!(
                        line = entry.line_number,
                        name = %name,
                        "no section header, assuming lora for .safetensors"
                    );
                }
                (from_extension, true)
            }
        };

        Ok(DownloadTask {
            id,
            name: name.clone(),
            url: entry.url.clone(),
            category,
            destination: self.base_dir.join(category.folder()).join(&name),
            category_inferred,
        })
    }

    /// Strip directory components and dangerous characters from a display name
    fn sanitize(&self, raw: &str) -> std::result::Result<String, String> {
        // Drop any directory prefix, whichever separator style it uses
        let base = raw.rsplit(['/', '\\']).next().unwrap_or(raw);
        if base.contains("..") {
            return Err(format!("path traversal in name '{raw}'"));
        }

        let cleaned = self.illegal.replace_all(base, "_");
        let trimmed = cleaned.trim_matches(['.', ' ']);
        if trimmed.is_empty() {
            return Err("name is empty after sanitization".to_string());
        }
        Ok(trimmed.to_string())
    }
}

fn reject(entry: &RawEntry, reason: String) -> MalformedEntry {
    tracing::warn!(
        line = entry.line_number,
        name = %entry.name,
        reason = %reason,
        "rejected manifest entry"
    );
    MalformedEntry {
        line_number: entry.line_number,
        line: format!("{} - {}", entry.name, entry.url),
        reason,
    }
}
