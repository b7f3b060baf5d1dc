//! Manifest parsing -- the line-oriented `"<name> - <url>"` input format
//!
//! A manifest is a plain text file where each line is one of:
//! - a section header naming a category (`embedings`, `Lora`, `Model`,
//!   case-insensitive, optional trailing `:`) that applies to every entry
//!   until the next header,
//! - an entry of the form `<name> - <url>` (the first ` - ` separates; the
//!   URL may itself contain dashes),
//! - blank (ignored).
//!
//! Anything else is recorded as a [`MalformedEntry`] and reported, but a bad
//! line never aborts the batch.

use crate::error::{Error, Result};
use crate::types::{Category, MalformedEntry};
use std::path::Path;

/// Separator between the display name and the URL on an entry line
const ENTRY_SEPARATOR: &str = " - ";

/// One successfully parsed manifest line, not yet classified into a task
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RawEntry {
    /// Display/file name as written in the manifest
    pub name: String,
    /// Download URL as written in the manifest
    pub url: String,
    /// The section the entry appeared under, if any
    pub section: Option<Category>,
    /// 1-based line number, for diagnostics
    pub line_number: usize,
}

/// Parsed manifest: usable entries plus everything that was rejected
#[derive(Clone, Debug, Default)]
pub struct Manifest {
    /// Entries in manifest order
    pub entries: Vec<RawEntry>,
    /// Lines that could not be parsed
    pub malformed: Vec<MalformedEntry>,
}

impl Manifest {
    /// Parse manifest text
    ///
    /// Never fails: unparseable lines land in [`Manifest::malformed`].
    pub fn parse(input: &str) -> Self {
        let mut entries = Vec::new();
        let mut malformed = Vec::new();
        let mut section: Option<Category> = None;

        for (idx, raw_line) in input.lines().enumerate() {
            let line_number = idx + 1;
            let line = raw_line.trim();
            if line.is_empty() {
                continue;
            }

            if let Some(category) = Category::from_section(line) {
                section = Some(category);
                continue;
            }

            let Some((name, url)) = line.split_once(ENTRY_SEPARATOR) else {
                malformed.push(MalformedEntry {
                    line_number,
                    line: raw_line.to_string(),
                    reason: format!("missing '{ENTRY_SEPARATOR}' separator"),
                });
                continue;
            };

            let name = name.trim();
            let url = url.trim();
            if name.is_empty() || url.is_empty() {
                malformed.push(MalformedEntry {
                    line_number,
                    line: raw_line.to_string(),
                    reason: "empty name or url".to_string(),
                });
                continue;
            }

            entries.push(RawEntry {
                name: name.to_string(),
                url: url.to_string(),
                section,
                line_number,
            });
        }

        if !malformed.is_empty() {
            tracing::warn!(
                rejected = malformed.len(),
                accepted = entries.len(),
                "manifest contained unparseable lines"
            );
        }

        Self { entries, malformed }
    }

    /// Read and parse a manifest file
    ///
    /// # Errors
    ///
    /// - [`Error::ManifestUnreadable`] when the file cannot be read
    /// - [`Error::EmptyManifest`] when no entry line parses -- with nothing to
    ///   download, the run is refused before any worker starts
    pub async fn from_file(path: &Path) -> Result<Self> {
        let content =
            tokio::fs::read_to_string(path)
                .await
                .map_err(|source| Error::ManifestUnreadable {
                    path: path.to_path_buf(),
                    source,
                })?;

        let manifest = Self::parse(&content);
        if manifest.entries.is_empty() {
            return Err(Error::EmptyManifest {
                path: path.to_path_buf(),
            });
        }
        Ok(manifest)
    }
}
