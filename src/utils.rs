//! Utility functions for file checks and display formatting

use std::path::Path;

/// Existence filter: does `path` already hold a finished artifact?
///
/// A destination only counts as present when a regular, non-empty file sits
/// at the path. Zero-length leftovers (e.g. from a crashed process) are
/// treated as absent so they get re-downloaded.
///
/// # Examples
///
/// ```no_run
/// # async fn example() {
/// use artifact_dl::utils::already_present;
/// use std::path::Path;
///
/// if already_present(Path::new("loras/detail.safetensors")).await {
///     // skip the download
/// }
/// # }
/// ```
pub async fn already_present(path: &Path) -> bool {
    match tokio::fs::metadata(path).await {
        Ok(meta) => meta.is_file() && meta.len() > 0,
        Err(_) => false,
    }
}

/// Format a byte count for human-readable reports (binary units)
#[must_use]
pub fn format_bytes(bytes: u64) -> String {
    const UNITS: &[&str] = &["B", "KiB", "MiB", "GiB", "TiB"];

    if bytes < 1024 {
        return format!("{} B", bytes);
    }

    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    format!("{:.1} {}", value, UNITS[unit])
}
