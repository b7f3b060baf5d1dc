//! Common test utilities for artifact-dl integration tests

use artifact_dl::{AuthToken, BatchDownloader, Config, DownloadConfig, RetryConfig};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// The token every integration test authenticates with
#[allow(dead_code)]
pub const TEST_TOKEN: &str = "T";

/// Write a manifest file into the test directory
#[allow(dead_code)]
pub fn write_manifest(dir: &Path, content: &str) -> PathBuf {
    let path = dir.join("urls.txt");
    std::fs::write(&path, content).expect("failed to write test manifest");
    path
}

/// Engine configuration with millisecond backoff so retry tests stay fast
#[allow(dead_code)]
pub fn fast_config(base: &Path, max_threads: usize, retries: u32) -> Config {
    Config {
        download: DownloadConfig {
            base_dir: base.to_path_buf(),
            max_concurrent_downloads: max_threads,
        },
        retry: RetryConfig {
            max_attempts: retries,
            initial_delay: Duration::from_millis(1),
            max_delay: Duration::from_millis(20),
            backoff_multiplier: 2.0,
            jitter: false,
        },
        ..Config::default()
    }
}

/// A ready-to-run engine rooted at `base`, authenticating with [`TEST_TOKEN`]
#[allow(dead_code)]
pub fn engine(base: &Path, max_threads: usize, retries: u32) -> BatchDownloader {
    let token = AuthToken::new(TEST_TOKEN).expect("test token is valid");
    BatchDownloader::new(fast_config(base, max_threads, retries), token)
        .expect("engine construction succeeds")
}
