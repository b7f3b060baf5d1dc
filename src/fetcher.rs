//! HTTP artifact fetching -- authenticated streaming GET with atomic writes
//!
//! One fetch is one GET request: the body streams into a `.part` file next to
//! the destination and is renamed into place only after a full, flushed,
//! synced write. A partially-transferred artifact is therefore never visible
//! at the destination path -- interrupted transfers leave at most a `.part`
//! file, which is removed on the way out.

use crate::auth::AuthToken;
use crate::config::HttpConfig;
use crate::error::{Error, FetchError, FetchResult, Result};
use crate::types::{DownloadTask, Event};
use async_trait::async_trait;
use futures::StreamExt;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tokio::io::AsyncWriteExt;
use tokio::sync::broadcast;

/// Minimum interval between progress events for a single transfer
const PROGRESS_INTERVAL: Duration = Duration::from_millis(250);

/// Abstraction over artifact transfer, enabling testability
///
/// The worker pool only ever sees this trait; tests substitute scripted
/// implementations to exercise retry and outcome behavior without a network.
#[async_trait]
pub trait ArtifactFetcher: Send + Sync {
    /// Transfer one artifact to `task.destination`, returning the byte count
    ///
    /// Implementations must guarantee the destination only appears once the
    /// transfer is complete.
    async fn fetch(
        &self,
        task: &DownloadTask,
        events: &broadcast::Sender<Event>,
    ) -> FetchResult<u64>;
}

/// Production fetcher speaking HTTP with bearer-token authentication
pub struct HttpFetcher {
    client: reqwest::Client,
    token: AuthToken,
}

impl HttpFetcher {
    /// Build a fetcher with one shared connection pool
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if the underlying HTTP client cannot be
    /// constructed from the given settings.
    pub fn new(config: &HttpConfig, token: AuthToken) -> Result<Self> {
        let mut builder = reqwest::Client::builder()
            .connect_timeout(config.connect_timeout)
            .user_agent(&config.user_agent);
        if let Some(timeout) = config.request_timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder.build().map_err(|e| Error::Config {
            message: format!("failed to create HTTP client: {e}"),
            key: None,
        })?;

        Ok(Self { client, token })
    }

    async fn stream_body(
        &self,
        response: reqwest::Response,
        task: &DownloadTask,
        part: &Path,
        total: Option<u64>,
        events: &broadcast::Sender<Event>,
    ) -> FetchResult<u64> {
        let mut file = tokio::fs::File::create(part)
            .await
            .map_err(|e| FetchError::disk(part, &e))?;

        let mut stream = response.bytes_stream();
        let mut downloaded: u64 = 0;
        let mut last_emit = Instant::now();

        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(FetchError::from_transport)?;
            file.write_all(&chunk)
                .await
                .map_err(|e| FetchError::disk(part, &e))?;
            downloaded += chunk.len() as u64;

            if last_emit.elapsed() >= PROGRESS_INTERVAL {
                events
                    .send(Event::Progress {
                        id: task.id,
                        downloaded,
                        total,
                    })
                    .ok();
                last_emit = Instant::now();
            }
        }

        // A body shorter than the advertised length is a truncated transfer,
        // even though the stream ended without a transport error
        if let Some(expected) = total
            && downloaded < expected
        {
            return Err(FetchError::Stream(format!(
                "body truncated at {downloaded} of {expected} bytes"
            )));
        }

        file.flush().await.map_err(|e| FetchError::disk(part, &e))?;
        file.sync_all()
            .await
            .map_err(|e| FetchError::disk(part, &e))?;

        Ok(downloaded)
    }
}

#[async_trait]
impl ArtifactFetcher for HttpFetcher {
    async fn fetch(
        &self,
        task: &DownloadTask,
        events: &broadcast::Sender<Event>,
    ) -> FetchResult<u64> {
        tracing::debug!(task_id = %task.id, url = %task.url, "requesting artifact");

        let response = self
            .client
            .get(&task.url)
            .bearer_auth(self.token.reveal())
            .send()
            .await
            .map_err(FetchError::from_transport)?;

        check_status(response.status())?;
        let total = response.content_length();

        if let Some(parent) = task.destination.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| FetchError::disk(parent, &e))?;
        }

        let part = part_path(&task.destination);
        match self.stream_body(response, task, &part, total, events).await {
            Ok(bytes) => {
                if let Err(e) = tokio::fs::rename(&part, &task.destination).await {
                    let err = FetchError::disk(&task.destination, &e);
                    remove_part(&part).await;
                    return Err(err);
                }
                tracing::debug!(
                    task_id = %task.id,
                    bytes = bytes,
                    destination = %task.destination.display(),
                    "artifact written"
                );
                Ok(bytes)
            }
            Err(e) => {
                remove_part(&part).await;
                Err(e)
            }
        }
    }
}

/// Map a response status to success or the matching [`FetchError`]
fn check_status(status: reqwest::StatusCode) -> FetchResult<()> {
    if status.is_success() {
        return Ok(());
    }
    match status.as_u16() {
        401 | 403 => Err(FetchError::Auth {
            status: status.as_u16(),
        }),
        404 => Err(FetchError::NotFound),
        408 | 429 => Err(FetchError::Server {
            status: status.as_u16(),
        }),
        code if status.is_server_error() => Err(FetchError::Server { status: code }),
        code => Err(FetchError::Status { status: code }),
    }
}

/// Temp-file path for a destination: the full filename plus a `.part` suffix
///
/// Appending (rather than replacing the extension) keeps `a.pt` and
/// `a.safetensors` from colliding on one temp name.
fn part_path(destination: &Path) -> PathBuf {
    let mut path = destination.as_os_str().to_os_string();
    path.push(".part");
    PathBuf::from(path)
}

/// Best-effort cleanup of a temp file after a failed transfer
async fn remove_part(part: &Path) {
    if let Err(e) = tokio::fs::remove_file(part).await
        && e.kind() != std::io::ErrorKind::NotFound
    {
        tracing::warn!(path = %part.display(), error = %e, "failed to remove partial file");
    }
}
