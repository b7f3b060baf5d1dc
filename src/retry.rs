//! Retry logic with exponential backoff
//!
//! Wraps a fallible async operation and re-invokes it on transient failure,
//! up to a configured attempt budget. Delays grow exponentially (with
//! optional jitter to avoid thundering herd) and are capped at a maximum.
//! Non-retryable failures short-circuit immediately: retrying a rejected
//! token or a missing artifact wastes quota and cannot change the outcome.
//!
//! Per task the state machine is `Pending → Attempting → {Succeeded | Failed}`
//! with a self-loop on `Attempting` while retryable failures remain inside
//! the budget.

use crate::config::RetryConfig;
use crate::error::FetchError;
use rand::Rng;
use std::future::Future;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Trait for errors that can be classified as retryable or not
///
/// Transient failures (network timeouts, server busy, connection reset)
/// should return `true`. Permanent failures (authentication rejected,
/// missing artifact, disk full) should return `false`.
pub trait IsRetryable {
    /// Returns true if the error is transient and the operation should be retried
    fn is_retryable(&self) -> bool;
}

impl IsRetryable for FetchError {
    fn is_retryable(&self) -> bool {
        match self {
            // A bad token stays bad; a missing artifact stays missing
            FetchError::Auth { .. } | FetchError::NotFound => false,
            // Unexpected redirects/4xx are treated as permanent
            FetchError::Status { .. } => false,
            // Server-side failures and throttling tend to clear up
            FetchError::Server { .. } => true,
            // Transport-level problems are the classic transient case
            FetchError::Timeout(_) | FetchError::Connect(_) | FetchError::Stream(_) => true,
            // Disk errors are retryable only for transient kinds
            FetchError::Disk { kind, .. } => matches!(
                kind,
                std::io::ErrorKind::TimedOut
                    | std::io::ErrorKind::Interrupted
                    | std::io::ErrorKind::WouldBlock
                    | std::io::ErrorKind::ResourceBusy
            ),
        }
    }
}

/// Execute an async operation with exponential backoff retry logic
///
/// # Arguments
///
/// * `config` - Retry configuration (attempt budget, delays, multiplier, jitter)
/// * `cancel` - Cancellation token checked between attempts; a cancelled token
///   stops further retries and yields the most recent error
/// * `operation` - Async closure returning `Result<T, E>` where `E: IsRetryable`
///
/// # Returns
///
/// The successful result, or the last error once the budget is exhausted or a
/// non-retryable error occurs. An operation that always fails retryably is
/// invoked exactly `config.max_attempts + 1` times.
pub async fn fetch_with_retry<F, Fut, T, E>(
    config: &RetryConfig,
    cancel: &CancellationToken,
    mut operation: F,
) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: IsRetryable + std::fmt::Display,
{
    let mut attempt = 0;
    let mut delay = config.initial_delay;

    loop {
        match operation().await {
            Ok(result) => {
                if attempt > 0 {
                    tracing::info!(attempts = attempt + 1, "transfer succeeded after retry");
                }
                return Ok(result);
            }
            Err(e) if e.is_retryable() && attempt < config.max_attempts && !cancel.is_cancelled() => {
                attempt += 1;

                tracing::warn!(
                    error = %e,
                    attempt = attempt,
                    max_attempts = config.max_attempts,
                    delay_ms = delay.as_millis() as u64,
                    "transfer failed, retrying"
                );

                let jittered_delay = if config.jitter {
                    add_jitter(delay)
                } else {
                    delay
                };

                // Wait before retrying, bailing out early on cancellation
                tokio::select! {
                    _ = tokio::time::sleep(jittered_delay) => {}
                    _ = cancel.cancelled() => {
                        tracing::info!("retry wait interrupted by cancellation");
                        return Err(e);
                    }
                }

                let next_delay =
                    Duration::from_secs_f64(delay.as_secs_f64() * config.backoff_multiplier);
                delay = next_delay.min(config.max_delay);
            }
            Err(e) => {
                if e.is_retryable() {
                    tracing::error!(
                        error = %e,
                        attempts = attempt + 1,
                        "transfer failed after all retry attempts exhausted"
                    );
                } else {
                    tracing::error!(error = %e, "transfer failed with non-retryable error");
                }
                return Err(e);
            }
        }
    }
}

/// Add random jitter to a delay to prevent thundering herd
///
/// Jitter is uniformly distributed between 0% and 100% of the delay, so the
/// actual delay lands between `delay` and `2 * delay`.
fn add_jitter(delay: Duration) -> Duration {
    let mut rng = rand::thread_rng();
    let jitter_factor: f64 = rng.gen_range(0.0..=1.0);
    let jittered_secs = delay.as_secs_f64() * (1.0 + jitter_factor);
    Duration::from_secs_f64(jittered_secs)
}
