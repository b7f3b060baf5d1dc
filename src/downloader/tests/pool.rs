//! Worker pool tests: completeness, containment, cancellation, events

use super::{FetchScript, ScriptedFetcher, make_task, test_config};
use crate::downloader::BatchDownloader;
use crate::error::Error;
use crate::types::{Event, OutcomeStatus, TaskId};
use std::collections::HashSet;
use std::sync::Arc;

#[tokio::test]
async fn summary_is_complete_for_every_worker_count() {
    // One worker, exactly as many workers as tasks, and more workers than
    // tasks must all produce exactly one outcome per task
    for workers in [1, 7, 20] {
        let dir = tempfile::tempdir().unwrap();
        let tasks: Vec<_> = (1..=7)
            .map(|i| make_task(i, &format!("m{i}.safetensors"), dir.path()))
            .collect();

        let fetcher = Arc::new(ScriptedFetcher::new(FetchScript::Succeed));
        let downloader =
            BatchDownloader::with_fetcher(test_config(workers, 0), fetcher.clone()).unwrap();

        let summary = downloader.run_tasks(tasks).await.unwrap();

        assert_eq!(summary.outcomes.len(), 7, "workers={workers}");
        let ids: HashSet<TaskId> = summary.outcomes.iter().map(|o| o.task.id).collect();
        assert_eq!(ids.len(), 7, "no task id may appear twice (workers={workers})");
        assert_eq!(summary.succeeded(), 7);
        assert_eq!(fetcher.calls(), 7, "one fetch per task (workers={workers})");
    }
}

#[tokio::test]
async fn status_counts_partition_the_batch() {
    let dir = tempfile::tempdir().unwrap();
    let tasks: Vec<_> = (1..=5)
        .map(|i| make_task(i, &format!("m{i}.safetensors"), dir.path()))
        .collect();

    // Pre-create one destination so it gets skipped
    std::fs::create_dir_all(dir.path().join("loras")).unwrap();
    std::fs::write(dir.path().join("loras/m3.safetensors"), b"existing").unwrap();

    let fetcher = Arc::new(ScriptedFetcher::new(FetchScript::Succeed));
    let downloader = BatchDownloader::with_fetcher(test_config(3, 0), fetcher).unwrap();

    let summary = downloader.run_tasks(tasks).await.unwrap();
    assert_eq!(
        summary.succeeded() + summary.skipped() + summary.failed(),
        5
    );
    assert_eq!(summary.skipped(), 1);
    assert_eq!(summary.succeeded(), 4);
}

#[tokio::test]
async fn existing_file_short_circuits_without_fetching() {
    let dir = tempfile::tempdir().unwrap();
    let task = make_task(1, "present.safetensors", dir.path());
    std::fs::create_dir_all(dir.path().join("loras")).unwrap();
    std::fs::write(&task.destination, b"already here").unwrap();

    let fetcher = Arc::new(ScriptedFetcher::new(FetchScript::Succeed));
    let downloader = BatchDownloader::with_fetcher(test_config(2, 3), fetcher.clone()).unwrap();

    let summary = downloader.run_tasks(vec![task]).await.unwrap();

    assert_eq!(summary.outcomes[0].status, OutcomeStatus::Skipped);
    assert_eq!(summary.outcomes[0].attempts, 0);
    assert_eq!(fetcher.calls(), 0, "fetcher must never be invoked");
}

#[tokio::test]
async fn rerunning_a_finished_batch_skips_everything() {
    let dir = tempfile::tempdir().unwrap();
    let tasks: Vec<_> = (1..=4)
        .map(|i| make_task(i, &format!("m{i}.safetensors"), dir.path()))
        .collect();

    let fetcher = Arc::new(ScriptedFetcher::new(FetchScript::Succeed));
    let downloader = BatchDownloader::with_fetcher(test_config(2, 0), fetcher.clone()).unwrap();

    let first = downloader.run_tasks(tasks.clone()).await.unwrap();
    assert_eq!(first.succeeded(), 4);
    assert_eq!(fetcher.calls(), 4);

    let second = downloader.run_tasks(tasks).await.unwrap();
    assert_eq!(second.skipped(), 4);
    assert_eq!(
        fetcher.calls(),
        4,
        "second run must make zero fetch calls"
    );
}

#[tokio::test]
async fn a_panicking_task_does_not_take_down_the_pool() {
    let dir = tempfile::tempdir().unwrap();
    let tasks: Vec<_> = (1..=4)
        .map(|i| make_task(i, &format!("m{i}.safetensors"), dir.path()))
        .collect();

    let fetcher = Arc::new(ScriptedFetcher::new(FetchScript::PanicOn("m2.safetensors")));
    let downloader = BatchDownloader::with_fetcher(test_config(2, 0), fetcher).unwrap();

    let summary = downloader.run_tasks(tasks).await.unwrap();

    assert_eq!(summary.outcomes.len(), 4, "panic must not lose outcomes");
    assert_eq!(summary.succeeded(), 3);
    assert_eq!(summary.failed(), 1);

    let failed = summary
        .outcomes
        .iter()
        .find(|o| o.status == OutcomeStatus::Failed)
        .unwrap();
    assert_eq!(failed.task.name, "m2.safetensors");
    assert!(
        failed.error.as_deref().unwrap_or("").contains("internal error"),
        "panic should surface as an internal error: {:?}",
        failed.error
    );
}

#[tokio::test]
async fn a_transient_failure_on_one_task_leaves_the_rest_untouched() {
    let dir = tempfile::tempdir().unwrap();
    let tasks: Vec<_> = (1..=4)
        .map(|i| make_task(i, &format!("ok{i}.safetensors"), dir.path()))
        .collect();

    // Single worker, first call fails transiently: the first task retries
    // into success, every later task succeeds on its first attempt
    let fetcher = Arc::new(ScriptedFetcher::new(FetchScript::FailThenSucceed(1)));
    let downloader = BatchDownloader::with_fetcher(test_config(1, 2), fetcher.clone()).unwrap();

    let summary = downloader.run_tasks(tasks).await.unwrap();
    assert_eq!(summary.failed(), 0);
    assert_eq!(summary.succeeded(), 4);
    assert_eq!(fetcher.calls(), 5, "4 tasks + 1 retry");
}

#[tokio::test]
async fn empty_task_list_is_refused() {
    let fetcher = Arc::new(ScriptedFetcher::new(FetchScript::Succeed));
    let downloader = BatchDownloader::with_fetcher(test_config(2, 0), fetcher).unwrap();

    let err = downloader.run_tasks(Vec::new()).await.unwrap_err();
    assert!(matches!(err, Error::EmptyBatch));
}

#[tokio::test]
async fn cancelled_engine_still_produces_a_complete_summary() {
    let dir = tempfile::tempdir().unwrap();
    let tasks: Vec<_> = (1..=5)
        .map(|i| make_task(i, &format!("m{i}.safetensors"), dir.path()))
        .collect();

    let fetcher = Arc::new(ScriptedFetcher::new(FetchScript::Succeed));
    let downloader = BatchDownloader::with_fetcher(test_config(2, 0), fetcher.clone()).unwrap();

    downloader.cancel();
    let summary = downloader.run_tasks(tasks).await.unwrap();

    assert_eq!(summary.outcomes.len(), 5);
    assert_eq!(summary.failed(), 5);
    assert_eq!(fetcher.calls(), 0, "no transfers after cancellation");
    assert!(
        summary.outcomes[0]
            .error
            .as_deref()
            .unwrap_or("")
            .contains("cancelled")
    );
}

#[tokio::test]
async fn events_trace_the_task_lifecycle() {
    let dir = tempfile::tempdir().unwrap();
    let task = make_task(1, "traced.safetensors", dir.path());

    let fetcher = Arc::new(ScriptedFetcher::new(FetchScript::Succeed));
    let downloader = BatchDownloader::with_fetcher(test_config(1, 0), fetcher).unwrap();

    let mut events = downloader.subscribe();
    let summary = downloader.run_tasks(vec![task]).await.unwrap();
    assert_eq!(summary.succeeded(), 1);

    let mut kinds = Vec::new();
    while let Ok(event) = events.try_recv() {
        kinds.push(match event {
            Event::Queued { .. } => "queued",
            Event::Skipped { .. } => "skipped",
            Event::Started { .. } => "started",
            Event::Progress { .. } => "progress",
            Event::Succeeded { .. } => "succeeded",
            Event::Failed { .. } => "failed",
        });
    }
    assert_eq!(kinds, vec!["queued", "started", "succeeded"]);
}
