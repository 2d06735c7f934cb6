use ferrous_sieve_application::use_cases::RefreshFiltersUseCase;
use ferrous_sieve_domain::DomainError;
use ferrous_sieve_jobs::{FilterRefreshJob, JobRunner};
use std::sync::Arc;
use tokio::time::{sleep, Duration};
use tokio_util::sync::CancellationToken;

mod helpers;
use helpers::MockFilterEngine;

fn make_job(engine: Arc<MockFilterEngine>, interval: Duration) -> FilterRefreshJob {
    let refresh = Arc::new(RefreshFiltersUseCase::new(engine));
    FilterRefreshJob::new(refresh).with_interval(interval)
}

#[tokio::test]
async fn test_filter_refresh_job_skips_startup_tick() {
    let engine = Arc::new(MockFilterEngine::new());
    let job = Arc::new(make_job(engine.clone(), Duration::from_secs(3600)));

    job.start().await;
    sleep(Duration::from_millis(50)).await;

    assert_eq!(engine.refresh_calls(), 0);
}

#[tokio::test]
async fn test_filter_refresh_job_fires_on_interval() {
    let engine = Arc::new(MockFilterEngine::new());
    let job = Arc::new(make_job(engine.clone(), Duration::from_millis(100)));

    job.start().await;
    sleep(Duration::from_millis(350)).await;

    assert!(
        engine.refresh_calls() >= 2,
        "Refresh should have fired at least twice"
    );
}

#[tokio::test]
async fn test_filter_refresh_job_keeps_running_after_failure() {
    let engine = Arc::new(MockFilterEngine::failing(DomainError::RefreshFailed {
        failed: vec!["Broken".to_string()],
    }));
    let job = Arc::new(make_job(engine.clone(), Duration::from_millis(100)));

    job.start().await;
    sleep(Duration::from_millis(350)).await;

    assert!(engine.refresh_calls() >= 2);
}

#[tokio::test]
async fn test_filter_refresh_job_stops_on_cancellation() {
    let engine = Arc::new(MockFilterEngine::new());
    let token = CancellationToken::new();
    let job = Arc::new(
        make_job(engine.clone(), Duration::from_millis(50)).with_cancellation(token.clone()),
    );

    job.start().await;
    sleep(Duration::from_millis(130)).await;
    token.cancel();
    sleep(Duration::from_millis(20)).await;

    let calls = engine.refresh_calls();
    sleep(Duration::from_millis(200)).await;
    assert_eq!(engine.refresh_calls(), calls);
}

#[tokio::test]
async fn test_filter_refresh_job_zero_interval_is_disabled() {
    let engine = Arc::new(MockFilterEngine::new());
    let job = Arc::new(make_job(engine.clone(), Duration::ZERO));

    job.start().await;
    sleep(Duration::from_millis(50)).await;

    assert_eq!(engine.refresh_calls(), 0);
}

#[tokio::test]
async fn test_job_runner_empty_starts_cleanly() {
    JobRunner::new().start().await;
}

#[tokio::test]
async fn test_job_runner_propagates_shutdown_token() {
    let engine = Arc::new(MockFilterEngine::new());
    let token = CancellationToken::new();

    JobRunner::new()
        .with_filter_refresh(make_job(engine.clone(), Duration::from_millis(50)))
        .with_shutdown_token(token.clone())
        .start()
        .await;

    sleep(Duration::from_millis(130)).await;
    assert!(engine.refresh_calls() >= 1);

    token.cancel();
    sleep(Duration::from_millis(20)).await;
    let calls = engine.refresh_calls();
    sleep(Duration::from_millis(200)).await;
    assert_eq!(engine.refresh_calls(), calls);
}
