//! Pass dispatch and the load-test job
//!
//! A pass spawns one task per worker over an immutable target sequence and
//! joins all of them before returning. Nothing is shared between workers
//! except the targets and the cancellation token.

use crate::config::{validate_load_config, LoadConfig};
use crate::crawler::executor::{RequestExecutor, WorkMode, WorkerSettings};
use crate::crawler::fetcher::Fetcher;
use crate::crawler::metrics::{JobMetrics, MetricsAggregator, ThreadMetrics};
use crate::crawler::partition::block_range;
use crate::{ConfigError, SurgeError};
use std::sync::Arc;
use std::time::Instant;
use tokio_util::sync::CancellationToken;

/// Everything a pass needs besides its targets
#[derive(Clone)]
pub struct Dispatch {
    pub thread_count: usize,
    pub fetcher: Arc<dyn Fetcher>,
    pub settings: Arc<WorkerSettings>,
    pub mode: WorkMode,
    pub cancel: CancellationToken,
    /// Timed workers measure their run time from here
    pub job_started: Instant,
}

/// Runs one pass of workers over `targets` and waits for all of them
///
/// Metrics come back in worker order. A worker task that panics is logged
/// and contributes nothing.
pub async fn run_pass(dispatch: &Dispatch, targets: Arc<[String]>) -> Vec<ThreadMetrics> {
    let handles: Vec<_> = (0..dispatch.thread_count)
        .map(|worker_index| {
            let executor = RequestExecutor {
                worker_index,
                block: block_range(worker_index, dispatch.thread_count, targets.len()),
                targets: Arc::clone(&targets),
                fetcher: Arc::clone(&dispatch.fetcher),
                settings: Arc::clone(&dispatch.settings),
                mode: dispatch.mode.clone(),
                cancel: dispatch.cancel.clone(),
                job_started: dispatch.job_started,
            };
            tokio::spawn(executor.run())
        })
        .collect();

    let mut metrics = Vec::with_capacity(handles.len());
    for (worker_index, handle) in handles.into_iter().enumerate() {
        match handle.await {
            Ok(worker_metrics) => metrics.push(worker_metrics),
            Err(e) => tracing::error!("Worker {} failed: {}", worker_index, e),
        }
    }

    metrics
}

/// Runs a load test over an already resolved target set
///
/// An empty target set or an invalid configuration fails before any worker
/// starts. Cancellation is not an error: the partial metrics are returned
/// with [`JobMetrics::cancelled`] set.
///
/// # Example
///
/// ```no_run
/// use sitesurge::config::{HttpConfig, LoadConfig};
/// use sitesurge::crawler::{run_load_test, HttpFetcher};
/// use std::sync::Arc;
/// use tokio_util::sync::CancellationToken;
///
/// # async fn example() -> sitesurge::Result<()> {
/// let fetcher = Arc::new(HttpFetcher::from_config(&HttpConfig::default())?);
/// let targets = vec!["https://example.com/".to_string()];
/// let metrics = run_load_test(&LoadConfig::default(), targets, fetcher, CancellationToken::new()).await?;
/// println!("{} requests", metrics.request_count);
/// # Ok(())
/// # }
/// ```
pub async fn run_load_test(
    config: &LoadConfig,
    targets: Vec<String>,
    fetcher: Arc<dyn Fetcher>,
    cancel: CancellationToken,
) -> Result<JobMetrics, SurgeError> {
    validate_load_config(config)?;

    if targets.is_empty() {
        return Err(ConfigError::NoUrls("the load test target set".to_string()).into());
    }

    let settings = WorkerSettings::for_load(config)?;
    tracing::info!(
        "Running load test with {} workers over {} URLs",
        config.threads,
        targets.len()
    );

    let aggregator = MetricsAggregator::start();
    let dispatch = Dispatch {
        thread_count: config.threads,
        fetcher,
        settings: Arc::new(settings),
        mode: WorkMode::Load,
        cancel: cancel.clone(),
        job_started: aggregator.started_at(),
    };

    let metrics = run_pass(&dispatch, targets.into()).await;

    Ok(aggregator.finish(metrics, cancel.is_cancelled()))
}
