//! The per-worker request loop
//!
//! Each worker walks its own [`WorkBlock`] of the shared target sequence:
//!
//! 1. Pick the URL at the current index, deliberately breaking it when the
//!    synthetic 404 chance triggers
//! 2. Request it through the [`Fetcher`], racing the cancellation token
//! 3. Record the outcome in the worker's own [`ThreadMetrics`]
//! 4. Stop, or advance to the next index and optionally pause
//!
//! Cancellation never discards work: a cancelled worker returns whatever it
//! has accumulated.

use crate::config::{parse_method, ArchiveConfig, LoadConfig};
use crate::crawler::archiver::PageArchiver;
use crate::crawler::fetcher::{FetchError, FetchResponse, Fetcher};
use crate::crawler::metrics::ThreadMetrics;
use crate::crawler::partition::WorkBlock;
use crate::ConfigError;
use rand::Rng;
use reqwest::Method;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;

/// Pause between requests when the delay is enabled
pub const REQUEST_DELAY: Duration = Duration::from_millis(500);

/// When a worker stops issuing requests
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopPolicy {
    /// Request every URL of the worker's block exactly once
    AllUrlsOnce,
    /// Keep cycling through the targets until this long after job start
    RunFor(Duration),
}

impl StopPolicy {
    /// Zero seconds means every URL once
    pub fn from_seconds(seconds: u64) -> Self {
        if seconds == 0 {
            StopPolicy::AllUrlsOnce
        } else {
            StopPolicy::RunFor(Duration::from_secs(seconds))
        }
    }
}

/// Settings shared read-only by every worker of a job
#[derive(Debug, Clone)]
pub struct WorkerSettings {
    pub stop_policy: StopPolicy,
    /// Percent chance (0-100) of deliberately requesting a missing page
    pub chance_of_404: u8,
    pub delay: Option<Duration>,
    pub method: Method,
    /// Log every request outcome
    pub verbose: bool,
    /// Log 404s that were not deliberate
    pub log_misses: bool,
}

impl Default for WorkerSettings {
    fn default() -> Self {
        Self {
            stop_policy: StopPolicy::AllUrlsOnce,
            chance_of_404: 0,
            delay: None,
            method: Method::GET,
            verbose: false,
            log_misses: true,
        }
    }
}

impl WorkerSettings {
    pub fn for_load(config: &LoadConfig) -> Result<Self, ConfigError> {
        Ok(Self {
            stop_policy: StopPolicy::from_seconds(config.seconds),
            chance_of_404: config.chance_of_404.min(100),
            delay: config.delay.then_some(REQUEST_DELAY),
            method: parse_method(&config.method)?,
            verbose: config.verbose,
            log_misses: config.log_misses,
        })
    }

    /// Archive passes GET every URL once, without synthetic misses
    pub fn for_archive(config: &ArchiveConfig) -> Self {
        Self {
            delay: config.delay.then_some(REQUEST_DELAY),
            verbose: config.verbose,
            ..Default::default()
        }
    }
}

/// What a worker does with each response
#[derive(Clone)]
pub enum WorkMode {
    /// Count requests and misses only
    Load,
    /// Archive every page
    Archive(Arc<PageArchiver>),
}

/// One worker of a pass
pub struct RequestExecutor {
    pub worker_index: usize,
    pub block: Option<WorkBlock>,
    pub targets: Arc<[String]>,
    pub fetcher: Arc<dyn Fetcher>,
    pub settings: Arc<WorkerSettings>,
    pub mode: WorkMode,
    pub cancel: CancellationToken,
    pub job_started: Instant,
}

impl RequestExecutor {
    /// Runs the worker to completion or cancellation
    pub async fn run(self) -> ThreadMetrics {
        let mut metrics = ThreadMetrics::new(self.worker_index);

        let block = match self.block {
            Some(block) if block.last < self.targets.len() => block,
            _ => {
                tracing::debug!("Worker {} has no URLs assigned", self.worker_index);
                return metrics;
            }
        };

        tracing::debug!(
            "Worker {} starting at {} (block {}..={})",
            self.worker_index,
            block.first,
            block.first,
            block.last
        );

        let mut index = block.first;

        loop {
            if self.cancel.is_cancelled() {
                break;
            }

            let target = &self.targets[index];

            let completed = match &self.mode {
                WorkMode::Load => self.load_request(target, &mut metrics).await,
                WorkMode::Archive(archiver) => {
                    self.archive_request(archiver, target, &mut metrics).await
                }
            };

            if !completed || self.should_stop(index, block) {
                break;
            }

            index = self.next_index(index);

            if let Some(delay) = self.settings.delay {
                tokio::select! {
                    biased;
                    _ = self.cancel.cancelled() => break,
                    _ = tokio::time::sleep(delay) => {}
                }
            }
        }

        tracing::debug!(
            "Worker {} ending after {} requests",
            self.worker_index,
            metrics.request_count
        );

        metrics
    }

    /// Issues one load-test request; false when cancelled mid-request
    async fn load_request(&self, target: &str, metrics: &mut ThreadMetrics) -> bool {
        let forced_miss = should_force_miss(self.settings.chance_of_404);
        let uri = if forced_miss {
            with_miss_suffix(target)
        } else {
            target.to_string()
        };

        let Some(outcome) = self.fetch(&uri).await else {
            return false;
        };

        metrics.request_count += 1;

        match outcome {
            Ok(response) => {
                let unintended_miss = response.is_not_found() && !forced_miss;
                let failed = response.is_error && !response.is_not_found() && !forced_miss;

                if unintended_miss {
                    metrics.unintended_miss_count += 1;
                }
                if failed {
                    metrics.error_count += 1;
                }

                if failed || (unintended_miss && self.settings.log_misses) {
                    tracing::warn!("{} {}", response.status_code, uri);
                } else if self.settings.verbose {
                    tracing::info!("{} {}", response.status_code, uri);
                }
            }
            Err(e) => {
                metrics.error_count += 1;
                tracing::warn!("{}", e);
            }
        }

        true
    }

    async fn archive_request(
        &self,
        archiver: &PageArchiver,
        target: &str,
        metrics: &mut ThreadMetrics,
    ) -> bool {
        let Some(outcome) = self.fetch(target).await else {
            return false;
        };

        metrics.request_count += 1;
        if outcome.is_err() {
            metrics.error_count += 1;
        }

        let page = archiver.process(target, outcome).await;
        if page.status_code == Some(404) {
            metrics.unintended_miss_count += 1;
        }
        metrics.pages.push(page);

        true
    }

    /// Fetches `uri`, or returns `None` if the job is cancelled first
    async fn fetch(&self, uri: &str) -> Option<Result<FetchResponse, FetchError>> {
        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => None,
            outcome = self.fetcher.fetch(uri, &self.settings.method) => Some(outcome),
        }
    }

    fn should_stop(&self, index: usize, block: WorkBlock) -> bool {
        match self.settings.stop_policy {
            StopPolicy::AllUrlsOnce => index >= block.last,
            StopPolicy::RunFor(duration) => self.job_started.elapsed() >= duration,
        }
    }

    /// All-once workers never leave their block; timed workers wrap around
    /// the whole sequence
    fn next_index(&self, index: usize) -> usize {
        match self.settings.stop_policy {
            StopPolicy::AllUrlsOnce => index + 1,
            StopPolicy::RunFor(_) => (index + 1) % self.targets.len(),
        }
    }
}

/// Decides whether this request is a deliberate miss
pub fn should_force_miss(chance_of_404: u8) -> bool {
    chance_of_404 >= 100
        || (chance_of_404 > 0 && rand::thread_rng().gen_range(0..100u8) < chance_of_404)
}

/// Appends a random unique suffix so the URL cannot exist
pub fn with_miss_suffix(url: &str) -> String {
    format!("{}{}", url, uuid::Uuid::new_v4())
}
