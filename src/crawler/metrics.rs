//! Per-worker and job-level metrics
//!
//! Workers own their [`ThreadMetrics`] exclusively and hand them back when
//! they finish. Totals are only computed after every worker of a pass has been
//! joined, so nothing here needs atomics or locks.

use crate::crawler::archiver::PageResult;
use std::time::{Duration, Instant};

/// Counters accumulated by a single worker
#[derive(Debug, Clone, Default)]
pub struct ThreadMetrics {
    pub worker_index: usize,
    /// Requests that produced a response or a transport failure
    pub request_count: u64,
    /// 404 responses for URLs that were not deliberately broken
    pub unintended_miss_count: u64,
    /// Transport failures and non-2xx responses other than 404
    pub error_count: u64,
    /// One entry per page visited in archive mode
    pub pages: Vec<PageResult>,
}

impl ThreadMetrics {
    pub fn new(worker_index: usize) -> Self {
        Self {
            worker_index,
            ..Default::default()
        }
    }
}

/// Combined totals for a whole job
#[derive(Debug, Clone, Default)]
pub struct JobMetrics {
    pub worker_count: usize,
    pub request_count: u64,
    pub unintended_miss_count: u64,
    pub error_count: u64,
    pub elapsed: Duration,
    /// True when the job ended because of cancellation
    pub cancelled: bool,
    pub pages: Vec<PageResult>,
}

impl JobMetrics {
    /// Sums worker metrics
    ///
    /// Counters are combined by addition only, so the order in which workers
    /// finished has no effect on the totals. Page results keep input order.
    pub fn combine<I>(metrics: I, elapsed: Duration, cancelled: bool) -> Self
    where
        I: IntoIterator<Item = ThreadMetrics>,
    {
        metrics.into_iter().fold(
            JobMetrics {
                elapsed,
                cancelled,
                ..Default::default()
            },
            |mut job, worker| {
                job.worker_count += 1;
                job.request_count += worker.request_count;
                job.unintended_miss_count += worker.unintended_miss_count;
                job.error_count += worker.error_count;
                job.pages.extend(worker.pages);
                job
            },
        )
    }

    /// Requests per second, treating anything under a second as one second
    pub fn requests_per_second(&self) -> f64 {
        let seconds = self.elapsed.as_secs_f64().max(1.0);
        self.request_count as f64 / seconds
    }

    pub fn unintended_miss_percent(&self) -> f64 {
        percent(self.unintended_miss_count, self.request_count)
    }

    pub fn error_percent(&self) -> f64 {
        percent(self.error_count, self.request_count)
    }

    pub fn retrieve_error_count(&self) -> u64 {
        self.pages.iter().filter(|p| p.is_retrieve_error).count() as u64
    }

    pub fn scan_error_count(&self) -> u64 {
        self.pages.iter().filter(|p| p.is_scan_error).count() as u64
    }

    /// Pages with an HTTP error status that were otherwise handled
    pub fn other_error_count(&self) -> u64 {
        self.pages
            .iter()
            .filter(|p| p.is_error && !p.is_retrieve_error && !p.is_scan_error)
            .count() as u64
    }

    /// Percentage of `count` over the pages visited
    pub fn page_percent(&self, count: u64) -> f64 {
        percent(count, self.pages.len() as u64)
    }
}

/// Measures a job from start to finish and combines its worker metrics
#[derive(Debug, Clone, Copy)]
pub struct MetricsAggregator {
    started: Instant,
}

impl MetricsAggregator {
    /// Starts the job clock
    pub fn start() -> Self {
        Self {
            started: Instant::now(),
        }
    }

    /// When the job started; timed workers measure their run time from here
    pub fn started_at(&self) -> Instant {
        self.started
    }

    pub fn finish<I>(&self, metrics: I, cancelled: bool) -> JobMetrics
    where
        I: IntoIterator<Item = ThreadMetrics>,
    {
        JobMetrics::combine(metrics, self.started.elapsed(), cancelled)
    }
}

fn percent(part: u64, whole: u64) -> f64 {
    if whole == 0 {
        return 0.0;
    }
    part as f64 / whole as f64 * 100.0
}
