//! Multi-pass archive orchestration
//!
//! Each pass dispatches workers over the current frontier, waits for all of
//! them, then builds the next frontier from the links they discovered:
//!
//! ```text
//! Pass(n) -> dispatch -> collect pages -> extract links
//!         -> drop visited and excluded -> Pass(n + 1) or done
//! ```
//!
//! The visited set only grows and is touched between passes only, so every
//! normalized URL is requested at most once per job.

use crate::crawler::archiver::PageResult;
use crate::crawler::coordinator::{run_pass, Dispatch};
use crate::crawler::metrics::{JobMetrics, MetricsAggregator, ThreadMetrics};
use crate::url::{is_excluded, ExclusionPattern, NormalizedUri};
use std::collections::HashSet;
use std::sync::Arc;

/// The frontier evolving across passes
#[derive(Debug, Clone, Default)]
pub struct SpiderState {
    visited: HashSet<NormalizedUri>,
    frontier: Vec<NormalizedUri>,
    pass: usize,
}

impl SpiderState {
    /// Seeds the first pass, dropping duplicates
    pub fn new(initial: Vec<NormalizedUri>) -> Self {
        let mut state = Self::default();
        for uri in initial {
            if state.visited.insert(uri.clone()) {
                state.frontier.push(uri);
            }
        }
        state
    }

    pub fn frontier(&self) -> &[NormalizedUri] {
        &self.frontier
    }

    pub fn visited(&self) -> &HashSet<NormalizedUri> {
        &self.visited
    }

    /// Number of passes started so far
    pub fn pass(&self) -> usize {
        self.pass
    }

    fn begin_pass(&mut self) -> Arc<[String]> {
        self.pass += 1;
        self.frontier.iter().map(|uri| uri.to_string()).collect()
    }

    /// Replaces the frontier with the unvisited, non-excluded links of `pages`
    ///
    /// Redirect targets count as visited so they are not requested again.
    pub fn advance(&mut self, pages: &[PageResult], exclusions: &[ExclusionPattern]) {
        for page in pages {
            if let Some(final_url) = &page.final_url {
                self.visited.insert(final_url.clone());
            }
        }

        let mut next = Vec::new();
        for link in pages.iter().flat_map(|page| &page.spider_links) {
            if is_excluded(exclusions, &link.path_and_query()) {
                continue;
            }
            if self.visited.insert(link.clone()) {
                next.push(link.clone());
            }
        }

        self.frontier = next;
    }
}

/// Runs archive passes until no new local links remain
pub struct SpiderOrchestrator {
    dispatch: Dispatch,
    exclusions: Vec<ExclusionPattern>,
    spider: bool,
}

impl SpiderOrchestrator {
    /// With `spider` off only the initial pass runs
    pub fn new(dispatch: Dispatch, exclusions: Vec<ExclusionPattern>, spider: bool) -> Self {
        Self {
            dispatch,
            exclusions,
            spider,
        }
    }

    /// Archives `initial` and, when spidering, everything reachable from it
    ///
    /// Cancellation stops the job after the in-flight pass; pages already
    /// returned by its workers are kept.
    pub async fn run(&self, initial: Vec<NormalizedUri>) -> JobMetrics {
        let aggregator = MetricsAggregator::start();
        let mut state = SpiderState::new(initial);
        let mut all_metrics: Vec<ThreadMetrics> = Vec::new();

        while !state.frontier().is_empty() && !self.dispatch.cancel.is_cancelled() {
            let targets = state.begin_pass();
            tracing::info!("Pass {}: archiving {} URLs", state.pass(), targets.len());

            let mut metrics = run_pass(&self.dispatch, targets).await;

            if state.pass() > 1 {
                for page in metrics.iter_mut().flat_map(|m| m.pages.iter_mut()) {
                    page.is_only_found_by_spider = true;
                }
            }

            let pages: Vec<PageResult> = metrics
                .iter()
                .flat_map(|m| m.pages.iter().cloned())
                .collect();
            all_metrics.extend(metrics);

            if !self.spider || self.dispatch.cancel.is_cancelled() {
                break;
            }

            state.advance(&pages, &self.exclusions);
            if !state.frontier().is_empty() {
                tracing::info!("Spider found {} new URLs", state.frontier().len());
            }
        }

        tracing::info!(
            "Archived {} unique URLs in {} passes",
            state.visited().len(),
            state.pass()
        );

        aggregator.finish(all_metrics, self.dispatch.cancel.is_cancelled())
    }
}
