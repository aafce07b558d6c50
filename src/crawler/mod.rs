//! Crawl-and-dispatch engine
//!
//! This module contains the core logic, including:
//! - Target resolution from sitemaps and URL list files
//! - Partitioning targets across a fixed worker pool
//! - The per-worker request loop and its metrics
//! - Page archiving, content scanning and multi-pass spidering

mod archiver;
mod coordinator;
mod executor;
mod fetcher;
mod metrics;
mod partition;
mod scanner;
mod sitemap;
mod spider;

pub use archiver::{ArchiveSettings, PageArchiver, PageResult};
pub use coordinator::{run_load_test, run_pass, Dispatch};
pub use executor::{
    should_force_miss, with_miss_suffix, RequestExecutor, StopPolicy, WorkMode, WorkerSettings,
    REQUEST_DELAY,
};
pub use fetcher::{
    build_headers, build_http_client, parse_header, FetchError, FetchResponse, Fetcher,
    HttpFetcher,
};
pub use metrics::{JobMetrics, MetricsAggregator, ThreadMetrics};
pub use partition::{block_range, WorkBlock};
pub use scanner::{ContentScanner, HtmlScanner, PageScan, ScanError, ScanOptions};
pub use sitemap::{
    normalize_targets, parse_sitemap, require_targets, SitemapDocument, SitemapError,
    SitemapFrontier,
};
pub use spider::{SpiderOrchestrator, SpiderState};

use crate::config::{validate_archive_config, Config};
use crate::output::{CsvResultSink, ResultSink, RESULTS_FILE_NAME};
use crate::url::{ExclusionPattern, NormalizedUri, UriNormalizer};
use crate::SurgeError;
use std::path::PathBuf;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Runs a complete archive job over already normalized URLs
///
/// This is the main entry point of the archive command. It will:
/// 1. Validate the archive settings
/// 2. Build the scanner and archiver
/// 3. Run the spider passes
/// 4. Write `results.csv` into the output folder
///
/// The normalizer decides the primary domain; it must be the one the
/// initial URLs were normalized with.
pub async fn archive(
    config: &Config,
    normalizer: UriNormalizer,
    initial: Vec<NormalizedUri>,
    fetcher: Arc<dyn Fetcher>,
    cancel: CancellationToken,
) -> Result<JobMetrics, SurgeError> {
    let archive_config = &config.archive;
    validate_archive_config(archive_config)?;

    if initial.is_empty() {
        return Err(crate::ConfigError::NoUrls("the archive target set".to_string()).into());
    }

    let exclusions = ExclusionPattern::parse_all(&archive_config.exclude_urls)?;
    let output_dir = PathBuf::from(&archive_config.output);

    let scanner = HtmlScanner::new(
        ScanOptions {
            include_selector: archive_config.content_search_include.clone(),
            exclude_selector: archive_config.content_search_exclude.clone(),
            search_terms: archive_config.content_search_terms.clone(),
            spider: archive_config.spider,
        },
        normalizer.clone(),
    )?;

    let archiver = PageArchiver::new(
        ArchiveSettings {
            output_dir: output_dir.clone(),
            cross_domain: archive_config.cross_domain,
            ignore_content_type: archive_config.ignore_content_type,
            only_save_if_term_found: archive_config.only_save_if_term_found,
            verbose: archive_config.verbose,
        },
        normalizer,
        Arc::new(scanner),
    );

    let dispatch = Dispatch {
        thread_count: archive_config.threads,
        fetcher,
        settings: Arc::new(WorkerSettings::for_archive(archive_config)),
        mode: WorkMode::Archive(Arc::new(archiver)),
        cancel,
        job_started: std::time::Instant::now(),
    };

    tracing::info!(
        "Archiving {} URLs to {} with {} workers",
        initial.len(),
        output_dir.display(),
        archive_config.threads
    );

    let metrics = SpiderOrchestrator::new(dispatch, exclusions, archive_config.spider)
        .run(initial)
        .await;

    let results_path = output_dir.join(RESULTS_FILE_NAME);
    let mut sink = CsvResultSink::create(&results_path)?;
    sink.write_pages(&metrics.pages)?;
    sink.finish()?;
    tracing::info!("Results written to {}", results_path.display());

    Ok(metrics)
}
