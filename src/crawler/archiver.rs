//! Per-page archive step
//!
//! Turns one fetch outcome into a [`PageResult`]: classifies the response,
//! scans the HTML and saves it under the output folder.

use crate::crawler::fetcher::{FetchError, FetchResponse};
use crate::crawler::scanner::{ContentScanner, PageScan};
use crate::output::save_html;
use crate::url::{NormalizedUri, UriNormalizer};
use std::path::PathBuf;
use std::sync::Arc;

/// Outcome of archiving one page
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PageResult {
    /// URL as requested
    pub url: String,
    /// Normalized URL after redirects
    pub final_url: Option<NormalizedUri>,
    pub is_redirected: bool,
    /// Redirected away from the primary domain
    pub is_cross_domain_redirect: bool,
    pub status_code: Option<u16>,
    /// Non-2xx status or transport failure
    pub is_error: bool,
    /// No usable HTML was retrieved
    pub is_retrieve_error: bool,
    pub is_scan_error: bool,
    pub html_saved: bool,
    /// Discovered by the spider rather than the initial URL set
    pub is_only_found_by_spider: bool,
    pub spider_links: Vec<NormalizedUri>,
    pub search_terms_found_in_html: Vec<String>,
    pub search_terms_found_in_text: Vec<String>,
}

impl PageResult {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Default::default()
        }
    }

    pub fn was_search_terms_found(&self) -> bool {
        !self.search_terms_found_in_html.is_empty() || !self.search_terms_found_in_text.is_empty()
    }

    fn apply_scan(&mut self, scan: PageScan) {
        self.is_scan_error = scan.is_scan_error;
        self.spider_links = scan.spider_links;
        self.search_terms_found_in_html = scan.search_terms_found_in_html;
        self.search_terms_found_in_text = scan.search_terms_found_in_text;
    }
}

/// Behavior switches for the archive step
#[derive(Debug, Clone, Default)]
pub struct ArchiveSettings {
    /// Root folder for saved HTML
    pub output_dir: PathBuf,
    /// Scan pages that redirected off the primary domain
    pub cross_domain: bool,
    /// Accept any Content-Type as HTML
    pub ignore_content_type: bool,
    pub only_save_if_term_found: bool,
    pub verbose: bool,
}

pub struct PageArchiver {
    settings: ArchiveSettings,
    normalizer: UriNormalizer,
    scanner: Arc<dyn ContentScanner>,
}

impl PageArchiver {
    pub fn new(
        settings: ArchiveSettings,
        normalizer: UriNormalizer,
        scanner: Arc<dyn ContentScanner>,
    ) -> Self {
        Self {
            settings,
            normalizer,
            scanner,
        }
    }

    pub fn normalizer(&self) -> &UriNormalizer {
        &self.normalizer
    }

    /// Processes the outcome of requesting `requested`
    ///
    /// Failures are recorded on the result and never returned as errors.
    pub async fn process(
        &self,
        requested: &str,
        outcome: Result<FetchResponse, FetchError>,
    ) -> PageResult {
        let mut page = PageResult::new(requested);

        let response = match outcome {
            Ok(response) => response,
            Err(e) => {
                tracing::warn!("Error retrieving HTML content for {}: {}", requested, e);
                page.is_error = true;
                page.is_retrieve_error = true;
                return page;
            }
        };

        let is_html = response.is_html();
        page.status_code = Some(response.status_code);
        page.is_error = response.is_error;

        if self.settings.verbose {
            tracing::info!(
                "{} {} - html: {}",
                response.status_code,
                requested,
                is_html
            );
        }

        let requested_uri = self.normalizer.normalize(requested, None).ok();
        let final_uri = self
            .normalizer
            .normalize(&response.final_url, Some(requested))
            .ok();

        if let (Some(requested_uri), Some(final_uri)) = (&requested_uri, &final_uri) {
            page.is_redirected = requested_uri != final_uri;
            let expected_host = self
                .normalizer
                .primary_domain()
                .unwrap_or_else(|| requested_uri.host());
            page.is_cross_domain_redirect =
                page.is_redirected && !final_uri.host().eq_ignore_ascii_case(expected_host);
        }
        page.final_url = final_uri;

        page.is_retrieve_error = response.is_error || !(is_html || self.settings.ignore_content_type);
        if page.is_retrieve_error {
            tracing::warn!(
                "Failed to retrieve HTML content for {}. Status: {}, html: {}",
                requested,
                response.status_code,
                is_html
            );
            return page;
        }

        if page.is_cross_domain_redirect && !self.settings.cross_domain {
            tracing::debug!(
                "Skipping {}, redirected to another domain",
                requested
            );
            return page;
        }

        // The served URL, trailing slash included, is the base for
        // document-relative links.
        page.apply_scan(self.scanner.scan(&response.final_url, &response.body));

        if self.settings.only_save_if_term_found && !page.was_search_terms_found() {
            return page;
        }

        let target = page
            .final_url
            .as_ref()
            .map(|u| u.as_url().clone())
            .or_else(|| url::Url::parse(&response.final_url).ok());

        if let Some(target) = target {
            match save_html(&self.settings.output_dir, &target, &response.body).await {
                Ok(path) => {
                    page.html_saved = true;
                    if self.settings.verbose {
                        tracing::info!(
                            "Writing {} chars to {}",
                            response.body.len(),
                            path.display()
                        );
                    }
                }
                Err(e) => tracing::warn!("Failed to save HTML for {}: {}", requested, e),
            }
        }

        page
    }
}
