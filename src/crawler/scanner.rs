//! Page content scanning
//!
//! This module handles scanning archived HTML to extract:
//! - Search term hits, in the markup and in the visible text
//! - Local links to spider on the next pass

use crate::url::{NormalizedUri, UriNormalizer};
use crate::ConfigError;
use scraper::{Html, Selector};
use thiserror::Error;
use url::Url;

/// Errors raised while scanning a single page
#[derive(Debug, Error)]
pub enum ScanError {
    #[error("Could not find main content element using selector {0}")]
    ContentNotFound(String),
}

/// Result of scanning one page
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PageScan {
    pub search_terms_found_in_html: Vec<String>,
    pub search_terms_found_in_text: Vec<String>,
    /// Normalized links on the primary domain
    pub spider_links: Vec<NormalizedUri>,
    pub is_scan_error: bool,
}

/// A content scanner used by the archive step
///
/// Scanning is synchronous; parsed documents never live across an await.
pub trait ContentScanner: Send + Sync {
    fn scan(&self, page_uri: &str, html: &str) -> PageScan;
}

/// Settings for [`HtmlScanner`]
#[derive(Debug, Clone, Default)]
pub struct ScanOptions {
    /// CSS selector of the searched content; the whole body when unset
    pub include_selector: Option<String>,
    /// CSS selector of content removed before searching
    pub exclude_selector: Option<String>,
    pub search_terms: Vec<String>,
    /// Collect links for the spider
    pub spider: bool,
}

/// Scanner backed by `scraper`
#[derive(Debug)]
pub struct HtmlScanner {
    include: Option<(String, Selector)>,
    exclude: Option<Selector>,
    body: Selector,
    anchors: Selector,
    search_terms: Vec<String>,
    spider: bool,
    normalizer: UriNormalizer,
}

impl HtmlScanner {
    /// Compiles the configured selectors
    pub fn new(options: ScanOptions, normalizer: UriNormalizer) -> Result<Self, ConfigError> {
        let include = match non_blank(options.include_selector) {
            Some(raw) => {
                let selector = compile(&raw)?;
                Some((raw, selector))
            }
            None => None,
        };
        let exclude = non_blank(options.exclude_selector)
            .map(|raw| compile(&raw))
            .transpose()?;

        Ok(Self {
            include,
            exclude,
            body: compile("body")?,
            anchors: compile("a[href]")?,
            search_terms: options
                .search_terms
                .into_iter()
                .map(|t| t.trim().to_string())
                .filter(|t| !t.is_empty())
                .collect(),
            spider: options.spider,
            normalizer,
        })
    }

    fn try_scan(&self, page_uri: &str, html: &str) -> Result<PageScan, ScanError> {
        let mut document = Html::parse_document(html);

        // Remove excluded elements from the whole tree before searching.
        if let Some(exclude) = &self.exclude {
            let excluded: Vec<_> = document.select(exclude).map(|e| e.id()).collect();
            for id in excluded {
                if let Some(mut node) = document.tree.get_mut(id) {
                    node.detach();
                }
            }
        }

        let main = match &self.include {
            Some((raw, selector)) => document
                .select(selector)
                .next()
                .ok_or_else(|| ScanError::ContentNotFound(raw.clone()))?,
            None => document
                .select(&self.body)
                .next()
                .ok_or_else(|| ScanError::ContentNotFound("body".to_string()))?,
        };

        let content_html = main.html().to_lowercase();
        let content_text = main.text().collect::<String>().to_lowercase();

        let mut scan = PageScan {
            search_terms_found_in_html: self.terms_found_in(&content_html),
            search_terms_found_in_text: self.terms_found_in(&content_text),
            ..Default::default()
        };

        if self.spider {
            // Links come from the whole body, not just the searched content.
            if let Some(body) = document.select(&self.body).next() {
                for element in body.select(&self.anchors) {
                    if let Some(link) = element
                        .value()
                        .attr("href")
                        .and_then(|href| self.spider_link(page_uri, href))
                    {
                        scan.spider_links.push(link);
                    }
                }
            }
        }

        Ok(scan)
    }

    fn terms_found_in(&self, haystack: &str) -> Vec<String> {
        self.search_terms
            .iter()
            .filter(|term| haystack.contains(&term.to_lowercase()))
            .cloned()
            .collect()
    }

    /// Normalizes an href, keeping it only if it is an http(s) link on the
    /// primary domain
    fn spider_link(&self, page_uri: &str, href: &str) -> Option<NormalizedUri> {
        let href = href.trim();
        if href.is_empty() || href.starts_with('#') {
            return None;
        }

        let lower = href.to_ascii_lowercase();
        if ["javascript:", "mailto:", "tel:", "data:"]
            .iter()
            .any(|scheme| lower.starts_with(scheme))
        {
            return None;
        }

        // Document-relative hrefs resolve against the page itself.
        let candidate = if href.contains("://") || href.starts_with('/') || href.starts_with('~') {
            href.to_string()
        } else {
            Url::parse(page_uri).ok()?.join(href).ok()?.to_string()
        };

        let uri = self.normalizer.normalize(&candidate, Some(page_uri)).ok()?;

        if !matches!(uri.as_url().scheme(), "http" | "https") {
            return None;
        }

        self.normalizer.is_primary_host(&uri).then_some(uri)
    }
}

impl ContentScanner for HtmlScanner {
    fn scan(&self, page_uri: &str, html: &str) -> PageScan {
        match self.try_scan(page_uri, html) {
            Ok(scan) => scan,
            Err(e) => {
                tracing::warn!("Error scanning HTML content for {}: {}", page_uri, e);
                PageScan {
                    is_scan_error: true,
                    ..Default::default()
                }
            }
        }
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

fn compile(raw: &str) -> Result<Selector, ConfigError> {
    Selector::parse(raw)
        .map_err(|_| ConfigError::Validation(format!("invalid CSS selector '{}'", raw)))
}
