//! Sitemap frontier
//!
//! Resolves a path into the set of URLs a job will request:
//! - a local file not ending in `.xml` is a flat URL list, one per line
//! - anything else is a sitemap (local file or URL) and nested sitemap
//!   indexes are followed
//!
//! A sitemap that cannot be fetched or parsed is logged and contributes no
//! URLs; it never aborts the resolution of its siblings.

use crate::url::{NormalizedUri, UriNormalizer};
use crate::ConfigError;
use quick_xml::events::Event;
use quick_xml::Reader;
use reqwest::Client;
use std::collections::HashSet;
use std::path::Path;
use thiserror::Error;
use tokio_util::sync::CancellationToken;

/// Errors for a single sitemap document
#[derive(Debug, Error)]
pub enum SitemapError {
    #[error("Failed to retrieve sitemap at {url}: {source}")]
    Http { url: String, source: reqwest::Error },

    #[error("Failed to read sitemap file {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },

    #[error("Failed to parse sitemap XML: {0}")]
    Xml(String),
}

/// URLs and nested sitemaps found in one sitemap document
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SitemapDocument {
    /// Page URLs (`<loc>` text and alternate-language links) of a `urlset`
    pub urls: Vec<String>,
    /// `<loc>` text of every `sitemap` index entry
    pub child_sitemaps: Vec<String>,
}

/// Parses sitemap XML, matching elements by local name only
///
/// - If a `urlset` is present, every `<loc>` text and every
///   `<link rel="alternate" href="...">` value becomes a page URL
/// - Each `<loc>` inside a `<sitemap>` element becomes a nested sitemap
/// - Unknown elements are ignored
pub fn parse_sitemap(xml: &str) -> Result<SitemapDocument, SitemapError> {
    let mut reader = Reader::from_str(xml);
    reader.trim_text(true);

    let mut depth = 0usize;
    let mut saw_root = false;
    let mut saw_urlset = false;
    let mut sitemap_depth: Option<usize> = None;
    let mut loc_text: Option<String> = None;

    // (text, inside a <sitemap> entry)
    let mut locs: Vec<(String, bool)> = Vec::new();
    let mut alternates: Vec<String> = Vec::new();

    loop {
        let event = reader
            .read_event()
            .map_err(|e| SitemapError::Xml(format!("at byte {}: {}", reader.buffer_position(), e)))?;

        match event {
            Event::Start(e) => {
                if depth == 0 && saw_root {
                    return Err(SitemapError::Xml("multiple root elements".to_string()));
                }
                saw_root = true;
                depth += 1;

                match e.local_name().as_ref() {
                    b"urlset" => saw_urlset = true,
                    b"sitemap" => {
                        if sitemap_depth.is_none() {
                            sitemap_depth = Some(depth);
                        }
                    }
                    b"loc" => loc_text = Some(String::new()),
                    b"link" => collect_alternate(&e, &mut alternates),
                    _ => {}
                }
            }
            Event::Empty(e) => {
                if depth == 0 {
                    if saw_root {
                        return Err(SitemapError::Xml("multiple root elements".to_string()));
                    }
                    saw_root = true;
                }
                match e.local_name().as_ref() {
                    b"urlset" => saw_urlset = true,
                    b"link" => collect_alternate(&e, &mut alternates),
                    _ => {}
                }
            }
            Event::End(e) => {
                match e.local_name().as_ref() {
                    b"loc" => {
                        if let Some(text) = loc_text.take() {
                            let text = text.trim().to_string();
                            if !text.is_empty() {
                                locs.push((text, sitemap_depth.is_some()));
                            }
                        }
                    }
                    b"sitemap" if sitemap_depth == Some(depth) => sitemap_depth = None,
                    _ => {}
                }
                depth = depth.saturating_sub(1);
            }
            Event::Text(t) => {
                if depth == 0 {
                    return Err(SitemapError::Xml(
                        "text outside of the root element".to_string(),
                    ));
                }
                if let Some(buffer) = loc_text.as_mut() {
                    let text = t.unescape().map_err(|e| SitemapError::Xml(e.to_string()))?;
                    buffer.push_str(&text);
                }
            }
            Event::CData(c) => {
                if let Some(buffer) = loc_text.as_mut() {
                    buffer.push_str(&String::from_utf8_lossy(&c.into_inner()));
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    if !saw_root {
        return Err(SitemapError::Xml("document has no root element".to_string()));
    }

    if depth != 0 {
        return Err(SitemapError::Xml("unexpected end of document".to_string()));
    }

    let mut document = SitemapDocument::default();

    if saw_urlset {
        document.urls = locs.iter().map(|(text, _)| text.clone()).collect();
        document.urls.extend(alternates);
    }

    document.child_sitemaps = locs
        .into_iter()
        .filter(|(_, in_sitemap)| *in_sitemap)
        .map(|(text, _)| text)
        .collect();

    Ok(document)
}

fn collect_alternate(element: &quick_xml::events::BytesStart<'_>, alternates: &mut Vec<String>) {
    let mut is_alternate = false;
    let mut href: Option<String> = None;

    for attribute in element.attributes().flatten() {
        let Ok(value) = attribute.unescape_value() else {
            continue;
        };
        match attribute.key.local_name().as_ref() {
            b"rel" => is_alternate = value == "alternate",
            b"href" => href = Some(value.trim().to_string()),
            _ => {}
        }
    }

    if let Some(href) = href.filter(|h| is_alternate && !h.is_empty()) {
        alternates.push(href);
    }
}

/// Resolves paths into de-duplicated URL lists
#[derive(Debug, Clone)]
pub struct SitemapFrontier {
    client: Client,
    cancel: CancellationToken,
}

impl SitemapFrontier {
    pub fn new(client: Client, cancel: CancellationToken) -> Self {
        Self { client, cancel }
    }

    /// Resolves a URL list file or sitemap into raw URLs
    ///
    /// Duplicates are removed by string equality, keeping first-seen order.
    pub async fn resolve(&self, path: &str) -> Vec<String> {
        let urls = if is_url_list_file(path) {
            tracing::info!("Getting URLs from file {}", path);
            match tokio::fs::read_to_string(path).await {
                Ok(content) => content
                    .lines()
                    .map(str::trim)
                    .filter(|line| !line.is_empty())
                    .map(str::to_string)
                    .collect(),
                Err(e) => {
                    tracing::warn!("Failed to read URL list {}: {}", path, e);
                    Vec::new()
                }
            }
        } else {
            tracing::info!("Getting URLs from sitemap {}", path);
            self.resolve_sitemap_tree(path).await
        };

        let urls = dedup_preserving_order(urls);
        tracing::info!("Found {} URLs", urls.len());
        urls
    }

    /// Resolves a path and normalizes every URL, dropping the ones that fail
    ///
    /// De-duplication happens on the normalized form, so URLs that differ only
    /// in scheme, case, query or equivalent host collapse into one.
    pub async fn resolve_normalized(&self, path: &str, normalizer: &UriNormalizer) -> Vec<NormalizedUri> {
        normalize_targets(self.resolve(path).await, normalizer)
    }

    /// Walks a sitemap tree with an explicit stack
    ///
    /// Every sitemap location is fetched at most once, so cyclic or
    /// self-referencing indexes terminate.
    async fn resolve_sitemap_tree(&self, root: &str) -> Vec<String> {
        let mut urls = Vec::new();
        let mut visited: HashSet<String> = HashSet::new();
        let mut stack = vec![root.trim().to_string()];

        while let Some(location) = stack.pop() {
            if self.cancel.is_cancelled() {
                tracing::info!("Sitemap resolution cancelled");
                break;
            }

            if !visited.insert(location.clone()) {
                tracing::debug!("Skipping already visited sitemap {}", location);
                continue;
            }

            let document = match self.load_sitemap(&location).await {
                Ok(document) => document,
                Err(e) => {
                    tracing::warn!("Error reading sitemap at {}: {}", location, e);
                    continue;
                }
            };

            urls.extend(document.urls);

            // Reverse so children are visited in document order.
            for child in document.child_sitemaps.into_iter().rev() {
                if !visited.contains(&child) {
                    tracing::info!("Following child sitemap at {}", child);
                    stack.push(child);
                }
            }
        }

        urls
    }

    async fn load_sitemap(&self, location: &str) -> Result<SitemapDocument, SitemapError> {
        let xml = if Path::new(location).is_file() {
            tokio::fs::read_to_string(location)
                .await
                .map_err(|source| SitemapError::Io {
                    path: location.to_string(),
                    source,
                })?
        } else {
            let http_error = |source| SitemapError::Http {
                url: location.to_string(),
                source,
            };
            self.client
                .get(location)
                .send()
                .await
                .and_then(|response| response.error_for_status())
                .map_err(http_error)?
                .text()
                .await
                .map_err(http_error)?
        };

        parse_sitemap(&xml)
    }
}

/// Normalizes raw URLs, dropping failures and normalized duplicates
pub fn normalize_targets(raw: Vec<String>, normalizer: &UriNormalizer) -> Vec<NormalizedUri> {
    let mut seen = HashSet::new();
    let mut uris = Vec::with_capacity(raw.len());

    for url in raw {
        match normalizer.normalize(&url, None) {
            Ok(uri) => {
                if seen.insert(uri.clone()) {
                    uris.push(uri);
                }
            }
            Err(e) => tracing::warn!("Skipping URL {}: {}", url, e),
        }
    }

    uris
}

/// Checks the outcome of resolving `path` before a job starts
///
/// Returns `Ok(None)` when the job was cancelled during resolution, so the
/// caller can stop quietly. An empty result otherwise means the path was
/// unusable.
pub fn require_targets<T>(
    targets: Vec<T>,
    path: &str,
    cancel: &CancellationToken,
) -> Result<Option<Vec<T>>, ConfigError> {
    if cancel.is_cancelled() {
        tracing::info!("Cancelled while resolving {}", path);
        return Ok(None);
    }

    if targets.is_empty() {
        return Err(ConfigError::NoUrls(path.to_string()));
    }

    Ok(Some(targets))
}

fn is_url_list_file(path: &str) -> bool {
    Path::new(path).is_file() && !path.to_lowercase().ends_with(".xml")
}

fn dedup_preserving_order(urls: Vec<String>) -> Vec<String> {
    let mut seen = HashSet::new();
    urls.into_iter()
        .filter(|url| seen.insert(url.clone()))
        .collect()
}
