use async_trait::async_trait;
use reqwest::Method;
use sitesurge::config::{ArchiveConfig, Config};
use sitesurge::crawler::{archive, FetchError, FetchResponse, Fetcher, JobMetrics};
use sitesurge::url::{NormalizedUri, UriNormalizer};
use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, Mutex};
use tokio_util::sync::CancellationToken;

/// An in-memory site: path -> (body, redirect target)
#[derive(Default)]
struct FakeSite {
    pages: HashMap<String, String>,
    redirects: HashMap<String, String>,
    hits: Mutex<HashMap<String, u32>>,
}

impl FakeSite {
    fn page(mut self, path: &str, links: &[&str]) -> Self {
        let anchors: String = links
            .iter()
            .map(|l| format!(r#"<a href="{}">{}</a>"#, l, l))
            .collect();
        self.pages.insert(
            format!("https://example.com{}", path),
            format!("<html><body><h1>{}</h1>{}</body></html>", path, anchors),
        );
        self
    }

    fn redirect(mut self, from: &str, to: &str) -> Self {
        self.redirects.insert(
            format!("https://example.com{}", from),
            format!("https://example.com{}", to),
        );
        self
    }

    fn hits(&self) -> HashMap<String, u32> {
        self.hits.lock().expect("hits lock").clone()
    }
}

#[async_trait]
impl Fetcher for FakeSite {
    async fn fetch(&self, uri: &str, _method: &Method) -> Result<FetchResponse, FetchError> {
        *self
            .hits
            .lock()
            .expect("hits lock")
            .entry(uri.to_string())
            .or_default() += 1;

        let final_url = self
            .redirects
            .get(uri)
            .cloned()
            .unwrap_or_else(|| uri.to_string());

        let (status, body) = match self.pages.get(&final_url) {
            Some(body) => (200, body.clone()),
            None => (404, "<html><body>Not found</body></html>".to_string()),
        };

        Ok(FetchResponse {
            final_url,
            status_code: status,
            is_error: status != 200,
            content_type: Some("text/html".to_string()),
            body,
        })
    }
}

fn archive_config(output: &Path, spider: bool, exclude_urls: &[&str]) -> Config {
    Config {
        archive: ArchiveConfig {
            threads: 3,
            output: output.to_string_lossy().into_owned(),
            spider,
            domain: Some("example.com".to_string()),
            exclude_urls: exclude_urls.iter().map(|s| s.to_string()).collect(),
            ..Default::default()
        },
        ..Default::default()
    }
}

fn normalizer() -> UriNormalizer {
    UriNormalizer::new(
        Some("example.com".to_string()),
        vec!["www.example.com".to_string()],
    )
}

fn seeds(paths: &[&str]) -> Vec<NormalizedUri> {
    let normalizer = normalizer();
    paths
        .iter()
        .map(|p| normalizer.normalize(p, None).expect("valid seed"))
        .collect()
}

fn closed_site() -> FakeSite {
    FakeSite::default()
        .page("/", &["/a", "/b", "https://www.example.com/a/"])
        .page("/a", &["/", "/c", "https://other.org/x"])
        .page("/b", &["/c?ref=b", "/private/x", "#top"])
        .page("/c", &["/a", "mailto:someone@example.com"])
        .page("/private/x", &["/d"])
        .page("/d", &[])
}

async fn run(site: Arc<FakeSite>, config: &Config, initial: &[&str]) -> JobMetrics {
    archive(
        config,
        normalizer(),
        seeds(initial),
        site,
        CancellationToken::new(),
    )
    .await
    .expect("Archive failed")
}

fn page_urls(metrics: &JobMetrics) -> Vec<String> {
    let mut urls: Vec<String> = metrics.pages.iter().map(|p| p.url.clone()).collect();
    urls.sort();
    urls
}

#[tokio::test]
async fn test_spider_converges_and_visits_each_url_once() {
    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    let site = Arc::new(closed_site());
    let config = archive_config(dir.path(), true, &["/private*"]);

    let metrics = run(site.clone(), &config, &["/"]).await;

    assert_eq!(
        page_urls(&metrics),
        vec![
            "https://example.com/",
            "https://example.com/a",
            "https://example.com/b",
            "https://example.com/c",
        ]
    );

    let hits = site.hits();
    assert_eq!(hits.len(), 4);
    assert!(hits.values().all(|&n| n == 1), "hits: {:?}", hits);
    assert!(!hits.contains_key("https://example.com/private/x"));

    for page in &metrics.pages {
        assert_eq!(
            page.is_only_found_by_spider,
            page.url != "https://example.com/",
            "{}",
            page.url
        );
        assert!(page.html_saved);
    }

    assert!(dir.path().join("html/example.com/index.html").exists());
    assert!(dir.path().join("html/example.com/c.html").exists());

    let csv = std::fs::read_to_string(dir.path().join("results.csv")).expect("results.csv");
    assert_eq!(csv.lines().count(), 5);
}

#[tokio::test]
async fn test_without_spider_only_initial_urls_are_archived() {
    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    let site = Arc::new(closed_site());
    let config = archive_config(dir.path(), false, &[]);

    let metrics = run(site.clone(), &config, &["/", "/b"]).await;

    assert_eq!(
        page_urls(&metrics),
        vec!["https://example.com/", "https://example.com/b"]
    );
    assert_eq!(site.hits().len(), 2);
    assert!(metrics.pages.iter().all(|p| !p.is_only_found_by_spider));
}

#[tokio::test]
async fn test_redirect_target_is_not_requested_again() {
    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    let site = Arc::new(
        FakeSite::default()
            .redirect("/old", "/new")
            .page("/new", &["/new", "/other"])
            .page("/other", &["/old", "/new"]),
    );
    let config = archive_config(dir.path(), true, &[]);

    let metrics = run(site.clone(), &config, &["/old"]).await;

    let hits = site.hits();
    assert_eq!(hits.len(), 2);
    assert!(!hits.contains_key("https://example.com/new"));

    let old = metrics
        .pages
        .iter()
        .find(|p| p.url == "https://example.com/old")
        .expect("old page result");
    assert!(old.is_redirected);
    assert!(!old.is_cross_domain_redirect);
}

#[tokio::test]
async fn test_missing_pages_are_retrieve_errors() {
    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    let site = Arc::new(FakeSite::default().page("/", &["/gone"]));
    let config = archive_config(dir.path(), true, &[]);

    let metrics = run(site, &config, &["/"]).await;

    assert_eq!(metrics.pages.len(), 2);
    assert_eq!(metrics.retrieve_error_count(), 1);
    assert_eq!(metrics.unintended_miss_count, 1);
    assert!(!dir.path().join("html/example.com/gone.html").exists());
}

#[tokio::test]
async fn test_cancelled_archive_stops_before_first_pass() {
    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    let site = Arc::new(closed_site());
    let config = archive_config(dir.path(), true, &[]);

    let cancel = CancellationToken::new();
    cancel.cancel();

    let metrics = archive(&config, normalizer(), seeds(&["/"]), site.clone(), cancel)
        .await
        .expect("Archive failed");

    assert!(metrics.cancelled);
    assert!(metrics.pages.is_empty());
    assert!(site.hits().is_empty());
}
