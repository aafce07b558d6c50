use sitesurge::config::HttpConfig;
use sitesurge::crawler::{build_http_client, SitemapFrontier};
use sitesurge::url::UriNormalizer;
use tokio_util::sync::CancellationToken;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn frontier() -> SitemapFrontier {
    frontier_with(CancellationToken::new())
}

fn frontier_with(cancel: CancellationToken) -> SitemapFrontier {
    let client = build_http_client(&HttpConfig::default()).expect("Failed to build client");
    SitemapFrontier::new(client, cancel)
}

fn urlset(urls: &[&str]) -> String {
    let entries: String = urls
        .iter()
        .map(|u| format!("<url><loc>{}</loc></url>", u))
        .collect();
    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?><urlset xmlns="http://www.sitemaps.org/schemas/sitemap/0.9">{}</urlset>"#,
        entries
    )
}

fn sitemap_index(children: &[String]) -> String {
    let entries: String = children
        .iter()
        .map(|c| format!("<sitemap><loc>{}</loc></sitemap>", c))
        .collect();
    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?><sitemapindex xmlns="http://www.sitemaps.org/schemas/sitemap/0.9">{}</sitemapindex>"#,
        entries
    )
}

async fn mount_xml(server: &MockServer, route: &str, body: String, times: u64) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(body)
                .insert_header("content-type", "application/xml"),
        )
        .expect(times)
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_nested_sitemap_index() {
    let mock_server = MockServer::start().await;
    let base = mock_server.uri();

    mount_xml(
        &mock_server,
        "/sitemap.xml",
        sitemap_index(&[
            format!("{}/sitemap-pages.xml", base),
            format!("{}/sitemap-blog.xml", base),
        ]),
        1,
    )
    .await;
    mount_xml(
        &mock_server,
        "/sitemap-pages.xml",
        urlset(&["https://example.com/", "https://example.com/about"]),
        1,
    )
    .await;

    let blog = r#"<urlset xmlns="http://www.sitemaps.org/schemas/sitemap/0.9" xmlns:xhtml="http://www.w3.org/1999/xhtml">
        <url>
            <loc>https://example.com/blog</loc>
            <xhtml:link rel="alternate" hreflang="de" href="https://example.com/de/blog"/>
        </url>
        <url><loc>https://example.com/about</loc></url>
    </urlset>"#;
    mount_xml(&mock_server, "/sitemap-blog.xml", blog.to_string(), 1).await;

    let urls = frontier().resolve(&format!("{}/sitemap.xml", base)).await;

    assert_eq!(
        urls,
        vec![
            "https://example.com/",
            "https://example.com/about",
            "https://example.com/blog",
            "https://example.com/de/blog",
        ]
    );
    mock_server.verify().await;
}

#[tokio::test]
async fn test_failing_child_does_not_abort_siblings() {
    let mock_server = MockServer::start().await;
    let base = mock_server.uri();

    mount_xml(
        &mock_server,
        "/sitemap.xml",
        sitemap_index(&[
            format!("{}/broken.xml", base),
            format!("{}/malformed.xml", base),
            format!("{}/good.xml", base),
        ]),
        1,
    )
    .await;

    Mock::given(method("GET"))
        .and(path("/broken.xml"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&mock_server)
        .await;

    mount_xml(
        &mock_server,
        "/malformed.xml",
        "<urlset><url><loc>https://example.com/lost</loc>".to_string(),
        1,
    )
    .await;
    mount_xml(
        &mock_server,
        "/good.xml",
        urlset(&["https://example.com/kept"]),
        1,
    )
    .await;

    let urls = frontier().resolve(&format!("{}/sitemap.xml", base)).await;

    assert_eq!(urls, vec!["https://example.com/kept"]);
}

#[tokio::test]
async fn test_cyclic_sitemap_index_terminates() {
    let mock_server = MockServer::start().await;
    let base = mock_server.uri();

    mount_xml(
        &mock_server,
        "/a.xml",
        sitemap_index(&[format!("{}/b.xml", base), format!("{}/a.xml", base)]),
        1,
    )
    .await;

    let b = format!(
        r#"<sitemapindex><sitemap><loc>{}/a.xml</loc></sitemap></sitemapindex>"#,
        base
    );
    mount_xml(&mock_server, "/b.xml", b, 1).await;

    let urls = frontier().resolve(&format!("{}/a.xml", base)).await;

    assert!(urls.is_empty());
    mock_server.verify().await;
}

#[tokio::test]
async fn test_missing_sitemap_yields_nothing() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&mock_server)
        .await;

    let urls = frontier()
        .resolve(&format!("{}/sitemap.xml", mock_server.uri()))
        .await;
    assert!(urls.is_empty());
}

#[tokio::test]
async fn test_cancelled_resolution_fetches_nothing() {
    let mock_server = MockServer::start().await;
    mount_xml(
        &mock_server,
        "/sitemap.xml",
        urlset(&["https://example.com/"]),
        0,
    )
    .await;

    let cancel = CancellationToken::new();
    cancel.cancel();

    let urls = frontier_with(cancel)
        .resolve(&format!("{}/sitemap.xml", mock_server.uri()))
        .await;

    assert!(urls.is_empty());
    mock_server.verify().await;
}

#[tokio::test]
async fn test_url_list_file() {
    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    let list = dir.path().join("urls.txt");
    std::fs::write(
        &list,
        "https://example.com/a\n\n  https://example.com/b  \nhttps://example.com/a\n",
    )
    .expect("Failed to write list");

    let urls = frontier().resolve(list.to_str().expect("utf-8 path")).await;

    assert_eq!(urls, vec!["https://example.com/a", "https://example.com/b"]);
}

#[tokio::test]
async fn test_local_sitemap_file_with_remote_child() {
    let mock_server = MockServer::start().await;
    mount_xml(
        &mock_server,
        "/child.xml",
        urlset(&["https://example.com/remote"]),
        1,
    )
    .await;

    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    let sitemap = dir.path().join("sitemap.xml");
    let content = format!(
        r#"<sitemapindex><sitemap><loc>{}/child.xml</loc></sitemap></sitemapindex>"#,
        mock_server.uri()
    );
    std::fs::write(&sitemap, content).expect("Failed to write sitemap");

    let urls = frontier()
        .resolve(sitemap.to_str().expect("utf-8 path"))
        .await;

    assert_eq!(urls, vec!["https://example.com/remote"]);
}

#[tokio::test]
async fn test_resolve_normalized_deduplicates_equivalents() {
    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    let list = dir.path().join("urls.txt");
    std::fs::write(
        &list,
        "http://www.example.com/a/\nhttps://example.com/a?utm=1\nhttps://EXAMPLE.com/b\n",
    )
    .expect("Failed to write list");

    let normalizer = UriNormalizer::new(
        Some("example.com".to_string()),
        vec!["www.example.com".to_string()],
    );
    let uris = frontier()
        .resolve_normalized(list.to_str().expect("utf-8 path"), &normalizer)
        .await;

    let uris: Vec<&str> = uris.iter().map(|u| u.as_str()).collect();
    assert_eq!(uris, vec!["https://example.com/a", "https://example.com/b"]);
}
