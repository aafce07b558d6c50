use sitesurge::config::{HttpConfig, LoadConfig};
use sitesurge::crawler::{run_load_test, Fetcher, HttpFetcher};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn http_fetcher(config: &HttpConfig) -> Arc<dyn Fetcher> {
    Arc::new(HttpFetcher::from_config(config).expect("Failed to build fetcher"))
}

fn page_urls(base: &str, count: usize) -> Vec<String> {
    (0..count).map(|i| format!("{}/page/{}", base, i)).collect()
}

#[tokio::test]
async fn test_all_once_hits_every_url_exactly_once() {
    let mock_server = MockServer::start().await;

    for i in 0..10 {
        Mock::given(method("GET"))
            .and(path(format!("/page/{}", i)))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&mock_server)
            .await;
    }

    let config = LoadConfig {
        threads: 3,
        seconds: 0,
        ..Default::default()
    };

    let metrics = run_load_test(
        &config,
        page_urls(&mock_server.uri(), 10),
        http_fetcher(&HttpConfig::default()),
        CancellationToken::new(),
    )
    .await
    .expect("Load test failed");

    assert_eq!(metrics.request_count, 10);
    assert_eq!(metrics.worker_count, 3);
    assert_eq!(metrics.unintended_miss_count, 0);
    assert_eq!(metrics.error_count, 0);
    assert!(!metrics.cancelled);

    mock_server.verify().await;
}

#[tokio::test]
async fn test_more_threads_than_urls() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200))
        .expect(3)
        .mount(&mock_server)
        .await;

    let config = LoadConfig {
        threads: 8,
        seconds: 0,
        ..Default::default()
    };

    let metrics = run_load_test(
        &config,
        page_urls(&mock_server.uri(), 3),
        http_fetcher(&HttpConfig::default()),
        CancellationToken::new(),
    )
    .await
    .expect("Load test failed");

    assert_eq!(metrics.request_count, 3);
}

#[tokio::test]
async fn test_forced_misses_are_not_counted() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&mock_server)
        .await;

    let forced = LoadConfig {
        threads: 2,
        seconds: 0,
        chance_of_404: 100,
        ..Default::default()
    };
    let metrics = run_load_test(
        &forced,
        page_urls(&mock_server.uri(), 6),
        http_fetcher(&HttpConfig::default()),
        CancellationToken::new(),
    )
    .await
    .expect("Load test failed");

    assert_eq!(metrics.request_count, 6);
    assert_eq!(metrics.unintended_miss_count, 0);

    let unforced = LoadConfig {
        chance_of_404: 0,
        ..forced
    };
    let metrics = run_load_test(
        &unforced,
        page_urls(&mock_server.uri(), 6),
        http_fetcher(&HttpConfig::default()),
        CancellationToken::new(),
    )
    .await
    .expect("Load test failed");

    assert_eq!(metrics.unintended_miss_count, 6);
    assert!((metrics.unintended_miss_percent() - 100.0).abs() < 1e-9);
}

#[tokio::test]
async fn test_head_method_and_custom_headers() {
    let mock_server = MockServer::start().await;

    Mock::given(method("HEAD"))
        .and(header("x-api-key", "secret"))
        .and(header("user-agent", "SurgeBot/1.0"))
        .respond_with(ResponseTemplate::new(200))
        .expect(4)
        .mount(&mock_server)
        .await;

    let http = HttpConfig {
        user_agent: Some("SurgeBot/1.0".to_string()),
        headers: vec!["X-Api-Key: secret".to_string()],
        ..Default::default()
    };
    let config = LoadConfig {
        threads: 2,
        seconds: 0,
        method: "HEAD".to_string(),
        ..Default::default()
    };

    let metrics = run_load_test(
        &config,
        page_urls(&mock_server.uri(), 4),
        http_fetcher(&http),
        CancellationToken::new(),
    )
    .await
    .expect("Load test failed");

    assert_eq!(metrics.request_count, 4);
    mock_server.verify().await;
}

#[tokio::test]
async fn test_timed_run_keeps_cycling_until_deadline() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&mock_server)
        .await;

    let config = LoadConfig {
        threads: 2,
        seconds: 1,
        ..Default::default()
    };

    let metrics = run_load_test(
        &config,
        page_urls(&mock_server.uri(), 3),
        http_fetcher(&HttpConfig::default()),
        CancellationToken::new(),
    )
    .await
    .expect("Load test failed");

    assert!(metrics.elapsed >= Duration::from_secs(1));
    assert!(metrics.request_count > 3);
    assert!(!metrics.cancelled);
}

#[tokio::test]
async fn test_cancellation_returns_partial_metrics() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&mock_server)
        .await;

    let config = LoadConfig {
        threads: 2,
        seconds: 60,
        delay: true,
        ..Default::default()
    };

    let cancel = CancellationToken::new();
    let canceller = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(700)).await;
        canceller.cancel();
    });

    let metrics = tokio::time::timeout(
        Duration::from_secs(10),
        run_load_test(
            &config,
            page_urls(&mock_server.uri(), 4),
            http_fetcher(&HttpConfig::default()),
            cancel,
        ),
    )
    .await
    .expect("Cancellation was not honored")
    .expect("Load test failed");

    assert!(metrics.cancelled);
    assert!(metrics.request_count >= 2);
    assert!(metrics.elapsed < Duration::from_secs(10));
}

#[tokio::test]
async fn test_transport_failures_are_counted() {
    let config = LoadConfig {
        threads: 1,
        seconds: 0,
        ..Default::default()
    };

    let metrics = run_load_test(
        &config,
        vec!["http://127.0.0.1:1/unreachable".to_string()],
        http_fetcher(&HttpConfig::default()),
        CancellationToken::new(),
    )
    .await
    .expect("Load test failed");

    assert_eq!(metrics.request_count, 1);
    assert_eq!(metrics.error_count, 1);
}

#[tokio::test]
async fn test_server_errors_are_counted_as_failures() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/page/0"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path("/page/1"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path("/page/2"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path("/page/3"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&mock_server)
        .await;

    let config = LoadConfig {
        threads: 1,
        seconds: 0,
        ..Default::default()
    };

    let metrics = run_load_test(
        &config,
        page_urls(&mock_server.uri(), 4),
        http_fetcher(&HttpConfig::default()),
        CancellationToken::new(),
    )
    .await
    .expect("Load test failed");

    assert_eq!(metrics.request_count, 4);
    assert_eq!(metrics.error_count, 2);
    assert_eq!(metrics.unintended_miss_count, 1);
    assert!((metrics.error_percent() - 50.0).abs() < 1e-9);
}

#[tokio::test]
async fn test_forced_misses_on_failing_server_are_not_failures() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&mock_server)
        .await;

    let config = LoadConfig {
        threads: 1,
        seconds: 0,
        chance_of_404: 100,
        ..Default::default()
    };

    let metrics = run_load_test(
        &config,
        page_urls(&mock_server.uri(), 2),
        http_fetcher(&HttpConfig::default()),
        CancellationToken::new(),
    )
    .await
    .expect("Load test failed");

    assert_eq!(metrics.request_count, 2);
    assert_eq!(metrics.error_count, 0);
}
