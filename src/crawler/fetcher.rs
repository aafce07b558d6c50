//! Fetch strategies
//!
//! The worker loop never talks to reqwest directly. It goes through the
//! [`Fetcher`] trait so that the plain HTTP client can be swapped for another
//! strategy (a rendering browser, an in-memory site in tests) without touching
//! the loop itself.

use crate::config::HttpConfig;
use crate::ConfigError;
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, CONTENT_TYPE};
use reqwest::{Client, Method};
use std::time::Duration;
use thiserror::Error;

/// Response of a single fetch
#[derive(Debug, Clone)]
pub struct FetchResponse {
    /// Final URL after redirects
    pub final_url: String,
    /// HTTP status code
    pub status_code: u16,
    /// True when the status is not 2xx
    pub is_error: bool,
    /// Content-Type header value, if any
    pub content_type: Option<String>,
    /// Response body; empty for HEAD requests
    pub body: String,
}

impl FetchResponse {
    pub fn is_not_found(&self) -> bool {
        self.status_code == 404
    }

    /// True when the Content-Type media type is `text/html`
    pub fn is_html(&self) -> bool {
        self.content_type
            .as_deref()
            .and_then(|ct| ct.split(';').next())
            .is_some_and(|media| media.trim().eq_ignore_ascii_case("text/html"))
    }
}

/// Transport-level failures; HTTP error statuses are not errors here
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("Request timeout for {url}")]
    Timeout { url: String },

    #[error("Connection failed for {url}: {message}")]
    Connect { url: String, message: String },

    #[error("Request failed for {url}: {message}")]
    Transport { url: String, message: String },
}

/// A strategy for retrieving one URL
#[async_trait]
pub trait Fetcher: Send + Sync {
    /// Requests `uri` with `method`; headers are part of the strategy's setup
    async fn fetch(&self, uri: &str, method: &Method) -> Result<FetchResponse, FetchError>;
}

/// Parses a "Key: Value" header
///
/// A header with nothing before the colon, or with characters that are not
/// valid in a header, is rejected.
pub fn parse_header(raw: &str) -> Result<(HeaderName, HeaderValue), ConfigError> {
    let invalid = || ConfigError::InvalidHeader(raw.to_string());

    let separator = raw.find(':').filter(|&i| i >= 1).ok_or_else(invalid)?;
    let key = raw[..separator].trim();
    let value = raw[separator + 1..].trim();

    if key.is_empty() {
        return Err(invalid());
    }

    let name = HeaderName::from_bytes(key.as_bytes()).map_err(|_| invalid())?;
    let value = HeaderValue::from_str(value).map_err(|_| invalid())?;
    Ok((name, value))
}

/// Builds the header map applied to every request
pub fn build_headers(raw_headers: &[String]) -> Result<HeaderMap, ConfigError> {
    let mut headers = HeaderMap::new();
    for raw in raw_headers {
        let (name, value) = parse_header(raw)?;
        headers.insert(name, value);
    }
    Ok(headers)
}

/// Builds an HTTP client with the configured user agent, headers and timeout
///
/// The client pools connections and is safe to share between workers.
///
/// # Example
///
/// ```no_run
/// use sitesurge::config::HttpConfig;
/// use sitesurge::crawler::build_http_client;
///
/// let client = build_http_client(&HttpConfig::default()).unwrap();
/// ```
pub fn build_http_client(config: &HttpConfig) -> crate::Result<Client> {
    let headers = build_headers(&config.headers)?;

    let mut builder = Client::builder()
        .default_headers(headers)
        .timeout(Duration::from_secs(config.timeout_secs))
        .connect_timeout(Duration::from_secs(config.timeout_secs.min(10)))
        .gzip(true)
        .brotli(true);

    if let Some(user_agent) = &config.user_agent {
        builder = builder.user_agent(user_agent.clone());
    }

    Ok(builder.build()?)
}

/// Fetch strategy backed by a pooled reqwest client
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    pub fn from_config(config: &HttpConfig) -> crate::Result<Self> {
        Ok(Self::new(build_http_client(config)?))
    }

    pub fn client(&self) -> &Client {
        &self.client
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch(&self, uri: &str, method: &Method) -> Result<FetchResponse, FetchError> {
        let response = self
            .client
            .request(method.clone(), uri)
            .send()
            .await
            .map_err(|e| classify_error(uri, e))?;

        let status = response.status();
        let final_url = response.url().to_string();
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);

        let body = if *method == Method::HEAD {
            String::new()
        } else {
            response.text().await.map_err(|e| classify_error(uri, e))?
        };

        Ok(FetchResponse {
            final_url,
            status_code: status.as_u16(),
            is_error: !status.is_success(),
            content_type,
            body,
        })
    }
}

fn classify_error(uri: &str, error: reqwest::Error) -> FetchError {
    if error.is_timeout() {
        FetchError::Timeout {
            url: uri.to_string(),
        }
    } else if error.is_connect() {
        FetchError::Connect {
            url: uri.to_string(),
            message: error.to_string(),
        }
    } else {
        FetchError::Transport {
            url: uri.to_string(),
            message: error.to_string(),
        }
    }
}
