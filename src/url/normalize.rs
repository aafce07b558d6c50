use crate::UrlError;
use std::fmt;
use url::Url;

/// An absolute, canonical URI used as the de-duplication key everywhere
///
/// Produced only by [`normalize_uri`]: https scheme for scheme-less and
/// http input, lower case, no default port, no query or fragment, no
/// trailing slash except for the root, and the host folded through the
/// configured domain equivalents.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NormalizedUri(Url);

impl NormalizedUri {
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }

    pub fn as_url(&self) -> &Url {
        &self.0
    }

    /// Host of the URI; normalized URIs always have one
    pub fn host(&self) -> &str {
        self.0.host_str().unwrap_or_default()
    }

    pub fn path(&self) -> &str {
        self.0.path()
    }

    /// Path plus query string, the text exclusion patterns are matched against
    pub fn path_and_query(&self) -> String {
        match self.0.query() {
            Some(query) => format!("{}?{}", self.0.path(), query),
            None => self.0.path().to_string(),
        }
    }
}

impl fmt::Display for NormalizedUri {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.0.as_str())
    }
}

impl AsRef<str> for NormalizedUri {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

/// Normalizes an href, sitemap `<loc>` or list-file line into a [`NormalizedUri`]
///
/// # Normalization Steps
///
/// 1. Trim whitespace, lower-case everything, strip leading `~`
/// 2. Protocol: `//host/...` and `http://` become `https://`
/// 3. Root-relative input (`/...`) resolves against the host of `found_at`,
///    falling back to `primary_domain`
/// 4. Scheme-less input gets `https://` prepended
/// 5. Ports 80 and 443 are dropped
/// 6. Query string and fragment are removed
/// 7. A trailing slash is removed unless the path is the root
/// 8. Hosts listed in `domain_equivalents` are rewritten to `primary_domain`
///
/// The function is pure; callers decide whether a failure is worth logging.
///
/// # Examples
///
/// ```
/// use sitesurge::url::normalize_uri;
///
/// let equivalents = vec!["www.example.com".to_string()];
/// let uri = normalize_uri("http://WWW.EXAMPLE.COM/Page/?q=1", Some("example.com"), &equivalents, None).unwrap();
/// assert_eq!(uri.as_str(), "https://example.com/page");
/// ```
pub fn normalize_uri(
    raw: &str,
    primary_domain: Option<&str>,
    domain_equivalents: &[String],
    found_at: Option<&str>,
) -> Result<NormalizedUri, UrlError> {
    let mut candidate = raw.trim().to_lowercase();
    candidate = candidate.trim_start_matches('~').to_string();

    if candidate.is_empty() {
        return Err(UrlError::Empty);
    }

    let primary_domain = primary_domain
        .map(|d| d.trim().to_lowercase())
        .filter(|d| !d.is_empty());

    if let Some(rest) = candidate.strip_prefix("//") {
        candidate = format!("https://{}", rest);
    } else if let Some(rest) = candidate.strip_prefix("http://") {
        candidate = format!("https://{}", rest);
    }

    if candidate.starts_with('/') {
        let host = match found_at.map(str::trim).filter(|f| !f.is_empty()) {
            Some(found_at) => Url::parse(found_at)
                .map_err(|e| UrlError::Parse(e.to_string()))?
                .host_str()
                .map(str::to_lowercase),
            None => primary_domain.clone(),
        }
        .ok_or(UrlError::MissingDomain)?;

        let base = Url::parse(&format!("https://{}", host))
            .map_err(|e| UrlError::Parse(e.to_string()))?;
        candidate = base
            .join(&candidate)
            .map_err(|e| UrlError::Parse(e.to_string()))?
            .to_string();
    }

    if !candidate.contains("://") {
        candidate = format!("https://{}", candidate);
    }

    let mut url = Url::parse(&candidate).map_err(|e| UrlError::Parse(e.to_string()))?;

    match url.host_str() {
        Some(host) if !host.is_empty() => {}
        _ => return Err(UrlError::MissingDomain),
    }

    if matches!(url.port(), Some(80) | Some(443)) {
        url.set_port(None)
            .map_err(|_| UrlError::Malformed(format!("cannot clear port of {}", url)))?;
    }

    url.set_query(None);
    url.set_fragment(None);

    let path = url.path();
    if path.len() > 1 && path.ends_with('/') {
        let trimmed = path.trim_end_matches('/').to_string();
        url.set_path(&trimmed);
    }

    if let Some(primary) = &primary_domain {
        let host = url.host_str().unwrap_or_default();
        if domain_equivalents
            .iter()
            .any(|alt| alt.trim().eq_ignore_ascii_case(host))
        {
            url.set_host(Some(primary))
                .map_err(|e| UrlError::Malformed(format!("Failed to set host: {}", e)))?;
        }
    }

    // The parser emits upper-case percent escapes; fold them so that
    // normalizing an already normalized URI is a no-op.
    let serialized = url.as_str();
    if serialized.contains('%') {
        url = Url::parse(&serialized.to_lowercase()).map_err(|e| UrlError::Parse(e.to_string()))?;
    }

    Ok(NormalizedUri(url))
}

/// Normalizer bound to one job's primary domain and its equivalents
#[derive(Debug, Clone, Default)]
pub struct UriNormalizer {
    primary_domain: Option<String>,
    domain_equivalents: Vec<String>,
}

impl UriNormalizer {
    pub fn new(primary_domain: Option<String>, domain_equivalents: Vec<String>) -> Self {
        Self {
            primary_domain: primary_domain.map(|d| d.trim().to_lowercase()),
            domain_equivalents,
        }
    }

    pub fn primary_domain(&self) -> Option<&str> {
        self.primary_domain.as_deref()
    }

    pub fn normalize(&self, raw: &str, found_at: Option<&str>) -> Result<NormalizedUri, UrlError> {
        normalize_uri(
            raw,
            self.primary_domain.as_deref(),
            &self.domain_equivalents,
            found_at,
        )
    }

    /// True when the URI's host is the primary domain
    ///
    /// Equivalent hosts have already been folded by [`UriNormalizer::normalize`].
    pub fn is_primary_host(&self, uri: &NormalizedUri) -> bool {
        self.primary_domain
            .as_deref()
            .is_some_and(|primary| uri.host().eq_ignore_ascii_case(primary))
    }
}
