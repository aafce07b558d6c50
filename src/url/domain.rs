use crate::url::normalize_uri;
use url::Url;

/// Extracts the lower-cased host from a URL
///
/// # Examples
///
/// ```
/// use url::Url;
/// use sitesurge::url::extract_domain;
///
/// let url = Url::parse("https://EXAMPLE.COM/path").unwrap();
/// assert_eq!(extract_domain(&url), Some("example.com".to_string()));
/// ```
pub fn extract_domain(url: &Url) -> Option<String> {
    url.host_str().map(|h| h.to_lowercase())
}

/// Picks the primary domain of a job from its first usable URL
///
/// Entries that do not normalize on their own (relative paths, garbage) are
/// skipped.
pub fn infer_primary_domain<'a, I>(urls: I) -> Option<String>
where
    I: IntoIterator<Item = &'a str>,
{
    urls.into_iter()
        .filter_map(|raw| normalize_uri(raw, None, &[], None).ok())
        .find_map(|uri| extract_domain(uri.as_url()))
}
