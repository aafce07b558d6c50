//! Plain files written by the commands
//!
//! - URL list files, one URL per line (`save-urls`)
//! - Archived HTML under `<output>/html/<host>/<path>/<page>.html`

use crate::output::OutputResult;
use std::io::Write;
use std::path::{Path, PathBuf};
use url::Url;

/// Writes one URL per line, creating parent folders as needed
pub fn write_url_list<S: AsRef<str>>(path: &Path, urls: &[S]) -> OutputResult<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }

    let mut file = std::io::BufWriter::new(std::fs::File::create(path)?);
    for url in urls {
        writeln!(file, "{}", url.as_ref())?;
    }
    file.flush()?;

    Ok(())
}

/// Computes where the HTML of `uri` is archived
///
/// The root page and paths ending in a slash are saved as `index.html`.
/// Every path component is made safe for the file system.
///
/// # Example
///
/// ```
/// use sitesurge::output::html_file_path;
/// use std::path::Path;
/// use url::Url;
///
/// let uri = Url::parse("https://example.com/blog/post").unwrap();
/// let path = html_file_path(Path::new("out"), &uri);
/// assert_eq!(path, Path::new("out/html/example.com/blog/post.html"));
/// ```
pub fn html_file_path(output_dir: &Path, uri: &Url) -> PathBuf {
    let host = match uri.port() {
        Some(port) => format!("{}:{}", uri.host_str().unwrap_or_default(), port),
        None => uri.host_str().unwrap_or_default().to_string(),
    };

    let mut path = output_dir.join("html").join(safe_file_name(&host));

    let mut segments: Vec<&str> = uri
        .path_segments()
        .map(|s| s.collect())
        .unwrap_or_default();

    let last = segments.pop().filter(|s| !s.is_empty()).unwrap_or("index");

    for segment in segments.into_iter().filter(|s| !s.is_empty()) {
        path.push(safe_file_name(segment));
    }

    path.push(format!("{}.html", safe_file_name(last)));
    path
}

/// Writes page HTML to its archive location and returns the path
pub async fn save_html(output_dir: &Path, uri: &Url, content: &str) -> OutputResult<PathBuf> {
    let path = html_file_path(output_dir, uri);

    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    tokio::fs::write(&path, content).await?;

    Ok(path)
}

/// Replaces characters that are invalid in file names on common platforms
pub fn safe_file_name(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .map(|c| match c {
            '<' | '>' | ':' | '"' | '/' | '\\' | '|' | '?' | '*' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect();

    match cleaned.as_str() {
        "" | "." | ".." => "_".to_string(),
        _ => cleaned,
    }
}
