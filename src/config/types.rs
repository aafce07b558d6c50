use serde::Deserialize;

/// Main configuration structure for Sitesurge
///
/// Every section and key is optional in the TOML file; missing values fall
/// back to the defaults below and may be overridden from the command line.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub http: HttpConfig,
    pub load: LoadConfig,
    pub archive: ArchiveConfig,
}

/// Request settings shared by sitemap resolution, load tests and archiving
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct HttpConfig {
    /// User-Agent header sent with every request
    pub user_agent: Option<String>,

    /// Extra headers in "Key: Value" form
    pub headers: Vec<String>,

    /// Whole-request timeout in seconds
    pub timeout_secs: u64,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            user_agent: None,
            headers: Vec::new(),
            timeout_secs: 30,
        }
    }
}

/// Load test behavior
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct LoadConfig {
    /// Number of concurrent workers
    pub threads: usize,

    /// Seconds to run; zero requests every URL exactly once
    pub seconds: u64,

    /// Percent chance (0-100) of an intentional page miss per request
    pub chance_of_404: u8,

    /// Pause 500ms between requests on each worker
    pub delay: bool,

    /// HTTP method, GET or HEAD
    pub method: String,

    /// Log every request outcome
    pub verbose: bool,

    /// Log unintended misses (404s without a synthetic suffix)
    pub log_misses: bool,
}

impl Default for LoadConfig {
    fn default() -> Self {
        Self {
            threads: 2,
            seconds: 5,
            chance_of_404: 0,
            delay: false,
            method: "GET".to_string(),
            verbose: false,
            log_misses: true,
        }
    }
}

/// Page archiver and spider behavior
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct ArchiveConfig {
    /// Number of concurrent workers per pass
    pub threads: usize,

    /// Pause 500ms between requests on each worker
    pub delay: bool,

    /// Log every request outcome
    pub verbose: bool,

    /// Folder that receives the HTML tree and the results CSV
    pub output: String,

    /// Follow links to local pages found on archived pages
    pub spider: bool,

    /// Primary domain; links elsewhere are never spidered
    pub domain: Option<String>,

    /// Hosts treated as the primary domain (e.g. "www.example.com")
    pub domain_alts: Vec<String>,

    /// Path patterns excluded from spidering: exact, "prefix*" or "*contains*"
    pub exclude_urls: Vec<String>,

    /// Scan pages that redirected to another domain
    pub cross_domain: bool,

    /// Archive responses regardless of their Content-Type
    pub ignore_content_type: bool,

    /// CSS selector limiting the searched content
    pub content_search_include: Option<String>,

    /// CSS selector removed from the searched content
    pub content_search_exclude: Option<String>,

    /// Terms searched for in each page
    pub content_search_terms: Vec<String>,

    /// Only save HTML when a search term was found
    pub only_save_if_term_found: bool,
}

impl Default for ArchiveConfig {
    fn default() -> Self {
        Self {
            threads: 2,
            delay: false,
            verbose: false,
            output: String::new(),
            spider: false,
            domain: None,
            domain_alts: Vec::new(),
            exclude_urls: Vec::new(),
            cross_domain: false,
            ignore_content_type: false,
            content_search_include: None,
            content_search_exclude: None,
            content_search_terms: Vec::new(),
            only_save_if_term_found: false,
        }
    }
}
