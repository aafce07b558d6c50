use crate::ConfigError;

/// A path pattern that removes spider-discovered links from the next pass
///
/// Three forms are supported:
/// 1. Exact: `/search` matches only `/search`
/// 2. Prefix: `/search*` matches `/search`, `/search/results`, ...
/// 3. Contains: `*print*` matches any path containing `print`
///
/// Patterns are lower-cased because normalized URIs are.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExclusionPattern {
    Exact(String),
    Prefix(String),
    Contains(String),
}

impl ExclusionPattern {
    /// Parses a pattern string
    ///
    /// # Examples
    ///
    /// ```
    /// use sitesurge::url::ExclusionPattern;
    ///
    /// assert!(ExclusionPattern::parse("/blog*").unwrap().matches("/blog/post"));
    /// assert!(ExclusionPattern::parse("*print*").unwrap().matches("/a/print/b"));
    /// assert!(!ExclusionPattern::parse("/blog").unwrap().matches("/blog/post"));
    /// ```
    pub fn parse(pattern: &str) -> Result<Self, ConfigError> {
        let pattern = pattern.trim().to_lowercase();

        if pattern.is_empty() {
            return Err(ConfigError::InvalidPattern(
                "exclusion pattern cannot be empty".to_string(),
            ));
        }

        if pattern.len() >= 2 && pattern.starts_with('*') && pattern.ends_with('*') {
            Ok(Self::Contains(pattern[1..pattern.len() - 1].to_string()))
        } else if let Some(prefix) = pattern.strip_suffix('*') {
            Ok(Self::Prefix(prefix.to_string()))
        } else {
            Ok(Self::Exact(pattern))
        }
    }

    /// Parses a list of patterns, failing on the first invalid one
    pub fn parse_all(patterns: &[String]) -> Result<Vec<Self>, ConfigError> {
        patterns.iter().map(|p| Self::parse(p)).collect()
    }

    /// Checks the pattern against a URI's path and query
    pub fn matches(&self, path_and_query: &str) -> bool {
        match self {
            Self::Exact(exact) => path_and_query == exact,
            Self::Prefix(prefix) => path_and_query.starts_with(prefix.as_str()),
            Self::Contains(needle) => path_and_query.contains(needle.as_str()),
        }
    }
}

/// True when any pattern excludes the given path
pub fn is_excluded(patterns: &[ExclusionPattern], path_and_query: &str) -> bool {
    patterns.iter().any(|p| p.matches(path_and_query))
}
