use crate::config::types::{ArchiveConfig, Config, HttpConfig, LoadConfig};
use crate::crawler::parse_header;
use crate::ConfigError;
use reqwest::Method;

/// Validates the entire configuration
///
/// The archive output folder is only required once the archive command
/// actually runs, so it is checked by [`validate_archive_config`] instead.
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_http_config(&config.http)?;
    validate_load_config(&config.load)?;
    validate_archive_settings(&config.archive)?;
    Ok(())
}

/// Validates request settings
pub fn validate_http_config(config: &HttpConfig) -> Result<(), ConfigError> {
    if config.timeout_secs < 1 {
        return Err(ConfigError::Validation(format!(
            "timeout-secs must be >= 1, got {}",
            config.timeout_secs
        )));
    }

    if let Some(user_agent) = &config.user_agent {
        if user_agent.trim().is_empty() {
            return Err(ConfigError::Validation(
                "user-agent cannot be blank".to_string(),
            ));
        }
    }

    for header in &config.headers {
        parse_header(header)?;
    }

    Ok(())
}

/// Validates load test settings
pub fn validate_load_config(config: &LoadConfig) -> Result<(), ConfigError> {
    validate_thread_count(config.threads)?;

    if config.chance_of_404 > 100 {
        return Err(ConfigError::Validation(format!(
            "chance-of-404 must be between 0 and 100, got {}",
            config.chance_of_404
        )));
    }

    parse_method(&config.method)?;

    Ok(())
}

/// Validates archive settings, including the output folder
pub fn validate_archive_config(config: &ArchiveConfig) -> Result<(), ConfigError> {
    validate_archive_settings(config)?;

    if config.output.trim().is_empty() {
        return Err(ConfigError::Validation(
            "archive output path cannot be empty".to_string(),
        ));
    }

    Ok(())
}

fn validate_archive_settings(config: &ArchiveConfig) -> Result<(), ConfigError> {
    validate_thread_count(config.threads)?;

    if let Some(domain) = &config.domain {
        validate_domain_string(domain)?;
    }

    for alt in &config.domain_alts {
        validate_domain_string(alt)?;
    }

    for pattern in &config.exclude_urls {
        if pattern.trim().is_empty() {
            return Err(ConfigError::InvalidPattern(
                "exclude-urls patterns cannot be empty".to_string(),
            ));
        }
    }

    for selector in [
        &config.content_search_include,
        &config.content_search_exclude,
    ]
    .into_iter()
    .flatten()
    {
        if scraper::Selector::parse(selector).is_err() {
            return Err(ConfigError::Validation(format!(
                "invalid CSS selector '{}'",
                selector
            )));
        }
    }

    Ok(())
}

fn validate_thread_count(threads: usize) -> Result<(), ConfigError> {
    if threads < 1 {
        return Err(ConfigError::Validation(format!(
            "threads must be greater than 0, got {}",
            threads
        )));
    }
    Ok(())
}

/// Parses the configured request method; only GET and HEAD are supported
pub fn parse_method(method: &str) -> Result<Method, ConfigError> {
    match method.trim().to_ascii_uppercase().as_str() {
        "GET" => Ok(Method::GET),
        "HEAD" => Ok(Method::HEAD),
        other => Err(ConfigError::Validation(format!(
            "method must be GET or HEAD, got '{}'",
            other
        ))),
    }
}

/// Validates a domain string
fn validate_domain_string(domain: &str) -> Result<(), ConfigError> {
    if domain.is_empty() {
        return Err(ConfigError::InvalidPattern(
            "Domain cannot be empty".to_string(),
        ));
    }

    if !domain
        .chars()
        .all(|c| c.is_alphanumeric() || c == '.' || c == '-')
    {
        return Err(ConfigError::InvalidPattern(format!(
            "Domain '{}' contains invalid characters",
            domain
        )));
    }

    if domain.starts_with('.')
        || domain.ends_with('.')
        || domain.starts_with('-')
        || domain.ends_with('-')
    {
        return Err(ConfigError::InvalidPattern(format!(
            "Domain '{}' cannot start or end with '.' or '-'",
            domain
        )));
    }

    if domain.contains("..") {
        return Err(ConfigError::InvalidPattern(format!(
            "Domain '{}' cannot contain consecutive dots",
            domain
        )));
    }

    Ok(())
}
