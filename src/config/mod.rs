//! Configuration module for Sitesurge
//!
//! This module handles loading, parsing, and validating TOML configuration files.
//! Command-line flags are layered on top of the loaded values by the binary.
//!
//! # Example
//!
//! ```no_run
//! use sitesurge::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("sitesurge.toml")).unwrap();
//! println!("Load test will use {} threads", config.load.threads);
//! ```

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{ArchiveConfig, Config, HttpConfig, LoadConfig};

// Re-export parser functions
pub use parser::{compute_config_hash, load_config, load_config_with_hash};

// Re-export validation entry points
pub use validation::{
    parse_method, validate, validate_archive_config, validate_http_config, validate_load_config,
};
