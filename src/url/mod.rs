//! URL handling module for Sitesurge
//!
//! This module provides URI normalization (the de-duplication key for every
//! visited set), host extraction, and spider exclusion patterns.

mod domain;
mod matcher;
mod normalize;

pub use domain::{extract_domain, infer_primary_domain};
pub use matcher::{is_excluded, ExclusionPattern};
pub use normalize::{normalize_uri, NormalizedUri, UriNormalizer};
