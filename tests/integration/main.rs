//! Integration tests for sitesurge
//!
//! These tests use wiremock to create mock HTTP servers for sitemaps and load
//! runs, and an in-memory site for spidering.

mod load_tests;
mod sitemap_tests;
mod spider_tests;
