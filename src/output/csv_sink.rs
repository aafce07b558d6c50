//! CSV result sink
//!
//! One row per page; list columns are joined with `;`.

use crate::crawler::PageResult;
use crate::output::{OutputError, OutputResult, ResultSink};
use serde::Serialize;
use std::fs::File;
use std::io::Write;
use std::path::Path;

/// File name of the results CSV inside the archive output folder
pub const RESULTS_FILE_NAME: &str = "results.csv";

#[derive(Debug, Serialize)]
struct PageRow<'a> {
    url: &'a str,
    final_url: String,
    is_redirected: bool,
    is_cross_domain_redirect: bool,
    status_code: Option<u16>,
    is_error: bool,
    is_retrieve_error: bool,
    html_saved: bool,
    is_only_found_by_spider: bool,
    is_scan_error: bool,
    spider_links: String,
    was_search_terms_found: bool,
    search_terms_found_in_html: String,
    search_terms_found_in_text: String,
}

impl<'a> From<&'a PageResult> for PageRow<'a> {
    fn from(page: &'a PageResult) -> Self {
        Self {
            url: &page.url,
            final_url: page
                .final_url
                .as_ref()
                .map(|u| u.to_string())
                .unwrap_or_default(),
            is_redirected: page.is_redirected,
            is_cross_domain_redirect: page.is_cross_domain_redirect,
            status_code: page.status_code,
            is_error: page.is_error,
            is_retrieve_error: page.is_retrieve_error,
            html_saved: page.html_saved,
            is_only_found_by_spider: page.is_only_found_by_spider,
            is_scan_error: page.is_scan_error,
            spider_links: page
                .spider_links
                .iter()
                .map(|l| l.as_str())
                .collect::<Vec<_>>()
                .join(";"),
            was_search_terms_found: page.was_search_terms_found(),
            search_terms_found_in_html: page.search_terms_found_in_html.join(";"),
            search_terms_found_in_text: page.search_terms_found_in_text.join(";"),
        }
    }
}

/// Writes page results as CSV rows with a header
pub struct CsvResultSink<W: Write> {
    writer: csv::Writer<W>,
}

impl CsvResultSink<File> {
    /// Creates (or truncates) a CSV file
    pub fn create(path: &Path) -> OutputResult<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        Ok(Self {
            writer: csv::Writer::from_path(path)?,
        })
    }
}

impl<W: Write> CsvResultSink<W> {
    pub fn from_writer(writer: W) -> Self {
        Self {
            writer: csv::Writer::from_writer(writer),
        }
    }

    /// Flushes and returns the underlying writer
    pub fn into_inner(self) -> OutputResult<W> {
        self.writer
            .into_inner()
            .map_err(|e| OutputError::Write(e.to_string()))
    }
}

impl<W: Write> ResultSink for CsvResultSink<W> {
    fn write_pages(&mut self, pages: &[PageResult]) -> OutputResult<()> {
        for page in pages {
            self.writer.serialize(PageRow::from(page))?;
        }
        Ok(())
    }

    fn finish(&mut self) -> OutputResult<()> {
        self.writer.flush()?;
        Ok(())
    }
}
