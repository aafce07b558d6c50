//! Output module for job results
//!
//! This module handles:
//! - Writing URL list files
//! - Saving archived HTML
//! - Exporting page results as CSV
//! - Printing job summaries

mod csv_sink;
mod files;
pub mod summary;
mod traits;

pub use csv_sink::{CsvResultSink, RESULTS_FILE_NAME};
pub use files::{html_file_path, safe_file_name, save_html, write_url_list};
pub use summary::{print_archive_summary, print_load_summary};
pub use traits::{OutputError, OutputResult, ResultSink};
