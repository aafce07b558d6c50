//! Output sink trait and errors
//!
//! This module defines the trait interface for result sinks, the
//! destination of the page results of an archive job.

use crate::crawler::PageResult;
use thiserror::Error;

/// Errors that can occur during output operations
#[derive(Debug, Error)]
pub enum OutputError {
    #[error("Failed to write output: {0}")]
    Write(String),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for output operations
pub type OutputResult<T> = Result<T, OutputError>;

/// Destination for archive page results
///
/// Sinks may buffer; nothing is guaranteed to be persisted until
/// [`ResultSink::finish`] returns.
pub trait ResultSink {
    /// Records a batch of page results
    fn write_pages(&mut self, pages: &[PageResult]) -> OutputResult<()>;

    /// Flushes everything written so far
    fn finish(&mut self) -> OutputResult<()>;
}
