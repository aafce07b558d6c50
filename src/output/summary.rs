//! User-facing job summaries
//!
//! Summaries are printed once when a job ends, whether it finished or was
//! cancelled.

use crate::crawler::JobMetrics;

/// Summary lines of a load test
pub fn load_summary_lines(metrics: &JobMetrics) -> Vec<String> {
    vec![
        status_line(metrics),
        rate_line(metrics),
        format!(
            "{} unintended missed requests = {:.2}%",
            metrics.unintended_miss_count,
            metrics.unintended_miss_percent()
        ),
        format!(
            "{} failed requests = {:.2}%",
            metrics.error_count,
            metrics.error_percent()
        ),
    ]
}

/// Summary lines of an archive job
pub fn archive_summary_lines(metrics: &JobMetrics) -> Vec<String> {
    let retrieve_errors = metrics.retrieve_error_count();
    let scan_errors = metrics.scan_error_count();
    let other_errors = metrics.other_error_count();

    vec![
        status_line(metrics),
        rate_line(metrics),
        format!(
            "{} retrieve errors = {:.2}%",
            retrieve_errors,
            metrics.page_percent(retrieve_errors)
        ),
        format!(
            "{} scan errors = {:.2}%",
            scan_errors,
            metrics.page_percent(scan_errors)
        ),
        format!(
            "{} other errors = {:.2}%",
            other_errors,
            metrics.page_percent(other_errors)
        ),
    ]
}

pub fn print_load_summary(metrics: &JobMetrics) {
    for line in load_summary_lines(metrics) {
        println!("{}", line);
    }
}

pub fn print_archive_summary(metrics: &JobMetrics) {
    for line in archive_summary_lines(metrics) {
        println!("{}", line);
    }
}

fn status_line(metrics: &JobMetrics) -> String {
    if metrics.cancelled {
        "Cancelled.".to_string()
    } else {
        "Finished.".to_string()
    }
}

fn rate_line(metrics: &JobMetrics) -> String {
    format!(
        "{} requests in {:.2?} = {:.2} RPS",
        metrics.request_count,
        metrics.elapsed,
        metrics.requests_per_second()
    )
}
