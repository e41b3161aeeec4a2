//! Output module for run summaries and dataset statistics
//!
//! This module handles:
//! - Printing the counters of a finished run
//! - Loading and printing dataset statistics for `--stats`

pub mod stats;

pub use stats::{load_statistics, print_statistics, HarvestStatistics};

use crate::storage::RunSummary;

/// Prints the counters of a finished run to stdout
pub fn print_run_summary(summary: &RunSummary) {
    println!("=== Harvest Complete ===\n");
    println!("  Listed: {}", summary.listed);
    println!(
        "  Details: {} of {} succeeded",
        summary.details.succeeded, summary.details.attempted
    );
    println!(
        "  Dates: {} of {} succeeded",
        summary.dates.succeeded, summary.dates.attempted
    );
    println!(
        "  Documents: {} of {} succeeded",
        summary.documents.succeeded, summary.documents.attempted
    );

    if summary.total_failed() > 0 {
        println!(
            "\n  {} records failed and will be retried on the next run",
            summary.total_failed()
        );
    }
}
