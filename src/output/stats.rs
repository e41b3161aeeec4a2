//! Statistics generation from the harvest database
//!
//! This module provides functionality for extracting and displaying
//! dataset statistics from the storage layer.

use crate::state::Stage;
use crate::storage::{IngestStore, RunRecord, StorageResult};
use chrono::NaiveDate;

/// Dataset statistics summary
#[derive(Debug, Clone)]
pub struct HarvestStatistics {
    /// Date the owed counts were computed for
    pub as_of: NaiveDate,

    /// Total number of applications stored
    pub total_applications: u64,

    /// Total number of documents stored
    pub total_documents: u64,

    /// Applications still owed each secondary stage on `as_of`
    pub owed: Vec<(Stage, u64)>,

    /// The most recent run, if any
    pub latest_run: Option<RunRecord>,
}

/// Loads statistics from storage
///
/// # Arguments
///
/// * `store` - The storage backend to query
/// * `as_of` - Date the owed counts are computed for
pub fn load_statistics<S: IngestStore + ?Sized>(
    store: &S,
    as_of: NaiveDate,
) -> StorageResult<HarvestStatistics> {
    let owed = Stage::SECONDARY
        .iter()
        .map(|stage| store.count_owed(*stage, as_of).map(|count| (*stage, count)))
        .collect::<StorageResult<Vec<_>>>()?;

    Ok(HarvestStatistics {
        as_of,
        total_applications: store.count_applications()?,
        total_documents: store.count_documents()?,
        owed,
        latest_run: store.get_latest_run()?,
    })
}

/// Prints statistics to stdout in a formatted manner
pub fn print_statistics(stats: &HarvestStatistics) {
    println!("=== Harvest Statistics ===\n");

    println!("Overview:");
    println!("  Applications: {}", stats.total_applications);
    println!("  Documents: {}", stats.total_documents);
    println!();

    println!("Owed on {}:", stats.as_of);
    for (stage, count) in &stats.owed {
        let percentage = if stats.total_applications > 0 {
            (*count as f64 / stats.total_applications as f64) * 100.0
        } else {
            0.0
        };
        println!("  {}: {} ({:.1}%)", stage, count, percentage);
    }
    println!();

    match &stats.latest_run {
        Some(run) => {
            println!("Latest Run:");
            println!("  ID: {}", run.id);
            println!("  Run date: {}", run.run_date);
            println!("  Started: {}", run.started_at);
            if let Some(finished) = &run.finished_at {
                println!("  Finished: {}", finished);
            }
            println!("  Status: {}", run.status);
            println!("  Listed: {}", run.summary.listed);
            for (stage, report) in [
                (Stage::Details, run.summary.details),
                (Stage::Dates, run.summary.dates),
                (Stage::Documents, run.summary.documents),
            ] {
                println!(
                    "  {}: {} attempted, {} succeeded, {} failed",
                    stage, report.attempted, report.succeeded, report.failed
                );
            }
        }
        None => println!("No harvest runs recorded yet"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ListingUpdate;
    use crate::storage::{RunStatus, RunSummary, SqliteStore};

    #[test]
    fn test_load_statistics_empty() {
        let store = SqliteStore::new_in_memory().unwrap();
        let today = NaiveDate::from_ymd_opt(2024, 6, 10).unwrap();
        let stats = load_statistics(&store, today).unwrap();

        assert_eq!(stats.total_applications, 0);
        assert_eq!(stats.total_documents, 0);
        assert_eq!(stats.owed.len(), 3);
        assert!(stats.owed.iter().all(|(_, count)| *count == 0));
        assert!(stats.latest_run.is_none());
    }

    #[test]
    fn test_load_statistics_counts_owed() {
        let mut store = SqliteStore::new_in_memory().unwrap();
        let today = NaiveDate::from_ymd_opt(2024, 6, 10).unwrap();
        store
            .upsert_application("24/P0001", &ListingUpdate::default())
            .unwrap();
        store
            .upsert_application("24/P0002", &ListingUpdate::default())
            .unwrap();
        store
            .mark_stage_scraped("24/P0001", Stage::Details, today)
            .unwrap();
        let run_id = store.create_run(today, "abc").unwrap();
        store
            .finish_run(run_id, RunStatus::Completed, &RunSummary::default())
            .unwrap();

        let stats = load_statistics(&store, today).unwrap();
        assert_eq!(stats.total_applications, 2);
        assert_eq!(
            stats.owed,
            vec![(Stage::Details, 1), (Stage::Dates, 2), (Stage::Documents, 2)]
        );
        assert_eq!(
            stats.latest_run.map(|run| run.status),
            Some(RunStatus::Completed)
        );
    }
}
