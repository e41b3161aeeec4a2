//! Per-record, per-stage freshness decisions

use crate::model::Application;
use crate::state::Stage;
use crate::storage::{IngestStore, StorageResult};
use chrono::NaiveDate;

/// Decides which applications are owed a stage on this run
///
/// A stage is owed when it has never completed for the record or last
/// completed before the run date. Completion is stamped with the run date,
/// so each stage runs at most once per record per calendar day.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FreshnessTracker {
    run_date: NaiveDate,
}

impl FreshnessTracker {
    pub fn new(run_date: NaiveDate) -> Self {
        Self { run_date }
    }

    /// The date completed stages are stamped with
    pub fn run_date(&self) -> NaiveDate {
        self.run_date
    }

    /// Whether a stage last completed on `last_scraped` is owed again
    pub fn is_owed(&self, last_scraped: Option<NaiveDate>) -> bool {
        match last_scraped {
            None => true,
            Some(date) => date < self.run_date,
        }
    }

    /// Owed applications for `stage`, newest `date_received` first
    pub fn select<S: IngestStore + ?Sized>(
        &self,
        store: &S,
        stage: Stage,
    ) -> StorageResult<Vec<Application>> {
        let mut owed = store.owed_applications(stage, self.run_date)?;
        owed.retain(|app| self.is_owed(app.stage_date(stage)));
        Ok(owed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ListingUpdate;
    use crate::storage::SqliteStore;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_is_owed() {
        let tracker = FreshnessTracker::new(date(2024, 6, 10));
        assert!(tracker.is_owed(None));
        assert!(tracker.is_owed(Some(date(2024, 6, 9))));
        assert!(!tracker.is_owed(Some(date(2024, 6, 10))));
        // A clock that went backwards still counts as fresh
        assert!(!tracker.is_owed(Some(date(2024, 6, 11))));
    }

    #[test]
    fn test_same_day_not_reselected_yesterday_is() {
        let mut store = SqliteStore::new_in_memory().unwrap();
        let today = date(2024, 6, 10);
        for reference in ["TODAY", "YESTERDAY"] {
            store
                .upsert_application(reference, &ListingUpdate::default())
                .unwrap();
        }
        store
            .mark_stage_scraped("TODAY", Stage::Details, today)
            .unwrap();
        store
            .mark_stage_scraped("YESTERDAY", Stage::Details, date(2024, 6, 9))
            .unwrap();

        let tracker = FreshnessTracker::new(today);
        let owed: Vec<String> = tracker
            .select(&store, Stage::Details)
            .unwrap()
            .into_iter()
            .map(|app| app.council_reference)
            .collect();
        assert_eq!(owed, vec!["YESTERDAY"]);

        // Other stages keep their own dates
        assert_eq!(tracker.select(&store, Stage::Dates).unwrap().len(), 2);
    }
}
