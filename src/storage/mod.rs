//! Storage module for persisting harvested data
//!
//! This module handles all database operations for the harvester, including:
//! - SQLite database initialization and schema management
//! - Application upserts that merge per-stage partial updates
//! - Document retention keyed by (reference, url)
//! - Run bookkeeping for `--stats`

mod schema;
mod sqlite;
mod traits;

pub use sqlite::SqliteStore;
pub use traits::{IngestStore, StorageError, StorageResult};

use std::path::Path;

/// Opens (or creates) the dataset at `path`
pub fn open_store(path: &Path) -> StorageResult<SqliteStore> {
    SqliteStore::new(path)
}

/// Outcome counters for one secondary stage
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StageReport {
    /// Records the stage selected as owed
    pub attempted: u64,
    pub succeeded: u64,
    pub failed: u64,
}

impl StageReport {
    pub fn record(&mut self, ok: bool) {
        self.attempted += 1;
        if ok {
            self.succeeded += 1;
        } else {
            self.failed += 1;
        }
    }
}

/// Counters for a whole run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    /// Rows ingested from the listing
    pub listed: u64,
    pub details: StageReport,
    pub dates: StageReport,
    pub documents: StageReport,
}

impl RunSummary {
    /// Total records that failed in any secondary stage
    pub fn total_failed(&self) -> u64 {
        self.details.failed + self.dates.failed + self.documents.failed
    }

    /// Counters for a secondary stage; the listing has none
    pub fn report_mut(&mut self, stage: crate::state::Stage) -> Option<&mut StageReport> {
        use crate::state::Stage;
        match stage {
            Stage::Listing => None,
            Stage::Details => Some(&mut self.details),
            Stage::Dates => Some(&mut self.dates),
            Stage::Documents => Some(&mut self.documents),
        }
    }
}

/// Represents a harvest run
#[derive(Debug, Clone)]
pub struct RunRecord {
    pub id: i64,
    pub started_at: String,
    pub finished_at: Option<String>,
    pub run_date: chrono::NaiveDate,
    pub search_fingerprint: String,
    pub status: RunStatus,
    pub summary: RunSummary,
}

/// Status of a harvest run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    Running,
    Completed,
    /// Superseded while still marked running (the process was killed)
    Interrupted,
    Failed,
}

impl RunStatus {
    pub fn to_db_string(&self) -> &'static str {
        match self {
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Interrupted => "interrupted",
            Self::Failed => "failed",
        }
    }

    pub fn from_db_string(s: &str) -> Option<Self> {
        match s {
            "running" => Some(Self::Running),
            "completed" => Some(Self::Completed),
            "interrupted" => Some(Self::Interrupted),
            "failed" => Some(Self::Failed),
            _ => None,
        }
    }
}

impl std::fmt::Display for RunStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.to_db_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_run_status_roundtrip() {
        for status in &[
            RunStatus::Running,
            RunStatus::Completed,
            RunStatus::Interrupted,
            RunStatus::Failed,
        ] {
            let db_str = status.to_db_string();
            assert_eq!(Some(*status), RunStatus::from_db_string(db_str));
        }
    }

    #[test]
    fn test_run_status_invalid() {
        assert_eq!(RunStatus::from_db_string("invalid"), None);
    }

    #[test]
    fn test_stage_report_record() {
        let mut report = StageReport::default();
        report.record(true);
        report.record(false);
        report.record(true);
        assert_eq!(
            report,
            StageReport {
                attempted: 3,
                succeeded: 2,
                failed: 1
            }
        );
    }
}
