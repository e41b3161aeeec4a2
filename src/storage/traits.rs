//! Storage traits and error types
//!
//! This module defines the trait interface for storage backends and
//! associated error types.

use crate::model::{Application, ApplicationPatch, Document};
use crate::state::Stage;
use crate::storage::{RunRecord, RunStatus, RunSummary};
use chrono::NaiveDate;
use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Run not found: {0}")]
    RunNotFound(i64),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Trait for the dataset the harvester writes into
///
/// Applications are keyed by council reference and documents by
/// (council reference, url). Every write is an upsert, so replaying a stage
/// never duplicates rows.
pub trait IngestStore {
    // ===== Applications =====

    /// Inserts or merges an application
    ///
    /// Only the columns reported by `patch` are written. On insert the row
    /// also gets a fresh `uuid` and `created_at`; `updated_at` is set on
    /// every call.
    fn upsert_application(
        &mut self,
        council_reference: &str,
        patch: &dyn ApplicationPatch,
    ) -> StorageResult<()>;

    /// Sets a stage's freshness date for one application
    fn mark_stage_scraped(
        &mut self,
        council_reference: &str,
        stage: Stage,
        run_date: NaiveDate,
    ) -> StorageResult<()>;

    /// Writes a stage's results and its freshness date together
    ///
    /// Backends that can should make this atomic for the one record.
    fn record_stage(
        &mut self,
        council_reference: &str,
        patch: &dyn ApplicationPatch,
        stage: Stage,
        run_date: NaiveDate,
    ) -> StorageResult<()> {
        self.upsert_application(council_reference, patch)?;
        self.mark_stage_scraped(council_reference, stage, run_date)
    }

    /// Gets an application by reference
    fn get_application(&self, council_reference: &str) -> StorageResult<Option<Application>>;

    /// Applications whose `stage` freshness date is null or before
    /// `run_date`, newest `date_received` first
    fn owed_applications(
        &self,
        stage: Stage,
        run_date: NaiveDate,
    ) -> StorageResult<Vec<Application>>;

    // ===== Documents =====

    /// Inserts a document or refreshes its title and `date_last_seen`
    fn upsert_document(&mut self, document: &Document) -> StorageResult<()>;

    /// All documents ever seen for an application, ordered by URL
    fn documents_for(&self, council_reference: &str) -> StorageResult<Vec<Document>>;

    // ===== Run Management =====

    /// Creates a new run in the `running` state
    ///
    /// Any earlier run still marked `running` is marked `interrupted`.
    fn create_run(&mut self, run_date: NaiveDate, search_fingerprint: &str)
        -> StorageResult<i64>;

    /// Stores the final counters and status of a run
    fn finish_run(
        &mut self,
        run_id: i64,
        status: RunStatus,
        summary: &RunSummary,
    ) -> StorageResult<()>;

    /// Gets a run by ID
    fn get_run(&self, run_id: i64) -> StorageResult<RunRecord>;

    /// Gets the most recent run
    fn get_latest_run(&self) -> StorageResult<Option<RunRecord>>;

    // ===== Statistics =====

    /// Gets total application count
    fn count_applications(&self) -> StorageResult<u64>;

    /// Gets total document count
    fn count_documents(&self) -> StorageResult<u64>;

    /// Counts applications owed `stage` on `run_date`
    fn count_owed(&self, stage: Stage, run_date: NaiveDate) -> StorageResult<u64>;
}
