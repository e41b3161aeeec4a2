//! SQLite storage implementation
//!
//! This module provides a SQLite-based implementation of the IngestStore
//! trait.

use crate::model::{Application, ApplicationPatch, Document, FieldValue};
use crate::state::Stage;
use crate::storage::schema::initialize_schema;
use crate::storage::traits::{IngestStore, StorageError, StorageResult};
use crate::storage::{RunRecord, RunStatus, RunSummary, StageReport};
use chrono::{NaiveDate, Utc};
use rusqlite::types::ToSqlOutput;
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Row, ToSql};
use std::path::Path;
use uuid::Uuid;

/// Every column of `applications`, in schema order
const APPLICATION_COLUMNS: &str = "council_reference, uuid, created_at, updated_at, \
     la_name, la_slug, la_gss, \
     date_scraped, date_details_scraped, date_dates_scraped, date_documents_scraped, \
     address, description, status, date_received, decision, info_url, \
     on_notice_to, recommendation, date_committee, date_appeal_lodged, appeal_decision, \
     application_type, applicant_name, agent_name, wards, \
     easting, northing, latitude, longitude, \
     appeal_submitted, case_officer_phone, division, case_officer_name, \
     determination_level, existing_land_use, proposed_land_use, \
     documents_url, dates_url, checks_url, meetings_url, constraints_url, site_history_url, \
     date_first_advertised, date_registered, date_first_site_notice, date_valid, \
     date_validated, target_date, stat_cons_expiry_date, decision_expiry_date, \
     first_consultation_date, extended_expiry_date, documents_qty";

const RUN_COLUMNS: &str = "id, started_at, finished_at, run_date, search_fingerprint, status, \
     listed, details_attempted, details_succeeded, details_failed, \
     dates_attempted, dates_succeeded, dates_failed, \
     documents_attempted, documents_succeeded, documents_failed";

/// SQLite storage backend
pub struct SqliteStore {
    conn: Connection,
}

impl SqliteStore {
    /// Opens or creates the dataset file
    ///
    /// The schema is created if missing, so a first run against an empty
    /// file sees empty tables rather than errors.
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the SQLite database file
    pub fn new(path: &Path) -> StorageResult<Self> {
        let conn = Connection::open(path)?;

        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA temp_store = MEMORY;
        ",
        )?;

        initialize_schema(&conn)?;

        Ok(Self { conn })
    }

    /// Creates an in-memory database (for testing)
    #[cfg(test)]
    pub fn new_in_memory() -> StorageResult<Self> {
        let conn = Connection::open_in_memory()?;
        initialize_schema(&conn)?;
        Ok(Self { conn })
    }
}

impl ToSql for FieldValue {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        match self {
            FieldValue::Text(value) => value.to_sql(),
            FieldValue::Date(value) => value.to_sql(),
            FieldValue::Integer(value) => value.to_sql(),
            FieldValue::Real(value) => value.to_sql(),
        }
    }
}

/// Builds and runs the merge upsert for one application
///
/// Only the patch's columns appear in the `DO UPDATE SET` list, so every
/// other column of an existing row is left as it was.
fn upsert_application_on(
    conn: &Connection,
    council_reference: &str,
    patch: &dyn ApplicationPatch,
) -> StorageResult<()> {
    let columns = patch.columns();
    let now = Utc::now().to_rfc3339();
    let uuid = Uuid::new_v4().to_string();

    let mut names = vec!["council_reference", "uuid", "created_at", "updated_at"];
    names.extend(columns.iter().map(|(name, _)| *name));

    let placeholders: Vec<String> = (1..=names.len()).map(|i| format!("?{}", i)).collect();

    let mut assignments = vec!["updated_at = excluded.updated_at".to_string()];
    assignments.extend(
        columns
            .iter()
            .map(|(name, _)| format!("{0} = excluded.{0}", name)),
    );

    let sql = format!(
        "INSERT INTO applications ({}) VALUES ({})
         ON CONFLICT(council_reference) DO UPDATE SET {}",
        names.join(", "),
        placeholders.join(", "),
        assignments.join(", ")
    );

    let mut values: Vec<&dyn ToSql> = vec![&council_reference, &uuid, &now, &now];
    values.extend(columns.iter().map(|(_, value)| value as &dyn ToSql));

    conn.execute(&sql, params_from_iter(values))?;
    Ok(())
}

fn mark_stage_on(
    conn: &Connection,
    council_reference: &str,
    stage: Stage,
    run_date: NaiveDate,
) -> StorageResult<()> {
    let sql = format!(
        "UPDATE applications SET {} = ?1, updated_at = ?2 WHERE council_reference = ?3",
        stage.freshness_column()
    );
    conn.execute(
        &sql,
        params![run_date, Utc::now().to_rfc3339(), council_reference],
    )?;
    Ok(())
}

fn application_from_row(row: &Row) -> rusqlite::Result<Application> {
    Ok(Application {
        council_reference: row.get("council_reference")?,
        uuid: row.get("uuid")?,
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
        la_name: row.get("la_name")?,
        la_slug: row.get("la_slug")?,
        la_gss: row.get("la_gss")?,

        date_scraped: row.get("date_scraped")?,
        date_details_scraped: row.get("date_details_scraped")?,
        date_dates_scraped: row.get("date_dates_scraped")?,
        date_documents_scraped: row.get("date_documents_scraped")?,

        address: row.get("address")?,
        description: row.get("description")?,
        status: row.get("status")?,
        date_received: row.get("date_received")?,
        decision: row.get("decision")?,
        info_url: row.get("info_url")?,

        on_notice_to: row.get("on_notice_to")?,
        recommendation: row.get("recommendation")?,
        date_committee: row.get("date_committee")?,
        date_appeal_lodged: row.get("date_appeal_lodged")?,
        appeal_decision: row.get("appeal_decision")?,
        application_type: row.get("application_type")?,
        applicant_name: row.get("applicant_name")?,
        agent_name: row.get("agent_name")?,
        wards: row.get("wards")?,
        easting: row.get("easting")?,
        northing: row.get("northing")?,
        latitude: row.get("latitude")?,
        longitude: row.get("longitude")?,
        appeal_submitted: row.get("appeal_submitted")?,
        case_officer_phone: row.get("case_officer_phone")?,
        division: row.get("division")?,
        case_officer_name: row.get("case_officer_name")?,
        determination_level: row.get("determination_level")?,
        existing_land_use: row.get("existing_land_use")?,
        proposed_land_use: row.get("proposed_land_use")?,
        documents_url: row.get("documents_url")?,
        dates_url: row.get("dates_url")?,
        checks_url: row.get("checks_url")?,
        meetings_url: row.get("meetings_url")?,
        constraints_url: row.get("constraints_url")?,
        site_history_url: row.get("site_history_url")?,

        date_first_advertised: row.get("date_first_advertised")?,
        date_registered: row.get("date_registered")?,
        date_first_site_notice: row.get("date_first_site_notice")?,
        date_valid: row.get("date_valid")?,
        date_validated: row.get("date_validated")?,
        target_date: row.get("target_date")?,
        stat_cons_expiry_date: row.get("stat_cons_expiry_date")?,
        decision_expiry_date: row.get("decision_expiry_date")?,
        first_consultation_date: row.get("first_consultation_date")?,
        extended_expiry_date: row.get("extended_expiry_date")?,

        documents_qty: row.get("documents_qty")?,
    })
}

fn document_from_row(row: &Row) -> rusqlite::Result<Document> {
    Ok(Document {
        council_reference: row.get("council_reference")?,
        url: row.get("url")?,
        title: row.get("title")?,
        date_last_seen: row.get("date_last_seen")?,
    })
}

fn stage_report_from_row(row: &Row, prefix: &str) -> rusqlite::Result<StageReport> {
    Ok(StageReport {
        attempted: row.get(format!("{}_attempted", prefix).as_str())?,
        succeeded: row.get(format!("{}_succeeded", prefix).as_str())?,
        failed: row.get(format!("{}_failed", prefix).as_str())?,
    })
}

fn run_from_row(row: &Row) -> rusqlite::Result<RunRecord> {
    Ok(RunRecord {
        id: row.get("id")?,
        started_at: row.get("started_at")?,
        finished_at: row.get("finished_at")?,
        run_date: row.get("run_date")?,
        search_fingerprint: row.get("search_fingerprint")?,
        status: RunStatus::from_db_string(&row.get::<_, String>("status")?)
            .unwrap_or(RunStatus::Running),
        summary: RunSummary {
            listed: row.get("listed")?,
            details: stage_report_from_row(row, "details")?,
            dates: stage_report_from_row(row, "dates")?,
            documents: stage_report_from_row(row, "documents")?,
        },
    })
}

impl IngestStore for SqliteStore {
    // ===== Applications =====

    fn upsert_application(
        &mut self,
        council_reference: &str,
        patch: &dyn ApplicationPatch,
    ) -> StorageResult<()> {
        upsert_application_on(&self.conn, council_reference, patch)
    }

    fn mark_stage_scraped(
        &mut self,
        council_reference: &str,
        stage: Stage,
        run_date: NaiveDate,
    ) -> StorageResult<()> {
        mark_stage_on(&self.conn, council_reference, stage, run_date)
    }

    fn record_stage(
        &mut self,
        council_reference: &str,
        patch: &dyn ApplicationPatch,
        stage: Stage,
        run_date: NaiveDate,
    ) -> StorageResult<()> {
        let tx = self.conn.transaction()?;
        upsert_application_on(&tx, council_reference, patch)?;
        mark_stage_on(&tx, council_reference, stage, run_date)?;
        tx.commit()?;
        Ok(())
    }

    fn get_application(&self, council_reference: &str) -> StorageResult<Option<Application>> {
        let sql = format!(
            "SELECT {} FROM applications WHERE council_reference = ?1",
            APPLICATION_COLUMNS
        );
        let app = self
            .conn
            .query_row(&sql, params![council_reference], application_from_row)
            .optional()?;
        Ok(app)
    }

    fn owed_applications(
        &self,
        stage: Stage,
        run_date: NaiveDate,
    ) -> StorageResult<Vec<Application>> {
        // NULL sorts lowest, so DESC leaves undated applications last
        let sql = format!(
            "SELECT {columns} FROM applications
             WHERE {col} IS NULL OR {col} < ?1
             ORDER BY date_received DESC, council_reference",
            columns = APPLICATION_COLUMNS,
            col = stage.freshness_column()
        );

        let mut stmt = self.conn.prepare(&sql)?;
        let apps = stmt
            .query_map(params![run_date], application_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(apps)
    }

    // ===== Documents =====

    fn upsert_document(&mut self, document: &Document) -> StorageResult<()> {
        self.conn.execute(
            "INSERT INTO documents (council_reference, url, title, date_last_seen)
             VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT(council_reference, url) DO UPDATE SET
                title = excluded.title,
                date_last_seen = excluded.date_last_seen",
            params![
                document.council_reference,
                document.url,
                document.title,
                document.date_last_seen
            ],
        )?;
        Ok(())
    }

    fn documents_for(&self, council_reference: &str) -> StorageResult<Vec<Document>> {
        let mut stmt = self.conn.prepare(
            "SELECT council_reference, url, title, date_last_seen
             FROM documents WHERE council_reference = ?1 ORDER BY url",
        )?;
        let docs = stmt
            .query_map(params![council_reference], document_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(docs)
    }

    // ===== Run Management =====

    fn create_run(
        &mut self,
        run_date: NaiveDate,
        search_fingerprint: &str,
    ) -> StorageResult<i64> {
        let interrupted = self.conn.execute(
            "UPDATE runs SET status = ?1 WHERE status = ?2",
            params![
                RunStatus::Interrupted.to_db_string(),
                RunStatus::Running.to_db_string()
            ],
        )?;
        if interrupted > 0 {
            tracing::warn!(runs = interrupted, "Marked unfinished earlier runs as interrupted");
        }

        let now = Utc::now().to_rfc3339();
        self.conn.execute(
            "INSERT INTO runs (started_at, run_date, search_fingerprint, status)
             VALUES (?1, ?2, ?3, ?4)",
            params![
                now,
                run_date,
                search_fingerprint,
                RunStatus::Running.to_db_string()
            ],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    fn finish_run(
        &mut self,
        run_id: i64,
        status: RunStatus,
        summary: &RunSummary,
    ) -> StorageResult<()> {
        let now = Utc::now().to_rfc3339();
        let updated = self.conn.execute(
            "UPDATE runs SET
                status = ?1, finished_at = ?2, listed = ?3,
                details_attempted = ?4, details_succeeded = ?5, details_failed = ?6,
                dates_attempted = ?7, dates_succeeded = ?8, dates_failed = ?9,
                documents_attempted = ?10, documents_succeeded = ?11, documents_failed = ?12
             WHERE id = ?13",
            params![
                status.to_db_string(),
                now,
                summary.listed,
                summary.details.attempted,
                summary.details.succeeded,
                summary.details.failed,
                summary.dates.attempted,
                summary.dates.succeeded,
                summary.dates.failed,
                summary.documents.attempted,
                summary.documents.succeeded,
                summary.documents.failed,
                run_id
            ],
        )?;

        if updated == 0 {
            return Err(StorageError::RunNotFound(run_id));
        }
        Ok(())
    }

    fn get_run(&self, run_id: i64) -> StorageResult<RunRecord> {
        let sql = format!("SELECT {} FROM runs WHERE id = ?1", RUN_COLUMNS);
        self.conn
            .query_row(&sql, params![run_id], run_from_row)
            .optional()?
            .ok_or(StorageError::RunNotFound(run_id))
    }

    fn get_latest_run(&self) -> StorageResult<Option<RunRecord>> {
        let sql = format!("SELECT {} FROM runs ORDER BY id DESC LIMIT 1", RUN_COLUMNS);
        let run = self.conn.query_row(&sql, [], run_from_row).optional()?;
        Ok(run)
    }

    // ===== Statistics =====

    fn count_applications(&self) -> StorageResult<u64> {
        let count: u64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM applications", [], |row| row.get(0))?;
        Ok(count)
    }

    fn count_documents(&self) -> StorageResult<u64> {
        let count: u64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM documents", [], |row| row.get(0))?;
        Ok(count)
    }

    fn count_owed(&self, stage: Stage, run_date: NaiveDate) -> StorageResult<u64> {
        let sql = format!(
            "SELECT COUNT(*) FROM applications WHERE {col} IS NULL OR {col} < ?1",
            col = stage.freshness_column()
        );
        let count: u64 = self
            .conn
            .query_row(&sql, params![run_date], |row| row.get(0))?;
        Ok(count)
    }
}
