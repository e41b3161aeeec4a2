//! Database schema definitions
//!
//! This module contains all SQL schema definitions for the harvest dataset.
//! Dates are ISO `YYYY-MM-DD` text, so string comparison is date comparison.

/// SQL schema for the database
pub const SCHEMA_SQL: &str = r#"
-- Track harvest runs
CREATE TABLE IF NOT EXISTS runs (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    started_at TEXT NOT NULL,
    finished_at TEXT,
    run_date TEXT NOT NULL,
    search_fingerprint TEXT NOT NULL,
    status TEXT NOT NULL,
    listed INTEGER NOT NULL DEFAULT 0,
    details_attempted INTEGER NOT NULL DEFAULT 0,
    details_succeeded INTEGER NOT NULL DEFAULT 0,
    details_failed INTEGER NOT NULL DEFAULT 0,
    dates_attempted INTEGER NOT NULL DEFAULT 0,
    dates_succeeded INTEGER NOT NULL DEFAULT 0,
    dates_failed INTEGER NOT NULL DEFAULT 0,
    documents_attempted INTEGER NOT NULL DEFAULT 0,
    documents_succeeded INTEGER NOT NULL DEFAULT 0,
    documents_failed INTEGER NOT NULL DEFAULT 0
);

-- One row per planning application, merged across stages
CREATE TABLE IF NOT EXISTS applications (
    council_reference TEXT PRIMARY KEY,
    uuid TEXT NOT NULL,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL,
    la_name TEXT,
    la_slug TEXT,
    la_gss TEXT,

    date_scraped TEXT,
    date_details_scraped TEXT,
    date_dates_scraped TEXT,
    date_documents_scraped TEXT,

    address TEXT,
    description TEXT,
    status TEXT,
    date_received TEXT,
    decision TEXT,
    info_url TEXT,

    on_notice_to TEXT,
    recommendation TEXT,
    date_committee TEXT,
    date_appeal_lodged TEXT,
    appeal_decision TEXT,
    application_type TEXT,
    applicant_name TEXT,
    agent_name TEXT,
    wards TEXT,
    easting INTEGER,
    northing INTEGER,
    latitude REAL,
    longitude REAL,
    appeal_submitted TEXT,
    case_officer_phone TEXT,
    division TEXT,
    case_officer_name TEXT,
    determination_level TEXT,
    existing_land_use TEXT,
    proposed_land_use TEXT,
    documents_url TEXT,
    dates_url TEXT,
    checks_url TEXT,
    meetings_url TEXT,
    constraints_url TEXT,
    site_history_url TEXT,

    date_first_advertised TEXT,
    date_registered TEXT,
    date_first_site_notice TEXT,
    date_valid TEXT,
    date_validated TEXT,
    target_date TEXT,
    stat_cons_expiry_date TEXT,
    decision_expiry_date TEXT,
    first_consultation_date TEXT,
    extended_expiry_date TEXT,

    documents_qty INTEGER
);

CREATE INDEX IF NOT EXISTS idx_applications_date_received ON applications(date_received);

-- Documents are retained forever; date_last_seen tracks the latest sighting
CREATE TABLE IF NOT EXISTS documents (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    council_reference TEXT NOT NULL,
    url TEXT NOT NULL,
    title TEXT,
    date_last_seen TEXT NOT NULL,
    UNIQUE(council_reference, url)
);

CREATE INDEX IF NOT EXISTS idx_documents_reference ON documents(council_reference);
"#;

/// Initializes the database schema
///
/// # Arguments
///
/// * `conn` - The database connection
///
/// # Returns
///
/// * `Ok(())` - Schema initialized successfully
/// * `Err(rusqlite::Error)` - Failed to initialize schema
pub fn initialize_schema(conn: &rusqlite::Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(SCHEMA_SQL)?;
    Ok(())
}
