//! The Application record and its per-stage partial updates
//!
//! Rows are created by the listing pass and then mutated in place by later
//! stages. Each stage produces its own update struct; the store writes only
//! the columns an update reports, so fields owned by other stages survive.

use crate::state::Stage;
use chrono::NaiveDate;

/// A single column value destined for the `applications` table
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Text(Option<String>),
    Date(Option<NaiveDate>),
    Integer(Option<i64>),
    Real(Option<f64>),
}

/// A partial update to one application row
pub trait ApplicationPatch {
    /// Columns this update writes, paired with their new values.
    /// Columns not listed keep whatever the row already holds.
    fn columns(&self) -> Vec<(&'static str, FieldValue)>;
}

/// Collects columns for a patch, either keeping or skipping empty values
struct Columns {
    keep_empty: bool,
    inner: Vec<(&'static str, FieldValue)>,
}

impl Columns {
    /// Every column is written, `None` included
    fn overwrite() -> Self {
        Self {
            keep_empty: true,
            inner: Vec::new(),
        }
    }

    /// Only columns holding a value are written
    fn present_only() -> Self {
        Self {
            keep_empty: false,
            inner: Vec::new(),
        }
    }

    fn text(&mut self, name: &'static str, value: &Option<String>) {
        if self.keep_empty || value.is_some() {
            self.inner.push((name, FieldValue::Text(value.clone())));
        }
    }

    fn date(&mut self, name: &'static str, value: Option<NaiveDate>) {
        if self.keep_empty || value.is_some() {
            self.inner.push((name, FieldValue::Date(value)));
        }
    }

    fn integer(&mut self, name: &'static str, value: Option<i64>) {
        if self.keep_empty || value.is_some() {
            self.inner.push((name, FieldValue::Integer(value)));
        }
    }

    fn real(&mut self, name: &'static str, value: Option<f64>) {
        if self.keep_empty || value.is_some() {
            self.inner.push((name, FieldValue::Real(value)));
        }
    }

    fn into_inner(self) -> Vec<(&'static str, FieldValue)> {
        self.inner
    }
}

/// A stored planning application
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Application {
    // ===== Identity =====
    pub council_reference: String,
    pub uuid: String,
    pub created_at: String,
    pub updated_at: String,
    pub la_name: Option<String>,
    pub la_slug: Option<String>,
    pub la_gss: Option<String>,

    // ===== Freshness =====
    pub date_scraped: Option<NaiveDate>,
    pub date_details_scraped: Option<NaiveDate>,
    pub date_dates_scraped: Option<NaiveDate>,
    pub date_documents_scraped: Option<NaiveDate>,

    // ===== Listing =====
    pub address: Option<String>,
    pub description: Option<String>,
    pub status: Option<String>,
    pub date_received: Option<NaiveDate>,
    pub decision: Option<String>,
    pub info_url: Option<String>,

    // ===== Details =====
    pub on_notice_to: Option<NaiveDate>,
    pub recommendation: Option<String>,
    pub date_committee: Option<NaiveDate>,
    pub date_appeal_lodged: Option<NaiveDate>,
    pub appeal_decision: Option<String>,
    pub application_type: Option<String>,
    pub applicant_name: Option<String>,
    pub agent_name: Option<String>,
    pub wards: Option<String>,
    pub easting: Option<i64>,
    pub northing: Option<i64>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub appeal_submitted: Option<String>,
    pub case_officer_phone: Option<String>,
    pub division: Option<String>,
    pub case_officer_name: Option<String>,
    pub determination_level: Option<String>,
    pub existing_land_use: Option<String>,
    pub proposed_land_use: Option<String>,
    pub documents_url: Option<String>,
    pub dates_url: Option<String>,
    pub checks_url: Option<String>,
    pub meetings_url: Option<String>,
    pub constraints_url: Option<String>,
    pub site_history_url: Option<String>,

    // ===== Dates =====
    pub date_first_advertised: Option<NaiveDate>,
    pub date_registered: Option<NaiveDate>,
    pub date_first_site_notice: Option<NaiveDate>,
    pub date_valid: Option<NaiveDate>,
    pub date_validated: Option<NaiveDate>,
    pub target_date: Option<NaiveDate>,
    pub stat_cons_expiry_date: Option<NaiveDate>,
    pub decision_expiry_date: Option<NaiveDate>,
    pub first_consultation_date: Option<NaiveDate>,
    pub extended_expiry_date: Option<NaiveDate>,

    // ===== Documents =====
    pub documents_qty: Option<i64>,
}

impl Application {
    /// The freshness date recorded for a stage
    pub fn stage_date(&self, stage: Stage) -> Option<NaiveDate> {
        match stage {
            Stage::Listing => self.date_scraped,
            Stage::Details => self.date_details_scraped,
            Stage::Dates => self.date_dates_scraped,
            Stage::Documents => self.date_documents_scraped,
        }
    }

    /// URL of the page a secondary stage fetches for this application
    pub fn stage_url(&self, stage: Stage) -> Option<&str> {
        match stage {
            Stage::Listing => None,
            Stage::Details => self.info_url.as_deref(),
            Stage::Dates => self.dates_url.as_deref(),
            Stage::Documents => self.documents_url.as_deref(),
        }
    }
}

/// Fields written by the listing pass. Every field is overwritten each time
/// the row is listed, including with `None`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ListingUpdate {
    pub address: Option<String>,
    pub description: Option<String>,
    pub status: Option<String>,
    pub date_received: Option<NaiveDate>,
    pub decision: Option<String>,
    pub info_url: Option<String>,
    pub la_name: Option<String>,
    pub la_slug: Option<String>,
    pub la_gss: Option<String>,
    pub date_scraped: Option<NaiveDate>,
}

impl ApplicationPatch for ListingUpdate {
    fn columns(&self) -> Vec<(&'static str, FieldValue)> {
        let mut cols = Columns::overwrite();
        cols.text("address", &self.address);
        cols.text("description", &self.description);
        cols.text("status", &self.status);
        cols.date("date_received", self.date_received);
        cols.text("decision", &self.decision);
        cols.text("info_url", &self.info_url);
        cols.text("la_name", &self.la_name);
        cols.text("la_slug", &self.la_slug);
        cols.text("la_gss", &self.la_gss);
        cols.date("date_scraped", self.date_scraped);
        cols.into_inner()
    }
}

/// Fields harvested from the details page
///
/// An empty text field is written as null. An unparseable date, a missing
/// phone number or a missing site history link leaves the stored value
/// alone.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DetailsUpdate {
    // Progress summary
    pub date_received: Option<NaiveDate>,
    pub status: Option<String>,
    pub on_notice_to: Option<NaiveDate>,
    pub recommendation: Option<String>,
    pub date_committee: Option<NaiveDate>,
    pub decision: Option<String>,
    pub date_appeal_lodged: Option<NaiveDate>,
    pub appeal_decision: Option<String>,

    // Application details
    pub application_type: Option<String>,
    pub applicant_name: Option<String>,
    pub agent_name: Option<String>,
    pub wards: Option<String>,
    pub easting: Option<i64>,
    pub northing: Option<i64>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub appeal_submitted: Option<String>,
    pub case_officer_phone: Option<String>,
    pub division: Option<String>,
    pub case_officer_name: Option<String>,
    pub determination_level: Option<String>,
    pub existing_land_use: Option<String>,
    pub proposed_land_use: Option<String>,

    // Footer links
    pub documents_url: Option<String>,
    pub dates_url: Option<String>,
    pub checks_url: Option<String>,
    pub meetings_url: Option<String>,
    pub constraints_url: Option<String>,
    pub site_history_url: Option<String>,
}

impl ApplicationPatch for DetailsUpdate {
    fn columns(&self) -> Vec<(&'static str, FieldValue)> {
        // Text items and the required links are always on the page, so an
        // empty one means the portal cleared it
        let mut cols = Columns::overwrite();
        cols.text("status", &self.status);
        cols.text("recommendation", &self.recommendation);
        cols.text("decision", &self.decision);
        cols.text("appeal_decision", &self.appeal_decision);
        cols.text("application_type", &self.application_type);
        cols.text("applicant_name", &self.applicant_name);
        cols.text("agent_name", &self.agent_name);
        cols.text("wards", &self.wards);
        cols.integer("easting", self.easting);
        cols.integer("northing", self.northing);
        cols.real("latitude", self.latitude);
        cols.real("longitude", self.longitude);
        cols.text("appeal_submitted", &self.appeal_submitted);
        cols.text("division", &self.division);
        cols.text("case_officer_name", &self.case_officer_name);
        cols.text("determination_level", &self.determination_level);
        cols.text("existing_land_use", &self.existing_land_use);
        cols.text("proposed_land_use", &self.proposed_land_use);
        cols.text("documents_url", &self.documents_url);
        cols.text("dates_url", &self.dates_url);
        cols.text("checks_url", &self.checks_url);
        cols.text("meetings_url", &self.meetings_url);
        cols.text("constraints_url", &self.constraints_url);

        // Dates, the phone and the site history link only count when found
        let mut found = Columns::present_only();
        found.date("date_received", self.date_received);
        found.date("on_notice_to", self.on_notice_to);
        found.date("date_committee", self.date_committee);
        found.date("date_appeal_lodged", self.date_appeal_lodged);
        found.text("case_officer_phone", &self.case_officer_phone);
        found.text("site_history_url", &self.site_history_url);

        let mut columns = cols.into_inner();
        columns.extend(found.into_inner());
        columns
    }
}

/// Milestone dates harvested from the key dates page
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DatesUpdate {
    pub date_received: Option<NaiveDate>,
    pub date_first_advertised: Option<NaiveDate>,
    pub date_registered: Option<NaiveDate>,
    pub date_first_site_notice: Option<NaiveDate>,
    pub date_valid: Option<NaiveDate>,
    pub on_notice_to: Option<NaiveDate>,
    pub date_validated: Option<NaiveDate>,
    pub target_date: Option<NaiveDate>,
    pub stat_cons_expiry_date: Option<NaiveDate>,
    pub decision_expiry_date: Option<NaiveDate>,
    pub first_consultation_date: Option<NaiveDate>,
    pub extended_expiry_date: Option<NaiveDate>,
}

impl ApplicationPatch for DatesUpdate {
    fn columns(&self) -> Vec<(&'static str, FieldValue)> {
        let mut cols = Columns::present_only();
        cols.date("date_received", self.date_received);
        cols.date("date_first_advertised", self.date_first_advertised);
        cols.date("date_registered", self.date_registered);
        cols.date("date_first_site_notice", self.date_first_site_notice);
        cols.date("date_valid", self.date_valid);
        cols.date("on_notice_to", self.on_notice_to);
        cols.date("date_validated", self.date_validated);
        cols.date("target_date", self.target_date);
        cols.date("stat_cons_expiry_date", self.stat_cons_expiry_date);
        cols.date("decision_expiry_date", self.decision_expiry_date);
        cols.date("first_consultation_date", self.first_consultation_date);
        cols.date("extended_expiry_date", self.extended_expiry_date);
        cols.into_inner()
    }
}

/// Summary written after a documents pass
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DocumentsSummary {
    pub documents_qty: usize,
}

impl ApplicationPatch for DocumentsSummary {
    fn columns(&self) -> Vec<(&'static str, FieldValue)> {
        vec![(
            "documents_qty",
            FieldValue::Integer(Some(self.documents_qty as i64)),
        )]
    }
}
