//! Harvest coordinator - main run orchestration logic
//!
//! This module drives one harvest run through its state machine:
//! - Negotiating the search session and fetching the result listing
//! - Ingesting every listing row into the store
//! - Walking the owed records of each secondary stage, one page at a time
//! - Recording run bookkeeping and per-stage counters

use crate::config::{Config, CouncilConfig, PortalUrls};
use crate::crawler::fetcher::PageFetcher;
use crate::crawler::freshness::FreshnessTracker;
use crate::crawler::session::{negotiate_session, search_form_fields};
use crate::crawler::throttle::Throttle;
use crate::model::{Application, DatesUpdate, Document, DocumentsSummary, ListingUpdate};
use crate::parser::{
    parse_dates, parse_details, parse_documents, parse_listing, ExtractError, ParsedDetails,
};
use crate::state::{CrawlState, Stage};
use crate::storage::{IngestStore, RunStatus, RunSummary, StorageResult};
use crate::HarvestError;
use chrono::NaiveDate;
use url::Url;

/// Everything a run needs that is fixed before the first request
///
/// Built once at startup and passed to the coordinator; no component reads
/// configuration or the clock on its own.
#[derive(Debug, Clone)]
pub struct HarvestContext {
    /// Date stamped onto every stage completed in this run
    pub run_date: NaiveDate,
    pub urls: PortalUrls,
    pub page_size: u32,
    pub council: CouncilConfig,
    /// Search form variables, without the ASP.NET tokens
    pub search_form: Vec<(String, String)>,
    pub search_fingerprint: String,
}

impl HarvestContext {
    pub fn from_config(config: &Config, run_date: NaiveDate) -> Result<Self, HarvestError> {
        Ok(Self {
            run_date,
            urls: config.portal.urls()?,
            page_size: config.portal.page_size,
            council: config.council.clone(),
            search_form: search_form_fields(&config.search),
            search_fingerprint: crate::config::search_fingerprint(&config.search),
        })
    }
}

/// What a secondary page yielded
enum StageOutput {
    Details(ParsedDetails),
    Dates(DatesUpdate),
    Documents(Vec<Document>),
}

/// Main harvest coordinator
pub struct Coordinator<F, S> {
    context: HarvestContext,
    fetcher: F,
    store: S,
    throttle: Throttle,
    freshness: FreshnessTracker,
    state: CrawlState,
    summary: RunSummary,
    listing_html: Option<String>,
}

impl<F: PageFetcher, S: IngestStore> Coordinator<F, S> {
    /// Creates a coordinator in the initial state
    ///
    /// # Arguments
    ///
    /// * `context` - Run-wide values (run date, URLs, search form)
    /// * `fetcher` - The session-bound page fetcher
    /// * `store` - Where applications and documents are written
    /// * `throttle` - Pause taken before every secondary page fetch
    pub fn new(context: HarvestContext, fetcher: F, store: S, throttle: Throttle) -> Self {
        let freshness = FreshnessTracker::new(context.run_date);
        Self {
            context,
            fetcher,
            store,
            throttle,
            freshness,
            state: CrawlState::initial(),
            summary: RunSummary::default(),
            listing_html: None,
        }
    }

    pub fn state(&self) -> CrawlState {
        self.state
    }

    pub fn summary(&self) -> RunSummary {
        self.summary
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn into_store(self) -> S {
        self.store
    }

    /// Runs the harvest to completion
    ///
    /// A run row is created first and closed at the end as `completed`, or
    /// `failed` if the session could not be negotiated or the store failed.
    /// Record-level failures never end the run; they only show up in the
    /// counters.
    pub async fn run(&mut self) -> Result<RunSummary, HarvestError> {
        let run_id = self
            .store
            .create_run(self.context.run_date, &self.context.search_fingerprint)?;
        tracing::info!("Starting harvest run {} for {}", run_id, self.context.run_date);

        let result = self.drive().await;
        let status = if result.is_ok() {
            RunStatus::Completed
        } else {
            RunStatus::Failed
        };

        if let Err(e) = self.store.finish_run(run_id, status, &self.summary) {
            if result.is_ok() {
                return Err(e.into());
            }
            tracing::error!("Failed to record end of run {}: {}", run_id, e);
        }

        result?;

        tracing::info!(
            "Harvest run {} complete: {} listed, details {}/{}, dates {}/{}, documents {}/{}",
            run_id,
            self.summary.listed,
            self.summary.details.succeeded,
            self.summary.details.attempted,
            self.summary.dates.succeeded,
            self.summary.dates.attempted,
            self.summary.documents.succeeded,
            self.summary.documents.attempted,
        );

        Ok(self.summary)
    }

    /// Steps the state machine until `Done`
    async fn drive(&mut self) -> Result<(), HarvestError> {
        while !self.state.is_terminal() {
            tracing::debug!(state = %self.state, "Entering state");

            match self.state {
                CrawlState::NegotiateSession => {
                    let session = negotiate_session(
                        &self.fetcher,
                        &self.context.urls,
                        self.context.page_size,
                        &self.context.search_form,
                    )
                    .await?;
                    tracing::info!("Search session established: {}", session.results_url);
                    self.listing_html = Some(session.listing_html);
                }
                CrawlState::IngestListing => self.ingest_listing()?,
                CrawlState::Details | CrawlState::Dates | CrawlState::Documents => {
                    if let Some(stage) = self.state.stage() {
                        self.scrape_stage(stage).await?;
                    }
                }
                CrawlState::Done => {}
            }

            self.state = self.state.next();
        }

        Ok(())
    }

    /// Upserts every listing row
    fn ingest_listing(&mut self) -> StorageResult<()> {
        let html = self.listing_html.take().unwrap_or_default();
        let rows = parse_listing(&html, &self.context.urls.generic);
        tracing::info!("Found {} applications in search results", rows.len());

        for row in rows {
            let update = ListingUpdate {
                address: row.address,
                description: row.description,
                status: row.status,
                date_received: row.date_received,
                decision: row.decision,
                info_url: row.info_url,
                la_name: Some(self.context.council.name.clone()),
                la_slug: Some(self.context.council.slug.clone()),
                la_gss: Some(self.context.council.gss.clone()),
                date_scraped: Some(self.context.run_date),
            };
            self.store
                .upsert_application(&row.council_reference, &update)?;
            self.summary.listed += 1;
        }

        Ok(())
    }

    /// Processes every record owed `stage`, newest first
    async fn scrape_stage(&mut self, stage: Stage) -> Result<(), HarvestError> {
        let owed = self.freshness.select(&self.store, stage)?;
        let total = owed.len();
        tracing::info!("{} applications owed the {} stage", total, stage);

        for (i, app) in owed.iter().enumerate() {
            tracing::info!(
                "{} of {}: Scraping {} for {}",
                i + 1,
                total,
                stage,
                app.council_reference
            );
            let ok = self.scrape_record(stage, app).await?;
            if let Some(report) = self.summary.report_mut(stage) {
                report.record(ok);
            }
        }

        Ok(())
    }

    /// Fetches and stores one record's page for `stage`
    ///
    /// Returns `Ok(false)` for failures confined to this record, which leave
    /// its freshness date untouched. Only storage errors propagate.
    async fn scrape_record(&mut self, stage: Stage, app: &Application) -> Result<bool, HarvestError> {
        let reference = app.council_reference.as_str();

        let Some(raw_url) = app.stage_url(stage) else {
            tracing::warn!(reference, stage = %stage, "No URL stored for stage, skipping");
            return Ok(false);
        };
        let url = match Url::parse(raw_url) {
            Ok(url) => url,
            Err(e) => {
                tracing::error!(reference, url = raw_url, error = %e, "Stored URL is invalid");
                return Ok(false);
            }
        };

        self.throttle.wait().await;

        let response = match self.fetcher.get(&url).await {
            Ok(response) => response,
            Err(e) => {
                tracing::error!(reference, url = %url, error = %e, "Request failed");
                return Ok(false);
            }
        };
        if !response.is_ok() {
            tracing::error!(
                reference,
                url = %url,
                status = response.status,
                "Unexpected HTTP status {} for {} page",
                response.status,
                stage
            );
            return Ok(false);
        }

        let output = match self.extract(stage, reference, &response.body) {
            Ok(output) => output,
            Err(e) => {
                tracing::error!(reference, url = %url, error = %e, "Failed to extract {} page", stage);
                return Ok(false);
            }
        };

        self.persist(reference, output)?;
        Ok(true)
    }

    fn extract(&self, stage: Stage, reference: &str, body: &str) -> Result<StageOutput, ExtractError> {
        match stage {
            Stage::Details => parse_details(body, &self.context.urls.generic).map(StageOutput::Details),
            Stage::Dates => parse_dates(body).map(StageOutput::Dates),
            Stage::Documents => parse_documents(
                body,
                &self.context.urls.site,
                reference,
                self.context.run_date,
            )
            .map(StageOutput::Documents),
            // Listing rows carry no stage URL, so nothing is fetched for them
            Stage::Listing => Err(ExtractError::MissingContainer("record page")),
        }
    }

    fn persist(&mut self, reference: &str, output: StageOutput) -> StorageResult<()> {
        let run_date = self.context.run_date;

        match output {
            StageOutput::Details(parsed) => {
                if let Some(found) = parsed.council_reference.as_deref() {
                    if found != reference {
                        tracing::warn!(
                            reference,
                            found,
                            "Details page shows a different application number"
                        );
                    }
                }
                self.store
                    .record_stage(reference, &parsed.update, Stage::Details, run_date)
            }
            StageOutput::Dates(update) => {
                self.store
                    .record_stage(reference, &update, Stage::Dates, run_date)
            }
            StageOutput::Documents(documents) => {
                for document in &documents {
                    self.store.upsert_document(document)?;
                }
                tracing::debug!(reference, "Stored {} documents", documents.len());
                let summary = DocumentsSummary {
                    documents_qty: documents.len(),
                };
                self.store
                    .record_stage(reference, &summary, Stage::Documents, run_date)
            }
        }
    }
}
