//! Crawler module for driving the portal
//!
//! This module contains the run orchestration, including:
//! - The search session handshake
//! - Fetching pages within the cookie-bound session
//! - Freshness selection of owed records per stage
//! - The crawl delay

mod coordinator;
mod fetcher;
mod freshness;
mod session;
mod throttle;

#[cfg(test)]
pub(crate) mod testing;

pub use coordinator::{Coordinator, HarvestContext};
pub use fetcher::{FetchError, FetchResponse, PageFetcher, ReqwestFetcher, DEFAULT_USER_AGENT};
pub use freshness::FreshnessTracker;
pub use session::{negotiate_session, search_form_fields, SearchSession};
pub use throttle::{Throttle, MAX_DELAY};

use crate::config::Config;
use crate::storage::{open_store, RunSummary};
use crate::HarvestError;
use chrono::NaiveDate;
use std::path::Path;

/// Runs one harvest against the configured portal and database
///
/// The run date is the local calendar date when the run starts.
pub async fn run_harvest(config: &Config) -> Result<RunSummary, HarvestError> {
    run_harvest_on(config, chrono::Local::now().date_naive()).await
}

/// Runs one harvest with an explicit run date
pub async fn run_harvest_on(config: &Config, run_date: NaiveDate) -> Result<RunSummary, HarvestError> {
    let context = HarvestContext::from_config(config, run_date)?;
    let fetcher = ReqwestFetcher::new(&config.crawler, &context.urls)?;
    let store = open_store(Path::new(&config.output.database_path))?;
    let throttle = Throttle::from_seconds(config.crawler.delay_seconds);

    let mut coordinator = Coordinator::new(context, fetcher, store, throttle);
    coordinator.run().await
}
