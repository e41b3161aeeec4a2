//! Search session negotiation
//!
//! The portal only hands out result listings to a client that has loaded the
//! search form, posted it back with the form's anti-forgery tokens and then
//! followed the redirect within the same cookie session.

use crate::config::{PortalUrls, SearchConfig, SearchWindow};
use crate::crawler::fetcher::PageFetcher;
use crate::parser::AspTokens;
use crate::url::with_page_size;
use crate::HarvestError;
use url::Url;

/// An established search with its unpaginated result listing
#[derive(Debug, Clone)]
pub struct SearchSession {
    /// The listing URL after the page-size rewrite
    pub results_url: Url,
    pub listing_html: String,
}

/// Form variables posted with every search, before the ASP.NET tokens
///
/// Days take precedence over months; choosing the day window also clears
/// the month selector.
pub fn search_form_fields(search: &SearchConfig) -> Vec<(String, String)> {
    let mut fields = vec![
        field("cboSelectDateValue", "DATE_RECEIVED"),
        field("csbtnSearch", "Search"),
    ];

    match search.window() {
        Some(SearchWindow::Days(days)) => {
            fields.push(field("cboMonths", ""));
            fields.push(field("cboDays", &days.to_string()));
            fields.push(field("rbGroup", "rbDay"));
        }
        Some(SearchWindow::Months(months)) => {
            fields.push(field("cboMonths", &months.to_string()));
            fields.push(field("rbGroup", "rbMonth"));
        }
        None => {}
    }

    if let Some(status) = &search.status {
        fields.push(field("cboStatusCode", status));
    }

    fields
}

fn field(name: &str, value: &str) -> (String, String) {
    (name.to_string(), value.to_string())
}

/// Runs the three-request search handshake
///
/// 1. GET the search form and read its tokens (must be 200)
/// 2. POST the form variables plus tokens (must be 302 with a `Location`)
/// 3. GET the redirect target with the page size forced (must be 200)
///
/// Any deviation is a `HarvestError::Session`; nothing has been written to
/// the store at this point.
pub async fn negotiate_session<F: PageFetcher + ?Sized>(
    fetcher: &F,
    urls: &PortalUrls,
    page_size: u32,
    form: &[(String, String)],
) -> Result<SearchSession, HarvestError> {
    let search = &urls.search;

    let form_page = fetcher
        .get(search)
        .await
        .map_err(|e| HarvestError::Session(e.to_string()))?;
    if !form_page.is_ok() {
        return Err(HarvestError::Session(format!(
            "search form {} returned HTTP {}",
            search, form_page.status
        )));
    }

    let tokens = AspTokens::extract(&form_page.body)
        .map_err(|e| HarvestError::Session(format!("search form {}: {}", search, e)))?;

    let mut fields = form.to_vec();
    fields.extend(tokens.form_fields());

    tracing::debug!(url = %search, "Posting search form");
    let posted = fetcher
        .post_form(search, &fields)
        .await
        .map_err(|e| HarvestError::Session(e.to_string()))?;
    if posted.status != 302 {
        return Err(HarvestError::Session(format!(
            "search POST to {} returned HTTP {} instead of a redirect",
            search, posted.status
        )));
    }

    let location = posted.location().ok_or_else(|| {
        HarvestError::Session(format!("search redirect from {} has no Location", search))
    })?;
    let redirect = urls.site.join(location.trim()).map_err(|e| {
        HarvestError::Session(format!("bad redirect Location {:?}: {}", location, e))
    })?;
    let results_url = with_page_size(redirect, page_size);

    tracing::debug!(url = %results_url, "Fetching result listing");
    let listing = fetcher
        .get(&results_url)
        .await
        .map_err(|e| HarvestError::Session(e.to_string()))?;
    if !listing.is_ok() {
        return Err(HarvestError::Session(format!(
            "result listing {} returned HTTP {}",
            results_url, listing.status
        )));
    }

    Ok(SearchSession {
        results_url,
        listing_html: listing.body,
    })
}
