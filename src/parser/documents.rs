//! Documents page extraction

use crate::model::Document;
use crate::parser::text::clean_text;
use crate::parser::ExtractError;
use crate::url::resolve_link;
use chrono::NaiveDate;
use scraper::{Html, Selector};
use std::collections::HashSet;
use std::sync::LazyLock;
use url::Url;

static CONTENT_TABLE: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("#tblContent").expect("valid table selector"));

static DOCUMENT_LINKS: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("#tblContent td a").expect("valid link selector"));

/// Parses the documents page for one application
///
/// Every anchor in the content table is one document. Anchors without a
/// usable `href` are skipped, and a URL listed twice is reported once.
///
/// # Arguments
///
/// * `html` - The documents page body
/// * `base` - URL the document links are relative to
/// * `council_reference` - The application the page belongs to
/// * `seen_on` - Date stamped as `date_last_seen`
pub fn parse_documents(
    html: &str,
    base: &Url,
    council_reference: &str,
    seen_on: NaiveDate,
) -> Result<Vec<Document>, ExtractError> {
    let document = Html::parse_document(html);
    if document.select(&CONTENT_TABLE).next().is_none() {
        return Err(ExtractError::MissingContainer("#tblContent"));
    }

    let mut seen = HashSet::new();
    let mut documents = Vec::new();

    for anchor in document.select(&DOCUMENT_LINKS) {
        let Some(href) = anchor.value().attr("href") else {
            continue;
        };
        let url = match resolve_link(base, href) {
            Ok(url) => url.to_string(),
            Err(e) => {
                tracing::debug!(reference = council_reference, error = %e, "Skipping document link");
                continue;
            }
        };

        if seen.insert(url.clone()) {
            documents.push(Document {
                council_reference: council_reference.to_string(),
                url,
                title: clean_text(&anchor.text().collect::<String>()),
                date_last_seen: seen_on,
            });
        }
    }

    Ok(documents)
}
