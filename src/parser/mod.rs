//! HTML extraction for the portal's page templates
//!
//! # Components
//!
//! - `form`: anti-forgery tokens on the search form
//! - `listing`: rows of the search result listing
//! - `details`, `dates`, `documents`: the three secondary page formats
//! - `text`: field-level cleanup shared by all of them
//!
//! Extraction distinguishes two kinds of trouble. A page whose structure is
//! wrong (containers missing, too few positions) fails with an
//! [`ExtractError`]. A single field that cannot be read is simply `None`.

mod dates;
mod details;
mod documents;
mod form;
mod listing;
mod text;

use crate::UrlError;
use scraper::{ElementRef, Node};
use thiserror::Error;

// Re-export main types and functions
pub use dates::{parse_dates, DateField, KEY_DATES};
pub use details::{
    parse_details, required_items, DetailField, FooterLink, ParsedDetails, APPLICATION_DETAILS,
    FOOTER_LINKS, PROGRESS_SUMMARY, REQUIRED_FOOTER_LINKS,
};
pub use documents::parse_documents;
pub use form::AspTokens;
pub use listing::{parse_listing, ListingRow, LISTING_CELLS};
pub use text::{clean_text, extract_phone, parse_date, parse_grid_reference, parse_listing_date};

/// Structural problems with a scraped page
#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("Expected container {0} not found")]
    MissingContainer(&'static str),

    #[error("{container} has {found} items, expected at least {expected}")]
    TooFewItems {
        container: &'static str,
        expected: usize,
        found: usize,
    },

    #[error("No easting/northing pair in {0:?}")]
    MissingGridReference(String),

    #[error("Grid reference {easting}, {northing} is outside the National Grid")]
    OffGridReference { easting: i64, northing: i64 },

    #[error("Hidden form field {0} not found")]
    MissingToken(&'static str),

    #[error("Unusable link: {0}")]
    Link(#[from] UrlError),
}

/// Text of a template item without its label
///
/// Items look like `<div><span>Label</span> value</div>`. The first `span`
/// child is the label and is skipped; all other text, nested or not, is
/// kept.
pub(crate) fn item_value(item: ElementRef) -> String {
    let mut label_skipped = false;
    let mut value = String::new();

    for child in item.children() {
        match child.value() {
            Node::Text(text) => value.push_str(text),
            Node::Element(element) if !label_skipped && element.name() == "span" => {
                label_skipped = true;
            }
            Node::Element(_) => {
                if let Some(nested) = ElementRef::wrap(child) {
                    value.extend(nested.text());
                }
            }
            _ => {}
        }
    }

    value
}
