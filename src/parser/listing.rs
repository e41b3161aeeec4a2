//! Search result listing extraction
//!
//! The listing is a single `table.display_table`. The first row carries only
//! `th` headers; every other row is one application with six cells:
//!
//! | Cell | Content |
//! |---|---|
//! | 0 | council reference, linking to the details page |
//! | 1 | site address |
//! | 2 | proposal description |
//! | 3 | status |
//! | 4 | date received, or `--` |
//! | 5 | decision |

use crate::parser::text::{clean_text, parse_listing_date};
use crate::url::resolve_link;
use chrono::NaiveDate;
use scraper::{ElementRef, Html, Selector};
use std::sync::LazyLock;
use url::Url;

static ROWS: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("table.display_table tr").expect("valid row selector"));

static CELLS: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("td").expect("valid cell selector"));

static LINK: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("a[href]").expect("valid link selector"));

/// Number of cells a data row must have
pub const LISTING_CELLS: usize = 6;

/// One application as summarised on the result listing
#[derive(Debug, Clone, PartialEq)]
pub struct ListingRow {
    pub council_reference: String,
    /// Absolute details page URL, when the reference cell links to one
    pub info_url: Option<String>,
    pub address: Option<String>,
    pub description: Option<String>,
    pub status: Option<String>,
    pub date_received: Option<NaiveDate>,
    pub decision: Option<String>,
}

/// Parses every data row of the listing, in document order
///
/// Rows without `td` cells (the header) are skipped silently. Rows that are
/// too short or have a blank reference are skipped with a warning; the
/// rest of the listing is still usable.
///
/// # Arguments
///
/// * `html` - The listing page body
/// * `base` - URL the reference links are relative to
pub fn parse_listing(html: &str, base: &Url) -> Vec<ListingRow> {
    let document = Html::parse_document(html);
    let mut rows = Vec::new();

    for (position, row) in document.select(&ROWS).enumerate() {
        let cells: Vec<ElementRef> = row.select(&CELLS).collect();
        if cells.is_empty() {
            continue;
        }

        if cells.len() < LISTING_CELLS {
            tracing::warn!(
                row = position,
                cells = cells.len(),
                "Skipping listing row with too few cells"
            );
            continue;
        }

        match parse_row(&cells, base) {
            Some(parsed) => rows.push(parsed),
            None => tracing::warn!(row = position, "Skipping listing row without a reference"),
        }
    }

    rows
}

fn parse_row(cells: &[ElementRef], base: &Url) -> Option<ListingRow> {
    let council_reference = clean_text(&cell_text(cells[0]))?;

    let info_url = cells[0]
        .select(&LINK)
        .next()
        .and_then(|link| link.value().attr("href"))
        .and_then(|href| match resolve_link(base, href) {
            Ok(url) => Some(url.to_string()),
            Err(e) => {
                tracing::warn!(reference = %council_reference, error = %e, "Unusable details link");
                None
            }
        });

    Some(ListingRow {
        info_url,
        address: clean_text(&cell_text(cells[1])),
        description: clean_text(&cell_text(cells[2])),
        status: clean_text(&cell_text(cells[3])),
        date_received: parse_listing_date(&cell_text(cells[4])),
        decision: clean_text(&cell_text(cells[5])),
        council_reference,
    })
}

fn cell_text(cell: ElementRef) -> String {
    cell.text().collect()
}
