//! Key dates page extraction
//!
//! Each `.dataview ul div` row holds a label span followed by the date.

use crate::model::DatesUpdate;
use crate::parser::details::required_items;
use crate::parser::text::parse_date;
use crate::parser::{item_value, ExtractError};
use chrono::NaiveDate;
use scraper::{ElementRef, Html, Selector};
use std::sync::LazyLock;

static ROWS: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse(".dataview ul div").expect("valid dates selector"));

/// A milestone on the key dates page
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DateField {
    DateReceived,
    DateFirstAdvertised,
    DateRegistered,
    DateFirstSiteNotice,
    DateValid,
    OnNoticeTo,
    DateValidated,
    TargetDate,
    StatConsExpiryDate,
    DecisionExpiryDate,
    FirstConsultationDate,
    ExtendedExpiryDate,
}

/// Row positions on the key dates page
pub const KEY_DATES: &[(usize, DateField)] = &[
    (0, DateField::DateReceived),
    (1, DateField::DateFirstAdvertised),
    (2, DateField::DateRegistered),
    (3, DateField::DateFirstSiteNotice),
    (4, DateField::DateValid),
    (5, DateField::OnNoticeTo),
    (6, DateField::DateValidated),
    (7, DateField::TargetDate),
    (8, DateField::StatConsExpiryDate),
    (9, DateField::DecisionExpiryDate),
    (10, DateField::FirstConsultationDate),
    (11, DateField::ExtendedExpiryDate),
];

impl DateField {
    pub fn name(&self) -> &'static str {
        match self {
            Self::DateReceived => "date_received",
            Self::DateFirstAdvertised => "date_first_advertised",
            Self::DateRegistered => "date_registered",
            Self::DateFirstSiteNotice => "date_first_site_notice",
            Self::DateValid => "date_valid",
            Self::OnNoticeTo => "on_notice_to",
            Self::DateValidated => "date_validated",
            Self::TargetDate => "target_date",
            Self::StatConsExpiryDate => "stat_cons_expiry_date",
            Self::DecisionExpiryDate => "decision_expiry_date",
            Self::FirstConsultationDate => "first_consultation_date",
            Self::ExtendedExpiryDate => "extended_expiry_date",
        }
    }

    fn slot<'a>(&self, update: &'a mut DatesUpdate) -> &'a mut Option<NaiveDate> {
        match self {
            Self::DateReceived => &mut update.date_received,
            Self::DateFirstAdvertised => &mut update.date_first_advertised,
            Self::DateRegistered => &mut update.date_registered,
            Self::DateFirstSiteNotice => &mut update.date_first_site_notice,
            Self::DateValid => &mut update.date_valid,
            Self::OnNoticeTo => &mut update.on_notice_to,
            Self::DateValidated => &mut update.date_validated,
            Self::TargetDate => &mut update.target_date,
            Self::StatConsExpiryDate => &mut update.stat_cons_expiry_date,
            Self::DecisionExpiryDate => &mut update.decision_expiry_date,
            Self::FirstConsultationDate => &mut update.first_consultation_date,
            Self::ExtendedExpiryDate => &mut update.extended_expiry_date,
        }
    }
}

/// Parses the key dates page
///
/// Rows that hold free text instead of a date stay `None`. Fewer rows than
/// the table needs means the page is not the key dates template.
pub fn parse_dates(html: &str) -> Result<DatesUpdate, ExtractError> {
    let document = Html::parse_document(html);
    let rows: Vec<ElementRef> = document.select(&ROWS).collect();

    let expected = required_items(KEY_DATES);
    if rows.len() < expected {
        return Err(ExtractError::TooFewItems {
            container: ".dataview ul div",
            expected,
            found: rows.len(),
        });
    }

    let mut update = DatesUpdate::default();
    for (index, field) in KEY_DATES {
        *field.slot(&mut update) = parse_date(&item_value(rows[*index]));
    }
    Ok(update)
}
