//! Details page extraction
//!
//! The details page has no machine-readable labels. Two `ul.list` blocks hold
//! `li div` items whose meaning is fixed by position, and a row of
//! `a.FooterLinks` points at the secondary pages. The position tables below
//! are the whole contract with the portal template: when the template moves a
//! field, the table is the only thing to edit.

use crate::geo::osgb36_to_wgs84;
use crate::model::DetailsUpdate;
use crate::parser::text::{clean_text, extract_phone, parse_date, parse_grid_reference};
use crate::parser::{item_value, ExtractError};
use crate::url::resolve_link;
use scraper::{ElementRef, Html, Selector};
use std::sync::LazyLock;
use url::Url;

static LISTS: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("ul.list").expect("valid list selector"));

static ITEMS: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("li div").expect("valid item selector"));

static FOOTER: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("a.FooterLinks").expect("valid footer selector"));

/// A field harvested from one of the two details blocks
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DetailField {
    DateReceived,
    Status,
    OnNoticeTo,
    Recommendation,
    DateCommittee,
    Decision,
    DateAppealLodged,
    AppealDecision,
    /// Read to cross-check the row being updated, never stored
    CouncilReference,
    ApplicationType,
    ApplicantName,
    AgentName,
    Wards,
    /// The combined "Easting ... Northing ..." item
    GridReference,
    AppealSubmitted,
    CaseOfficerPhone,
    Division,
    CaseOfficerName,
    DeterminationLevel,
    ExistingLandUse,
    ProposedLandUse,
}

/// First `ul.list`: Application Progress Summary
pub const PROGRESS_SUMMARY: &[(usize, DetailField)] = &[
    (0, DetailField::DateReceived),
    (1, DetailField::Status),
    (2, DetailField::OnNoticeTo),
    (3, DetailField::Recommendation),
    (4, DetailField::DateCommittee),
    (5, DetailField::Decision),
    (6, DetailField::DateAppealLodged),
    (7, DetailField::AppealDecision),
];

/// Second `ul.list`: Application Details. Positions 1, 3 and 4 are shown on
/// the page but not harvested.
pub const APPLICATION_DETAILS: &[(usize, DetailField)] = &[
    (0, DetailField::CouncilReference),
    (2, DetailField::ApplicationType),
    (5, DetailField::ApplicantName),
    (6, DetailField::AgentName),
    (7, DetailField::Wards),
    (8, DetailField::GridReference),
    (9, DetailField::AppealSubmitted),
    (10, DetailField::AppealDecision),
    (11, DetailField::CaseOfficerPhone),
    (12, DetailField::Division),
    (13, DetailField::CaseOfficerName),
    (14, DetailField::DeterminationLevel),
    (15, DetailField::ExistingLandUse),
    (16, DetailField::ProposedLandUse),
];

/// Secondary pages linked from the details footer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FooterLink {
    Documents,
    Dates,
    Checks,
    Meetings,
    Constraints,
    SiteHistory,
}

/// Footer link positions. Only site history may be absent.
pub const FOOTER_LINKS: &[(usize, FooterLink)] = &[
    (0, FooterLink::Documents),
    (1, FooterLink::Dates),
    (2, FooterLink::Checks),
    (3, FooterLink::Meetings),
    (4, FooterLink::Constraints),
    (5, FooterLink::SiteHistory),
];

/// Footer links that must be present
pub const REQUIRED_FOOTER_LINKS: usize = 5;

impl DetailField {
    /// Column the field is stored in
    pub fn name(&self) -> &'static str {
        match self {
            Self::DateReceived => "date_received",
            Self::Status => "status",
            Self::OnNoticeTo => "on_notice_to",
            Self::Recommendation => "recommendation",
            Self::DateCommittee => "date_committee",
            Self::Decision => "decision",
            Self::DateAppealLodged => "date_appeal_lodged",
            Self::AppealDecision => "appeal_decision",
            Self::CouncilReference => "council_reference",
            Self::ApplicationType => "application_type",
            Self::ApplicantName => "applicant_name",
            Self::AgentName => "agent_name",
            Self::Wards => "wards",
            Self::GridReference => "easting_northing",
            Self::AppealSubmitted => "appeal_submitted",
            Self::CaseOfficerPhone => "case_officer_phone",
            Self::Division => "division",
            Self::CaseOfficerName => "case_officer_name",
            Self::DeterminationLevel => "determination_level",
            Self::ExistingLandUse => "existing_land_use",
            Self::ProposedLandUse => "proposed_land_use",
        }
    }

    /// Reads this field from its item and records it
    ///
    /// Only the grid reference can fail; every other anomaly leaves the field
    /// empty.
    fn apply(self, item: ElementRef, parsed: &mut ParsedDetails) -> Result<(), ExtractError> {
        let value = item_value(item);
        let update = &mut parsed.update;

        match self {
            Self::DateReceived => update.date_received = parse_date(&value),
            Self::Status => update.status = clean_text(&value),
            Self::OnNoticeTo => update.on_notice_to = parse_date(&value),
            Self::Recommendation => update.recommendation = clean_text(&value),
            Self::DateCommittee => update.date_committee = parse_date(&value),
            Self::Decision => update.decision = clean_text(&value),
            // Sometimes holds Yes/No rather than a date; anything else is null
            Self::DateAppealLodged => update.date_appeal_lodged = parse_date(&value),
            Self::AppealDecision => update.appeal_decision = clean_text(&value),
            Self::CouncilReference => parsed.council_reference = clean_text(&value),
            Self::ApplicationType => update.application_type = clean_text(&value),
            Self::ApplicantName => update.applicant_name = clean_text(&value),
            Self::AgentName => update.agent_name = clean_text(&value),
            Self::Wards => update.wards = clean_text(&value),
            Self::GridReference => {
                let full: String = item.text().collect();
                let (easting, northing) = parse_grid_reference(&full).ok_or_else(|| {
                    ExtractError::MissingGridReference(clean_text(&full).unwrap_or_default())
                })?;
                let position = osgb36_to_wgs84(easting, northing)
                    .ok_or(ExtractError::OffGridReference { easting, northing })?;

                update.easting = Some(easting);
                update.northing = Some(northing);
                update.latitude = Some(position.latitude);
                update.longitude = Some(position.longitude);
            }
            Self::AppealSubmitted => update.appeal_submitted = clean_text(&value),
            Self::CaseOfficerPhone => update.case_officer_phone = extract_phone(&value),
            Self::Division => update.division = clean_text(&value.replace('-', "")),
            Self::CaseOfficerName => update.case_officer_name = clean_text(&value),
            Self::DeterminationLevel => update.determination_level = clean_text(&value),
            Self::ExistingLandUse => update.existing_land_use = clean_text(&value),
            Self::ProposedLandUse => update.proposed_land_use = clean_text(&value),
        }

        Ok(())
    }
}

impl FooterLink {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Documents => "documents_url",
            Self::Dates => "dates_url",
            Self::Checks => "checks_url",
            Self::Meetings => "meetings_url",
            Self::Constraints => "constraints_url",
            Self::SiteHistory => "site_history_url",
        }
    }

    fn slot<'a>(&self, update: &'a mut DetailsUpdate) -> &'a mut Option<String> {
        match self {
            Self::Documents => &mut update.documents_url,
            Self::Dates => &mut update.dates_url,
            Self::Checks => &mut update.checks_url,
            Self::Meetings => &mut update.meetings_url,
            Self::Constraints => &mut update.constraints_url,
            Self::SiteHistory => &mut update.site_history_url,
        }
    }

    fn is_required(&self) -> bool {
        !matches!(self, Self::SiteHistory)
    }
}

/// Result of parsing a details page
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParsedDetails {
    /// Reference printed on the page, for cross-checking only
    pub council_reference: Option<String>,
    pub update: DetailsUpdate,
}

/// Number of items a block must have for every position in `table` to exist
pub fn required_items<T>(table: &[(usize, T)]) -> usize {
    table.iter().map(|(index, _)| index + 1).max().unwrap_or(0)
}

/// Parses a details page
///
/// # Arguments
///
/// * `html` - The details page body
/// * `base` - URL the footer links are relative to
///
/// # Returns
///
/// * `Ok(ParsedDetails)` - Every table position was present
/// * `Err(ExtractError)` - A block is missing or short, the grid reference
///   cannot be read, or a required footer link is missing or unusable
pub fn parse_details(html: &str, base: &Url) -> Result<ParsedDetails, ExtractError> {
    let document = Html::parse_document(html);
    let lists: Vec<ElementRef> = document.select(&LISTS).collect();

    let progress = lists
        .first()
        .ok_or(ExtractError::MissingContainer("ul.list (progress summary)"))?;
    let details = lists
        .get(1)
        .ok_or(ExtractError::MissingContainer("ul.list (application details)"))?;

    let mut parsed = ParsedDetails::default();
    apply_table(*progress, "progress summary", PROGRESS_SUMMARY, &mut parsed)?;
    apply_table(*details, "application details", APPLICATION_DETAILS, &mut parsed)?;
    apply_footer_links(&document, base, &mut parsed.update)?;

    Ok(parsed)
}

fn apply_table(
    list: ElementRef,
    container: &'static str,
    table: &[(usize, DetailField)],
    parsed: &mut ParsedDetails,
) -> Result<(), ExtractError> {
    let items: Vec<ElementRef> = list.select(&ITEMS).collect();
    let expected = required_items(table);
    if items.len() < expected {
        return Err(ExtractError::TooFewItems {
            container,
            expected,
            found: items.len(),
        });
    }

    for (index, field) in table {
        field.apply(items[*index], parsed)?;
    }
    Ok(())
}

fn apply_footer_links(
    document: &Html,
    base: &Url,
    update: &mut DetailsUpdate,
) -> Result<(), ExtractError> {
    let links: Vec<ElementRef> = document.select(&FOOTER).collect();
    if links.len() < REQUIRED_FOOTER_LINKS {
        return Err(ExtractError::TooFewItems {
            container: "a.FooterLinks",
            expected: REQUIRED_FOOTER_LINKS,
            found: links.len(),
        });
    }

    for (index, link) in FOOTER_LINKS {
        let Some(anchor) = links.get(*index) else {
            continue;
        };
        let href = anchor.value().attr("href").unwrap_or_default();

        match resolve_link(base, href) {
            Ok(url) => *link.slot(update) = Some(url.to_string()),
            Err(e) if link.is_required() => return Err(e.into()),
            Err(_) => {}
        }
    }
    Ok(())
}
