//! Field-level text helpers shared by the page extractors
//!
//! Nothing in here fails: a value that cannot be read yields `None`.

use chrono::NaiveDate;
use regex::Regex;
use std::sync::LazyLock;

static ENTITY_ARTIFACT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"&[A-Za-z0-9#]+;").expect("valid entity regex"));

static MARKUP: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<[^>]*>").expect("valid markup regex"));

static PORTAL_DATE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\d{2}-\d{2}-\d{4}").expect("valid date regex"));

static LISTING_DATE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(\d{2})[-/](\d{2})[-/](\d{4})").expect("valid listing date regex")
});

static DIGIT_RUN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\d+").expect("valid digit regex"));

static EASTING: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)easting\D*(\d+)").expect("valid easting regex"));

static NORTHING: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)northing\D*(\d+)").expect("valid northing regex"));

/// Placeholder the listing shows when an application has no received date
pub const NO_DATE: &str = "--";

/// Normalises a scraped text value
///
/// Strips entity artifacts (`&nbsp;` left undecoded by the portal's double
/// encoding) and any nested markup, then collapses whitespace runs (Unicode
/// spaces included) to single spaces and trims both ends. Collapsing also
/// folds the line breaks inside multi-line addresses.
///
/// # Returns
///
/// `None` when nothing but whitespace remains
pub fn clean_text(raw: &str) -> Option<String> {
    let without_entities = ENTITY_ARTIFACT.replace_all(raw, " ");
    let without_markup = MARKUP.replace_all(&without_entities, " ");

    let cleaned = without_markup.split_whitespace().collect::<Vec<_>>().join(" ");
    if cleaned.is_empty() {
        None
    } else {
        Some(cleaned)
    }
}

/// Parses the first `dd-mm-yyyy` date found in a value
///
/// Free text such as "Pending" or "Not Available" yields `None`, as does a
/// date-shaped string that is not a real calendar date.
pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    let found = PORTAL_DATE.find(raw)?;
    NaiveDate::parse_from_str(found.as_str(), "%d-%m-%Y").ok()
}

/// Parses the received-date cell of a listing row
///
/// The listing writes `--` for an unknown date and uses either `-` or `/`
/// as the separator.
pub fn parse_listing_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    if raw == NO_DATE {
        return None;
    }

    let caps = LISTING_DATE.captures(raw)?;
    let day = caps[1].parse().ok()?;
    let month = caps[2].parse().ok()?;
    let year = caps[3].parse().ok()?;
    NaiveDate::from_ymd_opt(year, month, day)
}

/// Pulls a phone number out of the case officer contact field
///
/// Takes the first run of digits and rewrites a leading international
/// `44` to the national `0`. The portal also writes the `+44 (0)20` form
/// as one run, whose `0` is kept rather than doubled.
///
/// # Examples
///
/// ```
/// use northgate_harvest::parser::extract_phone;
///
/// assert_eq!(extract_phone("Tel: 4402089864226"), Some("02089864226".to_string()));
/// assert_eq!(extract_phone("Not available"), None);
/// ```
pub fn extract_phone(raw: &str) -> Option<String> {
    let digits = DIGIT_RUN.find(raw)?.as_str();
    Some(match digits.strip_prefix("44") {
        Some(rest) if rest.starts_with('0') => rest.to_string(),
        Some(rest) => format!("0{}", rest),
        None => digits.to_string(),
    })
}

/// Finds the first integer after the "Easting" and "Northing" labels
pub fn parse_grid_reference(raw: &str) -> Option<(i64, i64)> {
    let easting = EASTING.captures(raw)?[1].parse().ok()?;
    let northing = NORTHING.captures(raw)?[1].parse().ok()?;
    Some((easting, northing))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clean_text() {
        assert_eq!(
            clean_text("  Decided&nbsp;\u{a0}\t\r\n"),
            Some("Decided".to_string())
        );
        assert_eq!(
            clean_text("12 High\n      Street"),
            Some("12 High Street".to_string())
        );
        assert_eq!(
            clean_text("<b>Refuse</b> permission"),
            Some("Refuse permission".to_string())
        );
    }

    #[test]
    fn test_clean_text_whitespace_only_is_none() {
        assert_eq!(clean_text(""), None);
        assert_eq!(clean_text(" \u{a0}\u{2003} \n\t"), None);
        assert_eq!(clean_text("&nbsp;"), None);
    }

    #[test]
    fn test_parse_date() {
        assert_eq!(parse_date("21-03-2019"), NaiveDate::from_ymd_opt(2019, 3, 21));
        assert_eq!(
            parse_date("Received 01-12-2023 (amended)"),
            NaiveDate::from_ymd_opt(2023, 12, 1)
        );
        assert_eq!(parse_date("Pending"), None);
        assert_eq!(parse_date("31-02-2020"), None);
        assert_eq!(parse_date("2020-01-01"), None);
    }

    #[test]
    fn test_parse_listing_date() {
        assert_eq!(parse_listing_date("--"), None);
        assert_eq!(parse_listing_date("  -- "), None);
        assert_eq!(
            parse_listing_date("05/06/2024"),
            NaiveDate::from_ymd_opt(2024, 6, 5)
        );
        assert_eq!(
            parse_listing_date("05-06-2024"),
            NaiveDate::from_ymd_opt(2024, 6, 5)
        );
        assert_eq!(parse_listing_date("unknown"), None);
    }

    #[test]
    fn test_extract_phone() {
        assert_eq!(
            extract_phone("4402089864226"),
            Some("02089864226".to_string())
        );
        assert_eq!(
            extract_phone("020 8545 3117"),
            Some("020".to_string())
        );
        assert_eq!(
            extract_phone("442085453117"),
            Some("02085453117".to_string())
        );
        assert_eq!(extract_phone("ext 4412"), Some("012".to_string()));
        assert_eq!(extract_phone("12344"), Some("12344".to_string()));
        assert_eq!(extract_phone(""), None);
    }

    #[test]
    fn test_parse_grid_reference() {
        assert_eq!(
            parse_grid_reference("Location: Easting: 526421 ... Northing: 170944 (approx)"),
            Some((526421, 170944))
        );
        assert_eq!(
            parse_grid_reference("Easting  526421  Northing  170944"),
            Some((526421, 170944))
        );
        assert_eq!(parse_grid_reference("Easting: 526421"), None);
        assert_eq!(parse_grid_reference("Not available"), None);
    }
}
