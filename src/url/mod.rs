//! URL handling for portal links
//!
//! Links scraped from the portal are relative to the generic pages directory
//! and often carry raw whitespace from the template markup. This module
//! resolves them to absolute URLs, strips the percent-encoded control
//! sequences that whitespace turns into, and rewrites the page-size query
//! parameter on the search redirect.

use crate::{UrlError, UrlResult};
use regex::Regex;
use std::sync::LazyLock;
use url::Url;

/// Percent-encoded control characters (`%00` to `%0F`). These come from tabs
/// and line breaks inside `href` attributes and are never meaningful.
static ENCODED_CONTROL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"%0[0-9A-Fa-f]").expect("valid control-sequence regex"));

/// Query parameter holding the number of results per listing page
pub const PAGE_SIZE_PARAM: &str = "PS";

/// Resolves a scraped link against a base URL
///
/// Resolution happens first, then the sanitisation pass removes any
/// `%0X` sequences left in the result, and the cleaned string is parsed
/// again so the returned URL is always well formed.
///
/// # Arguments
///
/// * `base` - The URL the link is relative to
/// * `href` - The raw `href` attribute value
///
/// # Returns
///
/// * `Ok(Url)` - The absolute, sanitised URL
/// * `Err(UrlError)` - The link is empty or cannot be resolved
///
/// # Examples
///
/// ```
/// use northgate_harvest::url::resolve_link;
/// use url::Url;
///
/// let base = Url::parse("https://planning.example.gov.uk/Northgate/Generic/").unwrap();
/// let url = resolve_link(&base, " StdDetails.aspx?PARAM0=42%0D%0A ").unwrap();
/// assert_eq!(
///     url.as_str(),
///     "https://planning.example.gov.uk/Northgate/Generic/StdDetails.aspx?PARAM0=42"
/// );
/// ```
pub fn resolve_link(base: &Url, href: &str) -> UrlResult<Url> {
    let href = href.trim();
    if href.is_empty() {
        return Err(UrlError::Empty);
    }

    let resolve_err = |reason: String| UrlError::Resolve {
        base: base.to_string(),
        href: href.to_string(),
        reason,
    };

    let joined = base.join(href).map_err(|e| resolve_err(e.to_string()))?;
    let cleaned = strip_encoded_controls(joined.as_str());
    Url::parse(&cleaned).map_err(|e| resolve_err(e.to_string()))
}

/// Removes every `%0X` sequence from a URL string
pub fn strip_encoded_controls(raw: &str) -> String {
    ENCODED_CONTROL.replace_all(raw, "").into_owned()
}

/// Sets the page-size parameter on a URL, appending it when absent
///
/// The query is edited segment by segment so the encoding of the other
/// parameters is left exactly as the portal issued it.
pub fn with_page_size(mut url: Url, page_size: u32) -> Url {
    let replacement = format!("{}={}", PAGE_SIZE_PARAM, page_size);
    let prefix = format!("{}=", PAGE_SIZE_PARAM);

    let mut found = false;
    let mut segments: Vec<String> = url
        .query()
        .unwrap_or("")
        .split('&')
        .filter(|segment| !segment.is_empty())
        .map(|segment| {
            if segment == PAGE_SIZE_PARAM || segment.starts_with(&prefix) {
                found = true;
                replacement.clone()
            } else {
                segment.to_string()
            }
        })
        .collect();

    if !found {
        segments.push(replacement);
    }

    url.set_query(Some(&segments.join("&")));
    url
}
