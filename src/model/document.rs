use chrono::NaiveDate;

/// A file attached to an application, keyed by (council_reference, url)
///
/// Documents are never deleted: one that disappears from a later documents
/// page simply keeps its old `date_last_seen`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    pub council_reference: String,
    pub url: String,
    pub title: Option<String>,
    pub date_last_seen: NaiveDate,
}
