//! Stage definitions for incremental refresh
//!
//! Each stage is refreshed independently per application and records the
//! date it last completed in its own column.

use std::fmt;

/// A unit of incremental refresh with its own freshness date
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    /// Search result listing (always refreshed for every listed row)
    Listing,

    /// Application details page
    Details,

    /// Key dates page
    Dates,

    /// Document listing page
    Documents,
}

impl Stage {
    /// The per-record stages fetched after the listing, in run order
    pub const SECONDARY: [Stage; 3] = [Stage::Details, Stage::Dates, Stage::Documents];

    /// Column of the `applications` table holding this stage's freshness date
    pub fn freshness_column(&self) -> &'static str {
        match self {
            Self::Listing => "date_scraped",
            Self::Details => "date_details_scraped",
            Self::Dates => "date_dates_scraped",
            Self::Documents => "date_documents_scraped",
        }
    }

    /// Converts the stage to its database string representation
    pub fn to_db_string(&self) -> &'static str {
        match self {
            Self::Listing => "listing",
            Self::Details => "details",
            Self::Dates => "dates",
            Self::Documents => "documents",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_db_string())
    }
}
