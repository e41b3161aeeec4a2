use crate::state::Stage;
use std::fmt;

/// Position of a run in its one-pass state machine
///
/// `NegotiateSession → IngestListing → Details → Dates → Documents → Done`.
/// No state is entered until the previous one has been attempted for every
/// eligible record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CrawlState {
    NegotiateSession,
    IngestListing,
    Details,
    Dates,
    Documents,
    Done,
}

impl CrawlState {
    /// The state a run starts in
    pub fn initial() -> Self {
        Self::NegotiateSession
    }

    /// Transition taken once this state has been attempted in full
    pub fn next(self) -> Self {
        match self {
            Self::NegotiateSession => Self::IngestListing,
            Self::IngestListing => Self::Details,
            Self::Details => Self::Dates,
            Self::Dates => Self::Documents,
            Self::Documents | Self::Done => Self::Done,
        }
    }

    /// The per-record stage this state processes, if any
    pub fn stage(self) -> Option<Stage> {
        match self {
            Self::IngestListing => Some(Stage::Listing),
            Self::Details => Some(Stage::Details),
            Self::Dates => Some(Stage::Dates),
            Self::Documents => Some(Stage::Documents),
            Self::NegotiateSession | Self::Done => None,
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Done)
    }
}

impl fmt::Display for CrawlState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::NegotiateSession => "NEGOTIATE_SESSION",
            Self::IngestListing => "INGEST_LISTING",
            Self::Details => "DETAILS",
            Self::Dates => "DATES",
            Self::Documents => "DOCUMENTS",
            Self::Done => "DONE",
        };
        write!(f, "{}", name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_full_walk() {
        let mut state = CrawlState::initial();
        let mut seen = vec![state];
        while !state.is_terminal() {
            state = state.next();
            seen.push(state);
        }

        assert_eq!(
            seen,
            vec![
                CrawlState::NegotiateSession,
                CrawlState::IngestListing,
                CrawlState::Details,
                CrawlState::Dates,
                CrawlState::Documents,
                CrawlState::Done,
            ]
        );
    }

    #[test]
    fn test_done_is_absorbing() {
        assert_eq!(CrawlState::Done.next(), CrawlState::Done);
    }

    #[test]
    fn test_stage_mapping() {
        assert_eq!(CrawlState::NegotiateSession.stage(), None);
        assert_eq!(CrawlState::IngestListing.stage(), Some(Stage::Listing));
        assert_eq!(CrawlState::Dates.stage(), Some(Stage::Dates));
        assert_eq!(CrawlState::Done.stage(), None);
    }

    #[test]
    fn test_display() {
        assert_eq!(CrawlState::IngestListing.to_string(), "INGEST_LISTING");
    }
}
