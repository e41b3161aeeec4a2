//! State module for tracking harvest progress
//!
//! # Components
//!
//! - `Stage`: the four units of incremental refresh and their freshness columns
//! - `CrawlState`: the run-level state machine driven by the coordinator

mod crawl_state;
mod stage;

// Re-export main types
pub use crawl_state::CrawlState;
pub use stage::Stage;
