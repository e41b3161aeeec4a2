//! Northgate Harvest: an incremental planning-application harvester
//!
//! This crate drives a council's Northgate Planning Explorer search portal,
//! ingests the result listing, then walks each application's details, key
//! dates and document pages into a local SQLite dataset. Every stage keeps its
//! own freshness date per application, so repeated runs only fetch what is
//! still owed.

pub mod config;
pub mod crawler;
pub mod geo;
pub mod model;
pub mod output;
pub mod parser;
pub mod state;
pub mod storage;
pub mod url;

use thiserror::Error;

/// Main error type for a harvest run
#[derive(Debug, Error)]
pub enum HarvestError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Search session failed: {0}")]
    Session(String),

    #[error("Fetch error: {0}")]
    Fetch(#[from] crawler::FetchError),

    #[error("Storage error: {0}")]
    Storage(#[from] storage::StorageError),
}

impl HarvestError {
    /// Returns true if the error comes from configuration or session setup,
    /// i.e. it happened before any record-level work could start
    pub fn is_setup_failure(&self) -> bool {
        matches!(self, Self::Config(_) | Self::Session(_))
    }
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Neither a day window nor a month window is set; nothing to scrape")]
    MissingSearchWindow,

    #[error("Invalid value for {name}: {value:?}")]
    InvalidEnv { name: &'static str, value: String },

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),
}

/// URL-specific errors
#[derive(Debug, Error)]
pub enum UrlError {
    #[error("Failed to resolve {href:?} against {base}: {reason}")]
    Resolve {
        base: String,
        href: String,
        reason: String,
    },

    #[error("Empty link")]
    Empty,
}

/// Result type alias for harvest operations
pub type Result<T> = std::result::Result<T, HarvestError>;

/// Result type alias for URL operations
pub type UrlResult<T> = std::result::Result<T, UrlError>;

// Re-export commonly used types
pub use config::Config;
pub use model::{Application, Document};
pub use state::{CrawlState, Stage};
