//! Configuration module for Northgate Harvest
//!
//! Configuration is layered: built-in defaults (the Merton portal), an
//! optional TOML file, then `MORPH_*` environment variables. The result is
//! validated once at startup; a missing search window is fatal before any
//! network access, except for `--stats`, which never searches.
//!
//! # Example
//!
//! ```no_run
//! use northgate_harvest::config::load_config;
//!
//! let config = load_config(None).unwrap();
//! println!("Crawl delay: {}s", config.crawler.delay_seconds);
//! ```

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{
    Config, CouncilConfig, CrawlerConfig, OutputConfig, PortalConfig, PortalUrls, SearchConfig,
    SearchWindow,
};

// Re-export parser functions
pub use parser::{
    apply_env_overrides, load_config, load_stats_config, parse_config_file, search_fingerprint,
};
pub use validation::{validate, validate_settings};
