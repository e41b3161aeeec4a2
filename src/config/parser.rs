use crate::config::types::{Config, SearchConfig, SearchWindow};
use crate::config::validation::{validate, validate_settings};
use crate::ConfigError;
use sha2::{Digest, Sha256};
use std::path::Path;

/// Loads a configuration file, applies environment overrides and validates
///
/// With no path, the built-in defaults are used as the base layer. The
/// environment is read after the file, so `MORPH_*` variables always win.
///
/// # Example
///
/// ```no_run
/// use std::path::Path;
/// use northgate_harvest::config::load_config;
///
/// let config = load_config(Some(Path::new("harvest.toml"))).unwrap();
/// println!("Delay: {}s", config.crawler.delay_seconds);
/// ```
pub fn load_config(path: Option<&Path>) -> Result<Config, ConfigError> {
    let config = load_layers(path)?;
    validate(&config)?;
    Ok(config)
}

/// Like [`load_config`], but a missing search window is not an error
///
/// Used by modes that only read the database.
pub fn load_stats_config(path: Option<&Path>) -> Result<Config, ConfigError> {
    let config = load_layers(path)?;
    validate_settings(&config)?;
    Ok(config)
}

fn load_layers(path: Option<&Path>) -> Result<Config, ConfigError> {
    let mut config = match path {
        Some(path) => parse_config_file(path)?,
        None => Config::default(),
    };

    apply_env_overrides(&mut config, |name| std::env::var(name).ok())?;
    Ok(config)
}

/// Reads and parses a TOML configuration file without validating it
pub fn parse_config_file(path: &Path) -> Result<Config, ConfigError> {
    let content = std::fs::read_to_string(path)?;
    let config: Config = toml::from_str(&content)?;
    Ok(config)
}

/// Applies `MORPH_*` overrides using the given variable lookup
///
/// Empty values are treated as unset. Numeric variables that fail to parse
/// are rejected rather than silently ignored.
pub fn apply_env_overrides<F>(config: &mut Config, lookup: F) -> Result<(), ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

    if let Some(raw) = get("MORPH_DELAY") {
        config.crawler.delay_seconds = raw.trim().parse().map_err(|_| ConfigError::InvalidEnv {
            name: "MORPH_DELAY",
            value: raw.clone(),
        })?;
    }

    if let Some(user_agent) = get("MORPH_USER_AGENT") {
        config.crawler.user_agent = Some(user_agent);
    }

    if let Some(raw) = get("MORPH_DAYS") {
        config.search.days = Some(parse_count("MORPH_DAYS", &raw)?);
    }

    if let Some(raw) = get("MORPH_MONTHS") {
        config.search.months = Some(parse_count("MORPH_MONTHS", &raw)?);
    }

    if let Some(status) = get("MORPH_STATUS") {
        config.search.status = Some(status);
    }

    if let Some(db) = get("MORPH_DB") {
        config.output.database_path = db;
    }

    Ok(())
}

fn parse_count(name: &'static str, raw: &str) -> Result<u32, ConfigError> {
    raw.trim().parse().map_err(|_| ConfigError::InvalidEnv {
        name,
        value: raw.to_string(),
    })
}

/// Computes a SHA-256 fingerprint of the effective search parameters
///
/// Stored on every run row so runs with different windows or status filters
/// can be told apart later.
pub fn search_fingerprint(search: &SearchConfig) -> String {
    let window = match search.window() {
        Some(SearchWindow::Days(n)) => format!("days={}", n),
        Some(SearchWindow::Months(n)) => format!("months={}", n),
        None => "none".to_string(),
    };
    let status = search.status.as_deref().unwrap_or("");

    let mut hasher = Sha256::new();
    hasher.update(window.as_bytes());
    hasher.update(b"\n");
    hasher.update(status.as_bytes());
    hex::encode(hasher.finalize())
}
