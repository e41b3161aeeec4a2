use crate::config::types::{Config, CrawlerConfig, OutputConfig, PortalConfig, SearchConfig};
use crate::crawler::MAX_DELAY;
use crate::ConfigError;
use url::Url;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_search_config(&config.search)?;
    validate_settings(config)
}

/// Validates everything except the search window
///
/// Reading statistics back from the database never searches the portal.
pub fn validate_settings(config: &Config) -> Result<(), ConfigError> {
    validate_portal_config(&config.portal)?;
    validate_crawler_config(&config.crawler)?;
    validate_output_config(&config.output)?;
    Ok(())
}

/// Validates the search window; this is the check that stops a run before
/// any network access when nothing was asked for
fn validate_search_config(config: &SearchConfig) -> Result<(), ConfigError> {
    if config.days.is_none() && config.months.is_none() {
        return Err(ConfigError::MissingSearchWindow);
    }

    if config.days == Some(0) || config.months == Some(0) {
        return Err(ConfigError::Validation(
            "search window must be at least 1 day or 1 month".to_string(),
        ));
    }

    if let Some(status) = &config.status {
        if status.trim().is_empty() {
            return Err(ConfigError::Validation(
                "status filter cannot be blank".to_string(),
            ));
        }
    }

    Ok(())
}

/// Validates portal addresses
fn validate_portal_config(config: &PortalConfig) -> Result<(), ConfigError> {
    let site = Url::parse(&config.site_url)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid site-url: {}", e)))?;

    if site.scheme() != "http" && site.scheme() != "https" {
        return Err(ConfigError::InvalidUrl(format!(
            "site-url must be http or https, got '{}'",
            site.scheme()
        )));
    }

    for (name, path) in [
        ("search-path", &config.search_path),
        ("generic-path", &config.generic_path),
    ] {
        if !path.starts_with('/') {
            return Err(ConfigError::Validation(format!(
                "{} must be an absolute path, got '{}'",
                name, path
            )));
        }
    }

    if config.page_size < 1 {
        return Err(ConfigError::Validation(
            "page-size must be >= 1".to_string(),
        ));
    }

    Ok(())
}

/// Validates request behaviour
fn validate_crawler_config(config: &CrawlerConfig) -> Result<(), ConfigError> {
    if !config.delay_seconds.is_finite() || config.delay_seconds < 0.0 {
        return Err(ConfigError::Validation(format!(
            "delay-seconds must be a non-negative number, got {}",
            config.delay_seconds
        )));
    }

    if config.delay_seconds > MAX_DELAY.as_secs_f64() {
        return Err(ConfigError::Validation(format!(
            "delay-seconds must be at most {}, got {}",
            MAX_DELAY.as_secs(),
            config.delay_seconds
        )));
    }

    if config.timeout_seconds < 1 {
        return Err(ConfigError::Validation(
            "timeout-seconds must be >= 1".to_string(),
        ));
    }

    if let Some(user_agent) = &config.user_agent {
        if user_agent.trim().is_empty() || user_agent.contains(['\r', '\n']) {
            return Err(ConfigError::Validation(format!(
                "user-agent is not a valid header value: {:?}",
                user_agent
            )));
        }
    }

    Ok(())
}

/// Validates output configuration
fn validate_output_config(config: &OutputConfig) -> Result<(), ConfigError> {
    if config.database_path.is_empty() {
        return Err(ConfigError::Validation(
            "database-path cannot be empty".to_string(),
        ));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_config() -> Config {
        let mut config = Config::default();
        config.search.days = Some(7);
        config
    }

    #[test]
    fn test_default_with_window_is_valid() {
        assert!(validate(&valid_config()).is_ok());
    }

    #[test]
    fn test_missing_window_is_fatal() {
        let config = Config::default();
        assert!(matches!(
            validate(&config),
            Err(ConfigError::MissingSearchWindow)
        ));
    }

    #[test]
    fn test_zero_window_rejected() {
        let mut config = valid_config();
        config.search.days = None;
        config.search.months = Some(0);
        assert!(matches!(validate(&config), Err(ConfigError::Validation(_))));
    }

    #[test]
    fn test_settings_ignore_search_window() {
        let mut config = Config::default();
        assert!(validate_settings(&config).is_ok());

        config.output.database_path = String::new();
        assert!(validate_settings(&config).is_err());
    }

    #[test]
    fn test_negative_delay_rejected() {
        let mut config = valid_config();
        config.crawler.delay_seconds = -1.0;
        assert!(validate(&config).is_err());

        config.crawler.delay_seconds = f64::NAN;
        assert!(validate(&config).is_err());

        config.crawler.delay_seconds = 0.0;
        assert!(validate(&config).is_ok());
    }

    #[test]
    fn test_excessive_delay_rejected() {
        let mut config = valid_config();
        config.crawler.delay_seconds = 1e300;
        assert!(matches!(validate(&config), Err(ConfigError::Validation(_))));

        config.crawler.delay_seconds = 86_400.0;
        assert!(validate(&config).is_ok());
    }

    #[test]
    fn test_site_url_checks() {
        let mut config = valid_config();
        config.portal.site_url = "not a url".to_string();
        assert!(matches!(validate(&config), Err(ConfigError::InvalidUrl(_))));

        config.portal.site_url = "ftp://planning.example.gov.uk".to_string();
        assert!(matches!(validate(&config), Err(ConfigError::InvalidUrl(_))));
    }

    #[test]
    fn test_relative_paths_rejected() {
        let mut config = valid_config();
        config.portal.generic_path = "Northgate/Generic/".to_string();
        assert!(matches!(validate(&config), Err(ConfigError::Validation(_))));
    }

    #[test]
    fn test_user_agent_with_newline_rejected() {
        let mut config = valid_config();
        config.crawler.user_agent = Some("Bot\r\nX-Evil: 1".to_string());
        assert!(validate(&config).is_err());
    }
}
