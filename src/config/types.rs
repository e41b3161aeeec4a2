use crate::ConfigError;
use serde::Deserialize;
use url::Url;

/// Main configuration structure for a harvest run
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub portal: PortalConfig,
    pub council: CouncilConfig,
    pub crawler: CrawlerConfig,
    pub search: SearchConfig,
    pub output: OutputConfig,
}

/// Where the Northgate Planning Explorer lives
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PortalConfig {
    /// Scheme and host of the portal, without a trailing slash
    #[serde(rename = "site-url")]
    pub site_url: String,

    /// Absolute path of the general search form
    #[serde(rename = "search-path")]
    pub search_path: String,

    /// Absolute path that detail and secondary page links are relative to
    #[serde(rename = "generic-path")]
    pub generic_path: String,

    /// Page size forced onto the result listing so it arrives in one page
    #[serde(rename = "page-size")]
    pub page_size: u32,
}

impl Default for PortalConfig {
    fn default() -> Self {
        Self {
            site_url: "https://planning.merton.gov.uk".to_string(),
            search_path: "/Northgate/PlanningExplorerAA/GeneralSearch.aspx".to_string(),
            generic_path: "/Northgate/PlanningExplorerAA/Generic/".to_string(),
            page_size: 99999,
        }
    }
}

impl PortalConfig {
    /// Parses the configured site and paths into absolute URLs
    pub fn urls(&self) -> Result<PortalUrls, ConfigError> {
        let site = Url::parse(self.site_url.trim())
            .map_err(|e| ConfigError::InvalidUrl(format!("{}: {}", self.site_url, e)))?;
        let join = |path: &str| {
            site.join(path)
                .map_err(|e| ConfigError::InvalidUrl(format!("{}: {}", path, e)))
        };

        Ok(PortalUrls {
            search: join(&self.search_path)?,
            generic: join(&self.generic_path)?,
            site,
        })
    }
}

/// Absolute portal URLs, built once per run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PortalUrls {
    /// Site root, used as the `Origin` header and for redirect targets
    pub site: Url,
    /// The general search form
    pub search: Url,
    /// Base for listing, detail and footer links
    pub generic: Url,
}

impl PortalUrls {
    /// Value for the `Origin` request header (no trailing slash)
    pub fn origin(&self) -> String {
        self.site.origin().ascii_serialization()
    }
}

/// Local authority identity stamped onto every application
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CouncilConfig {
    pub name: String,
    pub slug: String,
    /// GSS code of the authority
    pub gss: String,
}

impl Default for CouncilConfig {
    fn default() -> Self {
        Self {
            name: "Merton Borough Council".to_string(),
            slug: "merton".to_string(),
            gss: "E09000024".to_string(),
        }
    }
}

/// Request behaviour
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CrawlerConfig {
    /// Pause before every secondary page fetch, in seconds. Zero disables it.
    #[serde(rename = "delay-seconds")]
    pub delay_seconds: f64,

    #[serde(rename = "user-agent")]
    pub user_agent: Option<String>,

    #[serde(rename = "timeout-seconds")]
    pub timeout_seconds: u64,
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            delay_seconds: 10.0,
            user_agent: None,
            timeout_seconds: 30,
        }
    }
}

/// Search form parameters as configured (file or environment)
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    /// "Received in the last N days"
    pub days: Option<u32>,

    /// "Received in the last N months"
    pub months: Option<u32>,

    /// Optional application status code filter
    pub status: Option<String>,
}

/// The resolved date window sent with the search form
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchWindow {
    Days(u32),
    Months(u32),
}

impl SearchConfig {
    /// Resolves the configured window. Days take precedence over months.
    pub fn window(&self) -> Option<SearchWindow> {
        match (self.days, self.months) {
            (Some(days), _) => Some(SearchWindow::Days(days)),
            (None, Some(months)) => Some(SearchWindow::Months(months)),
            (None, None) => None,
        }
    }
}

/// Output configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Path to the SQLite database file
    #[serde(rename = "database-path")]
    pub database_path: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            database_path: "data.sqlite".to_string(),
        }
    }
}
