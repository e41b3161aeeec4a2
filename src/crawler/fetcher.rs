//! HTTP fetcher implementation
//!
//! This module handles all HTTP requests for the harvester, including:
//! - Building the one HTTP client a run uses, whose cookie jar is the portal
//!   session
//! - Default `Origin`, `Referer` and `User-Agent` headers on every request
//! - Surfacing redirects instead of following them, so the search handshake
//!   can read the `Location` header

use crate::config::{CrawlerConfig, PortalUrls};
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, ORIGIN, REFERER, USER_AGENT};
use reqwest::{redirect::Policy, Client};
use std::collections::HashMap;
use std::time::Duration;
use thiserror::Error;
use url::Url;

/// User agent sent when none is configured
pub const DEFAULT_USER_AGENT: &str = concat!("northgate-harvest/", env!("CARGO_PKG_VERSION"));

/// Errors raised before any HTTP status is available
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("Failed to build HTTP client: {0}")]
    Client(String),

    #[error("Request to {url} failed: {reason}")]
    Transport { url: String, reason: String },
}

/// A response of any status
#[derive(Debug, Clone, Default)]
pub struct FetchResponse {
    pub status: u16,
    pub body: String,
    /// Response headers, names lowercased
    pub headers: HashMap<String, String>,
}

impl FetchResponse {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
            headers: HashMap::new(),
        }
    }

    /// Adds a header (builder style)
    pub fn with_header(mut self, name: &str, value: impl Into<String>) -> Self {
        self.headers.insert(name.to_ascii_lowercase(), value.into());
        self
    }

    /// The `Location` header of a redirect
    pub fn location(&self) -> Option<&str> {
        self.headers.get("location").map(String::as_str)
    }

    pub fn is_ok(&self) -> bool {
        self.status == 200
    }
}

/// Issues requests within one portal session
///
/// Implementations must keep cookies across calls and must not follow
/// redirects.
#[async_trait]
pub trait PageFetcher: Send + Sync {
    /// GET a page
    async fn get(&self, url: &Url) -> Result<FetchResponse, FetchError>;

    /// POST url-encoded form fields
    async fn post_form(
        &self,
        url: &Url,
        fields: &[(String, String)],
    ) -> Result<FetchResponse, FetchError>;
}

/// reqwest-backed fetcher used for real runs
pub struct ReqwestFetcher {
    client: Client,
}

impl ReqwestFetcher {
    /// Builds the session client
    ///
    /// # Arguments
    ///
    /// * `config` - Crawler settings (user agent, timeout)
    /// * `urls` - Portal URLs; the site origin and search page become the
    ///   `Origin` and `Referer` headers
    pub fn new(config: &CrawlerConfig, urls: &PortalUrls) -> Result<Self, FetchError> {
        let user_agent = config.user_agent.as_deref().unwrap_or(DEFAULT_USER_AGENT);

        let mut headers = HeaderMap::new();
        headers.insert(ORIGIN, header_value(&urls.origin())?);
        headers.insert(REFERER, header_value(urls.search.as_str())?);
        headers.insert(USER_AGENT, header_value(user_agent)?);

        let client = Client::builder()
            .default_headers(headers)
            .cookie_store(true)
            .timeout(Duration::from_secs(config.timeout_seconds))
            .connect_timeout(Duration::from_secs(10))
            .redirect(Policy::none())
            .gzip(true)
            .brotli(true)
            .build()
            .map_err(|e| FetchError::Client(e.to_string()))?;

        Ok(Self { client })
    }

    async fn into_response(
        url: &Url,
        result: Result<reqwest::Response, reqwest::Error>,
    ) -> Result<FetchResponse, FetchError> {
        let transport = |e: reqwest::Error| FetchError::Transport {
            url: url.to_string(),
            reason: e.to_string(),
        };

        let response = result.map_err(transport)?;
        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|v| (name.as_str().to_string(), v.to_string()))
            })
            .collect();
        let body = response.text().await.map_err(transport)?;

        Ok(FetchResponse {
            status,
            body,
            headers,
        })
    }
}

fn header_value(value: &str) -> Result<HeaderValue, FetchError> {
    HeaderValue::from_str(value)
        .map_err(|e| FetchError::Client(format!("invalid header value {:?}: {}", value, e)))
}

#[async_trait]
impl PageFetcher for ReqwestFetcher {
    async fn get(&self, url: &Url) -> Result<FetchResponse, FetchError> {
        tracing::debug!(url = %url, "GET");
        let result = self.client.get(url.clone()).send().await;
        let response = Self::into_response(url, result).await?;
        tracing::debug!(url = %url, status = response.status, "Response");
        Ok(response)
    }

    async fn post_form(
        &self,
        url: &Url,
        fields: &[(String, String)],
    ) -> Result<FetchResponse, FetchError> {
        tracing::debug!(url = %url, "POST");
        let result = self.client.post(url.clone()).form(fields).send().await;
        let response = Self::into_response(url, result).await?;
        tracing::debug!(url = %url, status = response.status, "Response");
        Ok(response)
    }
}
