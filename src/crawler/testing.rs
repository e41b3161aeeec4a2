//! In-memory fetcher for unit tests

use crate::crawler::fetcher::{FetchError, FetchResponse, PageFetcher};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;
use url::Url;

/// Serves canned responses by URL; anything unknown is a 404
#[derive(Default)]
pub struct MockFetcher {
    gets: HashMap<String, FetchResponse>,
    posts: HashMap<String, FetchResponse>,
    unreachable: Vec<String>,
    requested: Mutex<Vec<String>>,
    posted: Mutex<Vec<Vec<(String, String)>>>,
}

impl MockFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_get(mut self, url: &str, response: FetchResponse) -> Self {
        self.gets.insert(url.to_string(), response);
        self
    }

    pub fn with_post(mut self, url: &str, response: FetchResponse) -> Self {
        self.posts.insert(url.to_string(), response);
        self
    }

    /// Makes requests to `url` fail at the transport level
    pub fn with_unreachable(mut self, url: &str) -> Self {
        self.unreachable.push(url.to_string());
        self
    }

    /// Every URL requested so far, in order
    pub fn requested(&self) -> Vec<String> {
        self.requested.lock().unwrap().clone()
    }

    /// Field lists of every POST so far
    pub fn posted_fields(&self) -> Vec<Vec<(String, String)>> {
        self.posted.lock().unwrap().clone()
    }

    fn respond(
        &self,
        table: &HashMap<String, FetchResponse>,
        url: &Url,
    ) -> Result<FetchResponse, FetchError> {
        self.requested.lock().unwrap().push(url.to_string());
        if self.unreachable.iter().any(|u| u == url.as_str()) {
            return Err(FetchError::Transport {
                url: url.to_string(),
                reason: "connection refused".to_string(),
            });
        }
        Ok(table
            .get(url.as_str())
            .cloned()
            .unwrap_or_else(|| FetchResponse::new(404, "not found")))
    }
}

#[async_trait]
impl PageFetcher for MockFetcher {
    async fn get(&self, url: &Url) -> Result<FetchResponse, FetchError> {
        self.respond(&self.gets, url)
    }

    async fn post_form(
        &self,
        url: &Url,
        fields: &[(String, String)],
    ) -> Result<FetchResponse, FetchError> {
        self.posted.lock().unwrap().push(fields.to_vec());
        self.respond(&self.posts, url)
    }
}
