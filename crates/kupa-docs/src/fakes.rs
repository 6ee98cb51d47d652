//! In-memory fetcher (testing only)

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::error::DocsError;
use crate::fetch::TextFetcher;
use crate::Result;

/// Serves canned documents by URL and records every request.
#[derive(Debug, Default)]
pub struct StaticFetcher {
    documents: HashMap<String, String>,
    requests: Mutex<Vec<String>>,
}

impl StaticFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Serve `body` at `url` (builder pattern).
    pub fn with_document(mut self, url: &str, body: &str) -> Self {
        self.documents.insert(url.to_string(), body.to_string());
        self
    }

    /// URLs requested so far, in order, including misses.
    pub fn requests(&self) -> Vec<String> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl TextFetcher for StaticFetcher {
    async fn fetch(&self, url: &str) -> Result<String> {
        self.requests.lock().unwrap().push(url.to_string());
        self.documents
            .get(url)
            .cloned()
            .ok_or_else(|| DocsError::NotFound(url.to_string()))
    }
}
