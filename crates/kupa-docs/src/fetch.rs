//! Text fetching boundary.

use std::time::Duration;

use async_trait::async_trait;
use tracing::debug;

use crate::error::DocsError;
use crate::Result;

/// "GET url -> text"
#[async_trait]
pub trait TextFetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<String>;
}

/// reqwest-backed fetcher; any non-2xx status is an error.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    http: reqwest::Client,
}

impl HttpFetcher {
    pub fn new(timeout: Duration) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("kupa/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self { http })
    }
}

#[async_trait]
impl TextFetcher for HttpFetcher {
    async fn fetch(&self, url: &str) -> Result<String> {
        debug!(url = %url, "Fetching document");
        let response = self.http.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(DocsError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }
        Ok(response.text().await?)
    }
}
