//! Error types for kupa-docs

use thiserror::Error;

/// Errors raised while fetching or mining documentation
#[derive(Error, Debug)]
pub enum DocsError {
    /// Transport failure (connect, timeout, TLS)
    #[error("HTTP error: {0}")]
    Http(String),

    /// Server answered with a non-success status
    #[error("GET {url} returned HTTP {status}")]
    Status { url: String, status: u16 },

    /// URL not known to an in-memory fetcher
    #[error("No document at {0}")]
    NotFound(String),

    /// HTML selector or document structure problem
    #[error("Parse error: {0}")]
    Parse(String),
}

impl From<reqwest::Error> for DocsError {
    fn from(err: reqwest::Error) -> Self {
        DocsError::Http(err.to_string())
    }
}
