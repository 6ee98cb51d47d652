//! Error types for kupa-model

use thiserror::Error;

/// Errors that can occur while talking to a model provider
#[derive(Error, Debug)]
pub enum ModelError {
    /// No usable hosted credential configured
    #[error("Hosted model credential is missing or still the placeholder value")]
    MissingCredential,

    /// Transport failure (connect, timeout, TLS)
    #[error("HTTP error: {0}")]
    Http(String),

    /// Provider answered with a non-success status
    #[error("Model provider returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    /// Provider reply did not contain the expected structure
    #[error("Malformed model reply: {0}")]
    MalformedReply(String),

    /// Resource body could not be rendered into the prompt
    #[error("Failed to serialize resource for prompt: {0}")]
    Prompt(String),

    /// JSON parsing error
    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),
}

impl From<reqwest::Error> for ModelError {
    fn from(err: reqwest::Error) -> Self {
        ModelError::Http(err.to_string())
    }
}
