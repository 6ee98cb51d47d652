//! KuPa Model: generative-model oracle
//!
//! Asks a generative model whether a Kubernetes resource breaks on a target
//! version and what the corrected manifest should be. Two providers sit
//! behind the same [`kupa_domain::Oracle`] capability:
//!
//! - [`HostedModelClient`]: OpenAI-compatible chat completions in JSON mode
//! - [`LocalModelClient`]: Ollama-compatible prompt/completion server
//!
//! ## Layer 1 - Knowledge sources
//!
//! Focus: prompt construction, tolerant reply parsing, and confidence.

pub mod config;
pub mod error;
pub mod hosted;
pub mod local;
pub mod prompt;
pub mod reply;

pub use config::{ModelConfig, ModelProvider, PLACEHOLDER_API_KEY};
pub use error::ModelError;
pub use hosted::HostedModelClient;
pub use local::{resolve_model_name, LocalModelClient};
pub use prompt::{build_prompt, SYSTEM_PROMPT};
pub use reply::{derive_confidence, extract_payload, ModelReply};

/// Result type for model operations
pub type Result<T> = std::result::Result<T, ModelError>;
