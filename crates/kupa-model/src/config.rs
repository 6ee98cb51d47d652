//! Model provider configuration.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Credential value shipped in sample configs; treated as "not configured".
pub const PLACEHOLDER_API_KEY: &str = "your-api-key";

/// Which generative-model provider is selected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelProvider {
    /// Hosted request/response API (OpenAI-compatible).
    #[default]
    #[serde(alias = "openai")]
    Hosted,
    /// Locally reachable model server (Ollama-compatible).
    #[serde(alias = "ollama")]
    Local,
}

impl FromStr for ModelProvider {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "hosted" | "openai" => Ok(ModelProvider::Hosted),
            "local" | "ollama" => Ok(ModelProvider::Local),
            other => Err(format!("unknown model provider '{other}' (expected hosted or local)")),
        }
    }
}

impl fmt::Display for ModelProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ModelProvider::Hosted => f.write_str("hosted"),
            ModelProvider::Local => f.write_str("local"),
        }
    }
}

/// Model oracle configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    /// Selected provider
    pub provider: ModelProvider,
    /// Model name requested from either provider
    pub model: String,
    /// Sampling temperature (hosted provider)
    pub temperature: f32,
    /// Completion token budget
    pub max_tokens: u32,
    /// Base URL of the hosted API
    pub api_base: String,
    /// Hosted API credential; usually supplied through `OPENAI_API_KEY`
    pub api_key: Option<String>,
    /// Base URL of the local model server
    pub local_url: String,
    /// Known-good local model used when the configured one is not installed
    pub fallback_model: String,
    /// Per-request timeout in seconds
    pub timeout_secs: u64,
}

impl Default for ModelConfig {
    fn default() -> Self {
        ModelConfig {
            provider: ModelProvider::Hosted,
            model: "gpt-4-turbo".to_string(),
            temperature: 0.1,
            max_tokens: 4000,
            api_base: "https://api.openai.com/v1".to_string(),
            api_key: None,
            local_url: "http://localhost:11434".to_string(),
            fallback_model: "codellama:7b".to_string(),
            timeout_secs: 60,
        }
    }
}

impl ModelConfig {
    /// The hosted credential, if one is really configured.
    ///
    /// Absent, blank, and placeholder values all count as "no credential".
    pub fn hosted_credential(&self) -> Option<&str> {
        self.api_key
            .as_deref()
            .map(str::trim)
            .filter(|key| !key.is_empty() && *key != PLACEHOLDER_API_KEY)
    }

    /// Set the hosted credential (builder pattern).
    pub fn with_api_key(mut self, key: &str) -> Self {
        self.api_key = Some(key.to_string());
        self
    }

    /// Select a provider (builder pattern).
    pub fn with_provider(mut self, provider: ModelProvider) -> Self {
        self.provider = provider;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_placeholder_and_blank_keys_are_not_credentials() {
        let config = ModelConfig::default();
        assert!(config.hosted_credential().is_none());

        assert!(config.clone().with_api_key("").hosted_credential().is_none());
        assert!(config.clone().with_api_key("   ").hosted_credential().is_none());
        assert!(config
            .clone()
            .with_api_key(PLACEHOLDER_API_KEY)
            .hosted_credential()
            .is_none());
        assert_eq!(
            config.with_api_key("sk-test").hosted_credential(),
            Some("sk-test")
        );
    }

    #[test]
    fn test_provider_names_and_aliases() {
        assert_eq!("ollama".parse::<ModelProvider>().unwrap(), ModelProvider::Local);
        assert_eq!("OpenAI".parse::<ModelProvider>().unwrap(), ModelProvider::Hosted);
        assert!("bard".parse::<ModelProvider>().is_err());

        let parsed: ModelConfig = serde_yaml::from_str("provider: ollama\nmodel: llama3\n").unwrap();
        assert_eq!(parsed.provider, ModelProvider::Local);
        assert_eq!(parsed.model, "llama3");
        assert_eq!(parsed.fallback_model, "codellama:7b");
    }
}
