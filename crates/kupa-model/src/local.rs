//! Local model provider (Ollama-compatible generate API).

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::OnceCell;
use tracing::{debug, info, warn};

use kupa_domain::{KubeVersion, Oracle, OracleResponse, Resource};

use crate::config::ModelConfig;
use crate::error::ModelError;
use crate::prompt::{build_prompt, SYSTEM_PROMPT};
use crate::reply::{extract_payload, ModelReply};
use crate::Result;

#[derive(Debug, Deserialize)]
struct TagsResponse {
    #[serde(default)]
    models: Vec<TagEntry>,
}

#[derive(Debug, Deserialize)]
struct TagEntry {
    name: String,
}

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    system: &'static str,
    prompt: String,
    stream: bool,
    options: GenerateOptions,
}

#[derive(Debug, Serialize)]
struct GenerateOptions {
    temperature: f32,
    num_predict: u32,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    response: String,
}

/// Pick the model to run from what the server has installed.
///
/// Preference: exact name, an installed model whose untagged name starts
/// with the configured untagged name (`llama3:8b` for `llama`), the fallback
/// model, then whatever is installed first. Returns `None` when nothing is
/// installed.
pub fn resolve_model_name(configured: &str, fallback: &str, available: &[String]) -> Option<String> {
    if available.iter().any(|name| name == configured) {
        return Some(configured.to_string());
    }

    let base = |name: &str| name.split(':').next().unwrap_or(name).to_string();
    let configured_base = base(configured);
    if !configured_base.is_empty() {
        if let Some(name) = available
            .iter()
            .find(|name| base(name.as_str()).starts_with(&configured_base))
        {
            return Some(name.clone());
        }
    }

    let fallback_base = base(fallback);
    available
        .iter()
        .find(|name| *name == fallback)
        .or_else(|| available.iter().find(|name| base(name.as_str()) == fallback_base))
        .or_else(|| available.first())
        .cloned()
}

/// Client for a locally reachable model server.
#[derive(Debug)]
pub struct LocalModelClient {
    http: reqwest::Client,
    base_url: String,
    model: String,
    fallback_model: String,
    temperature: f32,
    max_tokens: u32,
    resolved: OnceCell<String>,
}

impl LocalModelClient {
    pub fn new(config: &ModelConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            http,
            base_url: config.local_url.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            fallback_model: config.fallback_model.clone(),
            temperature: config.temperature,
            max_tokens: config.max_tokens,
            resolved: OnceCell::new(),
        })
    }

    /// Names of the models installed on the server.
    pub async fn list_models(&self) -> Result<Vec<String>> {
        let response = self
            .http
            .get(format!("{}/api/tags", self.base_url))
            .send()
            .await?
            .error_for_status()?;
        let tags: TagsResponse = response.json().await?;
        Ok(tags.models.into_iter().map(|m| m.name).collect())
    }

    /// Model actually used for generation; resolved once per client.
    pub async fn model_name(&self) -> &str {
        self.resolved
            .get_or_init(|| async {
                match self.list_models().await {
                    Ok(available) => {
                        match resolve_model_name(&self.model, &self.fallback_model, &available) {
                            Some(name) => {
                                if name != self.model {
                                    info!(
                                        configured = %self.model,
                                        using = %name,
                                        "Configured local model not installed, substituting"
                                    );
                                }
                                name
                            }
                            None => {
                                warn!(model = %self.model, "Local model server reports no installed models");
                                self.model.clone()
                            }
                        }
                    }
                    Err(e) => {
                        warn!(error = %e, "Could not list local models, using configured name");
                        self.model.clone()
                    }
                }
            })
            .await
            .as_str()
    }

    /// Ask about one resource, degrading failures to an unavailable response.
    pub async fn query(&self, resource: &Resource, target: &KubeVersion) -> OracleResponse {
        match self.generate(resource, target).await {
            Ok(text) => parse_generation(&text).into_response(),
            Err(e) => {
                warn!(resource = %resource, error = %e, "Local model query failed");
                OracleResponse::unavailable(format!("Error querying local model: {e}"))
            }
        }
    }

    async fn generate(&self, resource: &Resource, target: &KubeVersion) -> Result<String> {
        let model = self.model_name().await;
        let request = GenerateRequest {
            model,
            system: SYSTEM_PROMPT,
            prompt: build_prompt(resource, target)?,
            stream: false,
            options: GenerateOptions {
                temperature: self.temperature,
                num_predict: self.max_tokens,
            },
        };

        debug!(resource = %resource, model = %model, "Querying local model");
        let response = self
            .http
            .post(format!("{}/api/generate", self.base_url))
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ModelError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let generated: GenerateResponse = response.json().await?;
        Ok(generated.response)
    }
}

/// Local models answer in free text; anything unreadable becomes the
/// deprecation stand-in reply.
fn parse_generation(text: &str) -> ModelReply {
    match extract_payload(text).as_ref().and_then(ModelReply::from_value) {
        Some(reply) => reply,
        None => {
            debug!(chars = text.len(), "Local model reply had no JSON object");
            ModelReply::unparseable()
        }
    }
}

#[async_trait]
impl Oracle for LocalModelClient {
    fn name(&self) -> &str {
        "local-model"
    }

    async fn consult(&self, resource: &Resource, target: &KubeVersion) -> OracleResponse {
        self.query(resource, target).await
    }
}
