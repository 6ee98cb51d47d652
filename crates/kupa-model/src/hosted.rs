//! Hosted model provider (OpenAI-compatible chat completions).

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use kupa_domain::{KubeVersion, Oracle, OracleResponse, Resource};

use crate::config::ModelConfig;
use crate::error::ModelError;
use crate::prompt::{build_prompt, SYSTEM_PROMPT};
use crate::reply::{extract_payload, ModelReply};
use crate::Result;

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage>,
    temperature: f32,
    max_tokens: u32,
    response_format: ResponseFormat,
}

#[derive(Debug, Serialize, Deserialize)]
struct ChatMessage {
    role: String,
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    kind: &'static str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

/// Client for a hosted request/response model API.
#[derive(Debug, Clone)]
pub struct HostedModelClient {
    http: reqwest::Client,
    endpoint: String,
    api_key: String,
    model: String,
    temperature: f32,
    max_tokens: u32,
}

impl HostedModelClient {
    /// Create a client; fails when no real credential is configured.
    pub fn new(config: &ModelConfig) -> Result<Self> {
        let api_key = config
            .hosted_credential()
            .ok_or(ModelError::MissingCredential)?
            .to_string();
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            http,
            endpoint: format!("{}/chat/completions", config.api_base.trim_end_matches('/')),
            api_key,
            model: config.model.clone(),
            temperature: config.temperature,
            max_tokens: config.max_tokens,
        })
    }

    /// Ask about one resource, degrading failures to an unavailable response.
    pub async fn query(&self, resource: &Resource, target: &KubeVersion) -> OracleResponse {
        match self.try_query(resource, target).await {
            Ok(reply) => reply.into_response(),
            Err(e) => {
                warn!(resource = %resource, error = %e, "Hosted model query failed");
                OracleResponse::unavailable(format!("Error querying hosted model: {e}"))
            }
        }
    }

    async fn try_query(&self, resource: &Resource, target: &KubeVersion) -> Result<ModelReply> {
        let request = ChatRequest {
            model: &self.model,
            messages: vec![
                ChatMessage {
                    role: "system".to_string(),
                    content: Some(SYSTEM_PROMPT.to_string()),
                },
                ChatMessage {
                    role: "user".to_string(),
                    content: Some(build_prompt(resource, target)?),
                },
            ],
            temperature: self.temperature,
            max_tokens: self.max_tokens,
            response_format: ResponseFormat {
                kind: "json_object",
            },
        };

        debug!(resource = %resource, model = %self.model, "Querying hosted model");
        let response = self
            .http
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
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

        let chat: ChatResponse = response.json().await?;
        let content = chat
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| ModelError::MalformedReply("reply has no message content".to_string()))?;

        let payload = extract_payload(&content)
            .ok_or_else(|| ModelError::MalformedReply("reply content is not a JSON object".to_string()))?;
        ModelReply::from_value(&payload)
            .ok_or_else(|| ModelError::MalformedReply("reply content is not a JSON object".to_string()))
    }
}

#[async_trait]
impl Oracle for HostedModelClient {
    fn name(&self) -> &str {
        "hosted-model"
    }

    async fn consult(&self, resource: &Resource, target: &KubeVersion) -> OracleResponse {
        self.query(resource, target).await
    }
}
