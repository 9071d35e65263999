//! Self-hosted primary backend.
//!
//! Talks to an Ollama server's `/api/generate` endpoint without streaming.

use crate::client::{LlmClient, LlmRequest, LlmResponse, LlmUsage};
use manualqa_core::{AppError, AppResult};
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize)]
struct GenerateOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    num_predict: Option<u32>,
}

#[derive(Debug, Serialize)]
struct GenerateBody<'a> {
    model: &'a str,
    prompt: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<&'a str>,
    options: GenerateOptions,
    stream: bool,
}

impl<'a> From<&'a LlmRequest> for GenerateBody<'a> {
    fn from(request: &'a LlmRequest) -> Self {
        Self {
            model: &request.model,
            prompt: &request.prompt,
            system: request.system.as_deref(),
            options: GenerateOptions {
                temperature: request.temperature,
                num_predict: request.max_tokens,
            },
            stream: false,
        }
    }
}

#[derive(Debug, Deserialize)]
struct GenerateReply {
    model: String,
    response: String,
    #[serde(default)]
    prompt_eval_count: u32,
    #[serde(default)]
    eval_count: u32,
}

impl From<GenerateReply> for LlmResponse {
    fn from(reply: GenerateReply) -> Self {
        Self {
            content: reply.response,
            model: reply.model,
            usage: LlmUsage::new(reply.prompt_eval_count, reply.eval_count),
        }
    }
}

/// Client for the primary Ollama server.
pub struct OllamaClient {
    base_url: String,
    model: String,
    client: reqwest::Client,
}

impl OllamaClient {
    /// Client for the server at `base_url` answering with `model`.
    pub fn with_base_url(base_url: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            model: model.into(),
            client: reqwest::Client::new(),
        }
    }
}

#[async_trait::async_trait]
impl LlmClient for OllamaClient {
    fn provider_name(&self) -> &str {
        "ollama"
    }

    fn model_name(&self) -> &str {
        &self.model
    }

    async fn complete(&self, request: &LlmRequest) -> AppResult<LlmResponse> {
        let url = format!("{}/api/generate", self.base_url);
        tracing::debug!("Generating with {} at {}", request.model, url);

        let response = self
            .client
            .post(&url)
            .json(&GenerateBody::from(request))
            .send()
            .await
            .map_err(|e| AppError::Llm(format!("Primary server request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::Llm(format!(
                "Primary server returned {}: {}",
                status, body
            )));
        }

        let reply: GenerateReply = response
            .json()
            .await
            .map_err(|e| AppError::Llm(format!("Malformed primary server reply: {}", e)))?;

        tracing::debug!(
            "Primary server answered ({} prompt / {} completion tokens)",
            reply.prompt_eval_count,
            reply.eval_count
        );
        Ok(reply.into())
    }
}
