//! Hosted OpenAI-compatible chat completions provider.
//!
//! Used as the fallback backend (Groq by default) when the self-hosted
//! primary cannot be reached.

use crate::client::{LlmClient, LlmRequest, LlmResponse, LlmUsage};
use manualqa_core::{AppError, AppResult};
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize, PartialEq)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Debug, Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    model: String,
    choices: Vec<ChatChoice>,
    #[serde(default)]
    usage: LlmUsage,
}

/// Client for a hosted chat completions API.
pub struct HostedClient {
    base_url: String,
    model: String,
    api_key: String,
    client: reqwest::Client,
}

impl HostedClient {
    /// Create a client for `base_url` (e.g. `https://api.groq.com/openai/v1`).
    pub fn new(
        base_url: impl Into<String>,
        model: impl Into<String>,
        api_key: impl Into<String>,
    ) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            model: model.into(),
            api_key: api_key.into(),
            client: reqwest::Client::new(),
        }
    }

    fn to_chat_request(&self, request: &LlmRequest) -> ChatRequest {
        let mut messages = Vec::new();
        if let Some(ref system) = request.system {
            messages.push(ChatMessage {
                role: "system".to_string(),
                content: system.clone(),
            });
        }
        messages.push(ChatMessage {
            role: "user".to_string(),
            content: request.prompt.clone(),
        });

        ChatRequest {
            model: request.model.clone(),
            messages,
            temperature: request.temperature,
            max_tokens: request.max_tokens,
        }
    }

    fn convert_response(&self, response: ChatResponse) -> AppResult<LlmResponse> {
        let content = response
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.message.content)
            .ok_or_else(|| AppError::Llm("Hosted API returned no choices".to_string()))?;

        Ok(LlmResponse {
            content,
            model: response.model,
            usage: response.usage,
        })
    }
}

#[async_trait::async_trait]
impl LlmClient for HostedClient {
    fn provider_name(&self) -> &str {
        "hosted"
    }

    fn model_name(&self) -> &str {
        &self.model
    }

    async fn complete(&self, request: &LlmRequest) -> AppResult<LlmResponse> {
        tracing::info!("Sending completion request to hosted API at {}", self.base_url);
        tracing::debug!("Request: {:?}", request);

        let url = format!("{}/chat/completions", self.base_url);
        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&self.to_chat_request(request))
            .send()
            .await
            .map_err(|e| AppError::Llm(format!("Failed to send request to hosted API: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(AppError::Llm(format!(
                "Hosted API error ({}): {}",
                status, error_text
            )));
        }

        let chat_response: ChatResponse = response
            .json()
            .await
            .map_err(|e| AppError::Llm(format!("Failed to parse hosted API response: {}", e)))?;

        tracing::info!("Received completion from hosted API");
        self.convert_response(chat_response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client() -> HostedClient {
        HostedClient::new("https://api.example.com/v1/", "llama3-8b-8192", "secret")
    }

    #[test]
    fn test_hosted_client_creation() {
        let client = client();
        assert_eq!(client.provider_name(), "hosted");
        assert_eq!(client.model_name(), "llama3-8b-8192");
        assert_eq!(client.base_url, "https://api.example.com/v1");
    }

    #[test]
    fn test_chat_request_includes_system_first() {
        let request = LlmRequest::new("What fuse size?", "llama3-8b-8192").with_system("Be exact");
        let chat = client().to_chat_request(&request);

        assert_eq!(chat.messages.len(), 2);
        assert_eq!(chat.messages[0].role, "system");
        assert_eq!(chat.messages[1].role, "user");
        assert_eq!(chat.messages[1].content, "What fuse size?");
    }

    #[test]
    fn test_convert_response() {
        let raw: ChatResponse = serde_json::from_str(
            r#"{"model":"llama3-8b-8192","choices":[{"message":{"role":"assistant","content":"16 A"}}],"usage":{"prompt_tokens":5,"completion_tokens":2,"total_tokens":7}}"#,
        )
        .unwrap();

        let response = client().convert_response(raw).unwrap();
        assert_eq!(response.content, "16 A");
        assert_eq!(response.usage.total_tokens, 7);
    }

    #[test]
    fn test_convert_response_without_choices() {
        let raw: ChatResponse =
            serde_json::from_str(r#"{"model":"llama3-8b-8192","choices":[]}"#).unwrap();
        assert!(client().convert_response(raw).is_err());
    }
}
