//! Scripted generation client for tests and offline runs.

use crate::client::{LlmClient, LlmRequest, LlmResponse, LlmUsage};
use manualqa_core::{AppError, AppResult};
use std::sync::Mutex;

/// Mock client that answers every request with a fixed reply (or a fixed
/// failure) and records the prompts it received.
#[derive(Debug, Default)]
pub struct MockLlmClient {
    reply: String,
    fail_with: Option<String>,
    prompts: Mutex<Vec<String>>,
}

impl MockLlmClient {
    /// Answer every request with `reply`.
    pub fn replying(reply: impl Into<String>) -> Self {
        Self {
            reply: reply.into(),
            ..Default::default()
        }
    }

    /// Fail every request with an `AppError::Llm` carrying `message`.
    pub fn failing(message: impl Into<String>) -> Self {
        Self {
            fail_with: Some(message.into()),
            ..Default::default()
        }
    }

    /// Prompts received so far, oldest first.
    pub fn prompts(&self) -> Vec<String> {
        self.prompts
            .lock()
            .map(|p| p.clone())
            .unwrap_or_default()
    }
}

#[async_trait::async_trait]
impl LlmClient for MockLlmClient {
    fn provider_name(&self) -> &str {
        "mock"
    }

    fn model_name(&self) -> &str {
        "mock-v1"
    }

    async fn complete(&self, request: &LlmRequest) -> AppResult<LlmResponse> {
        if let Ok(mut prompts) = self.prompts.lock() {
            prompts.push(request.prompt.clone());
        }

        if let Some(ref message) = self.fail_with {
            return Err(AppError::Llm(message.clone()));
        }

        Ok(LlmResponse {
            content: self.reply.clone(),
            model: request.model.clone(),
            usage: LlmUsage::default(),
        })
    }
}
