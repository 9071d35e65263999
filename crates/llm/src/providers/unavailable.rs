//! Placeholder backend used when no generation server can be reached.

use crate::client::{LlmClient, LlmRequest, LlmResponse};
use manualqa_core::{AppError, AppResult};

/// Fails every request with the reason selection failed.
///
/// Keeps startup alive so greetings and index builds still work; each
/// question then fails at the query boundary.
#[derive(Debug, Clone)]
pub struct UnavailableClient {
    reason: String,
}

impl UnavailableClient {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

#[async_trait::async_trait]
impl LlmClient for UnavailableClient {
    fn provider_name(&self) -> &str {
        "unavailable"
    }

    fn model_name(&self) -> &str {
        "none"
    }

    async fn complete(&self, _request: &LlmRequest) -> AppResult<LlmResponse> {
        Err(AppError::Llm(self.reason.clone()))
    }
}
