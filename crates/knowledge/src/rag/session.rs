//! Multi-turn conversation over the shared application context.

use crate::rag::ask::ask_rag;
use crate::rag::context::{context_key, AppContext};
use crate::rag::types::{is_greeting, Reply, Turn, GREETING_REPLY, UNABLE_TO_PROCESS};
use crate::types::DetectionResult;
use manualqa_core::AppResult;
use std::sync::Arc;

/// One user's conversation.
///
/// Tracks the machines currently in focus. A query that names no machine
/// continues with the previous set; a query that names machines replaces it.
pub struct ChatSession {
    ctx: Arc<AppContext>,
    current: DetectionResult,
}

impl ChatSession {
    pub fn new(ctx: Arc<AppContext>) -> Self {
        Self {
            ctx,
            current: DetectionResult::empty(),
        }
    }

    /// Machines in focus, empty for general questions.
    pub fn current_machines(&self) -> &[String] {
        &self.current.entities
    }

    /// History key for the current focus.
    pub fn context_key(&self) -> String {
        context_key(&self.current.entities)
    }

    /// Answer one turn.
    ///
    /// # Errors
    /// Only `AppError::IndexUnavailable`; every other failure becomes
    /// [`Reply::Failed`] and leaves the history untouched.
    pub async fn respond(&mut self, query: &str) -> AppResult<Reply> {
        if is_greeting(query) {
            return Ok(Reply::Greeting(GREETING_REPLY.to_string()));
        }

        let detection = self.ctx.detect(query);
        if !detection.is_empty() {
            if detection.entities != self.current.entities {
                tracing::info!("Context set for: {}", detection.entities.join(", "));
            }
            self.current = detection;
        } else if self.current.is_empty() {
            tracing::info!("Using entire knowledge base for general queries");
        } else {
            tracing::info!(
                "Continuing context for: {}",
                self.current.entities.join(", ")
            );
        }

        let key = self.context_key();
        match ask_rag(&self.ctx, query, &self.current, &key).await {
            Ok(response) => {
                self.ctx.record(
                    &key,
                    Turn {
                        user: query.to_string(),
                        assistant: response.answer.clone(),
                    },
                );
                Ok(Reply::Answer(response))
            }
            Err(e) if e.is_unavailable() => Err(e),
            Err(e) => {
                tracing::error!(query = %query, "Query processing failed: {}", e);
                Ok(Reply::Failed(UNABLE_TO_PROCESS.to_string()))
            }
        }
    }
}
