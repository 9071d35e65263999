//! Ask command handler.
//!
//! Answers one question through the same session path as `chat`.

use clap::Args;
use manualqa_core::{config::AppConfig, AppResult};
use manualqa_knowledge::{AppContext, ChatSession};
use std::sync::Arc;

/// Ask a single question
#[derive(Args, Debug)]
pub struct AskCommand {
    /// The question to ask
    pub question: String,

    /// Print the sources the answer was grounded on
    #[arg(long)]
    pub sources: bool,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

impl AskCommand {
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        tracing::info!("Executing ask command");
        tracing::debug!("Ask command options: {:?}", self);

        let ctx = Arc::new(AppContext::from_config(config).await?);
        let mut session = ChatSession::new(ctx);
        let reply = session.respond(&self.question).await?;

        if self.json {
            println!("{}", serde_json::to_string_pretty(&super::reply_json(&reply))?);
        } else {
            super::print_reply(&reply, self.sources);
        }

        Ok(())
    }
}
