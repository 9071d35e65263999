//! Chat command handler.
//!
//! Reads one question per line from stdin until EOF or `exit`. The loop
//! stops when the index cannot be built or loaded.

use clap::Args;
use manualqa_core::{config::AppConfig, AppResult};
use manualqa_knowledge::{AppContext, ChatSession};
use std::io::Write;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};

const EXIT_COMMANDS: &[&str] = &["exit", "quit"];

/// Interactive question loop
#[derive(Args, Debug)]
pub struct ChatCommand {
    /// Print the sources after each answer
    #[arg(long)]
    pub sources: bool,
}

impl ChatCommand {
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        tracing::info!("Executing chat command");

        let ctx = Arc::new(AppContext::from_config(config).await?);
        let mut session = ChatSession::new(ctx);

        println!(
            "Ask a question about {} machines, or name a machine for specific answers. Type 'exit' to quit.",
            config.corpus.label
        );

        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        loop {
            print!("> ");
            std::io::stdout().flush()?;

            let Some(line) = lines.next_line().await? else {
                break;
            };
            let query = line.trim();
            if query.is_empty() {
                continue;
            }
            if EXIT_COMMANDS.contains(&query.to_lowercase().as_str()) {
                break;
            }

            let before = session.current_machines().to_vec();
            let reply = session.respond(query).await?;

            let now = session.current_machines();
            if now != before.as_slice() && !now.is_empty() {
                println!("[context: {}]", now.join(", "));
            }
            super::print_reply(&reply, self.sources);
            println!();
        }

        Ok(())
    }
}
