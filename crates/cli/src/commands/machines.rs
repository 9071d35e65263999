//! Machines command handler.

use clap::Args;
use manualqa_core::{config::AppConfig, AppResult};
use manualqa_knowledge::load_manifest;

/// List the machines the corpus covers
#[derive(Args, Debug)]
pub struct MachinesCommand {
    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

impl MachinesCommand {
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        tracing::info!("Executing machines command");

        let manifest = load_manifest(&config.pdf_dir(), &config.corpus.marker_term)?;

        if self.json {
            println!("{}", serde_json::to_string_pretty(&manifest.names())?);
            return Ok(());
        }

        if manifest.is_empty() {
            println!("No machines found in {:?}", config.pdf_dir());
        } else {
            println!("{} Machines List:", config.corpus.label);
            for name in manifest.names() {
                println!("  {}", name);
            }
        }

        Ok(())
    }
}
