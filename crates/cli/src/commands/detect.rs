//! Detect command handler.

use clap::Args;
use manualqa_core::{config::AppConfig, AppResult};
use manualqa_knowledge::{load_manifest, EntityDetector, MatchTier};

/// Show which machines a query refers to
#[derive(Args, Debug)]
pub struct DetectCommand {
    /// Query text
    pub query: String,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

impl DetectCommand {
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        tracing::info!("Executing detect command");

        let manifest = load_manifest(&config.pdf_dir(), &config.corpus.marker_term)?;
        let result = EntityDetector::from_manifest(&manifest).detect(&self.query);

        if self.json {
            println!("{}", serde_json::to_string_pretty(&result)?);
        } else if result.tier == MatchTier::None {
            println!("No machine detected; the full knowledge base would be searched.");
        } else {
            let tier = match result.tier {
                MatchTier::Exact => "exact",
                _ => "approximate",
            };
            println!("Detected ({}): {}", tier, result.entities.join(", "));
        }

        Ok(())
    }
}
