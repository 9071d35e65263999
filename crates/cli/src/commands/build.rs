//! Build command handler.

use clap::Args;
use manualqa_core::{config::AppConfig, AppResult};
use manualqa_knowledge::{build_or_load, create_provider, rebuild, BuildSettings, VectorIndex};

/// Build the index, or load it if already persisted
#[derive(Args, Debug)]
pub struct BuildCommand {
    /// Delete the persisted index and build from scratch
    #[arg(long)]
    pub rebuild: bool,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

impl BuildCommand {
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        tracing::info!("Executing build command (rebuild: {})", self.rebuild);

        let settings = BuildSettings::from_config(config);
        let embedder = create_provider(&settings.embedding)?;

        if self.rebuild {
            let (index, stats) = rebuild(&settings, embedder.as_ref()).await?;
            if self.json {
                let output = serde_json::json!({
                    "index": settings.index_path,
                    "chunks": index.len(),
                    "filesFound": stats.files_found,
                    "filesExtracted": stats.files_extracted,
                    "machines": stats.machines,
                    "passageChunks": stats.passage_chunks,
                    "tableChunks": stats.table_chunks,
                    "crossReferenceChunks": stats.cross_reference_chunks,
                    "durationMs": stats.duration_ms,
                });
                println!("{}", serde_json::to_string_pretty(&output)?);
            } else {
                println!(
                    "Built index from {}/{} manual(s): {} passages, {} tables, {} welding process rows ({} chunks) in {}ms",
                    stats.files_extracted,
                    stats.files_found,
                    stats.passage_chunks,
                    stats.table_chunks,
                    stats.cross_reference_chunks,
                    index.len(),
                    stats.duration_ms
                );
            }
            return Ok(());
        }

        let index = build_or_load(&settings, embedder.as_ref()).await?;
        if self.json {
            let output = serde_json::json!({
                "index": settings.index_path,
                "chunks": index.len(),
            });
            println!("{}", serde_json::to_string_pretty(&output)?);
        } else {
            println!("Index ready at {:?} ({} chunks)", settings.index_path, index.len());
        }

        Ok(())
    }
}
