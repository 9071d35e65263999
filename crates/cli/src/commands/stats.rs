//! Stats command handler.
//!
//! Summarizes the persisted index without building it.

use clap::Args;
use manualqa_core::{config::AppConfig, AppResult};
use manualqa_knowledge::{ChunkTag, InMemoryIndex, VectorIndex};
use std::collections::BTreeMap;

/// Show persisted index statistics
#[derive(Args, Debug)]
pub struct StatsCommand {
    /// Show per-machine chunk counts
    #[arg(short, long)]
    pub detailed: bool,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

impl StatsCommand {
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        tracing::info!("Executing stats command");

        let path = config.index_path();
        if !InMemoryIndex::exists(&path) {
            println!("No index at {:?}. Run `manualqa build` first.", path);
            return Ok(());
        }

        let index = InMemoryIndex::load(&path)?;
        let info = index.info();

        let mut per_machine: BTreeMap<&str, usize> = BTreeMap::new();
        let mut per_tag: BTreeMap<&str, usize> = BTreeMap::new();
        for entry in index.entries() {
            let meta = &entry.chunk.metadata;
            if let Some(machine) = meta.machine.as_deref() {
                *per_machine.entry(machine).or_default() += 1;
            }
            if let Some(tag) = meta.source {
                *per_tag.entry(tag.as_str()).or_default() += 1;
            }
        }

        if self.json {
            let output = serde_json::json!({
                "index": path,
                "chunks": index.len(),
                "machines": per_machine,
                "tagged": per_tag,
                "embedding": {
                    "provider": info.provider,
                    "model": info.model,
                    "dimensions": info.dimensions,
                },
                "fingerprint": info.fingerprint,
                "createdAt": info.created_at,
            });
            println!("{}", serde_json::to_string_pretty(&output)?);
            return Ok(());
        }

        println!("Index: {:?}", path);
        println!("Built: {}", info.created_at.format("%Y-%m-%d %H:%M:%S UTC"));
        println!(
            "Embedding: {} / {} ({} dims)",
            info.provider, info.model, info.dimensions
        );
        println!("Chunks: {}", index.len());
        println!("Machines: {}", per_machine.len());
        println!(
            "Welding process rows: {}",
            per_tag
                .get(ChunkTag::WeldingProcessAnalysis.as_str())
                .copied()
                .unwrap_or(0)
        );

        if self.detailed {
            for (machine, count) in &per_machine {
                println!("  {:<30} {}", machine, count);
            }
        }

        Ok(())
    }
}
