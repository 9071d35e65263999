//! Query routing: narrow the index to the detected machines.

use crate::embeddings::EmbeddingProvider;
use crate::types::{Chunk, DetectionResult};
use crate::vector_index::{ScoredChunk, VectorIndex};
use manualqa_core::AppResult;
use std::sync::Arc;

/// Which part of the index a retriever searches.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RouteScope {
    /// No machine detected.
    Full,
    /// Chunks of the detected machines plus always-included chunks.
    Filtered(Vec<String>),
    /// Machines were detected but the filter kept nothing.
    Fallback(Vec<String>),
}

/// Top-k similarity search over a (possibly narrowed) index.
pub struct Retriever {
    index: Arc<dyn VectorIndex>,
    top_k: usize,
    scope: RouteScope,
}

impl Retriever {
    pub fn new(index: Arc<dyn VectorIndex>, top_k: usize, scope: RouteScope) -> Self {
        Self {
            index,
            top_k,
            scope,
        }
    }

    pub fn scope(&self) -> &RouteScope {
        &self.scope
    }

    pub fn top_k(&self) -> usize {
        self.top_k
    }

    /// Number of chunks this retriever can return.
    pub fn candidates(&self) -> usize {
        self.index.len()
    }

    /// Best chunks for an already-embedded query.
    pub fn retrieve(&self, query_embedding: &[f32]) -> Vec<ScoredChunk> {
        self.index.search(query_embedding, self.top_k)
    }

    /// Embed `query` and return the best chunks.
    pub async fn retrieve_text(
        &self,
        embedder: &dyn EmbeddingProvider,
        query: &str,
    ) -> AppResult<Vec<ScoredChunk>> {
        let embedding = embedder.embed(query).await?;
        Ok(self.retrieve(&embedding))
    }
}

/// Whether `chunk` stays in the index narrowed to `machines`.
pub fn keeps(chunk: &Chunk, machines: &[String]) -> bool {
    chunk.is_always_included() || machines.iter().any(|m| chunk.belongs_to(m))
}

/// Build the retriever for one query.
///
/// The primary index is never modified; a narrowed index is a per-query
/// copy of the selected entries.
pub fn route(index: &Arc<dyn VectorIndex>, detection: &DetectionResult, top_k: usize) -> Retriever {
    if detection.is_empty() {
        tracing::debug!("No machine detected; searching the full index");
        return Retriever::new(Arc::clone(index), top_k, RouteScope::Full);
    }

    let machines = detection.entities.clone();
    let subset: Arc<dyn VectorIndex> = Arc::from(index.subset(&|c: &Chunk| keeps(c, &machines)));

    if subset.is_empty() {
        tracing::warn!(
            "No indexed chunks for {:?}; falling back to the full index",
            machines
        );
        return Retriever::new(Arc::clone(index), top_k, RouteScope::Fallback(machines));
    }

    tracing::info!(
        "Narrowed index to {} of {} chunk(s) for {:?}",
        subset.len(),
        index.len(),
        machines
    );
    Retriever::new(subset, top_k, RouteScope::Filtered(machines))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embeddings::providers::MockProvider;
    use crate::types::{ChunkTag, MatchTier};
    use crate::vector_index::{InMemoryIndex, IndexInfo};
    use chrono::Utc;

    async fn index() -> Arc<dyn VectorIndex> {
        index_of(vec![
            Chunk::text_passage("Renegade-ES-300i", 1, 0, "Renegade fuse 16 A slow"),
            Chunk::table("Renegade-ES-300i", 2, 0, "Voltage | Current"),
            Chunk::text_passage("Warrior-Edge", 1, 0, "Warrior fuse 32 A"),
            Chunk::text_passage("Aristo-500ix", 4, 0, "Aristo duty cycle"),
            Chunk::tagged(ChunkTag::WeldingProcessAnalysis, "The welding process TIG is compatible with the following machines: Renegade-ES-300i."),
            Chunk::tagged(ChunkTag::MachineList, "ESAB Machines List:\nAristo-500ix\nRenegade-ES-300i\nWarrior-Edge"),
        ])
        .await
    }

    async fn index_of(chunks: Vec<Chunk>) -> Arc<dyn VectorIndex> {
        let provider = MockProvider::new(32);
        let texts: Vec<String> = chunks.iter().map(|c| c.text.clone()).collect();
        let embeddings = provider.embed_batch(&texts).await.unwrap();
        let info = IndexInfo {
            provider: "mock".to_string(),
            model: "trigram-v1".to_string(),
            dimensions: 32,
            fingerprint: None,
            created_at: Utc::now(),
        };
        Arc::new(InMemoryIndex::from_embedded(info, chunks, embeddings).unwrap())
    }

    fn detected(names: &[&str]) -> DetectionResult {
        DetectionResult::new(names.iter().map(|n| n.to_string()), MatchTier::Exact)
    }

    #[tokio::test]
    async fn test_empty_detection_uses_full_index() {
        let index = index().await;
        let retriever = route(&index, &DetectionResult::empty(), 13);

        assert_eq!(retriever.scope(), &RouteScope::Full);
        assert_eq!(retriever.candidates(), 6);
        assert_eq!(retriever.retrieve(&[0.1; 32]).len(), 6);
    }

    #[tokio::test]
    async fn test_filter_keeps_machine_and_always_included() {
        let index = index().await;
        let retriever = route(&index, &detected(&["Renegade-ES-300i"]), 13);

        assert!(matches!(retriever.scope(), RouteScope::Filtered(_)));
        assert_eq!(retriever.candidates(), 4);

        let hits = retriever.retrieve(&[0.1; 32]);
        assert!(hits
            .iter()
            .all(|h| h.chunk.belongs_to("renegade-es-300i") || h.chunk.is_always_included()));
        assert!(hits.iter().all(|h| !h.chunk.belongs_to("Warrior-Edge")));
    }

    #[tokio::test]
    async fn test_filter_is_case_insensitive() {
        let index = index().await;
        let retriever = route(&index, &detected(&["warrior-edge"]), 13);
        assert_eq!(retriever.candidates(), 3);
    }

    #[tokio::test]
    async fn test_unindexed_machine_keeps_only_always_included() {
        let index = index().await;
        let retriever = route(&index, &detected(&["Rebel-EMP-215ic"]), 13);

        assert_eq!(retriever.candidates(), 2);
        assert!(retriever
            .retrieve(&[0.1; 32])
            .iter()
            .all(|h| h.chunk.is_always_included()));
    }

    #[tokio::test]
    async fn test_empty_filter_falls_back_to_full_index() {
        let index = index_of(vec![
            Chunk::text_passage("Warrior-Edge", 1, 0, "Warrior fuse 32 A"),
            Chunk::text_passage("Aristo-500ix", 4, 0, "Aristo duty cycle"),
        ])
        .await;
        let retriever = route(&index, &detected(&["Rebel-EMP-215ic"]), 13);

        assert_eq!(
            retriever.scope(),
            &RouteScope::Fallback(vec!["Rebel-EMP-215ic".to_string()])
        );
        assert_eq!(retriever.candidates(), 2);
    }

    #[tokio::test]
    async fn test_primary_index_untouched() {
        let index = index().await;
        let before = index.entries().to_vec();

        let _ = route(&index, &detected(&["Aristo-500ix"]), 13);
        assert_eq!(index.entries(), before.as_slice());
    }

    #[tokio::test]
    async fn test_k_is_the_same_for_both_routes() {
        let index = index().await;
        let full = route(&index, &DetectionResult::empty(), 2);
        let narrowed = route(&index, &detected(&["Renegade-ES-300i"]), 2);

        assert_eq!(full.top_k(), narrowed.top_k());
        assert_eq!(full.retrieve(&[0.1; 32]).len(), 2);
        assert_eq!(narrowed.retrieve(&[0.1; 32]).len(), 2);
    }

    #[tokio::test]
    async fn test_retrieve_text_prefers_matching_machine() {
        let index = index().await;
        let provider = MockProvider::new(32);
        let retriever = route(&index, &DetectionResult::empty(), 1);

        let hits = retriever.retrieve_text(&provider, "Warrior fuse").await.unwrap();
        assert_eq!(hits[0].chunk.metadata.machine.as_deref(), Some("Warrior-Edge"));
    }
}
