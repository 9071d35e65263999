//! Build-or-load for the combined manual index.
//!
//! The build is all-or-nothing: chunks from every manual, one cross-reference
//! chunk per welding process and the machine manifest chunk are embedded in
//! a single batch and persisted before the index is returned. Any failure
//! surfaces as [`AppError::IndexUnavailable`].

use crate::attributes::{cross_reference_chunks, AttributeDetector};
use crate::chunker::Chunker;
use crate::embeddings::{EmbeddingConfig, EmbeddingProvider};
use crate::extractor::extract_document;
use crate::manifest::{corpus_fingerprint, list_pdfs, manifest_chunk, manifest_from_documents};
use crate::sections::{extract_sections, SectionParser};
use crate::types::{Chunk, SourceDocument};
use crate::vector_index::{InMemoryIndex, IndexInfo};
use chrono::Utc;
use manualqa_core::{AppConfig, AppError, AppResult};
use std::path::PathBuf;
use std::time::Instant;

/// Everything needed to build or locate the persisted index.
#[derive(Debug, Clone, PartialEq)]
pub struct BuildSettings {
    pub pdf_dir: PathBuf,
    pub index_path: PathBuf,
    pub marker_term: String,
    pub label: String,
    pub chunk_size: usize,
    pub chunk_overlap: usize,
    pub verify_fingerprint: bool,
    pub embedding: EmbeddingConfig,
}

impl BuildSettings {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            pdf_dir: config.pdf_dir(),
            index_path: config.index_path(),
            marker_term: config.corpus.marker_term.clone(),
            label: config.corpus.label.clone(),
            chunk_size: config.index.chunk_size,
            chunk_overlap: config.index.chunk_overlap,
            verify_fingerprint: config.index.verify_fingerprint,
            embedding: EmbeddingConfig::from(&config.embedding),
        }
    }
}

/// Statistics from a fresh build.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BuildStats {
    pub files_found: usize,
    pub files_extracted: usize,
    pub machines: usize,
    pub passage_chunks: usize,
    pub table_chunks: usize,
    pub cross_reference_chunks: usize,
    pub duration_ms: u64,
}

/// Load the persisted index, or build and persist it if absent.
pub async fn build_or_load(
    settings: &BuildSettings,
    embedder: &dyn EmbeddingProvider,
) -> AppResult<InMemoryIndex> {
    if InMemoryIndex::exists(&settings.index_path) {
        match load_existing(settings) {
            Ok(Some(index)) => return Ok(index),
            Ok(None) => tracing::warn!("Corpus changed since last build; rebuilding index"),
            Err(e) => return Err(unavailable(e)),
        }
    }

    build(settings, embedder)
        .await
        .map(|(index, _)| index)
        .map_err(unavailable)
}

/// Delete any persisted index, then build from scratch.
pub async fn rebuild(
    settings: &BuildSettings,
    embedder: &dyn EmbeddingProvider,
) -> AppResult<(InMemoryIndex, BuildStats)> {
    if settings.index_path.exists() {
        tracing::info!("Removing persisted index at {:?}", settings.index_path);
        std::fs::remove_dir_all(&settings.index_path).map_err(|e| unavailable(e.into()))?;
    }
    build(settings, embedder).await.map_err(unavailable)
}

fn unavailable(e: AppError) -> AppError {
    match e {
        AppError::IndexUnavailable(_) => e,
        other => AppError::IndexUnavailable(other.to_string()),
    }
}

/// `Ok(None)` means the index is stale and fingerprint checks are enabled.
fn load_existing(settings: &BuildSettings) -> AppResult<Option<InMemoryIndex>> {
    let index = InMemoryIndex::load(&settings.index_path)?;
    let info = crate::vector_index::VectorIndex::info(&index);

    settings.embedding.validate_consistency(info).map_err(|e| {
        AppError::Knowledge(format!("{}. Rebuild the index with `manualqa build --rebuild`", e))
    })?;

    let current = list_pdfs(&settings.pdf_dir).and_then(|pdfs| corpus_fingerprint(&pdfs));
    match (&info.fingerprint, current) {
        (Some(stored), Ok(current)) if *stored != current => {
            if settings.verify_fingerprint {
                return Ok(None);
            }
            tracing::warn!("Manual corpus differs from the one the index was built from");
        }
        (_, Err(e)) => tracing::debug!("Skipping corpus fingerprint check: {}", e),
        _ => {}
    }

    Ok(Some(index))
}

/// Chunks for a set of extracted manuals, in index order: passages and
/// tables per manual, then cross-reference rows, then the manifest.
pub fn collect_chunks(
    docs: &[SourceDocument],
    chunker: &Chunker,
    marker_term: &str,
    label: &str,
) -> AppResult<Vec<Chunk>> {
    let mut chunks: Vec<Chunk> = docs.iter().flat_map(|doc| chunker.chunk_document(doc)).collect();

    let sections = extract_sections(&SectionParser::standard()?, docs);
    let table = AttributeDetector::welding()?.detect(&sections);
    chunks.extend(cross_reference_chunks(&table));

    let manifest = manifest_from_documents(docs, marker_term);
    chunks.push(manifest_chunk(&manifest, label));

    Ok(chunks)
}

async fn build(
    settings: &BuildSettings,
    embedder: &dyn EmbeddingProvider,
) -> AppResult<(InMemoryIndex, BuildStats)> {
    let start = Instant::now();
    tracing::info!("Building index from {:?}", settings.pdf_dir);

    let pdfs = list_pdfs(&settings.pdf_dir)?;
    if pdfs.is_empty() {
        return Err(AppError::IndexUnavailable(format!(
            "No PDF files found in {:?}",
            settings.pdf_dir
        )));
    }
    let fingerprint = corpus_fingerprint(&pdfs)?;

    let docs: Vec<SourceDocument> = pdfs.iter().filter_map(|p| extract_document(p)).collect();
    tracing::info!("Extracted {} of {} manual(s)", docs.len(), pdfs.len());

    let chunker = Chunker::new(settings.chunk_size, settings.chunk_overlap)?;
    let chunks = collect_chunks(&docs, &chunker, &settings.marker_term, &settings.label)?;

    let mut stats = BuildStats {
        files_found: pdfs.len(),
        files_extracted: docs.len(),
        machines: manifest_from_documents(&docs, &settings.marker_term).len(),
        ..Default::default()
    };
    for chunk in &chunks {
        if chunk.metadata.table_idx.is_some() {
            stats.table_chunks += 1;
        } else if chunk.metadata.chunk_idx.is_some() {
            stats.passage_chunks += 1;
        } else if chunk.metadata.source == Some(crate::types::ChunkTag::WeldingProcessAnalysis) {
            stats.cross_reference_chunks += 1;
        }
    }

    tracing::info!(
        "Embedding {} chunk(s) with provider '{}' (model: {})",
        chunks.len(),
        embedder.provider_name(),
        embedder.model_name()
    );
    let texts: Vec<String> = chunks.iter().map(|c| c.text.clone()).collect();
    let embeddings = embedder.embed_batch(&texts).await?;

    let info = IndexInfo {
        provider: embedder.provider_name().to_string(),
        model: embedder.model_name().to_string(),
        dimensions: embedder.dimensions(),
        fingerprint: Some(fingerprint),
        created_at: Utc::now(),
    };
    let index = InMemoryIndex::from_embedded(info, chunks, embeddings)?;
    index.save(&settings.index_path)?;

    stats.duration_ms = start.elapsed().as_millis() as u64;
    tracing::info!(
        "Index built: {} passages, {} tables, {} cross-reference rows in {}ms",
        stats.passage_chunks,
        stats.table_chunks,
        stats.cross_reference_chunks,
        stats.duration_ms
    );

    Ok((index, stats))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embeddings::providers::MockProvider;
    use crate::test_support::write_pdf;
    use crate::types::ChunkTag;
    use crate::vector_index::VectorIndex;
    use async_trait::async_trait;
    use tempfile::TempDir;

    const DIMS: usize = 64;

    fn settings(root: &std::path::Path) -> BuildSettings {
        BuildSettings {
            pdf_dir: root.join("pdfs"),
            index_path: root.join("faiss_dbs").join("combined_index"),
            marker_term: "dimensions".to_string(),
            label: "ESAB".to_string(),
            chunk_size: 200,
            chunk_overlap: 40,
            verify_fingerprint: false,
            embedding: EmbeddingConfig::mock(DIMS),
        }
    }

    fn corpus(root: &std::path::Path) -> BuildSettings {
        let settings = settings(root);
        std::fs::create_dir_all(&settings.pdf_dir).unwrap();
        write_pdf(
            &settings.pdf_dir.join("Renegade-ES-300i.pdf"),
            &[
                &["1 INTRODUCTION", "Inverter for MMA and TIG welding."],
                &["3 TECHNICAL DATA", "Overall dimensions 460 mm"],
            ],
        );
        write_pdf(
            &settings.pdf_dir.join("Brochure.pdf"),
            &[&["Spring catalogue"]],
        );
        settings
    }

    #[derive(Debug)]
    struct FailingProvider;

    #[async_trait]
    impl EmbeddingProvider for FailingProvider {
        fn provider_name(&self) -> &str {
            "mock"
        }
        fn model_name(&self) -> &str {
            "trigram-v1"
        }
        fn dimensions(&self) -> usize {
            DIMS
        }
        async fn embed_batch(&self, _texts: &[String]) -> AppResult<Vec<Vec<f32>>> {
            Err(AppError::Knowledge("embedding service down".to_string()))
        }
    }

    #[test]
    fn test_collect_chunks_appends_always_included() {
        let docs = vec![
            SourceDocument::from_pages(
                "Warrior",
                vec![
                    "1 INTRODUCTION\nSupports MIG/MAG welding\nOverall dimensions".to_string(),
                ],
            ),
            SourceDocument::from_pages("Brochure", vec!["Catalogue".to_string()]),
        ];
        let chunker = Chunker::new(1000, 200).unwrap();

        let chunks = collect_chunks(&docs, &chunker, "dimensions", "ESAB").unwrap();

        let last = chunks.last().unwrap();
        assert_eq!(last.metadata.source, Some(ChunkTag::MachineList));
        assert_eq!(last.text, "ESAB Machines List:\nWarrior");

        let rows: Vec<_> = chunks
            .iter()
            .filter(|c| c.metadata.source == Some(ChunkTag::WeldingProcessAnalysis))
            .collect();
        assert_eq!(rows.len(), 1);
        assert!(rows[0].text.contains("MIG/MAG"));

        // Manuals without the marker term are still indexed.
        assert!(chunks.iter().any(|c| c.belongs_to("Brochure")));
        assert!(chunks
            .iter()
            .all(|c| c.metadata.machine.is_some() || c.is_always_included()));
    }

    #[tokio::test]
    async fn test_no_pdfs_is_unavailable() {
        let temp = TempDir::new().unwrap();
        let settings = settings(temp.path());
        std::fs::create_dir_all(&settings.pdf_dir).unwrap();

        let result = build_or_load(&settings, &MockProvider::new(DIMS)).await;
        assert!(matches!(result, Err(AppError::IndexUnavailable(_))));
        assert!(!InMemoryIndex::exists(&settings.index_path));
    }

    #[tokio::test]
    async fn test_missing_pdf_dir_is_unavailable() {
        let temp = TempDir::new().unwrap();
        let result = build_or_load(&settings(temp.path()), &MockProvider::new(DIMS)).await;
        assert!(result.unwrap_err().is_unavailable());
    }

    #[tokio::test]
    async fn test_build_persists_and_reloads() {
        let temp = TempDir::new().unwrap();
        let settings = corpus(temp.path());
        let provider = MockProvider::new(DIMS);

        let built = build_or_load(&settings, &provider).await.unwrap();
        assert!(InMemoryIndex::exists(&settings.index_path));
        assert!(built
            .entries()
            .iter()
            .any(|e| e.chunk.metadata.source == Some(ChunkTag::MachineList)));

        let loaded = InMemoryIndex::load(&settings.index_path).unwrap();
        assert_eq!(loaded, built);
    }

    #[tokio::test]
    async fn test_second_call_loads_without_embedding() {
        let temp = TempDir::new().unwrap();
        let settings = corpus(temp.path());
        let provider = MockProvider::new(DIMS);

        let first = build_or_load(&settings, &provider).await.unwrap();
        assert_eq!(provider.batch_calls(), 1);

        let second = build_or_load(&settings, &provider).await.unwrap();
        assert_eq!(provider.batch_calls(), 1);
        assert_eq!(first.entries(), second.entries());
    }

    #[tokio::test]
    async fn test_embedding_failure_leaves_no_index() {
        let temp = TempDir::new().unwrap();
        let settings = corpus(temp.path());

        let result = build_or_load(&settings, &FailingProvider).await;
        assert!(matches!(result, Err(AppError::IndexUnavailable(_))));
        assert!(!InMemoryIndex::exists(&settings.index_path));
    }

    #[tokio::test]
    async fn test_stale_index_rebuilt_only_when_verifying() {
        let temp = TempDir::new().unwrap();
        let mut settings = corpus(temp.path());
        let provider = MockProvider::new(DIMS);
        build_or_load(&settings, &provider).await.unwrap();

        write_pdf(&settings.pdf_dir.join("Warrior.pdf"), &[&["Overall dimensions"]]);

        build_or_load(&settings, &provider).await.unwrap();
        assert_eq!(provider.batch_calls(), 1);

        settings.verify_fingerprint = true;
        build_or_load(&settings, &provider).await.unwrap();
        assert_eq!(provider.batch_calls(), 2);
    }

    #[tokio::test]
    async fn test_provider_mismatch_refuses_load() {
        let temp = TempDir::new().unwrap();
        let mut settings = corpus(temp.path());
        build_or_load(&settings, &MockProvider::new(DIMS)).await.unwrap();

        settings.embedding.dimensions = DIMS * 2;
        let result = build_or_load(&settings, &MockProvider::new(DIMS * 2)).await;
        assert!(matches!(result, Err(AppError::IndexUnavailable(msg)) if msg.contains("--rebuild")));
    }

    #[tokio::test]
    async fn test_rebuild_replaces_index() {
        let temp = TempDir::new().unwrap();
        let settings = corpus(temp.path());
        let provider = MockProvider::new(DIMS);
        build_or_load(&settings, &provider).await.unwrap();

        let (_, stats) = rebuild(&settings, &provider).await.unwrap();
        assert_eq!(provider.batch_calls(), 2);
        assert_eq!(stats.files_found, 2);
    }
}
