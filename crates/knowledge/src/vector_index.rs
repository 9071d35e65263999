//! Vector index abstraction for manual chunks.
//!
//! Defines the similarity-store interface used by the router and an
//! in-memory implementation persisted as a single JSON document.

use crate::types::Chunk;
use chrono::{DateTime, Utc};
use manualqa_core::{AppError, AppResult};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// File holding the serialized index inside the index directory.
pub const INDEX_FILE: &str = "index.json";

const FORMAT_VERSION: u32 = 1;

/// A chunk and its stored embedding.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexEntry {
    pub chunk: Chunk,
    pub embedding: Vec<f32>,
}

/// A search hit.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredChunk {
    pub chunk: Chunk,
    pub score: f32,
}

/// How an index was built.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IndexInfo {
    /// Embedding provider name
    pub provider: String,
    /// Embedding model
    pub model: String,
    pub dimensions: usize,
    /// Corpus fingerprint at build time
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fingerprint: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Trait for vector index backends.
///
/// Implementations must support:
/// - Nearest-neighbour search over stored embeddings
/// - Enumerating every stored (chunk, embedding) pair
/// - Building a sub-index from a chunk subset without re-embedding
pub trait VectorIndex: Send + Sync {
    /// Build metadata.
    fn info(&self) -> &IndexInfo;

    /// Every stored entry, in insertion order.
    fn entries(&self) -> &[IndexEntry];

    /// The `top_k` most similar chunks, best first.
    fn search(&self, query_embedding: &[f32], top_k: usize) -> Vec<ScoredChunk>;

    /// A new index holding only the entries whose chunk satisfies `keep`.
    ///
    /// Embeddings are copied; `self` is left untouched.
    fn subset(&self, keep: &dyn Fn(&Chunk) -> bool) -> Box<dyn VectorIndex>;

    fn len(&self) -> usize {
        self.entries().len()
    }

    fn is_empty(&self) -> bool {
        self.entries().is_empty()
    }
}

pub(crate) fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }
    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let mag_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let mag_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if mag_a < f32::EPSILON || mag_b < f32::EPSILON {
        0.0
    } else {
        dot / (mag_a * mag_b)
    }
}

#[derive(Serialize, Deserialize)]
struct PersistedIndex {
    version: u32,
    info: IndexInfo,
    entries: Vec<IndexEntry>,
}

/// Brute-force cosine-similarity index held in memory.
#[derive(Debug, Clone, PartialEq)]
pub struct InMemoryIndex {
    info: IndexInfo,
    entries: Vec<IndexEntry>,
}

impl InMemoryIndex {
    /// Pair chunks with their embeddings.
    pub fn from_embedded(
        info: IndexInfo,
        chunks: Vec<Chunk>,
        embeddings: Vec<Vec<f32>>,
    ) -> AppResult<Self> {
        if chunks.len() != embeddings.len() {
            return Err(AppError::Knowledge(format!(
                "Embedding count mismatch: {} chunks, {} embeddings",
                chunks.len(),
                embeddings.len()
            )));
        }

        if let Some(bad) = embeddings.iter().find(|e| e.len() != info.dimensions) {
            return Err(AppError::Knowledge(format!(
                "Embedding dimension mismatch: expected {}, got {}",
                info.dimensions,
                bad.len()
            )));
        }

        let entries = chunks
            .into_iter()
            .zip(embeddings)
            .map(|(chunk, embedding)| IndexEntry { chunk, embedding })
            .collect();

        Ok(Self { info, entries })
    }

    fn index_file(dir: &Path) -> PathBuf {
        dir.join(INDEX_FILE)
    }

    /// Whether a persisted index exists at `dir`.
    pub fn exists(dir: &Path) -> bool {
        Self::index_file(dir).is_file()
    }

    /// Persist to `dir`, replacing any previous index.
    ///
    /// Writes to a temporary file first so a failed save never leaves a
    /// partial index behind.
    pub fn save(&self, dir: &Path) -> AppResult<()> {
        std::fs::create_dir_all(dir).map_err(|e| {
            AppError::Knowledge(format!("Failed to create index directory {:?}: {}", dir, e))
        })?;

        let persisted = PersistedIndex {
            version: FORMAT_VERSION,
            info: self.info.clone(),
            entries: self.entries.clone(),
        };
        let json = serde_json::to_vec(&persisted)?;

        let target = Self::index_file(dir);
        let tmp = dir.join(format!("{}.tmp", INDEX_FILE));
        std::fs::write(&tmp, json)?;
        std::fs::rename(&tmp, &target)?;

        tracing::info!("Saved index with {} entries to {:?}", self.entries.len(), target);
        Ok(())
    }

    /// Load a persisted index from `dir`.
    pub fn load(dir: &Path) -> AppResult<Self> {
        let path = Self::index_file(dir);
        let bytes = std::fs::read(&path).map_err(|e| {
            AppError::Knowledge(format!("Failed to read index {:?}: {}", path, e))
        })?;

        let persisted: PersistedIndex = serde_json::from_slice(&bytes)?;
        if persisted.version != FORMAT_VERSION {
            return Err(AppError::Knowledge(format!(
                "Unsupported index format version {} in {:?}",
                persisted.version, path
            )));
        }

        tracing::info!(
            "Loaded index with {} entries from {:?}",
            persisted.entries.len(),
            path
        );
        Ok(Self {
            info: persisted.info,
            entries: persisted.entries,
        })
    }
}

impl VectorIndex for InMemoryIndex {
    fn info(&self) -> &IndexInfo {
        &self.info
    }

    fn entries(&self) -> &[IndexEntry] {
        &self.entries
    }

    fn search(&self, query_embedding: &[f32], top_k: usize) -> Vec<ScoredChunk> {
        let mut scored: Vec<ScoredChunk> = self
            .entries
            .iter()
            .map(|e| ScoredChunk {
                chunk: e.chunk.clone(),
                score: cosine_similarity(query_embedding, &e.embedding),
            })
            .collect();

        scored.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        scored.truncate(top_k);
        scored
    }

    fn subset(&self, keep: &dyn Fn(&Chunk) -> bool) -> Box<dyn VectorIndex> {
        Box::new(Self {
            info: self.info.clone(),
            entries: self
                .entries
                .iter()
                .filter(|e| keep(&e.chunk))
                .cloned()
                .collect(),
        })
    }
}
