//! Ingestion and retrieval over a corpus of equipment manuals.
//!
//! Pipeline:
//! - [`extractor`]: PDF pages to text and tables
//! - [`sections`] and [`attributes`]: welding-process cross-reference
//! - [`chunker`]: overlapping passages and row-oriented table chunks
//! - [`index_builder`]: one embedded, persisted [`vector_index`]
//! - [`entity`] and [`router`]: which machines a query is about, and the
//!   narrowed index that answers it
//! - [`rag`]: prompting, generation and conversation state

pub mod attributes;
pub mod chunker;
pub mod embeddings;
pub mod entity;
pub mod extractor;
pub mod fuzz;
pub mod index_builder;
pub mod manifest;
pub mod rag;
pub mod router;
pub mod sections;
pub mod types;
pub mod vector_index;

#[cfg(test)]
mod test_support;

#[cfg(test)]
mod tests;

// Re-export commonly used types
pub use embeddings::{create_provider, EmbeddingConfig, EmbeddingProvider};
pub use entity::EntityDetector;
pub use index_builder::{build_or_load, rebuild, BuildSettings, BuildStats};
pub use manifest::load_manifest;
pub use rag::{AppContext, ChatSession, RagResponse, RagSourceRef, Reply};
pub use router::{route, Retriever, RouteScope};
pub use types::{
    Chunk, ChunkMetadata, ChunkTag, CrossReferenceTable, DetectionResult, EntityManifest,
    MatchTier, SourceDocument,
};
pub use vector_index::{InMemoryIndex, IndexInfo, VectorIndex};
