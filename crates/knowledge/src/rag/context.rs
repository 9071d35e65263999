//! Process-wide application state.
//!
//! Owns the machine manifest, the lazily built index, prompt templates,
//! generation and embedding backends, and conversation history per context
//! key. Built once at startup and shared by reference.

use crate::embeddings::{create_provider, EmbeddingProvider};
use crate::entity::EntityDetector;
use crate::index_builder::{build_or_load, BuildSettings};
use crate::manifest::load_manifest;
use crate::rag::types::Turn;
use crate::types::{DetectionResult, EntityManifest};
use crate::vector_index::VectorIndex;
use manualqa_core::{AppConfig, AppResult};
use manualqa_llm::{select_backend, LlmClient, UnavailableClient};
use manualqa_prompt::PromptRegistry;
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::OnceCell;

/// History key for the general (no machine) conversation.
pub const GENERAL_KEY: &str = "general";

/// Conversation key for a set of machines: sorted names joined by `-`.
pub fn context_key(machines: &[String]) -> String {
    if machines.is_empty() {
        return GENERAL_KEY.to_string();
    }
    let mut sorted = machines.to_vec();
    sorted.sort();
    sorted.join("-")
}

pub struct AppContext {
    settings: BuildSettings,
    top_k: usize,
    temperature: Option<f32>,
    manifest: EntityManifest,
    detector: EntityDetector,
    registry: PromptRegistry,
    llm: Arc<dyn LlmClient>,
    fallback_llm: Option<Arc<dyn LlmClient>>,
    embedder: Arc<dyn EmbeddingProvider>,
    index: OnceCell<Arc<dyn VectorIndex>>,
    history: Mutex<BTreeMap<String, Vec<Turn>>>,
}

impl AppContext {
    pub fn new(
        settings: BuildSettings,
        top_k: usize,
        manifest: EntityManifest,
        llm: Arc<dyn LlmClient>,
        embedder: Arc<dyn EmbeddingProvider>,
    ) -> Self {
        let detector = EntityDetector::from_manifest(&manifest);
        let registry = PromptRegistry::with_label(&settings.label);
        Self {
            settings,
            top_k,
            temperature: None,
            manifest,
            detector,
            registry,
            llm,
            fallback_llm: None,
            embedder,
            index: OnceCell::new(),
            history: Mutex::new(BTreeMap::new()),
        }
    }

    /// Wire everything from configuration.
    ///
    /// Probes the primary generation server once; when it is up and a
    /// fallback key exists, the hosted backend is kept for per-query
    /// failover. With neither backend usable, every question fails at the
    /// query boundary instead of at startup.
    pub async fn from_config(config: &AppConfig) -> AppResult<Self> {
        let settings = BuildSettings::from_config(config);

        let manifest = load_manifest(&settings.pdf_dir, &settings.marker_term).unwrap_or_else(|e| {
            tracing::warn!("Machine list unavailable: {}", e);
            EntityManifest::default()
        });

        let registry = PromptRegistry::load(&config.prompts_dir(), &config.corpus.label)?;

        let api_key = config.fallback_api_key();
        let (llm, fallback) = match select_backend(&config.generation, api_key.as_deref()).await {
            Ok(selection) => (selection.active, selection.failover),
            Err(e) => {
                tracing::error!("{}", e);
                let unavailable: Arc<dyn LlmClient> = Arc::new(UnavailableClient::new(e.to_string()));
                (unavailable, None)
            }
        };

        let embedder = create_provider(&settings.embedding)?;

        Ok(Self::new(settings, config.index.top_k, manifest, llm, embedder)
            .with_registry(registry)
            .with_fallback(fallback)
            .with_temperature(config.generation.temperature))
    }

    pub fn with_registry(mut self, registry: PromptRegistry) -> Self {
        self.registry = registry;
        self
    }

    pub fn with_fallback(mut self, fallback: Option<Arc<dyn LlmClient>>) -> Self {
        self.fallback_llm = fallback;
        self
    }

    /// Override every template's temperature.
    pub fn with_temperature(mut self, temperature: Option<f32>) -> Self {
        self.temperature = temperature;
        self
    }

    /// Use an already loaded index instead of building on first use.
    pub fn with_index(mut self, index: Arc<dyn VectorIndex>) -> Self {
        self.index = OnceCell::from(index);
        self
    }

    /// The index, built or loaded on first call.
    pub async fn index(&self) -> AppResult<Arc<dyn VectorIndex>> {
        self.index
            .get_or_try_init(|| async {
                let index = build_or_load(&self.settings, self.embedder.as_ref()).await?;
                Ok::<Arc<dyn VectorIndex>, manualqa_core::AppError>(Arc::new(index))
            })
            .await
            .cloned()
    }

    pub fn manifest(&self) -> &EntityManifest {
        &self.manifest
    }

    pub fn detect(&self, query: &str) -> DetectionResult {
        self.detector.detect(query)
    }

    pub fn registry(&self) -> &PromptRegistry {
        &self.registry
    }

    pub fn llm(&self) -> &Arc<dyn LlmClient> {
        &self.llm
    }

    pub fn fallback_llm(&self) -> Option<&Arc<dyn LlmClient>> {
        self.fallback_llm.as_ref()
    }

    pub fn embedder(&self) -> &dyn EmbeddingProvider {
        self.embedder.as_ref()
    }

    pub fn top_k(&self) -> usize {
        self.top_k
    }

    pub fn temperature(&self) -> Option<f32> {
        self.temperature
    }

    /// The history map, recovered if a panicking holder poisoned the lock.
    fn turns(&self) -> MutexGuard<'_, BTreeMap<String, Vec<Turn>>> {
        self.history.lock().unwrap_or_else(|poisoned| {
            tracing::warn!("Conversation history lock was poisoned; recovering");
            poisoned.into_inner()
        })
    }

    /// Prior turns recorded under `key`, oldest first.
    pub fn history(&self, key: &str) -> Vec<Turn> {
        self.turns().get(key).cloned().unwrap_or_default()
    }

    /// Append a completed turn under `key`.
    pub fn record(&self, key: &str, turn: Turn) {
        self.turns().entry(key.to_string()).or_default().push(turn);
    }

    /// Keys with at least one recorded turn.
    pub fn history_keys(&self) -> Vec<String> {
        self.turns().keys().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embeddings::providers::MockProvider;
    use crate::embeddings::EmbeddingConfig;
    use manualqa_core::AppError;
    use manualqa_llm::MockLlmClient;
    use tempfile::TempDir;

    fn settings(root: &std::path::Path) -> BuildSettings {
        BuildSettings {
            pdf_dir: root.join("pdfs"),
            index_path: root.join("faiss_dbs").join("combined_index"),
            marker_term: "dimensions".to_string(),
            label: "ESAB".to_string(),
            chunk_size: 1000,
            chunk_overlap: 200,
            verify_fingerprint: false,
            embedding: EmbeddingConfig::mock(16),
        }
    }

    fn context(root: &std::path::Path, embedder: Arc<MockProvider>) -> AppContext {
        AppContext::new(
            settings(root),
            13,
            EntityManifest::new(vec!["Warrior-Edge".to_string()]),
            Arc::new(MockLlmClient::replying("ok")),
            embedder,
        )
    }

    #[test]
    fn test_context_key() {
        assert_eq!(context_key(&[]), "general");
        assert_eq!(
            context_key(&["Warrior".to_string(), "Aristo".to_string()]),
            "Aristo-Warrior"
        );
    }

    #[test]
    fn test_history_per_key() {
        let temp = TempDir::new().unwrap();
        let ctx = context(temp.path(), Arc::new(MockProvider::new(16)));
        let turn = Turn {
            user: "q".to_string(),
            assistant: "a".to_string(),
        };

        ctx.record("Warrior-Edge", turn.clone());
        assert_eq!(ctx.history("Warrior-Edge"), vec![turn]);
        assert!(ctx.history("general").is_empty());
        assert_eq!(ctx.history_keys(), vec!["Warrior-Edge"]);
    }

    #[test]
    fn test_record_survives_poisoned_history() {
        let temp = TempDir::new().unwrap();
        let ctx = context(temp.path(), Arc::new(MockProvider::new(16)));

        let _ = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            let _guard = ctx.history.lock().unwrap();
            panic!("holder panicked");
        }));
        assert!(ctx.history.is_poisoned());

        let turn = Turn {
            user: "q".to_string(),
            assistant: "a".to_string(),
        };
        ctx.record("general", turn.clone());
        assert_eq!(ctx.history("general"), vec![turn]);
    }

    #[test]
    fn test_detect_uses_manifest() {
        let temp = TempDir::new().unwrap();
        let ctx = context(temp.path(), Arc::new(MockProvider::new(16)));
        assert_eq!(ctx.detect("warrior edge fuse").entities, vec!["Warrior-Edge"]);
    }

    #[tokio::test]
    async fn test_index_built_once() {
        let temp = TempDir::new().unwrap();
        let settings = settings(temp.path());
        std::fs::create_dir_all(&settings.pdf_dir).unwrap();
        crate::test_support::write_pdf(&settings.pdf_dir.join("Warrior-Edge.pdf"), &[&["Overall dimensions"]]);

        let embedder = Arc::new(MockProvider::new(16));
        let ctx = context(temp.path(), Arc::clone(&embedder));

        let first = ctx.index().await.unwrap();
        let second = ctx.index().await.unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(embedder.batch_calls(), 1);
    }

    #[tokio::test]
    async fn test_missing_corpus_is_unavailable() {
        let temp = TempDir::new().unwrap();
        let ctx = context(temp.path(), Arc::new(MockProvider::new(16)));
        assert!(matches!(ctx.index().await, Err(AppError::IndexUnavailable(_))));
    }

    #[tokio::test]
    async fn test_no_backend_fails_per_query() {
        let temp = TempDir::new().unwrap();
        let mut config = AppConfig {
            workspace: temp.path().to_path_buf(),
            ..Default::default()
        };
        config.generation.primary.endpoint = "http://127.0.0.1:9".to_string();
        config.generation.primary.probe_timeout_secs = 1;
        config.generation.fallback.api_key_env = "MANUALQA_TEST_UNSET_KEY".to_string();
        config.embedding.provider = "mock".to_string();
        config.embedding.dimensions = 16;

        let ctx = AppContext::from_config(&config).await.unwrap();
        assert_eq!(ctx.llm().provider_name(), "unavailable");
        assert!(ctx.fallback_llm().is_none());

        let index = crate::vector_index::InMemoryIndex::from_embedded(
            crate::vector_index::IndexInfo {
                provider: "mock".to_string(),
                model: "trigram-v1".to_string(),
                dimensions: 1,
                fingerprint: None,
                created_at: chrono::Utc::now(),
            },
            vec![crate::types::Chunk::text_passage("Warrior", 1, 0, "fuse")],
            vec![vec![1.0]],
        )
        .unwrap();
        let ctx = Arc::new(ctx.with_index(Arc::new(index)));

        let mut session = crate::rag::ChatSession::new(ctx);
        let reply = session.respond("what fuse is needed").await.unwrap();
        assert_eq!(reply.text(), crate::rag::types::UNABLE_TO_PROCESS);
    }
}
