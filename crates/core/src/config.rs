//! Configuration management for ManualQA.
//!
//! Configuration is layered, later layers winning:
//! - Built-in defaults
//! - Config file (`.manualqa/config.yaml` or `MANUALQA_CONFIG`)
//! - Environment variables
//! - Command-line flags
//!
//! The configuration is workspace-centric: relative paths for the PDF corpus and
//! the persisted index resolve against the workspace root.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{AppError, AppResult};

/// Name of the per-workspace state directory.
pub const STATE_DIR: &str = ".manualqa";

/// Main application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Path to the workspace root (contains .manualqa/)
    pub workspace: PathBuf,

    /// Optional config file path
    pub config_file: Option<PathBuf>,

    /// Log level override
    pub log_level: Option<String>,

    /// Verbose mode (enables debug logging)
    pub verbose: bool,

    /// Disable colored output
    pub no_color: bool,

    /// Source corpus settings
    pub corpus: CorpusConfig,

    /// Vector index settings
    pub index: IndexConfig,

    /// Generation backend settings
    pub generation: GenerationConfig,

    /// Embedding service settings
    pub embedding: EmbeddingSettings,
}

/// Where manuals live and how they are validated.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct CorpusConfig {
    /// Directory holding the PDF manuals
    pub pdf_dir: PathBuf,

    /// A manual is only accepted when some page contains this term
    pub marker_term: String,

    /// Brand label used in the manifest document ("<label> Machines List")
    pub label: String,
}

impl Default for CorpusConfig {
    fn default() -> Self {
        Self {
            pdf_dir: PathBuf::from("pdfs"),
            marker_term: "dimensions".to_string(),
            label: "ESAB".to_string(),
        }
    }
}

/// Vector index and chunking settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct IndexConfig {
    /// Directory holding persisted indexes
    pub dir: PathBuf,

    /// Name of the combined corpus index inside `dir`
    pub name: String,

    /// Target passage size in characters
    pub chunk_size: usize,

    /// Characters shared between neighbouring passages
    pub chunk_overlap: usize,

    /// Number of passages handed to the generation backend
    pub top_k: usize,

    /// Rebuild when the corpus fingerprint no longer matches the stored one
    pub verify_fingerprint: bool,
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("faiss_dbs"),
            name: "combined_index".to_string(),
            chunk_size: 1000,
            chunk_overlap: 200,
            top_k: 13,
            verify_fingerprint: false,
        }
    }
}

/// Primary and fallback generation backends.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default, rename_all = "camelCase")]
pub struct GenerationConfig {
    pub primary: PrimaryBackendConfig,
    pub fallback: FallbackBackendConfig,
    pub temperature: Option<f32>,
}

/// Self-hosted Ollama server, health-checked before use.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct PrimaryBackendConfig {
    pub endpoint: String,
    pub model: String,
    /// Timeout for the availability probe, in seconds
    pub probe_timeout_secs: u64,
}

impl Default for PrimaryBackendConfig {
    fn default() -> Self {
        Self {
            endpoint: "http://localhost:11434".to_string(),
            model: "llama3".to_string(),
            probe_timeout_secs: 5,
        }
    }
}

/// Hosted OpenAI-compatible service used when the primary is unreachable.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct FallbackBackendConfig {
    pub endpoint: String,
    pub model: String,
    /// Environment variable holding the API key
    pub api_key_env: String,
}

impl Default for FallbackBackendConfig {
    fn default() -> Self {
        Self {
            endpoint: "https://api.groq.com/openai/v1".to_string(),
            model: "llama3-8b-8192".to_string(),
            api_key_env: "GROQ_API_KEY".to_string(),
        }
    }
}

/// Embedding service selection.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct EmbeddingSettings {
    /// Provider name: "mock" or "ollama"
    pub provider: String,
    pub model: String,
    pub dimensions: usize,
    /// Base URL for network providers
    pub endpoint: Option<String>,
}

impl Default for EmbeddingSettings {
    fn default() -> Self {
        Self {
            provider: "ollama".to_string(),
            model: "nomic-embed-text".to_string(),
            dimensions: 768,
            endpoint: None,
        }
    }
}

/// Full configuration file structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
struct ConfigFile {
    corpus: Option<CorpusConfig>,
    index: Option<IndexConfig>,
    generation: Option<GenerationConfig>,
    embedding: Option<EmbeddingSettings>,
    logging: Option<LoggingConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct LoggingConfig {
    level: Option<String>,
    color: Option<bool>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            workspace: std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
            config_file: None,
            log_level: None,
            verbose: false,
            no_color: false,
            corpus: CorpusConfig::default(),
            index: IndexConfig::default(),
            generation: GenerationConfig::default(),
            embedding: EmbeddingSettings::default(),
        }
    }
}

impl AppConfig {
    /// Load configuration from defaults, the config file and the environment.
    ///
    /// Environment variables:
    /// - `MANUALQA_WORKSPACE`: Override workspace path
    /// - `MANUALQA_CONFIG`: Path to config file
    /// - `MANUALQA_PDF_DIR`: Directory holding the manuals
    /// - `MANUALQA_INDEX_DIR`: Directory holding persisted indexes
    /// - `RUST_LOG`: Log level
    /// - `NO_COLOR`: Disable colored output
    pub fn load() -> AppResult<Self> {
        Self::load_with(None, None)
    }

    /// Like [`AppConfig::load`], with an explicit workspace and config file
    /// taking precedence over the environment.
    pub fn load_with(workspace: Option<PathBuf>, config_file: Option<PathBuf>) -> AppResult<Self> {
        let mut config = Self::default();

        if let Some(workspace) = workspace
            .or_else(|| std::env::var("MANUALQA_WORKSPACE").ok().map(PathBuf::from))
        {
            config.workspace = workspace;
        }

        config.config_file =
            config_file.or_else(|| std::env::var("MANUALQA_CONFIG").ok().map(PathBuf::from));

        if !config.workspace.exists() {
            return Err(AppError::Config(format!(
                "Workspace directory does not exist: {:?}",
                config.workspace
            )));
        }

        let config_path = match config.config_file {
            Some(ref cf) => cf.clone(),
            None => config.state_dir().join("config.yaml"),
        };

        if config_path.exists() {
            config = config.merge_yaml(&config_path)?;
        }

        if let Ok(dir) = std::env::var("MANUALQA_PDF_DIR") {
            config.corpus.pdf_dir = PathBuf::from(dir);
        }

        if let Ok(dir) = std::env::var("MANUALQA_INDEX_DIR") {
            config.index.dir = PathBuf::from(dir);
        }

        if let Ok(level) = std::env::var("RUST_LOG") {
            config.log_level = Some(level);
        }

        if std::env::var("NO_COLOR").is_ok() {
            config.no_color = true;
        }

        Ok(config)
    }

    /// Merge a YAML configuration file into this config.
    fn merge_yaml(&self, path: &Path) -> AppResult<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            AppError::Config(format!("Failed to read config file {:?}: {}", path, e))
        })?;

        let config_file: ConfigFile = serde_yaml::from_str(&contents).map_err(|e| {
            AppError::Config(format!("Failed to parse config file {:?}: {}", path, e))
        })?;

        let mut result = self.clone();

        if let Some(corpus) = config_file.corpus {
            result.corpus = corpus;
        }
        if let Some(index) = config_file.index {
            result.index = index;
        }
        if let Some(generation) = config_file.generation {
            result.generation = generation;
        }
        if let Some(embedding) = config_file.embedding {
            result.embedding = embedding;
        }
        if let Some(logging) = config_file.logging {
            if let Some(level) = logging.level {
                result.log_level = Some(level);
            }
            if let Some(color) = logging.color {
                result.no_color = !color;
            }
        }

        tracing::debug!("Merged config file {:?}", path);
        Ok(result)
    }

    /// Apply CLI overrides to the configuration.
    ///
    /// Command-line flags take precedence over environment variables and the
    /// config file.
    #[allow(clippy::too_many_arguments)]
    pub fn with_overrides(
        mut self,
        workspace: Option<PathBuf>,
        config_file: Option<PathBuf>,
        pdf_dir: Option<PathBuf>,
        index_dir: Option<PathBuf>,
        log_level: Option<String>,
        verbose: bool,
        no_color: bool,
    ) -> Self {
        if let Some(workspace) = workspace {
            self.workspace = workspace;
        }

        if let Some(config_file) = config_file {
            self.config_file = Some(config_file);
        }

        if let Some(pdf_dir) = pdf_dir {
            self.corpus.pdf_dir = pdf_dir;
        }

        if let Some(index_dir) = index_dir {
            self.index.dir = index_dir;
        }

        if let Some(log_level) = log_level {
            self.log_level = Some(log_level);
        }

        if verbose {
            self.verbose = true;
            if self.log_level.is_none() {
                self.log_level = Some("debug".to_string());
            }
        }

        if no_color {
            self.no_color = true;
        }

        self
    }

    /// Path to the .manualqa directory.
    pub fn state_dir(&self) -> PathBuf {
        self.workspace.join(STATE_DIR)
    }

    /// Ensure the .manualqa directory exists.
    pub fn ensure_state_dir(&self) -> AppResult<()> {
        let state_dir = self.state_dir();
        if !state_dir.exists() {
            std::fs::create_dir_all(&state_dir).map_err(|e| {
                AppError::Config(format!("Failed to create {} directory: {}", STATE_DIR, e))
            })?;
        }
        Ok(())
    }

    /// Directory holding per-machine prompt definitions.
    pub fn prompts_dir(&self) -> PathBuf {
        self.state_dir().join("prompts")
    }

    /// Resolved PDF corpus directory.
    pub fn pdf_dir(&self) -> PathBuf {
        self.resolve(&self.corpus.pdf_dir)
    }

    /// Resolved location of the combined persisted index.
    pub fn index_path(&self) -> PathBuf {
        self.resolve(&self.index.dir).join(&self.index.name)
    }

    /// Resolve the fallback backend's API key from its environment variable.
    pub fn fallback_api_key(&self) -> Option<String> {
        std::env::var(&self.generation.fallback.api_key_env)
            .ok()
            .filter(|key| !key.is_empty())
    }

    /// Validate settings that would otherwise fail deep inside the pipeline.
    pub fn validate(&self) -> AppResult<()> {
        if self.index.chunk_size == 0 {
            return Err(AppError::Config("index.chunkSize must be positive".to_string()));
        }

        if self.index.chunk_overlap >= self.index.chunk_size {
            return Err(AppError::Config(format!(
                "index.chunkOverlap ({}) must be smaller than index.chunkSize ({})",
                self.index.chunk_overlap, self.index.chunk_size
            )));
        }

        if self.index.top_k == 0 {
            return Err(AppError::Config("index.topK must be positive".to_string()));
        }

        if self.corpus.marker_term.trim().is_empty() {
            return Err(AppError::Config(
                "corpus.markerTerm cannot be empty".to_string(),
            ));
        }

        let known_providers = ["mock", "ollama"];
        if !known_providers.contains(&self.embedding.provider.as_str()) {
            return Err(AppError::Config(format!(
                "Unknown embedding provider: {}. Supported: {}",
                self.embedding.provider,
                known_providers.join(", ")
            )));
        }

        Ok(())
    }

    fn resolve(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.workspace.join(path)
        }
    }
}
