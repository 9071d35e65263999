//! Embedding configuration and index compatibility checks.

use crate::vector_index::IndexInfo;
use manualqa_core::config::EmbeddingSettings;
use manualqa_core::{AppError, AppResult};
use serde::{Deserialize, Serialize};

/// Default Ollama base URL when no endpoint is configured.
pub const DEFAULT_OLLAMA_URL: &str = "http://localhost:11434";

/// Resolved embedding configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EmbeddingConfig {
    /// Provider name: "mock" or "ollama"
    pub provider: String,

    /// Model identifier (provider-specific)
    pub model: String,

    /// Embedding vector dimensions
    pub dimensions: usize,

    /// Base URL for network providers
    pub endpoint: String,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self::from(&EmbeddingSettings::default())
    }
}

impl From<&EmbeddingSettings> for EmbeddingConfig {
    fn from(settings: &EmbeddingSettings) -> Self {
        Self {
            provider: settings.provider.clone(),
            model: settings.model.clone(),
            dimensions: settings.dimensions,
            endpoint: settings
                .endpoint
                .clone()
                .unwrap_or_else(|| DEFAULT_OLLAMA_URL.to_string()),
        }
    }
}

impl EmbeddingConfig {
    /// Mock configuration for tests and offline runs.
    pub fn mock(dimensions: usize) -> Self {
        Self {
            provider: "mock".to_string(),
            model: super::providers::mock::MOCK_MODEL.to_string(),
            dimensions,
            endpoint: String::new(),
        }
    }

    /// Check that a persisted index was embedded the way this config embeds.
    pub fn validate_consistency(&self, info: &IndexInfo) -> AppResult<()> {
        if self.provider != info.provider {
            return Err(AppError::Knowledge(format!(
                "Provider mismatch: index built with '{}', configured '{}'",
                info.provider, self.provider
            )));
        }

        if self.model != info.model {
            return Err(AppError::Knowledge(format!(
                "Model mismatch: index built with '{}', configured '{}'",
                info.model, self.model
            )));
        }

        if self.dimensions != info.dimensions {
            return Err(AppError::Knowledge(format!(
                "Dimension mismatch: index built with {}, configured {}",
                info.dimensions, self.dimensions
            )));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn info(provider: &str, model: &str, dimensions: usize) -> IndexInfo {
        IndexInfo {
            provider: provider.to_string(),
            model: model.to_string(),
            dimensions,
            fingerprint: None,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_default_config() {
        let config = EmbeddingConfig::default();
        assert_eq!(config.provider, "ollama");
        assert_eq!(config.model, "nomic-embed-text");
        assert_eq!(config.dimensions, 768);
        assert_eq!(config.endpoint, DEFAULT_OLLAMA_URL);
    }

    #[test]
    fn test_endpoint_from_settings() {
        let settings = EmbeddingSettings {
            endpoint: Some("http://gpu-box:11434".to_string()),
            ..Default::default()
        };
        assert_eq!(EmbeddingConfig::from(&settings).endpoint, "http://gpu-box:11434");
    }

    #[test]
    fn test_validate_consistency_success() {
        let config = EmbeddingConfig::mock(64);
        assert!(config.validate_consistency(&info("mock", "trigram-v1", 64)).is_ok());
    }

    #[test]
    fn test_validate_consistency_provider_mismatch() {
        let result = EmbeddingConfig::mock(64).validate_consistency(&info("ollama", "trigram-v1", 64));
        assert!(result.unwrap_err().to_string().contains("Provider mismatch"));
    }

    #[test]
    fn test_validate_consistency_dimension_mismatch() {
        let result = EmbeddingConfig::mock(64).validate_consistency(&info("mock", "trigram-v1", 768));
        assert!(result.unwrap_err().to_string().contains("Dimension mismatch"));
    }
}
