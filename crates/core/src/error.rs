//! Error types for ManualQA.
//!
//! This module defines a unified error enum covering configuration, I/O,
//! generation, knowledge, prompt, ingestion and index-availability failures.

use thiserror::Error;

/// Unified error type for ManualQA.
///
/// All fallible functions in the workspace return `Result<T, AppError>`.
#[derive(Error, Debug)]
pub enum AppError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// I/O and filesystem errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Generation backend errors
    #[error("LLM error: {0}")]
    Llm(String),

    /// Knowledge base, embedding and retrieval errors
    #[error("Knowledge error: {0}")]
    Knowledge(String),

    /// Prompt system errors
    #[error("Prompt error: {0}")]
    Prompt(String),

    /// A single source could not be ingested
    #[error("Ingestion error for '{source_id}': {message}")]
    Ingestion { source_id: String, message: String },

    /// No vector index could be built or loaded
    #[error("Index unavailable: {0}")]
    IndexUnavailable(String),

    /// Serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Generic errors
    #[error("{0}")]
    Other(String),
}

impl AppError {
    /// Whether this error means the service cannot answer anything until an
    /// operator intervenes.
    pub fn is_unavailable(&self) -> bool {
        matches!(self, AppError::IndexUnavailable(_))
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Serialization(err.to_string())
    }
}

impl From<serde_yaml::Error> for AppError {
    fn from(err: serde_yaml::Error) -> Self {
        AppError::Serialization(err.to_string())
    }
}

/// Convenience type alias for Results with AppError.
pub type AppResult<T> = Result<T, AppError>;
