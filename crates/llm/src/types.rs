//! Backend selection types.

use serde::{Deserialize, Serialize};

/// Which configured generation backend serves a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    /// Self-hosted Ollama server
    Primary,
    /// Hosted OpenAI-compatible service
    Fallback,
}

impl BackendKind {
    /// Get the canonical backend name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Primary => "primary",
            Self::Fallback => "fallback",
        }
    }
}

impl std::fmt::Display for BackendKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
