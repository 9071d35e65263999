//! Generation backend factory.
//!
//! Probes the self-hosted primary with a plain GET and a short timeout, and
//! falls back to the hosted service when the primary does not answer 200.

use crate::client::LlmClient;
use crate::providers::{HostedClient, OllamaClient};
use crate::types::BackendKind;
use manualqa_core::config::GenerationConfig;
use manualqa_core::{AppError, AppResult};
use std::sync::Arc;
use std::time::Duration;

/// Check whether the primary server answers a GET with status 200.
pub async fn probe_primary(endpoint: &str, timeout: Duration) -> bool {
    let client = match reqwest::Client::builder().timeout(timeout).build() {
        Ok(client) => client,
        Err(e) => {
            tracing::error!("Failed to build probe client: {}", e);
            return false;
        }
    };

    match client.get(endpoint).send().await {
        Ok(response) if response.status().as_u16() == 200 => {
            tracing::info!("Connected to primary generation server at {}", endpoint);
            true
        }
        Ok(response) => {
            tracing::warn!(
                "Primary generation server at {} answered with status {}",
                endpoint,
                response.status()
            );
            false
        }
        Err(e) => {
            tracing::warn!("Unable to reach primary generation server at {}: {}", endpoint, e);
            false
        }
    }
}

/// Decide which backend to use from the probe result and fallback credentials.
///
/// # Errors
/// Returns `AppError::Llm` when the primary is down and the fallback has no
/// API key configured.
pub fn choose_backend(primary_up: bool, fallback_api_key: Option<&str>) -> AppResult<BackendKind> {
    if primary_up {
        return Ok(BackendKind::Primary);
    }

    match fallback_api_key {
        Some(key) if !key.is_empty() => Ok(BackendKind::Fallback),
        _ => Err(AppError::Llm(
            "No generation backend available: primary server unreachable and no fallback API key configured"
                .to_string(),
        )),
    }
}

/// Clients chosen at startup.
pub struct BackendSelection {
    pub kind: BackendKind,
    /// Client every request goes to first
    pub active: Arc<dyn LlmClient>,
    /// Hosted client for per-request failover, when the primary is active
    /// and a fallback key exists
    pub failover: Option<Arc<dyn LlmClient>>,
}

/// Probe the primary and build the clients for whichever backend is usable.
pub async fn select_backend(
    config: &GenerationConfig,
    fallback_api_key: Option<&str>,
) -> AppResult<BackendSelection> {
    let timeout = Duration::from_secs(config.primary.probe_timeout_secs);
    let primary_up = probe_primary(&config.primary.endpoint, timeout).await;

    let kind = choose_backend(primary_up, fallback_api_key)?;
    tracing::info!("Using {} generation backend", kind);

    let key = fallback_api_key.unwrap_or_default();
    let failover = (kind == BackendKind::Primary && !key.is_empty())
        .then(|| create_client(BackendKind::Fallback, config, key));

    Ok(BackendSelection {
        kind,
        active: create_client(kind, config, key),
        failover,
    })
}

/// Create the client for a given backend kind.
pub fn create_client(
    kind: BackendKind,
    config: &GenerationConfig,
    fallback_api_key: &str,
) -> Arc<dyn LlmClient> {
    match kind {
        BackendKind::Primary => Arc::new(OllamaClient::with_base_url(
            config.primary.endpoint.as_str(),
            config.primary.model.as_str(),
        )),
        BackendKind::Fallback => Arc::new(HostedClient::new(
            config.fallback.endpoint.as_str(),
            config.fallback.model.as_str(),
            fallback_api_key,
        )),
    }
}
