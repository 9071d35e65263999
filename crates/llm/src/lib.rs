//! Generation backends for ManualQA.
//!
//! This crate provides a provider-agnostic abstraction over the language model
//! that turns a rendered prompt into an answer.
//!
//! # Backends
//! - **Ollama**: self-hosted primary server, health-checked before use
//! - **Hosted**: OpenAI-compatible chat completions API used as fallback
//! - **Mock**: scripted client for tests and offline runs
//!
//! # Example
//! ```no_run
//! use manualqa_core::config::GenerationConfig;
//! use manualqa_llm::{select_backend, LlmRequest};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let selection = select_backend(&GenerationConfig::default(), None).await?;
//! let request = LlmRequest::new("Which machines support TIG?", selection.active.model_name());
//! let response = selection.active.complete(&request).await?;
//! println!("{}", response.content);
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod factory;
pub mod providers;
pub mod types;

// Re-export main types
pub use client::{LlmClient, LlmRequest, LlmResponse, LlmUsage};
pub use factory::{choose_backend, create_client, probe_primary, select_backend, BackendSelection};
pub use providers::{HostedClient, MockLlmClient, OllamaClient, UnavailableClient};
pub use types::BackendKind;
