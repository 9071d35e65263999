//! Generation backend implementations.

pub mod hosted;
pub mod mock;
pub mod ollama;
pub mod unavailable;

pub use hosted::HostedClient;
pub use mock::MockLlmClient;
pub use ollama::OllamaClient;
pub use unavailable::UnavailableClient;
