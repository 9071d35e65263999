//! Prompt system for ManualQA.
//!
//! This crate provides structured prompt management with:
//! - YAML-based prompt definitions
//! - Handlebars template rendering
//! - A registry mapping machine names to their specialized templates

pub mod builder;
pub mod loader;
pub mod registry;
pub mod types;

// Re-export main types
pub use builder::build_prompt;
pub use loader::{list_prompts, load_all, load_prompt};
pub use registry::PromptRegistry;
pub use types::{BuiltPrompt, BuiltPromptMetadata, PromptBehavior, PromptDefinition, PromptInput};
