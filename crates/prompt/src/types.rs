//! Prompt types for ManualQA.
//!
//! This module defines the domain entities for the prompt system.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A prompt definition loaded from YAML.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PromptDefinition {
    /// Unique prompt identifier
    pub id: String,

    /// Human-readable title
    pub title: String,

    /// API version for schema evolution
    #[serde(rename = "apiVersion")]
    pub api_version: String,

    /// Creator identifier
    #[serde(rename = "createdBy", default)]
    pub created_by: String,

    /// Machine this template specializes in (file stem of its manual).
    /// `None` for general-purpose templates.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entity: Option<String>,

    /// Behavioral settings
    #[serde(default)]
    pub behavior: PromptBehavior,

    /// Template string with Handlebars syntax.
    ///
    /// Recognized slots: `context`, `question` (alias `input`) and
    /// `chat_history`.
    pub template: String,
}

/// Behavioral settings for prompt execution.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PromptBehavior {
    /// Sampling temperature override for this template
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,

    /// Style (e.g., "concise", "step-by-step")
    #[serde(default = "default_style")]
    pub style: String,
}

fn default_style() -> String {
    "concise".to_string()
}

impl Default for PromptBehavior {
    fn default() -> Self {
        Self {
            temperature: None,
            style: default_style(),
        }
    }
}

/// Values substituted into a template's slots.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PromptInput {
    /// Retrieved passages, already joined
    pub context: String,

    /// The user's question
    pub question: String,

    /// Prior turns for the active conversation key
    pub chat_history: String,
}

impl PromptInput {
    /// Create input with context and question and an empty history.
    pub fn new(context: impl Into<String>, question: impl Into<String>) -> Self {
        Self {
            context: context.into(),
            question: question.into(),
            chat_history: String::new(),
        }
    }

    /// Set the rendered chat history.
    pub fn with_history(mut self, chat_history: impl Into<String>) -> Self {
        self.chat_history = chat_history.into();
        self
    }

    /// Template variables; `input` mirrors `question` for machine templates.
    pub fn to_variables(&self) -> HashMap<String, String> {
        let mut vars = HashMap::new();
        vars.insert("context".to_string(), self.context.clone());
        vars.insert("question".to_string(), self.question.clone());
        vars.insert("input".to_string(), self.question.clone());
        vars.insert("chat_history".to_string(), self.chat_history.clone());
        vars
    }
}

/// A fully built prompt ready for the generation backend.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuiltPrompt {
    /// System message (optional)
    pub system: Option<String>,

    /// User message (required)
    pub user: String,

    /// Metadata about the built prompt
    pub metadata: BuiltPromptMetadata,
}

/// Metadata about a built prompt.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuiltPromptMetadata {
    /// Source prompt ID
    #[serde(rename = "sourcePromptId")]
    pub source_prompt_id: String,

    /// Machine the template is specialized for, if any
    #[serde(skip_serializing_if = "Option::is_none")]
    pub entity: Option<String>,

    /// Temperature requested by the template, if any
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
}
