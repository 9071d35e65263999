//! Entity → template registry.
//!
//! Populated once at startup from the built-in general template and any
//! machine-specific definitions in `.manualqa/prompts/`. Lookups are
//! case-insensitive on the entity name.

use crate::loader::{load_all, validate_prompt};
use crate::types::{PromptBehavior, PromptDefinition};
use manualqa_core::{AppError, AppResult};
use std::collections::BTreeMap;
use std::path::Path;

const GENERAL_TEMPLATE: &str = r#"You are an AI assistant for {{label}}, knowledgeable about {{label}} welding machines.

Instructions:
1. If the user specifies one or more machines, focus your answer on those machines' documents.
2. If the user does not specify any machine, use the entire knowledge base (including the welding process table).
3. Always ground your responses in the retrieved information. Avoid speculation beyond what is in the knowledge base.
4. If the user asks which machines handle a welding process, look up the welding process analysis entries.
5. If the user asks which machines you can answer about, reference the machines list entry.
6. If you cannot find any relevant information, answer generally and do not repeat these instructions.
{{#if chat_history}}
Chat History:
{{chat_history}}
{{/if}}
Context: {{context}}
Question: {{question}}

Provide an accurate and concise answer, referencing only the knowledge you have retrieved.
"#;

/// Registry of prompt templates keyed by machine name.
#[derive(Debug, Clone)]
pub struct PromptRegistry {
    general: PromptDefinition,
    by_entity: BTreeMap<String, PromptDefinition>,
}

impl PromptRegistry {
    /// Registry holding only the built-in general template.
    pub fn new() -> Self {
        Self::with_label("ESAB")
    }

    /// Registry whose general template names the given corpus label.
    pub fn with_label(label: &str) -> Self {
        Self {
            general: PromptDefinition {
                id: "general".to_string(),
                title: format!("{} knowledge base assistant", label),
                api_version: "1.0".to_string(),
                created_by: "manualqa".to_string(),
                entity: None,
                behavior: PromptBehavior {
                    temperature: Some(0.05),
                    style: "concise".to_string(),
                },
                template: GENERAL_TEMPLATE.replace("{{label}}", label),
            },
            by_entity: BTreeMap::new(),
        }
    }

    /// Load every machine template found in `prompts_dir`.
    ///
    /// Definitions without an `entity` are ignored; a missing directory
    /// yields a registry with only the general template.
    pub fn load(prompts_dir: &Path, label: &str) -> AppResult<Self> {
        let mut registry = Self::with_label(label);

        for def in load_all(prompts_dir)? {
            if def.entity.is_none() {
                tracing::debug!("Prompt '{}' has no entity; not registered", def.id);
                continue;
            }
            registry.register(def)?;
        }

        tracing::info!(
            "Prompt registry ready: {} machine template(s)",
            registry.by_entity.len()
        );
        Ok(registry)
    }

    /// Register a machine template under its entity name.
    ///
    /// A later registration for the same entity replaces the earlier one.
    pub fn register(&mut self, definition: PromptDefinition) -> AppResult<()> {
        validate_prompt(&definition)?;

        let entity = definition.entity.as_deref().ok_or_else(|| {
            AppError::Prompt(format!(
                "Prompt '{}' cannot be registered without an entity",
                definition.id
            ))
        })?;

        let key = entity.to_lowercase();
        if self.by_entity.contains_key(&key) {
            tracing::warn!("Replacing prompt template for '{}'", entity);
        }
        self.by_entity.insert(key, definition);
        Ok(())
    }

    /// The general-purpose template.
    pub fn general(&self) -> &PromptDefinition {
        &self.general
    }

    /// Template registered for `entity`.
    ///
    /// # Errors
    /// `AppError::Prompt` when no template is registered for the entity.
    pub fn template_for(&self, entity: &str) -> AppResult<&PromptDefinition> {
        self.by_entity
            .get(&entity.to_lowercase())
            .ok_or_else(|| AppError::Prompt(format!("No template registered for '{}'", entity)))
    }

    /// Pick the template for a set of detected machines.
    ///
    /// A single detected machine with a registered template gets it; every
    /// other case (none, several, unregistered) uses the general template.
    pub fn select(&self, detected: &[String]) -> &PromptDefinition {
        match detected {
            [only] => self.template_for(only).unwrap_or(&self.general),
            _ => &self.general,
        }
    }

    /// Entities with a registered template, lowercased and sorted.
    pub fn entities(&self) -> Vec<&str> {
        self.by_entity.keys().map(String::as_str).collect()
    }
}

impl Default for PromptRegistry {
    fn default() -> Self {
        Self::new()
    }
}
