//! Prompt builder for rendering templates.

use crate::types::{BuiltPrompt, BuiltPromptMetadata, PromptDefinition, PromptInput};
use handlebars::Handlebars;
use manualqa_core::{AppError, AppResult};
use std::collections::HashMap;

/// Build a prompt from a definition and its slot values.
///
/// # Example
/// ```no_run
/// use manualqa_prompt::{build_prompt, PromptInput, PromptRegistry};
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let registry = PromptRegistry::new();
/// let input = PromptInput::new("Rated input 400V", "What voltage does it need?");
/// let built = build_prompt(registry.general(), &input)?;
/// println!("{}", built.user);
/// # Ok(())
/// # }
/// ```
pub fn build_prompt(definition: &PromptDefinition, input: &PromptInput) -> AppResult<BuiltPrompt> {
    tracing::debug!("Building prompt: {}", definition.id);

    let rendered = render_template(&definition.template, &input.to_variables())?;

    Ok(BuiltPrompt {
        system: None,
        user: rendered,
        metadata: BuiltPromptMetadata {
            source_prompt_id: definition.id.clone(),
            entity: definition.entity.clone(),
            temperature: definition.behavior.temperature,
        },
    })
}

/// Render a Handlebars template with variables.
pub(crate) fn render_template(
    template: &str,
    variables: &HashMap<String, String>,
) -> AppResult<String> {
    let mut handlebars = Handlebars::new();

    // Manual text is plain text; HTML escaping would mangle quotes and ampersands.
    handlebars.register_escape_fn(handlebars::no_escape);

    handlebars
        .register_template_string("prompt", template)
        .map_err(|e| AppError::Prompt(format!("Failed to register template: {}", e)))?;

    handlebars
        .render("prompt", &variables)
        .map_err(|e| AppError::Prompt(format!("Failed to render template: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::PromptBehavior;

    fn definition(template: &str) -> PromptDefinition {
        PromptDefinition {
            id: "test.prompt".to_string(),
            title: "Test".to_string(),
            api_version: "1.0".to_string(),
            created_by: "test".to_string(),
            entity: Some("Renegade".to_string()),
            behavior: PromptBehavior::default(),
            template: template.to_string(),
        }
    }

    #[test]
    fn test_render_simple_template() {
        let mut vars = HashMap::new();
        vars.insert("question".to_string(), "Hello, world!".to_string());

        let result = render_template("Question: {{question}}", &vars).unwrap();
        assert_eq!(result, "Question: Hello, world!");
    }

    #[test]
    fn test_build_prompt_fills_all_slots() {
        let def = definition("{{chat_history}}|{{context}}|{{input}}");
        let input = PromptInput::new("Fuse: 16 A", "fuse size?").with_history("User: hi");

        let built = build_prompt(&def, &input).unwrap();
        assert_eq!(built.user, "User: hi|Fuse: 16 A|fuse size?");
        assert_eq!(built.metadata.source_prompt_id, "test.prompt");
        assert_eq!(built.metadata.entity.as_deref(), Some("Renegade"));
    }

    #[test]
    fn test_no_html_escaping() {
        let def = definition("{{context}}");
        let input = PromptInput::new("\"A\" & <B>", "");
        let built = build_prompt(&def, &input).unwrap();
        assert_eq!(built.user, "\"A\" & <B>");
    }

    #[test]
    fn test_invalid_template_is_prompt_error() {
        let def = definition("{{#if}}");
        let result = build_prompt(&def, &PromptInput::default());
        assert!(matches!(result, Err(AppError::Prompt(_))));
    }
}
