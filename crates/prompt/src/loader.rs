//! Prompt loader for YAML prompt definitions.

use crate::types::PromptDefinition;
use manualqa_core::{AppError, AppResult};
use std::path::Path;

/// Load a prompt definition by ID from a prompts directory.
///
/// Looks for a file named `<id>.yml` inside `prompts_dir`
/// (normally `.manualqa/prompts/`).
pub fn load_prompt(prompts_dir: &Path, prompt_id: &str) -> AppResult<PromptDefinition> {
    let prompt_file = prompts_dir.join(format!("{}.yml", prompt_id));

    tracing::debug!("Loading prompt from: {:?}", prompt_file);

    if !prompt_file.exists() {
        return Err(AppError::Prompt(format!(
            "Prompt file not found: {:?}",
            prompt_file
        )));
    }

    load_prompt_file(&prompt_file)
}

/// List all available prompt IDs in a prompts directory, sorted.
pub fn list_prompts(prompts_dir: &Path) -> AppResult<Vec<String>> {
    if !prompts_dir.exists() {
        return Ok(Vec::new());
    }

    let mut prompt_ids = Vec::new();

    for entry in walkdir::WalkDir::new(prompts_dir)
        .max_depth(1)
        .into_iter()
        .filter_map(|e| e.ok())
    {
        let path = entry.path();
        if path.is_file() && path.extension().and_then(|s| s.to_str()) == Some("yml") {
            if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                prompt_ids.push(stem.to_string());
            }
        }
    }

    prompt_ids.sort();
    Ok(prompt_ids)
}

/// Load every prompt definition in a directory.
///
/// Files that fail to parse are logged and skipped.
pub fn load_all(prompts_dir: &Path) -> AppResult<Vec<PromptDefinition>> {
    let mut definitions = Vec::new();

    for id in list_prompts(prompts_dir)? {
        match load_prompt(prompts_dir, &id) {
            Ok(def) => definitions.push(def),
            Err(e) => tracing::warn!("Skipping prompt '{}': {}", id, e),
        }
    }

    Ok(definitions)
}

fn load_prompt_file(prompt_file: &Path) -> AppResult<PromptDefinition> {
    let contents = std::fs::read_to_string(prompt_file).map_err(|e| {
        AppError::Prompt(format!(
            "Failed to read prompt file {:?}: {}",
            prompt_file, e
        ))
    })?;

    let definition: PromptDefinition = serde_yaml::from_str(&contents).map_err(|e| {
        AppError::Prompt(format!(
            "Failed to parse prompt YAML {:?}: {}",
            prompt_file, e
        ))
    })?;

    validate_prompt(&definition)?;

    tracing::info!("Loaded prompt: {} ({})", definition.id, definition.title);

    Ok(definition)
}

/// Validate a prompt definition.
pub(crate) fn validate_prompt(def: &PromptDefinition) -> AppResult<()> {
    if def.id.is_empty() {
        return Err(AppError::Prompt("Prompt ID cannot be empty".to_string()));
    }

    if def.title.is_empty() {
        return Err(AppError::Prompt("Prompt title cannot be empty".to_string()));
    }

    if def.template.is_empty() {
        return Err(AppError::Prompt(
            "Prompt template cannot be empty".to_string(),
        ));
    }

    if !def.api_version.contains('.') {
        return Err(AppError::Prompt(format!(
            "Invalid apiVersion format: {}. Expected format: 'x.y'",
            def.api_version
        )));
    }

    if matches!(def.entity.as_deref(), Some(e) if e.trim().is_empty()) {
        return Err(AppError::Prompt(format!(
            "Prompt '{}' has an empty entity",
            def.id
        )));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::path::PathBuf;
    use tempfile::TempDir;

    fn create_test_prompt(dir: &Path, id: &str, valid: bool) -> PathBuf {
        fs::create_dir_all(dir).unwrap();

        let content = if valid {
            format!(
                r#"
id: {}
title: "Test Prompt"
apiVersion: "1.0"
createdBy: test
entity: Renegade
template: "Manual: {{{{context}}}} Q: {{{{input}}}}"
"#,
                id
            )
        } else {
            "invalid: yaml: content:".to_string()
        };

        let file_path = dir.join(format!("{}.yml", id));
        fs::write(&file_path, content).unwrap();
        file_path
    }

    #[test]
    fn test_load_valid_prompt() {
        let temp_dir = TempDir::new().unwrap();
        create_test_prompt(temp_dir.path(), "renegade", true);

        let prompt = load_prompt(temp_dir.path(), "renegade").unwrap();
        assert_eq!(prompt.id, "renegade");
        assert_eq!(prompt.entity.as_deref(), Some("Renegade"));
        assert_eq!(prompt.template, "Manual: {{context}} Q: {{input}}");
    }

    #[test]
    fn test_load_nonexistent_prompt() {
        let temp_dir = TempDir::new().unwrap();
        assert!(load_prompt(temp_dir.path(), "nonexistent").is_err());
    }

    #[test]
    fn test_load_invalid_yaml() {
        let temp_dir = TempDir::new().unwrap();
        create_test_prompt(temp_dir.path(), "invalid", false);

        assert!(load_prompt(temp_dir.path(), "invalid").is_err());
    }

    #[test]
    fn test_list_prompts_sorted() {
        let temp_dir = TempDir::new().unwrap();
        create_test_prompt(temp_dir.path(), "prompt2", true);
        create_test_prompt(temp_dir.path(), "prompt1", true);
        fs::write(temp_dir.path().join("notes.txt"), "ignored").unwrap();

        let prompts = list_prompts(temp_dir.path()).unwrap();
        assert_eq!(prompts, vec!["prompt1".to_string(), "prompt2".to_string()]);
    }

    #[test]
    fn test_load_all_skips_invalid() {
        let temp_dir = TempDir::new().unwrap();
        create_test_prompt(temp_dir.path(), "good", true);
        create_test_prompt(temp_dir.path(), "bad", false);

        let defs = load_all(temp_dir.path()).unwrap();
        assert_eq!(defs.len(), 1);
        assert_eq!(defs[0].id, "good");
    }

    #[test]
    fn test_missing_dir_lists_nothing() {
        let temp_dir = TempDir::new().unwrap();
        let prompts = list_prompts(&temp_dir.path().join("absent")).unwrap();
        assert!(prompts.is_empty());
    }
}
