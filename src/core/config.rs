//! Step, model and API configuration

use crate::core::step::is_valid_step_id;
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;
use tracing::warn;

/// Default chat model when nothing has been selected yet
pub const DEFAULT_MODEL: &str = "gpt-4o-mini";

/// Step configuration file, relative to the assets directory
pub const STEPS_CONFIG_PATH: &str = "config/steps.json";

/// Models configuration file, relative to the assets directory
pub const MODELS_CONFIG_PATH: &str = "config/models.json";

const BUILTIN_STEPS_JSON: &str = include_str!("../../config/steps.json");
const BUILTIN_MODELS_JSON: &str = include_str!("../../config/models.json");

/// One entry of the step configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StepConfigEntry {
    /// Step id (`name` is accepted as an alias)
    #[serde(alias = "name")]
    pub id: String,

    /// Position in the pipeline (defaults to the entry index)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<usize>,

    /// Template file backing this step
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,

    /// Inline prompt used when there is no file or it cannot be read
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub step_prompt: Option<String>,

    /// Inline instructions used when there is no file or it cannot be read
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub llm_instructions: Option<String>,

    /// Inline display name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub menu_name: Option<String>,
}

impl StepConfigEntry {
    /// Minimal entry for a configured step
    pub fn new(id: impl Into<String>, position: usize) -> Self {
        Self {
            id: id.into(),
            position: Some(position),
            file: None,
            step_prompt: None,
            llm_instructions: None,
            menu_name: None,
        }
    }

    pub fn with_file(mut self, file: impl Into<String>) -> Self {
        self.file = Some(file.into());
        self
    }

    pub fn with_inline(
        mut self,
        menu_name: impl Into<String>,
        step_prompt: impl Into<String>,
        llm_instructions: impl Into<String>,
    ) -> Self {
        self.menu_name = Some(menu_name.into());
        self.step_prompt = Some(step_prompt.into());
        self.llm_instructions = Some(llm_instructions.into());
        self
    }
}

/// Parse a step configuration from JSON
pub fn parse_steps_json(json: &str) -> Result<Vec<StepConfigEntry>> {
    let entries: Vec<StepConfigEntry> = serde_json::from_str(json)?;
    validate_steps(&entries)?;
    Ok(entries)
}

/// Parse a step configuration from YAML
pub fn parse_steps_yaml(yaml: &str) -> Result<Vec<StepConfigEntry>> {
    let entries: Vec<StepConfigEntry> = serde_yaml::from_str(yaml)?;
    validate_steps(&entries)?;
    Ok(entries)
}

/// Load a step configuration file, choosing the format by extension
pub fn steps_from_file<P: AsRef<Path>>(path: P) -> Result<Vec<StepConfigEntry>> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path)?;
    match path.extension().and_then(|e| e.to_str()) {
        Some("yaml") | Some("yml") => parse_steps_yaml(&content),
        _ => parse_steps_json(&content),
    }
}

/// Validate a step configuration
pub fn validate_steps(entries: &[StepConfigEntry]) -> Result<()> {
    let mut seen_ids = HashSet::new();
    for entry in entries {
        if entry.id.trim().is_empty() {
            anyhow::bail!("Step configuration contains an entry without an id");
        }
        if !is_valid_step_id(&entry.id) {
            anyhow::bail!(
                "Invalid step ID '{}': use lowercase letters, digits and underscores",
                entry.id
            );
        }
        if !seen_ids.insert(entry.id.as_str()) {
            anyhow::bail!("Duplicate step ID: {}", entry.id);
        }
    }
    Ok(())
}

/// The step configuration compiled into the binary
pub fn builtin_steps() -> Vec<StepConfigEntry> {
    parse_steps_json(BUILTIN_STEPS_JSON).unwrap_or_else(|e| {
        warn!("Built-in step configuration is invalid: {}", e);
        Vec::new()
    })
}

/// Load `config/steps.json` from the assets directory, falling back to the built-in set
pub fn default_steps(assets_dir: &Path) -> Vec<StepConfigEntry> {
    let path = assets_dir.join(STEPS_CONFIG_PATH);
    if !path.exists() {
        return builtin_steps();
    }
    match steps_from_file(&path) {
        Ok(entries) => entries,
        Err(e) => {
            warn!("Failed to load {}: {}; using built-in steps", path.display(), e);
            builtin_steps()
        }
    }
}

/// A selectable chat model
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelInfo {
    pub id: String,
    pub display_name: String,
    pub provider: String,
}

/// Parse a models list from JSON
pub fn parse_models_json(json: &str) -> Result<Vec<ModelInfo>> {
    let models: Vec<ModelInfo> = serde_json::from_str(json)?;
    if models.iter().any(|m| m.id.trim().is_empty()) {
        anyhow::bail!("Model entries must have a non-empty id");
    }
    Ok(models)
}

/// The models list compiled into the binary
pub fn builtin_models() -> Vec<ModelInfo> {
    parse_models_json(BUILTIN_MODELS_JSON).unwrap_or_else(|e| {
        warn!("Built-in models configuration is invalid: {}", e);
        Vec::new()
    })
}

/// Load `config/models.json` from the assets directory, falling back to the built-in list
pub fn default_models(assets_dir: &Path) -> Vec<ModelInfo> {
    let path = assets_dir.join(MODELS_CONFIG_PATH);
    let Ok(content) = std::fs::read_to_string(&path) else {
        return builtin_models();
    };
    match parse_models_json(&content) {
        Ok(models) => models,
        Err(e) => {
            warn!("Failed to load {}: {}; using built-in models", path.display(), e);
            builtin_models()
        }
    }
}

/// Credentials and model selection for the chat-completion API
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiConfig {
    #[serde(default)]
    pub api_key: String,

    #[serde(default = "default_model")]
    pub model: String,
}

fn default_model() -> String {
    DEFAULT_MODEL.to_string()
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            model: default_model(),
        }
    }
}

impl ApiConfig {
    pub fn has_api_key(&self) -> bool {
        !self.api_key.trim().is_empty()
    }

    /// Key with everything but the last four characters hidden
    pub fn masked_key(&self) -> String {
        let chars: Vec<char> = self.api_key.chars().collect();
        if chars.len() <= 4 {
            return "*".repeat(chars.len());
        }
        let tail: String = chars[chars.len() - 4..].iter().collect();
        format!("{}{}", "*".repeat(chars.len() - 4), tail)
    }
}
