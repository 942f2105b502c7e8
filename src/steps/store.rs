//! The step registry
//!
//! Configured steps come from the step configuration and their template
//! files. User edits are kept as per-step overrides, user-created steps as a
//! list of virtual steps. Structural edits (delete, move) replace the whole
//! step configuration and switch the store into custom-steps mode.

use crate::core::config::{self, StepConfigEntry};
use crate::core::step::{is_valid_step_id, DEFAULT_INSTRUCTIONS};
use crate::core::{refresh_dependencies, DependencyGraph, Step, StepContent, StepTemplate};
use crate::persistence::{keys, load_json, save_json, SettingsError, StorageBackend};
use crate::steps::source::TemplateSource;
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info, warn};

const CUSTOM_STEP_ID: &str = "custom_step";
const CUSTOM_STEP_NAME: &str = "Custom Step";
const CUSTOM_STEP_PROMPT: &str = "{message_content}";

/// Stored replacement for a configured step's name and content
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StepOverride {
    pub menu_name: String,
    pub step_prompt: String,
    pub llm_instructions: String,
}

impl StepOverride {
    fn from_step(step: &Step) -> Self {
        Self {
            menu_name: step.menu_name.clone(),
            step_prompt: step.content.step_prompt.clone(),
            llm_instructions: step.content.llm_instructions.clone(),
        }
    }
}

/// Result of an edit submitted through [`StepStore::save_changes`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SaveOutcome {
    pub success: bool,
    pub message: String,
    pub step: Option<Step>,
}

impl SaveOutcome {
    fn rejected(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
            step: None,
        }
    }

    fn saved(step: Step) -> Self {
        Self {
            success: true,
            message: "Step saved".to_string(),
            step: Some(step),
        }
    }
}

/// Format of an imported step configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    Json,
    Yaml,
}

impl ConfigFormat {
    /// Pick the format from a file extension, JSON unless `.yaml`/`.yml`
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some("yaml") | Some("yml") => ConfigFormat::Yaml,
            _ => ConfigFormat::Json,
        }
    }
}

/// Authoritative registry of the current steps
pub struct StepStore {
    storage: Arc<dyn StorageBackend>,
    templates: Arc<dyn TemplateSource>,
    defaults: Vec<StepConfigEntry>,
    config: Vec<StepConfigEntry>,
    steps: Vec<Step>,
}

impl StepStore {
    /// Create a store whose default configuration comes from `assets_dir`
    pub fn new(
        storage: Arc<dyn StorageBackend>,
        templates: Arc<dyn TemplateSource>,
        assets_dir: &Path,
    ) -> Self {
        Self::with_defaults(storage, templates, config::default_steps(assets_dir))
    }

    /// Create a store with an explicit default configuration
    pub fn with_defaults(
        storage: Arc<dyn StorageBackend>,
        templates: Arc<dyn TemplateSource>,
        defaults: Vec<StepConfigEntry>,
    ) -> Self {
        Self {
            storage,
            templates,
            config: defaults.clone(),
            defaults,
            steps: Vec::new(),
        }
    }

    /// Current steps, ordered by position
    pub fn steps(&self) -> &[Step] {
        &self.steps
    }

    /// Owned copy of the current steps for a pipeline run
    pub fn snapshot(&self) -> Vec<Step> {
        self.steps.clone()
    }

    pub fn get(&self, step_id: &str) -> Option<&Step> {
        self.steps.iter().find(|s| s.id == step_id)
    }

    /// Load the step list
    ///
    /// With `force_default` the stored overrides, virtual steps and custom
    /// configuration are ignored for this load (but left in the store).
    pub async fn load(&mut self, force_default: bool) -> Result<Vec<Step>> {
        let (config, overrides, virtual_steps) = if force_default {
            (self.defaults.clone(), BTreeMap::new(), Vec::new())
        } else {
            (
                self.stored_config().await?,
                self.stored_overrides().await?,
                self.stored_virtual_steps().await?,
            )
        };

        let mut steps = Vec::with_capacity(config.len() + virtual_steps.len());
        for (index, entry) in config.iter().enumerate() {
            let position = entry.position.unwrap_or(index);
            let step = match overrides.get(&entry.id) {
                Some(stored) => Step {
                    id: entry.id.clone(),
                    menu_name: stored.menu_name.clone(),
                    position,
                    content: StepContent::new(&stored.step_prompt, &stored.llm_instructions),
                    file_source: entry.file.clone(),
                    is_virtual: false,
                    is_modified: true,
                    dependencies: Vec::new(),
                },
                None => self.configured_step(entry, position).await,
            };
            steps.push(step);
        }

        for mut step in virtual_steps {
            if steps.iter().any(|s| s.id == step.id) {
                warn!(step_id = %step.id, "Skipping virtual step that shadows a configured step");
                continue;
            }
            step.is_virtual = true;
            step.is_modified = false;
            step.file_source = None;
            steps.push(step);
        }

        // Stable sort keeps configured steps ahead of virtual ones on ties
        steps.sort_by_key(|s| s.position);
        reindex(&mut steps);
        refresh_dependencies(&mut steps);

        info!(count = steps.len(), force_default, "Loaded steps");
        self.config = config;
        self.steps = steps;
        Ok(self.steps.clone())
    }

    /// Append a new empty virtual step
    pub async fn create(&mut self) -> Result<Step> {
        let id = self.unused_id(CUSTOM_STEP_ID);
        let step = Step::new_virtual(
            id,
            CUSTOM_STEP_NAME,
            self.steps.len(),
            StepContent::new(CUSTOM_STEP_PROMPT, DEFAULT_INSTRUCTIONS),
        );
        info!(step_id = %step.id, "Created step");

        self.steps.push(step.clone());
        refresh_dependencies(&mut self.steps);
        self.persist().await?;
        Ok(self.get(&step.id).cloned().unwrap_or(step))
    }

    /// Append a virtual copy of `step_id`
    pub async fn clone_step(&mut self, step_id: &str) -> Result<Option<Step>> {
        let Some(source) = self.get(step_id).cloned() else {
            return Ok(None);
        };

        let id = self.unused_id(&format!("{}_clone", source.id));
        let copy = Step::new_virtual(
            id,
            format!("{} (Copy)", source.menu_name),
            self.steps.len(),
            source.content.clone(),
        );
        info!(source = %source.id, step_id = %copy.id, "Cloned step");

        self.steps.push(copy.clone());
        refresh_dependencies(&mut self.steps);
        self.persist().await?;
        Ok(self.get(&copy.id).cloned())
    }

    /// Remove a step and close the gap in positions
    pub async fn delete(&mut self, step_id: &str) -> Result<bool> {
        let Some(index) = self.index_of(step_id) else {
            return Ok(false);
        };

        self.steps.remove(index);
        reindex(&mut self.steps);
        refresh_dependencies(&mut self.steps);
        info!(step_id, "Deleted step");

        self.persist().await?;
        Ok(true)
    }

    /// Move a step to `new_position` (clamped to the end)
    pub async fn move_step(&mut self, step_id: &str, new_position: usize) -> Result<bool> {
        let Some(index) = self.index_of(step_id) else {
            return Ok(false);
        };

        let step = self.steps.remove(index);
        let target = new_position.min(self.steps.len());
        self.steps.insert(target, step);
        reindex(&mut self.steps);
        info!(step_id, position = target, "Moved step");

        self.persist().await?;
        Ok(true)
    }

    /// Apply an edit to a step
    ///
    /// `new_step_id` is checked for every step but only renames virtual
    /// steps. Other steps' prompts are not rewritten on rename. Rejected
    /// edits leave the store untouched.
    pub async fn save_changes(
        &mut self,
        step_id: &str,
        menu_name: &str,
        step_prompt: &str,
        llm_instructions: &str,
        new_step_id: Option<&str>,
    ) -> Result<SaveOutcome> {
        let Some(index) = self.index_of(step_id) else {
            return Ok(SaveOutcome::rejected("Step not found"));
        };

        let menu_name = menu_name.trim();
        if menu_name.is_empty() {
            return Ok(SaveOutcome::rejected("Step name is required"));
        }

        let current = &self.steps[index];
        let requested_id = new_step_id.map(str::trim);
        if let Some(requested) = requested_id {
            if requested.is_empty() {
                return Ok(SaveOutcome::rejected("Step ID is required"));
            }
            if requested != current.id {
                if !is_valid_step_id(requested) {
                    return Ok(SaveOutcome::rejected(
                        "Step ID may only contain lowercase letters, digits and underscores",
                    ));
                }
                if self.steps.iter().any(|s| s.id == requested) {
                    return Ok(SaveOutcome::rejected("Step ID must be unique"));
                }
            }
        }
        let effective_id = match requested_id {
            Some(requested) if current.is_virtual => requested,
            _ => current.id.as_str(),
        };

        let mut candidate = self.steps.clone();
        {
            let step = &mut candidate[index];
            step.id = effective_id.to_string();
            step.menu_name = menu_name.to_string();
            step.content = StepContent::new(step_prompt, llm_instructions);
            if !step.is_virtual {
                step.is_modified = true;
            }
        }
        refresh_dependencies(&mut candidate);

        // Cycles already present in stored data do not block unrelated edits
        if let Some(cycle) = DependencyGraph::from_steps(&candidate).find_cycle_through(effective_id) {
            warn!(step_id, "Rejected edit that creates a dependency cycle");
            return Ok(SaveOutcome::rejected(format!(
                "Circular dependency detected: {}",
                cycle.join(" -> ")
            )));
        }

        let saved = candidate[index].clone();
        self.steps = candidate;
        info!(step_id, new_id = %saved.id, "Saved step");

        self.persist().await?;
        Ok(SaveOutcome::saved(saved))
    }

    /// Restore a configured step from its template file
    ///
    /// Returns `None` for steps without a file or when the file cannot be read.
    pub async fn reset_to_original(&mut self, step_id: &str) -> Result<Option<Step>> {
        let Some(index) = self.index_of(step_id) else {
            return Ok(None);
        };
        let step = &self.steps[index];
        if !step.can_reset() {
            debug!(step_id, "Step has no template file to reset from");
            return Ok(None);
        }
        let Some(file) = step.file_source.clone() else {
            return Ok(None);
        };

        let raw = match self.templates.fetch(&file).await {
            Ok(raw) => raw,
            Err(e) => {
                warn!(step_id, "Failed to fetch template {}: {:#}", file, e);
                return Ok(None);
            }
        };
        let template = StepTemplate::parse(&raw);
        let fallback_name = self
            .config
            .iter()
            .find(|e| e.id == step_id)
            .and_then(|e| e.menu_name.clone())
            .unwrap_or_else(|| step_id.to_string());

        let step = &mut self.steps[index];
        step.menu_name = non_empty_or(template.menu_name, fallback_name);
        step.content = StepContent::new(template.step_prompt, template.llm_instructions);
        step.is_modified = false;
        refresh_dependencies(&mut self.steps);
        info!(step_id, "Reset step to its template");

        self.persist().await?;
        Ok(self.get(step_id).cloned())
    }

    /// Erase every stored customization and load the defaults
    pub async fn restore_defaults(&mut self) -> Result<Vec<Step>> {
        for key in [
            keys::MODIFIED_STEPS,
            keys::VIRTUAL_STEPS,
            keys::STEPS_CONFIG,
            keys::CUSTOM_STEPS_MODE,
        ] {
            self.storage.remove(key).await?;
        }
        info!("Restored default steps");
        self.load(true).await
    }

    /// Replace the step configuration with an imported document
    ///
    /// The document is parsed before anything is stored; malformed input
    /// leaves the store as it was.
    pub async fn import_config(
        &mut self,
        text: &str,
        format: ConfigFormat,
    ) -> Result<Vec<Step>, SettingsError> {
        let parsed = match format {
            ConfigFormat::Json => config::parse_steps_json(text),
            ConfigFormat::Yaml => config::parse_steps_yaml(text),
        };
        let entries = parsed.map_err(|e| {
            warn!("Rejected step configuration: {}", e);
            SettingsError::Parse(e.to_string())
        })?;

        save_json(self.storage.as_ref(), keys::STEPS_CONFIG, &entries).await?;
        save_json(self.storage.as_ref(), keys::CUSTOM_STEPS_MODE, &true).await?;
        info!(count = entries.len(), "Imported step configuration");

        Ok(self.load(false).await?)
    }

    /// Write the current overrides and virtual steps, plus the step
    /// configuration when configured steps were removed or reordered
    async fn persist(&mut self) -> Result<()> {
        let overrides: BTreeMap<String, StepOverride> = self
            .steps
            .iter()
            .filter(|s| !s.is_virtual && s.is_modified)
            .map(|s| (s.id.clone(), StepOverride::from_step(s)))
            .collect();
        let virtual_steps: Vec<&Step> = self.steps.iter().filter(|s| s.is_virtual).collect();

        save_json(self.storage.as_ref(), keys::MODIFIED_STEPS, &overrides).await?;
        save_json(self.storage.as_ref(), keys::VIRTUAL_STEPS, &virtual_steps).await?;

        let layout: Vec<(&str, usize)> = self
            .steps
            .iter()
            .filter(|s| !s.is_virtual)
            .map(|s| (s.id.as_str(), s.position))
            .collect();
        if layout != config_layout(&self.config) {
            let entries: Vec<StepConfigEntry> = self
                .steps
                .iter()
                .filter(|s| !s.is_virtual)
                .map(|s| self.config_entry_for(s))
                .collect();
            save_json(self.storage.as_ref(), keys::STEPS_CONFIG, &entries).await?;
            save_json(self.storage.as_ref(), keys::CUSTOM_STEPS_MODE, &true).await?;
            debug!(count = entries.len(), "Stored custom step configuration");
            self.config = entries;
        }

        Ok(())
    }

    fn config_entry_for(&self, step: &Step) -> StepConfigEntry {
        let mut entry = self
            .config
            .iter()
            .find(|e| e.id == step.id)
            .cloned()
            .unwrap_or_else(|| StepConfigEntry::new(&step.id, step.position));
        entry.position = Some(step.position);
        if entry.file.is_none() {
            entry.file = step.file_source.clone();
        }
        entry
    }

    async fn stored_config(&self) -> Result<Vec<StepConfigEntry>> {
        let custom_mode: bool = load_json(self.storage.as_ref(), keys::CUSTOM_STEPS_MODE)
            .await?
            .unwrap_or(false);
        if custom_mode {
            if let Some(entries) = load_json(self.storage.as_ref(), keys::STEPS_CONFIG).await? {
                return Ok(entries);
            }
            warn!("Custom steps mode is set but no step configuration is stored");
        }
        Ok(self.defaults.clone())
    }

    async fn stored_overrides(&self) -> Result<BTreeMap<String, StepOverride>> {
        Ok(load_json(self.storage.as_ref(), keys::MODIFIED_STEPS)
            .await?
            .unwrap_or_default())
    }

    async fn stored_virtual_steps(&self) -> Result<Vec<Step>> {
        Ok(load_json(self.storage.as_ref(), keys::VIRTUAL_STEPS)
            .await?
            .unwrap_or_default())
    }

    /// Build a configured step from its template file or inline fields
    async fn configured_step(&self, entry: &StepConfigEntry, position: usize) -> Step {
        let inline_name = entry.menu_name.clone().unwrap_or_else(|| entry.id.clone());

        let template = match &entry.file {
            Some(file) => match self.templates.fetch(file).await {
                Ok(raw) => Some(StepTemplate::parse(&raw)),
                Err(e) => {
                    warn!(step_id = %entry.id, "Failed to fetch template {}: {:#}", file, e);
                    None
                }
            },
            None => None,
        };

        let (menu_name, content) = match template {
            Some(t) => (
                non_empty_or(t.menu_name, inline_name),
                StepContent::new(t.step_prompt, t.llm_instructions),
            ),
            None => (
                inline_name,
                StepContent::new(
                    entry.step_prompt.clone().unwrap_or_default(),
                    entry.llm_instructions.clone().unwrap_or_default(),
                ),
            ),
        };

        Step {
            id: entry.id.clone(),
            menu_name,
            position,
            content,
            file_source: entry.file.clone(),
            is_virtual: false,
            is_modified: false,
            dependencies: Vec::new(),
        }
    }

    fn index_of(&self, step_id: &str) -> Option<usize> {
        self.steps.iter().position(|s| s.id == step_id)
    }

    /// `base`, else `base_1`, `base_2`, ... whichever is free first
    fn unused_id(&self, base: &str) -> String {
        let taken = |id: &str| self.steps.iter().any(|s| s.id == id);
        if !taken(base) {
            return base.to_string();
        }
        (1..)
            .map(|n| format!("{}_{}", base, n))
            .find(|id| !taken(id))
            .unwrap_or_else(|| format!("{}_{}", base, uuid::Uuid::new_v4().simple()))
    }
}

/// Assign positions 0..N-1 in the current order
fn reindex(steps: &mut [Step]) {
    for (position, step) in steps.iter_mut().enumerate() {
        step.position = position;
    }
}

/// The (id, position) sequence a configuration produces, in position order
fn config_layout(config: &[StepConfigEntry]) -> Vec<(&str, usize)> {
    let mut layout: Vec<(&str, usize)> = config
        .iter()
        .enumerate()
        .map(|(index, e)| (e.id.as_str(), e.position.unwrap_or(index)))
        .collect();
    layout.sort_by_key(|(_, position)| *position);
    layout
}

fn non_empty_or(value: String, fallback: String) -> String {
    if value.trim().is_empty() {
        fallback
    } else {
        value
    }
}
