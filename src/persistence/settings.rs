//! API configuration and models list

use crate::core::config::{self, ApiConfig, ModelInfo};
use crate::persistence::{keys, load_json, save_json, StorageBackend};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;
use tracing::{info, warn};

/// Error types for settings and configuration imports
#[derive(Debug, Error)]
pub enum SettingsError {
    /// The submitted document could not be parsed; nothing was stored
    #[error("Invalid configuration: {0}")]
    Parse(String),

    /// The submitted values were rejected; nothing was stored
    #[error("{0}")]
    Validation(String),

    #[error(transparent)]
    Storage(#[from] anyhow::Error),
}

/// Settings backed by a storage backend with file defaults
pub struct SettingsStore {
    storage: Arc<dyn StorageBackend>,
    assets_dir: PathBuf,
}

impl SettingsStore {
    pub fn new(storage: Arc<dyn StorageBackend>, assets_dir: impl Into<PathBuf>) -> Self {
        Self {
            storage,
            assets_dir: assets_dir.into(),
        }
    }

    pub fn assets_dir(&self) -> &Path {
        &self.assets_dir
    }

    /// Stored API configuration, or defaults when none is saved
    pub async fn api_config(&self) -> Result<ApiConfig, SettingsError> {
        Ok(load_json(self.storage.as_ref(), keys::API_CONFIG)
            .await?
            .unwrap_or_default())
    }

    /// Save API key and model
    pub async fn save_api_config(&self, api: &ApiConfig) -> Result<(), SettingsError> {
        if api.model.trim().is_empty() {
            return Err(SettingsError::Validation("Model id is required".to_string()));
        }
        save_json(self.storage.as_ref(), keys::API_CONFIG, api).await?;
        info!(model = %api.model, "Saved API configuration");
        Ok(())
    }

    /// Replace the stored API key, keeping the model
    pub async fn set_api_key(&self, api_key: &str) -> Result<ApiConfig, SettingsError> {
        let mut api = self.api_config().await?;
        api.api_key = api_key.trim().to_string();
        self.save_api_config(&api).await?;
        Ok(api)
    }

    /// Select a model; it must be in the current models list
    pub async fn set_model(&self, model_id: &str) -> Result<ApiConfig, SettingsError> {
        let models = self.models().await?;
        if !models.iter().any(|m| m.id == model_id) {
            return Err(SettingsError::Validation(format!("Unknown model: {}", model_id)));
        }
        let mut api = self.api_config().await?;
        api.model = model_id.to_string();
        self.save_api_config(&api).await?;
        Ok(api)
    }

    /// Stored models list, else `config/models.json`, else the built-in list
    pub async fn models(&self) -> Result<Vec<ModelInfo>, SettingsError> {
        let stored: Option<Vec<ModelInfo>> =
            load_json(self.storage.as_ref(), keys::MODELS_CONFIG).await?;
        Ok(stored.unwrap_or_else(|| config::default_models(&self.assets_dir)))
    }

    /// Replace the models list from JSON text
    ///
    /// Malformed JSON is rejected and the stored list is left untouched.
    pub async fn import_models_json(&self, json: &str) -> Result<Vec<ModelInfo>, SettingsError> {
        let models = config::parse_models_json(json).map_err(|e| {
            warn!("Rejected models configuration: {}", e);
            SettingsError::Parse(e.to_string())
        })?;
        save_json(self.storage.as_ref(), keys::MODELS_CONFIG, &models).await?;
        info!(count = models.len(), "Saved models configuration");
        Ok(models)
    }

    /// Drop the stored models list
    pub async fn reset_models(&self) -> Result<(), SettingsError> {
        self.storage.remove(keys::MODELS_CONFIG).await?;
        Ok(())
    }
}
