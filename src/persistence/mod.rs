//! Persistence layer
//!
//! All durable state lives in a small key/value store. Each key holds one
//! JSON document that is replaced as a whole on every write.

pub mod history;
pub mod settings;

#[cfg(feature = "sqlite")]
pub mod store;

#[cfg(feature = "sqlite")]
pub use store::SqliteStorage;

pub use history::{replay, HistoryEntry, HistoryStore, ReplayedStep, StorageHistory, MAX_HISTORY_ENTRIES};
pub use settings::{SettingsError, SettingsStore};

use anyhow::{Context, Result};
use serde::{de::DeserializeOwned, Serialize};
use std::collections::HashMap;
use tokio::sync::RwLock;
use tracing::warn;

/// Storage keys
pub mod keys {
    /// API key and selected model
    pub const API_CONFIG: &str = "api_config";
    /// Full step configuration replacing `config/steps.json`
    pub const STEPS_CONFIG: &str = "steps_config";
    /// Models list replacing `config/models.json`
    pub const MODELS_CONFIG: &str = "models_config";
    /// Content overrides of configured steps, keyed by step id
    pub const MODIFIED_STEPS: &str = "modified_steps";
    /// User-created and cloned steps
    pub const VIRTUAL_STEPS: &str = "virtual_steps";
    /// Analysis history, newest first
    pub const ANALYSIS_HISTORY: &str = "analysis_history";
    /// Whether `steps_config` is in use
    pub const CUSTOM_STEPS_MODE: &str = "custom_steps_mode";
}

/// Trait for key/value storage backends
#[async_trait::async_trait]
pub trait StorageBackend: Send + Sync {
    /// Read the value stored under `key`
    async fn get(&self, key: &str) -> Result<Option<String>>;

    /// Replace the value stored under `key`
    async fn set(&self, key: &str, value: &str) -> Result<()>;

    /// Remove `key` if present
    async fn remove(&self, key: &str) -> Result<()>;
}

/// Read and deserialize a JSON value
///
/// A stored value that no longer parses is logged and treated as absent.
pub async fn load_json<T: DeserializeOwned>(
    storage: &dyn StorageBackend,
    key: &str,
) -> Result<Option<T>> {
    let Some(raw) = storage.get(key).await? else {
        return Ok(None);
    };
    match serde_json::from_str(&raw) {
        Ok(value) => Ok(Some(value)),
        Err(e) => {
            warn!(key, "Ignoring malformed stored value: {}", e);
            Ok(None)
        }
    }
}

/// Serialize and store a JSON value
pub async fn save_json<T: Serialize + ?Sized>(
    storage: &dyn StorageBackend,
    key: &str,
    value: &T,
) -> Result<()> {
    let raw = serde_json::to_string(value)
        .with_context(|| format!("Failed to serialize value for key {}", key))?;
    storage.set(key, &raw).await
}

/// In-memory storage (for testing or ephemeral use)
pub struct InMemoryStorage {
    values: RwLock<HashMap<String, String>>,
}

impl InMemoryStorage {
    pub fn new() -> Self {
        Self {
            values: RwLock::new(HashMap::new()),
        }
    }
}

impl Default for InMemoryStorage {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl StorageBackend for InMemoryStorage {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.values.read().await.get(key).cloned())
    }

    async fn set(&self, key: &str, value: &str) -> Result<()> {
        self.values
            .write()
            .await
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<()> {
        self.values.write().await.remove(key);
        Ok(())
    }
}
