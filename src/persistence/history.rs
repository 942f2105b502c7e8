//! Analysis history: the most recent runs, newest first

use crate::core::{Step, StepResults};
use crate::persistence::{keys, load_json, save_json, StorageBackend};
use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

/// Maximum number of entries kept
pub const MAX_HISTORY_ENTRIES: usize = 10;

/// One completed analysis
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    /// Unique entry id
    #[serde(default = "Uuid::new_v4")]
    pub id: Uuid,

    /// When the run completed (serialized as ISO-8601)
    pub timestamp: DateTime<Utc>,

    /// The original message
    pub message: String,

    /// Full result bundle of the run
    pub results: StepResults,
}

impl HistoryEntry {
    pub fn new(message: impl Into<String>, results: StepResults) -> Self {
        Self {
            id: Uuid::new_v4(),
            timestamp: Utc::now(),
            message: message.into(),
            results,
        }
    }
}

/// Trait for history backends
#[async_trait::async_trait]
pub trait HistoryStore: Send + Sync {
    /// Prepend an entry, keep the newest `MAX_HISTORY_ENTRIES`, return the list
    async fn save(&self, message: &str, results: &StepResults) -> Result<Vec<HistoryEntry>>;

    /// All entries, newest first
    async fn list(&self) -> Result<Vec<HistoryEntry>>;

    /// Remove every entry
    async fn clear(&self) -> Result<()>;

    /// Entry at `index` (0 is the newest)
    async fn get(&self, index: usize) -> Result<Option<HistoryEntry>> {
        Ok(self.list().await?.into_iter().nth(index))
    }
}

/// History kept as one JSON list in a storage backend
pub struct StorageHistory {
    storage: Arc<dyn StorageBackend>,
}

impl StorageHistory {
    pub fn new(storage: Arc<dyn StorageBackend>) -> Self {
        Self { storage }
    }
}

#[async_trait::async_trait]
impl HistoryStore for StorageHistory {
    async fn save(&self, message: &str, results: &StepResults) -> Result<Vec<HistoryEntry>> {
        let mut entries = self.list().await?;
        let entry = HistoryEntry::new(message, results.clone());
        info!(entry_id = %entry.id, "Saving analysis to history");

        entries.insert(0, entry);
        entries.truncate(MAX_HISTORY_ENTRIES);
        save_json(self.storage.as_ref(), keys::ANALYSIS_HISTORY, &entries).await?;

        Ok(entries)
    }

    async fn list(&self) -> Result<Vec<HistoryEntry>> {
        Ok(load_json(self.storage.as_ref(), keys::ANALYSIS_HISTORY)
            .await?
            .unwrap_or_default())
    }

    async fn clear(&self) -> Result<()> {
        self.storage.remove(keys::ANALYSIS_HISTORY).await
    }
}

/// One step of a history entry viewed through the current step list
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReplayedStep {
    pub step_id: String,
    pub menu_name: String,
    pub output: String,
    pub summary: String,
}

/// Rebuild a per-step view of `entry` using the *current* steps
///
/// Steps added after the entry was captured come back empty. Results of
/// steps deleted since then are not shown.
pub fn replay(entry: &HistoryEntry, current_steps: &[Step]) -> Vec<ReplayedStep> {
    let mut ordered: Vec<&Step> = current_steps.iter().collect();
    ordered.sort_by_key(|s| s.position);

    ordered
        .into_iter()
        .map(|step| ReplayedStep {
            step_id: step.id.clone(),
            menu_name: step.menu_name.clone(),
            output: entry.results.output(&step.id).unwrap_or_default().to_string(),
            summary: entry.results.summary(&step.id).unwrap_or_default().to_string(),
        })
        .collect()
}
