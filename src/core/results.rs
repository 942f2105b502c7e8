//! Result bundle produced by one pipeline run

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Summary stored for a step whose model call failed
pub const ERROR_SUMMARY: &str = "Error occurred during processing";

/// Key under which a step's content is stored
pub fn output_key(step_id: &str) -> String {
    format!("{}_output", step_id)
}

/// Key under which a step's summary is stored
pub fn summary_key(step_id: &str) -> String {
    format!("{}_summary", step_id)
}

/// Mapping of `{id}_output` / `{id}_summary` keys to text
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StepResults(BTreeMap<String, String>);

impl StepResults {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the parsed response of a step
    pub fn record(&mut self, step_id: &str, content: impl Into<String>, summary: impl Into<String>) {
        self.0.insert(output_key(step_id), content.into());
        self.0.insert(summary_key(step_id), summary.into());
    }

    /// Record the placeholder for a step whose call failed
    pub fn record_error(&mut self, step_id: &str, message: &str) {
        self.record(step_id, format!("Error: {}", message), ERROR_SUMMARY);
    }

    /// Look up a raw key such as `plan_output`
    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    pub fn output(&self, step_id: &str) -> Option<&str> {
        self.get(&output_key(step_id))
    }

    pub fn summary(&self, step_id: &str) -> Option<&str> {
        self.get(&summary_key(step_id))
    }

    /// Whether the step produced any entry in this bundle
    pub fn contains_step(&self, step_id: &str) -> bool {
        self.0.contains_key(&output_key(step_id))
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &String)> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}
