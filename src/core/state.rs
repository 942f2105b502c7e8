//! Pipeline run state

use serde::{Deserialize, Serialize};

/// State of one pipeline run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum RunState {
    /// No run has started
    #[default]
    Idle,
    /// Checking the API key, message and step set
    Validating,
    /// Executing the step at `step_index` (0-based, in position order)
    Running { step_index: usize },
    /// Every step ran; results were handed to history
    Completed,
    /// Validation failed, or a step failed under the fail-fast policy
    Failed,
}

impl RunState {
    /// Check if the run has finished
    pub fn is_terminal(&self) -> bool {
        matches!(self, RunState::Completed | RunState::Failed)
    }
}
