//! mailsteps - multi-step LLM analysis of email messages

pub mod agent;
pub mod cli;
pub mod core;
pub mod execution;
pub mod persistence;
pub mod steps;

// Re-export commonly used types
pub use agent::{LlmClient, LlmClientConfig, LlmError, OpenAiClient};
pub use core::{parse_response, DependencyGraph, RunState, Step, StepContent, StepResults, StepTemplate};
pub use execution::{AnalysisOutcome, FailurePolicy, PipelineRunner, RunError};
pub use persistence::{HistoryEntry, HistoryStore, InMemoryStorage, SettingsStore, StorageBackend, StorageHistory};
pub use steps::{FsTemplateSource, SaveOutcome, StepStore, TemplateSource};
