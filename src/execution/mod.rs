//! Pipeline execution

pub mod runner;
pub mod sinks;

pub use runner::{AnalysisOutcome, FailurePolicy, PipelineRunner, RunError};
pub use sinks::{LogNotifier, NoopProgress, NotificationKind, NotificationSink, ProgressSink};
