//! Pipeline runner - walks a message through the steps in order

use crate::{
    agent::{LlmClient, LlmError},
    core::{config::ApiConfig, parse_response, RunState, Step, StepResults},
    execution::sinks::{LogNotifier, NoopProgress, NotificationSink, ProgressSink},
    persistence::HistoryStore,
};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// What to do when a step's model call fails
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FailurePolicy {
    /// Record an error placeholder for the step and keep going
    #[default]
    ContinueOnError,
    /// Stop at the first failed step; nothing is written to history
    FailFast,
}

/// Errors that end a run without results
#[derive(Debug, Error)]
pub enum RunError {
    #[error("{0}")]
    Validation(String),

    #[error("Step '{step_id}' failed: {source}")]
    Step { step_id: String, source: LlmError },
}

/// Results of a finished run
#[derive(Debug, Clone)]
pub struct AnalysisOutcome {
    pub execution_id: Uuid,
    pub results: StepResults,
    /// Ids of steps whose call failed, in execution order
    pub failed_steps: Vec<String>,
}

/// Serial step runner
pub struct PipelineRunner {
    llm: Arc<dyn LlmClient>,
    history: Arc<dyn HistoryStore>,
    progress: Arc<dyn ProgressSink>,
    notifier: Arc<dyn NotificationSink>,
    policy: FailurePolicy,
    state: RunState,
}

impl PipelineRunner {
    pub fn new(llm: Arc<dyn LlmClient>, history: Arc<dyn HistoryStore>) -> Self {
        Self {
            llm,
            history,
            progress: Arc::new(NoopProgress),
            notifier: Arc::new(LogNotifier),
            policy: FailurePolicy::default(),
            state: RunState::Idle,
        }
    }

    pub fn with_progress(mut self, progress: Arc<dyn ProgressSink>) -> Self {
        self.progress = progress;
        self
    }

    pub fn with_notifier(mut self, notifier: Arc<dyn NotificationSink>) -> Self {
        self.notifier = notifier;
        self
    }

    pub fn with_policy(mut self, policy: FailurePolicy) -> Self {
        self.policy = policy;
        self
    }

    /// State of the current or last run
    pub fn state(&self) -> RunState {
        self.state
    }

    /// Run `message` through `steps` in position order
    ///
    /// An empty step set runs the built-in basic analysis step instead.
    pub async fn run(
        &mut self,
        message: &str,
        steps: &[Step],
        api: &ApiConfig,
    ) -> Result<AnalysisOutcome, RunError> {
        self.state = RunState::Validating;

        if !api.has_api_key() {
            return Err(self.reject("Please set your API key before running an analysis"));
        }
        if message.trim().is_empty() {
            return Err(self.reject("Please enter a message to analyze"));
        }

        let mut ordered: Vec<Step> = if steps.is_empty() {
            info!("No steps configured, using basic analysis");
            vec![Step::basic_analysis()]
        } else {
            steps.to_vec()
        };
        ordered.sort_by_key(|s| s.position);

        let execution_id = Uuid::new_v4();
        let total = ordered.len();
        info!(%execution_id, steps = total, model = %api.model, "Starting analysis");

        self.progress.show("Analyzing message...");
        let mut results = StepResults::new();
        let mut failed_steps = Vec::new();

        for (index, step) in ordered.iter().enumerate() {
            self.state = RunState::Running { step_index: index };
            self.progress.update(index, total);

            let prompt = step.build_effective_prompt(message, &results);
            debug!(%execution_id, step_id = %step.id, "Effective prompt: {}", prompt);

            match self.llm.call(&prompt, &api.api_key, &api.model).await {
                Ok(raw) => {
                    let parsed = parse_response(&raw);
                    info!(%execution_id, step_id = %step.id, "Step completed");
                    results.record(&step.id, parsed.content, parsed.summary);
                }
                Err(e) => {
                    warn!(%execution_id, step_id = %step.id, kind = e.kind(), "Step failed: {}", e);
                    match self.policy {
                        FailurePolicy::ContinueOnError => {
                            results.record_error(&step.id, &e.to_string());
                            failed_steps.push(step.id.clone());
                        }
                        FailurePolicy::FailFast => {
                            self.progress.update(index + 1, total);
                            self.progress.hide();
                            self.state = RunState::Failed;
                            self.notifier.error(&format!(
                                "Analysis stopped at '{}': {}",
                                step.menu_name, e
                            ));
                            return Err(RunError::Step {
                                step_id: step.id.clone(),
                                source: e,
                            });
                        }
                    }
                }
            }

            self.progress.update(index + 1, total);
        }

        self.progress.hide();
        self.state = RunState::Completed;

        if let Err(e) = self.history.save(message, &results).await {
            warn!(%execution_id, "Failed to save analysis to history: {:#}", e);
            self.notifier
                .warning("Analysis finished but could not be saved to history");
        }

        if failed_steps.is_empty() {
            self.notifier.success("Analysis complete");
        } else {
            self.notifier.warning(&format!(
                "Analysis finished with {} failed step(s): {}",
                failed_steps.len(),
                failed_steps.join(", ")
            ));
        }
        info!(%execution_id, failed = failed_steps.len(), "Analysis finished");

        Ok(AnalysisOutcome {
            execution_id,
            results,
            failed_steps,
        })
    }

    fn reject(&mut self, message: &str) -> RunError {
        warn!("Analysis rejected: {}", message);
        self.state = RunState::Failed;
        self.notifier.error(message);
        RunError::Validation(message.to_string())
    }
}
