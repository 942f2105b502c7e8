//! Test utilities for mailsteps scenarios

use async_trait::async_trait;
use mailsteps::core::config::ApiConfig;
use mailsteps::execution::{FailurePolicy, NotificationKind, NotificationSink, PipelineRunner, ProgressSink};
use mailsteps::persistence::{HistoryEntry, HistoryStore, InMemoryStorage, StorageHistory};
use mailsteps::{LlmClient, LlmError, Step, StepContent, StepResults};
use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

/// Mock model client that returns predefined responses and records prompts
pub struct MockLlm {
    responses: Arc<Vec<String>>,
    index: Arc<AtomicUsize>,
    echo: bool,
    failures: HashSet<usize>,
    prompts: Arc<Mutex<Vec<String>>>,
}

impl MockLlm {
    /// Respond with `responses` in call order
    pub fn new(responses: Vec<String>) -> Self {
        Self {
            responses: Arc::new(responses),
            index: Arc::new(AtomicUsize::new(0)),
            echo: false,
            failures: HashSet::new(),
            prompts: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Respond with the prompt wrapped as `[Response] <prompt> [Response Summary] ok`
    pub fn echo() -> Self {
        Self {
            echo: true,
            ..Self::new(Vec::new())
        }
    }

    /// Make the call with 0-based index `call` time out
    pub fn failing_on(mut self, call: usize) -> Self {
        self.failures.insert(call);
        self
    }

    /// Every prompt received so far, in call order
    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }

    pub fn calls(&self) -> usize {
        self.index.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl LlmClient for MockLlm {
    async fn call(&self, prompt: &str, api_key: &str, _model: &str) -> Result<String, LlmError> {
        assert!(!api_key.is_empty(), "runner must not call the model without a key");

        let idx = self.index.fetch_add(1, Ordering::SeqCst);
        self.prompts.lock().unwrap().push(prompt.to_string());

        if self.failures.contains(&idx) {
            return Err(LlmError::Timeout(60));
        }
        if self.echo {
            return Ok(format!("[Response] {} [Response Summary] ok", prompt));
        }
        self.responses.get(idx).cloned().ok_or_else(|| {
            LlmError::InvalidResponse(format!("MockLlm: no response available for request {}", idx + 1))
        })
    }
}

/// Progress event seen by [`RecordingProgress`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProgressEvent {
    Show(String),
    Update(usize, usize),
    Hide,
}

#[derive(Default)]
pub struct RecordingProgress {
    events: Mutex<Vec<ProgressEvent>>,
}

impl RecordingProgress {
    pub fn events(&self) -> Vec<ProgressEvent> {
        self.events.lock().unwrap().clone()
    }

    pub fn updates(&self) -> Vec<(usize, usize)> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                ProgressEvent::Update(current, total) => Some((current, total)),
                _ => None,
            })
            .collect()
    }
}

impl ProgressSink for RecordingProgress {
    fn update(&self, current: usize, total: usize) {
        self.events.lock().unwrap().push(ProgressEvent::Update(current, total));
    }

    fn show(&self, message: &str) {
        self.events.lock().unwrap().push(ProgressEvent::Show(message.to_string()));
    }

    fn hide(&self) {
        self.events.lock().unwrap().push(ProgressEvent::Hide);
    }
}

#[derive(Default)]
pub struct RecordingNotifier {
    notes: Mutex<Vec<(NotificationKind, String)>>,
}

impl RecordingNotifier {
    pub fn kinds(&self) -> Vec<NotificationKind> {
        self.notes.lock().unwrap().iter().map(|(kind, _)| *kind).collect()
    }

    pub fn messages(&self) -> Vec<String> {
        self.notes.lock().unwrap().iter().map(|(_, m)| m.clone()).collect()
    }
}

impl NotificationSink for RecordingNotifier {
    fn notify(&self, kind: NotificationKind, message: &str) {
        self.notes.lock().unwrap().push((kind, message.to_string()));
    }
}

/// History backend whose writes always fail
pub struct BrokenHistory;

#[async_trait]
impl HistoryStore for BrokenHistory {
    async fn save(&self, _message: &str, _results: &StepResults) -> anyhow::Result<Vec<HistoryEntry>> {
        anyhow::bail!("disk full")
    }

    async fn list(&self) -> anyhow::Result<Vec<HistoryEntry>> {
        Ok(Vec::new())
    }

    async fn clear(&self) -> anyhow::Result<()> {
        Ok(())
    }
}

/// Runner wired to recording collaborators
pub struct Harness {
    pub runner: PipelineRunner,
    pub llm: Arc<MockLlm>,
    pub history: Arc<StorageHistory>,
    pub progress: Arc<RecordingProgress>,
    pub notifier: Arc<RecordingNotifier>,
}

pub fn harness(llm: MockLlm) -> Harness {
    harness_with_policy(llm, FailurePolicy::ContinueOnError)
}

pub fn harness_with_policy(llm: MockLlm, policy: FailurePolicy) -> Harness {
    let llm = Arc::new(llm);
    let history = Arc::new(StorageHistory::new(Arc::new(InMemoryStorage::new())));
    let progress = Arc::new(RecordingProgress::default());
    let notifier = Arc::new(RecordingNotifier::default());

    let runner = PipelineRunner::new(llm.clone(), history.clone())
        .with_progress(progress.clone())
        .with_notifier(notifier.clone())
        .with_policy(policy);

    Harness {
        runner,
        llm,
        history,
        progress,
        notifier,
    }
}

pub fn api() -> ApiConfig {
    ApiConfig {
        api_key: "sk-test".to_string(),
        model: "gpt-4o-mini".to_string(),
    }
}

/// User-authored step with plain instructions
pub fn step(id: &str, position: usize, prompt: &str) -> Step {
    Step::new_virtual(id, id, position, StepContent::new(prompt, "Be brief"))
}

/// A model reply in the expected format
pub fn reply(content: &str, summary: &str) -> String {
    format!("[Response]\n{}\n[Response Summary]\n{}", content, summary)
}
