//! Test: Failure Handling - error placeholders, fail-fast and history errors

use crate::helpers::*;
use mailsteps::core::results::ERROR_SUMMARY;
use mailsteps::core::RunState;
use mailsteps::execution::{FailurePolicy, NotificationKind, PipelineRunner, RunError};
use mailsteps::persistence::HistoryStore;
use mailsteps::LlmError;
use std::sync::Arc;

#[tokio::test]
async fn test_failed_step_records_placeholder_and_run_continues() {
    let steps = vec![
        step("summary", 0, "Summarize {message_content}"),
        step("reply", 1, "Reply using {summary_output} / {summary_summary}"),
    ];
    let llm = MockLlm::new(vec![String::new(), reply("Reply text", "Reply")]).failing_on(0);
    let mut h = harness(llm);

    let outcome = h.runner.run("message", &steps, &api()).await.unwrap();

    assert_eq!(h.runner.state(), RunState::Completed);
    assert_eq!(outcome.failed_steps, vec!["summary".to_string()]);
    assert_eq!(
        outcome.results.output("summary"),
        Some("Error: Request timed out after 60 seconds")
    );
    assert_eq!(outcome.results.summary("summary"), Some(ERROR_SUMMARY));
    assert_eq!(outcome.results.output("reply"), Some("Reply text"));

    // The error text flows into later prompts
    assert!(h.llm.prompts()[1].starts_with(&format!(
        "Reply using Error: Request timed out after 60 seconds / {}",
        ERROR_SUMMARY
    )));

    assert_eq!(h.history.list().await.unwrap().len(), 1);
    assert_eq!(h.notifier.kinds(), vec![NotificationKind::Warning]);
}

#[tokio::test]
async fn test_progress_fires_for_failed_steps() {
    let steps = vec![step("a", 0, "A"), step("b", 1, "B")];
    let llm = MockLlm::new(vec![reply("1", "1")]).failing_on(1);
    let mut h = harness(llm);

    h.runner.run("m", &steps, &api()).await.unwrap();

    assert_eq!(h.progress.updates(), vec![(0, 2), (1, 2), (1, 2), (2, 2)]);
}

#[tokio::test]
async fn test_fail_fast_stops_without_history() {
    let steps = vec![step("a", 0, "A"), step("b", 1, "B"), step("c", 2, "C")];
    let llm = MockLlm::new(vec![reply("1", "1"), String::new(), reply("3", "3")]).failing_on(1);
    let mut h = harness_with_policy(llm, FailurePolicy::FailFast);

    let err = h.runner.run("m", &steps, &api()).await.unwrap_err();

    match err {
        RunError::Step { step_id, source } => {
            assert_eq!(step_id, "b");
            assert!(matches!(source, LlmError::Timeout(60)));
        }
        other => panic!("unexpected error: {:?}", other),
    }
    assert_eq!(h.runner.state(), RunState::Failed);
    assert_eq!(h.llm.calls(), 2);
    assert!(h.history.list().await.unwrap().is_empty());
    assert_eq!(h.notifier.kinds(), vec![NotificationKind::Error]);
    assert_eq!(h.progress.events().last(), Some(&ProgressEvent::Hide));
}

#[tokio::test]
async fn test_validation_happens_before_any_call() {
    let steps = vec![step("a", 0, "A")];
    let mut h = harness(MockLlm::echo());

    let mut no_key = api();
    no_key.api_key = "   ".to_string();
    let err = h.runner.run("m", &steps, &no_key).await.unwrap_err();
    assert!(matches!(err, RunError::Validation(_)));

    let err = h.runner.run("", &steps, &api()).await.unwrap_err();
    assert!(matches!(err, RunError::Validation(_)));

    assert_eq!(h.llm.calls(), 0);
    assert!(h.progress.events().is_empty());
    assert_eq!(h.notifier.kinds(), vec![NotificationKind::Error, NotificationKind::Error]);
}

#[tokio::test]
async fn test_history_failure_still_returns_results() {
    let notifier = Arc::new(RecordingNotifier::default());
    let mut runner = PipelineRunner::new(Arc::new(MockLlm::new(vec![reply("ok", "ok")])), Arc::new(BrokenHistory))
        .with_notifier(notifier.clone());

    let outcome = runner.run("m", &[step("a", 0, "A")], &api()).await.unwrap();

    assert_eq!(outcome.results.output("a"), Some("ok"));
    assert_eq!(runner.state(), RunState::Completed);
    assert_eq!(
        notifier.kinds(),
        vec![NotificationKind::Warning, NotificationKind::Success]
    );
    assert!(notifier.messages()[0].contains("history"));
}
