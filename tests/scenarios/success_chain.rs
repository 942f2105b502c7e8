//! Test: Success Chain - steps run in position order and results are kept

use crate::helpers::*;
use mailsteps::core::response::NO_SUMMARY;
use mailsteps::core::RunState;
use mailsteps::execution::NotificationKind;
use mailsteps::persistence::HistoryStore;
use mailsteps::{Step, StepContent};

#[tokio::test]
async fn test_three_steps_complete_in_order() {
    let steps = vec![
        step("summary", 0, "Summarize {message_content}"),
        step("tone", 1, "Tone of {message_content}"),
        step("reply", 2, "Reply to {message_content}"),
    ];
    let llm = MockLlm::new(vec![
        reply("It is about lunch", "Lunch"),
        reply("Friendly", "Positive"),
        reply("Sounds good!", "Accepts"),
    ]);
    let mut h = harness(llm);

    let outcome = h.runner.run("Lunch on Friday?", &steps, &api()).await.unwrap();

    assert_eq!(h.runner.state(), RunState::Completed);
    assert!(outcome.failed_steps.is_empty());
    assert_eq!(outcome.results.len(), 6);
    assert_eq!(outcome.results.output("summary"), Some("It is about lunch"));
    assert_eq!(outcome.results.summary("tone"), Some("Positive"));
    assert_eq!(outcome.results.output("reply"), Some("Sounds good!"));

    let prompts = h.llm.prompts();
    assert_eq!(prompts.len(), 3);
    assert!(prompts[0].starts_with("Summarize Lunch on Friday?"));
    assert!(prompts[2].starts_with("Reply to"));

    let history = h.history.list().await.unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].message, "Lunch on Friday?");
    assert_eq!(history[0].results, outcome.results);

    assert_eq!(h.notifier.kinds(), vec![NotificationKind::Success]);
}

#[tokio::test]
async fn test_echo_single_step() {
    let steps = vec![Step::new_virtual(
        "only",
        "Only",
        0,
        StepContent::new("{message_content}", ""),
    )];
    let mut h = harness(MockLlm::echo());

    let outcome = h.runner.run("hello", &steps, &api()).await.unwrap();

    assert_eq!(outcome.results.output("only"), Some("hello"));
    assert_eq!(outcome.results.summary("only"), Some("ok"));
    assert_eq!(h.llm.calls(), 1);
}

#[tokio::test]
async fn test_progress_before_and_after_each_step() {
    let steps = vec![step("a", 0, "A"), step("b", 1, "B"), step("c", 2, "C")];
    let llm = MockLlm::new(vec![reply("1", "1"), reply("2", "2"), reply("3", "3")]);
    let mut h = harness(llm);

    h.runner.run("message", &steps, &api()).await.unwrap();

    assert_eq!(
        h.progress.updates(),
        vec![(0, 3), (1, 3), (1, 3), (2, 3), (2, 3), (3, 3)]
    );
    let events = h.progress.events();
    assert!(matches!(events.first(), Some(ProgressEvent::Show(_))));
    assert_eq!(events.last(), Some(&ProgressEvent::Hide));
}

#[tokio::test]
async fn test_unformatted_reply_becomes_content() {
    let steps = vec![step("a", 0, "{message_content}")];
    let mut h = harness(MockLlm::new(vec!["  plain answer \n".to_string()]));

    let outcome = h.runner.run("m", &steps, &api()).await.unwrap();

    assert_eq!(outcome.results.output("a"), Some("plain answer"));
    assert_eq!(outcome.results.summary("a"), Some(NO_SUMMARY));
}
