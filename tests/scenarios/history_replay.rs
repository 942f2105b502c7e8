//! Test: History Replay - saved runs are capped and replayed against current steps

use crate::helpers::*;
use mailsteps::persistence::{replay, HistoryStore, MAX_HISTORY_ENTRIES};

#[tokio::test]
async fn test_newest_run_first_and_capped() {
    let steps = vec![step("a", 0, "{message_content}")];
    let mut h = harness(MockLlm::echo());

    for i in 0..12 {
        h.runner
            .run(&format!("message {}", i), &steps, &api())
            .await
            .unwrap();
    }

    let entries = h.history.list().await.unwrap();
    assert_eq!(entries.len(), MAX_HISTORY_ENTRIES);
    assert_eq!(entries[0].message, "message 11");
    assert_eq!(entries[MAX_HISTORY_ENTRIES - 1].message, "message 2");
    assert!(entries.windows(2).all(|w| w[0].timestamp >= w[1].timestamp));
}

#[tokio::test]
async fn test_replay_follows_current_step_list() {
    let steps = vec![
        step("summary", 0, "{message_content}"),
        step("tone", 1, "{message_content}"),
    ];
    let llm = MockLlm::new(vec![reply("S", "s"), reply("T", "t")]);
    let mut h = harness(llm);
    h.runner.run("hello", &steps, &api()).await.unwrap();

    let entry = h.history.get(0).await.unwrap().unwrap();

    // "tone" was deleted and "follow_up" added since the run
    let current = vec![
        step("follow_up", 0, "{message_content}"),
        step("summary", 1, "{message_content}"),
    ];
    let view = replay(&entry, &current);

    assert_eq!(view.len(), 2);
    assert_eq!(view[0].step_id, "follow_up");
    assert_eq!(view[0].output, "");
    assert_eq!(view[0].summary, "");
    assert_eq!(view[1].output, "S");
    assert_eq!(view[1].summary, "s");
    assert!(view.iter().all(|s| s.step_id != "tone"));
}

#[tokio::test]
async fn test_failed_run_entry_keeps_error_placeholder() {
    let steps = vec![step("a", 0, "A")];
    let mut h = harness(MockLlm::new(Vec::new()).failing_on(0));
    h.runner.run("m", &steps, &api()).await.unwrap();

    let entry = h.history.get(0).await.unwrap().unwrap();
    let view = replay(&entry, &steps);
    assert!(view[0].output.starts_with("Error: "));
}

#[tokio::test]
async fn test_clear_history() {
    let steps = vec![step("a", 0, "A")];
    let mut h = harness(MockLlm::echo());
    h.runner.run("m", &steps, &api()).await.unwrap();

    h.history.clear().await.unwrap();
    assert!(h.history.list().await.unwrap().is_empty());
    assert!(h.history.get(0).await.unwrap().is_none());
}
