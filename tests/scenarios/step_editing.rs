//! Test: Step Editing - the shipped steps, edits and their effect on runs

use crate::helpers::*;
use mailsteps::core::has_cycles;
use mailsteps::persistence::{InMemoryStorage, StorageBackend};
use mailsteps::steps::{FsTemplateSource, StepStore};
use std::collections::HashSet;
use std::sync::Arc;

/// Store over the shipped configuration, served from an empty assets dir
async fn shipped_store(storage: Arc<dyn StorageBackend>, assets: &tempfile::TempDir) -> StepStore {
    let templates = Arc::new(FsTemplateSource::new(assets.path()));
    let mut store = StepStore::new(storage, templates, assets.path());
    store.load(false).await.unwrap();
    store
}

#[tokio::test]
async fn test_shipped_steps_load_with_dependencies() {
    let assets = tempfile::tempdir().unwrap();
    let store = shipped_store(Arc::new(InMemoryStorage::new()), &assets).await;

    let ids: Vec<&str> = store.steps().iter().map(|s| s.id.as_str()).collect();
    assert_eq!(ids, vec!["summary", "sentiment", "action_items", "reply_draft"]);
    assert!(!has_cycles(store.steps()));

    let reply = store.get("reply_draft").unwrap();
    assert_eq!(reply.menu_name, "Reply Draft");
    assert_eq!(reply.dependencies, vec!["summary", "sentiment", "action_items"]);

    let active: HashSet<&str> = ids.iter().copied().collect();
    for step in store.steps() {
        assert!(!step.dependencies.contains(&step.id));
        assert!(step.dependencies.iter().all(|d| active.contains(d.as_str())));
    }
}

#[tokio::test]
async fn test_assets_dir_template_wins_over_builtin() {
    let assets = tempfile::tempdir().unwrap();
    std::fs::create_dir_all(assets.path().join("prompts")).unwrap();
    std::fs::write(
        assets.path().join("prompts/summary.txt"),
        "[MENU_Name]\nTL;DR\n[STEP_PROMPT]\nTL;DR of {message_content}\n[LLM_INSTRUCTIONS]\nOne line",
    )
    .unwrap();

    let store = shipped_store(Arc::new(InMemoryStorage::new()), &assets).await;
    let summary = store.get("summary").unwrap();
    assert_eq!(summary.menu_name, "TL;DR");
    assert_eq!(summary.content.llm_instructions, "One line");
}

#[tokio::test]
async fn test_edited_prompt_is_used_by_the_next_run() {
    let assets = tempfile::tempdir().unwrap();
    let mut store = shipped_store(Arc::new(InMemoryStorage::new()), &assets).await;

    for id in ["sentiment", "action_items", "reply_draft"] {
        assert!(store.delete(id).await.unwrap());
    }
    let outcome = store
        .save_changes("summary", "Gist", "Gist of {message_content}", "No markup", None)
        .await
        .unwrap();
    assert!(outcome.success);

    let mut h = harness(MockLlm::new(vec![reply("gist", "g")]));
    h.runner.run("hello", &store.snapshot(), &api()).await.unwrap();

    assert_eq!(h.llm.prompts(), vec!["Gist of hello\n\nNo markup".to_string()]);
}

#[tokio::test]
async fn test_clone_then_edit_leaves_source_alone() {
    let assets = tempfile::tempdir().unwrap();
    let mut store = shipped_store(Arc::new(InMemoryStorage::new()), &assets).await;
    let original = store.get("sentiment").unwrap().clone();

    let copy = store.clone_step("sentiment").await.unwrap().unwrap();
    assert_eq!(copy.position, 4);
    assert_eq!(copy.content, original.content);

    store
        .save_changes(&copy.id, "Mood", "Mood of {message_content}", "", Some("mood"))
        .await
        .unwrap();

    assert_eq!(store.get("sentiment").unwrap(), &original);
    assert!(store.get("mood").is_some());
}

#[tokio::test]
async fn test_colliding_rename_changes_nothing() {
    let assets = tempfile::tempdir().unwrap();
    let mut store = shipped_store(Arc::new(InMemoryStorage::new()), &assets).await;
    let created = store.create().await.unwrap();
    let before = store.snapshot();

    let outcome = store
        .save_changes(&created.id, "Other", "changed", "changed", Some("summary"))
        .await
        .unwrap();

    assert!(!outcome.success);
    assert_eq!(outcome.message, "Step ID must be unique");
    assert_eq!(store.snapshot(), before);
}

#[tokio::test]
async fn test_delete_keeps_positions_dense() {
    let assets = tempfile::tempdir().unwrap();
    let mut store = shipped_store(Arc::new(InMemoryStorage::new()), &assets).await;
    store.create().await.unwrap();

    store.delete("sentiment").await.unwrap();

    let positions: Vec<usize> = store.steps().iter().map(|s| s.position).collect();
    assert_eq!(positions, vec![0, 1, 2, 3]);
    // reply_draft still references the deleted step's output, but not as a dependency
    let reply = store.get("reply_draft").unwrap();
    assert!(reply.content.step_prompt.contains("{sentiment_summary}"));
    assert_eq!(reply.dependencies, vec!["summary", "action_items"]);
}

#[cfg(feature = "sqlite")]
#[tokio::test]
async fn test_customizations_survive_reopening_the_database() {
    use mailsteps::persistence::SqliteStorage;

    let assets = tempfile::tempdir().unwrap();
    let data = tempfile::tempdir().unwrap();
    let db_path = data.path().join("store.db");

    {
        let storage = Arc::new(SqliteStorage::new(&db_path).await.unwrap());
        let mut store = shipped_store(storage, &assets).await;
        store.create().await.unwrap();
        store.move_step("reply_draft", 0).await.unwrap();
        store
            .save_changes("summary", "Short Summary", "Short {message_content}", "", None)
            .await
            .unwrap();
    }

    let storage = Arc::new(SqliteStorage::new(&db_path).await.unwrap());
    let store = shipped_store(storage, &assets).await;

    let ids: Vec<&str> = store.steps().iter().map(|s| s.id.as_str()).collect();
    assert_eq!(
        ids,
        vec!["reply_draft", "summary", "sentiment", "action_items", "custom_step"]
    );
    let summary = store.get("summary").unwrap();
    assert!(summary.is_modified);
    assert_eq!(summary.menu_name, "Short Summary");
    assert!(store.get("custom_step").unwrap().is_virtual);
}
