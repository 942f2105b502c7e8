//! Where step template files come from

use anyhow::{Context, Result};
use async_trait::async_trait;
use std::collections::HashMap;
use std::path::PathBuf;
use tokio::sync::RwLock;
use tracing::debug;

/// Templates shipped with the binary, keyed by their configured path
const BUILTIN_TEMPLATES: &[(&str, &str)] = &[
    ("prompts/summary.txt", include_str!("../../prompts/summary.txt")),
    ("prompts/sentiment.txt", include_str!("../../prompts/sentiment.txt")),
    ("prompts/action_items.txt", include_str!("../../prompts/action_items.txt")),
    ("prompts/reply_draft.txt", include_str!("../../prompts/reply_draft.txt")),
];

/// Built-in text for a default template path
pub fn builtin_template(path: &str) -> Option<&'static str> {
    BUILTIN_TEMPLATES
        .iter()
        .find(|(p, _)| *p == path)
        .map(|(_, text)| *text)
}

/// Trait for fetching raw template text by path
#[async_trait]
pub trait TemplateSource: Send + Sync {
    async fn fetch(&self, path: &str) -> Result<String>;
}

/// Reads templates relative to an assets directory
pub struct FsTemplateSource {
    root: PathBuf,
}

impl FsTemplateSource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

#[async_trait]
impl TemplateSource for FsTemplateSource {
    async fn fetch(&self, path: &str) -> Result<String> {
        let full = self.root.join(path);
        match tokio::fs::read_to_string(&full).await {
            Ok(text) => Ok(text),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                let text = builtin_template(path)
                    .with_context(|| format!("Template not found: {}", full.display()))?;
                debug!(path, "Using built-in template");
                Ok(text.to_string())
            }
            Err(e) => {
                Err(e).with_context(|| format!("Failed to read template {}", full.display()))
            }
        }
    }
}

/// Templates held in memory (for testing or embedding)
#[derive(Default)]
pub struct InMemoryTemplates {
    templates: RwLock<HashMap<String, String>>,
}

impl InMemoryTemplates {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert(&self, path: impl Into<String>, text: impl Into<String>) {
        self.templates.write().await.insert(path.into(), text.into());
    }

    pub async fn remove(&self, path: &str) {
        self.templates.write().await.remove(path);
    }
}

#[async_trait]
impl TemplateSource for InMemoryTemplates {
    async fn fetch(&self, path: &str) -> Result<String> {
        self.templates
            .read()
            .await
            .get(path)
            .cloned()
            .with_context(|| format!("Template not found: {}", path))
    }
}
