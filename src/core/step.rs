//! Step domain model

use crate::core::results::StepResults;
use regex::{Captures, Regex};
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;

/// Id of the step synthesized when the configured step set is empty
pub const BASIC_ANALYSIS_ID: &str = "basic_analysis";

/// Token replaced with the raw message text
pub const MESSAGE_TOKEN: &str = "message_content";

static TOKEN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{([a-z0-9_]+)\}").expect("token pattern is valid"));

static STEP_ID: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-z0-9_]+$").expect("step id pattern is valid"));

/// Whether `id` is usable as a step id: lowercase letters, digits and underscores.
/// Only such ids can be referenced as `{id_output}` / `{id_summary}`.
pub fn is_valid_step_id(id: &str) -> bool {
    STEP_ID.is_match(id)
}

/// Prompt text and model instructions of a step
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StepContent {
    /// Prompt template, may reference `{message_content}` and `{id_output}` / `{id_summary}`
    pub step_prompt: String,

    /// Instructions appended after the rendered prompt
    pub llm_instructions: String,
}

impl StepContent {
    pub fn new(step_prompt: impl Into<String>, llm_instructions: impl Into<String>) -> Self {
        Self {
            step_prompt: step_prompt.into(),
            llm_instructions: llm_instructions.into(),
        }
    }
}

/// A single step of the analysis pipeline
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Step {
    /// Unique step identifier (lowercase slug)
    pub id: String,

    /// Display label
    pub menu_name: String,

    /// Execution and display order
    pub position: usize,

    /// Prompt and instructions
    pub content: StepContent,

    /// Backing template file, absent for virtual steps
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_source: Option<String>,

    /// True when the step has no canonical file backing
    #[serde(default)]
    pub is_virtual: bool,

    /// True when a configured step has been overridden by the user
    #[serde(default)]
    pub is_modified: bool,

    /// Ids of other steps referenced by the prompt (derived, not persisted)
    #[serde(skip)]
    pub dependencies: Vec<String>,
}

impl Step {
    /// Create a user-authored step with no file backing
    pub fn new_virtual(
        id: impl Into<String>,
        menu_name: impl Into<String>,
        position: usize,
        content: StepContent,
    ) -> Self {
        Self {
            id: id.into(),
            menu_name: menu_name.into(),
            position,
            content,
            file_source: None,
            is_virtual: true,
            is_modified: false,
            dependencies: Vec::new(),
        }
    }

    /// The step used when no steps are configured at all
    pub fn basic_analysis() -> Self {
        Self {
            id: BASIC_ANALYSIS_ID.to_string(),
            menu_name: "Basic Analysis".to_string(),
            position: 0,
            content: StepContent::new(
                "Analyze the following email and describe its purpose, tone and any requests it makes:\n\n{message_content}",
                DEFAULT_INSTRUCTIONS,
            ),
            file_source: None,
            is_virtual: false,
            is_modified: false,
            dependencies: Vec::new(),
        }
    }

    /// Only configured steps with a template file can be reset
    pub fn can_reset(&self) -> bool {
        !self.is_virtual && self.file_source.is_some()
    }

    /// Substitute `{message_content}` and every token already present in `results`
    ///
    /// Tokens with no value yet are left untouched.
    pub fn render_prompt(&self, message: &str, results: &StepResults) -> String {
        TOKEN
            .replace_all(&self.content.step_prompt, |caps: &Captures| {
                let key = &caps[1];
                if key == MESSAGE_TOKEN {
                    message.to_string()
                } else if let Some(value) = results.get(key) {
                    value.to_string()
                } else {
                    caps[0].to_string()
                }
            })
            .into_owned()
    }

    /// Build the prompt actually sent to the model
    pub fn build_effective_prompt(&self, message: &str, results: &StepResults) -> String {
        format!(
            "{}\n\n{}",
            self.render_prompt(message, results),
            self.content.llm_instructions
        )
    }
}

/// Response format instructions shared by generated steps
pub const DEFAULT_INSTRUCTIONS: &str = "Format your answer as:\n[Response]\n<your detailed answer>\n[Response Summary]\n<one or two sentence summary>";
