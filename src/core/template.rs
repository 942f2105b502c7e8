//! Step template file parser
//!
//! A template holds up to three sections, in any order:
//!
//! ```text
//! [MENU_Name]
//! Summary
//!
//! [STEP_PROMPT]
//! Summarize {message_content}
//!
//! [LLM_INSTRUCTIONS]
//! Be terse
//! ```
//!
//! A tag only counts at the start of a line. Each section runs until the
//! next tag or the end of the text.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;

const MENU_NAME_TAG: &str = "MENU_Name";
const STEP_PROMPT_TAG: &str = "STEP_PROMPT";
const LLM_INSTRUCTIONS_TAG: &str = "LLM_INSTRUCTIONS";

static SECTION_TAG: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?m)^[ \t]*\[(MENU_Name|STEP_PROMPT|LLM_INSTRUCTIONS)\]").expect("section pattern is valid")
});

/// Fields extracted from a step template
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StepTemplate {
    pub menu_name: String,
    pub step_prompt: String,
    pub llm_instructions: String,
}

impl StepTemplate {
    /// Parse template text. Missing sections become empty strings.
    pub fn parse(raw: &str) -> Self {
        let tags: Vec<_> = SECTION_TAG.captures_iter(raw).collect();
        let mut template = StepTemplate::default();

        for (index, caps) in tags.iter().enumerate() {
            let (Some(whole), Some(name)) = (caps.get(0), caps.get(1)) else {
                continue;
            };
            let end = tags
                .get(index + 1)
                .and_then(|next| next.get(0))
                .map(|m| m.start())
                .unwrap_or(raw.len());
            let body = raw[whole.end()..end].trim().to_string();

            // First occurrence of a tag wins
            let slot = match name.as_str() {
                MENU_NAME_TAG => &mut template.menu_name,
                STEP_PROMPT_TAG => &mut template.step_prompt,
                LLM_INSTRUCTIONS_TAG => &mut template.llm_instructions,
                _ => continue,
            };
            if slot.is_empty() {
                *slot = body;
            }
        }

        template
    }

    /// Render the fields back into template text
    pub fn to_text(&self) -> String {
        format!(
            "[{}]\n{}\n\n[{}]\n{}\n\n[{}]\n{}\n",
            MENU_NAME_TAG,
            self.menu_name,
            STEP_PROMPT_TAG,
            self.step_prompt,
            LLM_INSTRUCTIONS_TAG,
            self.llm_instructions
        )
    }
}
