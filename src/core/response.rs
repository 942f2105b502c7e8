//! Model response parser

use regex::Regex;
use std::sync::LazyLock;

/// Summary used when the model did not provide one
pub const NO_SUMMARY: &str = "No summary provided.";

static CONTENT_SECTION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)\[Response\](.*?)\[Response Summary\]").expect("content pattern is valid")
});

static SUMMARY_SECTION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)\[Response Summary\](.*)$").expect("summary pattern is valid")
});

/// Content and summary split out of a raw model response
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedResponse {
    pub content: String,
    pub summary: String,
}

/// Split a raw response into content and summary
///
/// Never fails: without markers the whole text is the content.
pub fn parse_response(raw: &str) -> ParsedResponse {
    let content = CONTENT_SECTION
        .captures(raw)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().trim().to_string())
        .unwrap_or_else(|| raw.trim().to_string());

    let summary = SUMMARY_SECTION
        .captures(raw)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().trim().to_string())
        .unwrap_or_else(|| NO_SUMMARY.to_string());

    ParsedResponse { content, summary }
}
