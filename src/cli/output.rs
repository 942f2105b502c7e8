//! CLI output formatting

use crate::{
    core::{config::ModelInfo, Step, StepResults},
    execution::{NotificationKind, NotificationSink, ProgressSink},
    persistence::{HistoryEntry, ReplayedStep},
};
use console::Emoji;
use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

// Re-export style
pub use console::style;

// Emojis for output
pub static CHECK: Emoji<'_, '_> = Emoji("✅ ", "✓ ");
pub static CROSS: Emoji<'_, '_> = Emoji("❌ ", "✗ ");
pub static INFO: Emoji<'_, '_> = Emoji("ℹ️  ", "i ");
pub static WARN: Emoji<'_, '_> = Emoji("⚠️  ", "! ");
pub static ROCKET: Emoji<'_, '_> = Emoji("🚀 ", "> ");

const PREVIEW_CHARS: usize = 60;

/// Progress bar driven by the pipeline runner
pub struct ProgressBarSink {
    bar: ProgressBar,
}

impl ProgressBarSink {
    pub fn new() -> Self {
        let bar = ProgressBar::hidden();
        bar.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("#>-"),
        );
        Self { bar }
    }
}

impl Default for ProgressBarSink {
    fn default() -> Self {
        Self::new()
    }
}

impl ProgressSink for ProgressBarSink {
    fn update(&self, current: usize, total: usize) {
        self.bar.set_length(total as u64);
        self.bar.set_position(current as u64);
    }

    fn show(&self, message: &str) {
        self.bar
            .set_draw_target(indicatif::ProgressDrawTarget::stderr());
        self.bar.set_message(message.to_string());
        self.bar.enable_steady_tick(Duration::from_millis(100));
    }

    fn hide(&self) {
        self.bar.finish_and_clear();
    }
}

/// Prints notifications to stderr
#[derive(Debug, Clone, Default)]
pub struct ConsoleNotifier;

impl NotificationSink for ConsoleNotifier {
    fn notify(&self, kind: NotificationKind, message: &str) {
        let line = match kind {
            NotificationKind::Success => format!("{}{}", CHECK, style(message).green()),
            NotificationKind::Error => format!("{}{}", CROSS, style(message).red()),
            NotificationKind::Warning => format!("{}{}", WARN, style(message).yellow()),
            NotificationKind::Info => format!("{}{}", INFO, message),
        };
        eprintln!("{}", line);
    }
}

/// Horizontal rule spanning the terminal
pub fn rule() -> String {
    // Get terminal width, default to 80 if unavailable
    let width = term_size::dimensions_stdout()
        .map(|(w, _)| w)
        .unwrap_or(80);
    "─".repeat(width)
}

/// One line per step for `steps list`
pub fn format_step_line(step: &Step) -> String {
    let mut flags = Vec::new();
    if step.is_virtual {
        flags.push(style("custom").magenta().to_string());
    }
    if step.is_modified {
        flags.push(style("modified").yellow().to_string());
    }
    let flags = if flags.is_empty() {
        String::new()
    } else {
        format!(" [{}]", flags.join(", "))
    };

    let deps = if step.dependencies.is_empty() {
        String::new()
    } else {
        format!(" {} {}", style("uses").dim(), step.dependencies.join(", "))
    };

    format!(
        "{:>3}. {} {}{}{}",
        step.position,
        style(&step.menu_name).bold(),
        style(format!("({})", step.id)).dim(),
        flags,
        deps
    )
}

/// Full step view for `steps show`
pub fn format_step_detail(step: &Step) -> String {
    let source = step
        .file_source
        .as_deref()
        .unwrap_or("none");
    format!(
        "{}\n  ID: {}\n  Position: {}\n  Template: {}\n\n{}\n{}\n\n{}\n{}",
        style(&step.menu_name).bold(),
        style(&step.id).cyan(),
        step.position,
        style(source).dim(),
        style("[STEP_PROMPT]").dim(),
        step.content.step_prompt,
        style("[LLM_INSTRUCTIONS]").dim(),
        step.content.llm_instructions
    )
}

/// Render one result section per step, in step order
pub fn format_results(steps: &[ReplayedStep]) -> String {
    let rule = rule();
    let mut out = String::new();
    for step in steps {
        out.push_str(&format!(
            "{}\n{} {}\n{}\n\n{}\n\n{} {}\n",
            style(&rule).dim(),
            ROCKET,
            style(&step.menu_name).bold(),
            style(&rule).dim(),
            step.output,
            style("Summary:").cyan(),
            step.summary
        ));
    }
    out
}

/// Result sections for a fresh run
pub fn replay_results(steps: &[Step], results: &StepResults) -> Vec<ReplayedStep> {
    let mut ordered: Vec<&Step> = steps.iter().collect();
    ordered.sort_by_key(|s| s.position);
    ordered
        .into_iter()
        .filter(|s| results.contains_step(&s.id))
        .map(|s| ReplayedStep {
            step_id: s.id.clone(),
            menu_name: s.menu_name.clone(),
            output: results.output(&s.id).unwrap_or_default().to_string(),
            summary: results.summary(&s.id).unwrap_or_default().to_string(),
        })
        .collect()
}

/// One line per history entry
pub fn format_history_entry(index: usize, entry: &HistoryEntry) -> String {
    format!(
        "{:>3}. {} {} {}",
        index,
        style(entry.timestamp.format("%Y-%m-%d %H:%M:%S")).dim(),
        style(&entry.id.to_string()[..8]).dim(),
        preview(&entry.message, PREVIEW_CHARS)
    )
}

pub fn format_model(model: &ModelInfo, selected: bool) -> String {
    let marker = if selected { CHECK.to_string() } else { "   ".to_string() };
    format!(
        "{}{} {} {}",
        marker,
        style(&model.id).bold(),
        model.display_name,
        style(format!("({})", model.provider)).dim()
    )
}

/// First line of `text`, cut to `max_chars`
pub fn preview(text: &str, max_chars: usize) -> String {
    let first_line = text.trim().lines().next().unwrap_or_default();
    if first_line.chars().count() <= max_chars {
        first_line.to_string()
    } else {
        let cut: String = first_line.chars().take(max_chars).collect();
        format!("{}...", cut)
    }
}
