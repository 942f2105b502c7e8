//! Collaborators a pipeline run reports to

use std::fmt;

/// Receives progress updates during a run
///
/// `update` is called before and after every step with the number of steps
/// finished so far and the total.
pub trait ProgressSink: Send + Sync {
    /// Progress is `current` of `total` steps
    fn update(&self, current: usize, total: usize);

    /// Display the progress indicator with a status line
    fn show(&self, message: &str);

    /// Remove the progress indicator
    fn hide(&self);
}

/// Kind of user-facing notification
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationKind {
    Success,
    Error,
    Warning,
    Info,
}

impl fmt::Display for NotificationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            NotificationKind::Success => "success",
            NotificationKind::Error => "error",
            NotificationKind::Warning => "warning",
            NotificationKind::Info => "info",
        };
        f.write_str(label)
    }
}

/// Receives user-facing notifications
pub trait NotificationSink: Send + Sync {
    fn notify(&self, kind: NotificationKind, message: &str);

    fn success(&self, message: &str) {
        self.notify(NotificationKind::Success, message);
    }

    fn error(&self, message: &str) {
        self.notify(NotificationKind::Error, message);
    }

    fn warning(&self, message: &str) {
        self.notify(NotificationKind::Warning, message);
    }

    fn info(&self, message: &str) {
        self.notify(NotificationKind::Info, message);
    }
}

/// Progress sink that does nothing
#[derive(Debug, Clone, Default)]
pub struct NoopProgress;

impl ProgressSink for NoopProgress {
    fn update(&self, _current: usize, _total: usize) {}

    fn show(&self, _message: &str) {}

    fn hide(&self) {}
}

/// Notification sink that only logs
#[derive(Debug, Clone, Default)]
pub struct LogNotifier;

impl NotificationSink for LogNotifier {
    fn notify(&self, kind: NotificationKind, message: &str) {
        match kind {
            NotificationKind::Error => tracing::error!("{}", message),
            NotificationKind::Warning => tracing::warn!("{}", message),
            NotificationKind::Success | NotificationKind::Info => tracing::info!("{}", message),
        }
    }
}
