//! Seams to the host: alarm playback, user notices, and yes/no prompts.
//!
//! None of these may fail the core. Alarm errors are logged; notices are
//! fire-and-forget; a prompt that cannot be shown counts as "no".

use tracing::{info, warn};

pub type AlarmError = Box<dyn std::error::Error + Send + Sync>;

/// Plays the completion alarm.
pub trait Alarm: Send + Sync {
    fn ring(&self) -> Result<(), AlarmError>;
}

/// Non-blocking user notification (toast, status line).
pub trait Notifier: Send + Sync {
    fn notify(&self, message: &str);
}

/// Blocking yes/no question used before destructive operations.
pub trait ConfirmPrompt {
    fn confirm(&self, question: &str, confirm_label: &str, cancel_label: &str) -> bool;
}

/// Alarm that does nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct SilentAlarm;

impl Alarm for SilentAlarm {
    fn ring(&self) -> Result<(), AlarmError> {
        Ok(())
    }
}

/// Notifier that forwards to the log.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn notify(&self, message: &str) {
        info!(target: "timerdeck::notice", "{message}");
    }
}

/// Prompt with a fixed answer, for `--yes` flags and tests.
#[derive(Debug, Clone, Copy)]
pub struct FixedAnswer(pub bool);

impl ConfirmPrompt for FixedAnswer {
    fn confirm(&self, question: &str, _confirm_label: &str, _cancel_label: &str) -> bool {
        if !self.0 {
            warn!(question, "confirmation declined");
        }
        self.0
    }
}
