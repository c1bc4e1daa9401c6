use dialoguer::Input;
use std::io::IsTerminal;
use std::sync::Arc;
use tokio::runtime::{Handle, RuntimeFlavor};
use tracing::warn;

use crate::config::{is_valid_identity, ConfigStore};
use crate::orchestrator::ConfigurationSurface;
use crate::trigger::{FeedbackSurface, IndicatorState, Notification, NotificationKind};
use crate::utils::unicode::{single_line, truncate_chars};

/// Longest notification line printed to the terminal.
const MAX_NOTICE_CHARS: usize = 300;

/// Prints trigger state and notifications to the terminal.
#[derive(Debug, Default)]
pub struct TerminalFeedback {
    quiet: bool,
}

impl TerminalFeedback {
    pub fn new(quiet: bool) -> Self {
        Self { quiet }
    }

    pub fn format_notification(notification: &Notification) -> String {
        let icon = match notification.kind {
            NotificationKind::Success => "✓",
            NotificationKind::Error => "✗",
        };
        let message = truncate_chars(&single_line(&notification.message), MAX_NOTICE_CHARS);
        format!("{icon} {message}")
    }
}

impl FeedbackSurface for TerminalFeedback {
    fn set_state(&self, state: &IndicatorState) {
        if self.quiet {
            return;
        }
        // Success and Error are covered by the notification that follows them.
        match state {
            IndicatorState::Processing | IndicatorState::AwaitingConfiguration => {
                eprintln!("{state}")
            }
            IndicatorState::Idle | IndicatorState::Success | IndicatorState::Error(_) => {}
        }
    }

    fn notify(&self, notification: &Notification) {
        let line = Self::format_notification(notification);
        match notification.kind {
            NotificationKind::Success => println!("{line}"),
            NotificationKind::Error => eprintln!("{line}"),
        }
    }
}

/// Asks for the contact email on the terminal and stores it.
pub struct PromptConfigurationSurface {
    store: Arc<dyn ConfigStore>,
}

impl PromptConfigurationSurface {
    pub fn new(store: Arc<dyn ConfigStore>) -> Self {
        Self { store }
    }

    fn prompt(&self) -> anyhow::Result<String> {
        let mut input = Input::<String>::new()
            .with_prompt("Contact email for PubMed requests")
            .validate_with(|value: &String| -> Result<(), &str> {
                if is_valid_identity(value.trim()) {
                    Ok(())
                } else {
                    Err("Please enter a valid email address")
                }
            });
        if let Some(current) = self.store.get().filter(|s| !s.is_empty()) {
            input = input.with_initial_text(current);
        }

        let email = input.interact_text()?;
        Ok(email.trim().to_string())
    }
}

impl ConfigurationSurface for PromptConfigurationSurface {
    fn open(&self) {
        if !std::io::stdin().is_terminal() {
            NoticeConfigurationSurface.open();
            return;
        }

        match run_blocking(|| self.prompt().and_then(|email| self.store.set(&email))) {
            Ok(()) => println!("✓ Settings saved. Run the export again to copy the citation."),
            Err(e) => {
                warn!(error = %e, "Could not save email");
                eprintln!("✗ Error saving settings: {e}");
            }
        }
    }
}

/// Runs a blocking terminal read without stalling other tasks on a multi-threaded runtime.
fn run_blocking<T>(f: impl FnOnce() -> T) -> T {
    match Handle::try_current() {
        Ok(handle) if handle.runtime_flavor() == RuntimeFlavor::MultiThread => {
            tokio::task::block_in_place(f)
        }
        _ => f(),
    }
}

/// Non-interactive surface: tells the user how to configure the email.
#[derive(Debug, Default)]
pub struct NoticeConfigurationSurface;

impl ConfigurationSurface for NoticeConfigurationSurface {
    fn open(&self) {
        eprintln!("A contact email is required by the PubMed API.");
        eprintln!("Set one with: pm2en config set-email <EMAIL>");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_success_notification() {
        assert_eq!(
            TerminalFeedback::format_notification(&Notification::success()),
            "✓ Successfully copied to clipboard!"
        );
    }

    #[test]
    fn test_format_error_notification_is_single_line() {
        let notification = Notification::error("Processing failed.\nSee log.");
        assert_eq!(
            TerminalFeedback::format_notification(&notification),
            "✗ Error: Processing failed. See log."
        );
    }

    #[test]
    fn test_format_long_error_is_truncated() {
        let notification = Notification::error(&"x".repeat(1000));
        let line = TerminalFeedback::format_notification(&notification);
        assert!(line.chars().count() <= MAX_NOTICE_CHARS + 2);
        assert!(line.ends_with('…'));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_run_blocking_on_multi_thread_runtime() {
        let mut called = false;
        let value = run_blocking(|| {
            called = true;
            7
        });
        assert_eq!(value, 7);
        assert!(called);
    }

    #[tokio::test]
    async fn test_run_blocking_on_current_thread_runtime() {
        assert_eq!(run_blocking(|| "ok"), "ok");
    }

    #[test]
    fn test_run_blocking_outside_runtime() {
        assert_eq!(run_blocking(|| 1 + 1), 2);
    }
}
