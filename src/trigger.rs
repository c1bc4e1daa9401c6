use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tracing::{debug, info};

use crate::config::{configured_identity, is_valid_identity, ConfigStore};
use crate::orchestrator::RequestOrchestrator;
use crate::outcome::Outcome;
use crate::record::{RecordId, RecordRequest};

pub const SUCCESS_NOTICE: &str = "Successfully copied to clipboard!";

/// How long a success or error state stays visible before reverting to idle.
pub const DEFAULT_DISPLAY_INTERVAL: Duration = Duration::from_secs(3);

/// What the export affordance currently shows.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum IndicatorState {
    #[default]
    Idle,
    AwaitingConfiguration,
    Processing,
    Success,
    Error(String),
}

impl fmt::Display for IndicatorState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IndicatorState::Idle => write!(f, "Export to EndNote format"),
            IndicatorState::AwaitingConfiguration => write!(f, "Opening email setup..."),
            IndicatorState::Processing => write!(f, "Processing..."),
            IndicatorState::Success => write!(f, "Successfully copied to clipboard!"),
            IndicatorState::Error(reason) => write!(f, "Error: {reason}"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationKind {
    Success,
    Error,
}

/// Transient message shown after an export attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub kind: NotificationKind,
    pub message: String,
}

impl Notification {
    pub fn success() -> Self {
        Self {
            kind: NotificationKind::Success,
            message: SUCCESS_NOTICE.to_string(),
        }
    }

    pub fn error(reason: &str) -> Self {
        Self {
            kind: NotificationKind::Error,
            message: format!("Error: {reason}"),
        }
    }
}

/// UI collaborator rendering indicator state and notifications.
pub trait FeedbackSurface: Send + Sync {
    fn set_state(&self, state: &IndicatorState);
    fn notify(&self, notification: &Notification);
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TriggerOutcome {
    /// No identity configured; the configuration surface was opened instead.
    ConfigurationRequested,
    /// Another activation of this trigger was still running.
    Busy,
    Completed(Outcome),
}

/// Page-side entry point: one per record page.
pub struct TriggerController {
    record_id: RecordId,
    config: Arc<dyn ConfigStore>,
    orchestrator: Arc<RequestOrchestrator>,
    feedback: Arc<dyn FeedbackSurface>,
    display_interval: Duration,
    in_flight: AtomicBool,
}

struct InFlightGuard<'a>(&'a AtomicBool);

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl TriggerController {
    /// Returns `None` when the page has no recognizable record identifier.
    pub fn for_page(
        page: &str,
        config: Arc<dyn ConfigStore>,
        orchestrator: Arc<RequestOrchestrator>,
        feedback: Arc<dyn FeedbackSurface>,
        display_interval: Duration,
    ) -> Option<Self> {
        let record_id = RecordId::from_page(page)?;
        debug!(record_id = %record_id, "Trigger available for page");
        Some(Self {
            record_id,
            config,
            orchestrator,
            feedback,
            display_interval,
            in_flight: AtomicBool::new(false),
        })
    }

    pub fn record_id(&self) -> &RecordId {
        &self.record_id
    }

    pub async fn activate(&self) -> TriggerOutcome {
        if self
            .in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            debug!(record_id = %self.record_id, "Ignoring activation while a request is in flight");
            return TriggerOutcome::Busy;
        }
        let _guard = InFlightGuard(&self.in_flight);

        let identity = configured_identity(self.config.get())
            .map(|identity| identity.trim().to_string())
            .filter(|identity| is_valid_identity(identity));

        let result = match identity {
            None => {
                info!(record_id = %self.record_id, "No usable email configured, opening settings");
                self.feedback.set_state(&IndicatorState::AwaitingConfiguration);
                self.orchestrator.open_configuration_surface();
                TriggerOutcome::ConfigurationRequested
            }
            Some(identity) => {
                self.feedback.set_state(&IndicatorState::Processing);
                let request = RecordRequest::new(self.record_id.clone(), identity);
                let outcome = self.orchestrator.process_record(&request).await;

                match &outcome {
                    Outcome::Success => {
                        self.feedback.set_state(&IndicatorState::Success);
                        self.feedback.notify(&Notification::success());
                    }
                    Outcome::Failure(failure) => {
                        self.feedback
                            .set_state(&IndicatorState::Error(failure.reason.clone()));
                        self.feedback.notify(&Notification::error(&failure.reason));
                    }
                }
                TriggerOutcome::Completed(outcome)
            }
        };

        tokio::time::sleep(self.display_interval).await;
        self.feedback.set_state(&IndicatorState::Idle);
        result
    }
}
