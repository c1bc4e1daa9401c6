use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::fetch::RecordSource;
use crate::outcome::{FailureKind, Outcome};
use crate::record::{RecordId, RecordRequest};
use crate::relay::RelayClient;

pub const SUCCESS_MESSAGE: &str = "Citation copied to clipboard.";

/// UI collaborator able to bring up the identity form.
pub trait ConfigurationSurface: Send + Sync {
    fn open(&self);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    Fetching,
    Relaying,
    Completed,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Phase::Idle => write!(f, "idle"),
            Phase::Fetching => write!(f, "fetching"),
            Phase::Relaying => write!(f, "relaying"),
            Phase::Completed => write!(f, "completed"),
        }
    }
}

/// Messages accepted by [`RequestOrchestrator::dispatch`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action")]
pub enum BackgroundRequest {
    #[serde(rename = "fetchAndFormatPMID")]
    FetchAndFormatPmid {
        pmid: String,
        #[serde(rename = "userEmail")]
        user_email: String,
    },
    #[serde(rename = "openSettings")]
    OpenSettings,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackgroundResponse {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl From<&Outcome> for BackgroundResponse {
    fn from(outcome: &Outcome) -> Self {
        match outcome {
            Outcome::Success => Self {
                success: true,
                message: Some(SUCCESS_MESSAGE.to_string()),
                error: None,
            },
            Outcome::Failure(failure) => Self {
                success: false,
                message: None,
                error: Some(failure.reason.clone()),
            },
        }
    }
}

/// Sequences fetch and relay for one record at a time. Holds no per-request state.
pub struct RequestOrchestrator {
    source: Arc<dyn RecordSource>,
    relay: RelayClient,
    ui: Arc<dyn ConfigurationSurface>,
}

impl RequestOrchestrator {
    pub fn new(
        source: Arc<dyn RecordSource>,
        relay: RelayClient,
        ui: Arc<dyn ConfigurationSurface>,
    ) -> Self {
        Self { source, relay, ui }
    }

    /// Fetches the record and relays it to the helper. Every failure comes back as an [`Outcome`].
    pub async fn process_record(&self, request: &RecordRequest) -> Outcome {
        let mut phase = Phase::Idle;

        if request.identity.trim().is_empty() {
            return self.complete(
                request,
                &mut phase,
                Outcome::failed(FailureKind::InvalidRequest, "No contact email configured"),
            );
        }

        self.advance(request, &mut phase, Phase::Fetching);
        let raw_text = match self
            .source
            .fetch(&request.record_id, &request.identity)
            .await
        {
            Ok(text) => text,
            Err(e) => {
                let outcome = Outcome::failed(e.kind(), e.to_string());
                return self.complete(request, &mut phase, outcome);
            }
        };

        self.advance(request, &mut phase, Phase::Relaying);
        let outcome = self.relay.relay(raw_text).await;
        self.complete(request, &mut phase, outcome)
    }

    pub fn open_configuration_surface(&self) {
        info!("Opening configuration surface");
        self.ui.open();
    }

    /// Message-style entry point. `OpenSettings` is one-way and yields no response.
    pub async fn dispatch(&self, request: BackgroundRequest) -> Option<BackgroundResponse> {
        match request {
            BackgroundRequest::OpenSettings => {
                self.open_configuration_surface();
                None
            }
            BackgroundRequest::FetchAndFormatPmid { pmid, user_email } => {
                let outcome = match RecordId::parse(&pmid) {
                    Ok(record_id) => {
                        self.process_record(&RecordRequest::new(record_id, user_email))
                            .await
                    }
                    Err(reason) => {
                        warn!(pmid = %pmid, "Rejected request with invalid PMID");
                        Outcome::failed(FailureKind::InvalidRequest, reason)
                    }
                };
                Some(BackgroundResponse::from(&outcome))
            }
        }
    }

    fn advance(&self, request: &RecordRequest, phase: &mut Phase, next: Phase) {
        debug!(
            request_id = %request.request_id,
            record_id = %request.record_id,
            from = %phase,
            to = %next,
            "Request phase changed"
        );
        *phase = next;
    }

    fn complete(&self, request: &RecordRequest, phase: &mut Phase, outcome: Outcome) -> Outcome {
        self.advance(request, phase, Phase::Completed);
        match &outcome {
            Outcome::Success => info!(
                request_id = %request.request_id,
                record_id = %request.record_id,
                "Record exported"
            ),
            Outcome::Failure(failure) => warn!(
                request_id = %request.request_id,
                record_id = %request.record_id,
                kind = %failure.kind,
                reason = %failure.reason,
                "Record export failed"
            ),
        }
        outcome
    }
}
