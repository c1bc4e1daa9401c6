pub mod framing;
pub mod manifest;
pub mod process;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

use crate::outcome::{FailureKind, Outcome};

pub use framing::FrameError;
pub use process::ProcessChannel;

/// Reason used when the helper rejects a record without saying why.
pub const DEFAULT_HELPER_ERROR: &str = "An unknown error occurred in the native host.";

pub const STATUS_SUCCESS: &str = "success";
pub const STATUS_ERROR: &str = "error";

/// The single message sent to the helper.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HelperRequest {
    pub nbib_data: String,
}

/// The single message the helper sends back.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HelperReply {
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl HelperReply {
    pub fn success() -> Self {
        Self {
            status: Some(STATUS_SUCCESS.to_string()),
            message: None,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            status: Some(STATUS_ERROR.to_string()),
            message: Some(message.into()),
        }
    }
}

#[derive(thiserror::Error, Debug)]
pub enum ChannelError {
    #[error("Specified native messaging host not found: {name}")]
    NotRegistered { name: String },
    #[error("Invalid native messaging host manifest {}: {reason}", path.display())]
    InvalidManifest { path: PathBuf, reason: String },
    #[error("Failed to start native messaging host {}: {source}", program.display())]
    Spawn {
        program: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Error when communicating with the native messaging host: {0}")]
    Frame(#[from] FrameError),
    #[error("Native host has exited.")]
    Disconnected,
    #[error("Native messaging host did not reply within {}s", .0.as_secs_f32())]
    TimedOut(Duration),
}

/// One message out, one message in.
#[async_trait]
pub trait HelperChannel: Send + Sync {
    async fn exchange(&self, message: Value) -> Result<Value, ChannelError>;
}

/// Hands raw record text to the helper and turns its reply into an [`Outcome`].
#[derive(Clone)]
pub struct RelayClient {
    channel: Arc<dyn HelperChannel>,
    timeout: Duration,
}

impl RelayClient {
    pub fn new(channel: Arc<dyn HelperChannel>, timeout: Duration) -> Self {
        Self { channel, timeout }
    }

    pub async fn relay(&self, raw_text: String) -> Outcome {
        let message = match serde_json::to_value(HelperRequest {
            nbib_data: raw_text,
        }) {
            Ok(message) => message,
            Err(e) => return Outcome::failed(FailureKind::Channel, e.to_string()),
        };

        let reply = match tokio::time::timeout(self.timeout, self.channel.exchange(message)).await {
            Ok(Ok(reply)) => reply,
            Ok(Err(e)) => {
                warn!(error = %e, "Native messaging channel failed");
                return Outcome::failed(FailureKind::Channel, e.to_string());
            }
            Err(_) => {
                let e = ChannelError::TimedOut(self.timeout);
                warn!(error = %e, "Native messaging channel timed out");
                return Outcome::failed(FailureKind::Channel, e.to_string());
            }
        };

        interpret_reply(reply)
    }
}

/// Anything other than an object with `status == "success"` is a rejection.
///
/// Read field by field so a malformed `message` cannot hide a success and a
/// malformed `status` cannot hide the helper's message.
pub fn interpret_reply(reply: Value) -> Outcome {
    let status = reply.get("status");
    if status.and_then(Value::as_str) == Some(STATUS_SUCCESS) {
        info!("Helper accepted the record");
        return Outcome::Success;
    }

    // A present message is passed through as-is, even when empty.
    let reason = match reply.get("message") {
        None | Some(Value::Null) => DEFAULT_HELPER_ERROR.to_string(),
        Some(Value::String(message)) => message.clone(),
        Some(other) => other.to_string(),
    };
    warn!(status = ?status, reason = %reason, "Helper rejected the record");
    Outcome::failed(FailureKind::HelperRejected, reason)
}
