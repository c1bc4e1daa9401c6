//! Helper-process side of the relay: reads one request, delivers the record, replies.
//!
//! Converting the record into a reference-manager format is left to the sink;
//! the sinks here pass the raw text through unchanged.

use anyhow::{Context, Result};
use arboard::Clipboard;
use serde_json::Value;
use std::fs;
use std::path::PathBuf;
use std::sync::Mutex;
use tokio::io::{AsyncRead, AsyncWrite};
use tracing::{error, info, warn};

use crate::relay::framing::{read_message, write_message, MAX_REPLY_BYTES, MAX_REQUEST_BYTES};
use crate::relay::manifest::HostManifest;
use crate::relay::HelperReply;

pub const PROCESSING_FAILED: &str = "Processing failed. See log.";
pub const INVALID_MESSAGE: &str = "Invalid message format.";

/// Final destination of a relayed record.
pub trait RecordSink: Send + Sync {
    fn deliver(&self, raw_text: &str) -> Result<()>;

    /// Called after the reply went out. Sinks that must outlive the exchange block here.
    fn finish(&self) -> Result<()> {
        Ok(())
    }
}

/// Places the record on the system clipboard.
///
/// The clipboard handle that took ownership is kept until `finish`, so the
/// selection never goes ownerless between the two.
#[derive(Default)]
pub struct ClipboardSink {
    held: Mutex<Option<(Clipboard, String)>>,
}

impl ClipboardSink {
    pub fn new() -> Self {
        Self::default()
    }
}

impl RecordSink for ClipboardSink {
    fn deliver(&self, raw_text: &str) -> Result<()> {
        let mut clipboard = Clipboard::new().context("Failed to access system clipboard")?;
        clipboard
            .set_text(raw_text)
            .context("Failed to copy text to clipboard")?;
        *self
            .held
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) =
            Some((clipboard, raw_text.to_string()));
        Ok(())
    }

    #[cfg(target_os = "linux")]
    fn finish(&self) -> Result<()> {
        use arboard::SetExtLinux;

        // X11/Wayland selections live only as long as their owner; keep serving until replaced.
        let held = self
            .held
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .take();
        if let Some((mut clipboard, text)) = held {
            clipboard
                .set()
                .wait()
                .text(text)
                .context("Failed to keep clipboard contents")?;
        }
        Ok(())
    }
}

/// Writes the record to a file instead of the clipboard.
#[derive(Debug, Clone)]
pub struct FileSink {
    path: PathBuf,
}

impl FileSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl RecordSink for FileSink {
    fn deliver(&self, raw_text: &str) -> Result<()> {
        fs::write(&self.path, raw_text)
            .with_context(|| format!("Failed to write record to {}", self.path.display()))
    }
}

/// Builds the reply for one decoded request message.
pub fn handle_request(message: &Value, sink: &dyn RecordSink) -> HelperReply {
    let Some(raw_text) = message.get("nbib_data").and_then(Value::as_str) else {
        error!(message = %message, "Invalid message received");
        return HelperReply::error(INVALID_MESSAGE);
    };

    info!(bytes = raw_text.len(), "Delivering record");
    match sink.deliver(raw_text) {
        Ok(()) => HelperReply::success(),
        Err(e) => {
            error!(error = ?e, "Failed to deliver record");
            HelperReply::error(PROCESSING_FAILED)
        }
    }
}

/// Serves a single exchange. Returns `false` when the input closed without a message.
pub async fn serve_once<R, W>(reader: &mut R, writer: &mut W, sink: &dyn RecordSink) -> Result<bool>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let reply = match read_message(reader, MAX_REQUEST_BYTES).await {
        Ok(Some(message)) => handle_request(&message, sink),
        Ok(None) => {
            info!("Input closed before any message arrived");
            return Ok(false);
        }
        Err(e) => {
            warn!(error = %e, "Failed to read request");
            HelperReply::error(INVALID_MESSAGE)
        }
    };

    let reply = serde_json::to_value(&reply).context("Failed to encode reply")?;
    write_message(writer, &reply, MAX_REPLY_BYTES)
        .await
        .context("Failed to send reply")?;
    info!(reply = %reply, "Reply sent");
    Ok(true)
}

/// Manifest that registers `program` as the helper named `name`.
pub fn manifest_for(name: &str, program: PathBuf, allowed_origins: Vec<String>) -> HostManifest {
    HostManifest::stdio(name, program, allowed_origins)
}
