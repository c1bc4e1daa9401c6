use async_trait::async_trait;
use serde_json::Value;
use std::path::PathBuf;
use std::process::Stdio;
use tokio::process::{Child, Command};
use tracing::{debug, info};

use super::framing::{read_message, write_message, MAX_REPLY_BYTES, MAX_REQUEST_BYTES};
use super::manifest::{resolve_helper, HelperLaunch};
use super::{ChannelError, HelperChannel};
use crate::config::HelperConfig;
use crate::utils::paths::default_manifest_dirs;

/// Talks to a helper executable over stdin/stdout, one process per exchange.
#[derive(Debug, Clone)]
pub struct ProcessChannel {
    name: String,
    command: Option<PathBuf>,
    args: Vec<String>,
    manifest_dirs: Vec<PathBuf>,
}

impl ProcessChannel {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            command: None,
            args: Vec::new(),
            manifest_dirs: default_manifest_dirs(),
        }
    }

    pub fn from_config(config: &HelperConfig) -> Self {
        let mut manifest_dirs = config.manifest_dirs.clone();
        manifest_dirs.extend(default_manifest_dirs());

        Self {
            name: config.name.clone(),
            command: config.command.clone(),
            args: config.args.clone(),
            manifest_dirs,
        }
    }

    pub fn with_command(mut self, command: impl Into<PathBuf>, args: Vec<String>) -> Self {
        self.command = Some(command.into());
        self.args = args;
        self
    }

    pub fn with_manifest_dirs(mut self, dirs: Vec<PathBuf>) -> Self {
        self.manifest_dirs = dirs;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn resolve(&self) -> Result<HelperLaunch, ChannelError> {
        resolve_helper(
            &self.name,
            self.command.as_deref(),
            &self.args,
            &self.manifest_dirs,
        )
    }
}

/// Kills the helper when dropped, unless it already replied.
struct HelperProcess {
    child: Child,
    replied: bool,
}

impl Drop for HelperProcess {
    fn drop(&mut self) {
        if !self.replied {
            let _ = self.child.start_kill();
        }
    }
}

#[async_trait]
impl HelperChannel for ProcessChannel {
    async fn exchange(&self, message: Value) -> Result<Value, ChannelError> {
        let launch = self.resolve()?;
        debug!(helper = %self.name, program = %launch.program.display(), "Starting helper");

        let child = Command::new(&launch.program)
            .args(&launch.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .spawn()
            .map_err(|source| ChannelError::Spawn {
                program: launch.program.clone(),
                source,
            })?;
        let mut process = HelperProcess {
            child,
            replied: false,
        };

        let mut stdin = process
            .child
            .stdin
            .take()
            .ok_or(ChannelError::Disconnected)?;
        let mut stdout = process
            .child
            .stdout
            .take()
            .ok_or(ChannelError::Disconnected)?;

        write_message(&mut stdin, &message, MAX_REQUEST_BYTES).await?;
        drop(stdin);

        let reply = read_message(&mut stdout, MAX_REPLY_BYTES)
            .await?
            .ok_or(ChannelError::Disconnected)?;

        // The helper may keep running after replying (e.g. to keep serving the clipboard).
        process.replied = true;
        info!(helper = %self.name, "Helper replied");
        Ok(reply)
    }
}
