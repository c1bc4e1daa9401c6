use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

use super::ChannelError;

/// Native messaging host manifest, as installed for Chrome and Chromium.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HostManifest {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub path: PathBuf,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub allowed_origins: Vec<String>,
}

impl HostManifest {
    pub fn stdio(
        name: impl Into<String>,
        path: impl Into<PathBuf>,
        allowed_origins: Vec<String>,
    ) -> Self {
        Self {
            name: name.into(),
            description: "PubMed to EndNote citation helper".to_string(),
            path: path.into(),
            kind: "stdio".to_string(),
            allowed_origins,
        }
    }
}

/// How to launch the helper registered under a logical name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HelperLaunch {
    pub program: PathBuf,
    pub args: Vec<String>,
}

/// Finds the helper executable: an explicit command wins, otherwise the first
/// `<name>.json` manifest found in `manifest_dirs`.
pub fn resolve_helper(
    name: &str,
    command: Option<&Path>,
    args: &[String],
    manifest_dirs: &[PathBuf],
) -> Result<HelperLaunch, ChannelError> {
    if let Some(program) = command {
        return Ok(HelperLaunch {
            program: program.to_path_buf(),
            args: args.to_vec(),
        });
    }

    let file_name = format!("{name}.json");
    for dir in manifest_dirs {
        let manifest_path = dir.join(&file_name);
        if !manifest_path.is_file() {
            continue;
        }

        debug!(path = %manifest_path.display(), "Found helper manifest");
        let manifest = read_manifest(&manifest_path)?;
        if manifest.name != name {
            return Err(ChannelError::InvalidManifest {
                path: manifest_path,
                reason: format!("declares host '{}'", manifest.name),
            });
        }
        if manifest.kind != "stdio" {
            return Err(ChannelError::InvalidManifest {
                path: manifest_path,
                reason: format!("unsupported type '{}'", manifest.kind),
            });
        }

        let program = if manifest.path.is_absolute() {
            manifest.path
        } else {
            dir.join(manifest.path)
        };
        return Ok(HelperLaunch {
            program,
            args: args.to_vec(),
        });
    }

    Err(ChannelError::NotRegistered {
        name: name.to_string(),
    })
}

fn read_manifest(path: &Path) -> Result<HostManifest, ChannelError> {
    let content = fs::read_to_string(path).map_err(|e| ChannelError::InvalidManifest {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;

    serde_json::from_str(&content).map_err(|e| ChannelError::InvalidManifest {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })
}
