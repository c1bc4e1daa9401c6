use anyhow::{anyhow, Result};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

/// Environment variable that points the CLI at a different config file.
pub const CONFIG_PATH_ENV: &str = "PM2EN_CONFIG";

pub fn get_app_dir() -> Result<PathBuf> {
    let home = dirs::home_dir().ok_or_else(|| anyhow!("Could not find home directory"))?;
    Ok(home.join(".pubmed2endnote"))
}

pub fn get_config_path() -> Result<PathBuf> {
    if let Some(path) = env::var_os(CONFIG_PATH_ENV).filter(|p| !p.is_empty()) {
        return Ok(PathBuf::from(path));
    }
    let app_dir = get_app_dir()?;
    Ok(app_dir.join("config.toml"))
}

/// Directories where Chrome and Chromium look for per-user native messaging host manifests.
pub fn default_manifest_dirs() -> Vec<PathBuf> {
    let Some(config_dir) = dirs::config_dir() else {
        return Vec::new();
    };

    if cfg!(target_os = "macos") {
        vec![
            config_dir.join("Google/Chrome/NativeMessagingHosts"),
            config_dir.join("Chromium/NativeMessagingHosts"),
        ]
    } else {
        vec![
            config_dir.join("google-chrome/NativeMessagingHosts"),
            config_dir.join("chromium/NativeMessagingHosts"),
        ]
    }
}

pub fn ensure_parent_exists(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
        && !parent.exists()
    {
        fs::create_dir_all(parent)?;
    }

    Ok(())
}
