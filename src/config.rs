use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::Duration;
use tracing::{debug, warn};

use crate::utils::paths::{ensure_parent_exists, get_config_path};

pub const DEFAULT_EUTILS_BASE_URL: &str = "https://eutils.ncbi.nlm.nih.gov";
pub const DEFAULT_HELPER_NAME: &str = "com.pubmed.endnote";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Contact address sent to the upstream API with every fetch.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,

    #[serde(default)]
    pub pubmed: PubmedConfig,

    #[serde(default)]
    pub helper: HelperConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PubmedConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,

    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HelperConfig {
    #[serde(default = "default_helper_name")]
    pub name: String,

    /// Explicit helper executable; skips the manifest lookup when set.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub command: Option<PathBuf>,

    #[serde(default)]
    pub args: Vec<String>,

    /// Extra manifest directories searched before the browser defaults.
    #[serde(default)]
    pub manifest_dirs: Vec<PathBuf>,

    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_base_url() -> String {
    DEFAULT_EUTILS_BASE_URL.to_string()
}

fn default_helper_name() -> String {
    DEFAULT_HELPER_NAME.to_string()
}

fn default_timeout_secs() -> u64 {
    30
}

impl Default for PubmedConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl Default for HelperConfig {
    fn default() -> Self {
        Self {
            name: default_helper_name(),
            command: None,
            args: Vec::new(),
            manifest_dirs: Vec::new(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl PubmedConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl HelperConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Config {
    /// Reads the config at `path`, falling back to defaults when the file does not exist.
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Config::default());
        }

        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config: {}", path.display()))?;
        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config: {}", path.display()))?;

        Ok(config)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        ensure_parent_exists(path)?;

        let content = toml::to_string_pretty(self).context("Failed to serialize config")?;
        let temp_path = path.with_extension("tmp");

        fs::write(&temp_path, content)
            .with_context(|| format!("Failed to write to temp file: {}", temp_path.display()))?;

        fs::rename(&temp_path, path)
            .with_context(|| format!("Failed to rename temp file to: {}", path.display()))?;

        Ok(())
    }
}

/// Basic `local@domain.tld` shape check used by the configuration surface and trigger gate.
pub fn is_valid_identity(identity: &str) -> bool {
    if identity.chars().any(char::is_whitespace) {
        return false;
    }

    let mut parts = identity.split('@');
    let (Some(local), Some(domain), None) = (parts.next(), parts.next(), parts.next()) else {
        return false;
    };

    if local.is_empty() {
        return false;
    }

    // needs a dot with text on both sides of it
    domain
        .char_indices()
        .any(|(i, c)| c == '.' && i > 0 && i + 1 < domain.len())
}

/// Returns the identity only if it holds something other than whitespace.
pub fn configured_identity(value: Option<String>) -> Option<String> {
    value.filter(|identity| !identity.trim().is_empty())
}

/// Durable holder for the single identity string.
pub trait ConfigStore: Send + Sync {
    /// `None` when nothing was ever stored; `Some("")` is a stored empty value.
    fn get(&self) -> Option<String>;
    fn set(&self, identity: &str) -> Result<()>;
}

/// Keeps the identity in the TOML config file, re-reading it on every `get`.
#[derive(Debug, Clone)]
pub struct FileConfigStore {
    path: PathBuf,
}

impl FileConfigStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn from_default_path() -> Result<Self> {
        Ok(Self::new(get_config_path()?))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ConfigStore for FileConfigStore {
    fn get(&self) -> Option<String> {
        match Config::load_from(&self.path) {
            Ok(config) => config.email,
            Err(e) => {
                warn!(
                    path = %self.path.display(),
                    error = %e,
                    "Could not read identity from config"
                );
                None
            }
        }
    }

    fn set(&self, identity: &str) -> Result<()> {
        let mut config = match Config::load_from(&self.path) {
            Ok(config) => config,
            Err(e) => {
                // Unreadable file reads as absent in `get`; keep a copy and start over.
                let backup = self.path.with_extension("toml.bak");
                warn!(
                    path = %self.path.display(),
                    backup = %backup.display(),
                    error = %e,
                    "Replacing unreadable config"
                );
                fs::rename(&self.path, &backup).with_context(|| {
                    format!("Failed to move unreadable config to {}", backup.display())
                })?;
                Config::default()
            }
        };
        config.email = Some(identity.to_string());
        config.save_to(&self.path)?;
        debug!(path = %self.path.display(), "Stored identity");
        Ok(())
    }
}

#[derive(Debug, Default)]
pub struct MemoryConfigStore {
    identity: Mutex<Option<String>>,
}

impl MemoryConfigStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_identity(identity: impl Into<String>) -> Self {
        Self {
            identity: Mutex::new(Some(identity.into())),
        }
    }
}

impl ConfigStore for MemoryConfigStore {
    fn get(&self) -> Option<String> {
        self.identity
            .lock()
            .map(|guard| guard.clone())
            .unwrap_or_else(|poisoned| poisoned.into_inner().clone())
    }

    fn set(&self, identity: &str) -> Result<()> {
        let mut guard = self
            .identity
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        *guard = Some(identity.to_string());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.email, None);
        assert_eq!(config.pubmed.base_url, DEFAULT_EUTILS_BASE_URL);
        assert_eq!(config.helper.name, DEFAULT_HELPER_NAME);
        assert_eq!(config.helper.timeout(), Duration::from_secs(30));
    }

    #[test]
    fn test_config_deserialization_fills_defaults() {
        let toml_str = r#"
        email = "a@b.com"

        [helper]
        command = "/usr/local/bin/pm2en-host"
        "#;

        let config: Config = toml::from_str(toml_str).unwrap();
        assert_eq!(config.email.as_deref(), Some("a@b.com"));
        assert_eq!(
            config.helper.command,
            Some(PathBuf::from("/usr/local/bin/pm2en-host"))
        );
        assert_eq!(config.helper.name, DEFAULT_HELPER_NAME);
        assert_eq!(config.pubmed.timeout(), Duration::from_secs(30));
    }

    #[test]
    fn test_load_missing_file_returns_default() {
        let temp_dir = TempDir::new().unwrap();
        let config = Config::load_from(&temp_dir.path().join("missing.toml")).unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_load_invalid_toml_fails() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config.toml");
        fs::write(&path, "email = [").unwrap();

        assert!(Config::load_from(&path).is_err());
    }

    #[test]
    fn test_file_store_read_after_write() {
        let temp_dir = TempDir::new().unwrap();
        let store = FileConfigStore::new(temp_dir.path().join("nested").join("config.toml"));

        assert_eq!(store.get(), None);

        store.set("a@b.com").unwrap();
        assert_eq!(store.get().as_deref(), Some("a@b.com"));

        store.set("c@d.org").unwrap();
        assert_eq!(store.get().as_deref(), Some("c@d.org"));
    }

    #[test]
    fn test_file_store_distinguishes_empty_from_absent() {
        let temp_dir = TempDir::new().unwrap();
        let store = FileConfigStore::new(temp_dir.path().join("config.toml"));

        store.set("").unwrap();

        assert_eq!(store.get(), Some(String::new()));
        assert_eq!(configured_identity(store.get()), None);
    }

    #[test]
    fn test_file_store_set_preserves_other_settings() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config.toml");
        fs::write(&path, "[pubmed]\ntimeout_secs = 10\n").unwrap();

        let store = FileConfigStore::new(&path);
        store.set("a@b.com").unwrap();

        let config = Config::load_from(&path).unwrap();
        assert_eq!(config.pubmed.timeout_secs, 10);
        assert_eq!(config.email.as_deref(), Some("a@b.com"));
    }

    #[test]
    fn test_file_store_corrupt_file_reads_as_absent() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config.toml");
        fs::write(&path, "not toml at all = = =").unwrap();

        assert_eq!(FileConfigStore::new(&path).get(), None);
    }

    #[test]
    fn test_file_store_set_recovers_from_corrupt_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config.toml");
        fs::write(&path, "email = [").unwrap();
        let store = FileConfigStore::new(&path);

        assert_eq!(store.get(), None);
        store.set("a@b.com").unwrap();

        assert_eq!(store.get().as_deref(), Some("a@b.com"));
        assert_eq!(
            fs::read_to_string(temp_dir.path().join("config.toml.bak")).unwrap(),
            "email = ["
        );
    }

    #[test]
    fn test_memory_store() {
        let store = MemoryConfigStore::new();
        assert_eq!(store.get(), None);
        store.set("a@b.com").unwrap();
        assert_eq!(store.get().as_deref(), Some("a@b.com"));
    }

    #[test]
    fn test_configured_identity() {
        assert_eq!(configured_identity(None), None);
        assert_eq!(configured_identity(Some("   ".to_string())), None);
        assert_eq!(
            configured_identity(Some("a@b.com".to_string())).as_deref(),
            Some("a@b.com")
        );
    }

    #[test]
    fn test_is_valid_identity() {
        assert!(is_valid_identity("a@b.com"));
        assert!(is_valid_identity("first.last@lab.example.ac.jp"));
        assert!(!is_valid_identity(""));
        assert!(!is_valid_identity("a@b"));
        assert!(!is_valid_identity("@b.com"));
        assert!(!is_valid_identity("a@.com"));
        assert!(!is_valid_identity("a@b."));
        assert!(is_valid_identity("a@b.c."));
        assert!(!is_valid_identity("a b@c.com"));
        assert!(!is_valid_identity("a@b@c.com"));
    }
}
