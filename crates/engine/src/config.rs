//! Application settings, read from TOML.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::EngineError;

pub const CONFIG_ENV: &str = "LABINV_CONFIG";
pub const DEFAULT_CONFIG_FILE: &str = "labinv.toml";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// JSON file mapping logical inventory names to remote ids.
    pub registry_path: PathBuf,
    /// Where downloaded copies live while a session is open.
    pub scratch_dir: PathBuf,
    /// SQLite file backing the blob store.
    pub store_path: PathBuf,
    /// Default tracing filter; `RUST_LOG` overrides it.
    pub log_filter: String,
    pub cleanup_attempts: u32,
    pub cleanup_backoff_ms: u64,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            registry_path: PathBuf::from("drive_ids.json"),
            scratch_dir: PathBuf::from("scratch"),
            store_path: PathBuf::from("labinv.sqlite3"),
            log_filter: "info".to_string(),
            cleanup_attempts: 5,
            cleanup_backoff_ms: 500,
        }
    }
}

impl AppConfig {
    /// Parse `path`; a missing file gives the defaults.
    pub fn load(path: &Path) -> Result<Self, EngineError> {
        if !path.exists() {
            debug!(path = %path.display(), "no config file, using defaults");
            return Ok(Self::default());
        }
        let text = std::fs::read_to_string(path).map_err(|e| EngineError::Storage(e.into()))?;
        let config = toml::from_str(&text)?;
        info!(path = %path.display(), "loaded config");
        Ok(config)
    }

    /// Config file to use: the explicit flag, then `LABINV_CONFIG`, then
    /// `./labinv.toml`.
    pub fn locate(flag: Option<&Path>) -> PathBuf {
        if let Some(path) = flag {
            return path.to_path_buf();
        }
        if let Ok(path) = std::env::var(CONFIG_ENV) {
            if !path.trim().is_empty() {
                return PathBuf::from(path);
            }
        }
        PathBuf::from(DEFAULT_CONFIG_FILE)
    }

    pub fn resolve(flag: Option<&Path>) -> Result<Self, EngineError> {
        Self::load(&Self::locate(flag))
    }

    pub fn cleanup_backoff(&self) -> Duration {
        Duration::from_millis(self.cleanup_backoff_ms)
    }
}
