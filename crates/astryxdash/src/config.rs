//! Dashboard configuration

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{DashError, DashResult};

/// Lower bound on the watch loop's polling period.
pub const MIN_POLL_INTERVAL_MS: u64 = 50;

/// Configuration for the astryxdash front end.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DashConfig {
    /// Directory holding the `state/` record files
    pub state_path: PathBuf,

    /// How often `watch` re-reads the store, in milliseconds
    #[serde(default = "default_poll_interval")]
    pub poll_interval_ms: u64,

    /// Tracing filter used when `RUST_LOG` is unset
    #[serde(default = "default_log_filter")]
    pub log_filter: String,
}

fn default_poll_interval() -> u64 {
    1000
}

fn default_log_filter() -> String {
    "astryxdash=info,astryx_ledger=info,astryx_settings=info".to_string()
}

/// `~/.astryxdash`, or `/tmp/.astryxdash` without a home directory.
pub fn default_state_path() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("/tmp"))
        .join(".astryxdash")
}

pub fn default_config_path() -> PathBuf {
    default_state_path().join("config.json")
}

impl DashConfig {
    pub fn load(path: &Path) -> DashResult<Self> {
        let data = std::fs::read_to_string(path)
            .map_err(|e| DashError::Config(format!("read {}: {e}", path.display())))?;
        serde_json::from_str(&data)
            .map_err(|e| DashError::Config(format!("parse {}: {e}", path.display())))
    }

    /// Like [`DashConfig::load`], but a missing file yields the defaults.
    pub fn load_or_default(path: &Path) -> DashResult<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        Self::load(path)
    }

    pub fn save(&self, path: &Path) -> DashResult<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let data = serde_json::to_string_pretty(self)?;
        std::fs::write(path, data)?;
        Ok(())
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms.max(MIN_POLL_INTERVAL_MS))
    }
}

impl Default for DashConfig {
    fn default() -> Self {
        Self {
            state_path: default_state_path(),
            poll_interval_ms: default_poll_interval(),
            log_filter: default_log_filter(),
        }
    }
}
