//! Operating-cost settings for the Astryx dashboard.
//!
//! Provides [`SettingsStore`], a repository for the [`Settings`] singleton
//! backed by an [`astryx_persist::KeyValueStore`] under [`SETTINGS_KEY`].
//! Missing fields read as their defaults; defaults are not written until the
//! first explicit edit.

#![forbid(unsafe_code)]

use astryx_persist::{ChangeFeed, SharedStore, StorageError};
use astryx_proto::{Settings, SettingsPatch};
use thiserror::Error;
use tracing::{debug, info, warn};

/// Record key holding the settings object.
pub const SETTINGS_KEY: &str = "astryxSettings";

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),
    #[error("stored settings are corrupt: {0}")]
    Corrupt(#[source] serde_json::Error),
    #[error("failed to encode settings: {0}")]
    Encode(#[source] serde_json::Error),
    #[error("{field} must be a non-negative number, got {value}")]
    InvalidCost { field: &'static str, value: f64 },
}

impl SettingsError {
    pub fn field(&self) -> Option<&'static str> {
        match self {
            Self::InvalidCost { field, .. } => Some(*field),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, SettingsError>;

/// Repository owning the settings singleton.
#[derive(Clone)]
pub struct SettingsStore {
    store: SharedStore,
}

impl SettingsStore {
    pub fn new(store: SharedStore) -> Self {
        Self { store }
    }

    /// Read settings, reporting storage and decoding failures. Absent record
    /// or absent fields fall back to the defaults.
    pub fn load(&self) -> Result<Settings> {
        let Some(raw) = self.store.get(SETTINGS_KEY)? else {
            debug!(key = SETTINGS_KEY, "no settings stored, using defaults");
            return Ok(Settings::default());
        };
        let stored: SettingsPatch = serde_json::from_str(&raw).map_err(SettingsError::Corrupt)?;
        Ok(Settings::default().merge(stored))
    }

    /// Current settings. Any read failure yields the defaults.
    pub fn get(&self) -> Settings {
        match self.load() {
            Ok(settings) => settings,
            Err(e) => {
                warn!(key = SETTINGS_KEY, error = %e, "cannot read settings, using defaults");
                Settings::default()
            }
        }
    }

    /// Merge `patch` into the current settings and write the full record.
    ///
    /// The merge base is [`SettingsStore::get`], so an unreadable record is
    /// replaced by defaults overlaid with the patch.
    pub fn set(&self, patch: SettingsPatch) -> Result<Settings> {
        validate_patch(&patch)?;

        let merged = self.get().merge(patch);
        let raw = serde_json::to_string(&merged).map_err(SettingsError::Encode)?;
        self.store.set(SETTINGS_KEY, &raw).inspect_err(|e| {
            warn!(key = SETTINGS_KEY, error = %e, "failed to write settings");
        })?;

        info!(
            vps_cost = merged.vps_cost,
            panel_cost = merged.panel_cost,
            "settings updated"
        );
        Ok(merged)
    }

    /// Change signals for the settings record from other contexts.
    pub fn subscribe(&self) -> ChangeFeed {
        self.store.watch(SETTINGS_KEY)
    }
}

/// Check every cost in `patch` without touching storage.
pub fn validate_patch(patch: &SettingsPatch) -> Result<()> {
    check_cost("vpsCost", patch.vps_cost)?;
    check_cost("panelCost", patch.panel_cost)
}

fn check_cost(field: &'static str, value: Option<f64>) -> Result<()> {
    match value {
        Some(v) if !v.is_finite() || v < 0.0 => Err(SettingsError::InvalidCost { field, value: v }),
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use astryx_persist::{FileStore, KeyValueStore, MemoryStore};
    use std::sync::Arc;

    fn memory_settings() -> (Arc<MemoryStore>, SettingsStore) {
        let store = Arc::new(MemoryStore::new());
        let settings = SettingsStore::new(store.clone());
        (store, settings)
    }

    #[test]
    fn test_defaults_on_empty_store() {
        let (store, settings) = memory_settings();
        assert_eq!(
            settings.get(),
            Settings {
                vps_cost: 679.0,
                panel_cost: 6778.0
            }
        );
        // Reading does not persist the defaults.
        assert_eq!(store.get(SETTINGS_KEY).expect("get"), None);
    }

    #[test]
    fn test_partial_set_keeps_other_field() {
        let (_, settings) = memory_settings();
        let merged = settings.set(SettingsPatch::vps_cost(100.0)).expect("set");
        assert_eq!(merged, Settings { vps_cost: 100.0, panel_cost: 6778.0 });
        assert_eq!(settings.get(), merged);

        settings.set(SettingsPatch::panel_cost(25.0)).expect("set");
        assert_eq!(settings.get(), Settings { vps_cost: 100.0, panel_cost: 25.0 });
    }

    #[test]
    fn test_set_writes_full_record() {
        let (store, settings) = memory_settings();
        settings.set(SettingsPatch::panel_cost(1.5)).expect("set");

        let raw = store.get(SETTINGS_KEY).expect("get").expect("written");
        let value: serde_json::Value = serde_json::from_str(&raw).expect("json");
        assert_eq!(value["vpsCost"], 679.0);
        assert_eq!(value["panelCost"], 1.5);
    }

    #[test]
    fn test_missing_field_defaults() {
        let (store, settings) = memory_settings();
        store.set(SETTINGS_KEY, r#"{"panelCost": 10}"#).expect("seed");
        assert_eq!(settings.get(), Settings { vps_cost: 679.0, panel_cost: 10.0 });
    }

    #[test]
    fn test_corrupt_record_reads_defaults() {
        let (store, settings) = memory_settings();
        store.set(SETTINGS_KEY, "[1,2").expect("seed");

        assert!(matches!(settings.load(), Err(SettingsError::Corrupt(_))));
        assert_eq!(settings.get(), Settings::default());
        assert_eq!(store.get(SETTINGS_KEY).expect("get").as_deref(), Some("[1,2"));
    }

    #[test]
    fn test_negative_cost_rejected_without_write() {
        let (store, settings) = memory_settings();
        let err = settings.set(SettingsPatch::vps_cost(-1.0)).unwrap_err();
        assert_eq!(err.field(), Some("vpsCost"));

        let err = settings.set(SettingsPatch::panel_cost(f64::INFINITY)).unwrap_err();
        assert_eq!(err.field(), Some("panelCost"));

        assert_eq!(store.get(SETTINGS_KEY).expect("get"), None);
    }

    #[test]
    fn test_validate_patch_checks_both_fields() {
        let mixed = SettingsPatch {
            vps_cost: Some(5.0),
            panel_cost: Some(-3.0),
        };
        let err = validate_patch(&mixed).unwrap_err();
        assert_eq!(err.field(), Some("panelCost"));
        assert!(validate_patch(&SettingsPatch::default()).is_ok());
    }

    #[test]
    fn test_zero_cost_allowed() {
        let (_, settings) = memory_settings();
        let merged = settings.set(SettingsPatch::vps_cost(0.0)).expect("set");
        assert_eq!(merged.vps_cost, 0.0);
    }

    #[test]
    fn test_storage_failure() {
        let (store, settings) = memory_settings();
        store.set_disabled(true);

        assert_eq!(settings.get(), Settings::default());
        assert!(matches!(
            settings.set(SettingsPatch::vps_cost(1.0)),
            Err(SettingsError::Storage(_))
        ));
    }

    #[test]
    fn test_edit_notifies_other_context() {
        let tab_a = Arc::new(MemoryStore::new());
        let tab_b = Arc::new(tab_a.context());
        let editor = SettingsStore::new(tab_a);
        let viewer = SettingsStore::new(tab_b);

        let mut feed = viewer.subscribe();
        editor.set(SettingsPatch::vps_cost(5.0)).expect("set");

        assert!(feed.try_changed().is_some());
        assert_eq!(viewer.get().vps_cost, 5.0);
    }

    #[test]
    fn test_settings_persistence() {
        let dir = tempfile::tempdir().expect("tempdir");
        {
            let settings = SettingsStore::new(Arc::new(FileStore::new(dir.path())));
            settings.set(SettingsPatch::vps_cost(12.0)).expect("set");
        }
        let settings = SettingsStore::new(Arc::new(FileStore::new(dir.path())));
        assert_eq!(settings.get().vps_cost, 12.0);
    }
}
