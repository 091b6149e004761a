//! astryxdash — terminal front end for the Astryx sales ledger
//!
//! Wires the repositories onto a file-backed store and exposes them through a
//! JSON command surface ([`commands::handle_command`]) and text renderers.
//! Business rules live in the library crates; this crate only reads, calls and
//! renders.

#![forbid(unsafe_code)]

pub mod commands;
pub mod config;
pub mod error;
pub mod metrics_cmd;
pub mod render;
pub mod sales_cmd;
pub mod settings_cmd;

use astryx_ledger::{SalesLedger, sort_newest_first};
use astryx_metrics::{DashboardMetrics, ExpiryBreakdown, MetricsEngine};
use astryx_persist::{FileStore, SharedStore};
use astryx_proto::Sale;
use chrono::NaiveDate;
use std::sync::Arc;

pub use config::DashConfig;
pub use error::{DashError, DashResult};

// ─── Dashboard state ──────────────────────────────────────────────────────────

/// Repositories bound to one store — passed by reference into every handler.
pub struct DashState {
    pub config: DashConfig,
    pub store: SharedStore,
    pub ledger: SalesLedger,
    pub settings: astryx_settings::SettingsStore,
}

impl DashState {
    /// State over the file store at `config.state_path`.
    pub fn new(config: DashConfig) -> Self {
        let store: SharedStore = Arc::new(FileStore::new(&config.state_path));
        Self::with_store(config, store)
    }

    /// State over an arbitrary store.
    pub fn with_store(config: DashConfig, store: SharedStore) -> Self {
        Self {
            ledger: SalesLedger::new(Arc::clone(&store)),
            settings: astryx_settings::SettingsStore::new(Arc::clone(&store)),
            config,
            store,
        }
    }

    /// Fresh metrics from fresh reads.
    pub fn metrics(&self) -> DashboardMetrics {
        MetricsEngine::compute(&self.ledger.list(), &self.settings.get())
    }

    /// The dashboard panel as of `today`, from one read of the ledger.
    pub fn render_dashboard(&self, today: NaiveDate) -> String {
        let sales = self.ledger.list();
        let metrics = MetricsEngine::compute(&sales, &self.settings.get());
        render::dashboard(&metrics, ExpiryBreakdown::tally(&sales, today))
    }

    /// Sales in display order.
    pub fn sales_newest_first(&self) -> Vec<Sale> {
        let mut sales = self.ledger.list();
        sort_newest_first(&mut sales);
        sales
    }
}

/// Create dashboard state from config.
pub fn create_state(config: DashConfig) -> DashState {
    DashState::new(config)
}

// ─── Live view ────────────────────────────────────────────────────────────────

/// Last dashboard panel shown by a live view.
#[derive(Debug, Default)]
pub struct DashboardView {
    shown: Option<String>,
}

impl DashboardView {
    pub fn new() -> Self {
        Self::default()
    }

    /// The panel to print, or `None` when it matches what is already shown.
    /// Any visible difference counts, including sales crossing their
    /// expiration date while the totals stay put.
    pub fn refresh(&mut self, state: &DashState, today: NaiveDate) -> Option<String> {
        let panel = state.render_dashboard(today);
        if self.shown.as_deref() == Some(panel.as_str()) {
            return None;
        }
        self.shown = Some(panel.clone());
        Some(panel)
    }
}
