//! Dashboard error types

use astryx_ledger::LedgerError;
use astryx_proto::ValidationError;
use astryx_settings::SettingsError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DashError {
    #[error("config error: {0}")]
    Config(String),

    #[error("command error: {0}")]
    Command(String),

    #[error("invalid {field}: {reason}")]
    BadParam { field: &'static str, reason: String },

    #[error("{what} not found: {id}")]
    NotFound { what: &'static str, id: String },

    #[error("invalid sale: {0}")]
    Invalid(#[from] ValidationError),

    #[error("ledger error: {0}")]
    Ledger(#[from] LedgerError),

    #[error("settings error: {0}")]
    Settings(#[from] SettingsError),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

impl DashError {
    /// Input field the user should correct, when the failure is tied to one.
    pub fn field(&self) -> Option<&'static str> {
        match self {
            Self::BadParam { field, .. } => Some(*field),
            Self::NotFound { .. } => Some("id"),
            Self::Invalid(e) => Some(e.field()),
            Self::Ledger(e) => e.field(),
            Self::Settings(e) => e.field(),
            _ => None,
        }
    }
}

pub type DashResult<T> = Result<T, DashError>;
