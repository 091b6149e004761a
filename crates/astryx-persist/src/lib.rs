//! Key-value persistence for the Astryx sales ledger.
//!
//! Provides the [`KeyValueStore`] contract used by every repository, plus two
//! media behind it:
//!
//! - [`MemoryStore`]: an in-process medium shared by several context handles,
//!   the way several open dashboard views share one local store.
//! - [`FileStore`]: one file per key under `{state_path}/state/`, with
//!   digest-based detection of writes made by other processes.
//!
//! Writes made by one context are announced to every *other* context through a
//! [`ChangeFeed`]. A signal never carries data: receivers re-read.

#![forbid(unsafe_code)]

mod file;
mod memory;

use std::sync::Arc;
use tokio::sync::broadcast;
use tokio::sync::broadcast::error::{RecvError, TryRecvError};
use tracing::debug;
use uuid::Uuid;

pub use error::{Result, StorageError};
pub use file::FileStore;
pub use memory::MemoryStore;

/// Capacity of every change channel. Slow receivers past this point get a
/// key-less [`ExternalChange`] instead of the individual signals.
pub const CHANGE_CHANNEL_CAPACITY: usize = 64;

/// Identifies one execution context (one open view) attached to a medium.
pub type ContextId = Uuid;

/// Origin used for changes detected on disk rather than written in-process.
pub const EXTERNAL_ORIGIN: ContextId = Uuid::nil();

// ─── Store contract ───────────────────────────────────────────────────────────

/// A synchronous, string-keyed, durable store.
pub trait KeyValueStore: Send + Sync {
    /// Read the raw value at `key`. `Ok(None)` when the key is absent.
    fn get(&self, key: &str) -> Result<Option<String>>;

    /// Write `value` at `key`. Durable once this returns `Ok`.
    fn set(&self, key: &str, value: &str) -> Result<()>;

    /// Subscribe to writes made by other contexts, on any key.
    fn subscribe(&self) -> ChangeFeed;

    /// Subscribe to writes made by other contexts on a single key.
    fn watch(&self, key: &str) -> ChangeFeed {
        self.subscribe().for_key(key)
    }

    /// Look for changes the medium cannot push by itself and publish them on
    /// the change feeds. No-op for media that announce every write.
    fn refresh(&self) -> Result<()> {
        Ok(())
    }
}

/// Shared handle injected into repositories (cheap to clone).
pub type SharedStore = Arc<dyn KeyValueStore>;

// ─── Change feed ─────────────────────────────────────────────────────────────

/// A write announced on a medium's change channel.
#[derive(Debug, Clone)]
pub struct StoreChange {
    pub key: String,
    pub origin: ContextId,
}

/// Signal delivered to a subscriber. `key` is `None` when signals were lost
/// and the subscriber should assume anything changed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExternalChange {
    pub key: Option<String>,
}

/// Receiving end of a medium's change channel, bound to one context.
///
/// Changes whose origin is the owning context are skipped, so a view never
/// wakes itself up by writing.
pub struct ChangeFeed {
    rx: broadcast::Receiver<StoreChange>,
    context: ContextId,
    key: Option<String>,
}

impl ChangeFeed {
    pub fn new(rx: broadcast::Receiver<StoreChange>, context: ContextId) -> Self {
        Self {
            rx,
            context,
            key: None,
        }
    }

    /// Narrow the feed to a single key.
    pub fn for_key(mut self, key: &str) -> Self {
        self.key = Some(key.to_string());
        self
    }

    fn accepts(&self, change: &StoreChange) -> bool {
        change.origin != self.context && self.key.as_ref().is_none_or(|k| *k == change.key)
    }

    /// Wait for the next external change. Returns `None` once the medium is
    /// gone and no more signals can arrive.
    pub async fn changed(&mut self) -> Option<ExternalChange> {
        loop {
            match self.rx.recv().await {
                Ok(change) if self.accepts(&change) => {
                    return Some(ExternalChange {
                        key: Some(change.key),
                    });
                }
                Ok(_) => continue,
                Err(RecvError::Lagged(skipped)) => {
                    debug!(skipped, "change feed lagged");
                    return Some(ExternalChange { key: None });
                }
                Err(RecvError::Closed) => return None,
            }
        }
    }

    /// Non-blocking variant of [`ChangeFeed::changed`] for pollers.
    pub fn try_changed(&mut self) -> Option<ExternalChange> {
        loop {
            match self.rx.try_recv() {
                Ok(change) if self.accepts(&change) => {
                    return Some(ExternalChange {
                        key: Some(change.key),
                    });
                }
                Ok(_) => continue,
                Err(TryRecvError::Lagged(skipped)) => {
                    debug!(skipped, "change feed lagged");
                    return Some(ExternalChange { key: None });
                }
                Err(TryRecvError::Empty | TryRecvError::Closed) => return None,
            }
        }
    }

    /// Consume every pending signal. Returns `true` if at least one of them
    /// was an external change, i.e. the subscriber should re-read once.
    pub fn drain(&mut self) -> bool {
        let mut any = false;
        while self.try_changed().is_some() {
            any = true;
        }
        any
    }
}

pub(crate) fn announce(tx: &broadcast::Sender<StoreChange>, key: &str, origin: ContextId) {
    // No receivers is fine: nobody is watching.
    let _ = tx.send(StoreChange {
        key: key.to_string(),
        origin,
    });
}

pub mod error {
    use thiserror::Error;

    #[derive(Debug, Error)]
    pub enum StorageError {
        #[error("storage unavailable: {0}")]
        Unavailable(String),
        #[error("invalid storage key '{0}'")]
        InvalidKey(String),
        #[error("quota exceeded writing '{key}': {needed} bytes needed, limit {limit}")]
        QuotaExceeded {
            key: String,
            needed: usize,
            limit: usize,
        },
        #[error("io error on '{key}': {source}")]
        Io {
            key: String,
            #[source]
            source: std::io::Error,
        },
    }

    pub type Result<T> = std::result::Result<T, StorageError>;
}
