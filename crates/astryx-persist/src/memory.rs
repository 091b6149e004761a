//! In-process medium shared by several contexts.

use crate::error::{Result, StorageError};
use crate::{CHANGE_CHANNEL_CAPACITY, ChangeFeed, ContextId, KeyValueStore, StoreChange, announce};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::broadcast;
use tracing::{debug, warn};
use uuid::Uuid;

struct Medium {
    entries: RwLock<HashMap<String, String>>,
    changes: broadcast::Sender<StoreChange>,
    quota_bytes: Option<usize>,
}

/// One context's handle onto an in-process medium.
///
/// [`MemoryStore::context`] opens another handle onto the same entries; a write
/// through one handle is announced to the feeds of every other handle.
pub struct MemoryStore {
    medium: Arc<Medium>,
    context: ContextId,
    disabled: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::build(None)
    }

    /// A medium that refuses writes once keys plus values exceed `bytes`.
    pub fn with_quota(bytes: usize) -> Self {
        Self::build(Some(bytes))
    }

    fn build(quota_bytes: Option<usize>) -> Self {
        let (changes, _) = broadcast::channel(CHANGE_CHANNEL_CAPACITY);
        Self {
            medium: Arc::new(Medium {
                entries: RwLock::new(HashMap::new()),
                changes,
                quota_bytes,
            }),
            context: Uuid::new_v4(),
            disabled: AtomicBool::new(false),
        }
    }

    /// Open a new context on the same medium.
    pub fn context(&self) -> Self {
        Self {
            medium: Arc::clone(&self.medium),
            context: Uuid::new_v4(),
            disabled: AtomicBool::new(false),
        }
    }

    pub fn context_id(&self) -> ContextId {
        self.context
    }

    /// Make this handle fail every call, as when storage is turned off.
    pub fn set_disabled(&self, disabled: bool) {
        self.disabled.store(disabled, Ordering::SeqCst);
    }

    fn check_enabled(&self) -> Result<()> {
        if self.disabled.load(Ordering::SeqCst) {
            return Err(StorageError::Unavailable("storage disabled".to_string()));
        }
        Ok(())
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        self.check_enabled()?;
        Ok(self.medium.entries.read().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        self.check_enabled()?;
        {
            let mut entries = self.medium.entries.write();
            if let Some(limit) = self.medium.quota_bytes {
                let others: usize = entries
                    .iter()
                    .filter(|(k, _)| k.as_str() != key)
                    .map(|(k, v)| k.len() + v.len())
                    .sum();
                let needed = others + key.len() + value.len();
                if needed > limit {
                    warn!(key, needed, limit, "memory store quota exceeded");
                    return Err(StorageError::QuotaExceeded {
                        key: key.to_string(),
                        needed,
                        limit,
                    });
                }
            }
            entries.insert(key.to_string(), value.to_string());
        }
        debug!(key, bytes = value.len(), context = %self.context, "memory store write");
        announce(&self.medium.changes, key, self.context);
        Ok(())
    }

    fn subscribe(&self) -> ChangeFeed {
        ChangeFeed::new(self.medium.changes.subscribe(), self.context)
    }
}
