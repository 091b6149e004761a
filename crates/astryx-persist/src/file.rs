//! File-backed medium: one file per key under `{state_path}/state/`.

use crate::error::{Result, StorageError};
use crate::{
    CHANGE_CHANNEL_CAPACITY, ChangeFeed, ContextId, EXTERNAL_ORIGIN, KeyValueStore, StoreChange,
    announce,
};
use parking_lot::Mutex;
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::sync::broadcast;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// A durable store keeping each key in `{state_path}/state/{key}.json`.
///
/// Other processes may write the same files. The store remembers a SHA-256
/// digest of the content it last wrote or read per key; [`FileStore::refresh`]
/// compares those against disk and announces the keys that moved.
pub struct FileStore {
    dir: PathBuf,
    context: ContextId,
    /// Last known digest per watched key. `None` means the key was absent.
    seen: Mutex<HashMap<String, Option<String>>>,
    changes: broadcast::Sender<StoreChange>,
}

impl FileStore {
    /// Create a store rooted at `state_path`. Nothing touches disk until the
    /// first write.
    pub fn new(state_path: &Path) -> Self {
        let (changes, _) = broadcast::channel(CHANGE_CHANNEL_CAPACITY);
        Self {
            dir: state_path.join("state"),
            context: Uuid::new_v4(),
            seen: Mutex::new(HashMap::new()),
            changes,
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &str) -> Result<PathBuf> {
        let valid = !key.is_empty()
            && key
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-'))
            && !key.starts_with('.');
        if !valid {
            return Err(StorageError::InvalidKey(key.to_string()));
        }
        Ok(self.dir.join(format!("{key}.json")))
    }

    fn read_raw(&self, key: &str) -> Result<Option<String>> {
        let path = self.path_for(key)?;
        match std::fs::read_to_string(&path) {
            Ok(content) => Ok(Some(content)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(source) => Err(StorageError::Io {
                key: key.to_string(),
                source,
            }),
        }
    }

    fn remember(&self, key: &str, content: Option<&str>) {
        self.seen
            .lock()
            .insert(key.to_string(), content.map(digest));
    }
}

fn digest(content: &str) -> String {
    hex::encode(Sha256::digest(content.as_bytes()))
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let content = self.read_raw(key)?;
        if content.is_none() {
            debug!(key, dir = %self.dir.display(), "no record on disk");
        }
        self.remember(key, content.as_deref());
        Ok(content)
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        let path = self.path_for(key)?;
        let io_err = |source: std::io::Error| StorageError::Io {
            key: key.to_string(),
            source,
        };

        std::fs::create_dir_all(&self.dir).map_err(io_err)?;
        // One temp file per write; concurrent writers never share it.
        let tmp = self.dir.join(format!(".{key}.{}.tmp", Uuid::new_v4().simple()));
        std::fs::write(&tmp, value).map_err(io_err)?;
        if let Err(source) = std::fs::rename(&tmp, &path) {
            let _ = std::fs::remove_file(&tmp);
            return Err(io_err(source));
        }

        self.remember(key, Some(value));
        debug!(key, bytes = value.len(), path = %path.display(), "file store write");
        announce(&self.changes, key, self.context);
        Ok(())
    }

    fn subscribe(&self) -> ChangeFeed {
        ChangeFeed::new(self.changes.subscribe(), self.context)
    }

    fn watch(&self, key: &str) -> ChangeFeed {
        let known = self.seen.lock().contains_key(key);
        if !known {
            match self.read_raw(key) {
                Ok(content) => self.remember(key, content.as_deref()),
                Err(e) => warn!(key, error = %e, "cannot baseline watched key"),
            }
        }
        self.subscribe().for_key(key)
    }

    /// Checks every watched key; an unreadable key is logged and skipped, and
    /// the first such failure is returned once all keys were checked.
    fn refresh(&self) -> Result<()> {
        let keys: Vec<String> = self.seen.lock().keys().cloned().collect();
        let mut first_err = None;
        for key in keys {
            let current = match self.read_raw(&key) {
                Ok(content) => content.as_deref().map(digest),
                Err(e) => {
                    warn!(key = %key, error = %e, "cannot re-read watched key");
                    if first_err.is_none() {
                        first_err = Some(e);
                    }
                    continue;
                }
            };
            let moved = {
                let mut seen = self.seen.lock();
                let previous = seen.insert(key.clone(), current.clone());
                previous.flatten() != current
            };
            if moved {
                info!(key = %key, "record changed outside this process");
                announce(&self.changes, &key, EXTERNAL_ORIGIN);
            }
        }
        match first_err {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_store_roundtrip() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = FileStore::new(dir.path());

        store.set("astryxSales", "[]").expect("set");
        assert_eq!(store.get("astryxSales").expect("get").as_deref(), Some("[]"));
        assert!(dir.path().join("state").join("astryxSales.json").exists());
    }

    #[test]
    fn test_file_store_absent_key() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = FileStore::new(dir.path());
        assert_eq!(store.get("nothing").expect("get"), None);
    }

    #[test]
    fn test_file_store_creates_directories() {
        let dir = tempfile::tempdir().expect("tempdir");
        let deep = dir.path().join("a").join("b");
        let store = FileStore::new(&deep);

        store.set("k", "v").expect("set with nested dirs");
        assert_eq!(store.get("k").expect("get").as_deref(), Some("v"));
    }

    #[test]
    fn test_file_store_rejects_bad_keys() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = FileStore::new(dir.path());

        for key in ["", "../escape", "a/b", ".hidden"] {
            assert!(
                matches!(store.set(key, "v"), Err(StorageError::InvalidKey(_))),
                "key {key:?} should be rejected"
            );
        }
    }

    #[test]
    fn test_persists_across_handles() {
        let dir = tempfile::tempdir().expect("tempdir");
        {
            let store = FileStore::new(dir.path());
            store.set("k", "first").expect("set");
        }
        let store = FileStore::new(dir.path());
        assert_eq!(store.get("k").expect("get").as_deref(), Some("first"));
    }

    #[test]
    fn test_refresh_detects_foreign_write() {
        let dir = tempfile::tempdir().expect("tempdir");
        let mine = FileStore::new(dir.path());
        let theirs = FileStore::new(dir.path());

        let mut feed = mine.watch("k");
        mine.refresh().expect("refresh");
        assert!(feed.try_changed().is_none());

        theirs.set("k", "from elsewhere").expect("set");
        mine.refresh().expect("refresh");

        let change = feed.try_changed().expect("foreign write detected");
        assert_eq!(change.key.as_deref(), Some("k"));

        // Already reported; a second refresh stays quiet.
        mine.refresh().expect("refresh");
        assert!(feed.try_changed().is_none());
    }

    #[test]
    fn test_concurrent_writers_never_tear_records() {
        let dir = tempfile::tempdir().expect("tempdir");
        let payloads: Vec<String> = (0..4)
            .map(|w| format!("[{}]", vec![w.to_string(); 2000].join(",")))
            .collect();

        std::thread::scope(|scope| {
            for payload in &payloads {
                let path = dir.path();
                scope.spawn(move || {
                    let store = FileStore::new(path);
                    for _ in 0..25 {
                        store.set("astryxSales", payload).expect("concurrent set");
                    }
                });
            }
        });

        let reader = FileStore::new(dir.path());
        let stored = reader.get("astryxSales").expect("get").expect("present");
        assert!(payloads.contains(&stored), "record must be one whole write");

        let leftovers: Vec<_> = std::fs::read_dir(reader.dir())
            .expect("read dir")
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.file_name().to_string_lossy().ends_with(".tmp"))
            .collect();
        assert!(leftovers.is_empty(), "temp files left behind: {leftovers:?}");
    }

    #[test]
    fn test_refresh_continues_past_unreadable_key() {
        let dir = tempfile::tempdir().expect("tempdir");
        let mine = FileStore::new(dir.path());
        let theirs = FileStore::new(dir.path());

        mine.set("a", "1").expect("set");
        let mut feed_b = mine.watch("b");

        // Replace a's record with something that cannot be read as a file.
        let a_path = mine.dir().join("a.json");
        std::fs::remove_file(&a_path).expect("remove");
        std::fs::create_dir(&a_path).expect("mkdir");

        theirs.set("b", "changed").expect("set");

        assert!(matches!(mine.refresh(), Err(StorageError::Io { .. })));
        let change = feed_b.try_changed().expect("b still checked");
        assert_eq!(change.key.as_deref(), Some("b"));
    }

    #[test]
    fn test_refresh_ignores_own_writes() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = FileStore::new(dir.path());
        let mut feed = store.subscribe();

        store.set("k", "v").expect("set");
        store.refresh().expect("refresh");
        assert!(feed.try_changed().is_none());
    }
}
