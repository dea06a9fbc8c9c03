use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::sync::{RwLock, broadcast};
use tracing::{debug, info};

use crate::types::space::DEFAULT_CHANNEL_CAPACITY;
use crate::types::sync_error::SyncResult;

/// Change notification, the equivalent of a browser `storage` event.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StorageEvent {
    pub key: String,
    pub old_value: Option<String>,
    pub new_value: Option<String>,
}

/// Process-local key-value store shared by every sync hook on the device.
///
/// Clones share the same entries. When opened from a path, every write is
/// flushed to that file as a JSON object so values survive restarts.
#[derive(Clone, Debug)]
pub struct SpaceStore {
    inner: Arc<StoreInner>,
}

#[derive(Debug)]
struct StoreInner {
    entries: RwLock<HashMap<String, String>>,
    path: Option<PathBuf>,
    changes: broadcast::Sender<StorageEvent>,
}

impl SpaceStore {
    pub fn in_memory() -> Self {
        Self::with_entries(HashMap::new(), None)
    }

    /// Open a file-backed store. A missing file is an empty store; the file
    /// is created on first write.
    pub async fn open(path: impl AsRef<Path>) -> SyncResult<Self> {
        let path = path.as_ref().to_path_buf();
        let entries = match tokio::fs::read_to_string(&path).await {
            Ok(contents) if contents.trim().is_empty() => HashMap::new(),
            Ok(contents) => serde_json::from_str(&contents)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("No store file at {}, starting empty", path.display());
                HashMap::new()
            }
            Err(e) => return Err(e.into()),
        };
        info!(
            "Opened space store at {} ({} keys)",
            path.display(),
            entries.len()
        );
        Ok(Self::with_entries(entries, Some(path)))
    }

    fn with_entries(entries: HashMap<String, String>, path: Option<PathBuf>) -> Self {
        let (changes, _) = broadcast::channel(DEFAULT_CHANNEL_CAPACITY);
        Self {
            inner: Arc::new(StoreInner {
                entries: RwLock::new(entries),
                path,
                changes,
            }),
        }
    }

    pub async fn get(&self, key: &str) -> Option<String> {
        self.inner.entries.read().await.get(key).cloned()
    }

    /// Write a value. It is visible to every clone before this returns.
    pub async fn set(&self, key: &str, value: &str) -> SyncResult<()> {
        let old_value = {
            let mut entries = self.inner.entries.write().await;
            let old = entries.insert(key.to_string(), value.to_string());
            self.persist(&entries).await?;
            old
        };
        if old_value.as_deref() != Some(value) {
            self.notify(key, old_value, Some(value.to_string()));
        }
        Ok(())
    }

    pub async fn remove(&self, key: &str) -> SyncResult<Option<String>> {
        let old_value = {
            let mut entries = self.inner.entries.write().await;
            let old = entries.remove(key);
            if old.is_some() {
                self.persist(&entries).await?;
            }
            old
        };
        if old_value.is_some() {
            self.notify(key, old_value.clone(), None);
        }
        Ok(old_value)
    }

    pub fn subscribe(&self) -> broadcast::Receiver<StorageEvent> {
        self.inner.changes.subscribe()
    }

    pub fn path(&self) -> Option<&Path> {
        self.inner.path.as_deref()
    }

    async fn persist(&self, entries: &HashMap<String, String>) -> SyncResult<()> {
        let Some(path) = &self.inner.path else {
            return Ok(());
        };
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }
        let json = serde_json::to_vec_pretty(entries)?;
        tokio::fs::write(path, json).await?;
        Ok(())
    }

    fn notify(&self, key: &str, old_value: Option<String>, new_value: Option<String>) {
        let event = StorageEvent {
            key: key.to_string(),
            old_value,
            new_value,
        };
        // No subscribers is the common case.
        if self.inner.changes.send(event).is_err() {
            debug!("Storage change on {} had no listeners", key);
        }
    }
}

impl Default for SpaceStore {
    fn default() -> Self {
        Self::in_memory()
    }
}
