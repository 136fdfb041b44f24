use kfc_core::{Error, Result};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::RwLock;
use tokio::sync::broadcast;
use tracing::{debug, warn};

use crate::{LocalStorage, StorageEvent};

pub const DEFAULT_FILE_NAME: &str = "local-storage.json";

const EVENT_CAPACITY: usize = 64;

/// All keys live in one JSON object on disk, rewritten on every change.
#[derive(Debug)]
pub struct FileStorage {
    path: PathBuf,
    items: RwLock<BTreeMap<String, String>>,
    events: broadcast::Sender<StorageEvent>,
}

impl FileStorage {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let items = read_items(&path)?;
        debug!("💾 Opened file storage at {} ({} keys)", path.display(), items.len());
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Ok(Self {
            path,
            items: RwLock::new(items),
            events,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Re-reads the file and emits an event for every key another writer
    /// changed since the last read or write.
    pub fn reload(&self) -> Result<Vec<String>> {
        let fresh = read_items(&self.path)?;
        let mut changed = Vec::new();
        {
            let mut items = self.items.write().map_err(poisoned)?;
            for (key, value) in &fresh {
                if items.get(key) != Some(value) {
                    changed.push((key.clone(), Some(value.clone())));
                }
            }
            for key in items.keys() {
                if !fresh.contains_key(key) {
                    changed.push((key.clone(), None));
                }
            }
            *items = fresh;
        }
        for (key, new_value) in &changed {
            let _ = self.events.send(StorageEvent {
                key: key.clone(),
                new_value: new_value.clone(),
            });
        }
        Ok(changed.into_iter().map(|(key, _)| key).collect())
    }

    fn flush(&self, items: &BTreeMap<String, String>) -> Result<()> {
        let raw = serde_json::to_string_pretty(items)?;
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, raw)?;
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}

fn read_items(path: &Path) -> Result<BTreeMap<String, String>> {
    if !path.exists() {
        return Ok(BTreeMap::new());
    }
    let raw = fs::read_to_string(path)?;
    if raw.trim().is_empty() {
        return Ok(BTreeMap::new());
    }
    match serde_json::from_str(&raw) {
        Ok(items) => Ok(items),
        Err(e) => {
            warn!("⚠️ Ignoring unreadable storage file {}: {}", path.display(), e);
            Ok(BTreeMap::new())
        }
    }
}

fn poisoned<T>(_: T) -> Error {
    Error::Storage("File storage lock poisoned".to_string())
}

impl LocalStorage for FileStorage {
    fn get_item(&self, key: &str) -> Result<Option<String>> {
        let items = self.items.read().map_err(poisoned)?;
        Ok(items.get(key).cloned())
    }

    fn set_item(&self, key: &str, value: &str) -> Result<()> {
        {
            let mut items = self.items.write().map_err(poisoned)?;
            items.insert(key.to_string(), value.to_string());
            self.flush(&items)?;
        }
        let _ = self.events.send(StorageEvent {
            key: key.to_string(),
            new_value: Some(value.to_string()),
        });
        Ok(())
    }

    fn remove_item(&self, key: &str) -> Result<()> {
        let removed = {
            let mut items = self.items.write().map_err(poisoned)?;
            let removed = items.remove(key).is_some();
            if removed {
                self.flush(&items)?;
            }
            removed
        };
        if removed {
            let _ = self.events.send(StorageEvent {
                key: key.to_string(),
                new_value: None,
            });
        }
        Ok(())
    }

    fn keys(&self) -> Result<Vec<String>> {
        let items = self.items.read().map_err(poisoned)?;
        Ok(items.keys().cloned().collect())
    }

    fn subscribe(&self) -> broadcast::Receiver<StorageEvent> {
        self.events.subscribe()
    }
}
