use kfc_core::{Error, Result};
use std::collections::HashMap;
use std::sync::RwLock;
use tokio::sync::broadcast;

use crate::{LocalStorage, StorageEvent};

const EVENT_CAPACITY: usize = 64;

#[derive(Debug)]
pub struct MemoryStorage {
    items: RwLock<HashMap<String, String>>,
    events: broadcast::Sender<StorageEvent>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            items: RwLock::new(HashMap::new()),
            events,
        }
    }

    fn notify(&self, key: &str, new_value: Option<&str>) {
        // No subscribers is fine.
        let _ = self.events.send(StorageEvent {
            key: key.to_string(),
            new_value: new_value.map(str::to_string),
        });
    }
}

impl Default for MemoryStorage {
    fn default() -> Self {
        Self::new()
    }
}

fn poisoned<T>(_: T) -> Error {
    Error::Storage("Memory storage lock poisoned".to_string())
}

impl LocalStorage for MemoryStorage {
    fn get_item(&self, key: &str) -> Result<Option<String>> {
        let items = self.items.read().map_err(poisoned)?;
        Ok(items.get(key).cloned())
    }

    fn set_item(&self, key: &str, value: &str) -> Result<()> {
        {
            let mut items = self.items.write().map_err(poisoned)?;
            items.insert(key.to_string(), value.to_string());
        }
        self.notify(key, Some(value));
        Ok(())
    }

    fn remove_item(&self, key: &str) -> Result<()> {
        let removed = {
            let mut items = self.items.write().map_err(poisoned)?;
            items.remove(key).is_some()
        };
        if removed {
            self.notify(key, None);
        }
        Ok(())
    }

    fn keys(&self) -> Result<Vec<String>> {
        let items = self.items.read().map_err(poisoned)?;
        let mut keys: Vec<String> = items.keys().cloned().collect();
        keys.sort();
        Ok(keys)
    }

    fn subscribe(&self) -> broadcast::Receiver<StorageEvent> {
        self.events.subscribe()
    }
}
