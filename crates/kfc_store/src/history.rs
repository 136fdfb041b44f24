use kfc_core::Result;
use kfc_storage::{keys, LocalStorage, LocalStorageExt};
use std::sync::Arc;

pub const SEARCH_HISTORY_LIMIT: usize = 5;

/// Recent search queries, most recent first, without duplicates.
#[derive(Debug, Clone)]
pub struct SearchHistory {
    storage: Arc<dyn LocalStorage>,
}

impl SearchHistory {
    pub fn new(storage: Arc<dyn LocalStorage>) -> Self {
        Self { storage }
    }

    pub fn entries(&self) -> Vec<String> {
        self.storage
            .get_json::<Vec<String>>(keys::SEARCH_HISTORY)
            .ok()
            .flatten()
            .unwrap_or_default()
    }

    pub fn record(&self, query: &str) -> Result<Vec<String>> {
        let query = query.trim();
        let mut entries = self.entries();
        if query.is_empty() {
            return Ok(entries);
        }
        entries.retain(|q| q != query);
        entries.insert(0, query.to_string());
        entries.truncate(SEARCH_HISTORY_LIMIT);
        self.storage.set_json(keys::SEARCH_HISTORY, &entries)?;
        Ok(entries)
    }

    pub fn clear(&self) -> Result<()> {
        self.storage.remove_item(keys::SEARCH_HISTORY)
    }
}
