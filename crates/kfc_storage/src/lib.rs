use kfc_core::{Error, Result};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::broadcast;

pub mod backends;
pub mod keys;

pub use backends::*;

/// Emitted after every write or removal. `new_value` is `None` on removal.
#[derive(Debug, Clone, PartialEq)]
pub struct StorageEvent {
    pub key: String,
    pub new_value: Option<String>,
}

/// String key/value persistence with synchronous, last-write-wins writes.
pub trait LocalStorage: Send + Sync + fmt::Debug {
    fn get_item(&self, key: &str) -> Result<Option<String>>;

    fn set_item(&self, key: &str, value: &str) -> Result<()>;

    fn remove_item(&self, key: &str) -> Result<()>;

    fn keys(&self) -> Result<Vec<String>>;

    fn subscribe(&self) -> broadcast::Receiver<StorageEvent>;
}

/// Typed helpers over [`LocalStorage`].
pub trait LocalStorageExt: LocalStorage {
    fn get_json<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        match self.get_item(key)? {
            Some(raw) => Ok(Some(serde_json::from_str(&raw)?)),
            None => Ok(None),
        }
    }

    fn set_json<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> Result<()> {
        let raw = serde_json::to_string(value)?;
        self.set_item(key, &raw)
    }
}

impl<S: LocalStorage + ?Sized> LocalStorageExt for S {}

#[derive(Debug, Clone, PartialEq)]
pub enum StorageKind {
    Memory,
    File(PathBuf),
}

impl StorageKind {
    /// File storage under `dir`, or the platform data directory.
    pub fn file_in(dir: Option<PathBuf>) -> Result<Self> {
        let dir = match dir {
            Some(dir) => dir,
            None => dirs::data_dir()
                .map(|d| d.join("kfc"))
                .ok_or_else(|| Error::Config("No data directory available".to_string()))?,
        };
        Ok(StorageKind::File(dir.join(backends::file::DEFAULT_FILE_NAME)))
    }
}

pub fn create_storage(kind: &StorageKind) -> Result<Arc<dyn LocalStorage>> {
    match kind {
        StorageKind::Memory => Ok(Arc::new(MemoryStorage::new())),
        StorageKind::File(path) => Ok(Arc::new(FileStorage::open(path)?)),
    }
}

pub mod prelude {
    pub use super::backends::*;
    pub use super::keys;
    pub use super::{LocalStorage, LocalStorageExt, StorageEvent};
}
