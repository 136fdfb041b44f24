use kfc_core::Result;
use kfc_storage::{LocalStorage, LocalStorageExt};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{debug, warn};

const STATE_VERSION: u32 = 0;

/// State that keeps part of itself in local storage.
pub trait Persist: Clone + Send + Sync + 'static {
    type Persisted: Serialize + DeserializeOwned;

    /// The subset worth keeping across restarts. Flags and errors stay out.
    fn persisted(&self) -> Self::Persisted;

    fn restore(&mut self, persisted: Self::Persisted);
}

#[derive(Serialize, Deserialize)]
struct Envelope<T> {
    state: T,
    #[serde(default)]
    version: u32,
}

/// Observable state holder shared by every store.
///
/// Every `update` notifies subscribers and rewrites the persisted subset
/// under `key`. Reading that subset back is left to an explicit
/// [`hydrate`](Container::hydrate) call.
#[derive(Debug)]
pub struct Container<S: Persist> {
    key: &'static str,
    storage: Arc<dyn LocalStorage>,
    state: watch::Sender<S>,
}

impl<S: Persist> Container<S> {
    pub fn new(key: &'static str, storage: Arc<dyn LocalStorage>, initial: S) -> Self {
        let (state, _) = watch::channel(initial);
        Self { key, storage, state }
    }

    pub fn key(&self) -> &'static str {
        self.key
    }

    pub fn snapshot(&self) -> S {
        self.state.borrow().clone()
    }

    pub fn read<R>(&self, f: impl FnOnce(&S) -> R) -> R {
        f(&self.state.borrow())
    }

    pub fn subscribe(&self) -> watch::Receiver<S> {
        self.state.subscribe()
    }

    pub fn update(&self, f: impl FnOnce(&mut S)) {
        self.state.send_modify(f);
        self.persist();
    }

    /// Loads the persisted subset, if any. Returns whether something was
    /// restored.
    pub fn hydrate(&self) -> Result<bool> {
        match self.storage.get_json::<Envelope<S::Persisted>>(self.key)? {
            Some(envelope) => {
                self.state.send_modify(|s| s.restore(envelope.state));
                debug!("💧 Hydrated {}", self.key);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    fn persist(&self) {
        let envelope = Envelope {
            state: self.read(|s| s.persisted()),
            version: STATE_VERSION,
        };
        if let Err(e) = self.storage.set_json(self.key, &envelope) {
            warn!("⚠️ Failed to persist {}: {}", self.key, e);
        }
    }
}
