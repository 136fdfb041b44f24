//! Observable, persisted state containers over a [`ResourceBackend`].
//!
//! Each store owns one slice of client state, publishes it through a
//! `tokio::sync::watch` channel and keeps a subset of it in
//! [`LocalStorage`] under a fixed key. Actions never fail: backend errors
//! land in the store's `*_error` field.

pub mod article;
pub mod auth;
pub mod container;
pub mod favorite;
pub mod graph;
pub mod history;
pub mod settings;
pub mod sidebar;
pub mod trending;

use kfc_core::ResourceBackend;
use kfc_storage::LocalStorage;
use std::sync::Arc;
use tracing::{info, warn};

pub use article::{ArticleState, ArticleStore};
pub use auth::{AuthState, AuthStore};
pub use container::{Container, Persist};
pub use favorite::{FavoriteState, FavoriteStore, FavoriteViewMode};
pub use graph::build_graph;
pub use history::{SearchHistory, SEARCH_HISTORY_LIMIT};
pub use settings::{SettingsState, SettingsStore};
pub use sidebar::{SidebarState, SidebarStore, SidebarType};
pub use trending::{TrendingState, TrendingStore, TRENDING_LIMIT};

/// Every container, sharing one backend and one storage.
#[derive(Debug)]
pub struct Stores {
    pub articles: ArticleStore,
    pub favorites: FavoriteStore,
    pub trending: TrendingStore,
    pub settings: SettingsStore,
    pub sidebar: SidebarStore,
    pub auth: AuthStore,
}

impl Stores {
    pub fn new(backend: Arc<dyn ResourceBackend>, storage: Arc<dyn LocalStorage>) -> Self {
        Self {
            articles: ArticleStore::new(backend.clone(), storage.clone()),
            favorites: FavoriteStore::new(backend.clone(), storage.clone()),
            trending: TrendingStore::new(backend.clone(), storage.clone()),
            settings: SettingsStore::new(backend.clone(), storage.clone()),
            sidebar: SidebarStore::new(storage.clone()),
            auth: AuthStore::new(backend, storage),
        }
    }

    /// Restores every store from storage. A store whose saved state cannot
    /// be read starts from its defaults.
    pub fn hydrate_all(&self) -> usize {
        let results = [
            ("articles", self.articles.hydrate()),
            ("favorites", self.favorites.hydrate()),
            ("trending", self.trending.hydrate()),
            ("settings", self.settings.hydrate()),
            ("sidebar", self.sidebar.hydrate()),
            ("auth", self.auth.hydrate()),
        ];

        let mut restored = 0;
        for (name, result) in results {
            match result {
                Ok(true) => restored += 1,
                Ok(false) => {}
                Err(e) => warn!("⚠️ Ignoring unreadable {} state: {}", name, e),
            }
        }
        info!("💧 Restored {} of 6 stores", restored);
        restored
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kfc_api::{MockApiHandler, MockBackend};
    use kfc_storage::{keys, MemoryStorage};

    #[test]
    fn test_hydrate_all_skips_corrupt_state() {
        let storage: Arc<dyn LocalStorage> = Arc::new(MemoryStorage::new());
        storage
            .set_item(keys::SIDEBAR_STORE, r#"{"state":{"isExpanded":true,"activeSidebar":"trending"},"version":0}"#)
            .unwrap();
        storage.set_item(keys::SETTINGS_STORE, "not json").unwrap();

        let backend = Arc::new(MockBackend::new(Arc::new(MockApiHandler::new(storage.clone()))));
        let stores = Stores::new(backend, storage);
        assert_eq!(stores.hydrate_all(), 1);
        assert_eq!(stores.sidebar.snapshot().active_sidebar, SidebarType::Trending);
        assert_eq!(stores.settings.settings().articles_per_page, 20);
    }
}
