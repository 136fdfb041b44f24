use kfc_core::{ContentPreferences, ResourceBackend, Result, Settings, SettingsPatch};
use kfc_storage::{keys, LocalStorage};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{debug, warn};

use crate::container::{Container, Persist};

#[derive(Debug, Clone, Default)]
pub struct SettingsState {
    pub settings: Settings,
    pub is_loading_settings: bool,
    pub is_updating_settings: bool,
    pub settings_error: Option<String>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PersistedSettings {
    settings: Settings,
}

impl Persist for SettingsState {
    type Persisted = PersistedSettings;

    fn persisted(&self) -> PersistedSettings {
        PersistedSettings {
            settings: self.settings.clone(),
        }
    }

    fn restore(&mut self, persisted: PersistedSettings) {
        self.settings = persisted.settings;
    }
}

/// User preferences, mirrored to the backend on every change.
#[derive(Debug)]
pub struct SettingsStore {
    state: Container<SettingsState>,
    backend: Arc<dyn ResourceBackend>,
}

impl SettingsStore {
    pub fn new(backend: Arc<dyn ResourceBackend>, storage: Arc<dyn LocalStorage>) -> Self {
        Self {
            state: Container::new(keys::SETTINGS_STORE, storage, SettingsState::default()),
            backend,
        }
    }

    pub fn hydrate(&self) -> Result<bool> {
        self.state.hydrate()
    }

    pub fn snapshot(&self) -> SettingsState {
        self.state.snapshot()
    }

    pub fn subscribe(&self) -> watch::Receiver<SettingsState> {
        self.state.subscribe()
    }

    pub fn settings(&self) -> Settings {
        self.state.read(|s| s.settings.clone())
    }

    pub fn email_notifications_effective(&self) -> bool {
        self.state.read(|s| s.settings.email_notifications_effective())
    }

    pub async fn load_settings(&self) {
        self.state.update(|s| {
            s.is_loading_settings = true;
            s.settings_error = None;
        });

        match self.backend.get_settings().await {
            Ok(settings) => self.state.update(|s| s.settings = settings),
            Err(e) => {
                warn!("❌ Failed to load settings: {}", e);
                self.state
                    .update(|s| s.settings_error = Some(e.user_message("Failed to load settings")));
            }
        }

        self.state.update(|s| s.is_loading_settings = false);
    }

    /// Rejected patches never reach the backend.
    pub async fn update_settings(&self, patch: SettingsPatch) {
        if let Err(e) = patch.validate() {
            debug!("⚙️ Rejected settings patch: {}", e);
            self.state.update(|s| s.settings_error = Some(e.to_string()));
            return;
        }

        self.state.update(|s| {
            s.is_updating_settings = true;
            s.settings_error = None;
        });

        match self.backend.update_settings(&patch).await {
            Ok(settings) => self.state.update(|s| s.settings = settings),
            Err(e) => {
                warn!("❌ Failed to update settings: {}", e);
                self.state.update(|s| {
                    s.settings_error = Some(e.user_message("Failed to update settings"))
                });
            }
        }

        self.state.update(|s| s.is_updating_settings = false);
    }

    pub async fn reset_settings(&self) {
        self.state.update(|s| {
            s.is_updating_settings = true;
            s.settings_error = None;
        });

        let defaults = Settings::default();
        match self.backend.update_settings(&SettingsPatch::from(&defaults)).await {
            Ok(_) => self.state.update(|s| s.settings = defaults),
            Err(e) => {
                warn!("❌ Failed to reset settings: {}", e);
                self.state.update(|s| {
                    s.settings_error = Some(e.user_message("Failed to reset settings"))
                });
            }
        }

        self.state.update(|s| s.is_updating_settings = false);
    }

    pub async fn include_topic(&self, topic: &str) {
        self.edit_topics(|prefs| prefs.include(topic)).await;
    }

    pub async fn exclude_topic(&self, topic: &str) {
        self.edit_topics(|prefs| prefs.exclude(topic)).await;
    }

    pub async fn remove_included_topic(&self, topic: &str) {
        self.edit_topics(|prefs| {
            let before = prefs.topics.len();
            prefs.remove_included(topic);
            prefs.topics.len() != before
        })
        .await;
    }

    pub async fn remove_excluded_topic(&self, topic: &str) {
        self.edit_topics(|prefs| {
            let before = prefs.excluded_topics.len();
            prefs.remove_excluded(topic);
            prefs.excluded_topics.len() != before
        })
        .await;
    }

    async fn edit_topics(&self, edit: impl FnOnce(&mut ContentPreferences) -> bool) {
        let mut prefs = self
            .state
            .read(|s| s.settings.content_preferences.clone().unwrap_or_default());
        if !edit(&mut prefs) {
            return;
        }
        self.update_settings(SettingsPatch {
            content_preferences: Some(prefs),
            ..Default::default()
        })
        .await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kfc_api::{MockApiHandler, MockBackend, MockLatency};
    use kfc_core::ThemeMode;
    use kfc_storage::MemoryStorage;

    fn store() -> (SettingsStore, Arc<dyn LocalStorage>) {
        let storage: Arc<dyn LocalStorage> = Arc::new(MemoryStorage::new());
        let handler = MockApiHandler::new(storage.clone()).with_latency(MockLatency::none());
        let backend = Arc::new(MockBackend::new(Arc::new(handler)));
        (SettingsStore::new(backend, storage.clone()), storage)
    }

    #[tokio::test]
    async fn test_invalid_page_size_is_rejected_locally() {
        let (store, storage) = store();
        store
            .update_settings(SettingsPatch {
                articles_per_page: Some(7),
                ..Default::default()
            })
            .await;
        let state = store.snapshot();
        assert!(state.settings_error.unwrap().contains("steps of 5"));
        assert_eq!(state.settings.articles_per_page, 20);
        assert!(storage.get_item(keys::MOCK_SETTINGS).unwrap().is_none());
    }

    #[tokio::test]
    async fn test_update_applies_server_settings() {
        let (store, _) = store();
        store
            .update_settings(SettingsPatch {
                theme: Some(ThemeMode::Light),
                articles_per_page: Some(30),
                ..Default::default()
            })
            .await;
        let state = store.snapshot();
        assert_eq!(state.settings_error, None);
        assert_eq!(state.settings.theme, ThemeMode::Light);
        assert_eq!(state.settings.articles_per_page, 30);
        assert!(!state.is_updating_settings);

        store.reset_settings().await;
        assert_eq!(store.settings(), Settings::default());
    }

    #[tokio::test]
    async fn test_topics_stay_mutually_exclusive() {
        let (store, _) = store();
        store.include_topic("深度学习").await;
        store.exclude_topic("量子计算").await;
        store.exclude_topic("深度学习").await;

        let prefs = store.settings().content_preferences.unwrap();
        assert!(prefs.topics.is_empty());
        assert_eq!(prefs.excluded_topics, vec!["量子计算", "深度学习"]);

        store.remove_excluded_topic("量子计算").await;
        let prefs = store.settings().content_preferences.unwrap();
        assert_eq!(prefs.excluded_topics, vec!["深度学习"]);
    }

    #[test]
    fn test_email_needs_notifications() {
        let (store, _) = store();
        store.state.update(|s| {
            s.settings.email_notifications = true;
            s.settings.notifications_enabled = false;
        });
        assert!(!store.email_notifications_effective());
    }
}
