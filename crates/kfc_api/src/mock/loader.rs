use kfc_core::{Article, Error, ImageResolver, Result};
use kfc_storage::{keys, LocalStorage, LocalStorageExt, StorageEvent};
use serde_json::{Map, Value};
use std::sync::{Arc, RwLock};
use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::{MockFixtures, SharedFixtures};

/// Applies fixture overrides saved in storage on top of the bundled data.
#[derive(Debug)]
pub struct MockDataLoader {
    storage: Arc<dyn LocalStorage>,
    fixtures: SharedFixtures,
    default_image_prefix: Option<String>,
}

impl MockDataLoader {
    pub fn new(storage: Arc<dyn LocalStorage>, default_image_prefix: Option<String>) -> Self {
        Self {
            storage,
            fixtures: Arc::new(RwLock::new(MockFixtures::default())),
            default_image_prefix,
        }
    }

    pub fn fixtures(&self) -> SharedFixtures {
        self.fixtures.clone()
    }

    /// Rebuilds the fixtures from defaults plus whatever overrides are
    /// stored. Unreadable overrides are ignored with a warning.
    pub fn load(&self) -> Result<()> {
        let mut fresh = MockFixtures::default();

        match self.storage.get_json::<Vec<Article>>(keys::MOCK_ARTICLES) {
            Ok(Some(articles)) => {
                info!("📚 Using {} custom mock articles", articles.len());
                fresh.replace_articles(articles);
            }
            Ok(None) => {}
            Err(e) => warn!("⚠️ Ignoring unreadable {}: {}", keys::MOCK_ARTICLES, e),
        }

        match self.storage.get_json::<Map<String, Value>>(keys::MOCK_RAG_RESPONSES) {
            Ok(Some(answers)) => {
                info!("💬 Using {} custom mock RAG answers", answers.len());
                fresh.replace_preset_answers(&answers);
            }
            Ok(None) => {}
            Err(e) => warn!("⚠️ Ignoring unreadable {}: {}", keys::MOCK_RAG_RESPONSES, e),
        }

        let mut guard = self
            .fixtures
            .write()
            .map_err(|_| Error::Storage("Mock fixtures lock poisoned".to_string()))?;
        *guard = fresh;
        Ok(())
    }

    /// Image resolver honouring a stored `mock_public_image_path` override.
    pub fn image_resolver(&self) -> ImageResolver {
        let stored = self
            .storage
            .get_item(keys::MOCK_PUBLIC_IMAGE_PATH)
            .ok()
            .flatten()
            .filter(|p| !p.trim().is_empty());
        match stored {
            Some(prefix) => ImageResolver::with_public_prefix(Some(&prefix)),
            None => ImageResolver::with_public_prefix(self.default_image_prefix.as_deref()),
        }
    }

    /// Reloads the fixtures whenever another writer touches one of the
    /// override keys.
    pub fn watch(self: &Arc<Self>) -> JoinHandle<()> {
        let mut events = self.storage.subscribe();
        let loader = Arc::clone(self);
        tokio::spawn(async move {
            loop {
                match events.recv().await {
                    Ok(StorageEvent { key, .. }) if keys::MOCK_FIXTURE_KEYS.contains(&key.as_str()) => {
                        debug!("🔄 {} changed, reloading mock fixtures", key);
                        if let Err(e) = loader.load() {
                            warn!("⚠️ Failed to reload mock fixtures: {}", e);
                        }
                    }
                    Ok(_) => {}
                    Err(RecvError::Lagged(skipped)) => {
                        warn!("⚠️ Missed {} storage events, reloading mock fixtures", skipped);
                        if let Err(e) = loader.load() {
                            warn!("⚠️ Failed to reload mock fixtures: {}", e);
                        }
                    }
                    Err(RecvError::Closed) => break,
                }
            }
        })
    }
}

/// Validates and saves fixture overrides.
#[derive(Debug, Clone)]
pub struct MockDataEditor {
    storage: Arc<dyn LocalStorage>,
}

impl MockDataEditor {
    pub fn new(storage: Arc<dyn LocalStorage>) -> Self {
        Self { storage }
    }

    /// Current article override, or the bundled articles, as pretty JSON.
    pub fn articles_json(&self) -> Result<String> {
        let articles = match self.storage.get_json::<Vec<Article>>(keys::MOCK_ARTICLES) {
            Ok(Some(articles)) => articles,
            _ => MockFixtures::default().articles,
        };
        Ok(serde_json::to_string_pretty(&articles)?)
    }

    pub fn rag_responses_json(&self) -> Result<String> {
        let answers = match self.storage.get_json::<Value>(keys::MOCK_RAG_RESPONSES) {
            Ok(Some(answers)) => answers,
            _ => MockFixtures::default().preset_answers_json(),
        };
        Ok(serde_json::to_string_pretty(&answers)?)
    }

    /// Saves an article list. Nothing is written unless `raw` parses.
    pub fn save_articles(&self, raw: &str) -> Result<usize> {
        let articles: Vec<Article> = serde_json::from_str(raw)
            .map_err(|e| Error::Validation(format!("Article JSON is malformed: {}", e)))?;
        self.storage.set_json(keys::MOCK_ARTICLES, &articles)?;
        Ok(articles.len())
    }

    /// Saves keyword → answer pairs. Every value must be a string.
    pub fn save_rag_responses(&self, raw: &str) -> Result<usize> {
        let answers: Map<String, Value> = serde_json::from_str(raw)
            .map_err(|e| Error::Validation(format!("RAG response JSON is malformed: {}", e)))?;
        if let Some((keyword, _)) = answers.iter().find(|(_, v)| !v.is_string()) {
            return Err(Error::Validation(format!(
                "Answer for \"{}\" must be a string",
                keyword
            )));
        }
        self.storage.set_json(keys::MOCK_RAG_RESPONSES, &answers)?;
        Ok(answers.len())
    }

    /// Blank clears the override.
    pub fn save_image_path(&self, prefix: &str) -> Result<()> {
        if prefix.trim().is_empty() {
            self.storage.remove_item(keys::MOCK_PUBLIC_IMAGE_PATH)
        } else {
            self.storage.set_item(keys::MOCK_PUBLIC_IMAGE_PATH, prefix.trim())
        }
    }

    pub fn reset(&self) -> Result<()> {
        for key in keys::MOCK_FIXTURE_KEYS {
            self.storage.remove_item(key)?;
        }
        info!("🧹 Mock fixtures reset to defaults");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kfc_storage::MemoryStorage;
    use std::time::Duration;

    fn storage() -> Arc<dyn LocalStorage> {
        Arc::new(MemoryStorage::new())
    }

    #[test]
    fn test_overrides_replace_fixtures() {
        let storage = storage();
        let editor = MockDataEditor::new(storage.clone());
        editor
            .save_articles(r#"[{"id": "a1", "title": "Only", "views": 3}]"#)
            .unwrap();
        editor.save_rag_responses(r#"{"hello": "world"}"#).unwrap();

        let loader = MockDataLoader::new(storage, None);
        loader.load().unwrap();
        let fixtures = loader.fixtures();
        let fixtures = fixtures.read().unwrap();
        assert_eq!(fixtures.articles.len(), 1);
        assert_eq!(fixtures.trending.week[0].id, "a1");
        assert_eq!(fixtures.generate_answer("say hello"), "world");
    }

    #[test]
    fn test_malformed_json_leaves_storage_untouched() {
        let storage = storage();
        let editor = MockDataEditor::new(storage.clone());
        let err = editor.save_articles("[{").unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
        assert!(editor.save_rag_responses(r#"{"k": 1}"#).is_err());
        assert_eq!(storage.get_item(keys::MOCK_ARTICLES).unwrap(), None);
        assert_eq!(storage.get_item(keys::MOCK_RAG_RESPONSES).unwrap(), None);
    }

    #[test]
    fn test_reset_restores_defaults() {
        let storage = storage();
        let editor = MockDataEditor::new(storage.clone());
        editor.save_articles("[]").unwrap();
        editor.reset().unwrap();
        assert!(editor.articles_json().unwrap().contains("量子计算的实际应用与挑战"));
    }

    #[test]
    fn test_image_prefix_override() {
        let storage = storage();
        let loader = MockDataLoader::new(storage.clone(), Some("http://localhost:3000/".to_string()));
        assert_eq!(loader.image_resolver().public_prefix(), Some("http://localhost:3000/"));

        MockDataEditor::new(storage).save_image_path("https://cdn.test/img").unwrap();
        assert_eq!(loader.image_resolver().public_prefix(), Some("https://cdn.test/img/"));
    }

    #[tokio::test]
    async fn test_watch_reloads_on_external_change() {
        let storage = storage();
        let loader = Arc::new(MockDataLoader::new(storage.clone(), None));
        loader.load().unwrap();
        let handle = loader.watch();

        storage
            .set_item(keys::MOCK_ARTICLES, r#"[{"id": "x", "title": "X"}]"#)
            .unwrap();

        let fixtures = loader.fixtures();
        let reloaded = tokio::time::timeout(Duration::from_secs(2), async {
            loop {
                if fixtures.read().unwrap().articles.len() == 1 {
                    break;
                }
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        })
        .await;
        assert!(reloaded.is_ok());
        handle.abort();
    }
}
