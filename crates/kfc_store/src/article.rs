use kfc_core::config::MAX_PAGE_NUMBER;
use kfc_core::{
    Article, ArticleListParams, ResourceBackend, SearchParams, SearchResult, ShelfArticle,
};
use kfc_storage::{keys, LocalStorage};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{debug, warn};

use crate::container::{Container, Persist};
use crate::history::SearchHistory;

#[derive(Debug, Clone, Default)]
pub struct ArticleState {
    pub articles: Vec<Article>,
    pub current_page: usize,
    pub total_pages: usize,
    pub total_count: usize,
    pub saved_articles: Vec<ShelfArticle>,
    pub selected_article: Option<Article>,
    pub search_query: String,
    pub search_results: Vec<SearchResult>,
    pub is_loading_articles: bool,
    pub is_searching: bool,
    pub is_updating_shelf: bool,
    pub articles_error: Option<String>,
    pub shelf_error: Option<String>,
    pub search_error: Option<String>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PersistedArticles {
    articles: Vec<Article>,
    current_page: usize,
    total_pages: usize,
    saved_articles: Vec<ShelfArticle>,
    selected_article: Option<Article>,
    search_query: String,
}

impl Persist for ArticleState {
    type Persisted = PersistedArticles;

    fn persisted(&self) -> PersistedArticles {
        PersistedArticles {
            articles: self.articles.clone(),
            current_page: self.current_page,
            total_pages: self.total_pages,
            saved_articles: self.saved_articles.clone(),
            selected_article: self.selected_article.clone(),
            search_query: self.search_query.clone(),
        }
    }

    fn restore(&mut self, persisted: PersistedArticles) {
        self.articles = persisted.articles;
        self.current_page = persisted.current_page;
        self.total_pages = persisted.total_pages;
        self.saved_articles = persisted.saved_articles;
        self.selected_article = persisted.selected_article;
        self.search_query = persisted.search_query;
    }
}

/// Article list, the reading shelf and search.
#[derive(Debug)]
pub struct ArticleStore {
    state: Container<ArticleState>,
    backend: Arc<dyn ResourceBackend>,
    history: SearchHistory,
    page_size: Option<usize>,
}

impl ArticleStore {
    pub fn new(backend: Arc<dyn ResourceBackend>, storage: Arc<dyn LocalStorage>) -> Self {
        Self {
            state: Container::new(keys::ARTICLE_STORE, storage.clone(), ArticleState::default()),
            backend,
            history: SearchHistory::new(storage),
            page_size: None,
        }
    }

    /// Page size sent with list requests; the server default otherwise.
    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = Some(page_size);
        self
    }

    pub fn hydrate(&self) -> kfc_core::Result<bool> {
        self.state.hydrate()
    }

    pub fn snapshot(&self) -> ArticleState {
        self.state.snapshot()
    }

    pub fn subscribe(&self) -> watch::Receiver<ArticleState> {
        self.state.subscribe()
    }

    pub async fn load_articles(&self, page: usize) {
        let page = page.clamp(1, MAX_PAGE_NUMBER);
        self.state.update(|s| {
            s.is_loading_articles = true;
            s.articles_error = None;
        });

        let params = ArticleListParams {
            page: Some(page),
            page_size: self.page_size,
            ..Default::default()
        };
        match self.backend.list_articles(&params).await {
            Ok(response) => self.state.update(|s| {
                s.articles = response.articles;
                s.current_page = response.current_page.max(1);
                s.total_pages = response.total_pages;
                s.total_count = response.total_count;
            }),
            Err(e) => {
                warn!("❌ Failed to load articles: {}", e);
                self.state
                    .update(|s| s.articles_error = Some(e.user_message("Failed to load articles")));
            }
        }

        self.state.update(|s| s.is_loading_articles = false);
    }

    /// Reloads the page currently shown.
    pub async fn refresh_articles(&self) {
        let page = self.state.read(|s| s.current_page.max(1));
        self.load_articles(page).await;
    }

    pub fn select_article(&self, article: Option<Article>) {
        self.state.update(|s| s.selected_article = article);
    }

    /// Fetches one article and selects it.
    pub async fn open_article(&self, id: &str) {
        self.state.update(|s| {
            s.is_loading_articles = true;
            s.articles_error = None;
        });

        match self.backend.get_article(id).await {
            Ok(article) => self.state.update(|s| s.selected_article = Some(article)),
            Err(e) => {
                warn!("❌ Failed to load article {}: {}", id, e);
                self.state
                    .update(|s| s.articles_error = Some(e.user_message("Failed to load article")));
            }
        }

        self.state.update(|s| s.is_loading_articles = false);
    }

    pub async fn load_shelf(&self) {
        self.state.update(|s| {
            s.is_updating_shelf = true;
            s.shelf_error = None;
        });

        match self.backend.get_shelf().await {
            Ok(shelf) => self.state.update(|s| s.saved_articles = shelf.articles),
            Err(e) => {
                warn!("❌ Failed to load shelf: {}", e);
                self.state
                    .update(|s| s.shelf_error = Some(e.user_message("Failed to load shelf")));
            }
        }

        self.state.update(|s| s.is_updating_shelf = false);
    }

    /// No-op when the article is already on the shelf.
    pub async fn add_to_shelf(&self, article: &Article) {
        if self.is_article_in_shelf(&article.id) {
            debug!("📚 Article {} already on the shelf", article.id);
            return;
        }

        self.state.update(|s| {
            s.is_updating_shelf = true;
            s.shelf_error = None;
        });

        match self.backend.add_to_shelf(article).await {
            Ok(shelf) => self.state.update(|s| {
                s.saved_articles = shelf.articles;
                if !s.saved_articles.iter().any(|saved| saved.id == article.id) {
                    s.saved_articles.push(ShelfArticle::from(article));
                }
            }),
            Err(e) => {
                warn!("❌ Failed to add {} to shelf: {}", article.id, e);
                self.state
                    .update(|s| s.shelf_error = Some(e.user_message("Failed to add to shelf")));
            }
        }

        self.state.update(|s| s.is_updating_shelf = false);
    }

    pub async fn remove_from_shelf(&self, article_id: &str) {
        self.state.update(|s| {
            s.is_updating_shelf = true;
            s.shelf_error = None;
        });

        match self.backend.remove_from_shelf(article_id).await {
            Ok(()) => self
                .state
                .update(|s| s.saved_articles.retain(|saved| saved.id != article_id)),
            Err(e) => {
                warn!("❌ Failed to remove {} from shelf: {}", article_id, e);
                self.state.update(|s| {
                    s.shelf_error = Some(e.user_message("Failed to remove from shelf"))
                });
            }
        }

        self.state.update(|s| s.is_updating_shelf = false);
    }

    pub fn is_article_in_shelf(&self, article_id: &str) -> bool {
        self.state
            .read(|s| s.saved_articles.iter().any(|saved| saved.id == article_id))
    }

    /// A blank query clears the search instead.
    pub async fn search(&self, query: &str) {
        let query = query.trim().to_string();
        if query.is_empty() {
            self.clear_search();
            return;
        }

        self.state.update(|s| {
            s.is_searching = true;
            s.search_error = None;
            s.search_query = query.clone();
        });
        if let Err(e) = self.history.record(&query) {
            warn!("⚠️ Failed to record search history: {}", e);
        }

        match self.backend.search_articles(&SearchParams::query(query.as_str())).await {
            Ok(response) => self.state.update(|s| s.search_results = response.results),
            Err(e) => {
                warn!("❌ Search for {:?} failed: {}", query, e);
                self.state
                    .update(|s| s.search_error = Some(e.user_message("Search failed")));
            }
        }

        self.state.update(|s| s.is_searching = false);
    }

    pub fn set_search_query(&self, query: &str) {
        self.state.update(|s| s.search_query = query.to_string());
    }

    pub fn clear_search(&self) {
        self.state.update(|s| {
            s.search_query.clear();
            s.search_results.clear();
            s.is_searching = false;
            s.search_error = None;
        });
    }

    pub fn search_history(&self) -> Vec<String> {
        self.history.entries()
    }

    pub fn clear_search_history(&self) -> kfc_core::Result<()> {
        self.history.clear()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kfc_api::{MockApiHandler, MockBackend, MockLatency};
    use kfc_storage::MemoryStorage;

    fn store() -> (ArticleStore, Arc<dyn LocalStorage>) {
        let storage: Arc<dyn LocalStorage> = Arc::new(MemoryStorage::new());
        let handler = MockApiHandler::new(storage.clone()).with_latency(MockLatency::none());
        let backend = Arc::new(MockBackend::new(Arc::new(handler)));
        (ArticleStore::new(backend, storage.clone()), storage)
    }

    #[tokio::test]
    async fn test_load_articles_paginates() {
        let (store, _) = store();
        let store = store.with_page_size(2);
        store.load_articles(3).await;
        let state = store.snapshot();
        assert!(!state.is_loading_articles);
        assert_eq!(state.articles.len(), 1);
        assert_eq!(state.current_page, 3);
        assert_eq!(state.total_pages, 3);
        assert_eq!(state.articles_error, None);
    }

    #[tokio::test]
    async fn test_shelf_add_is_idempotent() {
        let (store, _) = store();
        let article = Article {
            id: "2".to_string(),
            title: "量子计算的实际应用与挑战".to_string(),
            ..Default::default()
        };
        for _ in 0..3 {
            store.add_to_shelf(&article).await;
        }
        let state = store.snapshot();
        assert_eq!(state.saved_articles.len(), 1);
        assert!(store.is_article_in_shelf("2"));
        assert!(!state.is_updating_shelf);

        store.remove_from_shelf("2").await;
        store.remove_from_shelf("2").await;
        assert!(!store.is_article_in_shelf("2"));
        assert_eq!(store.snapshot().shelf_error, None);
    }

    #[tokio::test]
    async fn test_missing_article_sets_error() {
        let (store, _) = store();
        store.open_article("nope").await;
        let state = store.snapshot();
        assert!(state.articles_error.unwrap().contains("nope"));
        assert!(state.selected_article.is_none());
        assert!(!state.is_loading_articles);
    }

    #[tokio::test]
    async fn test_search_records_history() {
        let (store, _) = store();
        store.search("  推荐系统 ").await;
        let state = store.snapshot();
        assert_eq!(state.search_query, "推荐系统");
        assert_eq!(state.search_results.len(), 1);
        assert_eq!(state.search_results[0].id, "4");
        assert_eq!(store.search_history(), vec!["推荐系统"]);

        store.search("").await;
        let state = store.snapshot();
        assert!(state.search_query.is_empty());
        assert!(state.search_results.is_empty());
    }

    #[tokio::test]
    async fn test_shelf_survives_rehydration() {
        let (store, storage) = store();
        store.open_article("1").await;
        let article = store.snapshot().selected_article.unwrap();
        store.add_to_shelf(&article).await;

        let handler = MockApiHandler::new(storage.clone()).with_latency(MockLatency::none());
        let backend = Arc::new(MockBackend::new(Arc::new(handler)));
        let restored = ArticleStore::new(backend, storage);
        assert!(!restored.is_article_in_shelf("1"));
        restored.hydrate().unwrap();
        assert!(restored.is_article_in_shelf("1"));
        assert_eq!(restored.snapshot().selected_article.map(|a| a.id).as_deref(), Some("1"));
    }
}
