use async_trait::async_trait;
use chrono::Utc;
use kfc_core::{
    Article, ArticleListParams, ArticleListResponse, Error, FavoriteStatusResponse,
    FavoritesResponse, ResourceBackend, Result, SearchParams, SearchResultResponse, Settings,
    SettingsPatch, ShelfArticle, ShelfResponse, TrendingParams, TrendingResponse, User,
};
use kfc_storage::{keys, LocalStorageExt};
use reqwest::Method;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{json, Value};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing::debug;

use crate::case::{keys_to_camel, keys_to_snake, normalize_ids};
use crate::endpoints::{articles, favorites, settings};
use crate::mock::MockApiHandler;

const DEFAULT_AUTH_DELAY: Duration = Duration::from_secs(1);

#[derive(Debug, Clone)]
pub struct MockUser {
    pub username: String,
    pub email: String,
    pub password: String,
}

impl MockUser {
    fn new(username: &str, email: &str, password: &str) -> Self {
        Self {
            username: username.to_string(),
            email: email.to_string(),
            password: password.to_string(),
        }
    }

    fn to_user(&self) -> User {
        User {
            id: uuid::Uuid::new_v4().simple().to_string()[..8].to_string(),
            username: self.username.clone(),
            email: self.email.clone(),
            created_at: Utc::now(),
        }
    }
}

fn default_users() -> Vec<MockUser> {
    vec![
        MockUser::new("demo", "demo@example.com", "demo123"),
        MockUser::new("test", "test@example.com", "test123"),
    ]
}

/// Answers container calls locally. Reads go through the
/// [`MockApiHandler`], the shelf is kept in storage next to the mock
/// favourites and the user list lives in memory.
#[derive(Debug)]
pub struct MockBackend {
    handler: Arc<MockApiHandler>,
    shelf_lock: Mutex<()>,
    users: Mutex<Vec<MockUser>>,
    auth_delay: Duration,
}

impl MockBackend {
    pub fn new(handler: Arc<MockApiHandler>) -> Self {
        Self {
            handler,
            shelf_lock: Mutex::new(()),
            users: Mutex::new(default_users()),
            auth_delay: DEFAULT_AUTH_DELAY,
        }
    }

    pub fn with_auth_delay(mut self, delay: Duration) -> Self {
        self.auth_delay = delay;
        self
    }

    async fn call<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        method: Method,
        params: Option<Value>,
        body: Option<Value>,
    ) -> Result<T> {
        let params = params.map(keys_to_snake);
        let body = body.map(keys_to_snake);
        let value = self
            .handler
            .handle_request(endpoint, &method, params.as_ref(), body.as_ref())
            .await?;
        Ok(serde_json::from_value(keys_to_camel(normalize_ids(value)))?)
    }

    async fn get<T: DeserializeOwned, P: Serialize>(&self, endpoint: &str, params: &P) -> Result<T> {
        let params = serde_json::to_value(params)?;
        self.call(endpoint, Method::GET, Some(params), None).await
    }

    async fn auth_wait(&self) {
        if !self.auth_delay.is_zero() {
            tokio::time::sleep(self.auth_delay).await;
        }
    }

    fn lock_err<T>(_: T) -> Error {
        Error::Storage("Mock backend lock poisoned".to_string())
    }

    fn load_shelf(&self) -> Result<Vec<ShelfArticle>> {
        Ok(self
            .handler
            .storage()
            .get_json(keys::MOCK_SHELF)?
            .unwrap_or_default())
    }

    fn save_shelf(&self, shelf: &[ShelfArticle]) -> Result<()> {
        self.handler.storage().set_json(keys::MOCK_SHELF, shelf)
    }
}

#[async_trait]
impl ResourceBackend for MockBackend {
    fn name(&self) -> &str {
        "mock"
    }

    fn is_mock(&self) -> bool {
        true
    }

    async fn list_articles(&self, params: &ArticleListParams) -> Result<ArticleListResponse> {
        self.get(articles::LIST, params).await
    }

    async fn get_article(&self, id: &str) -> Result<Article> {
        self.call(&articles::detail(id), Method::GET, None, None).await
    }

    async fn search_articles(&self, params: &SearchParams) -> Result<SearchResultResponse> {
        self.get(articles::SEARCH, params).await
    }

    async fn trending_articles(&self, params: &TrendingParams) -> Result<TrendingResponse> {
        self.get(articles::TRENDING, params).await
    }

    async fn get_shelf(&self) -> Result<ShelfResponse> {
        self.handler.latency().wait().await;
        Ok(ShelfResponse {
            articles: self.load_shelf()?,
        })
    }

    async fn add_to_shelf(&self, article: &Article) -> Result<ShelfResponse> {
        self.handler.latency().wait().await;
        let _guard = self.shelf_lock.lock().map_err(Self::lock_err)?;
        let mut shelf = self.load_shelf()?;
        if !shelf.iter().any(|saved| saved.id == article.id) {
            shelf.push(ShelfArticle::from(article));
            self.save_shelf(&shelf)?;
        }
        Ok(ShelfResponse { articles: shelf })
    }

    async fn remove_from_shelf(&self, article_id: &str) -> Result<()> {
        self.handler.latency().wait().await;
        let _guard = self.shelf_lock.lock().map_err(Self::lock_err)?;
        let mut shelf = self.load_shelf()?;
        let before = shelf.len();
        shelf.retain(|saved| saved.id != article_id);
        if shelf.len() != before {
            self.save_shelf(&shelf)?;
        }
        Ok(())
    }

    async fn get_favorites(&self) -> Result<FavoritesResponse> {
        self.call(favorites::LIST, Method::GET, None, None).await
    }

    async fn add_favorite(&self, article_id: &str) -> Result<()> {
        self.call::<Value>(
            favorites::LIST,
            Method::POST,
            None,
            Some(json!({ "articleId": article_id })),
        )
        .await?;
        Ok(())
    }

    async fn remove_favorite(&self, article_id: &str) -> Result<()> {
        self.call::<Value>(&favorites::item(article_id), Method::DELETE, None, None)
            .await?;
        Ok(())
    }

    async fn favorite_status(&self, article_id: &str) -> Result<bool> {
        let status: FavoriteStatusResponse = self
            .call(&favorites::status(article_id), Method::GET, None, None)
            .await?;
        Ok(status.is_favorited)
    }

    async fn get_settings(&self) -> Result<Settings> {
        self.call(settings::GET, Method::GET, None, None).await
    }

    async fn update_settings(&self, patch: &SettingsPatch) -> Result<Settings> {
        let body = serde_json::to_value(patch)?;
        self.call(settings::UPDATE, Method::PUT, None, Some(body)).await
    }

    async fn login(&self, username: &str, password: &str) -> Result<Option<User>> {
        self.auth_wait().await;
        let users = self.users.lock().map_err(Self::lock_err)?;
        let user = users
            .iter()
            .find(|u| u.username == username && u.password == password)
            .map(MockUser::to_user);
        debug!("🔑 Mock login for {}: {}", username, user.is_some());
        Ok(user)
    }

    async fn register(&self, username: &str, email: &str, password: &str) -> Result<User> {
        self.auth_wait().await;
        let mut users = self.users.lock().map_err(Self::lock_err)?;
        if users.iter().any(|u| u.username == username) {
            return Err(Error::Domain("Username already exists".to_string()));
        }
        if users.iter().any(|u| u.email == email) {
            return Err(Error::Domain("Email is already registered".to_string()));
        }
        let user = MockUser::new(username, email, password);
        let registered = user.to_user();
        users.push(user);
        Ok(registered)
    }

    async fn logout(&self) -> Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockLatency;
    use kfc_core::TrendingPeriod;
    use kfc_storage::MemoryStorage;

    fn backend() -> MockBackend {
        let handler = MockApiHandler::new(Arc::new(MemoryStorage::new())).with_latency(MockLatency::none());
        MockBackend::new(Arc::new(handler)).with_auth_delay(Duration::ZERO)
    }

    #[tokio::test]
    async fn test_shelf_add_is_idempotent() {
        let backend = backend();
        let article = backend.get_article("1").await.unwrap();
        for _ in 0..3 {
            backend.add_to_shelf(&article).await.unwrap();
        }
        assert_eq!(backend.get_shelf().await.unwrap().articles.len(), 1);

        backend.remove_from_shelf("1").await.unwrap();
        assert!(backend.get_shelf().await.unwrap().articles.is_empty());
    }

    #[tokio::test]
    async fn test_reads_go_through_fixtures() {
        let backend = backend();
        let page = backend
            .list_articles(&ArticleListParams {
                page: Some(1),
                page_size: Some(2),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(page.articles.len(), 2);
        assert_eq!(page.total_pages, 3);

        let trending = backend
            .trending_articles(&TrendingParams {
                period: Some(TrendingPeriod::Month),
                limit: Some(20),
            })
            .await
            .unwrap();
        assert_eq!(trending.articles.len(), 5);
    }

    #[tokio::test]
    async fn test_favorites_round_trip() {
        let backend = backend();
        backend.add_favorite("3").await.unwrap();
        assert!(backend.favorite_status("3").await.unwrap());
        let favorites = backend.get_favorites().await.unwrap();
        assert_eq!(favorites.articles[0].id, "3");
        backend.remove_favorite("3").await.unwrap();
        assert!(!backend.favorite_status("3").await.unwrap());
    }

    #[tokio::test]
    async fn test_settings_update_merges() {
        let backend = backend();
        let patch = SettingsPatch {
            articles_per_page: Some(35),
            ..Default::default()
        };
        let settings = backend.update_settings(&patch).await.unwrap();
        assert_eq!(settings.articles_per_page, 35);
        assert_eq!(backend.get_settings().await.unwrap().articles_per_page, 35);
    }

    #[tokio::test]
    async fn test_mock_users() {
        let backend = backend();
        assert!(backend.login("demo", "demo123").await.unwrap().is_some());
        assert!(backend.login("demo", "wrong").await.unwrap().is_none());

        let err = backend.register("demo", "new@example.com", "pw").await.unwrap_err();
        assert_eq!(err.to_string(), "Username already exists");
        let err = backend.register("new", "test@example.com", "pw").await.unwrap_err();
        assert_eq!(err.to_string(), "Email is already registered");

        let user = backend.register("new", "new@example.com", "pw").await.unwrap();
        assert_eq!(user.username, "new");
        assert!(backend.login("new", "pw").await.unwrap().is_some());
    }
}
