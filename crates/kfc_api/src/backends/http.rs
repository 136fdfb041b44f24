use async_trait::async_trait;
use chrono::Utc;
use kfc_core::{
    Article, ArticleListParams, ArticleListResponse, Error, FavoritesParams, FavoritesResponse,
    LoginData, RegisterData, ResourceBackend, Result, SearchParams, SearchResultResponse,
    Settings, SettingsPatch, ShelfResponse, TrendingParams, TrendingResponse, User,
};
use std::sync::Arc;

use crate::services::{
    ArticleService, AuthService, FavoriteService, SettingsService, ShelfService,
};
use crate::ApiClient;

/// Talks to the REST API through the resource services.
#[derive(Debug, Clone)]
pub struct HttpBackend {
    articles: ArticleService,
    shelf: ShelfService,
    favorites: FavoriteService,
    settings: SettingsService,
    auth: AuthService,
}

impl HttpBackend {
    pub fn new(client: Arc<ApiClient>) -> Self {
        Self {
            articles: ArticleService::new(client.clone()),
            shelf: ShelfService::new(client.clone()),
            favorites: FavoriteService::new(client.clone()),
            settings: SettingsService::new(client.clone()),
            auth: AuthService::new(client),
        }
    }
}

#[async_trait]
impl ResourceBackend for HttpBackend {
    fn name(&self) -> &str {
        "http"
    }

    fn is_mock(&self) -> bool {
        false
    }

    async fn list_articles(&self, params: &ArticleListParams) -> Result<ArticleListResponse> {
        self.articles.list(params).await
    }

    async fn get_article(&self, id: &str) -> Result<Article> {
        self.articles.get(id).await
    }

    async fn search_articles(&self, params: &SearchParams) -> Result<SearchResultResponse> {
        self.articles.search(params).await
    }

    async fn trending_articles(&self, params: &TrendingParams) -> Result<TrendingResponse> {
        self.articles.trending(params).await
    }

    async fn get_shelf(&self) -> Result<ShelfResponse> {
        self.shelf.get().await
    }

    async fn add_to_shelf(&self, article: &Article) -> Result<ShelfResponse> {
        self.shelf.add(&article.id).await
    }

    async fn remove_from_shelf(&self, article_id: &str) -> Result<()> {
        self.shelf.remove(article_id).await?;
        Ok(())
    }

    async fn get_favorites(&self) -> Result<FavoritesResponse> {
        self.favorites.list(&FavoritesParams::default()).await
    }

    async fn add_favorite(&self, article_id: &str) -> Result<()> {
        self.favorites.add(article_id).await
    }

    async fn remove_favorite(&self, article_id: &str) -> Result<()> {
        self.favorites.remove(article_id).await
    }

    async fn favorite_status(&self, article_id: &str) -> Result<bool> {
        self.favorites.status(article_id).await
    }

    async fn get_settings(&self) -> Result<Settings> {
        self.settings.get().await
    }

    async fn update_settings(&self, patch: &SettingsPatch) -> Result<Settings> {
        self.settings.update(patch).await
    }

    /// The API only hands back a token, so the user is built from the
    /// submitted credentials. A 401 means the credentials were rejected.
    async fn login(&self, username: &str, password: &str) -> Result<Option<User>> {
        let data = LoginData {
            username: username.to_string(),
            password: password.to_string(),
        };
        match self.auth.login(&data).await {
            Ok(_) => Ok(Some(User {
                id: username.to_string(),
                username: username.to_string(),
                email: String::new(),
                created_at: Utc::now(),
            })),
            Err(Error::Api { status: 401, .. }) => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Registers, then logs in so later calls carry a token.
    async fn register(&self, username: &str, email: &str, password: &str) -> Result<User> {
        let info = self
            .auth
            .register(&RegisterData {
                email: email.to_string(),
                password: password.to_string(),
                username: username.to_string(),
            })
            .await?;
        self.auth
            .login(&LoginData {
                username: username.to_string(),
                password: password.to_string(),
            })
            .await?;
        Ok(User::from(info))
    }

    async fn logout(&self) -> Result<()> {
        self.auth.logout()
    }
}
