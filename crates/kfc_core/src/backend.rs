use async_trait::async_trait;
use std::fmt;

use crate::types::{
    Article, ArticleListParams, ArticleListResponse, FavoritesResponse, SearchParams,
    SearchResultResponse, Settings, SettingsPatch, ShelfResponse, TrendingParams,
    TrendingResponse, User,
};
use crate::Result;

/// Everything the state containers need from "the server". One
/// implementation answers from local fixtures, the other over HTTP; the
/// choice is made once when the application is composed.
#[async_trait]
pub trait ResourceBackend: Send + Sync + fmt::Debug {
    fn name(&self) -> &str;

    /// True for backends answering from local data.
    fn is_mock(&self) -> bool;

    async fn list_articles(&self, params: &ArticleListParams) -> Result<ArticleListResponse>;

    async fn get_article(&self, id: &str) -> Result<Article>;

    async fn search_articles(&self, params: &SearchParams) -> Result<SearchResultResponse>;

    async fn trending_articles(&self, params: &TrendingParams) -> Result<TrendingResponse>;

    async fn get_shelf(&self) -> Result<ShelfResponse>;

    async fn add_to_shelf(&self, article: &Article) -> Result<ShelfResponse>;

    async fn remove_from_shelf(&self, article_id: &str) -> Result<()>;

    async fn get_favorites(&self) -> Result<FavoritesResponse>;

    async fn add_favorite(&self, article_id: &str) -> Result<()>;

    async fn remove_favorite(&self, article_id: &str) -> Result<()>;

    async fn favorite_status(&self, article_id: &str) -> Result<bool>;

    async fn get_settings(&self) -> Result<Settings>;

    async fn update_settings(&self, patch: &SettingsPatch) -> Result<Settings>;

    /// `Ok(None)` means the credentials were rejected.
    async fn login(&self, username: &str, password: &str) -> Result<Option<User>>;

    async fn register(&self, username: &str, email: &str, password: &str) -> Result<User>;

    async fn logout(&self) -> Result<()>;
}
