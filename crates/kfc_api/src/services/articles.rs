use kfc_core::{
    Article, ArticleListParams, ArticleListResponse, Result, SearchParams, SearchResultResponse,
    TrendingParams, TrendingResponse,
};
use serde_json::Value;
use std::sync::Arc;

use crate::endpoints::articles;
use crate::ApiClient;

#[derive(Debug, Clone)]
pub struct ArticleService {
    client: Arc<ApiClient>,
}

impl ArticleService {
    pub fn new(client: Arc<ApiClient>) -> Self {
        Self { client }
    }

    pub async fn list(&self, params: &ArticleListParams) -> Result<ArticleListResponse> {
        self.client.get_as(articles::LIST, Some(params)).await
    }

    pub async fn get(&self, id: &str) -> Result<Article> {
        self.client.get_as::<_, ()>(&articles::detail(id), None).await
    }

    pub async fn search(&self, params: &SearchParams) -> Result<SearchResultResponse> {
        self.client.get_as(articles::SEARCH, Some(params)).await
    }

    pub async fn trending(&self, params: &TrendingParams) -> Result<TrendingResponse> {
        self.client.get_as(articles::TRENDING, Some(params)).await
    }

    /// Admin only.
    pub async fn create(&self, article: &Value) -> Result<Article> {
        self.client.post_as(articles::CREATE, Some(article)).await
    }

    /// Admin only. `article` may be partial.
    pub async fn update(&self, id: &str, article: &Value) -> Result<Article> {
        self.client.put_as(&articles::detail(id), Some(article)).await
    }

    pub async fn delete(&self, id: &str) -> Result<()> {
        self.client.delete(&articles::detail(id)).await?;
        Ok(())
    }
}
