use kfc_core::{FavoriteStatusResponse, FavoritesParams, FavoritesResponse, Result};
use std::sync::Arc;

use crate::endpoints::favorites;
use crate::ApiClient;

#[derive(Debug, Clone)]
pub struct FavoriteService {
    client: Arc<ApiClient>,
}

impl FavoriteService {
    pub fn new(client: Arc<ApiClient>) -> Self {
        Self { client }
    }

    pub async fn list(&self, params: &FavoritesParams) -> Result<FavoritesResponse> {
        self.client.get_as(favorites::LIST, Some(params)).await
    }

    pub async fn add(&self, article_id: &str) -> Result<()> {
        self.client.post(&favorites::item(article_id), None).await?;
        Ok(())
    }

    pub async fn remove(&self, article_id: &str) -> Result<()> {
        self.client.delete(&favorites::item(article_id)).await?;
        Ok(())
    }

    pub async fn status(&self, article_id: &str) -> Result<bool> {
        let status: FavoriteStatusResponse = self
            .client
            .get_as::<_, ()>(&favorites::status(article_id), None)
            .await?;
        Ok(status.is_favorited)
    }
}
