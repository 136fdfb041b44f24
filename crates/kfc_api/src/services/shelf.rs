use kfc_core::{Result, ShelfResponse, SuccessResponse};
use serde_json::json;
use std::sync::Arc;

use crate::endpoints::shelf;
use crate::ApiClient;

#[derive(Debug, Clone)]
pub struct ShelfService {
    client: Arc<ApiClient>,
}

impl ShelfService {
    pub fn new(client: Arc<ApiClient>) -> Self {
        Self { client }
    }

    pub async fn get(&self) -> Result<ShelfResponse> {
        self.client.get_as::<_, ()>(shelf::LIST, None).await
    }

    /// Returns the shelf after the addition.
    pub async fn add(&self, article_id: &str) -> Result<ShelfResponse> {
        self.client
            .post_as(shelf::ADD, Some(&json!({ "articleId": article_id })))
            .await
    }

    pub async fn remove(&self, article_id: &str) -> Result<SuccessResponse> {
        let value = self.client.delete(&shelf::remove(article_id)).await?;
        if value.is_null() {
            return Ok(SuccessResponse { success: true, message: None });
        }
        Ok(serde_json::from_value(value)?)
    }
}
