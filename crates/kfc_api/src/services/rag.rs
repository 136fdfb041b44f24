use kfc_core::{
    CreateDatasetParams, RagDataset, RagDatasetListParams, RagDatasetListResponse, RagQueryParams,
    RagResponse, Result,
};
use std::sync::Arc;

use crate::endpoints::rag;
use crate::ApiClient;

/// Dataset management and the non-streaming query endpoint.
#[derive(Debug, Clone)]
pub struct RagService {
    client: Arc<ApiClient>,
}

impl RagService {
    pub fn new(client: Arc<ApiClient>) -> Self {
        Self { client }
    }

    pub fn client(&self) -> &Arc<ApiClient> {
        &self.client
    }

    pub async fn datasets(&self, params: &RagDatasetListParams) -> Result<RagDatasetListResponse> {
        self.client.get_as(rag::DATASETS, Some(params)).await
    }

    pub async fn create_dataset(&self, params: &CreateDatasetParams) -> Result<RagDataset> {
        self.client.post_as(rag::DATASETS, Some(params)).await
    }

    pub async fn dataset(&self, dataset_id: &str) -> Result<RagDataset> {
        self.client.get_as::<_, ()>(&rag::dataset(dataset_id), None).await
    }

    pub async fn update_dataset(
        &self,
        dataset_id: &str,
        params: &CreateDatasetParams,
    ) -> Result<RagDataset> {
        self.client.put_as(&rag::dataset(dataset_id), Some(params)).await
    }

    pub async fn delete_dataset(&self, dataset_id: &str) -> Result<()> {
        self.client.delete(&rag::dataset(dataset_id)).await?;
        Ok(())
    }

    pub async fn add_article(&self, dataset_id: &str, article_id: &str) -> Result<RagDataset> {
        self.client
            .post_as::<_, ()>(&rag::dataset_article(dataset_id, article_id), None)
            .await
    }

    pub async fn query(&self, params: &RagQueryParams) -> Result<RagResponse> {
        self.client.post_as(rag::QUERY, Some(params)).await
    }
}
