use async_trait::async_trait;
use futures_util::StreamExt;
use kfc_api::client::error_detail;
use kfc_api::endpoints::rag;
use kfc_api::ApiClient;
use kfc_core::{Error, Result};
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::debug;

use super::{MessageSink, RagStreamService};
use crate::frames::SseDecoder;
use crate::message::{StreamMessage, StreamRequest};

/// Streams answers from the API's `/rag/query` endpoint for one dataset.
#[derive(Debug, Clone)]
pub struct DatasetRagStream {
    client: Arc<ApiClient>,
}

impl DatasetRagStream {
    pub fn new(client: Arc<ApiClient>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl RagStreamService for DatasetRagStream {
    fn name(&self) -> &str {
        "dataset"
    }

    fn requires_dataset(&self) -> bool {
        true
    }

    async fn submit_stream_query(
        &self,
        request: &StreamRequest,
        on_message: MessageSink<'_>,
    ) -> Result<()> {
        let dataset_id = request
            .dataset_id
            .as_deref()
            .filter(|id| !id.is_empty())
            .ok_or_else(|| Error::Domain("No RAG dataset selected".to_string()))?;

        let url = format!("{}{}", self.client.base_url(), rag::QUERY);
        debug!("🌊 POST {} (dataset {})", url, dataset_id);

        let mut builder = self.client.http().post(&url).json(&json!({
            "dataset_id": dataset_id,
            "question": request.query,
        }));
        if let Some(token) = self.client.token() {
            builder = builder.bearer_auth(token);
        }

        let response = builder.send().await?;
        let status = response.status();
        if !status.is_success() {
            let message = match response.json::<Value>().await {
                Ok(payload) => error_detail(&payload),
                Err(_) => "Request failed".to_string(),
            };
            return Err(Error::Api {
                status: status.as_u16(),
                message,
            });
        }

        let mut stream = response.bytes_stream();
        let mut decoder = SseDecoder::new();
        while let Some(chunk) = stream.next().await {
            let bytes = chunk.map_err(|e| Error::Stream(e.to_string()))?;
            for message in decoder.push(&bytes) {
                on_message(message);
            }
        }
        for message in decoder.finish() {
            on_message(message);
        }
        if !decoder.is_finished() {
            on_message(StreamMessage::End);
        }
        Ok(())
    }
}
