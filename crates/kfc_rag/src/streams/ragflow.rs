use async_trait::async_trait;
use futures_util::StreamExt;
use kfc_core::{Error, Result};
use serde::Serialize;
use serde_json::Value;
use tracing::debug;

use super::{MessageSink, RagStreamService};
use crate::frames::JsonLineDecoder;
use crate::message::StreamRequest;

const QUERY_STREAM_PATH: &str = "/api/query/stream";

#[derive(Serialize)]
struct Document<'a> {
    id: &'a str,
    title: &'a str,
    content: &'a str,
}

#[derive(Serialize)]
struct QueryRequest<'a> {
    query: &'a str,
    documents: Vec<Document<'a>>,
}

/// Sends the shelf articles straight to a RAGFlow server, bypassing the
/// API and its datasets.
#[derive(Debug, Clone)]
pub struct RagflowDirectStream {
    http: reqwest::Client,
    base_url: String,
}

impl RagflowDirectStream {
    pub fn new(http: reqwest::Client, base_url: &str) -> Self {
        Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }
}

#[async_trait]
impl RagStreamService for RagflowDirectStream {
    fn name(&self) -> &str {
        "ragflow"
    }

    async fn submit_stream_query(
        &self,
        request: &StreamRequest,
        on_message: MessageSink<'_>,
    ) -> Result<()> {
        let body = QueryRequest {
            query: &request.query,
            documents: request
                .articles
                .iter()
                .map(|a| Document {
                    id: &a.id,
                    title: &a.title,
                    content: &a.content,
                })
                .collect(),
        };
        let url = format!("{}{}", self.base_url, QUERY_STREAM_PATH);
        debug!("🌊 POST {} ({} documents)", url, body.documents.len());

        let response = self.http.post(&url).json(&body).send().await?;
        let status = response.status();
        if !status.is_success() {
            let message = response
                .json::<Value>()
                .await
                .ok()
                .and_then(|v| v.get("message").and_then(Value::as_str).map(str::to_string))
                .unwrap_or_else(|| "Query failed".to_string());
            return Err(Error::Api {
                status: status.as_u16(),
                message,
            });
        }

        let mut stream = response.bytes_stream();
        let mut decoder = JsonLineDecoder::new();
        while let Some(chunk) = stream.next().await {
            let bytes = chunk.map_err(|e| Error::Stream(e.to_string()))?;
            for message in decoder.push(&bytes) {
                on_message(message);
            }
        }
        for message in decoder.finish() {
            on_message(message);
        }
        Ok(())
    }
}
