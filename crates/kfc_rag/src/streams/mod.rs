use async_trait::async_trait;
use kfc_api::ApiClient;
use kfc_core::{EnvConfig, Result};
use std::fmt;
use std::sync::Arc;
use tracing::info;

use crate::message::{StreamMessage, StreamRequest};

pub mod dataset;
pub mod mock;
pub mod ragflow;

pub use dataset::DatasetRagStream;
pub use mock::{MockRagStream, MockStreamDelays};
pub use ragflow::RagflowDirectStream;

/// Callback receiving stream events in order.
pub type MessageSink<'a> = &'a (dyn Fn(StreamMessage) + Send + Sync);

#[async_trait]
pub trait RagStreamService: Send + Sync + fmt::Debug {
    fn name(&self) -> &str;

    /// Whether a request must name a dataset.
    fn requires_dataset(&self) -> bool {
        false
    }

    /// Streams the answer to `request` into `on_message`. Transport
    /// failures are returned; failures reported by the server arrive as
    /// [`StreamMessage::Error`].
    async fn submit_stream_query(
        &self,
        request: &StreamRequest,
        on_message: MessageSink<'_>,
    ) -> Result<()>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamKind {
    Mock,
    Dataset,
    RagflowDirect,
}

impl StreamKind {
    pub fn from_mock_flag(use_mock_service: bool) -> Self {
        if use_mock_service {
            StreamKind::Mock
        } else {
            StreamKind::Dataset
        }
    }
}

pub fn create_stream_service(
    kind: StreamKind,
    client: Arc<ApiClient>,
    config: &EnvConfig,
) -> Result<Arc<dyn RagStreamService>> {
    let service: Arc<dyn RagStreamService> = match kind {
        StreamKind::Mock => Arc::new(MockRagStream::new(client.mock_handler().fixtures().clone())),
        StreamKind::Dataset => Arc::new(DatasetRagStream::new(client)),
        StreamKind::RagflowDirect => Arc::new(RagflowDirectStream::new(
            client.http().clone(),
            &config.ragflow_api_url,
        )),
    };
    info!("🧠 Using {} RAG stream", service.name());
    Ok(service)
}
