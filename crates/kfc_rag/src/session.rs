use kfc_api::RagService;
use kfc_core::{
    Article, CreateDatasetParams, Error, Message, RagDatasetListParams, Result, Role,
};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::message::{StreamMessage, StreamRequest};
use crate::streams::RagStreamService;

pub const EMPTY_SHELF_MESSAGE: &str = "The shelf is empty. Add articles to the shelf first.";
pub const NO_DATASET_MESSAGE: &str = "No RAG dataset selected. Prepare a dataset first.";
const QUERY_FAILED_MESSAGE: &str = "Query failed, please try again later.";
const DEFAULT_DATASET_NAME: &str = "KFC shelf";

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ErrorState {
    pub is_error: bool,
    pub message: String,
}

impl ErrorState {
    fn new(message: impl Into<String>) -> Self {
        Self {
            is_error: true,
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct SessionState {
    pub messages: Vec<Message>,
    pub is_loading: bool,
    pub error: ErrorState,
    pub dataset_id: Option<String>,
}

fn message_id() -> String {
    uuid::Uuid::new_v4().simple().to_string()
}

/// Question/answer transcript over the shelf articles.
///
/// Each submit or clear starts a new generation. Events from a stream
/// belonging to an older generation are dropped, so a cleared transcript
/// stays clear and overlapping queries never write into each other.
#[derive(Debug)]
pub struct RagSession {
    service: Arc<dyn RagStreamService>,
    datasets: Option<RagService>,
    state: watch::Sender<SessionState>,
    generation: AtomicU64,
}

impl RagSession {
    pub fn new(service: Arc<dyn RagStreamService>) -> Self {
        let (state, _) = watch::channel(SessionState::default());
        Self {
            service,
            datasets: None,
            state,
            generation: AtomicU64::new(0),
        }
    }

    /// Enables [`ensure_dataset`](Self::ensure_dataset).
    pub fn with_datasets(mut self, datasets: RagService) -> Self {
        self.datasets = Some(datasets);
        self
    }

    pub fn snapshot(&self) -> SessionState {
        self.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.state.subscribe()
    }

    pub fn messages(&self) -> Vec<Message> {
        self.state.borrow().messages.clone()
    }

    pub fn set_dataset_id(&self, dataset_id: Option<String>) {
        self.state.send_modify(|s| s.dataset_id = dataset_id);
    }

    fn current_generation(&self) -> u64 {
        self.generation.load(Ordering::SeqCst)
    }

    /// Asks `query` against `articles`. Guard failures set the error state
    /// without touching the transcript.
    pub async fn submit_query(&self, query: &str, articles: &[Article]) {
        let query = query.trim();
        if query.is_empty() {
            return;
        }
        if articles.is_empty() {
            self.state
                .send_modify(|s| s.error = ErrorState::new(EMPTY_SHELF_MESSAGE));
            return;
        }
        let dataset_id = self.state.borrow().dataset_id.clone();
        if self.service.requires_dataset() && dataset_id.is_none() {
            self.state
                .send_modify(|s| s.error = ErrorState::new(NO_DATASET_MESSAGE));
            return;
        }

        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let assistant_id = message_id();
        self.state.send_modify(|s| {
            s.error = ErrorState::default();
            s.messages.push(Message {
                id: message_id(),
                role: Role::User,
                content: query.to_string(),
                is_streaming: false,
                sources: None,
            });
            s.messages.push(Message {
                id: assistant_id.clone(),
                role: Role::Assistant,
                content: String::new(),
                is_streaming: true,
                sources: None,
            });
            s.is_loading = true;
        });

        let request = StreamRequest::new(query, articles.to_vec()).with_dataset(dataset_id);
        let on_message = |message: StreamMessage| self.apply(generation, &assistant_id, message);
        let result = self.service.submit_stream_query(&request, &on_message).await;

        if generation != self.current_generation() {
            debug!("Query generation {} finished after being superseded", generation);
            return;
        }
        self.state.send_modify(|s| {
            if let Err(e) = &result {
                warn!("❌ RAG query failed: {}", e);
                s.error = ErrorState::new(e.user_message(QUERY_FAILED_MESSAGE));
                finish_streaming(s, &assistant_id);
            }
            s.is_loading = false;
        });
    }

    fn apply(&self, generation: u64, assistant_id: &str, message: StreamMessage) {
        if generation != self.current_generation() {
            debug!("Dropping stale stream event from generation {}", generation);
            return;
        }

        self.state.send_modify(|s| match message {
            StreamMessage::Token { content } => {
                if content.is_empty() {
                    return;
                }
                if let Some(msg) = streaming_message(s, assistant_id) {
                    msg.content = content;
                }
            }
            StreamMessage::Sources { sources, content } => {
                if let Some(msg) = streaming_message(s, assistant_id) {
                    msg.sources = Some(sources);
                    if let Some(content) = content.filter(|c| !c.is_empty()) {
                        msg.content = content;
                    }
                }
            }
            StreamMessage::Error { error } => {
                let error = if error.trim().is_empty() {
                    QUERY_FAILED_MESSAGE.to_string()
                } else {
                    error
                };
                s.error = ErrorState::new(error);
                finish_streaming(s, assistant_id);
            }
            StreamMessage::End => finish_streaming(s, assistant_id),
        });
    }

    /// Drops the transcript and error. A stream still running keeps going
    /// but its events are ignored.
    pub fn clear_messages(&self) {
        self.generation.fetch_add(1, Ordering::SeqCst);
        self.state.send_modify(|s| {
            s.messages.clear();
            s.error = ErrorState::default();
            s.is_loading = false;
        });
    }

    /// Resolves a dataset for the shelf, creating one when none exists,
    /// and adds `articles` to it. Returns the dataset id.
    pub async fn ensure_dataset(&self, articles: &[Article]) -> Result<String> {
        let datasets = self
            .datasets
            .as_ref()
            .ok_or_else(|| Error::Domain("Datasets are not available for this stream".to_string()))?;

        let existing = self.state.borrow().dataset_id.clone();
        let dataset_id = match existing {
            Some(id) => id,
            None => {
                let listed = datasets.datasets(&RagDatasetListParams::default()).await?;
                match listed.datasets.into_iter().next() {
                    Some(dataset) => dataset.id,
                    None => {
                        let created = datasets
                            .create_dataset(&CreateDatasetParams {
                                name: Some(DEFAULT_DATASET_NAME.to_string()),
                                description: None,
                            })
                            .await?;
                        info!("📦 Created RAG dataset {}", created.id);
                        created.id
                    }
                }
            }
        };

        for article in articles {
            if let Err(e) = datasets.add_article(&dataset_id, &article.id).await {
                warn!("⚠️ Could not add article {} to dataset {}: {}", article.id, dataset_id, e);
            }
        }

        self.set_dataset_id(Some(dataset_id.clone()));
        Ok(dataset_id)
    }
}

/// The assistant message, as long as it is still streaming. A finished
/// message is never edited again.
fn streaming_message<'a>(
    state: &'a mut SessionState,
    assistant_id: &str,
) -> Option<&'a mut Message> {
    state
        .messages
        .iter_mut()
        .find(|m| m.id == assistant_id && m.is_streaming)
}

fn finish_streaming(state: &mut SessionState, assistant_id: &str) {
    if let Some(msg) = state.messages.iter_mut().find(|m| m.id == assistant_id) {
        msg.is_streaming = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::streams::{MessageSink, MockRagStream, MockStreamDelays};
    use async_trait::async_trait;
    use kfc_api::mock::fixtures::default_articles;
    use kfc_api::MockFixtures;
    use std::sync::RwLock;
    use tokio::sync::Notify;

    fn session() -> RagSession {
        let fixtures = Arc::new(RwLock::new(MockFixtures::default()));
        let stream = MockRagStream::new(fixtures).with_delays(MockStreamDelays::none());
        RagSession::new(Arc::new(stream))
    }

    #[tokio::test]
    async fn test_empty_shelf_creates_no_messages() {
        let session = session();
        session.submit_query("什么是深度学习", &[]).await;
        let state = session.snapshot();
        assert!(state.messages.is_empty());
        assert!(state.error.is_error);
        assert_eq!(state.error.message, EMPTY_SHELF_MESSAGE);

        session.submit_query("   ", &default_articles()).await;
        assert!(session.messages().is_empty());
    }

    #[tokio::test]
    async fn test_answer_streams_into_placeholder() {
        let session = session();
        session.submit_query("深度学习", &default_articles()).await;

        let state = session.snapshot();
        assert!(!state.is_loading);
        assert!(!state.error.is_error);
        assert_eq!(state.messages.len(), 2);
        assert_eq!(state.messages[0].role, Role::User);
        let answer = &state.messages[1];
        assert_eq!(answer.role, Role::Assistant);
        assert!(!answer.is_streaming);
        assert!(!answer.content.is_empty());
        assert_eq!(answer.sources.as_ref().map(Vec::len), Some(2));
    }

    /// Emits one token, then waits until released before finishing.
    #[derive(Debug)]
    struct GatedStream {
        gate: Arc<Notify>,
    }

    #[async_trait]
    impl RagStreamService for GatedStream {
        fn name(&self) -> &str {
            "gated"
        }

        async fn submit_stream_query(
            &self,
            _request: &StreamRequest,
            on_message: MessageSink<'_>,
        ) -> Result<()> {
            on_message(StreamMessage::token("first"));
            self.gate.notified().await;
            on_message(StreamMessage::token("stale"));
            on_message(StreamMessage::End);
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_events_after_clear_are_dropped() {
        let gate = Arc::new(Notify::new());
        let session = Arc::new(RagSession::new(Arc::new(GatedStream { gate: gate.clone() })));

        let running = {
            let session = session.clone();
            tokio::spawn(async move { session.submit_query("问题", &default_articles()).await })
        };
        let mut rx = session.subscribe();
        rx.wait_for(|s| s.messages.iter().any(|m| m.content == "first"))
            .await
            .unwrap();

        session.clear_messages();
        gate.notify_one();
        running.await.unwrap();

        let state = session.snapshot();
        assert!(state.messages.is_empty());
        assert!(!state.is_loading);
    }

    #[tokio::test]
    async fn test_finished_answer_is_not_rewritten() {
        #[derive(Debug)]
        struct Chatty;

        #[async_trait]
        impl RagStreamService for Chatty {
            fn name(&self) -> &str {
                "chatty"
            }

            async fn submit_stream_query(
                &self,
                _request: &StreamRequest,
                on_message: MessageSink<'_>,
            ) -> Result<()> {
                on_message(StreamMessage::token("最终答案"));
                on_message(StreamMessage::End);
                on_message(StreamMessage::token("late"));
                on_message(StreamMessage::Sources {
                    sources: Vec::new(),
                    content: Some("late".to_string()),
                });
                Ok(())
            }
        }

        let session = RagSession::new(Arc::new(Chatty));
        session.submit_query("问题", &default_articles()).await;
        let state = session.snapshot();
        let answer = &state.messages[1];
        assert_eq!(answer.content, "最终答案");
        assert_eq!(answer.sources, None);
        assert!(!answer.is_streaming);
        assert!(!state.error.is_error);
    }

    #[tokio::test]
    async fn test_stream_error_sets_error_state() {
        #[derive(Debug)]
        struct Failing;

        #[async_trait]
        impl RagStreamService for Failing {
            fn name(&self) -> &str {
                "failing"
            }

            fn requires_dataset(&self) -> bool {
                true
            }

            async fn submit_stream_query(
                &self,
                _request: &StreamRequest,
                on_message: MessageSink<'_>,
            ) -> Result<()> {
                on_message(StreamMessage::token("部分"));
                on_message(StreamMessage::error(""));
                Ok(())
            }
        }

        let session = RagSession::new(Arc::new(Failing));
        session.submit_query("问题", &default_articles()).await;
        assert_eq!(session.snapshot().error.message, NO_DATASET_MESSAGE);
        assert!(session.messages().is_empty());

        session.set_dataset_id(Some("ds-1".to_string()));
        session.submit_query("问题", &default_articles()).await;
        let state = session.snapshot();
        assert_eq!(state.error.message, QUERY_FAILED_MESSAGE);
        assert_eq!(state.messages[1].content, "部分");
        assert!(!state.messages[1].is_streaming);
    }
}
