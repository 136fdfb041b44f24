use httpmock::prelude::*;
use kfc_api::mock::fixtures::default_articles;
use kfc_api::{ApiClient, MockApiHandler, RagService};
use kfc_core::{EnvConfig, Role};
use kfc_rag::{
    create_stream_service, DatasetRagStream, RagSession, RagStreamService, StreamKind,
    StreamMessage, StreamRequest,
};
use kfc_storage::{LocalStorage, MemoryStorage};
use serde_json::json;
use std::sync::{Arc, Mutex};

fn client(base_url: &str) -> Arc<ApiClient> {
    let storage: Arc<dyn LocalStorage> = Arc::new(MemoryStorage::new());
    let mock = Arc::new(MockApiHandler::new(storage.clone()));
    Arc::new(ApiClient::new(base_url, storage, mock))
}

const SSE_BODY: &str = concat!(
    "data: {\"text\": \"Transformer\", \"finished\": false, \"sources\": null}\n\n",
    "data: {\"text\": \"Transformer 架构\", \"finished\": false, \"sources\": null}\n\n",
    "data: {\"text\": \"Transformer 架构\", \"finished\": true, \"sources\": [",
    "{\"title\": \"深度学习在自然语言处理中的最新进展\", \"content\": \"...\", ",
    "\"metadata\": {\"article_id\": \"1\", \"relevance\": 0.92}}]}\n\n",
);

#[tokio::test]
async fn test_dataset_stream_sends_token_and_decodes() {
    let server = MockServer::start_async().await;
    let m = server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/rag/query")
                .header("authorization", "Bearer secret")
                .json_body(json!({"dataset_id": "ds-1", "question": "什么是 Transformer"}));
            then.status(200)
                .header("content-type", "text/event-stream")
                .body(SSE_BODY);
        })
        .await;

    let client = client(&server.base_url());
    client.set_token("secret").unwrap();
    let stream = DatasetRagStream::new(client);

    let events = Mutex::new(Vec::new());
    let sink = |msg: StreamMessage| events.lock().unwrap().push(msg);
    let request = StreamRequest::new("什么是 Transformer", default_articles())
        .with_dataset(Some("ds-1".to_string()));
    stream.submit_stream_query(&request, &sink).await.unwrap();
    m.assert_async().await;

    let events = events.into_inner().unwrap();
    assert_eq!(events[1], StreamMessage::token("Transformer 架构"));
    assert_eq!(events.last(), Some(&StreamMessage::End));
    assert_eq!(events.iter().filter(|e| **e == StreamMessage::End).count(), 1);
}

#[tokio::test]
async fn test_session_over_dataset_stream() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/rag/datasets");
            then.status(200).json_body(json!({"datasets": [], "total_count": 0}));
        })
        .await;
    server
        .mock_async(|when, then| {
            when.method(POST).path("/rag/datasets");
            then.status(200).json_body(json!({"_id": 42, "name": "KFC shelf"}));
        })
        .await;
    let add = server
        .mock_async(|when, then| {
            when.method(POST).path_contains("/rag/datasets/42/articles/");
            then.status(200).json_body(json!({"id": "42", "name": "KFC shelf", "article_count": 1}));
        })
        .await;
    server
        .mock_async(|when, then| {
            when.method(POST).path("/rag/query");
            then.status(200).body(SSE_BODY);
        })
        .await;

    let client = client(&server.base_url());
    let service = create_stream_service(StreamKind::Dataset, client.clone(), &EnvConfig::default()).unwrap();
    let session = RagSession::new(service).with_datasets(RagService::new(client));

    let articles = default_articles();
    session.submit_query("问题", &articles).await;
    assert!(session.snapshot().error.is_error);
    assert!(session.messages().is_empty());

    let dataset_id = session.ensure_dataset(&articles[..2]).await.unwrap();
    assert_eq!(dataset_id, "42");
    assert_eq!(add.hits_async().await, 2);

    session.submit_query("问题", &articles).await;
    let state = session.snapshot();
    assert!(!state.error.is_error);
    assert_eq!(state.messages[1].role, Role::Assistant);
    assert_eq!(state.messages[1].content, "Transformer 架构");
    let sources = state.messages[1].sources.clone().unwrap();
    assert_eq!(sources[0].id, "1");
    assert!(!state.messages[1].is_streaming);
}

#[tokio::test]
async fn test_dataset_stream_error_detail() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(POST).path("/rag/query");
            then.status(404).json_body(json!({"detail": "Dataset not found"}));
        })
        .await;

    let client = client(&server.base_url());
    let session = RagSession::new(Arc::new(DatasetRagStream::new(client)));
    session.set_dataset_id(Some("missing".to_string()));
    session.submit_query("问题", &default_articles()).await;

    let state = session.snapshot();
    assert_eq!(state.error.message, "Dataset not found");
    assert!(!state.is_loading);
    assert!(!state.messages[1].is_streaming);
}

#[tokio::test]
async fn test_ragflow_direct_stream() {
    let server = MockServer::start_async().await;
    let m = server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/api/query/stream")
                .body_contains("\"documents\"")
                .body_contains("\"query\":\"比较\"");
            then.status(200).body(concat!(
                "{\"type\":\"token\",\"content\":\"两者\"}\n",
                "{\"type\":\"token\",\"content\":\"各有优缺点\"}\n",
                "{\"type\":\"sources\",\"sources\":[{\"id\":\"2\",\"title\":\"T\",\"content\":\"C\",\"relevance\":0.5}]}\n",
            ));
        })
        .await;

    let config = EnvConfig::default().with_ragflow_api_url(server.base_url());
    let service = create_stream_service(StreamKind::RagflowDirect, client("http://unused"), &config).unwrap();
    let session = RagSession::new(service);
    session.submit_query("比较", &default_articles()).await;
    m.assert_async().await;

    let state = session.snapshot();
    assert_eq!(state.messages[1].content, "两者各有优缺点");
    assert_eq!(state.messages[1].sources.as_ref().map(Vec::len), Some(1));
    assert!(!state.messages[1].is_streaming);
}
