use httpmock::prelude::*;
use kfc_api::{create_backend, ApiClient, BackendKind, MockApiHandler};
use kfc_storage::{keys, FileStorage, LocalStorage, MemoryStorage};
use kfc_store::{SidebarType, Stores};
use serde_json::json;
use std::sync::Arc;

fn stores(base_url: &str, storage: Arc<dyn LocalStorage>) -> Stores {
    let mock = Arc::new(MockApiHandler::new(storage.clone()));
    let client = Arc::new(ApiClient::new(base_url, storage.clone(), mock.clone()));
    let backend = create_backend(BackendKind::Http, client, mock).unwrap();
    Stores::new(backend, storage)
}

#[tokio::test]
async fn test_server_errors_land_in_containers() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/articles");
            then.status(500).json_body(json!({"detail": "Database unavailable"}));
        })
        .await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/articles/trending");
            then.status(503).body("");
        })
        .await;

    let stores = stores(&server.base_url(), Arc::new(MemoryStorage::new()));

    stores.articles.load_articles(1).await;
    let state = stores.articles.snapshot();
    assert_eq!(state.articles_error.as_deref(), Some("Database unavailable"));
    assert!(!state.is_loading_articles);
    assert!(state.articles.is_empty());

    stores.trending.load_trending().await;
    let state = stores.trending.snapshot();
    assert_eq!(state.trending_error.as_deref(), Some("Request failed"));
    assert!(!state.is_loading_trending);
}

#[tokio::test]
async fn test_rejected_login_over_http() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(POST).path("/auth/login");
            then.status(401).json_body(json!({"detail": "Incorrect username or password"}));
        })
        .await;

    let stores = stores(&server.base_url(), Arc::new(MemoryStorage::new()));
    assert!(!stores.auth.login("demo", "wrong").await);
    let state = stores.auth.snapshot();
    assert_eq!(state.error.as_deref(), Some("Invalid username or password"));
    assert!(!state.is_authenticated);
    assert!(!state.is_loading);
}

#[test]
fn test_state_survives_restart_on_disk() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("storage.json");

    {
        let storage: Arc<dyn LocalStorage> = Arc::new(FileStorage::open(&path).unwrap());
        let stores = stores("http://localhost:1", storage);
        stores.sidebar.set_active_sidebar(SidebarType::Bookshelf);
        stores.sidebar.set_expanded(true);
    }

    let storage: Arc<dyn LocalStorage> = Arc::new(FileStorage::open(&path).unwrap());
    assert!(storage.get_item(keys::SIDEBAR_STORE).unwrap().is_some());
    let stores = stores("http://localhost:1", storage);
    assert_eq!(stores.hydrate_all(), 1);
    let sidebar = stores.sidebar.snapshot();
    assert!(sidebar.is_expanded);
    assert_eq!(sidebar.active_sidebar, SidebarType::Bookshelf);
}
