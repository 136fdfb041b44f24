use httpmock::prelude::*;
use kfc_api::{create_backend, ApiClient, BackendKind, MockApiHandler, MockLatency};
use kfc_core::{Article, ArticleListParams, ResourceBackend, SettingsPatch, ThemeMode};
use kfc_storage::{keys, LocalStorage, MemoryStorage};
use serde_json::json;
use std::sync::Arc;

fn backend(base_url: &str) -> (Arc<dyn ResourceBackend>, Arc<ApiClient>) {
    let storage: Arc<dyn LocalStorage> = Arc::new(MemoryStorage::new());
    let mock = Arc::new(MockApiHandler::new(storage.clone()).with_latency(MockLatency::none()));
    let client = Arc::new(ApiClient::new(base_url, storage, mock.clone()));
    let backend = create_backend(BackendKind::Http, client.clone(), mock).unwrap();
    (backend, client)
}

#[tokio::test]
async fn test_list_articles_over_http() {
    let server = MockServer::start_async().await;
    let m = server
        .mock_async(|when, then| {
            when.method(GET).path("/articles").query_param("page", "1");
            then.status(200).json_body(json!({
                "articles": [
                    {"_id": "a", "title": "First", "image_url": "/images/a.png", "popularity_score": 4.5}
                ],
                "total_count": 1,
                "current_page": 1,
                "total_pages": 1
            }));
        })
        .await;

    let (backend, _) = backend(&server.base_url());
    assert!(!backend.is_mock());
    let page = backend.list_articles(&ArticleListParams::page(1)).await.unwrap();
    m.assert_async().await;

    assert_eq!(page.total_count, 1);
    assert_eq!(page.articles[0].id, "a");
    assert_eq!(page.articles[0].popularity_score, Some(4.5));
}

#[tokio::test]
async fn test_article_detail_with_mongo_id() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/articles/b");
            then.status(200).json_body(json!({
                "_id": "b",
                "title": "Second",
                "reading_time": 12,
                "references": [{"_id": 3, "title": "Cited"}]
            }));
        })
        .await;

    let (backend, _) = backend(&server.base_url());
    let article = backend.get_article("b").await.unwrap();
    assert_eq!(article.id, "b");
    assert_eq!(article.reading_time, Some(12));
    assert_eq!(article.references.unwrap()[0].id, "3");
}

#[tokio::test]
async fn test_shelf_add_posts_article_id() {
    let server = MockServer::start_async().await;
    let m = server
        .mock_async(|when, then| {
            when.method(POST).path("/shelf").json_body(json!({"article_id": "7"}));
            then.status(200).json_body(json!({
                "articles": [{"id": 7, "title": "Seven", "image_url": "x", "saved_at": "2024-01-01T00:00:00Z"}]
            }));
        })
        .await;

    let (backend, _) = backend(&server.base_url());
    let article = Article {
        id: "7".to_string(),
        title: "Seven".to_string(),
        ..Default::default()
    };
    let shelf = backend.add_to_shelf(&article).await.unwrap();
    m.assert_async().await;
    assert_eq!(shelf.articles[0].id, "7");
    assert_eq!(shelf.articles[0].saved_at.as_deref(), Some("2024-01-01T00:00:00Z"));
}

#[tokio::test]
async fn test_settings_put_is_snake_cased() {
    let server = MockServer::start_async().await;
    let m = server
        .mock_async(|when, then| {
            when.method(PUT)
                .path("/settings")
                .json_body(json!({"theme": "light", "articles_per_page": 15}));
            then.status(200).json_body(json!({
                "theme": "light",
                "article_display": "list",
                "notifications_enabled": true,
                "email_notifications": false,
                "language": "en",
                "articles_per_page": 15
            }));
        })
        .await;

    let (backend, _) = backend(&server.base_url());
    let patch = SettingsPatch {
        theme: Some(ThemeMode::Light),
        articles_per_page: Some(15),
        ..Default::default()
    };
    let settings = backend.update_settings(&patch).await.unwrap();
    m.assert_async().await;
    assert_eq!(settings.theme, ThemeMode::Light);
    assert_eq!(settings.language, "en");
}

#[tokio::test]
async fn test_login_stores_token_and_rejects_bad_credentials() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/auth/login")
                .json_body(json!({"username": "demo", "password": "demo123"}));
            then.status(200)
                .json_body(json!({"access_token": "tok", "token_type": "bearer"}));
        })
        .await;
    server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/auth/login")
                .json_body(json!({"username": "demo", "password": "nope"}));
            then.status(401).json_body(json!({"detail": "Incorrect username or password"}));
        })
        .await;

    let (backend, client) = backend(&server.base_url());
    let user = backend.login("demo", "demo123").await.unwrap();
    assert_eq!(user.map(|u| u.username).as_deref(), Some("demo"));
    assert_eq!(client.token().as_deref(), Some("tok"));
    assert_eq!(
        client.storage().get_item(keys::AUTH_TOKEN).unwrap().as_deref(),
        Some("tok")
    );

    assert!(backend.login("demo", "nope").await.unwrap().is_none());

    backend.logout().await.unwrap();
    assert!(!client.is_authenticated());
}

#[tokio::test]
async fn test_favorite_status_and_errors() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/favorites/3/status");
            then.status(200).json_body(json!({"is_favorited": true}));
        })
        .await;
    server
        .mock_async(|when, then| {
            when.method(DELETE).path("/favorites/3");
            then.status(500).json_body(json!({"detail": "Database unavailable"}));
        })
        .await;

    let (backend, _) = backend(&server.base_url());
    assert!(backend.favorite_status("3").await.unwrap());
    let err = backend.remove_favorite("3").await.unwrap_err();
    assert_eq!(err.to_string(), "Database unavailable");
}
