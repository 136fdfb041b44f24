use kfc_core::{Error, Result};
use kfc_storage::{keys, LocalStorage};
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use reqwest::{Method, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};
use tracing::{debug, warn};
use url::Url;

use crate::case::{keys_to_camel, keys_to_snake, normalize_ids};
use crate::mock::MockApiHandler;

const GENERIC_FAILURE: &str = "Request failed";

/// JSON client for the KFC REST API.
///
/// Outgoing params and bodies are converted to snake_case, responses back to
/// camelCase with `_id`/numeric ids normalized. While mock mode is on every
/// call is answered by the [`MockApiHandler`] instead of the network.
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
    token: RwLock<Option<String>>,
    storage: Arc<dyn LocalStorage>,
    mock_mode: AtomicBool,
    mock: Arc<MockApiHandler>,
}

impl fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApiClient")
            .field("base_url", &self.base_url)
            .field("token", &self.token().map(|_| "<redacted>"))
            .field("mock_mode", &self.is_mock_mode())
            .finish()
    }
}

impl ApiClient {
    /// Builds a client and restores a token previously saved in `storage`.
    pub fn new(
        base_url: impl Into<String>,
        storage: Arc<dyn LocalStorage>,
        mock: Arc<MockApiHandler>,
    ) -> Self {
        let token = match storage.get_item(keys::AUTH_TOKEN) {
            Ok(token) => token.filter(|t| !t.is_empty()),
            Err(e) => {
                warn!("⚠️ Could not restore auth token: {}", e);
                None
            }
        };
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token: RwLock::new(token),
            storage,
            mock_mode: AtomicBool::new(false),
            mock,
        }
    }

    pub fn with_mock_mode(self, enabled: bool) -> Self {
        self.set_mock_mode(enabled);
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Underlying HTTP client, shared with the streaming endpoints.
    pub fn http(&self) -> &reqwest::Client {
        &self.http
    }

    pub fn storage(&self) -> &Arc<dyn LocalStorage> {
        &self.storage
    }

    pub fn mock_handler(&self) -> &Arc<MockApiHandler> {
        &self.mock
    }

    pub fn set_mock_mode(&self, enabled: bool) {
        self.mock_mode.store(enabled, Ordering::SeqCst);
    }

    pub fn is_mock_mode(&self) -> bool {
        self.mock_mode.load(Ordering::SeqCst)
    }

    pub fn token(&self) -> Option<String> {
        self.token.read().ok().and_then(|t| t.clone())
    }

    pub fn set_token(&self, token: &str) -> Result<()> {
        if let Ok(mut guard) = self.token.write() {
            *guard = Some(token.to_string());
        }
        self.storage.set_item(keys::AUTH_TOKEN, token)
    }

    pub fn clear_token(&self) -> Result<()> {
        if let Ok(mut guard) = self.token.write() {
            *guard = None;
        }
        self.storage.remove_item(keys::AUTH_TOKEN)
    }

    pub fn is_authenticated(&self) -> bool {
        self.token().is_some()
    }

    pub async fn request(&self, endpoint: &str, method: Method, body: Option<Value>) -> Result<Value> {
        self.dispatch(method, endpoint, None, body).await
    }

    pub async fn get(&self, endpoint: &str, params: Option<Value>) -> Result<Value> {
        self.dispatch(Method::GET, endpoint, params, None).await
    }

    pub async fn post(&self, endpoint: &str, body: Option<Value>) -> Result<Value> {
        self.dispatch(Method::POST, endpoint, None, body).await
    }

    pub async fn put(&self, endpoint: &str, body: Option<Value>) -> Result<Value> {
        self.dispatch(Method::PUT, endpoint, None, body).await
    }

    pub async fn patch(&self, endpoint: &str, body: Option<Value>) -> Result<Value> {
        self.dispatch(Method::PATCH, endpoint, None, body).await
    }

    pub async fn delete(&self, endpoint: &str) -> Result<Value> {
        self.dispatch(Method::DELETE, endpoint, None, None).await
    }

    pub async fn get_as<T, P>(&self, endpoint: &str, params: Option<&P>) -> Result<T>
    where
        T: DeserializeOwned,
        P: Serialize + ?Sized,
    {
        let params = params.map(serde_json::to_value).transpose()?;
        decode(self.get(endpoint, params).await?)
    }

    pub async fn post_as<T, B>(&self, endpoint: &str, body: Option<&B>) -> Result<T>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        let body = body.map(serde_json::to_value).transpose()?;
        decode(self.post(endpoint, body).await?)
    }

    pub async fn put_as<T, B>(&self, endpoint: &str, body: Option<&B>) -> Result<T>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        let body = body.map(serde_json::to_value).transpose()?;
        decode(self.put(endpoint, body).await?)
    }

    pub async fn delete_as<T: DeserializeOwned>(&self, endpoint: &str) -> Result<T> {
        decode(self.delete(endpoint).await?)
    }

    async fn dispatch(
        &self,
        method: Method,
        endpoint: &str,
        params: Option<Value>,
        body: Option<Value>,
    ) -> Result<Value> {
        let params = params.map(keys_to_snake);
        let body = if method == Method::GET {
            None
        } else {
            body.map(keys_to_snake)
        };

        let data = if self.is_mock_mode() {
            self.mock
                .handle_request(endpoint, &method, params.as_ref(), body.as_ref())
                .await?
        } else {
            self.send(method, endpoint, params.as_ref(), body.as_ref()).await?
        };

        Ok(keys_to_camel(normalize_ids(data)))
    }

    async fn send(
        &self,
        method: Method,
        endpoint: &str,
        params: Option<&Value>,
        body: Option<&Value>,
    ) -> Result<Value> {
        let url = self.build_url(endpoint, params)?;
        debug!("🌐 {} {}", method, url);

        let mut request = self.http.request(method, url).headers(self.headers()?);
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request.send().await?;
        let status = response.status();
        if status == StatusCode::NO_CONTENT {
            return Ok(Value::Null);
        }

        if !status.is_success() {
            let message = match response.json::<Value>().await {
                Ok(payload) => error_detail(&payload),
                Err(_) => GENERIC_FAILURE.to_string(),
            };
            warn!("❌ API request to {} failed ({}): {}", endpoint, status, message);
            return Err(Error::Api {
                status: status.as_u16(),
                message,
            });
        }

        let text = response.text().await?;
        if text.trim().is_empty() {
            return Ok(Value::Null);
        }
        Ok(serde_json::from_str(&text)?)
    }

    fn headers(&self) -> Result<HeaderMap> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        if let Some(token) = self.token() {
            let value = HeaderValue::from_str(&format!("Bearer {}", token))
                .map_err(|e| Error::Config(format!("Invalid auth token: {}", e)))?;
            headers.insert(AUTHORIZATION, value);
        }
        Ok(headers)
    }

    /// Appends params as query pairs. Nulls are skipped and arrays become
    /// repeated keys.
    fn build_url(&self, endpoint: &str, params: Option<&Value>) -> Result<Url> {
        let mut url = Url::parse(&format!("{}{}", self.base_url, endpoint))
            .map_err(|e| Error::Config(format!("Invalid URL for {}: {}", endpoint, e)))?;

        if let Some(Value::Object(map)) = params {
            let mut pairs = url.query_pairs_mut();
            for (key, value) in map {
                match value {
                    Value::Null => {}
                    Value::Array(items) => {
                        for item in items {
                            pairs.append_pair(key, &query_value(item));
                        }
                    }
                    other => {
                        pairs.append_pair(key, &query_value(other));
                    }
                }
            }
        }
        if url.query() == Some("") {
            url.set_query(None);
        }
        Ok(url)
    }
}

fn query_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// The server's `detail` message, or the generic failure text.
pub fn error_detail(payload: &Value) -> String {
    match payload.get("detail") {
        Some(Value::String(detail)) if !detail.is_empty() => detail.clone(),
        Some(Value::Null) | None => GENERIC_FAILURE.to_string(),
        Some(other) => other.to_string(),
    }
}

fn decode<T: DeserializeOwned>(value: Value) -> Result<T> {
    Ok(serde_json::from_value(value)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockLatency;
    use httpmock::prelude::*;
    use kfc_core::{Article, ArticleListParams};
    use kfc_storage::MemoryStorage;
    use serde_json::json;

    fn client(base_url: &str) -> ApiClient {
        let storage: Arc<dyn LocalStorage> = Arc::new(MemoryStorage::new());
        let mock = Arc::new(MockApiHandler::new(storage.clone()).with_latency(MockLatency::none()));
        ApiClient::new(base_url, storage, mock)
    }

    #[tokio::test]
    async fn test_get_converts_params_and_response() {
        let server = MockServer::start_async().await;
        let m = server
            .mock_async(|when, then| {
                when.method(GET)
                    .path("/articles")
                    .query_param("page", "2")
                    .query_param("page_size", "5");
                then.status(200).json_body(json!({
                    "articles": [{"_id": 9, "title": "t", "image_url": "a.png", "reading_time": 3}],
                    "total_count": 1,
                    "current_page": 2,
                    "total_pages": 1
                }));
            })
            .await;

        let api = client(&server.base_url());
        let params = ArticleListParams {
            page: Some(2),
            page_size: Some(5),
            ..Default::default()
        };
        let value = api
            .get("/articles", Some(serde_json::to_value(&params).unwrap()))
            .await
            .unwrap();

        m.assert_async().await;
        assert_eq!(value["totalCount"], json!(1));
        let article: Article = serde_json::from_value(value["articles"][0].clone()).unwrap();
        assert_eq!(article.id, "9");
        assert_eq!(article.image_url, "a.png");
        assert_eq!(article.reading_time, Some(3));
    }

    #[tokio::test]
    async fn test_array_params_are_repeated() {
        let api = client("http://localhost:8000/api/v1");
        let url = api
            .build_url(
                "/articles",
                Some(&json!({"tags": ["a", "b"], "author_id": null, "page": 1})),
            )
            .unwrap();
        assert_eq!(
            url.as_str(),
            "http://localhost:8000/api/v1/articles?page=1&tags=a&tags=b"
        );
    }

    #[tokio::test]
    async fn test_token_header_and_snake_body() {
        let server = MockServer::start_async().await;
        let m = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/shelf")
                    .header("authorization", "Bearer secret")
                    .json_body(json!({"article_id": "3"}));
                then.status(200).json_body(json!({"articles": []}));
            })
            .await;

        let api = client(&server.base_url());
        api.set_token("secret").unwrap();
        api.post("/shelf", Some(json!({"articleId": "3"}))).await.unwrap();
        m.assert_async().await;

        assert_eq!(
            api.storage().get_item(keys::AUTH_TOKEN).unwrap().as_deref(),
            Some("secret")
        );
        api.clear_token().unwrap();
        assert!(!api.is_authenticated());
        assert_eq!(api.storage().get_item(keys::AUTH_TOKEN).unwrap(), None);
    }

    #[tokio::test]
    async fn test_token_restored_from_storage() {
        let storage: Arc<dyn LocalStorage> = Arc::new(MemoryStorage::new());
        storage.set_item(keys::AUTH_TOKEN, "persisted").unwrap();
        let mock = Arc::new(MockApiHandler::new(storage.clone()));
        let api = ApiClient::new("http://localhost", storage, mock);
        assert_eq!(api.token().as_deref(), Some("persisted"));
    }

    #[tokio::test]
    async fn test_mongo_ids_become_ids_at_every_depth() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/articles/7");
                then.status(200).json_body(json!({
                    "_id": 7,
                    "title": "Nested",
                    "authors": [{"_id": "au-1", "id": "stale", "name": "Li"}],
                    "published_at": "2024-01-01"
                }));
            })
            .await;

        let api = client(&server.base_url());
        let value = api.get("/articles/7", None).await.unwrap();
        assert!(value.get("_id").is_none());
        assert!(value.get("Id").is_none());
        assert_eq!(value["id"], json!("7"));
        assert_eq!(value["authors"][0]["id"], json!("au-1"));
        assert_eq!(value["publishedAt"], json!("2024-01-01"));

        let article: Article = serde_json::from_value(value).unwrap();
        assert_eq!(article.id, "7");
        assert_eq!(article.authors.unwrap()[0].id, "au-1");
    }

    #[tokio::test]
    async fn test_no_content_yields_null() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(DELETE).path("/shelf/1");
                then.status(204);
            })
            .await;

        let api = client(&server.base_url());
        assert_eq!(api.delete("/shelf/1").await.unwrap(), Value::Null);
    }

    #[tokio::test]
    async fn test_error_uses_server_detail() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/articles/404");
                then.status(404).json_body(json!({"detail": "Article not found"}));
            })
            .await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/settings");
                then.status(500).body("oops");
            })
            .await;

        let api = client(&server.base_url());
        let err = api.get("/articles/404", None).await.unwrap_err();
        assert_eq!(err.to_string(), "Article not found");
        assert_eq!(err.status(), Some(404));

        let err = api.get("/settings", None).await.unwrap_err();
        assert_eq!(err.to_string(), "Request failed");
    }

    #[tokio::test]
    async fn test_mock_mode_skips_network() {
        // Nothing listens on this port; mock mode must not try.
        let api = client("http://127.0.0.1:9").with_mock_mode(true);
        let value = api.get("/articles/2", None).await.unwrap();
        assert_eq!(value["id"], json!("2"));
        assert!(value.get("imageUrl").is_some());

        api.set_mock_mode(false);
        assert!(api.get("/articles/2", None).await.is_err());
    }
}
