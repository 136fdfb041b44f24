//! Local stand-in for the REST API, answering from bundled fixtures and
//! a couple of storage-backed collections.

use kfc_core::{Error, Result, SearchResult, TrendingPeriod};
use kfc_storage::{keys, LocalStorage, LocalStorageExt};
use lazy_static::lazy_static;
use rand::Rng;
use regex::Regex;
use reqwest::Method;
use serde_json::{json, Map, Value};
use std::sync::{Arc, RwLock};
use std::time::Duration;
use tracing::debug;

use crate::case::keys_to_camel;

pub mod fixtures;
pub mod loader;

pub use fixtures::{MockFixtures, TrendingRankings};
pub use loader::{MockDataEditor, MockDataLoader};

pub type SharedFixtures = Arc<RwLock<MockFixtures>>;

const DEFAULT_TRENDING_LIMIT: usize = 10;
const RAG_SHELF_SIZE: usize = 3;

lazy_static! {
    static ref ARTICLE_DETAIL: Regex = Regex::new(r"/articles/[a-zA-Z0-9]+$").unwrap();
    static ref FAVORITE_STATUS: Regex = Regex::new(r"^/favorites/([^/]+)/status$").unwrap();
}

/// Simulated network delay, drawn uniformly from `[min, max)`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MockLatency {
    pub min: Duration,
    pub max: Duration,
}

impl Default for MockLatency {
    fn default() -> Self {
        Self {
            min: Duration::from_millis(300),
            max: Duration::from_millis(600),
        }
    }
}

impl MockLatency {
    pub fn none() -> Self {
        Self {
            min: Duration::ZERO,
            max: Duration::ZERO,
        }
    }

    pub fn fixed(delay: Duration) -> Self {
        Self { min: delay, max: delay }
    }

    fn sample(&self) -> Duration {
        if self.max <= self.min {
            return self.min;
        }
        rand::thread_rng().gen_range(self.min..self.max)
    }

    pub async fn wait(&self) {
        let delay = self.sample();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
    }
}

#[derive(Debug)]
pub struct MockApiHandler {
    fixtures: SharedFixtures,
    storage: Arc<dyn LocalStorage>,
    latency: MockLatency,
}

impl MockApiHandler {
    pub fn new(storage: Arc<dyn LocalStorage>) -> Self {
        Self::with_fixtures(storage, Arc::new(RwLock::new(MockFixtures::default())))
    }

    /// Shares `fixtures` with a [`MockDataLoader`] so overrides show up
    /// without rebuilding the handler.
    pub fn with_fixtures(storage: Arc<dyn LocalStorage>, fixtures: SharedFixtures) -> Self {
        Self {
            fixtures,
            storage,
            latency: MockLatency::default(),
        }
    }

    pub fn with_latency(mut self, latency: MockLatency) -> Self {
        self.latency = latency;
        self
    }

    pub fn latency(&self) -> MockLatency {
        self.latency
    }

    pub fn storage(&self) -> &Arc<dyn LocalStorage> {
        &self.storage
    }

    pub fn fixtures(&self) -> &SharedFixtures {
        &self.fixtures
    }

    /// Read-only copy of the current fixtures.
    pub fn snapshot(&self) -> Result<MockFixtures> {
        self.fixtures
            .read()
            .map(|f| f.clone())
            .map_err(|_| Error::Storage("Mock fixtures lock poisoned".to_string()))
    }

    /// Answers `endpoint` the way the API would. `params` and `body` are
    /// expected with snake_case keys.
    pub async fn handle_request(
        &self,
        endpoint: &str,
        method: &Method,
        params: Option<&Value>,
        body: Option<&Value>,
    ) -> Result<Value> {
        self.latency.wait().await;
        debug!("[mock] {} {}", method, endpoint);

        let path = endpoint.split('?').next().unwrap_or(endpoint);

        if path.starts_with("/articles") && !path.contains("/search") && !path.contains("/trending")
        {
            return self.articles(path, params);
        }
        if path.contains("/articles/search") {
            return self.search(params);
        }
        if path.contains("/articles/trending") {
            return self.trending(params);
        }
        if path.contains("/rag/query") {
            return self.rag_query(params, body);
        }
        if path.starts_with("/favorites") {
            return self.favorites(path, method, body);
        }
        if path.starts_with("/settings") {
            return self.settings(method, body);
        }

        Ok(json!({}))
    }

    fn articles(&self, path: &str, params: Option<&Value>) -> Result<Value> {
        let fixtures = self.snapshot()?;

        if ARTICLE_DETAIL.is_match(path) {
            let id = path.rsplit('/').next().unwrap_or_default();
            return match fixtures.find_article(id) {
                Some(article) => Ok(serde_json::to_value(article)?),
                None => Err(Error::NotFound(format!("Article {} not found", id))),
            };
        }

        let (page, page_size) = pagination(params);
        let total = fixtures.articles.len();
        let articles: Vec<_> = page_slice(&fixtures.articles, page, page_size).to_vec();

        Ok(json!({
            "articles": articles,
            "totalCount": total,
            "currentPage": page,
            "totalPages": total_pages(total, page_size),
        }))
    }

    fn search(&self, params: Option<&Value>) -> Result<Value> {
        let fixtures = self.snapshot()?;
        let query = param_str(params, "query").unwrap_or_default();
        let (page, page_size) = pagination(params);

        let results: Vec<SearchResult> = fixtures
            .search(&query)
            .into_iter()
            .map(|(article, relevance)| SearchResult {
                id: article.id,
                title: article.title,
                image_url: article.image_url,
                summary: article.summary,
                published_at: article.published_at,
                relevance_score: Some(relevance),
                tags: article.tags,
            })
            .collect();
        let total = results.len();

        Ok(json!({
            "results": page_slice(&results, page, page_size),
            "totalCount": total,
            "currentPage": page,
            "totalPages": total_pages(total, page_size),
        }))
    }

    fn trending(&self, params: Option<&Value>) -> Result<Value> {
        let fixtures = self.snapshot()?;
        let limit = param_usize(params, "limit").unwrap_or(DEFAULT_TRENDING_LIMIT);
        let articles = match param_str(params, "period") {
            Some(period) => match period.parse::<TrendingPeriod>() {
                Ok(period) => fixtures.trending.for_period(period).to_vec(),
                Err(_) => Vec::new(),
            },
            None => fixtures.trending.for_period(TrendingPeriod::Week).to_vec(),
        };
        let articles: Vec<_> = articles.into_iter().take(limit).collect();
        Ok(json!({ "articles": articles }))
    }

    fn rag_query(&self, params: Option<&Value>, body: Option<&Value>) -> Result<Value> {
        let fixtures = self.snapshot()?;
        let query = body
            .and_then(|b| b.get("question").or_else(|| b.get("query")))
            .and_then(Value::as_str)
            .map(str::to_string)
            .or_else(|| param_str(params, "query"))
            .unwrap_or_default();

        let shelf: Vec<_> = fixtures.articles.iter().take(RAG_SHELF_SIZE).cloned().collect();
        Ok(json!({
            "answer": fixtures.generate_answer(&query),
            "sources": MockFixtures::source_extraction(&query, &shelf),
        }))
    }

    fn favorites(&self, path: &str, method: &Method, body: Option<&Value>) -> Result<Value> {
        let mut ids: Vec<String> = self.storage.get_json(keys::MOCK_FAVORITES)?.unwrap_or_default();

        if let Some(caps) = FAVORITE_STATUS.captures(path) {
            let id = &caps[1];
            return Ok(json!({ "isFavorited": ids.iter().any(|f| f == id) }));
        }

        let path_id = path
            .strip_prefix("/favorites/")
            .filter(|rest| !rest.is_empty())
            .map(|rest| rest.trim_end_matches('/').to_string());

        if *method == Method::GET {
            let fixtures = self.snapshot()?;
            let now = chrono::Utc::now().to_rfc3339();
            let articles: Vec<Value> = ids
                .iter()
                .filter_map(|id| fixtures.find_article(id))
                .map(|a| {
                    json!({
                        "id": a.id,
                        "title": a.title,
                        "imageUrl": a.image_url,
                        "favoritedAt": now,
                    })
                })
                .collect();
            let total = articles.len();
            Ok(json!({
                "articles": articles,
                "totalCount": total,
                "currentPage": 1,
                "totalPages": if total == 0 { 0 } else { 1 },
            }))
        } else if *method == Method::POST {
            let id = body
                .and_then(|b| b.get("article_id").or_else(|| b.get("articleId")))
                .and_then(Value::as_str)
                .map(str::to_string)
                .or(path_id)
                .ok_or_else(|| Error::Validation("Missing article id".to_string()))?;
            if !ids.contains(&id) {
                ids.push(id);
                self.storage.set_json(keys::MOCK_FAVORITES, &ids)?;
            }
            Ok(json!({ "success": true, "message": "Added to favorites" }))
        } else if *method == Method::DELETE {
            let id = path.rsplit('/').next().unwrap_or_default();
            let before = ids.len();
            ids.retain(|f| f != id);
            if ids.len() != before {
                self.storage.set_json(keys::MOCK_FAVORITES, &ids)?;
            }
            Ok(json!({ "success": true, "message": "Removed from favorites" }))
        } else {
            Ok(json!({}))
        }
    }

    fn settings(&self, method: &Method, body: Option<&Value>) -> Result<Value> {
        let mut settings = match self.storage.get_json::<Map<String, Value>>(keys::MOCK_SETTINGS)? {
            Some(stored) => stored,
            None => default_mock_settings(),
        };

        if *method == Method::PUT || *method == Method::PATCH {
            if let Some(Value::Object(update)) = body.cloned().map(keys_to_camel) {
                for (key, value) in update {
                    settings.insert(key, value);
                }
            }
            self.storage.set_json(keys::MOCK_SETTINGS, &settings)?;
        }

        Ok(Value::Object(settings))
    }
}

fn default_mock_settings() -> Map<String, Value> {
    let value = json!({
        "theme": "dark",
        "articleDisplay": "card",
        "notificationsEnabled": true,
        "emailNotifications": false,
        "language": "zh-CN",
        "articlesPerPage": 20,
        "contentPreferences": {
            "topics": ["深度学习", "机器学习"],
            "excludedTopics": []
        }
    });
    match value {
        Value::Object(map) => map,
        _ => Map::new(),
    }
}

fn param(params: Option<&Value>, key: &str) -> Option<Value> {
    params.and_then(|p| p.get(key)).filter(|v| !v.is_null()).cloned()
}

fn param_str(params: Option<&Value>, key: &str) -> Option<String> {
    param(params, key).map(|v| match v {
        Value::String(s) => s,
        other => other.to_string(),
    })
}

fn param_usize(params: Option<&Value>, key: &str) -> Option<usize> {
    match param(params, key)? {
        Value::Number(n) => n.as_u64().map(|n| n as usize),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn pagination(params: Option<&Value>) -> (usize, usize) {
    let page = param_usize(params, "page").unwrap_or(1).max(1);
    let page_size = param_usize(params, "page_size")
        .filter(|size| *size > 0)
        .unwrap_or(kfc_core::config::DEFAULT_PAGE_SIZE);
    (page, page_size)
}

fn page_slice<T>(items: &[T], page: usize, page_size: usize) -> &[T] {
    let start = (page - 1).saturating_mul(page_size).min(items.len());
    let end = start.saturating_add(page_size).min(items.len());
    &items[start..end]
}

fn total_pages(total: usize, page_size: usize) -> usize {
    total.div_ceil(page_size)
}
