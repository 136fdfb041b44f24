use kfc_core::{Article, ResourceBackend, Result, TrendingParams, TrendingPeriod};
use kfc_storage::{keys, LocalStorage};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::watch;
use tracing::warn;

use crate::container::{Container, Persist};

pub const TRENDING_LIMIT: usize = 20;

#[derive(Debug, Clone, Default)]
pub struct TrendingState {
    pub trending_articles: Vec<Article>,
    pub trending_period: TrendingPeriod,
    pub is_loading_trending: bool,
    pub trending_error: Option<String>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PersistedTrending {
    trending_articles: Vec<Article>,
    trending_period: TrendingPeriod,
}

impl Persist for TrendingState {
    type Persisted = PersistedTrending;

    fn persisted(&self) -> PersistedTrending {
        PersistedTrending {
            trending_articles: self.trending_articles.clone(),
            trending_period: self.trending_period,
        }
    }

    fn restore(&mut self, persisted: PersistedTrending) {
        self.trending_articles = persisted.trending_articles;
        self.trending_period = persisted.trending_period;
    }
}

#[derive(Debug)]
pub struct TrendingStore {
    state: Container<TrendingState>,
    backend: Arc<dyn ResourceBackend>,
}

impl TrendingStore {
    pub fn new(backend: Arc<dyn ResourceBackend>, storage: Arc<dyn LocalStorage>) -> Self {
        Self {
            state: Container::new(keys::TRENDING_STORE, storage, TrendingState::default()),
            backend,
        }
    }

    pub fn hydrate(&self) -> Result<bool> {
        self.state.hydrate()
    }

    pub fn snapshot(&self) -> TrendingState {
        self.state.snapshot()
    }

    pub fn subscribe(&self) -> watch::Receiver<TrendingState> {
        self.state.subscribe()
    }

    pub async fn load_trending(&self) {
        let period = self.state.read(|s| s.trending_period);
        self.state.update(|s| {
            s.is_loading_trending = true;
            s.trending_error = None;
        });

        let params = TrendingParams {
            period: Some(period),
            limit: Some(TRENDING_LIMIT),
        };
        match self.backend.trending_articles(&params).await {
            Ok(response) => self.state.update(|s| s.trending_articles = response.articles),
            Err(e) => {
                warn!("❌ Failed to load {} trending articles: {}", period, e);
                self.state.update(|s| {
                    s.trending_error = Some(e.user_message("Failed to load trending articles"))
                });
            }
        }

        self.state.update(|s| s.is_loading_trending = false);
    }

    pub async fn set_period(&self, period: TrendingPeriod) {
        self.state.update(|s| s.trending_period = period);
        self.load_trending().await;
    }

    pub async fn refresh(&self) {
        self.load_trending().await;
    }
}
