use kfc_core::{Article, Error, GraphData, ResourceBackend, Result};
use kfc_storage::{keys, LocalStorage};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{debug, warn};

use crate::container::{Container, Persist};
use crate::graph::build_graph;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FavoriteViewMode {
    #[default]
    Graph,
    Timeline,
}

impl fmt::Display for FavoriteViewMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FavoriteViewMode::Graph => f.write_str("graph"),
            FavoriteViewMode::Timeline => f.write_str("timeline"),
        }
    }
}

impl FromStr for FavoriteViewMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "graph" => Ok(FavoriteViewMode::Graph),
            "timeline" => Ok(FavoriteViewMode::Timeline),
            other => Err(Error::Validation(format!("Unknown view mode: {}", other))),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct FavoriteState {
    pub favorite_articles: Vec<Article>,
    pub view_mode: FavoriteViewMode,
    pub graph_data: GraphData,
    pub is_loading_favorites: bool,
    pub is_favoriting: bool,
    pub is_unfavoriting: bool,
    pub favorite_error: Option<String>,
}

impl FavoriteState {
    fn set_favorites(&mut self, articles: Vec<Article>) {
        self.graph_data = build_graph(&articles);
        self.favorite_articles = articles;
    }
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PersistedFavorites {
    favorite_articles: Vec<Article>,
    favorite_view_mode: FavoriteViewMode,
}

impl Persist for FavoriteState {
    type Persisted = PersistedFavorites;

    fn persisted(&self) -> PersistedFavorites {
        PersistedFavorites {
            favorite_articles: self.favorite_articles.clone(),
            favorite_view_mode: self.view_mode,
        }
    }

    fn restore(&mut self, persisted: PersistedFavorites) {
        self.view_mode = persisted.favorite_view_mode;
        self.set_favorites(persisted.favorite_articles);
    }
}

/// Favourite articles and the graph built from them.
#[derive(Debug)]
pub struct FavoriteStore {
    state: Container<FavoriteState>,
    backend: Arc<dyn ResourceBackend>,
}

impl FavoriteStore {
    pub fn new(backend: Arc<dyn ResourceBackend>, storage: Arc<dyn LocalStorage>) -> Self {
        Self {
            state: Container::new(keys::FAVORITE_STORE, storage, FavoriteState::default()),
            backend,
        }
    }

    pub fn hydrate(&self) -> Result<bool> {
        self.state.hydrate()
    }

    pub fn snapshot(&self) -> FavoriteState {
        self.state.snapshot()
    }

    pub fn subscribe(&self) -> watch::Receiver<FavoriteState> {
        self.state.subscribe()
    }

    pub fn graph_data(&self) -> GraphData {
        self.state.read(|s| s.graph_data.clone())
    }

    pub fn is_favorite(&self, article_id: &str) -> bool {
        self.state
            .read(|s| s.favorite_articles.iter().any(|a| a.id == article_id))
    }

    pub async fn load_favorites(&self) {
        self.state.update(|s| {
            s.is_loading_favorites = true;
            s.favorite_error = None;
        });

        match self.backend.get_favorites().await {
            Ok(response) => {
                let articles = response.articles.into_iter().map(Article::from).collect();
                self.state.update(|s| s.set_favorites(articles));
            }
            Err(e) => {
                warn!("❌ Failed to load favorites: {}", e);
                self.state
                    .update(|s| s.favorite_error = Some(e.user_message("Failed to load favorites")));
            }
        }

        self.state.update(|s| s.is_loading_favorites = false);
    }

    /// Marks the article as favourite and appends its full record.
    pub async fn add_to_favorites(&self, article_id: &str) {
        if self.is_favorite(article_id) {
            debug!("⭐ Article {} already a favorite", article_id);
            return;
        }

        self.state.update(|s| {
            s.is_favoriting = true;
            s.favorite_error = None;
        });

        let added = async {
            self.backend.add_favorite(article_id).await?;
            self.backend.get_article(article_id).await
        };
        match added.await {
            Ok(article) => self.state.update(|s| {
                if !s.favorite_articles.iter().any(|a| a.id == article.id) {
                    let mut articles = std::mem::take(&mut s.favorite_articles);
                    articles.push(article);
                    s.set_favorites(articles);
                }
            }),
            Err(e) => {
                warn!("❌ Failed to favorite {}: {}", article_id, e);
                self.state
                    .update(|s| s.favorite_error = Some(e.user_message("Failed to add favorite")));
            }
        }

        self.state.update(|s| s.is_favoriting = false);
    }

    pub async fn remove_from_favorites(&self, article_id: &str) {
        self.state.update(|s| {
            s.is_unfavoriting = true;
            s.favorite_error = None;
        });

        match self.backend.remove_favorite(article_id).await {
            Ok(()) => self.state.update(|s| {
                let mut articles = std::mem::take(&mut s.favorite_articles);
                articles.retain(|a| a.id != article_id);
                s.set_favorites(articles);
            }),
            Err(e) => {
                warn!("❌ Failed to unfavorite {}: {}", article_id, e);
                self.state.update(|s| {
                    s.favorite_error = Some(e.user_message("Failed to remove favorite"))
                });
            }
        }

        self.state.update(|s| s.is_unfavoriting = false);
    }

    /// Local list first; the server is only asked when not mocking.
    /// Failures count as "not a favourite".
    pub async fn check_favorite_status(&self, article_id: &str) -> bool {
        if self.is_favorite(article_id) {
            return true;
        }
        if self.backend.is_mock() {
            return false;
        }
        match self.backend.favorite_status(article_id).await {
            Ok(is_favorited) => is_favorited,
            Err(e) => {
                warn!("⚠️ Failed to check favorite status of {}: {}", article_id, e);
                false
            }
        }
    }

    pub fn set_view_mode(&self, mode: FavoriteViewMode) {
        self.state.update(|s| s.view_mode = mode);
    }
}
