//! Fixed storage keys shared by the API client, mock handler and containers.

pub const AUTH_TOKEN: &str = "auth_token";

pub const ARTICLE_STORE: &str = "article-storage";
pub const FAVORITE_STORE: &str = "favorite-storage";
pub const TRENDING_STORE: &str = "trending-storage";
pub const SETTINGS_STORE: &str = "settings-storage";
pub const SIDEBAR_STORE: &str = "sidebar-storage";
pub const AUTH_STORE: &str = "auth-storage";

pub const MOCK_ARTICLES: &str = "mock_articles";
pub const MOCK_RAG_RESPONSES: &str = "mock_rag_responses";
pub const MOCK_PUBLIC_IMAGE_PATH: &str = "mock_public_image_path";
pub const MOCK_FAVORITES: &str = "mock_favorites";
pub const MOCK_SETTINGS: &str = "mock_settings";
pub const MOCK_SHELF: &str = "mock_shelf";

pub const SEARCH_HISTORY: &str = "search_history";

/// Keys whose change means the mock fixtures must be reloaded.
pub const MOCK_FIXTURE_KEYS: &[&str] = &[MOCK_ARTICLES, MOCK_RAG_RESPONSES];
