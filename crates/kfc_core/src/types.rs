use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::{Error, Result};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Author {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bio: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Reference {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub url: String,
}

/// A paper as served by `/articles`. `id` is the only equality key used
/// across containers.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Article {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub image_url: String,
    #[serde(default)]
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub published_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reading_time: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub views: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub popularity_score: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub citations: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub authors: Option<Vec<Author>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub references: Option<Vec<Reference>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
}

impl Article {
    /// Case-insensitive match on title, content and tags.
    pub fn matches(&self, query: &str) -> bool {
        let query = query.to_lowercase();
        self.title.to_lowercase().contains(&query)
            || self.content.to_lowercase().contains(&query)
            || self
                .tags
                .as_ref()
                .map(|tags| tags.iter().any(|t| t.to_lowercase().contains(&query)))
                .unwrap_or(false)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShelfArticle {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub image_url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub saved_at: Option<String>,
}

impl From<&Article> for ShelfArticle {
    fn from(article: &Article) -> Self {
        Self {
            id: article.id.clone(),
            title: article.title.clone(),
            image_url: article.image_url.clone(),
            saved_at: Some(Utc::now().to_rfc3339()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FavoriteArticle {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub image_url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub favorited_at: Option<String>,
}

impl From<&Article> for FavoriteArticle {
    fn from(article: &Article) -> Self {
        Self {
            id: article.id.clone(),
            title: article.title.clone(),
            image_url: article.image_url.clone(),
            favorited_at: Some(Utc::now().to_rfc3339()),
        }
    }
}

impl From<FavoriteArticle> for Article {
    fn from(favorite: FavoriteArticle) -> Self {
        Self {
            id: favorite.id,
            title: favorite.title,
            image_url: favorite.image_url,
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchResult {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub image_url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub published_at: Option<String>,
    #[serde(default, alias = "relevance", skip_serializing_if = "Option::is_none")]
    pub relevance_score: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
}

// --- response envelopes ---

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArticleListResponse {
    pub articles: Vec<Article>,
    pub total_count: usize,
    pub current_page: usize,
    pub total_pages: usize,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchResultResponse {
    pub results: Vec<SearchResult>,
    pub total_count: usize,
    pub current_page: usize,
    pub total_pages: usize,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TrendingResponse {
    pub articles: Vec<Article>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ShelfResponse {
    pub articles: Vec<ShelfArticle>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FavoritesResponse {
    pub articles: Vec<FavoriteArticle>,
    #[serde(default)]
    pub total_count: usize,
    #[serde(default)]
    pub current_page: usize,
    #[serde(default)]
    pub total_pages: usize,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FavoriteStatusResponse {
    pub is_favorited: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SuccessResponse {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub message: Option<String>,
}

// --- request parameters ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    Asc,
    Desc,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArticleListParams {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page_size: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sort_by: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sort_order: Option<SortOrder>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub author_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date_from: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date_to: Option<String>,
}

impl ArticleListParams {
    pub fn page(page: usize) -> Self {
        Self { page: Some(page), ..Default::default() }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchParams {
    pub query: String,
    #[serde(flatten)]
    pub list: ArticleListParams,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reading_time_min: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reading_time_max: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub views_min: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub views_max: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exact_match: Option<bool>,
}

impl SearchParams {
    pub fn query(query: impl Into<String>) -> Self {
        Self { query: query.into(), ..Default::default() }
    }
}

/// Window used to rank the trending list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrendingPeriod {
    Day,
    #[default]
    Week,
    Month,
}

impl TrendingPeriod {
    pub fn as_str(&self) -> &'static str {
        match self {
            TrendingPeriod::Day => "day",
            TrendingPeriod::Week => "week",
            TrendingPeriod::Month => "month",
        }
    }
}

impl fmt::Display for TrendingPeriod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TrendingPeriod {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "day" => Ok(TrendingPeriod::Day),
            "week" => Ok(TrendingPeriod::Week),
            "month" => Ok(TrendingPeriod::Month),
            other => Err(Error::Validation(format!("Unknown trending period: {}", other))),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TrendingParams {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub period: Option<TrendingPeriod>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<usize>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FavoritesParams {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page_size: Option<usize>,
}

// --- settings ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ThemeMode {
    Light,
    #[default]
    Dark,
    Auto,
}

impl FromStr for ThemeMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "light" => Ok(ThemeMode::Light),
            "dark" => Ok(ThemeMode::Dark),
            "auto" => Ok(ThemeMode::Auto),
            other => Err(Error::Validation(format!("Unknown theme: {}", other))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ArticleDisplay {
    #[default]
    Card,
    List,
}

impl FromStr for ArticleDisplay {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "card" => Ok(ArticleDisplay::Card),
            "list" => Ok(ArticleDisplay::List),
            other => Err(Error::Validation(format!("Unknown article display: {}", other))),
        }
    }
}

/// Included and excluded topics. A topic is never in both lists.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentPreferences {
    #[serde(default)]
    pub topics: Vec<String>,
    #[serde(default)]
    pub excluded_topics: Vec<String>,
}

impl ContentPreferences {
    /// Adds `topic` to the included list, dropping it from the excluded one.
    /// Returns false when the topic was blank or already included.
    pub fn include(&mut self, topic: &str) -> bool {
        let topic = topic.trim();
        if topic.is_empty() || self.topics.iter().any(|t| t == topic) {
            return false;
        }
        self.excluded_topics.retain(|t| t != topic);
        self.topics.push(topic.to_string());
        true
    }

    pub fn exclude(&mut self, topic: &str) -> bool {
        let topic = topic.trim();
        if topic.is_empty() || self.excluded_topics.iter().any(|t| t == topic) {
            return false;
        }
        self.topics.retain(|t| t != topic);
        self.excluded_topics.push(topic.to_string());
        true
    }

    pub fn remove_included(&mut self, topic: &str) {
        self.topics.retain(|t| t != topic);
    }

    pub fn remove_excluded(&mut self, topic: &str) {
        self.excluded_topics.retain(|t| t != topic);
    }
}

pub const ARTICLES_PER_PAGE_MIN: u32 = 5;
pub const ARTICLES_PER_PAGE_MAX: u32 = 50;
pub const ARTICLES_PER_PAGE_STEP: u32 = 5;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Settings {
    pub theme: ThemeMode,
    pub article_display: ArticleDisplay,
    pub notifications_enabled: bool,
    pub email_notifications: bool,
    pub language: String,
    pub articles_per_page: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content_preferences: Option<ContentPreferences>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            theme: ThemeMode::Dark,
            article_display: ArticleDisplay::Card,
            notifications_enabled: true,
            email_notifications: false,
            language: "zh-CN".to_string(),
            articles_per_page: 20,
            content_preferences: None,
            updated_at: None,
        }
    }
}

impl Settings {
    /// Email notifications only count while in-app notifications are on.
    pub fn email_notifications_effective(&self) -> bool {
        self.notifications_enabled && self.email_notifications
    }

    pub fn validate_articles_per_page(value: u32) -> Result<()> {
        if !(ARTICLES_PER_PAGE_MIN..=ARTICLES_PER_PAGE_MAX).contains(&value)
            || value % ARTICLES_PER_PAGE_STEP != 0
        {
            return Err(Error::Validation(format!(
                "Articles per page must be between {} and {} in steps of {}, got {}",
                ARTICLES_PER_PAGE_MIN, ARTICLES_PER_PAGE_MAX, ARTICLES_PER_PAGE_STEP, value
            )));
        }
        Ok(())
    }

    pub fn apply(&mut self, patch: &SettingsPatch) {
        if let Some(theme) = patch.theme {
            self.theme = theme;
        }
        if let Some(display) = patch.article_display {
            self.article_display = display;
        }
        if let Some(enabled) = patch.notifications_enabled {
            self.notifications_enabled = enabled;
        }
        if let Some(email) = patch.email_notifications {
            self.email_notifications = email;
        }
        if let Some(language) = &patch.language {
            self.language = language.clone();
        }
        if let Some(per_page) = patch.articles_per_page {
            self.articles_per_page = per_page;
        }
        if let Some(prefs) = &patch.content_preferences {
            self.content_preferences = Some(prefs.clone());
        }
    }
}

/// Partial settings update. Unset fields are left untouched.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SettingsPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub theme: Option<ThemeMode>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub article_display: Option<ArticleDisplay>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notifications_enabled: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email_notifications: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub articles_per_page: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content_preferences: Option<ContentPreferences>,
}

impl SettingsPatch {
    pub fn validate(&self) -> Result<()> {
        if let Some(per_page) = self.articles_per_page {
            Settings::validate_articles_per_page(per_page)?;
        }
        Ok(())
    }
}

impl From<&Settings> for SettingsPatch {
    fn from(settings: &Settings) -> Self {
        Self {
            theme: Some(settings.theme),
            article_display: Some(settings.article_display),
            notifications_enabled: Some(settings.notifications_enabled),
            email_notifications: Some(settings.email_notifications),
            language: Some(settings.language.clone()),
            articles_per_page: Some(settings.articles_per_page),
            content_preferences: settings.content_preferences.clone(),
        }
    }
}

// --- RAG ---

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RagSourceMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub article_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RagSource {
    pub id: String,
    pub title: String,
    pub content: String,
    pub relevance: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<RagSourceMetadata>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RagResponse {
    pub answer: String,
    #[serde(default)]
    pub sources: Vec<RagSource>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RagDataset {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub article_count: usize,
    #[serde(default)]
    pub ragflow_dataset_id: String,
    #[serde(default)]
    pub created_at: String,
    #[serde(default)]
    pub updated_at: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RagDatasetListResponse {
    pub datasets: Vec<RagDataset>,
    #[serde(default)]
    pub total_count: usize,
    #[serde(default)]
    pub current_page: usize,
    #[serde(default)]
    pub total_pages: usize,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RagDatasetListParams {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page_size: Option<usize>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CreateDatasetParams {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RagQueryParams {
    pub dataset_id: String,
    pub question: String,
}

/// Citation attached to an assistant message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceCitation {
    pub id: String,
    pub title: String,
    pub content: String,
    pub relevance: f64,
}

impl From<RagSource> for SourceCitation {
    fn from(source: RagSource) -> Self {
        Self {
            id: source.id,
            title: source.title,
            content: source.content,
            relevance: source.relevance,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

/// One transcript entry. An assistant message stops changing once
/// `is_streaming` is false.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub id: String,
    pub role: Role,
    pub content: String,
    #[serde(default)]
    pub is_streaming: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sources: Option<Vec<SourceCitation>>,
}

// --- favourites graph ---

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphNode {
    pub id: String,
    pub name: String,
    pub val: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub article_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphLink {
    pub source: String,
    pub target: String,
    pub value: u32,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub link_type: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct GraphData {
    pub nodes: Vec<GraphNode>,
    pub links: Vec<GraphLink>,
}

// --- auth ---

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthResponse {
    pub access_token: String,
    #[serde(default)]
    pub token_type: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegisterData {
    pub email: String,
    pub password: String,
    pub username: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginData {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserInfo {
    pub id: String,
    pub email: String,
    pub username: String,
    #[serde(default)]
    pub is_active: bool,
    #[serde(default)]
    pub created_at: String,
    #[serde(default)]
    pub updated_at: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,
    pub username: String,
    pub email: String,
    pub created_at: DateTime<Utc>,
}

impl From<UserInfo> for User {
    fn from(info: UserInfo) -> Self {
        let created_at = DateTime::parse_from_rfc3339(&info.created_at)
            .map(|dt| dt.with_timezone(&Utc))
            .unwrap_or_else(|_| Utc::now());
        Self {
            id: info.id,
            username: info.username,
            email: info.email,
            created_at,
        }
    }
}
