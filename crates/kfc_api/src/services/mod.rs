//! Thin typed wrappers over [`ApiClient`](crate::ApiClient), one per REST
//! resource.

pub mod articles;
pub mod auth;
pub mod favorites;
pub mod rag;
pub mod settings;
pub mod shelf;

pub use articles::ArticleService;
pub use auth::AuthService;
pub use favorites::FavoriteService;
pub use rag::RagService;
pub use settings::SettingsService;
pub use shelf::ShelfService;
