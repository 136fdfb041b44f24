pub mod backend;
pub mod config;
pub mod error;
pub mod images;
pub mod types;

pub use backend::ResourceBackend;
pub use config::EnvConfig;
pub use error::{Error, Result};
pub use images::ImageResolver;
pub use types::*;

pub mod prelude {
    pub use crate::backend::ResourceBackend;
    pub use crate::config::EnvConfig;
    pub use crate::images::ImageResolver;
    pub use crate::types::{Article, FavoriteArticle, SearchResult, Settings, ShelfArticle};
    pub use crate::{Error, Result};
}
