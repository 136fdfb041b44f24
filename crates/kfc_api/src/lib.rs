pub mod backends;
pub mod case;
pub mod client;
pub mod endpoints;
pub mod mock;
pub mod services;

pub use backends::{create_backend, BackendKind, HttpBackend, MockBackend};
pub use client::ApiClient;
pub use mock::{MockApiHandler, MockDataEditor, MockDataLoader, MockFixtures, MockLatency};
pub use services::{
    ArticleService, AuthService, FavoriteService, RagService, SettingsService, ShelfService,
};

pub mod prelude {
    pub use crate::backends::{create_backend, BackendKind};
    pub use crate::client::ApiClient;
    pub use crate::mock::{MockApiHandler, MockDataLoader, MockLatency};
    pub use crate::services::{
        ArticleService, AuthService, FavoriteService, RagService, SettingsService, ShelfService,
    };
}
