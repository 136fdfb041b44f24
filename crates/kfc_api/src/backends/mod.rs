use kfc_core::{ResourceBackend, Result};
use std::sync::Arc;
use tracing::info;

use crate::mock::MockApiHandler;
use crate::ApiClient;

pub mod http;
pub mod mock;

pub use http::HttpBackend;
pub use mock::{MockBackend, MockUser};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendKind {
    Mock,
    Http,
}

impl BackendKind {
    pub fn from_mock_flag(use_mock_data: bool) -> Self {
        if use_mock_data {
            BackendKind::Mock
        } else {
            BackendKind::Http
        }
    }
}

/// Picks the backend once, when the application is composed.
pub fn create_backend(
    kind: BackendKind,
    client: Arc<ApiClient>,
    mock: Arc<MockApiHandler>,
) -> Result<Arc<dyn ResourceBackend>> {
    let backend: Arc<dyn ResourceBackend> = match kind {
        BackendKind::Mock => Arc::new(MockBackend::new(mock)),
        BackendKind::Http => Arc::new(HttpBackend::new(client)),
    };
    info!("🔌 Using {} backend", backend.name());
    Ok(backend)
}
