use lazy_static::lazy_static;
use std::env;
use std::path::PathBuf;

pub const DEFAULT_API_URL: &str = "http://localhost:8000/api/v1";
pub const DEFAULT_RAGFLOW_API_URL: &str = "http://localhost:8000";
pub const DEFAULT_PUBLIC_IMAGE_PATH: &str = "http://localhost:3000/";

pub const DEFAULT_PAGE_SIZE: usize = 10;
pub const MAX_PAGE_NUMBER: usize = 100;

lazy_static! {
    static ref GLOBAL: EnvConfig = EnvConfig::from_env();
}

/// Build/run-time switches, read once.
#[derive(Debug, Clone, PartialEq)]
pub struct EnvConfig {
    pub api_url: String,
    pub use_mock_data: bool,
    pub use_mock_service: bool,
    pub ragflow_api_url: String,
    pub public_image_path: Option<String>,
    pub show_debug_info: bool,
    pub data_dir: Option<PathBuf>,
}

impl Default for EnvConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            use_mock_data: true,
            use_mock_service: true,
            ragflow_api_url: DEFAULT_RAGFLOW_API_URL.to_string(),
            public_image_path: Some(DEFAULT_PUBLIC_IMAGE_PATH.to_string()),
            show_debug_info: false,
            data_dir: None,
        }
    }
}

impl EnvConfig {
    /// Snapshot of the process environment taken on first access.
    pub fn global() -> &'static EnvConfig {
        &GLOBAL
    }

    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Resolves the configuration through an arbitrary lookup so callers
    /// (and tests) need not touch the real environment.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        Self {
            api_url: non_empty("KFC_API_URL").unwrap_or(defaults.api_url),
            // Mock mode stays on unless explicitly disabled.
            use_mock_data: lookup("KFC_USE_MOCK_DATA").as_deref() != Some("false"),
            use_mock_service: lookup("KFC_USE_MOCK_SERVICE").as_deref() != Some("false"),
            ragflow_api_url: non_empty("KFC_RAGFLOW_API_URL").unwrap_or(defaults.ragflow_api_url),
            public_image_path: non_empty("KFC_PUBLIC_IMAGE_PATH").or(defaults.public_image_path),
            show_debug_info: lookup("KFC_SHOW_DEBUG_INFO").as_deref() == Some("true"),
            data_dir: non_empty("KFC_DATA_DIR").map(PathBuf::from),
        }
    }

    pub fn with_api_url(mut self, url: impl Into<String>) -> Self {
        self.api_url = url.into();
        self
    }

    pub fn with_mock_data(mut self, enabled: bool) -> Self {
        self.use_mock_data = enabled;
        self
    }

    pub fn with_mock_service(mut self, enabled: bool) -> Self {
        self.use_mock_service = enabled;
        self
    }

    pub fn with_ragflow_api_url(mut self, url: impl Into<String>) -> Self {
        self.ragflow_api_url = url.into();
        self
    }

    pub fn with_public_image_path(mut self, prefix: Option<String>) -> Self {
        self.public_image_path = prefix;
        self
    }

    pub fn with_data_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.data_dir = Some(dir.into());
        self
    }

    pub fn log_summary(&self) {
        tracing::info!("⚙️ Environment configuration:");
        tracing::info!("  - API URL: {}", self.api_url);
        tracing::info!("  - Mock data: {}", if self.use_mock_data { "yes" } else { "no" });
        tracing::info!("  - Mock service: {}", if self.use_mock_service { "yes" } else { "no" });
        tracing::info!("  - RAGFlow URL: {}", self.ragflow_api_url);
    }
}
