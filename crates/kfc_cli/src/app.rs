use kfc_api::{create_backend, ApiClient, BackendKind, MockApiHandler, MockDataEditor, MockDataLoader, RagService};
use kfc_core::{EnvConfig, ImageResolver, ResourceBackend, Result};
use kfc_rag::{create_stream_service, RagSession, StreamKind};
use kfc_storage::{create_storage, LocalStorage, StorageKind};
use kfc_store::Stores;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::info;

/// Everything a command needs, wired once at startup.
#[derive(Debug)]
pub struct App {
    pub config: EnvConfig,
    pub storage: Arc<dyn LocalStorage>,
    pub loader: Arc<MockDataLoader>,
    pub client: Arc<ApiClient>,
    pub backend: Arc<dyn ResourceBackend>,
    pub stores: Stores,
    pub rag: RagSession,
    watcher: JoinHandle<()>,
}

impl App {
    pub async fn compose(config: EnvConfig, stream_kind: StreamKind) -> Result<Self> {
        let storage = create_storage(&StorageKind::file_in(config.data_dir.clone())?)?;

        let loader = Arc::new(MockDataLoader::new(
            storage.clone(),
            config.public_image_path.clone(),
        ));
        loader.load()?;
        let watcher = loader.watch();

        let mock = Arc::new(MockApiHandler::with_fixtures(storage.clone(), loader.fixtures()));
        let client = Arc::new(
            ApiClient::new(config.api_url.clone(), storage.clone(), mock.clone())
                .with_mock_mode(config.use_mock_data),
        );
        let backend = create_backend(
            BackendKind::from_mock_flag(config.use_mock_data),
            client.clone(),
            mock,
        )?;

        let stores = Stores::new(backend.clone(), storage.clone());
        stores.hydrate_all();

        let service = create_stream_service(stream_kind, client.clone(), &config)?;
        let rag = RagSession::new(service).with_datasets(RagService::new(client.clone()));

        info!("✨ KFC client ready");
        Ok(Self {
            config,
            storage,
            loader,
            client,
            backend,
            stores,
            rag,
            watcher,
        })
    }

    pub fn images(&self) -> ImageResolver {
        self.loader.image_resolver()
    }

    pub fn editor(&self) -> MockDataEditor {
        MockDataEditor::new(self.storage.clone())
    }
}

impl Drop for App {
    fn drop(&mut self) {
        self.watcher.abort();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kfc_store::SidebarType;

    #[tokio::test]
    async fn test_compose_in_mock_mode() {
        let dir = tempfile::tempdir().unwrap();
        let config = EnvConfig::default().with_data_dir(dir.path());

        let app = App::compose(config.clone(), StreamKind::Mock).await.unwrap();
        assert!(app.backend.is_mock());
        assert!(app.client.is_mock_mode());
        app.stores.sidebar.set_active_sidebar(SidebarType::Settings);
        drop(app);

        let app = App::compose(config, StreamKind::Mock).await.unwrap();
        assert_eq!(app.stores.sidebar.snapshot().active_sidebar, SidebarType::Settings);
        assert_eq!(app.images().public_prefix(), Some("http://localhost:3000/"));
    }
}
