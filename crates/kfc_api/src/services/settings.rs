use kfc_core::{Result, Settings, SettingsPatch};
use std::sync::Arc;

use crate::endpoints::settings;
use crate::ApiClient;

#[derive(Debug, Clone)]
pub struct SettingsService {
    client: Arc<ApiClient>,
}

impl SettingsService {
    pub fn new(client: Arc<ApiClient>) -> Self {
        Self { client }
    }

    pub async fn get(&self) -> Result<Settings> {
        self.client.get_as::<_, ()>(settings::GET, None).await
    }

    pub async fn update(&self, patch: &SettingsPatch) -> Result<Settings> {
        self.client.put_as(settings::UPDATE, Some(patch)).await
    }
}
