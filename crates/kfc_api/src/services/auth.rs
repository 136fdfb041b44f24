use kfc_core::{AuthResponse, LoginData, RegisterData, Result, UserInfo};
use std::sync::Arc;
use tracing::info;

use crate::endpoints::auth;
use crate::ApiClient;

#[derive(Debug, Clone)]
pub struct AuthService {
    client: Arc<ApiClient>,
}

impl AuthService {
    pub fn new(client: Arc<ApiClient>) -> Self {
        Self { client }
    }

    pub async fn register(&self, data: &RegisterData) -> Result<UserInfo> {
        self.client.post_as(auth::REGISTER, Some(data)).await
    }

    /// Stores the returned access token on the client.
    pub async fn login(&self, data: &LoginData) -> Result<AuthResponse> {
        let response: AuthResponse = self.client.post_as(auth::LOGIN, Some(data)).await?;
        if !response.access_token.is_empty() {
            self.client.set_token(&response.access_token)?;
            info!("🔑 Logged in as {}", data.username);
        }
        Ok(response)
    }

    pub fn logout(&self) -> Result<()> {
        self.client.clear_token()
    }

    pub fn is_authenticated(&self) -> bool {
        self.client.is_authenticated()
    }
}
