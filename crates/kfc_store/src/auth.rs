use kfc_core::{ResourceBackend, Result, User};
use kfc_storage::{keys, LocalStorage};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{info, warn};

use crate::container::{Container, Persist};

const INVALID_CREDENTIALS: &str = "Invalid username or password";

#[derive(Debug, Clone, Default)]
pub struct AuthState {
    pub is_authenticated: bool,
    pub is_loading: bool,
    pub user: Option<User>,
    pub error: Option<String>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PersistedAuth {
    is_authenticated: bool,
    user: Option<User>,
}

impl Persist for AuthState {
    type Persisted = PersistedAuth;

    fn persisted(&self) -> PersistedAuth {
        PersistedAuth {
            is_authenticated: self.is_authenticated,
            user: self.user.clone(),
        }
    }

    fn restore(&mut self, persisted: PersistedAuth) {
        self.is_authenticated = persisted.is_authenticated;
        self.user = persisted.user;
    }
}

#[derive(Debug)]
pub struct AuthStore {
    state: Container<AuthState>,
    backend: Arc<dyn ResourceBackend>,
}

impl AuthStore {
    pub fn new(backend: Arc<dyn ResourceBackend>, storage: Arc<dyn LocalStorage>) -> Self {
        Self {
            state: Container::new(keys::AUTH_STORE, storage, AuthState::default()),
            backend,
        }
    }

    pub fn hydrate(&self) -> Result<bool> {
        self.state.hydrate()
    }

    pub fn snapshot(&self) -> AuthState {
        self.state.snapshot()
    }

    pub fn subscribe(&self) -> watch::Receiver<AuthState> {
        self.state.subscribe()
    }

    /// Returns whether the user is now signed in.
    pub async fn login(&self, username: &str, password: &str) -> bool {
        self.state.update(|s| {
            s.is_loading = true;
            s.error = None;
        });

        let signed_in = match self.backend.login(username, password).await {
            Ok(Some(user)) => {
                info!("🔓 Signed in as {}", user.username);
                self.state.update(|s| {
                    s.is_authenticated = true;
                    s.user = Some(user);
                });
                true
            }
            Ok(None) => {
                self.state
                    .update(|s| s.error = Some(INVALID_CREDENTIALS.to_string()));
                false
            }
            Err(e) => {
                warn!("❌ Login for {} failed: {}", username, e);
                self.state
                    .update(|s| s.error = Some(e.user_message("Login failed")));
                false
            }
        };

        self.state.update(|s| s.is_loading = false);
        signed_in
    }

    pub async fn register(&self, username: &str, email: &str, password: &str) -> bool {
        self.state.update(|s| {
            s.is_loading = true;
            s.error = None;
        });

        let registered = match self.backend.register(username, email, password).await {
            Ok(user) => {
                info!("🆕 Registered {}", user.username);
                self.state.update(|s| {
                    s.is_authenticated = true;
                    s.user = Some(user);
                });
                true
            }
            Err(e) => {
                warn!("❌ Registration for {} failed: {}", username, e);
                self.state
                    .update(|s| s.error = Some(e.user_message("Registration failed")));
                false
            }
        };

        self.state.update(|s| s.is_loading = false);
        registered
    }

    /// Local state is cleared even when the backend call fails.
    pub async fn logout(&self) {
        if let Err(e) = self.backend.logout().await {
            warn!("⚠️ Backend logout failed: {}", e);
        }
        self.state.update(|s| {
            s.is_authenticated = false;
            s.user = None;
            s.error = None;
        });
    }

    pub fn clear_error(&self) {
        self.state.update(|s| s.error = None);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kfc_api::{MockApiHandler, MockBackend, MockLatency};
    use kfc_storage::{LocalStorageExt, MemoryStorage};
    use serde_json::Value;
    use std::time::Duration;

    fn store() -> (AuthStore, Arc<dyn LocalStorage>) {
        let storage: Arc<dyn LocalStorage> = Arc::new(MemoryStorage::new());
        let handler = MockApiHandler::new(storage.clone()).with_latency(MockLatency::none());
        let backend = MockBackend::new(Arc::new(handler)).with_auth_delay(Duration::ZERO);
        (AuthStore::new(Arc::new(backend), storage.clone()), storage)
    }

    #[tokio::test]
    async fn test_login_and_logout() {
        let (store, storage) = store();
        assert!(!store.login("demo", "nope").await);
        assert_eq!(store.snapshot().error.as_deref(), Some(INVALID_CREDENTIALS));

        assert!(store.login("demo", "demo123").await);
        let state = store.snapshot();
        assert!(state.is_authenticated);
        assert_eq!(state.error, None);
        assert_eq!(state.user.unwrap().email, "demo@example.com");

        let persisted: Value = storage.get_json(keys::AUTH_STORE).unwrap().unwrap();
        assert_eq!(persisted["state"]["isAuthenticated"], true);
        assert!(persisted["state"].get("isLoading").is_none());

        store.logout().await;
        let state = store.snapshot();
        assert!(!state.is_authenticated);
        assert!(state.user.is_none());
    }

    #[tokio::test]
    async fn test_register_duplicate_reports_message() {
        let (store, _) = store();
        assert!(!store.register("test", "other@example.com", "pw").await);
        assert_eq!(store.snapshot().error.as_deref(), Some("Username already exists"));
        store.clear_error();
        assert_eq!(store.snapshot().error, None);

        assert!(store.register("reader", "reader@example.com", "pw").await);
        assert!(store.snapshot().is_authenticated);
    }
}
