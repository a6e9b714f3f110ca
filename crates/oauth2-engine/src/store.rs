//! In-memory [`Model`] for tests and prototyping.
//!
//! Users are identified by their username. Revocation removes the record under
//! the write lock and reports whether anything was removed, so concurrent
//! redemptions of one code or refresh token see exactly one `true`.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;

use crate::model::Model;
use crate::types::{AuthorizationCode, Client, RefreshToken, Token, TokenRef};

/// Cleanup interval: 5 minutes.
const CLEANUP_INTERVAL: Duration = Duration::from_secs(300);

struct ClientEntry {
    client: Client,
    secret: Option<String>,
    /// User the client acts as under `client_credentials`.
    service_user: Option<String>,
}

/// In-memory OAuth state store.
#[derive(Clone)]
pub struct MemoryStore {
    clients: Arc<RwLock<HashMap<String, ClientEntry>>>,
    users: Arc<RwLock<HashMap<String, String>>>,
    auth_codes: Arc<RwLock<HashMap<String, AuthorizationCode<String>>>>,
    access_tokens: Arc<RwLock<HashMap<String, Token<String>>>>,
    refresh_tokens: Arc<RwLock<HashMap<String, RefreshToken<String>>>>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self {
            clients: Arc::new(RwLock::new(HashMap::new())),
            users: Arc::new(RwLock::new(HashMap::new())),
            auth_codes: Arc::new(RwLock::new(HashMap::new())),
            access_tokens: Arc::new(RwLock::new(HashMap::new())),
            refresh_tokens: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Register a client. `secret` of `None` makes it a public client.
    pub async fn register_client(&self, client: Client, secret: Option<&str>) {
        tracing::debug!(client_id = %client.id, public = secret.is_none(), "Registered client");
        self.clients.write().await.insert(
            client.id.clone(),
            ClientEntry { client, secret: secret.map(str::to_owned), service_user: None },
        );
    }

    /// Let `client_id` obtain tokens as `username` through `client_credentials`.
    ///
    /// Returns `false` if the client is unknown.
    pub async fn set_service_user(&self, client_id: &str, username: &str) -> bool {
        let mut clients = self.clients.write().await;
        let Some(entry) = clients.get_mut(client_id) else {
            return false;
        };
        entry.service_user = Some(username.to_owned());
        true
    }

    /// Register a resource owner for the `password` grant.
    pub async fn register_user(&self, username: &str, password: &str) {
        self.users.write().await.insert(username.to_owned(), password.to_owned());
    }

    pub async fn access_token_count(&self) -> usize {
        self.access_tokens.read().await.len()
    }

    pub async fn refresh_token_count(&self) -> usize {
        self.refresh_tokens.read().await.len()
    }

    /// Start background cleanup task for expired tokens and codes.
    pub fn start_cleanup_task(self: Arc<Self>) {
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(CLEANUP_INTERVAL);
            loop {
                interval.tick().await;
                self.cleanup_expired().await;
            }
        });
    }

    /// Drop expired codes and tokens. Returns how many records were removed.
    pub async fn cleanup_expired(&self) -> usize {
        let now = Utc::now();
        let mut removed = 0;

        {
            let mut codes = self.auth_codes.write().await;
            let before = codes.len();
            codes.retain(|_, code| code.expires_at.is_none_or(|at| at > now));
            removed += before - codes.len();
        }

        {
            let mut tokens = self.access_tokens.write().await;
            let before = tokens.len();
            tokens.retain(|_, token| token.access_token_expires_at.is_none_or(|at| at > now));
            let count = before - tokens.len();
            if count > 0 {
                tracing::debug!(count, "Cleaned up expired access tokens");
            }
            removed += count;
        }

        {
            let mut tokens = self.refresh_tokens.write().await;
            let before = tokens.len();
            tokens.retain(|_, token| token.refresh_token_expires_at.is_none_or(|at| at > now));
            let count = before - tokens.len();
            if count > 0 {
                tracing::debug!(count, "Cleaned up expired refresh tokens");
            }
            removed += count;
        }

        removed
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for MemoryStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryStore").finish()
    }
}

#[async_trait]
impl Model for MemoryStore {
    type User = String;

    async fn get_client(
        &self,
        client_id: &str,
        client_secret: Option<&str>,
    ) -> anyhow::Result<Option<Client>> {
        let clients = self.clients.read().await;
        let Some(entry) = clients.get(client_id) else {
            return Ok(None);
        };
        // A client registered with a secret must always present it
        if entry.secret.as_deref().is_some_and(|expected| client_secret != Some(expected)) {
            return Ok(None);
        }
        Ok(Some(entry.client.clone()))
    }

    async fn get_client_by_id(&self, client_id: &str) -> anyhow::Result<Option<Client>> {
        Ok(self.clients.read().await.get(client_id).map(|entry| entry.client.clone()))
    }

    async fn save_token(
        &self,
        mut token: Token<String>,
        client: &Client,
        user: &String,
    ) -> anyhow::Result<Token<String>> {
        token.client = Some(client.clone());
        token.user = Some(user.clone());

        if let Some(refresh_token) = &token.refresh_token {
            self.refresh_tokens.write().await.insert(
                refresh_token.clone(),
                RefreshToken {
                    refresh_token: refresh_token.clone(),
                    refresh_token_expires_at: token.refresh_token_expires_at,
                    scope: token.scope.clone(),
                    client: Some(client.clone()),
                    user: Some(user.clone()),
                },
            );
        }
        self.access_tokens.write().await.insert(token.access_token.clone(), token.clone());

        Ok(token)
    }

    async fn get_access_token(&self, access_token: &str) -> anyhow::Result<Option<Token<String>>> {
        Ok(self.access_tokens.read().await.get(access_token).cloned())
    }

    async fn get_refresh_token(
        &self,
        refresh_token: &str,
    ) -> anyhow::Result<Option<RefreshToken<String>>> {
        Ok(self.refresh_tokens.read().await.get(refresh_token).cloned())
    }

    async fn get_authorization_code(
        &self,
        authorization_code: &str,
    ) -> anyhow::Result<Option<AuthorizationCode<String>>> {
        Ok(self.auth_codes.read().await.get(authorization_code).cloned())
    }

    async fn save_authorization_code(
        &self,
        mut code: AuthorizationCode<String>,
        client: &Client,
        user: &String,
    ) -> anyhow::Result<AuthorizationCode<String>> {
        code.client = Some(client.clone());
        code.user = Some(user.clone());
        self.auth_codes.write().await.insert(code.authorization_code.clone(), code.clone());
        Ok(code)
    }

    async fn revoke_token(&self, token: TokenRef<'_, String>) -> anyhow::Result<bool> {
        let removed = match token {
            TokenRef::Access(token) => {
                self.access_tokens.write().await.remove(&token.access_token).is_some()
            }
            TokenRef::Refresh(token) => {
                self.refresh_tokens.write().await.remove(&token.refresh_token).is_some()
            }
        };
        Ok(removed)
    }

    async fn revoke_authorization_code(
        &self,
        code: &AuthorizationCode<String>,
    ) -> anyhow::Result<bool> {
        Ok(self.auth_codes.write().await.remove(&code.authorization_code).is_some())
    }

    async fn get_user(
        &self,
        username: &str,
        password: &str,
        _client: &Client,
    ) -> anyhow::Result<Option<String>> {
        let users = self.users.read().await;
        Ok(users.get(username).filter(|stored| *stored == password).map(|_| username.to_owned()))
    }

    async fn get_user_from_client(&self, client: &Client) -> anyhow::Result<Option<String>> {
        let clients = self.clients.read().await;
        Ok(clients.get(&client.id).and_then(|entry| entry.service_user.clone()))
    }

    async fn verify_scope(&self, token: &Token<String>, scope: &[String]) -> anyhow::Result<bool> {
        Ok(scope.iter().all(|required| token.scope.contains(required)))
    }
}
