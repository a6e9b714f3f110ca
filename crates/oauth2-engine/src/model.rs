//! The storage capability the engine is parameterized over.
//!
//! Embedders implement [`Model`] on top of their own database or cache.
//! Only [`Model::get_client`] is mandatory; every grant- or endpoint-specific
//! operation has a default body that fails with `invalid_argument`, so a model
//! only implements what the flows it enables actually call. The generator and
//! validation hooks default to the engine's built-in behaviour.
//!
//! Operations return `anyhow::Result`. An [`OAuthError`] raised inside a model
//! passes through unchanged; any other error reaches the caller as
//! `server_error` with the original kept as its source.

use async_trait::async_trait;

use crate::error::OAuthError;
use crate::types::{AuthorizationCode, Client, RefreshToken, Scope, Token, TokenRef};

fn not_implemented(operation: &str) -> anyhow::Error {
    OAuthError::invalid_argument(format!(
        "Invalid argument: model does not implement `{operation}()`"
    ))
    .into()
}

#[async_trait]
pub trait Model: Send + Sync {
    /// Resource owner representation. Never inspected by the engine.
    type User: Clone + Send + Sync + 'static;

    /// Look up a client. `client_secret` is `None` when the grant does not
    /// authenticate the client (PKCE, public clients).
    async fn get_client(
        &self,
        client_id: &str,
        client_secret: Option<&str>,
    ) -> anyhow::Result<Option<Client>>;

    /// Look up a client by id alone, for the authorization endpoint.
    ///
    /// Defaults to [`Model::get_client`] without a secret. Models that reject
    /// secret-less lookups of confidential clients override this.
    async fn get_client_by_id(&self, client_id: &str) -> anyhow::Result<Option<Client>> {
        self.get_client(client_id, None).await
    }

    /// Persist a freshly minted token and return it with `client` and `user` attached.
    async fn save_token(
        &self,
        _token: Token<Self::User>,
        _client: &Client,
        _user: &Self::User,
    ) -> anyhow::Result<Token<Self::User>> {
        Err(not_implemented("save_token"))
    }

    async fn get_access_token(
        &self,
        _access_token: &str,
    ) -> anyhow::Result<Option<Token<Self::User>>> {
        Err(not_implemented("get_access_token"))
    }

    async fn get_refresh_token(
        &self,
        _refresh_token: &str,
    ) -> anyhow::Result<Option<RefreshToken<Self::User>>> {
        Err(not_implemented("get_refresh_token"))
    }

    async fn get_authorization_code(
        &self,
        _authorization_code: &str,
    ) -> anyhow::Result<Option<AuthorizationCode<Self::User>>> {
        Err(not_implemented("get_authorization_code"))
    }

    /// Persist an authorization code and return it with `client` and `user` attached.
    async fn save_authorization_code(
        &self,
        _code: AuthorizationCode<Self::User>,
        _client: &Client,
        _user: &Self::User,
    ) -> anyhow::Result<AuthorizationCode<Self::User>> {
        Err(not_implemented("save_authorization_code"))
    }

    /// Revoke an access or refresh token.
    ///
    /// Returning `false` during refresh-token rotation is treated as a reuse
    /// attempt. Implementations must make this atomic with respect to
    /// concurrent lookups of the same token.
    async fn revoke_token(&self, _token: TokenRef<'_, Self::User>) -> anyhow::Result<bool> {
        Err(not_implemented("revoke_token"))
    }

    /// Mark an authorization code as used.
    ///
    /// Must return `true` for exactly one caller per code; `false` fails the
    /// exchange with `invalid_grant`.
    async fn revoke_authorization_code(
        &self,
        _code: &AuthorizationCode<Self::User>,
    ) -> anyhow::Result<bool> {
        Err(not_implemented("revoke_authorization_code"))
    }

    /// Resolve resource owner credentials (password grant).
    async fn get_user(
        &self,
        _username: &str,
        _password: &str,
        _client: &Client,
    ) -> anyhow::Result<Option<Self::User>> {
        Err(not_implemented("get_user"))
    }

    /// The user a client acts as (client credentials grant).
    async fn get_user_from_client(&self, _client: &Client) -> anyhow::Result<Option<Self::User>> {
        Err(not_implemented("get_user_from_client"))
    }

    /// Whether `token` grants every scope in `scope`.
    async fn verify_scope(
        &self,
        _token: &Token<Self::User>,
        _scope: &[String],
    ) -> anyhow::Result<bool> {
        Err(not_implemented("verify_scope"))
    }

    /// Custom access token value. `None` falls back to a random token.
    async fn generate_access_token(
        &self,
        _client: &Client,
        _user: &Self::User,
        _scope: &[String],
    ) -> anyhow::Result<Option<String>> {
        Ok(None)
    }

    /// Custom refresh token value. `None` falls back to a random token.
    async fn generate_refresh_token(
        &self,
        _client: &Client,
        _user: &Self::User,
        _scope: &[String],
    ) -> anyhow::Result<Option<String>> {
        Ok(None)
    }

    /// Custom authorization code value. `None` falls back to a random code.
    async fn generate_authorization_code(
        &self,
        _client: &Client,
        _user: &Self::User,
        _scope: &[String],
    ) -> anyhow::Result<Option<String>> {
        Ok(None)
    }

    /// Narrow or reject a requested scope. `None` rejects with `invalid_scope`.
    ///
    /// The default accepts the scope unchanged.
    async fn validate_scope(
        &self,
        _user: &Self::User,
        _client: &Client,
        scope: &[String],
    ) -> anyhow::Result<Option<Scope>> {
        Ok(Some(scope.to_vec()))
    }

    /// Whether `redirect_uri` may be used with `client`.
    ///
    /// The default requires an exact match against the registered URIs.
    async fn validate_redirect_uri(
        &self,
        redirect_uri: &str,
        client: &Client,
    ) -> anyhow::Result<bool> {
        Ok(client.redirect_uris.iter().any(|uri| uri == redirect_uri))
    }
}
