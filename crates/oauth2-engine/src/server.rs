//! One entry point over the four endpoint handlers.

use std::sync::Arc;

use crate::config::{AuthenticateOptions, AuthorizeOptions, EngineConfig, TokenOptions};
use crate::error::OAuthResult;
use crate::grant_types::{ExtendedGrantType, ExtendedGrantTypes};
use crate::handlers::{AuthenticateHandler, AuthorizeHandler, RevokeHandler, TokenHandler};
use crate::model::Model;
use crate::request::Request;
use crate::response::Response;
use crate::types::{AuthorizationCode, Token};

/// OAuth 2.0 authorization server over a [`Model`].
///
/// Holds no per-request state; every call builds a fresh handler from the
/// server's configuration, or from the options passed to the `*_with` variants.
///
/// ```no_run
/// use std::sync::Arc;
///
/// use oauth2_engine::config::EngineConfig;
/// use oauth2_engine::store::MemoryStore;
/// use oauth2_engine::{OAuth2Server, Request, Response};
///
/// # async fn run() -> Result<(), oauth2_engine::OAuthError> {
/// let server = OAuth2Server::new(Arc::new(MemoryStore::new()), EngineConfig::default())?;
///
/// let request = Request::post_form([("grant_type", "password"), ("username", "alice")]);
/// let mut response = Response::new();
/// let _token = server.token(&request, &mut response).await?;
/// # Ok(())
/// # }
/// ```
pub struct OAuth2Server<M: Model> {
    model: Arc<M>,
    config: EngineConfig<M::User>,
    extended_grant_types: ExtendedGrantTypes<M>,
}

impl<M: Model + 'static> OAuth2Server<M> {
    /// # Errors
    ///
    /// `invalid_argument` if a configured lifetime is zero.
    pub fn new(model: Arc<M>, config: EngineConfig<M::User>) -> OAuthResult<Self> {
        config.token.validate()?;
        config.authorize.validate()?;
        Ok(Self { model, config, extended_grant_types: ExtendedGrantTypes::new() })
    }

    /// Accept `grant_type=name` at the token endpoint.
    #[must_use]
    pub fn with_extended_grant_type(
        mut self,
        name: impl Into<String>,
        grant: Arc<dyn ExtendedGrantType<M>>,
    ) -> Self {
        self.extended_grant_types.insert(name.into(), grant);
        self
    }

    #[must_use]
    pub const fn model(&self) -> &Arc<M> {
        &self.model
    }

    #[must_use]
    pub const fn config(&self) -> &EngineConfig<M::User> {
        &self.config
    }

    pub async fn token(
        &self,
        request: &Request,
        response: &mut Response,
    ) -> OAuthResult<Token<M::User>> {
        self.token_with(request, response, self.config.token.clone()).await
    }

    pub async fn token_with(
        &self,
        request: &Request,
        response: &mut Response,
        options: TokenOptions,
    ) -> OAuthResult<Token<M::User>> {
        TokenHandler::new(Arc::clone(&self.model), options)?
            .with_extended_grant_types(self.extended_grant_types.clone())
            .handle(request, response)
            .await
    }

    pub async fn authenticate(
        &self,
        request: &Request,
        response: &mut Response,
    ) -> OAuthResult<Token<M::User>> {
        self.authenticate_with(request, response, self.config.authenticate.clone()).await
    }

    pub async fn authenticate_with(
        &self,
        request: &Request,
        response: &mut Response,
        options: AuthenticateOptions,
    ) -> OAuthResult<Token<M::User>> {
        AuthenticateHandler::new(Arc::clone(&self.model), options).handle(request, response).await
    }

    pub async fn authorize(
        &self,
        request: &Request,
        response: &mut Response,
    ) -> OAuthResult<AuthorizationCode<M::User>> {
        self.authorize_with(request, response, self.config.authorize.clone()).await
    }

    pub async fn authorize_with(
        &self,
        request: &Request,
        response: &mut Response,
        options: AuthorizeOptions<M::User>,
    ) -> OAuthResult<AuthorizationCode<M::User>> {
        AuthorizeHandler::new(Arc::clone(&self.model), options)?.handle(request, response).await
    }

    pub async fn revoke(&self, request: &Request, response: &mut Response) -> OAuthResult<()> {
        RevokeHandler::new(Arc::clone(&self.model)).handle(request, response).await
    }
}

impl<M: Model> std::fmt::Debug for OAuth2Server<M> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OAuth2Server")
            .field("config", &self.config)
            .field("extended_grant_types", &self.extended_grant_types.keys().collect::<Vec<_>>())
            .finish_non_exhaustive()
    }
}
