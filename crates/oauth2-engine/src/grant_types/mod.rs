//! Grant types: the ways a client exchanges a grant for a token.
//!
//! Every grant implements [`GrantType::handle`]. Built-ins are selected by
//! name through [`create`]; embedders can register further grant types by
//! implementing [`ExtendedGrantType`].

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, TimeDelta, Utc};

use crate::error::{OAuthError, OAuthResult};
use crate::model::Model;
use crate::request::Request;
use crate::types::{Client, Scope, Token, parse_scope, random_token};
use crate::validator;

pub mod authorization_code;
pub mod client_credentials;
pub mod password;
pub mod refresh_token;

pub use authorization_code::AuthorizationCodeGrant;
pub use client_credentials::ClientCredentialsGrant;
pub use password::PasswordGrant;
pub use refresh_token::RefreshTokenGrant;

/// Exchange a grant for a token on behalf of an authenticated client.
#[async_trait]
pub trait GrantType<M: Model>: Send + Sync {
    async fn handle(&self, request: &Request, client: &Client) -> OAuthResult<Token<M::User>>;
}

/// A caller-defined grant type (e.g. `urn:ietf:params:oauth:grant-type:jwt-bearer`).
///
/// Receives the same [`GrantContext`] the built-ins use, so token generation,
/// lifetimes and scope validation behave identically.
#[async_trait]
pub trait ExtendedGrantType<M: Model>: Send + Sync {
    async fn handle(
        &self,
        ctx: &GrantContext<M>,
        request: &Request,
        client: &Client,
    ) -> OAuthResult<Token<M::User>>;
}

/// Extended grant types keyed by `grant_type` value.
pub type ExtendedGrantTypes<M> = HashMap<String, Arc<dyn ExtendedGrantType<M>>>;

/// The grant types the engine implements itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuiltinGrant {
    AuthorizationCode,
    ClientCredentials,
    Password,
    RefreshToken,
}

impl BuiltinGrant {
    pub const ALL: [Self; 4] =
        [Self::AuthorizationCode, Self::ClientCredentials, Self::Password, Self::RefreshToken];

    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|g| g.name() == name)
    }

    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::AuthorizationCode => "authorization_code",
            Self::ClientCredentials => "client_credentials",
            Self::Password => "password",
            Self::RefreshToken => "refresh_token",
        }
    }
}

/// Instantiate the grant type registered under `name`.
///
/// Extended grant types override a built-in of the same name.
#[must_use]
pub fn create<M: Model + 'static>(
    name: &str,
    ctx: GrantContext<M>,
    extended: &ExtendedGrantTypes<M>,
) -> Option<Box<dyn GrantType<M>>> {
    if let Some(inner) = extended.get(name) {
        return Some(Box::new(Extended { ctx, inner: Arc::clone(inner) }));
    }
    let grant: Box<dyn GrantType<M>> = match BuiltinGrant::from_name(name)? {
        BuiltinGrant::AuthorizationCode => Box::new(AuthorizationCodeGrant::new(ctx)),
        BuiltinGrant::ClientCredentials => Box::new(ClientCredentialsGrant::new(ctx)),
        BuiltinGrant::Password => Box::new(PasswordGrant::new(ctx)),
        BuiltinGrant::RefreshToken => Box::new(RefreshTokenGrant::new(ctx)),
    };
    Some(grant)
}

/// Whether `name` resolves to a grant type.
#[must_use]
pub fn is_supported<M: Model>(name: &str, extended: &ExtendedGrantTypes<M>) -> bool {
    BuiltinGrant::from_name(name).is_some() || extended.contains_key(name)
}

struct Extended<M: Model> {
    ctx: GrantContext<M>,
    inner: Arc<dyn ExtendedGrantType<M>>,
}

#[async_trait]
impl<M: Model + 'static> GrantType<M> for Extended<M> {
    async fn handle(&self, request: &Request, client: &Client) -> OAuthResult<Token<M::User>> {
        self.inner.handle(&self.ctx, request, client).await
    }
}

/// State and behaviour shared by every grant type.
pub struct GrantContext<M: Model> {
    model: Arc<M>,
    access_token_lifetime: u64,
    refresh_token_lifetime: u64,
    always_issue_new_refresh_token: bool,
}

impl<M: Model> GrantContext<M> {
    /// # Errors
    ///
    /// `invalid_argument` if the access token lifetime is zero.
    pub fn new(
        model: Arc<M>,
        access_token_lifetime: u64,
        refresh_token_lifetime: u64,
        always_issue_new_refresh_token: bool,
    ) -> OAuthResult<Self> {
        if access_token_lifetime == 0 {
            return Err(OAuthError::invalid_argument("Missing parameter: `access_token_lifetime`"));
        }
        Ok(Self {
            model,
            access_token_lifetime,
            refresh_token_lifetime,
            always_issue_new_refresh_token,
        })
    }

    #[must_use]
    pub fn model(&self) -> &M {
        &self.model
    }

    #[must_use]
    pub const fn always_issue_new_refresh_token(&self) -> bool {
        self.always_issue_new_refresh_token
    }

    pub async fn generate_access_token(
        &self,
        client: &Client,
        user: &M::User,
        scope: &[String],
    ) -> OAuthResult<String> {
        let custom = self.model.generate_access_token(client, user, scope).await?;
        Ok(custom.filter(|t| !t.is_empty()).unwrap_or_else(random_token))
    }

    pub async fn generate_refresh_token(
        &self,
        client: &Client,
        user: &M::User,
        scope: &[String],
    ) -> OAuthResult<String> {
        let custom = self.model.generate_refresh_token(client, user, scope).await?;
        Ok(custom.filter(|t| !t.is_empty()).unwrap_or_else(random_token))
    }

    #[must_use]
    pub fn access_token_expires_at(&self) -> DateTime<Utc> {
        expires_after(self.access_token_lifetime)
    }

    #[must_use]
    pub fn refresh_token_expires_at(&self) -> DateTime<Utc> {
        expires_after(self.refresh_token_lifetime)
    }

    /// Requested `scope` from the body.
    pub fn get_scope(&self, request: &Request) -> OAuthResult<Scope> {
        let scope = request.body_param("scope");
        if let Some(raw) = scope {
            if !validator::nqschar(raw) {
                return Err(OAuthError::invalid_argument("Invalid parameter: `scope`"));
            }
        }
        Ok(parse_scope(scope))
    }

    /// Let the model narrow or reject the scope.
    pub async fn validate_scope(
        &self,
        user: &M::User,
        client: &Client,
        scope: &[String],
    ) -> OAuthResult<Scope> {
        self.model
            .validate_scope(user, client, scope)
            .await?
            .ok_or_else(|| OAuthError::invalid_scope("Invalid scope: Requested scope is invalid"))
    }

    /// Hand a freshly minted token to the model.
    pub async fn save_token(
        &self,
        token: Token<M::User>,
        client: &Client,
        user: &M::User,
    ) -> OAuthResult<Token<M::User>> {
        Ok(self.model.save_token(token, client, user).await?)
    }
}

impl<M: Model> Clone for GrantContext<M> {
    fn clone(&self) -> Self {
        Self {
            model: Arc::clone(&self.model),
            access_token_lifetime: self.access_token_lifetime,
            refresh_token_lifetime: self.refresh_token_lifetime,
            always_issue_new_refresh_token: self.always_issue_new_refresh_token,
        }
    }
}

impl<M: Model> std::fmt::Debug for GrantContext<M> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GrantContext")
            .field("access_token_lifetime", &self.access_token_lifetime)
            .field("refresh_token_lifetime", &self.refresh_token_lifetime)
            .field("always_issue_new_refresh_token", &self.always_issue_new_refresh_token)
            .finish()
    }
}

pub(crate) fn expires_after(lifetime_secs: u64) -> DateTime<Utc> {
    let secs = i64::try_from(lifetime_secs).unwrap_or(i64::MAX);
    let lifetime = TimeDelta::try_seconds(secs).unwrap_or(TimeDelta::MAX);
    Utc::now().checked_add_signed(lifetime).unwrap_or(DateTime::<Utc>::MAX_UTC)
}


#[cfg(test)]
mod tests {
    use super::test_support::StubModel;
    use super::*;
    use crate::error::ErrorKind;

    fn ctx(model: StubModel) -> GrantContext<StubModel> {
        GrantContext::new(Arc::new(model), 3600, 7200, true).unwrap()
    }

    #[test]
    fn test_builtin_names() {
        for grant in BuiltinGrant::ALL {
            assert_eq!(BuiltinGrant::from_name(grant.name()), Some(grant));
        }
        assert!(BuiltinGrant::from_name("implicit").is_none());
    }

    #[test]
    fn test_zero_access_token_lifetime_rejected() {
        let err = GrantContext::new(Arc::new(StubModel::default()), 0, 10, true).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidArgument);
    }

    #[test]
    fn test_get_scope_rejects_invalid_characters() {
        let ctx = ctx(StubModel::default());
        let request = Request::post_form([("scope", "read \"write\"")]);
        assert_eq!(ctx.get_scope(&request).unwrap_err().kind(), ErrorKind::InvalidArgument);

        let request = Request::post_form([("scope", "read write")]);
        assert_eq!(ctx.get_scope(&request).unwrap(), vec!["read", "write"]);
    }

    #[tokio::test]
    async fn test_generate_access_token_prefers_model() {
        let model =
            StubModel { custom_access_token: Some("custom".into()), ..StubModel::default() };
        let token = ctx(model)
            .generate_access_token(&Client::new("c1"), &"alice".to_string(), &[])
            .await
            .unwrap();
        assert_eq!(token, "custom");
    }

    #[tokio::test]
    async fn test_generate_access_token_falls_back_to_random() {
        let token = ctx(StubModel::default())
            .generate_access_token(&Client::new("c1"), &"alice".to_string(), &[])
            .await
            .unwrap();
        assert_eq!(token.len(), 64);
    }

    #[tokio::test]
    async fn test_validate_scope_rejection() {
        let model = StubModel { validated_scope: Some(None), ..StubModel::default() };
        let err = ctx(model)
            .validate_scope(&"alice".to_string(), &Client::new("c1"), &["admin".to_string()])
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidScope);
    }

    #[test]
    fn test_expiry_is_in_the_future() {
        let ctx = ctx(StubModel::default());
        let now = Utc::now();
        assert!(ctx.access_token_expires_at() > now);
        assert!(ctx.refresh_token_expires_at() > ctx.access_token_expires_at());
    }
}
