//! Configuration for the OAuth 2.0 engine.

use std::collections::HashMap;
use std::sync::Arc;

use crate::error::{OAuthError, OAuthResult};
use crate::handlers::authorize::AuthenticateUser;

/// Default lifetimes and fixed protocol values.
pub mod defaults {
    /// Access token lifetime (1 hour).
    pub const ACCESS_TOKEN_LIFETIME: u64 = 3600;

    /// Refresh token lifetime (2 weeks).
    pub const REFRESH_TOKEN_LIFETIME: u64 = 14 * 24 * 3600;

    /// Authorization code lifetime (5 minutes).
    pub const AUTHORIZATION_CODE_LIFETIME: u64 = 300;

    /// Realm advertised in `WWW-Authenticate` challenges.
    pub const REALM: &str = "Service";
}

/// Token endpoint options.
#[derive(Debug, Clone)]
pub struct TokenOptions {
    /// Access token lifetime in seconds (clients may override).
    pub access_token_lifetime: u64,

    /// Refresh token lifetime in seconds (clients may override).
    pub refresh_token_lifetime: u64,

    /// Copy extension attributes of the saved token into the response body.
    pub allow_extended_token_attributes: bool,

    /// Per-grant override of whether a client secret is required.
    ///
    /// Grants missing from a non-empty map still require authentication.
    pub require_client_authentication: HashMap<String, bool>,

    /// Rotate refresh tokens on every refresh grant.
    pub always_issue_new_refresh_token: bool,
}

impl TokenOptions {
    /// Whether `grant_type` requires a client secret.
    #[must_use]
    pub fn is_client_authentication_required(&self, grant_type: Option<&str>) -> bool {
        grant_type
            .and_then(|g| self.require_client_authentication.get(g))
            .copied()
            .unwrap_or(true)
    }

    pub(crate) fn validate(&self) -> OAuthResult<()> {
        if self.access_token_lifetime == 0 {
            return Err(OAuthError::invalid_argument("Missing parameter: `access_token_lifetime`"));
        }
        if self.refresh_token_lifetime == 0 {
            return Err(OAuthError::invalid_argument("Missing parameter: `refresh_token_lifetime`"));
        }
        Ok(())
    }
}

impl Default for TokenOptions {
    fn default() -> Self {
        Self {
            access_token_lifetime: defaults::ACCESS_TOKEN_LIFETIME,
            refresh_token_lifetime: defaults::REFRESH_TOKEN_LIFETIME,
            allow_extended_token_attributes: false,
            require_client_authentication: HashMap::new(),
            always_issue_new_refresh_token: true,
        }
    }
}

/// Resource endpoint (bearer authentication) options.
#[derive(Debug, Clone, Default)]
pub struct AuthenticateOptions {
    /// Scope every presented token must carry. Empty means no scope check.
    pub scope: Vec<String>,

    /// Send `X-Accepted-OAuth-Scopes` with the required scope.
    pub add_accepted_scopes_header: bool,

    /// Send `X-OAuth-Scopes` with the token's scope.
    pub add_authorized_scopes_header: bool,

    /// Accept `?access_token=` (RFC 6750 §2.3 discourages it).
    pub allow_bearer_tokens_in_query_string: bool,
}

impl AuthenticateOptions {
    /// Require `scope` and advertise it in both scope headers.
    #[must_use]
    pub fn with_scope<I, S>(scope: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            scope: scope.into_iter().map(Into::into).collect(),
            add_accepted_scopes_header: true,
            add_authorized_scopes_header: true,
            allow_bearer_tokens_in_query_string: false,
        }
    }
}

/// Authorization endpoint options.
pub struct AuthorizeOptions<U> {
    /// Authorization code lifetime in seconds.
    pub authorization_code_lifetime: u64,

    /// Accept requests without `state`.
    pub allow_empty_state: bool,

    /// Options for the built-in bearer authentication of the resource owner.
    pub authenticate: AuthenticateOptions,

    /// Replaces bearer authentication as the way the resource owner is identified.
    pub authenticate_handler: Option<Arc<dyn AuthenticateUser<U>>>,
}

impl<U> AuthorizeOptions<U> {
    pub(crate) fn validate(&self) -> OAuthResult<()> {
        if self.authorization_code_lifetime == 0 {
            return Err(OAuthError::invalid_argument(
                "Missing parameter: `authorization_code_lifetime`",
            ));
        }
        Ok(())
    }
}

impl<U> Default for AuthorizeOptions<U> {
    fn default() -> Self {
        Self {
            authorization_code_lifetime: defaults::AUTHORIZATION_CODE_LIFETIME,
            allow_empty_state: false,
            authenticate: AuthenticateOptions::default(),
            authenticate_handler: None,
        }
    }
}

impl<U> Clone for AuthorizeOptions<U> {
    fn clone(&self) -> Self {
        Self {
            authorization_code_lifetime: self.authorization_code_lifetime,
            allow_empty_state: self.allow_empty_state,
            authenticate: self.authenticate.clone(),
            authenticate_handler: self.authenticate_handler.clone(),
        }
    }
}

impl<U> std::fmt::Debug for AuthorizeOptions<U> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthorizeOptions")
            .field("authorization_code_lifetime", &self.authorization_code_lifetime)
            .field("allow_empty_state", &self.allow_empty_state)
            .field("authenticate", &self.authenticate)
            .field("authenticate_handler", &self.authenticate_handler.is_some())
            .finish()
    }
}

/// Engine configuration shared by every endpoint.
pub struct EngineConfig<U> {
    pub token: TokenOptions,
    pub authenticate: AuthenticateOptions,
    pub authorize: AuthorizeOptions<U>,
}

impl<U> EngineConfig<U> {
    /// Create configuration from environment variables.
    ///
    /// Reads `OAUTH2_ACCESS_TOKEN_LIFETIME`, `OAUTH2_REFRESH_TOKEN_LIFETIME`,
    /// `OAUTH2_AUTHORIZATION_CODE_LIFETIME` (seconds) and the boolean flags
    /// `OAUTH2_ALLOW_EMPTY_STATE`, `OAUTH2_ALLOW_BEARER_TOKENS_IN_QUERY_STRING`,
    /// `OAUTH2_ALWAYS_ISSUE_NEW_REFRESH_TOKEN`. Unset variables keep their defaults.
    ///
    /// # Errors
    ///
    /// Returns error if a variable is set but cannot be parsed.
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let mut config = Self::default();

        if let Some(secs) = parse_var::<u64>(&lookup, "OAUTH2_ACCESS_TOKEN_LIFETIME")? {
            config.token.access_token_lifetime = secs;
        }
        if let Some(secs) = parse_var::<u64>(&lookup, "OAUTH2_REFRESH_TOKEN_LIFETIME")? {
            config.token.refresh_token_lifetime = secs;
        }
        if let Some(secs) = parse_var::<u64>(&lookup, "OAUTH2_AUTHORIZATION_CODE_LIFETIME")? {
            config.authorize.authorization_code_lifetime = secs;
        }
        if let Some(flag) = parse_var::<bool>(&lookup, "OAUTH2_ALLOW_EMPTY_STATE")? {
            config.authorize.allow_empty_state = flag;
        }
        let query_tokens = "OAUTH2_ALLOW_BEARER_TOKENS_IN_QUERY_STRING";
        if let Some(flag) = parse_var::<bool>(&lookup, query_tokens)? {
            config.authenticate.allow_bearer_tokens_in_query_string = flag;
            config.authorize.authenticate.allow_bearer_tokens_in_query_string = flag;
        }
        if let Some(flag) = parse_var::<bool>(&lookup, "OAUTH2_ALWAYS_ISSUE_NEW_REFRESH_TOKEN")? {
            config.token.always_issue_new_refresh_token = flag;
        }

        Ok(config)
    }

    /// Short lifetimes for tests.
    #[must_use]
    pub fn for_testing() -> Self {
        let mut config = Self::default();
        config.token.access_token_lifetime = 60;
        config.token.refresh_token_lifetime = 120;
        config.authorize.authorization_code_lifetime = 30;
        config
    }
}

impl<U> Clone for EngineConfig<U> {
    fn clone(&self) -> Self {
        Self {
            token: self.token.clone(),
            authenticate: self.authenticate.clone(),
            authorize: self.authorize.clone(),
        }
    }
}

impl<U> std::fmt::Debug for EngineConfig<U> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EngineConfig")
            .field("token", &self.token)
            .field("authenticate", &self.authenticate)
            .field("authorize", &self.authorize)
            .finish()
    }
}

impl<U> Default for EngineConfig<U> {
    fn default() -> Self {
        Self {
            token: TokenOptions::default(),
            authenticate: AuthenticateOptions::default(),
            authorize: AuthorizeOptions::default(),
        }
    }
}

fn parse_var<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> anyhow::Result<Option<T>>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    lookup(key)
        .map(|raw| {
            raw.trim()
                .parse::<T>()
                .map_err(|e| anyhow::anyhow!("invalid value {raw:?} for {key}: {e}"))
        })
        .transpose()
}
