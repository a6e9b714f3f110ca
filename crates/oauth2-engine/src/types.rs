//! OAuth 2.0 records exchanged with the [`Model`](crate::model::Model).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Ordered sequence of scope tokens.
pub type Scope = Vec<String>;

/// A registered client, as returned by the model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Client {
    pub id: String,
    /// Grant types this client may use. `None` means the model returned no list.
    pub grants: Option<Vec<String>>,
    pub redirect_uris: Vec<String>,
    /// Per-client override of the access token lifetime, in seconds.
    pub access_token_lifetime: Option<u64>,
    /// Per-client override of the refresh token lifetime, in seconds.
    pub refresh_token_lifetime: Option<u64>,
}

impl Client {
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            grants: Some(Vec::new()),
            redirect_uris: Vec::new(),
            access_token_lifetime: None,
            refresh_token_lifetime: None,
        }
    }

    #[must_use]
    pub fn with_grants<I, S>(mut self, grants: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.grants = Some(grants.into_iter().map(Into::into).collect());
        self
    }

    #[must_use]
    pub fn with_redirect_uris<I, S>(mut self, uris: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.redirect_uris = uris.into_iter().map(Into::into).collect();
        self
    }

    /// Whether the client's grant list includes `grant_type`.
    #[must_use]
    pub fn allows_grant(&self, grant_type: &str) -> bool {
        self.grants.as_ref().is_some_and(|g| g.iter().any(|name| name == grant_type))
    }
}

/// An access token (and optionally its paired refresh token).
///
/// Grant types hand the model a token without `client`/`user`; the model
/// returns it with both attached.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Token<U> {
    pub access_token: String,
    pub access_token_expires_at: Option<DateTime<Utc>>,
    pub refresh_token: Option<String>,
    pub refresh_token_expires_at: Option<DateTime<Utc>>,
    /// The authorization code this token was exchanged for, if any.
    pub authorization_code: Option<String>,
    pub scope: Scope,
    pub client: Option<Client>,
    pub user: Option<U>,
    /// Extension attributes returned in the token response when enabled.
    #[serde(default)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl<U> Token<U> {
    #[must_use]
    pub fn new(access_token: impl Into<String>) -> Self {
        Self {
            access_token: access_token.into(),
            access_token_expires_at: None,
            refresh_token: None,
            refresh_token_expires_at: None,
            authorization_code: None,
            scope: Vec::new(),
            client: None,
            user: None,
            extra: serde_json::Map::new(),
        }
    }

    /// Client id of the owning client, if attached.
    #[must_use]
    pub fn client_id(&self) -> Option<&str> {
        self.client.as_ref().map(|c| c.id.as_str())
    }
}

/// A refresh token lookup result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RefreshToken<U> {
    pub refresh_token: String,
    pub refresh_token_expires_at: Option<DateTime<Utc>>,
    pub scope: Scope,
    pub client: Option<Client>,
    pub user: Option<U>,
}

impl<U> RefreshToken<U> {
    #[must_use]
    pub fn client_id(&self) -> Option<&str> {
        self.client.as_ref().map(|c| c.id.as_str())
    }
}

/// An authorization code issued by the authorize endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthorizationCode<U> {
    pub authorization_code: String,
    /// `None` only when a model returns a malformed record.
    pub expires_at: Option<DateTime<Utc>>,
    pub redirect_uri: Option<String>,
    pub scope: Scope,
    pub client: Option<Client>,
    pub user: Option<U>,
    pub code_challenge: Option<String>,
    pub code_challenge_method: Option<String>,
}

/// A token handed to [`Model::revoke_token`](crate::model::Model::revoke_token).
#[derive(Debug)]
pub enum TokenRef<'a, U> {
    Access(&'a Token<U>),
    Refresh(&'a RefreshToken<U>),
}

impl<U> TokenRef<'_, U> {
    /// The token string being revoked.
    #[must_use]
    pub fn value(&self) -> &str {
        match self {
            Self::Access(token) => &token.access_token,
            Self::Refresh(token) => &token.refresh_token,
        }
    }
}

/// Split a space-delimited scope string into its tokens.
///
/// Absent or blank input yields an empty scope.
#[must_use]
pub fn parse_scope(scope: Option<&str>) -> Scope {
    scope
        .map(|s| s.split(' ').filter(|t| !t.is_empty()).map(str::to_owned).collect())
        .unwrap_or_default()
}

/// Join scope tokens with single spaces.
#[must_use]
pub fn format_scope(scope: &[String]) -> String {
    scope.join(" ")
}

/// Opaque token: SHA-256 over two fresh v4 UUIDs, as 64 lowercase hex characters.
#[must_use]
pub fn random_token() -> String {
    let mut hasher = Sha256::new();
    hasher.update(uuid::Uuid::new_v4().as_bytes());
    hasher.update(uuid::Uuid::new_v4().as_bytes());
    hasher.finalize().iter().map(|b| format!("{b:02x}")).collect()
}
