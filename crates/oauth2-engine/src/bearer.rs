//! Bearer token response shaping (RFC 6749 §5.1, RFC 6750).

use chrono::{DateTime, Utc};
use serde_json::{Map, Value};

use crate::error::{OAuthError, OAuthResult};
use crate::types::{Token, format_scope};

/// Fields of the token response that extension attributes may not replace.
const RESERVED: &[&str] = &["access_token", "token_type", "expires_in", "refresh_token", "scope"];

/// A token response body ready to serialize.
#[derive(Debug, Clone, PartialEq)]
pub struct BearerToken {
    pub access_token: String,
    /// Whole seconds until expiry, measured when the response is built.
    pub expires_in: Option<i64>,
    pub refresh_token: Option<String>,
    pub scope: Vec<String>,
    pub extra: Map<String, Value>,
}

impl BearerToken {
    /// Shape a saved token.
    ///
    /// Fails with `invalid_argument` when the model returned a token without
    /// an access token value, client or user.
    pub fn from_token<U>(
        token: &Token<U>,
        allow_extended_attributes: bool,
        now: DateTime<Utc>,
    ) -> OAuthResult<Self> {
        if token.access_token.is_empty() {
            return Err(OAuthError::invalid_argument("Missing parameter: `access_token`"));
        }
        if token.client.is_none() {
            return Err(OAuthError::invalid_argument("Missing parameter: `client`"));
        }
        if token.user.is_none() {
            return Err(OAuthError::invalid_argument("Missing parameter: `user`"));
        }

        let expires_in = token
            .access_token_expires_at
            .map(|expires_at| (expires_at - now).num_seconds().max(0));

        let extra = if allow_extended_attributes {
            token
                .extra
                .iter()
                .filter(|(key, _)| !RESERVED.contains(&key.as_str()))
                .map(|(key, value)| (key.clone(), value.clone()))
                .collect()
        } else {
            Map::new()
        };

        Ok(Self {
            access_token: token.access_token.clone(),
            expires_in,
            refresh_token: token.refresh_token.clone(),
            scope: token.scope.clone(),
            extra,
        })
    }

    /// JSON body with `token_type: "Bearer"`.
    #[must_use]
    pub fn to_body(&self) -> Value {
        let mut body = Map::new();
        body.insert("access_token".into(), Value::String(self.access_token.clone()));
        body.insert("token_type".into(), Value::String("Bearer".into()));
        if let Some(expires_in) = self.expires_in {
            body.insert("expires_in".into(), Value::from(expires_in));
        }
        if let Some(refresh_token) = &self.refresh_token {
            body.insert("refresh_token".into(), Value::String(refresh_token.clone()));
        }
        if !self.scope.is_empty() {
            body.insert("scope".into(), Value::String(format_scope(&self.scope)));
        }
        for (key, value) in &self.extra {
            body.insert(key.clone(), value.clone());
        }
        Value::Object(body)
    }
}
