//! Token revocation endpoint (RFC 7009).

use std::sync::Arc;

use http::{Method, StatusCode};

use super::{ClientCredentials, challenge_invalid_client, set_no_cache, write_error};
use crate::error::{OAuthError, OAuthResult};
use crate::model::Model;
use crate::request::Request;
use crate::response::Response;
use crate::types::{Client, TokenRef};
use crate::validator;

/// The two token kinds a revocation request can name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenTypeHint {
    AccessToken,
    RefreshToken,
}

impl TokenTypeHint {
    /// Unknown hints are ignored (RFC 7009 §2.1).
    #[must_use]
    pub fn parse(hint: &str) -> Option<Self> {
        match hint {
            "access_token" => Some(Self::AccessToken),
            "refresh_token" => Some(Self::RefreshToken),
            _ => None,
        }
    }

    const fn other(self) -> Self {
        match self {
            Self::AccessToken => Self::RefreshToken,
            Self::RefreshToken => Self::AccessToken,
        }
    }
}

pub struct RevokeHandler<M: Model> {
    model: Arc<M>,
}

impl<M: Model> RevokeHandler<M> {
    #[must_use]
    pub const fn new(model: Arc<M>) -> Self {
        Self { model }
    }

    /// Revoke the presented token if it belongs to the authenticated client.
    ///
    /// Answers 200 with an empty body whether or not a token was revoked; only
    /// malformed requests and failed client authentication produce errors.
    /// Model failures while looking up or revoking the token are logged and
    /// the next token kind is tried.
    pub async fn handle(&self, request: &Request, response: &mut Response) -> OAuthResult<()> {
        match self.revoke(request, response).await {
            Ok(()) => {
                response.status = StatusCode::OK;
                response.body = None;
                set_no_cache(response);
                Ok(())
            }
            Err(err) => {
                tracing::debug!(error = %err, status = err.status(), "Revocation request rejected");
                write_error(response, &err);
                Err(err)
            }
        }
    }

    async fn revoke(&self, request: &Request, response: &mut Response) -> OAuthResult<()> {
        if request.method != Method::POST {
            return Err(OAuthError::invalid_request("Invalid request: method must be POST"));
        }

        let client = match self.get_client(request).await {
            Ok(client) => client,
            Err(err) => {
                tracing::warn!(error = %err, "Client authentication failed");
                return Err(challenge_invalid_client(err, request, response));
            }
        };

        let Some(token) = request.body_param("token") else {
            return Err(OAuthError::invalid_request("Missing parameter: `token`"));
        };
        if !validator::vschar(token) {
            return Err(OAuthError::invalid_request("Invalid parameter: `token`"));
        }

        let hint = request.body_param("token_type_hint").and_then(TokenTypeHint::parse);
        let order = match hint {
            Some(first) => [first, first.other()],
            None => [TokenTypeHint::AccessToken, TokenTypeHint::RefreshToken],
        };

        for kind in order {
            match self.revoke_kind(kind, token, &client).await {
                Ok(Some(revoked)) => {
                    tracing::info!(
                        client_id = %client.id,
                        kind = ?kind,
                        revoked,
                        "Processed token revocation"
                    );
                    return Ok(());
                }
                Ok(None) => {}
                Err(err) => {
                    tracing::warn!(
                        client_id = %client.id,
                        kind = ?kind,
                        error = %err,
                        "Token lookup failed during revocation"
                    );
                }
            }
        }

        tracing::debug!(client_id = %client.id, "Revocation matched no token");
        Ok(())
    }

    async fn get_client(&self, request: &Request) -> OAuthResult<Client> {
        let Some(credentials) = ClientCredentials::from_basic_or_body(request) else {
            return Err(OAuthError::invalid_client(
                "Invalid client: cannot retrieve client credentials",
            ));
        };
        credentials.validate(true)?;

        self.model
            .get_client(&credentials.id, credentials.secret.as_deref())
            .await?
            .ok_or_else(|| OAuthError::invalid_client("Invalid client: client is invalid"))
    }

    /// `None` when no token of this kind owned by `client` exists.
    async fn revoke_kind(
        &self,
        kind: TokenTypeHint,
        value: &str,
        client: &Client,
    ) -> OAuthResult<Option<bool>> {
        let owned_by = |owner: Option<&str>| owner == Some(client.id.as_str());

        let revoked = match kind {
            TokenTypeHint::AccessToken => {
                let Some(token) = self.model.get_access_token(value).await? else {
                    return Ok(None);
                };
                if !owned_by(token.client_id()) {
                    return Ok(None);
                }
                self.model.revoke_token(TokenRef::Access(&token)).await?
            }
            TokenTypeHint::RefreshToken => {
                let Some(token) = self.model.get_refresh_token(value).await? else {
                    return Ok(None);
                };
                if !owned_by(token.client_id()) {
                    return Ok(None);
                }
                self.model.revoke_token(TokenRef::Refresh(&token)).await?
            }
        };

        if !revoked {
            tracing::warn!(client_id = %client.id, "Model reported the token could not be revoked");
        }
        Ok(Some(revoked))
    }
}

impl<M: Model> std::fmt::Debug for RevokeHandler<M> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RevokeHandler").finish_non_exhaustive()
    }
}
