//! `authorization_code` grant (RFC 6749 §4.1.3, RFC 7636 §4.6).

use async_trait::async_trait;
use chrono::Utc;

use super::{GrantContext, GrantType};
use crate::error::{OAuthError, OAuthResult};
use crate::model::Model;
use crate::pkce;
use crate::request::Request;
use crate::types::{AuthorizationCode, Client, Token};
use crate::validator;

const INVALID_CODE: &str = "Invalid grant: authorization code is invalid";

#[derive(Debug)]
pub struct AuthorizationCodeGrant<M: Model> {
    ctx: GrantContext<M>,
}

impl<M: Model> AuthorizationCodeGrant<M> {
    #[must_use]
    pub const fn new(ctx: GrantContext<M>) -> Self {
        Self { ctx }
    }

    async fn get_authorization_code(
        &self,
        request: &Request,
        client: &Client,
    ) -> OAuthResult<AuthorizationCode<M::User>> {
        let Some(code) = request.body_param("code") else {
            return Err(OAuthError::invalid_request("Missing parameter: `code`"));
        };
        if !validator::vschar(code) {
            return Err(OAuthError::invalid_request("Invalid parameter: `code`"));
        }

        let Some(record) = self.ctx.model().get_authorization_code(code).await? else {
            return Err(OAuthError::invalid_grant(INVALID_CODE));
        };

        let Some(owner) = &record.client else {
            return Err(OAuthError::server_error(
                "Server error: `get_authorization_code()` did not return a `client`",
            ));
        };
        if record.user.is_none() {
            return Err(OAuthError::server_error(
                "Server error: `get_authorization_code()` did not return a `user`",
            ));
        }
        // Same error as "not found" so other clients cannot probe for codes.
        if owner.id != client.id {
            return Err(OAuthError::invalid_grant(INVALID_CODE));
        }

        let Some(expires_at) = record.expires_at else {
            return Err(OAuthError::server_error("Server error: `expires_at` is missing"));
        };
        if expires_at < Utc::now() {
            return Err(OAuthError::invalid_grant("Invalid grant: authorization code has expired"));
        }

        if let Some(uri) = &record.redirect_uri {
            if !validator::uri(uri) {
                return Err(OAuthError::invalid_grant(
                    "Invalid grant: `redirect_uri` is not a valid URI",
                ));
            }
        }

        Self::verify_code_verifier(request, &record)?;
        Ok(record)
    }

    fn verify_code_verifier(
        request: &Request,
        record: &AuthorizationCode<M::User>,
    ) -> OAuthResult<()> {
        let verifier = request.body_param("code_verifier");

        let Some(challenge) = record.code_challenge.as_deref().filter(|c| !c.is_empty()) else {
            // A verifier without a stored challenge would let a client downgrade PKCE.
            if verifier.is_some() {
                return Err(OAuthError::invalid_grant("Invalid grant: code verifier is invalid"));
            }
            return Ok(());
        };

        let Some(verifier) = verifier else {
            return Err(OAuthError::invalid_grant("Missing parameter: `code_verifier`"));
        };

        let method = record.code_challenge_method.as_deref().unwrap_or("plain");
        let Some(hash) = pkce::hash_for_challenge(method, verifier) else {
            return Err(OAuthError::server_error(
                "Server error: invalid stored `code_challenge_method`",
            ));
        };

        if hash != challenge {
            return Err(OAuthError::invalid_grant("Invalid grant: code verifier is invalid"));
        }
        Ok(())
    }

    /// The redirect URI must be repeated verbatim when one was bound at issuance.
    fn validate_redirect_uri(
        request: &Request,
        record: &AuthorizationCode<M::User>,
    ) -> OAuthResult<()> {
        let Some(bound) = &record.redirect_uri else {
            return Ok(());
        };

        let Some(redirect_uri) = request.param("redirect_uri") else {
            return Err(OAuthError::invalid_request(
                "Invalid request: `redirect_uri` is not a valid URI",
            ));
        };
        if !validator::uri(redirect_uri) {
            return Err(OAuthError::invalid_request(
                "Invalid request: `redirect_uri` is not a valid URI",
            ));
        }
        if redirect_uri != bound {
            return Err(OAuthError::invalid_request("Invalid request: `redirect_uri` is invalid"));
        }
        Ok(())
    }

    async fn revoke_authorization_code(
        &self,
        record: &AuthorizationCode<M::User>,
    ) -> OAuthResult<()> {
        if !self.ctx.model().revoke_authorization_code(record).await? {
            return Err(OAuthError::invalid_grant(INVALID_CODE));
        }
        Ok(())
    }

    async fn save_token(
        &self,
        user: &M::User,
        client: &Client,
        authorization_code: &str,
        requested_scope: &[String],
    ) -> OAuthResult<Token<M::User>> {
        let scope = self.ctx.validate_scope(user, client, requested_scope).await?;
        let access_token = self.ctx.generate_access_token(client, user, &scope).await?;
        let refresh_token = self.ctx.generate_refresh_token(client, user, &scope).await?;

        let mut token = Token::new(access_token);
        token.access_token_expires_at = Some(self.ctx.access_token_expires_at());
        token.refresh_token = Some(refresh_token);
        token.refresh_token_expires_at = Some(self.ctx.refresh_token_expires_at());
        token.authorization_code = Some(authorization_code.to_owned());
        token.scope = scope;

        self.ctx.save_token(token, client, user).await
    }
}

#[async_trait]
impl<M: Model> GrantType<M> for AuthorizationCodeGrant<M> {
    async fn handle(&self, request: &Request, client: &Client) -> OAuthResult<Token<M::User>> {
        let record = self.get_authorization_code(request, client).await?;
        Self::validate_redirect_uri(request, &record)?;
        self.revoke_authorization_code(&record).await?;

        let Some(user) = &record.user else {
            return Err(OAuthError::server_error(
                "Server error: `get_authorization_code()` did not return a `user`",
            ));
        };

        tracing::debug!(client_id = %client.id, "Exchanging authorization code");
        self.save_token(user, client, &record.authorization_code, &record.scope).await
    }
}
