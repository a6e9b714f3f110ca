//! `refresh_token` grant (RFC 6749 §6).

use async_trait::async_trait;
use chrono::Utc;

use super::{GrantContext, GrantType};
use crate::error::{OAuthError, OAuthResult};
use crate::model::Model;
use crate::request::Request;
use crate::types::{Client, RefreshToken, Scope, Token, TokenRef};
use crate::validator;

#[derive(Debug)]
pub struct RefreshTokenGrant<M: Model> {
    ctx: GrantContext<M>,
}

impl<M: Model> RefreshTokenGrant<M> {
    #[must_use]
    pub const fn new(ctx: GrantContext<M>) -> Self {
        Self { ctx }
    }

    async fn get_refresh_token(
        &self,
        request: &Request,
        client: &Client,
    ) -> OAuthResult<RefreshToken<M::User>> {
        let Some(value) = request.body_param("refresh_token") else {
            return Err(OAuthError::invalid_request("Missing parameter: `refresh_token`"));
        };
        if !validator::vschar(value) {
            return Err(OAuthError::invalid_request("Invalid parameter: `refresh_token`"));
        }

        let Some(token) = self.ctx.model().get_refresh_token(value).await? else {
            return Err(OAuthError::invalid_grant("Invalid grant: refresh token is invalid"));
        };

        let Some(owner) = &token.client else {
            return Err(OAuthError::server_error(
                "Server error: `get_refresh_token()` did not return a `client`",
            ));
        };
        if token.user.is_none() {
            return Err(OAuthError::server_error(
                "Server error: `get_refresh_token()` did not return a `user`",
            ));
        }
        if owner.id != client.id {
            return Err(OAuthError::invalid_grant(
                "Invalid grant: refresh token was issued to another client",
            ));
        }
        // No expiry means the refresh token does not expire.
        if token.refresh_token_expires_at.is_some_and(|at| at < Utc::now()) {
            return Err(OAuthError::invalid_grant("Invalid grant: refresh token has expired"));
        }

        Ok(token)
    }

    async fn revoke_token(&self, token: &RefreshToken<M::User>) -> OAuthResult<()> {
        if !self.ctx.always_issue_new_refresh_token() {
            return Ok(());
        }
        if !self.ctx.model().revoke_token(TokenRef::Refresh(token)).await? {
            return Err(OAuthError::invalid_grant(
                "Invalid grant: refresh token is invalid or could not be revoked",
            ));
        }
        Ok(())
    }
}

/// The scope of a refreshed token: the original unless a subset was requested.
fn narrowed_scope(requested: Scope, original: &[String]) -> OAuthResult<Scope> {
    if requested.is_empty() {
        return Ok(original.to_vec());
    }
    if original.is_empty() || !requested.iter().all(|s| original.contains(s)) {
        return Err(OAuthError::invalid_scope("Invalid scope: Unable to add extra scopes"));
    }
    Ok(requested)
}

#[async_trait]
impl<M: Model> GrantType<M> for RefreshTokenGrant<M> {
    async fn handle(&self, request: &Request, client: &Client) -> OAuthResult<Token<M::User>> {
        let old = self.get_refresh_token(request, client).await?;
        self.revoke_token(&old).await?;

        let Some(user) = &old.user else {
            return Err(OAuthError::server_error(
                "Server error: `get_refresh_token()` did not return a `user`",
            ));
        };

        let scope = narrowed_scope(self.ctx.get_scope(request)?, &old.scope)?;
        let access_token = self.ctx.generate_access_token(client, user, &scope).await?;

        let mut token = Token::new(access_token);
        token.access_token_expires_at = Some(self.ctx.access_token_expires_at());
        token.scope = scope;

        if self.ctx.always_issue_new_refresh_token() {
            let refresh_token = self.ctx.generate_refresh_token(client, user, &token.scope).await?;
            token.refresh_token = Some(refresh_token);
            token.refresh_token_expires_at = Some(self.ctx.refresh_token_expires_at());
        }

        tracing::debug!(
            client_id = %client.id,
            rotated = self.ctx.always_issue_new_refresh_token(),
            "Refreshing access token"
        );
        self.ctx.save_token(token, client, user).await
    }
}
