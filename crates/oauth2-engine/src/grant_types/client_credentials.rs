//! `client_credentials` grant (RFC 6749 §4.4).

use async_trait::async_trait;

use super::{GrantContext, GrantType};
use crate::error::{OAuthError, OAuthResult};
use crate::model::Model;
use crate::request::Request;
use crate::types::{Client, Token};

/// Issues an access token only; RFC 6749 §4.4.3 forbids a refresh token.
#[derive(Debug)]
pub struct ClientCredentialsGrant<M: Model> {
    ctx: GrantContext<M>,
}

impl<M: Model> ClientCredentialsGrant<M> {
    #[must_use]
    pub const fn new(ctx: GrantContext<M>) -> Self {
        Self { ctx }
    }
}

#[async_trait]
impl<M: Model> GrantType<M> for ClientCredentialsGrant<M> {
    async fn handle(&self, request: &Request, client: &Client) -> OAuthResult<Token<M::User>> {
        let requested = self.ctx.get_scope(request)?;

        let Some(user) = self.ctx.model().get_user_from_client(client).await? else {
            return Err(OAuthError::invalid_grant("Invalid grant: user credentials are invalid"));
        };

        let scope = self.ctx.validate_scope(&user, client, &requested).await?;
        let access_token = self.ctx.generate_access_token(client, &user, &scope).await?;

        let mut token = Token::new(access_token);
        token.access_token_expires_at = Some(self.ctx.access_token_expires_at());
        token.scope = scope;

        tracing::debug!(client_id = %client.id, "Issuing client credentials token");
        self.ctx.save_token(token, client, &user).await
    }
}
