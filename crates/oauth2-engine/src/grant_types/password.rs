//! `password` grant (RFC 6749 §4.3).

use async_trait::async_trait;

use super::{GrantContext, GrantType};
use crate::error::{OAuthError, OAuthResult};
use crate::model::Model;
use crate::request::Request;
use crate::types::{Client, Token};
use crate::validator;

#[derive(Debug)]
pub struct PasswordGrant<M: Model> {
    ctx: GrantContext<M>,
}

impl<M: Model> PasswordGrant<M> {
    #[must_use]
    pub const fn new(ctx: GrantContext<M>) -> Self {
        Self { ctx }
    }

    async fn get_user(&self, request: &Request, client: &Client) -> OAuthResult<M::User> {
        let username = required_field(request, "username")?;
        let password = required_field(request, "password")?;

        self.ctx
            .model()
            .get_user(username, password, client)
            .await?
            .ok_or_else(|| OAuthError::invalid_grant("Invalid grant: user credentials are invalid"))
    }
}

fn required_field<'a>(request: &'a Request, name: &str) -> OAuthResult<&'a str> {
    let Some(value) = request.body_param(name) else {
        return Err(OAuthError::invalid_request(format!("Missing parameter: `{name}`")));
    };
    if !validator::uchar(value) {
        return Err(OAuthError::invalid_request(format!("Invalid parameter: `{name}`")));
    }
    Ok(value)
}

#[async_trait]
impl<M: Model> GrantType<M> for PasswordGrant<M> {
    async fn handle(&self, request: &Request, client: &Client) -> OAuthResult<Token<M::User>> {
        let requested = self.ctx.get_scope(request)?;
        let user = self.get_user(request, client).await?;

        let scope = self.ctx.validate_scope(&user, client, &requested).await?;
        let access_token = self.ctx.generate_access_token(client, &user, &scope).await?;
        let refresh_token = self.ctx.generate_refresh_token(client, &user, &scope).await?;

        let mut token = Token::new(access_token);
        token.access_token_expires_at = Some(self.ctx.access_token_expires_at());
        token.refresh_token = Some(refresh_token);
        token.refresh_token_expires_at = Some(self.ctx.refresh_token_expires_at());
        token.scope = scope;

        self.ctx.save_token(token, client, &user).await
    }
}
