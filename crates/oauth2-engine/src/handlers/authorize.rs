//! Authorization endpoint, `code` response type (RFC 6749 §4.1.1, RFC 7636 §4.3).

use std::sync::Arc;

use async_trait::async_trait;
use url::Url;

use super::authenticate::AuthenticateHandler;
use crate::config::AuthorizeOptions;
use crate::error::{OAuthError, OAuthResult};
use crate::grant_types::{BuiltinGrant, expires_after};
use crate::model::Model;
use crate::pkce;
use crate::request::Request;
use crate::response::Response;
use crate::types::{AuthorizationCode, Client, Scope, parse_scope, random_token};
use crate::validator;

/// Identifies the resource owner approving an authorization request.
///
/// [`AuthenticateHandler`] implements this using bearer tokens; embedders with
/// session-based login supply their own.
#[async_trait]
pub trait AuthenticateUser<U>: Send + Sync {
    async fn authenticate_user(
        &self,
        request: &Request,
        response: &mut Response,
    ) -> OAuthResult<Option<U>>;
}

pub struct AuthorizeHandler<M: Model> {
    model: Arc<M>,
    options: AuthorizeOptions<M::User>,
}

impl<M: Model + 'static> AuthorizeHandler<M> {
    /// # Errors
    ///
    /// `invalid_argument` if the authorization code lifetime is zero.
    pub fn new(model: Arc<M>, options: AuthorizeOptions<M::User>) -> OAuthResult<Self> {
        options.validate()?;
        Ok(Self { model, options })
    }

    /// Issue an authorization code and redirect back to the client.
    ///
    /// Failures that happen before the redirect target is verified are
    /// returned without touching the response. Later failures, including a
    /// missing or invalid `state`, redirect to the client with `error` and
    /// `error_description` (plus `state` when it was accepted), and are also
    /// returned.
    pub async fn handle(
        &self,
        request: &Request,
        response: &mut Response,
    ) -> OAuthResult<AuthorizationCode<M::User>> {
        let expires_at = expires_after(self.options.authorization_code_lifetime);
        let client = self.get_client(request).await?;
        let user = self.get_user(request, response).await?;
        let redirect_uri = Self::get_redirect_uri(request, &client)?;

        let mut target = Url::parse(&redirect_uri).map_err(|e| {
            OAuthError::invalid_request("Invalid request: `redirect_uri` is not a valid URI")
                .with_inner(e)
        })?;

        // A rejected `state` is not echoed back.
        let (state, issued) = match self.get_state(request) {
            Ok(state) => {
                let issued = self.issue_code(request, &client, &user, &redirect_uri, expires_at);
                (state, issued.await)
            }
            Err(err) => (None, Err(err)),
        };

        target.set_query(None);
        match issued {
            Ok(code) => {
                target.query_pairs_mut().append_pair("code", &code.authorization_code);
                append_state(&mut target, state);
                response.redirect(target.as_str());
                tracing::info!(client_id = %client.id, "Issued authorization code");
                Ok(code)
            }
            Err(err) => {
                {
                    let mut query = target.query_pairs_mut();
                    query.append_pair("error", err.name());
                    if !err.message().is_empty() {
                        query.append_pair("error_description", err.message());
                    }
                }
                append_state(&mut target, state);
                response.redirect(target.as_str());
                tracing::debug!(
                    client_id = %client.id,
                    error = %err,
                    "Authorization request denied"
                );
                Err(err)
            }
        }
    }

    async fn issue_code(
        &self,
        request: &Request,
        client: &Client,
        user: &M::User,
        redirect_uri: &str,
        expires_at: chrono::DateTime<chrono::Utc>,
    ) -> OAuthResult<AuthorizationCode<M::User>> {
        if request.param("allowed") == Some("false") {
            return Err(OAuthError::access_denied(
                "Access denied: user denied access to application",
            ));
        }

        let requested = Self::get_scope(request)?;
        let scope = self.validate_scope(user, client, &requested).await?;
        let authorization_code = self.generate_authorization_code(client, user, &scope).await?;
        Self::get_response_type(request)?;

        let (code_challenge, code_challenge_method) = match request.param("code_challenge") {
            Some(challenge) => {
                if !pkce::code_challenge_matches_abnf(challenge) {
                    return Err(OAuthError::invalid_request("Invalid parameter: `code_challenge`"));
                }
                let method = Self::get_code_challenge_method(request)?;
                (Some(challenge.to_owned()), Some(method.to_owned()))
            }
            None => (None, None),
        };

        let code = AuthorizationCode {
            authorization_code,
            expires_at: Some(expires_at),
            redirect_uri: Some(redirect_uri.to_owned()),
            scope,
            client: None,
            user: None,
            code_challenge,
            code_challenge_method,
        };
        Ok(self.model.save_authorization_code(code, client, user).await?)
    }

    async fn get_client(&self, request: &Request) -> OAuthResult<Client> {
        let Some(client_id) = request.param("client_id") else {
            return Err(OAuthError::invalid_request("Missing parameter: `client_id`"));
        };
        if !validator::vschar(client_id) {
            return Err(OAuthError::invalid_request("Invalid parameter: `client_id`"));
        }
        let redirect_uri = request.param("redirect_uri");
        if redirect_uri.is_some_and(|uri| !validator::uri(uri)) {
            return Err(OAuthError::invalid_request(
                "Invalid request: `redirect_uri` is not a valid URI",
            ));
        }

        let Some(client) = self.model.get_client_by_id(client_id).await? else {
            return Err(OAuthError::invalid_client(
                "Invalid client: client credentials are invalid",
            ));
        };
        if client.grants.is_none() {
            return Err(OAuthError::invalid_client("Invalid client: missing client `grants`"));
        }
        if !client.allows_grant(BuiltinGrant::AuthorizationCode.name()) {
            return Err(OAuthError::unauthorized_client(
                "Unauthorized client: `grant_type` is invalid",
            ));
        }
        if client.redirect_uris.is_empty() {
            return Err(OAuthError::invalid_client(
                "Invalid client: missing client `redirect_uris`",
            ));
        }
        if let Some(uri) = redirect_uri {
            if !self.model.validate_redirect_uri(uri, &client).await? {
                return Err(OAuthError::invalid_client(
                    "Invalid client: `redirect_uri` does not match client value",
                ));
            }
        }
        Ok(client)
    }

    async fn get_user(&self, request: &Request, response: &mut Response) -> OAuthResult<M::User> {
        let user = match &self.options.authenticate_handler {
            Some(custom) => custom.authenticate_user(request, response).await?,
            None => {
                AuthenticateHandler::new(Arc::clone(&self.model), self.options.authenticate.clone())
                    .authenticate_user(request, response)
                    .await?
            }
        };
        user.ok_or_else(|| {
            OAuthError::server_error("Server error: `authenticate_user()` did not return a user")
        })
    }

    fn get_redirect_uri(request: &Request, client: &Client) -> OAuthResult<String> {
        request
            .param("redirect_uri")
            .or_else(|| client.redirect_uris.first().map(String::as_str))
            .map(str::to_owned)
            .ok_or_else(|| {
                OAuthError::invalid_client("Invalid client: missing client `redirect_uris`")
            })
    }

    fn get_state<'r>(&self, request: &'r Request) -> OAuthResult<Option<&'r str>> {
        match request.param("state") {
            Some(state) if validator::vschar(state) => Ok(Some(state)),
            Some(_) => Err(OAuthError::invalid_request("Invalid parameter: `state`")),
            None if self.options.allow_empty_state => Ok(None),
            None => Err(OAuthError::invalid_request("Missing parameter: `state`")),
        }
    }

    fn get_scope(request: &Request) -> OAuthResult<Scope> {
        let scope = request.param("scope");
        if scope.is_some_and(|s| !validator::nqschar(s)) {
            return Err(OAuthError::invalid_scope("Invalid parameter: `scope`"));
        }
        Ok(parse_scope(scope))
    }

    async fn validate_scope(
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

    async fn generate_authorization_code(
        &self,
        client: &Client,
        user: &M::User,
        scope: &[String],
    ) -> OAuthResult<String> {
        let custom = self.model.generate_authorization_code(client, user, scope).await?;
        Ok(custom.filter(|c| !c.is_empty()).unwrap_or_else(random_token))
    }

    /// `code` is the only response type.
    fn get_response_type(request: &Request) -> OAuthResult<()> {
        match request.param("response_type") {
            None => Err(OAuthError::invalid_request("Missing parameter: `response_type`")),
            Some("code") => Ok(()),
            Some(_) => Err(OAuthError::unsupported_response_type(
                "Unsupported response type: `response_type` is not supported",
            )),
        }
    }

    fn get_code_challenge_method(request: &Request) -> OAuthResult<&'static str> {
        match request.param("code_challenge_method") {
            None => Ok(pkce::Method::Plain.as_str()),
            Some(method) => pkce::Method::parse(method).map(pkce::Method::as_str).ok_or_else(|| {
                OAuthError::invalid_request(format!(
                    "Invalid request: transform algorithm '{method}' not supported"
                ))
            }),
        }
    }
}

fn append_state(target: &mut Url, state: Option<&str>) {
    if let Some(state) = state {
        target.query_pairs_mut().append_pair("state", state);
    }
}

impl<M: Model> std::fmt::Debug for AuthorizeHandler<M> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthorizeHandler").field("options", &self.options).finish_non_exhaustive()
    }
}
