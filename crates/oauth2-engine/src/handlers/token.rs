//! Token endpoint (RFC 6749 §3.2).

use std::sync::Arc;

use chrono::Utc;
use http::Method;

use super::{ClientCredentials, challenge_invalid_client, set_no_cache, write_error};
use crate::bearer::BearerToken;
use crate::config::TokenOptions;
use crate::error::{OAuthError, OAuthResult};
use crate::grant_types::{self, ExtendedGrantType, ExtendedGrantTypes, GrantContext};
use crate::model::Model;
use crate::pkce;
use crate::request::Request;
use crate::response::Response;
use crate::types::{Client, Token};
use crate::validator;

pub struct TokenHandler<M: Model> {
    model: Arc<M>,
    options: TokenOptions,
    extended_grant_types: ExtendedGrantTypes<M>,
}

impl<M: Model + 'static> TokenHandler<M> {
    /// # Errors
    ///
    /// `invalid_argument` if a configured lifetime is zero.
    pub fn new(model: Arc<M>, options: TokenOptions) -> OAuthResult<Self> {
        options.validate()?;
        Ok(Self { model, options, extended_grant_types: ExtendedGrantTypes::new() })
    }

    /// Register an additional grant type under `name`.
    #[must_use]
    pub fn with_extended_grant_type(
        mut self,
        name: impl Into<String>,
        grant: Arc<dyn ExtendedGrantType<M>>,
    ) -> Self {
        self.extended_grant_types.insert(name.into(), grant);
        self
    }

    #[must_use]
    pub(crate) fn with_extended_grant_types(mut self, grants: ExtendedGrantTypes<M>) -> Self {
        self.extended_grant_types.extend(grants);
        self
    }

    /// Exchange a grant for a token.
    ///
    /// On success the response carries the bearer token body; on failure it
    /// carries `{error, error_description}` and the error's status.
    pub async fn handle(
        &self,
        request: &Request,
        response: &mut Response,
    ) -> OAuthResult<Token<M::User>> {
        match self.issue(request, response).await {
            Ok((token, body)) => {
                response.body = Some(body.to_body());
                set_no_cache(response);
                Ok(token)
            }
            Err(err) => {
                tracing::debug!(error = %err, status = err.status(), "Token request rejected");
                write_error(response, &err);
                Err(err)
            }
        }
    }

    async fn issue(
        &self,
        request: &Request,
        response: &mut Response,
    ) -> OAuthResult<(Token<M::User>, BearerToken)> {
        if request.method != Method::POST {
            return Err(OAuthError::invalid_request("Invalid request: method must be POST"));
        }
        if !request.is_form() {
            return Err(OAuthError::invalid_request(
                "Invalid request: content must be application/x-www-form-urlencoded",
            ));
        }

        let client = match self.get_client(request).await {
            Ok(client) => client,
            Err(err) => {
                tracing::warn!(error = %err, "Client authentication failed");
                return Err(challenge_invalid_client(err, request, response));
            }
        };

        let token = self.handle_grant_type(request, &client).await?;
        let body = BearerToken::from_token(
            &token,
            self.options.allow_extended_token_attributes,
            Utc::now(),
        )?;

        tracing::info!(
            client_id = %client.id,
            grant_type = request.body_param("grant_type").unwrap_or_default(),
            "Issued access token"
        );
        Ok((token, body))
    }

    fn get_client_credentials(&self, request: &Request) -> OAuthResult<ClientCredentials> {
        if let Some(credentials) = ClientCredentials::from_basic_or_body(request) {
            return Ok(credentials);
        }

        let grant_type = request.body_param("grant_type");
        let verifier = request.body_param("code_verifier");
        let public_client_allowed = pkce::is_pkce_request(grant_type, verifier)
            || !self.options.is_client_authentication_required(grant_type);
        if public_client_allowed {
            if let Some(credentials) = ClientCredentials::id_only(request) {
                return Ok(credentials);
            }
        }

        Err(OAuthError::invalid_client("Invalid client: cannot retrieve client credentials"))
    }

    async fn get_client(&self, request: &Request) -> OAuthResult<Client> {
        let credentials = self.get_client_credentials(request)?;
        let grant_type = request.body_param("grant_type");
        let secret_required = self.options.is_client_authentication_required(grant_type)
            && !pkce::is_pkce_request(grant_type, request.body_param("code_verifier"));
        credentials.validate(secret_required)?;

        let client = self.model.get_client(&credentials.id, credentials.secret.as_deref()).await?;
        let Some(client) = client else {
            return Err(OAuthError::invalid_client("Invalid client: client is invalid"));
        };
        if client.grants.is_none() {
            return Err(OAuthError::server_error("Server error: missing client `grants`"));
        }

        tracing::debug!(client_id = %client.id, "Authenticated client");
        Ok(client)
    }

    async fn handle_grant_type(
        &self,
        request: &Request,
        client: &Client,
    ) -> OAuthResult<Token<M::User>> {
        let Some(grant_type) = request.body_param("grant_type") else {
            return Err(OAuthError::invalid_request("Missing parameter: `grant_type`"));
        };
        if !validator::nchar(grant_type) && !validator::uri(grant_type) {
            return Err(OAuthError::invalid_request("Invalid parameter: `grant_type`"));
        }
        if !grant_types::is_supported(grant_type, &self.extended_grant_types) {
            return Err(OAuthError::unsupported_grant_type(
                "Unsupported grant type: `grant_type` is invalid",
            ));
        }
        if !client.allows_grant(grant_type) {
            return Err(OAuthError::unauthorized_client(
                "Unauthorized client: `grant_type` is invalid",
            ));
        }

        let ctx = GrantContext::new(
            Arc::clone(&self.model),
            self.access_token_lifetime(client),
            self.refresh_token_lifetime(client),
            self.options.always_issue_new_refresh_token,
        )?;
        let Some(grant) = grant_types::create(grant_type, ctx, &self.extended_grant_types) else {
            return Err(OAuthError::unsupported_grant_type(
                "Unsupported grant type: `grant_type` is invalid",
            ));
        };

        tracing::debug!(client_id = %client.id, grant_type, "Dispatching grant");
        grant.handle(request, client).await
    }

    fn access_token_lifetime(&self, client: &Client) -> u64 {
        client
            .access_token_lifetime
            .filter(|&secs| secs > 0)
            .unwrap_or(self.options.access_token_lifetime)
    }

    fn refresh_token_lifetime(&self, client: &Client) -> u64 {
        client
            .refresh_token_lifetime
            .filter(|&secs| secs > 0)
            .unwrap_or(self.options.refresh_token_lifetime)
    }
}

impl<M: Model> std::fmt::Debug for TokenHandler<M> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenHandler")
            .field("options", &self.options)
            .field("extended_grant_types", &self.extended_grant_types.keys().collect::<Vec<_>>())
            .finish_non_exhaustive()
    }
}
