//! Bearer token authentication for protected resources (RFC 6750).

use std::sync::{Arc, LazyLock};

use async_trait::async_trait;
use chrono::Utc;
use http::Method;
use http::header::{AUTHORIZATION, HeaderName, WWW_AUTHENTICATE};
use regex::Regex;

use super::authorize::AuthenticateUser;
use super::write_error;
use crate::config::{AuthenticateOptions, defaults};
use crate::error::{ErrorKind, OAuthError, OAuthResult};
use crate::model::Model;
use crate::request::Request;
use crate::response::Response;
use crate::types::{Token, format_scope};

static BEARER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^Bearer\s(\S+)").expect("valid regex"));

const ACCEPTED_SCOPES: HeaderName = HeaderName::from_static("x-accepted-oauth-scopes");
const AUTHORIZED_SCOPES: HeaderName = HeaderName::from_static("x-oauth-scopes");

pub struct AuthenticateHandler<M: Model> {
    model: Arc<M>,
    options: AuthenticateOptions,
}

impl<M: Model> AuthenticateHandler<M> {
    #[must_use]
    pub const fn new(model: Arc<M>, options: AuthenticateOptions) -> Self {
        Self { model, options }
    }

    /// Resolve the access token presented with `request`.
    ///
    /// Failures set `WWW-Authenticate` along with the error status and body.
    pub async fn handle(
        &self,
        request: &Request,
        response: &mut Response,
    ) -> OAuthResult<Token<M::User>> {
        match self.authenticate(request, response).await {
            Ok(token) => Ok(token),
            Err(err) => {
                tracing::debug!(error = %err, "Bearer authentication failed");
                if let Some(challenge) = challenge_for(&err) {
                    response.set_header(WWW_AUTHENTICATE, &challenge);
                }
                write_error(response, &err);
                Err(err)
            }
        }
    }

    async fn authenticate(
        &self,
        request: &Request,
        response: &mut Response,
    ) -> OAuthResult<Token<M::User>> {
        let presented = self.get_token_from_request(request)?;
        let token = self.get_access_token(presented).await?;
        Self::validate_access_token(&token)?;
        if !self.options.scope.is_empty() {
            self.verify_scope(&token).await?;
        }
        self.update_response(response, &token);
        Ok(token)
    }

    fn get_token_from_request<'r>(&self, request: &'r Request) -> OAuthResult<&'r str> {
        let query = request.query_param("access_token");
        let body = request.body_param("access_token");

        let sources = [request.has_authorization(), query.is_some(), body.is_some()];
        if sources.into_iter().filter(|&present| present).count() > 1 {
            return Err(OAuthError::invalid_request(
                "Invalid request: only one authentication method is allowed",
            ));
        }

        if request.has_authorization() {
            let malformed =
                || OAuthError::invalid_request("Invalid request: malformed authorization header");
            let header = request.header(AUTHORIZATION).ok_or_else(malformed)?;
            return BEARER
                .captures(header)
                .and_then(|c| c.get(1))
                .map(|m| m.as_str())
                .ok_or_else(malformed);
        }

        if let Some(token) = query {
            if !self.options.allow_bearer_tokens_in_query_string {
                return Err(OAuthError::invalid_request(
                    "Invalid request: do not send bearer tokens in query URLs",
                ));
            }
            return Ok(token);
        }

        if let Some(token) = body {
            if request.method == Method::GET {
                return Err(OAuthError::invalid_request(
                    "Invalid request: token may not be passed in the body when using the GET verb",
                ));
            }
            if !request.is_form() {
                return Err(OAuthError::invalid_request(
                    "Invalid request: content must be application/x-www-form-urlencoded",
                ));
            }
            return Ok(token);
        }

        Err(OAuthError::unauthorized_request("Unauthorized request: no authentication given"))
    }

    async fn get_access_token(&self, value: &str) -> OAuthResult<Token<M::User>> {
        let Some(token) = self.model.get_access_token(value).await? else {
            return Err(OAuthError::invalid_token("Invalid token: access token is invalid"));
        };
        if token.user.is_none() {
            return Err(OAuthError::server_error(
                "Server error: `get_access_token()` did not return a `user`",
            ));
        }
        Ok(token)
    }

    fn validate_access_token(token: &Token<M::User>) -> OAuthResult<()> {
        let Some(expires_at) = token.access_token_expires_at else {
            return Err(OAuthError::server_error(
                "Server error: `access_token_expires_at` is missing",
            ));
        };
        if expires_at < Utc::now() {
            return Err(OAuthError::invalid_token("Invalid token: access token has expired"));
        }
        Ok(())
    }

    async fn verify_scope(&self, token: &Token<M::User>) -> OAuthResult<()> {
        if !self.model.verify_scope(token, &self.options.scope).await? {
            return Err(OAuthError::insufficient_scope(
                "Insufficient scope: authorized scope is insufficient",
            ));
        }
        Ok(())
    }

    fn update_response(&self, response: &mut Response, token: &Token<M::User>) {
        if self.options.scope.is_empty() {
            return;
        }
        if self.options.add_accepted_scopes_header {
            response.set_header(ACCEPTED_SCOPES, &format_scope(&self.options.scope));
        }
        if self.options.add_authorized_scopes_header {
            response.set_header(AUTHORIZED_SCOPES, &format_scope(&token.scope));
        }
    }
}

#[async_trait]
impl<M: Model> AuthenticateUser<M::User> for AuthenticateHandler<M> {
    async fn authenticate_user(
        &self,
        request: &Request,
        response: &mut Response,
    ) -> OAuthResult<Option<M::User>> {
        let token = self.handle(request, response).await?;
        Ok(token.user)
    }
}

impl<M: Model> std::fmt::Debug for AuthenticateHandler<M> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthenticateHandler")
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

/// `WWW-Authenticate` value for a failed bearer authentication (RFC 6750 §3).
fn challenge_for(err: &OAuthError) -> Option<String> {
    match err.kind() {
        ErrorKind::UnauthorizedRequest => Some(format!("Bearer realm=\"{}\"", defaults::REALM)),
        ErrorKind::InvalidRequest | ErrorKind::InvalidToken | ErrorKind::InsufficientScope => {
            Some(format!("Bearer realm=\"{}\",error=\"{}\"", defaults::REALM, err.name()))
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use http::HeaderValue;

    use super::*;
    use crate::grant_types::test_support::StubModel;

    fn handler(options: AuthenticateOptions) -> AuthenticateHandler<StubModel> {
        AuthenticateHandler::new(Arc::new(StubModel::default()), options)
    }

    #[test]
    fn test_header_token() {
        let request =
            Request::get().with_header(AUTHORIZATION, HeaderValue::from_static("Bearer abc123"));
        let token = handler(AuthenticateOptions::default())
            .get_token_from_request(&request)
            .unwrap();
        assert_eq!(token, "abc123");
    }

    #[test]
    fn test_malformed_header() {
        let request =
            Request::get().with_header(AUTHORIZATION, HeaderValue::from_static("Basic abc"));
        let err = handler(AuthenticateOptions::default())
            .get_token_from_request(&request)
            .unwrap_err();
        assert_eq!(err.message(), "Invalid request: malformed authorization header");
    }

    #[test]
    fn test_two_sources_rejected() {
        let options = AuthenticateOptions {
            allow_bearer_tokens_in_query_string: true,
            ..AuthenticateOptions::default()
        };
        let request = Request::post_form([("access_token", "b")]).with_query("access_token", "a");
        let err = handler(options).get_token_from_request(&request).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidRequest);
    }

    #[test]
    fn test_unreadable_header_counts_as_a_source() {
        let options = AuthenticateOptions {
            allow_bearer_tokens_in_query_string: true,
            ..AuthenticateOptions::default()
        };
        let opaque = HeaderValue::from_bytes(b"Bearer \xff\xfe").unwrap();
        let request = Request::get().with_header(AUTHORIZATION, opaque);
        let err = handler(options.clone()).get_token_from_request(&request).unwrap_err();
        assert_eq!(err.message(), "Invalid request: malformed authorization header");

        let request = request.with_query("access_token", "abc");
        let err = handler(options).get_token_from_request(&request).unwrap_err();
        assert_eq!(err.message(), "Invalid request: only one authentication method is allowed");
    }

    #[test]
    fn test_query_token_requires_opt_in() {
        let request = Request::get().with_query("access_token", "abc");
        let err = handler(AuthenticateOptions::default())
            .get_token_from_request(&request)
            .unwrap_err();
        assert_eq!(err.message(), "Invalid request: do not send bearer tokens in query URLs");

        let options = AuthenticateOptions {
            allow_bearer_tokens_in_query_string: true,
            ..AuthenticateOptions::default()
        };
        assert_eq!(handler(options).get_token_from_request(&request).unwrap(), "abc");
    }

    #[test]
    fn test_body_token_not_on_get() {
        let request = Request::get().with_body("access_token", "abc");
        let err = handler(AuthenticateOptions::default())
            .get_token_from_request(&request)
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidRequest);
    }

    #[test]
    fn test_no_token() {
        let err = handler(AuthenticateOptions::default())
            .get_token_from_request(&Request::get())
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnauthorizedRequest);
    }

    #[test]
    fn test_challenges() {
        let err = OAuthError::unauthorized_request("");
        assert_eq!(challenge_for(&err).as_deref(), Some("Bearer realm=\"Service\""));
        let err = OAuthError::invalid_token("");
        assert_eq!(
            challenge_for(&err).as_deref(),
            Some("Bearer realm=\"Service\",error=\"invalid_token\"")
        );
        assert!(challenge_for(&OAuthError::server_error("")).is_none());
    }

    #[tokio::test]
    async fn test_unimplemented_lookup_is_invalid_argument() {
        let request =
            Request::get().with_header(AUTHORIZATION, HeaderValue::from_static("Bearer abc123"));
        let mut response = Response::new();
        let err = handler(AuthenticateOptions::default())
            .handle(&request, &mut response)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidArgument);
        assert_eq!(response.status_code(), 500);
    }
}
