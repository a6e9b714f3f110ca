//! Endpoint handlers.
//!
//! Each handler reads a [`Request`], writes status, headers and body into a
//! [`Response`], and also returns the outcome so the embedding layer can act
//! on it (e.g. attach the authenticated token to its own request context).

use http::header::{CACHE_CONTROL, PRAGMA, WWW_AUTHENTICATE};
use http::StatusCode;

use crate::config::defaults;
use crate::error::{ErrorKind, OAuthError, OAuthResult};
use crate::request::Request;
use crate::response::Response;
use crate::validator;

pub mod authenticate;
pub mod authorize;
pub mod revoke;
pub mod token;

pub use authenticate::AuthenticateHandler;
pub use authorize::{AuthenticateUser, AuthorizeHandler};
pub use revoke::RevokeHandler;
pub use token::TokenHandler;

// ─── Client credentials ─────────────────────────────────────────────────────

/// Client identification extracted from a token or revoke request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct ClientCredentials {
    pub id: String,
    pub secret: Option<String>,
}

impl ClientCredentials {
    /// Basic auth first, then `client_id` + `client_secret` in the body.
    pub fn from_basic_or_body(request: &Request) -> Option<Self> {
        if let Some(basic) = request.basic_credentials() {
            return Some(Self { id: basic.name, secret: Some(basic.pass) });
        }
        match (request.body_param("client_id"), request.body_param("client_secret")) {
            (Some(id), Some(secret)) => {
                Some(Self { id: id.to_owned(), secret: Some(secret.to_owned()) })
            }
            _ => None,
        }
    }

    /// `client_id` alone, for public clients.
    pub fn id_only(request: &Request) -> Option<Self> {
        request.body_param("client_id").map(|id| Self { id: id.to_owned(), secret: None })
    }

    /// Syntax checks shared by the token and revoke endpoints.
    pub fn validate(&self, secret_required: bool) -> OAuthResult<()> {
        if self.id.is_empty() {
            return Err(OAuthError::invalid_request("Missing parameter: `client_id`"));
        }
        if secret_required && self.secret.as_deref().is_none_or(str::is_empty) {
            return Err(OAuthError::invalid_request("Missing parameter: `client_secret`"));
        }
        if !validator::vschar(&self.id) {
            return Err(OAuthError::invalid_request("Invalid parameter: `client_id`"));
        }
        if self.secret.as_deref().is_some_and(|s| !s.is_empty() && !validator::vschar(s)) {
            return Err(OAuthError::invalid_request("Invalid parameter: `client_secret`"));
        }
        Ok(())
    }
}

// ─── Response helpers ───────────────────────────────────────────────────────

/// `Cache-Control: no-store` and `Pragma: no-cache` (RFC 6749 §5.1).
pub(crate) fn set_no_cache(response: &mut Response) {
    response.set_header(CACHE_CONTROL, "no-store");
    response.set_header(PRAGMA, "no-cache");
}

/// Write `{error, error_description}` with the error's status.
pub(crate) fn write_error(response: &mut Response, err: &OAuthError) {
    response.status =
        StatusCode::from_u16(err.status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    response.body = Some(err.to_body());
}

/// A failed client authentication over HTTP Basic answers 401 with a challenge
/// (RFC 6749 §5.2).
pub(crate) fn challenge_invalid_client(
    err: OAuthError,
    request: &Request,
    response: &mut Response,
) -> OAuthError {
    if err.is(ErrorKind::InvalidClient) && request.has_authorization() {
        response.set_header(WWW_AUTHENTICATE, &format!("Basic realm=\"{}\"", defaults::REALM));
        return err.with_status(401);
    }
    err
}

#[cfg(test)]
mod tests {
    use base64::Engine;
    use base64::engine::general_purpose::STANDARD;
    use http::HeaderValue;
    use http::header::AUTHORIZATION;

    use super::*;

    fn basic(id: &str, secret: &str) -> HeaderValue {
        let encoded = STANDARD.encode(format!("{id}:{secret}"));
        HeaderValue::from_str(&format!("Basic {encoded}")).unwrap()
    }

    #[test]
    fn test_basic_credentials_take_precedence() {
        let request = Request::post_form([("client_id", "body"), ("client_secret", "s")])
            .with_header(AUTHORIZATION, basic("header", "pw"));
        let creds = ClientCredentials::from_basic_or_body(&request).unwrap();
        assert_eq!(creds.id, "header");
        assert_eq!(creds.secret.as_deref(), Some("pw"));
    }

    #[test]
    fn test_body_credentials_need_both_fields() {
        let request = Request::post_form([("client_id", "c1")]);
        assert!(ClientCredentials::from_basic_or_body(&request).is_none());
        assert_eq!(ClientCredentials::id_only(&request).unwrap().id, "c1");
    }

    #[test]
    fn test_validate_rejects_control_characters() {
        let creds = ClientCredentials { id: "c\u{1}".into(), secret: Some("s".into()) };
        assert_eq!(creds.validate(true).unwrap_err().message(), "Invalid parameter: `client_id`");

        let creds = ClientCredentials { id: "c1".into(), secret: None };
        assert_eq!(
            creds.validate(true).unwrap_err().message(),
            "Missing parameter: `client_secret`"
        );
        assert!(creds.validate(false).is_ok());
    }

    #[test]
    fn test_invalid_client_challenge_only_with_authorization_header() {
        let mut response = Response::new();
        let err = challenge_invalid_client(
            OAuthError::invalid_client("Invalid client: client is invalid"),
            &Request::post_form::<&str, &str>([]),
            &mut response,
        );
        assert_eq!(err.status(), 400);
        assert!(response.header(WWW_AUTHENTICATE).is_none());

        let request =
            Request::post_form::<&str, &str>([]).with_header(AUTHORIZATION, basic("a", "b"));
        let err = challenge_invalid_client(
            OAuthError::invalid_client("Invalid client: client is invalid"),
            &request,
            &mut response,
        );
        assert_eq!(err.status(), 401);
        assert_eq!(response.header(WWW_AUTHENTICATE), Some("Basic realm=\"Service\""));
    }
}
