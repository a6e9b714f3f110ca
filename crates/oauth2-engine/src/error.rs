//! Error taxonomy for the OAuth 2.0 engine.
//!
//! Every failure leaving a handler is an [`OAuthError`]: a single value type
//! parameterized by [`ErrorKind`], an HTTP status, a human message and an
//! optional inner cause. Errors raised by a [`Model`](crate::model::Model)
//! that are not already an `OAuthError` are wrapped as `server_error`.

use std::error::Error as StdError;

use http::StatusCode;

/// Boxed inner cause carried by an [`OAuthError`].
pub type BoxError = Box<dyn StdError + Send + Sync + 'static>;

/// The OAuth `error` kinds known to the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// The resource owner or authorization server denied the request.
    AccessDenied,
    /// The request requires higher privileges than provided by the access token.
    InsufficientScope,
    /// Internal contract violation raised by the engine itself.
    InvalidArgument,
    /// Client authentication failed.
    InvalidClient,
    /// The grant (code, credentials, refresh token) is invalid, expired or revoked.
    InvalidGrant,
    /// The request is missing a parameter or is otherwise malformed.
    InvalidRequest,
    /// The requested scope is invalid, unknown or malformed.
    InvalidScope,
    /// The access token is invalid, expired or revoked.
    InvalidToken,
    /// Unexpected condition, usually a wrapped collaborator failure.
    ServerError,
    /// The client is not allowed to use the requested grant.
    UnauthorizedClient,
    /// The request carried no authentication at all.
    UnauthorizedRequest,
    /// The grant type is not supported by the server.
    UnsupportedGrantType,
    /// The response type is not supported by the server.
    UnsupportedResponseType,
    /// The token type is not supported (token-type negotiation).
    UnsupportedTokenType,
}

impl ErrorKind {
    /// The OAuth `error` value for this kind.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::AccessDenied => "access_denied",
            Self::InsufficientScope => "insufficient_scope",
            Self::InvalidArgument => "invalid_argument",
            Self::InvalidClient => "invalid_client",
            Self::InvalidGrant => "invalid_grant",
            Self::InvalidRequest => "invalid_request",
            Self::InvalidScope => "invalid_scope",
            Self::InvalidToken => "invalid_token",
            Self::ServerError => "server_error",
            Self::UnauthorizedClient => "unauthorized_client",
            Self::UnauthorizedRequest => "unauthorized_request",
            Self::UnsupportedGrantType => "unsupported_grant_type",
            Self::UnsupportedResponseType => "unsupported_response_type",
            Self::UnsupportedTokenType => "unsupported_token_type",
        }
    }

    /// Default HTTP status for this kind.
    #[must_use]
    pub const fn default_status(self) -> u16 {
        match self {
            Self::InsufficientScope => 403,
            Self::InvalidToken | Self::UnauthorizedRequest => 401,
            Self::InvalidArgument => 500,
            Self::ServerError | Self::UnsupportedTokenType => 503,
            Self::AccessDenied
            | Self::InvalidClient
            | Self::InvalidGrant
            | Self::InvalidRequest
            | Self::InvalidScope
            | Self::UnauthorizedClient
            | Self::UnsupportedGrantType
            | Self::UnsupportedResponseType => 400,
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// An OAuth protocol failure.
#[derive(thiserror::Error, Debug)]
#[error("{message}")]
pub struct OAuthError {
    kind: ErrorKind,
    status: u16,
    message: String,
    #[source]
    inner: Option<BoxError>,
}

impl OAuthError {
    /// Create an error of `kind` with its default status.
    ///
    /// An empty message is replaced by the reason phrase of the status.
    #[must_use]
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        let status = kind.default_status();
        Self { kind, status, message: message_or_reason(message.into(), status), inner: None }
    }

    /// Override the HTTP status (e.g. `invalid_client` escalated to 401).
    #[must_use]
    pub fn with_status(mut self, status: u16) -> Self {
        if self.message == reason_phrase(self.status) {
            self.message = reason_phrase(status);
        }
        self.status = status;
        self
    }

    /// Attach the underlying cause.
    #[must_use]
    pub fn with_inner(mut self, inner: impl Into<BoxError>) -> Self {
        self.inner = Some(inner.into());
        self
    }

    #[must_use]
    pub fn access_denied(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::AccessDenied, message)
    }

    #[must_use]
    pub fn insufficient_scope(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::InsufficientScope, message)
    }

    #[must_use]
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::InvalidArgument, message)
    }

    #[must_use]
    pub fn invalid_client(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::InvalidClient, message)
    }

    #[must_use]
    pub fn invalid_grant(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::InvalidGrant, message)
    }

    #[must_use]
    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::InvalidRequest, message)
    }

    #[must_use]
    pub fn invalid_scope(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::InvalidScope, message)
    }

    #[must_use]
    pub fn invalid_token(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::InvalidToken, message)
    }

    #[must_use]
    pub fn server_error(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::ServerError, message)
    }

    #[must_use]
    pub fn unauthorized_client(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::UnauthorizedClient, message)
    }

    #[must_use]
    pub fn unauthorized_request(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::UnauthorizedRequest, message)
    }

    #[must_use]
    pub fn unsupported_grant_type(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::UnsupportedGrantType, message)
    }

    #[must_use]
    pub fn unsupported_response_type(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::UnsupportedResponseType, message)
    }

    #[must_use]
    pub fn unsupported_token_type(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::UnsupportedTokenType, message)
    }

    /// Wrap a foreign failure as a `server_error`, keeping it as the inner cause.
    #[must_use]
    pub fn wrap(inner: impl Into<BoxError>) -> Self {
        let inner = inner.into();
        Self::server_error(inner.to_string()).with_inner(inner)
    }

    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        self.kind
    }

    #[must_use]
    pub fn is(&self, kind: ErrorKind) -> bool {
        self.kind == kind
    }

    /// HTTP status code to respond with.
    #[must_use]
    pub const fn status(&self) -> u16 {
        self.status
    }

    /// The OAuth `error` value.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        self.kind.name()
    }

    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }

    /// The wrapped cause, if any.
    #[must_use]
    pub fn inner(&self) -> Option<&(dyn StdError + Send + Sync + 'static)> {
        self.inner.as_deref()
    }

    /// JSON error body per RFC 6749 §5.2.
    #[must_use]
    pub fn to_body(&self) -> serde_json::Value {
        serde_json::json!({
            "error": self.name(),
            "error_description": self.message,
        })
    }
}

impl From<anyhow::Error> for OAuthError {
    fn from(err: anyhow::Error) -> Self {
        match err.downcast::<Self>() {
            Ok(oauth) => oauth,
            Err(other) => {
                let message = other.to_string();
                Self::server_error(message).with_inner(other)
            }
        }
    }
}

fn reason_phrase(status: u16) -> String {
    StatusCode::from_u16(status)
        .ok()
        .and_then(|s| s.canonical_reason())
        .unwrap_or_default()
        .to_string()
}

fn message_or_reason(message: String, status: u16) -> String {
    if message.is_empty() { reason_phrase(status) } else { message }
}

/// Result type alias for engine operations.
pub type OAuthResult<T> = Result<T, OAuthError>;
