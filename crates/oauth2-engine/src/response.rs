//! Transport-neutral response value that handlers fill in.

use http::header::{HeaderName, LOCATION};
use http::{HeaderMap, HeaderValue, StatusCode};

/// The outgoing response the embedding HTTP layer renders.
#[derive(Debug, Clone)]
pub struct Response {
    pub status: StatusCode,
    pub headers: HeaderMap,
    /// JSON body; `None` renders as an empty body.
    pub body: Option<serde_json::Value>,
}

impl Response {
    #[must_use]
    pub fn new() -> Self {
        Self { status: StatusCode::OK, headers: HeaderMap::new(), body: None }
    }

    /// Set a header, replacing any previous value.
    ///
    /// Values the engine writes are always visible ASCII; anything else is dropped
    /// with a warning rather than panicking.
    pub fn set_header(&mut self, name: HeaderName, value: &str) {
        match HeaderValue::from_str(value) {
            Ok(value) => {
                self.headers.insert(name, value);
            }
            Err(err) => {
                tracing::warn!(header = %name, error = %err, "Dropping invalid header value");
            }
        }
    }

    #[must_use]
    pub fn header(&self, name: impl http::header::AsHeaderName) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// Turn the response into a `302 Found` redirect.
    pub fn redirect(&mut self, location: &str) {
        self.status = StatusCode::FOUND;
        self.set_header(LOCATION, location);
    }

    /// Status as a number, for callers that do not depend on `http`.
    #[must_use]
    pub fn status_code(&self) -> u16 {
        self.status.as_u16()
    }
}

impl Default for Response {
    fn default() -> Self {
        Self::new()
    }
}
