//! Transport-neutral request value.
//!
//! The embedding HTTP layer copies method, headers, query string and the
//! decoded form body into a [`Request`]; the handlers read nothing else.

use std::collections::HashMap;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use http::header::{AUTHORIZATION, CONTENT_TYPE, HeaderName};
use http::{HeaderMap, HeaderValue, Method};

/// Media type every token, revoke and body-token request must carry.
pub const FORM_URLENCODED: &str = "application/x-www-form-urlencoded";

/// An incoming OAuth request.
#[derive(Debug, Clone)]
pub struct Request {
    pub method: Method,
    pub headers: HeaderMap,
    pub query: HashMap<String, String>,
    pub body: HashMap<String, String>,
}

/// Credentials from an `Authorization: Basic` header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BasicCredentials {
    pub name: String,
    pub pass: String,
}

impl Request {
    #[must_use]
    pub fn new(method: Method) -> Self {
        Self {
            method,
            headers: HeaderMap::new(),
            query: HashMap::new(),
            body: HashMap::new(),
        }
    }

    /// Build from parts already extracted by the transport layer.
    #[must_use]
    pub fn from_parts(
        method: Method,
        headers: HeaderMap,
        query: HashMap<String, String>,
        body: HashMap<String, String>,
    ) -> Self {
        Self { method, headers, query, body }
    }

    /// A `GET` request with no parameters.
    #[must_use]
    pub fn get() -> Self {
        Self::new(Method::GET)
    }

    /// A `POST` form request with the given body fields.
    #[must_use]
    pub fn post_form<K, V>(fields: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        let mut request = Self::new(Method::POST)
            .with_header(CONTENT_TYPE, HeaderValue::from_static(FORM_URLENCODED));
        request.body = fields.into_iter().map(|(k, v)| (k.into(), v.into())).collect();
        request
    }

    #[must_use]
    pub fn with_header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }

    #[must_use]
    pub fn with_query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.insert(key.into(), value.into());
        self
    }

    #[must_use]
    pub fn with_body(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.body.insert(key.into(), value.into());
        self
    }

    /// Decode an `application/x-www-form-urlencoded` payload (body or query string).
    ///
    /// Later duplicates overwrite earlier ones.
    #[must_use]
    pub fn parse_form(raw: &str) -> HashMap<String, String> {
        url::form_urlencoded::parse(raw.as_bytes()).into_owned().collect()
    }

    /// Header value as a string, if present and visible ASCII.
    #[must_use]
    pub fn header(&self, name: impl http::header::AsHeaderName) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// Non-empty body field.
    #[must_use]
    pub fn body_param(&self, name: &str) -> Option<&str> {
        self.body.get(name).map(String::as_str).filter(|v| !v.is_empty())
    }

    /// Non-empty query field.
    #[must_use]
    pub fn query_param(&self, name: &str) -> Option<&str> {
        self.query.get(name).map(String::as_str).filter(|v| !v.is_empty())
    }

    /// Body field, falling back to the query string.
    #[must_use]
    pub fn param(&self, name: &str) -> Option<&str> {
        self.body_param(name).or_else(|| self.query_param(name))
    }

    /// Whether the content type is `application/x-www-form-urlencoded` (parameters ignored).
    #[must_use]
    pub fn is_form(&self) -> bool {
        self.header(CONTENT_TYPE)
            .and_then(|ct| ct.split(';').next())
            .is_some_and(|mime| mime.trim().eq_ignore_ascii_case(FORM_URLENCODED))
    }

    /// Whether an `Authorization` header of any scheme was sent.
    #[must_use]
    pub fn has_authorization(&self) -> bool {
        self.headers.contains_key(AUTHORIZATION)
    }

    /// Parse `Authorization: Basic <base64(name:pass)>` (RFC 7617).
    ///
    /// Returns `None` when the header is absent, uses another scheme, or is malformed.
    #[must_use]
    pub fn basic_credentials(&self) -> Option<BasicCredentials> {
        parse_basic(self.header(AUTHORIZATION)?)
    }
}

/// Parse the value of a Basic `Authorization` header.
#[must_use]
pub fn parse_basic(header: &str) -> Option<BasicCredentials> {
    let mut parts = header.trim().splitn(2, ' ');
    let scheme = parts.next()?;
    if !scheme.eq_ignore_ascii_case("basic") {
        return None;
    }
    let encoded = parts.next()?.trim();
    if encoded.is_empty() {
        return None;
    }
    let decoded = STANDARD.decode(encoded).ok()?;
    let decoded = String::from_utf8(decoded).ok()?;
    let (name, pass) = decoded.split_once(':')?;
    Some(BasicCredentials { name: name.to_owned(), pass: pass.to_owned() })
}
