//! PKCE (Proof Key for Code Exchange) verification.
//!
//! Implements the `plain` and `S256` transforms of RFC 7636.

use std::sync::LazyLock;

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use regex::Regex;
use sha2::{Digest, Sha256};

/// Grant type that PKCE applies to.
const AUTHORIZATION_CODE: &str = "authorization_code";

/// `code-challenge = 43*128unreserved` (RFC 7636 §4.2); verifiers share the grammar.
static CODE_CHALLENGE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9._~-]{43,128}$").expect("valid regex"));

/// Supported code challenge methods.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Plain,
    S256,
}

impl Method {
    /// Parse a `code_challenge_method` value. Matching is case-sensitive.
    #[must_use]
    pub fn parse(method: &str) -> Option<Self> {
        match method {
            "plain" => Some(Self::Plain),
            "S256" => Some(Self::S256),
            _ => None,
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Plain => "plain",
            Self::S256 => "S256",
        }
    }
}

/// True only for `S256` and `plain`.
#[must_use]
pub fn is_valid_method(method: &str) -> bool {
    Method::parse(method).is_some()
}

/// Transform `verifier` the way `method` prescribes.
///
/// Returns `None` for an unknown method or an empty verifier; callers treat
/// that as "cannot verify".
#[must_use]
pub fn hash_for_challenge(method: &str, verifier: &str) -> Option<String> {
    if verifier.is_empty() {
        return None;
    }
    match Method::parse(method)? {
        Method::Plain => Some(verifier.to_owned()),
        Method::S256 => Some(URL_SAFE_NO_PAD.encode(Sha256::digest(verifier.as_bytes()))),
    }
}

/// True iff the grant is `authorization_code` and a verifier was supplied.
#[must_use]
pub fn is_pkce_request(grant_type: Option<&str>, code_verifier: Option<&str>) -> bool {
    grant_type == Some(AUTHORIZATION_CODE) && code_verifier.is_some_and(|v| !v.is_empty())
}

/// 43–128 characters from `[A-Za-z0-9._~-]`.
#[must_use]
pub fn code_challenge_matches_abnf(challenge: &str) -> bool {
    CODE_CHALLENGE.is_match(challenge)
}
