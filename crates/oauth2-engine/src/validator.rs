//! Character-class validators from RFC 6749 Appendix A.

use std::sync::LazyLock;

use regex::Regex;

static NCHAR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[-._A-Za-z0-9]+$").expect("valid regex"));

static NQCHAR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[\x21\x23-\x5B\x5D-\x7E]+$").expect("valid regex"));

static NQSCHAR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[\x20-\x21\x23-\x5B\x5D-\x7E]+$").expect("valid regex"));

static UNICODECHARNOCRLF: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[\x09\x20-\x7E\x{80}-\x{D7FF}\x{E000}-\x{FFFD}\x{10000}-\x{10FFFF}]+$")
        .expect("valid regex")
});

static URI: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-zA-Z][a-zA-Z0-9+.-]+:").expect("valid regex"));

static VSCHAR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[\x20-\x7E]+$").expect("valid regex"));

/// `NCHAR`: used by `grant_type` names.
#[must_use]
pub fn nchar(value: &str) -> bool {
    NCHAR.is_match(value)
}

/// `NQCHAR`: a single scope token.
#[must_use]
pub fn nqchar(value: &str) -> bool {
    NQCHAR.is_match(value)
}

/// `NQSCHAR`: printable ASCII plus space, without `"` or `\`.
#[must_use]
pub fn nqschar(value: &str) -> bool {
    NQSCHAR.is_match(value)
}

/// `UNICODECHARNOCRLF`: usernames and passwords.
#[must_use]
pub fn uchar(value: &str) -> bool {
    UNICODECHARNOCRLF.is_match(value)
}

/// Loose URI check: a scheme followed by `:`.
#[must_use]
pub fn uri(value: &str) -> bool {
    URI.is_match(value)
}

/// `VSCHAR`: printable ASCII including space.
#[must_use]
pub fn vschar(value: &str) -> bool {
    VSCHAR.is_match(value)
}
