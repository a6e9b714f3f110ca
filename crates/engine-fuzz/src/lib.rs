//! Fuzzing library for oauth2-engine.
//!
//! The targets feed attacker-controlled request fragments (Basic
//! credentials, form bodies, PKCE verifiers) through the engine's parsers.
//!
//! # Usage
//!
//! ```bash
//! cd crates/engine-fuzz
//! cargo +nightly fuzz run fuzz_form_parse -- -max_total_time=60
//! ```

pub use oauth2_engine::{pkce, request, types, validator};
