#![no_main]

use libfuzzer_sys::fuzz_target;
use oauth2_engine::pkce;

fuzz_target!(|data: &[u8]| {
    let Ok(verifier) = std::str::from_utf8(data) else {
        return;
    };
    let _ = pkce::code_challenge_matches_abnf(verifier);
    if let Some(challenge) = pkce::hash_for_challenge("S256", verifier) {
        assert!(pkce::code_challenge_matches_abnf(&challenge));
    }
    if let Some(challenge) = pkce::hash_for_challenge("plain", verifier) {
        assert_eq!(challenge, verifier);
    }
});
