#![no_main]

use libfuzzer_sys::fuzz_target;
use oauth2_engine::request::parse_basic;

fuzz_target!(|data: &[u8]| {
    let Ok(header) = std::str::from_utf8(data) else {
        return;
    };
    // Must never panic; a parsed name never contains the separator
    if let Some(credentials) = parse_basic(header) {
        assert!(!credentials.name.contains(':'));
    }
});
