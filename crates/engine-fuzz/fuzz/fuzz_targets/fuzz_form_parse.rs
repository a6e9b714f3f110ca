#![no_main]

use libfuzzer_sys::fuzz_target;
use oauth2_engine::types::{format_scope, parse_scope};
use oauth2_engine::{Request, validator};

fuzz_target!(|data: &[u8]| {
    let Ok(raw) = std::str::from_utf8(data) else {
        return;
    };
    let form = Request::parse_form(raw);
    for (key, value) in &form {
        let _ = validator::nchar(key);
        let _ = validator::vschar(value);
        let _ = validator::uchar(value);
    }
    if let Some(scope) = form.get("scope") {
        if validator::nqschar(scope) {
            let parsed = parse_scope(Some(scope));
            assert_eq!(parse_scope(Some(&format_scope(&parsed))), parsed);
        }
    }
});
