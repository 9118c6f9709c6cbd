#![no_main]
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if let Ok(text) = std::str::from_utf8(data) {
        if let Some(hint) = cloudpilot::providers::reliable::parse_retry_hint(text) {
            assert!(hint.as_secs_f64().is_finite());
        }
        let _ = cloudpilot::providers::sanitize_api_error(text);
    }
});
