#![no_main]
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if let Ok(text) = std::str::from_utf8(data) {
        if let Some(object) = cloudpilot::util::extract_json_object(text) {
            assert!(object.starts_with('{') && object.ends_with('}'));
        }
        let _ = cloudpilot::util::parse_json_object::<serde_json::Value>(text);
    }
});
