#![no_main]
use drier_core::{Reading, TargetUpdate};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Ok(body) = serde_json::from_slice::<serde_json::Value>(data) else {
        return;
    };
    if let Ok(r) = Reading::from_json(&body) {
        assert!(r.temperature_now.is_finite());
        assert!(r.humidity_now.is_finite());
        assert!(r.time_remaining.is_finite());
    }
    let _ = TargetUpdate::from_json(&body);
});
