#![no_main]

use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if let Ok(report) = serde_json::from_slice::<loadgate_types::ComparisonReport>(data) {
        let _ = loadgate_app::render_markdown(&report);
    }
});
