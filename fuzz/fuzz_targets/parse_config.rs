#![no_main]

use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    // Only attempt valid UTF-8; resolve must reject bad values without panicking.
    if let Ok(s) = std::str::from_utf8(data) {
        if let Ok(file) = loadgate_config::parse_config_str(s) {
            let _ = loadgate_config::resolve(Some(&file), &loadgate_config::Overrides::default());
        }
    }
});
