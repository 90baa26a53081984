//! Arbitrary bytes through result-set parsing, reduction and validation.

#![no_main]

use libfuzzer_sys::fuzz_target;
use loadgate_types::{RunResults, ValidationConfig};

fuzz_target!(|data: &[u8]| {
    let Ok(run) = RunResults::from_json_slice(data) else {
        return;
    };

    let index = loadgate_stats::statistics_index(&run);
    for stats in index.values().flat_map(|s| s.values()).flat_map(|m| m.values()) {
        assert!(stats.min <= stats.max);
        assert!(!(stats.stddev < 0.0));
    }

    let report = loadgate_validation::RunValidator::new(ValidationConfig::default()).validate(&run);
    assert!(report.score <= 100);
});
