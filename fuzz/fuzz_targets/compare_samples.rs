//! Structure-aware fuzzing of the Welch comparator on raw sample vectors.

#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use loadgate_domain::Comparator;
use loadgate_types::{AnalysisConfig, Direction, PValueMode};

#[derive(Arbitrary, Debug)]
struct Input {
    baseline: Vec<f64>,
    comparison: Vec<f64>,
    higher_is_better: bool,
    student_t: bool,
}

fuzz_target!(|input: Input| {
    let (Ok(b), Ok(c)) = (
        loadgate_stats::summarize(&input.baseline),
        loadgate_stats::summarize(&input.comparison),
    ) else {
        return;
    };

    let config = AnalysisConfig {
        p_value_mode: if input.student_t { PValueMode::StudentT } else { PValueMode::Lookup },
        ..AnalysisConfig::default()
    };
    let direction = if input.higher_is_better { Direction::Higher } else { Direction::Lower };

    let result = Comparator::new(config).compare("fuzz.metric", &b, &c, direction);
    let p = result.significance.p_value;
    assert!(p.is_nan() || (0.0..=1.0).contains(&p), "p-value out of range: {p}");
    assert!(!(result.interpretation.is_regression && result.interpretation.is_improvement));
});
