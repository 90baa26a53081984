//! Descriptive statistics for loadgate.
//!
//! This crate is intentionally I/O-free: ordered samples in, [`StatisticsRecord`]s out.
//!
//! Percentiles use floor-indexed rank (`sorted[floor(n * q)]`), not interpolation.
//! Variance is the population variance (divide by `n`).

mod extract;

pub use extract::{collect_metrics, extract_metrics, finite_number, visit_leaves, MAX_DEPTH};

use loadgate_types::{RunResults, ScenarioResult, StatisticsIndex, StatisticsRecord};
use std::borrow::Cow;
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StatsError {
    #[error("no finite samples to summarize")]
    NoSamples,
}

/// Reduce a sample sequence to a statistics record.
///
/// Non-finite values (`NaN`, `±inf`) are dropped before reduction. A sequence with no
/// finite values yields [`StatsError::NoSamples`], which callers keep distinct from a
/// record whose values are all zero.
pub fn summarize(values: &[f64]) -> Result<StatisticsRecord, StatsError> {
    let mut sorted: Vec<f64> = values.iter().copied().filter(|v| v.is_finite()).collect();
    if sorted.is_empty() {
        return Err(StatsError::NoSamples);
    }
    sorted.sort_by(f64::total_cmp);

    let n = sorted.len();
    // A constant sequence has exactly zero spread; summing would leave rounding residue.
    let (mean, stddev) = if sorted[0] == sorted[n - 1] {
        (sorted[0], 0.0)
    } else {
        let mean = mean_of(&sorted);
        (mean, population_stddev(&sorted, mean))
    };
    let cv = if mean > 0.0 {
        let cv = 100.0 * stddev / mean;
        if cv.is_finite() {
            cv
        } else {
            (100.0 * (stddev / mean)).min(f64::MAX)
        }
    } else {
        0.0
    };

    Ok(StatisticsRecord {
        count: n,
        min: sorted[0],
        max: sorted[n - 1],
        mean,
        median: median_sorted(&sorted),
        stddev,
        cv,
        p75: percentile_sorted(&sorted, 0.75),
        p90: percentile_sorted(&sorted, 0.90),
        p95: percentile_sorted(&sorted, 0.95),
        p99: percentile_sorted(&sorted, 0.99),
    })
}

/// Arithmetic mean that stays finite for finite input near `f64::MAX`.
fn mean_of(values: &[f64]) -> f64 {
    let n = values.len() as f64;
    let sum = values.iter().sum::<f64>();
    if sum.is_finite() {
        sum / n
    } else {
        values.iter().map(|x| x / n).sum()
    }
}

/// Population standard deviation, rescaled when the squared deviations overflow.
fn population_stddev(values: &[f64], mean: f64) -> f64 {
    let n = values.len() as f64;
    let variance = values.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / n;
    if variance.is_finite() {
        return variance.sqrt();
    }

    let scale = values.iter().fold(0.0_f64, |acc, x| acc.max(x.abs()));
    let scaled_mean = mean / scale;
    let scaled = values
        .iter()
        .map(|x| (x / scale - scaled_mean).powi(2))
        .sum::<f64>()
        / n;
    (scale * scaled.sqrt()).min(f64::MAX)
}

fn median_sorted(sorted: &[f64]) -> f64 {
    debug_assert!(!sorted.is_empty());
    let n = sorted.len();
    let mid = n / 2;
    if n % 2 == 1 {
        sorted[mid]
    } else {
        // Halve first so the midpoint of two huge values cannot overflow.
        sorted[mid - 1] / 2.0 + sorted[mid] / 2.0
    }
}

fn percentile_sorted(sorted: &[f64], q: f64) -> f64 {
    debug_assert!(!sorted.is_empty());
    let idx = (sorted.len() as f64 * q).floor() as usize;
    sorted[idx.min(sorted.len() - 1)]
}

/// Summarize every metric sequence. Sequences without finite values are left out.
pub fn summarize_metrics(samples: &BTreeMap<String, Vec<f64>>) -> BTreeMap<String, StatisticsRecord> {
    samples
        .iter()
        .filter_map(|(metric, values)| summarize(values).ok().map(|s| (metric.clone(), s)))
        .collect()
}

/// Derive per-metric statistics from a scenario's successful iterations.
pub fn summarize_scenario(scenario: &ScenarioResult) -> BTreeMap<String, StatisticsRecord> {
    let samples = collect_metrics(scenario.successful_iterations());
    summarize_metrics(&samples)
}

/// A scenario's statistics: the precomputed ones when present, otherwise derived.
pub fn scenario_statistics(scenario: &ScenarioResult) -> Cow<'_, BTreeMap<String, StatisticsRecord>> {
    if scenario.statistics.is_empty() {
        Cow::Owned(summarize_scenario(scenario))
    } else {
        Cow::Borrowed(&scenario.statistics)
    }
}

/// Statistics for every scenario of a run, deriving them where the runner left them out.
pub fn statistics_index(run: &RunResults) -> StatisticsIndex {
    run.results
        .iter()
        .map(|(env, env_results)| {
            let scenarios = env_results
                .scenarios
                .iter()
                .map(|(name, scenario)| (name.clone(), scenario_statistics(scenario).into_owned()))
                .collect();
            (env.clone(), scenarios)
        })
        .collect()
}

/// Z-score of `value` against a statistics record, `None` when the spread is zero.
pub fn z_score(value: f64, stats: &StatisticsRecord) -> Option<f64> {
    if stats.stddev > 0.0 && stats.stddev.is_finite() {
        Some((value - stats.mean).abs() / stats.stddev)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use proptest::prelude::*;
    use serde_json::json;

    #[test]
    fn summarize_known_sequence() {
        let s = summarize(&[2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0]).unwrap();
        assert_eq!(s.count, 8);
        assert_eq!(s.min, 2.0);
        assert_eq!(s.max, 9.0);
        assert_relative_eq!(s.mean, 5.0);
        // Population variance: 32 / 8 = 4.
        assert_relative_eq!(s.stddev, 2.0);
        assert_relative_eq!(s.cv, 40.0);
        assert_relative_eq!(s.median, 4.5);
        // floor(8 * 0.75) = 6, floor(8 * 0.9) = 7, ...
        assert_eq!(s.p75, 7.0);
        assert_eq!(s.p90, 9.0);
        assert_eq!(s.p95, 9.0);
        assert_eq!(s.p99, 9.0);
    }

    #[test]
    fn percentiles_use_floor_rank_not_interpolation() {
        let values: Vec<f64> = (1..=10).map(f64::from).collect();
        let s = summarize(&values).unwrap();
        assert_eq!(s.p75, 8.0);
        assert_eq!(s.p90, 10.0);
        assert_eq!(s.median, 5.5);
    }

    #[test]
    fn single_value_has_zero_spread() {
        let s = summarize(&[42.0]).unwrap();
        assert_eq!(s.count, 1);
        assert_eq!(s.stddev, 0.0);
        assert_eq!(s.cv, 0.0);
        assert_eq!(s.median, 42.0);
        assert_eq!(s.p75, 42.0);
        assert_eq!(s.p99, 42.0);
    }

    #[test]
    fn empty_and_non_finite_inputs_have_no_record() {
        assert_eq!(summarize(&[]), Err(StatsError::NoSamples));
        assert_eq!(
            summarize(&[f64::NAN, f64::INFINITY]),
            Err(StatsError::NoSamples)
        );
    }

    #[test]
    fn non_finite_values_are_filtered() {
        let s = summarize(&[1.0, f64::NAN, 3.0, f64::NEG_INFINITY]).unwrap();
        assert_eq!(s.count, 2);
        assert_relative_eq!(s.mean, 2.0);
    }

    #[test]
    fn values_near_f64_max_stay_finite_and_ordered() {
        let s = summarize(&[1.0e308, 1.7e308]).unwrap();
        assert_relative_eq!(s.mean, 1.35e308, max_relative = 1e-12);
        assert_relative_eq!(s.median, 1.35e308, max_relative = 1e-12);
        assert_relative_eq!(s.stddev, 0.35e308, max_relative = 1e-12);
        assert!(s.cv.is_finite());
        assert!(s.min <= s.median && s.median <= s.max);

        let json = serde_json::to_string(&s).unwrap();
        assert!(!json.contains("null"));
        let back: StatisticsRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(back.count, 2);

        let extreme = summarize(&[-f64::MAX, f64::MAX]).unwrap();
        assert_eq!(extreme.mean, 0.0);
        assert_eq!(extreme.median, 0.0);
        assert!(extreme.stddev.is_finite());
    }

    #[test]
    fn cv_is_zero_for_non_positive_mean() {
        let s = summarize(&[-1.0, -3.0]).unwrap();
        assert_eq!(s.cv, 0.0);
        assert!(s.stddev > 0.0);
    }

    #[test]
    fn summarize_scenario_skips_failed_iterations() {
        let scenario = ScenarioResult {
            error: None,
            iterations: vec![
                json!({"timing": {"total": 100.0}}).as_object().unwrap().clone(),
                json!({"timing": {"total": 9000.0}, "failed": true})
                    .as_object()
                    .unwrap()
                    .clone(),
                json!({"timing": {"total": 120.0}}).as_object().unwrap().clone(),
            ],
            statistics: BTreeMap::new(),
        };
        let stats = summarize_scenario(&scenario);
        let total = &stats["timing.total"];
        assert_eq!(total.count, 2);
        assert_relative_eq!(total.mean, 110.0);
    }

    #[test]
    fn precomputed_statistics_win_over_iterations() {
        let mut scenario = ScenarioResult {
            error: None,
            iterations: vec![json!({"t": 1.0}).as_object().unwrap().clone()],
            statistics: BTreeMap::new(),
        };
        assert!(matches!(scenario_statistics(&scenario), Cow::Owned(_)));

        scenario
            .statistics
            .insert("t".into(), summarize(&[50.0, 60.0]).unwrap());
        let stats = scenario_statistics(&scenario);
        assert!(matches!(stats, Cow::Borrowed(_)));
        assert_eq!(stats["t"].count, 2);
    }

    #[test]
    fn z_score_guards_zero_spread() {
        let flat = summarize(&[5.0, 5.0, 5.0]).unwrap();
        assert_eq!(z_score(10.0, &flat), None);

        let s = summarize(&[2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0]).unwrap();
        assert_relative_eq!(z_score(11.0, &s).unwrap(), 3.0);
    }

    proptest! {
        #[test]
        fn prop_count_and_percentile_ordering(values in prop::collection::vec(-1.0e9f64..1.0e9, 1..200)) {
            let s = summarize(&values).expect("non-empty finite input");
            prop_assert_eq!(s.count, values.len());
            prop_assert!(s.min <= s.p75);
            prop_assert!(s.p75 <= s.p90);
            prop_assert!(s.p90 <= s.p95);
            prop_assert!(s.p95 <= s.p99);
            prop_assert!(s.p99 <= s.max);
            prop_assert!(s.min <= s.median && s.median <= s.max);
        }

        #[test]
        fn prop_constant_sequence_has_no_variability(c in 0.001f64..1.0e6, n in 1usize..100) {
            let s = summarize(&vec![c; n]).unwrap();
            prop_assert_eq!(s.stddev, 0.0);
            prop_assert_eq!(s.cv, 0.0);
            prop_assert_eq!(s.count, n);
        }
    }
}
