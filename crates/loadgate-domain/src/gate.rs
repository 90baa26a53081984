//! Baseline capture and the regression gate against a stored baseline.

use crate::compare::Comparator;
use crate::pairs::for_each_shared_metric;
use loadgate_stats::statistics_index;
use loadgate_types::{
    Baseline, GateEntry, GateResult, RunResults, StatisticsIndex, ValidationReport,
    BASELINE_SCHEMA_V1, GATE_SCHEMA_V1,
};

pub const REGRESSION_PENALTY: i64 = 15;
pub const IMPROVEMENT_BONUS: i64 = 5;

/// Freeze a run into a named baseline. Statistics missing from the run are derived.
pub fn build_baseline(
    name: &str,
    timestamp: String,
    validation: ValidationReport,
    run: &RunResults,
) -> Baseline {
    Baseline {
        schema: BASELINE_SCHEMA_V1.to_string(),
        name: name.to_string(),
        timestamp,
        validation,
        statistics: statistics_index(run),
        infrastructure: run.infrastructure.clone(),
    }
}

/// Gate a run against a baseline.
pub fn validate_against_baseline(
    comparator: &Comparator,
    baseline: &Baseline,
    current: &RunResults,
) -> GateResult {
    gate_statistics(comparator, baseline, &statistics_index(current))
}

/// Gate already-reduced statistics against a baseline.
///
/// Regressions and improvements follow the magnitude rule alone; `changes` are significant
/// moves that stay inside the regression threshold.
pub fn gate_statistics(
    comparator: &Comparator,
    baseline: &Baseline,
    current: &StatisticsIndex,
) -> GateResult {
    let mut regressions = Vec::new();
    let mut improvements = Vec::new();
    let mut changes = Vec::new();
    let mut skipped = Vec::new();

    for_each_shared_metric(&baseline.statistics, current, &mut skipped, |env, scenario, metric, b, c| {
        let comparison = comparator.compare_metric(metric, b, c);
        let bucket = if comparison.interpretation.is_regression {
            &mut regressions
        } else if comparison.interpretation.is_improvement {
            &mut improvements
        } else if comparison.significance.is_significant {
            &mut changes
        } else {
            return;
        };
        bucket.push(GateEntry {
            environment: env.to_string(),
            scenario: scenario.to_string(),
            metric: metric.to_string(),
            comparison,
        });
    });

    let score = gate_score(regressions.len(), improvements.len());

    GateResult {
        schema: GATE_SCHEMA_V1.to_string(),
        baseline_name: baseline.name.clone(),
        passed: regressions.is_empty(),
        score,
        regressions,
        improvements,
        changes,
        skipped,
    }
}

/// `100 - 15 * regressions + 5 * improvements`, clamped to `[0, 100]`.
pub fn gate_score(regressions: usize, improvements: usize) -> u32 {
    let raw = 100 - REGRESSION_PENALTY * regressions as i64 + IMPROVEMENT_BONUS * improvements as i64;
    raw.clamp(0, 100) as u32
}
