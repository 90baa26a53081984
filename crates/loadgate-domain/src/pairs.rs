//! Walk the environment/scenario/metric triples two statistics indexes share.

use loadgate_types::{Dimension, SkippedDimension, StatisticsIndex, StatisticsRecord};
use std::collections::BTreeMap;

const BASELINE: &str = "baseline";
const COMPARISON: &str = "comparison";

pub(crate) fn missing_from(in_baseline: bool) -> &'static str {
    if in_baseline { COMPARISON } else { BASELINE }
}

/// Visit every metric present on both sides, in key order. Everything present on one side
/// only is appended to `skipped` at the coarsest level that is missing.
pub(crate) fn for_each_shared_metric<F>(
    baseline: &StatisticsIndex,
    comparison: &StatisticsIndex,
    skipped: &mut Vec<SkippedDimension>,
    mut visit: F,
) where
    F: FnMut(&str, &str, &str, &StatisticsRecord, &StatisticsRecord),
{
    for (env, side) in union(baseline, comparison) {
        let (Some(b_env), Some(c_env)) = side else {
            skipped.push(SkippedDimension {
                dimension: Dimension::Environment,
                environment: env.to_string(),
                scenario: None,
                metric: None,
                reason: format!("environment missing from {}", missing_from(side.0.is_some())),
            });
            continue;
        };

        for (scenario, side) in union(b_env, c_env) {
            let (Some(b_metrics), Some(c_metrics)) = side else {
                skipped.push(SkippedDimension {
                    dimension: Dimension::Scenario,
                    environment: env.to_string(),
                    scenario: Some(scenario.to_string()),
                    metric: None,
                    reason: format!("scenario missing from {}", missing_from(side.0.is_some())),
                });
                continue;
            };

            for (metric, side) in union(b_metrics, c_metrics) {
                match side {
                    (Some(b), Some(c)) => visit(env, scenario, metric, b, c),
                    (b, _) => skipped.push(SkippedDimension {
                        dimension: Dimension::Metric,
                        environment: env.to_string(),
                        scenario: Some(scenario.to_string()),
                        metric: Some(metric.to_string()),
                        reason: format!("metric missing from {}", missing_from(b.is_some())),
                    }),
                }
            }
        }
    }
}

/// Ordered union of two maps' keys with each side's value.
pub(crate) fn union<'a, V>(
    a: &'a BTreeMap<String, V>,
    b: &'a BTreeMap<String, V>,
) -> Vec<(&'a str, (Option<&'a V>, Option<&'a V>))> {
    let mut keys: Vec<&'a str> = a.keys().chain(b.keys()).map(String::as_str).collect();
    keys.sort_unstable();
    keys.dedup();
    keys.into_iter().map(|k| (k, (a.get(k), b.get(k)))).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rec(mean: f64) -> StatisticsRecord {
        StatisticsRecord {
            count: 5,
            min: mean,
            max: mean,
            mean,
            median: mean,
            stddev: 0.0,
            cv: 0.0,
            p75: mean,
            p90: mean,
            p95: mean,
            p99: mean,
        }
    }

    fn index(entries: &[(&str, &str, &str)]) -> StatisticsIndex {
        let mut idx = StatisticsIndex::new();
        for (env, scenario, metric) in entries {
            idx.entry(env.to_string())
                .or_default()
                .entry(scenario.to_string())
                .or_default()
                .insert(metric.to_string(), rec(1.0));
        }
        idx
    }

    #[test]
    fn visits_shared_and_records_the_rest() {
        let a = index(&[
            ("prod", "cold_cache", "timing.total"),
            ("prod", "cold_cache", "timing.dns"),
            ("prod", "warm_cache", "timing.total"),
            ("staging", "cold_cache", "timing.total"),
        ]);
        let b = index(&[
            ("prod", "cold_cache", "timing.total"),
            ("prod", "mobile_3g", "timing.total"),
        ]);

        let mut visited = Vec::new();
        let mut skipped = Vec::new();
        for_each_shared_metric(&a, &b, &mut skipped, |env, scenario, metric, _, _| {
            visited.push(format!("{env}/{scenario}/{metric}"));
        });

        assert_eq!(visited, vec!["prod/cold_cache/timing.total"]);
        let summary: Vec<(Dimension, String)> = skipped
            .iter()
            .map(|s| (s.dimension, s.reason.clone()))
            .collect();
        assert_eq!(
            summary,
            vec![
                (Dimension::Metric, "metric missing from comparison".to_string()),
                (Dimension::Scenario, "scenario missing from baseline".to_string()),
                (Dimension::Scenario, "scenario missing from comparison".to_string()),
                (Dimension::Environment, "environment missing from comparison".to_string()),
            ]
        );
    }
}
