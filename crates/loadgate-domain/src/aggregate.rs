//! Aggregate comparison of two whole runs across environment x scenario x metric.

use crate::compare::{format_pct, Comparator};
use crate::infrastructure::compare_profiles;
use crate::pairs::{for_each_shared_metric, missing_from, union};
use loadgate_stats::statistics_index;
use loadgate_types::{
    AnalysisConfig, ComparisonReport, ComparisonResult, Dimension, InfrastructureComparison,
    InfrastructureProfile, OverallImpact, Priority, Recommendation, RunResults, RunSummary,
    SkippedDimension, Stability, StatisticsIndex, COMPARE_SCHEMA_V1,
};
use std::collections::BTreeMap;

/// More significant changes than this makes a comparison `unstable`.
pub const UNSTABLE_ABOVE: usize = 5;
/// More significant changes than this makes a comparison `changing`.
pub const CHANGING_ABOVE: usize = 2;

/// environment -> scenario -> metric -> comparison
pub type ScenarioComparisons = BTreeMap<String, BTreeMap<String, BTreeMap<String, ComparisonResult>>>;

#[derive(Debug, Clone)]
pub struct ComparisonEngine {
    comparator: Comparator,
}

impl ComparisonEngine {
    pub fn new(config: AnalysisConfig) -> Self {
        Self {
            comparator: Comparator::new(config),
        }
    }

    pub fn with_comparator(comparator: Comparator) -> Self {
        Self { comparator }
    }

    pub fn comparator(&self) -> &Comparator {
        &self.comparator
    }

    /// Compare two result sets. Statistics missing from either input are derived from its
    /// successful iterations first.
    pub fn compare_runs(&self, baseline: &RunResults, comparison: &RunResults) -> ComparisonReport {
        self.compare_indexed(
            &statistics_index(baseline),
            &baseline.infrastructure,
            &statistics_index(comparison),
            &comparison.infrastructure,
        )
    }

    pub fn compare_indexed(
        &self,
        baseline_stats: &StatisticsIndex,
        baseline_infra: &BTreeMap<String, InfrastructureProfile>,
        comparison_stats: &StatisticsIndex,
        comparison_infra: &BTreeMap<String, InfrastructureProfile>,
    ) -> ComparisonReport {
        let mut skipped = Vec::new();

        let infrastructure = compare_infrastructure(baseline_infra, comparison_infra, &mut skipped);

        let mut scenarios: ScenarioComparisons = BTreeMap::new();
        for_each_shared_metric(baseline_stats, comparison_stats, &mut skipped, |env, scenario, metric, b, c| {
            let result = self.comparator.compare_metric(metric, b, c);
            scenarios
                .entry(env.to_string())
                .or_default()
                .entry(scenario.to_string())
                .or_default()
                .insert(metric.to_string(), result);
        });

        let summary = summarize(&infrastructure, &scenarios);
        let recommendations = recommend(&infrastructure, &summary);

        ComparisonReport {
            schema: COMPARE_SCHEMA_V1.to_string(),
            infrastructure,
            scenarios,
            summary,
            recommendations,
            skipped,
        }
    }
}

fn compare_infrastructure(
    baseline: &BTreeMap<String, InfrastructureProfile>,
    comparison: &BTreeMap<String, InfrastructureProfile>,
    skipped: &mut Vec<SkippedDimension>,
) -> BTreeMap<String, InfrastructureComparison> {
    let mut out = BTreeMap::new();
    for (env, side) in union(baseline, comparison) {
        match side {
            (Some(b), Some(c)) => {
                let outcome = compare_profiles(b, c);
                for aspect in outcome.skipped {
                    skipped.push(SkippedDimension {
                        dimension: Dimension::Infrastructure,
                        environment: env.to_string(),
                        scenario: None,
                        metric: None,
                        reason: format!(
                            "{aspect} metadata missing from {}",
                            missing_from(has_aspect(b, aspect))
                        ),
                    });
                }
                out.insert(env.to_string(), outcome.comparison);
            }
            (b, _) => skipped.push(SkippedDimension {
                dimension: Dimension::Infrastructure,
                environment: env.to_string(),
                scenario: None,
                metric: None,
                reason: format!("infrastructure profile missing from {}", missing_from(b.is_some())),
            }),
        }
    }
    out
}

fn has_aspect(profile: &InfrastructureProfile, aspect: &str) -> bool {
    match aspect {
        "cdn" => profile.cdn.is_some(),
        "compression" => profile.compression.is_some(),
        "protocols" => profile.protocols.is_some(),
        "security" => profile.security.is_some(),
        "caching" => profile.caching.is_some(),
        _ => false,
    }
}

fn label(env: &str, scenario: &str, r: &ComparisonResult) -> String {
    format!("{env}/{scenario}/{}: {}", r.metric, format_pct(r.change.percent))
}

/// Fold comparator outputs and infrastructure impacts into a run summary.
pub fn summarize(
    infrastructure: &BTreeMap<String, InfrastructureComparison>,
    scenarios: &ScenarioComparisons,
) -> RunSummary {
    let mut significant_changes = Vec::new();
    let mut regressions = Vec::new();
    let mut improvements = Vec::new();

    for (env, by_scenario) in scenarios {
        for (scenario, by_metric) in by_scenario {
            for result in by_metric.values() {
                if result.significance.is_significant {
                    significant_changes.push(label(env, scenario, result));
                }
                // Magnitude alone decides here; small samples still surface big moves.
                if result.interpretation.is_regression {
                    regressions.push(label(env, scenario, result));
                } else if result.interpretation.is_improvement {
                    improvements.push(label(env, scenario, result));
                }
            }
        }
    }

    for (env, infra) in infrastructure {
        for (aspect, cmp) in infra.aspects() {
            if cmp.impact.is_negative() {
                regressions.push(format!("infrastructure:{env}:{aspect}"));
            } else if cmp.impact.is_positive() {
                improvements.push(format!("infrastructure:{env}:{aspect}"));
            }
        }
    }

    let overall_impact = match regressions.len().cmp(&improvements.len()) {
        std::cmp::Ordering::Greater => OverallImpact::Negative,
        std::cmp::Ordering::Less => OverallImpact::Positive,
        std::cmp::Ordering::Equal => OverallImpact::Neutral,
    };

    let stability = if significant_changes.len() > UNSTABLE_ABOVE {
        Stability::Unstable
    } else if significant_changes.len() > CHANGING_ABOVE {
        Stability::Changing
    } else {
        Stability::Stable
    };

    RunSummary {
        overall_impact,
        significant_changes,
        regressions,
        improvements,
        stability,
    }
}

/// Fixed rule triggers, highest priority first.
pub fn recommend(
    infrastructure: &BTreeMap<String, InfrastructureComparison>,
    summary: &RunSummary,
) -> Vec<Recommendation> {
    let mut out = Vec::new();

    for (env, infra) in infrastructure {
        if let Some(cdn) = infra.cdn.as_ref().filter(|c| c.impact.is_negative()) {
            out.push(Recommendation {
                category: "cdn".to_string(),
                priority: Priority::High,
                message: format!("Review CDN settings for {env}: {}", cdn.details.join("; ")),
            });
        }
        if let Some(compression) = infra.compression.as_ref().filter(|c| c.impact.is_negative()) {
            out.push(Recommendation {
                category: "compression".to_string(),
                priority: Priority::High,
                message: format!(
                    "Review compression settings for {env}: {}",
                    compression.details.join("; ")
                ),
            });
        }
    }

    if !summary.regressions.is_empty() {
        out.push(Recommendation {
            category: "performance".to_string(),
            priority: Priority::High,
            message: format!(
                "Investigate {} regression(s): {}",
                summary.regressions.len(),
                summary.regressions.join(", ")
            ),
        });
    }

    if summary.stability == Stability::Unstable {
        out.push(Recommendation {
            category: "methodology".to_string(),
            priority: Priority::Medium,
            message: format!(
                "Review testing methodology: {} metrics changed significantly between runs",
                summary.significant_changes.len()
            ),
        });
    }

    out.sort_by_key(|r| r.priority);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use loadgate_types::{
        CdnInfo, Classification, CompressionInfo, EnvironmentResults, Impact, ProtocolSupport,
        RunMeta, ScenarioResult, SecurityInfo, StatisticsRecord, RUN_SCHEMA_V1,
    };
    use serde_json::json;

    fn stats(mean: f64, stddev: f64, count: usize) -> StatisticsRecord {
        StatisticsRecord {
            count,
            min: mean - stddev,
            max: mean + stddev,
            mean,
            median: mean,
            stddev,
            cv: if mean > 0.0 { 100.0 * stddev / mean } else { 0.0 },
            p75: mean,
            p90: mean,
            p95: mean,
            p99: mean,
        }
    }

    fn profile(cdn: bool, ratio: f64) -> InfrastructureProfile {
        InfrastructureProfile {
            cdn: Some(CdnInfo {
                detected: cdn,
                provider: cdn.then(|| "cloudflare".to_string()),
                pop_location: None,
            }),
            compression: Some(CompressionInfo {
                algorithm: Some("br".into()),
                ratio,
                effectiveness: None,
            }),
            protocols: Some(ProtocolSupport {
                http2_support: true,
                http3_support: false,
            }),
            security: Some(SecurityInfo {
                score: 85.0,
                headers: BTreeMap::new(),
            }),
            caching: None,
        }
    }

    fn run_with(metrics: &[(&str, &str, &str, StatisticsRecord)], infra: InfrastructureProfile) -> RunResults {
        let mut results: BTreeMap<String, EnvironmentResults> = BTreeMap::new();
        for (env, scenario, metric, s) in metrics {
            results
                .entry(env.to_string())
                .or_default()
                .scenarios
                .entry(scenario.to_string())
                .or_default()
                .statistics
                .insert(metric.to_string(), *s);
        }
        RunResults {
            schema: RUN_SCHEMA_V1.to_string(),
            meta: RunMeta::default(),
            results,
            infrastructure: [("production".to_string(), infra)].into_iter().collect(),
        }
    }

    fn engine() -> ComparisonEngine {
        ComparisonEngine::new(AnalysisConfig::default())
    }

    #[test]
    fn end_to_end_regression_reaches_summary() {
        let baseline = run_with(
            &[("production", "cold_cache", "timing.total", stats(369.0, 30.0, 10))],
            profile(true, 0.7),
        );
        let current = run_with(
            &[("production", "cold_cache", "timing.total", stats(1959.0, 403.0, 10))],
            profile(true, 0.7),
        );

        let report = engine().compare_runs(&baseline, &current);
        let r = &report.scenarios["production"]["cold_cache"]["timing.total"];
        assert_eq!(r.interpretation.classification, Classification::Regression);
        assert_eq!(report.summary.regressions, vec!["production/cold_cache/timing.total: +430.89%"]);
        assert_eq!(report.summary.significant_changes.len(), 1);
        assert_eq!(report.summary.overall_impact, OverallImpact::Negative);
        assert_eq!(report.summary.stability, Stability::Stable);
        assert_eq!(report.recommendations[0].category, "performance");
        assert_eq!(report.recommendations[0].priority, Priority::High);
        assert!(report.skipped.is_empty());
    }

    #[test]
    fn identical_runs_are_neutral_and_idempotent() {
        let run = run_with(
            &[
                ("production", "cold_cache", "timing.total", stats(400.0, 20.0, 10)),
                ("production", "warm_cache", "timing.total", stats(200.0, 10.0, 10)),
            ],
            profile(true, 0.7),
        );
        let e = engine();
        let first = e.compare_runs(&run, &run);
        assert_eq!(first.summary.overall_impact, OverallImpact::Neutral);
        assert!(first.summary.regressions.is_empty());
        assert!(first.summary.improvements.is_empty());
        assert!(first.summary.significant_changes.is_empty());
        assert!(first.recommendations.is_empty());

        let second = e.compare_runs(&run, &run);
        assert_eq!(
            serde_json::to_string(&first).unwrap(),
            serde_json::to_string(&second).unwrap()
        );
    }

    #[test]
    fn stats_are_derived_from_iterations_when_absent() {
        let iterations = |values: &[f64]| -> ScenarioResult {
            ScenarioResult {
                error: None,
                iterations: values
                    .iter()
                    .map(|v| json!({"timing": {"total": v}}).as_object().unwrap().clone())
                    .collect(),
                statistics: BTreeMap::new(),
            }
        };
        let mk = |values: &[f64]| RunResults {
            schema: RUN_SCHEMA_V1.to_string(),
            meta: RunMeta::default(),
            results: [(
                "production".to_string(),
                EnvironmentResults {
                    error: None,
                    scenarios: [("cold_cache".to_string(), iterations(values))].into_iter().collect(),
                },
            )]
            .into_iter()
            .collect(),
            infrastructure: BTreeMap::new(),
        };

        let report = engine().compare_runs(&mk(&[100.0, 102.0, 98.0, 101.0]), &mk(&[150.0, 152.0, 148.0, 151.0]));
        let r = &report.scenarios["production"]["cold_cache"]["timing.total"];
        assert_eq!(r.baseline.count, 4);
        assert_eq!(r.interpretation.classification, Classification::Regression);
    }

    #[test]
    fn infrastructure_impacts_feed_the_summary_and_recommendations() {
        let s = stats(100.0, 5.0, 10);
        let baseline = run_with(&[("production", "cold_cache", "timing.total", s)], profile(true, 0.7));
        let current = run_with(&[("production", "cold_cache", "timing.total", s)], profile(false, 0.4));

        let report = engine().compare_runs(&baseline, &current);
        let infra = &report.infrastructure["production"];
        assert_eq!(infra.cdn.as_ref().unwrap().impact, Impact::Negative);
        assert_eq!(infra.compression.as_ref().unwrap().impact, Impact::SignificantNegative);
        assert_eq!(
            report.summary.regressions,
            vec!["infrastructure:production:cdn", "infrastructure:production:compression"]
        );

        let categories: Vec<&str> = report.recommendations.iter().map(|r| r.category.as_str()).collect();
        assert_eq!(categories, vec!["cdn", "compression", "performance"]);
        // caching is absent on both sides: neither compared nor skipped.
        assert!(report.skipped.is_empty());
    }

    #[test]
    fn one_sided_data_is_skipped_not_fatal() {
        let baseline = run_with(
            &[
                ("production", "cold_cache", "timing.total", stats(100.0, 5.0, 10)),
                ("staging", "cold_cache", "timing.total", stats(100.0, 5.0, 10)),
            ],
            profile(true, 0.7),
        );
        let mut current = run_with(
            &[("production", "cold_cache", "timing.total", stats(100.0, 5.0, 10))],
            profile(true, 0.7),
        );
        current.infrastructure.clear();

        let report = engine().compare_runs(&baseline, &current);
        assert_eq!(report.scenarios["production"]["cold_cache"].len(), 1);
        let dims: Vec<Dimension> = report.skipped.iter().map(|s| s.dimension).collect();
        assert_eq!(dims, vec![Dimension::Infrastructure, Dimension::Environment]);
        assert_eq!(report.skipped[1].environment, "staging");
    }

    #[test]
    fn many_significant_changes_are_unstable() {
        let metrics: Vec<(&str, &str, &str, StatisticsRecord)> = ["a", "b", "c", "d", "e", "f"]
            .into_iter()
            .map(|m| ("production", "cold_cache", m, stats(100.0, 1.0, 10)))
            .collect();
        let slower: Vec<(&str, &str, &str, StatisticsRecord)> = metrics
            .iter()
            .map(|(e, s, m, _)| (*e, *s, *m, stats(130.0, 1.0, 10)))
            .collect();

        let report = engine().compare_runs(
            &run_with(&metrics, profile(true, 0.7)),
            &run_with(&slower, profile(true, 0.7)),
        );
        assert_eq!(report.summary.significant_changes.len(), 6);
        assert_eq!(report.summary.stability, Stability::Unstable);
        assert!(report.recommendations.iter().any(|r| r.category == "methodology"));
        assert_eq!(report.recommendations.last().unwrap().priority, Priority::Medium);
    }
}
