//! Run validation for loadgate.
//!
//! Five independent checks decide whether a result set is reliable enough to act on:
//! execution, statistics, data quality, infrastructure and scenario coverage. Each check
//! yields a [`CheckReport`]; the run passes when every check passes, and the score is
//! `100 - 10 * issues - 5 * warnings`, clamped to `[0, 100]`.
//!
//! Problems are always reported as data, never as errors.

mod issue;
mod remediation;

pub use remediation::remediation;

use issue::{error, warning, Check};
use loadgate_stats::{finite_number, scenario_statistics, visit_leaves, z_score};
use loadgate_types::{
    iteration_failed, CheckReport, IssueKind, RunResults, ScenarioResult, ValidationConfig,
    ValidationReport, VALIDATION_SCHEMA_V1,
};
use std::collections::{BTreeMap, BTreeSet};

pub const ISSUE_PENALTY: i64 = 10;
pub const WARNING_PENALTY: i64 = 5;

#[derive(Debug, Clone, Default)]
pub struct RunValidator {
    config: ValidationConfig,
}

impl RunValidator {
    pub fn new(config: ValidationConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ValidationConfig {
        &self.config
    }

    pub fn validate(&self, run: &RunResults) -> ValidationReport {
        let mut report = ValidationReport {
            schema: VALIDATION_SCHEMA_V1.to_string(),
            passed: false,
            score: 0,
            execution: self.check_execution(run),
            statistics: self.check_statistics(run),
            data_quality: self.check_data_quality(run),
            infrastructure: self.check_infrastructure(run),
            coverage: self.check_coverage(run),
            recommendations: Vec::new(),
        };

        let passed = report.checks().iter().all(|(_, c)| c.passed);
        let score = validation_score(report.all_issues().count(), report.all_warnings().count());
        report.passed = passed;
        report.score = score;
        report.recommendations = remediation(&report);
        report
    }

    /// Environment/scenario errors, iteration counts and overall run duration.
    pub fn check_execution(&self, run: &RunResults) -> CheckReport {
        let cfg = &self.config;
        let mut check = Check::default();
        let mut scenarios = 0usize;
        let mut errors = 0usize;

        for (env, env_results) in &run.results {
            if let Some(err) = &env_results.error {
                errors += 1;
                check.issue(error(IssueKind::ExecutionError, format!("environment {env} failed: {err}")).env(env));
            }

            for (name, scenario) in &env_results.scenarios {
                scenarios += 1;
                if let Some(err) = &scenario.error {
                    errors += 1;
                    check.issue(
                        error(IssueKind::ExecutionError, format!("{env}/{name} failed: {err}"))
                            .env(env)
                            .scenario(name),
                    );
                    continue;
                }

                let n = observed_iterations(scenario);
                if n < cfg.min_iterations {
                    check.issue(
                        error(
                            IssueKind::InsufficientIterations,
                            format!("{env}/{name} ran {n} iteration(s), fewer than {}", cfg.min_iterations),
                        )
                        .env(env)
                        .scenario(name)
                        .value(n as f64)
                        .threshold(cfg.min_iterations as f64),
                    );
                } else if n > cfg.max_iterations {
                    check.warn(
                        warning(
                            IssueKind::ExcessiveIterations,
                            format!("{env}/{name} ran {n} iterations, more than {}", cfg.max_iterations),
                        )
                        .env(env)
                        .scenario(name)
                        .value(n as f64)
                        .threshold(cfg.max_iterations as f64),
                    );
                }
            }
        }

        let timeout = cfg.iteration_timeout_ms.or(run.meta.iteration_timeout_ms);
        if let (Some(duration), Some(timeout)) = (run.meta.duration_ms, timeout) {
            if timeout > 0 {
                let ratio = duration as f64 / timeout as f64;
                check.metric("duration_ratio", ratio);
                if ratio > cfg.duration_fail_factor {
                    check.issue(
                        error(
                            IssueKind::ExcessiveDuration,
                            format!("run took {duration} ms, {ratio:.1}x the {timeout} ms iteration timeout"),
                        )
                        .value(ratio)
                        .threshold(cfg.duration_fail_factor),
                    );
                } else if ratio > cfg.duration_warn_factor {
                    check.warn(
                        warning(
                            IssueKind::ExcessiveDuration,
                            format!("run took {duration} ms, {ratio:.1}x the {timeout} ms iteration timeout"),
                        )
                        .value(ratio)
                        .threshold(cfg.duration_warn_factor),
                    );
                }
            }
        }

        check.metric("environments", run.results.len() as f64);
        check.metric("scenarios", scenarios as f64);
        check.metric("execution_errors", errors as f64);
        check.finish()
    }

    /// Per-metric variability and sample size, per-scenario success rate.
    pub fn check_statistics(&self, run: &RunResults) -> CheckReport {
        let cfg = &self.config;
        let mut check = Check::default();
        let mut checked = 0usize;
        let mut unstable = 0usize;
        let mut cv_sum = 0.0;

        for (env, env_results) in &run.results {
            for (name, scenario) in &env_results.scenarios {
                for (metric, stats) in scenario_statistics(scenario).iter() {
                    checked += 1;
                    cv_sum += stats.cv;

                    if stats.cv > cfg.cv_fail_pct {
                        unstable += 1;
                        check.issue(
                            error(
                                IssueKind::HighVariability,
                                format!("{env}/{name} {metric} has CV {:.1}% (> {}%)", stats.cv, cfg.cv_fail_pct),
                            )
                            .env(env)
                            .scenario(name)
                            .metric(metric)
                            .value(stats.cv)
                            .threshold(cfg.cv_fail_pct),
                        );
                    } else if stats.cv > cfg.cv_warn_pct {
                        check.warn(
                            warning(
                                IssueKind::ModerateVariability,
                                format!("{env}/{name} {metric} has CV {:.1}% (> {}%)", stats.cv, cfg.cv_warn_pct),
                            )
                            .env(env)
                            .scenario(name)
                            .metric(metric)
                            .value(stats.cv)
                            .threshold(cfg.cv_warn_pct),
                        );
                    }

                    if stats.count < cfg.min_samples {
                        check.warn(
                            warning(
                                IssueKind::SmallSample,
                                format!(
                                    "{env}/{name} {metric} has {} sample(s), fewer than {}",
                                    stats.count, cfg.min_samples
                                ),
                            )
                            .env(env)
                            .scenario(name)
                            .metric(metric)
                            .value(stats.count as f64)
                            .threshold(cfg.min_samples as f64),
                        );
                    }
                }

                if let Some(rate) = scenario.success_rate_pct() {
                    let message = format!("{env}/{name} success rate is {rate:.1}%");
                    if rate < cfg.success_rate_fail_pct {
                        check.issue(
                            error(IssueKind::LowSuccessRate, message)
                                .env(env)
                                .scenario(name)
                                .value(rate)
                                .threshold(cfg.success_rate_fail_pct),
                        );
                    } else if rate < cfg.success_rate_warn_pct {
                        check.issue(
                            warning(IssueKind::LowSuccessRate, message)
                                .env(env)
                                .scenario(name)
                                .value(rate)
                                .threshold(cfg.success_rate_warn_pct),
                        );
                    }
                }
            }
        }

        check.metric("metrics_checked", checked as f64);
        check.metric("unstable_metrics", unstable as f64);
        if checked > 0 {
            check.metric("mean_cv", cv_sum / checked as f64);
        }
        check.finish()
    }

    /// Failed iterations, null leaves, 3-sigma outliers and the overall valid-iteration rate.
    pub fn check_data_quality(&self, run: &RunResults) -> CheckReport {
        let cfg = &self.config;
        let mut check = Check::default();
        let mut total = 0usize;
        let mut failed = 0usize;
        let mut null_total = 0usize;
        let mut outlier_total = 0usize;

        for (env, env_results) in &run.results {
            for (name, scenario) in &env_results.scenarios {
                total += scenario.iterations.len();
                failed += scenario.failed_count();

                let nulls = count_nulls(scenario);
                if nulls > 0 {
                    null_total += nulls;
                    check.warn(
                        warning(IssueKind::NullValues, format!("{env}/{name} has {nulls} null metric value(s)"))
                            .env(env)
                            .scenario(name)
                            .value(nulls as f64),
                    );
                }

                for (metric, indices) in find_outliers(scenario, cfg.outlier_z) {
                    outlier_total += indices.len();
                    let listed: Vec<String> = indices.iter().map(usize::to_string).collect();
                    check.warn(
                        warning(
                            IssueKind::Outliers,
                            format!(
                                "{env}/{name} {metric} has outliers beyond {}σ at iteration(s) [{}]",
                                cfg.outlier_z,
                                listed.join(", ")
                            ),
                        )
                        .env(env)
                        .scenario(name)
                        .metric(&metric)
                        .value(indices.len() as f64)
                        .threshold(cfg.outlier_z),
                    );
                }
            }
        }

        if total > 0 {
            let rate = 100.0 * (total - failed) as f64 / total as f64;
            check.metric("valid_rate_pct", rate);
            let message = format!("{} of {total} iterations are valid ({rate:.1}%)", total - failed);
            if rate < cfg.valid_rate_fail_pct {
                check.issue(
                    error(IssueKind::LowValidRate, message)
                        .value(rate)
                        .threshold(cfg.valid_rate_fail_pct),
                );
            } else if rate < cfg.valid_rate_warn_pct {
                check.warn(
                    warning(IssueKind::LowValidRate, message)
                        .value(rate)
                        .threshold(cfg.valid_rate_warn_pct),
                );
            }
        }

        check.metric("total_iterations", total as f64);
        check.metric("failed_iterations", failed as f64);
        check.metric("null_values", null_total as f64);
        check.metric("outliers", outlier_total as f64);
        check.finish()
    }

    /// Per-environment infrastructure requirements and cross-environment consistency.
    pub fn check_infrastructure(&self, run: &RunResults) -> CheckReport {
        let cfg = &self.config;
        let mut check = Check::default();

        let envs: BTreeSet<&str> = run
            .results
            .keys()
            .chain(run.infrastructure.keys())
            .map(String::as_str)
            .collect();

        for env in &envs {
            let Some(profile) = run.infrastructure.get(*env) else {
                check.warn(
                    warning(
                        IssueKind::MissingInfrastructure,
                        format!("no infrastructure profile for {env}"),
                    )
                    .env(env),
                );
                continue;
            };

            if !profile.compression.as_ref().is_some_and(|c| c.is_enabled()) {
                check.issue(error(IssueKind::NoCompression, format!("{env} serves uncompressed responses")).env(env));
            }
            if !profile.cdn.as_ref().is_some_and(|c| c.detected) {
                check.warn(warning(IssueKind::NoCdn, format!("no CDN detected for {env}")).env(env));
            }
            if !profile.protocols.is_some_and(|p| p.http2_support) {
                check.warn(warning(IssueKind::NoHttp2, format!("{env} does not support HTTP/2")).env(env));
            }
            if let Some(security) = &profile.security {
                check.metric(format!("security_score.{env}"), security.score);
                if security.score < cfg.min_security_score {
                    check.issue(
                        error(
                            IssueKind::LowSecurityScore,
                            format!(
                                "{env} security score {:.0} is below {:.0}",
                                security.score, cfg.min_security_score
                            ),
                        )
                        .env(env)
                        .value(security.score)
                        .threshold(cfg.min_security_score),
                    );
                }
            }
        }

        if run.infrastructure.len() > 1 {
            let providers: BTreeSet<String> = run
                .infrastructure
                .values()
                .filter_map(|p| p.cdn.as_ref())
                .map(|c| c.provider.clone().unwrap_or_else(|| "none".to_string()))
                .collect();
            let algorithms: BTreeSet<String> = run
                .infrastructure
                .values()
                .filter_map(|p| p.compression.as_ref())
                .map(|c| {
                    c.algorithm
                        .as_deref()
                        .map(str::to_ascii_lowercase)
                        .unwrap_or_else(|| "none".to_string())
                })
                .collect();
            let http2: BTreeSet<String> = run
                .infrastructure
                .values()
                .filter_map(|p| p.protocols)
                .map(|p| if p.http2_support { "enabled" } else { "disabled" }.to_string())
                .collect();

            for (what, values) in [
                ("CDN provider", providers),
                ("compression algorithm", algorithms),
                ("HTTP/2 support", http2),
            ] {
                if values.len() > 1 {
                    let listed: Vec<String> = values.into_iter().collect();
                    check.warn(warning(
                        IssueKind::InconsistentInfrastructure,
                        format!("{what} differs across environments: {}", listed.join(", ")),
                    ));
                }
            }
        }

        check.metric("environments_profiled", run.infrastructure.len() as f64);
        check.finish()
    }

    /// Expected scenarios missing from an environment. Never fails the run.
    pub fn check_coverage(&self, run: &RunResults) -> CheckReport {
        let expected = &self.config.expected_scenarios;
        let mut check = Check::default();
        let mut present = 0usize;

        for (env, env_results) in &run.results {
            for scenario in expected {
                if env_results.scenarios.contains_key(scenario) {
                    present += 1;
                } else {
                    check.warn(
                        warning(IssueKind::MissingScenario, format!("{env} is missing scenario {scenario}"))
                            .env(env)
                            .scenario(scenario),
                    );
                }
            }
        }

        let wanted = expected.len() * run.results.len();
        if wanted > 0 {
            check.metric("coverage_pct", 100.0 * present as f64 / wanted as f64);
        }
        check.finish()
    }
}

/// `100 - 10 * issues - 5 * warnings`, clamped to `[0, 100]`.
pub fn validation_score(issues: usize, warnings: usize) -> u32 {
    let raw = 100 - ISSUE_PENALTY * issues as i64 - WARNING_PENALTY * warnings as i64;
    raw.clamp(0, 100) as u32
}

/// Iterations run; falls back to the largest sample count when only statistics were supplied.
fn observed_iterations(scenario: &ScenarioResult) -> usize {
    if scenario.iterations.is_empty() {
        scenario.statistics.values().map(|s| s.count).max().unwrap_or(0)
    } else {
        scenario.iterations.len()
    }
}

fn count_nulls(scenario: &ScenarioResult) -> usize {
    let mut nulls = 0;
    for iteration in &scenario.iterations {
        visit_leaves(iteration, |_, v| {
            if v.is_null() {
                nulls += 1;
            }
        });
    }
    nulls
}

/// Metric path -> indices of successful iterations whose value lies beyond `z` standard
/// deviations of the scenario's statistics.
fn find_outliers(scenario: &ScenarioResult, z: f64) -> BTreeMap<String, Vec<usize>> {
    let stats = scenario_statistics(scenario);
    let mut out: BTreeMap<String, Vec<usize>> = BTreeMap::new();
    for (idx, iteration) in scenario.iterations.iter().enumerate() {
        if iteration_failed(iteration) {
            continue;
        }
        visit_leaves(iteration, |path, value| {
            let Some(x) = finite_number(value) else { return };
            let Some(s) = stats.get(path) else { return };
            if z_score(x, s).is_some_and(|score| score > z) {
                out.entry(path.to_string()).or_default().push(idx);
            }
        });
    }
    out
}
