//! Application layer for loadgate.
//!
//! The app layer coordinates statistics, domain logic and validation into use cases.
//! It does not parse CLI flags and it does not do filesystem I/O.

mod check;
mod render;

pub use check::{CheckOutcome, CheckRequest, CheckUseCase};
pub use render::{github_annotations, render_check_markdown, render_markdown};

use anyhow::bail;
use loadgate_domain::{build_baseline, ComparisonEngine};
use loadgate_stats::summarize_scenario;
use loadgate_types::{
    AnalysisConfig, Baseline, ComparisonReport, RunResults, ValidationConfig, ValidationReport,
};
use loadgate_validation::RunValidator;
use tracing::{debug, info, warn};

/// Process exit code for a passing (or non-strict) invocation.
pub const EXIT_PASS: i32 = 0;
/// Process exit code for a tool error: I/O, malformed input, bad configuration.
pub const EXIT_TOOL_ERROR: i32 = 1;
/// Process exit code for a failed gate or validation in strict mode.
pub const EXIT_FAILED: i32 = 2;

pub trait Clock: Send + Sync {
    fn now_rfc3339(&self) -> String;
}

#[derive(Debug, Default, Clone)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_rfc3339(&self) -> String {
        use time::format_description::well_known::Rfc3339;
        time::OffsetDateTime::now_utc()
            .format(&Rfc3339)
            .unwrap_or_else(|_| "1970-01-01T00:00:00Z".to_string())
    }
}

/// A clock that always reports the same instant.
#[derive(Debug, Clone)]
pub struct FixedClock(pub String);

impl Clock for FixedClock {
    fn now_rfc3339(&self) -> String {
        self.0.clone()
    }
}

fn exit_code(failed: bool, strict: bool) -> i32 {
    if failed && strict { EXIT_FAILED } else { EXIT_PASS }
}

// ----------------------------
// summarize
// ----------------------------

#[derive(Debug, Clone)]
pub struct SummarizeOutcome {
    pub run: RunResults,

    /// Scenarios whose statistics were derived from raw iterations.
    pub derived: usize,
}

/// Fill in statistics for every scenario that arrived without them.
pub struct SummarizeUseCase;

impl SummarizeUseCase {
    pub fn execute(mut run: RunResults) -> SummarizeOutcome {
        let mut derived = 0;
        for (env, env_results) in run.results.iter_mut() {
            for (name, scenario) in env_results.scenarios.iter_mut() {
                if !scenario.statistics.is_empty() {
                    continue;
                }
                scenario.statistics = summarize_scenario(scenario);
                if scenario.statistics.is_empty() {
                    warn!(environment = %env, scenario = %name, "no finite metric values to summarize");
                } else {
                    derived += 1;
                    debug!(
                        environment = %env,
                        scenario = %name,
                        metrics = scenario.statistics.len(),
                        "derived statistics from iterations"
                    );
                }
            }
        }
        SummarizeOutcome { run, derived }
    }
}

// ----------------------------
// compare
// ----------------------------

#[derive(Debug, Clone)]
pub struct CompareRequest {
    pub baseline: RunResults,
    pub current: RunResults,
    pub config: AnalysisConfig,
}

pub struct CompareUseCase;

impl CompareUseCase {
    pub fn execute(req: CompareRequest) -> ComparisonReport {
        let engine = ComparisonEngine::new(req.config);
        let report = engine.compare_runs(&req.baseline, &req.current);

        for skipped in &report.skipped {
            debug!(
                dimension = ?skipped.dimension,
                environment = %skipped.environment,
                scenario = skipped.scenario.as_deref().unwrap_or("-"),
                metric = skipped.metric.as_deref().unwrap_or("-"),
                reason = %skipped.reason,
                "skipped dimension"
            );
        }
        info!(
            overall_impact = ?report.summary.overall_impact,
            stability = ?report.summary.stability,
            regressions = report.summary.regressions.len(),
            improvements = report.summary.improvements.len(),
            significant = report.summary.significant_changes.len(),
            "comparison complete"
        );
        report
    }
}

// ----------------------------
// validate
// ----------------------------

#[derive(Debug, Clone)]
pub struct ValidateRequest {
    pub run: RunResults,
    pub config: ValidationConfig,

    /// If true, a failed validation maps to a failing exit code.
    pub strict: bool,
}

#[derive(Debug, Clone)]
pub struct ValidateOutcome {
    pub report: ValidationReport,
    pub failed: bool,
    pub exit_code: i32,
}

pub struct ValidateUseCase;

impl ValidateUseCase {
    pub fn execute(req: ValidateRequest) -> ValidateOutcome {
        let report = RunValidator::new(req.config).validate(&req.run);
        let failed = !report.passed;

        for issue in report.all_issues() {
            warn!(kind = ?issue.kind, severity = ?issue.severity, "{}", issue.message);
        }
        info!(passed = report.passed, score = report.score, "validation complete");

        ValidateOutcome {
            failed,
            exit_code: exit_code(failed, req.strict),
            report,
        }
    }
}

// ----------------------------
// baseline capture
// ----------------------------

#[derive(Debug, Clone)]
pub struct CaptureBaselineRequest {
    pub name: String,
    pub run: RunResults,
    pub config: ValidationConfig,
}

pub struct CaptureBaselineUseCase<C: Clock> {
    clock: C,
}

impl<C: Clock> CaptureBaselineUseCase<C> {
    pub fn new(clock: C) -> Self {
        Self { clock }
    }

    /// Validate the run and freeze it into a named baseline. A failing validation is
    /// recorded in the baseline, not rejected.
    pub fn execute(&self, req: CaptureBaselineRequest) -> anyhow::Result<Baseline> {
        let name = req.name.trim();
        if name.is_empty() {
            bail!("baseline name must not be empty");
        }

        let validation = RunValidator::new(req.config).validate(&req.run);
        if !validation.passed {
            warn!(baseline = %name, score = validation.score, "capturing a baseline from a run that failed validation");
        }

        let baseline = build_baseline(name, self.clock.now_rfc3339(), validation, &req.run);
        info!(
            baseline = %baseline.name,
            environments = baseline.statistics.len(),
            "baseline captured"
        );
        Ok(baseline)
    }
}
