//! CheckUseCase - validate a run and gate it against a stored baseline.
//!
//! This is the one-command CI workflow:
//! 1. Validates the current run
//! 2. Compares it metric by metric against the baseline statistics
//! 3. Renders markdown and GitHub annotations
//! 4. Decides the exit code

use crate::{exit_code, github_annotations, render_check_markdown};
use loadgate_domain::{validate_against_baseline, Comparator};
use loadgate_types::{AnalysisConfig, Baseline, GateResult, RunResults, ValidationReport};
use loadgate_validation::RunValidator;
use tracing::{debug, info, warn};

#[derive(Debug, Clone)]
pub struct CheckRequest {
    pub baseline: Baseline,
    pub current: RunResults,
    pub config: AnalysisConfig,

    /// If true, a failed gate or validation maps to a failing exit code.
    pub strict: bool,
}

#[derive(Debug, Clone)]
pub struct CheckOutcome {
    pub validation: ValidationReport,
    pub gate: GateResult,
    pub markdown: String,
    pub annotations: Vec<String>,

    /// Human-readable reasons for a failure (for CI logs).
    pub reasons: Vec<String>,

    pub failed: bool,

    /// 0 = pass (or non-strict), 2 = failed in strict mode.
    pub exit_code: i32,
}

pub struct CheckUseCase;

impl CheckUseCase {
    pub fn execute(req: CheckRequest) -> CheckOutcome {
        let validation = RunValidator::new(req.config.validation.clone()).validate(&req.current);
        debug!(passed = validation.passed, score = validation.score, "current run validated");

        let comparator = Comparator::new(req.config);
        let gate = validate_against_baseline(&comparator, &req.baseline, &req.current);
        for skipped in &gate.skipped {
            debug!(
                environment = %skipped.environment,
                scenario = skipped.scenario.as_deref().unwrap_or("-"),
                metric = skipped.metric.as_deref().unwrap_or("-"),
                reason = %skipped.reason,
                "not gated"
            );
        }

        let mut reasons = Vec::new();
        for entry in &gate.regressions {
            reasons.push(format!(
                "regression: {}/{}/{} {}",
                entry.environment,
                entry.scenario,
                entry.metric,
                loadgate_domain::format_pct(entry.comparison.change.percent)
            ));
        }
        for issue in validation.all_issues().filter(|i| i.severity == loadgate_types::Severity::Error) {
            reasons.push(format!("validation: {}", issue.message));
        }

        let failed = !gate.passed || !validation.passed;
        if failed {
            warn!(reasons = reasons.len(), "check failed");
        }
        info!(
            baseline = %gate.baseline_name,
            gate_passed = gate.passed,
            gate_score = gate.score,
            validation_passed = validation.passed,
            validation_score = validation.score,
            "check complete"
        );

        let markdown = render_check_markdown(&gate, &validation);
        let annotations = github_annotations(&gate, &validation);

        CheckOutcome {
            exit_code: exit_code(failed, req.strict),
            validation,
            gate,
            markdown,
            annotations,
            reasons,
            failed,
        }
    }
}
