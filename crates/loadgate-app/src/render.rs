//! Markdown summaries and GitHub Actions annotations for comparison and check results.

use loadgate_domain::format_pct;
use loadgate_types::{
    Classification, ComparisonReport, ComparisonResult, GateEntry, GateResult, Impact,
    OverallImpact, Priority, Recommendation, Severity, Stability, ValidationReport,
};
use std::fmt::Write as _;

pub fn render_markdown(report: &ComparisonReport) -> String {
    let mut out = String::new();

    let header = match report.summary.overall_impact {
        OverallImpact::Negative => "❌ loadgate: regressions detected",
        OverallImpact::Positive => "✅ loadgate: improvements detected",
        OverallImpact::Neutral => "✅ loadgate: no net change",
    };
    out.push_str(header);
    out.push_str("\n\n");

    let _ = writeln!(
        out,
        "**Stability:** {} | **Significant changes:** {} | **Regressions:** {} | **Improvements:** {}\n",
        stability_label(report.summary.stability),
        report.summary.significant_changes.len(),
        report.summary.regressions.len(),
        report.summary.improvements.len(),
    );

    let rows: Vec<(&str, &str, &ComparisonResult)> = report
        .scenarios
        .iter()
        .flat_map(|(env, by_scenario)| {
            by_scenario.iter().flat_map(move |(scenario, by_metric)| {
                by_metric
                    .values()
                    .map(move |r| (env.as_str(), scenario.as_str(), r))
            })
        })
        .filter(|(_, _, r)| {
            r.significance.is_significant || r.interpretation.is_regression || r.interpretation.is_improvement
        })
        .collect();

    if rows.is_empty() {
        out.push_str("_No significant or threshold-crossing changes._\n");
    } else {
        out.push_str("| environment | scenario | metric | baseline (mean) | current (mean) | change | p-value | status |\n");
        out.push_str("|---|---|---|---:|---:|---:|---:|---|\n");
        for (env, scenario, r) in rows {
            let _ = writeln!(
                out,
                "| {env} | {scenario} | `{metric}` | {b:.2} | {c:.2} | {pct} | {p} | {status} |",
                metric = r.metric,
                b = r.baseline.mean,
                c = r.comparison.mean,
                pct = format_pct(r.change.percent),
                p = r.significance.p_value,
                status = status_label(r),
            );
        }
    }

    let infra: Vec<String> = report
        .infrastructure
        .iter()
        .flat_map(|(env, cmp)| {
            cmp.aspects()
                .into_iter()
                .filter(|(_, a)| a.impact != Impact::Neutral)
                .map(move |(aspect, a)| {
                    let details = if a.details.is_empty() {
                        String::new()
                    } else {
                        format!(" ({})", a.details.join("; "))
                    };
                    format!("- `{env}` {aspect}: {}{details}", impact_label(a.impact))
                })
        })
        .collect();
    if !infra.is_empty() {
        out.push_str("\n**Infrastructure:**\n");
        for line in infra {
            out.push_str(&line);
            out.push('\n');
        }
    }

    push_recommendations(&mut out, &report.recommendations);

    if !report.skipped.is_empty() {
        let _ = writeln!(
            out,
            "\n_{} dimension(s) present on only one side were skipped._",
            report.skipped.len()
        );
    }

    out
}

pub fn render_check_markdown(gate: &GateResult, validation: &ValidationReport) -> String {
    let mut out = String::new();

    let header = if gate.passed && validation.passed {
        "✅ loadgate: pass"
    } else {
        "❌ loadgate: fail"
    };
    out.push_str(header);
    out.push_str("\n\n");

    let _ = writeln!(
        out,
        "**Baseline:** `{}` | **Gate score:** {} | **Validation score:** {}\n",
        gate.baseline_name, gate.score, validation.score
    );

    for (title, entries) in [
        ("Regressions", &gate.regressions),
        ("Improvements", &gate.improvements),
        ("Changes", &gate.changes),
    ] {
        if entries.is_empty() {
            continue;
        }
        let _ = writeln!(out, "**{title}:**\n");
        out.push_str("| environment | scenario | metric | baseline (mean) | current (mean) | change |\n");
        out.push_str("|---|---|---|---:|---:|---:|\n");
        for e in entries {
            push_gate_row(&mut out, e);
        }
        out.push('\n');
    }

    let problems: Vec<String> = validation
        .all_issues()
        .chain(validation.all_warnings())
        .map(|i| {
            let icon = match i.severity {
                Severity::Error => "❌",
                Severity::Warning => "⚠️",
            };
            format!("- {icon} {}", i.message)
        })
        .collect();
    if !problems.is_empty() {
        out.push_str("**Validation:**\n");
        for line in problems {
            out.push_str(&line);
            out.push('\n');
        }
    }

    push_recommendations(&mut out, &validation.recommendations);
    out
}

/// GitHub Actions workflow commands for a gate run.
pub fn github_annotations(gate: &GateResult, validation: &ValidationReport) -> Vec<String> {
    let mut lines = Vec::new();

    for e in &gate.regressions {
        lines.push(format!(
            "::error::loadgate {env}/{scenario} {metric}: {pct} (baseline {b:.2}, current {c:.2})",
            env = e.environment,
            scenario = e.scenario,
            metric = e.metric,
            pct = format_pct(e.comparison.change.percent),
            b = e.comparison.baseline.mean,
            c = e.comparison.comparison.mean,
        ));
    }

    for issue in validation.all_issues().chain(validation.all_warnings()) {
        let prefix = match issue.severity {
            Severity::Error => "::error",
            Severity::Warning => "::warning",
        };
        lines.push(format!("{prefix}::loadgate validation: {}", issue.message));
    }

    lines
}

fn push_gate_row(out: &mut String, e: &GateEntry) {
    let _ = writeln!(
        out,
        "| {} | {} | `{}` | {:.2} | {:.2} | {} |",
        e.environment,
        e.scenario,
        e.metric,
        e.comparison.baseline.mean,
        e.comparison.comparison.mean,
        format_pct(e.comparison.change.percent),
    );
}

fn push_recommendations(out: &mut String, recommendations: &[Recommendation]) {
    if recommendations.is_empty() {
        return;
    }
    out.push_str("\n**Recommendations:**\n");
    for r in recommendations {
        let _ = writeln!(out, "- [{}] {}", priority_label(r.priority), r.message);
    }
}

fn status_label(r: &ComparisonResult) -> &'static str {
    match r.interpretation.classification {
        Classification::Regression => "❌ regression",
        Classification::Improvement => "✅ improvement",
        Classification::Neutral => "➖ neutral",
        Classification::Insignificant if r.interpretation.is_regression => "⚠️ regression (not significant)",
        Classification::Insignificant if r.interpretation.is_improvement => "⚠️ improvement (not significant)",
        Classification::Insignificant => "insignificant",
    }
}

fn stability_label(s: Stability) -> &'static str {
    match s {
        Stability::Stable => "stable",
        Stability::Changing => "changing",
        Stability::Unstable => "unstable",
    }
}

fn impact_label(i: Impact) -> &'static str {
    match i {
        Impact::Positive => "positive",
        Impact::Negative => "negative",
        Impact::Neutral => "neutral",
        Impact::Change => "change",
        Impact::SignificantPositive => "significant-positive",
        Impact::SignificantNegative => "significant-negative",
    }
}

fn priority_label(p: Priority) -> &'static str {
    match p {
        Priority::High => "high",
        Priority::Medium => "medium",
        Priority::Low => "low",
    }
}
