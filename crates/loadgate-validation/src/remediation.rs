use loadgate_types::{IssueKind, Priority, Recommendation, ValidationReport};

/// Remediation guidance for every issue kind the report contains, highest priority first.
pub fn remediation(report: &ValidationReport) -> Vec<Recommendation> {
    let mut kinds: Vec<IssueKind> = Vec::new();
    for issue in report.all_issues().chain(report.all_warnings()) {
        if !kinds.contains(&issue.kind) {
            kinds.push(issue.kind);
        }
    }

    let mut out: Vec<Recommendation> = kinds
        .into_iter()
        .map(|kind| {
            let (category, priority, message) = guidance(kind);
            Recommendation {
                category: category.to_string(),
                priority,
                message: message.to_string(),
            }
        })
        .collect();
    out.sort_by_key(|r| r.priority);
    out
}

fn guidance(kind: IssueKind) -> (&'static str, Priority, &'static str) {
    use IssueKind::*;
    match kind {
        ExecutionError => (
            "execution",
            Priority::High,
            "Fix the failing environments or scenarios and re-run before comparing results",
        ),
        ExcessiveDuration => (
            "execution",
            Priority::Medium,
            "The run took far longer than the iteration timeout allows; check for hung iterations",
        ),
        InsufficientIterations => (
            "execution",
            Priority::High,
            "Increase the iteration count so each scenario has enough samples",
        ),
        ExcessiveIterations => (
            "execution",
            Priority::Low,
            "Reduce the iteration count; extra iterations add runtime without much precision",
        ),
        HighVariability => (
            "statistics",
            Priority::High,
            "Stabilize the test environment (isolate the host, warm caches) to reduce variability",
        ),
        ModerateVariability => (
            "statistics",
            Priority::Medium,
            "Consider more iterations to offset moderate variability",
        ),
        SmallSample => (
            "statistics",
            Priority::Medium,
            "Collect more samples per metric for reliable comparisons",
        ),
        LowSuccessRate => (
            "reliability",
            Priority::High,
            "Investigate failing iterations; a low success rate skews every statistic",
        ),
        NullValues => (
            "data_quality",
            Priority::Low,
            "Some metrics were not captured; check the collector for missing measurements",
        ),
        Outliers => (
            "data_quality",
            Priority::Medium,
            "Review outlier iterations for transient interference",
        ),
        LowValidRate => (
            "data_quality",
            Priority::High,
            "Too many iterations were invalid; fix the underlying failures and re-run",
        ),
        MissingInfrastructure => (
            "infrastructure",
            Priority::Low,
            "Capture infrastructure metadata for every environment",
        ),
        InconsistentInfrastructure => (
            "infrastructure",
            Priority::Low,
            "Environments differ in infrastructure; account for it when comparing them",
        ),
        NoCompression => (
            "infrastructure",
            Priority::High,
            "Enable response compression (gzip or brotli)",
        ),
        NoCdn => (
            "infrastructure",
            Priority::Medium,
            "Serve static assets through a CDN",
        ),
        NoHttp2 => (
            "infrastructure",
            Priority::Medium,
            "Enable HTTP/2 on the origin or edge",
        ),
        LowSecurityScore => (
            "security",
            Priority::High,
            "Add the missing security headers to raise the security score",
        ),
        MissingScenario => (
            "coverage",
            Priority::Low,
            "Run the full scenario set so comparisons cover every scenario",
        ),
    }
}
