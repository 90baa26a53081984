use loadgate_types::{CheckReport, Issue, IssueKind, Severity};

/// Fluent constructor for [`Issue`]s.
pub(crate) struct IssueBuilder(Issue);

impl IssueBuilder {
    fn new(kind: IssueKind, severity: Severity, message: String) -> Self {
        Self(Issue {
            kind,
            severity,
            message,
            environment: None,
            scenario: None,
            metric: None,
            value: None,
            threshold: None,
        })
    }

    pub(crate) fn env(mut self, env: &str) -> Self {
        self.0.environment = Some(env.to_string());
        self
    }

    pub(crate) fn scenario(mut self, scenario: &str) -> Self {
        self.0.scenario = Some(scenario.to_string());
        self
    }

    pub(crate) fn metric(mut self, metric: &str) -> Self {
        self.0.metric = Some(metric.to_string());
        self
    }

    pub(crate) fn value(mut self, value: f64) -> Self {
        self.0.value = Some(value);
        self
    }

    pub(crate) fn threshold(mut self, threshold: f64) -> Self {
        self.0.threshold = Some(threshold);
        self
    }
}

pub(crate) fn error(kind: IssueKind, message: String) -> IssueBuilder {
    IssueBuilder::new(kind, Severity::Error, message)
}

pub(crate) fn warning(kind: IssueKind, message: String) -> IssueBuilder {
    IssueBuilder::new(kind, Severity::Warning, message)
}

/// Accumulates one sub-report. Passing means no error-severity issue.
#[derive(Default)]
pub(crate) struct Check {
    report: CheckReport,
}

impl Check {
    /// Record an issue; it counts against the score at issue weight whatever its severity.
    pub(crate) fn issue(&mut self, issue: IssueBuilder) {
        self.report.issues.push(issue.0);
    }

    pub(crate) fn warn(&mut self, issue: IssueBuilder) {
        let mut issue = issue.0;
        issue.severity = Severity::Warning;
        self.report.warnings.push(issue);
    }

    pub(crate) fn metric(&mut self, name: impl Into<String>, value: f64) {
        self.report.metrics.insert(name.into(), value);
    }

    pub(crate) fn finish(mut self) -> CheckReport {
        self.report.passed = !self
            .report
            .issues
            .iter()
            .any(|i| i.severity == Severity::Error);
        self.report
    }
}
