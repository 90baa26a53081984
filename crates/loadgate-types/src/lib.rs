//! Shared types for loadgate.
//!
//! Design goal: versioned, explicit, boring.
//! Result sets arrive from an external test runner; comparison reports, validation reports,
//! baselines and gate results are produced by the loadgate crates and persisted as JSON.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub const RUN_SCHEMA_V1: &str = "loadgate.run.v1";
pub const COMPARE_SCHEMA_V1: &str = "loadgate.compare.v1";
pub const VALIDATION_SCHEMA_V1: &str = "loadgate.validation.v1";
pub const BASELINE_SCHEMA_V1: &str = "loadgate.baseline.v1";
pub const GATE_SCHEMA_V1: &str = "loadgate.gate.v1";

/// Iteration marker: `failed: true` flags an unsuccessful iteration.
pub const FAILED_MARKER: &str = "failed";
/// Iteration marker: any non-null `error` flags an unsuccessful iteration.
pub const ERROR_MARKER: &str = "error";

/// Scenarios the test runner ships with.
pub const DEFAULT_SCENARIOS: [&str; 4] = ["cold_cache", "warm_cache", "mobile_3g", "desktop_broadband"];

/// Statistics keyed by environment, then scenario, then metric path.
pub type StatisticsIndex = BTreeMap<String, BTreeMap<String, BTreeMap<String, StatisticsRecord>>>;

/// One raw iteration as produced by the test runner: an arbitrarily nested JSON object.
pub type IterationRecord = serde_json::Map<String, serde_json::Value>;

/// True if the iteration carries a `failed: true` or a non-null `error` marker.
pub fn iteration_failed(iteration: &IterationRecord) -> bool {
    let failed = iteration
        .get(FAILED_MARKER)
        .and_then(serde_json::Value::as_bool)
        .unwrap_or(false);
    let errored = iteration
        .get(ERROR_MARKER)
        .is_some_and(|v| !v.is_null() && v != &serde_json::Value::Bool(false));
    failed || errored
}

/// Accept any JSON value per iteration. Anything but an object is kept as a failed iteration.
fn lenient_iterations<'de, D>(deserializer: D) -> Result<Vec<IterationRecord>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let raw = Vec::<serde_json::Value>::deserialize(deserializer)?;
    Ok(raw
        .into_iter()
        .map(|value| match value {
            serde_json::Value::Object(record) => record,
            other => {
                let mut record = IterationRecord::new();
                record.insert(FAILED_MARKER.into(), serde_json::Value::Bool(true));
                record.insert(
                    ERROR_MARKER.into(),
                    serde_json::Value::String(format!("iteration is not an object: {other}")),
                );
                record
            }
        })
        .collect())
}

#[derive(Debug, thiserror::Error)]
pub enum InputError {
    #[error("invalid JSON: {0}")]
    InvalidJson(#[from] serde_json::Error),

    #[error("result set must be a JSON object")]
    NotAnObject,

    #[error("result set is missing the top-level `results` mapping")]
    MissingResults,

    #[error("malformed result set: {0}")]
    Malformed(String),
}

// ----------------------------
// Result sets (test runner input)
// ----------------------------

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq, Default)]
pub struct RunMeta {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub started_at: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ended_at: Option<String>,

    /// Wall-clock duration of the whole run.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<u64>,

    /// Iterations requested per scenario.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iterations: Option<u32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iteration_timeout_ms: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Default)]
pub struct ScenarioResult {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    #[serde(default, deserialize_with = "lenient_iterations")]
    #[schemars(with = "Vec<serde_json::Value>")]
    pub iterations: Vec<IterationRecord>,

    /// Precomputed statistics per metric path. Derived from `iterations` when empty.
    #[serde(default)]
    pub statistics: BTreeMap<String, StatisticsRecord>,
}

impl ScenarioResult {
    pub fn successful_iterations(&self) -> impl Iterator<Item = &IterationRecord> {
        self.iterations.iter().filter(|it| !iteration_failed(it))
    }

    pub fn failed_count(&self) -> usize {
        self.iterations.iter().filter(|it| iteration_failed(it)).count()
    }

    /// Percentage of successful iterations, `None` when nothing ran.
    pub fn success_rate_pct(&self) -> Option<f64> {
        if self.iterations.is_empty() {
            return None;
        }
        let ok = self.iterations.len() - self.failed_count();
        Some(100.0 * ok as f64 / self.iterations.len() as f64)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Default)]
pub struct EnvironmentResults {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    #[serde(default)]
    pub scenarios: BTreeMap<String, ScenarioResult>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq)]
pub struct RunResults {
    #[serde(default = "default_run_schema")]
    pub schema: String,

    #[serde(default)]
    pub meta: RunMeta,

    pub results: BTreeMap<String, EnvironmentResults>,

    #[serde(default)]
    pub infrastructure: BTreeMap<String, InfrastructureProfile>,
}

fn default_run_schema() -> String {
    RUN_SCHEMA_V1.to_string()
}

impl RunResults {
    pub fn from_json_slice(bytes: &[u8]) -> Result<Self, InputError> {
        let value: serde_json::Value = serde_json::from_slice(bytes)?;
        Self::from_json_value(value)
    }

    /// Parse a result set, failing fast when the top-level `results` mapping is absent.
    pub fn from_json_value(value: serde_json::Value) -> Result<Self, InputError> {
        let obj = value.as_object().ok_or(InputError::NotAnObject)?;
        match obj.get("results") {
            Some(serde_json::Value::Object(_)) => {}
            _ => return Err(InputError::MissingResults),
        }
        serde_json::from_value(value).map_err(|e| InputError::Malformed(e.to_string()))
    }

}

// ----------------------------
// Descriptive statistics
// ----------------------------

#[derive(Debug, Copy, Clone, Serialize, Deserialize, JsonSchema, PartialEq)]
pub struct StatisticsRecord {
    pub count: usize,
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    pub median: f64,

    /// Population standard deviation.
    pub stddev: f64,

    /// Coefficient of variation, in percent.
    pub cv: f64,

    pub p75: f64,
    pub p90: f64,
    pub p95: f64,
    pub p99: f64,
}

impl StatisticsRecord {
    pub fn variance(&self) -> f64 {
        self.stddev * self.stddev
    }
}

// ----------------------------
// Infrastructure metadata (infrastructure analyzer input)
// ----------------------------

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Default)]
pub struct InfrastructureProfile {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cdn: Option<CdnInfo>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub compression: Option<CompressionInfo>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub protocols: Option<ProtocolSupport>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub security: Option<SecurityInfo>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub caching: Option<CachingInfo>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq, Default)]
pub struct CdnInfo {
    #[serde(default)]
    pub detected: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pop_location: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Default)]
pub struct CompressionInfo {
    /// Content-Encoding in use (`gzip`, `br`, ...). `None` means uncompressed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub algorithm: Option<String>,

    /// Fraction of bytes saved (0.7 = 70% smaller).
    #[serde(default)]
    pub ratio: f64,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub effectiveness: Option<String>,
}

impl CompressionInfo {
    pub fn is_enabled(&self) -> bool {
        match self.algorithm.as_deref() {
            None => false,
            Some(alg) => {
                let alg = alg.trim();
                !alg.is_empty()
                    && !alg.eq_ignore_ascii_case("none")
                    && !alg.eq_ignore_ascii_case("identity")
            }
        }
    }
}

#[derive(Debug, Copy, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq, Default)]
pub struct ProtocolSupport {
    #[serde(default)]
    pub http2_support: bool,

    #[serde(default)]
    pub http3_support: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Default)]
pub struct SecurityInfo {
    /// 0-100.
    pub score: f64,

    #[serde(default)]
    pub headers: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Default)]
pub struct CachingInfo {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub strategy: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub effectiveness: Option<f64>,

    #[serde(default)]
    pub headers: BTreeMap<String, String>,
}

// ----------------------------
// Two-sample comparison
// ----------------------------

/// Metric polarity: which way is better.
#[derive(Debug, Copy, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    /// Lower is better (timings, sizes). A numeric increase is a regression.
    #[default]
    Lower,
    /// Higher is better (throughput, scores). A numeric decrease is a regression.
    Higher,
}

#[derive(Debug, Copy, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum ChangeDirection {
    Increase,
    Decrease,
    NoChange,
}

#[derive(Debug, Copy, Clone, Serialize, Deserialize, JsonSchema, PartialEq)]
pub struct Change {
    /// comparison.mean - baseline.mean
    pub absolute: f64,

    /// 100 * absolute / baseline.mean (0 when the baseline mean is 0)
    pub percent: f64,

    pub direction: ChangeDirection,
}

#[derive(Debug, Copy, Clone, Serialize, Deserialize, JsonSchema, PartialEq)]
pub struct SignificanceTest {
    pub t_statistic: f64,
    pub degrees_of_freedom: f64,
    pub p_value: f64,
    pub is_significant: bool,
    pub confidence_level: f64,
}

#[derive(Debug, Copy, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SignificanceLabel {
    Significant,
    NotSignificant,
}

#[derive(Debug, Copy, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum Magnitude {
    Small,
    Medium,
    Large,
}

#[derive(Debug, Copy, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Classification {
    Regression,
    Improvement,
    Neutral,
    Insignificant,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
pub struct Interpretation {
    pub significance: SignificanceLabel,
    pub magnitude: Magnitude,
    pub classification: Classification,

    /// Worse by more than the regression threshold, regardless of significance.
    pub is_regression: bool,

    /// Better by more than the regression threshold, regardless of significance.
    pub is_improvement: bool,

    pub summary: String,
    pub recommendation: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq)]
pub struct ComparisonResult {
    pub metric: String,

    /// Polarity the classification was made under.
    pub direction: Direction,

    pub baseline: StatisticsRecord,
    pub comparison: StatisticsRecord,
    pub change: Change,
    pub significance: SignificanceTest,
    pub interpretation: Interpretation,
}

// ----------------------------
// Aggregate comparison
// ----------------------------

#[derive(Debug, Copy, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum Impact {
    Positive,
    Negative,
    Neutral,
    Change,
    SignificantPositive,
    SignificantNegative,
}

impl Impact {
    pub fn is_negative(self) -> bool {
        matches!(self, Impact::Negative | Impact::SignificantNegative)
    }

    pub fn is_positive(self) -> bool {
        matches!(self, Impact::Positive | Impact::SignificantPositive)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
pub struct AspectComparison {
    pub impact: Impact,

    #[serde(default)]
    pub details: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq, Default)]
pub struct InfrastructureComparison {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cdn: Option<AspectComparison>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub compression: Option<AspectComparison>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub protocols: Option<AspectComparison>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub security: Option<AspectComparison>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub caching: Option<AspectComparison>,
}

impl InfrastructureComparison {
    /// `(aspect name, comparison)` for every aspect that was compared.
    pub fn aspects(&self) -> Vec<(&'static str, &AspectComparison)> {
        [
            ("cdn", self.cdn.as_ref()),
            ("compression", self.compression.as_ref()),
            ("protocols", self.protocols.as_ref()),
            ("security", self.security.as_ref()),
            ("caching", self.caching.as_ref()),
        ]
        .into_iter()
        .filter_map(|(name, aspect)| aspect.map(|a| (name, a)))
        .collect()
    }
}

#[derive(Debug, Copy, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum OverallImpact {
    Positive,
    Negative,
    Neutral,
}

#[derive(Debug, Copy, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Stability {
    Stable,
    Changing,
    Unstable,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
pub struct RunSummary {
    pub overall_impact: OverallImpact,
    pub significant_changes: Vec<String>,
    pub regressions: Vec<String>,
    pub improvements: Vec<String>,
    pub stability: Stability,
}

#[derive(
    Debug, Copy, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq, PartialOrd, Ord, Hash,
)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    High,
    Medium,
    Low,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
pub struct Recommendation {
    pub category: String,
    pub priority: Priority,
    pub message: String,
}

#[derive(Debug, Copy, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Dimension {
    Environment,
    Infrastructure,
    Scenario,
    Metric,
}

/// A slice of the input that could not be compared because one side lacks it.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
pub struct SkippedDimension {
    pub dimension: Dimension,
    pub environment: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scenario: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metric: Option<String>,

    pub reason: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq)]
pub struct ComparisonReport {
    pub schema: String,
    pub infrastructure: BTreeMap<String, InfrastructureComparison>,

    /// environment -> scenario -> metric -> comparison
    pub scenarios: BTreeMap<String, BTreeMap<String, BTreeMap<String, ComparisonResult>>>,

    pub summary: RunSummary,
    pub recommendations: Vec<Recommendation>,
    pub skipped: Vec<SkippedDimension>,
}

// ----------------------------
// Validation
// ----------------------------

#[derive(Debug, Copy, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Error,
    Warning,
}

#[derive(Debug, Copy, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum IssueKind {
    ExecutionError,
    ExcessiveDuration,
    InsufficientIterations,
    ExcessiveIterations,
    HighVariability,
    ModerateVariability,
    SmallSample,
    LowSuccessRate,
    NullValues,
    Outliers,
    LowValidRate,
    MissingInfrastructure,
    InconsistentInfrastructure,
    NoCompression,
    NoCdn,
    NoHttp2,
    LowSecurityScore,
    MissingScenario,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq)]
pub struct Issue {
    #[serde(rename = "type")]
    pub kind: IssueKind,
    pub severity: Severity,
    pub message: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub environment: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scenario: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metric: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<f64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub threshold: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Default)]
pub struct CheckReport {
    pub passed: bool,
    pub issues: Vec<Issue>,
    pub warnings: Vec<Issue>,
    pub metrics: BTreeMap<String, f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq)]
pub struct ValidationReport {
    pub schema: String,
    pub passed: bool,

    /// 0-100.
    pub score: u32,

    pub execution: CheckReport,
    pub statistics: CheckReport,
    pub data_quality: CheckReport,
    pub infrastructure: CheckReport,
    pub coverage: CheckReport,

    /// Remediation guidance, highest priority first.
    pub recommendations: Vec<Recommendation>,
}

impl ValidationReport {
    pub fn checks(&self) -> [(&'static str, &CheckReport); 5] {
        [
            ("execution", &self.execution),
            ("statistics", &self.statistics),
            ("data_quality", &self.data_quality),
            ("infrastructure", &self.infrastructure),
            ("coverage", &self.coverage),
        ]
    }

    pub fn all_issues(&self) -> impl Iterator<Item = &Issue> {
        self.checks().into_iter().flat_map(|(_, c)| c.issues.iter())
    }

    pub fn all_warnings(&self) -> impl Iterator<Item = &Issue> {
        self.checks().into_iter().flat_map(|(_, c)| c.warnings.iter())
    }
}

// ----------------------------
// Baselines and the regression gate
// ----------------------------

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq)]
pub struct Baseline {
    pub schema: String,
    pub name: String,

    /// RFC 3339 capture time.
    pub timestamp: String,

    pub validation: ValidationReport,
    pub statistics: StatisticsIndex,

    #[serde(default)]
    pub infrastructure: BTreeMap<String, InfrastructureProfile>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq)]
pub struct GateEntry {
    pub environment: String,
    pub scenario: String,
    pub metric: String,
    pub comparison: ComparisonResult,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq)]
pub struct GateResult {
    pub schema: String,
    pub baseline_name: String,
    pub passed: bool,

    /// 0-100.
    pub score: u32,

    pub regressions: Vec<GateEntry>,
    pub improvements: Vec<GateEntry>,
    pub changes: Vec<GateEntry>,
    pub skipped: Vec<SkippedDimension>,
}

// ----------------------------
// Resolved analysis configuration
// ----------------------------

/// Thresholds for the whole analysis. Built once, never mutated mid-run.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq)]
pub struct AnalysisConfig {
    pub confidence_level: f64,

    /// A comparison is significant when `p < significance_threshold`.
    pub significance_threshold: f64,

    /// Fraction (0.05 = 5%) beyond which a change counts as a regression or improvement.
    pub regression_threshold: f64,

    pub p_value_mode: PValueMode,

    /// Metric path (or dotted prefix) -> polarity. Unlisted metrics are lower-is-better.
    pub polarity: BTreeMap<String, Direction>,

    pub validation: ValidationConfig,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            confidence_level: 0.95,
            significance_threshold: 0.05,
            regression_threshold: 0.05,
            p_value_mode: PValueMode::Lookup,
            polarity: BTreeMap::new(),
            validation: ValidationConfig::default(),
        }
    }
}

impl AnalysisConfig {
    /// Polarity for a metric path: exact entry first, then the longest dotted prefix.
    pub fn direction_for(&self, metric: &str) -> Direction {
        if let Some(d) = self.polarity.get(metric) {
            return *d;
        }
        self.polarity
            .iter()
            .filter(|(prefix, _)| {
                metric.len() > prefix.len()
                    && metric.starts_with(prefix.as_str())
                    && metric.as_bytes()[prefix.len()] == b'.'
            })
            .max_by_key(|(prefix, _)| prefix.len())
            .map(|(_, d)| *d)
            .unwrap_or_default()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq)]
pub struct ValidationConfig {
    pub cv_warn_pct: f64,
    pub cv_fail_pct: f64,
    pub min_samples: usize,
    pub success_rate_warn_pct: f64,
    pub success_rate_fail_pct: f64,
    pub valid_rate_warn_pct: f64,
    pub valid_rate_fail_pct: f64,
    pub outlier_z: f64,
    pub min_iterations: usize,
    pub max_iterations: usize,

    /// Per-iteration timeout; falls back to the run's own `meta.iteration_timeout_ms`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iteration_timeout_ms: Option<u64>,

    pub duration_warn_factor: f64,
    pub duration_fail_factor: f64,
    pub min_security_score: f64,
    pub expected_scenarios: Vec<String>,
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            cv_warn_pct: 10.0,
            cv_fail_pct: 20.0,
            min_samples: 5,
            success_rate_warn_pct: 95.0,
            success_rate_fail_pct: 80.0,
            valid_rate_warn_pct: 90.0,
            valid_rate_fail_pct: 80.0,
            outlier_z: 3.0,
            min_iterations: 3,
            max_iterations: 100,
            iteration_timeout_ms: None,
            duration_warn_factor: 5.0,
            duration_fail_factor: 10.0,
            min_security_score: 70.0,
            expected_scenarios: DEFAULT_SCENARIOS.iter().map(|s| s.to_string()).collect(),
        }
    }
}

// ----------------------------
// Optional config file schema
// ----------------------------

#[derive(Debug, Copy, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum PValueMode {
    /// Coarse two-tailed lookup on |t|.
    #[default]
    Lookup,
    /// Exact two-tailed Student-t survival function.
    StudentT,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Default)]
pub struct ConfigFile {
    #[serde(default)]
    pub analysis: AnalysisSection,

    #[serde(default)]
    pub validation: ValidationSection,

    /// Metric path (or dotted prefix) -> polarity.
    #[serde(default)]
    pub polarity: BTreeMap<String, Direction>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Default)]
pub struct AnalysisSection {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub confidence_level: Option<f64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub significance_threshold: Option<f64>,

    /// Fraction (0.05 = 5%).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub regression_threshold: Option<f64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub p_value_mode: Option<PValueMode>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Default)]
pub struct ValidationSection {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cv_warn_pct: Option<f64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub cv_fail_pct: Option<f64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_samples: Option<usize>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub success_rate_warn_pct: Option<f64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub success_rate_fail_pct: Option<f64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub valid_rate_warn_pct: Option<f64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub valid_rate_fail_pct: Option<f64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub outlier_z: Option<f64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_iterations: Option<usize>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_iterations: Option<usize>,

    /// Duration string parseable by humantime, e.g. "30s".
    #[serde(skip_serializing_if = "Option::is_none")]
    pub iteration_timeout: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_warn_factor: Option<f64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_fail_factor: Option<f64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_security_score: Option<f64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub expected_scenarios: Option<Vec<String>>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn missing_results_fails_fast() {
        let err = RunResults::from_json_value(json!({"meta": {}})).unwrap_err();
        assert!(matches!(err, InputError::MissingResults));

        let err = RunResults::from_json_value(json!({"results": []})).unwrap_err();
        assert!(matches!(err, InputError::MissingResults));

        let err = RunResults::from_json_value(json!([1, 2])).unwrap_err();
        assert!(matches!(err, InputError::NotAnObject));
    }

    #[test]
    fn minimal_result_set_defaults_everything_else() {
        let run = RunResults::from_json_value(json!({
            "results": {"staging": {"scenarios": {"cold_cache": {"iterations": [{"timing": {"total": 1.0}}]}}}}
        }))
        .unwrap();
        assert_eq!(run.schema, RUN_SCHEMA_V1);
        assert!(run.infrastructure.is_empty());
        let scenario = &run.results["staging"].scenarios["cold_cache"];
        assert_eq!(scenario.iterations.len(), 1);
        assert!(scenario.statistics.is_empty());
    }

    #[test]
    fn non_object_iterations_count_as_failed() {
        let run = RunResults::from_json_value(json!({
            "results": {"staging": {"scenarios": {"cold_cache": {"iterations": [
                {"timing": {"total": 1.0}},
                null,
                "crashed",
                {"timing": {"total": 3.0}}
            ]}}}}
        }))
        .unwrap();
        let scenario = &run.results["staging"].scenarios["cold_cache"];
        assert_eq!(scenario.iterations.len(), 4);
        assert_eq!(scenario.failed_count(), 2);
        assert_eq!(scenario.successful_iterations().count(), 2);
        assert_eq!(scenario.success_rate_pct(), Some(50.0));
    }

    #[test]
    fn iteration_failure_markers() {
        let ok: IterationRecord = json!({"timing": {"total": 5}}).as_object().unwrap().clone();
        let failed: IterationRecord = json!({"failed": true}).as_object().unwrap().clone();
        let errored: IterationRecord = json!({"error": "timeout"}).as_object().unwrap().clone();
        let null_error: IterationRecord = json!({"error": null}).as_object().unwrap().clone();

        assert!(!iteration_failed(&ok));
        assert!(iteration_failed(&failed));
        assert!(iteration_failed(&errored));
        assert!(!iteration_failed(&null_error));
    }

    #[test]
    fn success_rate_counts_failed_iterations() {
        let scenario = ScenarioResult {
            error: None,
            iterations: vec![
                json!({"v": 1}).as_object().unwrap().clone(),
                json!({"v": 2, "failed": true}).as_object().unwrap().clone(),
                json!({"v": 3}).as_object().unwrap().clone(),
                json!({"v": 4}).as_object().unwrap().clone(),
            ],
            statistics: BTreeMap::new(),
        };
        assert_eq!(scenario.failed_count(), 1);
        assert_eq!(scenario.success_rate_pct(), Some(75.0));
        assert_eq!(scenario.successful_iterations().count(), 3);
        assert_eq!(ScenarioResult::default().success_rate_pct(), None);
    }

    #[test]
    fn enum_wire_names() {
        assert_eq!(
            serde_json::to_string(&ChangeDirection::NoChange).unwrap(),
            "\"no-change\""
        );
        assert_eq!(
            serde_json::to_string(&Impact::SignificantNegative).unwrap(),
            "\"significant-negative\""
        );
        assert_eq!(
            serde_json::to_string(&IssueKind::HighVariability).unwrap(),
            "\"high_variability\""
        );
        assert_eq!(serde_json::to_string(&PValueMode::StudentT).unwrap(), "\"student_t\"");
    }

    #[test]
    fn polarity_resolves_exact_then_longest_prefix() {
        let mut config = AnalysisConfig::default();
        config.polarity.insert("throughput".into(), Direction::Higher);
        config.polarity.insert("throughput.errors".into(), Direction::Lower);
        config.polarity.insert("score.lighthouse".into(), Direction::Higher);

        assert_eq!(config.direction_for("timing.total"), Direction::Lower);
        assert_eq!(config.direction_for("throughput.rps"), Direction::Higher);
        assert_eq!(config.direction_for("throughput.errors.count"), Direction::Lower);
        assert_eq!(config.direction_for("throughput.errors"), Direction::Lower);
        assert_eq!(config.direction_for("score.lighthouse"), Direction::Higher);
        // A prefix only matches on a dot boundary.
        assert_eq!(config.direction_for("throughputx"), Direction::Lower);
    }

    #[test]
    fn compression_none_is_not_enabled() {
        let mut c = CompressionInfo::default();
        assert!(!c.is_enabled());
        c.algorithm = Some("identity".into());
        assert!(!c.is_enabled());
        c.algorithm = Some("br".into());
        assert!(c.is_enabled());
    }
}
