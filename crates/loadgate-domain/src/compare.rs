//! Two-sample comparison of one metric: change, Welch significance, classification.

use loadgate_significance::{estimator_for, welch_t_test, PValueEstimator};
use loadgate_types::{
    AnalysisConfig, Change, ChangeDirection, Classification, ComparisonResult, Direction,
    Interpretation, Magnitude, SignificanceLabel, SignificanceTest, StatisticsRecord,
};
use std::sync::Arc;

/// Compares baseline/comparison statistics under a fixed [`AnalysisConfig`].
#[derive(Debug, Clone)]
pub struct Comparator {
    config: AnalysisConfig,
    estimator: Arc<dyn PValueEstimator>,
}

impl Comparator {
    /// Uses the p-value estimator selected by `config.p_value_mode`.
    pub fn new(config: AnalysisConfig) -> Self {
        let estimator = estimator_for(config.p_value_mode);
        Self { config, estimator }
    }

    pub fn with_estimator(config: AnalysisConfig, estimator: Arc<dyn PValueEstimator>) -> Self {
        Self { config, estimator }
    }

    pub fn config(&self) -> &AnalysisConfig {
        &self.config
    }

    pub fn estimator(&self) -> &dyn PValueEstimator {
        self.estimator.as_ref()
    }

    /// Compare using the polarity configured for `metric`.
    pub fn compare_metric(
        &self,
        metric: &str,
        baseline: &StatisticsRecord,
        comparison: &StatisticsRecord,
    ) -> ComparisonResult {
        self.compare(metric, baseline, comparison, self.config.direction_for(metric))
    }

    /// Compare two summaries of the same metric under an explicit polarity.
    pub fn compare(
        &self,
        metric: &str,
        baseline: &StatisticsRecord,
        comparison: &StatisticsRecord,
        direction: Direction,
    ) -> ComparisonResult {
        let change = compute_change(baseline, comparison);

        let welch = welch_t_test(baseline, comparison);
        let p_value = self
            .estimator
            .two_tailed(welch.t_statistic, welch.degrees_of_freedom);
        let significance = SignificanceTest {
            t_statistic: welch.t_statistic,
            degrees_of_freedom: welch.degrees_of_freedom,
            p_value,
            is_significant: p_value < self.config.significance_threshold,
            confidence_level: self.config.confidence_level,
        };

        let interpretation = self.interpret(metric, baseline, comparison, &change, &significance, direction);

        ComparisonResult {
            metric: metric.to_string(),
            direction,
            baseline: *baseline,
            comparison: *comparison,
            change,
            significance,
            interpretation,
        }
    }

    fn interpret(
        &self,
        metric: &str,
        baseline: &StatisticsRecord,
        comparison: &StatisticsRecord,
        change: &Change,
        significance: &SignificanceTest,
        direction: Direction,
    ) -> Interpretation {
        let limit = self.config.regression_threshold * 100.0;
        let worse_pct = match direction {
            Direction::Lower => change.percent,
            Direction::Higher => -change.percent,
        };
        let is_regression = worse_pct > limit;
        let is_improvement = worse_pct < -limit;

        let classification = if !significance.is_significant {
            Classification::Insignificant
        } else if is_regression {
            Classification::Regression
        } else if is_improvement {
            Classification::Improvement
        } else {
            Classification::Neutral
        };

        let magnitude = magnitude(change.percent);

        let summary = match change.direction {
            ChangeDirection::NoChange => format!(
                "{metric} unchanged at {b:.2} ({sig})",
                b = baseline.mean,
                sig = significance_phrase(significance),
            ),
            dir => format!(
                "{metric} {verb} by {pct} ({b:.2} -> {c:.2}), {sig}",
                verb = if dir == ChangeDirection::Increase { "increased" } else { "decreased" },
                pct = format_pct(change.percent),
                b = baseline.mean,
                c = comparison.mean,
                sig = significance_phrase(significance),
            ),
        };

        let recommendation = match classification {
            Classification::Regression => format!(
                "Investigate the {} regression in {metric} before release",
                magnitude_word(magnitude)
            ),
            Classification::Improvement => format!(
                "Confirm the improvement in {metric} and consider promoting a new baseline"
            ),
            Classification::Neutral => format!(
                "{metric} changed significantly but within the {limit:.1}% threshold; keep monitoring"
            ),
            Classification::Insignificant if is_regression || is_improvement => format!(
                "{metric} moved {pct} but the change is not statistically significant; collect more iterations to confirm",
                pct = format_pct(change.percent)
            ),
            Classification::Insignificant => "No action needed".to_string(),
        };

        Interpretation {
            significance: if significance.is_significant {
                SignificanceLabel::Significant
            } else {
                SignificanceLabel::NotSignificant
            },
            magnitude,
            classification,
            is_regression,
            is_improvement,
            summary,
            recommendation,
        }
    }
}

/// Absolute and relative change of the means.
pub fn compute_change(baseline: &StatisticsRecord, comparison: &StatisticsRecord) -> Change {
    let absolute = comparison.mean - baseline.mean;
    let percent = if baseline.mean != 0.0 {
        100.0 * absolute / baseline.mean
    } else {
        0.0
    };
    let direction = if absolute > 0.0 {
        ChangeDirection::Increase
    } else if absolute < 0.0 {
        ChangeDirection::Decrease
    } else {
        ChangeDirection::NoChange
    };
    Change {
        absolute,
        percent,
        direction,
    }
}

/// Bucket on `|percent|`: `<5` small, `<15` medium, else large.
pub fn magnitude(percent: f64) -> Magnitude {
    let p = percent.abs();
    if p < 5.0 {
        Magnitude::Small
    } else if p < 15.0 {
        Magnitude::Medium
    } else {
        Magnitude::Large
    }
}

fn magnitude_word(m: Magnitude) -> &'static str {
    match m {
        Magnitude::Small => "small",
        Magnitude::Medium => "medium",
        Magnitude::Large => "large",
    }
}

fn significance_phrase(s: &SignificanceTest) -> String {
    if s.is_significant {
        format!("statistically significant (p = {:.4})", s.p_value)
    } else {
        format!("not statistically significant (p = {:.4})", s.p_value)
    }
}

/// `+12.34%` / `-5.00%` for a value already expressed in percent.
pub fn format_pct(percent: f64) -> String {
    let sign = if percent > 0.0 { "+" } else { "" };
    format!("{sign}{percent:.2}%")
}
