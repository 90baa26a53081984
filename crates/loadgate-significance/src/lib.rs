//! Two-sample significance testing for loadgate.
//!
//! Welch's unequal-variance t-test over two [`StatisticsRecord`]s, with the
//! Welch–Satterthwaite degrees-of-freedom approximation. Turning `(t, df)` into a
//! p-value is a strategy ([`PValueEstimator`]) so the coarse lookup table used by
//! default can be swapped for the exact Student-t distribution.

use loadgate_types::{PValueMode, StatisticsRecord};
use statrs::distribution::{ContinuousCDF, StudentsT};
use std::sync::Arc;

/// Turns a t statistic and degrees of freedom into a two-tailed p-value.
pub trait PValueEstimator: std::fmt::Debug + Send + Sync {
    fn mode(&self) -> PValueMode;

    /// Two-tailed p-value. Must return `1.0` when `df <= 0` or either input is not finite.
    fn two_tailed(&self, t: f64, df: f64) -> f64;
}

/// Step function on `|t|`: `<1 → 0.5`, `<2 → 0.1`, `<3 → 0.01`, `<4 → 0.001`, else `0.0001`.
///
/// Ignores `df` except for the `df <= 0` guard. Coarse, but the table boundaries are part
/// of the gating contract.
#[derive(Debug, Default, Clone, Copy)]
pub struct LookupTable;

impl PValueEstimator for LookupTable {
    fn mode(&self) -> PValueMode {
        PValueMode::Lookup
    }

    fn two_tailed(&self, t: f64, df: f64) -> f64 {
        if !degenerate_ok(t, df) {
            return 1.0;
        }
        let t = t.abs();
        if t < 1.0 {
            0.5
        } else if t < 2.0 {
            0.1
        } else if t < 3.0 {
            0.01
        } else if t < 4.0 {
            0.001
        } else {
            0.0001
        }
    }
}

/// Exact two-tailed p-value from the Student-t survival function.
#[derive(Debug, Default, Clone, Copy)]
pub struct StudentT;

impl PValueEstimator for StudentT {
    fn mode(&self) -> PValueMode {
        PValueMode::StudentT
    }

    fn two_tailed(&self, t: f64, df: f64) -> f64 {
        if !degenerate_ok(t, df) {
            return 1.0;
        }
        match StudentsT::new(0.0, 1.0, df) {
            Ok(dist) => (2.0 * dist.sf(t.abs())).clamp(0.0, 1.0),
            Err(_) => 1.0,
        }
    }
}

fn degenerate_ok(t: f64, df: f64) -> bool {
    df > 0.0 && df.is_finite() && t.is_finite()
}

/// The estimator for a configured mode.
pub fn estimator_for(mode: PValueMode) -> Arc<dyn PValueEstimator> {
    match mode {
        PValueMode::Lookup => Arc::new(LookupTable),
        PValueMode::StudentT => Arc::new(StudentT),
    }
}

/// Result of Welch's t-test before p-value estimation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WelchTest {
    /// `(baseline.mean - comparison.mean) / standard_error`; 0 when the error is 0.
    pub t_statistic: f64,

    /// Welch–Satterthwaite approximation; 0 when either sample has fewer than 2 values.
    pub degrees_of_freedom: f64,

    pub standard_error: f64,
}

/// Welch's t-test between two summarized samples.
///
/// Degenerate inputs never divide by zero: a count below 2 on either side gives `df = 0`,
/// and zero pooled variance gives `t = 0`.
pub fn welch_t_test(baseline: &StatisticsRecord, comparison: &StatisticsRecord) -> WelchTest {
    if baseline.count == 0 || comparison.count == 0 {
        return WelchTest {
            t_statistic: 0.0,
            degrees_of_freedom: 0.0,
            standard_error: 0.0,
        };
    }

    let n1 = baseline.count as f64;
    let n2 = comparison.count as f64;
    let a = baseline.variance() / n1;
    let b = comparison.variance() / n2;

    let standard_error = (a + b).sqrt();
    let t_statistic = if standard_error > 0.0 && standard_error.is_finite() {
        (baseline.mean - comparison.mean) / standard_error
    } else {
        0.0
    };

    let degrees_of_freedom = if baseline.count < 2 || comparison.count < 2 {
        0.0
    } else {
        let denom = a * a / (n1 - 1.0) + b * b / (n2 - 1.0);
        if denom > 0.0 {
            (a + b).powi(2) / denom
        } else {
            0.0
        }
    };

    WelchTest {
        t_statistic,
        degrees_of_freedom,
        standard_error,
    }
}
