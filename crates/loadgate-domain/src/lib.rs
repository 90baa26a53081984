//! Domain logic for loadgate.
//!
//! This crate is intentionally I/O-free: it does math and policy.
//!
//! - [`Comparator`]: one metric, baseline vs. comparison, under a polarity.
//! - [`ComparisonEngine`]: every shared environment/scenario/metric plus infrastructure.
//! - [`validate_against_baseline`]: the regression gate over a stored [`Baseline`].
//!
//! [`Baseline`]: loadgate_types::Baseline

mod aggregate;
mod compare;
mod gate;
mod infrastructure;
mod pairs;

pub use aggregate::{recommend, summarize, ComparisonEngine, ScenarioComparisons, CHANGING_ABOVE, UNSTABLE_ABOVE};
pub use compare::{compute_change, format_pct, magnitude, Comparator};
pub use gate::{
    build_baseline, gate_score, gate_statistics, validate_against_baseline, IMPROVEMENT_BONUS,
    REGRESSION_PENALTY,
};
pub use infrastructure::{
    compare_caching, compare_cdn, compare_compression, compare_profiles, compare_protocols,
    compare_security, InfrastructureOutcome,
};
