//! loadgate workspace-level test utilities.
//!
//! This crate exists solely to support workspace-level integration tests,
//! particularly the BDD/cucumber tests in `tests/cucumber.rs`.
//!
//! The actual loadgate functionality is in the workspace member crates:
//! - `loadgate-types`: Shared data model and JSON schemas
//! - `loadgate-stats`: Metric extraction and reduction
//! - `loadgate-significance`: Welch t-test and p-value estimation
//! - `loadgate-domain`: Comparison, aggregation and the baseline gate
//! - `loadgate-validation`: Run reliability checks
//! - `loadgate-config`: Config file loading and threshold merging
//! - `loadgate-app`: Application use cases and rendering
//! - `loadgate-cli`: CLI interface
