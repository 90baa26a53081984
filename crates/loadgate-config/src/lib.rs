//! Configuration loading and merging for loadgate.
//!
//! Precedence, lowest first: built-in defaults, `loadgate.toml`, command-line overrides.
//! The result is a validated [`AnalysisConfig`] that is never mutated afterwards.

use anyhow::Context;
use loadgate_types::{AnalysisConfig, ConfigFile, Direction, PValueMode, ValidationConfig};
use std::path::{Path, PathBuf};

pub const DEFAULT_CONFIG_FILE: &str = "loadgate.toml";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{field} must be {expected}, got {value}")]
    OutOfRange {
        field: &'static str,
        expected: &'static str,
        value: f64,
    },

    #[error("{lower} ({lower_value}) must not exceed {upper} ({upper_value})")]
    Inverted {
        lower: &'static str,
        lower_value: f64,
        upper: &'static str,
        upper_value: f64,
    },

    #[error("invalid duration for {field}: {source}")]
    InvalidDuration {
        field: &'static str,
        #[source]
        source: humantime::DurationError,
    },

    #[error("invalid polarity {0:?} (expected METRIC=lower|higher)")]
    InvalidPolarity(String),

    #[error("invalid p-value mode {0:?} (expected lookup|student_t)")]
    InvalidPValueMode(String),
}

/// Threshold overrides taken from the command line.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Overrides {
    pub confidence_level: Option<f64>,
    pub significance_threshold: Option<f64>,
    pub regression_threshold: Option<f64>,
    pub p_value_mode: Option<PValueMode>,
    pub polarity: Vec<(String, Direction)>,
}

pub fn parse_config_str(contents: &str) -> anyhow::Result<ConfigFile> {
    toml::from_str(contents).context("parse loadgate config")
}

pub fn load_config_file(path: &Path) -> anyhow::Result<ConfigFile> {
    let contents = std::fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    parse_config_str(&contents).with_context(|| format!("load config {}", path.display()))
}

/// Load the explicit config file, or `loadgate.toml` in `dir` if one exists.
///
/// An explicit path that cannot be read is an error; a missing default file is not.
pub fn discover(explicit: Option<&Path>, dir: &Path) -> anyhow::Result<Option<(PathBuf, ConfigFile)>> {
    if let Some(path) = explicit {
        return Ok(Some((path.to_path_buf(), load_config_file(path)?)));
    }
    let candidate = dir.join(DEFAULT_CONFIG_FILE);
    if candidate.is_file() {
        let file = load_config_file(&candidate)?;
        return Ok(Some((candidate, file)));
    }
    Ok(None)
}

/// Layer a config file and overrides over the defaults, then validate the result.
pub fn resolve(file: Option<&ConfigFile>, overrides: &Overrides) -> Result<AnalysisConfig, ConfigError> {
    let mut config = AnalysisConfig::default();

    if let Some(file) = file {
        let a = &file.analysis;
        set(&mut config.confidence_level, a.confidence_level);
        set(&mut config.significance_threshold, a.significance_threshold);
        set(&mut config.regression_threshold, a.regression_threshold);
        set(&mut config.p_value_mode, a.p_value_mode);
        config.polarity.extend(file.polarity.iter().map(|(k, v)| (k.clone(), *v)));
        apply_validation_section(&mut config.validation, file)?;
    }

    set(&mut config.confidence_level, overrides.confidence_level);
    set(&mut config.significance_threshold, overrides.significance_threshold);
    set(&mut config.regression_threshold, overrides.regression_threshold);
    set(&mut config.p_value_mode, overrides.p_value_mode);
    config
        .polarity
        .extend(overrides.polarity.iter().map(|(k, v)| (k.clone(), *v)));

    validate(&config)?;
    Ok(config)
}

fn set<T: Clone>(slot: &mut T, value: Option<T>) {
    if let Some(v) = value {
        *slot = v;
    }
}

fn apply_validation_section(v: &mut ValidationConfig, file: &ConfigFile) -> Result<(), ConfigError> {
    let s = &file.validation;
    set(&mut v.cv_warn_pct, s.cv_warn_pct);
    set(&mut v.cv_fail_pct, s.cv_fail_pct);
    set(&mut v.min_samples, s.min_samples);
    set(&mut v.success_rate_warn_pct, s.success_rate_warn_pct);
    set(&mut v.success_rate_fail_pct, s.success_rate_fail_pct);
    set(&mut v.valid_rate_warn_pct, s.valid_rate_warn_pct);
    set(&mut v.valid_rate_fail_pct, s.valid_rate_fail_pct);
    set(&mut v.outlier_z, s.outlier_z);
    set(&mut v.min_iterations, s.min_iterations);
    set(&mut v.max_iterations, s.max_iterations);
    set(&mut v.duration_warn_factor, s.duration_warn_factor);
    set(&mut v.duration_fail_factor, s.duration_fail_factor);
    set(&mut v.min_security_score, s.min_security_score);
    set(&mut v.expected_scenarios, s.expected_scenarios.clone());

    if let Some(raw) = &s.iteration_timeout {
        let d = humantime::parse_duration(raw).map_err(|source| ConfigError::InvalidDuration {
            field: "validation.iteration_timeout",
            source,
        })?;
        v.iteration_timeout_ms = Some(d.as_millis() as u64);
    }
    Ok(())
}

/// Reject thresholds that make no sense.
pub fn validate(config: &AnalysisConfig) -> Result<(), ConfigError> {
    open_unit("analysis.confidence_level", config.confidence_level)?;
    open_unit("analysis.significance_threshold", config.significance_threshold)?;
    non_negative("analysis.regression_threshold", config.regression_threshold)?;

    let v = &config.validation;
    non_negative("validation.cv_warn_pct", v.cv_warn_pct)?;
    ordered("validation.cv_warn_pct", v.cv_warn_pct, "validation.cv_fail_pct", v.cv_fail_pct)?;
    percent("validation.success_rate_warn_pct", v.success_rate_warn_pct)?;
    percent("validation.success_rate_fail_pct", v.success_rate_fail_pct)?;
    ordered(
        "validation.success_rate_fail_pct",
        v.success_rate_fail_pct,
        "validation.success_rate_warn_pct",
        v.success_rate_warn_pct,
    )?;
    percent("validation.valid_rate_warn_pct", v.valid_rate_warn_pct)?;
    percent("validation.valid_rate_fail_pct", v.valid_rate_fail_pct)?;
    ordered(
        "validation.valid_rate_fail_pct",
        v.valid_rate_fail_pct,
        "validation.valid_rate_warn_pct",
        v.valid_rate_warn_pct,
    )?;
    positive("validation.outlier_z", v.outlier_z)?;
    ordered(
        "validation.min_iterations",
        v.min_iterations as f64,
        "validation.max_iterations",
        v.max_iterations as f64,
    )?;
    positive("validation.duration_warn_factor", v.duration_warn_factor)?;
    ordered(
        "validation.duration_warn_factor",
        v.duration_warn_factor,
        "validation.duration_fail_factor",
        v.duration_fail_factor,
    )?;
    percent("validation.min_security_score", v.min_security_score)?;
    Ok(())
}

fn open_unit(field: &'static str, value: f64) -> Result<(), ConfigError> {
    if value > 0.0 && value < 1.0 {
        Ok(())
    } else {
        Err(ConfigError::OutOfRange {
            field,
            expected: "strictly between 0 and 1",
            value,
        })
    }
}

fn non_negative(field: &'static str, value: f64) -> Result<(), ConfigError> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(ConfigError::OutOfRange {
            field,
            expected: "a finite number >= 0",
            value,
        })
    }
}

fn positive(field: &'static str, value: f64) -> Result<(), ConfigError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(ConfigError::OutOfRange {
            field,
            expected: "a finite number > 0",
            value,
        })
    }
}

fn percent(field: &'static str, value: f64) -> Result<(), ConfigError> {
    if (0.0..=100.0).contains(&value) {
        Ok(())
    } else {
        Err(ConfigError::OutOfRange {
            field,
            expected: "between 0 and 100",
            value,
        })
    }
}

fn ordered(lower: &'static str, lower_value: f64, upper: &'static str, upper_value: f64) -> Result<(), ConfigError> {
    if lower_value <= upper_value {
        Ok(())
    } else {
        Err(ConfigError::Inverted {
            lower,
            lower_value,
            upper,
            upper_value,
        })
    }
}

/// Parse `METRIC=lower|higher`.
pub fn parse_polarity(s: &str) -> Result<(String, Direction), ConfigError> {
    let (metric, dir) = s
        .split_once('=')
        .ok_or_else(|| ConfigError::InvalidPolarity(s.to_string()))?;
    let metric = metric.trim();
    if metric.is_empty() {
        return Err(ConfigError::InvalidPolarity(s.to_string()));
    }
    let direction = match dir.trim() {
        "lower" => Direction::Lower,
        "higher" => Direction::Higher,
        _ => return Err(ConfigError::InvalidPolarity(s.to_string())),
    };
    Ok((metric.to_string(), direction))
}

pub fn parse_p_value_mode(s: &str) -> Result<PValueMode, ConfigError> {
    match s.trim() {
        "lookup" => Ok(PValueMode::Lookup),
        "student_t" | "student-t" => Ok(PValueMode::StudentT),
        other => Err(ConfigError::InvalidPValueMode(other.to_string())),
    }
}
