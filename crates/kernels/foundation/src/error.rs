//! Errors raised while constructing foundation values

use thiserror::Error;

/// Result type for foundation constructors.
pub type ValueResult<T> = Result<T, ValueError>;

/// Invalid caller-supplied values.
///
/// These surface as argument errors once they reach the campaign layer.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValueError {
    #[error("time-value map has {times} times but {values} values")]
    UnequalLengths { times: usize, values: usize },

    #[error("time-value map is empty")]
    EmptyValueMap,

    #[error("time-value map times must be non-decreasing (time {later} follows {earlier})")]
    TimesNotMonotonic { earlier: f64, later: f64 },

    #[error("{what} must be finite, got {value}")]
    NonFinite { what: &'static str, value: f64 },

    #[error("probability {name} = {value} is outside [0, 1]")]
    ProbabilityOutOfRange { name: String, value: f64 },

    #[error("probabilities sum to {sum}, which exceeds 1")]
    ProbabilitySumExceedsOne { sum: f64 },

    #[error("invalid {kind} distribution: {reason}")]
    InvalidDistribution { kind: &'static str, reason: String },

    #[error("invalid property '{0}': expected 'Key:Value'")]
    InvalidProperty(String),

    #[error("unknown {kind} name '{name}'")]
    UnknownName { kind: &'static str, name: String },
}
