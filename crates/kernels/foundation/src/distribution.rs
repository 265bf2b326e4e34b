//! Delay and duration distributions
//!
//! The engine draws from these; the compiler only checks and serializes
//! their parameters.

use serde::{Deserialize, Serialize};

use crate::{ValueError, ValueResult};

/// A delay distribution in days.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DelayDistribution {
    Constant { value: f64 },
    Uniform { min: f64, max: f64 },
    Exponential { mean: f64 },
    Weibull { lambda: f64, kappa: f64 },
}

impl DelayDistribution {
    pub fn constant(value: f64) -> Self {
        DelayDistribution::Constant { value }
    }

    pub fn uniform(min: f64, max: f64) -> Self {
        DelayDistribution::Uniform { min, max }
    }

    pub fn exponential(mean: f64) -> Self {
        DelayDistribution::Exponential { mean }
    }

    pub fn weibull(lambda: f64, kappa: f64) -> Self {
        DelayDistribution::Weibull { lambda, kappa }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            DelayDistribution::Constant { .. } => "constant",
            DelayDistribution::Uniform { .. } => "uniform",
            DelayDistribution::Exponential { .. } => "exponential",
            DelayDistribution::Weibull { .. } => "weibull",
        }
    }

    /// Engine enum tag, e.g. `EXPONENTIAL_DISTRIBUTION`.
    pub fn engine_tag(&self) -> &'static str {
        match self {
            DelayDistribution::Constant { .. } => "CONSTANT_DISTRIBUTION",
            DelayDistribution::Uniform { .. } => "UNIFORM_DISTRIBUTION",
            DelayDistribution::Exponential { .. } => "EXPONENTIAL_DISTRIBUTION",
            DelayDistribution::Weibull { .. } => "WEIBULL_DISTRIBUTION",
        }
    }

    pub fn validate(&self) -> ValueResult<()> {
        let invalid = |reason: String| ValueError::InvalidDistribution {
            kind: self.kind(),
            reason,
        };
        let params: Vec<(&str, f64)> = match self {
            DelayDistribution::Constant { value } => vec![("value", *value)],
            DelayDistribution::Uniform { min, max } => vec![("min", *min), ("max", *max)],
            DelayDistribution::Exponential { mean } => vec![("mean", *mean)],
            DelayDistribution::Weibull { lambda, kappa } => {
                vec![("lambda", *lambda), ("kappa", *kappa)]
            }
        };
        for (name, value) in &params {
            if !value.is_finite() || *value < 0.0 {
                return Err(invalid(format!("{name} must be a non-negative number, got {value}")));
            }
        }
        match self {
            DelayDistribution::Uniform { min, max } if min > max => {
                Err(invalid(format!("min {min} exceeds max {max}")))
            }
            DelayDistribution::Exponential { mean } if *mean == 0.0 => {
                Err(invalid("mean must be positive".to_string()))
            }
            DelayDistribution::Weibull { lambda, kappa } if *lambda == 0.0 || *kappa == 0.0 => {
                Err(invalid("lambda and kappa must be positive".to_string()))
            }
            _ => Ok(()),
        }
    }

    /// Engine fields for this distribution under a parameter prefix.
    ///
    /// With prefix `Delay_Period` an exponential yields
    /// `Delay_Period_Distribution = EXPONENTIAL_DISTRIBUTION` and
    /// `Delay_Period_Exponential = mean`.
    pub fn fields(&self, prefix: &str) -> Vec<(String, serde_json::Value)> {
        let mut fields = vec![(
            format!("{prefix}_Distribution"),
            serde_json::Value::from(self.engine_tag()),
        )];
        let params: Vec<(&str, f64)> = match self {
            DelayDistribution::Constant { value } => vec![("Constant", *value)],
            DelayDistribution::Uniform { min, max } => vec![("Min", *min), ("Max", *max)],
            DelayDistribution::Exponential { mean } => vec![("Exponential", *mean)],
            DelayDistribution::Weibull { lambda, kappa } => {
                vec![("Kappa", *kappa), ("Lambda", *lambda)]
            }
        };
        fields.extend(
            params
                .into_iter()
                .map(|(suffix, v)| (format!("{prefix}_{suffix}"), serde_json::Value::from(v))),
        );
        fields
    }
}
