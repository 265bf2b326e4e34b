//! Time-value maps
//!
//! A time-value map is a pair of parallel lists `(times, values)` used for
//! year-dependent parameters. It is serialized as
//! `{ "Times": [...], "Values": [...] }`.

use serde::{Deserialize, Serialize};

use crate::{ValueError, ValueResult};

/// Times of the all-zero map meaning "negative outcome always taken".
pub const ALWAYS_NEGATIVE_TIMES: [f64; 2] = [1990.0, 2016.0];

/// How a map is read between its knots.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Interpolation {
    /// Linear between knots, clamped to the end values outside them.
    Linear,
    /// Latest knot at or before `t`; zero before the first knot.
    Step,
}

impl Interpolation {
    /// Engine `Interpolation_Order` value.
    pub fn order(self) -> i64 {
        match self {
            Interpolation::Linear => 1,
            Interpolation::Step => 0,
        }
    }
}

#[derive(Deserialize)]
struct RawValueMap {
    #[serde(rename = "Times", alias = "times")]
    times: Vec<f64>,
    #[serde(rename = "Values", alias = "values")]
    values: Vec<f64>,
}

/// Ordered `(times, values)` table with equal-length, non-decreasing times.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawValueMap")]
pub struct ValueMap {
    #[serde(rename = "Times")]
    times: Vec<f64>,
    #[serde(rename = "Values")]
    values: Vec<f64>,
}

impl TryFrom<RawValueMap> for ValueMap {
    type Error = ValueError;

    fn try_from(raw: RawValueMap) -> Result<Self, Self::Error> {
        ValueMap::new(raw.times, raw.values)
    }
}

impl ValueMap {
    /// Build a map, checking shape and ordering.
    pub fn new(times: Vec<f64>, values: Vec<f64>) -> ValueResult<Self> {
        if times.len() != values.len() {
            return Err(ValueError::UnequalLengths {
                times: times.len(),
                values: values.len(),
            });
        }
        if times.is_empty() {
            return Err(ValueError::EmptyValueMap);
        }
        for t in &times {
            if !t.is_finite() {
                return Err(ValueError::NonFinite {
                    what: "time",
                    value: *t,
                });
            }
        }
        for v in &values {
            if !v.is_finite() {
                return Err(ValueError::NonFinite {
                    what: "value",
                    value: *v,
                });
            }
        }
        for pair in times.windows(2) {
            if pair[1] < pair[0] {
                return Err(ValueError::TimesNotMonotonic {
                    earlier: pair[0],
                    later: pair[1],
                });
            }
        }
        Ok(Self { times, values })
    }

    /// Build a map from `(time, value)` pairs.
    pub fn from_pairs(pairs: &[(f64, f64)]) -> ValueResult<Self> {
        let (times, values) = pairs.iter().copied().unzip();
        Self::new(times, values)
    }

    /// A single knot holding `value` from `time` on.
    pub fn constant(time: f64, value: f64) -> Self {
        Self {
            times: vec![time],
            values: vec![value],
        }
    }

    /// The all-zero sentinel map.
    pub fn always_negative() -> Self {
        Self {
            times: ALWAYS_NEGATIVE_TIMES.to_vec(),
            values: vec![0.0; ALWAYS_NEGATIVE_TIMES.len()],
        }
    }

    /// Whether every value is zero, so the negative outcome is always taken.
    pub fn is_always_negative(&self) -> bool {
        self.values.iter().all(|v| *v == 0.0)
    }

    pub fn times(&self) -> &[f64] {
        &self.times
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.times.len()
    }

    pub fn is_empty(&self) -> bool {
        self.times.is_empty()
    }

    /// Check every value lies in `[min, max]`.
    pub fn check_range(&self, what: &str, min: f64, max: f64) -> ValueResult<()> {
        for v in &self.values {
            if *v < min || *v > max {
                return Err(ValueError::ProbabilityOutOfRange {
                    name: what.to_string(),
                    value: *v,
                });
            }
        }
        Ok(())
    }

    /// Value at time `t` under the given interpolation.
    pub fn evaluate(&self, t: f64, interpolation: Interpolation) -> f64 {
        match interpolation {
            Interpolation::Linear => self.linear(t),
            Interpolation::Step => self.step(t),
        }
    }

    fn linear(&self, t: f64) -> f64 {
        let last = self.times.len() - 1;
        if t <= self.times[0] {
            return self.values[0];
        }
        if t >= self.times[last] {
            return self.values[last];
        }
        // First knot strictly after t; t lies in [times[i-1], times[i]).
        let i = self.times.partition_point(|x| *x <= t);
        let (t0, t1) = (self.times[i - 1], self.times[i]);
        let (v0, v1) = (self.values[i - 1], self.values[i]);
        if t1 == t0 {
            return v1;
        }
        v0 + (v1 - v0) * (t - t0) / (t1 - t0)
    }

    fn step(&self, t: f64) -> f64 {
        match self.times.partition_point(|x| *x <= t) {
            0 => 0.0,
            i => self.values[i - 1],
        }
    }

    /// JSON form `{ "Times": [...], "Values": [...] }`.
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::json!({
            "Times": self.times,
            "Values": self.values,
        })
    }
}
