//! Probability complement policy
//!
//! Every probability split written to a campaign closes with a complement
//! rounded to [`PROBABILITY_DIGITS`] decimals, so `0.1` is paired with `0.9`
//! rather than `0.8999999999999999`. Downstream engines were validated
//! against this exact rule; do not change the precision.

use crate::{ValueError, ValueResult};

/// Decimal digits kept on a complement.
pub const PROBABILITY_DIGITS: i32 = 7;

/// Round `value` to `digits` decimal places (half away from zero).
pub fn round_to(value: f64, digits: i32) -> f64 {
    let scale = 10f64.powi(digits);
    (value * scale).round() / scale
}

/// `round(1 - p, 7)`.
pub fn complement(p: f64) -> f64 {
    round_to(1.0 - p, PROBABILITY_DIGITS)
}

/// Check that `value` is a probability.
pub fn check_probability(name: &str, value: f64) -> ValueResult<f64> {
    if !value.is_finite() || !(0.0..=1.0).contains(&value) {
        return Err(ValueError::ProbabilityOutOfRange {
            name: name.to_string(),
            value,
        });
    }
    Ok(value)
}

/// Close a split: the given probabilities followed by the rounded remainder.
///
/// With one input this is the two-way split `[p, round(1 - p, 7)]`.
pub fn split_probabilities(given: &[f64]) -> ValueResult<Vec<f64>> {
    for (i, p) in given.iter().enumerate() {
        check_probability(&format!("choice {i}"), *p)?;
    }
    let sum: f64 = given.iter().sum();
    if sum > 1.0 + 10f64.powi(-PROBABILITY_DIGITS) {
        return Err(ValueError::ProbabilitySumExceedsOne { sum });
    }
    let mut split = given.to_vec();
    split.push(complement(sum).max(0.0));
    Ok(split)
}
