//! Logistic ramp over calendar years

use serde::{Deserialize, Serialize};

use crate::{TargetGender, ValueError, ValueResult};

/// `min + (max - min) / (1 + exp(-rate * (year - mid)))`.
///
/// A rate of 1 gives roughly a 25%/year slope at the inflection point.
/// Negative rates ramp downwards.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Sigmoid {
    pub min: f64,
    pub max: f64,
    pub mid: f64,
    pub rate: f64,
}

impl Sigmoid {
    pub fn new(min: f64, max: f64, mid: f64, rate: f64) -> ValueResult<Self> {
        let sigmoid = Self {
            min,
            max,
            mid,
            rate,
        };
        sigmoid.validate()?;
        Ok(sigmoid)
    }

    pub fn validate(&self) -> ValueResult<()> {
        for (what, value) in [
            ("sigmoid min", self.min),
            ("sigmoid max", self.max),
            ("sigmoid mid", self.mid),
            ("sigmoid rate", self.rate),
        ] {
            if !value.is_finite() {
                return Err(ValueError::NonFinite { what, value });
            }
        }
        Ok(())
    }

    /// Raw ramp value at `year`.
    pub fn evaluate(&self, year: f64) -> f64 {
        self.min + (self.max - self.min) / (1.0 + (-self.rate * (year - self.mid)).exp())
    }

    /// Probability for an individual of `gender`, clamped to `[0, 1]`.
    pub fn probability(&self, year: f64, gender: TargetGender, female_multiplier: f64) -> f64 {
        let base = self.evaluate(year);
        let scaled = match gender {
            TargetGender::Female => base * female_multiplier,
            _ => base,
        };
        scaled.clamp(0.0, 1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_midpoint_is_halfway() {
        let s = Sigmoid::new(0.0, 0.975, 2005.87, 0.7136).unwrap();
        assert!((s.evaluate(2005.87) - 0.4875).abs() < 1e-12);
    }

    #[test]
    fn test_approaches_bounds() {
        let s = Sigmoid::new(0.25, 0.9, 2002.0, 0.5).unwrap();
        assert!((s.evaluate(1900.0) - 0.25).abs() < 1e-9);
        assert!((s.evaluate(2100.0) - 0.9).abs() < 1e-9);
    }

    #[test]
    fn test_negative_rate_ramps_down() {
        let s = Sigmoid::new(0.0, 1.0, 2008.4, -1.0).unwrap();
        assert!(s.evaluate(2000.0) > 0.99);
        assert!(s.evaluate(2020.0) < 0.01);
    }

    #[test]
    fn test_probability_applies_female_multiplier_and_clamps() {
        let s = Sigmoid::new(0.7572, 0.9591, 2006.83, 1.0).unwrap();
        let male = s.probability(2030.0, TargetGender::Male, 1.5);
        let female = s.probability(2030.0, TargetGender::Female, 1.5);
        assert!(male < 1.0);
        assert_eq!(female, 1.0);

        let low = Sigmoid::new(-0.005, 0.05, 2005.0, 1.0).unwrap();
        assert_eq!(low.probability(1950.0, TargetGender::Male, 1.0), 0.0);
    }

    #[test]
    fn test_rejects_non_finite() {
        assert!(Sigmoid::new(0.0, f64::NAN, 2000.0, 1.0).is_err());
    }
}
