//! Cascade-of-Care Foundation
//!
//! Core primitives shared by every stage of the campaign compiler:
//! signal and cascade-state vocabularies, individual-property pairs,
//! time-value maps, sigmoid ramps, delay distributions and the
//! probability complement policy.

mod error;
pub mod distribution;
pub mod ids;
pub mod probability;
pub mod properties;
pub mod sigmoid;
pub mod value_map;

pub use distribution::DelayDistribution;
pub use error::{ValueError, ValueResult};
pub use ids::{BuiltinSignal, CascadeState, CustomSignal, Signal, TargetGender};
pub use probability::{
    PROBABILITY_DIGITS, check_probability, complement, round_to, split_probabilities,
};
pub use properties::{PropertyPair, PropertyRestrictions};
pub use sigmoid::Sigmoid;
pub use value_map::{ALWAYS_NEGATIVE_TIMES, Interpolation, ValueMap};

/// Days per simulated year when converting calendar years to engine timesteps.
pub const DAYS_PER_YEAR: f64 = 365.0;

/// Individual-property key carrying the cascade state.
pub const CASCADE_STATE_KEY: &str = "CascadeState";
