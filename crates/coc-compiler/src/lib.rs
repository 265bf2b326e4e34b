//! Cascade-of-Care Compiler
//!
//! Unified entry point for compiling a policy document into an engine
//! campaign.
//!
//! # Inputs
//!
//! - [`Policy`]: which subgraphs to emit, from YAML or built in code
//! - [`Schema`](coc_schema::Schema): the engine's class definitions
//! - [`Demographics`]: the individual properties the population declares
//! - the engine config, which receives the campaign's config effects
//!
//! # Output
//!
//! [`compile`] returns a [`CompileResult`] carrying the artifact (when
//! compilation succeeded) and every [`Diagnostic`] found on the way.

mod compile;
mod demographics;
mod error;
pub mod policy;

pub use compile::{CompileResult, Diagnostic, build, compile};
pub use demographics::Demographics;
pub use error::{PolicyError, PolicyResult};
pub use policy::{DEFAULT_BASE_YEAR, Policy, PolicyMetadata, find_policies, load_policies};
