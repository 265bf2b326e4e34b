//! Cascade-of-Care Campaign
//!
//! Turns abstract distribution requests into engine event records.
//!
//! # Pipeline
//!
//! ```text
//! Intervention structs -> distributor request -> coordinator record
//!                      -> event record -> Campaign -> finalize -> artifact
//! ```
//!
//! - [`intervention`]: one struct per engine intervention class, unified by
//!   the [`Intervention`] enum and the [`InterventionConfig`] trait
//! - [`distributor`]: scheduled, triggered, reference-tracked and NChooser
//!   distribution, each appending one event to a [`Campaign`]
//! - [`campaign`]: the aggregator threaded through every builder
//! - [`validate`] and [`analysis`]: whole-campaign checks run at
//!   finalization
//!
//! A campaign is written once: [`Campaign::finalize`] validates, applies the
//! engine-config effects and returns a [`CampaignArtifact`].

pub mod analysis;
pub mod artifact;
pub mod campaign;
pub mod coordinator;
pub mod distributor;
pub mod effects;
mod error;
pub mod intervention;
pub mod ledger;
pub mod validate;

pub use analysis::{Edge, EdgeKind, SignalGraph, UntestedPath};
pub use artifact::{CampaignArtifact, write_json_atomic};
pub use campaign::{Campaign, CampaignEvent, CoordinatorKind, TimeAxis};
pub use coordinator::{
    DiseaseState, NChooserRow, NChooserTable, NodeSet, Targeting, TargetingLogic,
};
pub use distributor::{NChooser, ReferenceTracked, Repetitions, Scheduled, Triggered};
pub use effects::{CUSTOM_EVENTS_KEY, ConfigEffect, EffectSet};
pub use error::{CampaignError, CampaignResult, ErrorKind, ResultExt};
pub use intervention::{Intervention, InterventionConfig, Outcomes};
pub use ledger::{SignalLedger, SignalUse};
pub use validate::{
    IssueCode, PropertyCatalog, Severity, ValidationIssue, ValidationOptions, ValidationReport,
};
