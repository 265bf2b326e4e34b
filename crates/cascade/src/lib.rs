//! Cascade-of-Care Builders
//!
//! Emits the care pathway of an HIV population into a [`Campaign`].
//!
//! # Layers
//!
//! - [`states`]: one builder per cascade state, each a fixed subgraph of
//!   triggered events returning the signals it raises
//! - [`cascade`]: top-level builders that run the states in order
//!   ([`add_art_cascade`], [`add_health_care_testing`], [`add_pmtct`])
//! - [`auxiliary`]: subgraphs outside the pathway (commercial sex work,
//!   co-infection, circumcision, seeding, PrEP, sexual debut)
//!
//! Builders take the campaign by `&mut` and a parameter struct whose
//! `Default` carries the calibrated values. Every failure names the
//! builder it came from.
//!
//! [`Campaign`]: coc_campaign::Campaign

pub mod auxiliary;
pub mod cascade;
pub mod states;

pub use auxiliary::{
    ANY_MC, CoinfectionGroup, CoinfectionParams, CswParams, HistoricalVmmcParams, PREP,
    PrepParams, SeedingParams, SexualDebutParams, TraditionalMcParams, VmmcParams, add_csw,
    add_historical_vmmc_nchooser, add_post_debut_coinfection, add_prep, add_set_sexual_debut_age,
    add_traditional_male_circumcision, add_vmmc_reference_tracking, seed_infections,
};
pub use cascade::{
    ArtCascadeParams, DEFAULT_CASCADE_START_YEAR, HealthCareTestingParams, PmtctParams,
    add_art_cascade, add_health_care_testing, add_index_testing, add_pmtct, add_rtri_testing,
};
pub use states::Exits;
