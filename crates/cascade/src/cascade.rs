//! Top-level cascade builders
//!
//! Each builder runs a fixed sequence of state builders and collects their
//! exit signals. Wiring between builders is by signal only: the ART cascade
//! listens for the staging triggers that testing and PMTCT raise, and raises
//! the post-debut re-entry triggers health-care testing listens for.

use coc_campaign::{Campaign, CampaignError, CampaignResult, ResultExt};
use coc_foundation::{Signal, ValueMap};
use serde::Deserialize;
use tracing::info;

use crate::states::{
    AncParams, ArtStagingParams, AtDebutParams, Exits, LinkingToArtParams, LinkingToPreArtParams,
    OnArtParams, OnPreArtParams, PostDebutParams, SymptomaticParams, TestingLoopParams,
    add_art_staging, add_art_staging_diagnostic_test, add_hct_testing_loop,
    add_hct_uptake_at_debut, add_hct_uptake_post_debut, add_linking_to_art, add_linking_to_pre_art,
    add_lost_forever, add_on_art, add_on_pre_art, add_testing_on_anc, add_testing_on_child_6w,
    add_testing_on_symptomatic, default_child_testing_map,
};

/// Year every cascade listener starts from unless a policy says otherwise.
pub const DEFAULT_CASCADE_START_YEAR: f64 = 1990.0;

fn default_start_year() -> f64 {
    DEFAULT_CASCADE_START_YEAR
}

fn collect(exits: &mut Exits, more: Exits) {
    for signal in more {
        if !exits.contains(&signal) {
            exits.push(signal);
        }
    }
}

/// Symptomatic presentation through ART and loss to follow-up.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ArtCascadeParams {
    pub start_year: f64,
    pub symptomatic: SymptomaticParams,
    pub staging: ArtStagingParams,
    pub linking_to_pre_art: LinkingToPreArtParams,
    pub on_pre_art: OnPreArtParams,
    pub linking_to_art: LinkingToArtParams,
    pub on_art: OnArtParams,
}

impl Default for ArtCascadeParams {
    fn default() -> Self {
        Self {
            start_year: default_start_year(),
            symptomatic: SymptomaticParams::default(),
            staging: ArtStagingParams::default(),
            linking_to_pre_art: LinkingToPreArtParams::default(),
            on_pre_art: OnPreArtParams::default(),
            linking_to_art: LinkingToArtParams::default(),
            on_art: OnArtParams::default(),
        }
    }
}

impl ArtCascadeParams {
    pub fn with_pre_staging_retention(mut self, retention: f64) -> Self {
        self.staging.pre_staging_retention = retention;
        self
    }
}

/// Add the care cascade from symptomatic presentation to ART.
pub fn add_art_cascade(campaign: &mut Campaign, params: &ArtCascadeParams) -> CampaignResult<Exits> {
    let start = params.start_year;
    let run = |campaign: &mut Campaign| -> CampaignResult<Exits> {
        let mut exits = Vec::new();
        collect(&mut exits, add_testing_on_symptomatic(campaign, start, &params.symptomatic)?);
        collect(&mut exits, add_art_staging_diagnostic_test(campaign, start)?);
        collect(&mut exits, add_art_staging(campaign, start, &params.staging)?);
        collect(&mut exits, add_linking_to_pre_art(campaign, start, &params.linking_to_pre_art)?);
        collect(&mut exits, add_on_pre_art(campaign, start, &params.on_pre_art)?);
        collect(&mut exits, add_linking_to_art(campaign, start, &params.linking_to_art)?);
        collect(&mut exits, add_on_art(campaign, start, &params.on_art)?);
        collect(&mut exits, add_lost_forever(campaign, start)?);
        Ok(exits)
    };
    let exits = run(campaign).in_builder("add_art_cascade")?;
    info!(start_year = start, events = campaign.len(), "ART cascade added");
    Ok(exits)
}

/// Testing at debut, post-debut uptake and the retesting loop.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct HealthCareTestingParams {
    pub start_year: f64,
    pub at_debut: AtDebutParams,
    pub post_debut: PostDebutParams,
    pub testing_loop: TestingLoopParams,
}

impl Default for HealthCareTestingParams {
    fn default() -> Self {
        Self {
            start_year: default_start_year(),
            at_debut: AtDebutParams::default(),
            post_debut: PostDebutParams::default(),
            testing_loop: TestingLoopParams::default(),
        }
    }
}

/// Add health-care testing. Its re-entry gate listens for the triggers the
/// ART cascade raises, so both are normally added together.
pub fn add_health_care_testing(
    campaign: &mut Campaign,
    params: &HealthCareTestingParams,
) -> CampaignResult<Exits> {
    let start = params.start_year;
    let run = |campaign: &mut Campaign| -> CampaignResult<Exits> {
        let mut exits = Vec::new();
        collect(&mut exits, add_hct_uptake_at_debut(campaign, start, &params.at_debut)?);
        collect(&mut exits, add_hct_uptake_post_debut(campaign, start, &params.post_debut)?);
        collect(&mut exits, add_hct_testing_loop(campaign, start, &params.testing_loop)?);
        Ok(exits)
    };
    let exits = run(campaign).in_builder("add_health_care_testing")?;
    info!(start_year = start, "health-care testing added");
    Ok(exits)
}

/// ANC testing with PMTCT, and six-week infant testing.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PmtctParams {
    pub start_year: f64,
    pub anc: AncParams,
    /// Share of infants tested at six weeks; a built-in ramp when absent.
    pub child_testing_map: Option<ValueMap>,
}

impl Default for PmtctParams {
    fn default() -> Self {
        Self {
            start_year: default_start_year(),
            anc: AncParams::default(),
            child_testing_map: None,
        }
    }
}

pub fn add_pmtct(campaign: &mut Campaign, params: &PmtctParams) -> CampaignResult<Exits> {
    let start = params.start_year;
    let run = |campaign: &mut Campaign| -> CampaignResult<Exits> {
        let child_map = match &params.child_testing_map {
            Some(map) => map.clone(),
            None => default_child_testing_map()?,
        };
        let mut exits = Vec::new();
        collect(&mut exits, add_testing_on_anc(campaign, start, &params.anc)?);
        collect(&mut exits, add_testing_on_child_6w(campaign, start, &child_map)?);
        Ok(exits)
    };
    let exits = run(campaign).in_builder("add_pmtct")?;
    info!(start_year = start, "PMTCT added");
    Ok(exits)
}

/// Recency testing. Not wired into the cascade.
pub fn add_rtri_testing(_campaign: &mut Campaign, _start_year: f64) -> CampaignResult<Vec<Signal>> {
    Err(CampaignError::Unimplemented("recency (RTRI) testing")).in_builder("add_rtri_testing")
}

/// Index (partner) testing. Not wired into the cascade.
pub fn add_index_testing(
    _campaign: &mut Campaign,
    _start_year: f64,
) -> CampaignResult<Vec<Signal>> {
    Err(CampaignError::Unimplemented("index testing")).in_builder("add_index_testing")
}
