//! Care states: staging, linking, pre-ART, ART and loss to follow-up.

use coc_campaign::{
    Campaign, CampaignResult, ResultExt,
    intervention::{
        AntiretroviralTherapy, ArtDropout, ArtStagingByCd4, ArtStagingCd4Agnostic, DrawBlood,
        Muxer, Outcomes, PiecewiseDiagnostic, PropertyValueChanger, RandomChoice,
        SigmoidDiagnostic,
    },
};
use coc_foundation::{CascadeState, CustomSignal, DelayDistribution, Sigmoid, ValueMap};
use serde::Deserialize;
use tracing::info;

use super::{Exits, on, place};

/// Retention through CD4 staging.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ArtStagingParams {
    /// Share of those referred who arrive for staging.
    pub pre_staging_retention: f64,
    /// Share of those not eligible without a CD4 count who wait for one.
    pub cd4_retention: f64,
}

impl Default for ArtStagingParams {
    fn default() -> Self {
        Self {
            pre_staging_retention: 0.85,
            cd4_retention: 1.0,
        }
    }
}

/// Stage positives for eligibility, with or without a CD4 count.
///
/// Eligibility follows the historical guideline tables; those lost on the
/// way re-enter post-debut uptake.
pub fn add_art_staging(
    campaign: &mut Campaign,
    start_year: f64,
    params: &ArtStagingParams,
) -> CampaignResult<Exits> {
    staging(campaign, start_year, params).in_builder("add_art_staging")
}

fn staging(
    campaign: &mut Campaign,
    start_year: f64,
    params: &ArtStagingParams,
) -> CampaignResult<Exits> {
    use CustomSignal::*;
    const STATE: CascadeState = CascadeState::ArtStaging;

    let retention = RandomChoice::split(
        ArtStagingTrigger2,
        params.pre_staging_retention,
        HctUptakePostDebutTrigger2,
    )?;
    on(
        campaign,
        "ARTStaging: pre-staging retention",
        start_year,
        ArtStagingTrigger1,
        vec![place(STATE, retention)],
    )?;

    let wait = Muxer::new("ARTStaging", DelayDistribution::constant(1.0), ArtStaging3)?;
    on(
        campaign,
        "ARTStaging: wait",
        start_year,
        ArtStagingTrigger2,
        vec![place(STATE, wait)],
    )?;

    on(
        campaign,
        "ARTStaging: draw blood",
        start_year,
        ArtStaging3,
        vec![place(STATE, DrawBlood::new(ArtStaging4))],
    )?;

    let agnostic =
        ArtStagingCd4Agnostic::historical(Outcomes::both(LinkingToArtTrigger, ArtStaging5))?;
    on(
        campaign,
        "ARTStaging: eligibility without CD4",
        start_year,
        ArtStaging4,
        vec![place(STATE, agnostic)],
    )?;

    let cd4_retention =
        RandomChoice::split(ArtStaging6, params.cd4_retention, HctUptakePostDebutTrigger3)?;
    on(
        campaign,
        "ARTStaging: CD4 retention",
        start_year,
        ArtStaging5,
        vec![place(STATE, cd4_retention)],
    )?;

    let by_cd4 =
        ArtStagingByCd4::historical(Outcomes::both(LinkingToArtTrigger, LinkingToPreArtTrigger))?;
    on(
        campaign,
        "ARTStaging: eligibility by CD4",
        start_year,
        ArtStaging6,
        vec![place(STATE, by_cd4)],
    )?;

    info!(start_year, "ARTStaging added");
    Ok(vec![
        LinkingToArtTrigger.into(),
        LinkingToPreArtTrigger.into(),
        HctUptakePostDebutTrigger2.into(),
        HctUptakePostDebutTrigger3.into(),
    ])
}

/// Linking of ineligible positives to pre-ART care.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct LinkingToPreArtParams {
    pub sigmoid: Sigmoid,
    pub female_multiplier: f64,
}

impl Default for LinkingToPreArtParams {
    fn default() -> Self {
        Self {
            sigmoid: Sigmoid {
                min: 0.7572,
                max: 0.9591,
                mid: 2006.83,
                rate: 1.0,
            },
            female_multiplier: 1.5,
        }
    }
}

pub fn add_linking_to_pre_art(
    campaign: &mut Campaign,
    start_year: f64,
    params: &LinkingToPreArtParams,
) -> CampaignResult<Exits> {
    linking_to_pre_art(campaign, start_year, params).in_builder("add_linking_to_pre_art")
}

fn linking_to_pre_art(
    campaign: &mut Campaign,
    start_year: f64,
    params: &LinkingToPreArtParams,
) -> CampaignResult<Exits> {
    use CustomSignal::*;

    params.sigmoid.validate()?;
    let link = SigmoidDiagnostic::new(
        params.sigmoid,
        Outcomes::both(OnPreArtTrigger, HctUptakePostDebutTrigger3),
    )
    .with_female_multiplier(params.female_multiplier);
    on(
        campaign,
        "LinkingToPreART: link",
        start_year,
        LinkingToPreArtTrigger,
        vec![place(CascadeState::LinkingToPreArt, link)],
    )?;
    info!(start_year, "LinkingToPreART added");
    Ok(vec![OnPreArtTrigger.into(), HctUptakePostDebutTrigger3.into()])
}

/// Pre-ART care: periodic re-staging until eligible.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct OnPreArtParams {
    /// Share retained at each re-staging visit.
    pub retention: f64,
    /// Days between re-staging visits.
    pub visit_interval: f64,
}

impl Default for OnPreArtParams {
    fn default() -> Self {
        Self {
            retention: 0.75,
            visit_interval: 182.0,
        }
    }
}

pub fn add_on_pre_art(
    campaign: &mut Campaign,
    start_year: f64,
    params: &OnPreArtParams,
) -> CampaignResult<Exits> {
    pre_art(campaign, start_year, params).in_builder("add_on_pre_art")
}

fn pre_art(
    campaign: &mut Campaign,
    start_year: f64,
    params: &OnPreArtParams,
) -> CampaignResult<Exits> {
    use CustomSignal::*;
    const STATE: CascadeState = CascadeState::OnPreArt;

    let wait = Muxer::new(
        "OnPreART",
        DelayDistribution::constant(params.visit_interval),
        OnPreArt1,
    )?;
    on(
        campaign,
        "OnPreART: wait",
        start_year,
        OnPreArtTrigger,
        vec![place(STATE, wait)],
    )?;

    let retention = RandomChoice::split(OnPreArt2, params.retention, HctUptakePostDebutTrigger3)?;
    on(
        campaign,
        "OnPreART: retention",
        start_year,
        OnPreArt1,
        vec![place(STATE, retention)],
    )?;

    let agnostic = ArtStagingCd4Agnostic::historical(Outcomes::both(OnArtTrigger1, OnPreArt3))?;
    on(
        campaign,
        "OnPreART: eligibility without CD4",
        start_year,
        OnPreArt2,
        vec![place(STATE, agnostic)],
    )?;

    on(
        campaign,
        "OnPreART: draw blood",
        start_year,
        OnPreArt3,
        vec![place(STATE, DrawBlood::new(OnPreArt4))],
    )?;

    // Not yet eligible: back to the wait for the next visit.
    let by_cd4 = ArtStagingByCd4::historical(Outcomes::both(OnArtTrigger1, OnPreArtTrigger))?;
    on(
        campaign,
        "OnPreART: eligibility by CD4",
        start_year,
        OnPreArt4,
        vec![place(STATE, by_cd4)],
    )?;

    info!(start_year, "OnPreART added");
    Ok(vec![OnArtTrigger1.into(), HctUptakePostDebutTrigger3.into()])
}

/// Linking of eligible positives to ART.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct LinkingToArtParams {
    pub sigmoid: Sigmoid,
    pub female_multiplier: f64,
}

impl Default for LinkingToArtParams {
    fn default() -> Self {
        Self {
            sigmoid: Sigmoid {
                min: 0.0,
                max: 0.8507,
                mid: 1997.45,
                rate: 1.0,
            },
            female_multiplier: 1.0,
        }
    }
}

pub fn add_linking_to_art(
    campaign: &mut Campaign,
    start_year: f64,
    params: &LinkingToArtParams,
) -> CampaignResult<Exits> {
    linking_to_art(campaign, start_year, params).in_builder("add_linking_to_art")
}

fn linking_to_art(
    campaign: &mut Campaign,
    start_year: f64,
    params: &LinkingToArtParams,
) -> CampaignResult<Exits> {
    use CustomSignal::*;

    params.sigmoid.validate()?;
    let link = SigmoidDiagnostic::new(
        params.sigmoid,
        Outcomes::both(OnArtTrigger1, HctUptakePostDebutTrigger2),
    )
    .with_female_multiplier(params.female_multiplier);
    on(
        campaign,
        "LinkingToART: link",
        start_year,
        LinkingToArtTrigger,
        vec![place(CascadeState::LinkingToArt, link)],
    )?;
    info!(start_year, "LinkingToART added");
    Ok(vec![OnArtTrigger1.into(), HctUptakePostDebutTrigger2.into()])
}

/// Treatment initiation, dropout and restart.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct OnArtParams {
    /// Share starting ART without delay.
    pub immediate_art_rate: f64,
    /// Wait before a delayed start.
    pub initiation_delay: DelayDistribution,
    /// Time on ART before dropping out.
    pub dropout_delay: DelayDistribution,
    /// Share of dropouts willing to re-enroll rather than be lost.
    pub reenrollment_willingness: f64,
    pub immediate_restart_map: ValueMap,
    pub reconsider_lost_forever_map: ValueMap,
}

impl Default for OnArtParams {
    fn default() -> Self {
        Self {
            immediate_art_rate: 0.1,
            initiation_delay: DelayDistribution::weibull(63.381, 0.711),
            dropout_delay: DelayDistribution::exponential(7300.0),
            reenrollment_willingness: 0.9,
            immediate_restart_map: ValueMap::always_negative(),
            reconsider_lost_forever_map: ValueMap::always_negative(),
        }
    }
}

pub fn add_on_art(
    campaign: &mut Campaign,
    start_year: f64,
    params: &OnArtParams,
) -> CampaignResult<Exits> {
    on_art(campaign, start_year, params).in_builder("add_on_art")
}

fn on_art(campaign: &mut Campaign, start_year: f64, params: &OnArtParams) -> CampaignResult<Exits> {
    use CustomSignal::*;
    const STATE: CascadeState = CascadeState::OnArt;

    let initiation = RandomChoice::split(
        OnArtTrigger2,
        params.immediate_art_rate,
        ArtInitiationDelayed,
    )?;
    on(
        campaign,
        "OnART: initiation",
        start_year,
        OnArtTrigger1,
        vec![place(STATE, initiation)],
    )?;

    let delayed = Muxer::new("ARTInitiationDelayed", params.initiation_delay, OnArtTrigger2)?;
    on(
        campaign,
        "OnART: delayed initiation",
        start_year,
        ArtInitiationDelayed,
        vec![place(STATE, delayed)],
    )?;

    let dropout_timer = Muxer::new("OnART", params.dropout_delay, OnArt3)?;
    on(
        campaign,
        "OnART: start treatment",
        start_year,
        OnArtTrigger2,
        vec![
            place(STATE, AntiretroviralTherapy::new()),
            place(STATE, dropout_timer),
        ],
    )?;

    let after_dropout = RandomChoice::split(
        HctUptakePostDebut8,
        params.reenrollment_willingness,
        LostForever9,
    )?;
    on(
        campaign,
        "OnART: dropout",
        start_year,
        OnArt3,
        vec![place(STATE, ArtDropout::new()), place(STATE, after_dropout)],
    )?;

    let restart = PiecewiseDiagnostic::step(
        params.immediate_restart_map.clone(),
        Outcomes::both(OnArtTrigger2, HctUptakePostDebutTrigger2),
    )?;
    on(
        campaign,
        "OnART: immediate restart",
        start_year,
        HctUptakePostDebut8,
        vec![place(STATE, restart)],
    )?;

    let reconsider = PiecewiseDiagnostic::step(
        params.reconsider_lost_forever_map.clone(),
        Outcomes::both(OnArtTrigger2, LostForeverTrigger),
    )?;
    on(
        campaign,
        "OnART: reconsider",
        start_year,
        LostForever9,
        vec![place(STATE, reconsider)],
    )?;

    info!(start_year, "OnART added");
    Ok(vec![HctUptakePostDebutTrigger2.into(), LostForeverTrigger.into()])
}

/// Mark individuals as permanently out of care.
pub fn add_lost_forever(campaign: &mut Campaign, start_year: f64) -> CampaignResult<Exits> {
    on(
        campaign,
        "LostForever: mark",
        start_year,
        CustomSignal::LostForeverTrigger,
        vec![PropertyValueChanger::new(CascadeState::LostForever.property()).into()],
    )
    .in_builder("add_lost_forever")?;
    Ok(Vec::new())
}
