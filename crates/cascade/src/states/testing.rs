//! Testing entry points: antenatal care, six-week infant testing,
//! symptomatic presentation and the staging diagnostic test.

use coc_campaign::{
    Campaign, CampaignResult, ResultExt, Targeting, Triggered,
    intervention::{
        Outcomes, PiecewiseDiagnostic, Pmtct, RandomChoice, RapidHivDiagnostic,
        SigmoidDiagnostic,
    },
};
use coc_foundation::{
    BuiltinSignal, CascadeState, CustomSignal, PropertyRestrictions, Sigmoid, TargetGender,
    ValueMap, ValueResult,
};
use serde::Deserialize;
use tracing::info;

use super::{Exits, accessible, on, place};

/// Antenatal-care testing and PMTCT.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct AncParams {
    /// Probability a pregnant woman is tested at her ANC visit.
    pub sigmoid: Sigmoid,
    pub link_to_art_rate: f64,
    pub sd_nvp_efficacy: f64,
    pub treatment_a_efficacy: f64,
    pub treatment_b_efficacy: f64,
    /// Share of PMTCT given as single-dose nevirapine rather than a
    /// combination regimen.
    pub sd_nvp_sigmoid: Sigmoid,
    /// Share of combination PMTCT given as Option B.
    pub option_b_map: ValueMap,
    pub restrictions: PropertyRestrictions,
}

impl Default for AncParams {
    fn default() -> Self {
        Self {
            sigmoid: Sigmoid {
                min: 0.0,
                max: 0.975,
                mid: 2005.87,
                rate: 0.7136,
            },
            link_to_art_rate: 0.8,
            sd_nvp_efficacy: 0.66,
            treatment_a_efficacy: 0.9,
            treatment_b_efficacy: 0.96667,
            sd_nvp_sigmoid: Sigmoid {
                min: 0.0,
                max: 1.0,
                mid: 2008.4,
                rate: -1.0,
            },
            option_b_map: ValueMap::constant(2013.249, 1.0),
            restrictions: accessible(),
        }
    }
}

/// Test pregnant women at twelve weeks and start PMTCT for positives.
pub fn add_testing_on_anc(
    campaign: &mut Campaign,
    start_year: f64,
    params: &AncParams,
) -> CampaignResult<Exits> {
    anc(campaign, start_year, params).in_builder("add_testing_on_anc")
}

fn anc(campaign: &mut Campaign, start_year: f64, params: &AncParams) -> CampaignResult<Exits> {
    use CustomSignal::*;
    const STATE: CascadeState = CascadeState::TestingOnAnc;

    params.sigmoid.validate()?;
    params.sd_nvp_sigmoid.validate()?;

    let uptake = SigmoidDiagnostic::new(params.sigmoid, Outcomes::positive(NeedsPmtctDiagnosticTest));
    campaign.add_triggered(
        Triggered::new(
            "TestingOnANC: uptake",
            start_year,
            vec![BuiltinSignal::TwelveWeeksPregnant.into()],
            vec![place(STATE, uptake)],
        )
        .with_targeting(
            Targeting::everyone()
                .for_gender(TargetGender::Female)
                .restricted_to(params.restrictions.clone())?,
        ),
    )?;

    on(
        campaign,
        "TestingOnANC: test",
        start_year,
        NeedsPmtctDiagnosticTest,
        vec![place(STATE, RapidHivDiagnostic::new(Outcomes::positive(HivPositiveAtAnc)))],
    )?;

    // ANC positives enter staging here and may also reach it through
    // symptomatic presentation later on.
    let link = RandomChoice::split(ArtStagingTrigger1, params.link_to_art_rate, Dummy)?;
    on(
        campaign,
        "TestingOnANC: link to ART",
        start_year,
        HivPositiveAtAnc,
        vec![place(STATE, link)],
    )?;

    let regimen = SigmoidDiagnostic::new(
        params.sd_nvp_sigmoid,
        Outcomes::both(NeedsSdNvpPmtct, NeedsCombinationPmtct),
    );
    on(
        campaign,
        "TestingOnANC: PMTCT regimen",
        start_year,
        HivPositiveAtAnc,
        vec![place(STATE, regimen)],
    )?;

    on(
        campaign,
        "TestingOnANC: sdNVP",
        start_year,
        NeedsSdNvpPmtct,
        vec![place(STATE, Pmtct::new(params.sd_nvp_efficacy)?)],
    )?;

    let combination = PiecewiseDiagnostic::step(
        params.option_b_map.clone(),
        Outcomes::both(NeedsOptionBPmtct, NeedsOptionAPmtct),
    )?;
    on(
        campaign,
        "TestingOnANC: combination regimen",
        start_year,
        NeedsCombinationPmtct,
        vec![place(STATE, combination)],
    )?;

    on(
        campaign,
        "TestingOnANC: option A",
        start_year,
        NeedsOptionAPmtct,
        vec![place(STATE, Pmtct::new(params.treatment_a_efficacy)?)],
    )?;
    on(
        campaign,
        "TestingOnANC: option B",
        start_year,
        NeedsOptionBPmtct,
        vec![place(STATE, Pmtct::new(params.treatment_b_efficacy)?)],
    )?;

    info!(start_year, "TestingOnANC added");
    Ok(vec![ArtStagingTrigger1.into()])
}

/// Share of six-week-old infants tested, by year.
pub fn default_child_testing_map() -> ValueResult<ValueMap> {
    ValueMap::from_pairs(&[
        (2004.0, 0.0),
        (2005.0, 0.03),
        (2006.0, 0.1),
        (2008.0, 0.2),
        (2009.0, 0.3365),
    ])
}

/// Test infants at six weeks; positives go to the staging diagnostic.
pub fn add_testing_on_child_6w(
    campaign: &mut Campaign,
    start_year: f64,
    map: &ValueMap,
) -> CampaignResult<Exits> {
    child_6w(campaign, start_year, map).in_builder("add_testing_on_child_6w")
}

fn child_6w(campaign: &mut Campaign, start_year: f64, map: &ValueMap) -> CampaignResult<Exits> {
    let test = PiecewiseDiagnostic::linear(
        map.clone(),
        Outcomes::positive(CustomSignal::ArtStagingDiagnosticTrigger),
    )?;
    on(
        campaign,
        "TestingOnChild6w: test",
        start_year,
        BuiltinSignal::SixWeeksOld,
        vec![place(CascadeState::TestingOnChild6w, test)],
    )?;
    info!(start_year, "TestingOnChild6w added");
    Ok(vec![CustomSignal::ArtStagingDiagnosticTrigger.into()])
}

/// Presentation at a clinic on becoming symptomatic.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SymptomaticParams {
    pub sigmoid: Sigmoid,
    pub female_multiplier: f64,
    /// Probability that someone who did not present is staged anyway.
    pub increased_presentation_map: ValueMap,
}

impl Default for SymptomaticParams {
    fn default() -> Self {
        Self {
            sigmoid: Sigmoid {
                min: 0.25,
                max: 0.9,
                mid: 2002.0,
                rate: 0.5,
            },
            female_multiplier: 1.0,
            increased_presentation_map: ValueMap::always_negative(),
        }
    }
}

pub fn add_testing_on_symptomatic(
    campaign: &mut Campaign,
    start_year: f64,
    params: &SymptomaticParams,
) -> CampaignResult<Exits> {
    symptomatic(campaign, start_year, params).in_builder("add_testing_on_symptomatic")
}

fn symptomatic(
    campaign: &mut Campaign,
    start_year: f64,
    params: &SymptomaticParams,
) -> CampaignResult<Exits> {
    use CustomSignal::*;
    const STATE: CascadeState = CascadeState::TestingOnSymptomatic;

    params.sigmoid.validate()?;
    let presentation = SigmoidDiagnostic::new(
        params.sigmoid,
        Outcomes::both(ArtStagingDiagnosticTrigger, ArtStaging8),
    )
    .with_female_multiplier(params.female_multiplier);
    on(
        campaign,
        "TestingOnSymptomatic: presentation",
        start_year,
        BuiltinSignal::NewlySymptomatic,
        vec![place(STATE, presentation)],
    )?;

    let increased = PiecewiseDiagnostic::step(
        params.increased_presentation_map.clone(),
        Outcomes::positive(ArtStagingTrigger2),
    )?;
    on(
        campaign,
        "TestingOnSymptomatic: increased presentation",
        start_year,
        ArtStaging8,
        vec![place(STATE, increased)],
    )?;

    info!(start_year, "TestingOnSymptomatic added");
    Ok(vec![ArtStagingDiagnosticTrigger.into(), ArtStagingTrigger2.into()])
}

/// Rapid test before staging; positives are staged.
pub fn add_art_staging_diagnostic_test(
    campaign: &mut Campaign,
    start_year: f64,
) -> CampaignResult<Exits> {
    on(
        campaign,
        "ARTStagingDiagnosticTest: test",
        start_year,
        CustomSignal::ArtStagingDiagnosticTrigger,
        vec![place(
            CascadeState::ArtStagingDiagnosticTest,
            RapidHivDiagnostic::new(Outcomes::positive(CustomSignal::ArtStagingTrigger1)),
        )],
    )
    .in_builder("add_art_staging_diagnostic_test")?;
    Ok(vec![CustomSignal::ArtStagingTrigger1.into()])
}
