//! Health-care testing: uptake at and after sexual debut, and the
//! periodic retesting loop.

use std::collections::HashSet;

use coc_campaign::{
    Campaign, CampaignError, CampaignResult, NodeSet, ResultExt, Scheduled, Targeting, Triggered,
    intervention::{
        BroadcastEvent, Intervention, Muxer, Outcomes, PiecewiseDiagnostic, RandomChoice,
        RapidHivDiagnostic, SigmoidDiagnostic, StiIsPostDebut,
    },
};
use coc_foundation::{
    BuiltinSignal, CascadeState, CustomSignal, DelayDistribution, PropertyRestrictions, Sigmoid,
    ValueMap,
};
use serde::Deserialize;
use tracing::{debug, info};

use super::{Exits, accessible, on, place};

/// Testing at sexual debut.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct AtDebutParams {
    pub sigmoid: Sigmoid,
    pub female_multiplier: f64,
    pub restrictions: PropertyRestrictions,
}

impl Default for AtDebutParams {
    fn default() -> Self {
        Self {
            sigmoid: Sigmoid {
                min: -0.005,
                max: 0.05,
                mid: 2005.0,
                rate: 1.0,
            },
            female_multiplier: 1.0,
            restrictions: accessible(),
        }
    }
}

/// Test at debut; those not tested wait for post-debut uptake.
pub fn add_hct_uptake_at_debut(
    campaign: &mut Campaign,
    start_year: f64,
    params: &AtDebutParams,
) -> CampaignResult<Exits> {
    at_debut(campaign, start_year, params).in_builder("add_hct_uptake_at_debut")
}

fn at_debut(
    campaign: &mut Campaign,
    start_year: f64,
    params: &AtDebutParams,
) -> CampaignResult<Exits> {
    use CustomSignal::*;

    params.sigmoid.validate()?;
    let uptake = SigmoidDiagnostic::new(
        params.sigmoid,
        Outcomes::both(HctTestingLoopTrigger, HctUptakePostDebutTrigger1),
    )
    .with_female_multiplier(params.female_multiplier);
    campaign.add_triggered(
        Triggered::new(
            "HCTUptakeAtDebut: uptake",
            start_year,
            vec![BuiltinSignal::StiDebut.into()],
            vec![place(CascadeState::HctUptakeAtDebut, uptake)],
        )
        .with_targeting(Targeting::everyone().restricted_to(params.restrictions.clone())?),
    )?;
    info!(start_year, "HCTUptakeAtDebut added");
    Ok(vec![HctTestingLoopTrigger.into(), HctUptakePostDebutTrigger1.into()])
}

/// Uptake of testing among the post-debut population.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PostDebutParams {
    pub sigmoid: Sigmoid,
    pub female_multiplier: f64,
    /// Probability that someone leaving care rejoins post-debut uptake.
    pub reentry_rate: f64,
    /// Mean days between uptake opportunities.
    pub delay_mean: f64,
    /// Probability that someone not taking up testing enters the loop anyway.
    pub enter_testing_loop_map: ValueMap,
    /// Who the initializer reaches.
    pub restrictions: PropertyRestrictions,
}

impl Default for PostDebutParams {
    fn default() -> Self {
        Self {
            sigmoid: Sigmoid {
                min: -0.01,
                max: 0.15,
                mid: 2006.0,
                rate: 1.0,
            },
            female_multiplier: 1.0,
            reentry_rate: 1.0,
            delay_mean: 365.0,
            enter_testing_loop_map: ValueMap::always_negative(),
            restrictions: accessible(),
        }
    }
}

/// Repeated uptake opportunities for everyone past debut.
///
/// Entered through `HCTUptakePostDebutTrigger1`, re-entered from care
/// through `Trigger2`/`Trigger3`, and seeded at `start_year` for the
/// existing population.
pub fn add_hct_uptake_post_debut(
    campaign: &mut Campaign,
    start_year: f64,
    params: &PostDebutParams,
) -> CampaignResult<Exits> {
    post_debut(campaign, start_year, params).in_builder("add_hct_uptake_post_debut")
}

fn post_debut(
    campaign: &mut Campaign,
    start_year: f64,
    params: &PostDebutParams,
) -> CampaignResult<Exits> {
    use CustomSignal::*;
    const STATE: CascadeState = CascadeState::HctUptakePostDebut;

    params.sigmoid.validate()?;

    campaign.add_scheduled(
        Scheduled::new(
            "HCTUptakePostDebut: initialize",
            start_year,
            vec![BroadcastEvent::new(HctUptakePostDebut0).into()],
        )
        .with_targeting(Targeting::everyone().restricted_to(params.restrictions.clone())?),
    )?;

    let reentry: Intervention =
        RandomChoice::split(HctUptakePostDebut0, params.reentry_rate, Dummy)?.into();
    campaign.add_triggered(Triggered::new(
        "HCTUptakePostDebut: re-entry",
        start_year,
        vec![
            HctUptakePostDebutTrigger2.into(),
            HctUptakePostDebutTrigger3.into(),
        ],
        vec![reentry.entering(STATE)],
    ))?;

    on(
        campaign,
        "HCTUptakePostDebut: debut check",
        start_year,
        HctUptakePostDebut0,
        vec![place(
            STATE,
            StiIsPostDebut::new(Outcomes::positive(HctUptakePostDebutTrigger1)),
        )],
    )?;

    // Individuals return here from the testing loop, so the wait refuses
    // only what the loop itself refuses.
    let wait: Intervention = Muxer::new(
        "HCTUptakePostDebut",
        DelayDistribution::exponential(params.delay_mean),
        HctUptakePostDebut2,
    )?
    .into();
    on(
        campaign,
        "HCTUptakePostDebut: wait",
        start_year,
        HctUptakePostDebutTrigger1,
        vec![
            wait.disqualified_by(CascadeState::HctTestingLoop.disqualifying_properties())
                .setting(STATE.property()),
        ],
    )?;

    let uptake = SigmoidDiagnostic::new(
        params.sigmoid,
        Outcomes::both(HctTestingLoopTrigger, HctUptakePostDebut7),
    )
    .with_female_multiplier(params.female_multiplier);
    on(
        campaign,
        "HCTUptakePostDebut: uptake",
        start_year,
        HctUptakePostDebut2,
        vec![place(STATE, uptake)],
    )?;

    let enter = PiecewiseDiagnostic::step(
        params.enter_testing_loop_map.clone(),
        Outcomes::both(HctTestingLoopTrigger, HctUptakePostDebutTrigger1),
    )?;
    on(
        campaign,
        "HCTUptakePostDebut: enter testing loop",
        start_year,
        HctUptakePostDebut7,
        vec![place(STATE, enter)],
    )?;

    info!(start_year, "HCTUptakePostDebut added");
    Ok(vec![HctTestingLoopTrigger.into()])
}

/// Days to the next test: one value for every node, or one per region.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum TestDelays {
    Single(f64),
    PerRegion(Vec<f64>),
}

impl Default for TestDelays {
    fn default() -> Self {
        TestDelays::Single(365.0)
    }
}

impl TestDelays {
    pub fn to_vec(&self) -> Vec<f64> {
        match self {
            TestDelays::Single(delay) => vec![*delay],
            TestDelays::PerRegion(delays) => delays.clone(),
        }
    }
}

/// Periodic retesting.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct TestingLoopParams {
    pub delay_to_next_test: TestDelays,
    /// Node ids of each region, parallel to `delay_to_next_test`.
    pub delay_to_next_test_node_ids: Option<Vec<Vec<u32>>>,
    pub retention_rate: f64,
    /// Probability a positive starts ART without staging.
    pub immediate_art_map: ValueMap,
}

impl Default for TestingLoopParams {
    fn default() -> Self {
        Self {
            delay_to_next_test: TestDelays::default(),
            delay_to_next_test_node_ids: None,
            retention_rate: 0.95,
            immediate_art_map: ValueMap::always_negative(),
        }
    }
}

impl TestingLoopParams {
    /// Pair each delay with its nodes. Regions must not overlap.
    pub fn partitions(&self) -> CampaignResult<Vec<(f64, NodeSet)>> {
        let delays = self.delay_to_next_test.to_vec();
        let Some(regions) = &self.delay_to_next_test_node_ids else {
            return match delays.as_slice() {
                [delay] => Ok(vec![(*delay, NodeSet::All)]),
                _ => Err(CampaignError::argument(format!(
                    "{} test delays given without node ids",
                    delays.len()
                ))),
            };
        };
        if regions.len() != delays.len() {
            return Err(CampaignError::argument(format!(
                "{} test delays but {} node id lists",
                delays.len(),
                regions.len()
            )));
        }
        let mut seen = HashSet::new();
        for region in regions {
            if region.is_empty() {
                return Err(CampaignError::argument("empty node id list"));
            }
            for id in region {
                if !seen.insert(*id) {
                    return Err(CampaignError::argument(format!(
                        "node {id} appears in more than one region"
                    )));
                }
            }
        }
        Ok(delays
            .into_iter()
            .zip(regions.iter().map(|r| NodeSet::nodes(r.iter().copied())))
            .collect())
    }
}

/// Retest at a regional interval until positive or lost to the loop.
pub fn add_hct_testing_loop(
    campaign: &mut Campaign,
    start_year: f64,
    params: &TestingLoopParams,
) -> CampaignResult<Exits> {
    testing_loop(campaign, start_year, params).in_builder("add_hct_testing_loop")
}

fn testing_loop(
    campaign: &mut Campaign,
    start_year: f64,
    params: &TestingLoopParams,
) -> CampaignResult<Exits> {
    use CustomSignal::*;
    const STATE: CascadeState = CascadeState::HctTestingLoop;

    let partitions = params.partitions()?;
    let regional = partitions.len() > 1;
    for (index, (delay, nodes)) in partitions.into_iter().enumerate() {
        let name = if regional {
            format!("HCTTestingLoop: wait, region {}", index + 1)
        } else {
            "HCTTestingLoop: wait".to_string()
        };
        debug!(event = %name, delay, "testing loop region");
        let wait = Muxer::new(
            "HCTTestingLoop",
            DelayDistribution::exponential(delay),
            HctTestingLoop1,
        )?;
        campaign.add_triggered(
            Triggered::new(
                name,
                start_year,
                vec![HctTestingLoopTrigger.into()],
                vec![place(STATE, wait)],
            )
            .on_nodes(nodes),
        )?;
    }

    on(
        campaign,
        "HCTTestingLoop: test",
        start_year,
        HctTestingLoop1,
        vec![place(
            STATE,
            RapidHivDiagnostic::new(Outcomes::both(ArtStaging9, HctTestingLoop2)),
        )],
    )?;

    let retention = RandomChoice::split(
        HctTestingLoopTrigger,
        params.retention_rate,
        HctUptakePostDebutTrigger1,
    )?;
    on(
        campaign,
        "HCTTestingLoop: retention",
        start_year,
        HctTestingLoop2,
        vec![place(STATE, retention)],
    )?;

    let immediate = PiecewiseDiagnostic::step(
        params.immediate_art_map.clone(),
        Outcomes::both(OnArtTrigger2, ArtStagingTrigger1),
    )?;
    on(
        campaign,
        "HCTTestingLoop: consider immediate ART",
        start_year,
        ArtStaging9,
        vec![place(STATE, immediate)],
    )?;

    info!(start_year, "HCTTestingLoop added");
    Ok(vec![
        OnArtTrigger2.into(),
        ArtStagingTrigger1.into(),
        HctUptakePostDebutTrigger1.into(),
    ])
}
