//! Auxiliary subgraphs
//!
//! Builders outside the care pathway: commercial sex work, STI
//! co-infection, male circumcision, infection seeding, PrEP and sexual
//! debut. None of them place individuals in a cascade state.

use coc_campaign::{
    Campaign, CampaignError, CampaignResult, DiseaseState, Intervention, NChooser, NChooserTable,
    ReferenceTracked, ResultExt, Scheduled, Targeting, TargetingLogic, Triggered,
    intervention::{
        ControlledVaccine, DelayedBroadcast, MaleCircumcision, ModifyStiCoInfectionStatus,
        OutbreakIndividual, Outcomes, PiecewiseDiagnostic, PropertyValueChanger, RandomChoice,
        SetSexualDebutAge, StiIsPostDebut, VaccineType, WaningEffect,
    },
};
use coc_foundation::{
    BuiltinSignal, CustomSignal, DAYS_PER_YEAR, DelayDistribution, PropertyPair,
    PropertyRestrictions, Signal, TargetGender, ValueMap,
};
use serde::Deserialize;
use tracing::{debug, info};

/// Intervention name shared by every circumcision, so NChooser and
/// reference tracking never circumcise twice.
pub const ANY_MC: &str = "Any_MC";

/// Intervention name tracked by PrEP coverage.
pub const PREP: &str = "PrEP";

const RISK_KEY: &str = "Risk";

fn risk(value: &str) -> PropertyPair {
    PropertyPair::new(RISK_KEY, value)
}

fn circumcision(reduced_acquire: f64, distributed: Option<Signal>) -> CampaignResult<Intervention> {
    let mut mc = MaleCircumcision::new(reduced_acquire)?;
    mc.distributed_event = distributed;
    Ok(Intervention::from(mc).named(ANY_MC))
}

/// Entry into and exit from commercial sex work.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CswParams {
    pub start_year: f64,
    /// Share of debuting women who become candidates, by year.
    pub female_uptake_map: ValueMap,
    /// Share of debuting men who become candidates, by year.
    pub male_uptake_map: ValueMap,
    /// Wait between candidacy and uptake.
    pub female_uptake_delay: DelayDistribution,
    pub male_uptake_delay: DelayDistribution,
    /// Time in the role before dropping out.
    pub dropout_delay: DelayDistribution,
}

impl Default for CswParams {
    fn default() -> Self {
        Self {
            start_year: 1975.0,
            female_uptake_map: ValueMap::constant(1975.0, 0.05),
            male_uptake_map: ValueMap::constant(1975.0, 0.01),
            female_uptake_delay: DelayDistribution::uniform(0.0, 5.0 * DAYS_PER_YEAR),
            male_uptake_delay: DelayDistribution::uniform(0.0, 10.0 * DAYS_PER_YEAR),
            dropout_delay: DelayDistribution::weibull(5.0 * DAYS_PER_YEAR, 1.2),
        }
    }
}

/// Assign a share of each debuting cohort to commercial sex work.
///
/// Candidates take up the role after a delay (`Risk:HIGH`) and drop out
/// to `Risk:MEDIUM` after another.
pub fn add_csw(campaign: &mut Campaign, params: &CswParams) -> CampaignResult<()> {
    csw(campaign, params).in_builder("add_csw")
}

fn csw(campaign: &mut Campaign, params: &CswParams) -> CampaignResult<()> {
    use CustomSignal::*;
    let start = params.start_year;

    for (gender, map, candidate, delay) in [
        (
            TargetGender::Female,
            &params.female_uptake_map,
            CommercialCandidateFemale,
            params.female_uptake_delay,
        ),
        (
            TargetGender::Male,
            &params.male_uptake_map,
            CommercialCandidateMale,
            params.male_uptake_delay,
        ),
    ] {
        let label = gender.as_str().to_lowercase();
        let gate = PiecewiseDiagnostic::step(map.clone(), Outcomes::positive(candidate))?;
        campaign.add_triggered(
            Triggered::new(
                format!("CSW: {label} candidacy"),
                start,
                vec![BuiltinSignal::StiDebut.into()],
                vec![gate.into()],
            )
            .with_targeting(Targeting::everyone().for_gender(gender)),
        )?;

        let wait = DelayedBroadcast::new(delay, CommercialUptake)?;
        campaign.add_triggered(Triggered::new(
            format!("CSW: {label} uptake delay"),
            start,
            vec![candidate.into()],
            vec![wait.into()],
        ))?;
    }

    let dropout_timer = DelayedBroadcast::new(params.dropout_delay, CommercialDropout)?;
    campaign.add_triggered(Triggered::new(
        "CSW: uptake",
        start,
        vec![CommercialUptake.into()],
        vec![
            PropertyValueChanger::new(risk("HIGH")).into(),
            dropout_timer.into(),
        ],
    ))?;
    campaign.add_triggered(Triggered::new(
        "CSW: dropout",
        start,
        vec![CommercialDropout.into()],
        vec![PropertyValueChanger::new(risk("MEDIUM")).into()],
    ))?;

    info!(start_year = start, "CSW added");
    Ok(())
}

/// Co-infection prevalence within one risk group.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CoinfectionGroup {
    pub restriction: PropertyPair,
    pub probability: f64,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CoinfectionParams {
    pub groups: Vec<CoinfectionGroup>,
}

impl Default for CoinfectionParams {
    fn default() -> Self {
        let group = |value: &str, probability| CoinfectionGroup {
            restriction: risk(value),
            probability,
        };
        Self {
            groups: vec![group("LOW", 0.1), group("MEDIUM", 0.3), group("HIGH", 0.3)],
        }
    }
}

/// Flag STI co-infection at debut, per risk group.
///
/// Individuals already past debut at the start of the run are swept once,
/// a day after the base year, and join through the same listener.
pub fn add_post_debut_coinfection(
    campaign: &mut Campaign,
    params: &CoinfectionParams,
) -> CampaignResult<()> {
    coinfection(campaign, params).in_builder("add_post_debut_coinfection")
}

fn coinfection(campaign: &mut Campaign, params: &CoinfectionParams) -> CampaignResult<()> {
    let base = campaign.base_year();
    let sweep_year = base + 1.0 / DAYS_PER_YEAR;

    for group in &params.groups {
        let restrictions = PropertyRestrictions::within_node([group.restriction.clone()]);
        let seed = StiIsPostDebut::new(Outcomes::positive(CustomSignal::InitialCoinfectionPostDebut));
        campaign.add_scheduled(
            Scheduled::new(
                format!("Coinfection: sweep {}", group.restriction),
                sweep_year,
                vec![seed.into()],
            )
            .with_targeting(Targeting::everyone().restricted_to(restrictions.clone())?),
        )?;

        let targeting = Targeting::everyone()
            .with_coverage(group.probability)?
            .restricted_to(restrictions)?;
        campaign.add_triggered(
            Triggered::new(
                format!("Coinfection: {}", group.restriction),
                base,
                vec![
                    BuiltinSignal::StiDebut.into(),
                    CustomSignal::InitialCoinfectionPostDebut.into(),
                ],
                vec![ModifyStiCoInfectionStatus::new(true).into()],
            )
            .with_targeting(targeting),
        )?;
        debug!(group = %group.restriction, probability = group.probability, "co-infection group");
    }

    info!(groups = params.groups.len(), "post-debut co-infection added");
    Ok(())
}

/// Traditional (non-medical) circumcision chosen at birth.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct TraditionalMcParams {
    /// Year circumcision is first handed out. Must not follow
    /// `randomchoice_start_year`.
    pub male_circumcision_start_year: f64,
    /// Year the historical population and newborns are sorted.
    pub randomchoice_start_year: f64,
    /// Share of men traditionally circumcised.
    pub coverage: f64,
    pub reduced_acquire: f64,
    /// Raised on each circumcision.
    pub distributed_event: Option<Signal>,
}

impl Default for TraditionalMcParams {
    fn default() -> Self {
        Self {
            male_circumcision_start_year: 1960.5,
            randomchoice_start_year: 1961.0,
            coverage: 0.054,
            reduced_acquire: 0.6,
            distributed_event: None,
        }
    }
}

pub fn add_traditional_male_circumcision(
    campaign: &mut Campaign,
    params: &TraditionalMcParams,
) -> CampaignResult<()> {
    traditional_mc(campaign, params).in_builder("add_traditional_male_circumcision")
}

fn traditional_mc(campaign: &mut Campaign, params: &TraditionalMcParams) -> CampaignResult<()> {
    let mc_start = params.male_circumcision_start_year;
    let choice_start = params.randomchoice_start_year;
    if mc_start > choice_start {
        return Err(CampaignError::argument(format!(
            "male circumcision start year {mc_start} is after random choice start year {choice_start}"
        )));
    }

    let choice = || {
        RandomChoice::split(
            CustomSignal::TraditionalMcChosen,
            params.coverage,
            CustomSignal::Dummy,
        )
    };
    let males = Targeting::everyone().for_gender(TargetGender::Male);

    campaign.add_triggered(
        Triggered::new(
            "TraditionalMC: circumcise",
            mc_start,
            vec![CustomSignal::TraditionalMcChosen.into()],
            vec![circumcision(params.reduced_acquire, params.distributed_event)?],
        )
        .with_targeting(males.clone()),
    )?;
    campaign.add_scheduled(
        Scheduled::new("TraditionalMC: choose", choice_start, vec![choice()?.into()])
            .with_targeting(males.clone()),
    )?;
    campaign.add_triggered(
        Triggered::new(
            "TraditionalMC: choose at birth",
            choice_start,
            vec![BuiltinSignal::Births.into()],
            vec![choice()?.into()],
        )
        .with_targeting(males),
    )?;

    info!(mc_start, choice_start, coverage = params.coverage, "traditional MC added");
    Ok(())
}

/// Medical circumcision topped up towards a coverage target.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct VmmcParams {
    pub start_year: f64,
    /// Target share of eligible men circumcised, by year.
    pub coverage_map: ValueMap,
    pub min_age: f64,
    pub max_age: f64,
    pub reduced_acquire: f64,
    /// Days between coverage checks.
    pub update_period: f64,
    pub distributed_event: Option<Signal>,
}

impl Default for VmmcParams {
    fn default() -> Self {
        Self {
            start_year: 2008.0,
            coverage_map: ValueMap::constant(2008.0, 0.0),
            min_age: 15.0,
            max_age: 49.0,
            reduced_acquire: 0.6,
            update_period: DAYS_PER_YEAR,
            distributed_event: None,
        }
    }
}

/// Circumcise HIV-negative men in the age band until coverage meets the map.
pub fn add_vmmc_reference_tracking(
    campaign: &mut Campaign,
    params: &VmmcParams,
) -> CampaignResult<()> {
    vmmc(campaign, params).in_builder("add_vmmc_reference_tracking")
}

fn vmmc(campaign: &mut Campaign, params: &VmmcParams) -> CampaignResult<()> {
    let targeting = Targeting::everyone()
        .for_gender(TargetGender::Male)
        .aged(params.min_age, params.max_age)?;
    let request = ReferenceTracked::new(
        "VMMC: reference tracking",
        params.start_year,
        vec![circumcision(params.reduced_acquire, params.distributed_event)?],
        params.coverage_map.clone(),
        TargetingLogic::IsCircumcised(true),
    )?
    .with_targeting(targeting)
    .with_targeting_logic(TargetingLogic::IsHivPositive(false))
    .with_update_period(params.update_period);
    campaign.add_reference_tracked(request)?;
    info!(start_year = params.start_year, "VMMC reference tracking added");
    Ok(())
}

/// Historical circumcision counts, one row per year and age band.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoricalVmmcParams {
    pub year: Vec<f64>,
    pub min_age: Vec<f64>,
    pub max_age: Vec<f64>,
    /// Circumcisions in each row.
    pub n: Vec<u64>,
    #[serde(default = "default_reduced_acquire")]
    pub reduced_acquire: f64,
    #[serde(default)]
    pub distributed_event: Option<Signal>,
}

fn default_reduced_acquire() -> f64 {
    0.6
}

/// Hand out exact historical counts to uncircumcised HIV-negative men.
pub fn add_historical_vmmc_nchooser(
    campaign: &mut Campaign,
    params: &HistoricalVmmcParams,
) -> CampaignResult<()> {
    historical_vmmc(campaign, params).in_builder("add_historical_vmmc_nchooser")
}

fn historical_vmmc(campaign: &mut Campaign, params: &HistoricalVmmcParams) -> CampaignResult<()> {
    let table =
        NChooserTable::circumcisions(&params.year, &params.min_age, &params.max_age, &params.n)?;
    let first_year = table.first_year();
    let request = NChooser::new(
        "VMMC: historical",
        vec![circumcision(params.reduced_acquire, params.distributed_event)?],
        table,
    )
    .with_disease_state(
        vec![vec![DiseaseState::HivNegative, DiseaseState::NotHaveIntervention]],
        Some(ANY_MC.to_string()),
    );
    campaign.add_nchooser(request)?;
    info!(first_year, rows = params.year.len(), "historical VMMC added");
    Ok(())
}

/// Initial infections.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SeedingParams {
    pub start_year: f64,
    pub coverage: f64,
    pub target_gender: TargetGender,
    /// `[min, max]` in years; everyone when absent.
    pub age_range: Option<(f64, f64)>,
    pub restrictions: PropertyRestrictions,
}

impl Default for SeedingParams {
    fn default() -> Self {
        Self {
            start_year: 1982.0,
            coverage: 0.075,
            target_gender: TargetGender::All,
            age_range: None,
            restrictions: PropertyRestrictions::None,
        }
    }
}

/// Infect a share of the population once, without incubation.
pub fn seed_infections(campaign: &mut Campaign, params: &SeedingParams) -> CampaignResult<()> {
    seeding(campaign, params).in_builder("seed_infections")
}

fn seeding(campaign: &mut Campaign, params: &SeedingParams) -> CampaignResult<()> {
    let mut targeting = Targeting::everyone()
        .with_coverage(params.coverage)?
        .for_gender(params.target_gender);
    if let Some((min, max)) = params.age_range {
        targeting = targeting.aged(min, max)?;
    }
    if !params.restrictions.is_empty() {
        targeting = targeting.restricted_to(params.restrictions.clone())?;
    }
    campaign.add_scheduled(
        Scheduled::new(
            "Seeding: outbreak",
            params.start_year,
            vec![OutbreakIndividual::new(0).into()],
        )
        .with_targeting(targeting),
    )?;
    info!(start_year = params.start_year, coverage = params.coverage, "infections seeded");
    Ok(())
}

/// Pre-exposure prophylaxis topped up towards a coverage target.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PrepParams {
    pub start_year: f64,
    /// Target share of eligible HIV-negative individuals on PrEP, by year.
    pub coverage_map: ValueMap,
    /// Reduction in acquisition while protected.
    pub efficacy: f64,
    /// Days of protection per dose.
    pub duration: f64,
    pub target_gender: TargetGender,
    pub min_age: f64,
    pub max_age: f64,
    pub restrictions: PropertyRestrictions,
}

impl Default for PrepParams {
    fn default() -> Self {
        Self {
            start_year: 2016.0,
            coverage_map: ValueMap::constant(2016.0, 0.0),
            efficacy: 0.9,
            duration: DAYS_PER_YEAR,
            target_gender: TargetGender::All,
            min_age: 15.0,
            max_age: 49.0,
            restrictions: PropertyRestrictions::None,
        }
    }
}

pub fn add_prep(campaign: &mut Campaign, params: &PrepParams) -> CampaignResult<()> {
    prep(campaign, params).in_builder("add_prep")
}

fn prep(campaign: &mut Campaign, params: &PrepParams) -> CampaignResult<()> {
    let waning = WaningEffect::boxed(params.efficacy, params.duration)?;
    let vaccine = ControlledVaccine::new(VaccineType::AcquisitionBlocking, waning)
        .with_revaccination_wait(params.duration);
    let mut targeting = Targeting::everyone()
        .for_gender(params.target_gender)
        .aged(params.min_age, params.max_age)?;
    if !params.restrictions.is_empty() {
        targeting = targeting.restricted_to(params.restrictions.clone())?;
    }
    let request = ReferenceTracked::new(
        "PrEP: reference tracking",
        params.start_year,
        vec![Intervention::from(vaccine).named(PREP)],
        params.coverage_map.clone(),
        TargetingLogic::HasIntervention {
            name: PREP.to_string(),
            is_equal_to: true,
        },
    )?
    .with_targeting(targeting)
    .with_targeting_logic(TargetingLogic::IsHivPositive(false));
    campaign.add_reference_tracked(request)?;
    info!(start_year = params.start_year, "PrEP added");
    Ok(())
}

/// Sexual debut set by intervention at birth.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SexualDebutParams {
    pub start_year: f64,
}

impl Default for SexualDebutParams {
    fn default() -> Self {
        Self { start_year: 1960.5 }
    }
}

/// Hand `SetSexualDebutAge` to every newborn. Switches the engine to take
/// debut ages from interventions.
pub fn add_set_sexual_debut_age(
    campaign: &mut Campaign,
    params: &SexualDebutParams,
) -> CampaignResult<()> {
    campaign
        .add_triggered(Triggered::new(
            "SexualDebut: at birth",
            params.start_year,
            vec![BuiltinSignal::Births.into()],
            vec![SetSexualDebutAge::new().into()],
        ))
        .in_builder("add_set_sexual_debut_age")
}

#[cfg(test)]
mod tests {
    use coc_campaign::{ErrorKind, IssueCode, PropertyCatalog, ValidationOptions};
    use serde_json::json;

    use super::*;
    use crate::states::test_support::{campaign, event, intervention, listener};

    #[test]
    fn test_traditional_mc_order_is_checked() {
        let mut c = campaign();
        let params = TraditionalMcParams {
            male_circumcision_start_year: 1980.0,
            randomchoice_start_year: 1975.0,
            ..TraditionalMcParams::default()
        };
        let err = add_traditional_male_circumcision(&mut c, &params).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Argument);
        let text = err.to_string();
        assert!(text.contains("1980"));
        assert!(text.contains("1975"));
        assert!(c.is_empty());
    }

    #[test]
    fn test_traditional_mc_listens_before_choosing() {
        let mut c = campaign();
        add_traditional_male_circumcision(&mut c, &TraditionalMcParams::default()).unwrap();
        assert_eq!(c.len(), 3);
        assert_eq!(c.events()[0].name, "TraditionalMC: circumcise");
        let choose = intervention(&c, "TraditionalMC: choose");
        assert_eq!(choose["Choice_Names"], json!(["Traditional_MC_Chosen", "dummy"]));
        assert_eq!(choose["Choice_Probabilities"], json!([0.054, 0.946]));
        let at_birth = listener(&c, "TraditionalMC: choose at birth");
        assert_eq!(at_birth["Trigger_Condition_List"], json!(["Births"]));
        assert_eq!(at_birth["Target_Gender"], "Male");
        assert_eq!(intervention(&c, "TraditionalMC: circumcise")["Intervention_Name"], ANY_MC);
        let report = c.validate(&ValidationOptions::default());
        assert!(!report.has_errors(), "{:?}", report.issues());
    }

    #[test]
    fn test_historical_vmmc_nchooser() {
        let mut c = campaign();
        let params = HistoricalVmmcParams {
            year: vec![2010.0, 2010.0, 2011.0, 2011.0],
            min_age: vec![1.0, 15.0, 1.0, 15.0],
            max_age: vec![14.999, 49.999, 14.999, 49.999],
            n: vec![200, 1300, 290, 1490],
            reduced_acquire: 0.6,
            distributed_event: None,
        };
        add_historical_vmmc_nchooser(&mut c, &params).unwrap();
        assert_eq!(c.len(), 1);
        let coord = &c.events()[0].record()["Event_Coordinator_Config"];
        assert_eq!(coord["class"], "NChooserEventCoordinatorHIV");
        assert_eq!(
            coord["Target_Disease_State"],
            json!([["HIV_Negative", "Not_Have_Intervention"]])
        );
        assert_eq!(coord["Target_Disease_State_Has_Intervention_Name"], ANY_MC);
        assert_eq!(coord["Distributions"].as_array().unwrap().len(), 2);
    }

    #[test]
    fn test_historical_vmmc_rejects_ragged_columns() {
        let mut c = campaign();
        let params = HistoricalVmmcParams {
            year: vec![2010.0, 2011.0],
            min_age: vec![15.0],
            max_age: vec![49.999],
            n: vec![1300],
            reduced_acquire: 0.6,
            distributed_event: None,
        };
        let err = add_historical_vmmc_nchooser(&mut c, &params).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Argument);
        assert_eq!(err.builder(), Some("add_historical_vmmc_nchooser"));
    }

    #[test]
    fn test_vmmc_tracks_circumcised_hiv_negative_men() {
        let mut c = campaign();
        let params = VmmcParams {
            coverage_map: ValueMap::new(vec![2008.0, 2016.0], vec![0.0, 0.4]).unwrap(),
            ..VmmcParams::default()
        };
        add_vmmc_reference_tracking(&mut c, &params).unwrap();
        let coord = &c.events()[0].record()["Event_Coordinator_Config"];
        assert_eq!(coord["Tracking_Config"]["class"], "IsCircumcised");
        assert_eq!(coord["Targeting_Config"]["class"], "IsHivPositive");
        assert_eq!(coord["Targeting_Config"]["Is_Equal_To"], false);
        assert_eq!(coord["Target_Gender"], "Male");
        assert_eq!(coord["Target_Age_Min"], 15.0);
        assert_eq!(coord["Intervention_Config"]["Intervention_Name"], ANY_MC);
        assert!(coord["Intervention_Config"].get("Distributed_Event_Trigger").is_none());
    }

    #[test]
    fn test_vmmc_distributed_event_is_produced() {
        let mut c = campaign();
        let params = VmmcParams {
            distributed_event: Some(CustomSignal::Dummy.into()),
            ..VmmcParams::default()
        };
        add_vmmc_reference_tracking(&mut c, &params).unwrap();
        let coord = &c.events()[0].record()["Event_Coordinator_Config"];
        assert_eq!(coord["Intervention_Config"]["Distributed_Event_Trigger"], "dummy");
        let usage = c.signal_report().get(CustomSignal::Dummy.into()).unwrap();
        assert!(usage.is_produced());
    }

    #[test]
    fn test_seeding_without_restrictions() {
        let mut c = campaign();
        seed_infections(&mut c, &SeedingParams::default()).unwrap();
        assert_eq!(c.len(), 1);
        let record = c.events()[0].record();
        assert_eq!(record["Start_Year"], 1982.0);
        let coord = &record["Event_Coordinator_Config"];
        assert_eq!(coord["Demographic_Coverage"], 0.075);
        assert_eq!(coord["Target_Gender"], "All");
        assert_eq!(coord["Intervention_Config"]["class"], "OutbreakIndividual");
        assert_eq!(coord["Intervention_Config"]["Incubation_Period_Override"], 0);
        assert!(coord.get("Property_Restrictions").is_none());
        assert!(coord.get("Property_Restrictions_Within_Node").is_none());
    }

    #[test]
    fn test_seeding_filters() {
        let mut c = campaign();
        let params = SeedingParams {
            target_gender: TargetGender::Female,
            age_range: Some((15.0, 30.0)),
            restrictions: PropertyRestrictions::all_of(&["Risk:HIGH"]).unwrap(),
            ..SeedingParams::default()
        };
        seed_infections(&mut c, &params).unwrap();
        let coord = &c.events()[0].record()["Event_Coordinator_Config"];
        assert_eq!(coord["Target_Demographic"], "ExplicitAgeRangesAndGender");
        assert_eq!(coord["Property_Restrictions"], json!(["Risk:HIGH"]));
    }

    #[test]
    fn test_csw_sets_risk_on_uptake_and_dropout() {
        let mut c = campaign();
        add_csw(&mut c, &CswParams::default()).unwrap();
        assert_eq!(c.len(), 6);
        let female = listener(&c, "CSW: female candidacy");
        assert_eq!(female["Target_Gender"], "Female");
        assert_eq!(
            intervention(&c, "CSW: female candidacy")["Positive_Diagnosis_Event"],
            "Commercial_Candidate_Female"
        );
        let delay = intervention(&c, "CSW: male uptake delay");
        assert_eq!(delay["class"], "HIVDelayedIntervention");
        assert_eq!(delay["Delay_Period_Distribution"], "UNIFORM_DISTRIBUTION");

        let uptake = event(&c, "CSW: uptake");
        assert_eq!(uptake.interventions[0].sets_properties(), vec![risk("HIGH")]);
        let timer = &intervention(&c, "CSW: uptake")["Intervention_List"][1];
        assert_eq!(timer["Delay_Period_Distribution"], "WEIBULL_DISTRIBUTION");
        assert_eq!(timer["Broadcast_Event"], "Commercial_Dropout");
        assert_eq!(intervention(&c, "CSW: dropout")["Target_Property_Value"], "MEDIUM");
        let report = c.validate(&ValidationOptions::default());
        assert!(!report.has_errors(), "{:?}", report.issues());
    }

    struct RiskGroups;

    impl PropertyCatalog for RiskGroups {
        fn declares(&self, pair: &PropertyPair) -> bool {
            pair.key == RISK_KEY && ["LOW", "MEDIUM", "HIGH"].contains(&pair.value.as_str())
        }
    }

    #[test]
    fn test_coinfection_groups() {
        let mut c = campaign();
        add_post_debut_coinfection(&mut c, &CoinfectionParams::default()).unwrap();
        assert_eq!(c.len(), 6);
        let sweep = event(&c, "Coinfection: sweep Risk:LOW");
        assert!((sweep.start_year - (1960.5 + 1.0 / 365.0)).abs() < 1e-9);
        assert_eq!(
            intervention(&c, "Coinfection: sweep Risk:LOW")["class"],
            "STIIsPostDebut"
        );
        let high = listener(&c, "Coinfection: Risk:HIGH");
        assert_eq!(high["Demographic_Coverage"], 0.3);
        assert_eq!(
            high["Trigger_Condition_List"],
            json!(["STIDebut", "Initial_Coinfection_Post_Debut"])
        );
        assert_eq!(
            intervention(&c, "Coinfection: Risk:HIGH")["New_STI_CoInfection_Status"],
            true
        );
        assert_eq!(event(&c, "Coinfection: Risk:HIGH").start_year, 1960.5);
    }

    #[test]
    fn test_csw_with_coinfection_orders_under_declared_risk() {
        let mut c = campaign();
        add_post_debut_coinfection(&mut c, &CoinfectionParams::default()).unwrap();
        add_csw(&mut c, &CswParams::default()).unwrap();
        let catalog = RiskGroups;
        let options = ValidationOptions::default().with_catalog(&catalog);
        let report = c.validate(&options);
        assert_eq!(report.with_code(IssueCode::PropertyOrdering).count(), 0);
        assert!(!report.has_errors(), "{:?}", report.issues());
    }

    #[test]
    fn test_prep_tracks_its_own_name() {
        let mut c = campaign();
        add_prep(&mut c, &PrepParams::default()).unwrap();
        let coord = &c.events()[0].record()["Event_Coordinator_Config"];
        assert_eq!(coord["Tracking_Config"]["class"], "HasIntervention");
        assert_eq!(coord["Tracking_Config"]["Intervention_Name"], PREP);
        let vaccine = &coord["Intervention_Config"];
        assert_eq!(vaccine["class"], "ControlledVaccine");
        assert_eq!(vaccine["Intervention_Name"], PREP);
        assert_eq!(vaccine["Duration_To_Wait_Before_Revaccination"], 365.0);
        assert_eq!(vaccine["Waning_Config"]["Initial_Effect"], 0.9);
    }

    #[test]
    fn test_sexual_debut_registers_effect() {
        let mut c = campaign();
        add_set_sexual_debut_age(&mut c, &SexualDebutParams::default()).unwrap();
        assert_eq!(
            intervention(&c, "SexualDebut: at birth")["class"],
            "SetSexualDebutAge"
        );
        assert!(
            c.config_effects()
                .iter()
                .any(|e| format!("{e:?}").contains("Sexual_Debut_Age_Setting_Type"))
        );
    }

    #[test]
    fn test_params_from_yaml() {
        let seeding: SeedingParams =
            serde_yaml::from_str("coverage: 0.1\ntargetGender: Male\nageRange: [15, 25]\n")
                .unwrap();
        assert_eq!(seeding.coverage, 0.1);
        assert_eq!(seeding.target_gender, TargetGender::Male);
        assert_eq!(seeding.age_range, Some((15.0, 25.0)));
        assert_eq!(seeding.start_year, 1982.0);

        let groups: CoinfectionParams = serde_yaml::from_str(
            "groups:\n  - restriction: \"Risk:HIGH\"\n    probability: 0.5\n",
        )
        .unwrap();
        assert_eq!(groups.groups[0].restriction, risk("HIGH"));
    }
}
