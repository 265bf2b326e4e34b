//! End-to-end scenarios: literal builder inputs and the records they must
//! produce.

use coc_campaign::ErrorKind;
use coc_cascade::states::{TestDelays, TestingLoopParams};
use coc_cascade::{
    ANY_MC, ArtCascadeParams, HealthCareTestingParams, HistoricalVmmcParams, PmtctParams,
    SeedingParams, TraditionalMcParams, add_art_cascade, add_health_care_testing,
    add_historical_vmmc_nchooser, add_pmtct, add_traditional_male_circumcision, seed_infections,
};
use coc_foundation::{TargetGender, ValueMap};
use coc_tests::CampaignHarness;
use serde_json::json;

/// PMTCT pipeline with a 2004-2009 infant testing ramp: the ANC uptake
/// event targets accessible women with the calibrated sigmoid.
#[test]
fn test_pmtct_anc_visit() {
    let mut harness = CampaignHarness::new();
    let params = PmtctParams {
        start_year: 1990.0,
        child_testing_map: Some(ValueMap::new(vec![2004.0, 2009.0], vec![0.0, 0.3]).unwrap()),
        ..PmtctParams::default()
    };
    add_pmtct(harness.campaign_mut(), &params).unwrap();

    let uptake = harness.event("TestingOnANC: uptake");
    assert!(uptake.start_year >= 1990.0);
    let listener = harness.listener("TestingOnANC: uptake");
    assert_eq!(listener["Target_Gender"], "Female");
    assert_eq!(
        listener["Property_Restrictions_Within_Node"],
        json!([{ "Accessibility": "Yes" }])
    );

    let diagnostic = harness.intervention("TestingOnANC: uptake");
    assert_eq!(diagnostic["class"], "HIVSigmoidByYearAndSexDiagnostic");
    assert_eq!(diagnostic["Ramp_MidYear"], 2005.87);
    assert_eq!(diagnostic["Ramp_Rate"], 0.7136);
    assert_eq!(diagnostic["Ramp_Max"], 0.975);

    let child = harness.intervention("TestingOnChild6w: test");
    assert_eq!(
        child["Time_Value_Map"],
        json!({ "Times": [2004.0, 2009.0], "Values": [0.0, 0.3] })
    );
    assert!(
        harness
            .campaign()
            .events()
            .iter()
            .all(|e| e.start_year >= 1990.0)
    );
}

/// ART cascade retention: the second probability is the rounded complement.
#[test]
fn test_art_cascade_retention() {
    let mut harness = CampaignHarness::new();
    let params = ArtCascadeParams::default().with_pre_staging_retention(0.85);
    add_art_cascade(harness.campaign_mut(), &params).unwrap();

    let retention = harness.intervention("ARTStaging: pre-staging retention");
    assert_eq!(retention["class"], "HIVRandomChoice");
    assert_eq!(retention["Choice_Probabilities"], json!([0.85, 0.15]));
    harness.assert_valid();
}

/// HCT regional delays: one waiting event per region, the regions
/// partitioning nodes 1 to 10, each with its own exponential mean.
#[test]
fn test_hct_regional_delays() {
    let mut harness = CampaignHarness::new();
    let params = HealthCareTestingParams {
        testing_loop: TestingLoopParams {
            delay_to_next_test: TestDelays::PerRegion(vec![730.0, 365.0, 1100.0]),
            delay_to_next_test_node_ids: Some(vec![
                vec![1, 2, 3, 4, 6, 7],
                vec![5, 9, 10],
                vec![8],
            ]),
            ..TestingLoopParams::default()
        },
        ..HealthCareTestingParams::default()
    };
    add_health_care_testing(harness.campaign_mut(), &params).unwrap();

    let waits = harness.events_named("HCTTestingLoop: wait");
    assert_eq!(waits.len(), 3);

    let mut nodes = Vec::new();
    let mut means = Vec::new();
    for wait in waits {
        let record = wait.record();
        for id in record["Nodeset_Config"]["Node_List"].as_array().unwrap() {
            nodes.push(id.as_u64().unwrap());
        }
        let muxer = &record["Event_Coordinator_Config"]["Intervention_Config"]
            ["Actual_IndividualIntervention_Config"];
        assert_eq!(muxer["Delay_Period_Distribution"], "EXPONENTIAL_DISTRIBUTION");
        means.push(muxer["Delay_Period_Exponential"].as_f64().unwrap());
    }
    let total = nodes.len();
    nodes.sort_unstable();
    nodes.dedup();
    assert_eq!(total, nodes.len(), "regions overlap");
    assert_eq!(nodes, (1..=10).collect::<Vec<u64>>());
    assert_eq!(means, vec![730.0, 365.0, 1100.0]);
}

/// Traditional circumcision cannot start after the random choice.
#[test]
fn test_traditional_mc_ordering_violation() {
    let mut harness = CampaignHarness::new();
    let params = TraditionalMcParams {
        male_circumcision_start_year: 1980.0,
        randomchoice_start_year: 1975.0,
        ..TraditionalMcParams::default()
    };
    let err = add_traditional_male_circumcision(harness.campaign_mut(), &params).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Argument);
    let message = err.to_string();
    assert!(message.contains("1980"), "{message}");
    assert!(message.contains("1975"), "{message}");
    assert!(harness.campaign().is_empty());
}

/// Historical VMMC counts become one NChooser event excluding anyone
/// already circumcised.
#[test]
fn test_nchooser_vmmc_distribution() {
    let mut harness = CampaignHarness::new();
    let params = HistoricalVmmcParams {
        year: vec![2010.0, 2010.0, 2011.0, 2011.0],
        min_age: vec![1.0, 15.0, 1.0, 15.0],
        max_age: vec![14.999, 49.999, 14.999, 49.999],
        n: vec![200, 1300, 290, 1490],
        reduced_acquire: 0.6,
        distributed_event: None,
    };
    add_historical_vmmc_nchooser(harness.campaign_mut(), &params).unwrap();

    assert_eq!(harness.campaign().len(), 1);
    let coordinator = &harness.campaign().events()[0].record()["Event_Coordinator_Config"];
    assert_eq!(coordinator["class"], "NChooserEventCoordinatorHIV");
    assert_eq!(
        coordinator["Target_Disease_State"],
        json!([["HIV_Negative", "Not_Have_Intervention"]])
    );
    assert_eq!(coordinator["Target_Disease_State_Has_Intervention_Name"], ANY_MC);
    harness.assert_valid();
}

/// Seeding without restrictions emits one unrestricted outbreak.
#[test]
fn test_seed_infection_gating() {
    let mut harness = CampaignHarness::new();
    let params = SeedingParams {
        start_year: 1982.0,
        coverage: 0.075,
        target_gender: TargetGender::All,
        ..SeedingParams::default()
    };
    seed_infections(harness.campaign_mut(), &params).unwrap();

    assert_eq!(harness.campaign().len(), 1);
    let coordinator = &harness.campaign().events()[0].record()["Event_Coordinator_Config"];
    assert_eq!(coordinator["Demographic_Coverage"], 0.075);
    let outbreak = &coordinator["Intervention_Config"];
    assert_eq!(outbreak["class"], "OutbreakIndividual");
    assert_eq!(outbreak["Incubation_Period_Override"], 0);
    assert!(coordinator.get("Property_Restrictions").is_none());
    assert!(coordinator.get("Property_Restrictions_Within_Node").is_none());
}
