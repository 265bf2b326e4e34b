//! Whole-campaign properties checked over a policy that enables every
//! section.

use coc_campaign::{InterventionConfig, SignalGraph};
use coc_cascade::states::{TestDelays, TestingLoopParams};
use coc_cascade::{
    ArtCascadeParams, CoinfectionParams, CswParams, HealthCareTestingParams, HistoricalVmmcParams,
    PrepParams, SeedingParams, SexualDebutParams, TraditionalMcParams, VmmcParams,
    add_art_cascade, add_health_care_testing,
};
use coc_compiler::Policy;
use coc_foundation::{ALWAYS_NEGATIVE_TIMES, PROBABILITY_DIGITS, complement};
use coc_tests::CampaignHarness;
use serde_json::{Value, json};

fn everything() -> Policy {
    Policy::new("everything")
        .with_sexual_debut(SexualDebutParams::default())
        .with_seeding(SeedingParams::default())
        .with_traditional_male_circumcision(TraditionalMcParams::default())
        .with_coinfection(CoinfectionParams::default())
        .with_csw(CswParams::default())
        .with_full_cascade()
        .with_vmmc(VmmcParams::default())
        .with_historical_vmmc(HistoricalVmmcParams {
            year: vec![2010.0, 2011.0],
            min_age: vec![15.0, 15.0],
            max_age: vec![49.999, 49.999],
            n: vec![1300, 1490],
            reduced_acquire: 0.6,
            distributed_event: None,
        })
        .with_prep(PrepParams::default())
}

#[test]
fn test_everything_validates() {
    let harness = CampaignHarness::from_policy(&everything());
    harness.assert_valid();
}

#[test]
fn test_random_choice_probabilities_sum_to_one() {
    let harness = CampaignHarness::from_policy(&everything());
    let mut checked = 0;
    for object in harness.objects() {
        let Some(probabilities) = object.get("Choice_Probabilities").and_then(Value::as_array)
        else {
            continue;
        };
        let values: Vec<f64> = probabilities.iter().filter_map(Value::as_f64).collect();
        let sum: f64 = values.iter().sum();
        assert!((sum - 1.0).abs() < 1e-7, "{values:?} sums to {sum}");
        if let [first, second] = values[..] {
            assert_eq!(second, complement(first));
        }
        checked += 1;
    }
    assert!(checked > 0);
}

#[test]
fn test_value_maps_are_well_formed() {
    let harness = CampaignHarness::from_policy(&everything());
    let mut checked = 0;
    for object in harness.objects() {
        let (Some(times), Some(values)) = (
            object.get("Times").and_then(Value::as_array),
            object.get("Values").and_then(Value::as_array),
        ) else {
            continue;
        };
        assert_eq!(times.len(), values.len());
        let times: Vec<f64> = times.iter().filter_map(Value::as_f64).collect();
        assert!(times.windows(2).all(|w| w[0] <= w[1]), "{times:?}");
        checked += 1;
    }
    assert!(checked > 0);
}

#[test]
fn test_state_gates_refuse_entry_disqualifiers() {
    let harness = CampaignHarness::from_policy(&everything());
    for event in harness.campaign().events() {
        for intervention in &event.interventions {
            let Some(state) = intervention.cascade_state() else {
                continue;
            };
            let disqualifying = &intervention.common().disqualifying;
            for required in state.entry_disqualifying_properties() {
                assert!(
                    disqualifying.contains(&required),
                    "'{}' entering {state} does not refuse {required}",
                    event.name
                );
            }
        }
    }
}

#[test]
fn test_every_consumed_signal_is_produced() {
    let harness = CampaignHarness::from_policy(&everything());
    let ledger = harness.campaign().signal_report();
    assert!(ledger.unproduced().is_empty());
    for event in harness.campaign().events() {
        for trigger in &event.triggers {
            let produced = ledger.get(*trigger).is_some_and(|u| u.is_produced());
            assert!(
                trigger.is_builtin() || produced,
                "'{}' listens for unproduced {trigger}",
                event.name
            );
        }
    }
}

#[test]
fn test_retention_loops_are_back_edges() {
    let mut harness = CampaignHarness::new();
    add_health_care_testing(harness.campaign_mut(), &HealthCareTestingParams::default()).unwrap();
    add_art_cascade(harness.campaign_mut(), &ArtCascadeParams::default()).unwrap();
    let graph = SignalGraph::build(harness.campaign());
    assert!(graph.loop_backs().next().is_some());
}

#[test]
fn test_reserialized_artifact_is_unchanged() {
    let harness = CampaignHarness::from_policy(&everything());
    let parsed: Value = serde_json::from_str(&harness.json_string()).unwrap();
    assert_eq!(parsed, harness.campaign().to_json());
}

#[test]
fn test_identical_builds_are_byte_identical() {
    let first = CampaignHarness::from_policy(&everything());
    let second = CampaignHarness::from_policy(&everything());
    assert_eq!(first.json_string(), second.json_string());
}

#[test]
fn test_complement_keeps_seven_digits() {
    let mut harness = CampaignHarness::new();
    let params = ArtCascadeParams::default().with_pre_staging_retention(0.1);
    add_art_cascade(harness.campaign_mut(), &params).unwrap();
    let retention = harness.intervention("ARTStaging: pre-staging retention");
    assert_eq!(retention["Choice_Probabilities"], json!([0.1, 0.9]));
    assert_eq!(PROBABILITY_DIGITS, 7);
}

#[test]
fn test_always_negative_maps_never_raise_positive() {
    let mut harness = CampaignHarness::new();
    add_art_cascade(harness.campaign_mut(), &ArtCascadeParams::default()).unwrap();
    for name in ["OnART: immediate restart", "OnART: reconsider"] {
        let record = harness.intervention(name);
        assert_eq!(record["Time_Value_Map"]["Times"], json!(ALWAYS_NEGATIVE_TIMES));
        assert_eq!(record["Time_Value_Map"]["Values"], json!([0.0, 0.0]));

        let positive = record["Positive_Diagnosis_Event"].as_str().unwrap();
        let live = harness.event(name).interventions[0].live_outputs();
        assert!(live.iter().all(|s| s.as_str() != positive), "{name}");
    }
}

#[test]
fn test_single_delay_matches_single_node_list() {
    let strip_nodes = |harness: &CampaignHarness| -> Vec<Value> {
        harness
            .campaign()
            .events()
            .iter()
            .map(|e| {
                let mut record = e.record().clone();
                if let Some(map) = record.as_object_mut() {
                    map.remove("Nodeset_Config");
                }
                record
            })
            .collect()
    };

    let mut single = CampaignHarness::new();
    add_health_care_testing(single.campaign_mut(), &HealthCareTestingParams::default()).unwrap();

    let mut listed = CampaignHarness::new();
    let params = HealthCareTestingParams {
        testing_loop: TestingLoopParams {
            delay_to_next_test: TestDelays::PerRegion(vec![365.0]),
            delay_to_next_test_node_ids: Some(vec![(1..=10).collect()]),
            ..TestingLoopParams::default()
        },
        ..HealthCareTestingParams::default()
    };
    add_health_care_testing(listed.campaign_mut(), &params).unwrap();

    assert_eq!(strip_nodes(&single), strip_nodes(&listed));
}

#[test]
fn test_finalize_registers_every_custom_signal() {
    let harness = CampaignHarness::from_policy(&everything());
    let mut config = json!({});
    let document = harness.finalize(&mut config);

    assert_eq!(
        document["Events"].as_array().unwrap().len(),
        harness.campaign().len()
    );
    let registered = config["Custom_Individual_Events"].as_array().unwrap();
    for signal in harness.campaign().signal_report().custom_signals() {
        assert!(registered.contains(&json!(signal.as_str())), "{signal}");
    }
    assert_eq!(config["Sexual_Debut_Age_Setting_Type"], "FROM_INTERVENTION");
    assert_eq!(config["Enable_Maternal_Infection_Transmission"], 1);
}
