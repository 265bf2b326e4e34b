//! Policies compiled from fixture files through to the written artifact.

use coc_compiler::{Demographics, Policy, compile, load_policies};
use coc_tests::{fixtures_dir, schema};
use serde_json::Value;

fn fixture_config() -> Value {
    let content = std::fs::read_to_string(fixtures_dir().join("config.json")).unwrap();
    serde_json::from_str(&content).unwrap()
}

fn fixture_demographics() -> Demographics {
    Demographics::load(fixtures_dir().join("demographics.json")).unwrap()
}

#[test]
fn test_fixture_policies_load() {
    let policies = load_policies(fixtures_dir());
    assert_eq!(
        policies.keys().map(String::as_str).collect::<Vec<_>>(),
        vec!["baseline", "daily"]
    );
    assert!(policies["baseline"].strict);
}

#[test]
fn test_baseline_compiles_and_writes() {
    let policy = Policy::load(fixtures_dir().join("policies/baseline.yaml")).unwrap();
    let mut config = fixture_config();
    let result = compile(&policy, schema(), &fixture_demographics(), &mut config);
    assert!(!result.has_errors(), "{}", result.format_diagnostics());

    let campaign_events = result.campaign.as_ref().unwrap().len();
    let artifact = result.success().unwrap();

    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("campaign.json");
    artifact.write(&out).unwrap();

    let written: Value = serde_json::from_str(&std::fs::read_to_string(&out).unwrap()).unwrap();
    let events = written["Events"].as_array().unwrap();
    assert_eq!(events.len(), campaign_events);
    assert!(events.iter().all(|e| e["class"] == "CampaignEventByYear"));

    let parameters = &config["parameters"];
    assert_eq!(parameters["Simulation_Duration"], 20000);
    let registered = parameters["Custom_Individual_Events"].as_array().unwrap();
    assert_eq!(registered[0], "Existing_Event");
    assert!(registered.len() > 1);
    assert_eq!(parameters["Sexual_Debut_Age_Setting_Type"], "FROM_INTERVENTION");
}

#[test]
fn test_day_axis_policy_uses_start_days() {
    let policy = Policy::load(fixtures_dir().join("policies/daily.yaml")).unwrap();
    let mut config = fixture_config();
    let result = compile(&policy, schema(), &fixture_demographics(), &mut config);
    let artifact = match result.success() {
        Ok(artifact) => artifact,
        Err(diagnostics) => panic!("{diagnostics:#?}"),
    };

    for event in artifact.document()["Events"].as_array().unwrap() {
        assert_eq!(event["class"], "CampaignEvent");
        assert!(event.get("Start_Year").is_none());
        assert!(event["Start_Day"].as_f64().unwrap() >= 0.0);
    }
}

#[test]
fn test_failed_compile_writes_nothing() {
    let yaml = r#"
metadata:
  name: broken
healthCareTesting: {}
"#;
    let policy = Policy::from_yaml(yaml).unwrap();
    let mut config = fixture_config();
    let result = compile(&policy, schema(), &fixture_demographics(), &mut config);

    assert!(result.has_errors());
    assert!(result.artifact.is_none());
    assert_eq!(config, fixture_config());
}

#[test]
fn test_undeclared_property_is_strict_error() {
    let yaml = r#"
metadata:
  name: urban-seeding
strict: true
seeding:
  restrictions: ["Place:Urban"]
"#;
    let policy = Policy::from_yaml(yaml).unwrap();
    let mut config = fixture_config();
    let result = compile(&policy, schema(), &fixture_demographics(), &mut config);

    assert!(result.has_errors());
    let diagnostic = result
        .diagnostics
        .iter()
        .find(|d| d.message.contains("Place:Urban"))
        .unwrap();
    assert_eq!(diagnostic.event.as_deref(), Some("Seeding: outbreak"));

    let lenient = Policy {
        strict: false,
        ..policy
    };
    let result = compile(&lenient, schema(), &fixture_demographics(), &mut config);
    assert!(!result.has_errors(), "{}", result.format_diagnostics());
    assert_eq!(result.warnings().count(), 1);
}
