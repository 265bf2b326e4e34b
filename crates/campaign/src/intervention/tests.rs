use coc_foundation::{CascadeState, CustomSignal, DelayDistribution, PropertyPair, ValueMap};
use coc_schema::Schema;

use super::*;

fn schema() -> Schema {
    Schema::bundled().unwrap()
}

#[test]
fn test_random_choice_uses_rounded_complement() {
    let choice = RandomChoice::split(
        CustomSignal::ArtStagingTrigger2,
        0.85,
        CustomSignal::HctUptakePostDebutTrigger2,
    )
    .unwrap();
    let json = choice.to_json(&schema()).unwrap();
    assert_eq!(json["class"], "HIVRandomChoice");
    assert_eq!(json["Choice_Probabilities"], serde_json::json!([0.85, 0.15]));
    assert_eq!(
        json["Choice_Names"],
        serde_json::json!(["ARTStagingTrigger2", "HCTUptakePostDebutTrigger2"])
    );
}

#[test]
fn test_random_choice_one_tenth() {
    let choice =
        RandomChoice::split(CustomSignal::OnArtTrigger2, 0.1, CustomSignal::ArtInitiationDelayed)
            .unwrap();
    assert_eq!(choice.probabilities(), vec![0.1, 0.9]);
}

#[test]
fn test_random_choice_rejects_bad_probability() {
    assert!(RandomChoice::split(CustomSignal::Dummy, 1.5, CustomSignal::Dummy).is_err());
}

#[test]
fn test_placement_sets_state_and_disqualifiers() {
    let node = Intervention::from(RapidHivDiagnostic::new(Outcomes::positive(
        CustomSignal::ArtStagingTrigger1,
    )))
    .placed_in(CascadeState::ArtStagingDiagnosticTest);
    let json = node.to_json(&schema()).unwrap();
    assert_eq!(json["New_Property_Value"], "CascadeState:ARTStagingDiagnosticTest");
    let disq: Vec<&str> = json["Disqualifying_Properties"]
        .as_array()
        .unwrap()
        .iter()
        .map(|v| v.as_str().unwrap())
        .collect();
    assert!(disq.contains(&"CascadeState:LostForever"));
    assert!(disq.contains(&"CascadeState:OnART"));
    assert!(disq.contains(&"CascadeState:ARTStaging"));
    assert_eq!(node.cascade_state(), Some(CascadeState::ArtStagingDiagnosticTest));
}

#[test]
fn test_entry_gate_uses_entry_disqualifiers() {
    let gate = Intervention::from(
        RandomChoice::split(
            CustomSignal::HctUptakePostDebut0,
            0.5,
            CustomSignal::Dummy,
        )
        .unwrap(),
    )
    .entering(CascadeState::HctUptakePostDebut);
    assert_eq!(
        gate.common().disqualifying,
        vec![CascadeState::LostForever.property()]
    );
}

#[test]
fn test_negative_outcome_is_omitted_when_absent() {
    let json = RapidHivDiagnostic::new(Outcomes::positive(CustomSignal::HivPositiveAtAnc))
        .to_json(&schema())
        .unwrap();
    assert_eq!(json["Positive_Diagnosis_Event"], "HIV_Positive_at_ANC");
    assert!(json.get("Negative_Diagnosis_Event").is_none());
}

#[test]
fn test_sigmoid_fields() {
    let sigmoid = coc_foundation::Sigmoid::new(0.0, 0.975, 2005.87, 0.7136).unwrap();
    let json = SigmoidDiagnostic::new(
        sigmoid,
        Outcomes::positive(CustomSignal::NeedsPmtctDiagnosticTest),
    )
    .to_json(&schema())
    .unwrap();
    assert_eq!(json["Ramp_MidYear"], 2005.87);
    assert_eq!(json["Ramp_Rate"], 0.7136);
    assert_eq!(json["Ramp_Max"], 0.975);
    assert_eq!(json["Female_Multiplier"], 1.0);
}

#[test]
fn test_always_negative_piecewise_has_no_live_positive() {
    let diag = PiecewiseDiagnostic::step(
        ValueMap::always_negative(),
        Outcomes::both(CustomSignal::OnArtTrigger2, CustomSignal::LostForeverTrigger),
    )
    .unwrap();
    assert_eq!(diag.outputs().len(), 2);
    assert_eq!(
        diag.live_outputs(),
        vec![Signal::from(CustomSignal::LostForeverTrigger)]
    );
    assert_eq!(diag.probability(2010.0), 0.0);
    let json = diag.to_json(&schema()).unwrap();
    assert_eq!(json["Interpolation_Order"], 0);
    assert_eq!(
        json["Time_Value_Map"],
        serde_json::json!({"Times": [1990.0, 2016.0], "Values": [0.0, 0.0]})
    );
}

#[test]
fn test_piecewise_rejects_values_above_one() {
    let map = ValueMap::new(vec![2000.0], vec![1.2]).unwrap();
    assert!(PiecewiseDiagnostic::linear(map, Outcomes::positive(CustomSignal::Dummy)).is_err());
}

#[test]
fn test_historical_staging_maps() {
    let agnostic = ArtStagingCd4Agnostic::historical(Outcomes::both(
        CustomSignal::LinkingToArtTrigger,
        CustomSignal::ArtStaging5,
    ))
    .unwrap();
    let json = agnostic.to_json(&schema()).unwrap();
    assert_eq!(
        json["Adult_By_WHO_Stage"],
        serde_json::json!({"Times": [2002.0, 2007.45, 2016.0], "Values": [4.0, 3.0, 0.0]})
    );
    assert_eq!(
        json["Child_Treat_Under_Age_In_Years_Threshold"],
        serde_json::json!({"Times": [2002.0, 2013.95], "Values": [5.0, 15.0]})
    );

    let by_cd4 = ArtStagingByCd4::historical(Outcomes::both(
        CustomSignal::LinkingToArtTrigger,
        CustomSignal::LinkingToPreArtTrigger,
    ))
    .unwrap();
    let json = by_cd4.to_json(&schema()).unwrap();
    assert_eq!(
        json["If_Pregnant"],
        serde_json::json!({"Times": [2002.0, 2010.5, 2013.95], "Values": [200.0, 350.0, 2000.0]})
    );
    assert_eq!(by_cd4.value_maps().len(), 3);
}

#[test]
fn test_muxer_delay_fields() {
    let muxer = Muxer::new(
        "HCTUptakePostDebut1",
        DelayDistribution::exponential(365.0),
        CustomSignal::HctUptakePostDebut2,
    )
    .unwrap();
    let json = muxer.to_json(&schema()).unwrap();
    assert_eq!(json["Delay_Period_Distribution"], "EXPONENTIAL_DISTRIBUTION");
    assert_eq!(json["Delay_Period_Exponential"], 365.0);
    assert_eq!(json["Max_Entries"], 1);
    assert!(json.get("Delay_Period_Constant").is_none());
}

#[test]
fn test_muxer_rejects_invalid_delay() {
    assert!(Muxer::new("m", DelayDistribution::exponential(0.0), CustomSignal::Dummy).is_err());
}

#[test]
fn test_property_value_changer_assigns_target() {
    let pvc = Intervention::from(PropertyValueChanger::new(CascadeState::LostForever.property()));
    assert_eq!(
        pvc.sets_properties(),
        vec![PropertyPair::new("CascadeState", "LostForever")]
    );
    let json = pvc.to_json(&schema()).unwrap();
    assert_eq!(json["Target_Property_Key"], "CascadeState");
    assert_eq!(json["Target_Property_Value"], "LostForever");
    assert_eq!(json["Daily_Probability"], 1.0);
}

#[test]
fn test_outbreak_rejects_disqualifiers() {
    let seed = Intervention::from(OutbreakIndividual::new(0))
        .disqualified_by(vec![PropertyPair::new("Risk", "LOW")]);
    assert!(seed.to_json(&schema()).is_err());
    let json = OutbreakIndividual::new(0).to_json(&schema()).unwrap();
    assert_eq!(json["Incubation_Period_Override"], 0);
}

#[test]
fn test_controlled_vaccine_nests_waning() {
    let prep = ControlledVaccine::new(
        VaccineType::AcquisitionBlocking,
        WaningEffect::boxed(0.9, 365.0).unwrap(),
    )
    .with_revaccination_wait(365.0);
    let json = prep.to_json(&schema()).unwrap();
    assert_eq!(json["Waning_Config"]["class"], "WaningEffectBox");
    assert_eq!(json["Waning_Config"]["Box_Duration"], 365.0);
    assert_eq!(json["Duration_To_Wait_Before_Revaccination"], 365.0);
    assert!(prep.outputs().is_empty());
}

#[test]
fn test_circumcision_raises_distributed_event() {
    let plain = MaleCircumcision::new(0.6).unwrap();
    assert!(plain.outputs().is_empty());
    assert!(plain.to_json(&schema()).unwrap().get("Distributed_Event_Trigger").is_none());

    let mc = MaleCircumcision::new(0.6)
        .unwrap()
        .with_distributed_event(CustomSignal::Dummy);
    let json = mc.to_json(&schema()).unwrap();
    assert_eq!(json["Distributed_Event_Trigger"], "dummy");
    assert_eq!(mc.outputs(), vec![Signal::from(CustomSignal::Dummy)]);

    let mut campaign = crate::Campaign::new(std::sync::Arc::new(schema()), 1960.5);
    campaign
        .add_scheduled(crate::Scheduled::new("circumcise", 2010.0, vec![mc.into()]))
        .unwrap();
    let produced = campaign.signal_report().get(CustomSignal::Dummy.into()).unwrap();
    assert_eq!(produced.first_producer.as_deref(), Some("circumcise"));
}

#[test]
fn test_config_effects_of_debut_and_pmtct() {
    assert_eq!(SetSexualDebutAge::new().config_effects().len(), 1);
    assert_eq!(Pmtct::new(0.66).unwrap().config_effects().len(), 1);
    assert!(AntiretroviralTherapy::new().config_effects().is_empty());
}
