//! Integration test harness for the cascade-of-care compiler.
//!
//! This crate provides utilities for end-to-end testing of the full
//! pipeline: Policy → Build → Validate → Emit → Inspect.

use std::path::PathBuf;
use std::sync::Arc;

use coc_campaign::{Campaign, CampaignEvent, ValidationOptions, ValidationReport};
use coc_compiler::{Demographics, Policy};
use coc_schema::Schema;
use serde_json::Value;

/// Base year the harness campaigns start from.
pub const BASE_YEAR: f64 = 1960.5;

/// Directory holding the policy and demographics fixtures.
pub fn fixtures_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("fixtures")
}

/// The bundled engine schema.
///
/// # Panics
///
/// Panics if the bundled schema does not parse.
pub fn schema() -> Arc<Schema> {
    Arc::new(Schema::bundled().expect("bundled schema"))
}

/// Test harness around a campaign built on the bundled schema and
/// validated against the standard demographics.
pub struct CampaignHarness {
    campaign: Campaign,
    demographics: Demographics,
}

impl Default for CampaignHarness {
    fn default() -> Self {
        Self::new()
    }
}

impl CampaignHarness {
    /// An empty campaign; builders are run through [`Self::campaign_mut`].
    pub fn new() -> Self {
        Self {
            campaign: Campaign::new(schema(), BASE_YEAR),
            demographics: Demographics::standard(),
        }
    }

    /// Build every section of a policy.
    ///
    /// # Panics
    ///
    /// Panics if the policy fails to build.
    pub fn from_policy(policy: &Policy) -> Self {
        let campaign = match coc_compiler::build(policy, schema()) {
            Ok(campaign) => campaign,
            Err(err) => panic!("policy '{}' failed to build: {err}", policy.metadata.name),
        };
        Self {
            campaign,
            demographics: Demographics::standard(),
        }
    }

    /// Parse and build a policy document.
    ///
    /// # Panics
    ///
    /// Panics if the YAML is not a valid policy or fails to build.
    pub fn from_policy_yaml(yaml: &str) -> Self {
        let policy = Policy::from_yaml(yaml).expect("policy YAML");
        Self::from_policy(&policy)
    }

    pub fn with_demographics(mut self, demographics: Demographics) -> Self {
        self.demographics = demographics;
        self
    }

    pub fn campaign(&self) -> &Campaign {
        &self.campaign
    }

    pub fn campaign_mut(&mut self) -> &mut Campaign {
        &mut self.campaign
    }

    /// The event named `name`.
    ///
    /// # Panics
    ///
    /// Panics if no event has that name.
    pub fn event(&self, name: &str) -> &CampaignEvent {
        self.campaign
            .events()
            .iter()
            .find(|e| e.name == name)
            .unwrap_or_else(|| panic!("no event named '{name}'"))
    }

    pub fn events_named<'a>(&'a self, prefix: &'a str) -> Vec<&'a CampaignEvent> {
        self.campaign.events_named(prefix).collect()
    }

    /// The coordinator's intervention config: the listener for triggered
    /// events, the intervention itself otherwise.
    pub fn listener(&self, name: &str) -> &Value {
        &self.event(name).record()["Event_Coordinator_Config"]["Intervention_Config"]
    }

    /// The intervention config handed to individuals.
    pub fn intervention(&self, name: &str) -> &Value {
        let config = self.listener(name);
        if config["class"] == "NodeLevelHealthTriggeredIV" {
            &config["Actual_IndividualIntervention_Config"]
        } else {
            config
        }
    }

    /// Validate against the harness demographics.
    pub fn validate(&self) -> ValidationReport {
        let options = ValidationOptions::default().with_catalog(&self.demographics);
        self.campaign.validate(&options)
    }

    /// # Panics
    ///
    /// Panics with every issue if validation reports an error.
    pub fn assert_valid(&self) {
        let report = self.validate();
        assert!(!report.has_errors(), "validation failed: {:#?}", report.issues());
    }

    /// Finalize against `config` and return the artifact document.
    ///
    /// # Panics
    ///
    /// Panics if finalization fails.
    pub fn finalize(&self, config: &mut Value) -> Value {
        let options = ValidationOptions::default().with_catalog(&self.demographics);
        match self.campaign.finalize(config, &options) {
            Ok(artifact) => artifact.into_document(),
            Err(err) => panic!("finalize failed: {err}"),
        }
    }

    /// The artifact as a JSON string, exactly as it would be written.
    pub fn json_string(&self) -> String {
        self.campaign.to_json().to_string()
    }

    /// Every JSON object anywhere in the emitted events, depth first.
    pub fn objects(&self) -> Vec<&Value> {
        let mut out = Vec::new();
        for event in self.campaign.events() {
            collect_objects(event.record(), &mut out);
        }
        out
    }
}

fn collect_objects<'a>(value: &'a Value, out: &mut Vec<&'a Value>) {
    match value {
        Value::Object(map) => {
            out.push(value);
            for child in map.values() {
                collect_objects(child, out);
            }
        }
        Value::Array(items) => {
            for item in items {
                collect_objects(item, out);
            }
        }
        _ => {}
    }
}
