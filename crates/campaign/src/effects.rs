//! Engine configuration side effects
//!
//! A campaign can depend on engine settings: custom signals must be
//! registered, `SetSexualDebutAge` needs debut ages taken from
//! interventions, PMTCT needs maternal transmission. Builders record these
//! as [`ConfigEffect`]s; [`crate::Campaign::finalize`] applies them to the
//! engine config in one pass after validation succeeds.

use serde_json::{Map, Value};

use crate::{CampaignError, CampaignResult};

/// Config key listing custom individual events.
pub const CUSTOM_EVENTS_KEY: &str = "Custom_Individual_Events";

/// One mutation of the engine configuration.
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigEffect {
    /// Append signal names to the recognized custom events, skipping
    /// names already present.
    RegisterCustomEvents(Vec<String>),
    /// Set a named parameter.
    SetParameter { name: String, value: Value },
}

impl ConfigEffect {
    pub fn set_parameter(name: impl Into<String>, value: impl Into<Value>) -> Self {
        ConfigEffect::SetParameter {
            name: name.into(),
            value: value.into(),
        }
    }

    /// Apply to an engine config. Parameters live under `parameters` when
    /// the config has that object, otherwise at the root.
    pub fn apply(&self, config: &mut Value) -> CampaignResult<()> {
        let target = parameters_mut(config)?;
        match self {
            ConfigEffect::RegisterCustomEvents(names) => {
                let entry = target
                    .entry(CUSTOM_EVENTS_KEY)
                    .or_insert_with(|| Value::Array(Vec::new()));
                let list = entry.as_array_mut().ok_or_else(|| {
                    CampaignError::argument(format!("{CUSTOM_EVENTS_KEY} is not a list"))
                })?;
                for name in names {
                    if !list.iter().any(|v| v.as_str() == Some(name.as_str())) {
                        list.push(Value::from(name.as_str()));
                    }
                }
            }
            ConfigEffect::SetParameter { name, value } => {
                target.insert(name.clone(), value.clone());
            }
        }
        Ok(())
    }
}

fn parameters_mut(config: &mut Value) -> CampaignResult<&mut Map<String, Value>> {
    let root = config
        .as_object_mut()
        .ok_or_else(|| CampaignError::argument("engine config is not a JSON object"))?;
    if root.get("parameters").is_some_and(Value::is_object) {
        return match root.get_mut("parameters") {
            Some(Value::Object(params)) => Ok(params),
            _ => Err(CampaignError::argument("engine config parameters changed shape")),
        };
    }
    Ok(root)
}

/// Effects in registration order, with parameter conflicts rejected.
#[derive(Debug, Clone, Default)]
pub struct EffectSet {
    effects: Vec<ConfigEffect>,
}

impl EffectSet {
    /// Record an effect. Identical effects are kept once; setting the same
    /// parameter to two different values is an error.
    pub fn add(&mut self, effect: ConfigEffect) -> CampaignResult<()> {
        if let ConfigEffect::SetParameter { name, value } = &effect {
            for existing in &self.effects {
                if let ConfigEffect::SetParameter {
                    name: other,
                    value: current,
                } = existing
                {
                    if other == name && current != value {
                        return Err(CampaignError::argument(format!(
                            "engine parameter {name} set to both {current} and {value}"
                        )));
                    }
                }
            }
        }
        if !self.effects.contains(&effect) {
            self.effects.push(effect);
        }
        Ok(())
    }

    pub fn iter(&self) -> impl Iterator<Item = &ConfigEffect> {
        self.effects.iter()
    }

    pub fn len(&self) -> usize {
        self.effects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.effects.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_register_appends_missing_names() {
        let mut config = json!({"parameters": {"Custom_Individual_Events": ["Existing"]}});
        ConfigEffect::RegisterCustomEvents(vec!["Existing".into(), "OnART3".into()])
            .apply(&mut config)
            .unwrap();
        assert_eq!(
            config["parameters"]["Custom_Individual_Events"],
            json!(["Existing", "OnART3"])
        );
    }

    #[test]
    fn test_set_parameter_at_root_without_parameters() {
        let mut config = json!({"Simulation_Type": "HIV_SIM"});
        ConfigEffect::set_parameter("Sexual_Debut_Age_Setting_Type", "FROM_INTERVENTION")
            .apply(&mut config)
            .unwrap();
        assert_eq!(config["Sexual_Debut_Age_Setting_Type"], "FROM_INTERVENTION");
    }

    #[test]
    fn test_non_object_config_is_rejected() {
        let mut config = json!([1, 2]);
        assert!(
            ConfigEffect::set_parameter("X", 1)
                .apply(&mut config)
                .is_err()
        );
    }

    #[test]
    fn test_conflicting_parameters() {
        let mut set = EffectSet::default();
        set.add(ConfigEffect::set_parameter("A", 1)).unwrap();
        set.add(ConfigEffect::set_parameter("A", 1)).unwrap();
        assert_eq!(set.len(), 1);
        assert!(set.add(ConfigEffect::set_parameter("A", 0)).is_err());
    }
}
