//! Demographics collaborator
//!
//! The compiler never creates individual properties; it only checks that
//! the keys and values its restrictions name are declared by the population.

use std::path::Path;

use coc_campaign::PropertyCatalog;
use coc_foundation::{CASCADE_STATE_KEY, CascadeState, PropertyPair};
use indexmap::IndexMap;
use serde::Deserialize;

use crate::{PolicyError, PolicyResult};

/// Individual properties a population declares, in declaration order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Demographics {
    properties: IndexMap<String, Vec<String>>,
}

#[derive(Deserialize)]
struct RawDemographics {
    #[serde(rename = "Defaults", default)]
    defaults: Option<RawNode>,
    #[serde(rename = "Nodes", default)]
    nodes: Vec<RawNode>,
}

#[derive(Deserialize)]
struct RawNode {
    #[serde(rename = "IndividualProperties", default)]
    individual_properties: Vec<RawProperty>,
}

#[derive(Deserialize)]
struct RawProperty {
    #[serde(rename = "Property")]
    property: String,
    #[serde(rename = "Values", default)]
    values: Vec<String>,
}

impl Demographics {
    pub fn new() -> Self {
        Self::default()
    }

    /// The properties every cascade campaign restricts on: `Accessibility`,
    /// `Risk` and `CascadeState`.
    pub fn standard() -> Self {
        Self::new()
            .with_property("Accessibility", ["Yes", "No"])
            .with_property("Risk", ["LOW", "MEDIUM", "HIGH"])
            .with_property(
                CASCADE_STATE_KEY,
                CascadeState::ALL.iter().map(|s| s.as_str()),
            )
    }

    /// Declare `key` with `values`, merging with any earlier declaration.
    pub fn with_property<I, S>(mut self, key: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.declare(key.into(), values.into_iter().map(Into::into));
        self
    }

    fn declare(&mut self, key: String, values: impl Iterator<Item = String>) {
        let declared = self.properties.entry(key).or_default();
        for value in values {
            if !declared.contains(&value) {
                declared.push(value);
            }
        }
    }

    /// Read the individual properties from an engine demographics document.
    ///
    /// Properties under `Defaults` and under every node are merged.
    pub fn from_json(json: &str) -> PolicyResult<Self> {
        let raw: RawDemographics = serde_json::from_str(json)?;
        let mut demographics = Self::new();
        let nodes = raw.defaults.iter().chain(raw.nodes.iter());
        for property in nodes.flat_map(|n| n.individual_properties.iter()) {
            if property.property.is_empty() {
                return Err(PolicyError::InvalidDemographics(
                    "individual property without a name".to_string(),
                ));
            }
            if property.values.is_empty() {
                return Err(PolicyError::InvalidDemographics(format!(
                    "property '{}' declares no values",
                    property.property
                )));
            }
            demographics.declare(property.property.clone(), property.values.iter().cloned());
        }
        Ok(demographics)
    }

    pub fn load(path: impl AsRef<Path>) -> PolicyResult<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    pub fn values(&self, key: &str) -> Option<&[String]> {
        self.properties.get(key).map(Vec::as_slice)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.properties.keys().map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.properties.is_empty()
    }
}

impl PropertyCatalog for Demographics {
    fn declares(&self, pair: &PropertyPair) -> bool {
        self.values(&pair.key)
            .is_some_and(|values| values.iter().any(|v| *v == pair.value))
    }
}
