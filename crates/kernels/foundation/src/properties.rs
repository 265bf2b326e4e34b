//! Individual-property pairs and restriction sets

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::ValueError;

/// A `Key:Value` individual-property assignment.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PropertyPair {
    pub key: String,
    pub value: String,
}

impl PropertyPair {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

impl fmt::Display for PropertyPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.key, self.value)
    }
}

impl FromStr for PropertyPair {
    type Err = ValueError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.split_once(':') {
            Some((key, value))
                if !key.trim().is_empty() && !value.trim().is_empty() && !value.contains(':') =>
            {
                Ok(Self::new(key.trim(), value.trim()))
            }
            _ => Err(ValueError::InvalidProperty(s.to_string())),
        }
    }
}

impl Serialize for PropertyPair {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for PropertyPair {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Individual-property filter applied by a coordinator.
///
/// Two shapes exist: a flat list ANDed together, or a list of groups where
/// each group is ANDed and the groups are ORed. Exactly one shape is emitted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum PropertyRestrictions {
    #[default]
    #[serde(skip)]
    None,
    /// Every pair must match.
    All(Vec<PropertyPair>),
    /// At least one group must match in full.
    AnyOf(Vec<Vec<PropertyPair>>),
}

impl PropertyRestrictions {
    /// A single-group OR-of-ANDs restriction, the shape used by the cascade.
    pub fn within_node(pairs: impl IntoIterator<Item = PropertyPair>) -> Self {
        PropertyRestrictions::AnyOf(vec![pairs.into_iter().collect()])
    }

    /// Parse a flat list of `Key:Value` strings.
    pub fn all_of<S: AsRef<str>>(pairs: &[S]) -> Result<Self, ValueError> {
        let parsed = pairs
            .iter()
            .map(|p| p.as_ref().parse())
            .collect::<Result<Vec<PropertyPair>, _>>()?;
        Ok(PropertyRestrictions::All(parsed))
    }

    /// Parse a list of `Key:Value` groups.
    pub fn any_of<S: AsRef<str>>(groups: &[Vec<S>]) -> Result<Self, ValueError> {
        let parsed = groups
            .iter()
            .map(|group| {
                group
                    .iter()
                    .map(|p| p.as_ref().parse())
                    .collect::<Result<Vec<PropertyPair>, _>>()
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(PropertyRestrictions::AnyOf(parsed))
    }

    pub fn is_empty(&self) -> bool {
        match self {
            PropertyRestrictions::None => true,
            PropertyRestrictions::All(pairs) => pairs.is_empty(),
            PropertyRestrictions::AnyOf(groups) => groups.iter().all(Vec::is_empty),
        }
    }

    /// Every pair referenced, in order of appearance.
    pub fn pairs(&self) -> Vec<&PropertyPair> {
        match self {
            PropertyRestrictions::None => Vec::new(),
            PropertyRestrictions::All(pairs) => pairs.iter().collect(),
            PropertyRestrictions::AnyOf(groups) => groups.iter().flatten().collect(),
        }
    }

    /// Whether this restriction can only admit individuals carrying `pair`.
    pub fn requires(&self, pair: &PropertyPair) -> bool {
        match self {
            PropertyRestrictions::None => false,
            PropertyRestrictions::All(pairs) => pairs.contains(pair),
            PropertyRestrictions::AnyOf(groups) => {
                !groups.is_empty() && groups.iter().all(|g| g.contains(pair))
            }
        }
    }

    /// Whether any branch of this restriction mentions `pair`.
    pub fn mentions(&self, pair: &PropertyPair) -> bool {
        self.pairs().contains(&pair)
    }
}

impl Serialize for PropertyRestrictions {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            PropertyRestrictions::None => serializer.collect_seq(std::iter::empty::<PropertyPair>()),
            PropertyRestrictions::All(pairs) => pairs.serialize(serializer),
            PropertyRestrictions::AnyOf(groups) => groups.serialize(serializer),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_property_pair() {
        let pair: PropertyPair = "Accessibility:Yes".parse().unwrap();
        assert_eq!(pair.key, "Accessibility");
        assert_eq!(pair.value, "Yes");
        assert_eq!(pair.to_string(), "Accessibility:Yes");
    }

    #[test]
    fn test_reject_malformed_pairs() {
        for bad in ["Accessibility", ":Yes", "Risk:", "A:B:C", ""] {
            assert!(bad.parse::<PropertyPair>().is_err(), "{bad} accepted");
        }
    }

    #[test]
    fn test_restriction_shapes_from_yaml() {
        let flat: PropertyRestrictions = serde_yaml::from_str("[\"Risk:HIGH\", \"Accessibility:Yes\"]").unwrap();
        assert!(matches!(flat, PropertyRestrictions::All(ref p) if p.len() == 2));

        let nested: PropertyRestrictions =
            serde_yaml::from_str("[[\"Risk:HIGH\"], [\"Risk:MEDIUM\"]]").unwrap();
        assert!(matches!(nested, PropertyRestrictions::AnyOf(ref g) if g.len() == 2));
    }

    #[test]
    fn test_requires_and_mentions() {
        let high = PropertyPair::new("Risk", "HIGH");
        let access = PropertyPair::new("Accessibility", "Yes");

        let within = PropertyRestrictions::within_node([access.clone()]);
        assert!(within.requires(&access));
        assert!(!within.requires(&high));

        let either = PropertyRestrictions::AnyOf(vec![vec![high.clone()], vec![access.clone()]]);
        assert!(!either.requires(&high));
        assert!(either.mentions(&high));
        assert!(PropertyRestrictions::None.is_empty());
    }
}
