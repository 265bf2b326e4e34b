//! Targeting and coordinator building blocks
//!
//! Everything a coordinator needs besides its interventions: node sets,
//! demographic targeting, property restrictions, tracking logic for
//! reference-tracked distribution and the NChooser count table.

use std::collections::HashSet;

use coc_foundation::{PropertyPair, PropertyRestrictions, TargetGender, ValueError, ValueResult};
use coc_schema::{Record, Schema, SchemaResult};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};

/// Nodes an event applies to.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum NodeSet {
    #[default]
    All,
    Nodes(Vec<u32>),
}

impl NodeSet {
    pub fn nodes(ids: impl IntoIterator<Item = u32>) -> Self {
        NodeSet::Nodes(ids.into_iter().collect())
    }

    pub(crate) fn to_record(&self, schema: &Schema) -> SchemaResult<Value> {
        match self {
            NodeSet::All => schema.instantiate("NodeSetAll")?.finish(),
            NodeSet::Nodes(ids) => {
                let mut record = schema.instantiate("NodeSetNodeList")?;
                record.set(schema, "Node_List", ids.clone())?;
                record.finish()
            }
        }
    }
}

/// Which targeting fields a coordinator class carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum TargetingScope {
    /// Coverage, residency and both restriction shapes.
    Full,
    /// Reference tracking: no coverage, within-node restrictions only.
    Tracked,
}

/// Demographic targeting of a distribution.
#[derive(Debug, Clone, PartialEq)]
pub struct Targeting {
    pub coverage: f64,
    pub gender: TargetGender,
    pub age: Option<(f64, f64)>,
    pub restrictions: PropertyRestrictions,
    pub residents_only: bool,
}

impl Default for Targeting {
    fn default() -> Self {
        Self {
            coverage: 1.0,
            gender: TargetGender::All,
            age: None,
            restrictions: PropertyRestrictions::None,
            residents_only: false,
        }
    }
}

impl Targeting {
    pub fn everyone() -> Self {
        Self::default()
    }

    pub fn with_coverage(mut self, coverage: f64) -> ValueResult<Self> {
        self.coverage = coc_foundation::check_probability("demographic coverage", coverage)?;
        Ok(self)
    }

    pub fn for_gender(mut self, gender: TargetGender) -> Self {
        self.gender = gender;
        self
    }

    pub fn aged(mut self, min: f64, max: f64) -> ValueResult<Self> {
        if !min.is_finite() || !max.is_finite() || min < 0.0 || min > max {
            return Err(ValueError::InvalidProperty(format!(
                "age range [{min}, {max}] is not a valid range"
            )));
        }
        self.age = Some((min, max));
        Ok(self)
    }

    /// Restrict to individuals matching `restrictions`. A group naming the
    /// same key twice can never match and is rejected.
    pub fn restricted_to(mut self, restrictions: PropertyRestrictions) -> ValueResult<Self> {
        check_restrictions(&restrictions)?;
        self.restrictions = restrictions;
        Ok(self)
    }

    pub fn residents_only(mut self) -> Self {
        self.residents_only = true;
        self
    }

    /// Engine `Target_Demographic` value for this gender/age combination.
    pub fn target_demographic(&self) -> &'static str {
        match (self.gender, self.age.is_some()) {
            (TargetGender::All, false) => "Everyone",
            (TargetGender::All, true) => "ExplicitAgeRanges",
            (_, false) => "ExplicitGender",
            (_, true) => "ExplicitAgeRangesAndGender",
        }
    }

    pub(crate) fn write(
        &self,
        schema: &Schema,
        record: &mut Record<'_>,
        scope: TargetingScope,
    ) -> SchemaResult<()> {
        if scope == TargetingScope::Full {
            record.set(schema, "Demographic_Coverage", self.coverage)?;
        }
        record
            .set(schema, "Target_Demographic", self.target_demographic())?
            .set(schema, "Target_Gender", self.gender.as_str())?;
        if let Some((min, max)) = self.age {
            record
                .set(schema, "Target_Age_Min", min)?
                .set(schema, "Target_Age_Max", max)?;
        }
        if scope == TargetingScope::Full && self.residents_only {
            record.set(schema, "Target_Residents_Only", true)?;
        }
        match (&self.restrictions, scope) {
            (PropertyRestrictions::None, _) => {}
            (PropertyRestrictions::All(pairs), TargetingScope::Full) => {
                record.set(schema, "Property_Restrictions", flat_restrictions(pairs))?;
            }
            (PropertyRestrictions::All(pairs), TargetingScope::Tracked) => {
                record.set(
                    schema,
                    "Property_Restrictions_Within_Node",
                    grouped_restrictions(std::slice::from_ref(pairs)),
                )?;
            }
            (PropertyRestrictions::AnyOf(groups), _) => {
                record.set(
                    schema,
                    "Property_Restrictions_Within_Node",
                    grouped_restrictions(groups),
                )?;
            }
        }
        Ok(())
    }
}

fn check_restrictions(restrictions: &PropertyRestrictions) -> ValueResult<()> {
    let groups: Vec<&Vec<PropertyPair>> = match restrictions {
        PropertyRestrictions::None => Vec::new(),
        PropertyRestrictions::All(pairs) => vec![pairs],
        PropertyRestrictions::AnyOf(groups) => groups.iter().collect(),
    };
    for group in groups {
        let mut keys = HashSet::new();
        for pair in group {
            if !keys.insert(pair.key.as_str()) {
                return Err(ValueError::InvalidProperty(format!(
                    "restriction names '{}' twice in one group",
                    pair.key
                )));
            }
        }
    }
    Ok(())
}

/// `["K:V", ...]`, every pair required.
pub(crate) fn flat_restrictions(pairs: &[PropertyPair]) -> Value {
    Value::Array(pairs.iter().map(|p| Value::from(p.to_string())).collect())
}

/// `[{K: V, ...}, ...]`, any group matching.
pub(crate) fn grouped_restrictions(groups: &[Vec<PropertyPair>]) -> Value {
    Value::Array(
        groups
            .iter()
            .map(|group| {
                let map: Map<String, Value> = group
                    .iter()
                    .map(|p| (p.key.clone(), Value::from(p.value.clone())))
                    .collect();
                Value::Object(map)
            })
            .collect(),
    )
}

/// What a reference-tracking coordinator counts or filters on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TargetingLogic {
    IsCircumcised(bool),
    IsHivPositive(bool),
    HasIntervention { name: String, is_equal_to: bool },
}

impl TargetingLogic {
    pub(crate) fn to_record(&self, schema: &Schema) -> SchemaResult<Value> {
        let record = match self {
            TargetingLogic::IsCircumcised(equal) => {
                let mut record = schema.instantiate("IsCircumcised")?;
                record.set(schema, "Is_Equal_To", *equal)?;
                record
            }
            TargetingLogic::IsHivPositive(equal) => {
                let mut record = schema.instantiate("IsHivPositive")?;
                record.set(schema, "Is_Equal_To", *equal)?;
                record
            }
            TargetingLogic::HasIntervention { name, is_equal_to } => {
                let mut record = schema.instantiate("HasIntervention")?;
                record
                    .set(schema, "Intervention_Name", name.as_str())?
                    .set(schema, "Is_Equal_To", *is_equal_to)?;
                record
            }
        };
        record.finish()
    }
}

/// Disease-state filter terms for NChooser distribution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DiseaseState {
    #[serde(rename = "HIV_Positive")]
    HivPositive,
    #[serde(rename = "HIV_Negative")]
    HivNegative,
    #[serde(rename = "Tested_Positive")]
    TestedPositive,
    #[serde(rename = "Tested_Negative")]
    TestedNegative,
    #[serde(rename = "Male_Circumcision_Positive")]
    MaleCircumcisionPositive,
    #[serde(rename = "Male_Circumcision_Negative")]
    MaleCircumcisionNegative,
    #[serde(rename = "Has_Intervention")]
    HasIntervention,
    #[serde(rename = "Not_Have_Intervention")]
    NotHaveIntervention,
}

impl DiseaseState {
    pub fn as_str(self) -> &'static str {
        match self {
            DiseaseState::HivPositive => "HIV_Positive",
            DiseaseState::HivNegative => "HIV_Negative",
            DiseaseState::TestedPositive => "Tested_Positive",
            DiseaseState::TestedNegative => "Tested_Negative",
            DiseaseState::MaleCircumcisionPositive => "Male_Circumcision_Positive",
            DiseaseState::MaleCircumcisionNegative => "Male_Circumcision_Negative",
            DiseaseState::HasIntervention => "Has_Intervention",
            DiseaseState::NotHaveIntervention => "Not_Have_Intervention",
        }
    }
}

/// One row of an NChooser table: exact counts for an age band in a year.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NChooserRow {
    pub year: f64,
    pub min_age: f64,
    pub max_age: f64,
    #[serde(default)]
    pub num_males: u64,
    #[serde(default)]
    pub num_females: u64,
}

/// Rows grouped into yearly buckets, years non-decreasing.
#[derive(Debug, Clone, PartialEq)]
pub struct NChooserTable {
    rows: Vec<NChooserRow>,
}

fn invalid_table(reason: impl Into<String>) -> ValueError {
    ValueError::InvalidDistribution {
        kind: "nchooser table",
        reason: reason.into(),
    }
}

impl NChooserTable {
    pub fn new(rows: Vec<NChooserRow>) -> ValueResult<Self> {
        if rows.is_empty() {
            return Err(invalid_table("no rows"));
        }
        for (i, row) in rows.iter().enumerate() {
            if !row.year.is_finite() || !row.min_age.is_finite() || !row.max_age.is_finite() {
                return Err(invalid_table(format!("row {i} has a non-finite value")));
            }
            if row.min_age < 0.0 || row.min_age >= row.max_age {
                return Err(invalid_table(format!(
                    "row {i}: age band [{}, {}] is empty",
                    row.min_age, row.max_age
                )));
            }
        }
        for pair in rows.windows(2) {
            if pair[1].year < pair[0].year {
                return Err(invalid_table(format!(
                    "years must not decrease ({} after {})",
                    pair[1].year, pair[0].year
                )));
            }
        }
        Ok(Self { rows })
    }

    /// Male-only table from parallel columns `year`, `min_age`, `max_age`
    /// and `n_circumcisions`.
    pub fn circumcisions(
        year: &[f64],
        min_age: &[f64],
        max_age: &[f64],
        counts: &[u64],
    ) -> ValueResult<Self> {
        let n = year.len();
        if min_age.len() != n || max_age.len() != n || counts.len() != n {
            return Err(invalid_table(format!(
                "column lengths differ: year {n}, min_age {}, max_age {}, n {}",
                min_age.len(),
                max_age.len(),
                counts.len()
            )));
        }
        let rows = (0..n)
            .map(|i| NChooserRow {
                year: year[i],
                min_age: min_age[i],
                max_age: max_age[i],
                num_males: counts[i],
                num_females: 0,
            })
            .collect();
        Self::new(rows)
    }

    pub fn rows(&self) -> &[NChooserRow] {
        &self.rows
    }

    pub fn first_year(&self) -> f64 {
        self.rows[0].year
    }

    /// `(start, end, rows)` per distinct year; a bucket ends at the next
    /// year in the table, the last one after a year.
    pub fn buckets(&self) -> Vec<(f64, f64, &[NChooserRow])> {
        let mut starts = Vec::new();
        for (i, row) in self.rows.iter().enumerate() {
            if i == 0 || row.year != self.rows[i - 1].year {
                starts.push(i);
            }
        }
        starts
            .iter()
            .enumerate()
            .map(|(b, &start)| {
                let stop = starts.get(b + 1).copied().unwrap_or(self.rows.len());
                let year = self.rows[start].year;
                let end = if stop < self.rows.len() {
                    self.rows[stop].year
                } else {
                    year + 1.0
                };
                (year, end, &self.rows[start..stop])
            })
            .collect()
    }

    pub(crate) fn distributions(&self, restrictions: &PropertyRestrictions) -> Value {
        let within_node = match restrictions {
            PropertyRestrictions::None => None,
            PropertyRestrictions::All(pairs) => {
                Some(grouped_restrictions(std::slice::from_ref(pairs)))
            }
            PropertyRestrictions::AnyOf(groups) => Some(grouped_restrictions(groups)),
        };
        Value::Array(
            self.buckets()
                .into_iter()
                .map(|(start, end, rows)| {
                    let mut bucket = json!({
                        "Start_Year": start,
                        "End_Year": end,
                        "Age_Ranges_Years": rows
                            .iter()
                            .map(|r| json!({"Min": r.min_age, "Max": r.max_age}))
                            .collect::<Vec<_>>(),
                        "Num_Targeted_Males": rows.iter().map(|r| r.num_males).collect::<Vec<_>>(),
                        "Num_Targeted_Females": rows.iter().map(|r| r.num_females).collect::<Vec<_>>(),
                    });
                    if let (Some(groups), Some(obj)) = (&within_node, bucket.as_object_mut()) {
                        obj.insert("Property_Restrictions_Within_Node".into(), groups.clone());
                    }
                    bucket
                })
                .collect(),
        )
    }
}
