//! Diagnostics and branching interventions.

use coc_foundation::{
    Interpolation, Sigmoid, Signal, ValueMap, ValueResult, check_probability, split_probabilities,
};
use coc_schema::{Record, Schema, SchemaResult};

use super::{Common, InterventionConfig, Outcomes};

/// `HIVRandomChoice`: broadcast exactly one of several signals.
#[derive(Debug, Clone, PartialEq)]
pub struct RandomChoice {
    pub common: Common,
    pub choices: Vec<(Signal, f64)>,
}

impl RandomChoice {
    /// Two-way split `{first: p, second: round(1 - p, 7)}`.
    pub fn split(first: impl Into<Signal>, p: f64, second: impl Into<Signal>) -> ValueResult<Self> {
        Self::weighted(&[(first.into(), p)], second.into())
    }

    /// The given weights followed by `rest` taking the rounded remainder.
    pub fn weighted(given: &[(Signal, f64)], rest: Signal) -> ValueResult<Self> {
        let probabilities: Vec<f64> = given.iter().map(|(_, p)| *p).collect();
        let split = split_probabilities(&probabilities)?;
        let names = given.iter().map(|(s, _)| *s).chain(std::iter::once(rest));
        Ok(Self {
            common: Common::default(),
            choices: names.zip(split).collect(),
        })
    }

    pub fn probabilities(&self) -> Vec<f64> {
        self.choices.iter().map(|(_, p)| *p).collect()
    }
}

impl InterventionConfig for RandomChoice {
    fn class(&self) -> &'static str {
        "HIVRandomChoice"
    }

    fn common(&self) -> &Common {
        &self.common
    }

    fn common_mut(&mut self) -> &mut Common {
        &mut self.common
    }

    fn outputs(&self) -> Vec<Signal> {
        self.choices.iter().map(|(s, _)| *s).collect()
    }

    fn write_fields(&self, schema: &Schema, record: &mut Record<'_>) -> SchemaResult<()> {
        let names: Vec<&str> = self.choices.iter().map(|(s, _)| s.as_str()).collect();
        record.set(schema, "Choice_Names", names)?;
        record.set(schema, "Choice_Probabilities", self.probabilities())?;
        Ok(())
    }
}

/// `HIVRapidHIVDiagnostic`: test on true HIV status.
#[derive(Debug, Clone, PartialEq)]
pub struct RapidHivDiagnostic {
    pub common: Common,
    pub base_sensitivity: f64,
    pub outcomes: Outcomes,
}

impl RapidHivDiagnostic {
    pub fn new(outcomes: Outcomes) -> Self {
        Self {
            common: Common::default(),
            base_sensitivity: 1.0,
            outcomes,
        }
    }

    pub fn with_sensitivity(mut self, sensitivity: f64) -> ValueResult<Self> {
        self.base_sensitivity = check_probability("base sensitivity", sensitivity)?;
        Ok(self)
    }
}

impl InterventionConfig for RapidHivDiagnostic {
    fn class(&self) -> &'static str {
        "HIVRapidHIVDiagnostic"
    }

    fn common(&self) -> &Common {
        &self.common
    }

    fn common_mut(&mut self) -> &mut Common {
        &mut self.common
    }

    fn outputs(&self) -> Vec<Signal> {
        self.outcomes.signals()
    }

    fn write_fields(&self, schema: &Schema, record: &mut Record<'_>) -> SchemaResult<()> {
        record.set(schema, "Base_Sensitivity", self.base_sensitivity)?;
        self.outcomes.write(schema, record)
    }

    fn is_hiv_test(&self) -> bool {
        true
    }
}

/// `HIVSigmoidByYearAndSexDiagnostic`: positive with a sigmoid probability
/// of the calendar year, scaled for women.
#[derive(Debug, Clone, PartialEq)]
pub struct SigmoidDiagnostic {
    pub common: Common,
    pub sigmoid: Sigmoid,
    pub female_multiplier: f64,
    pub outcomes: Outcomes,
}

impl SigmoidDiagnostic {
    pub fn new(sigmoid: Sigmoid, outcomes: Outcomes) -> Self {
        Self {
            common: Common::default(),
            sigmoid,
            female_multiplier: 1.0,
            outcomes,
        }
    }

    pub fn with_female_multiplier(mut self, multiplier: f64) -> Self {
        self.female_multiplier = multiplier;
        self
    }
}

impl InterventionConfig for SigmoidDiagnostic {
    fn class(&self) -> &'static str {
        "HIVSigmoidByYearAndSexDiagnostic"
    }

    fn common(&self) -> &Common {
        &self.common
    }

    fn common_mut(&mut self) -> &mut Common {
        &mut self.common
    }

    fn outputs(&self) -> Vec<Signal> {
        self.outcomes.signals()
    }

    fn write_fields(&self, schema: &Schema, record: &mut Record<'_>) -> SchemaResult<()> {
        record
            .set(schema, "Ramp_Min", self.sigmoid.min)?
            .set(schema, "Ramp_Max", self.sigmoid.max)?
            .set(schema, "Ramp_MidYear", self.sigmoid.mid)?
            .set(schema, "Ramp_Rate", self.sigmoid.rate)?
            .set(schema, "Female_Multiplier", self.female_multiplier)?;
        self.outcomes.write(schema, record)
    }
}

/// `HIVPiecewiseByYearAndSexDiagnostic`: positive with a probability read
/// from a time-value map.
///
/// The all-zero map ([`ValueMap::always_negative`]) always takes the
/// negative branch.
#[derive(Debug, Clone, PartialEq)]
pub struct PiecewiseDiagnostic {
    pub common: Common,
    pub map: ValueMap,
    pub interpolation: Interpolation,
    pub female_multiplier: f64,
    pub default_value: Option<f64>,
    pub outcomes: Outcomes,
}

impl PiecewiseDiagnostic {
    pub fn new(map: ValueMap, interpolation: Interpolation, outcomes: Outcomes) -> ValueResult<Self> {
        map.check_range("piecewise probability", 0.0, 1.0)?;
        Ok(Self {
            common: Common::default(),
            map,
            interpolation,
            female_multiplier: 1.0,
            default_value: None,
            outcomes,
        })
    }

    /// Step-interpolated map.
    pub fn step(map: ValueMap, outcomes: Outcomes) -> ValueResult<Self> {
        Self::new(map, Interpolation::Step, outcomes)
    }

    /// Linearly interpolated map.
    pub fn linear(map: ValueMap, outcomes: Outcomes) -> ValueResult<Self> {
        Self::new(map, Interpolation::Linear, outcomes)
    }

    pub fn with_female_multiplier(mut self, multiplier: f64) -> Self {
        self.female_multiplier = multiplier;
        self
    }

    pub fn with_default_value(mut self, value: f64) -> Self {
        self.default_value = Some(value);
        self
    }

    /// Probability of the positive branch at `year`.
    pub fn probability(&self, year: f64) -> f64 {
        self.map.evaluate(year, self.interpolation)
    }
}

impl InterventionConfig for PiecewiseDiagnostic {
    fn class(&self) -> &'static str {
        "HIVPiecewiseByYearAndSexDiagnostic"
    }

    fn common(&self) -> &Common {
        &self.common
    }

    fn common_mut(&mut self) -> &mut Common {
        &mut self.common
    }

    fn outputs(&self) -> Vec<Signal> {
        self.outcomes.signals()
    }

    fn live_outputs(&self) -> Vec<Signal> {
        if self.map.is_always_negative() {
            return self.outcomes.negative.into_iter().collect();
        }
        self.outcomes.signals()
    }

    fn write_fields(&self, schema: &Schema, record: &mut Record<'_>) -> SchemaResult<()> {
        record
            .set(schema, "Time_Value_Map", self.map.to_json())?
            .set(schema, "Interpolation_Order", self.interpolation.order())?
            .set(schema, "Female_Multiplier", self.female_multiplier)?
            .set_opt(schema, "Default_Value", self.default_value)?;
        self.outcomes.write(schema, record)
    }

    fn is_hiv_test(&self) -> bool {
        true
    }

    fn value_maps(&self) -> Vec<&ValueMap> {
        vec![&self.map]
    }
}

fn historical_map(pairs: &[(f64, f64)]) -> ValueResult<ValueMap> {
    ValueMap::from_pairs(pairs)
}

/// `HIVARTStagingCD4AgnosticDiagnostic`: eligibility by age, pregnancy,
/// TB and WHO stage without a CD4 measurement.
#[derive(Debug, Clone, PartialEq)]
pub struct ArtStagingCd4Agnostic {
    pub common: Common,
    pub adult_treatment_age: f64,
    pub adult_by_pregnant: ValueMap,
    pub adult_by_tb: ValueMap,
    pub adult_by_who_stage: ValueMap,
    pub child_treat_under_age: ValueMap,
    pub child_by_tb: ValueMap,
    pub child_by_who_stage: ValueMap,
    pub outcomes: Outcomes,
}

impl ArtStagingCd4Agnostic {
    /// Eligibility rules as they changed over the guideline years.
    pub fn historical(outcomes: Outcomes) -> ValueResult<Self> {
        Ok(Self {
            common: Common::default(),
            adult_treatment_age: 5.0,
            adult_by_pregnant: historical_map(&[(2002.0, 0.0), (2013.95, 1.0)])?,
            adult_by_tb: historical_map(&[(2002.0, 1.0)])?,
            adult_by_who_stage: historical_map(&[(2002.0, 4.0), (2007.45, 3.0), (2016.0, 0.0)])?,
            child_treat_under_age: historical_map(&[(2002.0, 5.0), (2013.95, 15.0)])?,
            child_by_tb: historical_map(&[(2002.0, 0.0), (2010.5, 1.0)])?,
            child_by_who_stage: historical_map(&[(2002.0, 4.0), (2007.45, 3.0), (2016.0, 0.0)])?,
            outcomes,
        })
    }
}

impl InterventionConfig for ArtStagingCd4Agnostic {
    fn class(&self) -> &'static str {
        "HIVARTStagingCD4AgnosticDiagnostic"
    }

    fn common(&self) -> &Common {
        &self.common
    }

    fn common_mut(&mut self) -> &mut Common {
        &mut self.common
    }

    fn outputs(&self) -> Vec<Signal> {
        self.outcomes.signals()
    }

    fn write_fields(&self, schema: &Schema, record: &mut Record<'_>) -> SchemaResult<()> {
        record
            .set(schema, "Adult_Treatment_Age", self.adult_treatment_age)?
            .set(schema, "Adult_By_Pregnant", self.adult_by_pregnant.to_json())?
            .set(schema, "Adult_By_TB", self.adult_by_tb.to_json())?
            .set(schema, "Adult_By_WHO_Stage", self.adult_by_who_stage.to_json())?
            .set(
                schema,
                "Child_Treat_Under_Age_In_Years_Threshold",
                self.child_treat_under_age.to_json(),
            )?
            .set(schema, "Child_By_TB", self.child_by_tb.to_json())?
            .set(schema, "Child_By_WHO_Stage", self.child_by_who_stage.to_json())?;
        self.outcomes.write(schema, record)
    }

    fn value_maps(&self) -> Vec<&ValueMap> {
        vec![
            &self.adult_by_pregnant,
            &self.adult_by_tb,
            &self.adult_by_who_stage,
            &self.child_treat_under_age,
            &self.child_by_tb,
            &self.child_by_who_stage,
        ]
    }
}

/// `HIVARTStagingByCD4Diagnostic`: eligibility by CD4 count.
#[derive(Debug, Clone, PartialEq)]
pub struct ArtStagingByCd4 {
    pub common: Common,
    pub threshold: ValueMap,
    pub if_pregnant: ValueMap,
    pub if_active_tb: ValueMap,
    pub outcomes: Outcomes,
}

impl ArtStagingByCd4 {
    /// CD4 thresholds as they changed over the guideline years.
    pub fn historical(outcomes: Outcomes) -> ValueResult<Self> {
        Ok(Self {
            common: Common::default(),
            threshold: historical_map(&[(2002.0, 200.0), (2010.5, 350.0), (2013.95, 500.0)])?,
            if_pregnant: historical_map(&[(2002.0, 200.0), (2010.5, 350.0), (2013.95, 2000.0)])?,
            if_active_tb: historical_map(&[(2002.0, 200.0), (2010.5, 2000.0)])?,
            outcomes,
        })
    }
}

impl InterventionConfig for ArtStagingByCd4 {
    fn class(&self) -> &'static str {
        "HIVARTStagingByCD4Diagnostic"
    }

    fn common(&self) -> &Common {
        &self.common
    }

    fn common_mut(&mut self) -> &mut Common {
        &mut self.common
    }

    fn outputs(&self) -> Vec<Signal> {
        self.outcomes.signals()
    }

    fn write_fields(&self, schema: &Schema, record: &mut Record<'_>) -> SchemaResult<()> {
        record
            .set(schema, "Threshold", self.threshold.to_json())?
            .set(schema, "If_Pregnant", self.if_pregnant.to_json())?
            .set(schema, "If_Active_TB", self.if_active_tb.to_json())?;
        self.outcomes.write(schema, record)
    }

    fn value_maps(&self) -> Vec<&ValueMap> {
        vec![&self.threshold, &self.if_pregnant, &self.if_active_tb]
    }
}

/// `HIVDrawBlood`: take a CD4 measurement, then broadcast.
#[derive(Debug, Clone, PartialEq)]
pub struct DrawBlood {
    pub common: Common,
    pub positive: Signal,
}

impl DrawBlood {
    pub fn new(positive: impl Into<Signal>) -> Self {
        Self {
            common: Common::default(),
            positive: positive.into(),
        }
    }
}

impl InterventionConfig for DrawBlood {
    fn class(&self) -> &'static str {
        "HIVDrawBlood"
    }

    fn common(&self) -> &Common {
        &self.common
    }

    fn common_mut(&mut self) -> &mut Common {
        &mut self.common
    }

    fn outputs(&self) -> Vec<Signal> {
        vec![self.positive]
    }

    fn write_fields(&self, schema: &Schema, record: &mut Record<'_>) -> SchemaResult<()> {
        record.set(schema, "Positive_Diagnosis_Event", self.positive.as_str())?;
        Ok(())
    }
}

/// `STIIsPostDebut`: branch on whether the individual has debuted.
#[derive(Debug, Clone, PartialEq)]
pub struct StiIsPostDebut {
    pub common: Common,
    pub outcomes: Outcomes,
}

impl StiIsPostDebut {
    pub fn new(outcomes: Outcomes) -> Self {
        Self {
            common: Common::default(),
            outcomes,
        }
    }
}

impl InterventionConfig for StiIsPostDebut {
    fn class(&self) -> &'static str {
        "STIIsPostDebut"
    }

    fn common(&self) -> &Common {
        &self.common
    }

    fn common_mut(&mut self) -> &mut Common {
        &mut self.common
    }

    fn outputs(&self) -> Vec<Signal> {
        self.outcomes.signals()
    }

    fn write_fields(&self, schema: &Schema, record: &mut Record<'_>) -> SchemaResult<()> {
        self.outcomes.write(schema, record)
    }
}
