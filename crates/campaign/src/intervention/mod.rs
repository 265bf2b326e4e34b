//! Individual interventions
//!
//! Each engine intervention class is a plain struct holding its parameters
//! and the fields every class shares ([`Common`]). Structs render to JSON
//! through [`InterventionConfig::to_json`], which writes every field through
//! a schema [`Record`], so nothing reaches the artifact unchecked.
//!
//! [`Intervention`] is the closed sum of all classes; distributors and the
//! signal-graph analysis only ever see that.

mod diagnostics;
mod flow;
mod treatment;

pub use diagnostics::{
    ArtStagingByCd4, ArtStagingCd4Agnostic, DrawBlood, PiecewiseDiagnostic, RandomChoice,
    RapidHivDiagnostic, SigmoidDiagnostic, StiIsPostDebut,
};
pub use flow::{BroadcastEvent, DelayedBroadcast, Muxer, PropertyValueChanger};
pub use treatment::{
    AntiretroviralTherapy, ArtDropout, ControlledVaccine, MaleCircumcision,
    ModifyStiCoInfectionStatus, OutbreakIndividual, Pmtct, SetSexualDebutAge, VaccineType,
    WaningEffect,
};

use coc_foundation::{CascadeState, PropertyPair, Signal, ValueMap};
use coc_schema::{Record, Schema, SchemaResult};
use serde_json::Value;

use crate::effects::ConfigEffect;

/// Fields shared by every intervention class.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Common {
    pub name: Option<String>,
    pub disqualifying: Vec<PropertyPair>,
    pub new_property_value: Option<PropertyPair>,
}

impl Common {
    fn write(&self, schema: &Schema, record: &mut Record<'_>) -> SchemaResult<()> {
        record.set_opt(schema, "Intervention_Name", self.name.clone())?;
        if !self.disqualifying.is_empty() {
            let names: Vec<String> = self.disqualifying.iter().map(|p| p.to_string()).collect();
            record.set(schema, "Disqualifying_Properties", names)?;
        }
        record.set_opt(
            schema,
            "New_Property_Value",
            self.new_property_value.as_ref().map(|p| p.to_string()),
        )?;
        Ok(())
    }
}

/// Behaviour shared by every intervention class.
pub trait InterventionConfig {
    /// Engine class name.
    fn class(&self) -> &'static str;

    fn common(&self) -> &Common;

    fn common_mut(&mut self) -> &mut Common;

    /// Signals this intervention can raise.
    fn outputs(&self) -> Vec<Signal>;

    /// Signals this intervention raises at run time. Branches that can
    /// never fire are left out.
    fn live_outputs(&self) -> Vec<Signal> {
        self.outputs()
    }

    /// Write the class-specific fields.
    fn write_fields(&self, schema: &Schema, record: &mut Record<'_>) -> SchemaResult<()>;

    /// Whether the intervention is an HIV test (its outcome depends on status).
    fn is_hiv_test(&self) -> bool {
        false
    }

    /// Property values this intervention assigns besides `New_Property_Value`.
    fn assigned_properties(&self) -> Vec<PropertyPair> {
        Vec::new()
    }

    /// Time-value maps carried by this intervention.
    fn value_maps(&self) -> Vec<&ValueMap> {
        Vec::new()
    }

    /// Engine configuration changes this intervention depends on.
    fn config_effects(&self) -> Vec<ConfigEffect> {
        Vec::new()
    }

    fn to_json(&self, schema: &Schema) -> SchemaResult<Value> {
        let mut record = schema.instantiate(self.class())?;
        self.common().write(schema, &mut record)?;
        self.write_fields(schema, &mut record)?;
        record.finish()
    }
}

macro_rules! interventions {
    ($($variant:ident),+ $(,)?) => {
        /// Any intervention the compiler can emit.
        #[derive(Debug, Clone, PartialEq)]
        pub enum Intervention {
            $($variant($variant),)+
        }

        $(
            impl From<$variant> for Intervention {
                fn from(value: $variant) -> Self {
                    Intervention::$variant(value)
                }
            }
        )+

        impl InterventionConfig for Intervention {
            fn class(&self) -> &'static str {
                match self { $(Intervention::$variant(i) => i.class(),)+ }
            }

            fn common(&self) -> &Common {
                match self { $(Intervention::$variant(i) => i.common(),)+ }
            }

            fn common_mut(&mut self) -> &mut Common {
                match self { $(Intervention::$variant(i) => i.common_mut(),)+ }
            }

            fn outputs(&self) -> Vec<Signal> {
                match self { $(Intervention::$variant(i) => i.outputs(),)+ }
            }

            fn live_outputs(&self) -> Vec<Signal> {
                match self { $(Intervention::$variant(i) => i.live_outputs(),)+ }
            }

            fn write_fields(&self, schema: &Schema, record: &mut Record<'_>) -> SchemaResult<()> {
                match self { $(Intervention::$variant(i) => i.write_fields(schema, record),)+ }
            }

            fn is_hiv_test(&self) -> bool {
                match self { $(Intervention::$variant(i) => i.is_hiv_test(),)+ }
            }

            fn assigned_properties(&self) -> Vec<PropertyPair> {
                match self { $(Intervention::$variant(i) => i.assigned_properties(),)+ }
            }

            fn value_maps(&self) -> Vec<&ValueMap> {
                match self { $(Intervention::$variant(i) => i.value_maps(),)+ }
            }

            fn config_effects(&self) -> Vec<ConfigEffect> {
                match self { $(Intervention::$variant(i) => i.config_effects(),)+ }
            }
        }
    };
}

interventions! {
    RandomChoice,
    RapidHivDiagnostic,
    SigmoidDiagnostic,
    PiecewiseDiagnostic,
    ArtStagingCd4Agnostic,
    ArtStagingByCd4,
    DrawBlood,
    StiIsPostDebut,
    Muxer,
    BroadcastEvent,
    DelayedBroadcast,
    PropertyValueChanger,
    Pmtct,
    AntiretroviralTherapy,
    ArtDropout,
    OutbreakIndividual,
    MaleCircumcision,
    ModifyStiCoInfectionStatus,
    ControlledVaccine,
    SetSexualDebutAge,
}

impl Intervention {
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.common_mut().name = Some(name.into());
        self
    }

    pub fn disqualified_by(mut self, pairs: Vec<PropertyPair>) -> Self {
        self.common_mut().disqualifying = pairs;
        self
    }

    pub fn setting(mut self, pair: PropertyPair) -> Self {
        self.common_mut().new_property_value = Some(pair);
        self
    }

    /// Place an internal node of `state`: refuse the state's disqualifiers
    /// and move the individual into it.
    pub fn placed_in(self, state: CascadeState) -> Self {
        self.disqualified_by(state.disqualifying_properties())
            .setting(state.property())
    }

    /// Place an entry gate of `state`, which only refuses the state's
    /// entry disqualifiers.
    pub fn entering(self, state: CascadeState) -> Self {
        self.disqualified_by(state.entry_disqualifying_properties())
            .setting(state.property())
    }

    /// Every property value this intervention can assign.
    pub fn sets_properties(&self) -> Vec<PropertyPair> {
        let mut pairs: Vec<PropertyPair> = self.common().new_property_value.iter().cloned().collect();
        pairs.extend(self.assigned_properties());
        pairs
    }

    /// The cascade state this intervention moves individuals into, if any.
    pub fn cascade_state(&self) -> Option<CascadeState> {
        self.common()
            .new_property_value
            .as_ref()
            .and_then(CascadeState::from_property)
    }
}

/// Positive and optional negative outcome of a diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Outcomes {
    pub positive: Signal,
    pub negative: Option<Signal>,
}

impl Outcomes {
    pub fn new(positive: impl Into<Signal>, negative: Option<Signal>) -> Self {
        Self {
            positive: positive.into(),
            negative,
        }
    }

    /// Positive outcome only; negatives are dropped.
    pub fn positive(positive: impl Into<Signal>) -> Self {
        Self::new(positive, None)
    }

    pub fn both(positive: impl Into<Signal>, negative: impl Into<Signal>) -> Self {
        Self::new(positive, Some(negative.into()))
    }

    fn signals(&self) -> Vec<Signal> {
        let mut out = vec![self.positive];
        out.extend(self.negative);
        out
    }

    fn write(&self, schema: &Schema, record: &mut Record<'_>) -> SchemaResult<()> {
        record.set(schema, "Positive_Diagnosis_Event", self.positive.as_str())?;
        record.set_opt(
            schema,
            "Negative_Diagnosis_Event",
            self.negative.map(Signal::as_str),
        )?;
        Ok(())
    }
}

#[cfg(test)]
mod tests;
