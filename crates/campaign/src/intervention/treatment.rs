//! Treatment, prevention and infection-seeding interventions.

use coc_foundation::{Signal, ValueResult, check_probability};
use coc_schema::{Record, Schema, SchemaResult};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use super::{Common, InterventionConfig};
use crate::effects::ConfigEffect;

macro_rules! plain_intervention {
    ($(#[$meta:meta])* $name:ident, $class:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Default, PartialEq)]
        pub struct $name {
            pub common: Common,
        }

        impl $name {
            pub fn new() -> Self {
                Self::default()
            }
        }

        impl InterventionConfig for $name {
            fn class(&self) -> &'static str {
                $class
            }

            fn common(&self) -> &Common {
                &self.common
            }

            fn common_mut(&mut self) -> &mut Common {
                &mut self.common
            }

            fn outputs(&self) -> Vec<Signal> {
                Vec::new()
            }

            fn write_fields(&self, _schema: &Schema, _record: &mut Record<'_>) -> SchemaResult<()> {
                Ok(())
            }
        }
    };
}

plain_intervention! {
    /// `AntiretroviralTherapy`: start ART.
    AntiretroviralTherapy, "AntiretroviralTherapy"
}

plain_intervention! {
    /// `ARTDropout`: stop ART.
    ArtDropout, "ARTDropout"
}

/// `PMTCT`: prevention of mother-to-child transmission.
#[derive(Debug, Clone, PartialEq)]
pub struct Pmtct {
    pub common: Common,
    pub efficacy: f64,
}

impl Pmtct {
    pub fn new(efficacy: f64) -> ValueResult<Self> {
        Ok(Self {
            common: Common::default(),
            efficacy: check_probability("PMTCT efficacy", efficacy)?,
        })
    }
}

impl InterventionConfig for Pmtct {
    fn class(&self) -> &'static str {
        "PMTCT"
    }

    fn common(&self) -> &Common {
        &self.common
    }

    fn common_mut(&mut self) -> &mut Common {
        &mut self.common
    }

    fn outputs(&self) -> Vec<Signal> {
        Vec::new()
    }

    fn write_fields(&self, schema: &Schema, record: &mut Record<'_>) -> SchemaResult<()> {
        record.set(schema, "Efficacy", self.efficacy)?;
        Ok(())
    }

    fn config_effects(&self) -> Vec<ConfigEffect> {
        vec![ConfigEffect::set_parameter(
            "Enable_Maternal_Infection_Transmission",
            1,
        )]
    }
}

/// `OutbreakIndividual`: infect the recipient.
#[derive(Debug, Clone, PartialEq)]
pub struct OutbreakIndividual {
    pub common: Common,
    /// Days of incubation; `-1` keeps the engine's own draw.
    pub incubation_period_override: i64,
    pub ignore_immunity: Option<bool>,
}

impl OutbreakIndividual {
    pub fn new(incubation_period_override: i64) -> Self {
        Self {
            common: Common::default(),
            incubation_period_override,
            ignore_immunity: None,
        }
    }
}

impl InterventionConfig for OutbreakIndividual {
    fn class(&self) -> &'static str {
        "OutbreakIndividual"
    }

    fn common(&self) -> &Common {
        &self.common
    }

    fn common_mut(&mut self) -> &mut Common {
        &mut self.common
    }

    fn outputs(&self) -> Vec<Signal> {
        Vec::new()
    }

    fn write_fields(&self, schema: &Schema, record: &mut Record<'_>) -> SchemaResult<()> {
        record
            .set(schema, "Incubation_Period_Override", self.incubation_period_override)?
            .set_opt(schema, "Ignore_Immunity", self.ignore_immunity)?;
        Ok(())
    }
}

/// `MaleCircumcision`.
#[derive(Debug, Clone, PartialEq)]
pub struct MaleCircumcision {
    pub common: Common,
    pub reduced_acquire: f64,
    pub apply_if_higher: Option<bool>,
    /// Broadcast when the circumcision is distributed.
    pub distributed_event: Option<Signal>,
}

impl MaleCircumcision {
    pub fn new(reduced_acquire: f64) -> ValueResult<Self> {
        Ok(Self {
            common: Common::default(),
            reduced_acquire: check_probability("circumcision reduced acquire", reduced_acquire)?,
            apply_if_higher: None,
            distributed_event: None,
        })
    }

    pub fn with_distributed_event(mut self, signal: impl Into<Signal>) -> Self {
        self.distributed_event = Some(signal.into());
        self
    }
}

impl InterventionConfig for MaleCircumcision {
    fn class(&self) -> &'static str {
        "MaleCircumcision"
    }

    fn common(&self) -> &Common {
        &self.common
    }

    fn common_mut(&mut self) -> &mut Common {
        &mut self.common
    }

    fn outputs(&self) -> Vec<Signal> {
        self.distributed_event.into_iter().collect()
    }

    fn write_fields(&self, schema: &Schema, record: &mut Record<'_>) -> SchemaResult<()> {
        record
            .set(schema, "Circumcision_Reduced_Acquire", self.reduced_acquire)?
            .set_opt(schema, "Apply_If_Higher_Reduced_Acquire", self.apply_if_higher)?
            .set_opt(
                schema,
                "Distributed_Event_Trigger",
                self.distributed_event.map(Signal::as_str),
            )?;
        Ok(())
    }
}

/// `ModifyStiCoInfectionStatus`: flag or clear an STI co-infection.
#[derive(Debug, Clone, PartialEq)]
pub struct ModifyStiCoInfectionStatus {
    pub common: Common,
    pub status: bool,
}

impl ModifyStiCoInfectionStatus {
    pub fn new(status: bool) -> Self {
        Self {
            common: Common::default(),
            status,
        }
    }
}

impl InterventionConfig for ModifyStiCoInfectionStatus {
    fn class(&self) -> &'static str {
        "ModifyStiCoInfectionStatus"
    }

    fn common(&self) -> &Common {
        &self.common
    }

    fn common_mut(&mut self) -> &mut Common {
        &mut self.common
    }

    fn outputs(&self) -> Vec<Signal> {
        Vec::new()
    }

    fn write_fields(&self, schema: &Schema, record: &mut Record<'_>) -> SchemaResult<()> {
        record.set(schema, "New_STI_CoInfection_Status", self.status)?;
        Ok(())
    }
}

/// What a [`ControlledVaccine`] blocks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum VaccineType {
    #[default]
    AcquisitionBlocking,
    TransmissionBlocking,
    MortalityBlocking,
    Generic,
}

impl VaccineType {
    pub fn as_str(self) -> &'static str {
        match self {
            VaccineType::AcquisitionBlocking => "AcquisitionBlocking",
            VaccineType::TransmissionBlocking => "TransmissionBlocking",
            VaccineType::MortalityBlocking => "MortalityBlocking",
            VaccineType::Generic => "Generic",
        }
    }
}

/// Efficacy over time: full `initial_effect` for `box_duration` days.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WaningEffect {
    pub initial_effect: f64,
    pub box_duration: f64,
}

impl WaningEffect {
    pub fn boxed(initial_effect: f64, box_duration: f64) -> ValueResult<Self> {
        Ok(Self {
            initial_effect: check_probability("initial effect", initial_effect)?,
            box_duration,
        })
    }

    fn to_record(self, schema: &Schema) -> SchemaResult<Value> {
        let mut record = schema.instantiate("WaningEffectBox")?;
        record
            .set(schema, "Initial_Effect", self.initial_effect)?
            .set(schema, "Box_Duration", self.box_duration)?;
        record.finish()
    }
}

/// `ControlledVaccine`, used for PrEP.
#[derive(Debug, Clone, PartialEq)]
pub struct ControlledVaccine {
    pub common: Common,
    pub vaccine_type: VaccineType,
    pub take: f64,
    pub waning: WaningEffect,
    pub revaccination_wait: Option<f64>,
}

impl ControlledVaccine {
    pub fn new(vaccine_type: VaccineType, waning: WaningEffect) -> Self {
        Self {
            common: Common::default(),
            vaccine_type,
            take: 1.0,
            waning,
            revaccination_wait: None,
        }
    }

    pub fn with_revaccination_wait(mut self, days: f64) -> Self {
        self.revaccination_wait = Some(days);
        self
    }
}

impl InterventionConfig for ControlledVaccine {
    fn class(&self) -> &'static str {
        "ControlledVaccine"
    }

    fn common(&self) -> &Common {
        &self.common
    }

    fn common_mut(&mut self) -> &mut Common {
        &mut self.common
    }

    fn outputs(&self) -> Vec<Signal> {
        Vec::new()
    }

    fn write_fields(&self, schema: &Schema, record: &mut Record<'_>) -> SchemaResult<()> {
        record
            .set(schema, "Vaccine_Type", self.vaccine_type.as_str())?
            .set(schema, "Vaccine_Take", self.take)?
            .set(schema, "Waning_Config", self.waning.to_record(schema)?)?
            .set_opt(
                schema,
                "Duration_To_Wait_Before_Revaccination",
                self.revaccination_wait,
            )?;
        Ok(())
    }
}

/// `SetSexualDebutAge`: debut now rather than at a drawn age.
///
/// Requires the engine to take debut ages from interventions.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SetSexualDebutAge {
    pub common: Common,
    pub distributed_event: Option<Signal>,
}

impl SetSexualDebutAge {
    pub fn new() -> Self {
        Self::default()
    }
}

impl InterventionConfig for SetSexualDebutAge {
    fn class(&self) -> &'static str {
        "SetSexualDebutAge"
    }

    fn common(&self) -> &Common {
        &self.common
    }

    fn common_mut(&mut self) -> &mut Common {
        &mut self.common
    }

    fn outputs(&self) -> Vec<Signal> {
        self.distributed_event.into_iter().collect()
    }

    fn write_fields(&self, schema: &Schema, record: &mut Record<'_>) -> SchemaResult<()> {
        record.set_opt(
            schema,
            "Distributed_Event_Trigger",
            self.distributed_event.map(Signal::as_str),
        )?;
        Ok(())
    }

    fn config_effects(&self) -> Vec<ConfigEffect> {
        vec![ConfigEffect::set_parameter(
            "Sexual_Debut_Age_Setting_Type",
            json!("FROM_INTERVENTION"),
        )]
    }
}
