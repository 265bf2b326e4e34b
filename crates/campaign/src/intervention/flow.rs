//! Interventions that only route individuals: delays, broadcasts and
//! property changes.

use coc_foundation::{DelayDistribution, PropertyPair, Signal, ValueResult, check_probability};
use coc_schema::{Record, Schema, SchemaResult};

use super::{Common, InterventionConfig};

const DELAY_PREFIX: &str = "Delay_Period";

/// `HIVMuxer`: a named per-individual delay gate.
///
/// While an individual holds an active muxer of a given name, further
/// entries under that name are discarded.
#[derive(Debug, Clone, PartialEq)]
pub struct Muxer {
    pub common: Common,
    pub muxer_name: String,
    pub max_entries: i64,
    pub delay: DelayDistribution,
    pub broadcast: Signal,
}

impl Muxer {
    pub fn new(
        muxer_name: impl Into<String>,
        delay: DelayDistribution,
        broadcast: impl Into<Signal>,
    ) -> ValueResult<Self> {
        delay.validate()?;
        Ok(Self {
            common: Common::default(),
            muxer_name: muxer_name.into(),
            max_entries: 1,
            delay,
            broadcast: broadcast.into(),
        })
    }
}

impl InterventionConfig for Muxer {
    fn class(&self) -> &'static str {
        "HIVMuxer"
    }

    fn common(&self) -> &Common {
        &self.common
    }

    fn common_mut(&mut self) -> &mut Common {
        &mut self.common
    }

    fn outputs(&self) -> Vec<Signal> {
        vec![self.broadcast]
    }

    fn write_fields(&self, schema: &Schema, record: &mut Record<'_>) -> SchemaResult<()> {
        record
            .set(schema, "Muxer_Name", self.muxer_name.as_str())?
            .set(schema, "Max_Entries", self.max_entries)?
            .set_all(schema, self.delay.fields(DELAY_PREFIX))?
            .set(schema, "Broadcast_Event", self.broadcast.as_str())?;
        Ok(())
    }
}

/// `BroadcastEvent`: raise a signal immediately.
#[derive(Debug, Clone, PartialEq)]
pub struct BroadcastEvent {
    pub common: Common,
    pub signal: Signal,
}

impl BroadcastEvent {
    pub fn new(signal: impl Into<Signal>) -> Self {
        Self {
            common: Common::default(),
            signal: signal.into(),
        }
    }
}

impl InterventionConfig for BroadcastEvent {
    fn class(&self) -> &'static str {
        "BroadcastEvent"
    }

    fn common(&self) -> &Common {
        &self.common
    }

    fn common_mut(&mut self) -> &mut Common {
        &mut self.common
    }

    fn outputs(&self) -> Vec<Signal> {
        vec![self.signal]
    }

    fn write_fields(&self, schema: &Schema, record: &mut Record<'_>) -> SchemaResult<()> {
        record.set(schema, "Broadcast_Event", self.signal.as_str())?;
        Ok(())
    }
}

/// `HIVDelayedIntervention`: raise a signal after a drawn delay, with an
/// optional expiry signal. Unlike [`Muxer`] it does not deduplicate.
#[derive(Debug, Clone, PartialEq)]
pub struct DelayedBroadcast {
    pub common: Common,
    pub delay: DelayDistribution,
    pub broadcast: Signal,
    pub on_expiration: Option<Signal>,
    pub expiration_period: Option<f64>,
}

impl DelayedBroadcast {
    pub fn new(delay: DelayDistribution, broadcast: impl Into<Signal>) -> ValueResult<Self> {
        delay.validate()?;
        Ok(Self {
            common: Common::default(),
            delay,
            broadcast: broadcast.into(),
            on_expiration: None,
            expiration_period: None,
        })
    }

    /// Raise `signal` instead if the delay outlasts `period` days.
    pub fn expiring(mut self, period: f64, signal: impl Into<Signal>) -> Self {
        self.expiration_period = Some(period);
        self.on_expiration = Some(signal.into());
        self
    }
}

impl InterventionConfig for DelayedBroadcast {
    fn class(&self) -> &'static str {
        "HIVDelayedIntervention"
    }

    fn common(&self) -> &Common {
        &self.common
    }

    fn common_mut(&mut self) -> &mut Common {
        &mut self.common
    }

    fn outputs(&self) -> Vec<Signal> {
        let mut out = vec![self.broadcast];
        out.extend(self.on_expiration);
        out
    }

    fn write_fields(&self, schema: &Schema, record: &mut Record<'_>) -> SchemaResult<()> {
        record
            .set_all(schema, self.delay.fields(DELAY_PREFIX))?
            .set(schema, "Broadcast_Event", self.broadcast.as_str())?
            .set_opt(
                schema,
                "Broadcast_On_Expiration_Event",
                self.on_expiration.map(Signal::as_str),
            )?
            .set_opt(schema, "Expiration_Period", self.expiration_period)?;
        Ok(())
    }
}

/// `PropertyValueChanger`: move the individual to a new property value.
#[derive(Debug, Clone, PartialEq)]
pub struct PropertyValueChanger {
    pub common: Common,
    pub target: PropertyPair,
    pub daily_probability: f64,
    pub maximum_duration: Option<f64>,
    pub revert: Option<f64>,
}

impl PropertyValueChanger {
    pub fn new(target: PropertyPair) -> Self {
        Self {
            common: Common::default(),
            target,
            daily_probability: 1.0,
            maximum_duration: None,
            revert: None,
        }
    }

    pub fn with_daily_probability(mut self, p: f64) -> ValueResult<Self> {
        self.daily_probability = check_probability("daily probability", p)?;
        Ok(self)
    }

    /// Return to the previous value after `days`.
    pub fn reverting_after(mut self, days: f64) -> Self {
        self.revert = Some(days);
        self
    }
}

impl InterventionConfig for PropertyValueChanger {
    fn class(&self) -> &'static str {
        "PropertyValueChanger"
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
            .set(schema, "Target_Property_Key", self.target.key.as_str())?
            .set(schema, "Target_Property_Value", self.target.value.as_str())?
            .set(schema, "Daily_Probability", self.daily_probability)?
            .set_opt(schema, "Maximum_Duration", self.maximum_duration)?
            .set_opt(schema, "Revert", self.revert)?;
        Ok(())
    }

    fn assigned_properties(&self) -> Vec<PropertyPair> {
        vec![self.target.clone()]
    }
}
