//! Campaign aggregator
//!
//! A [`Campaign`] is threaded through every builder as `&mut Campaign`. It
//! owns the emitted events in order, the base year, the signal ledger and
//! the engine-config effects. Events are write-once: after a distributor
//! appends one, nothing changes it.
//!
//! [`Campaign::finalize`] validates the whole campaign, applies the config
//! effects and returns the `{"Events": [...]}` artifact.

use std::sync::Arc;

use coc_foundation::{DAYS_PER_YEAR, PropertyRestrictions, Signal};
use coc_schema::{Schema, SchemaResult};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing::{debug, info};

use crate::artifact::CampaignArtifact;
use crate::coordinator::NodeSet;
use crate::effects::{ConfigEffect, EffectSet};
use crate::intervention::{Intervention, InterventionConfig};
use crate::ledger::SignalLedger;
use crate::validate::{ValidationOptions, ValidationReport, validate};
use crate::{CampaignResult, ResultExt};

/// How event start times are written.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimeAxis {
    /// `CampaignEventByYear` with `Start_Year`.
    #[default]
    Year,
    /// `CampaignEvent` with `Start_Day` counted from the base year.
    Day,
}

/// Coordinator family of an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CoordinatorKind {
    Scheduled,
    Triggered,
    ReferenceTracked,
    NChooser,
}

/// An emitted event with the facts validation and analysis need.
#[derive(Debug, Clone)]
pub struct CampaignEvent {
    pub name: String,
    pub start_year: f64,
    pub kind: CoordinatorKind,
    /// Signals the event listens for (triggered events only).
    pub triggers: Vec<Signal>,
    pub restrictions: PropertyRestrictions,
    pub nodes: NodeSet,
    pub interventions: Vec<Intervention>,
    record: Value,
}

impl CampaignEvent {
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn new(
        name: String,
        start_year: f64,
        kind: CoordinatorKind,
        triggers: Vec<Signal>,
        restrictions: PropertyRestrictions,
        nodes: NodeSet,
        interventions: Vec<Intervention>,
        record: Value,
    ) -> Self {
        Self {
            name,
            start_year,
            kind,
            triggers,
            restrictions,
            nodes,
            interventions,
            record,
        }
    }

    /// The engine event record.
    pub fn record(&self) -> &Value {
        &self.record
    }

    /// Signals this event's interventions can raise.
    pub fn outputs(&self) -> Vec<Signal> {
        let mut out: Vec<Signal> = Vec::new();
        for signal in self.interventions.iter().flat_map(|i| i.outputs()) {
            if !out.contains(&signal) {
                out.push(signal);
            }
        }
        out
    }
}

/// The campaign under construction.
#[derive(Debug, Clone)]
pub struct Campaign {
    schema: Arc<Schema>,
    base_year: f64,
    time_axis: TimeAxis,
    events: Vec<CampaignEvent>,
    ledger: SignalLedger,
    effects: EffectSet,
}

impl Campaign {
    pub fn new(schema: Arc<Schema>, base_year: f64) -> Self {
        Self {
            schema,
            base_year,
            time_axis: TimeAxis::default(),
            events: Vec::new(),
            ledger: SignalLedger::default(),
            effects: EffectSet::default(),
        }
    }

    pub fn with_time_axis(mut self, axis: TimeAxis) -> Self {
        self.time_axis = axis;
        self
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn base_year(&self) -> f64 {
        self.base_year
    }

    pub fn time_axis(&self) -> TimeAxis {
        self.time_axis
    }

    pub fn events(&self) -> &[CampaignEvent] {
        &self.events
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Events whose name starts with `prefix`.
    pub fn events_named<'a>(&'a self, prefix: &'a str) -> impl Iterator<Item = &'a CampaignEvent> {
        self.events.iter().filter(move |e| e.name.starts_with(prefix))
    }

    pub fn signal_report(&self) -> &SignalLedger {
        &self.ledger
    }

    pub fn effects(&self) -> &EffectSet {
        &self.effects
    }

    /// Record an engine-config effect to apply at finalization.
    pub fn add_effect(&mut self, effect: ConfigEffect) -> CampaignResult<()> {
        self.effects.add(effect)
    }

    /// `round((year - base_year) * 365)`.
    pub fn start_day(&self, year: f64) -> f64 {
        ((year - self.base_year) * DAYS_PER_YEAR).round()
    }

    /// The start time an event at `year` is emitted with on this time axis.
    pub fn timestep(&self, year: f64) -> f64 {
        match self.time_axis {
            TimeAxis::Year => year,
            TimeAxis::Day => self.start_day(year),
        }
    }

    /// Wrap a coordinator record into an engine event record.
    pub(crate) fn event_record(
        &self,
        name: &str,
        start_year: f64,
        nodes: &NodeSet,
        coordinator: Value,
    ) -> SchemaResult<Value> {
        let schema = &*self.schema;
        let mut record = match self.time_axis {
            TimeAxis::Year => {
                let mut record = schema.instantiate("CampaignEventByYear")?;
                record.set(schema, "Start_Year", start_year)?;
                record
            }
            TimeAxis::Day => {
                let mut record = schema.instantiate("CampaignEvent")?;
                record.set(schema, "Start_Day", self.start_day(start_year))?;
                record
            }
        };
        record
            .set(schema, "Event_Name", name)?
            .set(schema, "Nodeset_Config", nodes.to_record(schema)?)?
            .set(schema, "Event_Coordinator_Config", coordinator)?;
        record.finish()
    }

    /// Append a fully built event.
    pub(crate) fn push_event(&mut self, event: CampaignEvent) -> CampaignResult<()> {
        for intervention in &event.interventions {
            for effect in intervention.config_effects() {
                self.effects.add(effect).in_event(&event.name)?;
            }
        }
        for signal in &event.triggers {
            self.ledger.record_consumer(*signal, &event.name);
        }
        for signal in event.outputs() {
            self.ledger.record_producer(signal, &event.name);
        }
        debug!(
            event = %event.name,
            start_year = event.start_year,
            kind = ?event.kind,
            interventions = event.interventions.len(),
            "event emitted"
        );
        self.events.push(event);
        Ok(())
    }

    /// The `{"Events": [...]}` document.
    pub fn to_json(&self) -> Value {
        json!({
            "Events": self.events.iter().map(|e| e.record.clone()).collect::<Vec<_>>()
        })
    }

    /// Run post-emission validation without finalizing.
    pub fn validate(&self, options: &ValidationOptions<'_>) -> ValidationReport {
        validate(self, options)
    }

    /// Every config effect finalization applies, custom-event registration
    /// first.
    pub fn config_effects(&self) -> Vec<ConfigEffect> {
        let custom: Vec<String> = self
            .ledger
            .custom_signals()
            .into_iter()
            .map(|s| s.as_str().to_string())
            .collect();
        let mut effects = Vec::with_capacity(self.effects.len() + 1);
        if !custom.is_empty() {
            effects.push(ConfigEffect::RegisterCustomEvents(custom));
        }
        effects.extend(self.effects.iter().cloned());
        effects
    }

    /// Validate, apply config effects and produce the artifact.
    ///
    /// On error the engine config is left untouched.
    pub fn finalize(
        &self,
        config: &mut Value,
        options: &ValidationOptions<'_>,
    ) -> CampaignResult<CampaignArtifact> {
        let report = self.validate(options);
        report.log();
        self.emit(config, &report)
    }

    /// Apply config effects and produce the artifact for an already
    /// validated campaign. Fails without touching `config` if `report`
    /// carries errors.
    pub fn emit(
        &self,
        config: &mut Value,
        report: &ValidationReport,
    ) -> CampaignResult<CampaignArtifact> {
        report.check()?;

        let mut updated = config.clone();
        for effect in self.config_effects() {
            effect.apply(&mut updated)?;
        }
        *config = updated;

        info!(
            events = self.events.len(),
            signals = self.ledger.len(),
            warnings = report.warnings().count(),
            "campaign finalized"
        );
        Ok(CampaignArtifact::new(self.to_json()))
    }
}
