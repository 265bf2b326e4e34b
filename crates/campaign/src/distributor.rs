//! Distributors
//!
//! Four ways to hand interventions to individuals, each appending exactly
//! one event to the campaign:
//!
//! - [`Campaign::add_scheduled`]: once (or repeatedly) at a start year
//! - [`Campaign::add_triggered`]: whenever a listened-for signal fires
//! - [`Campaign::add_reference_tracked`]: top up coverage of a tracked
//!   attribute towards a time-varying target
//! - [`Campaign::add_nchooser`]: exact counts per age band and year
//!
//! Several interventions in one request are wrapped in a
//! `MultiInterventionDistributor`. Schema failures are reported with the
//! event name attached.

use coc_foundation::{
    DelayDistribution, PropertyRestrictions, Signal, ValueMap, ValueResult,
};
use coc_schema::{Schema, SchemaResult};
use serde_json::Value;

use crate::campaign::{Campaign, CampaignEvent, CoordinatorKind};
use crate::coordinator::{
    DiseaseState, NChooserTable, NodeSet, Targeting, TargetingLogic, TargetingScope,
};
use crate::intervention::{Intervention, InterventionConfig};
use crate::{CampaignError, CampaignResult, ResultExt};

const SIDEC: &str = "StandardInterventionDistributionEventCoordinator";

/// Repeat a scheduled distribution.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Repetitions {
    /// Number of distributions; `-1` repeats forever.
    pub count: i64,
    pub interval_days: f64,
}

/// A distribution at a fixed start year.
#[derive(Debug, Clone)]
pub struct Scheduled {
    pub event_name: String,
    pub start_year: f64,
    pub interventions: Vec<Intervention>,
    pub targeting: Targeting,
    pub nodes: NodeSet,
    pub repetitions: Option<Repetitions>,
}

impl Scheduled {
    pub fn new(
        event_name: impl Into<String>,
        start_year: f64,
        interventions: Vec<Intervention>,
    ) -> Self {
        Self {
            event_name: event_name.into(),
            start_year,
            interventions,
            targeting: Targeting::default(),
            nodes: NodeSet::All,
            repetitions: None,
        }
    }

    pub fn with_targeting(mut self, targeting: Targeting) -> Self {
        self.targeting = targeting;
        self
    }

    pub fn on_nodes(mut self, nodes: NodeSet) -> Self {
        self.nodes = nodes;
        self
    }

    pub fn repeating(mut self, count: i64, interval_days: f64) -> Self {
        self.repetitions = Some(Repetitions {
            count,
            interval_days,
        });
        self
    }
}

/// A distribution to individuals raising one of `triggers`.
#[derive(Debug, Clone)]
pub struct Triggered {
    pub event_name: String,
    pub start_year: f64,
    pub triggers: Vec<Signal>,
    pub interventions: Vec<Intervention>,
    pub targeting: Targeting,
    pub nodes: NodeSet,
    /// Run the interventions after a drawn delay.
    pub delay: Option<DelayDistribution>,
    /// Days the listener stays active; `None` listens forever.
    pub duration: Option<f64>,
}

impl Triggered {
    pub fn new(
        event_name: impl Into<String>,
        start_year: f64,
        triggers: Vec<Signal>,
        interventions: Vec<Intervention>,
    ) -> Self {
        Self {
            event_name: event_name.into(),
            start_year,
            triggers,
            interventions,
            targeting: Targeting::default(),
            nodes: NodeSet::All,
            delay: None,
            duration: None,
        }
    }

    pub fn with_targeting(mut self, targeting: Targeting) -> Self {
        self.targeting = targeting;
        self
    }

    pub fn on_nodes(mut self, nodes: NodeSet) -> Self {
        self.nodes = nodes;
        self
    }

    pub fn with_delay(mut self, delay: DelayDistribution) -> ValueResult<Self> {
        delay.validate()?;
        self.delay = Some(delay);
        Ok(self)
    }

    pub fn lasting(mut self, days: f64) -> Self {
        self.duration = Some(days);
        self
    }
}

/// Distribute until coverage of `tracking` reaches the target in `map`.
#[derive(Debug, Clone)]
pub struct ReferenceTracked {
    pub event_name: String,
    pub start_year: f64,
    pub end_year: f64,
    pub interventions: Vec<Intervention>,
    /// Target coverage by year.
    pub map: ValueMap,
    /// Attribute whose coverage is tracked.
    pub tracking: TargetingLogic,
    /// Extra filter on who is eligible.
    pub targeting_logic: Option<TargetingLogic>,
    /// Days between coverage checks.
    pub update_period: f64,
    /// Gender, age and property filters; coverage is not used.
    pub targeting: Targeting,
    pub nodes: NodeSet,
}

impl ReferenceTracked {
    pub fn new(
        event_name: impl Into<String>,
        start_year: f64,
        interventions: Vec<Intervention>,
        map: ValueMap,
        tracking: TargetingLogic,
    ) -> ValueResult<Self> {
        map.check_range("target coverage", 0.0, 1.0)?;
        Ok(Self {
            event_name: event_name.into(),
            start_year,
            end_year: 2200.0,
            interventions,
            map,
            tracking,
            targeting_logic: None,
            update_period: 365.0,
            targeting: Targeting::default(),
            nodes: NodeSet::All,
        })
    }

    pub fn with_targeting(mut self, targeting: Targeting) -> Self {
        self.targeting = targeting;
        self
    }

    pub fn with_targeting_logic(mut self, logic: TargetingLogic) -> Self {
        self.targeting_logic = Some(logic);
        self
    }

    pub fn with_update_period(mut self, days: f64) -> Self {
        self.update_period = days;
        self
    }

    pub fn until(mut self, end_year: f64) -> Self {
        self.end_year = end_year;
        self
    }

    pub fn on_nodes(mut self, nodes: NodeSet) -> Self {
        self.nodes = nodes;
        self
    }
}

/// Exact counts per age band and year.
#[derive(Debug, Clone)]
pub struct NChooser {
    pub event_name: String,
    pub interventions: Vec<Intervention>,
    pub table: NChooserTable,
    /// Outer OR of inner AND terms.
    pub disease_state: Vec<Vec<DiseaseState>>,
    /// Intervention name checked by `Has_Intervention` terms.
    pub has_intervention: Option<String>,
    pub restrictions: PropertyRestrictions,
    pub nodes: NodeSet,
}

impl NChooser {
    pub fn new(
        event_name: impl Into<String>,
        interventions: Vec<Intervention>,
        table: NChooserTable,
    ) -> Self {
        Self {
            event_name: event_name.into(),
            interventions,
            table,
            disease_state: Vec::new(),
            has_intervention: None,
            restrictions: PropertyRestrictions::None,
            nodes: NodeSet::All,
        }
    }

    pub fn with_disease_state(
        mut self,
        disease_state: Vec<Vec<DiseaseState>>,
        has_intervention: Option<String>,
    ) -> Self {
        self.disease_state = disease_state;
        self.has_intervention = has_intervention;
        self
    }

    pub fn restricted_to(mut self, restrictions: PropertyRestrictions) -> Self {
        self.restrictions = restrictions;
        self
    }

    pub fn on_nodes(mut self, nodes: NodeSet) -> Self {
        self.nodes = nodes;
        self
    }
}

/// One intervention as is, several in a `MultiInterventionDistributor`.
fn intervention_config(schema: &Schema, interventions: &[Intervention]) -> SchemaResult<Value> {
    if let [single] = interventions {
        return single.to_json(schema);
    }
    let list = interventions
        .iter()
        .map(|i| i.to_json(schema))
        .collect::<SchemaResult<Vec<_>>>()?;
    let mut record = schema.instantiate("MultiInterventionDistributor")?;
    record.set(schema, "Intervention_List", list)?;
    record.finish()
}

/// Run `interventions` after a drawn delay.
fn delayed_config(
    schema: &Schema,
    delay: &DelayDistribution,
    interventions: &[Intervention],
) -> SchemaResult<Value> {
    let list = interventions
        .iter()
        .map(|i| i.to_json(schema))
        .collect::<SchemaResult<Vec<_>>>()?;
    let mut record = schema.instantiate("DelayedIntervention")?;
    record
        .set_all(schema, delay.fields("Delay_Period"))?
        .set(schema, "Actual_IndividualIntervention_Configs", list)?;
    record.finish()
}

fn check_request(name: &str, start_year: f64, interventions: &[Intervention]) -> CampaignResult<()> {
    if name.is_empty() {
        return Err(CampaignError::argument("event name must not be empty"));
    }
    if !start_year.is_finite() {
        return Err(CampaignError::argument(format!(
            "start year {start_year} is not finite"
        )));
    }
    if interventions.is_empty() {
        return Err(CampaignError::argument("no interventions to distribute"));
    }
    Ok(())
}

impl Campaign {
    pub fn add_scheduled(&mut self, request: Scheduled) -> CampaignResult<()> {
        let name = request.event_name.clone();
        self.scheduled_event(request).in_event(&name)
    }

    fn scheduled_event(&mut self, request: Scheduled) -> CampaignResult<()> {
        check_request(&request.event_name, request.start_year, &request.interventions)?;
        let schema = self.schema();
        let mut coordinator = schema.instantiate(SIDEC)?;
        request
            .targeting
            .write(schema, &mut coordinator, TargetingScope::Full)?;
        if let Some(reps) = request.repetitions {
            if reps.count == 0 || reps.count < -1 {
                return Err(CampaignError::argument(format!(
                    "repetition count {} must be positive or -1",
                    reps.count
                )));
            }
            coordinator
                .set(schema, "Number_Repetitions", reps.count)?
                .set(schema, "Timesteps_Between_Repetitions", reps.interval_days)?;
        }
        coordinator.set(
            schema,
            "Intervention_Config",
            intervention_config(schema, &request.interventions)?,
        )?;
        let record = self.event_record(
            &request.event_name,
            request.start_year,
            &request.nodes,
            coordinator.finish()?,
        )?;
        self.push_event(CampaignEvent::new(
            request.event_name,
            request.start_year,
            CoordinatorKind::Scheduled,
            Vec::new(),
            request.targeting.restrictions,
            request.nodes,
            request.interventions,
            record,
        ))
    }

    pub fn add_triggered(&mut self, request: Triggered) -> CampaignResult<()> {
        let name = request.event_name.clone();
        self.triggered_event(request).in_event(&name)
    }

    fn triggered_event(&mut self, request: Triggered) -> CampaignResult<()> {
        check_request(&request.event_name, request.start_year, &request.interventions)?;
        if request.triggers.is_empty() {
            return Err(CampaignError::argument("triggered event listens for no signal"));
        }
        let schema = self.schema();
        let actual = match &request.delay {
            Some(delay) => delayed_config(schema, delay, &request.interventions)?,
            None => intervention_config(schema, &request.interventions)?,
        };
        let triggers: Vec<&str> = request.triggers.iter().map(|s| s.as_str()).collect();
        let mut listener = schema.instantiate("NodeLevelHealthTriggeredIV")?;
        listener.set(schema, "Trigger_Condition_List", triggers)?;
        request
            .targeting
            .write(schema, &mut listener, TargetingScope::Full)?;
        listener
            .set(schema, "Duration", request.duration.unwrap_or(-1.0))?
            .set(schema, "Actual_IndividualIntervention_Config", actual)?;

        let mut coordinator = schema.instantiate(SIDEC)?;
        coordinator.set(schema, "Intervention_Config", listener.finish()?)?;
        let record = self.event_record(
            &request.event_name,
            request.start_year,
            &request.nodes,
            coordinator.finish()?,
        )?;
        self.push_event(CampaignEvent::new(
            request.event_name,
            request.start_year,
            CoordinatorKind::Triggered,
            request.triggers,
            request.targeting.restrictions,
            request.nodes,
            request.interventions,
            record,
        ))
    }

    pub fn add_reference_tracked(&mut self, request: ReferenceTracked) -> CampaignResult<()> {
        let name = request.event_name.clone();
        self.reference_tracked_event(request).in_event(&name)
    }

    fn reference_tracked_event(&mut self, request: ReferenceTracked) -> CampaignResult<()> {
        check_request(&request.event_name, request.start_year, &request.interventions)?;
        if request.end_year <= request.start_year {
            return Err(CampaignError::argument(format!(
                "end year {} is not after start year {}",
                request.end_year, request.start_year
            )));
        }
        if !request.update_period.is_finite() || request.update_period <= 0.0 {
            return Err(CampaignError::argument(format!(
                "update period {} must be positive",
                request.update_period
            )));
        }
        let schema = self.schema();
        let mut coordinator =
            schema.instantiate("ReferenceTrackingEventCoordinatorTrackingConfig")?;
        coordinator
            .set(schema, "Time_Value_Map", request.map.to_json())?
            .set(schema, "Update_Period", request.update_period)?
            .set(schema, "End_Year", request.end_year)?;
        request
            .targeting
            .write(schema, &mut coordinator, TargetingScope::Tracked)?;
        if let Some(logic) = &request.targeting_logic {
            coordinator.set(schema, "Targeting_Config", logic.to_record(schema)?)?;
        }
        coordinator
            .set(schema, "Tracking_Config", request.tracking.to_record(schema)?)?
            .set(
                schema,
                "Intervention_Config",
                intervention_config(schema, &request.interventions)?,
            )?;
        let record = self.event_record(
            &request.event_name,
            request.start_year,
            &request.nodes,
            coordinator.finish()?,
        )?;
        self.push_event(CampaignEvent::new(
            request.event_name,
            request.start_year,
            CoordinatorKind::ReferenceTracked,
            Vec::new(),
            request.targeting.restrictions,
            request.nodes,
            request.interventions,
            record,
        ))
    }

    pub fn add_nchooser(&mut self, request: NChooser) -> CampaignResult<()> {
        let name = request.event_name.clone();
        self.nchooser_event(request).in_event(&name)
    }

    fn nchooser_event(&mut self, request: NChooser) -> CampaignResult<()> {
        let start_year = request.table.first_year();
        check_request(&request.event_name, start_year, &request.interventions)?;
        let mentions_intervention = request
            .disease_state
            .iter()
            .flatten()
            .any(|s| matches!(s, DiseaseState::HasIntervention | DiseaseState::NotHaveIntervention));
        if mentions_intervention && request.has_intervention.is_none() {
            return Err(CampaignError::argument(
                "disease state filters on an intervention but names none",
            ));
        }
        let schema = self.schema();
        let states: Vec<Vec<&str>> = request
            .disease_state
            .iter()
            .map(|group| group.iter().map(|s| s.as_str()).collect())
            .collect();
        let mut coordinator = schema.instantiate("NChooserEventCoordinatorHIV")?;
        coordinator.set(
            schema,
            "Distributions",
            request.table.distributions(&request.restrictions),
        )?;
        if !states.is_empty() {
            coordinator.set(schema, "Target_Disease_State", states)?;
        }
        coordinator
            .set_opt(
                schema,
                "Target_Disease_State_Has_Intervention_Name",
                request.has_intervention.clone(),
            )?
            .set(
                schema,
                "Intervention_Config",
                intervention_config(schema, &request.interventions)?,
            )?;
        let record = self.event_record(
            &request.event_name,
            start_year,
            &request.nodes,
            coordinator.finish()?,
        )?;
        self.push_event(CampaignEvent::new(
            request.event_name,
            start_year,
            CoordinatorKind::NChooser,
            Vec::new(),
            request.restrictions,
            request.nodes,
            request.interventions,
            record,
        ))
    }
}
