//! Post-emission validation
//!
//! Runs over a complete [`Campaign`] and reports problems that no single
//! distributor call can see on its own.
//!
//! # Checks
//!
//! - **Wiring**: every custom signal an event listens for is raised by
//!   some emitted intervention.
//! - **Property ordering**: an event filtering on a property value starts
//!   after the first event that assigns it. Values the demographics declare
//!   are exempt, except cascade states, which only the campaign assigns.
//! - **State gates**: every intervention that moves an individual into a
//!   cascade state refuses at least that state's entry disqualifiers.
//! - **Record shape**: time-value maps have equal-length, non-decreasing
//!   times; random-choice probabilities sum to one.
//! - **Dangling restrictions**: property restrictions name properties the
//!   demographics declare (needs a [`PropertyCatalog`]).
//! - **Dead signals** and **untested paths**, from the signal graph.
//!
//! # Errors vs warnings
//!
//! Dangling restrictions, dead signals and untested paths are warnings;
//! strict mode promotes dangling restrictions to errors. Everything else is
//! an error and makes [`ValidationReport::check`] fail.

use coc_foundation::{CascadeState, CustomSignal, PropertyPair, Signal};
use serde_json::Value;
use tracing::warn;

use crate::analysis::SignalGraph;
use crate::campaign::Campaign;
use crate::intervention::InterventionConfig;
use crate::{CampaignError, CampaignResult};

/// Tolerance on the sum of random-choice probabilities.
pub const PROBABILITY_TOLERANCE: f64 = 1e-7;

/// Source of the individual properties the population declares.
pub trait PropertyCatalog {
    /// Whether `pair` names a declared key and one of its values.
    fn declares(&self, pair: &PropertyPair) -> bool;
}

/// Knobs for [`validate`].
#[derive(Clone, Copy, Default)]
pub struct ValidationOptions<'a> {
    /// Promote dangling restrictions to errors.
    pub strict: bool,
    /// Declared properties; dangling restrictions are only checked when set.
    pub catalog: Option<&'a dyn PropertyCatalog>,
}

impl<'a> ValidationOptions<'a> {
    pub fn strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    pub fn with_catalog(mut self, catalog: &'a dyn PropertyCatalog) -> Self {
        self.catalog = Some(catalog);
        self
    }
}

/// Issue codes for filtering and tooling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IssueCode {
    /// A custom signal is listened for but nothing raises it.
    ///
    /// The listening event can never fire. Usually a state builder was
    /// skipped or a signal name was mistyped.
    UnproducedSignal,

    /// An event filters on a property value before any event assigns it.
    ///
    /// Assignments must start at an earlier time, or at the same time in
    /// an earlier event.
    PropertyOrdering,

    /// An intervention moves individuals into a cascade state without
    /// refusing the states downstream of it.
    ///
    /// Without the disqualifier an individual further along the pathway
    /// could be pulled back by a stale trigger.
    MissingDisqualifier,

    /// A time-value map has unequal lengths or decreasing times.
    MalformedValueMap,

    /// Random-choice probabilities do not sum to one.
    ProbabilitySum,

    /// A property restriction names a property the demographics never
    /// declare.
    ///
    /// The event compiles but never targets anyone.
    DanglingRestriction,

    /// A custom signal is raised but nothing listens for it.
    DeadSignal,

    /// A path from sexual debut to treatment passes no HIV test.
    UntestedPath,
}

impl IssueCode {
    fn error_kind(self, message: String) -> CampaignError {
        match self {
            IssueCode::UnproducedSignal | IssueCode::MissingDisqualifier => {
                CampaignError::Wiring(message)
            }
            IssueCode::PropertyOrdering => CampaignError::Ordering(message),
            IssueCode::DanglingRestriction => CampaignError::DanglingRestriction(message),
            IssueCode::MalformedValueMap
            | IssueCode::ProbabilitySum
            | IssueCode::DeadSignal
            | IssueCode::UntestedPath => CampaignError::Argument(message),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Error,
    Warning,
}

/// One validation finding.
#[derive(Debug, Clone)]
pub struct ValidationIssue {
    pub code: IssueCode,
    pub severity: Severity,
    pub message: String,
    /// Event the issue was found in, if it belongs to one.
    pub event: Option<String>,
}

/// Every issue found by [`validate`], in check order.
#[derive(Debug, Clone, Default)]
pub struct ValidationReport {
    issues: Vec<ValidationIssue>,
}

impl ValidationReport {
    fn push(
        &mut self,
        code: IssueCode,
        severity: Severity,
        message: String,
        event: Option<&str>,
    ) {
        self.issues.push(ValidationIssue {
            code,
            severity,
            message,
            event: event.map(str::to_string),
        });
    }

    pub fn issues(&self) -> &[ValidationIssue] {
        &self.issues
    }

    pub fn errors(&self) -> impl Iterator<Item = &ValidationIssue> {
        self.issues.iter().filter(|i| i.severity == Severity::Error)
    }

    pub fn warnings(&self) -> impl Iterator<Item = &ValidationIssue> {
        self.issues.iter().filter(|i| i.severity == Severity::Warning)
    }

    pub fn has_errors(&self) -> bool {
        self.errors().next().is_some()
    }

    /// Issues with the given code.
    pub fn with_code(&self, code: IssueCode) -> impl Iterator<Item = &ValidationIssue> {
        self.issues.iter().filter(move |i| i.code == code)
    }

    pub fn log(&self) {
        for issue in &self.issues {
            match &issue.event {
                Some(event) => warn!(
                    code = ?issue.code,
                    severity = ?issue.severity,
                    event = %event,
                    "{}",
                    issue.message
                ),
                None => warn!(code = ?issue.code, severity = ?issue.severity, "{}", issue.message),
            }
        }
    }

    /// Fail with the first error, wrapped in its event.
    pub fn check(&self) -> CampaignResult<()> {
        let Some(issue) = self.errors().next() else {
            return Ok(());
        };
        let error = issue.code.error_kind(issue.message.clone());
        Err(match &issue.event {
            Some(event) => CampaignError::InEvent {
                event: event.clone(),
                source: Box::new(error),
            },
            None => error,
        })
    }
}

/// Validate a campaign.
///
/// Issues are collected, not raised; call [`ValidationReport::check`] to
/// turn the first error into a [`CampaignError`].
pub fn validate(campaign: &Campaign, options: &ValidationOptions<'_>) -> ValidationReport {
    let mut report = ValidationReport::default();

    check_wiring(campaign, &mut report);
    check_property_ordering(campaign, options.catalog, &mut report);
    check_state_gates(campaign, &mut report);
    check_record_shapes(campaign, &mut report);
    if let Some(catalog) = options.catalog {
        check_dangling_restrictions(campaign, catalog, options.strict, &mut report);
    }
    check_graph(campaign, &mut report);

    report
}

fn check_wiring(campaign: &Campaign, report: &mut ValidationReport) {
    for (signal, usage) in campaign.signal_report().unproduced() {
        let listener = usage.consumers.first().map(String::as_str);
        report.push(
            IssueCode::UnproducedSignal,
            Severity::Error,
            format!(
                "signal '{signal}' is listened for by {} event(s) but never raised",
                usage.consumers.len()
            ),
            listener,
        );
    }
}

fn check_property_ordering(
    campaign: &Campaign,
    catalog: Option<&dyn PropertyCatalog>,
    report: &mut ValidationReport,
) {
    let initial = |pair: &PropertyPair| {
        CascadeState::from_property(pair).is_none()
            && catalog.is_some_and(|c| c.declares(pair))
    };
    let events = campaign.events();
    let mut setters: Vec<(PropertyPair, usize)> = Vec::new();
    for (index, event) in events.iter().enumerate() {
        for pair in event.interventions.iter().flat_map(|i| i.sets_properties()) {
            if initial(&pair) {
                continue;
            }
            if !setters.iter().any(|(p, _)| *p == pair) {
                setters.push((pair, index));
            }
        }
    }

    for filter in events {
        for (pair, first) in &setters {
            if !filter.restrictions.mentions(pair) {
                continue;
            }
            let setter = &events[*first];
            let (set_at, filter_at) = (
                campaign.timestep(setter.start_year),
                campaign.timestep(filter.start_year),
            );
            // Same-timestep dependencies are refused whatever the event order.
            if set_at >= filter_at {
                report.push(
                    IssueCode::PropertyOrdering,
                    Severity::Error,
                    format!(
                        "filters on '{pair}' from {filter_at} but '{}' first assigns it from {set_at}",
                        setter.name
                    ),
                    Some(&filter.name),
                );
            }
        }
    }
}

fn check_state_gates(campaign: &Campaign, report: &mut ValidationReport) {
    for event in campaign.events() {
        for intervention in &event.interventions {
            let Some(state) = intervention.cascade_state() else {
                continue;
            };
            let disqualifying = &intervention.common().disqualifying;
            let missing: Vec<String> = state
                .entry_disqualifiers()
                .iter()
                .map(|s| s.property())
                .filter(|p| !disqualifying.contains(p))
                .map(|p| p.to_string())
                .collect();
            if !missing.is_empty() {
                report.push(
                    IssueCode::MissingDisqualifier,
                    Severity::Error,
                    format!(
                        "{} entering {state} does not refuse {}",
                        intervention.class(),
                        missing.join(", ")
                    ),
                    Some(&event.name),
                );
            }
        }
    }
}

fn check_record_shapes(campaign: &Campaign, report: &mut ValidationReport) {
    for event in campaign.events() {
        walk_record(event.record(), &event.name, report);
    }
}

fn walk_record(value: &Value, event: &str, report: &mut ValidationReport) {
    match value {
        Value::Object(map) => {
            if let (Some(Value::Array(times)), Some(Value::Array(values))) =
                (map.get("Times"), map.get("Values"))
            {
                check_value_map(times, values, event, report);
            }
            if let Some(Value::Array(probabilities)) = map.get("Choice_Probabilities") {
                let sum: f64 = probabilities.iter().filter_map(Value::as_f64).sum();
                if (sum - 1.0).abs() >= PROBABILITY_TOLERANCE {
                    report.push(
                        IssueCode::ProbabilitySum,
                        Severity::Error,
                        format!("choice probabilities sum to {sum}"),
                        Some(event),
                    );
                }
            }
            for child in map.values() {
                walk_record(child, event, report);
            }
        }
        Value::Array(items) => {
            for item in items {
                walk_record(item, event, report);
            }
        }
        _ => {}
    }
}

fn check_value_map(times: &[Value], values: &[Value], event: &str, report: &mut ValidationReport) {
    if times.len() != values.len() {
        report.push(
            IssueCode::MalformedValueMap,
            Severity::Error,
            format!(
                "time-value map has {} times but {} values",
                times.len(),
                values.len()
            ),
            Some(event),
        );
        return;
    }
    let times: Vec<f64> = times.iter().filter_map(Value::as_f64).collect();
    if let Some(pair) = times.windows(2).find(|w| w[1] < w[0]) {
        report.push(
            IssueCode::MalformedValueMap,
            Severity::Error,
            format!("time-value map time {} follows {}", pair[1], pair[0]),
            Some(event),
        );
    }
}

fn check_dangling_restrictions(
    campaign: &Campaign,
    catalog: &dyn PropertyCatalog,
    strict: bool,
    report: &mut ValidationReport,
) {
    let severity = if strict {
        Severity::Error
    } else {
        Severity::Warning
    };
    for event in campaign.events() {
        for pair in event.restrictions.pairs() {
            if !catalog.declares(pair) {
                report.push(
                    IssueCode::DanglingRestriction,
                    severity,
                    format!("restriction '{pair}' is not declared by the demographics"),
                    Some(&event.name),
                );
            }
        }
    }
}

fn check_graph(campaign: &Campaign, report: &mut ValidationReport) {
    let graph = SignalGraph::build(campaign);

    for signal in graph.find_dead_signals() {
        if signal == Signal::from(CustomSignal::Dummy) {
            continue;
        }
        let producer = campaign
            .signal_report()
            .get(signal)
            .and_then(|u| u.first_producer.as_deref());
        report.push(
            IssueCode::DeadSignal,
            Severity::Warning,
            format!("signal '{signal}' is raised but nothing listens for it"),
            producer,
        );
    }

    for path in graph.find_untested_paths(CascadeState::OnArt) {
        report.push(
            IssueCode::UntestedPath,
            Severity::Warning,
            format!("untested path to {}: {}", CascadeState::OnArt, path.describe()),
            Some(&path.event),
        );
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use coc_foundation::{BuiltinSignal, PropertyRestrictions, ValueMap};
    use coc_schema::Schema;

    use super::*;
    use crate::coordinator::Targeting;
    use crate::distributor::{Scheduled, Triggered};
    use crate::intervention::{
        AntiretroviralTherapy, BroadcastEvent, Intervention, Outcomes, PiecewiseDiagnostic,
        PropertyValueChanger, RandomChoice,
    };
    use crate::{ErrorKind, TimeAxis};

    fn campaign() -> Campaign {
        Campaign::new(Arc::new(Schema::bundled().unwrap()), 1960.5)
    }

    struct Declared(Vec<PropertyPair>);

    impl PropertyCatalog for Declared {
        fn declares(&self, pair: &PropertyPair) -> bool {
            self.0.contains(pair)
        }
    }

    fn restricted(pair: &str) -> Targeting {
        Targeting::everyone()
            .restricted_to(PropertyRestrictions::all_of(&[pair]).unwrap())
            .unwrap()
    }

    #[test]
    fn test_clean_campaign_has_no_issues() {
        let mut c = campaign();
        let choice = RandomChoice::split(CustomSignal::OnArtTrigger2, 0.3, CustomSignal::Dummy).unwrap();
        c.add_triggered(Triggered::new(
            "choose",
            1990.0,
            vec![BuiltinSignal::NewlySymptomatic.into()],
            vec![choice.into()],
        ))
        .unwrap();
        c.add_triggered(Triggered::new(
            "treat",
            1990.0,
            vec![CustomSignal::OnArtTrigger2.into()],
            vec![AntiretroviralTherapy::new().into()],
        ))
        .unwrap();
        let report = validate(&c, &ValidationOptions::default());
        assert!(!report.has_errors());
        assert!(report.check().is_ok());
    }

    #[test]
    fn test_unproduced_signal_is_wiring_error() {
        let mut c = campaign();
        c.add_triggered(Triggered::new(
            "dropout",
            1990.0,
            vec![CustomSignal::OnArt3.into()],
            vec![AntiretroviralTherapy::new().into()],
        ))
        .unwrap();
        let report = validate(&c, &ValidationOptions::default());
        let err = report.check().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Wiring);
        assert_eq!(err.event(), Some("dropout"));
        assert!(err.to_string().contains("OnART3"));
    }

    #[test]
    fn test_filter_before_setter_is_ordering_error() {
        let mut c = campaign();
        c.add_scheduled(
            Scheduled::new("filter", 1990.0, vec![AntiretroviralTherapy::new().into()])
                .with_targeting(restricted("Risk:HIGH")),
        )
        .unwrap();
        c.add_scheduled(Scheduled::new(
            "setter",
            1995.0,
            vec![PropertyValueChanger::new(PropertyPair::new("Risk", "HIGH")).into()],
        ))
        .unwrap();
        let err = validate(&c, &ValidationOptions::default()).check().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Ordering);
        assert_eq!(err.event(), Some("filter"));
    }

    #[test]
    fn test_declared_values_are_exempt_from_ordering() {
        let mut c = campaign();
        c.add_scheduled(
            Scheduled::new("filter", 1990.0, vec![AntiretroviralTherapy::new().into()])
                .with_targeting(restricted("Risk:HIGH")),
        )
        .unwrap();
        c.add_scheduled(Scheduled::new(
            "setter",
            1995.0,
            vec![PropertyValueChanger::new(PropertyPair::new("Risk", "HIGH")).into()],
        ))
        .unwrap();
        let catalog = Declared(vec![PropertyPair::new("Risk", "HIGH")]);
        let options = ValidationOptions::default().with_catalog(&catalog);
        assert_eq!(validate(&c, &options).with_code(IssueCode::PropertyOrdering).count(), 0);
    }

    fn setter_then_filter(c: &mut Campaign, set_year: f64, filter_year: f64) {
        c.add_scheduled(Scheduled::new(
            "setter",
            set_year,
            vec![PropertyValueChanger::new(PropertyPair::new("Risk", "HIGH")).into()],
        ))
        .unwrap();
        c.add_scheduled(
            Scheduled::new("filter", filter_year, vec![AntiretroviralTherapy::new().into()])
                .with_targeting(restricted("Risk:HIGH")),
        )
        .unwrap();
    }

    #[test]
    fn test_same_year_setter_is_ordering_error() {
        let mut c = campaign();
        setter_then_filter(&mut c, 1990.0, 1990.0);
        let err = validate(&c, &ValidationOptions::default()).check().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Ordering);
        assert_eq!(err.event(), Some("filter"));
    }

    #[test]
    fn test_earlier_setter_passes_ordering() {
        let mut c = campaign();
        setter_then_filter(&mut c, 1990.0, 1991.0);
        let report = validate(&c, &ValidationOptions::default());
        assert_eq!(report.with_code(IssueCode::PropertyOrdering).count(), 0);
    }

    #[test]
    fn test_day_axis_orders_by_emitted_day() {
        let mut c = campaign().with_time_axis(TimeAxis::Day);
        setter_then_filter(&mut c, 1990.0001, 1990.0002);
        assert_eq!(c.start_day(1990.0001), c.start_day(1990.0002));
        let report = validate(&c, &ValidationOptions::default());
        assert_eq!(report.with_code(IssueCode::PropertyOrdering).count(), 1);

        let mut c = campaign().with_time_axis(TimeAxis::Day);
        setter_then_filter(&mut c, 1990.0, 1990.01);
        let report = validate(&c, &ValidationOptions::default());
        assert_eq!(report.with_code(IssueCode::PropertyOrdering).count(), 0);
    }

    #[test]
    fn test_missing_disqualifier_is_reported() {
        let mut c = campaign();
        let art: Intervention = AntiretroviralTherapy::new().into();
        c.add_scheduled(Scheduled::new(
            "bare gate",
            1990.0,
            vec![art.setting(CascadeState::OnArt.property())],
        ))
        .unwrap();
        let report = validate(&c, &ValidationOptions::default());
        let issue = report.with_code(IssueCode::MissingDisqualifier).next().unwrap();
        assert!(issue.message.contains("CascadeState:LostForever"));
        assert_eq!(report.check().unwrap_err().kind(), ErrorKind::Wiring);
    }

    #[test]
    fn test_placed_interventions_pass_gate_check() {
        let mut c = campaign();
        let art: Intervention = AntiretroviralTherapy::new().into();
        c.add_scheduled(Scheduled::new(
            "gate",
            1990.0,
            vec![art.placed_in(CascadeState::OnArt)],
        ))
        .unwrap();
        let report = validate(&c, &ValidationOptions::default());
        assert_eq!(report.with_code(IssueCode::MissingDisqualifier).count(), 0);
    }

    #[test]
    fn test_dangling_restriction_warns_unless_strict() {
        let mut c = campaign();
        c.add_scheduled(
            Scheduled::new("seed", 1990.0, vec![AntiretroviralTherapy::new().into()])
                .with_targeting(restricted("Accessibility:Yes")),
        )
        .unwrap();
        let catalog = Declared(vec![PropertyPair::new("Risk", "HIGH")]);

        let lenient = ValidationOptions::default().with_catalog(&catalog);
        let report = validate(&c, &lenient);
        assert_eq!(report.with_code(IssueCode::DanglingRestriction).count(), 1);
        assert!(!report.has_errors());

        let strict = lenient.strict(true);
        let err = validate(&c, &strict).check().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::DanglingRestriction);
    }

    #[test]
    fn test_dead_signal_is_a_warning() {
        let mut c = campaign();
        c.add_scheduled(Scheduled::new(
            "shout",
            1990.0,
            vec![BroadcastEvent::new(CustomSignal::OnArt3).into()],
        ))
        .unwrap();
        let report = validate(&c, &ValidationOptions::default());
        let dead: Vec<&ValidationIssue> = report.with_code(IssueCode::DeadSignal).collect();
        assert_eq!(dead.len(), 1);
        assert_eq!(dead[0].event.as_deref(), Some("shout"));
        assert!(!report.has_errors());
    }

    #[test]
    fn test_untested_path_is_a_warning() {
        let mut c = campaign();
        c.add_triggered(Triggered::new(
            "debut",
            1990.0,
            vec![BuiltinSignal::StiDebut.into()],
            vec![BroadcastEvent::new(CustomSignal::OnArtTrigger2).into()],
        ))
        .unwrap();
        c.add_triggered(Triggered::new(
            "treat",
            1990.0,
            vec![CustomSignal::OnArtTrigger2.into()],
            vec![AntiretroviralTherapy::new().into()],
        ))
        .unwrap();
        let report = validate(&c, &ValidationOptions::default());
        assert_eq!(report.with_code(IssueCode::UntestedPath).count(), 1);

        let mut tested = campaign();
        let test = PiecewiseDiagnostic::step(
            ValueMap::constant(1990.0, 1.0),
            Outcomes::positive(CustomSignal::OnArtTrigger2),
        )
        .unwrap();
        tested
            .add_triggered(Triggered::new(
                "debut",
                1990.0,
                vec![BuiltinSignal::StiDebut.into()],
                vec![test.into()],
            ))
            .unwrap();
        tested
            .add_triggered(Triggered::new(
                "treat",
                1990.0,
                vec![CustomSignal::OnArtTrigger2.into()],
                vec![AntiretroviralTherapy::new().into()],
            ))
            .unwrap();
        let report = validate(&tested, &ValidationOptions::default());
        assert_eq!(report.with_code(IssueCode::UntestedPath).count(), 0);
    }
}
