//! Compile pipeline
//!
//! ```text
//! Policy -> build (cascade builders, in order) -> validate -> emit
//! ```
//!
//! Builder failures stop compilation with one error diagnostic. Validation
//! findings are all reported; any error among them means no artifact is
//! produced and the engine config is left untouched.

use std::fmt;
use std::sync::Arc;

use coc_campaign::{
    Campaign, CampaignArtifact, CampaignError, CampaignResult, Severity, ValidationIssue,
    ValidationOptions,
};
use coc_cascade::{
    add_art_cascade, add_csw, add_health_care_testing, add_historical_vmmc_nchooser, add_pmtct,
    add_post_debut_coinfection, add_prep, add_set_sexual_debut_age,
    add_traditional_male_circumcision, add_vmmc_reference_tracking, seed_infections,
};
use coc_schema::Schema;
use serde_json::Value;
use tracing::{error, info, warn};

use crate::{Demographics, Policy};

/// A compiler message from building or validation.
#[derive(Debug, Clone)]
pub struct Diagnostic {
    pub message: String,
    pub severity: Severity,
    /// Top-level builder the problem was raised in.
    pub builder: Option<String>,
    /// Event the problem was found in.
    pub event: Option<String>,
}

impl Diagnostic {
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            severity: Severity::Error,
            builder: None,
            event: None,
        }
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Warning,
            ..Self::error(message)
        }
    }

    pub fn with_builder(mut self, builder: impl Into<String>) -> Self {
        self.builder = Some(builder.into());
        self
    }

    pub fn with_event(mut self, event: impl Into<String>) -> Self {
        self.event = Some(event.into());
        self
    }

    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }
}

fn root_cause(err: &CampaignError) -> &CampaignError {
    match err {
        CampaignError::InEvent { source, .. } | CampaignError::InBuilder { source, .. } => {
            root_cause(source)
        }
        other => other,
    }
}

impl From<&CampaignError> for Diagnostic {
    fn from(err: &CampaignError) -> Self {
        Self {
            message: root_cause(err).to_string(),
            severity: Severity::Error,
            builder: err.builder().map(str::to_string),
            event: err.event().map(str::to_string),
        }
    }
}

impl From<&ValidationIssue> for Diagnostic {
    fn from(issue: &ValidationIssue) -> Self {
        Self {
            message: issue.message.clone(),
            severity: issue.severity,
            builder: None,
            event: issue.event.clone(),
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let level = match self.severity {
            Severity::Error => "error",
            Severity::Warning => "warning",
        };
        write!(f, "{}: {}", level, self.message)?;
        if let Some(builder) = &self.builder {
            write!(f, "\n  --> in {}", builder)?;
        }
        if let Some(event) = &self.event {
            write!(f, "\n  --> event '{}'", event)?;
        }
        Ok(())
    }
}

/// Outcome of [`compile`].
#[derive(Debug)]
pub struct CompileResult {
    /// The built campaign, when every builder succeeded.
    pub campaign: Option<Campaign>,
    /// The artifact, when validation found no errors.
    pub artifact: Option<CampaignArtifact>,
    pub diagnostics: Vec<Diagnostic>,
}

impl CompileResult {
    pub fn has_errors(&self) -> bool {
        self.diagnostics.iter().any(Diagnostic::is_error)
    }

    pub fn warnings(&self) -> impl Iterator<Item = &Diagnostic> {
        self.diagnostics.iter().filter(|d| !d.is_error())
    }

    /// The artifact, or every diagnostic if there is none.
    pub fn success(self) -> Result<CampaignArtifact, Vec<Diagnostic>> {
        if self.has_errors() {
            return Err(self.diagnostics);
        }
        self.artifact.ok_or(self.diagnostics)
    }

    /// One diagnostic per paragraph, errors first.
    pub fn format_diagnostics(&self) -> String {
        let mut out = String::new();
        let ordered = self
            .diagnostics
            .iter()
            .filter(|d| d.is_error())
            .chain(self.warnings());
        for diagnostic in ordered {
            out.push_str(&diagnostic.to_string());
            out.push('\n');
        }
        out
    }

    pub fn log_diagnostics(&self) {
        for diagnostic in &self.diagnostics {
            match diagnostic.severity {
                Severity::Error => error!("{}", diagnostic),
                Severity::Warning => warn!("{}", diagnostic),
            }
        }
    }
}

/// Run every builder the policy enables into a fresh campaign.
///
/// Order: sexual debut, seeding, traditional circumcision, co-infection,
/// commercial sex work, PMTCT, health-care testing, ART cascade, VMMC,
/// historical VMMC, PrEP. Stops at the first failing builder.
pub fn build(policy: &Policy, schema: Arc<Schema>) -> CampaignResult<Campaign> {
    let mut campaign = Campaign::new(schema, policy.base_year).with_time_axis(policy.time_axis);

    if let Some(params) = &policy.sexual_debut {
        add_set_sexual_debut_age(&mut campaign, params)?;
    }
    if let Some(params) = &policy.seeding {
        seed_infections(&mut campaign, params)?;
    }
    if let Some(params) = &policy.traditional_male_circumcision {
        add_traditional_male_circumcision(&mut campaign, params)?;
    }
    if let Some(params) = &policy.coinfection {
        add_post_debut_coinfection(&mut campaign, params)?;
    }
    if let Some(params) = &policy.csw {
        add_csw(&mut campaign, params)?;
    }
    if let Some(params) = &policy.pmtct {
        add_pmtct(&mut campaign, params)?;
    }
    if let Some(params) = &policy.health_care_testing {
        add_health_care_testing(&mut campaign, params)?;
    }
    if let Some(params) = &policy.art_cascade {
        add_art_cascade(&mut campaign, params)?;
    }
    if let Some(params) = &policy.vmmc {
        add_vmmc_reference_tracking(&mut campaign, params)?;
    }
    if let Some(params) = &policy.historical_vmmc {
        add_historical_vmmc_nchooser(&mut campaign, params)?;
    }
    if let Some(params) = &policy.prep {
        add_prep(&mut campaign, params)?;
    }

    info!(
        policy = %policy.metadata.name,
        events = campaign.len(),
        signals = campaign.signal_report().len(),
        "campaign built"
    );
    Ok(campaign)
}

/// Build, validate and emit a policy.
///
/// `config` receives the campaign's config effects only when an artifact
/// is produced.
pub fn compile(
    policy: &Policy,
    schema: Arc<Schema>,
    demographics: &Demographics,
    config: &mut Value,
) -> CompileResult {
    let mut result = CompileResult {
        campaign: None,
        artifact: None,
        diagnostics: Vec::new(),
    };

    info!(policy = %policy.metadata.name, sections = ?policy.sections(), "compiling policy");
    let campaign = match build(policy, schema) {
        Ok(campaign) => campaign,
        Err(err) => {
            result.diagnostics.push(Diagnostic::from(&err));
            return result;
        }
    };

    let options = ValidationOptions::default()
        .strict(policy.strict)
        .with_catalog(demographics);
    let report = campaign.validate(&options);
    result
        .diagnostics
        .extend(report.issues().iter().map(Diagnostic::from));

    if !report.has_errors() {
        match campaign.emit(config, &report) {
            Ok(artifact) => result.artifact = Some(artifact),
            Err(err) => result.diagnostics.push(Diagnostic::from(&err)),
        }
    }
    result.campaign = Some(campaign);
    result
}
