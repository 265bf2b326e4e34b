//! Policy type definitions and loading.

use std::path::{Path, PathBuf};

use coc_campaign::TimeAxis;
use coc_cascade::{
    ArtCascadeParams, CoinfectionParams, CswParams, HealthCareTestingParams, HistoricalVmmcParams,
    PmtctParams, PrepParams, SeedingParams, SexualDebutParams, TraditionalMcParams, VmmcParams,
};
use indexmap::IndexMap;
use serde::Deserialize;

use crate::{PolicyError, PolicyResult};

const API_VERSION: &str = "coc/v1";
const KIND: &str = "Policy";

/// Year the engine run starts when a policy does not say.
pub const DEFAULT_BASE_YEAR: f64 = 1960.5;

/// One campaign compilation.
///
/// Sections map one-to-one onto the builders in `coc-cascade` and carry
/// the same defaults.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Policy {
    /// API version for compatibility checking.
    #[serde(default = "default_api_version")]
    pub api_version: String,

    /// Kind must be "Policy".
    #[serde(default = "default_kind")]
    pub kind: String,

    #[serde(default)]
    pub metadata: PolicyMetadata,

    /// Calendar year of engine day zero.
    #[serde(default = "default_base_year")]
    pub base_year: f64,

    #[serde(default)]
    pub time_axis: TimeAxis,

    /// Treat dangling property restrictions as errors.
    #[serde(default)]
    pub strict: bool,

    #[serde(default)]
    pub art_cascade: Option<ArtCascadeParams>,
    #[serde(default)]
    pub health_care_testing: Option<HealthCareTestingParams>,
    #[serde(default)]
    pub pmtct: Option<PmtctParams>,
    #[serde(default)]
    pub csw: Option<CswParams>,
    #[serde(default)]
    pub coinfection: Option<CoinfectionParams>,
    #[serde(default)]
    pub traditional_male_circumcision: Option<TraditionalMcParams>,
    #[serde(default)]
    pub vmmc: Option<VmmcParams>,
    #[serde(default)]
    pub historical_vmmc: Option<HistoricalVmmcParams>,
    #[serde(default)]
    pub seeding: Option<SeedingParams>,
    #[serde(default)]
    pub prep: Option<PrepParams>,
    #[serde(default)]
    pub sexual_debut: Option<SexualDebutParams>,
}

fn default_api_version() -> String {
    API_VERSION.to_string()
}

fn default_kind() -> String {
    KIND.to_string()
}

fn default_base_year() -> f64 {
    DEFAULT_BASE_YEAR
}

/// Metadata for a policy.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct PolicyMetadata {
    /// Machine identifier for this policy (lowercase, no spaces).
    #[serde(default)]
    pub name: String,

    /// Human-readable title.
    #[serde(default)]
    pub title: Option<String>,

    #[serde(default)]
    pub description: Option<String>,
}

impl Policy {
    /// Create a policy with the given name and no sections.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            api_version: default_api_version(),
            kind: default_kind(),
            metadata: PolicyMetadata {
                name: name.into(),
                title: None,
                description: None,
            },
            base_year: DEFAULT_BASE_YEAR,
            time_axis: TimeAxis::default(),
            strict: false,
            art_cascade: None,
            health_care_testing: None,
            pmtct: None,
            csw: None,
            coinfection: None,
            traditional_male_circumcision: None,
            vmmc: None,
            historical_vmmc: None,
            seeding: None,
            prep: None,
            sexual_debut: None,
        }
    }

    /// Load a policy from a YAML file.
    pub fn load(path: impl AsRef<Path>) -> PolicyResult<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    /// Parse a policy from a YAML string.
    pub fn from_yaml(yaml: &str) -> PolicyResult<Self> {
        let policy: Policy = serde_yaml::from_str(yaml)?;
        policy.validate_schema()?;
        Ok(policy)
    }

    /// Validate the document header (API version, kind, name, base year).
    fn validate_schema(&self) -> PolicyResult<()> {
        if self.api_version != API_VERSION {
            return Err(PolicyError::InvalidApiVersion(self.api_version.clone()));
        }
        if self.kind != KIND {
            return Err(PolicyError::InvalidKind(self.kind.clone()));
        }
        if self.metadata.name.is_empty() {
            return Err(PolicyError::MissingField("metadata.name".to_string()));
        }
        if !self.base_year.is_finite() {
            return Err(PolicyError::InvalidField {
                field: "baseYear".to_string(),
                reason: format!("{} is not a finite year", self.base_year),
            });
        }
        Ok(())
    }

    /// Names of the sections present, in build order.
    pub fn sections(&self) -> Vec<&'static str> {
        let present = [
            ("sexualDebut", self.sexual_debut.is_some()),
            ("seeding", self.seeding.is_some()),
            (
                "traditionalMaleCircumcision",
                self.traditional_male_circumcision.is_some(),
            ),
            ("coinfection", self.coinfection.is_some()),
            ("csw", self.csw.is_some()),
            ("pmtct", self.pmtct.is_some()),
            ("healthCareTesting", self.health_care_testing.is_some()),
            ("artCascade", self.art_cascade.is_some()),
            ("vmmc", self.vmmc.is_some()),
            ("historicalVmmc", self.historical_vmmc.is_some()),
            ("prep", self.prep.is_some()),
        ];
        present
            .into_iter()
            .filter_map(|(name, on)| on.then_some(name))
            .collect()
    }

    /// Builder method: set the title.
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.metadata.title = Some(title.into());
        self
    }

    /// Builder method: set the description.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.metadata.description = Some(description.into());
        self
    }

    pub fn with_base_year(mut self, base_year: f64) -> Self {
        self.base_year = base_year;
        self
    }

    pub fn with_time_axis(mut self, time_axis: TimeAxis) -> Self {
        self.time_axis = time_axis;
        self
    }

    pub fn with_strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    /// Builder method: emit the full care cascade (PMTCT, health-care
    /// testing and ART) with default parameters.
    pub fn with_full_cascade(self) -> Self {
        self.with_pmtct(PmtctParams::default())
            .with_health_care_testing(HealthCareTestingParams::default())
            .with_art_cascade(ArtCascadeParams::default())
    }

    pub fn with_art_cascade(mut self, params: ArtCascadeParams) -> Self {
        self.art_cascade = Some(params);
        self
    }

    pub fn with_health_care_testing(mut self, params: HealthCareTestingParams) -> Self {
        self.health_care_testing = Some(params);
        self
    }

    pub fn with_pmtct(mut self, params: PmtctParams) -> Self {
        self.pmtct = Some(params);
        self
    }

    pub fn with_csw(mut self, params: CswParams) -> Self {
        self.csw = Some(params);
        self
    }

    pub fn with_coinfection(mut self, params: CoinfectionParams) -> Self {
        self.coinfection = Some(params);
        self
    }

    pub fn with_traditional_male_circumcision(mut self, params: TraditionalMcParams) -> Self {
        self.traditional_male_circumcision = Some(params);
        self
    }

    pub fn with_vmmc(mut self, params: VmmcParams) -> Self {
        self.vmmc = Some(params);
        self
    }

    pub fn with_historical_vmmc(mut self, params: HistoricalVmmcParams) -> Self {
        self.historical_vmmc = Some(params);
        self
    }

    pub fn with_seeding(mut self, params: SeedingParams) -> Self {
        self.seeding = Some(params);
        self
    }

    pub fn with_prep(mut self, params: PrepParams) -> Self {
        self.prep = Some(params);
        self
    }

    pub fn with_sexual_debut(mut self, params: SexualDebutParams) -> Self {
        self.sexual_debut = Some(params);
        self
    }
}

/// Find policy files in a project directory.
///
/// Policies are stored in a `policies/` subdirectory of the project root.
/// Each `.yaml` or `.yml` file in that directory is treated as a policy.
pub fn find_policies(project_dir: impl AsRef<Path>) -> Vec<PathBuf> {
    let policies_dir = project_dir.as_ref().join("policies");
    if !policies_dir.exists() {
        return Vec::new();
    }

    let mut policies = Vec::new();
    if let Ok(entries) = std::fs::read_dir(&policies_dir) {
        for entry in entries.flatten() {
            let path = entry.path();
            if path.extension().is_some_and(|e| e == "yaml" || e == "yml") {
                policies.push(path);
            }
        }
    }
    policies.sort();
    policies
}

/// Load all policies from a project directory, keyed by name.
///
/// Files that fail to load are skipped with a warning.
pub fn load_policies(project_dir: impl AsRef<Path>) -> IndexMap<String, Policy> {
    let mut policies = IndexMap::new();
    for path in find_policies(project_dir) {
        match Policy::load(&path) {
            Ok(policy) => {
                policies.insert(policy.metadata.name.clone(), policy);
            }
            Err(e) => {
                tracing::warn!("Failed to load policy from {:?}: {}", path, e);
            }
        }
    }
    policies
}
