//! Signal and cascade-state vocabularies
//!
//! Both sets are closed: every name the compiler can emit is a variant here
//! and is only stringified at the JSON boundary.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::properties::PropertyPair;
use crate::{CASCADE_STATE_KEY, ValueError};

macro_rules! define_names {
    ($(#[$meta:meta])* $name:ident, $kind:literal { $($(#[$vmeta:meta])* $variant:ident => $text:literal,)+ }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub enum $name {
            $($(#[$vmeta])* $variant,)+
        }

        impl $name {
            /// Every variant, in declaration order.
            pub const ALL: &'static [$name] = &[$($name::$variant,)+];

            /// The engine-facing name.
            pub fn as_str(self) -> &'static str {
                match self {
                    $($name::$variant => $text,)+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $name {
            type Err = ValueError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($text => Ok($name::$variant),)+
                    _ => Err(ValueError::UnknownName {
                        kind: $kind,
                        name: s.to_string(),
                    }),
                }
            }
        }

        impl Serialize for $name {
            fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                serializer.serialize_str(self.as_str())
            }
        }

        impl<'de> Deserialize<'de> for $name {
            fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                let s = String::deserialize(deserializer)?;
                s.parse().map_err(serde::de::Error::custom)
            }
        }
    };
}

define_names! {
    /// Events raised by the engine itself.
    BuiltinSignal, "built-in signal" {
        Births => "Births",
        StiDebut => "STIDebut",
        NewlySymptomatic => "NewlySymptomatic",
        SixWeeksOld => "SixWeeksOld",
        TwelveWeeksPregnant => "TwelveWeeksPregnant",
        DiseaseDeaths => "DiseaseDeaths",
        NonDiseaseDeaths => "NonDiseaseDeaths",
        NewInfectionEvent => "NewInfectionEvent",
        HivInfectionStageEnteredLatent => "HIVInfectionStageEnteredLatent",
        StartedArt => "StartedART",
    }
}

define_names! {
    /// Events declared by the compiler and registered with the engine.
    CustomSignal, "custom signal" {
        // Antenatal care and PMTCT
        NeedsPmtctDiagnosticTest => "Needs_PMTCT_Diagnostic_Test",
        HivPositiveAtAnc => "HIV_Positive_at_ANC",
        NeedsSdNvpPmtct => "Needs_sdNVP_PMTCT",
        NeedsCombinationPmtct => "Needs_Combination_PMTCT",
        NeedsOptionAPmtct => "Needs_Option_A_PMTCT",
        NeedsOptionBPmtct => "Needs_Option_B_PMTCT",
        /// No-op sink for the untaken branch of a random choice.
        Dummy => "dummy",

        // Testing and staging
        ArtStagingDiagnosticTrigger => "ARTStagingDiagnosticTrigger",
        ArtStagingTrigger1 => "ARTStagingTrigger1",
        ArtStagingTrigger2 => "ARTStagingTrigger2",
        ArtStaging3 => "ARTStaging3",
        ArtStaging4 => "ARTStaging4",
        ArtStaging5 => "ARTStaging5",
        ArtStaging6 => "ARTStaging6",
        ArtStaging8 => "ARTStaging8",
        ArtStaging9 => "ARTStaging9",

        // Health-care testing
        HctTestingLoopTrigger => "HCTTestingLoopTrigger",
        HctTestingLoop1 => "HCTTestingLoop1",
        HctTestingLoop2 => "HCTTestingLoop2",
        HctUptakePostDebutTrigger1 => "HCTUptakePostDebutTrigger1",
        HctUptakePostDebutTrigger2 => "HCTUptakePostDebutTrigger2",
        HctUptakePostDebutTrigger3 => "HCTUptakePostDebutTrigger3",
        HctUptakePostDebut0 => "HCTUptakePostDebut0",
        HctUptakePostDebut2 => "HCTUptakePostDebut2",
        HctUptakePostDebut7 => "HCTUptakePostDebut7",
        HctUptakePostDebut8 => "HCTUptakePostDebut8",

        // Linking and treatment
        LinkingToPreArtTrigger => "LinkingToPreARTTrigger",
        LinkingToArtTrigger => "LinkingToARTTrigger",
        OnPreArtTrigger => "OnPreARTTrigger",
        OnPreArt1 => "OnPreART1",
        OnPreArt2 => "OnPreART2",
        OnPreArt3 => "OnPreART3",
        OnPreArt4 => "OnPreART4",
        OnArtTrigger1 => "OnARTTrigger1",
        OnArtTrigger2 => "OnARTTrigger2",
        OnArt3 => "OnART3",
        ArtInitiationDelayed => "ARTInitiationDelayed",
        LostForever9 => "LostForever9",
        LostForeverTrigger => "LostForeverTrigger",

        // Auxiliary subgraphs
        CommercialCandidateFemale => "Commercial_Candidate_Female",
        CommercialCandidateMale => "Commercial_Candidate_Male",
        CommercialUptake => "Commercial_Uptake",
        CommercialDropout => "Commercial_Dropout",
        InitialCoinfectionPostDebut => "Initial_Coinfection_Post_Debut",
        TraditionalMcChosen => "Traditional_MC_Chosen",
    }
}

define_names! {
    /// Macro-states of the HIV care pathway, stored in the `CascadeState` property.
    CascadeState, "cascade state" {
        LostForever => "LostForever",
        OnArt => "OnART",
        LinkingToArt => "LinkingToART",
        OnPreArt => "OnPreART",
        LinkingToPreArt => "LinkingToPreART",
        ArtStaging => "ARTStaging",
        ArtStagingDiagnosticTest => "ARTStagingDiagnosticTest",
        TestingOnSymptomatic => "TestingOnSymptomatic",
        TestingOnAnc => "TestingOnANC",
        TestingOnChild6w => "TestingOnChild6w",
        HctTestingLoop => "HCTTestingLoop",
        HctUptakeAtDebut => "HCTUptakeAtDebut",
        HctUptakePostDebut => "HCTUptakePostDebut",
    }
}

define_names! {
    /// Gender filter applied by coordinators.
    TargetGender, "gender" {
        All => "All",
        Male => "Male",
        Female => "Female",
    }
}

use CascadeState::*;

const CARE: &[CascadeState] = &[
    LostForever,
    OnArt,
    LinkingToArt,
    OnPreArt,
    LinkingToPreArt,
    ArtStaging,
];

const CARE_AND_SYMPTOMATIC: &[CascadeState] = &[
    LostForever,
    OnArt,
    LinkingToArt,
    OnPreArt,
    LinkingToPreArt,
    ArtStaging,
    TestingOnSymptomatic,
];

const HCT_ENTRY: &[CascadeState] = &[
    LostForever,
    OnArt,
    LinkingToArt,
    OnPreArt,
    LinkingToPreArt,
    ArtStaging,
    TestingOnSymptomatic,
    TestingOnAnc,
];

const HCT_LOOP: &[CascadeState] = &[
    LostForever,
    OnArt,
    LinkingToArt,
    OnPreArt,
    LinkingToPreArt,
    ArtStaging,
    TestingOnSymptomatic,
    TestingOnAnc,
    HctTestingLoop,
];

const AT_DEBUT: &[CascadeState] = &[
    LostForever,
    OnArt,
    LinkingToArt,
    OnPreArt,
    LinkingToPreArt,
    ArtStaging,
    TestingOnSymptomatic,
    TestingOnAnc,
    HctTestingLoop,
    HctUptakePostDebut,
];

impl CascadeState {
    /// The `CascadeState:<Name>` property pair for this state.
    pub fn property(self) -> PropertyPair {
        PropertyPair::new(CASCADE_STATE_KEY, self.as_str())
    }

    /// States that disqualify an intervention placed in this state.
    ///
    /// These are the downstream and terminal states of the pathway, so an
    /// individual further along cannot be regressed by a stale trigger.
    /// `LinkingToPreART` does not list itself.
    pub fn disqualifiers(self) -> &'static [CascadeState] {
        match self {
            LostForever => &[],
            OnArt => &[LostForever],
            LinkingToArt => &[LostForever, OnArt],
            OnPreArt => &[LostForever, OnArt, LinkingToArt],
            LinkingToPreArt => &[LostForever, OnArt, LinkingToArt, OnPreArt],
            ArtStaging => &[LostForever, OnArt, LinkingToArt, OnPreArt, LinkingToPreArt],
            ArtStagingDiagnosticTest => CARE,
            TestingOnSymptomatic => CARE,
            TestingOnAnc | TestingOnChild6w => CARE_AND_SYMPTOMATIC,
            HctTestingLoop => HCT_ENTRY,
            HctUptakePostDebut => HCT_LOOP,
            HctUptakeAtDebut => AT_DEBUT,
        }
    }

    /// Minimum disqualifying set for a gate that admits individuals into
    /// this state from elsewhere in the pathway.
    ///
    /// Re-entry into post-debut uptake arrives from staging, linking and
    /// ART dropout, so its gate only refuses the terminal state.
    pub fn entry_disqualifiers(self) -> &'static [CascadeState] {
        match self {
            HctUptakePostDebut => &[LostForever],
            other => other.disqualifiers(),
        }
    }

    /// Disqualifying property pairs for an internal node of this state.
    pub fn disqualifying_properties(self) -> Vec<PropertyPair> {
        self.disqualifiers().iter().map(|s| s.property()).collect()
    }

    /// Disqualifying property pairs for an entry gate of this state.
    pub fn entry_disqualifying_properties(self) -> Vec<PropertyPair> {
        self.entry_disqualifiers()
            .iter()
            .map(|s| s.property())
            .collect()
    }

    /// Parse a `CascadeState:<Name>` property pair back into a state.
    pub fn from_property(pair: &PropertyPair) -> Option<Self> {
        if pair.key != CASCADE_STATE_KEY {
            return None;
        }
        pair.value.parse().ok()
    }
}

/// A named runtime notification.
///
/// Signals are fire-and-forget broadcasts; built-in ones are raised by the
/// engine, custom ones by interventions in the emitted campaign.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Signal {
    Builtin(BuiltinSignal),
    Custom(CustomSignal),
}

impl Signal {
    pub fn as_str(self) -> &'static str {
        match self {
            Signal::Builtin(s) => s.as_str(),
            Signal::Custom(s) => s.as_str(),
        }
    }

    pub fn is_builtin(self) -> bool {
        matches!(self, Signal::Builtin(_))
    }

    pub fn is_custom(self) -> bool {
        matches!(self, Signal::Custom(_))
    }
}

impl From<BuiltinSignal> for Signal {
    fn from(s: BuiltinSignal) -> Self {
        Signal::Builtin(s)
    }
}

impl From<CustomSignal> for Signal {
    fn from(s: CustomSignal) -> Self {
        Signal::Custom(s)
    }
}

impl fmt::Display for Signal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Signal {
    type Err = ValueError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if let Ok(builtin) = s.parse::<BuiltinSignal>() {
            return Ok(Signal::Builtin(builtin));
        }
        s.parse::<CustomSignal>()
            .map(Signal::Custom)
            .map_err(|_| ValueError::UnknownName {
                kind: "signal",
                name: s.to_string(),
            })
    }
}

impl Serialize for Signal {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for Signal {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_signal_round_trips_through_names() {
        for s in BuiltinSignal::ALL {
            let signal = Signal::from(*s);
            assert_eq!(signal.as_str().parse::<Signal>().unwrap(), signal);
        }
        for s in CustomSignal::ALL {
            let signal = Signal::from(*s);
            assert_eq!(signal.as_str().parse::<Signal>().unwrap(), signal);
        }
    }

    #[test]
    fn test_signal_names_are_unique() {
        let mut names: Vec<&str> = BuiltinSignal::ALL.iter().map(|s| s.as_str()).collect();
        names.extend(CustomSignal::ALL.iter().map(|s| s.as_str()));
        let total = names.len();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), total);
    }

    #[test]
    fn test_unknown_signal_is_rejected() {
        let err = "NotASignal".parse::<Signal>().unwrap_err();
        assert!(matches!(err, ValueError::UnknownName { kind: "signal", .. }));
    }

    #[test]
    fn test_cascade_state_property() {
        let pair = CascadeState::OnArt.property();
        assert_eq!(pair.to_string(), "CascadeState:OnART");
        assert_eq!(CascadeState::from_property(&pair), Some(CascadeState::OnArt));
        assert_eq!(
            CascadeState::from_property(&PropertyPair::new("Risk", "HIGH")),
            None
        );
    }

    #[test]
    fn test_anc_disqualifiers_include_care_and_symptomatic() {
        let set = CascadeState::TestingOnAnc.disqualifiers();
        for state in [
            LostForever,
            OnArt,
            LinkingToArt,
            OnPreArt,
            LinkingToPreArt,
            ArtStaging,
            TestingOnSymptomatic,
        ] {
            assert!(set.contains(&state), "missing {state}");
        }
    }

    #[test]
    fn test_disqualifiers_never_contain_own_state() {
        for state in CascadeState::ALL {
            assert!(!state.disqualifiers().contains(state), "{state} lists itself");
        }
    }

    #[test]
    fn test_entry_disqualifiers_are_subset_of_designed_set() {
        for state in CascadeState::ALL {
            for s in state.entry_disqualifiers() {
                assert!(state.disqualifiers().contains(s));
            }
        }
    }

    #[test]
    fn test_terminal_state_disqualifies_every_non_terminal_state() {
        for state in CascadeState::ALL {
            if *state != LostForever {
                assert!(state.entry_disqualifiers().contains(&LostForever));
            }
        }
    }
}
