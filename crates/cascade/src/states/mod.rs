//! Cascade states
//!
//! One builder per state of the care pathway. Each emits a fixed subgraph
//! of triggered events into the campaign and returns the exit signals it
//! raises for other states to listen on.
//!
//! Every intervention a state emits is placed in that state: it refuses
//! individuals already further down the pathway and moves the recipient
//! into the state. Re-entry gates only refuse the terminal state.

mod care;
mod hct;
mod testing;

pub use care::{
    ArtStagingParams, LinkingToArtParams, LinkingToPreArtParams, OnArtParams, OnPreArtParams,
    add_art_staging, add_linking_to_art, add_linking_to_pre_art, add_lost_forever, add_on_art,
    add_on_pre_art,
};
pub use hct::{
    AtDebutParams, PostDebutParams, TestDelays, TestingLoopParams, add_hct_testing_loop,
    add_hct_uptake_at_debut, add_hct_uptake_post_debut,
};
pub use testing::{
    AncParams, SymptomaticParams, add_art_staging_diagnostic_test, add_testing_on_anc,
    add_testing_on_child_6w, add_testing_on_symptomatic, default_child_testing_map,
};

use coc_campaign::{Campaign, CampaignResult, Intervention, Triggered};
use coc_foundation::{CascadeState, PropertyPair, PropertyRestrictions, Signal};

/// Signals a state raises for other states.
pub type Exits = Vec<Signal>;

/// `Accessibility:Yes` as a single within-node group.
pub fn accessible() -> PropertyRestrictions {
    PropertyRestrictions::within_node([PropertyPair::new("Accessibility", "Yes")])
}

fn place(state: CascadeState, intervention: impl Into<Intervention>) -> Intervention {
    intervention.into().placed_in(state)
}

/// Listen for `trigger` from `start_year` on, every individual, every node.
fn on(
    campaign: &mut Campaign,
    event_name: &str,
    start_year: f64,
    trigger: impl Into<Signal>,
    interventions: Vec<Intervention>,
) -> CampaignResult<()> {
    campaign.add_triggered(Triggered::new(
        event_name,
        start_year,
        vec![trigger.into()],
        interventions,
    ))
}
