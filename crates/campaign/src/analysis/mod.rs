//! Signal-graph analysis
//!
//! The emitted campaign is a graph: triggered events listen for signals,
//! their interventions raise further signals. Retention loops make the
//! graph cyclic; [`SignalGraph`] tags the edges that close a cycle as
//! [`EdgeKind::LoopBack`] so forward reachability stays well defined.

mod graph;

pub use graph::{Edge, EdgeKind, SignalGraph, UntestedPath};
