//! Signal graph construction and queries

use std::collections::{HashMap, HashSet, VecDeque};

use coc_foundation::{BuiltinSignal, CascadeState, Signal};
use indexmap::IndexSet;

use crate::campaign::Campaign;
use crate::intervention::{Intervention, InterventionConfig};

/// Whether an edge goes forward or closes a cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EdgeKind {
    Forward,
    LoopBack,
}

/// `from` triggers an event whose intervention raises `to`.
#[derive(Debug, Clone, PartialEq)]
pub struct Edge {
    pub from: Signal,
    pub to: Signal,
    pub event: String,
    /// Engine class of the intervention raising `to`.
    pub class: &'static str,
    /// The intervention is an HIV test.
    pub tested: bool,
    pub kind: EdgeKind,
}

#[derive(Debug, Clone)]
struct Listener {
    event: String,
    triggers: Vec<Signal>,
    /// Cascade states the event moves individuals into, with starting
    /// treatment counted as entering `OnART`.
    states: Vec<CascadeState>,
}

/// A chain of signals from sexual debut to an event entering a state,
/// with no HIV test on the way.
#[derive(Debug, Clone, PartialEq)]
pub struct UntestedPath {
    pub signals: Vec<Signal>,
    /// The event entering the state.
    pub event: String,
}

impl UntestedPath {
    pub fn describe(&self) -> String {
        let mut parts: Vec<&str> = self.signals.iter().map(|s| s.as_str()).collect();
        parts.push(&self.event);
        parts.join(" -> ")
    }
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Mark {
    OnStack,
    Done,
}

/// Signals as nodes, interventions as edges.
#[derive(Debug, Clone, Default)]
pub struct SignalGraph {
    signals: IndexSet<Signal>,
    edges: Vec<Edge>,
    /// Signals raised by events that listen for nothing.
    seeds: Vec<(Signal, String)>,
    listeners: Vec<Listener>,
}

impl SignalGraph {
    pub fn build(campaign: &Campaign) -> Self {
        let mut graph = SignalGraph::default();
        for event in campaign.events() {
            let states = entered_states(&event.interventions);
            if event.triggers.is_empty() {
                for intervention in &event.interventions {
                    for to in intervention.live_outputs() {
                        graph.signals.insert(to);
                        graph.seeds.push((to, event.name.clone()));
                    }
                }
                continue;
            }
            for from in &event.triggers {
                graph.signals.insert(*from);
                for intervention in &event.interventions {
                    for to in intervention.live_outputs() {
                        graph.signals.insert(to);
                        graph.edges.push(Edge {
                            from: *from,
                            to,
                            event: event.name.clone(),
                            class: intervention.class(),
                            tested: intervention.is_hiv_test(),
                            kind: EdgeKind::Forward,
                        });
                    }
                }
            }
            graph.listeners.push(Listener {
                event: event.name.clone(),
                triggers: event.triggers.clone(),
                states,
            });
        }
        for index in graph.loop_back_edges() {
            graph.edges[index].kind = EdgeKind::LoopBack;
        }
        graph
    }

    /// Depth-first search from the sources, in first-mention order. An
    /// edge reaching a signal still on the stack closes a cycle.
    fn loop_back_edges(&self) -> Vec<usize> {
        let mut adjacency: HashMap<Signal, Vec<usize>> = HashMap::new();
        for (index, edge) in self.edges.iter().enumerate() {
            adjacency.entry(edge.from).or_default().push(index);
        }
        let targets: HashSet<Signal> = self.edges.iter().map(|e| e.to).collect();
        let roots = self
            .signals
            .iter()
            .filter(|s| !targets.contains(*s))
            .chain(self.signals.iter());

        let mut marks: HashMap<Signal, Mark> = HashMap::new();
        let mut loop_backs = Vec::new();
        for root in roots {
            if marks.contains_key(root) {
                continue;
            }
            marks.insert(*root, Mark::OnStack);
            let mut stack: Vec<(Signal, usize)> = vec![(*root, 0)];
            while let Some(top) = stack.last_mut() {
                let (signal, position) = *top;
                let out = adjacency.get(&signal).map_or(&[][..], Vec::as_slice);
                if position == out.len() {
                    marks.insert(signal, Mark::Done);
                    stack.pop();
                    continue;
                }
                top.1 += 1;
                let index = out[position];
                let to = self.edges[index].to;
                match marks.get(&to) {
                    None => {
                        marks.insert(to, Mark::OnStack);
                        stack.push((to, 0));
                    }
                    Some(Mark::OnStack) => loop_backs.push(index),
                    Some(Mark::Done) => {}
                }
            }
        }
        loop_backs.sort_unstable();
        loop_backs
    }

    pub fn signals(&self) -> impl Iterator<Item = Signal> + '_ {
        self.signals.iter().copied()
    }

    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    pub fn loop_backs(&self) -> impl Iterator<Item = &Edge> {
        self.edges.iter().filter(|e| e.kind == EdgeKind::LoopBack)
    }

    /// Signals reachable from `start`, in breadth-first order, `start`
    /// included.
    pub fn reachable_from(&self, start: Signal, forward_only: bool) -> Vec<Signal> {
        self.search(start, |e| !forward_only || e.kind == EdgeKind::Forward)
            .into_iter()
            .map(|(signal, _)| signal)
            .collect()
    }

    /// Breadth-first search keeping each reached signal's parent.
    fn search(&self, start: Signal, follow: impl Fn(&Edge) -> bool) -> Vec<(Signal, Option<Signal>)> {
        let mut seen: HashSet<Signal> = HashSet::from([start]);
        let mut order = vec![(start, None)];
        let mut queue = VecDeque::from([start]);
        while let Some(signal) = queue.pop_front() {
            for edge in self.edges.iter().filter(|e| e.from == signal && follow(e)) {
                if seen.insert(edge.to) {
                    order.push((edge.to, Some(signal)));
                    queue.push_back(edge.to);
                }
            }
        }
        order
    }

    /// Custom signals raised that no event listens for.
    pub fn find_dead_signals(&self) -> Vec<Signal> {
        let heard: HashSet<Signal> = self
            .listeners
            .iter()
            .flat_map(|l| l.triggers.iter().copied())
            .collect();
        let raised: HashSet<Signal> = self
            .edges
            .iter()
            .map(|e| e.to)
            .chain(self.seeds.iter().map(|(s, _)| *s))
            .collect();
        self.signals
            .iter()
            .copied()
            .filter(|s| s.is_custom() && raised.contains(s) && !heard.contains(s))
            .collect()
    }

    /// Paths from `STIDebut` to an event entering `target` that pass no
    /// HIV test, one per such event. Only forward edges are followed.
    pub fn find_untested_paths(&self, target: CascadeState) -> Vec<UntestedPath> {
        let start = Signal::from(BuiltinSignal::StiDebut);
        let reached = self.search(start, |e| e.kind == EdgeKind::Forward && !e.tested);
        let parents: HashMap<Signal, Option<Signal>> = reached.iter().copied().collect();

        let mut paths = Vec::new();
        for listener in self.listeners.iter().filter(|l| l.states.contains(&target)) {
            let Some(trigger) = listener.triggers.iter().find(|t| parents.contains_key(*t)) else {
                continue;
            };
            let mut signals = vec![*trigger];
            let mut current = *trigger;
            while let Some(Some(parent)) = parents.get(&current) {
                signals.push(*parent);
                current = *parent;
            }
            signals.reverse();
            paths.push(UntestedPath {
                signals,
                event: listener.event.clone(),
            });
        }
        paths
    }
}

fn entered_states(interventions: &[Intervention]) -> Vec<CascadeState> {
    let mut states = Vec::new();
    for intervention in interventions {
        let state = match intervention {
            Intervention::AntiretroviralTherapy(_) => Some(CascadeState::OnArt),
            other => other.cascade_state(),
        };
        if let Some(state) = state.filter(|s| !states.contains(s)) {
            states.push(state);
        }
    }
    states
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use coc_foundation::{CustomSignal, DelayDistribution, ValueMap};
    use coc_schema::Schema;

    use super::*;
    use crate::distributor::{Scheduled, Triggered};
    use crate::intervention::{
        AntiretroviralTherapy, BroadcastEvent, Muxer, Outcomes, PiecewiseDiagnostic, RandomChoice,
    };

    fn campaign() -> Campaign {
        Campaign::new(Arc::new(Schema::bundled().unwrap()), 1960.5)
    }

    fn listen(c: &mut Campaign, name: &str, on: impl Into<Signal>, interventions: Vec<Intervention>) {
        c.add_triggered(Triggered::new(name, 1990.0, vec![on.into()], interventions))
            .unwrap();
    }

    /// A retention loop: trigger -> muxer -> test -> choice back to trigger.
    fn retention_loop() -> Campaign {
        let mut c = campaign();
        listen(
            &mut c,
            "enter",
            BuiltinSignal::StiDebut,
            vec![BroadcastEvent::new(CustomSignal::HctTestingLoopTrigger).into()],
        );
        let muxer = Muxer::new(
            "HCTTestingLoop",
            DelayDistribution::exponential(365.0),
            CustomSignal::HctTestingLoop1,
        )
        .unwrap();
        listen(&mut c, "wait", CustomSignal::HctTestingLoopTrigger, vec![muxer.into()]);
        let test = PiecewiseDiagnostic::step(
            ValueMap::constant(1990.0, 0.5),
            Outcomes::both(CustomSignal::OnArtTrigger2, CustomSignal::HctTestingLoop2),
        )
        .unwrap();
        listen(&mut c, "test", CustomSignal::HctTestingLoop1, vec![test.into()]);
        let retain = RandomChoice::split(
            CustomSignal::HctTestingLoopTrigger,
            0.8,
            CustomSignal::Dummy,
        )
        .unwrap();
        listen(&mut c, "retain", CustomSignal::HctTestingLoop2, vec![retain.into()]);
        listen(
            &mut c,
            "treat",
            CustomSignal::OnArtTrigger2,
            vec![AntiretroviralTherapy::new().into()],
        );
        c
    }

    #[test]
    fn test_loop_back_is_tagged() {
        let graph = SignalGraph::build(&retention_loop());
        let loops: Vec<&Edge> = graph.loop_backs().collect();
        assert_eq!(loops.len(), 1);
        assert_eq!(loops[0].from, Signal::from(CustomSignal::HctTestingLoop2));
        assert_eq!(loops[0].to, Signal::from(CustomSignal::HctTestingLoopTrigger));
        assert_eq!(loops[0].event, "retain");
    }

    #[test]
    fn test_tagging_is_deterministic() {
        let first = SignalGraph::build(&retention_loop());
        let second = SignalGraph::build(&retention_loop());
        assert_eq!(first.edges(), second.edges());
    }

    #[test]
    fn test_reachability() {
        let graph = SignalGraph::build(&retention_loop());
        let reached = graph.reachable_from(CustomSignal::HctTestingLoop2.into(), true);
        assert!(!reached.contains(&Signal::from(CustomSignal::HctTestingLoopTrigger)));
        let reached = graph.reachable_from(CustomSignal::HctTestingLoop2.into(), false);
        assert!(reached.contains(&Signal::from(CustomSignal::OnArtTrigger2)));
    }

    #[test]
    fn test_tested_loop_has_no_untested_path() {
        let graph = SignalGraph::build(&retention_loop());
        assert!(graph.find_untested_paths(CascadeState::OnArt).is_empty());
        assert_eq!(graph.find_dead_signals(), vec![Signal::from(CustomSignal::Dummy)]);
    }

    #[test]
    fn test_untested_path_is_reconstructed() {
        let mut c = campaign();
        listen(
            &mut c,
            "debut",
            BuiltinSignal::StiDebut,
            vec![BroadcastEvent::new(CustomSignal::LinkingToArtTrigger).into()],
        );
        listen(
            &mut c,
            "link",
            CustomSignal::LinkingToArtTrigger,
            vec![BroadcastEvent::new(CustomSignal::OnArtTrigger1).into()],
        );
        listen(
            &mut c,
            "treat",
            CustomSignal::OnArtTrigger1,
            vec![AntiretroviralTherapy::new().into()],
        );
        let paths = SignalGraph::build(&c).find_untested_paths(CascadeState::OnArt);
        assert_eq!(paths.len(), 1);
        assert_eq!(
            paths[0].describe(),
            "STIDebut -> LinkingToARTTrigger -> OnARTTrigger1 -> treat"
        );
    }

    #[test]
    fn test_always_negative_branch_is_not_an_edge() {
        let mut c = campaign();
        let never = PiecewiseDiagnostic::step(
            ValueMap::always_negative(),
            Outcomes::both(CustomSignal::OnArtTrigger2, CustomSignal::HctUptakePostDebutTrigger2),
        )
        .unwrap();
        listen(&mut c, "never", CustomSignal::HctUptakePostDebut8, vec![never.into()]);
        c.add_scheduled(Scheduled::new(
            "seed",
            1990.0,
            vec![BroadcastEvent::new(CustomSignal::HctUptakePostDebut8).into()],
        ))
        .unwrap();
        let graph = SignalGraph::build(&c);
        let targets: Vec<Signal> = graph.edges().iter().map(|e| e.to).collect();
        assert_eq!(
            targets,
            vec![Signal::from(CustomSignal::HctUptakePostDebutTrigger2)]
        );
    }
}
