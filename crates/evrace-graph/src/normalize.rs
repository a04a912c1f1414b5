// crates/evrace-graph/src/normalize.rs

//! Structural normalization of the arc-seeded graph.
//!
//! Four passes, each run exactly once and in this order:
//!
//! 1. drop no-follower empty events,
//! 2. independent-exploration ordering (toggleable),
//! 3. script/resource ordering,
//! 4. event-after-target ordering.
//!
//! Every pass only adds edges or marks nodes dropped; a dropped node is never
//! touched by a later pass but its existing edges remain.

#![forbid(unsafe_code)]
#![deny(rust_2018_idioms)]
#![warn(
    missing_docs,
    clippy::all,
    clippy::pedantic,
    clippy::nursery,
    clippy::unwrap_used,
    clippy::expect_used
)]

use crate::graph::HappensBeforeGraph;
use evrace_core::{Event, EventId, NormalizeOptions, StringTable, Trace};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::debug;

/// Normalizer passes in their mandatory order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum Pass {
    /// Drop no-follower empty events.
    DropEmpty,
    /// Chain independently explored roots.
    IndependentExploration,
    /// Serialize script and resource loading.
    ScriptsAndResources,
    /// Order posting events before their targets.
    EventAfterTarget,
    /// All passes ran.
    Done,
}

impl Pass {
    const fn following(self) -> Self {
        match self {
            Self::DropEmpty => Self::IndependentExploration,
            Self::IndependentExploration => Self::ScriptsAndResources,
            Self::ScriptsAndResources => Self::EventAfterTarget,
            Self::EventAfterTarget | Self::Done => Self::Done,
        }
    }
}

/// What each pass did.
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct NormalizeStats {
    /// Events marked dropped by pass 1.
    pub dropped: usize,
    /// Edges added by pass 2.
    pub exploration_edges: usize,
    /// Edges added by pass 3.
    pub script_resource_edges: usize,
    /// Edges added by pass 4.
    pub target_edges: usize,
}

impl NormalizeStats {
    /// Total edges added across passes.
    #[must_use]
    pub const fn edges_added(&self) -> usize {
        self.exploration_edges + self.script_resource_edges + self.target_edges
    }
}

/// Applies the normalization passes to one graph instance.
///
/// ```
/// use evrace_core::{Command, Event, EventType, NormalizeOptions, StringTable, Trace};
/// use evrace_graph::{graph::HappensBeforeGraph, normalize::GraphNormalizer};
///
/// let trace = Trace::new(
///     vec![
///         Event::new(EventType::UserInterface, vec![Command::write(0)]),
///         Event::new(EventType::UserInterface, vec![Command::read(0)]),
///     ],
///     vec![],
/// )
/// .unwrap();
/// let scopes = StringTable::new();
/// let opts = NormalizeOptions::default();
/// let g = HappensBeforeGraph::from_trace(&trace);
/// let (g, stats) = GraphNormalizer::new(&trace, &scopes, g, &opts).run();
/// assert_eq!(stats.exploration_edges, 1);
/// assert!(g.has_path(0, 1));
/// ```
#[derive(Debug)]
pub struct GraphNormalizer<'a> {
    trace: &'a Trace,
    scopes: &'a StringTable,
    opts: &'a NormalizeOptions,
    graph: HappensBeforeGraph,
    next: Pass,
    stats: NormalizeStats,
}

fn has_effect(ev: &Event) -> bool {
    ev.has_memory_access() || ev.trigger_targets().next().is_some()
}

impl<'a> GraphNormalizer<'a> {
    /// Take ownership of an arc-seeded graph.
    ///
    /// # Panics
    /// Panics if the graph has fewer nodes than the trace has events.
    #[must_use]
    pub fn new(
        trace: &'a Trace,
        scopes: &'a StringTable,
        graph: HappensBeforeGraph,
        opts: &'a NormalizeOptions,
    ) -> Self {
        assert!(
            graph.node_count() >= trace.event_count(),
            "graph has {} nodes for {} events",
            graph.node_count(),
            trace.event_count()
        );
        Self {
            trace,
            scopes,
            opts,
            graph,
            next: Pass::DropEmpty,
            stats: NormalizeStats::default(),
        }
    }

    /// Next pass to run.
    #[must_use]
    pub const fn next_pass(&self) -> Pass {
        self.next
    }

    /// Graph as it stands.
    #[must_use]
    pub const fn graph(&self) -> &HappensBeforeGraph {
        &self.graph
    }

    fn enter(&mut self, pass: Pass) {
        assert_eq!(
            self.next, pass,
            "normalizer pass {pass:?} out of order (next is {:?})",
            self.next
        );
        self.next = pass.following();
    }

    fn live(&self, id: EventId) -> bool {
        !self.graph.is_dropped(id)
    }

    /// Pass 1: mark events with no effect and no live follower as dropped,
    /// to a fixpoint. Returns the number of events dropped.
    ///
    /// # Panics
    /// Panics if called out of order.
    pub fn drop_no_follower_empty_events(&mut self) -> usize {
        self.enter(Pass::DropEmpty);
        let n = self.trace.event_count();
        let mut live_out: Vec<usize> = (0..n as EventId)
            .map(|v| self.graph.successors(v).filter(|&s| self.live(s)).count())
            .collect();
        let effect: Vec<bool> = self.trace.events().iter().map(has_effect).collect();

        let mut work: Vec<EventId> = (0..n as EventId)
            .filter(|&v| live_out[v as usize] == 0 && !effect[v as usize])
            .collect();
        let mut dropped = 0;
        while let Some(v) = work.pop() {
            if !self.live(v) || live_out[v as usize] != 0 || effect[v as usize] {
                continue;
            }
            self.graph.mark_dropped(v);
            dropped += 1;
            let preds: Vec<EventId> = self.graph.predecessors(v).collect();
            for p in preds {
                if !self.live(p) {
                    continue;
                }
                let slot = &mut live_out[p as usize];
                *slot = slot.saturating_sub(1);
                if *slot == 0 && !effect[p as usize] {
                    work.push(p);
                }
            }
        }

        self.stats.dropped = dropped;
        debug!(dropped, "normalize: dropped no-follower empty events");
        dropped
    }

    /// Pass 2: chain live roots of an exploration type in id order.
    ///
    /// A no-op (the pass still counts as run) when the policy is disabled.
    /// Returns the number of edges added.
    ///
    /// # Panics
    /// Panics if called out of order.
    pub fn order_independent_exploration(&mut self) -> usize {
        self.enter(Pass::IndependentExploration);
        if !self.opts.independent_exploration {
            debug!("normalize: independent exploration disabled");
            return 0;
        }
        let roots: Vec<EventId> = self
            .trace
            .iter_events()
            .filter(|(id, ev)| {
                self.live(*id)
                    && self.opts.exploration_types.contains(&ev.ty)
                    && !self.graph.predecessors(*id).any(|p| self.live(p))
            })
            .map(|(id, _)| id)
            .collect();

        let added = roots
            .windows(2)
            .filter(|w| self.graph.add_edge_if_needed(w[0], w[1]))
            .count();
        self.stats.exploration_edges = added;
        debug!(roots = roots.len(), added, "normalize: independent exploration");
        added
    }

    fn loading_class(&self, ev: &Event) -> Option<&'a str> {
        let name = self.scopes.get(ev.first_known_scope()?)?;
        self.opts
            .script_scope_prefixes
            .iter()
            .chain(&self.opts.resource_scope_prefixes)
            .find(|p| name.starts_with(p.as_str()))
            .map(String::as_str)
    }

    /// Pass 3: chain live events of the same loading class in id order.
    ///
    /// Returns the number of edges added.
    ///
    /// # Panics
    /// Panics if called out of order.
    pub fn add_script_and_resource_order(&mut self) -> usize {
        self.enter(Pass::ScriptsAndResources);
        let mut last: BTreeMap<&str, EventId> = BTreeMap::new();
        let mut added = 0;
        for (id, ev) in self.trace.iter_events() {
            if !self.live(id) {
                continue;
            }
            let Some(class) = self.loading_class(ev) else {
                continue;
            };
            if let Some(prev) = last.insert(class, id) {
                added += usize::from(self.graph.add_edge_if_needed(prev, id));
            }
        }
        self.stats.script_resource_edges = added;
        debug!(classes = last.len(), added, "normalize: script/resource order");
        added
    }

    /// Pass 4: add `poster → target` for every known `TriggerArc` target.
    ///
    /// Returns the number of edges added.
    ///
    /// # Panics
    /// Panics if called out of order, or on a target outside the trace.
    pub fn add_event_after_target(&mut self) -> usize {
        self.enter(Pass::EventAfterTarget);
        let n = self.trace.event_count();
        let mut added = 0;
        for (id, ev) in self.trace.iter_events() {
            for target in ev.trigger_targets() {
                assert!(
                    (target as usize) < n,
                    "event {id} posts to {target}, outside {n} events"
                );
                if target != id && self.live(id) && self.live(target) {
                    added += usize::from(self.graph.add_edge_if_needed(id, target));
                }
            }
        }
        self.stats.target_edges = added;
        debug!(added, "normalize: event after target");
        added
    }

    /// Run every remaining pass and hand back the graph.
    #[must_use]
    pub fn run(mut self) -> (HappensBeforeGraph, NormalizeStats) {
        while self.next != Pass::Done {
            match self.next {
                Pass::DropEmpty => {
                    self.drop_no_follower_empty_events();
                }
                Pass::IndependentExploration => {
                    self.order_independent_exploration();
                }
                Pass::ScriptsAndResources => {
                    self.add_script_and_resource_order();
                }
                Pass::EventAfterTarget => {
                    self.add_event_after_target();
                }
                Pass::Done => {}
            }
        }
        self.finish()
    }

    /// Hand back the graph once every pass ran.
    ///
    /// # Panics
    /// Panics if any pass is still pending.
    #[must_use]
    pub fn finish(self) -> (HappensBeforeGraph, NormalizeStats) {
        assert_eq!(self.next, Pass::Done, "normalizer finished early");
        (self.graph, self.stats)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use evrace_core::{Arc, Command, EventType};

    fn ev(ty: EventType, cmds: Vec<Command>) -> Event {
        Event::new(ty, cmds)
    }

    fn normalize(
        trace: &Trace,
        scopes: &StringTable,
        opts: &NormalizeOptions,
    ) -> (HappensBeforeGraph, NormalizeStats) {
        GraphNormalizer::new(trace, scopes, HappensBeforeGraph::from_trace(trace), opts).run()
    }

    #[test]
    fn empty_tails_drop_to_fixpoint() {
        // 0 writes -> 1 (empty) -> 2 (empty); 3 empty, isolated.
        let trace = Trace::new(
            vec![
                ev(EventType::Network, vec![Command::write(0)]),
                ev(EventType::Network, vec![]),
                ev(EventType::Network, vec![]),
                ev(EventType::Timer, vec![]),
            ],
            vec![Arc::new(0, 1, -1), Arc::new(1, 2, -1)],
        )
        .unwrap();
        let (g, stats) = normalize(&trace, &StringTable::new(), &NormalizeOptions::default());
        assert_eq!(stats.dropped, 3);
        assert_eq!(g.dropped().collect::<Vec<_>>(), vec![1, 2, 3]);
        // Edges survive.
        assert!(g.has_path(0, 2));
    }

    #[test]
    fn empty_event_with_effectful_follower_is_kept() {
        let trace = Trace::new(
            vec![ev(EventType::Network, vec![]), ev(EventType::Network, vec![Command::read(0)])],
            vec![Arc::new(0, 1, -1)],
        )
        .unwrap();
        let (g, stats) = normalize(&trace, &StringTable::new(), &NormalizeOptions::default());
        assert_eq!(stats.dropped, 0);
        assert!(!g.is_dropped(0));
    }

    #[test]
    fn exploration_chains_ui_roots_only_when_enabled() {
        let trace = Trace::new(
            vec![
                ev(EventType::UserInterface, vec![Command::write(0)]),
                ev(EventType::Network, vec![Command::write(0)]),
                ev(EventType::UserInterface, vec![Command::read(0)]),
                ev(EventType::UserInterface, vec![Command::read(0)]),
            ],
            vec![Arc::new(1, 3, -1)],
        )
        .unwrap();
        let scopes = StringTable::new();

        let on = NormalizeOptions::default();
        let (g, stats) = normalize(&trace, &scopes, &on);
        // Roots of UI type: 0 and 2 (3 has a live predecessor).
        assert_eq!(stats.exploration_edges, 1);
        assert!(g.has_edge(0, 2));
        assert!(!g.has_path(0, 1));

        let off = NormalizeOptions {
            independent_exploration: false,
            ..NormalizeOptions::default()
        };
        let (g, stats) = normalize(&trace, &scopes, &off);
        assert_eq!(stats.exploration_edges, 0);
        assert!(!g.has_path(0, 2));
    }

    #[test]
    fn scripts_and_resources_chain_per_prefix() {
        let scopes: StringTable = ["script:a", "load:img", "handler", "script:b"]
            .into_iter()
            .collect();
        let body = |s| vec![Command::enter(s), Command::write(0), Command::exit()];
        let trace = Trace::new(
            vec![
                ev(EventType::Network, body(0)),
                ev(EventType::Network, body(1)),
                ev(EventType::Network, body(2)),
                ev(EventType::Network, body(3)),
                ev(EventType::Network, body(1)),
            ],
            vec![],
        )
        .unwrap();
        let (g, stats) = normalize(&trace, &scopes, &NormalizeOptions::default());
        assert_eq!(stats.script_resource_edges, 2);
        assert!(g.has_edge(0, 3));
        assert!(g.has_edge(1, 4));
        assert!(!g.has_path(0, 1));
        assert!(!g.has_path(2, 4) && !g.has_path(4, 2));
    }

    #[test]
    fn unknown_first_scope_falls_through_to_next_known() {
        let scopes: StringTable = ["script:x"].into_iter().collect();
        let trace = Trace::new(
            vec![
                ev(
                    EventType::Network,
                    vec![
                        Command::new(evrace_core::CommandKind::EnterScope, -1),
                        Command::enter(0),
                        Command::read(0),
                        Command::exit(),
                        Command::exit(),
                    ],
                ),
                ev(EventType::Network, vec![Command::enter(0), Command::write(0), Command::exit()]),
            ],
            vec![],
        )
        .unwrap();
        let (g, _) = normalize(&trace, &scopes, &NormalizeOptions::default());
        assert!(g.has_edge(0, 1));
    }

    #[test]
    fn triggers_order_poster_before_target() {
        let trace = Trace::new(
            vec![
                ev(EventType::Network, vec![Command::trigger(2), Command::trigger(0)]),
                ev(EventType::Network, vec![Command::write(0)]),
                ev(EventType::Timer, vec![Command::read(0)]),
            ],
            vec![],
        )
        .unwrap();
        let (g, stats) = normalize(&trace, &StringTable::new(), &NormalizeOptions::default());
        assert_eq!(stats.dropped, 0);
        assert_eq!(stats.target_edges, 1);
        assert!(g.has_edge(0, 2));
        assert!(!g.has_path(0, 0));
    }

    #[test]
    #[should_panic(expected = "out of order")]
    fn passes_cannot_be_skipped() {
        let trace = Trace::default();
        let scopes = StringTable::new();
        let opts = NormalizeOptions::default();
        let mut n = GraphNormalizer::new(&trace, &scopes, HappensBeforeGraph::new(), &opts);
        n.add_script_and_resource_order();
    }

    #[test]
    #[should_panic(expected = "out of order")]
    fn passes_cannot_rerun() {
        let trace = Trace::default();
        let scopes = StringTable::new();
        let opts = NormalizeOptions::default();
        let mut n = GraphNormalizer::new(&trace, &scopes, HappensBeforeGraph::new(), &opts);
        n.drop_no_follower_empty_events();
        n.drop_no_follower_empty_events();
    }
}
