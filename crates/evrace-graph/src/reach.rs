// crates/evrace-graph/src/reach.rs

//! Frozen, read-only view of the final graph for concurrent path queries.
//!
//! Reachability from a source is computed once on first use and cached per
//! source, so a shared `&FrozenGraph` can be queried from many rayon workers.
//!
//! Every cached source holds a visit bitset over all nodes, so memory is
//! `queried sources × nodes` bits: quadratic in the worst case (about 1.25 GB
//! at 100k events if every event is queried). Race detection only queries
//! events that read or write a tracked variable.

use crate::graph::{ix, HappensBeforeGraph};
use evrace_core::EventId;
use once_cell::sync::OnceCell;
use petgraph::graph::DiGraph;
use petgraph::visit::{Dfs, VisitMap, Visitable};

type Reached = <DiGraph<(), ()> as Visitable>::Map;

/// Immutable happens-before graph with memoized reachability.
#[derive(Debug)]
pub struct FrozenGraph {
    graph: HappensBeforeGraph,
    reach: Vec<OnceCell<Reached>>,
}

impl FrozenGraph {
    /// Freeze a fully built graph. No edge can be added afterwards.
    #[must_use]
    pub fn new(graph: HappensBeforeGraph) -> Self {
        let reach = (0..graph.node_count()).map(|_| OnceCell::new()).collect();
        Self { graph, reach }
    }

    fn reached_from(&self, a: EventId) -> &Reached {
        self.reach[a as usize].get_or_init(|| {
            let g = self.graph.inner();
            let mut dfs = Dfs::new(g, ix(a));
            while dfs.next(g).is_some() {}
            dfs.discovered
        })
    }

    /// Whether `a` happens-before `b`. Always `false` for `a == b`.
    #[must_use]
    pub fn has_path(&self, a: EventId, b: EventId) -> bool {
        if a == b || !self.graph.contains(a) || !self.graph.contains(b) {
            return false;
        }
        self.reached_from(a).is_visited(&ix(b))
    }

    /// Whether `a` and `b` are ordered in either direction.
    #[must_use]
    pub fn ordered(&self, a: EventId, b: EventId) -> bool {
        self.has_path(a, b) || self.has_path(b, a)
    }

    /// The frozen graph.
    #[must_use]
    pub const fn graph(&self) -> &HappensBeforeGraph {
        &self.graph
    }

    /// Number of sources whose reachability has been computed so far.
    #[must_use]
    pub fn cached_sources(&self) -> usize {
        self.reach.iter().filter(|c| c.get().is_some()).count()
    }
}
