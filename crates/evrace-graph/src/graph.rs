// crates/evrace-graph/src/graph.rs

//! Append-only happens-before graph over dense event ids.
//!
//! Node `i` of the underlying `petgraph` graph is event `i`; nodes are only
//! ever appended, so indices never shift. Edges form a set (no duplicates, no
//! self-edges) and are never removed. Pruned events are *marked* dropped
//! instead of deleted, which keeps every `has_path` answer monotone.

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

use evrace_core::{EventId, Trace};
use petgraph::algo::has_path_connecting;
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::EdgeRef;
use petgraph::Direction;

/// Directed ordering graph: an edge `a → b` means all effects of `a` precede `b`.
#[derive(Clone, Debug, Default)]
pub struct HappensBeforeGraph {
    g: DiGraph<(), ()>,
    dropped: Vec<bool>,
}

#[inline]
pub(crate) fn ix(id: EventId) -> NodeIndex {
    NodeIndex::new(id as usize)
}

impl HappensBeforeGraph {
    /// Empty graph.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Graph with nodes `0..n` and no edges.
    #[must_use]
    pub fn with_nodes(n: usize) -> Self {
        let mut g = Self::new();
        g.add_nodes_up_to(n);
        g
    }

    /// Seed from a trace: one node per event, one edge per distinct arc pair.
    #[must_use]
    pub fn from_trace(trace: &Trace) -> Self {
        let mut g = Self::with_nodes(trace.event_count());
        for a in trace.arcs() {
            g.add_edge_if_needed(a.tail, a.head);
        }
        g
    }

    /// Ensure nodes `0..n` exist.
    pub fn add_nodes_up_to(&mut self, n: usize) {
        while self.g.node_count() < n {
            self.g.add_node(());
            self.dropped.push(false);
        }
    }

    /// Number of nodes.
    #[inline]
    #[must_use]
    pub fn node_count(&self) -> usize {
        self.g.node_count()
    }

    /// Number of distinct edges.
    #[inline]
    #[must_use]
    pub fn edge_count(&self) -> usize {
        self.g.edge_count()
    }

    /// Whether `id` names an existing node.
    #[inline]
    #[must_use]
    pub fn contains(&self, id: EventId) -> bool {
        (id as usize) < self.node_count()
    }

    fn check(&self, id: EventId) {
        assert!(
            self.contains(id),
            "event {id} outside graph of {} nodes",
            self.node_count()
        );
    }

    /// Add `tail → head` unless present. Self-edges are refused.
    ///
    /// Returns `true` if an edge was inserted.
    ///
    /// # Panics
    /// Panics if either id is not a node.
    pub fn add_edge_if_needed(&mut self, tail: EventId, head: EventId) -> bool {
        self.check(tail);
        self.check(head);
        if tail == head || self.has_edge(tail, head) {
            return false;
        }
        self.g.add_edge(ix(tail), ix(head), ());
        true
    }

    /// Whether the direct edge `tail → head` exists.
    #[inline]
    #[must_use]
    pub fn has_edge(&self, tail: EventId, head: EventId) -> bool {
        self.contains(tail) && self.contains(head) && self.g.find_edge(ix(tail), ix(head)).is_some()
    }

    /// Whether `a` happens-before `b`, directly or transitively.
    ///
    /// Always `false` for `a == b` and for unknown ids.
    #[must_use]
    pub fn has_path(&self, a: EventId, b: EventId) -> bool {
        if a == b || !self.contains(a) || !self.contains(b) {
            return false;
        }
        has_path_connecting(&self.g, ix(a), ix(b), None)
    }

    /// Direct successors of `id`.
    pub fn successors(&self, id: EventId) -> impl Iterator<Item = EventId> + '_ {
        self.g
            .neighbors_directed(ix(id), Direction::Outgoing)
            .map(|n| n.index() as EventId)
    }

    /// Direct predecessors of `id`.
    pub fn predecessors(&self, id: EventId) -> impl Iterator<Item = EventId> + '_ {
        self.g
            .neighbors_directed(ix(id), Direction::Incoming)
            .map(|n| n.index() as EventId)
    }

    /// All edges as `(tail, head)` in insertion order.
    pub fn edges(&self) -> impl Iterator<Item = (EventId, EventId)> + '_ {
        self.g
            .edge_references()
            .map(|e| (e.source().index() as EventId, e.target().index() as EventId))
    }

    /// Exclude `id` from further graph extension. Its edges stay.
    ///
    /// # Panics
    /// Panics if `id` is not a node.
    pub fn mark_dropped(&mut self, id: EventId) {
        self.check(id);
        self.dropped[id as usize] = true;
    }

    /// Whether `id` was pruned by the normalizer.
    #[inline]
    #[must_use]
    pub fn is_dropped(&self, id: EventId) -> bool {
        self.dropped.get(id as usize).copied().unwrap_or(false)
    }

    /// Ids of dropped events in ascending order.
    pub fn dropped(&self) -> impl Iterator<Item = EventId> + '_ {
        self.dropped
            .iter()
            .enumerate()
            .filter(|(_, d)| **d)
            .map(|(i, _)| i as EventId)
    }

    /// Underlying petgraph graph (node index == event id).
    #[inline]
    #[must_use]
    pub const fn inner(&self) -> &DiGraph<(), ()> {
        &self.g
    }
}
