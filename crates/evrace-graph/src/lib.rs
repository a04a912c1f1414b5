// crates/evrace-graph/src/lib.rs

//! Happens-before graph construction for evrace.
//!
//! The graph is built exactly once per loaded trace:
//!
//! 1. seed one edge per distinct arc pair ([`graph::HappensBeforeGraph::from_trace`]),
//! 2. run the normalizer passes in order ([`normalize::GraphNormalizer`]),
//! 3. add delay-derived timer ordering ([`timers::TimerAugmenter`]),
//! 4. freeze for read-only, shareable path queries ([`reach::FrozenGraph`]).
//!
//! [`build_happens_before`] runs the whole sequence.

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
#![allow(
    clippy::module_name_repetitions,
    clippy::cast_possible_truncation,
    clippy::doc_markdown
)]

/// DOT and edge-list export.
pub mod export;
/// Append-only graph over dense event ids.
pub mod graph;
/// Structural normalization passes.
pub mod normalize;
/// Frozen graph with memoized reachability.
pub mod reach;
/// Timer delay ordering.
pub mod timers;

use evrace_core::{AnalysisOptions, StringTable, Trace};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::graph::HappensBeforeGraph;
use crate::normalize::{GraphNormalizer, NormalizeStats};
use crate::reach::FrozenGraph;
use crate::timers::{TimerAugmenter, TimerStats};

/// Edge counts and pass statistics for one graph build.
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct GraphStats {
    /// Nodes (== events).
    pub nodes: usize,
    /// Distinct edges seeded from arcs.
    pub seeded_edges: usize,
    /// Normalizer statistics.
    pub normalize: NormalizeStats,
    /// Timer augmentation statistics.
    pub timers: TimerStats,
    /// Edges in the final graph.
    pub final_edges: usize,
}

/// Seed, normalize, augment and freeze the graph for `trace`.
///
/// `scopes` is the scope-name table used to classify script/resource events.
#[must_use]
pub fn build_happens_before(
    trace: &Trace,
    scopes: &StringTable,
    opts: &AnalysisOptions,
) -> (FrozenGraph, GraphStats) {
    let seeded = HappensBeforeGraph::from_trace(trace);
    let seeded_edges = seeded.edge_count();

    let (normalized, normalize) =
        GraphNormalizer::new(trace, scopes, seeded, &opts.normalize).run();
    let (augmented, timers) = TimerAugmenter::new(trace, &opts.timers).augment(&normalized);

    let stats = GraphStats {
        nodes: augmented.node_count(),
        seeded_edges,
        normalize,
        timers,
        final_edges: augmented.edge_count(),
    };
    info!(
        nodes = stats.nodes,
        seeded = stats.seeded_edges,
        dropped = stats.normalize.dropped,
        final_edges = stats.final_edges,
        "happens-before graph built"
    );
    (FrozenGraph::new(augmented), stats)
}
