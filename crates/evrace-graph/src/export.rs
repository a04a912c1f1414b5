// crates/evrace-graph/src/export.rs

//! Graph export: a JSON/CBOR-friendly edge list and Graphviz DOT.

use crate::graph::HappensBeforeGraph;
use evrace_core::EventId;
use petgraph::dot::{Config, Dot};
use petgraph::graph::NodeIndex;
use serde::{Deserialize, Serialize};

/// Serializable snapshot of a happens-before graph.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct GraphExport {
    /// Node count; nodes are `0..nodes`.
    pub nodes: u32,
    /// Edges as `[tail, head]` in insertion order.
    pub edges: Vec<[EventId; 2]>,
    /// Dropped event ids, ascending.
    pub dropped: Vec<EventId>,
}

impl From<&HappensBeforeGraph> for GraphExport {
    fn from(g: &HappensBeforeGraph) -> Self {
        Self {
            nodes: g.node_count() as u32,
            edges: g.edges().map(|(t, h)| [t, h]).collect(),
            dropped: g.dropped().collect(),
        }
    }
}

/// Render as DOT; nodes are labelled with their event id and dropped events
/// are drawn dashed.
#[must_use]
pub fn to_dot(g: &HappensBeforeGraph) -> String {
    let node_attrs = |_, (ix, _): (NodeIndex, &())| {
        let id = ix.index();
        if g.is_dropped(id as EventId) {
            format!("label = \"{id}\" style = dashed")
        } else {
            format!("label = \"{id}\"")
        }
    };
    let dot = Dot::with_attr_getters(
        g.inner(),
        &[Config::NodeNoLabel, Config::EdgeNoLabel],
        &|_, _| String::new(),
        &node_attrs,
    );
    format!("{dot:?}")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> HappensBeforeGraph {
        let mut g = HappensBeforeGraph::with_nodes(3);
        g.add_edge_if_needed(0, 1);
        g.add_edge_if_needed(1, 2);
        g.mark_dropped(2);
        g
    }

    #[test]
    fn edge_list_snapshot() {
        let e = GraphExport::from(&sample());
        assert_eq!(e.nodes, 3);
        assert_eq!(e.edges, vec![[0, 1], [1, 2]]);
        assert_eq!(e.dropped, vec![2]);
        let json = serde_json::to_string(&e).unwrap();
        assert_eq!(json, r#"{"nodes":3,"edges":[[0,1],[1,2]],"dropped":[2]}"#);
    }

    #[test]
    fn dot_labels_and_styles() {
        let dot = to_dot(&sample());
        assert!(dot.starts_with("digraph {"));
        assert!(dot.contains("label = \"0\""));
        assert!(dot.contains("style = dashed"));
        assert!(dot.contains("0 -> 1"));
        assert!(dot.contains("1 -> 2"));
    }
}
