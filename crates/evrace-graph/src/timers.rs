// crates/evrace-graph/src/timers.rs

//! Delay-derived ordering between timers scheduled from a common origin.
//!
//! For one origin `A`, the timer arcs `(A, Bi, di)` are sorted by delay and
//! grouped by equal delay. Each member of a group is ordered before each member
//! of the next larger group; transitivity then orders every smaller delay
//! before every larger one. Equal delays stay unordered.

use crate::graph::HappensBeforeGraph;
use evrace_core::{EventId, TimerOptions, Trace};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::debug;

/// What the augmentation did.
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct TimerStats {
    /// Origins with at least two distinct timer heads.
    pub origins: usize,
    /// Timer arcs considered after deduplication.
    pub timer_arcs: usize,
    /// Edges added.
    pub edges_added: usize,
}

/// Builds the timer-augmented graph from a normalized one.
#[derive(Debug, Clone, Copy)]
pub struct TimerAugmenter<'a> {
    trace: &'a Trace,
    opts: &'a TimerOptions,
}

impl<'a> TimerAugmenter<'a> {
    /// Bind to a trace and its options.
    #[must_use]
    pub const fn new(trace: &'a Trace, opts: &'a TimerOptions) -> Self {
        Self { trace, opts }
    }

    /// Timer heads per origin as `(delay, head)`, first arc per head only,
    /// in arc order.
    fn timer_arcs(&self, base: &HappensBeforeGraph) -> BTreeMap<EventId, Vec<(u32, EventId)>> {
        let mut by_origin: BTreeMap<EventId, Vec<(u32, EventId)>> = BTreeMap::new();
        for arc in self.trace.arcs() {
            let Some(delay) = arc.delay() else { continue };
            if arc.tail == arc.head || base.is_dropped(arc.head) {
                continue;
            }
            let is_timer = self
                .trace
                .event(arc.head)
                .is_some_and(|ev| self.opts.timer_types.contains(&ev.ty));
            if !is_timer {
                continue;
            }
            let heads = by_origin.entry(arc.tail).or_default();
            if !heads.iter().any(|&(_, h)| h == arc.head) {
                heads.push((delay, arc.head));
            }
        }
        by_origin
    }

    /// Copy `base` and add the delay ordering. `base` is left untouched.
    #[must_use]
    pub fn augment(&self, base: &HappensBeforeGraph) -> (HappensBeforeGraph, TimerStats) {
        let mut g = base.clone();
        let mut stats = TimerStats::default();
        if !self.opts.enabled {
            debug!("timers: disabled");
            return (g, stats);
        }

        for (origin, mut heads) in self.timer_arcs(base) {
            stats.timer_arcs += heads.len();
            if heads.len() < 2 {
                continue;
            }
            stats.origins += 1;
            heads.sort_unstable();
            let mut groups: Vec<(u32, Vec<EventId>)> = Vec::new();
            for (delay, head) in heads {
                match groups.last_mut() {
                    Some((d, members)) if *d == delay => members.push(head),
                    _ => groups.push((delay, vec![head])),
                }
            }
            for pair in groups.windows(2) {
                for &earlier in &pair[0].1 {
                    for &later in &pair[1].1 {
                        stats.edges_added += usize::from(g.add_edge_if_needed(earlier, later));
                    }
                }
            }
            debug!(origin, groups = groups.len(), "timers: ordered origin");
        }

        debug!(
            origins = stats.origins,
            timer_arcs = stats.timer_arcs,
            added = stats.edges_added,
            "timers: augmentation done"
        );
        (g, stats)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use evrace_core::{Arc, Command, Event, EventType};

    fn timer_trace(arcs: Vec<Arc>, n: usize) -> Trace {
        let mut events = vec![Event::new(EventType::Network, vec![Command::write(0)])];
        events.extend((1..n).map(|_| Event::new(EventType::Timer, vec![Command::write(0)])));
        Trace::new(events, arcs).unwrap()
    }

    fn augment(trace: &Trace, opts: &TimerOptions) -> (HappensBeforeGraph, TimerStats) {
        TimerAugmenter::new(trace, opts).augment(&HappensBeforeGraph::from_trace(trace))
    }

    #[test]
    fn equal_delays_stay_unordered() {
        let trace = timer_trace(vec![Arc::new(0, 1, 10), Arc::new(0, 2, 10)], 3);
        let (g, stats) = augment(&trace, &TimerOptions::default());
        assert_eq!(stats.edges_added, 0);
        assert!(!g.has_path(1, 2));
        assert!(!g.has_path(2, 1));
    }

    #[test]
    fn shorter_delay_precedes_longer() {
        // delays: 1 -> 30, 2 -> 10, 3 -> 10, 4 -> 20
        let trace = timer_trace(
            vec![
                Arc::new(0, 1, 30),
                Arc::new(0, 2, 10),
                Arc::new(0, 3, 10),
                Arc::new(0, 4, 20),
            ],
            5,
        );
        let (g, stats) = augment(&trace, &TimerOptions::default());
        assert_eq!(stats.origins, 1);
        assert_eq!(stats.edges_added, 3);
        assert!(g.has_path(2, 4) && g.has_path(3, 4) && g.has_path(4, 1));
        assert!(g.has_path(2, 1));
        assert!(!g.has_path(2, 3) && !g.has_path(3, 2));
        assert!(!g.has_path(1, 2));
    }

    #[test]
    fn first_arc_per_head_wins_and_untimed_is_ignored() {
        let trace = timer_trace(
            vec![
                Arc::new(0, 1, 5),
                Arc::new(0, 1, 50),
                Arc::new(0, 2, 20),
                Arc::new(0, 3, -1),
            ],
            4,
        );
        let (g, stats) = augment(&trace, &TimerOptions::default());
        assert_eq!(stats.timer_arcs, 2);
        assert!(g.has_edge(1, 2));
        assert!(!g.has_path(2, 1));
        assert!(!g.has_path(3, 1) && !g.has_path(1, 3));
    }

    #[test]
    fn non_timer_heads_and_disabled_option() {
        let trace = Trace::new(
            vec![
                Event::new(EventType::Network, vec![]),
                Event::new(EventType::Network, vec![Command::read(0)]),
                Event::new(EventType::Timer, vec![Command::write(0)]),
            ],
            vec![Arc::new(0, 1, 1), Arc::new(0, 2, 9)],
        )
        .unwrap();
        let (_, stats) = augment(&trace, &TimerOptions::default());
        assert_eq!(stats.timer_arcs, 1);
        assert_eq!(stats.edges_added, 0);

        let network_timers = TimerOptions {
            timer_types: vec![EventType::Timer, EventType::Network],
            ..TimerOptions::default()
        };
        let (g, _) = augment(&trace, &network_timers);
        assert!(g.has_edge(1, 2));

        let off = TimerOptions {
            enabled: false,
            ..network_timers
        };
        let (g, stats) = augment(&trace, &off);
        assert_eq!(stats, TimerStats::default());
        assert!(!g.has_edge(1, 2));
    }

    #[test]
    fn base_graph_is_not_mutated() {
        let trace = timer_trace(vec![Arc::new(0, 1, 1), Arc::new(0, 2, 2)], 3);
        let base = HappensBeforeGraph::from_trace(&trace);
        let before = base.edge_count();
        let opts = TimerOptions::default();
        let (g, _) = TimerAugmenter::new(&trace, &opts).augment(&base);
        assert_eq!(base.edge_count(), before);
        assert_eq!(g.edge_count(), before + 1);
    }
}
