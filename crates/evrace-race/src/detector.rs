// crates/evrace-race/src/detector.rs

//! Per-variable race detection against a frozen happens-before graph.
//!
//! Accesses are collected in one pass over every event's commands, grouped by
//! variable id. For each variable (ascending), every access pair `(x, y)` with
//! `x` before `y` by `(event, command index)` is tested unless both are reads
//! or both come from the same event. A pair whose events are unordered in both
//! directions is a race.
//!
//! The pairwise test is quadratic in the accesses per variable. Traces are
//! bounded and per-variable fan-out is small, so no indexing is attempted.
//! Path queries go through [`FrozenGraph`], which caches one node-wide bitset
//! per queried event; that cache is the other quadratic term, in memory.

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

use evrace_core::{CommandKind, EventId, RaceOptions, ScopeId, Trace, VarId};
use evrace_graph::reach::FrozenGraph;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use tracing::debug;

/// Kind of memory access.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum AccessKind {
    /// `ReadMemory`.
    Read,
    /// `WriteMemory`.
    Write,
}

impl AccessKind {
    /// Map a command kind; `None` for non-access commands.
    #[must_use]
    pub const fn from_command(kind: CommandKind) -> Option<Self> {
        match kind {
            CommandKind::ReadMemory => Some(Self::Read),
            CommandKind::WriteMemory => Some(Self::Write),
            _ => None,
        }
    }
}

/// One side of a race: where the access happened.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct Access {
    /// Event holding the access.
    pub event: EventId,
    /// Index of the access in the event's command list.
    pub command: u32,
    /// Read or write.
    pub kind: AccessKind,
}

/// Two accesses to one variable from events the graph leaves unordered.
///
/// `first` precedes `second` in `(event, command)` order; the reverse pair is
/// never reported.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct RaceReport {
    /// Variable both accesses touch.
    pub var: VarId,
    /// Earlier access in enumeration order.
    pub first: Access,
    /// Later access in enumeration order.
    pub second: Access,
    /// Innermost scope open around both accesses, if any. Advisory only.
    pub covering_scope: Option<ScopeId>,
}

#[derive(Clone, Debug)]
struct Observation {
    access: Access,
    /// Open scopes, outermost first; `None` for an unknown scope.
    scopes: Vec<Option<ScopeId>>,
}

impl Observation {
    fn covering_scope(&self, other: &Self) -> Option<ScopeId> {
        self.scopes
            .iter()
            .rev()
            .flatten()
            .copied()
            .find(|s| other.scopes.contains(&Some(*s)))
    }
}

/// Finds races on a loaded trace.
#[derive(Debug)]
pub struct RaceDetector<'a> {
    trace: &'a Trace,
    graph: &'a FrozenGraph,
    opts: RaceOptions,
}

impl<'a> RaceDetector<'a> {
    /// Bind to a trace and its final graph.
    ///
    /// # Panics
    /// Panics if the graph does not cover every event.
    #[must_use]
    pub fn new(trace: &'a Trace, graph: &'a FrozenGraph, opts: RaceOptions) -> Self {
        assert!(
            graph.graph().node_count() >= trace.event_count(),
            "graph has {} nodes for {} events",
            graph.graph().node_count(),
            trace.event_count()
        );
        Self { trace, graph, opts }
    }

    /// Accesses grouped by variable, each list in `(event, command)` order.
    /// Accesses to an unknown variable are not tracked.
    fn observations(&self) -> BTreeMap<VarId, Vec<Observation>> {
        let mut per_var: BTreeMap<VarId, Vec<Observation>> = BTreeMap::new();
        for (id, ev) in self.trace.iter_events() {
            let mut scopes: Vec<Option<ScopeId>> = Vec::new();
            for (idx, cmd) in ev.commands.iter().enumerate() {
                match cmd.kind {
                    CommandKind::EnterScope => scopes.push(cmd.location()),
                    CommandKind::ExitScope => {
                        scopes.pop();
                    }
                    kind => {
                        let (Some(kind), Some(var)) = (AccessKind::from_command(kind), cmd.location())
                        else {
                            continue;
                        };
                        per_var.entry(var).or_default().push(Observation {
                            access: Access {
                                event: id,
                                command: idx as u32,
                                kind,
                            },
                            scopes: scopes.clone(),
                        });
                    }
                }
            }
        }
        per_var
    }

    fn detect_var(&self, var: VarId, obs: &[Observation]) -> Vec<RaceReport> {
        let mut out = Vec::new();
        let mut seen_pairs: HashSet<(EventId, EventId)> = HashSet::new();
        for (i, x) in obs.iter().enumerate() {
            for y in &obs[i + 1..] {
                if x.access.event == y.access.event {
                    continue;
                }
                if x.access.kind == AccessKind::Read && y.access.kind == AccessKind::Read {
                    continue;
                }
                if self.graph.ordered(x.access.event, y.access.event) {
                    continue;
                }
                if self.opts.one_per_event_pair
                    && !seen_pairs.insert((x.access.event, y.access.event))
                {
                    continue;
                }
                out.push(RaceReport {
                    var,
                    first: x.access,
                    second: y.access,
                    covering_scope: x.covering_scope(y),
                });
            }
        }
        out
    }

    /// All races, ordered by variable id then access-pair enumeration order.
    ///
    /// The order does not depend on [`RaceOptions::parallel`].
    #[must_use]
    pub fn detect(&self) -> Vec<RaceReport> {
        let per_var: Vec<(VarId, Vec<Observation>)> = self.observations().into_iter().collect();
        let accesses: usize = per_var.iter().map(|(_, o)| o.len()).sum();

        let races: Vec<RaceReport> = if self.opts.parallel {
            per_var
                .par_iter()
                .map(|(var, obs)| self.detect_var(*var, obs))
                .collect::<Vec<_>>()
                .into_iter()
                .flatten()
                .collect()
        } else {
            per_var
                .iter()
                .flat_map(|(var, obs)| self.detect_var(*var, obs))
                .collect()
        };

        debug!(
            variables = per_var.len(),
            accesses,
            races = races.len(),
            parallel = self.opts.parallel,
            "race detection done"
        );
        races
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use evrace_core::{AnalysisOptions, Arc, Command, Event, EventType, StringTable};
    use evrace_graph::build_happens_before;

    fn races(trace: &Trace, opts: RaceOptions) -> Vec<RaceReport> {
        let (g, _) = build_happens_before(trace, &StringTable::new(), &AnalysisOptions::default());
        RaceDetector::new(trace, &g, opts).detect()
    }

    fn net(cmds: Vec<Command>) -> Event {
        Event::new(EventType::Network, cmds)
    }

    #[test]
    fn read_read_and_same_event_are_not_races() {
        let trace = Trace::new(
            vec![
                net(vec![Command::read(0), Command::write(0)]),
                net(vec![Command::read(0)]),
            ],
            vec![],
        )
        .unwrap();
        let r = races(&trace, RaceOptions::default());
        assert_eq!(r.len(), 1);
        assert_eq!(r[0].first, Access { event: 0, command: 1, kind: AccessKind::Write });
        assert_eq!(r[0].second, Access { event: 1, command: 0, kind: AccessKind::Read });
    }

    #[test]
    fn unknown_variable_is_ignored() {
        let trace = Trace::new(
            vec![
                net(vec![Command::new(CommandKind::WriteMemory, -1)]),
                net(vec![Command::new(CommandKind::WriteMemory, -1)]),
            ],
            vec![],
        )
        .unwrap();
        assert!(races(&trace, RaceOptions::default()).is_empty());
    }

    #[test]
    fn covering_scope_is_innermost_shared() {
        let body = vec![
            Command::enter(3),
            Command::enter(5),
            Command::write(0),
            Command::exit(),
            Command::exit(),
        ];
        let other = vec![Command::enter(3), Command::write(0), Command::exit()];
        let trace = Trace::new(vec![net(body), net(other), net(vec![Command::read(0)])], vec![])
            .unwrap();
        let r = races(&trace, RaceOptions::default());
        assert_eq!(r.len(), 3);
        assert_eq!(r[0].covering_scope, Some(3));
        assert_eq!(r[1].covering_scope, None);
        assert_eq!(r[2].covering_scope, None);
    }

    #[test]
    fn one_per_event_pair_keeps_the_first() {
        let trace = Trace::new(
            vec![
                net(vec![Command::write(0), Command::write(0)]),
                net(vec![Command::read(0), Command::read(0)]),
            ],
            vec![],
        )
        .unwrap();
        assert_eq!(races(&trace, RaceOptions::default()).len(), 4);
        let r = races(
            &trace,
            RaceOptions {
                one_per_event_pair: true,
                ..RaceOptions::default()
            },
        );
        assert_eq!(r.len(), 1);
        assert_eq!((r[0].first.command, r[0].second.command), (0, 0));
    }

    #[test]
    fn parallel_matches_sequential() {
        let trace = Trace::new(
            (0..12)
                .map(|i| net(vec![Command::write(i % 3), Command::read((i + 1) % 3)]))
                .collect(),
            vec![Arc::new(0, 5, -1), Arc::new(2, 7, -1)],
        )
        .unwrap();
        let seq = races(&trace, RaceOptions::default());
        let par = races(
            &trace,
            RaceOptions {
                parallel: true,
                ..RaceOptions::default()
            },
        );
        assert!(!seq.is_empty());
        assert_eq!(seq, par);
    }

    #[test]
    fn reachability_cache_covers_accessing_events_only() {
        let trace = Trace::new(
            vec![
                net(vec![Command::write(0)]),
                net(vec![Command::enter(0), Command::exit()]),
                net(vec![Command::enter(1), Command::exit()]),
                net(vec![Command::read(0)]),
            ],
            vec![],
        )
        .unwrap();
        let (g, _) = build_happens_before(&trace, &StringTable::new(), &AnalysisOptions::default());
        let found = RaceDetector::new(&trace, &g, RaceOptions::default()).detect();
        assert!(found.len() <= 1);
        assert!(g.cached_sources() <= 2, "cached {}", g.cached_sources());
    }
}
