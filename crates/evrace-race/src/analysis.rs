// crates/evrace-race/src/analysis.rs

//! The loaded-trace façade: load, build the graph, detect races, then answer
//! read-only queries for as long as the value lives.
//!
//! A [`LoadedTrace`] only exists after a fully successful load, so "the trace
//! failed to load" (`Err`) can never be mistaken for "no races" (`Ok` with
//! [`LoadedTrace::race_count`] of zero).

use crate::detector::{RaceDetector, RaceReport};
use evrace_core::{
    AnalysisOptions, Arc, Command, CommandKind, Event, EventId, EventType, StringTable, Table,
    TraceLog, TraceResult,
};
use evrace_graph::{build_happens_before, reach::FrozenGraph, GraphStats};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use std::time::Instant;
use tracing::info;

/// Counts over the raw trace.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct TraceStats {
    /// Events.
    pub events: usize,
    /// Commands across all events.
    pub commands: usize,
    /// Commands per kind.
    pub commands_by_kind: BTreeMap<CommandKind, usize>,
    /// Events per type.
    pub events_by_type: BTreeMap<EventType, usize>,
    /// Arcs as recorded (duplicates included).
    pub arcs: usize,
    /// Arcs carrying a delay.
    pub timed_arcs: usize,
    /// Variable names.
    pub variables: usize,
    /// Scope names.
    pub scopes: usize,
    /// Whether the script table was present.
    pub has_scripts: bool,
    /// Whether the value table was present.
    pub has_values: bool,
}

impl TraceStats {
    /// Tally a loaded log.
    #[must_use]
    pub fn of(log: &TraceLog) -> Self {
        let mut s = Self {
            events: log.trace.event_count(),
            arcs: log.trace.arcs().len(),
            timed_arcs: log.trace.arcs().iter().filter(|a| a.delay().is_some()).count(),
            variables: log.variables.len(),
            scopes: log.scopes.len(),
            has_scripts: log.scripts.is_some(),
            has_values: log.values.is_some(),
            ..Self::default()
        };
        for ev in log.trace.events() {
            *s.events_by_type.entry(ev.ty).or_default() += 1;
            for c in &ev.commands {
                s.commands += 1;
                *s.commands_by_kind.entry(c.kind).or_default() += 1;
            }
        }
        s
    }
}

/// Everything measured while building a [`LoadedTrace`].
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct PipelineStats {
    /// Raw trace counts.
    pub trace: TraceStats,
    /// Graph construction counts.
    pub graph: GraphStats,
    /// Races found.
    pub races: usize,
    /// Wall time for graph construction, in microseconds.
    pub graph_micros: u64,
    /// Wall time for race detection, in microseconds.
    pub detect_micros: u64,
}

/// One fully analysed trace: tables, events, final graph and race reports.
#[derive(Debug)]
pub struct LoadedTrace {
    log: TraceLog,
    graph: FrozenGraph,
    races: Vec<RaceReport>,
    stats: PipelineStats,
    options: AnalysisOptions,
}

fn micros(since: Instant) -> u64 {
    u64::try_from(since.elapsed().as_micros()).unwrap_or(u64::MAX)
}

impl LoadedTrace {
    /// Load a binary trace file and analyse it.
    ///
    /// # Errors
    /// Any [`evrace_core::TraceError`] from opening or decoding the file. No
    /// analysis runs on failure.
    pub fn open<P: AsRef<Path>>(path: P, options: &AnalysisOptions) -> TraceResult<Self> {
        let log = evrace_trace::decode::load_log(path)?;
        Ok(Self::from_log(log, options))
    }

    /// Analyse an already decoded log.
    #[must_use]
    pub fn from_log(log: TraceLog, options: &AnalysisOptions) -> Self {
        let t0 = Instant::now();
        let (graph, graph_stats) = build_happens_before(&log.trace, &log.scopes, options);
        let graph_micros = micros(t0);

        let t1 = Instant::now();
        let races = RaceDetector::new(&log.trace, &graph, options.race).detect();
        let detect_micros = micros(t1);

        let stats = PipelineStats {
            trace: TraceStats::of(&log),
            graph: graph_stats,
            races: races.len(),
            graph_micros,
            detect_micros,
        };
        info!(
            events = stats.trace.events,
            arcs = stats.trace.arcs,
            edges = stats.graph.final_edges,
            races = stats.races,
            "trace analysed"
        );
        Self {
            log,
            graph,
            races,
            stats,
            options: options.clone(),
        }
    }

    /// Number of events.
    #[must_use]
    pub fn event_count(&self) -> usize {
        self.log.trace.event_count()
    }

    /// Event by id.
    #[must_use]
    pub fn event(&self, id: EventId) -> Option<&Event> {
        self.log.trace.event(id)
    }

    /// Command `index` of event `id`.
    #[must_use]
    pub fn command(&self, id: EventId, index: usize) -> Option<Command> {
        self.log.trace.command(id, index)
    }

    /// Number of recorded arcs.
    #[must_use]
    pub fn arc_count(&self) -> usize {
        self.log.trace.arcs().len()
    }

    /// Arc by index.
    #[must_use]
    pub fn arc(&self, index: usize) -> Option<Arc> {
        self.log.trace.arcs().get(index).copied()
    }

    /// Resolve `id` in `table`; `None` when the table is absent or the id was
    /// never written.
    #[must_use]
    pub fn string_for(&self, table: Table, id: i32) -> Option<&str> {
        self.log.string_for(table, id)
    }

    /// Like [`Self::string_for`], rendering misses as `(unknown)`.
    #[must_use]
    pub fn display_string(&self, table: Table, id: i32) -> &str {
        self.log.display_string(table, id)
    }

    /// Number of races.
    #[must_use]
    pub fn race_count(&self) -> usize {
        self.races.len()
    }

    /// Race by index, in detection order.
    #[must_use]
    pub fn race(&self, index: usize) -> Option<&RaceReport> {
        self.races.get(index)
    }

    /// All races in detection order.
    #[must_use]
    pub fn races(&self) -> &[RaceReport] {
        &self.races
    }

    /// Whether `a` happens-before `b` in the final graph.
    #[must_use]
    pub fn happens_before(&self, a: EventId, b: EventId) -> bool {
        self.graph.has_path(a, b)
    }

    /// Final graph.
    #[must_use]
    pub const fn graph(&self) -> &FrozenGraph {
        &self.graph
    }

    /// Underlying log.
    #[must_use]
    pub const fn log(&self) -> &TraceLog {
        &self.log
    }

    /// Variable table.
    #[must_use]
    pub const fn variables(&self) -> &StringTable {
        &self.log.variables
    }

    /// Pipeline measurements.
    #[must_use]
    pub const fn stats(&self) -> &PipelineStats {
        &self.stats
    }

    /// Options the trace was analysed with.
    #[must_use]
    pub const fn options(&self) -> &AnalysisOptions {
        &self.options
    }
}
