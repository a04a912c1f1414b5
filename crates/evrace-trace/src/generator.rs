// crates/evrace-trace/src/generator.rs

//! Deterministic synthetic trace generator used by `evrace simulate`, the
//! bench harness and tests. Output always passes [`Trace::new`] validation.

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

use rand::{rngs::StdRng, Rng as _, SeedableRng};
use serde::{Deserialize, Serialize};

use evrace_core::{
    Arc, Command, CommandKind, Event, EventType, StringTable, Trace, TraceLog, TraceResult,
};

/// Scope names the generator draws from; covers every normalizer class.
pub const SCOPE_NAMES: [&str; 5] = [
    "script:inline",
    "load:image",
    "handler:click",
    "timer:tick",
    "resource:style",
];

/// Knobs for [`generate_log`].
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct GenParams {
    /// Number of events.
    pub events: u32,
    /// Number of distinct variables.
    pub vars: u32,
    /// Maximum memory accesses per event.
    pub max_accesses: u32,
    /// Probability that an event (other than 0) gets an incoming arc.
    pub arc_prob: f64,
    /// Probability that an event posts an explicit trigger to a later event.
    pub trigger_prob: f64,
    /// RNG seed.
    pub seed: u64,
}

impl Default for GenParams {
    fn default() -> Self {
        Self {
            events: 32,
            vars: 8,
            max_accesses: 4,
            arc_prob: 0.6,
            trigger_prob: 0.1,
            seed: 42,
        }
    }
}

fn random_type(rng: &mut StdRng) -> EventType {
    EventType::ALL[rng.random_range(0..EventType::ALL.len())]
}

/// Generate a well-formed trace with all five sections present.
///
/// - each event optionally opens one scope around its body,
/// - accesses pick a variable uniformly and are reads or writes with equal odds,
/// - writes are followed by a `MemoryValue` half of the time,
/// - arcs always point from an earlier event to a later one; timer heads get a
///   delay in `[0, 50]`, other heads get `-1`.
pub fn generate_log(p: &GenParams) -> TraceResult<TraceLog> {
    let mut rng = StdRng::seed_from_u64(p.seed);
    let n = p.events;
    let vars = p.vars.max(1);

    let variables: StringTable = (0..vars).map(|i| format!("v{i}")).collect();
    let scopes: StringTable = SCOPE_NAMES.iter().copied().collect();
    let values: StringTable = (0..10).map(|i| i.to_string()).collect();
    let scripts: StringTable = ["inline.js", "app.js"].into_iter().collect();

    let mut events = Vec::with_capacity(n as usize);
    for id in 0..n {
        let ty = random_type(&mut rng);
        let mut cmds = Vec::new();
        let scoped = rng.random_bool(0.7);
        if scoped {
            cmds.push(Command::enter(rng.random_range(0..SCOPE_NAMES.len() as u32)));
        }
        for _ in 0..rng.random_range(0..=p.max_accesses) {
            let var = rng.random_range(0..vars);
            if rng.random_bool(0.5) {
                cmds.push(Command::write(var));
                if rng.random_bool(0.5) {
                    cmds.push(Command::value(rng.random_range(0..10)));
                }
            } else {
                cmds.push(Command::read(var));
            }
        }
        if id + 1 < n && rng.random_bool(p.trigger_prob) {
            cmds.push(Command::trigger(rng.random_range(id + 1..n)));
        }
        if scoped {
            cmds.push(Command::exit());
        }
        events.push(Event::new(ty, cmds));
    }

    let mut arcs = Vec::new();
    for head in 1..n {
        if rng.random_bool(p.arc_prob) {
            let tail = rng.random_range(0..head);
            let duration = if events[head as usize].ty == EventType::Timer {
                rng.random_range(0..=50)
            } else {
                -1
            };
            arcs.push(Arc::new(tail, head, duration));
        }
    }

    Ok(TraceLog {
        variables,
        scopes,
        trace: Trace::new(events, arcs)?,
        scripts: Some(scripts),
        values: Some(values),
    })
}

/// Number of memory accesses in a generated (or any) log; handy for sizing benches.
#[must_use]
pub fn access_count(log: &TraceLog) -> usize {
    log.trace
        .events()
        .iter()
        .flat_map(|e| &e.commands)
        .filter(|c| matches!(c.kind, CommandKind::ReadMemory | CommandKind::WriteMemory))
        .count()
}
