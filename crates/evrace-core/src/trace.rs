//! Deserialized event log: events, their commands, and the arc list.
//!
//! A [`Trace`] can only be obtained through [`Trace::new`], which enforces the
//! structural invariants every downstream pass relies on:
//!
//! - command locations are `-1` or non-negative,
//! - `EnterScope`/`ExitScope` nest with stack discipline inside each event,
//! - known `TriggerArc` targets name an existing event,
//! - arc endpoints name existing events.

use crate::error::{Section, TraceError, TraceResult};
use crate::strings::{StringTable, Table, UNKNOWN};
use crate::types::{Arc, Command, CommandKind, Event, EventId, UNKNOWN_LOCATION};
use serde::{Deserialize, Serialize};

/// Validated, immutable event log.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(try_from = "RawTrace", into = "RawTrace")]
pub struct Trace {
    events: Vec<Event>,
    arcs: Vec<Arc>,
}

/// Unvalidated wire shape used for serde.
#[derive(Clone, Debug, Serialize, Deserialize)]
struct RawTrace {
    events: Vec<Event>,
    arcs: Vec<Arc>,
}

impl TryFrom<RawTrace> for Trace {
    type Error = TraceError;

    fn try_from(raw: RawTrace) -> TraceResult<Self> {
        Self::new(raw.events, raw.arcs)
    }
}

impl From<Trace> for RawTrace {
    fn from(t: Trace) -> Self {
        Self {
            events: t.events,
            arcs: t.arcs,
        }
    }
}

impl Trace {
    /// Validate and assemble a trace.
    ///
    /// # Errors
    /// [`TraceError::Parse`] (section [`Section::Events`]) on the first
    /// structural violation.
    pub fn new(events: Vec<Event>, arcs: Vec<Arc>) -> TraceResult<Self> {
        let n = events.len();
        if i32::try_from(n).is_err() {
            return Err(TraceError::parse(
                Section::Events,
                format!("event count {n} exceeds the 32-bit id space"),
            ));
        }
        for (id, ev) in events.iter().enumerate() {
            validate_event(id, ev, n)?;
        }
        for (i, a) in arcs.iter().enumerate() {
            if a.tail as usize >= n || a.head as usize >= n {
                return Err(TraceError::parse(
                    Section::Events,
                    format!(
                        "arc {i} ({} -> {}) names an event outside [0, {n})",
                        a.tail, a.head
                    ),
                ));
            }
        }
        Ok(Self { events, arcs })
    }

    /// Number of events.
    #[inline]
    #[must_use]
    pub fn event_count(&self) -> usize {
        self.events.len()
    }

    /// Event by id.
    #[inline]
    #[must_use]
    pub fn event(&self, id: EventId) -> Option<&Event> {
        self.events.get(id as usize)
    }

    /// All events in id order.
    #[inline]
    #[must_use]
    pub fn events(&self) -> &[Event] {
        &self.events
    }

    /// `(id, event)` pairs in id order.
    pub fn iter_events(&self) -> impl Iterator<Item = (EventId, &Event)> + '_ {
        self.events
            .iter()
            .enumerate()
            .map(|(i, e)| (i as EventId, e))
    }

    /// Command `index` of event `id`.
    #[inline]
    #[must_use]
    pub fn command(&self, id: EventId, index: usize) -> Option<Command> {
        self.event(id).and_then(|e| e.commands.get(index).copied())
    }

    /// Arcs in stream order.
    #[inline]
    #[must_use]
    pub fn arcs(&self) -> &[Arc] {
        &self.arcs
    }
}

fn validate_event(id: usize, ev: &Event, n: usize) -> TraceResult<()> {
    let mut depth = 0usize;
    for (ci, cmd) in ev.commands.iter().enumerate() {
        if cmd.kind != CommandKind::ExitScope
            && cmd.location < 0
            && cmd.location != UNKNOWN_LOCATION
        {
            return Err(TraceError::parse(
                Section::Events,
                format!(
                    "event {id} command {ci}: location {} is neither -1 nor an id",
                    cmd.location
                ),
            ));
        }
        match cmd.kind {
            CommandKind::EnterScope => depth += 1,
            CommandKind::ExitScope => {
                depth = depth.checked_sub(1).ok_or_else(|| {
                    TraceError::parse(
                        Section::Events,
                        format!("event {id} command {ci}: exit without an open scope"),
                    )
                })?;
            }
            CommandKind::TriggerArc => {
                if let Some(target) = cmd.location() {
                    if target as usize >= n {
                        return Err(TraceError::parse(
                            Section::Events,
                            format!(
                                "event {id} command {ci}: trigger target {target} outside [0, {n})"
                            ),
                        ));
                    }
                }
            }
            CommandKind::ReadMemory | CommandKind::WriteMemory | CommandKind::MemoryValue => {}
        }
    }
    if depth != 0 {
        return Err(TraceError::parse(
            Section::Events,
            format!("event {id} ends with {depth} open scope(s)"),
        ));
    }
    Ok(())
}

/// A fully loaded trace file: the four string tables plus the event log.
///
/// Optional trailing tables that were absent from the stream are `None`;
/// lookups into them resolve to unknown.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct TraceLog {
    /// Variable names.
    pub variables: StringTable,
    /// Scope names.
    pub scopes: StringTable,
    /// Events, commands and arcs.
    pub trace: Trace,
    /// Script/resource identifiers, if the section was present.
    pub scripts: Option<StringTable>,
    /// Serialized memory values, if the section was present.
    pub values: Option<StringTable>,
}

impl TraceLog {
    /// Table by selector, `None` if an optional table was absent.
    #[must_use]
    pub fn table(&self, table: Table) -> Option<&StringTable> {
        match table {
            Table::Variables => Some(&self.variables),
            Table::Scopes => Some(&self.scopes),
            Table::Scripts => self.scripts.as_ref(),
            Table::Values => self.values.as_ref(),
        }
    }

    /// Resolve `id` in `table`; unknown for absent tables and unpopulated ids.
    #[must_use]
    pub fn string_for(&self, table: Table, id: i32) -> Option<&str> {
        self.table(table).and_then(|t| t.get_raw(id))
    }

    /// Like [`Self::string_for`], rendering misses as [`UNKNOWN`].
    #[must_use]
    pub fn display_string(&self, table: Table, id: i32) -> &str {
        self.string_for(table, id).unwrap_or(UNKNOWN)
    }
}
