//! Canonical trace types used across the evrace workspace.
//!
//! These live in `evrace-core` and are re-exported at the crate root so other
//! crates can import via `evrace_core::Command`, `evrace_core::Arc`, etc.
//!
//! Numeric representations mirror the on-disk layout (32-bit signed integers)
//! so the binary codec is a straight field copy.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Dense event identifier in `[0, event_count)`.
pub type EventId = u32;

/// Identifier into the variable table.
pub type VarId = u32;

/// Identifier into the scope table.
pub type ScopeId = u32;

/// Identifier into the memory-value table.
pub type ValueId = u32;

/// Raw location sentinel meaning "unknown / no location".
pub const UNKNOWN_LOCATION: i32 = -1;

/// Kind of a traced step inside an event.
///
/// The discriminants are the wire tags.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum CommandKind {
    /// Push a nested dynamic context; location is a scope id.
    EnterScope = 0,
    /// Pop the innermost open scope; location is ignored.
    ExitScope = 1,
    /// Memory read; location is a variable id.
    ReadMemory = 2,
    /// Memory write; location is a variable id.
    WriteMemory = 3,
    /// Posting of another event; location is the target event id.
    TriggerArc = 4,
    /// Serialized value of the preceding access; location is a value id.
    MemoryValue = 5,
}

impl CommandKind {
    /// All kinds in tag order.
    pub const ALL: [Self; 6] = [
        Self::EnterScope,
        Self::ExitScope,
        Self::ReadMemory,
        Self::WriteMemory,
        Self::TriggerArc,
        Self::MemoryValue,
    ];

    /// Decode a wire tag. Returns `None` for tags outside the enumeration.
    #[must_use]
    pub const fn from_tag(tag: i32) -> Option<Self> {
        match tag {
            0 => Some(Self::EnterScope),
            1 => Some(Self::ExitScope),
            2 => Some(Self::ReadMemory),
            3 => Some(Self::WriteMemory),
            4 => Some(Self::TriggerArc),
            5 => Some(Self::MemoryValue),
            _ => None,
        }
    }

    /// Wire tag for this kind.
    #[inline]
    #[must_use]
    pub const fn tag(self) -> i32 {
        self as i32
    }

    /// Whether this is a memory read or write.
    #[inline]
    #[must_use]
    pub const fn is_access(self) -> bool {
        matches!(self, Self::ReadMemory | Self::WriteMemory)
    }
}

/// What triggered an event.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    /// Not classified by the recorder.
    Unknown = 0,
    /// Timer callback (`setTimeout`/`setInterval` style).
    Timer = 1,
    /// User action (click, key, scroll).
    UserInterface = 2,
    /// Network response or resource arrival.
    Network = 3,
    /// Continuation of a previously interrupted event (e.g. parser resumption).
    Continuation = 4,
}

impl EventType {
    /// All types in tag order.
    pub const ALL: [Self; 5] = [
        Self::Unknown,
        Self::Timer,
        Self::UserInterface,
        Self::Network,
        Self::Continuation,
    ];

    /// Decode a wire tag. Returns `None` for tags outside the enumeration.
    #[must_use]
    pub const fn from_tag(tag: i32) -> Option<Self> {
        match tag {
            0 => Some(Self::Unknown),
            1 => Some(Self::Timer),
            2 => Some(Self::UserInterface),
            3 => Some(Self::Network),
            4 => Some(Self::Continuation),
            _ => None,
        }
    }

    /// Wire tag for this type.
    #[inline]
    #[must_use]
    pub const fn tag(self) -> i32 {
        self as i32
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Unknown => "unknown",
            Self::Timer => "timer",
            Self::UserInterface => "ui",
            Self::Network => "network",
            Self::Continuation => "continuation",
        };
        f.write_str(s)
    }
}

/// One traced step within an event.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct Command {
    /// Command kind.
    pub kind: CommandKind,
    /// Raw location: `-1` for unknown, otherwise an id whose table depends on `kind`.
    pub location: i32,
}

impl Command {
    /// Construct a command with a raw location.
    #[inline]
    #[must_use]
    pub const fn new(kind: CommandKind, location: i32) -> Self {
        Self { kind, location }
    }

    /// `EnterScope` for a known scope id.
    #[inline]
    #[must_use]
    pub const fn enter(scope: ScopeId) -> Self {
        Self::new(CommandKind::EnterScope, scope as i32)
    }

    /// `ExitScope`.
    #[inline]
    #[must_use]
    pub const fn exit() -> Self {
        Self::new(CommandKind::ExitScope, UNKNOWN_LOCATION)
    }

    /// `ReadMemory` of a known variable.
    #[inline]
    #[must_use]
    pub const fn read(var: VarId) -> Self {
        Self::new(CommandKind::ReadMemory, var as i32)
    }

    /// `WriteMemory` of a known variable.
    #[inline]
    #[must_use]
    pub const fn write(var: VarId) -> Self {
        Self::new(CommandKind::WriteMemory, var as i32)
    }

    /// `TriggerArc` naming a target event.
    #[inline]
    #[must_use]
    pub const fn trigger(target: EventId) -> Self {
        Self::new(CommandKind::TriggerArc, target as i32)
    }

    /// `MemoryValue` for a known value id.
    #[inline]
    #[must_use]
    pub const fn value(value: ValueId) -> Self {
        Self::new(CommandKind::MemoryValue, value as i32)
    }

    /// Decoded location, `None` when unknown (or for `ExitScope`).
    #[inline]
    #[must_use]
    pub fn location(&self) -> Option<u32> {
        if self.kind == CommandKind::ExitScope {
            return None;
        }
        u32::try_from(self.location).ok()
    }
}

/// One atomic unit of program reaction: a typed, ordered command list.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct Event {
    /// What triggered the event.
    pub ty: EventType,
    /// Commands in execution order.
    pub commands: Vec<Command>,
}

impl Event {
    /// Construct an event.
    #[inline]
    #[must_use]
    pub fn new(ty: EventType, commands: Vec<Command>) -> Self {
        Self { ty, commands }
    }

    /// Whether any command reads or writes memory.
    #[must_use]
    pub fn has_memory_access(&self) -> bool {
        self.commands.iter().any(|c| c.kind.is_access())
    }

    /// Known `TriggerArc` targets in command order.
    pub fn trigger_targets(&self) -> impl Iterator<Item = EventId> + '_ {
        self.commands
            .iter()
            .filter(|c| c.kind == CommandKind::TriggerArc)
            .filter_map(Command::location)
    }

    /// Scope id of the first `EnterScope` with a known location.
    #[must_use]
    pub fn first_known_scope(&self) -> Option<ScopeId> {
        self.commands
            .iter()
            .filter(|c| c.kind == CommandKind::EnterScope)
            .find_map(Command::location)
    }
}

/// Recorded trigger/scheduling relation `tail → head`.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct Arc {
    /// Triggering event.
    pub tail: EventId,
    /// Triggered event.
    pub head: EventId,
    /// Raw duration; negative means "no timing information".
    pub duration: i32,
}

impl Arc {
    /// Construct an arc.
    #[inline]
    #[must_use]
    pub const fn new(tail: EventId, head: EventId, duration: i32) -> Self {
        Self {
            tail,
            head,
            duration,
        }
    }

    /// Duration as a delay, `None` when the recorder gave no timing.
    #[inline]
    #[must_use]
    pub fn delay(&self) -> Option<u32> {
        u32::try_from(self.duration).ok()
    }
}
