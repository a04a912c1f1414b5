// crates/evrace-race/src/dump.rs

//! Plain-text event dump.
//!
//! Each command is rendered with the table that matches its own kind: scope
//! names for scope entry, variable names for reads and writes, values for
//! `MemoryValue`. `TriggerArc` prints its raw target. The output is
//! byte-compatible with dumps produced by the recorder's own tooling, which
//! means a scope entry is *not* newline-terminated and runs into the next line.

use crate::analysis::LoadedTrace;
use crate::detector::{AccessKind, RaceReport};
use evrace_core::{CommandKind, Table, TraceLog};
use std::io::{self, Write};

/// Write every event and its commands in id order.
pub fn dump_log<W: Write>(log: &TraceLog, mut w: W) -> io::Result<()> {
    for (id, ev) in log.trace.iter_events() {
        writeln!(w, "Event {id}:")?;
        for c in &ev.commands {
            match c.kind {
                CommandKind::EnterScope => {
                    write!(w, "  Entering scope {}", log.display_string(Table::Scopes, c.location))?;
                }
                CommandKind::ExitScope => writeln!(w, "  Exiting scope")?,
                CommandKind::ReadMemory => {
                    writeln!(w, "  Reading {}", log.display_string(Table::Variables, c.location))?;
                }
                CommandKind::WriteMemory => {
                    writeln!(w, "  Writing {}", log.display_string(Table::Variables, c.location))?;
                }
                CommandKind::MemoryValue => {
                    writeln!(w, "  Value {}", log.display_string(Table::Values, c.location))?;
                }
                CommandKind::TriggerArc => writeln!(w, "  Posting {}", c.location)?,
            }
        }
    }
    Ok(())
}

/// Dump into a `String`.
///
/// # Errors
/// Propagates any error from [`dump_log`].
pub fn dump_to_string(log: &TraceLog) -> io::Result<String> {
    let mut buf = Vec::new();
    dump_log(log, &mut buf)?;
    String::from_utf8(buf).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))
}

const fn kind_word(kind: AccessKind) -> &'static str {
    match kind {
        AccessKind::Read => "read",
        AccessKind::Write => "write",
    }
}

/// One line per race, with names resolved:
/// `race on <var>: event 0 cmd 1 (write) / event 3 cmd 0 (read) [scope <s>]`.
pub fn write_races<W: Write>(t: &LoadedTrace, mut w: W) -> io::Result<()> {
    for r in t.races() {
        write_race(t, r, &mut w)?;
    }
    Ok(())
}

fn write_race<W: Write>(t: &LoadedTrace, r: &RaceReport, w: &mut W) -> io::Result<()> {
    write!(
        w,
        "race on {}: event {} cmd {} ({}) / event {} cmd {} ({})",
        t.display_string(Table::Variables, r.var as i32),
        r.first.event,
        r.first.command,
        kind_word(r.first.kind),
        r.second.event,
        r.second.command,
        kind_word(r.second.kind),
    )?;
    if let Some(s) = r.covering_scope {
        write!(w, " [scope {}]", t.display_string(Table::Scopes, s as i32))?;
    }
    writeln!(w)
}
