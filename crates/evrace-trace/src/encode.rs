// crates/evrace-trace/src/encode.rs

//! Writer for the binary trace layout (see [`crate::format`]).
//!
//! Output is byte-for-byte what [`crate::decode::decode_log`] accepts. The
//! script table is written whenever the value table is present, since the
//! layout identifies optional sections by position only.

use anyhow::{Context, Result};
use crate::format::{is_optional, SECTION_ORDER};
use evrace_core::{io::ensure_parent_dir, Section, StringTable, Trace, TraceLog};
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;

fn word<W: Write>(w: &mut W, v: i32) -> io::Result<()> {
    w.write_all(&v.to_le_bytes())
}

fn len_word<W: Write>(w: &mut W, n: usize) -> io::Result<()> {
    let v = i32::try_from(n)
        .map_err(|_| io::Error::new(io::ErrorKind::InvalidInput, "length exceeds i32"))?;
    word(w, v)
}

fn encode_table<W: Write>(w: &mut W, table: &StringTable) -> io::Result<()> {
    len_word(w, table.len())?;
    for s in table.iter() {
        len_word(w, s.len())?;
        w.write_all(s.as_bytes())?;
    }
    Ok(())
}

fn encode_events<W: Write>(w: &mut W, trace: &Trace) -> io::Result<()> {
    len_word(w, trace.event_count())?;
    for ev in trace.events() {
        word(w, ev.ty.tag())?;
        len_word(w, ev.commands.len())?;
        for c in &ev.commands {
            word(w, c.kind.tag())?;
            word(w, c.location)?;
        }
    }
    len_word(w, trace.arcs().len())?;
    for a in trace.arcs() {
        // Endpoints were range-checked against the i32 event count.
        word(w, a.tail as i32)?;
        word(w, a.head as i32)?;
        word(w, a.duration)?;
    }
    Ok(())
}

fn optional_table(log: &TraceLog, section: Section) -> Option<&StringTable> {
    match section {
        Section::Scripts => log.scripts.as_ref(),
        Section::Values => log.values.as_ref(),
        _ => None,
    }
}

/// Encode a trace into any writer.
///
/// Sections follow [`SECTION_ORDER`]; output stops after the last section that
/// is required or present, and an absent optional section before it is
/// written empty.
pub fn encode_log<W: Write>(log: &TraceLog, mut w: W) -> io::Result<()> {
    let end = SECTION_ORDER
        .iter()
        .rposition(|&s| !is_optional(s) || optional_table(log, s).is_some())
        .map_or(0, |i| i + 1);
    let empty = StringTable::new();
    for &section in &SECTION_ORDER[..end] {
        match section {
            Section::Variables => encode_table(&mut w, &log.variables)?,
            Section::Scopes => encode_table(&mut w, &log.scopes)?,
            Section::Events => encode_events(&mut w, &log.trace)?,
            Section::Scripts | Section::Values => {
                encode_table(&mut w, optional_table(log, section).unwrap_or(&empty))?;
            }
        }
    }
    Ok(())
}

/// Encode a trace into a fresh buffer.
pub fn encode_log_to_vec(log: &TraceLog) -> io::Result<Vec<u8>> {
    let mut buf = Vec::new();
    encode_log(log, &mut buf)?;
    Ok(buf)
}

/// Write a binary trace file.
pub fn save_log<P: AsRef<Path>>(path: P, log: &TraceLog) -> Result<()> {
    let path = path.as_ref();
    ensure_parent_dir(path)?;
    let f = File::create(path).with_context(|| format!("create {}", path.display()))?;
    let mut w = BufWriter::new(f);
    encode_log(log, &mut w).with_context(|| format!("encode trace to {}", path.display()))?;
    w.flush().with_context(|| "flush trace writer")?;
    Ok(())
}
