// crates/evrace-trace/src/decode.rs

//! Strict decoder for the binary trace layout (see [`crate::format`]).
//!
//! Each section decodes into a local value that is only moved into the
//! resulting [`TraceLog`] once the section has fully succeeded, so a failure
//! never exposes a half-populated table.

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

use crate::format::{is_optional, prealloc, SECTION_ORDER, WORD};
use evrace_core::{
    Arc, Command, CommandKind, Event, EventType, Section, StringTable, Trace, TraceError,
    TraceLog, TraceResult,
};
use std::fs::File;
use std::io::{self, BufRead, BufReader, Read};
use std::path::Path;
use tracing::{debug, warn};

/// Little-endian word reader that tags failures with the current section.
struct Words<R> {
    inner: R,
}

impl<R: BufRead> Words<R> {
    const fn new(inner: R) -> Self {
        Self { inner }
    }

    fn i32(&mut self, section: Section, what: &str) -> TraceResult<i32> {
        let mut buf = [0u8; WORD];
        self.inner
            .read_exact(&mut buf)
            .map_err(|e| io_failure(section, what, &e))?;
        Ok(i32::from_le_bytes(buf))
    }

    /// Non-negative count or length.
    fn len(&mut self, section: Section, what: &str) -> TraceResult<usize> {
        let v = self.i32(section, what)?;
        usize::try_from(v)
            .map_err(|_| TraceError::read(section, format!("negative {what} ({v})")))
    }

    fn bytes(&mut self, section: Section, len: usize) -> TraceResult<Vec<u8>> {
        let mut buf = Vec::with_capacity(prealloc(len));
        (&mut self.inner)
            .take(len as u64)
            .read_to_end(&mut buf)
            .map_err(|e| io_failure(section, "string bytes", &e))?;
        if buf.len() != len {
            return Err(TraceError::read(
                section,
                format!("truncated string: expected {len} bytes, got {}", buf.len()),
            ));
        }
        Ok(buf)
    }

    fn at_eof(&mut self, section: Section) -> TraceResult<bool> {
        let buf = self
            .inner
            .fill_buf()
            .map_err(|e| io_failure(section, "section start", &e))?;
        Ok(buf.is_empty())
    }
}

fn io_failure(section: Section, what: &str, e: &io::Error) -> TraceError {
    if e.kind() == io::ErrorKind::UnexpectedEof {
        TraceError::read(section, format!("unexpected end of stream in {what}"))
    } else {
        TraceError::read(section, format!("{what}: {e}"))
    }
}

fn decode_table<R: BufRead>(w: &mut Words<R>, section: Section) -> TraceResult<StringTable> {
    let count = w.len(section, "string count")?;
    let mut table = StringTable::new();
    for _ in 0..count {
        let len = w.len(section, "string length")?;
        let bytes = w.bytes(section, len)?;
        table.push(String::from_utf8_lossy(&bytes).into_owned());
    }
    debug!(%section, strings = table.len(), "decoded string table");
    Ok(table)
}

fn decode_events<R: BufRead>(w: &mut Words<R>) -> TraceResult<Trace> {
    const S: Section = Section::Events;

    let n_events = w.len(S, "event count")?;
    let mut events = Vec::with_capacity(prealloc(n_events));
    for id in 0..n_events {
        let tag = w.i32(S, "event type")?;
        let ty = EventType::from_tag(tag)
            .ok_or_else(|| TraceError::parse(S, format!("event {id}: unknown event type {tag}")))?;
        let n_cmds = w.len(S, "command count")?;
        let mut commands = Vec::with_capacity(prealloc(n_cmds));
        for ci in 0..n_cmds {
            let tag = w.i32(S, "command kind")?;
            let kind = CommandKind::from_tag(tag).ok_or_else(|| {
                TraceError::parse(S, format!("event {id} command {ci}: unknown command kind {tag}"))
            })?;
            let location = w.i32(S, "command location")?;
            commands.push(Command::new(kind, location));
        }
        events.push(Event::new(ty, commands));
    }

    let n_arcs = w.len(S, "arc count")?;
    let mut arcs = Vec::with_capacity(prealloc(n_arcs));
    for i in 0..n_arcs {
        let tail = w.i32(S, "arc tail")?;
        let head = w.i32(S, "arc head")?;
        let duration = w.i32(S, "arc duration")?;
        let (Ok(tail), Ok(head)) = (u32::try_from(tail), u32::try_from(head)) else {
            return Err(TraceError::parse(
                S,
                format!("arc {i} has a negative endpoint ({tail} -> {head})"),
            ));
        };
        arcs.push(Arc::new(tail, head, duration));
    }

    let trace = Trace::new(events, arcs)?;
    debug!(
        events = trace.event_count(),
        arcs = trace.arcs().len(),
        "decoded event section"
    );
    Ok(trace)
}

/// Decode a complete trace from a buffered stream.
///
/// # Errors
/// [`TraceError::Read`] for truncation or malformed lengths,
/// [`TraceError::Parse`] for out-of-enumeration tags and structural violations.
pub fn decode_log<R: BufRead>(reader: R) -> TraceResult<TraceLog> {
    let mut w = Words::new(reader);
    let mut log = TraceLog::default();
    for section in SECTION_ORDER {
        if is_optional(section) && w.at_eof(section)? {
            debug!(%section, "section absent");
            break;
        }
        match section {
            Section::Variables => log.variables = decode_table(&mut w, section)?,
            Section::Scopes => log.scopes = decode_table(&mut w, section)?,
            Section::Events => log.trace = decode_events(&mut w)?,
            Section::Scripts => log.scripts = Some(decode_table(&mut w, section)?),
            Section::Values => log.values = Some(decode_table(&mut w, section)?),
        }
    }
    let trace = &log.trace;
    if trace.arcs().is_empty() && trace.event_count() > 1 {
        warn!(
            events = trace.event_count(),
            "trace has no arcs; every cross-event access pair is unordered"
        );
    }
    Ok(log)
}

/// Decode a trace held in memory.
pub fn decode_log_bytes(bytes: &[u8]) -> TraceResult<TraceLog> {
    decode_log(bytes)
}

/// Open and decode a trace file.
///
/// # Errors
/// [`TraceError::Open`] if the file cannot be opened, otherwise as [`decode_log`].
pub fn load_log<P: AsRef<Path>>(path: P) -> TraceResult<TraceLog> {
    let path = path.as_ref();
    let f = File::open(path).map_err(|source| TraceError::Open {
        path: path.to_path_buf(),
        source,
    })?;
    decode_log(BufReader::new(f))
}
