//! I/O helpers for whole traces (format-level).
//!
//! Supports the native binary layout plus JSON/CBOR envelopes, with
//! extension-based auto-detection. These routines do not impose analysis
//! semantics; they only move a [`TraceLog`] across the wire.

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

use crate::{decode::load_log, encode::save_log};
use anyhow::{ensure, Result};
use evrace_core::io::{read_auto, write_auto, DocFormat, Versioned};
use evrace_core::TraceLog;
use std::path::Path;

/// Envelope version for JSON/CBOR trace documents.
pub const ENVELOPE_VERSION: u16 = 1;

/// On-disk representation selected for a path.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TraceFormat {
    /// Native recorder layout.
    Binary,
    /// Versioned JSON envelope.
    Json,
    /// Versioned CBOR envelope.
    Cbor,
}

impl TraceFormat {
    /// `.json` / `.cbor` select envelopes; anything else is binary.
    #[must_use]
    pub fn from_path(path: &Path) -> Self {
        match DocFormat::from_path(path) {
            Some(DocFormat::Json) => Self::Json,
            Some(DocFormat::Cbor) => Self::Cbor,
            None => Self::Binary,
        }
    }
}

/// Read a trace in whichever format its extension implies.
///
/// Errors include file open, decoding, or a mismatched envelope version.
/// Binary load errors keep their [`evrace_core::TraceError`] as the source.
pub fn read_log_auto<P: AsRef<Path>>(path: P) -> Result<TraceLog> {
    let path = path.as_ref();
    match TraceFormat::from_path(path) {
        TraceFormat::Binary => Ok(load_log(path)?),
        TraceFormat::Json | TraceFormat::Cbor => {
            let v: Versioned<TraceLog> = read_auto(path, "trace envelope")?;
            ensure!(
                v.ver == ENVELOPE_VERSION,
                "unsupported trace envelope version {} (expected {ENVELOPE_VERSION})",
                v.ver
            );
            Ok(v.payload)
        }
    }
}

/// Write a trace in whichever format its extension implies.
pub fn write_log_auto<P: AsRef<Path>>(path: P, log: &TraceLog) -> Result<()> {
    let path = path.as_ref();
    match TraceFormat::from_path(path) {
        TraceFormat::Binary => save_log(path, log),
        TraceFormat::Json | TraceFormat::Cbor => write_auto(
            path,
            &Versioned::new(ENVELOPE_VERSION, log),
            "trace envelope",
        ),
    }
}
