//! Recorder trace format: binary codec, JSON/CBOR envelopes, synthetic traces.
//!
//! This crate provides five small building blocks:
//!
//! - `format`: the binary section layout shared by both directions.
//! - `decode`: a strict decoder producing a validated `TraceLog`.
//! - `encode`: a bit-compatible writer for the same layout.
//! - `generator`: a deterministic synthetic trace generator for tests/benches.
//! - `io`: extension-driven read/write helpers (binary, JSON, CBOR).
//!
//! We intentionally avoid broad re-exports so callers use stable paths like
//! `evrace_trace::decode::load_log`.

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

/// Strict binary decoder.
pub mod decode;
/// Bit-compatible binary encoder.
pub mod encode;
/// Binary section layout.
pub mod format;
/// Deterministic synthetic trace generator (for sims/benches).
pub mod generator;
/// Binary/JSON/CBOR I/O helpers for `TraceLog`.
pub mod io;
