// crates/evrace-race/src/lib.rs

//! Race detection over event traces.
//!
//! [`analysis::LoadedTrace`] is the entry point: it loads a trace, builds and
//! freezes the happens-before graph, runs [`detector::RaceDetector`] once and
//! then serves read-only queries (events, commands, arcs, names, races).
//!
//! ```no_run
//! use evrace_core::AnalysisOptions;
//! use evrace_race::analysis::LoadedTrace;
//!
//! let t = LoadedTrace::open("page.trace", &AnalysisOptions::default())?;
//! for r in t.races() {
//!     println!("{:?}", r);
//! }
//! # Ok::<(), evrace_core::TraceError>(())
//! ```

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
#![allow(
    clippy::module_name_repetitions,
    clippy::missing_errors_doc,
    clippy::cast_possible_truncation,
    clippy::cast_possible_wrap
)]

/// Loaded-trace façade and pipeline statistics.
pub mod analysis;
/// Per-variable race detector.
pub mod detector;
/// Plain-text event and race rendering.
pub mod dump;
/// Race report export.
pub mod io;

pub use analysis::{LoadedTrace, PipelineStats};
pub use detector::{Access, AccessKind, RaceDetector, RaceReport};
