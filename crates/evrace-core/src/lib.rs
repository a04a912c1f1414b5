//! evrace-core — trace data model, string tables, error taxonomy and options.
//!
//! This crate defines the **stable boundary** used across evrace crates:
//! - canonical trace types (`Command`, `Event`, `Arc`, …),
//! - interned [`StringTable`]s and the five-section [`TraceLog`] bundle,
//! - the validated [`Trace`] (scope nesting, id ranges),
//! - the load error taxonomy ([`TraceError`]),
//! - pipeline options ([`AnalysisOptions`]), and
//! - JSON/CBOR helpers shared by downstream writers.
//!
//! ```
//! use evrace_core::{Arc, Command, Event, EventType, Trace};
//!
//! let trace = Trace::new(
//!     vec![
//!         Event::new(EventType::Network, vec![Command::write(0)]),
//!         Event::new(EventType::Timer, vec![Command::read(0)]),
//!     ],
//!     vec![Arc::new(0, 1, 10)],
//! )?;
//! assert_eq!(trace.event_count(), 2);
//! # Ok::<(), evrace_core::TraceError>(())
//! ```

#![forbid(unsafe_code)]
#![deny(rust_2018_idioms)]
#![deny(missing_docs)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
// Small, explicit allowlist to keep docs readable and APIs ergonomic.
#![allow(
    clippy::missing_errors_doc,
    clippy::missing_panics_doc,
    clippy::module_name_repetitions,
    clippy::doc_markdown,
    clippy::cast_possible_truncation,
    clippy::cast_possible_wrap,
    clippy::cast_sign_loss
)]

/// Pipeline options (defaults, TOML, environment overrides).
pub mod config;
/// Load error taxonomy.
pub mod error;
/// JSON/CBOR helpers and auto-detecting read/write APIs.
pub mod io;
/// Interned string tables.
pub mod strings;
/// Validated event log and the five-section trace bundle.
pub mod trace;
/// Canonical trace types shared across the workspace.
pub mod types;

// ---- Re-exports for workspace convenience ----
pub use config::{AnalysisOptions, NormalizeOptions, RaceOptions, TimerOptions};
pub use error::{ErrorKind, Section, TraceError, TraceResult};
pub use strings::{StringTable, Table, UNKNOWN};
pub use trace::{Trace, TraceLog};
pub use types::*;

/// Commonly-used items for quick imports.
///
/// ```rust
/// use evrace_core::prelude::*;
/// ```
pub mod prelude {
    pub use crate::{
        config::AnalysisOptions,
        error::{TraceError, TraceResult},
        strings::{StringTable, Table},
        trace::{Trace, TraceLog},
        types::*,
    };
}
