//! Race report export (JSON/CBOR by extension).
//!
//! Reports carry resolved names next to the raw ids so they stay readable
//! without the trace they came from.

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

use crate::analysis::{LoadedTrace, PipelineStats};
use crate::detector::RaceReport;
use anyhow::{ensure, Result};
use evrace_core::io::{read_auto, write_auto, Versioned};
use evrace_core::Table;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Report document version.
pub const REPORT_VERSION: u16 = 1;

/// A race with its names resolved.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct NamedRace {
    /// The raw report.
    #[serde(flatten)]
    pub report: RaceReport,
    /// Variable name, or `(unknown)`.
    pub var_name: String,
    /// Covering scope name, when a covering scope exists.
    pub covering_scope_name: Option<String>,
}

/// Everything `evrace races --out` writes.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct RaceDocument {
    /// Source trace path, if known.
    pub source: Option<String>,
    /// Races in detection order.
    pub races: Vec<NamedRace>,
    /// Pipeline measurements.
    pub stats: PipelineStats,
}

impl RaceDocument {
    /// Build from an analysed trace.
    #[must_use]
    pub fn from_trace(t: &LoadedTrace, source: Option<&Path>) -> Self {
        let races = t
            .races()
            .iter()
            .map(|r| NamedRace {
                report: *r,
                var_name: t.display_string(Table::Variables, r.var as i32).to_owned(),
                covering_scope_name: r
                    .covering_scope
                    .map(|s| t.display_string(Table::Scopes, s as i32).to_owned()),
            })
            .collect();
        Self {
            source: source.map(|p| p.display().to_string()),
            races,
            stats: t.stats().clone(),
        }
    }
}

/// Write a report; the extension picks JSON or CBOR.
pub fn write_report_auto<P: AsRef<Path>>(path: P, doc: &RaceDocument) -> Result<()> {
    write_auto(path, &Versioned::new(REPORT_VERSION, doc), "race report")
}

/// Read a report written by [`write_report_auto`].
pub fn read_report_auto<P: AsRef<Path>>(path: P) -> Result<RaceDocument> {
    let v: Versioned<RaceDocument> = read_auto(path, "race report")?;
    ensure!(
        v.ver == REPORT_VERSION,
        "unsupported race report version {} (expected {REPORT_VERSION})",
        v.ver
    );
    Ok(v.payload)
}

#[cfg(test)]
mod tests {
    use super::*;
    use evrace_core::{AnalysisOptions, Command, Event, EventType, Trace, TraceLog};

    fn tmp_path(ext: &str) -> std::path::PathBuf {
        let nanos = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap()
            .as_nanos();
        std::env::temp_dir().join(format!("evrace_report_{nanos}.{ext}"))
    }

    fn analysed() -> LoadedTrace {
        let log = TraceLog {
            variables: ["counter"].into_iter().collect(),
            trace: Trace::new(
                vec![
                    Event::new(EventType::Network, vec![Command::write(0)]),
                    Event::new(EventType::Network, vec![Command::read(0)]),
                ],
                vec![],
            )
            .unwrap(),
            ..TraceLog::default()
        };
        LoadedTrace::from_log(log, &AnalysisOptions::default())
    }

    #[test]
    fn reports_survive_both_formats() {
        let t = analysed();
        let doc = RaceDocument::from_trace(&t, Some(Path::new("trace.bin")));
        assert_eq!(doc.races.len(), 1);
        assert_eq!(doc.races[0].var_name, "counter");
        for ext in ["json", "cbor"] {
            let p = tmp_path(ext);
            write_report_auto(&p, &doc).unwrap();
            assert_eq!(read_report_auto(&p).unwrap(), doc);
            let _ = std::fs::remove_file(p);
        }
    }

    #[test]
    fn json_is_flat() {
        let doc = RaceDocument::from_trace(&analysed(), None);
        let v = serde_json::to_value(&doc.races[0]).unwrap();
        assert_eq!(v["var"], 0);
        assert_eq!(v["first"]["kind"], "write");
        assert_eq!(v["var_name"], "counter");
        assert!(v["covering_scope"].is_null());
    }
}
